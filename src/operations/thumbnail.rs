use std::path::{Path, PathBuf};
use std::str::FromStr;

use super::resize::MAX_DIMENSION;
use crate::error::{MediaError, Result};
use crate::media::{ArgumentBuilder, ArgumentList, InputSpec, Tool};
use crate::output::{may_write, Outcome};
use crate::time::Timestamp;
use crate::toolkit::{require_input, Toolkit};

/// Where to grab the frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FramePosition {
    At(Timestamp),
    /// Percent of the probed duration, 0..=100.
    Percent(f64),
}

impl Default for FramePosition {
    fn default() -> Self {
        FramePosition::At(Timestamp::from_millis(1000))
    }
}

impl FromStr for FramePosition {
    type Err = MediaError;

    /// `25%` is a percentage, anything else a timestamp.
    fn from_str(s: &str) -> Result<Self> {
        match s.trim().strip_suffix('%') {
            Some(percent) => {
                let value: f64 = percent.trim().parse().map_err(|_| {
                    MediaError::Validation(format!("Invalid percentage '{}'", s))
                })?;
                if !(0.0..=100.0).contains(&value) {
                    return Err(MediaError::Validation(format!(
                        "percentage must be between 0 and 100, got {}",
                        value
                    )));
                }
                Ok(FramePosition::Percent(value))
            }
            None => Ok(FramePosition::At(Timestamp::parse(s)?)),
        }
    }
}

/// JPEG quality scale for `-q:v`: 2 is best, 31 worst.
pub const JPEG_QUALITY: std::ops::RangeInclusive<u8> = 2..=31;

#[derive(Debug, Clone, Default)]
pub struct ThumbnailRequest {
    pub input: PathBuf,
    pub output: PathBuf,
    pub position: FramePosition,
    pub width: Option<u32>,
    pub quality: Option<u8>,
    pub overwrite: bool,
}

impl ThumbnailRequest {
    pub fn new<P: AsRef<Path>, Q: AsRef<Path>>(input: P, output: Q) -> Self {
        Self {
            input: input.as_ref().to_path_buf(),
            output: output.as_ref().to_path_buf(),
            ..Self::default()
        }
    }

    fn validate(&self) -> Result<()> {
        if let FramePosition::Percent(percent) = self.position {
            if !(0.0..=100.0).contains(&percent) {
                return Err(MediaError::Validation(format!(
                    "percentage must be between 0 and 100, got {}",
                    percent
                )));
            }
        }
        if let Some(width) = self.width {
            if width == 0 || width > MAX_DIMENSION {
                return Err(MediaError::Validation(format!(
                    "thumbnail width must be between 1 and {}, got {}",
                    MAX_DIMENSION, width
                )));
            }
        }
        if let Some(quality) = self.quality {
            if !JPEG_QUALITY.contains(&quality) {
                return Err(MediaError::Validation(format!(
                    "thumbnail quality must be between {} and {}, got {}",
                    JPEG_QUALITY.start(),
                    JPEG_QUALITY.end(),
                    quality
                )));
            }
        }
        Ok(())
    }
}

/// `position` must already be absolute.
pub fn build_args(
    request: &ThumbnailRequest,
    position: Timestamp,
    input: &Path,
    output: &Path,
) -> Result<ArgumentList> {
    request.validate()?;

    let mut builder = ArgumentBuilder::ffmpeg()
        .input(InputSpec::new(input).seek(&position.to_ffmpeg()))
        .codec(["-frames:v", "1"]);

    if let Some(width) = request.width {
        builder = builder.video_filter(format!("scale={}:-2", width));
    }
    if let Some(quality) = request.quality {
        builder = builder.codec(["-q:v".to_string(), quality.to_string()]);
    }

    // Single image output, not an image sequence pattern.
    Ok(builder.output_option(["-update", "1"]).build(output))
}

impl Toolkit {
    /// Grab a single frame as an image.
    pub async fn thumbnail(&self, request: &ThumbnailRequest) -> Result<Outcome> {
        let input = require_input(&request.input)?;
        request.validate()?;
        let staged = self.stage(&request.output, request.overwrite);

        let position = match request.position {
            FramePosition::At(at) => at,
            FramePosition::Percent(percent) => {
                // Probe only when the frame will actually be written.
                if !may_write(staged.target(), staged.overwrite()) {
                    return Ok(Outcome::skipped(staged.target()));
                }
                self.ensure_available(Tool::Ffmpeg).await?;
                let duration = self.probe(&input).await?.duration_timestamp()?;
                duration.scaled(percent / 100.0)
            }
        };

        let args = build_args(request, position, &input, staged.path())?;
        self.encode("Thumbnail", staged, args).await
    }
}
