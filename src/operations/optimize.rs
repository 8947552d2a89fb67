use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::info;

use super::resize::MAX_DIMENSION;
use crate::codec::{is_mp4_family, AudioCodec, VideoCodec};
use crate::error::{MediaError, Result};
use crate::media::{ArgumentBuilder, ArgumentList, Tool};
use crate::output::{may_write, Outcome};
use crate::quality::{audio_args, Bitrate, EncoderSpeed, QualityOptions};
use crate::time::Timestamp;
use crate::toolkit::{require_input, Toolkit};

/// Below this the picture falls apart; a larger target size is needed.
const MIN_VIDEO_BITRATE: u64 = 100_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OptimizeTarget {
    /// Broadly compatible H.264 with progressive download.
    #[default]
    Web,
    /// Smaller H.264 capped at 720p-class widths.
    Mobile,
    /// High quality H.265 for long-term storage.
    Archive,
}

/// Encoder settings behind each target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptimizeProfile {
    pub codec: VideoCodec,
    pub crf: u8,
    pub speed: EncoderSpeed,
    pub audio_bitrate: u64,
    pub max_width: Option<u32>,
}

impl OptimizeTarget {
    pub fn profile(&self) -> OptimizeProfile {
        match self {
            OptimizeTarget::Web => OptimizeProfile {
                codec: VideoCodec::H264,
                crf: 23,
                speed: EncoderSpeed::Medium,
                audio_bitrate: 128_000,
                max_width: None,
            },
            OptimizeTarget::Mobile => OptimizeProfile {
                codec: VideoCodec::H264,
                crf: 26,
                speed: EncoderSpeed::Fast,
                audio_bitrate: 96_000,
                max_width: Some(1280),
            },
            OptimizeTarget::Archive => OptimizeProfile {
                codec: VideoCodec::H265,
                crf: 20,
                speed: EncoderSpeed::Slow,
                audio_bitrate: 192_000,
                max_width: None,
            },
        }
    }
}

impl FromStr for OptimizeTarget {
    type Err = MediaError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "web" => Ok(OptimizeTarget::Web),
            "mobile" => Ok(OptimizeTarget::Mobile),
            "archive" => Ok(OptimizeTarget::Archive),
            _ => Err(MediaError::Validation(format!(
                "Invalid optimize target '{}'. Valid targets: web, mobile, archive",
                s
            ))),
        }
    }
}

impl fmt::Display for OptimizeTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OptimizeTarget::Web => "web",
            OptimizeTarget::Mobile => "mobile",
            OptimizeTarget::Archive => "archive",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Default)]
pub struct OptimizeRequest {
    pub input: PathBuf,
    pub output: PathBuf,
    pub target: OptimizeTarget,
    /// Never upscales; combined with the target's own cap, the smaller wins.
    pub max_width: Option<u32>,
    /// Aim for this file size (megabytes, 10^6 bytes) instead of constant quality.
    pub target_size_mb: Option<f64>,
    pub overwrite: bool,
}

impl OptimizeRequest {
    pub fn new<P: AsRef<Path>, Q: AsRef<Path>>(input: P, output: Q, target: OptimizeTarget) -> Self {
        Self {
            input: input.as_ref().to_path_buf(),
            output: output.as_ref().to_path_buf(),
            target,
            ..Self::default()
        }
    }

    /// Width cap from the request and the target; the smaller wins.
    fn max_width(&self) -> Option<u32> {
        match (self.max_width, self.target.profile().max_width) {
            (Some(requested), Some(cap)) => Some(requested.min(cap)),
            (requested, cap) => requested.or(cap),
        }
    }

    fn validate(&self) -> Result<()> {
        if let Some(width) = self.max_width() {
            if width == 0 || width > MAX_DIMENSION {
                return Err(MediaError::Validation(format!(
                    "max width must be between 1 and {}, got {}",
                    MAX_DIMENSION, width
                )));
            }
        }
        if let Some(size_mb) = self.target_size_mb {
            if !size_mb.is_finite() || size_mb <= 0.0 {
                return Err(MediaError::Validation(format!(
                    "target size must be positive, got {}",
                    size_mb
                )));
            }
        }
        Ok(())
    }
}

/// Video bitrate that, together with `audio_bps`, fills `size_mb` over `duration`.
pub fn size_bitrate(size_mb: f64, duration: Timestamp, audio_bps: u64) -> Result<Bitrate> {
    if !size_mb.is_finite() || size_mb <= 0.0 {
        return Err(MediaError::Validation(format!(
            "target size must be positive, got {}",
            size_mb
        )));
    }
    let seconds = duration.as_secs_f64();
    if seconds <= 0.0 {
        return Err(MediaError::Probe("input has no known duration".to_string()));
    }

    let total_bps = size_mb * 8_000_000.0 / seconds;
    let video_bps = (total_bps - audio_bps as f64).floor();
    if video_bps < MIN_VIDEO_BITRATE as f64 {
        return Err(MediaError::Validation(format!(
            "{} MB is too small for {:.1}s of video",
            size_mb, seconds
        )));
    }
    // Round down to whole kilobits.
    Ok(Bitrate::from_bits_per_second((video_bps as u64 / 1000) * 1000))
}

pub fn build_args(
    request: &OptimizeRequest,
    video_bitrate: Option<Bitrate>,
    input: &Path,
    output: &Path,
) -> Result<ArgumentList> {
    request.validate()?;
    let profile = request.target.profile();

    let mut builder = ArgumentBuilder::ffmpeg().input_path(input);
    if let Some(width) = request.max_width() {
        builder = builder.video_filter(format!("scale='min({},iw)':-2", width));
    }

    let quality = match video_bitrate {
        Some(bitrate) => QualityOptions {
            video_bitrate: Some(bitrate),
            speed: Some(profile.speed),
            ..QualityOptions::default()
        },
        None => QualityOptions {
            crf: Some(profile.crf),
            speed: Some(profile.speed),
            ..QualityOptions::default()
        },
    };

    builder = builder
        .codec(quality.resolve(profile.codec)?.video_args())
        .codec(["-pix_fmt", "yuv420p"])
        .codec(audio_args(
            AudioCodec::Aac,
            Some(&Bitrate::from_bits_per_second(profile.audio_bitrate)),
        ));

    if is_mp4_family(&request.output) {
        if profile.codec == VideoCodec::H265 {
            // Apple players only accept HEVC tagged as hvc1.
            builder = builder.codec(["-tag:v", "hvc1"]);
        }
        builder = builder.output_option(["-movflags", "+faststart"]);
    }

    Ok(builder.build(output))
}

impl Toolkit {
    /// Re-encode with settings tuned for delivery or storage.
    pub async fn optimize(&self, request: &OptimizeRequest) -> Result<Outcome> {
        let input = require_input(&request.input)?;
        request.validate()?;
        let staged = self.stage(&request.output, request.overwrite);

        let video_bitrate = match request.target_size_mb {
            Some(size_mb) => {
                if !may_write(staged.target(), staged.overwrite()) {
                    return Ok(Outcome::skipped(staged.target()));
                }
                self.ensure_available(Tool::Ffmpeg).await?;
                let duration = self.probe(&input).await?.duration_timestamp()?;
                let bitrate = size_bitrate(size_mb, duration, request.target.profile().audio_bitrate)?;
                info!("Targeting {} MB with video bitrate {}", size_mb, bitrate);
                Some(bitrate)
            }
            None => None,
        };

        let args = build_args(request, video_bitrate, &input, staged.path())?;
        self.encode("Optimize", staged, args).await
    }
}
