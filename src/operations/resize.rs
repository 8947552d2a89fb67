use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::codec::VideoCodec;
use crate::error::{MediaError, Result};
use crate::media::filter::FilterChain;
use crate::media::{ArgumentBuilder, ArgumentList};
use crate::output::Outcome;
use crate::quality::QualityOptions;
use crate::toolkit::{require_input, Toolkit};

/// Largest dimension ffmpeg's encoders are asked to produce.
pub const MAX_DIMENSION: u32 = 16_384;

/// swscale interpolation used by the `scale` filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScaleAlgorithm {
    FastBilinear,
    Bilinear,
    #[default]
    Bicubic,
    Lanczos,
    Spline,
    Neighbor,
}

impl ScaleAlgorithm {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScaleAlgorithm::FastBilinear => "fast_bilinear",
            ScaleAlgorithm::Bilinear => "bilinear",
            ScaleAlgorithm::Bicubic => "bicubic",
            ScaleAlgorithm::Lanczos => "lanczos",
            ScaleAlgorithm::Spline => "spline",
            ScaleAlgorithm::Neighbor => "neighbor",
        }
    }
}

impl FromStr for ScaleAlgorithm {
    type Err = MediaError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "fast_bilinear" => Ok(ScaleAlgorithm::FastBilinear),
            "bilinear" => Ok(ScaleAlgorithm::Bilinear),
            "bicubic" => Ok(ScaleAlgorithm::Bicubic),
            "lanczos" => Ok(ScaleAlgorithm::Lanczos),
            "spline" => Ok(ScaleAlgorithm::Spline),
            "neighbor" | "nearest" => Ok(ScaleAlgorithm::Neighbor),
            _ => Err(MediaError::Validation(format!(
                "Invalid scale algorithm '{}'. Valid algorithms: fast_bilinear, bilinear, bicubic, lanczos, spline, neighbor",
                s
            ))),
        }
    }
}

impl fmt::Display for ScaleAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default)]
pub struct ResizeRequest {
    pub input: PathBuf,
    pub output: PathBuf,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub algorithm: ScaleAlgorithm,
    /// Fit inside WxH and letterbox to exactly WxH. Needs both dimensions.
    pub pad: bool,
    pub video_codec: Option<VideoCodec>,
    pub quality: QualityOptions,
    pub overwrite: bool,
}

impl ResizeRequest {
    pub fn new<P: AsRef<Path>, Q: AsRef<Path>>(input: P, output: Q) -> Self {
        Self {
            input: input.as_ref().to_path_buf(),
            output: output.as_ref().to_path_buf(),
            ..Self::default()
        }
    }
}

fn check_dimension(name: &str, value: Option<u32>) -> Result<()> {
    match value {
        Some(v) if v == 0 || v > MAX_DIMENSION => Err(MediaError::Validation(format!(
            "{} must be between 1 and {}, got {}",
            name, MAX_DIMENSION, v
        ))),
        _ => Ok(()),
    }
}

/// The `scale` (and optional `pad`) filter chain for a resize.
pub fn scale_filter(
    width: Option<u32>,
    height: Option<u32>,
    algorithm: ScaleAlgorithm,
    pad: bool,
) -> Result<String> {
    if width.is_none() && height.is_none() {
        return Err(MediaError::Validation(
            "at least one of width or height is required".to_string(),
        ));
    }
    check_dimension("width", width)?;
    check_dimension("height", height)?;

    // -2 keeps the aspect ratio and rounds to an even size, which yuv420p encoders need.
    let w = width.map(|w| w.to_string()).unwrap_or_else(|| "-2".to_string());
    let h = height.map(|h| h.to_string()).unwrap_or_else(|| "-2".to_string());

    let chain = if pad {
        let (Some(width), Some(height)) = (width, height) else {
            return Err(MediaError::Validation(
                "padding needs both width and height".to_string(),
            ));
        };
        FilterChain::new()
            .push(format!(
                "scale={}:{}:flags={}:force_original_aspect_ratio=decrease",
                width, height, algorithm
            ))
            .push(format!("pad={}:{}:(ow-iw)/2:(oh-ih)/2", width, height))
    } else {
        FilterChain::new().push(format!("scale={}:{}:flags={}", w, h, algorithm))
    };

    Ok(chain.render())
}

pub fn build_args(request: &ResizeRequest, input: &Path, output: &Path) -> Result<ArgumentList> {
    let filter = scale_filter(request.width, request.height, request.algorithm, request.pad)?;

    if request.video_codec == Some(VideoCodec::Copy) {
        return Err(MediaError::Validation(
            "resizing requires re-encoding; video copy is not possible".to_string(),
        ));
    }

    let mut builder = ArgumentBuilder::ffmpeg().input_path(input).video_filter(filter);

    let codec = request.video_codec.or_else(|| {
        // Quality settings without a codec apply to the default encoder.
        (!request.quality.is_empty()).then_some(VideoCodec::H264)
    });
    if let Some(codec) = codec {
        builder = builder.codec(request.quality.resolve(codec)?.video_args());
    }

    Ok(builder.audio_codec("copy").build(output))
}

impl Toolkit {
    /// Scale the video stream, copying audio untouched.
    pub async fn resize(&self, request: &ResizeRequest) -> Result<Outcome> {
        let input = require_input(&request.input)?;
        let staged = self.stage(&request.output, request.overwrite);
        let args = build_args(request, &input, staged.path())?;

        self.encode("Resize", staged, args).await
    }
}
