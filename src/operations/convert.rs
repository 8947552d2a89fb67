use std::path::{Path, PathBuf};

use crate::codec::{is_mp4_family, AudioCodec, VideoCodec};
use crate::error::{MediaError, Result};
use crate::media::{ArgumentBuilder, ArgumentList};
use crate::output::Outcome;
use crate::quality::{audio_args, QualityOptions};
use crate::toolkit::{require_input, Toolkit};

/// Transcode or remux one file.
#[derive(Debug, Clone, Default)]
pub struct ConvertRequest {
    pub input: PathBuf,
    pub output: PathBuf,
    /// Encoder for the video stream; ffmpeg's default for the container when absent
    pub video_codec: Option<VideoCodec>,
    pub audio_codec: Option<AudioCodec>,
    pub quality: QualityOptions,
    pub no_video: bool,
    pub no_audio: bool,
    /// Force the container format (`-f`) instead of inferring it from the extension
    pub format: Option<String>,
    /// Move the MP4 index to the front for progressive playback
    pub faststart: bool,
    pub overwrite: bool,
}

impl ConvertRequest {
    pub fn new<P: AsRef<Path>, Q: AsRef<Path>>(input: P, output: Q) -> Self {
        Self {
            input: input.as_ref().to_path_buf(),
            output: output.as_ref().to_path_buf(),
            ..Self::default()
        }
    }
}

pub fn build_args(request: &ConvertRequest, input: &Path, output: &Path) -> Result<ArgumentList> {
    if request.no_video && request.no_audio {
        return Err(MediaError::Validation(
            "cannot drop both video and audio streams".to_string(),
        ));
    }
    if request.no_video && request.video_codec.is_some() {
        return Err(MediaError::Validation(
            "a video codec was given but video is disabled".to_string(),
        ));
    }
    if request.no_audio && request.audio_codec.is_some() {
        return Err(MediaError::Validation(
            "an audio codec was given but audio is disabled".to_string(),
        ));
    }

    let mut builder = ArgumentBuilder::ffmpeg().input_path(input);

    if request.no_video {
        builder = builder.no_video();
    } else if let Some(codec) = request.video_codec {
        builder = builder.codec(request.quality.resolve(codec)?.video_args());
    } else if request.quality.crf.is_some() || request.quality.video_bitrate.is_some() {
        return Err(MediaError::Validation(
            "explicit video quality needs a video codec".to_string(),
        ));
    }

    if request.no_audio {
        builder = builder.no_audio();
    } else if let Some(codec) = request.audio_codec {
        let bitrate = request.quality.resolve_audio(codec)?;
        builder = builder.codec(audio_args(codec, bitrate.as_ref()));
    } else if let Some(bitrate) = &request.quality.audio_bitrate {
        builder = builder.codec(["-b:a".to_string(), bitrate.to_string()]);
    }

    if let Some(format) = &request.format {
        let format = format.trim();
        if format.is_empty() || !format.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_') {
            return Err(MediaError::Validation(format!("invalid container format '{}'", format)));
        }
        builder = builder.output_option(["-f", format]);
    }

    if request.faststart {
        if !is_mp4_family(&request.output) {
            return Err(MediaError::Validation(
                "faststart only applies to MP4/MOV outputs".to_string(),
            ));
        }
        builder = builder.output_option(["-movflags", "+faststart"]);
    }

    Ok(builder.build(output))
}

impl Toolkit {
    /// Convert `input` to the container/codecs described by the request.
    pub async fn convert(&self, request: &ConvertRequest) -> Result<Outcome> {
        let input = require_input(&request.input)?;
        let staged = self.stage(&request.output, request.overwrite);
        let args = build_args(request, &input, staged.path())?;

        self.encode("Convert", staged, args).await
    }
}
