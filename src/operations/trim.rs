use std::path::{Path, PathBuf};

use crate::codec::{AudioCodec, VideoCodec};
use crate::error::{MediaError, Result};
use crate::media::{ArgumentBuilder, ArgumentList, InputSpec};
use crate::output::Outcome;
use crate::quality::{audio_args, QualityOptions};
use crate::time::TimeRange;
use crate::toolkit::{require_input, Toolkit};

#[derive(Debug, Clone)]
pub struct TrimRequest {
    pub input: PathBuf,
    pub output: PathBuf,
    pub range: TimeRange,
    /// Seek before opening the input. Fast, but snaps to the previous keyframe
    /// when streams are copied.
    pub fast_seek: bool,
    /// Re-encode instead of stream copy; gives frame-exact cuts.
    pub reencode: bool,
    pub video_codec: Option<VideoCodec>,
    pub audio_codec: Option<AudioCodec>,
    pub quality: QualityOptions,
    pub overwrite: bool,
}

impl TrimRequest {
    pub fn new<P: AsRef<Path>, Q: AsRef<Path>>(input: P, output: Q, range: TimeRange) -> Self {
        Self {
            input: input.as_ref().to_path_buf(),
            output: output.as_ref().to_path_buf(),
            range,
            fast_seek: true,
            reencode: false,
            video_codec: None,
            audio_codec: None,
            quality: QualityOptions::default(),
            overwrite: false,
        }
    }
}

pub fn build_args(request: &TrimRequest, input: &Path, output: &Path) -> Result<ArgumentList> {
    let range = &request.range;
    if !range.has_start() && range.duration.is_none() {
        return Err(MediaError::Validation(
            "trim needs a start time, an end time or a duration".to_string(),
        ));
    }

    let start = range.start.to_ffmpeg();
    let mut builder = if request.fast_seek && range.has_start() {
        ArgumentBuilder::ffmpeg().input(InputSpec::new(input).seek(&start))
    } else {
        let builder = ArgumentBuilder::ffmpeg().input_path(input);
        if range.has_start() {
            builder.accurate_seek(&start)
        } else {
            builder
        }
    };

    if let Some(duration) = range.duration {
        builder = builder.duration(&duration.to_ffmpeg());
    }

    if request.reencode {
        let video = request.video_codec.unwrap_or(VideoCodec::H264);
        let audio = request.audio_codec.unwrap_or(AudioCodec::Aac);
        builder = builder
            .codec(request.quality.resolve(video)?.video_args())
            .codec(audio_args(audio, request.quality.resolve_audio(audio)?.as_ref()));
    } else {
        if request.video_codec.is_some() || request.audio_codec.is_some() || !request.quality.is_empty() {
            return Err(MediaError::Validation(
                "codec and quality settings need re-encoding".to_string(),
            ));
        }
        builder = builder
            .copy_all()
            .output_option(["-avoid_negative_ts", "make_zero"]);
    }

    Ok(builder.build(output))
}

impl Toolkit {
    /// Cut a time range out of `input`.
    pub async fn trim(&self, request: &TrimRequest) -> Result<Outcome> {
        let input = require_input(&request.input)?;
        let staged = self.stage(&request.output, request.overwrite);
        let args = build_args(request, &input, staged.path())?;

        self.encode("Trim", staged, args).await
    }
}
