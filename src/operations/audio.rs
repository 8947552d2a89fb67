use std::path::{Path, PathBuf};

use crate::codec::AudioCodec;
use crate::error::{MediaError, Result};
use crate::media::{ArgumentBuilder, ArgumentList};
use crate::output::Outcome;
use crate::quality::{audio_args, Bitrate};
use crate::toolkit::{require_input, Toolkit};

pub const SAMPLE_RATES: [u32; 9] = [8000, 11025, 16000, 22050, 32000, 44100, 48000, 88200, 96000];
pub const MAX_CHANNELS: u8 = 8;

#[derive(Debug, Clone, Default)]
pub struct ExtractAudioRequest {
    pub input: PathBuf,
    pub output: PathBuf,
    /// Inferred from the output extension when absent.
    pub codec: Option<AudioCodec>,
    pub bitrate: Option<Bitrate>,
    pub sample_rate: Option<u32>,
    pub channels: Option<u8>,
    /// Which audio stream to take (0 is the first).
    pub stream: usize,
    pub overwrite: bool,
}

impl ExtractAudioRequest {
    pub fn new<P: AsRef<Path>, Q: AsRef<Path>>(input: P, output: Q) -> Self {
        Self {
            input: input.as_ref().to_path_buf(),
            output: output.as_ref().to_path_buf(),
            ..Self::default()
        }
    }
}

pub fn build_args(request: &ExtractAudioRequest, input: &Path, output: &Path) -> Result<ArgumentList> {
    let codec = match request.codec {
        Some(codec) => codec,
        None => AudioCodec::for_extension(&request.output).ok_or_else(|| {
            MediaError::Validation(format!(
                "cannot infer an audio codec from '{}'; specify one",
                request.output.display()
            ))
        })?,
    };

    if request.bitrate.is_some() && !codec.accepts_bitrate() {
        return Err(MediaError::Validation(format!(
            "audio codec {} does not take a bitrate",
            codec
        )));
    }

    let mut builder = ArgumentBuilder::ffmpeg()
        .input_path(input)
        .map(format!("0:a:{}", request.stream))
        .no_video()
        .codec(audio_args(codec, request.bitrate.as_ref()));

    if let Some(rate) = request.sample_rate {
        if codec == AudioCodec::Copy {
            return Err(MediaError::Validation(
                "sample rate cannot change when copying the stream".to_string(),
            ));
        }
        if !SAMPLE_RATES.contains(&rate) {
            let allowed: Vec<String> = SAMPLE_RATES.iter().map(|r| r.to_string()).collect();
            return Err(MediaError::Validation(format!(
                "Invalid sample rate {}. Valid rates: {}",
                rate,
                allowed.join(", ")
            )));
        }
        builder = builder.codec(["-ar".to_string(), rate.to_string()]);
    }

    if let Some(channels) = request.channels {
        if codec == AudioCodec::Copy {
            return Err(MediaError::Validation(
                "channel count cannot change when copying the stream".to_string(),
            ));
        }
        if channels == 0 || channels > MAX_CHANNELS {
            return Err(MediaError::Validation(format!(
                "channels must be between 1 and {}, got {}",
                MAX_CHANNELS, channels
            )));
        }
        builder = builder.codec(["-ac".to_string(), channels.to_string()]);
    }

    Ok(builder.build(output))
}

impl Toolkit {
    /// Write one audio stream of `input` to its own file.
    pub async fn extract_audio(&self, request: &ExtractAudioRequest) -> Result<Outcome> {
        let input = require_input(&request.input)?;
        let staged = self.stage(&request.output, request.overwrite);
        let args = build_args(request, &input, staged.path())?;

        self.encode("Extract audio", staged, args).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codec_inferred_from_extension() {
        let request = ExtractAudioRequest::new("talk.mp4", "talk.mp3");
        let args = build_args(&request, Path::new("/talk.mp4"), Path::new("/.talk.part.mp3")).unwrap();
        assert_eq!(
            args.tokens(),
            [
                "-hide_banner", "-nostdin", "-y",
                "-i", "/talk.mp4",
                "-map", "0:a:0",
                "-vn", "-c:a", "libmp3lame",
                "/.talk.part.mp3",
            ]
        );
    }

    #[test]
    fn test_unknown_extension_needs_codec() {
        let request = ExtractAudioRequest::new("talk.mp4", "talk.xyz");
        assert!(build_args(&request, Path::new("in"), Path::new("out")).unwrap_err().is_validation());

        let mut request = ExtractAudioRequest::new("talk.mp4", "talk.xyz");
        request.codec = Some(AudioCodec::Opus);
        assert!(build_args(&request, Path::new("in"), Path::new("out")).is_ok());
    }

    #[test]
    fn test_resampling_options() {
        let mut request = ExtractAudioRequest::new("in.mkv", "out.m4a");
        request.bitrate = Some("160k".parse().unwrap());
        request.sample_rate = Some(44_100);
        request.channels = Some(1);
        request.stream = 2;

        let args = build_args(&request, Path::new("in"), Path::new("out")).unwrap();
        assert_eq!(args.value_of("-map"), Some("0:a:2"));
        assert_eq!(args.value_of("-c:a"), Some("aac"));
        assert_eq!(args.value_of("-b:a"), Some("160k"));
        assert_eq!(args.value_of("-ar"), Some("44100"));
        assert_eq!(args.value_of("-ac"), Some("1"));
    }

    #[test]
    fn test_invalid_options() {
        let mut request = ExtractAudioRequest::new("in.mkv", "out.wav");
        request.sample_rate = Some(12_345);
        assert!(build_args(&request, Path::new("in"), Path::new("out")).is_err());

        let mut request = ExtractAudioRequest::new("in.mkv", "out.wav");
        request.channels = Some(9);
        assert!(build_args(&request, Path::new("in"), Path::new("out")).is_err());

        let mut request = ExtractAudioRequest::new("in.mkv", "out.flac");
        request.bitrate = Some("320k".parse().unwrap());
        assert!(build_args(&request, Path::new("in"), Path::new("out")).is_err());
    }

    #[tokio::test]
    async fn test_missing_input_spawns_nothing() {
        let temp = assert_fs::TempDir::new().unwrap();
        let request = ExtractAudioRequest::new(temp.path().join("absent.mp4"), temp.path().join("track.mp3"));
        let toolkit = crate::toolkit::testing::toolkit(crate::media::MockToolRunner::new());
        let err = toolkit.extract_audio(&request).await.unwrap_err();
        assert!(err.is_precondition());
    }
}
