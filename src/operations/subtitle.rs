use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::codec::{extension_of, is_mp4_family};
use crate::error::{MediaError, Result};
use crate::media::filter::{escape_filter_path, escape_filter_value};
use crate::media::{ArgumentBuilder, ArgumentList};
use crate::output::Outcome;
use crate::toolkit::{require_input, Toolkit};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SubtitleMode {
    /// Render the text into the picture; needs a video re-encode.
    #[default]
    Burn,
    /// Add a selectable subtitle stream; everything else is copied.
    Embed,
}

impl FromStr for SubtitleMode {
    type Err = MediaError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "burn" | "hard" => Ok(SubtitleMode::Burn),
            "embed" | "soft" => Ok(SubtitleMode::Embed),
            _ => Err(MediaError::Validation(format!(
                "Invalid subtitle mode '{}'. Valid modes: burn, embed",
                s
            ))),
        }
    }
}

impl fmt::Display for SubtitleMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubtitleMode::Burn => f.write_str("burn"),
            SubtitleMode::Embed => f.write_str("embed"),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SubtitleRequest {
    pub input: PathBuf,
    pub output: PathBuf,
    pub subtitles: PathBuf,
    pub mode: SubtitleMode,
    /// ISO 639-2 code such as `eng`, stored on the embedded stream.
    pub language: Option<String>,
    /// ASS `force_style` override for burned subtitles, e.g. `FontSize=24`.
    pub style: Option<String>,
    pub overwrite: bool,
}

impl SubtitleRequest {
    pub fn new<P: AsRef<Path>, Q: AsRef<Path>, S: AsRef<Path>>(input: P, subtitles: S, output: Q) -> Self {
        Self {
            input: input.as_ref().to_path_buf(),
            output: output.as_ref().to_path_buf(),
            subtitles: subtitles.as_ref().to_path_buf(),
            ..Self::default()
        }
    }
}

/// `subtitles=filename=...[:force_style=...]` with both levels escaped.
pub fn burn_filter(subtitles: &Path, style: Option<&str>) -> String {
    let mut filter = format!("subtitles=filename={}", escape_filter_path(subtitles));
    if let Some(style) = style {
        filter.push_str(":force_style=");
        filter.push_str(&escape_filter_value(style));
    }
    filter
}

/// Subtitle codec the output container can carry.
pub fn embedded_codec(output: &Path) -> Result<&'static str> {
    if is_mp4_family(output) {
        return Ok("mov_text");
    }
    match extension_of(output).as_deref() {
        Some("webm") => Ok("webvtt"),
        Some("mkv") | Some("mka") => Ok("copy"),
        other => Err(MediaError::Validation(format!(
            "container '{}' cannot carry an embedded subtitle stream; use mp4, mov, mkv or webm",
            other.unwrap_or("")
        ))),
    }
}

fn check_language(language: &str) -> Result<()> {
    if language.len() != 3 || !language.bytes().all(|b| b.is_ascii_lowercase()) {
        return Err(MediaError::Validation(format!(
            "language must be a three-letter lowercase ISO 639-2 code, got '{}'",
            language
        )));
    }
    Ok(())
}

pub fn build_args(
    request: &SubtitleRequest,
    input: &Path,
    subtitles: &Path,
    output: &Path,
) -> Result<ArgumentList> {
    match request.mode {
        SubtitleMode::Burn => {
            if request.language.is_some() {
                return Err(MediaError::Validation(
                    "a language only applies to embedded subtitles".to_string(),
                ));
            }
            Ok(ArgumentBuilder::ffmpeg()
                .input_path(input)
                .video_filter(burn_filter(subtitles, request.style.as_deref()))
                .audio_codec("copy")
                .build(output))
        }
        SubtitleMode::Embed => {
            if request.style.is_some() {
                return Err(MediaError::Validation(
                    "a style only applies to burned subtitles".to_string(),
                ));
            }
            let codec = embedded_codec(&request.output)?;
            let mut builder = ArgumentBuilder::ffmpeg()
                .input_path(input)
                .input_path(subtitles)
                .map("0")
                .map("1")
                .copy_all()
                .codec(["-c:s", codec]);
            if let Some(language) = &request.language {
                check_language(language)?;
                builder = builder.stream_metadata("s:s:0", "language", language);
            }
            Ok(builder.build(output))
        }
    }
}

impl Toolkit {
    /// Burn or embed a subtitle file.
    pub async fn subtitle(&self, request: &SubtitleRequest) -> Result<Outcome> {
        let input = require_input(&request.input)?;
        let subtitles = require_input(&request.subtitles)?;
        let staged = self.stage(&request.output, request.overwrite);
        let args = build_args(request, &input, &subtitles, staged.path())?;

        self.encode("Subtitle", staged, args).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::MockToolRunner;
    use crate::toolkit::testing;

    #[test]
    fn test_burn_filter_escapes_path_and_style() {
        assert_eq!(
            burn_filter(Path::new("/media/Show: Part 1, 'Pilot'.srt"), None),
            r"subtitles=filename=/media/Show\\: Part 1\, \\\'Pilot\\\'.srt"
        );
        assert_eq!(
            burn_filter(Path::new("/subs/a.ass"), Some("FontName=Arial,FontSize=24")),
            r"subtitles=filename=/subs/a.ass:force_style=FontName=Arial\,FontSize=24"
        );
    }

    #[test]
    fn test_burn_args() {
        let request = SubtitleRequest::new("in.mp4", "subs.srt", "out.mp4");
        let args = build_args(&request, Path::new("/in.mp4"), Path::new("/subs.srt"), Path::new("/out.mp4")).unwrap();
        assert_eq!(args.value_of("-vf"), Some("subtitles=filename=/subs.srt"));
        assert_eq!(args.value_of("-c:a"), Some("copy"));
        assert_eq!(args.values_of("-i"), vec!["/in.mp4"]);
    }

    #[test]
    fn test_embed_args_by_container() {
        let mut request = SubtitleRequest::new("in.mp4", "subs.srt", "out.mp4");
        request.mode = SubtitleMode::Embed;
        request.language = Some("eng".to_string());

        let args = build_args(&request, Path::new("/in.mp4"), Path::new("/subs.srt"), Path::new("/out.mp4")).unwrap();
        assert_eq!(
            args.tokens(),
            [
                "-hide_banner", "-nostdin", "-y",
                "-i", "/in.mp4", "-i", "/subs.srt",
                "-map", "0", "-map", "1",
                "-c", "copy", "-c:s", "mov_text",
                "-metadata:s:s:0", "language=eng",
                "/out.mp4",
            ]
        );

        assert_eq!(embedded_codec(Path::new("a.webm")).unwrap(), "webvtt");
        assert_eq!(embedded_codec(Path::new("a.MKV")).unwrap(), "copy");
        assert!(embedded_codec(Path::new("a.avi")).is_err());
    }

    #[test]
    fn test_language_validation() {
        let mut request = SubtitleRequest::new("in.mkv", "subs.srt", "out.mkv");
        request.mode = SubtitleMode::Embed;
        for bad in ["en", "english", "ENG", "e1g"] {
            request.language = Some(bad.to_string());
            assert!(build_args(&request, Path::new("in"), Path::new("s"), Path::new("out")).is_err(), "{}", bad);
        }
    }

    #[tokio::test]
    async fn test_missing_subtitle_file_spawns_nothing() {
        let temp = assert_fs::TempDir::new().unwrap();
        let input = temp.path().join("in.mp4");
        std::fs::write(&input, b"x").unwrap();

        let request = SubtitleRequest::new(&input, temp.path().join("absent.srt"), temp.path().join("out.mp4"));
        let err = testing::toolkit(MockToolRunner::new())
            .subtitle(&request)
            .await
            .unwrap_err();
        assert!(matches!(err, MediaError::FileNotFound(_)));
    }
}
