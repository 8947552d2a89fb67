use std::path::{Path, PathBuf};
use tracing::debug;

use crate::codec::{AudioCodec, VideoCodec};
use crate::error::{MediaError, Result};
use crate::media::{ArgumentBuilder, ArgumentList, InputSpec};
use crate::output::{may_write, Outcome};
use crate::quality::{audio_args, QualityOptions};
use crate::toolkit::{require_input, Toolkit};

const MIN_INPUTS: usize = 2;

/// Concatenate inputs end to end.
#[derive(Debug, Clone, Default)]
pub struct MergeRequest {
    pub inputs: Vec<PathBuf>,
    pub output: PathBuf,
    /// Decode and re-encode through the concat filter. Needed when the
    /// inputs differ in codec parameters; stream copy needs them identical.
    pub reencode: bool,
    /// Concatenate audio as well as video (re-encode mode only).
    pub include_audio: bool,
    pub video_codec: Option<VideoCodec>,
    pub audio_codec: Option<AudioCodec>,
    pub quality: QualityOptions,
    pub overwrite: bool,
}

impl MergeRequest {
    pub fn new<P: AsRef<Path>>(inputs: Vec<PathBuf>, output: P) -> Self {
        Self {
            inputs,
            output: output.as_ref().to_path_buf(),
            include_audio: true,
            ..Self::default()
        }
    }
}

/// Concat demuxer list: one `file '<path>'` line per input, in order.
pub fn concat_list(inputs: &[PathBuf]) -> String {
    inputs
        .iter()
        .map(|path| {
            let quoted = path.to_string_lossy().replace('\'', r"'\''");
            format!("file '{}'\n", quoted)
        })
        .collect()
}

/// Concat filter graph with one `[i:v]` (and `[i:a]`) pad group per input, in order.
pub fn concat_filter(count: usize, include_audio: bool) -> String {
    let pads: String = (0..count)
        .map(|i| {
            if include_audio {
                format!("[{}:v][{}:a]", i, i)
            } else {
                format!("[{}:v]", i)
            }
        })
        .collect();

    if include_audio {
        format!("{}concat=n={}:v=1:a=1[outv][outa]", pads, count)
    } else {
        format!("{}concat=n={}:v=1:a=0[outv]", pads, count)
    }
}

fn check_count(inputs: &[PathBuf]) -> Result<()> {
    if inputs.len() < MIN_INPUTS {
        return Err(MediaError::InsufficientInputs {
            required: MIN_INPUTS,
            actual: inputs.len(),
        });
    }
    Ok(())
}

fn check_copy(request: &MergeRequest) -> Result<()> {
    if request.video_codec.is_some() || request.audio_codec.is_some() || !request.quality.is_empty() {
        return Err(MediaError::Validation(
            "codec and quality settings need re-encoding".to_string(),
        ));
    }
    Ok(())
}

/// Stream-copy arguments reading the concat list at `list`.
pub fn copy_args(request: &MergeRequest, list: &Path, output: &Path) -> Result<ArgumentList> {
    check_copy(request)?;
    Ok(ArgumentBuilder::ffmpeg()
        .input(InputSpec::new(list).format("concat").options(["-safe", "0"]))
        .copy_all()
        .build(output))
}

/// Concat-filter arguments over the resolved `inputs`.
pub fn reencode_args(request: &MergeRequest, inputs: &[PathBuf], output: &Path) -> Result<ArgumentList> {
    check_count(inputs)?;

    let mut builder = inputs
        .iter()
        .fold(ArgumentBuilder::ffmpeg(), |builder, input| builder.input_path(input))
        .filter_complex(concat_filter(inputs.len(), request.include_audio))
        .map("[outv]");

    let video = request.video_codec.unwrap_or(VideoCodec::H264);
    builder = builder.codec(request.quality.resolve(video)?.video_args());

    if request.include_audio {
        let audio = request.audio_codec.unwrap_or(AudioCodec::Aac);
        builder = builder
            .map("[outa]")
            .codec(audio_args(audio, request.quality.resolve_audio(audio)?.as_ref()));
    } else if request.audio_codec.is_some() {
        return Err(MediaError::Validation(
            "an audio codec was given but audio is excluded".to_string(),
        ));
    }

    Ok(builder.build(output))
}

impl Toolkit {
    /// Join two or more files into one.
    pub async fn merge(&self, request: &MergeRequest) -> Result<Outcome> {
        check_count(&request.inputs)?;
        let inputs = request
            .inputs
            .iter()
            .map(|input| require_input(input))
            .collect::<Result<Vec<_>>>()?;

        let staged = self.stage(&request.output, request.overwrite);

        if request.reencode {
            let args = reencode_args(request, &inputs, staged.path())?;
            return self.encode("Merge", staged, args).await;
        }

        check_copy(request)?;
        if !may_write(staged.target(), staged.overwrite()) {
            return Ok(Outcome::skipped(staged.target()));
        }

        let list = self.temp_file("concat-", ".txt")?;
        tokio::fs::write(&list, concat_list(&inputs)).await?;
        debug!("Concat list {} with {} entries", list.display(), inputs.len());
        let args = copy_args(request, &list, staged.path())?;

        // `list` lives until the end of this scope, past the subprocess.
        self.encode("Merge", staged, args).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::MockToolRunner;
    use crate::toolkit::testing;
    use std::sync::{Arc, Mutex};

    #[test]
    fn test_concat_list_one_line_per_input_in_order() {
        let inputs = vec![
            PathBuf::from("/v/b.mp4"),
            PathBuf::from("/v/a.mp4"),
            PathBuf::from("/v/it's.mp4"),
        ];
        assert_eq!(
            concat_list(&inputs),
            "file '/v/b.mp4'\nfile '/v/a.mp4'\nfile '/v/it'\\''s.mp4'\n"
        );
    }

    #[test]
    fn test_concat_filter() {
        assert_eq!(
            concat_filter(3, true),
            "[0:v][0:a][1:v][1:a][2:v][2:a]concat=n=3:v=1:a=1[outv][outa]"
        );
        assert_eq!(concat_filter(2, false), "[0:v][1:v]concat=n=2:v=1:a=0[outv]");
    }

    #[test]
    fn test_reencode_args_map_filter_outputs() {
        let inputs = vec![PathBuf::from("/a.mp4"), PathBuf::from("/b.mp4")];
        let mut request = MergeRequest::new(inputs.clone(), "out.mp4");
        request.reencode = true;

        let args = reencode_args(&request, &inputs, Path::new("/out.mp4")).unwrap();
        assert_eq!(args.values_of("-i"), vec!["/a.mp4", "/b.mp4"]);
        assert_eq!(args.values_of("-map"), vec!["[outv]", "[outa]"]);
        assert_eq!(args.value_of("-c:v"), Some("libx264"));
        assert_eq!(args.value_of("-c:a"), Some("aac"));
    }

    #[test]
    fn test_copy_args() {
        let request = MergeRequest::new(vec![], "out.mkv");
        let args = copy_args(&request, Path::new("/tmp/list.txt"), Path::new("/out.mkv")).unwrap();
        assert_eq!(
            args.tokens(),
            [
                "-hide_banner", "-nostdin", "-y",
                "-f", "concat", "-safe", "0", "-i", "/tmp/list.txt",
                "-c", "copy",
                "/out.mkv",
            ]
        );
    }

    #[tokio::test]
    async fn test_single_input_rejected_before_spawn() {
        let temp = assert_fs::TempDir::new().unwrap();
        let input = temp.path().join("only.mp4");
        std::fs::write(&input, b"x").unwrap();

        let request = MergeRequest::new(vec![input], temp.path().join("out.mp4"));
        let err = testing::toolkit(MockToolRunner::new())
            .merge(&request)
            .await
            .unwrap_err();
        assert!(matches!(err, MediaError::InsufficientInputs { required: 2, actual: 1 }));
        assert!(err.to_string().contains("At least 2 inputs required"));
    }

    #[tokio::test]
    async fn test_concat_list_written_and_removed() {
        let temp = assert_fs::TempDir::new().unwrap();
        let names = ["one.mp4", "two.mp4", "three.mp4"];
        let inputs: Vec<PathBuf> = names.iter().map(|n| temp.path().join(n)).collect();
        for input in &inputs {
            std::fs::write(input, b"x").unwrap();
        }

        let seen = Arc::new(Mutex::new(None::<(PathBuf, String)>));
        let recorder = seen.clone();

        let mut runner = MockToolRunner::new();
        testing::tools_available(&mut runner);
        runner.expect_run().times(1).returning(move |_, args| {
            let list = PathBuf::from(args.value_of("-i").unwrap());
            let content = std::fs::read_to_string(&list).unwrap();
            *recorder.lock().unwrap() = Some((list, content));
            testing::write_output(args)
        });

        let mut config = crate::config::Config::default();
        config.output.temp_dir = Some(temp.path().join("tmp"));
        let toolkit = Toolkit::new(config, Arc::new(runner));

        let outcome = toolkit
            .merge(&MergeRequest::new(inputs.clone(), temp.path().join("all.mp4")))
            .await
            .unwrap();
        assert!(!outcome.is_skipped());

        let (list, content) = seen.lock().unwrap().take().unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 3);
        for (line, input) in lines.iter().zip(&inputs) {
            assert_eq!(*line, format!("file '{}'", input.display()));
        }
        assert!(!list.exists());
    }

    #[tokio::test]
    async fn test_missing_second_input_spawns_nothing() {
        let temp = assert_fs::TempDir::new().unwrap();
        let first = temp.path().join("a.mp4");
        std::fs::write(&first, b"a").unwrap();
        let request = MergeRequest::new(vec![first, temp.path().join("b.mp4")], temp.path().join("all.mp4"));

        let err = testing::toolkit(MockToolRunner::new()).merge(&request).await.unwrap_err();
        assert!(matches!(err, MediaError::FileNotFound(ref path) if path.ends_with("b.mp4")));
        assert!(!temp.path().join("all.mp4").exists());
    }

    #[tokio::test]
    async fn test_existing_output_skipped_without_writing_list() {
        let temp = assert_fs::TempDir::new().unwrap();
        let inputs: Vec<PathBuf> = ["a.mp4", "b.mp4"]
            .iter()
            .map(|name| {
                let path = temp.path().join(name);
                std::fs::write(&path, b"v").unwrap();
                path
            })
            .collect();
        let output = temp.path().join("all.mp4");
        std::fs::write(&output, b"old").unwrap();
        let before = std::fs::metadata(&output).unwrap().modified().unwrap();

        let mut config = crate::config::Config::default();
        config.output.temp_dir = Some(temp.path().join("tmp"));
        let toolkit = Toolkit::new(config, Arc::new(MockToolRunner::new()));

        let outcome = toolkit.merge(&MergeRequest::new(inputs, &output)).await.unwrap();
        assert!(outcome.is_skipped());
        assert_eq!(std::fs::read(&output).unwrap(), b"old");
        assert_eq!(std::fs::metadata(&output).unwrap().modified().unwrap(), before);
        assert!(!temp.path().join("tmp").exists());
    }
}
