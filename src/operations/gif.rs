use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::debug;

use super::resize::MAX_DIMENSION;
use crate::error::{MediaError, Result};
use crate::media::filter::{escape_option_value, FilterChain};
use crate::media::{ArgumentBuilder, ArgumentList, InputSpec, Tool};
use crate::output::{may_write, Outcome};
use crate::time::TimeRange;
use crate::toolkit::{require_input, Toolkit};

pub const DEFAULT_FPS: u32 = 10;
pub const DEFAULT_WIDTH: u32 = 480;

/// `paletteuse` dithering modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Dither {
    None,
    Bayer,
    Heckbert,
    FloydSteinberg,
    Sierra2,
    #[default]
    Sierra2_4a,
}

impl Dither {
    pub fn as_str(&self) -> &'static str {
        match self {
            Dither::None => "none",
            Dither::Bayer => "bayer",
            Dither::Heckbert => "heckbert",
            Dither::FloydSteinberg => "floyd_steinberg",
            Dither::Sierra2 => "sierra2",
            Dither::Sierra2_4a => "sierra2_4a",
        }
    }
}

impl FromStr for Dither {
    type Err = MediaError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "none" => Ok(Dither::None),
            "bayer" => Ok(Dither::Bayer),
            "heckbert" => Ok(Dither::Heckbert),
            "floyd_steinberg" => Ok(Dither::FloydSteinberg),
            "sierra2" => Ok(Dither::Sierra2),
            "sierra2_4a" => Ok(Dither::Sierra2_4a),
            _ => Err(MediaError::Validation(format!(
                "Invalid dither '{}'. Valid modes: none, bayer, heckbert, floyd_steinberg, sierra2, sierra2_4a",
                s
            ))),
        }
    }
}

impl fmt::Display for Dither {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct GifRequest {
    pub input: PathBuf,
    pub output: PathBuf,
    pub range: TimeRange,
    pub fps: u32,
    pub width: u32,
    pub max_colors: u16,
    pub dither: Dither,
    /// `0` loops forever, `-1` plays once, `N` repeats N times.
    pub loop_count: i32,
    /// Generate an optimised palette first (two ffmpeg runs).
    pub use_palette: bool,
    pub overwrite: bool,
}

impl GifRequest {
    pub fn new<P: AsRef<Path>, Q: AsRef<Path>>(input: P, output: Q) -> Self {
        Self {
            input: input.as_ref().to_path_buf(),
            output: output.as_ref().to_path_buf(),
            range: TimeRange::default(),
            fps: DEFAULT_FPS,
            width: DEFAULT_WIDTH,
            max_colors: 256,
            dither: Dither::default(),
            loop_count: 0,
            use_palette: true,
            overwrite: false,
        }
    }

    fn validate(&self) -> Result<()> {
        if !(1..=50).contains(&self.fps) {
            return Err(MediaError::Validation(format!(
                "fps must be between 1 and 50, got {}",
                self.fps
            )));
        }
        if self.width == 0 || self.width > MAX_DIMENSION {
            return Err(MediaError::Validation(format!(
                "width must be between 1 and {}, got {}",
                MAX_DIMENSION, self.width
            )));
        }
        if !(2..=256).contains(&self.max_colors) {
            return Err(MediaError::Validation(format!(
                "max colors must be between 2 and 256, got {}",
                self.max_colors
            )));
        }
        if self.loop_count < -1 {
            return Err(MediaError::Validation(format!(
                "loop must be -1 (once), 0 (forever) or a repeat count, got {}",
                self.loop_count
            )));
        }
        Ok(())
    }

    /// `fps,scale` shared by both stages.
    fn frame_filters(&self) -> FilterChain {
        FilterChain::new()
            .push(format!("fps={}", escape_option_value(&self.fps.to_string())))
            .push(format!(
                "scale={}:-1:flags=lanczos",
                escape_option_value(&self.width.to_string())
            ))
    }

    fn source(&self, input: &Path) -> InputSpec {
        let source = InputSpec::new(input);
        if self.range.has_start() {
            source.seek(&self.range.start.to_ffmpeg())
        } else {
            source
        }
    }

    fn limit(&self, builder: ArgumentBuilder) -> ArgumentBuilder {
        match self.range.duration {
            Some(duration) => builder.duration(&duration.to_ffmpeg()),
            None => builder,
        }
    }
}

/// Direct conversion without a palette.
pub fn single_stage_args(request: &GifRequest, input: &Path, output: &Path) -> Result<ArgumentList> {
    request.validate()?;
    let builder = ArgumentBuilder::ffmpeg()
        .input(request.source(input))
        .video_filter(request.frame_filters().render());
    Ok(request
        .limit(builder)
        .output_option(["-loop".to_string(), request.loop_count.to_string()])
        .build(output))
}

/// Stage one: analyse the clip and write a palette image.
pub fn palette_args(request: &GifRequest, input: &Path, palette: &Path) -> Result<ArgumentList> {
    request.validate()?;
    let filters = request.frame_filters().push(format!(
        "palettegen=max_colors={}",
        escape_option_value(&request.max_colors.to_string())
    ));
    let builder = ArgumentBuilder::ffmpeg()
        .input(request.source(input))
        .video_filter(filters.render());
    Ok(request
        .limit(builder)
        .output_option(["-update", "1"])
        .build(palette))
}

/// Stage two: encode the clip through the palette.
pub fn paletteuse_args(
    request: &GifRequest,
    input: &Path,
    palette: &Path,
    output: &Path,
) -> Result<ArgumentList> {
    request.validate()?;
    let graph = format!(
        "{}[x];[x][1:v]paletteuse=dither={}",
        request.frame_filters().render(),
        escape_option_value(request.dither.as_str())
    );
    let builder = ArgumentBuilder::ffmpeg()
        .input(request.source(input))
        .input_path(palette)
        .filter_complex(graph);
    Ok(request
        .limit(builder)
        .output_option(["-loop".to_string(), request.loop_count.to_string()])
        .build(output))
}

impl Toolkit {
    /// Render an animated GIF, optionally through a generated palette.
    pub async fn gif(&self, request: &GifRequest) -> Result<Outcome> {
        let input = require_input(&request.input)?;
        let staged = self.stage(&request.output, request.overwrite);

        if !request.use_palette {
            let args = single_stage_args(request, &input, staged.path())?;
            return self.encode("GIF", staged, args).await;
        }

        request.validate()?;
        if !may_write(staged.target(), staged.overwrite()) {
            return Ok(Outcome::skipped(staged.target()));
        }
        self.ensure_available(Tool::Ffmpeg).await?;

        // Removed when dropped, whichever way this function returns.
        let palette = self.temp_file("palette-", ".png")?;
        let args = palette_args(request, &input, &palette)?;
        self.run_tool(Tool::Ffmpeg, "GIF palette", &args).await?;
        debug!("Palette written to {}", palette.display());

        let args = paletteuse_args(request, &input, &palette, staged.path())?;
        self.encode("GIF", staged, args).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::media::{ExecutionResult, MockToolRunner};
    use crate::toolkit::testing;
    use std::sync::{Arc, Mutex};

    fn is_palette_stage(args: &ArgumentList) -> bool {
        args.tokens().iter().any(|t| t.contains("palettegen"))
    }

    #[test]
    fn test_palette_stages() {
        let mut request = GifRequest::new("in.mp4", "out.gif");
        request.range = TimeRange::from_parts(Some("2"), None, Some("3")).unwrap();
        request.max_colors = 128;
        request.dither = Dither::Bayer;

        let stage_one = palette_args(&request, Path::new("/in.mp4"), Path::new("/tmp/p.png")).unwrap();
        assert_eq!(
            stage_one.tokens(),
            [
                "-hide_banner", "-nostdin", "-y",
                "-ss", "2", "-i", "/in.mp4",
                "-t", "3",
                "-vf", "fps=10,scale=480:-1:flags=lanczos,palettegen=max_colors=128",
                "-update", "1",
                "/tmp/p.png",
            ]
        );

        let stage_two = paletteuse_args(&request, Path::new("/in.mp4"), Path::new("/tmp/p.png"), Path::new("/out.gif")).unwrap();
        assert_eq!(stage_two.values_of("-i"), vec!["/in.mp4", "/tmp/p.png"]);
        assert_eq!(
            stage_two.value_of("-filter_complex"),
            Some("fps=10,scale=480:-1:flags=lanczos[x];[x][1:v]paletteuse=dither=bayer")
        );
        assert_eq!(stage_two.value_of("-loop"), Some("0"));
    }

    #[test]
    fn test_single_stage() {
        let mut request = GifRequest::new("in.mp4", "out.gif");
        request.fps = 15;
        request.width = 320;
        request.loop_count = -1;
        request.use_palette = false;

        let args = single_stage_args(&request, Path::new("/in.mp4"), Path::new("/out.gif")).unwrap();
        assert_eq!(args.value_of("-vf"), Some("fps=15,scale=320:-1:flags=lanczos"));
        assert_eq!(args.value_of("-loop"), Some("-1"));
        assert!(!args.contains("-ss"));
    }

    #[test]
    fn test_bounds() {
        for mutate in [
            (|r: &mut GifRequest| r.fps = 0) as fn(&mut GifRequest),
            |r| r.fps = 51,
            |r| r.max_colors = 1,
            |r| r.max_colors = 257,
            |r| r.width = 0,
            |r| r.loop_count = -2,
        ] {
            let mut request = GifRequest::new("in.mp4", "out.gif");
            mutate(&mut request);
            assert!(single_stage_args(&request, Path::new("in"), Path::new("out")).is_err());
        }
    }

    fn palette_toolkit(temp: &Path, runner: MockToolRunner) -> Toolkit {
        let mut config = Config::default();
        config.output.temp_dir = Some(temp.join("tmp"));
        Toolkit::new(config, Arc::new(runner))
    }

    #[tokio::test]
    async fn test_palette_removed_after_success() {
        let temp = assert_fs::TempDir::new().unwrap();
        let input = temp.path().join("in.mp4");
        std::fs::write(&input, b"x").unwrap();

        let palette = Arc::new(Mutex::new(None::<PathBuf>));
        let recorder = palette.clone();

        let mut runner = MockToolRunner::new();
        testing::tools_available(&mut runner);
        runner
            .expect_run()
            .withf(|_, args| is_palette_stage(args))
            .times(1)
            .returning(move |_, args| {
                *recorder.lock().unwrap() = args.last().map(PathBuf::from);
                testing::write_output(args)
            });
        runner
            .expect_run()
            .withf(|_, args| !is_palette_stage(args))
            .times(1)
            .returning(|_, args| testing::write_output(args));

        let outcome = palette_toolkit(temp.path(), runner)
            .gif(&GifRequest::new(&input, temp.path().join("out.gif")))
            .await
            .unwrap();
        assert!(outcome.completed().is_some());

        let palette = palette.lock().unwrap().clone().unwrap();
        assert!(palette.starts_with(temp.path().join("tmp")));
        assert!(!palette.exists());
    }

    #[tokio::test]
    async fn test_palette_removed_after_failed_second_stage() {
        let temp = assert_fs::TempDir::new().unwrap();
        let input = temp.path().join("in.mp4");
        std::fs::write(&input, b"x").unwrap();

        let palette = Arc::new(Mutex::new(None::<PathBuf>));
        let recorder = palette.clone();

        let mut runner = MockToolRunner::new();
        testing::tools_available(&mut runner);
        runner
            .expect_run()
            .withf(|_, args| is_palette_stage(args))
            .times(1)
            .returning(move |_, args| {
                *recorder.lock().unwrap() = args.last().map(PathBuf::from);
                testing::write_output(args)
            });
        runner
            .expect_run()
            .withf(|_, args| !is_palette_stage(args))
            .times(1)
            .returning(|_, _| Ok(ExecutionResult::completed(1, "", "paletteuse: out of memory")));

        let err = palette_toolkit(temp.path(), runner)
            .gif(&GifRequest::new(&input, temp.path().join("out.gif")))
            .await
            .unwrap_err();
        assert!(matches!(err, MediaError::Execution { .. }));

        let palette = palette.lock().unwrap().clone().unwrap();
        assert!(!palette.exists());
        assert!(!temp.path().join("out.gif").exists());
    }

    #[tokio::test]
    async fn test_existing_output_skipped_before_palette() {
        let temp = assert_fs::TempDir::new().unwrap();
        let input = temp.path().join("in.mp4");
        let output = temp.path().join("out.gif");
        std::fs::write(&input, b"x").unwrap();
        std::fs::write(&output, b"old").unwrap();
        let before = std::fs::metadata(&output).unwrap().modified().unwrap();

        let mut config = Config::default();
        config.output.temp_dir = Some(temp.path().join("tmp"));
        let toolkit = Toolkit::new(config, Arc::new(MockToolRunner::new()));

        let outcome = toolkit.gif(&GifRequest::new(&input, &output)).await.unwrap();
        assert!(outcome.is_skipped());
        assert_eq!(std::fs::read(&output).unwrap(), b"old");
        assert_eq!(std::fs::metadata(&output).unwrap().modified().unwrap(), before);
        assert!(!temp.path().join("tmp").exists());
    }

    #[tokio::test]
    async fn test_missing_input_spawns_nothing() {
        let temp = assert_fs::TempDir::new().unwrap();
        let toolkit = testing::toolkit(MockToolRunner::new());
        let mut request = GifRequest::new(temp.path().join("absent.mp4"), temp.path().join("out.gif"));

        assert!(toolkit.gif(&request).await.unwrap_err().is_precondition());
        request.use_palette = false;
        assert!(toolkit.gif(&request).await.unwrap_err().is_precondition());
    }
}
