use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempPath;
use tokio::sync::OnceCell;
use tracing::{debug, info};

use crate::config::Config;
use crate::error::{MediaError, Result};
use crate::media::{ArgumentList, ExecutionResult, Tool, ToolRunner, ToolRunnerFactory};
use crate::output::{may_write, Outcome, StagedOutput};

/// Entry point for every media command.
///
/// Holds no per-command state: each command validates its request, builds
/// an argument list, and hands it to the injected [`ToolRunner`].
pub struct Toolkit {
    config: Config,
    runner: Arc<dyn ToolRunner>,
    ffmpeg_ready: OnceCell<bool>,
    ffprobe_ready: OnceCell<bool>,
}

impl Toolkit {
    pub fn new(config: Config, runner: Arc<dyn ToolRunner>) -> Self {
        Self {
            config,
            runner,
            ffmpeg_ready: OnceCell::new(),
            ffprobe_ready: OnceCell::new(),
        }
    }

    /// Toolkit backed by real ffmpeg/ffprobe processes.
    pub fn with_system_runner(config: Config) -> Self {
        let runner = ToolRunnerFactory::create_runner(config.tools.clone());
        Self::new(config, runner)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Whether `tool` can be run. Cached after the first check.
    pub async fn is_available(&self, tool: Tool) -> bool {
        let cell = match tool {
            Tool::Ffmpeg => &self.ffmpeg_ready,
            Tool::Ffprobe => &self.ffprobe_ready,
        };
        *cell
            .get_or_init(|| async {
                let available = self.runner.is_available(tool).await;
                debug!("{} available: {}", tool, available);
                available
            })
            .await
    }

    /// Precondition check raised before any command spawns `tool`.
    pub async fn ensure_available(&self, tool: Tool) -> Result<()> {
        if self.is_available(tool).await {
            Ok(())
        } else {
            let binary = match tool {
                Tool::Ffmpeg => &self.config.tools.ffmpeg,
                Tool::Ffprobe => &self.config.tools.ffprobe,
            };
            Err(MediaError::ToolUnavailable(format!(
                "{} (configured as '{}')",
                tool, binary
            )))
        }
    }

    /// Effective overwrite flag: the request's, or the configured default.
    pub(crate) fn overwrite(&self, requested: bool) -> bool {
        requested || self.config.output.overwrite
    }

    /// Plan the staging path for `output`.
    pub(crate) fn stage(&self, output: &Path, overwrite: bool) -> StagedOutput {
        StagedOutput::plan(output, self.overwrite(overwrite))
    }

    /// Run a tool and turn a non-zero exit into an execution error that
    /// carries the tool's own output.
    pub(crate) async fn run_tool(
        &self,
        tool: Tool,
        description: &str,
        args: &ArgumentList,
    ) -> Result<ExecutionResult> {
        debug!("{}: {} {}", description, tool, args);
        let result = self.runner.run(tool, args).await?;

        if !result.success() {
            return Err(MediaError::Execution {
                description: description.to_string(),
                code: result.code,
                output: result.combined_output(),
            });
        }

        Ok(result)
    }

    /// The shared tail of every single-output command:
    /// overwrite gate, capability check, spawn, result mapping.
    pub(crate) async fn encode(
        &self,
        description: &str,
        staged: StagedOutput,
        args: ArgumentList,
    ) -> Result<Outcome> {
        if !may_write(staged.target(), staged.overwrite()) {
            return Ok(Outcome::skipped(staged.target()));
        }

        self.ensure_available(Tool::Ffmpeg).await?;
        staged.prepare().await?;

        info!("{} -> {}", description, staged.target().display());
        // On error the staged file is dropped, which removes any partial output.
        self.run_tool(Tool::Ffmpeg, description, &args).await?;

        let outcome = staged.commit().await?;
        if let Outcome::Completed(handle) = &outcome {
            info!(
                "{} completed: {} ({} bytes)",
                description,
                handle.path.display(),
                handle.size
            );
        }
        Ok(outcome)
    }

    /// A temporary file removed when the returned path is dropped.
    pub(crate) fn temp_file(&self, prefix: &str, suffix: &str) -> Result<TempPath> {
        let dir = self.config.output.temp_dir();
        std::fs::create_dir_all(&dir)?;
        let file = tempfile::Builder::new()
            .prefix(prefix)
            .suffix(suffix)
            .tempfile_in(&dir)?;
        Ok(file.into_temp_path())
    }
}

/// Confirm an input exists and resolve it to an absolute path.
pub(crate) fn require_input(path: &Path) -> Result<PathBuf> {
    if !path.exists() {
        return Err(MediaError::FileNotFound(path.display().to_string()));
    }
    Ok(std::path::absolute(path)?)
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::media::MockToolRunner;

    pub fn toolkit(runner: MockToolRunner) -> Toolkit {
        Toolkit::new(Config::default(), Arc::new(runner))
    }

    pub fn tools_available(runner: &mut MockToolRunner) {
        runner.expect_is_available().returning(|_| true);
    }

    /// Behaves like a successful ffmpeg run: writes the output (last token).
    pub fn write_output(args: &ArgumentList) -> Result<ExecutionResult> {
        let output = args.last().expect("argument list has an output");
        std::fs::write(output, b"media")?;
        Ok(ExecutionResult::completed(0, "", ""))
    }
}
