use async_trait::async_trait;
use std::process::Stdio;
use std::time::Instant;
use tokio::process::Command;
use tracing::debug;

use crate::config::ToolsConfig;
use crate::error::{MediaError, Result};
use super::{ArgumentList, ExecutionResult, Tool, ToolRunner};

/// Runner that spawns the configured binaries with `tokio::process`.
pub struct SystemRunner {
    config: ToolsConfig,
}

impl SystemRunner {
    pub fn new(config: ToolsConfig) -> Self {
        Self { config }
    }

    /// Configured binary for `tool`
    pub fn binary(&self, tool: Tool) -> &str {
        match tool {
            Tool::Ffmpeg => &self.config.ffmpeg,
            Tool::Ffprobe => &self.config.ffprobe,
        }
    }
}

#[async_trait]
impl ToolRunner for SystemRunner {
    async fn run(&self, tool: Tool, args: &ArgumentList) -> Result<ExecutionResult> {
        let binary = self.binary(tool);
        debug!("Executing {} {}", binary, args);

        let mut cmd = Command::new(binary);
        cmd.args(args.tokens())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let started = Instant::now();
        let child = cmd.spawn().map_err(|source| MediaError::Spawn {
            tool: binary.to_string(),
            source,
        })?;

        // Dropping the wait future on timeout drops the child, which kills it.
        let output = match self.config.timeout() {
            Some(limit) => tokio::time::timeout(limit, child.wait_with_output())
                .await
                .map_err(|_| MediaError::Timeout {
                    description: format!("{} {}", binary, args),
                    seconds: limit.as_secs(),
                })??,
            None => child.wait_with_output().await?,
        };

        let result = ExecutionResult {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            elapsed: started.elapsed(),
        };

        debug!(
            "{} exited with {:?} after {:.2}s",
            binary,
            result.code,
            result.elapsed.as_secs_f64()
        );
        Ok(result)
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn runner_with(binary: &str, timeout_secs: Option<u64>) -> SystemRunner {
        SystemRunner::new(ToolsConfig {
            ffmpeg: binary.to_string(),
            ffprobe: binary.to_string(),
            timeout_secs,
        })
    }

    #[tokio::test]
    async fn test_captures_output_and_exit_code() {
        let runner = runner_with("sh", None);
        let args = ArgumentList::raw(["-c", "echo out; echo err >&2; exit 3"]);

        let result = runner.run(Tool::Ffmpeg, &args).await.unwrap();
        assert_eq!(result.code, Some(3));
        assert_eq!(result.stdout.trim(), "out");
        assert_eq!(result.stderr.trim(), "err");
        assert_eq!(result.combined_output(), "err\nout");
    }

    #[tokio::test]
    async fn test_missing_binary_is_spawn_error() {
        let runner = runner_with("/nonexistent/mediakit-test-binary", None);
        let err = runner
            .run(Tool::Ffprobe, &ArgumentList::raw(["-version"]))
            .await
            .unwrap_err();
        assert!(matches!(err, MediaError::Spawn { .. }));
        assert!(!runner.is_available(Tool::Ffprobe).await);
    }

    #[tokio::test]
    async fn test_timeout_kills_process() {
        let runner = runner_with("sleep", Some(1));
        let err = runner
            .run(Tool::Ffmpeg, &ArgumentList::raw(["30"]))
            .await
            .unwrap_err();
        assert!(matches!(err, MediaError::Timeout { seconds: 1, .. }));
    }
}
