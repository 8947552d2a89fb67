// Media tool plumbing
//
// This module holds everything that talks to the external binaries:
// - Commands: ordered argument lists and the staged ffmpeg builder
// - Filter: escaping for filter-graph values
// - Processor: the subprocess runner
// - Probe: ffprobe output parsing and capability queries
//
// Command handlers never spawn processes themselves; they hand an
// ArgumentList to a ToolRunner, which tests replace with a mock.

pub mod commands;
pub mod filter;
pub mod probe;
pub mod processor;

use async_trait::async_trait;
use std::fmt;
use std::time::Duration;

pub use commands::*;
pub use processor::*;

use crate::config::ToolsConfig;
use crate::error::Result;

/// The external binaries this crate drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tool {
    Ffmpeg,
    Ffprobe,
}

impl Tool {
    pub fn name(&self) -> &'static str {
        match self {
            Tool::Ffmpeg => "ffmpeg",
            Tool::Ffprobe => "ffprobe",
        }
    }
}

impl fmt::Display for Tool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for Tool {
    type Err = crate::error::MediaError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "ffmpeg" => Ok(Tool::Ffmpeg),
            "ffprobe" => Ok(Tool::Ffprobe),
            _ => Err(crate::error::MediaError::Validation(format!(
                "Invalid tool '{}'. Valid tools: ffmpeg, ffprobe",
                s
            ))),
        }
    }
}

/// Everything observed about one finished subprocess.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionResult {
    /// Exit code; `None` when the process was killed by a signal
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    pub elapsed: Duration,
}

impl ExecutionResult {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    /// Stderr followed by stdout, which is where ffmpeg writes its diagnostics.
    pub fn combined_output(&self) -> String {
        match (self.stderr.trim().is_empty(), self.stdout.trim().is_empty()) {
            (false, false) => format!("{}\n{}", self.stderr.trim_end(), self.stdout.trim_end()),
            (false, true) => self.stderr.trim_end().to_string(),
            (true, false) => self.stdout.trim_end().to_string(),
            (true, true) => String::new(),
        }
    }

    /// Convenience constructor, mostly for tests and fakes.
    pub fn completed(code: i32, stdout: &str, stderr: &str) -> Self {
        Self {
            code: Some(code),
            stdout: stdout.to_string(),
            stderr: stderr.to_string(),
            elapsed: Duration::ZERO,
        }
    }
}

/// Runs external tools. Injected into [`crate::toolkit::Toolkit`] so the
/// command handlers can be exercised without real binaries.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ToolRunner: Send + Sync {
    /// Run `tool` with `args`, waiting for it to exit.
    /// A non-zero exit is not an error at this layer.
    async fn run(&self, tool: Tool, args: &ArgumentList) -> Result<ExecutionResult>;

    /// Whether `tool` can be started and answers `-version` successfully.
    /// Spawn failures count as "not available", never as errors.
    async fn is_available(&self, tool: Tool) -> bool {
        match self.run(tool, &ArgumentList::raw(["-version"])).await {
            Ok(result) => result.success(),
            Err(_) => false,
        }
    }
}

/// Factory for creating runner instances
pub struct ToolRunnerFactory;

impl ToolRunnerFactory {
    /// Create the default runner, which spawns real processes
    pub fn create_runner(config: ToolsConfig) -> std::sync::Arc<dyn ToolRunner> {
        std::sync::Arc::new(processor::SystemRunner::new(config))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_combined_output() {
        let result = ExecutionResult::completed(1, "progress\n", "Invalid data found\n");
        assert_eq!(result.combined_output(), "Invalid data found\nprogress");
        assert!(!result.success());

        let result = ExecutionResult::completed(0, "", "");
        assert_eq!(result.combined_output(), "");
        assert!(result.success());
    }

    #[test]
    fn test_tool_parsing() {
        assert_eq!("FFprobe".parse::<Tool>().unwrap(), Tool::Ffprobe);
        assert!("sox".parse::<Tool>().is_err());
    }
}
