use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use crate::error::{Result, MediaError};

fn default_log_file() -> String {
    "mediakit.log".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    pub tools: ToolsConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolsConfig {
    /// Path to the ffmpeg binary
    pub ffmpeg: String,
    /// Path to the ffprobe binary
    pub ffprobe: String,
    /// Kill a tool that runs longer than this many seconds.
    /// Absent means wait indefinitely.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct OutputConfig {
    /// Replace existing output files unless a command says otherwise
    #[serde(default)]
    pub overwrite: bool,
    /// Directory for intermediate files (palettes, concat lists).
    /// Defaults to the system temp directory.
    #[serde(default)]
    pub temp_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoggingConfig {
    /// Directory for the rolling log file
    pub directory: PathBuf,
    /// Log file name prefix; rotated daily
    #[serde(default = "default_log_file")]
    pub file: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from(".mediakit").join("log"),
            file: default_log_file(),
        }
    }
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            ffmpeg: "ffmpeg".to_string(),
            ffprobe: "ffprobe".to_string(),
            timeout_secs: None,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            tools: ToolsConfig::default(),
            output: OutputConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl ToolsConfig {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.filter(|secs| *secs > 0).map(Duration::from_secs)
    }
}

impl OutputConfig {
    pub fn temp_dir(&self) -> PathBuf {
        self.temp_dir.clone().unwrap_or_else(std::env::temp_dir)
    }
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| MediaError::Config(format!("Failed to read config file: {}", e)))?;

        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)
            .map_err(|e| MediaError::Config(format!("Failed to parse config file: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| MediaError::Config(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, content)
            .map_err(|e| MediaError::Config(format!("Failed to write config file: {}", e)))?;

        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.tools.ffmpeg.trim().is_empty() {
            return Err(MediaError::Config("tools.ffmpeg must not be empty".to_string()));
        }
        if self.tools.ffprobe.trim().is_empty() {
            return Err(MediaError::Config("tools.ffprobe must not be empty".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_fills_defaults() {
        let config = Config::from_toml(
            r#"
            [tools]
            ffmpeg = "/opt/ffmpeg/bin/ffmpeg"
            ffprobe = "/opt/ffmpeg/bin/ffprobe"
            timeout_secs = 600
            "#,
        )
        .unwrap();

        assert_eq!(config.tools.ffmpeg, "/opt/ffmpeg/bin/ffmpeg");
        assert_eq!(config.tools.timeout(), Some(Duration::from_secs(600)));
        assert!(!config.output.overwrite);
        assert_eq!(config.logging, LoggingConfig::default());
    }

    #[test]
    fn test_zero_timeout_means_no_timeout() {
        let tools = ToolsConfig {
            timeout_secs: Some(0),
            ..ToolsConfig::default()
        };
        assert_eq!(tools.timeout(), None);
    }

    #[test]
    fn test_empty_binary_rejected() {
        let err = Config::from_toml(
            r#"
            [tools]
            ffmpeg = ""
            ffprobe = "ffprobe"
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, MediaError::Config(_)));
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mediakit.toml");

        let mut config = Config::default();
        config.output.overwrite = true;
        config.save_to_file(&path).unwrap();

        assert_eq!(Config::from_file(&path).unwrap(), config);
    }
}
