use thiserror::Error;

#[derive(Error, Debug)]
pub enum MediaError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Required tool is not available: {0}")]
    ToolUnavailable(String),

    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("At least {required} inputs required, got {actual}")]
    InsufficientInputs { required: usize, actual: usize },

    #[error("Invalid parameter: {0}")]
    Validation(String),

    #[error("Invalid time value: {0}")]
    InvalidTime(String),

    #[error("Failed to start {tool}: {source}")]
    Spawn {
        tool: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{description} failed (exit code {}):\n{output}", exit_code(.code))]
    Execution {
        description: String,
        code: Option<i32>,
        output: String,
    },

    #[error("{description} did not finish within {seconds}s")]
    Timeout { description: String, seconds: u64 },

    #[error("Tool reported success but produced no output at {0}")]
    MissingOutput(String),

    #[error("Probe error: {0}")]
    Probe(String),
}

impl MediaError {
    /// True for errors raised before any subprocess could be spawned.
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            MediaError::ToolUnavailable(_)
                | MediaError::FileNotFound(_)
                | MediaError::InsufficientInputs { .. }
        )
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, MediaError::Validation(_) | MediaError::InvalidTime(_))
    }
}

fn exit_code(code: &Option<i32>) -> String {
    match code {
        Some(code) => code.to_string(),
        None => "none".to_string(),
    }
}

pub type Result<T> = std::result::Result<T, MediaError>;
