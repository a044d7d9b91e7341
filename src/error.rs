use thiserror::Error;

use crate::bootstrap::steps::Step;
use crate::config::ConfigError;

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("`{program}` not found on PATH")]
    ToolNotFound { program: String },

    #[error("failed to start `{program}`")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{step} failed with exit code {code}")]
    StepFailed { step: Step, code: i32 },

    #[error("{step} was terminated by signal {signal}")]
    Signalled { step: Step, signal: i32 },

    #[error("{step} timed out after {secs}s")]
    Timeout { step: Step, secs: u64 },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl BootstrapError {
    /// Process exit code for this failure, following shell conventions.
    pub fn exit_code(&self) -> i32 {
        match self {
            BootstrapError::Config(_) => 2,
            BootstrapError::ToolNotFound { .. } => 127,
            BootstrapError::Spawn { .. } => 126,
            BootstrapError::StepFailed { code, .. } => *code,
            BootstrapError::Signalled { signal, .. } => 128 + signal,
            BootstrapError::Timeout { .. } => 124,
            BootstrapError::Io(_) => 1,
        }
    }
}
