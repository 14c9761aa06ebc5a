//! Error types for vision tasks

use crate::running_mode::RunningMode;
use thiserror::Error;

/// Result type alias for vision task operations
pub type Result<T> = std::result::Result<T, Error>;

/// Stable error codes attached to every [`Error`]
///
/// Callers that need to branch on the failure class without matching on
/// message text should use [`Error::code`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskErrorCode {
    /// Input rejected before reaching the runner (e.g. GPU-backed image)
    RunnerUnexpectedInput,
    /// An API was called that the task's running mode does not allow
    RunnerApiCalledInWrongMode,
    /// The runner reported a failure while processing a submission
    RunnerFailsToProcess,
    /// The runner rejected the graph or model at task creation
    RunnerInitialization,
    /// Invalid argument supplied at task creation
    InvalidArgument,
    /// Configuration loading or graph description failure
    InvalidConfig,
    /// Anything else
    Internal,
}

/// Error types that can occur in vision tasks
#[derive(Debug, Error)]
pub enum Error {
    /// Input that this task cannot handle (GPU images, unrepresentable timestamps)
    #[error("Unsupported input: {0}")]
    UnsupportedInput(String),

    /// Call shape does not match the task's running mode
    #[error("Task is not initialized with the {expected} mode (current mode: {actual}); {operation} is not allowed")]
    ModeViolation {
        /// Operation that was attempted
        operation: &'static str,
        /// Mode the operation requires
        expected: RunningMode,
        /// Mode the task was created with
        actual: RunningMode,
    },

    /// API misuse outside of mode checks (e.g. calling a closed task)
    #[error("Invalid usage: {0}")]
    InvalidUsage(String),

    /// The execution backend reported a non-success status
    #[error("Backend error: {0}")]
    Backend(String),

    /// The backend rejected the graph or model configuration
    #[error("Task construction failed: {0}")]
    Construction(String),

    /// Invalid argument at task creation
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Graph description validation error
    #[error("Invalid graph: {0}")]
    InvalidGraph(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Error code for this error
    pub fn code(&self) -> TaskErrorCode {
        match self {
            Error::UnsupportedInput(_) => TaskErrorCode::RunnerUnexpectedInput,
            Error::ModeViolation { .. } | Error::InvalidUsage(_) => {
                TaskErrorCode::RunnerApiCalledInWrongMode
            }
            Error::Backend(_) => TaskErrorCode::RunnerFailsToProcess,
            Error::Construction(_) => TaskErrorCode::RunnerInitialization,
            Error::InvalidArgument(_) => TaskErrorCode::InvalidArgument,
            Error::InvalidGraph(_) | Error::Config(_) | Error::Serialization(_) => {
                TaskErrorCode::InvalidConfig
            }
            Error::Io(_) | Error::Other(_) => TaskErrorCode::Internal,
        }
    }

    /// Wrap an error raised while bringing up a runner
    ///
    /// Errors that already describe a construction failure are returned
    /// unchanged so their message is not nested twice.
    pub fn into_construction(self) -> Self {
        match self {
            Error::Construction(_) | Error::InvalidArgument(_) => self,
            other => Error::Construction(other.to_string()),
        }
    }
}

impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Error::Other(err.to_string())
    }
}

impl From<serde_yaml::Error> for Error {
    fn from(err: serde_yaml::Error) -> Self {
        Error::Config(format!("YAML error: {}", err))
    }
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Error::Config(format!("TOML error: {}", err))
    }
}
