//! CAD client error types.

use thiserror::Error;

/// Errors that can occur while calling the CAD service.
#[derive(Debug, Error)]
pub enum CadError {
    /// The request did not complete within the configured timeout.
    #[error("CAD service timed out")]
    Timeout,

    /// The service could not be reached.
    #[error("CAD service unreachable: {0}")]
    Transport(String),

    /// The service answered with a non-success status.
    #[error("CAD service returned {status}: {body}")]
    Status { status: u16, body: String },

    /// The service answered with something that is not JSON.
    #[error("CAD service returned an invalid body: {0}")]
    InvalidResponse(String),

    /// The client could not be built.
    #[error("CAD client configuration error: {0}")]
    Config(String),
}

impl CadError {
    /// Returns true for failures worth retrying: transport problems and 5xx.
    pub fn is_retryable(&self) -> bool {
        match self {
            CadError::Timeout | CadError::Transport(_) => true,
            CadError::Status { status, .. } => *status >= 500,
            CadError::InvalidResponse(_) | CadError::Config(_) => false,
        }
    }
}

impl From<reqwest::Error> for CadError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            CadError::Timeout
        } else {
            CadError::Transport(err.to_string())
        }
    }
}

/// Convenience type alias for CAD client results.
pub type Result<T> = std::result::Result<T, CadError>;
