//! Notification error types.

use record_store::StoreError;
use thiserror::Error;

/// Errors that can occur while dispatching notifications.
#[derive(Debug, Error)]
pub enum NotificationError {
    /// The mailer refused or failed to send.
    #[error("Send failed: {0}")]
    Send(String),

    /// The email API answered with a non-success status.
    #[error("Email API error ({status}): {body}")]
    Api { status: u16, body: String },

    /// Transport error talking to the email API.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Reading the outbox or checkpoint failed.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Convenience type alias for notification results.
pub type Result<T> = std::result::Result<T, NotificationError>;
