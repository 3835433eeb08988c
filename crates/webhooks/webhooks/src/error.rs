//! Webhook error types.

use thiserror::Error;

/// Result type for webhook operations.
pub type WebhookResult<T> = Result<T, WebhookError>;

/// Error type for webhook operations.
///
/// Only `NotConfigured`, `InvalidConfiguration`, and `Storage` are surfaced
/// to callers of `deliver`; transport and status failures are folded into an
/// unsuccessful [`crate::DeliveryOutcome`] after retries are exhausted.
#[derive(Debug, Error)]
pub enum WebhookError {
    /// Webhook is disabled; caller should skip, not retry.
    #[error("Webhook is not configured")]
    NotConfigured,

    /// Malformed URL or out-of-range settings, rejected before any network I/O.
    #[error("Invalid webhook configuration: {0}")]
    InvalidConfiguration(String),

    /// Timeout, connection refused, DNS, or TLS failure on one attempt.
    #[error("Transport failure: {0}")]
    Transport(String),

    /// Response received, but status outside 2xx.
    #[error("Endpoint returned HTTP {0}")]
    NonSuccessStatus(u16),

    /// The delivery log append failed; fatal to the deliver call.
    #[error("Storage failure: {0}")]
    Storage(String),
}

impl From<reqwest::Error> for WebhookError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            WebhookError::Transport(format!("request timed out: {err}"))
        } else {
            WebhookError::Transport(err.to_string())
        }
    }
}
