use std::time::Duration;

use thiserror::Error;

/// Errors returned by queue gateway operations.
#[derive(Debug, Error)]
pub enum QueueError {
    /// A network or transport-level error occurred.
    #[error("connection error: {0}")]
    Connection(String),

    /// The queue rejected the request due to rate limiting.
    #[error("queue request throttled")]
    Throttled,

    /// The request did not complete within the allowed duration.
    #[error("timeout after {0:?}")]
    Timeout(Duration),

    /// The queue service returned an error.
    #[error("queue service error: {0}")]
    Service(String),

    /// The receipt handle is unknown, stale, or malformed.
    #[error("invalid receipt handle: {0}")]
    InvalidReceipt(String),

    /// A message could not be encoded for or decoded from the queue.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// The gateway was given invalid configuration.
    #[error("invalid configuration: {0}")]
    Configuration(String),
}

impl QueueError {
    /// Returns `true` if the error is transient and the operation may succeed
    /// on retry.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Timeout(_) | Self::Connection(_) | Self::Throttled
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_errors() {
        assert!(QueueError::Timeout(Duration::from_secs(5)).is_retryable());
        assert!(QueueError::Connection("reset".into()).is_retryable());
        assert!(QueueError::Throttled.is_retryable());
    }

    #[test]
    fn non_retryable_errors() {
        assert!(!QueueError::Service("x".into()).is_retryable());
        assert!(!QueueError::InvalidReceipt("x".into()).is_retryable());
        assert!(!QueueError::Serialization("x".into()).is_retryable());
        assert!(!QueueError::Configuration("x".into()).is_retryable());
    }

    #[test]
    fn error_display() {
        assert_eq!(
            QueueError::InvalidReceipt("abc".into()).to_string(),
            "invalid receipt handle: abc"
        );
        assert_eq!(
            QueueError::Timeout(Duration::from_millis(500)).to_string(),
            "timeout after 500ms"
        );
        assert_eq!(QueueError::Throttled.to_string(), "queue request throttled");
    }
}
