use delaysqs_queue::QueueError;
use thiserror::Error;

/// Error a [`DeliveryHandler`](crate::DeliveryHandler) returns when it could
/// not take a payload.
pub type DeliveryError = Box<dyn std::error::Error + Send + Sync>;

/// Errors produced by the [`Delayer`](crate::Delayer).
///
/// Errors raised inside the poll loop never stop it; they are handed to the
/// configured [`ErrorHandler`](crate::ErrorHandler). Only `enqueue` returns
/// them to a caller.
#[derive(Debug, Error)]
pub enum DelayerError {
    /// Sending (or resending) a message to the queue failed.
    #[error("queue write failed: {0}")]
    QueueWrite(#[source] QueueError),

    /// Receiving a batch from the queue failed.
    #[error("queue read failed: {0}")]
    QueueRead(#[source] QueueError),

    /// Deleting a received message failed.
    #[error("queue acknowledgement failed: {0}")]
    QueueAck(#[source] QueueError),

    /// The delivery handler rejected a payload.
    #[error("delivery failed: {0}")]
    Delivery(String),

    /// A message processing task panicked.
    #[error("message task panicked: {0}")]
    TaskPanicked(String),

    /// A payload could not be serialized.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// The delayer was built with invalid configuration.
    #[error("invalid configuration: {0}")]
    Configuration(String),
}

impl DelayerError {
    /// Returns `true` if the underlying queue error is transient.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::QueueWrite(e) | Self::QueueRead(e) | Self::QueueAck(e) => e.is_retryable(),
            _ => false,
        }
    }
}

impl From<serde_json::Error> for DelayerError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
