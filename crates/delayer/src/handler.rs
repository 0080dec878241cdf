use async_trait::async_trait;
use delaysqs_core::now_epoch_seconds;
use tracing::error;

use crate::error::{DelayerError, DeliveryError};

/// Consumer of due payloads.
///
/// Called once per delivery: either from `enqueue` when the delivery time has
/// already passed, or from the poll loop when a received message is due. A
/// returned error leaves the message on the queue for redelivery.
#[async_trait]
pub trait DeliveryHandler: Send + Sync {
    async fn deliver(&self, payload: &str) -> Result<(), DeliveryError>;
}

#[async_trait]
impl<F> DeliveryHandler for F
where
    F: Fn(&str) -> Result<(), DeliveryError> + Send + Sync,
{
    async fn deliver(&self, payload: &str) -> Result<(), DeliveryError> {
        self(payload)
    }
}

/// Receives every error raised inside the poll loop.
pub trait ErrorHandler: Send + Sync {
    fn on_error(&self, error: &DelayerError);
}

impl<F> ErrorHandler for F
where
    F: Fn(&DelayerError) + Send + Sync,
{
    fn on_error(&self, error: &DelayerError) {
        self(error);
    }
}

/// Default error handler: logs and moves on.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogErrorHandler;

impl ErrorHandler for LogErrorHandler {
    fn on_error(&self, error: &DelayerError) {
        error!(error = %error, retryable = error.is_retryable(), "delayer error");
    }
}

/// Source of the current time in epoch seconds.
pub trait Clock: Send + Sync {
    fn now(&self) -> i64;
}

/// Wall clock, rounded to the nearest second.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> i64 {
        now_epoch_seconds()
    }
}
