//! Amazon SQS backend for delaysqs.
//!
//! [`SqsQueue`] implements [`delaysqs_queue::QueueGateway`] on top of
//! `aws-sdk-sqs`. Credentials come from the standard AWS environment chain,
//! optionally assuming an IAM role via STS; an endpoint override allows
//! running against `LocalStack`.

pub mod auth;
pub mod config;
pub mod error;
pub mod sqs;

// Re-exports for convenience.
pub use config::AwsBaseConfig;
pub use error::AwsQueueError;
pub use sqs::{SqsQueue, SqsQueueConfig};
