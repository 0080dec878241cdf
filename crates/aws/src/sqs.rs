use std::collections::HashMap;

use aws_sdk_sqs::error::DisplayErrorContext;
use aws_sdk_sqs::types::{Message, MessageAttributeValue, QueueAttributeName};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use delaysqs_core::{MessageAttribute, OutboundMessage, QueuedMessage};
use delaysqs_queue::{QueueError, QueueGateway, ReceiveOptions};

use crate::auth::build_sdk_config;
use crate::config::AwsBaseConfig;
use crate::error::classify_sdk_error;

/// Configuration for an SQS-backed queue.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct SqsQueueConfig {
    /// Shared AWS configuration (region, role ARN, endpoint URL).
    #[serde(flatten)]
    pub aws: AwsBaseConfig,

    /// URL of the queue carrying delayed messages.
    #[serde(default)]
    pub queue_url: Option<String>,
}

impl std::fmt::Debug for SqsQueueConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqsQueueConfig")
            .field("aws", &self.aws)
            .field("queue_url", &self.queue_url)
            .finish()
    }
}

impl SqsQueueConfig {
    /// Create a new `SqsQueueConfig` in the given AWS region.
    pub fn new(region: impl Into<String>) -> Self {
        Self {
            aws: AwsBaseConfig::new(region),
            queue_url: None,
        }
    }

    /// Set the queue URL.
    #[must_use]
    pub fn with_queue_url(mut self, queue_url: impl Into<String>) -> Self {
        self.queue_url = Some(queue_url.into());
        self
    }

    /// Set the endpoint URL override (for `LocalStack`).
    #[must_use]
    pub fn with_endpoint_url(mut self, endpoint_url: impl Into<String>) -> Self {
        self.aws.endpoint_url = Some(endpoint_url.into());
        self
    }

    /// Set the IAM role ARN to assume.
    #[must_use]
    pub fn with_role_arn(mut self, role_arn: impl Into<String>) -> Self {
        self.aws.role_arn = Some(role_arn.into());
        self
    }

    /// The configured queue URL, or a configuration error if it is missing.
    pub fn require_queue_url(&self) -> Result<&str, QueueError> {
        self.queue_url
            .as_deref()
            .filter(|url| !url.trim().is_empty())
            .ok_or_else(|| QueueError::Configuration("no queue_url configured".to_owned()))
    }
}

/// Amazon SQS implementation of [`QueueGateway`].
pub struct SqsQueue {
    queue_url: String,
    client: aws_sdk_sqs::Client,
}

impl std::fmt::Debug for SqsQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqsQueue")
            .field("queue_url", &self.queue_url)
            .field("client", &"<SqsClient>")
            .finish()
    }
}

/// Render an SDK error with its full source chain and classify it.
fn sdk_error<E: std::error::Error>(operation: &str, err: &E) -> QueueError {
    let rendered = DisplayErrorContext(err).to_string();
    debug!(operation, error = %rendered, "SQS request failed");
    classify_sdk_error(&rendered).into()
}

fn seconds(name: &str, value: u32) -> Result<i32, QueueError> {
    i32::try_from(value)
        .map_err(|_| QueueError::Configuration(format!("{name} of {value}s is out of range")))
}

fn to_sdk_attribute(
    name: &str,
    attr: &MessageAttribute,
) -> Result<MessageAttributeValue, QueueError> {
    MessageAttributeValue::builder()
        .data_type(&attr.data_type)
        .string_value(&attr.string_value)
        .build()
        .map_err(|e| QueueError::Serialization(format!("attribute {name}: {e}")))
}

/// Convert a received SDK message. Messages without a receipt handle cannot
/// be acknowledged and are dropped; binary attributes are not carried.
fn from_sdk_message(message: &Message) -> Option<QueuedMessage> {
    let Some(receipt_handle) = message.receipt_handle() else {
        warn!(
            message_id = message.message_id().unwrap_or("unknown"),
            "received SQS message without a receipt handle, skipping"
        );
        return None;
    };

    let attributes: HashMap<String, MessageAttribute> = message
        .message_attributes()
        .map(|attrs| {
            attrs
                .iter()
                .filter_map(|(name, value)| {
                    value.string_value().map(|s| {
                        (
                            name.clone(),
                            MessageAttribute {
                                data_type: value.data_type().to_owned(),
                                string_value: s.to_owned(),
                            },
                        )
                    })
                })
                .collect()
        })
        .unwrap_or_default();

    Some(QueuedMessage {
        message_id: message.message_id().map(str::to_owned),
        body: message.body().unwrap_or_default().to_owned(),
        receipt_handle: receipt_handle.to_owned(),
        attributes,
    })
}

impl SqsQueue {
    /// Create an `SqsQueue` by building an AWS SDK client from `config`.
    pub async fn new(config: SqsQueueConfig) -> Result<Self, QueueError> {
        config.aws.validate().map_err(QueueError::from)?;
        let queue_url = config.require_queue_url()?.to_owned();
        let sdk_config = build_sdk_config(&config.aws).await;
        let client = aws_sdk_sqs::Client::new(&sdk_config);
        Ok(Self { queue_url, client })
    }

    /// Create an `SqsQueue` with a pre-built client.
    pub fn with_client(queue_url: impl Into<String>, client: aws_sdk_sqs::Client) -> Self {
        Self {
            queue_url: queue_url.into(),
            client,
        }
    }

    /// The queue this gateway talks to.
    pub fn queue_url(&self) -> &str {
        &self.queue_url
    }

    /// Approximate number of visible messages; doubles as a reachability check.
    #[instrument(skip(self), fields(queue_url = %self.queue_url))]
    pub async fn health_check(&self) -> Result<u64, QueueError> {
        let output = self
            .client
            .get_queue_attributes()
            .queue_url(&self.queue_url)
            .attribute_names(QueueAttributeName::ApproximateNumberOfMessages)
            .send()
            .await
            .map_err(|e| sdk_error("get_queue_attributes", &e))?;

        let visible = output
            .attributes()
            .and_then(|attrs| attrs.get(&QueueAttributeName::ApproximateNumberOfMessages))
            .and_then(|v| v.parse().ok())
            .unwrap_or(0);
        info!(visible, "SQS health check passed");
        Ok(visible)
    }
}

impl QueueGateway for SqsQueue {
    #[allow(clippy::unnecessary_literal_bound)]
    fn name(&self) -> &str {
        "aws-sqs"
    }

    #[instrument(skip(self, message), fields(queue_url = %self.queue_url, delay = message.delay_seconds))]
    async fn send(&self, message: &OutboundMessage) -> Result<String, QueueError> {
        let mut request = self
            .client
            .send_message()
            .queue_url(&self.queue_url)
            .message_body(&message.body)
            .delay_seconds(seconds("delay", message.delay_seconds)?);

        for (name, attr) in &message.attributes {
            request = request.message_attributes(name, to_sdk_attribute(name, attr)?);
        }

        let output = request
            .send()
            .await
            .map_err(|e| sdk_error("send_message", &e))?;

        let message_id = output.message_id().unwrap_or("unknown").to_owned();
        debug!(message_id = %message_id, "SQS message sent");
        Ok(message_id)
    }

    #[instrument(skip(self, options), fields(queue_url = %self.queue_url))]
    async fn receive(&self, options: &ReceiveOptions) -> Result<Vec<QueuedMessage>, QueueError> {
        let mut request = self
            .client
            .receive_message()
            .queue_url(&self.queue_url)
            .wait_time_seconds(seconds("wait", options.wait_seconds)?)
            .visibility_timeout(seconds("visibility timeout", options.visibility_timeout_seconds)?)
            .max_number_of_messages(seconds("max messages", options.max_messages)?);

        for name in &options.attribute_names {
            request = request.message_attribute_names(name);
        }

        let output = request
            .send()
            .await
            .map_err(|e| sdk_error("receive_message", &e))?;

        Ok(output
            .messages()
            .iter()
            .filter_map(from_sdk_message)
            .collect())
    }

    #[instrument(skip(self, receipt_handle), fields(queue_url = %self.queue_url))]
    async fn delete(&self, receipt_handle: &str) -> Result<(), QueueError> {
        self.client
            .delete_message()
            .queue_url(&self.queue_url)
            .receipt_handle(receipt_handle)
            .send()
            .await
            .map_err(|e| sdk_error("delete_message", &e))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use delaysqs_core::DELIVERY_TIMESTAMP_ATTRIBUTE;

    use super::*;

    #[test]
    fn config_requires_queue_url() {
        let config = SqsQueueConfig::new("us-west-2");
        assert!(matches!(
            config.require_queue_url(),
            Err(QueueError::Configuration(_))
        ));

        let config = config.with_queue_url("https://sqs.us-west-2.amazonaws.com/123/delayed");
        assert_eq!(
            config.require_queue_url().unwrap(),
            "https://sqs.us-west-2.amazonaws.com/123/delayed"
        );
    }

    #[test]
    fn blank_queue_url_is_missing() {
        let config = SqsQueueConfig::new("us-west-2").with_queue_url("  ");
        assert!(config.require_queue_url().is_err());
    }

    #[test]
    fn config_debug_redacts_role() {
        let config = SqsQueueConfig::new("us-east-1").with_role_arn("arn:aws:iam::123:role/test");
        let debug = format!("{config:?}");
        assert!(debug.contains("SqsQueueConfig"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn config_deserializes_flattened_aws_fields() {
        let config: SqsQueueConfig = serde_json::from_value(serde_json::json!({
            "region": "eu-west-1",
            "endpoint_url": "http://localhost:4566",
            "queue_url": "http://localhost:4566/000000000000/delayed"
        }))
        .unwrap();
        assert_eq!(config.aws.region, "eu-west-1");
        assert_eq!(
            config.aws.endpoint_url.as_deref(),
            Some("http://localhost:4566")
        );
        assert!(config.queue_url.is_some());
    }

    #[test]
    fn outbound_attribute_converts() {
        let attr = MessageAttribute::number(1_700_000_000);
        let sdk = to_sdk_attribute(DELIVERY_TIMESTAMP_ATTRIBUTE, &attr).unwrap();
        assert_eq!(sdk.data_type(), "Number");
        assert_eq!(sdk.string_value(), Some("1700000000"));
    }

    #[test]
    fn received_message_converts() {
        let sdk = Message::builder()
            .message_id("abcdef")
            .receipt_handle("12345678")
            .body("This is the body")
            .message_attributes(
                DELIVERY_TIMESTAMP_ATTRIBUTE,
                MessageAttributeValue::builder()
                    .data_type("Number")
                    .string_value("1700000000")
                    .build()
                    .unwrap(),
            )
            .build();

        let msg = from_sdk_message(&sdk).unwrap();
        assert_eq!(msg.message_id.as_deref(), Some("abcdef"));
        assert_eq!(msg.receipt_handle, "12345678");
        assert_eq!(msg.body, "This is the body");
        assert_eq!(msg.delivery_timestamp(), Some(1_700_000_000));
    }

    #[test]
    fn message_without_receipt_handle_is_skipped() {
        let sdk = Message::builder().message_id("x").body("y").build();
        assert!(from_sdk_message(&sdk).is_none());
    }

    #[test]
    fn sdk_error_is_classified_not_raised() {
        let io = std::io::Error::other("dispatch failure: Connection refused");
        assert!(matches!(
            sdk_error("send_message", &io),
            QueueError::Connection(_)
        ));
    }

    #[test]
    fn out_of_range_seconds_is_configuration_error() {
        assert_eq!(seconds("delay", 900).unwrap(), 900);
        assert!(matches!(
            seconds("delay", u32::MAX),
            Err(QueueError::Configuration(_))
        ));
    }
}

#[cfg(all(test, feature = "integration"))]
mod integration_tests {
    use delaysqs_queue::testing::run_gateway_conformance_tests;

    use super::*;

    /// Runs against `LocalStack` (or real SQS) using `DELAYSQS_TEST_QUEUE_URL`,
    /// which must name an empty queue.
    #[tokio::test]
    async fn conformance() {
        let queue_url = std::env::var("DELAYSQS_TEST_QUEUE_URL")
            .expect("DELAYSQS_TEST_QUEUE_URL must be set for integration tests");
        let endpoint =
            std::env::var("AWS_ENDPOINT_URL").unwrap_or_else(|_| "http://localhost:4566".into());
        let config = SqsQueueConfig::new("us-east-1")
            .with_endpoint_url(endpoint)
            .with_queue_url(queue_url);
        let queue = SqsQueue::new(config).await.unwrap();
        run_gateway_conformance_tests(&queue).await.unwrap();
    }
}
