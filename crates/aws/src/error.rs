use delaysqs_queue::QueueError;
use thiserror::Error;

/// Errors raised while talking to SQS.
#[derive(Debug, Error)]
pub enum AwsQueueError {
    /// SQS returned an error for the request.
    #[error("SQS service error: {0}")]
    ServiceError(String),

    /// SQS throttled the request.
    #[error("SQS request throttled")]
    Throttled,

    /// The network or connection to the endpoint failed.
    #[error("SQS connection error: {0}")]
    Connection(String),

    /// The request timed out.
    #[error("SQS request timed out: {0}")]
    Timeout(String),

    /// The receipt handle was rejected.
    #[error("SQS receipt handle rejected: {0}")]
    ReceiptHandle(String),

    /// Credential resolution failed.
    #[error("credential error: {0}")]
    CredentialError(String),

    /// Configuration is invalid.
    #[error("invalid configuration: {0}")]
    Configuration(String),
}

impl From<AwsQueueError> for QueueError {
    fn from(err: AwsQueueError) -> Self {
        match err {
            AwsQueueError::ServiceError(msg) => QueueError::Service(msg),
            AwsQueueError::Throttled => QueueError::Throttled,
            AwsQueueError::Connection(msg) => QueueError::Connection(msg),
            AwsQueueError::Timeout(msg) => {
                QueueError::Connection(format!("request timed out: {msg}"))
            }
            AwsQueueError::ReceiptHandle(msg) => QueueError::InvalidReceipt(msg),
            AwsQueueError::CredentialError(msg) | AwsQueueError::Configuration(msg) => {
                QueueError::Configuration(msg)
            }
        }
    }
}

/// Classify a rendered SDK error into an [`AwsQueueError`].
///
/// Looks for the error codes and phrases SQS and the HTTP stack use for
/// throttling, stale receipt handles, credentials, timeouts and connection
/// trouble; everything else is a service error.
pub fn classify_sdk_error(error_str: &str) -> AwsQueueError {
    let lower = error_str.to_lowercase();
    if lower.contains("receipthandleisinvalid") || lower.contains("receipt handle") {
        AwsQueueError::ReceiptHandle(error_str.to_owned())
    } else if lower.contains("throttl")
        || lower.contains("rate exceed")
        || lower.contains("requestthrottled")
        || lower.contains("too many")
    {
        AwsQueueError::Throttled
    } else if lower.contains("credential") || lower.contains("security token") {
        AwsQueueError::CredentialError(error_str.to_owned())
    } else if lower.contains("timeout") || lower.contains("timed out") {
        AwsQueueError::Timeout(error_str.to_owned())
    } else if lower.contains("connection")
        || lower.contains("connect")
        || lower.contains("dns")
        || lower.contains("dispatch failure")
    {
        AwsQueueError::Connection(error_str.to_owned())
    } else {
        AwsQueueError::ServiceError(error_str.to_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn throttled_maps_to_throttled() {
        let err: QueueError = AwsQueueError::Throttled.into();
        assert!(matches!(err, QueueError::Throttled));
        assert!(err.is_retryable());
    }

    #[test]
    fn receipt_handle_maps_to_invalid_receipt() {
        let err: QueueError = AwsQueueError::ReceiptHandle("stale".into()).into();
        assert!(matches!(err, QueueError::InvalidReceipt(_)));
        assert!(!err.is_retryable());
    }

    #[test]
    fn credentials_map_to_configuration() {
        let err: QueueError = AwsQueueError::CredentialError("none".into()).into();
        assert!(matches!(err, QueueError::Configuration(_)));
    }

    #[test]
    fn classify_receipt_handle() {
        let err = classify_sdk_error(
            "ReceiptHandleIsInvalid: The input receipt handle \"abc\" is not a valid receipt handle.",
        );
        assert!(matches!(err, AwsQueueError::ReceiptHandle(_)));
    }

    #[test]
    fn classify_throttled() {
        let err = classify_sdk_error("RequestThrottled: Rate exceeded");
        assert!(matches!(err, AwsQueueError::Throttled));
    }

    #[test]
    fn classify_credentials() {
        let err = classify_sdk_error("The security token included in the request is invalid");
        assert!(matches!(err, AwsQueueError::CredentialError(_)));
    }

    #[test]
    fn classify_dispatch_failure() {
        let err = classify_sdk_error("dispatch failure: io error: Connection refused");
        assert!(matches!(err, AwsQueueError::Connection(_)));
    }

    #[test]
    fn classify_timeout() {
        let err = classify_sdk_error("operation timed out");
        assert!(matches!(err, AwsQueueError::Timeout(_)));
    }

    #[test]
    fn timeout_keeps_sdk_message() {
        let err: QueueError = AwsQueueError::Timeout("operation timed out".into()).into();
        assert_eq!(
            err.to_string(),
            "connection error: request timed out: operation timed out"
        );
        assert!(err.is_retryable());
    }

    #[test]
    fn classify_generic_service_error() {
        let err = classify_sdk_error("QueueDoesNotExist: The specified queue does not exist");
        assert!(matches!(err, AwsQueueError::ServiceError(_)));
    }
}
