use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A payload together with the earliest time it may be delivered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryRequest {
    /// Opaque payload.
    pub payload: String,
    /// Desired delivery time in epoch seconds.
    pub deliver_at: i64,
}

impl DeliveryRequest {
    /// Create a request for delivery at `deliver_at` (epoch seconds).
    pub fn new(payload: impl Into<String>, deliver_at: i64) -> Self {
        Self {
            payload: payload.into(),
            deliver_at,
        }
    }

    /// Create a request for delivery at the given instant.
    ///
    /// Sub-second precision is dropped; the queue only works in whole seconds.
    pub fn from_datetime(payload: impl Into<String>, deliver_at: DateTime<Utc>) -> Self {
        Self::new(payload, deliver_at.timestamp())
    }
}

/// Result of a successful enqueue.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EnqueueReceipt {
    /// Id of the queued message, or `None` when the payload was already due
    /// and was delivered without touching the queue.
    pub message_id: Option<String>,
}

impl EnqueueReceipt {
    /// Receipt for a message written to the queue.
    pub fn queued(message_id: impl Into<String>) -> Self {
        Self {
            message_id: Some(message_id.into()),
        }
    }

    /// Receipt for a payload delivered on the spot.
    pub fn delivered() -> Self {
        Self { message_id: None }
    }

    /// Returns `true` if the payload skipped the queue.
    pub fn delivered_immediately(&self) -> bool {
        self.message_id.is_none()
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn from_datetime_uses_epoch_seconds() {
        let at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let req = DeliveryRequest::from_datetime("hi", at);
        assert_eq!(req.deliver_at, 1_704_067_200);
        assert_eq!(req.payload, "hi");
    }

    #[test]
    fn receipts() {
        assert!(EnqueueReceipt::delivered().delivered_immediately());
        let queued = EnqueueReceipt::queued("m-1");
        assert!(!queued.delivered_immediately());
        assert_eq!(queued.message_id.as_deref(), Some("m-1"));
    }
}
