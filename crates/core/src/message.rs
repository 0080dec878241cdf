use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Name of the message attribute carrying the desired delivery time.
///
/// The value is the epoch-second timestamp, string-encoded, with data type
/// `"Number"`. It travels unchanged through every resend.
pub const DELIVERY_TIMESTAMP_ATTRIBUTE: &str = "deliveryTimestamp";

/// A typed message attribute as understood by the queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageAttribute {
    /// Queue data type, e.g. `"Number"` or `"String"`.
    pub data_type: String,
    /// String-encoded attribute value.
    pub string_value: String,
}

impl MessageAttribute {
    /// A `"Number"` attribute holding the given integer.
    pub fn number(value: i64) -> Self {
        Self {
            data_type: "Number".to_owned(),
            string_value: value.to_string(),
        }
    }

    /// A `"String"` attribute.
    pub fn string(value: impl Into<String>) -> Self {
        Self {
            data_type: "String".to_owned(),
            string_value: value.into(),
        }
    }
}

/// A message about to be written to the queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    /// Opaque payload.
    pub body: String,
    /// Native queue delay before the message becomes visible.
    pub delay_seconds: u32,
    /// Attributes attached to the message.
    pub attributes: HashMap<String, MessageAttribute>,
}

impl OutboundMessage {
    /// Build a first-time send for `payload`, tagged with its delivery time.
    pub fn delayed(payload: impl Into<String>, deliver_at: i64, delay_seconds: u32) -> Self {
        let mut attributes = HashMap::with_capacity(1);
        attributes.insert(
            DELIVERY_TIMESTAMP_ATTRIBUTE.to_owned(),
            MessageAttribute::number(deliver_at),
        );
        Self {
            body: payload.into(),
            delay_seconds,
            attributes,
        }
    }

    /// The delivery timestamp carried by this message, if any.
    pub fn delivery_timestamp(&self) -> Option<i64> {
        self.attributes
            .get(DELIVERY_TIMESTAMP_ATTRIBUTE)
            .and_then(|attr| parse_timestamp(&attr.string_value))
    }
}

/// A message instance handed out by a receive operation.
///
/// The receipt handle identifies this particular received instance; it is
/// what proves ownership when deleting the message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueuedMessage {
    /// Queue-assigned id of the logical message, when the backend reports one.
    pub message_id: Option<String>,
    /// Opaque payload.
    pub body: String,
    /// Token for acknowledging this received instance.
    pub receipt_handle: String,
    /// Attributes as received.
    pub attributes: HashMap<String, MessageAttribute>,
}

impl QueuedMessage {
    /// The desired delivery time in epoch seconds.
    ///
    /// Returns `None` when the attribute is missing, is not a number, or is
    /// zero. Callers treat `None` as "due now".
    pub fn delivery_timestamp(&self) -> Option<i64> {
        self.attributes
            .get(DELIVERY_TIMESTAMP_ATTRIBUTE)
            .and_then(|attr| parse_timestamp(&attr.string_value))
    }

    /// Build the resend that carries this message one step further.
    ///
    /// Body and every received attribute are copied unchanged; only the delay
    /// differs from the received instance.
    pub fn forward(&self, delay_seconds: u32) -> OutboundMessage {
        OutboundMessage {
            body: self.body.clone(),
            delay_seconds,
            attributes: self.attributes.clone(),
        }
    }
}

/// Parse a string-encoded epoch timestamp.
///
/// Integers are taken as-is; decimal values are truncated toward zero. Zero
/// and anything unparsable yield `None`.
#[allow(clippy::cast_possible_truncation)]
fn parse_timestamp(raw: &str) -> Option<i64> {
    let raw = raw.trim();
    let value = match raw.parse::<i64>() {
        Ok(v) => v,
        Err(_) => raw
            .parse::<f64>()
            .ok()
            .filter(|f| f.is_finite())
            .map(|f| f.trunc() as i64)?,
    };
    (value != 0).then_some(value)
}
