pub mod message;
pub mod request;
pub mod schedule;
pub mod time;

pub use message::{
    DELIVERY_TIMESTAMP_ATTRIBUTE, MessageAttribute, OutboundMessage, QueuedMessage,
};
pub use request::{DeliveryRequest, EnqueueReceipt};
pub use schedule::{MAX_QUEUE_DELAY_SECONDS, Schedule};
pub use time::now_epoch_seconds;
