pub mod error;
pub mod gateway;
pub mod options;
pub mod testing;

pub use error::QueueError;
pub use gateway::{DynQueueGateway, QueueGateway};
pub use options::ReceiveOptions;
