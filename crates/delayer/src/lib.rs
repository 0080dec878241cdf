//! Delayed delivery over a queue with a bounded native delay.
//!
//! [`Delayer::enqueue`] either hands an already-due payload straight to the
//! [`DeliveryHandler`] or sends it with a delay capped at the queue ceiling.
//! The poll loop started by [`Delayer::start_polling`] receives batches,
//! delivers and deletes the messages that are due, and resends the rest with
//! the next bounded delay until their time comes.
//!
//! ```no_run
//! # async fn example(queue: std::sync::Arc<dyn delaysqs_queue::DynQueueGateway>)
//! # -> Result<(), delaysqs_delayer::DelayerError> {
//! use delaysqs_delayer::{Delayer, DeliveryError};
//!
//! let delayer = Delayer::builder()
//!     .queue(queue)
//!     .delivery_handler(|payload: &str| -> Result<(), DeliveryError> {
//!         println!("{payload}");
//!         Ok(())
//!     })
//!     .build()?;
//!
//! let in_an_hour = delaysqs_core::now_epoch_seconds() + 3600;
//! delayer.enqueue(r#"{"a":1}"#, in_an_hour).await?;
//! delayer.start_polling();
//! // ...
//! delayer.shutdown().await;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod delayer;
pub mod error;
pub mod handler;

pub use config::DelayerConfig;
pub use delayer::{Delayer, DelayerBuilder};
pub use error::{DelayerError, DeliveryError};
pub use handler::{Clock, DeliveryHandler, ErrorHandler, LogErrorHandler, SystemClock};
