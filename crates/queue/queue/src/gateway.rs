use async_trait::async_trait;
use delaysqs_core::{OutboundMessage, QueuedMessage};

use crate::error::QueueError;
use crate::options::ReceiveOptions;

/// Send/receive/delete access to a backing queue.
///
/// This trait is **not** object-safe because it uses native `async fn`
/// methods. If you need dynamic dispatch, use [`DynQueueGateway`] instead --
/// every `QueueGateway` automatically implements `DynQueueGateway` via a
/// blanket implementation.
pub trait QueueGateway: Send + Sync {
    /// Short name of the backend, used in logs.
    fn name(&self) -> &str;

    /// Write a message to the queue and return the id the queue assigned.
    fn send(
        &self,
        message: &OutboundMessage,
    ) -> impl std::future::Future<Output = Result<String, QueueError>> + Send;

    /// Receive up to `options.max_messages` visible messages, waiting up to
    /// `options.wait_seconds` if none are available.
    ///
    /// Returned messages stay hidden from other receivers for the visibility
    /// timeout. An empty vector is a normal outcome.
    fn receive(
        &self,
        options: &ReceiveOptions,
    ) -> impl std::future::Future<Output = Result<Vec<QueuedMessage>, QueueError>> + Send;

    /// Acknowledge a received instance, removing it from the queue.
    fn delete(
        &self,
        receipt_handle: &str,
    ) -> impl std::future::Future<Output = Result<(), QueueError>> + Send;
}

/// Object-safe gateway trait for use behind `Arc<dyn DynQueueGateway>`.
///
/// You generally should not implement this trait directly -- instead implement
/// [`QueueGateway`] and rely on the blanket implementation.
#[async_trait]
pub trait DynQueueGateway: Send + Sync {
    /// Short name of the backend, used in logs.
    fn name(&self) -> &str;

    /// Write a message to the queue and return the id the queue assigned.
    async fn send(&self, message: &OutboundMessage) -> Result<String, QueueError>;

    /// Receive a batch of visible messages.
    async fn receive(&self, options: &ReceiveOptions) -> Result<Vec<QueuedMessage>, QueueError>;

    /// Acknowledge a received instance.
    async fn delete(&self, receipt_handle: &str) -> Result<(), QueueError>;
}

#[async_trait]
impl<T: QueueGateway + Sync> DynQueueGateway for T {
    fn name(&self) -> &str {
        QueueGateway::name(self)
    }

    async fn send(&self, message: &OutboundMessage) -> Result<String, QueueError> {
        QueueGateway::send(self, message).await
    }

    async fn receive(&self, options: &ReceiveOptions) -> Result<Vec<QueuedMessage>, QueueError> {
        QueueGateway::receive(self, options).await
    }

    async fn delete(&self, receipt_handle: &str) -> Result<(), QueueError> {
        QueueGateway::delete(self, receipt_handle).await
    }
}

#[cfg(test)]
#[allow(clippy::unnecessary_literal_bound)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Arc;
    use std::sync::Mutex;

    use super::*;

    /// A single-slot gateway for exercising the trait and blanket impl.
    struct SlotGateway {
        slot: Mutex<Option<OutboundMessage>>,
        fail: bool,
    }

    impl SlotGateway {
        fn new(fail: bool) -> Self {
            Self {
                slot: Mutex::new(None),
                fail,
            }
        }
    }

    impl QueueGateway for SlotGateway {
        fn name(&self) -> &str {
            "slot"
        }

        async fn send(&self, message: &OutboundMessage) -> Result<String, QueueError> {
            if self.fail {
                return Err(QueueError::Connection("mock failure".into()));
            }
            *self.slot.lock().unwrap() = Some(message.clone());
            Ok("m-1".into())
        }

        async fn receive(
            &self,
            _options: &ReceiveOptions,
        ) -> Result<Vec<QueuedMessage>, QueueError> {
            let taken = self.slot.lock().unwrap().take();
            Ok(taken
                .into_iter()
                .map(|m| QueuedMessage {
                    message_id: Some("m-1".into()),
                    body: m.body,
                    receipt_handle: "r-1".into(),
                    attributes: m.attributes,
                })
                .collect())
        }

        async fn delete(&self, receipt_handle: &str) -> Result<(), QueueError> {
            if receipt_handle == "r-1" {
                Ok(())
            } else {
                Err(QueueError::InvalidReceipt(receipt_handle.into()))
            }
        }
    }

    fn outbound() -> OutboundMessage {
        OutboundMessage {
            body: "hello".into(),
            delay_seconds: 0,
            attributes: HashMap::new(),
        }
    }

    #[tokio::test]
    async fn native_trait_send_and_receive() {
        let gateway = SlotGateway::new(false);
        let id = QueueGateway::send(&gateway, &outbound()).await.unwrap();
        assert_eq!(id, "m-1");
        let got = QueueGateway::receive(&gateway, &ReceiveOptions::default())
            .await
            .unwrap();
        assert_eq!(got.len(), 1);
        assert_eq!(got[0].body, "hello");
    }

    #[tokio::test]
    async fn blanket_dyn_gateway_impl() {
        let gateway: Arc<dyn DynQueueGateway> = Arc::new(SlotGateway::new(false));
        assert_eq!(gateway.name(), "slot");
        gateway.send(&outbound()).await.unwrap();
        let got = gateway.receive(&ReceiveOptions::default()).await.unwrap();
        gateway.delete(&got[0].receipt_handle).await.unwrap();
    }

    #[tokio::test]
    async fn dyn_gateway_propagates_errors() {
        let gateway: Arc<dyn DynQueueGateway> = Arc::new(SlotGateway::new(true));
        let err = gateway.send(&outbound()).await.unwrap_err();
        assert!(matches!(err, QueueError::Connection(_)));
        let err = gateway.delete("nope").await.unwrap_err();
        assert!(matches!(err, QueueError::InvalidReceipt(_)));
    }
}
