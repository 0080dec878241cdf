use std::collections::HashSet;

use delaysqs_core::{DELIVERY_TIMESTAMP_ATTRIBUTE, MessageAttribute, OutboundMessage};

use crate::error::QueueError;
use crate::gateway::DynQueueGateway;
use crate::options::ReceiveOptions;

fn immediate(body: &str) -> OutboundMessage {
    let mut msg = OutboundMessage::delayed(body, 1_700_000_000, 0);
    msg.attributes
        .insert("origin".to_owned(), MessageAttribute::string("conformance"));
    msg
}

fn short_poll(max_messages: u32) -> ReceiveOptions {
    ReceiveOptions {
        wait_seconds: 1,
        visibility_timeout_seconds: 30,
        max_messages,
        ..ReceiveOptions::default()
    }
}

/// Run the gateway conformance test suite.
///
/// Call this from your backend's test module with a gateway over a fresh,
/// empty queue. Each check leaves the queue empty for the next one.
///
/// # Errors
///
/// Returns an error if a gateway operation fails unexpectedly.
pub async fn run_gateway_conformance_tests(gateway: &dyn DynQueueGateway) -> Result<(), QueueError> {
    test_empty_receive(gateway).await?;
    test_send_receive_roundtrip(gateway).await?;
    test_received_messages_are_hidden(gateway).await?;
    test_max_messages(gateway).await?;
    test_invalid_receipt(gateway).await?;
    Ok(())
}

async fn test_empty_receive(gateway: &dyn DynQueueGateway) -> Result<(), QueueError> {
    let got = gateway.receive(&short_poll(5)).await?;
    assert!(got.is_empty(), "receive on an empty queue should return nothing");
    Ok(())
}

async fn test_send_receive_roundtrip(gateway: &dyn DynQueueGateway) -> Result<(), QueueError> {
    let sent = immediate("roundtrip");
    let id = gateway.send(&sent).await?;
    assert!(!id.is_empty(), "send should return a message id");

    let got = gateway.receive(&short_poll(5)).await?;
    assert_eq!(got.len(), 1, "the sent message should be received");
    let msg = &got[0];
    assert_eq!(msg.body, "roundtrip");
    assert_eq!(
        msg.attributes.get(DELIVERY_TIMESTAMP_ATTRIBUTE),
        sent.attributes.get(DELIVERY_TIMESTAMP_ATTRIBUTE),
        "delivery timestamp attribute should round-trip"
    );
    assert_eq!(msg.delivery_timestamp(), Some(1_700_000_000));
    assert_eq!(
        msg.attributes.get("origin").map(|a| a.string_value.as_str()),
        Some("conformance")
    );

    gateway.delete(&msg.receipt_handle).await?;
    Ok(())
}

async fn test_received_messages_are_hidden(
    gateway: &dyn DynQueueGateway,
) -> Result<(), QueueError> {
    gateway.send(&immediate("hidden")).await?;
    let first = gateway.receive(&short_poll(5)).await?;
    assert_eq!(first.len(), 1);

    let second = gateway.receive(&short_poll(5)).await?;
    assert!(
        second.is_empty(),
        "a received message should be invisible during its visibility timeout"
    );

    gateway.delete(&first[0].receipt_handle).await?;
    Ok(())
}

async fn test_max_messages(gateway: &dyn DynQueueGateway) -> Result<(), QueueError> {
    for i in 0..3 {
        gateway.send(&immediate(&format!("batch-{i}"))).await?;
    }

    let mut seen = HashSet::new();
    let first = gateway.receive(&short_poll(2)).await?;
    assert!(
        !first.is_empty() && first.len() <= 2,
        "receive should honour max_messages"
    );
    for msg in &first {
        seen.insert(msg.body.clone());
        gateway.delete(&msg.receipt_handle).await?;
    }

    while seen.len() < 3 {
        let more = gateway.receive(&short_poll(2)).await?;
        assert!(!more.is_empty(), "remaining messages should be receivable");
        for msg in &more {
            seen.insert(msg.body.clone());
            gateway.delete(&msg.receipt_handle).await?;
        }
    }
    Ok(())
}

async fn test_invalid_receipt(gateway: &dyn DynQueueGateway) -> Result<(), QueueError> {
    let result = gateway.delete("not-a-receipt-handle").await;
    assert!(
        result.is_err(),
        "deleting with an unknown receipt handle should fail"
    );
    Ok(())
}
