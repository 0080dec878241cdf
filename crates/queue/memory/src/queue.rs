use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::Notify;
use tokio::time::Instant;
use tracing::debug;
use uuid::Uuid;

use delaysqs_core::{MAX_QUEUE_DELAY_SECONDS, MessageAttribute, OutboundMessage, QueuedMessage};
use delaysqs_queue::{QueueError, QueueGateway, ReceiveOptions};

/// A single message held by the in-memory queue.
#[derive(Debug, Clone)]
struct Entry {
    seq: u64,
    body: String,
    attributes: HashMap<String, MessageAttribute>,
    visible_at: Instant,
    receipt_handle: Option<String>,
}

impl Entry {
    /// Returns `true` once the native delay or visibility timeout has passed.
    fn is_visible(&self, now: Instant) -> bool {
        now >= self.visible_at
    }
}

#[derive(Debug, Default)]
struct Shared {
    messages: DashMap<String, Entry>,
    /// Current receipt handle -> message id.
    receipts: DashMap<String, String>,
    next_seq: AtomicU64,
    arrivals: Notify,
}

/// In-memory [`QueueGateway`] with native delays, long polling and
/// visibility timeouts.
///
/// Each receive hands out a fresh receipt handle and hides the message for
/// the visibility timeout; once it lapses the message can be received again
/// and the previous handle goes stale. Clones share the same queue.
///
/// Timing uses [`tokio::time::Instant`], so tests can drive it with a paused
/// clock.
#[derive(Debug, Clone, Default)]
pub struct MemoryQueue {
    shared: Arc<Shared>,
}

impl MemoryQueue {
    /// Create a new, empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of messages in the queue, whether visible, delayed or in flight.
    pub fn len(&self) -> usize {
        self.shared.messages.len()
    }

    /// Returns `true` if the queue holds no messages.
    pub fn is_empty(&self) -> bool {
        self.shared.messages.is_empty()
    }

    /// Number of messages currently received and not yet visible again.
    pub fn in_flight(&self) -> usize {
        let now = Instant::now();
        self.shared
            .messages
            .iter()
            .filter(|e| e.receipt_handle.is_some() && !e.is_visible(now))
            .count()
    }

    /// Earliest future instant at which a hidden message becomes visible.
    fn next_visible_at(&self, now: Instant) -> Option<Instant> {
        self.shared
            .messages
            .iter()
            .map(|e| e.visible_at)
            .filter(|at| *at > now)
            .min()
    }

    /// Claim up to `max_messages` visible messages, oldest first.
    fn claim_visible(&self, options: &ReceiveOptions) -> Vec<QueuedMessage> {
        let now = Instant::now();
        let limit = usize::try_from(options.max_messages.max(1)).unwrap_or(usize::MAX);
        let visibility = Duration::from_secs(u64::from(options.visibility_timeout_seconds));

        let mut candidates: Vec<(u64, String)> = self
            .shared
            .messages
            .iter()
            .filter(|e| e.is_visible(now))
            .map(|e| (e.seq, e.key().clone()))
            .collect();
        candidates.sort_unstable();

        let mut batch = Vec::new();
        for (_, id) in candidates {
            if batch.len() >= limit {
                break;
            }
            let Some(mut entry) = self.shared.messages.get_mut(&id) else {
                continue;
            };
            // Another receiver may have claimed it since the scan.
            if !entry.is_visible(now) {
                continue;
            }

            let receipt = Uuid::new_v4().to_string();
            if let Some(stale) = entry.receipt_handle.replace(receipt.clone()) {
                self.shared.receipts.remove(&stale);
            }
            entry.visible_at = now + visibility;

            let attributes = entry
                .attributes
                .iter()
                .filter(|(name, _)| options.wants_attribute(name))
                .map(|(name, value)| (name.clone(), value.clone()))
                .collect();
            let message = QueuedMessage {
                message_id: Some(id.clone()),
                body: entry.body.clone(),
                receipt_handle: receipt.clone(),
                attributes,
            };
            drop(entry);

            self.shared.receipts.insert(receipt, id);
            batch.push(message);
        }
        batch
    }
}

impl QueueGateway for MemoryQueue {
    #[allow(clippy::unnecessary_literal_bound)]
    fn name(&self) -> &str {
        "memory"
    }

    async fn send(&self, message: &OutboundMessage) -> Result<String, QueueError> {
        if message.delay_seconds > MAX_QUEUE_DELAY_SECONDS {
            return Err(QueueError::Service(format!(
                "delay of {}s exceeds the {MAX_QUEUE_DELAY_SECONDS}s maximum",
                message.delay_seconds
            )));
        }

        let id = Uuid::new_v4().to_string();
        let entry = Entry {
            seq: self.shared.next_seq.fetch_add(1, Ordering::Relaxed),
            body: message.body.clone(),
            attributes: message.attributes.clone(),
            visible_at: Instant::now() + Duration::from_secs(u64::from(message.delay_seconds)),
            receipt_handle: None,
        };
        self.shared.messages.insert(id.clone(), entry);
        self.shared.arrivals.notify_waiters();

        debug!(message_id = %id, delay_seconds = message.delay_seconds, "message stored");
        Ok(id)
    }

    async fn receive(&self, options: &ReceiveOptions) -> Result<Vec<QueuedMessage>, QueueError> {
        let deadline = Instant::now() + Duration::from_secs(u64::from(options.wait_seconds));

        loop {
            // Register interest before checking so a send between the check
            // and the wait is not missed.
            let arrival = self.shared.arrivals.notified();
            tokio::pin!(arrival);
            arrival.as_mut().enable();

            let batch = self.claim_visible(options);
            let now = Instant::now();
            if !batch.is_empty() || now >= deadline {
                return Ok(batch);
            }

            let wake_at = self
                .next_visible_at(now)
                .map_or(deadline, |at| at.min(deadline));
            tokio::select! {
                () = &mut arrival => {}
                () = tokio::time::sleep_until(wake_at) => {}
            }
        }
    }

    async fn delete(&self, receipt_handle: &str) -> Result<(), QueueError> {
        let Some((_, id)) = self.shared.receipts.remove(receipt_handle) else {
            return Err(QueueError::InvalidReceipt(receipt_handle.to_owned()));
        };

        let removed = self
            .shared
            .messages
            .remove_if(&id, |_, e| e.receipt_handle.as_deref() == Some(receipt_handle));
        if removed.is_none() {
            return Err(QueueError::InvalidReceipt(receipt_handle.to_owned()));
        }

        debug!(message_id = %id, "message deleted");
        Ok(())
    }
}
