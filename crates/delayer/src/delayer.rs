use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use tokio::task::{JoinHandle, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use delaysqs_core::{DeliveryRequest, EnqueueReceipt, OutboundMessage, QueuedMessage, Schedule};
use delaysqs_queue::{DynQueueGateway, ReceiveOptions};

use crate::config::DelayerConfig;
use crate::error::DelayerError;
use crate::handler::{Clock, DeliveryHandler, ErrorHandler, LogErrorHandler, SystemClock};

/// Builder for [`Delayer`].
#[derive(Default)]
pub struct DelayerBuilder {
    queue: Option<Arc<dyn DynQueueGateway>>,
    delivery: Option<Arc<dyn DeliveryHandler>>,
    errors: Option<Arc<dyn ErrorHandler>>,
    clock: Option<Arc<dyn Clock>>,
    config: DelayerConfig,
}

impl DelayerBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the queue all messages go through. Required.
    #[must_use]
    pub fn queue(mut self, queue: Arc<dyn DynQueueGateway>) -> Self {
        self.queue = Some(queue);
        self
    }

    /// Set the consumer of due payloads. Required.
    #[must_use]
    pub fn delivery_handler(mut self, handler: impl DeliveryHandler + 'static) -> Self {
        self.delivery = Some(Arc::new(handler));
        self
    }

    /// Set the error sink. Defaults to [`LogErrorHandler`].
    #[must_use]
    pub fn error_handler(mut self, handler: impl ErrorHandler + 'static) -> Self {
        self.errors = Some(Arc::new(handler));
        self
    }

    /// Override the time source. Defaults to [`SystemClock`].
    #[must_use]
    pub fn clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Some(Arc::new(clock));
        self
    }

    #[must_use]
    pub fn config(mut self, config: DelayerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn build(self) -> Result<Delayer, DelayerError> {
        let queue = self
            .queue
            .ok_or_else(|| DelayerError::Configuration("a queue is required".into()))?;
        let delivery = self
            .delivery
            .ok_or_else(|| DelayerError::Configuration("a delivery handler is required".into()))?;
        self.config.validate()?;

        Ok(Delayer {
            inner: Arc::new(Inner {
                queue,
                delivery,
                errors: self.errors.unwrap_or_else(|| Arc::new(LogErrorHandler)),
                clock: self.clock.unwrap_or_else(|| Arc::new(SystemClock)),
                receive_options: self.config.receive_options(),
                config: self.config,
                run: Mutex::new(None),
                next_run: AtomicU64::new(0),
                loops: Mutex::new(Vec::new()),
            }),
        })
    }
}

/// Delivers payloads at or after a requested time over a queue whose native
/// delay is bounded.
///
/// Deliveries further out than the delay ceiling are carried by a staircase
/// of resends: each time the message surfaces early, the poll loop sends a
/// fresh copy with the next bounded delay and deletes the old one. The
/// delivery timestamp rides along as a message attribute and never changes.
///
/// Cloning is cheap; clones share the same polling state.
#[derive(Clone)]
pub struct Delayer {
    inner: Arc<Inner>,
}

struct Inner {
    queue: Arc<dyn DynQueueGateway>,
    delivery: Arc<dyn DeliveryHandler>,
    errors: Arc<dyn ErrorHandler>,
    clock: Arc<dyn Clock>,
    config: DelayerConfig,
    receive_options: ReceiveOptions,
    /// The running poll loop; `None` while stopped.
    run: Mutex<Option<Run>>,
    next_run: AtomicU64,
    /// Loops not yet awaited by a shutdown, including stopped ones still
    /// finishing their last cycle.
    loops: Mutex<Vec<JoinHandle<()>>>,
}

struct Run {
    id: u64,
    token: CancellationToken,
}

/// Clears the run state when a poll loop exits, unless a newer run has
/// replaced it. Covers loops that die by panicking.
struct RunGuard {
    inner: Arc<Inner>,
    id: u64,
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        let mut run = self.inner.run.lock();
        if run.as_ref().is_some_and(|r| r.id == self.id) {
            warn!(queue = self.inner.queue.name(), "poll loop exited while running");
            *run = None;
        }
    }
}

impl std::fmt::Debug for Delayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Delayer")
            .field("queue", &self.inner.queue.name())
            .field("config", &self.inner.config)
            .field("polling", &self.is_polling())
            .finish_non_exhaustive()
    }
}

impl Delayer {
    pub fn builder() -> DelayerBuilder {
        DelayerBuilder::new()
    }

    pub fn config(&self) -> &DelayerConfig {
        &self.inner.config
    }

    /// Deliver `payload` no earlier than `deliver_at` (epoch seconds).
    ///
    /// A time that has already passed is delivered right away through the
    /// delivery handler and the receipt carries no message id. Otherwise one
    /// message is sent with a delay of at most the configured ceiling.
    #[instrument(skip(self, payload))]
    pub async fn enqueue(
        &self,
        payload: impl Into<String>,
        deliver_at: i64,
    ) -> Result<EnqueueReceipt, DelayerError> {
        let payload = payload.into();
        let now = self.inner.clock.now();

        match Schedule::for_timestamp(Some(deliver_at), now, self.inner.config.max_delay_seconds) {
            Schedule::DeliverNow => {
                debug!("delivery time already passed, delivering immediately");
                self.inner
                    .delivery
                    .deliver(&payload)
                    .await
                    .map_err(|e| DelayerError::Delivery(e.to_string()))?;
                Ok(EnqueueReceipt::delivered())
            }
            Schedule::Delay(delay_seconds) => {
                let message = OutboundMessage::delayed(payload, deliver_at, delay_seconds);
                let message_id = self
                    .inner
                    .queue
                    .send(&message)
                    .await
                    .map_err(DelayerError::QueueWrite)?;
                info!(message_id = %message_id, delay_seconds, "message queued");
                Ok(EnqueueReceipt::queued(message_id))
            }
        }
    }

    pub async fn enqueue_request(
        &self,
        request: DeliveryRequest,
    ) -> Result<EnqueueReceipt, DelayerError> {
        self.enqueue(request.payload, request.deliver_at).await
    }

    /// Enqueue for delivery at a calendar instant. Sub-second precision is
    /// dropped.
    pub async fn enqueue_at(
        &self,
        payload: impl Into<String>,
        deliver_at: DateTime<Utc>,
    ) -> Result<EnqueueReceipt, DelayerError> {
        self.enqueue_request(DeliveryRequest::from_datetime(payload, deliver_at))
            .await
    }

    /// Serialize `value` as JSON and enqueue it.
    pub async fn enqueue_json<T: Serialize + ?Sized>(
        &self,
        value: &T,
        deliver_at: i64,
    ) -> Result<EnqueueReceipt, DelayerError> {
        let payload = serde_json::to_string(value)?;
        self.enqueue(payload, deliver_at).await
    }

    /// Start the poll loop. Does nothing if it is already running.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start_polling(&self) {
        let mut run = self.inner.run.lock();
        if run.is_some() {
            return;
        }
        let id = self.inner.next_run.fetch_add(1, Ordering::Relaxed);
        let token = CancellationToken::new();
        *run = Some(Run {
            id,
            token: token.clone(),
        });

        let inner = Arc::clone(&self.inner);
        let handle = tokio::spawn(async move {
            let guard = RunGuard {
                inner: Arc::clone(&inner),
                id,
            };
            inner.poll_loop(token).await;
            drop(guard);
        });

        let mut loops = self.inner.loops.lock();
        loops.retain(|h| !h.is_finished());
        loops.push(handle);
    }

    /// Ask the poll loop to stop after its current cycle.
    ///
    /// A receive already waiting on the queue is not interrupted; use
    /// [`Delayer::shutdown`] to wait for the loop to finish.
    pub fn stop_polling(&self) {
        if let Some(run) = self.inner.run.lock().take() {
            info!(queue = self.inner.queue.name(), "stopping poll loop");
            run.token.cancel();
        }
    }

    /// Whether polling has been started and not stopped since. Says nothing
    /// about whether a cycle is executing right now.
    pub fn is_polling(&self) -> bool {
        self.inner.run.lock().is_some()
    }

    /// Run one receive/process cycle and return how many messages were
    /// settled. This is the unit the poll loop repeats.
    ///
    /// Returns 0 without receiving while the poll loop is running, so at most
    /// one batch is ever in flight.
    pub async fn poll_once(&self) -> usize {
        if self.is_polling() {
            debug!("poll loop is running, skipping manual poll");
            return 0;
        }
        self.inner.cycle().await
    }

    /// Stop polling and wait until every poll loop started before this call
    /// has finished its in-flight cycle.
    ///
    /// A loop started while the shutdown is waiting is left running.
    pub async fn shutdown(&self) {
        let loops = {
            let mut run = self.inner.run.lock();
            if let Some(run) = run.take() {
                info!(queue = self.inner.queue.name(), "stopping poll loop");
                run.token.cancel();
            }
            std::mem::take(&mut *self.inner.loops.lock())
        };

        for handle in loops {
            if let Err(e) = handle.await {
                warn!(error = %e, "poll loop ended abnormally");
            }
        }
        info!(queue = self.inner.queue.name(), "delayer shut down");
    }
}

impl Inner {
    async fn poll_loop(self: Arc<Self>, token: CancellationToken) {
        info!(queue = self.queue.name(), "poll loop started");
        while !token.is_cancelled() {
            self.cycle().await;
            tokio::task::yield_now().await;
        }
        info!(queue = self.queue.name(), "poll loop stopped");
    }

    /// Receive one batch and process it, waiting for every message to settle.
    async fn cycle(self: &Arc<Self>) -> usize {
        debug!(
            wait_seconds = self.receive_options.wait_seconds,
            "starting the long poll"
        );
        let messages = match self.queue.receive(&self.receive_options).await {
            Ok(messages) => messages,
            Err(e) => {
                self.report(&DelayerError::QueueRead(e));
                return 0;
            }
        };

        if messages.is_empty() {
            debug!("returning from long poll with no messages");
            return 0;
        }
        info!(count = messages.len(), "received message(s)");

        let mut batch = JoinSet::new();
        for message in messages {
            let inner = Arc::clone(self);
            batch.spawn(async move { inner.process(message).await });
        }

        let mut settled = 0;
        while let Some(joined) = batch.join_next().await {
            settled += 1;
            if let Err(e) = joined {
                self.report(&DelayerError::TaskPanicked(e.to_string()));
            }
        }
        settled
    }

    async fn process(&self, message: QueuedMessage) {
        let now = self.clock.now();
        match Schedule::for_timestamp(
            message.delivery_timestamp(),
            now,
            self.config.max_delay_seconds,
        ) {
            Schedule::DeliverNow => self.deliver_due(&message).await,
            Schedule::Delay(delay_seconds) => self.forward(&message, delay_seconds).await,
        }
    }

    async fn deliver_due(&self, message: &QueuedMessage) {
        if let Err(e) = self.delivery.deliver(&message.body).await {
            warn!(
                message_id = message.message_id.as_deref().unwrap_or("unknown"),
                "delivery failed, leaving message for redelivery"
            );
            self.report(&DelayerError::Delivery(e.to_string()));
            return;
        }

        if let Err(e) = self.queue.delete(&message.receipt_handle).await {
            self.report(&DelayerError::QueueAck(e));
            return;
        }
        debug!(
            message_id = message.message_id.as_deref().unwrap_or("unknown"),
            "message delivered and deleted"
        );
    }

    /// Resend with the next bounded delay, then retire the received instance.
    async fn forward(&self, message: &QueuedMessage, delay_seconds: u32) {
        let new_id = match self.queue.send(&message.forward(delay_seconds)).await {
            Ok(id) => id,
            Err(e) => {
                self.report(&DelayerError::QueueWrite(e));
                return;
            }
        };
        info!(
            message_id = message.message_id.as_deref().unwrap_or("unknown"),
            new_message_id = %new_id,
            delay_seconds,
            "put back to queue, deleting current instance"
        );

        if let Err(e) = self.queue.delete(&message.receipt_handle).await {
            self.report(&DelayerError::QueueAck(e));
        }
    }

    fn report(&self, error: &DelayerError) {
        let handled =
            std::panic::catch_unwind(AssertUnwindSafe(|| self.errors.on_error(error)));
        if handled.is_err() {
            error!(error = %error, "error handler panicked");
        }
    }
}
