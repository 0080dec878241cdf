/// Longest native delay the queue accepts, in seconds.
pub const MAX_QUEUE_DELAY_SECONDS: u32 = 900;

/// What to do with a message given its delivery time.
///
/// Both the producer path (enqueue) and the consumer path (a received
/// message) go through [`Schedule::for_timestamp`], so a message is judged
/// the same way no matter how many times it has been resent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Schedule {
    /// The delivery time has been reached: hand the payload to the consumer.
    DeliverNow,
    /// Not due yet: (re)send with this native delay. Never exceeds the
    /// ceiling passed to [`Schedule::for_timestamp`], so a far-off delivery
    /// takes several hops.
    Delay(u32),
}

impl Schedule {
    /// Decide between delivery and a bounded delay.
    ///
    /// `deliver_at` of `None` means "due now". `max_delay` caps the returned
    /// delay and is itself capped at [`MAX_QUEUE_DELAY_SECONDS`].
    pub fn for_timestamp(deliver_at: Option<i64>, now: i64, max_delay: u32) -> Self {
        let Some(deliver_at) = deliver_at else {
            return Self::DeliverNow;
        };
        let remaining = deliver_at.saturating_sub(now);
        if remaining <= 0 {
            return Self::DeliverNow;
        }
        let ceiling = max_delay.min(MAX_QUEUE_DELAY_SECONDS);
        let delay = u32::try_from(remaining).map_or(ceiling, |r| r.min(ceiling));
        Self::Delay(delay)
    }

    /// Returns `true` for [`Schedule::DeliverNow`].
    pub fn is_due(self) -> bool {
        matches!(self, Self::DeliverNow)
    }
}
