//! Bounded channels for inter-task communication
//!
//! Every hop of a symbol pipeline goes through a [`BoundedRelay`]: the
//! producer never blocks, and a consumer that falls behind loses its oldest
//! unread items while the newest ones stay available.

use tokio::sync::broadcast::{self, error::RecvError, error::TryRecvError};
use tracing::debug;

use super::types::{PipelineEvent, Prediction, PriceTick};

/// Default price relay capacity per symbol
pub const DEFAULT_RELAY_CAPACITY: usize = 100;

/// Default prediction channel capacity per symbol
pub const DEFAULT_PREDICTION_CAPACITY: usize = 10;

/// Default capacity of the shared presentation fan-in
pub const DEFAULT_EVENT_CAPACITY: usize = 1000;

/// Default capacity of the shared quote bus
pub const DEFAULT_QUOTE_CAPACITY: usize = 1000;

/// Fixed-capacity, multi-consumer relay with a non-blocking producer side.
///
/// Backed by `tokio::sync::broadcast`, so the effective ring size is
/// `capacity` rounded up to the next power of two.
#[derive(Debug)]
pub struct BoundedRelay<T> {
    sender: broadcast::Sender<T>,
    capacity: usize,
}

impl<T> Clone for BoundedRelay<T> {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
            capacity: self.capacity,
        }
    }
}

impl<T: Clone> BoundedRelay<T> {
    /// Create a relay holding at most `capacity` unread items per consumer
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (sender, _) = broadcast::channel(capacity);
        Self { sender, capacity }
    }

    /// Offer an item to every active consumer without waiting.
    ///
    /// Returns how many consumers the item reached; zero when nobody listens,
    /// in which case the item is discarded.
    pub fn offer(&self, item: T) -> usize {
        self.sender.send(item).unwrap_or(0)
    }

    /// Attach a new consumer. It only sees items offered after this call.
    pub fn subscribe(&self) -> RelayReceiver<T> {
        RelayReceiver {
            inner: self.sender.subscribe(),
            dropped: 0,
        }
    }

    pub fn consumer_count(&self) -> usize {
        self.sender.receiver_count()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

/// Consumer side of a [`BoundedRelay`]
#[derive(Debug)]
pub struct RelayReceiver<T> {
    inner: broadcast::Receiver<T>,
    dropped: u64,
}

impl<T: Clone> RelayReceiver<T> {
    /// Wait for the next item. Overflow losses are counted and skipped;
    /// `None` means every producer handle is gone.
    pub async fn recv(&mut self) -> Option<T> {
        loop {
            match self.inner.recv().await {
                Ok(item) => return Some(item),
                Err(RecvError::Lagged(n)) => {
                    self.dropped += n;
                    debug!("Relay consumer lagged, {} items dropped", n);
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }

    /// Take the next item if one is queued
    pub fn try_recv(&mut self) -> Option<T> {
        loop {
            match self.inner.try_recv() {
                Ok(item) => return Some(item),
                Err(TryRecvError::Lagged(n)) => {
                    self.dropped += n;
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => return None,
            }
        }
    }

    /// Total items this consumer lost to overflow
    pub fn dropped(&self) -> u64 {
        self.dropped
    }
}

/// Per-symbol relay carrying feed observations
pub type PriceRelay = BoundedRelay<PriceTick>;

/// Per-symbol relay carrying predictions to the decision engine
pub type PredictionRelay = BoundedRelay<Prediction>;

/// Process-wide fan-in of pipeline updates for presentation consumers
pub type EventBus = BoundedRelay<PipelineEvent>;

/// Create a price relay with the default capacity
pub fn create_price_relay() -> PriceRelay {
    BoundedRelay::new(DEFAULT_RELAY_CAPACITY)
}

/// Create a prediction relay with a custom capacity
pub fn create_prediction_relay(capacity: usize) -> PredictionRelay {
    BoundedRelay::new(capacity)
}

/// Create the shared event bus with a custom capacity
pub fn create_event_bus(capacity: usize) -> EventBus {
    BoundedRelay::new(capacity)
}

/// Create the shared quote bus. Every symbol's price ticks land here for
/// presentation; only the newest price per symbol matters to its reader.
pub fn create_quote_bus(capacity: usize) -> PriceRelay {
    BoundedRelay::new(capacity)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_offer_without_consumers_is_discarded() {
        let relay: BoundedRelay<u32> = BoundedRelay::new(4);
        assert_eq!(relay.offer(1), 0);
        assert_eq!(relay.consumer_count(), 0);
    }

    #[tokio::test]
    async fn test_fifo_delivery_within_capacity() {
        let relay = BoundedRelay::new(8);
        let mut rx = relay.subscribe();

        for i in 0..5u32 {
            assert_eq!(relay.offer(i), 1);
        }

        for i in 0..5u32 {
            assert_eq!(rx.recv().await, Some(i));
        }
        assert_eq!(rx.dropped(), 0);
    }

    #[tokio::test]
    async fn test_overflow_keeps_newest_items() {
        let relay = BoundedRelay::new(8);
        let mut rx = relay.subscribe();

        // Producer runs far ahead of a consumer that never reads.
        for i in 0..20u32 {
            relay.offer(i);
        }

        let first = rx.recv().await;
        assert_eq!(first, Some(12));
        assert_eq!(rx.dropped(), 12);

        let mut rest = Vec::new();
        while let Some(item) = rx.try_recv() {
            rest.push(item);
        }
        assert_eq!(rest, (13..20).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_producer_never_waits_on_slow_consumer() {
        let relay = BoundedRelay::new(DEFAULT_RELAY_CAPACITY);
        let _idle = relay.subscribe();

        let offered = tokio::time::timeout(Duration::from_millis(500), async {
            for i in 0..100_000u32 {
                relay.offer(i);
            }
        })
        .await;

        assert!(offered.is_ok());
    }

    #[tokio::test]
    async fn test_recv_returns_none_after_close() {
        let relay: BoundedRelay<u32> = BoundedRelay::new(2);
        let mut rx = relay.subscribe();
        relay.offer(7);
        drop(relay);

        assert_eq!(rx.recv().await, Some(7));
        assert_eq!(rx.recv().await, None);
    }

    #[tokio::test]
    async fn test_each_consumer_gets_every_item() {
        let relay = BoundedRelay::new(4);
        let mut a = relay.subscribe();
        let mut b = relay.subscribe();

        assert_eq!(relay.offer("tick"), 2);
        assert_eq!(a.recv().await, Some("tick"));
        assert_eq!(b.recv().await, Some("tick"));
    }
}
