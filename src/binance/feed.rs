//! Reconnecting feed producer
//!
//! Drives a [`PriceSource`] for one symbol forever: whenever the stream ends
//! or fails, it waits a fixed backoff and connects again. Only the owning
//! symbol is affected by an outage.

use std::time::Duration;
use tokio::sync::watch;
use tracing::{error, info, warn};

use crate::common::channels::PriceRelay;
use crate::common::traits::SharedPriceSource;

/// Feed producer task for one symbol
pub struct FeedProducer {
    source: SharedPriceSource,
    symbol: String,
    relay: PriceRelay,
    backoff: Duration,
}

impl FeedProducer {
    pub fn new(source: SharedPriceSource, symbol: impl Into<String>, relay: PriceRelay) -> Self {
        Self {
            source,
            symbol: symbol.into(),
            relay,
            backoff: Duration::from_secs(5),
        }
    }

    /// Set the delay between a disconnect and the next attempt
    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    /// Run until shutdown, returning the number of connection attempts made
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) -> u64 {
        let mut attempts: u64 = 0;

        loop {
            if *shutdown.borrow() {
                break;
            }

            attempts += 1;
            match self
                .source
                .stream(&self.symbol, &self.relay, &mut shutdown)
                .await
            {
                Ok(()) => info!(symbol = %self.symbol, "Feed stream ended"),
                Err(e) if e.is_transient() => {
                    warn!(symbol = %self.symbol, "Feed connection lost: {}", e)
                }
                Err(e) => error!(symbol = %self.symbol, "Feed failed: {}", e),
            }

            if *shutdown.borrow() {
                break;
            }

            warn!(
                symbol = %self.symbol,
                "Reconnecting {} feed in {:?}",
                self.source.source_name(),
                self.backoff
            );
            tokio::select! {
                _ = tokio::time::sleep(self.backoff) => {}
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        info!(symbol = %self.symbol, attempts, "Feed producer stopped");
        attempts
    }
}
