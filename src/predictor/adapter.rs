//! Periodic predictor adapter
//!
//! Keeps a bounded price history for one symbol from its own relay
//! subscription and, on every analysis tick, asks the predictor for a
//! classification of the most recent window. Ticks without enough history
//! or with a failing predictor are skipped; nothing is escalated.
//!
//! Emitted predictions are persisted here, where they are produced, so a
//! lagging presentation consumer cannot lose them.

use rust_decimal::Decimal;
use std::collections::VecDeque;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tokio::time::{interval_at, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::common::channels::{EventBus, PredictionRelay, RelayReceiver};
use crate::common::errors::PipelineError;
use crate::common::traits::{SharedPredictor, SharedTradeStore};
use crate::common::types::{PipelineEvent, Prediction, PriceTick};

/// Periodic predictor task for one symbol
pub struct PredictorAdapter {
    symbol: String,
    predictor: SharedPredictor,
    prices: RelayReceiver<PriceTick>,
    history: VecDeque<Decimal>,
    history_capacity: usize,
    sequence_length: usize,
    interval: Duration,
    output: PredictionRelay,
    store: Option<SharedTradeStore>,
    events: Option<EventBus>,
}

impl PredictorAdapter {
    pub fn new(
        symbol: impl Into<String>,
        predictor: SharedPredictor,
        prices: RelayReceiver<PriceTick>,
        output: PredictionRelay,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            predictor,
            prices,
            history: VecDeque::new(),
            history_capacity: 1000,
            sequence_length: 0,
            interval: Duration::from_secs(60),
            output,
            store: None,
            events: None,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Maximum number of prices retained; the oldest are evicted first
    pub fn with_history_capacity(mut self, capacity: usize) -> Self {
        self.history_capacity = capacity.max(1);
        self
    }

    /// Minimum window length for this symbol. The predictor's own
    /// requirement still applies when it is longer.
    pub fn with_sequence_length(mut self, sequence_length: usize) -> Self {
        self.sequence_length = sequence_length;
        self
    }

    /// Persist every emitted prediction
    pub fn with_store(mut self, store: SharedTradeStore) -> Self {
        self.store = Some(store);
        self
    }

    /// Publish emitted predictions to the presentation fan-in as well
    pub fn with_events(mut self, events: EventBus) -> Self {
        self.events = Some(events);
        self
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    /// Observations needed before the predictor is consulted
    pub fn required_window(&self) -> usize {
        self.sequence_length.max(self.predictor.sequence_length())
    }

    /// Append a price to the history
    pub fn record(&mut self, price: Decimal) {
        if self.history.len() == self.history_capacity {
            self.history.pop_front();
        }
        self.history.push_back(price);
    }

    /// Run one analysis tick, emitting and returning the prediction if one
    /// was produced
    pub async fn analyze(&mut self) -> Option<Prediction> {
        let required = self.required_window();
        if self.history.len() < required {
            debug!(
                symbol = %self.symbol,
                "Skipping analysis: {}/{} observations",
                self.history.len(),
                required
            );
            return None;
        }

        let window: Vec<Decimal> = self
            .history
            .iter()
            .skip(self.history.len() - required)
            .copied()
            .collect();

        let started = Instant::now();
        let prediction = match self.predictor.predict(&self.symbol, &window).await {
            Ok(prediction) => {
                prediction.with_latency_ms(started.elapsed().as_secs_f64() * 1000.0)
            }
            Err(PipelineError::InsufficientData { available, required }) => {
                debug!(symbol = %self.symbol, available, required, "Predictor needs more data");
                return None;
            }
            Err(e) => {
                warn!(symbol = %self.symbol, "Prediction failed, tick skipped: {}", e);
                return None;
            }
        };

        info!(
            symbol = %self.symbol,
            trend = %prediction.trend,
            confidence = prediction.confidence,
            latency_ms = prediction.latency_ms,
            "Prediction emitted"
        );

        self.output.offer(prediction.clone());

        if let Some(store) = &self.store {
            if let Err(e) = store.save_prediction(&self.symbol, &prediction).await {
                warn!(symbol = %self.symbol, "Failed to persist prediction: {}", e);
            }
        }
        if let Some(events) = &self.events {
            events.offer(PipelineEvent::Prediction {
                symbol: self.symbol.clone(),
                prediction: prediction.clone(),
            });
        }
        Some(prediction)
    }

    /// Run until shutdown or until the price relay closes. Returns the
    /// number of predictions emitted.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) -> u64 {
        let mut ticker = interval_at(tokio::time::Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut emitted = 0;

        info!(
            symbol = %self.symbol,
            predictor = self.predictor.name(),
            "Predictor adapter started, analysing every {:?}",
            self.interval
        );

        loop {
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
                tick = self.prices.recv() => match tick {
                    Some(tick) => self.record(tick.price),
                    None => {
                        debug!(symbol = %self.symbol, "Price relay closed");
                        break;
                    }
                },
                _ = ticker.tick() => {
                    if self.analyze().await.is_some() {
                        emitted += 1;
                    }
                }
            }
        }

        info!(symbol = %self.symbol, emitted, "Predictor adapter stopped");
        emitted
    }
}
