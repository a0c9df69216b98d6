//! Common test utilities and fixtures

#![allow(dead_code)]

use async_trait::async_trait;
use rust_decimal::Decimal;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::watch;

use trend_pilot::common::channels::PriceRelay;
use trend_pilot::common::errors::{PipelineError, Result};
use trend_pilot::common::traits::{Predictor, PriceSource, TradeStore};
use trend_pilot::common::types::{
    Owner, Prediction, PriceTick, Trade, TradeKind, TradeStats, TrendClass,
};
use trend_pilot::storage::InMemoryTradeStore;

/// Prediction whose `trend` class carries `probability` and the other two
/// classes split the rest
pub fn prediction(trend: TrendClass, probability: f64, price: Decimal) -> Prediction {
    let rest = (1.0 - probability) / 2.0;
    let probabilities = [TrendClass::Neutral, TrendClass::Up, TrendClass::Down]
        .into_iter()
        .map(|c| (c, if c == trend { probability } else { rest }))
        .collect::<HashMap<_, _>>();
    Prediction::from_probabilities(probabilities, price)
}

pub fn tick(symbol: &str, price: Decimal) -> PriceTick {
    PriceTick::new(symbol, price, Decimal::ONE)
}

/// Price source that replays a fixed list of prices once per connection
/// and then stays connected until shutdown. Symbols without a script fail
/// to connect.
#[derive(Default)]
pub struct ScriptedSource {
    scripts: HashMap<String, Vec<Decimal>>,
    attempts: Mutex<HashMap<String, u64>>,
}

impl ScriptedSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_script(mut self, symbol: &str, prices: Vec<Decimal>) -> Self {
        self.scripts.insert(symbol.to_string(), prices);
        self
    }

    pub fn attempts(&self, symbol: &str) -> u64 {
        self.attempts
            .lock()
            .unwrap()
            .get(symbol)
            .copied()
            .unwrap_or(0)
    }
}

#[async_trait]
impl PriceSource for ScriptedSource {
    async fn stream(
        &self,
        symbol: &str,
        relay: &PriceRelay,
        shutdown: &mut watch::Receiver<bool>,
    ) -> Result<()> {
        *self
            .attempts
            .lock()
            .unwrap()
            .entry(symbol.to_string())
            .or_default() += 1;

        let Some(prices) = self.scripts.get(symbol) else {
            return Err(PipelineError::WebSocketConnection(format!(
                "{}: connection refused",
                symbol
            )));
        };

        for price in prices {
            relay.offer(tick(symbol, *price));
        }

        while !*shutdown.borrow() {
            if shutdown.changed().await.is_err() {
                break;
            }
        }
        Ok(())
    }

    fn source_name(&self) -> &'static str {
        "scripted"
    }
}

/// Predictor returning queued predictions in order, NEUTRAL once drained
pub struct ScriptedPredictor {
    queue: Mutex<VecDeque<(TrendClass, f64)>>,
    calls: AtomicU64,
}

impl ScriptedPredictor {
    pub fn new(script: Vec<(TrendClass, f64)>) -> Self {
        Self {
            queue: Mutex::new(script.into()),
            calls: AtomicU64::new(0),
        }
    }

    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Predictor for ScriptedPredictor {
    async fn predict(&self, _symbol: &str, window: &[Decimal]) -> Result<Prediction> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let last = window.last().copied().ok_or(PipelineError::InsufficientData {
            available: 0,
            required: 1,
        })?;
        let (trend, probability) = self
            .queue
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or((TrendClass::Neutral, 0.6));
        Ok(prediction(trend, probability, last))
    }

    fn sequence_length(&self) -> usize {
        1
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

/// Store whose trade writes always fail; everything else is delegated to
/// an in-memory store
#[derive(Default)]
pub struct FailingStore {
    inner: InMemoryTradeStore,
    rejected: AtomicU64,
}

impl FailingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rejected(&self) -> u64 {
        self.rejected.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TradeStore for FailingStore {
    async fn get_or_create_owner(&self, email: &str, default_balance: Decimal) -> Result<Owner> {
        self.inner.get_or_create_owner(email, default_balance).await
    }

    async fn save_trade(&self, _trade: &Trade) -> Result<i64> {
        self.rejected.fetch_add(1, Ordering::SeqCst);
        Err(PipelineError::Persistence("connection reset".into()))
    }

    async fn update_audit_hash(&self, trade_id: i64, hash: &str) -> Result<()> {
        self.inner.update_audit_hash(trade_id, hash).await
    }

    async fn last_trade_of_kind(
        &self,
        owner_id: i64,
        symbol: &str,
        kind: TradeKind,
    ) -> Result<Option<Trade>> {
        self.inner.last_trade_of_kind(owner_id, symbol, kind).await
    }

    async fn win_count(&self, owner_id: i64, symbol: &str) -> Result<u64> {
        self.inner.win_count(owner_id, symbol).await
    }

    async fn recent_trades(&self, owner_id: i64, symbol: &str, limit: usize) -> Result<Vec<Trade>> {
        self.inner.recent_trades(owner_id, symbol, limit).await
    }

    async fn stats(&self, owner_id: i64) -> Result<TradeStats> {
        self.inner.stats(owner_id).await
    }

    async fn save_prediction(&self, symbol: &str, prediction: &Prediction) -> Result<()> {
        self.inner.save_prediction(symbol, prediction).await
    }
}

pub fn shared<T>(value: T) -> Arc<T> {
    Arc::new(value)
}

/// Sample Binance stream messages for testing parsing
pub mod ws_messages {
    /// Trade event for BTCUSDT
    pub const TRADE: &str = r#"{
        "e": "trade",
        "E": 1704067200123,
        "s": "BTCUSDT",
        "t": 3265840113,
        "p": "42150.25000000",
        "q": "0.01200000",
        "T": 1704067200120,
        "m": true,
        "M": true
    }"#;

    /// Acknowledgement of a SUBSCRIBE request
    pub const SUBSCRIBE_ACK: &str = r#"{"result": null, "id": 1}"#;

    /// Aggregate trade event, not consumed by the feed
    pub const AGG_TRADE: &str = r#"{
        "e": "aggTrade",
        "E": 1704067200123,
        "s": "BTCUSDT",
        "a": 26129,
        "p": "42150.25",
        "q": "0.5",
        "f": 100,
        "l": 105,
        "T": 1704067200120,
        "m": true
    }"#;

    /// Trade event with a zero price
    pub const ZERO_PRICE_TRADE: &str = r#"{
        "e": "trade",
        "E": 1704067200123,
        "s": "BTCUSDT",
        "t": 1,
        "p": "0.00000000",
        "q": "1.0",
        "T": 1704067200120,
        "m": false
    }"#;
}
