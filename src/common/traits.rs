//! Trait definitions for the collaborators a symbol pipeline talks to
//!
//! Concrete implementations are built once at startup and handed to every
//! pipeline as shared handles.

use async_trait::async_trait;
use rust_decimal::Decimal;
use std::sync::Arc;
use tokio::sync::watch;

use super::channels::PriceRelay;
use super::errors::Result;
use super::types::{Owner, Prediction, Trade, TradeKind, TradeStats};

/// Trait for live price feeds (Binance, replay files, etc.)
#[async_trait]
pub trait PriceSource: Send + Sync {
    /// Connect, subscribe to `symbol` and offer every valid observation to
    /// `relay` until the connection ends or `shutdown` flips to `true`.
    ///
    /// Returning `Ok(())` means the stream ended normally; the caller decides
    /// whether to reconnect.
    async fn stream(
        &self,
        symbol: &str,
        relay: &PriceRelay,
        shutdown: &mut watch::Receiver<bool>,
    ) -> Result<()>;

    /// Get the name of the source
    fn source_name(&self) -> &'static str;
}

/// Trend classifier over a window of recent prices
#[async_trait]
pub trait Predictor: Send + Sync {
    /// Classify the window, oldest price first.
    ///
    /// # Errors
    /// `PipelineError::InsufficientData` when the window is shorter than
    /// [`Predictor::sequence_length`].
    async fn predict(&self, symbol: &str, window: &[Decimal]) -> Result<Prediction>;

    /// Number of observations required for one prediction
    fn sequence_length(&self) -> usize;

    fn name(&self) -> &str;
}

/// Durable record of trades, owners and predictions
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TradeStore: Send + Sync {
    /// Look up an owner by email, creating it with `default_balance` if absent
    async fn get_or_create_owner(&self, email: &str, default_balance: Decimal) -> Result<Owner>;

    /// Persist a trade and return its assigned id
    async fn save_trade(&self, trade: &Trade) -> Result<i64>;

    /// Attach an audit reference hash to a stored trade
    async fn update_audit_hash(&self, trade_id: i64, hash: &str) -> Result<()>;

    /// Most recent trade of `kind` for this owner and symbol
    async fn last_trade_of_kind(
        &self,
        owner_id: i64,
        symbol: &str,
        kind: TradeKind,
    ) -> Result<Option<Trade>>;

    /// Number of trades with positive realized profit
    async fn win_count(&self, owner_id: i64, symbol: &str) -> Result<u64>;

    /// Newest trades first, at most `limit`
    async fn recent_trades(&self, owner_id: i64, symbol: &str, limit: usize) -> Result<Vec<Trade>>;

    /// Statistics across every symbol traded by the owner
    async fn stats(&self, owner_id: i64) -> Result<TradeStats>;

    async fn save_prediction(&self, symbol: &str, prediction: &Prediction) -> Result<()>;
}

/// Public ledger used to anchor executed trades
#[async_trait]
pub trait AuditLedger: Send + Sync {
    /// Record the trade and return its reference hash
    async fn record_trade(&self, trade: &Trade) -> Result<String>;

    /// Check whether a reference hash is known to the ledger
    async fn verify(&self, hash: &str) -> Result<bool>;

    /// Human readable link for a reference hash, if the ledger has an explorer
    fn explorer_url(&self, hash: &str) -> Option<String>;

    fn ledger_name(&self) -> &'static str;
}

/// Shared price source handle
pub type SharedPriceSource = Arc<dyn PriceSource>;

/// Shared predictor handle
pub type SharedPredictor = Arc<dyn Predictor>;

/// Shared trade store handle
pub type SharedTradeStore = Arc<dyn TradeStore>;

/// Shared audit ledger handle
pub type SharedAuditLedger = Arc<dyn AuditLedger>;
