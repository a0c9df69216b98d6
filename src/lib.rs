//! TrendPilot Library
//!
//! Streams Binance trade ticks per symbol, classifies the short-term trend
//! at a fixed interval and paper-trades each symbol's portfolio on confident
//! predictions. Executed trades are persisted and anchored to an audit
//! ledger without ever blocking the trading path.

pub mod audit;
pub mod binance;
pub mod common;
pub mod config;
pub mod pipeline;
pub mod predictor;
pub mod reporting;
pub mod storage;
pub mod strategy;

// Re-export commonly used types
pub use common::channels::{BoundedRelay, EventBus, PredictionRelay, PriceRelay, RelayReceiver};
pub use common::errors::{PipelineError, Result};
pub use common::traits::{AuditLedger, PriceSource, Predictor, TradeStore};
pub use common::types::{
    Owner, PipelineEvent, PortfolioSnapshot, Prediction, PriceTick, Trade, TradeKind, TradeStats,
    TrendClass,
};
pub use config::types::{AppConfig, PipelineSettings};

pub use audit::{AuditDispatcher, HashingAuditLedger, RpcAuditLedger};
pub use binance::{BinanceTradeSource, FeedProducer};
pub use pipeline::{PipelineHandle, SharedServices, SymbolPipeline, TradingSystem};
pub use predictor::{MomentumPredictor, PredictorAdapter};
pub use reporting::DashboardState;
pub use storage::{InMemoryTradeStore, PostgresTradeStore};

// Strategy types
pub use strategy::{
    Decision, DecisionEngine, FractionalSizer, NoGoReason, PortfolioLedger, SizeCalculator,
    Strategy, StrategyContext, TradeJournal, TradingPolicy,
};
