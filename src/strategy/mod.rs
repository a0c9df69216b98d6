//! Strategy module for trade decision making
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                 PER SYMBOL (one engine task)                │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Price arrives       ──► latest price updated               │
//! │                                                             │
//! │  Prediction arrives                                         │
//! │       │                                                     │
//! │       ▼  (ledger write guard held)                          │
//! │  Strategy.evaluate() → Go/NoGo                              │
//! │       │                                                     │
//! │       ▼ (if Go)                                             │
//! │  SizeCalculator sizes the order, Portfolio mutated          │
//! │       │                                                     │
//! │       ▼  (guard released)                                   │
//! │  TradeStore.save_trade ► journal ► audit (spawned) ► events │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Components
//!
//! - [`Strategy`]: Trait for decision policies
//! - [`TradingPolicy`]: Confidence-gated two-state policy
//! - [`Decision`]: Go/NoGo enum returned by strategies
//! - [`SizeCalculator`]: Turns a decision into a quantity
//! - [`PortfolioLedger`]: Authoritative account state
//! - [`DecisionEngine`]: The per-symbol consumer loop

pub mod engine;
pub mod journal;
pub mod ledger;
pub mod policy;
pub mod sizing;
mod traits;
mod types;

pub use types::{Decision, EngineState, NoGoReason, StrategyContext, TradeIntent};

pub use traits::{BoxedStrategy, Strategy};

pub use sizing::{BoxedSizeCalculator, FractionalSizer, SizeCalculator, SizedOrder};

pub use engine::DecisionEngine;
pub use journal::TradeJournal;
pub use ledger::{Portfolio, PortfolioLedger};
pub use policy::TradingPolicy;
