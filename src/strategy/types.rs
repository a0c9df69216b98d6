use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::common::types::{PortfolioSnapshot, TradeKind};

/// Step of the per-symbol decision state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EngineState {
    Idle,
    Evaluating,
    ExecutingBuy,
    ExecutingSell,
    NoAction,
}

impl std::fmt::Display for EngineState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineState::Idle => write!(f, "IDLE"),
            EngineState::Evaluating => write!(f, "EVALUATING"),
            EngineState::ExecutingBuy => write!(f, "EXECUTING_BUY"),
            EngineState::ExecutingSell => write!(f, "EXECUTING_SELL"),
            EngineState::NoAction => write!(f, "NO_ACTION"),
        }
    }
}

/// Why a prediction did not lead to a trade
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoGoReason {
    /// Confidence below the policy minimum
    LowConfidence,
    /// NEUTRAL prediction
    NeutralTrend,
    /// The predicted direction's own probability did not clear the minimum
    WeakDirection,
    /// UP prediction while a position is already open
    AlreadyInPosition,
    /// UP prediction with no cash to invest
    NoCash,
    /// DOWN prediction while flat
    NoPosition,
    /// Sizing produced an empty order
    ZeroQuantity,
}

impl std::fmt::Display for NoGoReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            NoGoReason::LowConfidence => "confidence below minimum",
            NoGoReason::NeutralTrend => "neutral trend",
            NoGoReason::WeakDirection => "directional probability below minimum",
            NoGoReason::AlreadyInPosition => "position already open",
            NoGoReason::NoCash => "no cash available",
            NoGoReason::NoPosition => "no position to sell",
            NoGoReason::ZeroQuantity => "order size rounds to zero",
        };
        f.write_str(text)
    }
}

/// A trade the policy wants executed at the current price
#[derive(Debug, Clone, PartialEq)]
pub struct TradeIntent {
    pub kind: TradeKind,
    pub reason: String,
}

impl TradeIntent {
    pub fn buy(reason: impl Into<String>) -> Self {
        Self {
            kind: TradeKind::Buy,
            reason: reason.into(),
        }
    }

    pub fn sell(reason: impl Into<String>) -> Self {
        Self {
            kind: TradeKind::Sell,
            reason: reason.into(),
        }
    }
}

/// Strategy decision output
#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    /// No action should be taken
    NoGo(NoGoReason),
    /// Execute the trade intent
    Go(TradeIntent),
}

impl Decision {
    pub fn no_go(reason: NoGoReason) -> Self {
        Self::NoGo(reason)
    }

    pub fn go_buy(reason: impl Into<String>) -> Self {
        Self::Go(TradeIntent::buy(reason))
    }

    pub fn go_sell(reason: impl Into<String>) -> Self {
        Self::Go(TradeIntent::sell(reason))
    }

    /// Returns true if this is a Go decision
    pub fn is_go(&self) -> bool {
        matches!(self, Self::Go(_))
    }

    /// State the engine moves to after evaluating
    pub fn next_state(&self) -> EngineState {
        match self {
            Decision::NoGo(_) => EngineState::NoAction,
            Decision::Go(intent) => match intent.kind {
                TradeKind::Buy => EngineState::ExecutingBuy,
                TradeKind::Sell => EngineState::ExecutingSell,
            },
        }
    }
}

/// Read-only account state handed to a strategy
#[derive(Debug, Clone, PartialEq)]
pub struct StrategyContext {
    pub cash_balance: Decimal,
    pub position_quantity: Decimal,
    /// Latest known price of the symbol
    pub current_price: Decimal,
}

impl StrategyContext {
    pub fn new(cash_balance: Decimal, position_quantity: Decimal, current_price: Decimal) -> Self {
        Self {
            cash_balance,
            position_quantity,
            current_price,
        }
    }

    pub fn from_snapshot(snapshot: &PortfolioSnapshot, current_price: Decimal) -> Self {
        Self::new(
            snapshot.cash_balance,
            snapshot.position_quantity,
            current_price,
        )
    }

    /// Check if we hold any position
    pub fn has_position(&self) -> bool {
        self.position_quantity > Decimal::ZERO
    }
}
