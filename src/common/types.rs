//! Domain types shared by every stage of a symbol pipeline

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A single price observation delivered by the feed connector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceTick {
    /// Lowercase trading symbol (e.g. `btcusdt`)
    pub symbol: String,
    /// Execution price of the observed trade
    pub price: Decimal,
    /// Traded quantity
    pub quantity: Decimal,
    /// Exchange event time
    pub event_time: DateTime<Utc>,
}

impl PriceTick {
    pub fn new(symbol: impl Into<String>, price: Decimal, quantity: Decimal) -> Self {
        Self {
            symbol: symbol.into(),
            price,
            quantity,
            event_time: Utc::now(),
        }
    }

    pub fn with_event_time(mut self, event_time: DateTime<Utc>) -> Self {
        self.event_time = event_time;
        self
    }
}

/// Trend class produced by a predictor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TrendClass {
    Neutral,
    Up,
    Down,
}

impl TrendClass {
    /// Numeric class id used by the model (NEUTRAL 0, UP 1, DOWN 2)
    pub fn class_id(&self) -> u8 {
        match self {
            TrendClass::Neutral => 0,
            TrendClass::Up => 1,
            TrendClass::Down => 2,
        }
    }
}

impl std::fmt::Display for TrendClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TrendClass::Neutral => write!(f, "NEUTRAL"),
            TrendClass::Up => write!(f, "UP"),
            TrendClass::Down => write!(f, "DOWN"),
        }
    }
}

/// Output of one analysis tick. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub timestamp: DateTime<Utc>,
    pub trend: TrendClass,
    pub class_id: u8,
    /// Probability per class, each in `[0, 1]`
    pub probabilities: HashMap<TrendClass, f64>,
    /// Maximum class probability
    pub confidence: f64,
    /// Time spent inside the predictor, in milliseconds
    pub latency_ms: f64,
    pub price_at_prediction: Decimal,
}

impl Prediction {
    /// Build a prediction from a probability map; the trend and confidence are
    /// taken from the most probable class.
    ///
    /// Ties resolve in NEUTRAL, UP, DOWN order.
    pub fn from_probabilities(
        probabilities: HashMap<TrendClass, f64>,
        price_at_prediction: Decimal,
    ) -> Self {
        let mut trend = TrendClass::Neutral;
        let mut confidence = f64::MIN;
        for class in [TrendClass::Neutral, TrendClass::Up, TrendClass::Down] {
            let p = probabilities.get(&class).copied().unwrap_or(0.0);
            if p > confidence {
                confidence = p;
                trend = class;
            }
        }

        Self {
            timestamp: Utc::now(),
            trend,
            class_id: trend.class_id(),
            probabilities,
            confidence: confidence.max(0.0),
            latency_ms: 0.0,
            price_at_prediction,
        }
    }

    /// Probability assigned to a class, 0 when absent
    pub fn probability(&self, class: TrendClass) -> f64 {
        self.probabilities.get(&class).copied().unwrap_or(0.0)
    }

    pub fn with_latency_ms(mut self, latency_ms: f64) -> Self {
        self.latency_ms = latency_ms;
        self
    }
}

/// Trade direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TradeKind {
    Buy,
    Sell,
}

impl TradeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TradeKind::Buy => "BUY",
            TradeKind::Sell => "SELL",
        }
    }
}

impl std::fmt::Display for TradeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TradeKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "BUY" => Ok(TradeKind::Buy),
            "SELL" => Ok(TradeKind::Sell),
            other => Err(format!("unknown trade kind: {}", other)),
        }
    }
}

/// A simulated execution emitted by the decision engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    /// Store-assigned id, `None` until the trade store accepted it
    pub id: Option<i64>,
    pub owner_id: i64,
    pub symbol: String,
    pub kind: TradeKind,
    pub price: Decimal,
    pub quantity: Decimal,
    /// Zero for BUY
    pub realized_profit: Decimal,
    /// Set once by the audit dispatcher
    pub audit_hash: Option<String>,
    pub executed_at: DateTime<Utc>,
    pub prediction_confidence: f64,
}

impl Trade {
    /// Notional value of the trade (`price * quantity`)
    pub fn notional(&self) -> Decimal {
        self.price * self.quantity
    }

    pub fn is_win(&self) -> bool {
        self.realized_profit > Decimal::ZERO
    }
}

/// Immutable copy of a portfolio handed to readers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioSnapshot {
    pub owner_id: i64,
    pub symbol: String,
    pub cash_balance: Decimal,
    pub position_quantity: Decimal,
    pub initial_balance: Decimal,
    pub cumulative_realized_profit: Decimal,
    pub trade_count: u32,
    pub win_rate: f64,
    pub last_trade_at: Option<DateTime<Utc>>,
}

impl PortfolioSnapshot {
    pub fn is_flat(&self) -> bool {
        self.position_quantity.is_zero()
    }

    /// Cash plus position marked at `price`
    pub fn value_at(&self, price: Decimal) -> Decimal {
        self.cash_balance + self.position_quantity * price
    }

    /// Performance in percent against the initial balance
    pub fn performance_at(&self, price: Decimal) -> Decimal {
        if self.initial_balance.is_zero() {
            return Decimal::ZERO;
        }
        (self.value_at(price) - self.initial_balance) / self.initial_balance * Decimal::ONE_HUNDRED
    }
}

/// Account owning the paper portfolios
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Owner {
    pub id: i64,
    pub email: String,
    /// Balance recorded when the owner was created
    pub balance: Decimal,
    pub created_at: DateTime<Utc>,
}

/// Aggregate trading statistics computed by a trade store
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TradeStats {
    pub total_trades: u64,
    pub total_profit: Decimal,
    /// Percentage of trades with positive realized profit
    pub win_rate: f64,
    pub avg_profit_per_trade: Decimal,
}

impl TradeStats {
    /// Derive stats from raw counts
    pub fn from_counts(total_trades: u64, wins: u64, total_profit: Decimal) -> Self {
        if total_trades == 0 {
            return Self::default();
        }
        Self {
            total_trades,
            total_profit,
            win_rate: wins as f64 / total_trades as f64 * 100.0,
            avg_profit_per_trade: total_profit / Decimal::from(total_trades),
        }
    }
}

/// Update pushed from a pipeline to the presentation fan-in. Price ticks
/// travel on their own quote bus so they cannot evict these.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum PipelineEvent {
    Prediction { symbol: String, prediction: Prediction },
    Trade(Trade),
    /// A trade's audit reference became available
    Audited {
        symbol: String,
        trade_id: Option<i64>,
        executed_at: DateTime<Utc>,
        hash: String,
    },
}

impl PipelineEvent {
    /// Symbol this event belongs to
    pub fn symbol(&self) -> &str {
        match self {
            PipelineEvent::Prediction { symbol, .. } => symbol,
            PipelineEvent::Trade(trade) => &trade.symbol,
            PipelineEvent::Audited { symbol, .. } => symbol,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_prediction_confidence_is_max_probability() {
        let probabilities = HashMap::from([
            (TrendClass::Neutral, 0.2),
            (TrendClass::Up, 0.7),
            (TrendClass::Down, 0.1),
        ]);
        let prediction = Prediction::from_probabilities(probabilities, dec!(100));

        assert_eq!(prediction.trend, TrendClass::Up);
        assert_eq!(prediction.class_id, 1);
        assert_eq!(prediction.confidence, 0.7);
        assert_eq!(prediction.probability(TrendClass::Down), 0.1);
    }

    #[test]
    fn test_prediction_tie_prefers_neutral() {
        let probabilities = HashMap::from([(TrendClass::Neutral, 0.5), (TrendClass::Up, 0.5)]);
        let prediction = Prediction::from_probabilities(probabilities, dec!(1));
        assert_eq!(prediction.trend, TrendClass::Neutral);
    }

    #[test]
    fn test_snapshot_performance() {
        let snapshot = PortfolioSnapshot {
            owner_id: 1,
            symbol: "btcusdt".to_string(),
            cash_balance: dec!(50),
            position_quantity: dec!(9.5),
            initial_balance: dec!(1000),
            cumulative_realized_profit: dec!(0),
            trade_count: 1,
            win_rate: 0.0,
            last_trade_at: None,
        };

        assert_eq!(snapshot.value_at(dec!(110)), dec!(1095));
        assert_eq!(snapshot.performance_at(dec!(110)), dec!(9.5));
        assert!(!snapshot.is_flat());
    }

    #[test]
    fn test_stats_from_counts() {
        let stats = TradeStats::from_counts(4, 1, dec!(20));
        assert_eq!(stats.win_rate, 25.0);
        assert_eq!(stats.avg_profit_per_trade, dec!(5));
        assert_eq!(TradeStats::from_counts(0, 0, dec!(0)), TradeStats::default());
    }

    #[test]
    fn test_trade_kind_round_trip_str() {
        assert_eq!("buy".parse::<TradeKind>(), Ok(TradeKind::Buy));
        assert_eq!(TradeKind::Sell.to_string(), "SELL");
        assert!("hold".parse::<TradeKind>().is_err());
    }
}
