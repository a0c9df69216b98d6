//! Presentation fan-in and performance reporting

use rust_decimal::Decimal;
use std::collections::{HashMap, VecDeque};
use tokio::sync::{watch, RwLock};
use tracing::{debug, info};

use crate::common::channels::RelayReceiver;
use crate::common::types::{
    PipelineEvent, PortfolioSnapshot, Prediction, PriceTick, Trade, TradeStats,
};

/// Latest state of one symbol as seen by the presentation layer
#[derive(Debug, Clone, Default)]
pub struct SymbolView {
    pub latest_price: Option<Decimal>,
    pub latest_prediction: Option<Prediction>,
    /// Newest first
    pub recent_trades: VecDeque<Trade>,
}

/// Consumer of the shared event and quote buses.
///
/// Keeps the newest price, prediction and trades per symbol. It never feeds
/// back into a pipeline and owns no persistence.
pub struct DashboardState {
    trade_history: usize,
    views: RwLock<HashMap<String, SymbolView>>,
}

impl DashboardState {
    pub fn new(trade_history: usize) -> Self {
        Self {
            trade_history: trade_history.max(1),
            views: RwLock::new(HashMap::new()),
        }
    }

    /// Record the newest price of a symbol
    pub async fn apply_quote(&self, tick: PriceTick) {
        let mut views = self.views.write().await;
        views.entry(tick.symbol).or_default().latest_price = Some(tick.price);
    }

    /// Fold one event into the view of its symbol
    pub async fn apply(&self, event: PipelineEvent) {
        let mut views = self.views.write().await;
        let view = views.entry(event.symbol().to_string()).or_default();

        match event {
            PipelineEvent::Prediction { prediction, .. } => {
                view.latest_prediction = Some(prediction)
            }
            PipelineEvent::Trade(trade) => {
                if view.recent_trades.len() == self.trade_history {
                    view.recent_trades.pop_back();
                }
                view.recent_trades.push_front(trade);
            }
            PipelineEvent::Audited {
                executed_at, hash, ..
            } => {
                if let Some(trade) = view
                    .recent_trades
                    .iter_mut()
                    .find(|t| t.executed_at == executed_at && t.audit_hash.is_none())
                {
                    trade.audit_hash = Some(hash);
                }
            }
        }
    }

    pub async fn view(&self, symbol: &str) -> Option<SymbolView> {
        self.views.read().await.get(symbol).cloned()
    }

    pub async fn latest_price(&self, symbol: &str) -> Option<Decimal> {
        self.views
            .read()
            .await
            .get(symbol)
            .and_then(|v| v.latest_price)
    }

    /// Consume events and quotes until shutdown or until both buses lose
    /// every publisher. Returns the number of events applied; quotes are
    /// not counted.
    pub async fn run(
        &self,
        mut events: RelayReceiver<PipelineEvent>,
        mut quotes: RelayReceiver<PriceTick>,
        mut shutdown: watch::Receiver<bool>,
    ) -> u64 {
        let mut applied = 0;
        let mut events_open = true;
        let mut quotes_open = true;

        while events_open || quotes_open {
            tokio::select! {
                biased;
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
                event = events.recv(), if events_open => match event {
                    Some(event) => {
                        self.apply(event).await;
                        applied += 1;
                    }
                    None => events_open = false,
                },
                tick = quotes.recv(), if quotes_open => match tick {
                    Some(tick) => self.apply_quote(tick).await,
                    None => quotes_open = false,
                },
            }
        }

        debug!(
            applied,
            dropped_events = events.dropped(),
            dropped_quotes = quotes.dropped(),
            "Dashboard consumer stopped"
        );
        applied
    }
}

/// Performance of one symbol's portfolio at a given price
#[derive(Debug, Clone)]
pub struct PerformanceSummary {
    pub snapshot: PortfolioSnapshot,
    pub price: Option<Decimal>,
}

impl PerformanceSummary {
    pub fn new(snapshot: PortfolioSnapshot, price: Option<Decimal>) -> Self {
        Self { snapshot, price }
    }

    /// Portfolio value; a position without a known price cannot be valued
    pub fn value(&self) -> Option<Decimal> {
        match self.price {
            Some(price) => Some(self.snapshot.value_at(price)),
            None if self.snapshot.is_flat() => Some(self.snapshot.cash_balance),
            None => None,
        }
    }

    /// Percentage gain or loss against the initial balance
    pub fn performance(&self) -> Option<Decimal> {
        let value = self.value()?;
        if self.snapshot.initial_balance.is_zero() {
            return None;
        }
        Some(
            (value - self.snapshot.initial_balance) / self.snapshot.initial_balance
                * Decimal::ONE_HUNDRED,
        )
    }
}

/// Log one line per symbol plus the owner's aggregate stats
pub fn log_summary(summaries: &[PerformanceSummary], stats: Option<&TradeStats>) {
    info!("=== Performance summary ===");
    for summary in summaries {
        let s = &summary.snapshot;
        let value = summary
            .value()
            .map(|v| v.round_dp(2).to_string())
            .unwrap_or_else(|| "n/a".to_string());
        let performance = summary
            .performance()
            .map(|p| p.round_dp(2).to_string())
            .unwrap_or_else(|| "n/a".to_string());
        info!(
            symbol = %s.symbol,
            cash = %s.cash_balance.round_dp(2),
            position = %s.position_quantity,
            value = %value,
            performance_pct = %performance,
            trades = s.trade_count,
            win_rate = s.win_rate,
            realized = %s.cumulative_realized_profit.round_dp(2),
            "Portfolio"
        );
    }

    if let Some(stats) = stats {
        info!(
            total_trades = stats.total_trades,
            total_profit = %stats.total_profit.round_dp(2),
            win_rate = stats.win_rate,
            avg_profit = %stats.avg_profit_per_trade.round_dp(2),
            "Stored trade stats"
        );
    }
}
