//! Portfolio ledger
//!
//! The in-memory account for one (owner, symbol) pair. Readers get
//! consistent [`PortfolioSnapshot`] copies; mutation is crate-private and
//! only performed by the decision engine while it holds the write guard, so
//! buy/sell preconditions and the mutation share one critical section.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tokio::sync::{RwLock, RwLockWriteGuard};

use crate::common::types::PortfolioSnapshot;
use crate::strategy::sizing::SizedOrder;

/// Mutable account state guarded by [`PortfolioLedger`]
#[derive(Debug, Clone)]
pub struct Portfolio {
    owner_id: i64,
    symbol: String,
    cash_balance: Decimal,
    position_quantity: Decimal,
    initial_balance: Decimal,
    cumulative_realized_profit: Decimal,
    trade_count: u32,
    winning_trades: u32,
    last_trade_at: Option<DateTime<Utc>>,
    /// Fill price of the buy that opened the current position
    entry_price: Option<Decimal>,
    /// Store id of that buy, once persisted
    entry_trade_id: Option<i64>,
}

impl Portfolio {
    fn new(owner_id: i64, symbol: String, initial_balance: Decimal) -> Self {
        Self {
            owner_id,
            symbol,
            cash_balance: initial_balance,
            position_quantity: Decimal::ZERO,
            initial_balance,
            cumulative_realized_profit: Decimal::ZERO,
            trade_count: 0,
            winning_trades: 0,
            last_trade_at: None,
            entry_price: None,
            entry_trade_id: None,
        }
    }

    pub fn owner_id(&self) -> i64 {
        self.owner_id
    }

    pub fn cash_balance(&self) -> Decimal {
        self.cash_balance
    }

    pub fn position_quantity(&self) -> Decimal {
        self.position_quantity
    }

    pub fn entry_price(&self) -> Option<Decimal> {
        self.entry_price
    }

    pub fn entry_trade_id(&self) -> Option<i64> {
        self.entry_trade_id
    }

    /// Fraction of all trades that realized a positive profit
    pub fn win_rate(&self) -> f64 {
        if self.trade_count == 0 {
            return 0.0;
        }
        f64::from(self.winning_trades) / f64::from(self.trade_count)
    }

    pub(crate) fn apply_buy(&mut self, order: &SizedOrder, at: DateTime<Utc>) {
        self.cash_balance -= order.notional;
        self.position_quantity += order.quantity;
        self.trade_count += 1;
        self.last_trade_at = Some(at);
        self.entry_price = Some(order.price);
        self.entry_trade_id = None;
    }

    pub(crate) fn apply_sell(
        &mut self,
        order: &SizedOrder,
        realized_profit: Decimal,
        at: DateTime<Utc>,
    ) {
        self.cash_balance += order.notional;
        self.position_quantity = Decimal::ZERO;
        self.cumulative_realized_profit += realized_profit;
        self.trade_count += 1;
        if realized_profit > Decimal::ZERO {
            self.winning_trades += 1;
        }
        self.last_trade_at = Some(at);
        self.entry_price = None;
        self.entry_trade_id = None;
    }

    pub fn snapshot(&self) -> PortfolioSnapshot {
        PortfolioSnapshot {
            owner_id: self.owner_id,
            symbol: self.symbol.clone(),
            cash_balance: self.cash_balance,
            position_quantity: self.position_quantity,
            initial_balance: self.initial_balance,
            cumulative_realized_profit: self.cumulative_realized_profit,
            trade_count: self.trade_count,
            win_rate: self.win_rate(),
            last_trade_at: self.last_trade_at,
        }
    }
}

/// One-writer-many-readers wrapper around a [`Portfolio`]
#[derive(Debug)]
pub struct PortfolioLedger {
    portfolio: RwLock<Portfolio>,
}

impl PortfolioLedger {
    pub fn new(owner_id: i64, symbol: impl Into<String>, initial_balance: Decimal) -> Self {
        Self {
            portfolio: RwLock::new(Portfolio::new(owner_id, symbol.into(), initial_balance)),
        }
    }

    /// Consistent copy of every field
    pub async fn snapshot(&self) -> PortfolioSnapshot {
        self.portfolio.read().await.snapshot()
    }

    /// Owner and store id of the buy behind the open position, when known
    pub(crate) async fn open_entry(&self) -> Option<(i64, i64)> {
        let portfolio = self.portfolio.read().await;
        portfolio.entry_trade_id.map(|id| (portfolio.owner_id, id))
    }

    /// Exclusive access for one evaluate-and-mutate step
    pub(crate) async fn write(&self) -> RwLockWriteGuard<'_, Portfolio> {
        self.portfolio.write().await
    }

    /// Remember the store id of the buy that opened the current position.
    /// Ignored if the position was closed in the meantime.
    pub(crate) async fn set_entry_trade_id(&self, executed_at: DateTime<Utc>, trade_id: i64) {
        let mut portfolio = self.portfolio.write().await;
        if portfolio.entry_price.is_some() && portfolio.last_trade_at == Some(executed_at) {
            portfolio.entry_trade_id = Some(trade_id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::types::TradeKind;
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    fn order(kind: TradeKind, price: Decimal, quantity: Decimal, notional: Decimal) -> SizedOrder {
        SizedOrder {
            kind,
            price,
            quantity,
            notional,
        }
    }

    #[tokio::test]
    async fn test_round_trip_realizes_profit() {
        let ledger = PortfolioLedger::new(1, "btcusdt", dec!(1000));
        let t0 = Utc::now();

        {
            let mut p = ledger.write().await;
            p.apply_buy(&order(TradeKind::Buy, dec!(100), dec!(9.5), dec!(950)), t0);
        }
        let open = ledger.snapshot().await;
        assert_eq!(open.cash_balance, dec!(50));
        assert_eq!(open.position_quantity, dec!(9.5));
        assert_eq!(open.trade_count, 1);

        {
            let mut p = ledger.write().await;
            p.apply_sell(&order(TradeKind::Sell, dec!(110), dec!(9.5), dec!(1045)), dec!(95), t0);
        }
        let closed = ledger.snapshot().await;
        assert_eq!(closed.cash_balance, dec!(1095));
        assert!(closed.is_flat());
        assert_eq!(closed.cumulative_realized_profit, dec!(95));
        assert_eq!(
            closed.cash_balance,
            closed.initial_balance + closed.cumulative_realized_profit
        );
        assert_eq!(closed.trade_count, 2);
        assert_eq!(closed.win_rate, 0.5);
    }

    #[tokio::test]
    async fn test_losing_sell_does_not_count_as_win() {
        let ledger = PortfolioLedger::new(1, "ethusdt", dec!(100));
        let now = Utc::now();
        {
            let mut p = ledger.write().await;
            p.apply_buy(&order(TradeKind::Buy, dec!(10), dec!(5), dec!(50)), now);
            p.apply_sell(&order(TradeKind::Sell, dec!(8), dec!(5), dec!(40)), dec!(-10), now);
        }
        let snapshot = ledger.snapshot().await;
        assert_eq!(snapshot.win_rate, 0.0);
        assert_eq!(snapshot.cash_balance, dec!(90));
    }

    #[tokio::test]
    async fn test_entry_trade_id_only_for_open_position() {
        let ledger = PortfolioLedger::new(1, "solusdt", dec!(100));
        let at = Utc::now();
        {
            let mut p = ledger.write().await;
            p.apply_buy(&order(TradeKind::Buy, dec!(10), dec!(9), dec!(90)), at);
        }

        ledger.set_entry_trade_id(at, 7).await;
        assert_eq!(ledger.write().await.entry_trade_id(), Some(7));

        {
            let mut p = ledger.write().await;
            p.apply_sell(&order(TradeKind::Sell, dec!(10), dec!(9), dec!(90)), dec!(0), at);
        }
        ledger.set_entry_trade_id(at, 8).await;
        assert_eq!(ledger.write().await.entry_trade_id(), None);
    }
}
