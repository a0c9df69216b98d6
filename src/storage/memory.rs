//! In-memory trade store used when no database is configured

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use tokio::sync::RwLock;

use crate::common::errors::{PipelineError, Result};
use crate::common::traits::TradeStore;
use crate::common::types::{Owner, Prediction, Trade, TradeKind, TradeStats};

#[derive(Debug, Default)]
struct StoreState {
    owners: Vec<Owner>,
    trades: Vec<Trade>,
    predictions: Vec<(String, Prediction)>,
}

/// Process-local store with monotonically increasing ids
#[derive(Debug, Default)]
pub struct InMemoryTradeStore {
    state: RwLock<StoreState>,
}

impl InMemoryTradeStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// All stored trades, oldest first
    pub async fn trades(&self) -> Vec<Trade> {
        self.state.read().await.trades.clone()
    }

    /// Stored predictions for one symbol, oldest first
    pub async fn predictions(&self, symbol: &str) -> Vec<Prediction> {
        self.state
            .read()
            .await
            .predictions
            .iter()
            .filter(|(s, _)| s == symbol)
            .map(|(_, p)| p.clone())
            .collect()
    }
}

#[async_trait]
impl TradeStore for InMemoryTradeStore {
    async fn get_or_create_owner(&self, email: &str, default_balance: Decimal) -> Result<Owner> {
        let mut state = self.state.write().await;
        if let Some(owner) = state.owners.iter().find(|o| o.email == email) {
            return Ok(owner.clone());
        }

        let owner = Owner {
            id: state.owners.len() as i64 + 1,
            email: email.to_string(),
            balance: default_balance,
            created_at: Utc::now(),
        };
        state.owners.push(owner.clone());
        Ok(owner)
    }

    async fn save_trade(&self, trade: &Trade) -> Result<i64> {
        let mut state = self.state.write().await;
        let id = state.trades.len() as i64 + 1;
        let mut stored = trade.clone();
        stored.id = Some(id);
        state.trades.push(stored);
        Ok(id)
    }

    async fn update_audit_hash(&self, trade_id: i64, hash: &str) -> Result<()> {
        let mut state = self.state.write().await;
        let trade = state
            .trades
            .iter_mut()
            .find(|t| t.id == Some(trade_id))
            .ok_or_else(|| PipelineError::Persistence(format!("unknown trade id {}", trade_id)))?;
        trade.audit_hash = Some(hash.to_string());
        Ok(())
    }

    async fn last_trade_of_kind(
        &self,
        owner_id: i64,
        symbol: &str,
        kind: TradeKind,
    ) -> Result<Option<Trade>> {
        Ok(self
            .state
            .read()
            .await
            .trades
            .iter()
            .rev()
            .find(|t| t.owner_id == owner_id && t.symbol == symbol && t.kind == kind)
            .cloned())
    }

    async fn win_count(&self, owner_id: i64, symbol: &str) -> Result<u64> {
        Ok(self
            .state
            .read()
            .await
            .trades
            .iter()
            .filter(|t| t.owner_id == owner_id && t.symbol == symbol && t.is_win())
            .count() as u64)
    }

    async fn recent_trades(&self, owner_id: i64, symbol: &str, limit: usize) -> Result<Vec<Trade>> {
        Ok(self
            .state
            .read()
            .await
            .trades
            .iter()
            .rev()
            .filter(|t| t.owner_id == owner_id && t.symbol == symbol)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn stats(&self, owner_id: i64) -> Result<TradeStats> {
        let state = self.state.read().await;
        let owned = state.trades.iter().filter(|t| t.owner_id == owner_id);

        let (total, wins, profit) = owned.fold((0u64, 0u64, Decimal::ZERO), |(n, w, p), t| {
            (n + 1, w + u64::from(t.is_win()), p + t.realized_profit)
        });
        Ok(TradeStats::from_counts(total, wins, profit))
    }

    async fn save_prediction(&self, symbol: &str, prediction: &Prediction) -> Result<()> {
        self.state
            .write()
            .await
            .predictions
            .push((symbol.to_string(), prediction.clone()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    fn trade(symbol: &str, kind: TradeKind, price: Decimal, profit: Decimal) -> Trade {
        Trade {
            id: None,
            owner_id: 1,
            symbol: symbol.to_string(),
            kind,
            price,
            quantity: dec!(1),
            realized_profit: profit,
            audit_hash: None,
            executed_at: Utc::now(),
            prediction_confidence: 0.9,
        }
    }

    #[tokio::test]
    async fn test_owner_created_once() {
        let store = InMemoryTradeStore::new();
        let a = store.get_or_create_owner("demo@x", dec!(10000)).await.unwrap();
        let b = store.get_or_create_owner("demo@x", dec!(5)).await.unwrap();
        assert_eq!(a, b);
        assert_eq!(b.balance, dec!(10000));
    }

    #[tokio::test]
    async fn test_last_trade_is_scoped_by_symbol() {
        let store = InMemoryTradeStore::new();
        store
            .save_trade(&trade("btcusdt", TradeKind::Buy, dec!(100), dec!(0)))
            .await
            .unwrap();
        store
            .save_trade(&trade("ethusdt", TradeKind::Buy, dec!(7), dec!(0)))
            .await
            .unwrap();

        let last = store
            .last_trade_of_kind(1, "btcusdt", TradeKind::Buy)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(last.price, dec!(100));
        assert_eq!(last.id, Some(1));
        assert!(store
            .last_trade_of_kind(1, "btcusdt", TradeKind::Sell)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_stats_and_win_count() {
        let store = InMemoryTradeStore::new();
        for (kind, profit) in [
            (TradeKind::Buy, dec!(0)),
            (TradeKind::Sell, dec!(30)),
            (TradeKind::Buy, dec!(0)),
            (TradeKind::Sell, dec!(-10)),
        ] {
            store
                .save_trade(&trade("btcusdt", kind, dec!(1), profit))
                .await
                .unwrap();
        }

        assert_eq!(store.win_count(1, "btcusdt").await.unwrap(), 1);
        let stats = store.stats(1).await.unwrap();
        assert_eq!(stats.total_trades, 4);
        assert_eq!(stats.total_profit, dec!(20));
        assert_eq!(stats.win_rate, 25.0);
        assert_eq!(stats.avg_profit_per_trade, dec!(5));

        let recent = store.recent_trades(1, "btcusdt", 2).await.unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].realized_profit, dec!(-10));
    }

    #[tokio::test]
    async fn test_audit_hash_update() {
        let store = InMemoryTradeStore::new();
        let id = store
            .save_trade(&trade("btcusdt", TradeKind::Buy, dec!(1), dec!(0)))
            .await
            .unwrap();

        tokio_test::assert_ok!(store.update_audit_hash(id, "0xMOCKabc").await);
        assert_eq!(store.trades().await[0].audit_hash.as_deref(), Some("0xMOCKabc"));
        tokio_test::assert_err!(store.update_audit_hash(99, "0x").await);
    }
}
