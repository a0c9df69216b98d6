//! Bounded in-memory history of a pipeline's most recent trades

use std::collections::VecDeque;
use tokio::sync::RwLock;

use crate::common::types::Trade;

#[derive(Debug)]
pub struct TradeJournal {
    entries: RwLock<VecDeque<Trade>>,
    capacity: usize,
}

impl TradeJournal {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: RwLock::new(VecDeque::with_capacity(capacity)),
            capacity,
        }
    }

    /// Append a trade, evicting the oldest entry when full
    pub async fn push(&self, trade: Trade) {
        let mut entries = self.entries.write().await;
        if entries.len() == self.capacity {
            entries.pop_front();
        }
        entries.push_back(trade);
    }

    /// Set the audit hash of the matching entry. Returns false if the entry
    /// is gone or already carries a hash.
    pub async fn set_audit_hash(&self, trade: &Trade, hash: &str) -> bool {
        let mut entries = self.entries.write().await;
        let entry = entries.iter_mut().rev().find(|e| {
            e.executed_at == trade.executed_at && e.kind == trade.kind && e.symbol == trade.symbol
        });

        match entry {
            Some(entry) if entry.audit_hash.is_none() => {
                entry.audit_hash = Some(hash.to_string());
                true
            }
            _ => false,
        }
    }

    /// Newest trades first
    pub async fn recent(&self, limit: usize) -> Vec<Trade> {
        self.entries
            .read()
            .await
            .iter()
            .rev()
            .take(limit)
            .cloned()
            .collect()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::types::TradeKind;
    use chrono::{Duration, Utc};
    use rust_decimal_macros::dec;

    fn trade(kind: TradeKind, offset_secs: i64) -> Trade {
        Trade {
            id: None,
            owner_id: 1,
            symbol: "btcusdt".to_string(),
            kind,
            price: dec!(100),
            quantity: dec!(1),
            realized_profit: dec!(0),
            audit_hash: None,
            executed_at: Utc::now() + Duration::seconds(offset_secs),
            prediction_confidence: 0.8,
        }
    }

    #[tokio::test]
    async fn test_keeps_most_recent() {
        let journal = TradeJournal::new(2);
        let first = trade(TradeKind::Buy, 0);
        journal.push(first).await;
        journal.push(trade(TradeKind::Sell, 1)).await;
        journal.push(trade(TradeKind::Buy, 2)).await;

        let recent = journal.recent(10).await;
        assert_eq!(journal.len().await, 2);
        assert_eq!(recent[0].kind, TradeKind::Buy);
        assert_eq!(recent[1].kind, TradeKind::Sell);
    }

    #[tokio::test]
    async fn test_audit_hash_set_once() {
        let journal = TradeJournal::new(4);
        let buy = trade(TradeKind::Buy, 0);
        journal.push(buy.clone()).await;

        assert!(journal.set_audit_hash(&buy, "0xabc").await);
        assert!(!journal.set_audit_hash(&buy, "0xdef").await);
        assert_eq!(journal.recent(1).await[0].audit_hash.as_deref(), Some("0xabc"));

        let unknown = trade(TradeKind::Sell, 5);
        assert!(!journal.set_audit_hash(&unknown, "0x1").await);
    }
}
