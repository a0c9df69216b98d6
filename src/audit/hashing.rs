//! Offline audit ledger producing deterministic mock references

use async_trait::async_trait;
use tracing::debug;

use super::AuditRecord;
use crate::common::errors::Result;
use crate::common::traits::AuditLedger;
use crate::common::types::Trade;

/// Prefix marking references that were never sent to a chain
pub const MOCK_HASH_PREFIX: &str = "0xMOCK";

/// Audit ledger used when no node is configured. The reference is derived
/// from the trade content alone.
#[derive(Debug, Clone, Default)]
pub struct HashingAuditLedger;

impl HashingAuditLedger {
    pub fn new() -> Self {
        Self
    }

    /// `0xMOCK` followed by the hex of the first 16 digest bytes
    pub fn reference_for(record: &AuditRecord) -> Result<String> {
        let digest = record.digest()?;
        Ok(format!("{}{}", MOCK_HASH_PREFIX, hex::encode(&digest[..16])))
    }
}

#[async_trait]
impl AuditLedger for HashingAuditLedger {
    async fn record_trade(&self, trade: &Trade) -> Result<String> {
        let reference = Self::reference_for(&AuditRecord::from_trade(trade))?;
        debug!(symbol = %trade.symbol, reference = %reference, "Trade hashed offline");
        Ok(reference)
    }

    async fn verify(&self, hash: &str) -> Result<bool> {
        Ok(hash.starts_with(MOCK_HASH_PREFIX))
    }

    fn explorer_url(&self, _hash: &str) -> Option<String> {
        None
    }

    fn ledger_name(&self) -> &'static str {
        "offline-hash"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::types::TradeKind;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    fn trade() -> Trade {
        Trade {
            id: Some(1),
            owner_id: 1,
            symbol: "btcusdt".to_string(),
            kind: TradeKind::Buy,
            price: dec!(100),
            quantity: dec!(9.5),
            realized_profit: dec!(0),
            audit_hash: None,
            executed_at: Utc::now(),
            prediction_confidence: 0.8,
        }
    }

    #[tokio::test]
    async fn test_reference_is_deterministic() {
        let ledger = HashingAuditLedger::new();
        let trade = trade();

        let first = ledger.record_trade(&trade).await.unwrap();
        let second = ledger.record_trade(&trade).await.unwrap();
        assert_eq!(first, second);
        assert!(first.starts_with("0xMOCK"));
        assert_eq!(first.len(), MOCK_HASH_PREFIX.len() + 32);
        assert!(ledger.verify(&first).await.unwrap());
    }

    #[tokio::test]
    async fn test_reference_depends_on_content() {
        let ledger = HashingAuditLedger::new();
        let a = trade();
        let mut b = a.clone();
        b.price = dec!(101);

        assert_ne!(
            ledger.record_trade(&a).await.unwrap(),
            ledger.record_trade(&b).await.unwrap()
        );
        assert!(!ledger.verify("0xdeadbeef").await.unwrap());
    }
}
