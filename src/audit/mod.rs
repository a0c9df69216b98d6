//! Audit module - anchoring executed trades on an external ledger

pub mod dispatcher;
pub mod hashing;
pub mod rpc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::common::errors::Result;
use crate::common::types::{Trade, TradeKind};

pub use dispatcher::AuditDispatcher;
pub use hashing::HashingAuditLedger;
pub use rpc::RpcAuditLedger;

/// Canonical content of a trade that gets hashed and anchored
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditRecord {
    pub symbol: String,
    pub kind: TradeKind,
    pub price: Decimal,
    pub quantity: Decimal,
    pub realized_profit: Decimal,
    pub executed_at: DateTime<Utc>,
    pub confidence: f64,
}

impl AuditRecord {
    pub fn from_trade(trade: &Trade) -> Self {
        Self {
            symbol: trade.symbol.clone(),
            kind: trade.kind,
            price: trade.price,
            quantity: trade.quantity,
            realized_profit: trade.realized_profit,
            executed_at: trade.executed_at,
            confidence: trade.prediction_confidence,
        }
    }

    /// SHA-256 of the record's JSON encoding
    pub fn digest(&self) -> Result<[u8; 32]> {
        let json = serde_json::to_vec(self)?;
        Ok(Sha256::digest(&json).into())
    }
}
