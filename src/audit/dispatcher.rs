//! Audit dispatcher
//!
//! Fire-and-forget submission of executed trades to the audit ledger. Each
//! submission runs on its own task; a failure leaves the trade without a
//! reference and is never retried here.

use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::common::channels::EventBus;
use crate::common::traits::{SharedAuditLedger, SharedTradeStore};
use crate::common::types::{PipelineEvent, Trade};
use crate::strategy::journal::TradeJournal;

#[derive(Clone)]
pub struct AuditDispatcher {
    ledger: SharedAuditLedger,
    store: SharedTradeStore,
    journal: Option<Arc<TradeJournal>>,
    events: Option<EventBus>,
}

impl AuditDispatcher {
    pub fn new(ledger: SharedAuditLedger, store: SharedTradeStore) -> Self {
        Self {
            ledger,
            store,
            journal: None,
            events: None,
        }
    }

    /// Update the matching journal entry once a reference is known
    pub fn with_journal(mut self, journal: Arc<TradeJournal>) -> Self {
        self.journal = Some(journal);
        self
    }

    /// Announce references on the presentation fan-in
    pub fn with_events(mut self, events: EventBus) -> Self {
        self.events = Some(events);
        self
    }

    /// Submit a trade without waiting for the outcome.
    ///
    /// The returned handle resolves to the reference hash, or `None` when
    /// the audit failed. Dropping it does not cancel the submission.
    pub fn dispatch(&self, trade: Trade) -> JoinHandle<Option<String>> {
        let this = self.clone();
        tokio::spawn(async move { this.audit(trade).await })
    }

    async fn audit(&self, trade: Trade) -> Option<String> {
        let hash = match self.ledger.record_trade(&trade).await {
            Ok(hash) => hash,
            Err(e) => {
                warn!(
                    symbol = %trade.symbol,
                    kind = %trade.kind,
                    ledger = self.ledger.ledger_name(),
                    "Audit failed, trade stays without reference: {}",
                    e
                );
                return None;
            }
        };

        info!(symbol = %trade.symbol, kind = %trade.kind, hash = %hash, "Trade audited");

        if let Some(journal) = &self.journal {
            journal.set_audit_hash(&trade, &hash).await;
        }

        match trade.id {
            Some(id) => {
                if let Err(e) = self.store.update_audit_hash(id, &hash).await {
                    warn!(symbol = %trade.symbol, trade_id = id, "Failed to persist audit hash: {}", e);
                }
            }
            None => warn!(
                symbol = %trade.symbol,
                "Trade was never persisted, audit hash kept in memory only"
            ),
        }

        if let Some(events) = &self.events {
            events.offer(PipelineEvent::Audited {
                symbol: trade.symbol.clone(),
                trade_id: trade.id,
                executed_at: trade.executed_at,
                hash: hash.clone(),
            });
        }

        Some(hash)
    }
}
