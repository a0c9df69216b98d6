//! Wiring of one symbol's pipeline
//!
//! ```text
//! FeedProducer ──► price relay ──┬──► PredictorAdapter ──► prediction relay ──┐
//!                                └──────────────────────────────────────────► DecisionEngine
//! ```
//!
//! Every pipeline owns its relays, ledger and journal. Only the handles in
//! [`SharedServices`] are shared across symbols. Trades and predictions are
//! persisted by the task that produces them; the shared buses only feed
//! presentation.

use rust_decimal::Decimal;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::audit::dispatcher::AuditDispatcher;
use crate::binance::feed::FeedProducer;
use crate::common::channels::{create_prediction_relay, BoundedRelay, EventBus, PriceRelay};
use crate::common::traits::{SharedAuditLedger, SharedPredictor, SharedPriceSource, SharedTradeStore};
use crate::common::types::{PortfolioSnapshot, PriceTick, Trade};
use crate::config::types::PipelineSettings;
use crate::predictor::adapter::PredictorAdapter;
use crate::strategy::engine::DecisionEngine;
use crate::strategy::journal::TradeJournal;
use crate::strategy::ledger::PortfolioLedger;
use crate::strategy::policy::TradingPolicy;
use crate::strategy::sizing::FractionalSizer;

/// Collaborator handles built once at startup and passed to every pipeline
#[derive(Clone)]
pub struct SharedServices {
    pub source: SharedPriceSource,
    pub predictor: SharedPredictor,
    pub store: SharedTradeStore,
    pub auditor: SharedAuditLedger,
    /// Predictions, trades and audit references for presentation
    pub events: EventBus,
    /// Price ticks for presentation, kept apart so they cannot evict events
    pub quotes: PriceRelay,
}

/// Counters returned by a pipeline's tasks when they finish
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipelineReport {
    pub connection_attempts: u64,
    pub predictions: u64,
    pub trades: u64,
}

pub struct SymbolPipeline;

impl SymbolPipeline {
    /// Build and start the three tasks of one symbol
    pub fn spawn(
        settings: PipelineSettings,
        owner_id: i64,
        services: &SharedServices,
        shutdown: watch::Receiver<bool>,
    ) -> PipelineHandle {
        let symbol = settings.symbol.clone();

        let prices: BoundedRelay<PriceTick> = BoundedRelay::new(settings.relay_capacity);
        let predictions = create_prediction_relay(settings.prediction_capacity);
        // Subscribe before the feed starts so no early tick is missed
        let adapter_prices = prices.subscribe();
        let engine_prices = prices.subscribe();
        let engine_predictions = predictions.subscribe();

        let ledger = Arc::new(PortfolioLedger::new(
            owner_id,
            symbol.clone(),
            settings.initial_balance,
        ));
        let journal = Arc::new(TradeJournal::new(settings.trade_history));

        let auditor = AuditDispatcher::new(services.auditor.clone(), services.store.clone())
            .with_journal(journal.clone())
            .with_events(services.events.clone());

        let engine = DecisionEngine::new(
            symbol.clone(),
            Box::new(TradingPolicy::from_settings(&settings)),
            Box::new(FractionalSizer::new(settings.buy_fraction)),
            ledger.clone(),
            journal.clone(),
            services.store.clone(),
            auditor,
        )
        .with_events(services.events.clone())
        .with_quotes(services.quotes.clone());

        let adapter = PredictorAdapter::new(
            symbol.clone(),
            services.predictor.clone(),
            adapter_prices,
            predictions,
        )
        .with_interval(settings.analysis_interval)
        .with_sequence_length(settings.sequence_length)
        .with_history_capacity(settings.history_capacity)
        .with_store(services.store.clone())
        .with_events(services.events.clone());

        let feed = FeedProducer::new(services.source.clone(), symbol.clone(), prices)
            .with_backoff(settings.reconnect_backoff);

        let engine_task = tokio::spawn(engine.run(engine_prices, engine_predictions, shutdown.clone()));
        let adapter_task = tokio::spawn(adapter.run(shutdown.clone()));
        let feed_task = tokio::spawn(feed.run(shutdown));

        info!(
            symbol = %symbol,
            initial_balance = %settings.initial_balance,
            min_confidence = settings.min_confidence,
            "Symbol pipeline started"
        );

        PipelineHandle {
            settings,
            ledger,
            journal,
            feed_task,
            adapter_task,
            engine_task,
        }
    }
}

/// Running pipeline for one symbol
pub struct PipelineHandle {
    settings: PipelineSettings,
    ledger: Arc<PortfolioLedger>,
    journal: Arc<TradeJournal>,
    feed_task: JoinHandle<u64>,
    adapter_task: JoinHandle<u64>,
    engine_task: JoinHandle<u64>,
}

impl PipelineHandle {
    pub fn symbol(&self) -> &str {
        &self.settings.symbol
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    /// Consistent snapshot of the portfolio
    pub async fn portfolio(&self) -> PortfolioSnapshot {
        self.ledger.snapshot().await
    }

    /// Up to `limit` most recent trades, newest first
    pub async fn recent_trades(&self, limit: usize) -> Vec<Trade> {
        self.journal.recent(limit).await
    }

    /// Cash plus position valued at `price`
    pub async fn portfolio_value(&self, price: Decimal) -> Decimal {
        self.portfolio().await.value_at(price)
    }

    /// Percentage gain or loss against the initial balance at `price`
    pub async fn performance(&self, price: Decimal) -> Decimal {
        self.portfolio().await.performance_at(price)
    }

    /// Wait for all tasks. Call after the shutdown signal was sent.
    pub async fn join(self) -> PipelineReport {
        let symbol = self.settings.symbol;
        let mut report = PipelineReport::default();

        match self.feed_task.await {
            Ok(attempts) => report.connection_attempts = attempts,
            Err(e) => error!(symbol = %symbol, "Feed task failed: {}", e),
        }
        match self.adapter_task.await {
            Ok(emitted) => report.predictions = emitted,
            Err(e) => error!(symbol = %symbol, "Predictor task failed: {}", e),
        }
        match self.engine_task.await {
            Ok(trades) => report.trades = trades,
            Err(e) => error!(symbol = %symbol, "Engine task failed: {}", e),
        }

        info!(
            symbol = %symbol,
            connection_attempts = report.connection_attempts,
            predictions = report.predictions,
            trades = report.trades,
            "Symbol pipeline stopped"
        );
        report
    }
}
