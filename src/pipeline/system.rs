//! Multi-symbol trading system
//!
//! Owns one [`PipelineHandle`] per configured symbol, the dashboard consumer
//! and the shutdown signal. Pipelines are independent: a symbol whose
//! settings fail validation is skipped and the others still start.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info, instrument, warn};

use crate::common::errors::{PipelineError, Result};
use crate::common::types::{Owner, TradeStats};
use crate::config::types::{AppConfig, PipelineSettings};
use crate::pipeline::symbol::{PipelineHandle, PipelineReport, SharedServices, SymbolPipeline};
use crate::reporting::{DashboardState, PerformanceSummary};

/// Balance recorded on a newly created owner account
pub const DEMO_OWNER_BALANCE: Decimal = dec!(10000);

pub struct TradingSystem {
    owner: Owner,
    services: SharedServices,
    pipelines: Vec<PipelineHandle>,
    dashboard: Arc<DashboardState>,
    dashboard_task: JoinHandle<u64>,
    shutdown: watch::Sender<bool>,
}

impl TradingSystem {
    /// Resolve every configured symbol and start its pipeline
    #[instrument(skip_all)]
    pub async fn start(config: &AppConfig, services: SharedServices) -> Result<Self> {
        let owner = services
            .store
            .get_or_create_owner(&config.owner_email, DEMO_OWNER_BALANCE)
            .await?;
        info!(owner_id = owner.id, email = %owner.email, "Trading as owner");

        let (shutdown, shutdown_rx) = watch::channel(false);

        let dashboard = Arc::new(DashboardState::new(config.pipeline.trade_history));
        let dashboard_task = {
            let dashboard = dashboard.clone();
            let events = services.events.subscribe();
            let quotes = services.quotes.subscribe();
            let shutdown = shutdown_rx.clone();
            tokio::spawn(async move { dashboard.run(events, quotes, shutdown).await })
        };

        let mut pipelines = Vec::with_capacity(config.symbols.len());
        for entry in &config.symbols {
            match PipelineSettings::resolve(config, entry) {
                Ok(settings) => pipelines.push(SymbolPipeline::spawn(
                    settings,
                    owner.id,
                    &services,
                    shutdown_rx.clone(),
                )),
                Err(e) => error!(symbol = %entry.symbol, "Pipeline not started: {}", e),
            }
        }

        if pipelines.is_empty() {
            let _ = shutdown.send(true);
            dashboard_task.abort();
            return Err(PipelineError::Configuration(
                "no symbol pipeline could be started".to_string(),
            ));
        }

        info!(
            pipelines = pipelines.len(),
            configured = config.symbols.len(),
            "Trading system started"
        );

        Ok(Self {
            owner,
            services,
            pipelines,
            dashboard,
            dashboard_task,
            shutdown,
        })
    }

    pub fn owner(&self) -> &Owner {
        &self.owner
    }

    pub fn pipelines(&self) -> &[PipelineHandle] {
        &self.pipelines
    }

    pub fn pipeline(&self, symbol: &str) -> Option<&PipelineHandle> {
        self.pipelines.iter().find(|p| p.symbol() == symbol)
    }

    pub fn dashboard(&self) -> &Arc<DashboardState> {
        &self.dashboard
    }

    /// A receiver of the shutdown signal shared by every task
    pub fn shutdown_signal(&self) -> watch::Receiver<bool> {
        self.shutdown.subscribe()
    }

    /// Per-symbol performance valued at the dashboard's latest prices
    pub async fn summary(&self) -> Vec<PerformanceSummary> {
        let mut summaries = Vec::with_capacity(self.pipelines.len());
        for pipeline in &self.pipelines {
            let price = self.dashboard.latest_price(pipeline.symbol()).await;
            summaries.push(PerformanceSummary::new(pipeline.portfolio().await, price));
        }
        summaries
    }

    /// Aggregate stats of the owner from the trade store
    pub async fn stats(&self) -> Option<TradeStats> {
        match self.services.store.stats(self.owner.id).await {
            Ok(stats) => Some(stats),
            Err(e) => {
                warn!("Failed to load trade stats: {}", e);
                None
            }
        }
    }

    /// Signal every task to stop and wait for them
    pub async fn shutdown(self) -> Vec<(String, PipelineReport)> {
        info!("Shutting down trading system");
        let _ = self.shutdown.send(true);

        let mut reports = Vec::with_capacity(self.pipelines.len());
        for pipeline in self.pipelines {
            let symbol = pipeline.symbol().to_string();
            reports.push((symbol, pipeline.join().await));
        }

        if let Err(e) = self.dashboard_task.await {
            error!("Dashboard task failed: {}", e);
        }
        reports
    }
}
