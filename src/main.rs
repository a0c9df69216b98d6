//! TrendPilot - Main Entry Point
//!
//! Runs one streaming paper-trading pipeline per configured symbol until
//! Ctrl-C, logging a performance summary periodically and at shutdown.

use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use trend_pilot::common::channels::{create_event_bus, create_quote_bus};
use trend_pilot::common::traits::{SharedAuditLedger, SharedPredictor, SharedPriceSource};
use trend_pilot::config::load_config;
use trend_pilot::predictor::ModelMetadata;
use trend_pilot::reporting::log_summary;
use trend_pilot::{
    BinanceTradeSource, HashingAuditLedger, MomentumPredictor, RpcAuditLedger, SharedServices,
    TradingSystem,
};

/// CLI arguments for the application
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Log level (trace, debug, info, warn, error); defaults to settings.log_level
    #[arg(long)]
    log_level: Option<String>,

    /// Comma-separated list of symbols to trade, e.g. btcusdt,ethusdt
    #[arg(long, env = "TREND_PILOT_SYMBOLS")]
    symbols: Option<String>,
}

fn parse_level(level: &str) -> Level {
    match level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file if present
    dotenvy::dotenv().ok();

    let args = Args::parse();

    let mut config = load_config(Some(&args.config)).context("failed to load configuration")?;

    let level = parse_level(args.log_level.as_deref().unwrap_or(&config.settings.log_level));
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    info!("Starting TrendPilot");
    info!("Configuration file: {}", args.config);

    if let Some(symbols) = &args.symbols {
        let requested: Vec<String> = symbols
            .split(',')
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty())
            .collect();
        config.retain_symbols(&requested);
    }

    if let Some(path) = config.predictor.metadata_path.clone() {
        match ModelMetadata::load(&path) {
            Ok(metadata) => {
                info!(
                    model = %metadata.model_type,
                    version = %metadata.version,
                    sequence_length = metadata.sequence_length,
                    "Loaded model metadata"
                );
                config.predictor.sequence_length = metadata.sequence_length;
            }
            Err(e) => warn!("Ignoring model metadata at {}: {}", path, e),
        }
    }

    let store = trend_pilot::storage::connect(config.database.as_ref())
        .await
        .context("failed to open trade store")?;

    let auditor: SharedAuditLedger = match &config.audit {
        Some(audit) => {
            info!(rpc_url = %audit.rpc_url, "Anchoring trades through JSON-RPC");
            Arc::new(RpcAuditLedger::from_config(audit)?)
        }
        None => {
            info!("No audit node configured, using offline hashing ledger");
            Arc::new(HashingAuditLedger::new())
        }
    };

    let source: SharedPriceSource = Arc::new(BinanceTradeSource::new(&config.feed.websocket_url));
    let predictor: SharedPredictor =
        Arc::new(MomentumPredictor::new(config.predictor.sequence_length));

    let services = SharedServices {
        source,
        predictor,
        store,
        auditor,
        events: create_event_bus(config.pipeline.event_capacity),
        quotes: create_quote_bus(config.pipeline.quote_capacity),
    };

    let system = TradingSystem::start(&config, services).await?;
    info!("Application initialized successfully");

    let mut summary_timer =
        tokio::time::interval(Duration::from_secs(config.settings.summary_interval_secs.max(1)));
    summary_timer.tick().await;

    loop {
        tokio::select! {
            signal = tokio::signal::ctrl_c() => {
                signal?;
                break;
            }
            _ = summary_timer.tick() => {
                log_summary(&system.summary().await, system.stats().await.as_ref());
            }
        }
    }

    info!("Received shutdown signal, cleaning up...");
    let summaries = system.summary().await;
    let stats = system.stats().await;
    let reports = system.shutdown().await;
    log_summary(&summaries, stats.as_ref());

    for (symbol, report) in reports {
        info!(
            symbol = %symbol,
            predictions = report.predictions,
            trades = report.trades,
            "Final pipeline report"
        );
    }

    Ok(())
}
