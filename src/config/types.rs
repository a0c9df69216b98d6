//! Configuration types

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::common::errors::{PipelineError, Result};

/// Initial balance for symbols requested on the command line without a
/// configured entry
pub const DEFAULT_INITIAL_BALANCE: Decimal = dec!(1000);

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Decision policy constants
    #[serde(default)]
    pub policy: PolicyConfig,
    /// Predictor adapter settings
    #[serde(default)]
    pub predictor: PredictorConfig,
    /// Channel capacities
    #[serde(default)]
    pub pipeline: ChannelConfig,
    /// Price feed settings
    #[serde(default)]
    pub feed: FeedConfig,
    /// Traded symbols and their starting balances
    #[serde(default = "default_symbols")]
    pub symbols: Vec<SymbolConfig>,
    /// Owner account the portfolios belong to
    #[serde(default = "default_owner_email")]
    pub owner_email: String,
    /// Database configuration (optional, in-memory store when absent)
    #[serde(default)]
    pub database: Option<DatabaseConfig>,
    /// Audit ledger configuration (optional, offline hashing when absent)
    #[serde(default)]
    pub audit: Option<AuditConfig>,
    /// General application settings
    #[serde(default)]
    pub settings: AppSettings,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            policy: PolicyConfig::default(),
            predictor: PredictorConfig::default(),
            pipeline: ChannelConfig::default(),
            feed: FeedConfig::default(),
            symbols: default_symbols(),
            owner_email: default_owner_email(),
            database: None,
            audit: None,
            settings: AppSettings::default(),
        }
    }
}

impl AppConfig {
    /// Check process-wide settings. Per-symbol problems are reported later by
    /// [`PipelineSettings::resolve`].
    pub fn validate(&self) -> Result<()> {
        if self.symbols.is_empty() {
            return Err(PipelineError::Configuration(
                "at least one symbol must be configured".to_string(),
            ));
        }
        if self.owner_email.trim().is_empty() {
            return Err(PipelineError::Configuration(
                "owner_email must not be empty".to_string(),
            ));
        }
        if self.pipeline.event_capacity == 0 || self.pipeline.quote_capacity == 0 {
            return Err(PipelineError::Configuration(
                "pipeline.event_capacity and pipeline.quote_capacity must be greater than zero"
                    .to_string(),
            ));
        }
        if self.predictor.analysis_interval_secs == 0 {
            return Err(PipelineError::Configuration(
                "predictor.analysis_interval_secs must be greater than zero".to_string(),
            ));
        }
        url::Url::parse(&self.feed.websocket_url).map_err(|e| {
            PipelineError::Configuration(format!(
                "feed.websocket_url '{}' is invalid: {}",
                self.feed.websocket_url, e
            ))
        })?;
        Ok(())
    }

    /// Keep only the requested symbols, adding entries with the default
    /// balance for symbols that were not configured
    pub fn retain_symbols(&mut self, requested: &[String]) {
        let requested: Vec<String> = requested
            .iter()
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty())
            .collect();
        if requested.is_empty() {
            return;
        }

        self.symbols.retain(|s| requested.contains(&s.symbol.to_lowercase()));
        for symbol in requested {
            if !self.symbols.iter().any(|s| s.symbol.eq_ignore_ascii_case(&symbol)) {
                self.symbols
                    .push(SymbolConfig::new(symbol, DEFAULT_INITIAL_BALANCE));
            }
        }
    }
}

/// Decision policy constants
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyConfig {
    /// Minimum confidence (and minimum directional probability) to trade
    #[serde(default = "default_min_confidence")]
    pub min_confidence: f64,
    /// Minimum expected move in percent. Carried for magnitude gating, not
    /// consulted by the current policy.
    #[serde(default = "default_min_change_percent")]
    pub min_change_percent: f64,
    /// Fraction of cash invested on a buy
    #[serde(default = "default_buy_fraction")]
    pub buy_fraction: Decimal,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            min_confidence: default_min_confidence(),
            min_change_percent: default_min_change_percent(),
            buy_fraction: default_buy_fraction(),
        }
    }
}

fn default_min_confidence() -> f64 {
    0.65
}

fn default_min_change_percent() -> f64 {
    1.0
}

fn default_buy_fraction() -> Decimal {
    dec!(0.95)
}

/// Predictor adapter configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictorConfig {
    /// Seconds between analysis ticks
    #[serde(default = "default_analysis_interval")]
    pub analysis_interval_secs: u64,
    /// Window length handed to the predictor
    #[serde(default = "default_sequence_length")]
    pub sequence_length: usize,
    /// Price observations retained per symbol
    #[serde(default = "default_history_capacity")]
    pub history_capacity: usize,
    /// Optional model metadata JSON overriding `sequence_length`
    #[serde(default)]
    pub metadata_path: Option<String>,
}

impl Default for PredictorConfig {
    fn default() -> Self {
        Self {
            analysis_interval_secs: default_analysis_interval(),
            sequence_length: default_sequence_length(),
            history_capacity: default_history_capacity(),
            metadata_path: None,
        }
    }
}

fn default_analysis_interval() -> u64 {
    60
}

fn default_sequence_length() -> usize {
    60
}

fn default_history_capacity() -> usize {
    1000
}

/// Channel capacities used by each pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelConfig {
    #[serde(default = "default_relay_capacity")]
    pub relay_capacity: usize,
    #[serde(default = "default_prediction_capacity")]
    pub prediction_capacity: usize,
    /// Recent trades kept in memory per symbol
    #[serde(default = "default_trade_history")]
    pub trade_history: usize,
    /// Capacity of the shared presentation fan-in
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,
    /// Capacity of the shared bus carrying price ticks to presentation
    #[serde(default = "default_quote_capacity")]
    pub quote_capacity: usize,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            relay_capacity: default_relay_capacity(),
            prediction_capacity: default_prediction_capacity(),
            trade_history: default_trade_history(),
            event_capacity: default_event_capacity(),
            quote_capacity: default_quote_capacity(),
        }
    }
}

fn default_relay_capacity() -> usize {
    crate::common::channels::DEFAULT_RELAY_CAPACITY
}

fn default_prediction_capacity() -> usize {
    crate::common::channels::DEFAULT_PREDICTION_CAPACITY
}

fn default_trade_history() -> usize {
    50
}

fn default_event_capacity() -> usize {
    crate::common::channels::DEFAULT_EVENT_CAPACITY
}

fn default_quote_capacity() -> usize {
    crate::common::channels::DEFAULT_QUOTE_CAPACITY
}

/// Price feed configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedConfig {
    /// WebSocket URL for the trade stream
    #[serde(default = "default_feed_ws_url")]
    pub websocket_url: String,
    /// Delay before reconnecting after a dropped connection
    #[serde(default = "default_reconnect_backoff")]
    pub reconnect_backoff_secs: u64,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            websocket_url: default_feed_ws_url(),
            reconnect_backoff_secs: default_reconnect_backoff(),
        }
    }
}

fn default_feed_ws_url() -> String {
    "wss://stream.binance.com:9443/ws".to_string()
}

fn default_reconnect_backoff() -> u64 {
    5
}

/// One traded symbol
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SymbolConfig {
    pub symbol: String,
    pub initial_balance: Decimal,
    /// Overrides `policy.min_confidence` for this symbol
    #[serde(default)]
    pub min_confidence: Option<f64>,
    /// Overrides `policy.buy_fraction` for this symbol
    #[serde(default)]
    pub buy_fraction: Option<Decimal>,
}

impl SymbolConfig {
    pub fn new(symbol: impl Into<String>, initial_balance: Decimal) -> Self {
        Self {
            symbol: symbol.into(),
            initial_balance,
            min_confidence: None,
            buy_fraction: None,
        }
    }
}

fn default_symbols() -> Vec<SymbolConfig> {
    vec![
        SymbolConfig::new("btcusdt", dec!(5000)),
        SymbolConfig::new("ethusdt", dec!(3000)),
        SymbolConfig::new("solusdt", dec!(1000)),
        SymbolConfig::new("adausdt", dec!(500)),
        SymbolConfig::new("dogeusdt", dec!(500)),
    ]
}

fn default_owner_email() -> String {
    "demo@trendpilot.local".to_string()
}

/// Database configuration for the trade store
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Database connection URL
    pub url: String,
    /// Maximum number of connections in the pool
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Connection timeout in seconds
    #[serde(default = "default_connection_timeout")]
    pub connection_timeout_seconds: u64,
}

fn default_max_connections() -> u32 {
    5
}

fn default_connection_timeout() -> u64 {
    30
}

/// JSON-RPC audit ledger configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditConfig {
    /// Node endpoint accepting `eth_sendTransaction`
    pub rpc_url: String,
    /// Unlocked account the anchoring transactions are sent from
    pub from_address: String,
    /// Explorer base URL used to build transaction links
    #[serde(default = "default_explorer_url")]
    pub explorer_url: String,
}

fn default_explorer_url() -> String {
    "https://sepolia.etherscan.io".to_string()
}

/// General application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppSettings {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Seconds between performance summaries
    #[serde(default = "default_summary_interval")]
    pub summary_interval_secs: u64,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            summary_interval_secs: default_summary_interval(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_summary_interval() -> u64 {
    300
}

/// Fully resolved settings for one symbol pipeline
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineSettings {
    pub symbol: String,
    pub initial_balance: Decimal,
    pub min_confidence: f64,
    pub min_change_percent: f64,
    pub buy_fraction: Decimal,
    pub analysis_interval: Duration,
    pub sequence_length: usize,
    pub history_capacity: usize,
    pub relay_capacity: usize,
    pub prediction_capacity: usize,
    pub trade_history: usize,
    pub reconnect_backoff: Duration,
}

impl PipelineSettings {
    /// Merge global configuration with one symbol entry and validate the
    /// result. An error here disables this symbol only.
    pub fn resolve(config: &AppConfig, entry: &SymbolConfig) -> Result<Self> {
        let settings = Self::merge(config, entry);
        settings.validate()?;
        Ok(settings)
    }

    fn merge(config: &AppConfig, entry: &SymbolConfig) -> Self {
        Self {
            symbol: entry.symbol.trim().to_lowercase(),
            initial_balance: entry.initial_balance,
            min_confidence: entry.min_confidence.unwrap_or(config.policy.min_confidence),
            min_change_percent: config.policy.min_change_percent,
            buy_fraction: entry.buy_fraction.unwrap_or(config.policy.buy_fraction),
            analysis_interval: Duration::from_secs(config.predictor.analysis_interval_secs),
            sequence_length: config.predictor.sequence_length,
            history_capacity: config.predictor.history_capacity,
            relay_capacity: config.pipeline.relay_capacity,
            prediction_capacity: config.pipeline.prediction_capacity,
            trade_history: config.pipeline.trade_history,
            reconnect_backoff: Duration::from_secs(config.feed.reconnect_backoff_secs),
        }
    }

    /// Validate policy constants and capacities
    pub fn validate(&self) -> Result<()> {
        let fail = |msg: String| Err(PipelineError::Configuration(format!("{}: {}", self.symbol, msg)));

        if self.symbol.is_empty() {
            return Err(PipelineError::Configuration(
                "symbol name must not be empty".to_string(),
            ));
        }
        if self.initial_balance <= Decimal::ZERO {
            return fail(format!("initial_balance {} must be positive", self.initial_balance));
        }
        if !(self.min_confidence > 0.0 && self.min_confidence <= 1.0) {
            return fail(format!("min_confidence {} must be in (0, 1]", self.min_confidence));
        }
        if self.buy_fraction <= Decimal::ZERO || self.buy_fraction > Decimal::ONE {
            return fail(format!("buy_fraction {} must be in (0, 1]", self.buy_fraction));
        }
        if self.sequence_length == 0 {
            return fail("sequence_length must be greater than zero".to_string());
        }
        if self.history_capacity < self.sequence_length {
            return fail(format!(
                "history_capacity {} is smaller than sequence_length {}",
                self.history_capacity, self.sequence_length
            ));
        }
        if self.relay_capacity == 0 || self.prediction_capacity == 0 {
            return fail("channel capacities must be greater than zero".to_string());
        }
        if self.analysis_interval.is_zero() {
            return fail("analysis interval must be greater than zero".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.policy.min_confidence, 0.65);
        assert_eq!(config.policy.buy_fraction, dec!(0.95));
        assert_eq!(config.predictor.analysis_interval_secs, 60);
        assert_eq!(config.pipeline.relay_capacity, 100);
        assert_eq!(config.feed.reconnect_backoff_secs, 5);
        assert_eq!(config.symbols.len(), 5);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_symbol_overrides_policy() {
        let config = AppConfig::default();
        let mut entry = SymbolConfig::new("ETHUSDT", dec!(3000));
        entry.min_confidence = Some(0.8);

        let settings = PipelineSettings::resolve(&config, &entry).unwrap();
        assert_eq!(settings.symbol, "ethusdt");
        assert_eq!(settings.min_confidence, 0.8);
        assert_eq!(settings.buy_fraction, dec!(0.95));
        assert_eq!(settings.reconnect_backoff, Duration::from_secs(5));
    }

    #[test]
    fn test_resolve_rejects_bad_symbol_entry() {
        let config = AppConfig::default();

        let broke = SymbolConfig::new("btcusdt", dec!(0));
        assert!(matches!(
            PipelineSettings::resolve(&config, &broke),
            Err(PipelineError::Configuration(_))
        ));

        let mut greedy = SymbolConfig::new("btcusdt", dec!(100));
        greedy.buy_fraction = Some(dec!(1.5));
        assert!(PipelineSettings::resolve(&config, &greedy).is_err());

        let mut lax = SymbolConfig::new("btcusdt", dec!(100));
        lax.min_confidence = Some(0.0);
        assert!(PipelineSettings::resolve(&config, &lax).is_err());
    }

    #[test]
    fn test_history_must_cover_window() {
        let mut config = AppConfig::default();
        config.predictor.history_capacity = 10;
        let entry = SymbolConfig::new("btcusdt", dec!(100));
        assert!(PipelineSettings::resolve(&config, &entry).is_err());
    }

    #[test]
    fn test_retain_symbols() {
        let mut config = AppConfig::default();
        config.retain_symbols(&["ETHUSDT".to_string(), "xrpusdt".to_string()]);

        let names: Vec<&str> = config.symbols.iter().map(|s| s.symbol.as_str()).collect();
        assert_eq!(names, vec!["ethusdt", "xrpusdt"]);
        assert_eq!(config.symbols[1].initial_balance, DEFAULT_INITIAL_BALANCE);
    }

    #[test]
    fn test_invalid_feed_url() {
        let mut config = AppConfig::default();
        config.feed.websocket_url = "not a url".to_string();
        assert!(config.validate().is_err());
    }
}
