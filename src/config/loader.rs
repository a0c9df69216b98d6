//! Configuration loader

use config::{Config, ConfigBuilder, Environment, File, FileFormat};
use std::path::Path;

use super::types::AppConfig;
use crate::common::errors::{PipelineError, Result};

/// Environment variable prefix, e.g. `TREND_PILOT__POLICY__MIN_CONFIDENCE`
pub const ENV_PREFIX: &str = "TREND_PILOT";

/// Load configuration from file and environment variables
///
/// Priority (highest to lowest):
/// 1. Environment variables (prefixed with TREND_PILOT__)
/// 2. Configuration file (TOML format)
/// 3. Default values
pub fn load_config(config_path: Option<&str>) -> Result<AppConfig> {
    let mut builder = Config::builder();

    if let Some(path) = config_path {
        if Path::new(path).exists() {
            builder = builder.add_source(File::with_name(path).required(false));
        }
    }

    builder = builder.add_source(
        Environment::with_prefix(ENV_PREFIX)
            .prefix_separator("__")
            .separator("__")
            .try_parsing(true),
    );

    finish(builder)
}

/// Load configuration from TOML text, ignoring the environment
pub fn load_from_str(toml: &str) -> Result<AppConfig> {
    let builder = Config::builder().add_source(File::from_str(toml, FileFormat::Toml));
    finish(builder)
}

fn finish(builder: ConfigBuilder<config::builder::DefaultState>) -> Result<AppConfig> {
    let config = builder
        .build()
        .map_err(|e| PipelineError::Configuration(e.to_string()))?;

    let app: AppConfig = config
        .try_deserialize()
        .map_err(|e| PipelineError::Configuration(e.to_string()))?;

    app.validate()?;
    Ok(app)
}
