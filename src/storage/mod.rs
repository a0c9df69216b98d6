//! Trade store implementations

pub mod memory;
pub mod postgres;

use std::sync::Arc;
use tracing::info;

use crate::common::errors::Result;
use crate::common::traits::SharedTradeStore;
use crate::config::types::DatabaseConfig;

pub use memory::InMemoryTradeStore;
pub use postgres::PostgresTradeStore;

/// Build the process-wide store: PostgreSQL when configured, in-memory
/// otherwise
pub async fn connect(database: Option<&DatabaseConfig>) -> Result<SharedTradeStore> {
    match database {
        Some(config) => Ok(Arc::new(PostgresTradeStore::connect(config).await?)),
        None => {
            info!("No database configured, trades are kept in memory");
            Ok(Arc::new(InMemoryTradeStore::new()))
        }
    }
}
