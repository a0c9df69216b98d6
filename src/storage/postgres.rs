//! PostgreSQL trade store

use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::Row;
use std::time::Duration;
use tracing::{debug, info, instrument};

use crate::common::errors::{PipelineError, Result};
use crate::common::traits::TradeStore;
use crate::common::types::{Owner, Prediction, Trade, TradeKind, TradeStats};
use crate::config::types::DatabaseConfig;

/// Schema applied at startup, one statement per entry
const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS owners (
        id BIGSERIAL PRIMARY KEY,
        email TEXT NOT NULL UNIQUE,
        balance NUMERIC(28, 10) NOT NULL,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS trades (
        id BIGSERIAL PRIMARY KEY,
        owner_id BIGINT NOT NULL REFERENCES owners(id),
        symbol TEXT NOT NULL,
        kind TEXT NOT NULL CHECK (kind IN ('BUY', 'SELL')),
        price NUMERIC NOT NULL,
        quantity NUMERIC NOT NULL,
        realized_profit NUMERIC NOT NULL DEFAULT 0,
        audit_hash TEXT,
        prediction_confidence DOUBLE PRECISION NOT NULL,
        executed_at TIMESTAMPTZ NOT NULL
    )
    "#,
    r#"
    CREATE INDEX IF NOT EXISTS idx_trades_owner_symbol
        ON trades (owner_id, symbol, id DESC)
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS predictions (
        id BIGSERIAL PRIMARY KEY,
        symbol TEXT NOT NULL,
        trend TEXT NOT NULL,
        class_id SMALLINT NOT NULL,
        probabilities JSONB NOT NULL,
        confidence DOUBLE PRECISION NOT NULL,
        latency_ms DOUBLE PRECISION NOT NULL,
        price NUMERIC NOT NULL,
        predicted_at TIMESTAMPTZ NOT NULL
    )
    "#,
];

const TRADE_COLUMNS: &str = "id, owner_id, symbol, kind, price, quantity, realized_profit, \
                             audit_hash, prediction_confidence, executed_at";

/// Trade store backed by a PostgreSQL pool
#[derive(Debug, Clone)]
pub struct PostgresTradeStore {
    pool: PgPool,
}

impl PostgresTradeStore {
    /// Connect using the database configuration and apply the schema
    #[instrument(skip(config))]
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.connection_timeout_seconds))
            .connect(&config.url)
            .await?;

        info!("Connected to trade database");
        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    /// Wrap an existing pool without touching the schema
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create missing tables and indexes
    pub async fn migrate(&self) -> Result<()> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        debug!("Trade store schema ready");
        Ok(())
    }

    fn trade_from_row(row: &PgRow) -> Result<Trade> {
        let kind: String = row.try_get("kind")?;
        Ok(Trade {
            id: Some(row.try_get("id")?),
            owner_id: row.try_get("owner_id")?,
            symbol: row.try_get("symbol")?,
            kind: kind.parse::<TradeKind>().map_err(PipelineError::Persistence)?,
            price: row.try_get("price")?,
            quantity: row.try_get("quantity")?,
            realized_profit: row.try_get("realized_profit")?,
            audit_hash: row.try_get("audit_hash")?,
            executed_at: row.try_get("executed_at")?,
            prediction_confidence: row.try_get("prediction_confidence")?,
        })
    }
}

#[async_trait]
impl TradeStore for PostgresTradeStore {
    async fn get_or_create_owner(&self, email: &str, default_balance: Decimal) -> Result<Owner> {
        let row = sqlx::query(
            r#"
            INSERT INTO owners (email, balance) VALUES ($1, $2)
            ON CONFLICT (email) DO UPDATE SET email = EXCLUDED.email
            RETURNING id, email, balance, created_at
            "#,
        )
        .bind(email)
        .bind(default_balance)
        .fetch_one(&self.pool)
        .await?;

        Ok(Owner {
            id: row.try_get("id")?,
            email: row.try_get("email")?,
            balance: row.try_get("balance")?,
            created_at: row.try_get("created_at")?,
        })
    }

    async fn save_trade(&self, trade: &Trade) -> Result<i64> {
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO trades (
                owner_id, symbol, kind, price, quantity, realized_profit,
                audit_hash, prediction_confidence, executed_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING id
            "#,
        )
        .bind(trade.owner_id)
        .bind(&trade.symbol)
        .bind(trade.kind.as_str())
        .bind(trade.price)
        .bind(trade.quantity)
        .bind(trade.realized_profit)
        .bind(&trade.audit_hash)
        .bind(trade.prediction_confidence)
        .bind(trade.executed_at)
        .fetch_one(&self.pool)
        .await?;
        Ok(id)
    }

    async fn update_audit_hash(&self, trade_id: i64, hash: &str) -> Result<()> {
        let result = sqlx::query("UPDATE trades SET audit_hash = $1 WHERE id = $2")
            .bind(hash)
            .bind(trade_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(PipelineError::Persistence(format!(
                "unknown trade id {}",
                trade_id
            )));
        }
        Ok(())
    }

    async fn last_trade_of_kind(
        &self,
        owner_id: i64,
        symbol: &str,
        kind: TradeKind,
    ) -> Result<Option<Trade>> {
        let query = format!(
            "SELECT {} FROM trades WHERE owner_id = $1 AND symbol = $2 AND kind = $3 \
             ORDER BY id DESC LIMIT 1",
            TRADE_COLUMNS
        );
        let row = sqlx::query(&query)
            .bind(owner_id)
            .bind(symbol)
            .bind(kind.as_str())
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(Self::trade_from_row).transpose()
    }

    async fn win_count(&self, owner_id: i64, symbol: &str) -> Result<u64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM trades WHERE owner_id = $1 AND symbol = $2 AND realized_profit > 0",
        )
        .bind(owner_id)
        .bind(symbol)
        .fetch_one(&self.pool)
        .await?;
        Ok(count.max(0) as u64)
    }

    async fn recent_trades(&self, owner_id: i64, symbol: &str, limit: usize) -> Result<Vec<Trade>> {
        let query = format!(
            "SELECT {} FROM trades WHERE owner_id = $1 AND symbol = $2 ORDER BY id DESC LIMIT $3",
            TRADE_COLUMNS
        );
        let rows = sqlx::query(&query)
            .bind(owner_id)
            .bind(symbol)
            .bind(limit as i64)
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(Self::trade_from_row).collect()
    }

    async fn stats(&self, owner_id: i64) -> Result<TradeStats> {
        let row = sqlx::query(
            r#"
            SELECT
                COUNT(*) AS total,
                COUNT(*) FILTER (WHERE realized_profit > 0) AS wins,
                COALESCE(SUM(realized_profit), 0) AS profit
            FROM trades
            WHERE owner_id = $1
            "#,
        )
        .bind(owner_id)
        .fetch_one(&self.pool)
        .await?;

        let total: i64 = row.try_get("total")?;
        let wins: i64 = row.try_get("wins")?;
        let profit: Decimal = row.try_get("profit")?;
        Ok(TradeStats::from_counts(
            total.max(0) as u64,
            wins.max(0) as u64,
            profit,
        ))
    }

    async fn save_prediction(&self, symbol: &str, prediction: &Prediction) -> Result<()> {
        let probabilities = serde_json::to_string(&prediction.probabilities)?;
        sqlx::query(
            r#"
            INSERT INTO predictions (
                symbol, trend, class_id, probabilities, confidence, latency_ms, price, predicted_at
            ) VALUES ($1, $2, $3, $4::jsonb, $5, $6, $7, $8)
            "#,
        )
        .bind(symbol)
        .bind(prediction.trend.to_string())
        .bind(i16::from(prediction.class_id))
        .bind(probabilities)
        .bind(prediction.confidence)
        .bind(prediction.latency_ms)
        .bind(prediction.price_at_prediction)
        .bind(prediction.timestamp)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
