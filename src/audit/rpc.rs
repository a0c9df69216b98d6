//! JSON-RPC audit ledger for Ethereum-compatible nodes
//!
//! Each trade is anchored as a zero-value transaction from the configured
//! account to itself, carrying the SHA-256 of the audit record as data. The
//! node must hold the account unlocked (`eth_sendTransaction`).

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::{debug, info, instrument};

use super::AuditRecord;
use crate::common::errors::{PipelineError, Result};
use crate::common::traits::AuditLedger;
use crate::common::types::Trade;
use crate::config::types::AuditConfig;

#[derive(Debug, Serialize)]
struct RpcRequest<'a> {
    jsonrpc: &'static str,
    method: &'a str,
    params: Value,
    id: u64,
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcErrorBody>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorBody {
    code: i64,
    message: String,
}

/// Audit ledger backed by a JSON-RPC node
#[derive(Debug)]
pub struct RpcAuditLedger {
    /// HTTP client
    client: Client,
    rpc_url: String,
    from_address: String,
    explorer_url: String,
    next_id: AtomicU64,
}

impl RpcAuditLedger {
    /// Create a new ledger client
    pub fn new(rpc_url: &str, from_address: &str, explorer_url: &str) -> Result<Self> {
        Self::with_timeout(rpc_url, from_address, explorer_url, Duration::from_secs(30))
    }

    /// Create a new ledger client with custom timeout
    pub fn with_timeout(
        rpc_url: &str,
        from_address: &str,
        explorer_url: &str,
        timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| PipelineError::Internal(e.to_string()))?;

        Ok(Self {
            client,
            rpc_url: rpc_url.to_string(),
            from_address: from_address.to_string(),
            explorer_url: explorer_url.trim_end_matches('/').to_string(),
            next_id: AtomicU64::new(1),
        })
    }

    pub fn from_config(config: &AuditConfig) -> Result<Self> {
        Self::new(&config.rpc_url, &config.from_address, &config.explorer_url)
    }

    async fn call(&self, method: &str, params: Value) -> Result<Value> {
        let request = RpcRequest {
            jsonrpc: "2.0",
            method,
            params,
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
        };

        let response = self.client.post(&self.rpc_url).json(&request).send().await?;
        if !response.status().is_success() {
            return Err(PipelineError::Audit(format!(
                "{} returned status: {}",
                method,
                response.status()
            )));
        }

        let body: RpcResponse = response.json().await?;
        if let Some(error) = body.error {
            return Err(PipelineError::Audit(format!(
                "{} failed ({}): {}",
                method, error.code, error.message
            )));
        }
        Ok(body.result.unwrap_or(Value::Null))
    }
}

#[async_trait]
impl AuditLedger for RpcAuditLedger {
    #[instrument(skip(self, trade), fields(symbol = %trade.symbol, kind = %trade.kind))]
    async fn record_trade(&self, trade: &Trade) -> Result<String> {
        let digest = AuditRecord::from_trade(trade).digest()?;
        let tx = json!({
            "from": self.from_address,
            "to": self.from_address,
            "value": "0x0",
            "data": format!("0x{}", hex::encode(digest)),
        });

        let result = self.call("eth_sendTransaction", json!([tx])).await?;
        let hash = result
            .as_str()
            .ok_or_else(|| PipelineError::Audit(format!("unexpected transaction result: {}", result)))?
            .to_string();

        info!("Trade anchored: {}", self.explorer_url(&hash).unwrap_or_default());
        Ok(hash)
    }

    #[instrument(skip(self))]
    async fn verify(&self, hash: &str) -> Result<bool> {
        let receipt = self
            .call("eth_getTransactionReceipt", json!([hash]))
            .await?;
        let status = receipt.get("status").and_then(|s| s.as_str());
        debug!("Receipt status: {:?}", status);
        Ok(status == Some("0x1"))
    }

    fn explorer_url(&self, hash: &str) -> Option<String> {
        Some(format!("{}/tx/{}", self.explorer_url, hash))
    }

    fn ledger_name(&self) -> &'static str {
        "json-rpc"
    }
}
