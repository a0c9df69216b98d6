//! Binance stream message types

use chrono::{DateTime, TimeZone, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::common::errors::{PipelineError, Result};
use crate::common::types::PriceTick;

/// Subscription method of a stream control request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum StreamMethod {
    Subscribe,
}

/// Control message sent after connecting
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamRequest {
    pub method: StreamMethod,
    /// Stream names, e.g. `btcusdt@trade`
    pub params: Vec<String>,
    pub id: u64,
}

impl StreamRequest {
    /// Subscribe to the trade stream of one symbol
    pub fn subscribe_trades(symbol: &str) -> Self {
        Self {
            method: StreamMethod::Subscribe,
            params: vec![trade_stream_name(symbol)],
            id: 1,
        }
    }
}

/// Name of the raw trade stream for a symbol
pub fn trade_stream_name(symbol: &str) -> String {
    format!("{}@trade", symbol.to_lowercase())
}

/// Acknowledgement of a control message (`{"result":null,"id":1}`)
#[derive(Debug, Clone, Deserialize)]
pub struct StreamResponse {
    pub result: Option<serde_json::Value>,
    pub id: u64,
}

/// Raw trade event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeEvent {
    /// Event type, always `trade`
    #[serde(rename = "e")]
    pub event_type: String,
    /// Event time in milliseconds
    #[serde(rename = "E")]
    pub event_time: i64,
    #[serde(rename = "s")]
    pub symbol: String,
    #[serde(rename = "t", default)]
    pub trade_id: u64,
    /// Price as a decimal string
    #[serde(rename = "p")]
    pub price: String,
    /// Quantity as a decimal string
    #[serde(rename = "q")]
    pub quantity: String,
    /// Trade time in milliseconds
    #[serde(rename = "T")]
    pub trade_time: i64,
    /// Whether the buyer was the maker
    #[serde(rename = "m", default)]
    pub buyer_is_maker: bool,
}

impl TradeEvent {
    /// Convert into a price tick, rejecting unparsable or non-positive prices
    pub fn into_tick(self) -> Result<PriceTick> {
        let price: Decimal = self
            .price
            .parse()
            .map_err(|_| PipelineError::InvalidTick(format!("bad price '{}'", self.price)))?;
        if price <= Decimal::ZERO {
            return Err(PipelineError::InvalidTick(format!(
                "non-positive price {}",
                price
            )));
        }
        let quantity: Decimal = self.quantity.parse().map_err(|_| {
            PipelineError::InvalidTick(format!("bad quantity '{}'", self.quantity))
        })?;

        Ok(PriceTick::new(self.symbol.to_lowercase(), price, quantity)
            .with_event_time(millis_to_datetime(self.trade_time)))
    }
}

fn millis_to_datetime(millis: i64) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(millis)
        .single()
        .unwrap_or_else(Utc::now)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_subscribe_request_shape() {
        let json = serde_json::to_string(&StreamRequest::subscribe_trades("BTCUSDT")).unwrap();
        assert_eq!(json, r#"{"method":"SUBSCRIBE","params":["btcusdt@trade"],"id":1}"#);
    }

    #[test]
    fn test_trade_event_into_tick() {
        let event = TradeEvent {
            event_type: "trade".to_string(),
            event_time: 1_700_000_000_100,
            symbol: "BTCUSDT".to_string(),
            trade_id: 42,
            price: "37000.50".to_string(),
            quantity: "0.010".to_string(),
            trade_time: 1_700_000_000_000,
            buyer_is_maker: false,
        };

        let tick = event.into_tick().unwrap();
        assert_eq!(tick.symbol, "btcusdt");
        assert_eq!(tick.price, dec!(37000.50));
        assert_eq!(tick.quantity, dec!(0.010));
        assert_eq!(tick.event_time.timestamp_millis(), 1_700_000_000_000);
    }

    #[test]
    fn test_zero_price_rejected() {
        let event = TradeEvent {
            event_type: "trade".to_string(),
            event_time: 0,
            symbol: "ETHUSDT".to_string(),
            trade_id: 1,
            price: "0.000".to_string(),
            quantity: "1".to_string(),
            trade_time: 0,
            buyer_is_maker: true,
        };
        assert!(matches!(event.into_tick(), Err(PipelineError::InvalidTick(_))));
    }
}
