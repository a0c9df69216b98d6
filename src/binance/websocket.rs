//! WebSocket price source for Binance raw trade streams

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::watch;
use tokio_tungstenite::{connect_async, tungstenite::protocol::Message};
use tracing::{debug, info, instrument, warn};

use super::messages::{StreamRequest, StreamResponse, TradeEvent};
use crate::common::channels::PriceRelay;
use crate::common::errors::{PipelineError, Result};
use crate::common::traits::PriceSource;
use crate::common::types::PriceTick;

/// One connection per call to [`PriceSource::stream`], subscribed to a single
/// symbol's `@trade` stream. Shared by every symbol, so it holds no
/// per-connection state.
pub struct BinanceTradeSource {
    /// WebSocket URL
    url: String,
}

impl BinanceTradeSource {
    pub fn new(url: &str) -> Self {
        Self {
            url: url.trim_end_matches('/').to_string(),
        }
    }

    /// Parse an incoming text frame.
    ///
    /// Returns `Ok(None)` for well-formed frames that carry no trade, such as
    /// subscription acknowledgements and other event types.
    pub fn parse_message(text: &str) -> Result<Option<PriceTick>> {
        let value: serde_json::Value = serde_json::from_str(text)?;

        match value.get("e").and_then(|v| v.as_str()) {
            Some("trade") => {
                let event: TradeEvent = serde_json::from_value(value)?;
                event.into_tick().map(Some)
            }
            Some(other) => {
                debug!("Ignoring {} event", other);
                Ok(None)
            }
            None => {
                if let Ok(ack) = serde_json::from_value::<StreamResponse>(value) {
                    debug!("Subscription acknowledged (id {}): {:?}", ack.id, ack.result);
                }
                Ok(None)
            }
        }
    }
}

#[async_trait]
impl PriceSource for BinanceTradeSource {
    #[instrument(skip(self, relay, shutdown), fields(symbol = %symbol))]
    async fn stream(
        &self,
        symbol: &str,
        relay: &PriceRelay,
        shutdown: &mut watch::Receiver<bool>,
    ) -> Result<()> {
        if *shutdown.borrow() {
            return Ok(());
        }

        info!("Connecting to Binance WebSocket: {}", self.url);
        let (ws_stream, _response) = connect_async(&self.url)
            .await
            .map_err(|e| PipelineError::WebSocketConnection(e.to_string()))?;

        let (mut write, mut read) = ws_stream.split();

        let subscribe = serde_json::to_string(&StreamRequest::subscribe_trades(symbol))?;
        debug!("Sending subscription message: {}", subscribe);
        write.send(Message::Text(subscribe)).await?;
        info!("Subscribed to {} trades", symbol);

        let wanted = symbol.to_lowercase();
        loop {
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        debug!("Shutdown requested, closing feed");
                        let _ = write.send(Message::Close(None)).await;
                        break Ok(());
                    }
                }
                msg = read.next() => {
                    match msg {
                        Some(Ok(Message::Text(text))) => match Self::parse_message(&text) {
                            Ok(Some(tick)) if tick.symbol == wanted => {
                                relay.offer(tick);
                            }
                            Ok(Some(tick)) => {
                                debug!("Dropping tick for unexpected symbol {}", tick.symbol);
                            }
                            Ok(None) => {}
                            Err(e) => {
                                debug!("Dropping malformed message: {} - {}", e, text);
                            }
                        },
                        Some(Ok(Message::Ping(data))) => {
                            debug!("Received Ping, sending Pong");
                            if let Err(e) = write.send(Message::Pong(data)).await {
                                break Err(e.into());
                            }
                        }
                        Some(Ok(Message::Close(frame))) => {
                            info!("WebSocket closed: {:?}", frame);
                            break Ok(());
                        }
                        Some(Err(e)) => {
                            warn!("WebSocket error: {}", e);
                            break Err(PipelineError::WebSocketCommunication(e.to_string()));
                        }
                        None => {
                            info!("WebSocket stream ended");
                            break Ok(());
                        }
                        _ => {}
                    }
                }
            }
        }
    }

    fn source_name(&self) -> &'static str {
        "binance"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_source_creation() {
        let source = BinanceTradeSource::new("wss://stream.binance.com:9443/ws/");
        assert_eq!(source.url, "wss://stream.binance.com:9443/ws");
        assert_eq!(source.source_name(), "binance");
    }

    #[test]
    fn test_parse_trade() {
        let json = r#"{
            "e": "trade",
            "E": 1672515782136,
            "s": "BNBBTC",
            "t": 12345,
            "p": "0.001",
            "q": "100",
            "T": 1672515782136,
            "m": true,
            "M": true
        }"#;

        let tick = BinanceTradeSource::parse_message(json).unwrap().unwrap();
        assert_eq!(tick.symbol, "bnbbtc");
        assert_eq!(tick.price, dec!(0.001));
        assert_eq!(tick.quantity, dec!(100));
    }

    #[test]
    fn test_parse_subscription_ack() {
        let result = BinanceTradeSource::parse_message(r#"{"result":null,"id":1}"#);
        assert!(matches!(result, Ok(None)));
    }

    #[test]
    fn test_parse_other_event_filtered() {
        let json = r#"{"e":"aggTrade","E":1,"s":"BTCUSDT","p":"1","q":"1"}"#;
        assert!(matches!(BinanceTradeSource::parse_message(json), Ok(None)));
    }

    #[test]
    fn test_parse_malformed() {
        assert!(BinanceTradeSource::parse_message("not json").is_err());
        assert!(BinanceTradeSource::parse_message(r#"{"e":"trade","s":"BTCUSDT"}"#).is_err());
    }
}
