//! Binance module - trade stream feed connector

pub mod feed;
pub mod messages;
pub mod websocket;

pub use feed::FeedProducer;
pub use websocket::BinanceTradeSource;
