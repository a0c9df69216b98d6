//! Error types for the application

use thiserror::Error;

/// Result type alias using our PipelineError
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Main error type for pipeline operations
#[derive(Error, Debug)]
pub enum PipelineError {
    /// WebSocket connection errors
    #[error("WebSocket connection error: {0}")]
    WebSocketConnection(String),

    /// WebSocket send/receive errors
    #[error("WebSocket communication error: {0}")]
    WebSocketCommunication(String),

    /// HTTP request errors
    #[error("HTTP request error: {0}")]
    HttpRequest(#[from] reqwest::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON parsing error: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// Database errors from the trade store
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Not enough price history for a prediction
    #[error("Insufficient data: {available}/{required} observations")]
    InsufficientData { available: usize, required: usize },

    /// Predictor failures other than missing history
    #[error("Predictor error: {0}")]
    Predictor(String),

    /// Trade store rejected a write or query
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// Audit ledger failures
    #[error("Audit error: {0}")]
    Audit(String),

    /// A feed message could not be turned into a price tick
    #[error("Invalid tick: {0}")]
    InvalidTick(String),

    /// Channel closed while a pipeline stage still needed it
    #[error("Channel closed: {0}")]
    ChannelClosed(String),

    /// Generic internal errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl PipelineError {
    /// True for faults the feed producer retries after its backoff
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            PipelineError::WebSocketConnection(_)
                | PipelineError::WebSocketCommunication(_)
                | PipelineError::HttpRequest(_)
        )
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for PipelineError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        PipelineError::WebSocketCommunication(err.to_string())
    }
}

impl From<config::ConfigError> for PipelineError {
    fn from(err: config::ConfigError) -> Self {
        PipelineError::Configuration(err.to_string())
    }
}
