use thiserror::Error;

/// Errors raised by the realtime layer.
///
/// None of these reach the hosting view: the client absorbs them into its
/// reconnect path. They surface only from constructors and endpoint helpers.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The origin or URL cannot be turned into a `/ws` endpoint.
    #[error("Invalid realtime endpoint: {0}")]
    InvalidEndpoint(String),

    /// The origin string is not a URL.
    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),

    /// Handshake or read failure on the WebSocket.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// A non-WebSocket transport failed to connect.
    #[error("Connection refused by transport: {0}")]
    Transport(String),
}

/// Result alias for the realtime layer.
pub type Result<T> = std::result::Result<T, SyncError>;
