//! WebSocket error types

use fanout_core::ApiError;
use thiserror::Error;

/// Error type for WebSocket operations
#[derive(Error, Debug)]
pub enum WebSocketError {
    /// Invalid WebSocket upgrade request
    #[error("Invalid WebSocket upgrade request: {0}")]
    InvalidUpgrade(String),

    /// WebSocket handshake failed after the upgrade response
    #[error("WebSocket handshake failed: {0}")]
    HandshakeFailed(String),

    /// Connection closed
    #[error("Connection closed")]
    ConnectionClosed,

    /// Tungstenite error
    #[error("WebSocket error: {0}")]
    Tungstenite(#[from] tungstenite::Error),
}

impl WebSocketError {
    /// Create an invalid upgrade error
    pub fn invalid_upgrade(msg: impl Into<String>) -> Self {
        Self::InvalidUpgrade(msg.into())
    }

    /// Create a handshake failed error
    pub fn handshake_failed(msg: impl Into<String>) -> Self {
        Self::HandshakeFailed(msg.into())
    }

    /// Whether the error means the peer is gone rather than misbehaving
    pub fn is_disconnect(&self) -> bool {
        matches!(
            self,
            Self::ConnectionClosed
                | Self::Tungstenite(tungstenite::Error::ConnectionClosed)
                | Self::Tungstenite(tungstenite::Error::AlreadyClosed)
        )
    }
}

impl From<WebSocketError> for ApiError {
    fn from(err: WebSocketError) -> Self {
        match err {
            WebSocketError::InvalidUpgrade(msg) => {
                ApiError::bad_request(format!("WebSocket upgrade failed: {}", msg))
            }
            WebSocketError::HandshakeFailed(msg) => {
                ApiError::bad_request(format!("WebSocket handshake failed: {}", msg))
            }
            _ => ApiError::internal("WebSocket error").with_internal(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::StatusCode;

    #[test]
    fn test_invalid_upgrade_maps_to_bad_request() {
        let err: ApiError = WebSocketError::invalid_upgrade("Missing Upgrade header").into();

        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert!(err.message.contains("Missing Upgrade header"));
    }

    #[test]
    fn test_disconnect_classification() {
        assert!(WebSocketError::ConnectionClosed.is_disconnect());
        assert!(WebSocketError::Tungstenite(tungstenite::Error::AlreadyClosed).is_disconnect());
        assert!(!WebSocketError::Tungstenite(tungstenite::Error::Utf8).is_disconnect());
        assert!(!WebSocketError::handshake_failed("reset").is_disconnect());
    }
}
