//! WebSocket upgrade response

use crate::{WebSocketError, WebSocketStream};
use bytes::Bytes;
use fanout_core::{IntoResponse, Response};
use http::{header, StatusCode};
use http_body_util::Full;
use hyper::upgrade::OnUpgrade;
use hyper_util::rt::TokioIo;
use std::future::Future;
use std::pin::Pin;
use tokio_tungstenite::tungstenite::protocol::Role;

/// Type alias for WebSocket upgrade callback
type UpgradeCallback =
    Box<dyn FnOnce(WebSocketStream) -> Pin<Box<dyn Future<Output = ()> + Send>> + Send>;

/// WebSocket upgrade response
///
/// Returned from a handler to answer `101 Switching Protocols`. Turning it
/// into a response spawns a task that waits for hyper to hand over the
/// connection and then runs the `on_upgrade` callback with the socket.
pub struct WebSocketUpgrade {
    response: Response,
    on_upgrade: Option<UpgradeCallback>,
    on_upgrade_fut: Option<OnUpgrade>,
}

impl WebSocketUpgrade {
    pub(crate) fn new(sec_key: &str, on_upgrade_fut: Option<OnUpgrade>) -> Self {
        let accept_key = generate_accept_key(sec_key);

        let response = http::Response::builder()
            .status(StatusCode::SWITCHING_PROTOCOLS)
            .header(header::UPGRADE, "websocket")
            .header(header::CONNECTION, "Upgrade")
            .header(header::SEC_WEBSOCKET_ACCEPT, accept_key)
            .body(Full::new(Bytes::new()))
            .expect("static upgrade headers are valid");

        Self {
            response,
            on_upgrade: None,
            on_upgrade_fut,
        }
    }

    /// Set the callback to handle the upgraded WebSocket connection
    pub fn on_upgrade<F, Fut>(mut self, callback: F) -> Self
    where
        F: FnOnce(WebSocketStream) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.on_upgrade = Some(Box::new(move |stream| Box::pin(callback(stream))));
        self
    }
}

impl IntoResponse for WebSocketUpgrade {
    fn into_response(mut self) -> Response {
        match (self.on_upgrade_fut.take(), self.on_upgrade.take()) {
            (Some(on_upgrade), Some(callback)) => {
                tokio::spawn(async move {
                    match on_upgrade.await {
                        Ok(upgraded) => {
                            let ws_stream = tokio_tungstenite::WebSocketStream::from_raw_socket(
                                TokioIo::new(upgraded),
                                Role::Server,
                                None,
                            )
                            .await;

                            callback(WebSocketStream::new(ws_stream)).await;
                        }
                        Err(e) => {
                            let err = WebSocketError::handshake_failed(e.to_string());
                            tracing::error!(error = %err, "WebSocket upgrade failed");
                        }
                    }
                });
            }
            (None, Some(_)) => {
                tracing::error!("WebSocket upgrade requested on a connection that cannot be upgraded");
            }
            _ => {}
        }

        self.response
    }
}

/// Generate the Sec-WebSocket-Accept key from the client's Sec-WebSocket-Key
pub(crate) fn generate_accept_key(key: &str) -> String {
    use base64::Engine;
    use sha1::{Digest, Sha1};

    const GUID: &str = "258EAFA5-E914-47DA-95CA-C5AB0DC85B11";

    let mut hasher = Sha1::new();
    hasher.update(key.as_bytes());
    hasher.update(GUID.as_bytes());
    let hash = hasher.finalize();

    base64::engine::general_purpose::STANDARD.encode(hash)
}

/// Validate that a request is a valid WebSocket upgrade request
///
/// Returns the client's `Sec-WebSocket-Key`.
pub(crate) fn validate_upgrade_request(
    method: &http::Method,
    headers: &http::HeaderMap,
) -> Result<String, WebSocketError> {
    if method != http::Method::GET {
        return Err(WebSocketError::invalid_upgrade("Method must be GET"));
    }

    let upgrade = headers
        .get(header::UPGRADE)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| WebSocketError::invalid_upgrade("Missing Upgrade header"))?;

    if !upgrade.eq_ignore_ascii_case("websocket") {
        return Err(WebSocketError::invalid_upgrade(
            "Upgrade header must be 'websocket'",
        ));
    }

    let connection = headers
        .get(header::CONNECTION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| WebSocketError::invalid_upgrade("Missing Connection header"))?;

    let has_upgrade = connection
        .split(',')
        .any(|s| s.trim().eq_ignore_ascii_case("upgrade"));

    if !has_upgrade {
        return Err(WebSocketError::invalid_upgrade(
            "Connection header must contain 'Upgrade'",
        ));
    }

    let sec_key = headers
        .get(header::SEC_WEBSOCKET_KEY)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| WebSocketError::invalid_upgrade("Missing Sec-WebSocket-Key header"))?;

    let version = headers
        .get(header::SEC_WEBSOCKET_VERSION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| WebSocketError::invalid_upgrade("Missing Sec-WebSocket-Version header"))?;

    if version != "13" {
        return Err(WebSocketError::invalid_upgrade(
            "Sec-WebSocket-Version must be 13",
        ));
    }

    Ok(sec_key.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::{HeaderMap, HeaderValue, Method};

    fn upgrade_headers() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::UPGRADE, HeaderValue::from_static("websocket"));
        headers.insert(header::CONNECTION, HeaderValue::from_static("keep-alive, Upgrade"));
        headers.insert(
            header::SEC_WEBSOCKET_KEY,
            HeaderValue::from_static("dGhlIHNhbXBsZSBub25jZQ=="),
        );
        headers.insert(header::SEC_WEBSOCKET_VERSION, HeaderValue::from_static("13"));
        headers
    }

    #[test]
    fn test_accept_key_generation() {
        // Example from RFC 6455
        let key = "dGhlIHNhbXBsZSBub25jZQ==";
        let accept = generate_accept_key(key);
        assert_eq!(accept, "s3pPLMBiTxaQ9kYGzzhZRbK+xOo=");
    }

    #[test]
    fn test_valid_upgrade_request() {
        let key = validate_upgrade_request(&Method::GET, &upgrade_headers()).unwrap();
        assert_eq!(key, "dGhlIHNhbXBsZSBub25jZQ==");
    }

    #[test]
    fn test_upgrade_requires_get() {
        let err = validate_upgrade_request(&Method::POST, &upgrade_headers()).unwrap_err();
        assert!(matches!(err, WebSocketError::InvalidUpgrade(_)));
    }

    #[test]
    fn test_upgrade_requires_key() {
        let mut headers = upgrade_headers();
        headers.remove(header::SEC_WEBSOCKET_KEY);

        let err = validate_upgrade_request(&Method::GET, &headers).unwrap_err();
        assert!(err.to_string().contains("Sec-WebSocket-Key"));
    }

    #[test]
    fn test_upgrade_rejects_old_version() {
        let mut headers = upgrade_headers();
        headers.insert(header::SEC_WEBSOCKET_VERSION, HeaderValue::from_static("8"));

        assert!(validate_upgrade_request(&Method::GET, &headers).is_err());
    }

    #[test]
    fn test_upgrade_response_headers() {
        let response = WebSocketUpgrade::new("dGhlIHNhbXBsZSBub25jZQ==", None).into_response();

        assert_eq!(response.status(), StatusCode::SWITCHING_PROTOCOLS);
        assert_eq!(
            response.headers().get(header::SEC_WEBSOCKET_ACCEPT).unwrap(),
            "s3pPLMBiTxaQ9kYGzzhZRbK+xOo="
        );
    }
}
