//! WebSocket upgrade extraction

use crate::upgrade::{validate_upgrade_request, WebSocketUpgrade};
use crate::WebSocketError;
use fanout_core::Request;
use hyper::upgrade::OnUpgrade;

/// A validated WebSocket upgrade request
///
/// Build one from an incoming request with [`WebSocket::from_request`],
/// then call [`WebSocket::on_upgrade`] to produce the `101` response and
/// register the task that runs once the connection is handed over.
///
/// ```rust,ignore
/// async fn ws_handler(mut req: Request) -> Result<WebSocketUpgrade, ApiError> {
///     let ws = WebSocket::from_request(&mut req)?;
///     Ok(ws.on_upgrade(|socket| async move {
///         let (_sender, mut receiver) = socket.split();
///         while let Some(Ok(_)) = receiver.next().await {}
///     }))
/// }
/// ```
pub struct WebSocket {
    sec_key: String,
    on_upgrade: Option<OnUpgrade>,
}

impl WebSocket {
    /// Validate the upgrade headers and take hyper's upgrade handle
    pub fn from_request(req: &mut Request) -> Result<Self, WebSocketError> {
        let sec_key = validate_upgrade_request(req.method(), req.headers())?;

        let on_upgrade = req.extensions_mut().remove::<OnUpgrade>();

        Ok(Self {
            sec_key,
            on_upgrade,
        })
    }

    /// Create the upgrade response with a connection callback
    ///
    /// No subprotocol is negotiated; a requested `Sec-WebSocket-Protocol`
    /// is left unanswered.
    pub fn on_upgrade<F, Fut>(mut self, callback: F) -> WebSocketUpgrade
    where
        F: FnOnce(crate::WebSocketStream) -> Fut + Send + 'static,
        Fut: std::future::Future<Output = ()> + Send + 'static,
    {
        WebSocketUpgrade::new(&self.sec_key, self.on_upgrade.take()).on_upgrade(callback)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use fanout_core::IntoResponse;
    use http::{header, Method};
    use http_body_util::Empty;

    fn request(method: Method, protocol: Option<&'static str>) -> Request {
        let mut builder = http::Request::builder()
            .method(method)
            .uri("/ws")
            .header(header::UPGRADE, "websocket")
            .header(header::CONNECTION, "Upgrade")
            .header(header::SEC_WEBSOCKET_KEY, "dGhlIHNhbXBsZSBub25jZQ==")
            .header(header::SEC_WEBSOCKET_VERSION, "13");
        if let Some(protocol) = protocol {
            builder = builder.header(header::SEC_WEBSOCKET_PROTOCOL, protocol);
        }
        Request::from_http(builder.body(Empty::<Bytes>::new()).unwrap())
    }

    #[test]
    fn test_requested_protocol_is_not_echoed() {
        let mut req = request(Method::GET, Some("notify.v1, notify.v2"));
        let ws = WebSocket::from_request(&mut req).unwrap();

        let response = ws.on_upgrade(|_socket| async {}).into_response();

        assert_eq!(response.status(), http::StatusCode::SWITCHING_PROTOCOLS);
        assert!(response
            .headers()
            .get(header::SEC_WEBSOCKET_PROTOCOL)
            .is_none());
    }

    #[test]
    fn test_from_request_rejects_post() {
        let mut req = request(Method::POST, None);
        assert!(WebSocket::from_request(&mut req).is_err());
    }
}
