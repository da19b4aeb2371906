//! Relay wiring: shared state, routes and listener

use crate::config::RelayConfig;
use crate::dispatcher::{Dispatcher, StatsSnapshot};
use crate::handler;
use crate::intake::{Intake, CONFIRMATION};
use crate::registry::Registry;
use fanout_core::{get, post, ApiError, Json, Request, Router, Server, ServerError};
use fanout_ws::{WebSocket, WebSocketUpgrade};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

/// Path clients connect to for the WebSocket stream
pub const WS_PATH: &str = "/ws";
/// Path notifications are submitted to
pub const NOTIFY_PATH: &str = "/notify";
/// Health endpoint
pub const HEALTH_PATH: &str = "/health";

/// Body of `GET /health`
#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    /// Always `"healthy"` while the process serves requests
    pub status: &'static str,
    /// Currently registered connections
    pub connections: usize,
    /// Cumulative broadcast counters
    #[serde(flatten)]
    pub stats: StatsSnapshot,
}

/// Shared relay state
///
/// Owns the one registry both the connection endpoint and the notification
/// endpoint operate on.
pub struct Relay {
    config: RelayConfig,
    registry: Arc<Registry>,
    dispatcher: Arc<Dispatcher>,
    intake: Intake,
}

impl Relay {
    /// Build the relay state from configuration
    pub fn new(config: RelayConfig) -> Arc<Self> {
        let registry = Arc::new(Registry::new());
        let dispatcher = Arc::new(Dispatcher::new(registry.clone()));
        let intake = Intake::new(dispatcher.clone(), config.max_body_bytes);

        Arc::new(Self {
            config,
            registry,
            dispatcher,
            intake,
        })
    }

    /// The connection registry
    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// The broadcast dispatcher
    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }

    /// Route table for the relay's endpoints
    pub fn router(self: &Arc<Self>) -> Router {
        let ws = self.clone();
        let notify = self.clone();
        let health = self.clone();

        Router::new()
            .route(
                WS_PATH,
                get(move |mut req: Request| {
                    let relay = ws.clone();
                    async move { relay.accept(&mut req) }
                }),
            )
            .route(
                NOTIFY_PATH,
                post(move |mut req: Request| {
                    let relay = notify.clone();
                    async move {
                        relay
                            .intake
                            .submit(&mut req)
                            .await
                            .map(|_| CONFIRMATION)
                            .map_err(ApiError::from)
                    }
                }),
            )
            .route(
                HEALTH_PATH,
                get(move |_req: Request| {
                    let relay = health.clone();
                    async move { Json(relay.health().await) }
                }),
            )
    }

    /// Validate a WebSocket upgrade and attach the connection handler
    fn accept(&self, req: &mut Request) -> Result<WebSocketUpgrade, ApiError> {
        let ws = WebSocket::from_request(req).map_err(|err| {
            warn!(error = %err, "Rejected WebSocket handshake");
            ApiError::from(err)
        })?;

        let registry = self.registry.clone();
        Ok(ws.on_upgrade(move |socket| handler::serve_socket(registry, socket)))
    }

    /// Current health and counters
    pub async fn health(&self) -> HealthReport {
        HealthReport {
            status: "healthy",
            connections: self.registry.len().await,
            stats: self.dispatcher.stats(),
        }
    }

    /// Bind the listener from configuration
    pub async fn bind(self: &Arc<Self>) -> Result<Server, ServerError> {
        let router = self.router();
        let routes = router.paths().join(", ");
        let server = Server::bind(&self.config.listen_addr(), router).await?;

        info!(
            address = %server.local_addr()?,
            routes = %routes,
            "Fanout relay ready: {} for WebSocket clients, {} for notifications",
            WS_PATH,
            NOTIFY_PATH
        );
        Ok(server)
    }
}

/// Bind and serve until the process exits
pub async fn run(config: RelayConfig) -> Result<(), ServerError> {
    let relay = Relay::new(config);
    relay.bind().await?.run().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use fanout_core::{Response, RouteMatch};
    use http::{Method, StatusCode};
    use http_body_util::{BodyExt, Full};

    async fn call(relay: &Arc<Relay>, method: Method, path: &str, body: &str) -> Response {
        let router = relay.router();
        let RouteMatch::Found(handler) = router.match_route(path, &method) else {
            panic!("no route for {} {}", method, path);
        };
        let req = http::Request::builder()
            .method(method)
            .uri(path)
            .body(Full::new(Bytes::from(body.to_string())))
            .unwrap();

        handler(Request::from_http(req)).await
    }

    async fn body_string(response: Response) -> String {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_notify_route_confirms_submission() {
        let relay = Relay::new(RelayConfig::loopback());

        let response = call(&relay, Method::POST, NOTIFY_PATH, r#"{"type":"alert"}"#).await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_string(response).await, CONFIRMATION);
        assert_eq!(relay.dispatcher().stats().broadcasts, 1);
    }

    #[tokio::test]
    async fn test_notify_route_on_spawned_task() {
        let relay = Relay::new(RelayConfig::loopback());

        let task_relay = relay.clone();
        let response = tokio::spawn(async move {
            call(&task_relay, Method::POST, NOTIFY_PATH, r#"{"seq":1}"#).await
        })
        .await
        .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_notify_route_rejects_oversized_body() {
        let relay = Relay::new(RelayConfig {
            max_body_bytes: 8,
            ..RelayConfig::loopback()
        });

        let response = call(&relay, Method::POST, NOTIFY_PATH, r#"{"blob":"0123456789"}"#).await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body: serde_json::Value = serde_json::from_str(&body_string(response).await).unwrap();
        assert_eq!(body["error"]["type"], "body_read_error");
        assert_eq!(relay.dispatcher().stats().broadcasts, 0);
    }

    #[tokio::test]
    async fn test_health_route_reports_counters() {
        let relay = Relay::new(RelayConfig::loopback());

        let response = call(&relay, Method::GET, HEALTH_PATH, "").await;

        assert_eq!(response.status(), StatusCode::OK);
        let body: serde_json::Value = serde_json::from_str(&body_string(response).await).unwrap();
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["connections"], 0);
    }
}
