//! HTTP server implementation

use crate::error::ApiError;
use crate::request::Request;
use crate::response::{IntoResponse, Response};
use crate::router::{RouteMatch, Router};
use http::{header, HeaderValue, StatusCode};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use thiserror::Error;
use tokio::net::TcpListener;
use tracing::{debug, error, info};

/// Errors raised while binding or running the server
#[derive(Debug, Error)]
pub enum ServerError {
    /// The listen address could not be parsed
    #[error("invalid listen address '{addr}': {source}")]
    InvalidAddress {
        /// Address as given
        addr: String,
        /// Parse failure
        source: std::net::AddrParseError,
    },

    /// Binding or querying the listener failed
    #[error("listener error: {0}")]
    Io(#[from] std::io::Error),
}

/// A bound HTTP/1 server dispatching to a [`Router`]
///
/// Connections are served with upgrades enabled so handlers can hand the
/// socket over to a WebSocket.
pub struct Server {
    router: Arc<Router>,
    listener: TcpListener,
}

impl Server {
    /// Bind a listener on `addr`
    ///
    /// Port `0` binds an ephemeral port; use [`Server::local_addr`] to find it.
    pub async fn bind(addr: &str, router: Router) -> Result<Self, ServerError> {
        let parsed: SocketAddr = addr.parse().map_err(|source| ServerError::InvalidAddress {
            addr: addr.to_string(),
            source,
        })?;
        let listener = TcpListener::bind(parsed).await?;

        Ok(Self {
            router: Arc::new(router),
            listener,
        })
    }

    /// Address the listener is bound to
    pub fn local_addr(&self) -> Result<SocketAddr, ServerError> {
        Ok(self.listener.local_addr()?)
    }

    /// Accept connections until the process exits
    ///
    /// Each connection is served on its own task. A failed accept is logged
    /// and the loop continues.
    pub async fn run(self) -> Result<(), ServerError> {
        let addr = self.local_addr()?;
        info!(address = %addr, "Server listening on http://{}", addr);

        loop {
            let (stream, remote_addr) = match self.listener.accept().await {
                Ok(accepted) => accepted,
                Err(err) => {
                    error!(error = %err, "Failed to accept connection");
                    continue;
                }
            };
            let io = TokioIo::new(stream);
            let router = self.router.clone();

            tokio::spawn(async move {
                let service = service_fn(move |req: hyper::Request<Incoming>| {
                    let router = router.clone();
                    async move {
                        let response = handle_request(router, req, remote_addr).await;
                        Ok::<_, Infallible>(response)
                    }
                });

                if let Err(err) = http1::Builder::new()
                    .serve_connection(io, service)
                    .with_upgrades()
                    .await
                {
                    debug!(remote = %remote_addr, error = %err, "Connection error");
                }
            });
        }
    }
}

/// Handle a single HTTP request
async fn handle_request(
    router: Arc<Router>,
    req: hyper::Request<Incoming>,
    remote_addr: SocketAddr,
) -> Response {
    let req = Request::from_http(req);
    let method = req.method().clone();
    let path = req.path().to_string();
    let start = std::time::Instant::now();

    let response = match router.match_route(&path, &method) {
        RouteMatch::Found(handler) => handler(req).await,
        RouteMatch::NotFound => {
            ApiError::not_found(format!("No route found for {} {}", method, path)).into_response()
        }
        RouteMatch::MethodNotAllowed { allowed } => {
            let allowed_str: Vec<&str> = allowed.iter().map(|m| m.as_str()).collect();
            let mut response = ApiError::method_not_allowed(format!(
                "Method {} not allowed for {}",
                method, path
            ))
            .into_response();

            if let Ok(value) = HeaderValue::from_str(&allowed_str.join(", ")) {
                response.headers_mut().insert(header::ALLOW, value);
            }
            response
        }
    };

    log_request(&method, &path, response.status(), remote_addr, start);
    response
}

/// Log request completion
fn log_request(
    method: &http::Method,
    path: &str,
    status: StatusCode,
    remote_addr: SocketAddr,
    start: std::time::Instant,
) {
    let elapsed = start.elapsed();

    if status.is_success() || status.is_informational() {
        info!(
            method = %method,
            path = %path,
            status = %status.as_u16(),
            remote = %remote_addr,
            duration_ms = %elapsed.as_millis(),
            "Request completed"
        );
    } else {
        error!(
            method = %method,
            path = %path,
            status = %status.as_u16(),
            remote = %remote_addr,
            duration_ms = %elapsed.as_millis(),
            "Request failed"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_bind_ephemeral_port() {
        let server = Server::bind("127.0.0.1:0", Router::new()).await.unwrap();
        let addr = server.local_addr().unwrap();

        assert!(addr.ip().is_loopback());
        assert_ne!(addr.port(), 0);
    }

    #[tokio::test]
    async fn test_bind_rejects_bad_address() {
        let err = Server::bind("not-an-address", Router::new())
            .await
            .err()
            .unwrap();

        assert!(matches!(err, ServerError::InvalidAddress { .. }));
    }
}
