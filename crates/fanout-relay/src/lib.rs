//! # fanout-relay
//!
//! A real-time fan-out relay. WebSocket clients connect on `/ws` and stay
//! registered until they close or their transport fails. JSON objects
//! posted to `/notify` are re-serialized and written to every registered
//! client in one pass; clients whose write fails are dropped on the spot.
//!
//! Delivery is best effort. There is no persistence, no retry, no ordering
//! across producers and no authentication.
//!
//! ```rust,ignore
//! use fanout_relay::{run, RelayConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
//!     run(RelayConfig::from_env()?).await?;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]

mod app;
mod config;
mod connection;
mod dispatcher;
mod handler;
mod intake;
mod registry;

pub use app::{run, HealthReport, Relay, HEALTH_PATH, NOTIFY_PATH, WS_PATH};
pub use config::{RelayConfig, DEFAULT_MAX_BODY_BYTES};
pub use connection::{Connection, ConnectionId};
pub use dispatcher::{BroadcastReport, DispatchStats, Dispatcher, StatsSnapshot};
pub use handler::{run_connection, serve_socket, CloseReason};
pub use intake::{canonicalize, Intake, IntakeError, CONFIRMATION};
pub use registry::{Members, Registry};
