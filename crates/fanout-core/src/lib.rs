//! # fanout-core
//!
//! HTTP plumbing shared by the fanout relay: a hyper-based HTTP/1 server
//! with upgrade support, a matchit-backed router, response conversion,
//! structured JSON errors, environment configuration and tracing setup.

#![warn(missing_docs)]

pub mod config;
mod error;
mod logging;
mod request;
mod response;
mod router;
mod server;

pub use config::{ConfigError, Environment};
pub use error::{ApiError, Result};
pub use logging::init_tracing;
pub use request::{BodyError, BoxError, Request, RequestBody};
pub use response::{IntoResponse, Json, Response};
pub use router::{get, post, BoxedHandler, MethodRouter, RouteMatch, Router};
pub use server::{Server, ServerError};
