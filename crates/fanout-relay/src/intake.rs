//! Notification intake
//!
//! Reads a submitted body, checks it is a JSON object, re-serializes it to
//! its canonical compact form and hands that to the dispatcher. Nothing is
//! broadcast when the body cannot be read or parsed.

use crate::dispatcher::{BroadcastReport, Dispatcher};
use fanout_core::{ApiError, BodyError, Request};
use http::StatusCode;
use serde_json::{Map, Value};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

/// Confirmation body returned after a broadcast attempt
pub const CONFIRMATION: &str = "Notification received and broadcast over WebSocket";

/// Intake failures, surfaced only to the submitter
#[derive(Debug, Error)]
pub enum IntakeError {
    /// The request body could not be read
    #[error("failed to read request body: {0}")]
    BodyRead(#[from] BodyError),

    /// The body is not a JSON object
    #[error("invalid JSON payload: {0}")]
    MalformedPayload(String),
}

impl From<IntakeError> for ApiError {
    fn from(err: IntakeError) -> Self {
        match err {
            IntakeError::BodyRead(inner) => ApiError::new(
                StatusCode::BAD_REQUEST,
                "body_read_error",
                "Error reading request body",
            )
            .with_internal(inner.to_string()),
            IntakeError::MalformedPayload(msg) => ApiError::new(
                StatusCode::BAD_REQUEST,
                "invalid_payload",
                format!("Invalid JSON: {}", msg),
            ),
        }
    }
}

/// Parse `body` as a JSON object and return its canonical serialization
///
/// Whitespace and formatting are normalized; keys and values are kept.
/// Key order follows the map's ordering, not the submitted order.
pub fn canonicalize(body: &[u8]) -> Result<String, IntakeError> {
    let map: Map<String, Value> =
        serde_json::from_slice(body).map_err(|e| IntakeError::MalformedPayload(e.to_string()))?;

    Ok(Value::Object(map).to_string())
}

/// Accepts notification submissions and relays them
pub struct Intake {
    dispatcher: Arc<Dispatcher>,
    max_body_bytes: usize,
}

impl Intake {
    /// Create an intake feeding `dispatcher`
    pub fn new(dispatcher: Arc<Dispatcher>, max_body_bytes: usize) -> Self {
        Self {
            dispatcher,
            max_body_bytes,
        }
    }

    /// Read, validate and broadcast one submission
    ///
    /// Returns once the broadcast pass has completed. Success means the
    /// broadcast was attempted, not that any client received it.
    pub async fn submit(&self, req: &mut Request) -> Result<BroadcastReport, IntakeError> {
        let body = req.body_bytes(self.max_body_bytes).await.map_err(|err| {
            warn!(error = %err, "Notification body could not be read");
            IntakeError::from(err)
        })?;

        self.submit_bytes(&body).await
    }

    /// Validate and broadcast an already collected body
    pub async fn submit_bytes(&self, body: &[u8]) -> Result<BroadcastReport, IntakeError> {
        let canonical = canonicalize(body).map_err(|err| {
            warn!(error = %err, "Rejected malformed notification");
            err
        })?;

        let report = self.dispatcher.broadcast(&canonical).await;
        debug!(
            payload = %canonical,
            delivered = report.delivered,
            failed = report.failed,
            "Notification relayed"
        );
        Ok(report)
    }
}
