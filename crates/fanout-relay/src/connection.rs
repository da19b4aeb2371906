//! Connection abstraction held by the registry

use async_trait::async_trait;
use fanout_ws::{Message, WebSocketError, WebSocketSender};
use std::fmt;

/// Process-unique handle for a registered connection
///
/// Handles are allocated by the registry and never reused, so a late
/// deregistration can never remove a newer connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(pub(crate) u64);

impl ConnectionId {
    /// Raw numeric value
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// The write side of one client's duplex channel
#[async_trait]
pub trait Connection: Send {
    /// Write one text payload
    async fn send_text(&mut self, payload: &str) -> Result<(), WebSocketError>;

    /// Release the underlying resource. Best effort; errors are swallowed.
    async fn close(&mut self);
}

#[async_trait]
impl Connection for WebSocketSender {
    async fn send_text(&mut self, payload: &str) -> Result<(), WebSocketError> {
        self.send(Message::text(payload)).await
    }

    async fn close(&mut self) {
        if let Err(err) = WebSocketSender::close(self).await {
            tracing::trace!(error = %err, "Close frame not delivered");
        }
    }
}

#[cfg(test)]
pub(crate) mod mock {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::{Arc, Mutex};

    /// Shared view into a [`MockConnection`] after it has been boxed
    #[derive(Clone, Default)]
    pub(crate) struct Recorder {
        received: Arc<Mutex<Vec<String>>>,
        closed: Arc<AtomicBool>,
        failing: Arc<AtomicBool>,
    }

    impl Recorder {
        pub(crate) fn received(&self) -> Vec<String> {
            self.received.lock().unwrap().clone()
        }

        pub(crate) fn is_closed(&self) -> bool {
            self.closed.load(Ordering::SeqCst)
        }

        pub(crate) fn fail_writes(&self) {
            self.failing.store(true, Ordering::SeqCst);
        }
    }

    /// In-memory connection that records writes
    pub(crate) struct MockConnection {
        recorder: Recorder,
    }

    impl MockConnection {
        pub(crate) fn new() -> (Box<dyn Connection>, Recorder) {
            let recorder = Recorder::default();
            (Box::new(Self { recorder: recorder.clone() }), recorder)
        }

        pub(crate) fn failing() -> (Box<dyn Connection>, Recorder) {
            let (conn, recorder) = Self::new();
            recorder.fail_writes();
            (conn, recorder)
        }
    }

    #[async_trait]
    impl Connection for MockConnection {
        async fn send_text(&mut self, payload: &str) -> Result<(), WebSocketError> {
            if self.recorder.failing.load(Ordering::SeqCst) || self.recorder.is_closed() {
                return Err(WebSocketError::ConnectionClosed);
            }
            self.recorder.received.lock().unwrap().push(payload.to_string());
            Ok(())
        }

        async fn close(&mut self) {
            self.recorder.closed.store(true, Ordering::SeqCst);
        }
    }
}
