//! Per-connection handler
//!
//! `ACCEPTED -> REGISTERED -> (READING)* -> CLOSED`. After the upgrade the
//! write half goes into the registry and the read half is drained until the
//! peer closes or the transport errors. Inbound messages are discarded; the
//! reads only detect liveness. There is no idle timeout.

use crate::connection::{Connection, ConnectionId};
use crate::registry::Registry;
use fanout_ws::{Message, WebSocketError, WebSocketStream};
use futures_util::{Stream, StreamExt};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Why a connection's read loop ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CloseReason {
    /// The peer sent a close frame or ended the stream
    PeerClosed,
    /// Reading from the transport failed
    ReadFailure(String),
}

/// Run the lifecycle of one upgraded WebSocket
pub async fn serve_socket(registry: Arc<Registry>, socket: WebSocketStream) {
    let (sender, receiver) = socket.split();
    run_connection(registry, Box::new(sender), receiver).await;
}

/// Register `conn`, drain `incoming` until it ends, then deregister
///
/// Deregistration is idempotent, so it is safe when a failed broadcast
/// already removed the connection.
pub async fn run_connection<S>(
    registry: Arc<Registry>,
    conn: Box<dyn Connection>,
    incoming: S,
) -> (ConnectionId, CloseReason)
where
    S: Stream<Item = Result<Message, WebSocketError>> + Unpin,
{
    let id = registry.register(conn).await;
    info!(connection = %id, "Client connected");

    let reason = drain(id, incoming).await;

    let was_registered = registry.deregister(id).await;
    match &reason {
        CloseReason::PeerClosed => {
            info!(connection = %id, was_registered, "Client disconnected")
        }
        CloseReason::ReadFailure(err) => {
            warn!(connection = %id, was_registered, error = %err, "Client dropped after read error")
        }
    }

    (id, reason)
}

async fn drain<S>(id: ConnectionId, mut incoming: S) -> CloseReason
where
    S: Stream<Item = Result<Message, WebSocketError>> + Unpin,
{
    loop {
        match incoming.next().await {
            Some(Ok(Message::Close(frame))) => {
                debug!(connection = %id, ?frame, "Close frame received");
                return CloseReason::PeerClosed;
            }
            Some(Ok(_)) => {
                debug!(connection = %id, "Discarding inbound message");
            }
            Some(Err(err)) if err.is_disconnect() => return CloseReason::PeerClosed,
            Some(Err(err)) => return CloseReason::ReadFailure(err.to_string()),
            None => return CloseReason::PeerClosed,
        }
    }
}
