//! WebSocket stream implementation

use crate::{Message, WebSocketError};
use futures_util::{
    stream::{SplitSink, SplitStream},
    SinkExt, Stream, StreamExt,
};
use hyper::upgrade::Upgraded;
use hyper_util::rt::TokioIo;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio_tungstenite::WebSocketStream as TungsteniteStream;

/// Type alias for the upgraded connection
type UpgradedConnection = TungsteniteStream<TokioIo<Upgraded>>;

/// An upgraded server-side WebSocket
pub struct WebSocketStream {
    inner: UpgradedConnection,
}

impl WebSocketStream {
    pub(crate) fn new(inner: UpgradedConnection) -> Self {
        Self { inner }
    }

    /// Split the stream into sender and receiver halves
    ///
    /// The halves can be moved to different tasks; the sender is what the
    /// relay keeps in its registry while the receiver drives liveness.
    pub fn split(self) -> (WebSocketSender, WebSocketReceiver) {
        let (sink, stream) = self.inner.split();
        (
            WebSocketSender { inner: sink },
            WebSocketReceiver { inner: stream },
        )
    }
}

/// Sender half of a WebSocket stream
pub struct WebSocketSender {
    inner: SplitSink<UpgradedConnection, tungstenite::Message>,
}

impl WebSocketSender {
    /// Send a message
    pub async fn send(&mut self, msg: Message) -> Result<(), WebSocketError> {
        self.inner.send(msg.into()).await.map_err(WebSocketError::from)
    }

    /// Send a close frame and flush the sink
    pub async fn close(&mut self) -> Result<(), WebSocketError> {
        self.inner.close().await.map_err(WebSocketError::from)
    }
}

/// Receiver half of a WebSocket stream
///
/// Yields `None` once the peer has closed the stream.
pub struct WebSocketReceiver {
    inner: SplitStream<UpgradedConnection>,
}

impl Stream for WebSocketReceiver {
    type Item = Result<Message, WebSocketError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        match Pin::new(&mut self.inner).poll_next(cx) {
            Poll::Ready(Some(Ok(msg))) => Poll::Ready(Some(Ok(Message::from(msg)))),
            Poll::Ready(Some(Err(e))) => Poll::Ready(Some(Err(WebSocketError::from(e)))),
            Poll::Ready(None) => Poll::Ready(None),
            Poll::Pending => Poll::Pending,
        }
    }
}
