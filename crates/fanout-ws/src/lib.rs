//! # fanout-ws
//!
//! WebSocket support for the fanout relay.
//!
//! Validates upgrade requests, computes the `Sec-WebSocket-Accept` key,
//! answers `101 Switching Protocols` and hands the upgraded connection to a
//! callback as a [`WebSocketStream`]. The stream splits into a
//! [`WebSocketSender`] and a [`WebSocketReceiver`] so writes and reads can
//! live on different tasks.

// WebSocket errors include tungstenite errors which are large
#![allow(clippy::result_large_err)]
#![warn(missing_docs)]

mod error;
mod extractor;
mod message;
mod socket;
mod upgrade;

pub use error::WebSocketError;
pub use extractor::WebSocket;
pub use message::{CloseFrame, Message};
pub use socket::{WebSocketReceiver, WebSocketSender, WebSocketStream};
pub use upgrade::WebSocketUpgrade;
