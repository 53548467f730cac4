//! WebSocket layer: connection handling and control message routing.
//!
//! Two endpoints, `/binary` and `/text`, accept the same control messages.
//! The endpoint only labels the connection in logs; the `channel` field of
//! a `join` decides which session slot it fills.

pub mod connection;
pub mod dispatch;
pub mod handler;

pub use dispatch::{DispatchOutcome, Dispatcher};
