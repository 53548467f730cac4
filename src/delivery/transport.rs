//! Transport seam between the send queue and the WebSocket.
//!
//! The queue only sees the [`Transport`] trait. [`WsTransport`] is the real
//! implementation: it applies the [`BackpressurePolicy`] against a shared
//! [`BufferGauge`] and hands admitted frames to the connection's writer
//! task ([`run_writer`]), which owns the socket sink.

use axum::extract::ws::Message;
use bytes::Bytes;
use futures_util::{Sink, SinkExt};
use tokio::sync::mpsc;

use super::backpressure::{Admission, BackpressurePolicy, BufferGauge};

/// Result of offering one frame to a transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    /// The transport took the frame.
    Accepted,
    /// The transport is over its buffering threshold; retry after drain.
    Backpressure,
    /// The transport discarded the send; retry after drain.
    Dropped,
    /// The connection is gone.
    Closed,
}

/// Where the send queue and the dispatcher push outbound data.
pub trait Transport: Send {
    /// Offers one binary frame. On anything but
    /// [`SendOutcome::Accepted`] the caller still owns the frame.
    fn try_send(&mut self, frame: &Bytes) -> SendOutcome;

    /// Sends a text frame. Text is small and bypasses backpressure.
    fn send_text(&mut self, text: String) -> SendOutcome;

    /// Binary bytes handed over but not yet written to the peer.
    fn buffered_amount(&self) -> usize;
}

/// Message from a connection task to its writer task.
#[derive(Debug)]
pub enum Outgoing {
    /// A binary frame whose length is tracked by the gauge.
    Binary(Bytes),
    /// A text frame.
    Text(String),
    /// Close the socket and stop writing.
    Close,
}

/// [`Transport`] over a WebSocket writer task.
#[derive(Debug)]
pub struct WsTransport {
    tx: mpsc::UnboundedSender<Outgoing>,
    gauge: BufferGauge,
    policy: BackpressurePolicy,
}

impl WsTransport {
    /// Creates the transport and the receiving end for [`run_writer`].
    #[must_use]
    pub fn new(policy: BackpressurePolicy) -> (Self, mpsc::UnboundedReceiver<Outgoing>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let transport = Self {
            tx,
            gauge: BufferGauge::new(policy.threshold),
            policy,
        };
        (transport, rx)
    }

    /// The gauge shared with the writer task.
    #[must_use]
    pub fn gauge(&self) -> &BufferGauge {
        &self.gauge
    }
}

impl Transport for WsTransport {
    fn try_send(&mut self, frame: &Bytes) -> SendOutcome {
        if self.tx.is_closed() {
            return SendOutcome::Closed;
        }
        match self.policy.admit(self.gauge.buffered(), frame.len()) {
            Admission::Admit => {
                self.gauge.add(frame.len());
                if self.tx.send(Outgoing::Binary(frame.clone())).is_err() {
                    self.gauge.release(frame.len());
                    return SendOutcome::Closed;
                }
                SendOutcome::Accepted
            }
            Admission::Backpressure => SendOutcome::Backpressure,
            Admission::Drop => SendOutcome::Dropped,
            Admission::Close => {
                tracing::warn!(
                    buffered = self.gauge.buffered(),
                    max = self.policy.max_buffered,
                    "backpressure limit exceeded, closing connection"
                );
                let _ = self.tx.send(Outgoing::Close);
                SendOutcome::Closed
            }
        }
    }

    fn send_text(&mut self, text: String) -> SendOutcome {
        match self.tx.send(Outgoing::Text(text)) {
            Ok(()) => SendOutcome::Accepted,
            Err(_) => SendOutcome::Closed,
        }
    }

    fn buffered_amount(&self) -> usize {
        self.gauge.buffered()
    }
}

/// Writes queued [`Outgoing`] messages to `sink` until the channel closes,
/// a write fails, or a close is requested.
///
/// Every written binary frame is released from `gauge`, which raises the
/// drain signal for the connection task.
pub async fn run_writer<S>(
    mut sink: S,
    mut rx: mpsc::UnboundedReceiver<Outgoing>,
    gauge: BufferGauge,
) where
    S: Sink<Message> + Unpin,
    S::Error: std::fmt::Display,
{
    while let Some(outgoing) = rx.recv().await {
        let result = match outgoing {
            Outgoing::Binary(bytes) => {
                let len = bytes.len();
                let result = sink.send(Message::Binary(bytes)).await;
                gauge.release(len);
                tracing::trace!(remaining = gauge.buffered(), "binary frame written");
                result
            }
            Outgoing::Text(text) => sink.send(Message::text(text)).await,
            Outgoing::Close => {
                let _ = sink.send(Message::Close(None)).await;
                break;
            }
        };
        if let Err(e) = result {
            tracing::debug!(error = %e, "ws write failed");
            break;
        }
    }
    rx.close();
    gauge.wake();
}
