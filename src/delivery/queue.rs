//! Per-connection FIFO of encoded frames and its delivery state machine.
//!
//! ```text
//!            enqueue                 Backpressure / Dropped
//!   Idle ─────────────▶ Sending ─────────────────────────▶ Waiting
//!    ▲                   │  ▲                                  │
//!    └── queue empty ────┘  └──────────── on_drain ────────────┘
//!
//!   any state ── on_close ──▶ Closed (queue discarded)
//! ```
//!
//! The queue never recurses: [`SendQueue::step`] attempts exactly one frame
//! and [`SendQueue::flush`] loops over `step`. The connection task calls
//! `step` once per event-loop turn so other connections interleave.

use std::collections::VecDeque;

use bytes::Bytes;

use super::transport::{SendOutcome, Transport};
use crate::session::ConnectionId;

/// Delivery state of a [`SendQueue`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueState {
    /// Nothing pending.
    Idle,
    /// Pushing the head frame into the transport.
    Sending,
    /// The transport refused the head frame; waiting for drain.
    Waiting,
    /// The connection is gone. Terminal.
    Closed,
}

/// An encoded frame awaiting transmission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueuedFrame {
    /// Connection the frame is addressed to.
    pub connection: ConnectionId,
    /// Header and payload, ready for the transport.
    pub bytes: Bytes,
}

/// Ordered outbound buffer for one connection.
#[derive(Debug)]
pub struct SendQueue {
    connection: ConnectionId,
    frames: VecDeque<QueuedFrame>,
    queued_bytes: usize,
    state: QueueState,
}

impl SendQueue {
    /// Creates an idle, empty queue for `connection`.
    #[must_use]
    pub fn new(connection: ConnectionId) -> Self {
        Self {
            connection,
            frames: VecDeque::new(),
            queued_bytes: 0,
            state: QueueState::Idle,
        }
    }

    /// Current state.
    #[must_use]
    pub const fn state(&self) -> QueueState {
        self.state
    }

    /// Number of frames still queued.
    #[must_use]
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// Returns `true` if no frame is queued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Total bytes of the queued frames.
    #[must_use]
    pub const fn queued_bytes(&self) -> usize {
        self.queued_bytes
    }

    /// The frame that will be offered next.
    #[must_use]
    pub fn head(&self) -> Option<&QueuedFrame> {
        self.frames.front()
    }

    /// Appends a frame at the tail. An idle queue starts sending; the
    /// caller drives transmission with [`SendQueue::step`].
    ///
    /// Returns `false` and drops the frame once the queue is closed.
    pub fn enqueue(&mut self, bytes: Bytes) -> bool {
        if self.state == QueueState::Closed {
            return false;
        }
        self.queued_bytes = self.queued_bytes.saturating_add(bytes.len());
        self.frames.push_back(QueuedFrame {
            connection: self.connection,
            bytes,
        });
        if self.state == QueueState::Idle {
            self.state = QueueState::Sending;
        }
        true
    }

    /// Appends frames in iteration order. Returns how many were queued.
    pub fn enqueue_all(&mut self, frames: impl IntoIterator<Item = Bytes>) -> usize {
        let mut queued = 0;
        for bytes in frames {
            if !self.enqueue(bytes) {
                break;
            }
            queued += 1;
        }
        queued
    }

    /// Offers the head frame to `transport` once.
    ///
    /// Only acts while [`QueueState::Sending`]; the head frame is popped
    /// only when the transport accepts it.
    pub fn step(&mut self, transport: &mut dyn Transport) -> QueueState {
        if self.state != QueueState::Sending {
            return self.state;
        }
        let Some(head) = self.frames.front() else {
            self.state = QueueState::Idle;
            return self.state;
        };

        match transport.try_send(&head.bytes) {
            SendOutcome::Accepted => {
                if let Some(sent) = self.frames.pop_front() {
                    self.queued_bytes = self.queued_bytes.saturating_sub(sent.bytes.len());
                }
                if self.frames.is_empty() {
                    self.state = QueueState::Idle;
                }
            }
            SendOutcome::Backpressure => {
                tracing::debug!(
                    conn_id = %self.connection,
                    buffered = transport.buffered_amount(),
                    pending = self.frames.len(),
                    "backpressure, waiting for drain"
                );
                self.state = QueueState::Waiting;
            }
            SendOutcome::Dropped => {
                tracing::debug!(conn_id = %self.connection, "send dropped by transport");
                self.on_dropped();
            }
            SendOutcome::Closed => {
                self.on_close();
            }
        }
        self.state
    }

    /// Steps until the queue leaves [`QueueState::Sending`].
    pub fn flush(&mut self, transport: &mut dyn Transport) -> QueueState {
        while self.state == QueueState::Sending {
            self.step(transport);
        }
        self.state
    }

    /// Transport drain signal: a waiting queue with frames resumes sending.
    pub fn on_drain(&mut self) -> QueueState {
        if self.state == QueueState::Waiting && !self.frames.is_empty() {
            self.state = QueueState::Sending;
        }
        self.state
    }

    /// Transport dropped signal: keep the head frame and wait for drain.
    pub fn on_dropped(&mut self) -> QueueState {
        if self.state != QueueState::Closed {
            self.state = QueueState::Waiting;
        }
        self.state
    }

    /// Connection closed: discard every queued frame. Returns how many
    /// frames were discarded.
    pub fn on_close(&mut self) -> usize {
        let discarded = self.frames.len();
        self.frames.clear();
        self.queued_bytes = 0;
        self.state = QueueState::Closed;
        discarded
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use std::collections::VecDeque;

    use super::*;
    use crate::codec::{decode_chunk, split_payload};

    /// Transport that replays scripted outcomes, accepting once the script
    /// is exhausted, and records every accepted frame.
    #[derive(Debug, Default)]
    struct ScriptedTransport {
        script: VecDeque<SendOutcome>,
        delivered: Vec<Bytes>,
        attempts: usize,
    }

    impl ScriptedTransport {
        fn with_script(script: impl IntoIterator<Item = SendOutcome>) -> Self {
            Self {
                script: script.into_iter().collect(),
                ..Self::default()
            }
        }
    }

    impl Transport for ScriptedTransport {
        fn try_send(&mut self, frame: &Bytes) -> SendOutcome {
            self.attempts += 1;
            let outcome = self.script.pop_front().unwrap_or(SendOutcome::Accepted);
            if outcome == SendOutcome::Accepted {
                self.delivered.push(frame.clone());
            }
            outcome
        }

        fn send_text(&mut self, _text: String) -> SendOutcome {
            SendOutcome::Accepted
        }

        fn buffered_amount(&self) -> usize {
            0
        }
    }

    fn frames(n: u8) -> Vec<Bytes> {
        (0..n).map(|i| Bytes::from(vec![i; 3])).collect()
    }

    #[test]
    fn enqueue_moves_idle_to_sending() {
        let mut queue = SendQueue::new(ConnectionId::new());
        assert_eq!(queue.state(), QueueState::Idle);
        assert!(queue.enqueue(Bytes::from_static(b"a")));
        assert_eq!(queue.state(), QueueState::Sending);
        assert_eq!(queue.queued_bytes(), 1);
    }

    #[test]
    fn queued_frames_belong_to_the_connection() {
        let conn = ConnectionId::new();
        let mut queue = SendQueue::new(conn);
        let _ = queue.enqueue(Bytes::from_static(b"a"));
        assert_eq!(queue.head().map(|f| f.connection), Some(conn));
    }

    #[test]
    fn flush_delivers_in_order_and_idles() {
        let mut queue = SendQueue::new(ConnectionId::new());
        let mut transport = ScriptedTransport::default();
        assert_eq!(queue.enqueue_all(frames(4)), 4);

        assert_eq!(queue.flush(&mut transport), QueueState::Idle);
        assert_eq!(transport.delivered, frames(4));
        assert!(queue.is_empty());
        assert_eq!(queue.queued_bytes(), 0);
    }

    #[test]
    fn step_attempts_one_frame() {
        let mut queue = SendQueue::new(ConnectionId::new());
        let mut transport = ScriptedTransport::default();
        let _ = queue.enqueue_all(frames(3));

        assert_eq!(queue.step(&mut transport), QueueState::Sending);
        assert_eq!(transport.attempts, 1);
        assert_eq!(queue.len(), 2);
    }

    #[test]
    fn backpressure_keeps_head_until_drain() {
        let mut queue = SendQueue::new(ConnectionId::new());
        let mut transport = ScriptedTransport::with_script([SendOutcome::Backpressure]);
        let _ = queue.enqueue_all(frames(2));

        assert_eq!(queue.flush(&mut transport), QueueState::Waiting);
        assert_eq!(queue.len(), 2);
        assert_eq!(queue.head().map(|f| f.bytes.clone()), frames(1).pop());

        // stepping while waiting does nothing
        assert_eq!(queue.step(&mut transport), QueueState::Waiting);
        assert_eq!(transport.attempts, 1);

        assert_eq!(queue.on_drain(), QueueState::Sending);
        assert_eq!(queue.flush(&mut transport), QueueState::Idle);
        assert_eq!(transport.delivered, frames(2));
    }

    #[test]
    fn dropped_send_is_retried_after_drain() {
        let mut queue = SendQueue::new(ConnectionId::new());
        let mut transport = ScriptedTransport::with_script([SendOutcome::Dropped]);
        let _ = queue.enqueue(Bytes::from_static(b"only"));

        assert_eq!(queue.flush(&mut transport), QueueState::Waiting);
        assert_eq!(queue.len(), 1);
        let _ = queue.on_drain();
        let _ = queue.flush(&mut transport);
        assert_eq!(transport.delivered, vec![Bytes::from_static(b"only")]);
    }

    #[test]
    fn drain_without_waiting_is_a_no_op() {
        let mut queue = SendQueue::new(ConnectionId::new());
        assert_eq!(queue.on_drain(), QueueState::Idle);
        let _ = queue.enqueue(Bytes::from_static(b"x"));
        assert_eq!(queue.on_drain(), QueueState::Sending);
    }

    #[test]
    fn close_discards_everything_and_is_terminal() {
        let mut queue = SendQueue::new(ConnectionId::new());
        let mut transport = ScriptedTransport::with_script([SendOutcome::Backpressure]);
        let _ = queue.enqueue_all(frames(5));
        let _ = queue.flush(&mut transport);

        assert_eq!(queue.on_close(), 5);
        assert_eq!(queue.state(), QueueState::Closed);
        assert!(!queue.enqueue(Bytes::from_static(b"late")));
        assert_eq!(queue.on_drain(), QueueState::Closed);
        assert_eq!(queue.on_dropped(), QueueState::Closed);
        assert_eq!(queue.step(&mut transport), QueueState::Closed);
        assert!(queue.is_empty());
    }

    #[test]
    fn transport_close_closes_queue() {
        let mut queue = SendQueue::new(ConnectionId::new());
        let mut transport = ScriptedTransport::with_script([SendOutcome::Accepted, SendOutcome::Closed]);
        let _ = queue.enqueue_all(frames(3));

        assert_eq!(queue.flush(&mut transport), QueueState::Closed);
        assert_eq!(transport.delivered.len(), 1);
        assert!(queue.is_empty());
    }

    #[test]
    fn backpressure_delays_but_never_reorders() {
        let payload: Vec<u8> = (0..10_000u32).map(|i| (i % 253) as u8).collect();
        let Ok(chunks) = split_payload(1, &payload, 512) else {
            panic!("split failed");
        };

        let mut baseline = ScriptedTransport::default();
        let mut queue = SendQueue::new(ConnectionId::new());
        let _ = queue.enqueue_all(chunks.clone());
        let _ = queue.flush(&mut baseline);

        // reject every other attempt, alternating backpressure and drops
        let script = (0..chunks.len()).flat_map(|i| {
            let refusal = if i % 2 == 0 {
                SendOutcome::Backpressure
            } else {
                SendOutcome::Dropped
            };
            [refusal, SendOutcome::Accepted]
        });
        let mut throttled = ScriptedTransport::with_script(script);
        let mut queue = SendQueue::new(ConnectionId::new());
        let _ = queue.enqueue_all(chunks);
        let mut drains = 0;
        while queue.flush(&mut throttled) == QueueState::Waiting {
            let _ = queue.on_drain();
            drains += 1;
        }

        assert!(drains > 0);
        assert_eq!(throttled.delivered, baseline.delivered);
        let reassembled: Vec<u8> = throttled
            .delivered
            .into_iter()
            .flat_map(|raw| {
                let Ok(chunk) = decode_chunk(raw) else {
                    panic!("chunk decodes");
                };
                chunk.payload.to_vec()
            })
            .collect();
        assert_eq!(reassembled, payload);
    }

    #[test]
    fn deep_queue_drains_iteratively() {
        let mut queue = SendQueue::new(ConnectionId::new());
        let mut transport = ScriptedTransport::default();
        let count = queue.enqueue_all((0..200_000u32).map(|i| Bytes::from(i.to_le_bytes().to_vec())));

        assert_eq!(count, 200_000);
        assert_eq!(queue.flush(&mut transport), QueueState::Idle);
        assert_eq!(transport.delivered.len(), 200_000);
    }
}
