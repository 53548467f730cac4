//! Backpressure policy and the buffered-byte gauge.
//!
//! [`BackpressurePolicy`] decides whether a frame may enter the transport
//! given how many bytes are already buffered. [`BufferGauge`] tracks those
//! bytes between the connection task (which admits frames) and the writer
//! task (which flushes them to the socket), and raises the drain signal
//! when the buffer falls back under the threshold.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::Notify;

use crate::config::ServerConfig;

/// Decision for one frame offered to the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// Hand the frame to the socket.
    Admit,
    /// Over the soft threshold: keep the frame and wait for drain.
    Backpressure,
    /// Over the hard limit: the send is discarded by the transport.
    Drop,
    /// Over the hard limit with `close_on_limit`: terminate the connection.
    Close,
}

/// Buffering limits for one connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackpressurePolicy {
    /// Buffered bytes at or above which sending pauses.
    pub threshold: usize,
    /// Buffered bytes a send may not push the buffer past.
    pub max_buffered: usize,
    /// Close instead of dropping when `max_buffered` would be exceeded.
    pub close_on_limit: bool,
}

impl BackpressurePolicy {
    /// Builds the policy from the server configuration.
    #[must_use]
    pub const fn from_config(config: &ServerConfig) -> Self {
        Self {
            threshold: config.backpressure_threshold,
            max_buffered: config.max_backpressure,
            close_on_limit: config.close_on_backpressure_limit,
        }
    }

    /// Decides whether a `frame_len`-byte frame may be sent while
    /// `buffered` bytes are still in flight.
    ///
    /// An empty buffer always admits, so a frame larger than either limit
    /// still makes progress.
    #[must_use]
    pub const fn admit(&self, buffered: usize, frame_len: usize) -> Admission {
        if buffered == 0 {
            return Admission::Admit;
        }
        if buffered >= self.threshold {
            return Admission::Backpressure;
        }
        if buffered.saturating_add(frame_len) > self.max_buffered {
            return if self.close_on_limit {
                Admission::Close
            } else {
                Admission::Drop
            };
        }
        Admission::Admit
    }
}

#[derive(Debug)]
struct GaugeInner {
    buffered: AtomicUsize,
    threshold: usize,
    drained: Notify,
}

/// Shared count of bytes handed to the socket but not yet written.
///
/// Cloning shares the same counter.
#[derive(Debug, Clone)]
pub struct BufferGauge {
    inner: Arc<GaugeInner>,
}

impl BufferGauge {
    /// Creates an empty gauge that signals drain below `threshold`.
    #[must_use]
    pub fn new(threshold: usize) -> Self {
        Self {
            inner: Arc::new(GaugeInner {
                buffered: AtomicUsize::new(0),
                threshold,
                drained: Notify::new(),
            }),
        }
    }

    /// Bytes currently buffered.
    #[must_use]
    pub fn buffered(&self) -> usize {
        self.inner.buffered.load(Ordering::Acquire)
    }

    /// Records `n` bytes entering the buffer.
    pub fn add(&self, n: usize) {
        let _ = self.inner.buffered.fetch_add(n, Ordering::AcqRel);
    }

    /// Records `n` bytes leaving the buffer, signalling drain if the buffer
    /// is now below the threshold.
    pub fn release(&self, n: usize) {
        let previous = self
            .inner
            .buffered
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |b| {
                Some(b.saturating_sub(n))
            })
            .unwrap_or(0);
        if previous.saturating_sub(n) < self.inner.threshold {
            self.inner.drained.notify_one();
        }
    }

    /// Signals drain unconditionally, e.g. when the writer stops so a
    /// waiting queue can observe the closed transport.
    pub fn wake(&self) {
        self.inner.drained.notify_one();
    }

    /// Resolves at the next drain signal.
    ///
    /// A signal raised while nobody was waiting is kept, so a drain that
    /// happens between a rejected send and this call is not lost.
    pub async fn drained(&self) {
        self.inner.drained.notified().await;
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    const POLICY: BackpressurePolicy = BackpressurePolicy {
        threshold: 100,
        max_buffered: 150,
        close_on_limit: false,
    };

    #[test]
    fn empty_buffer_always_admits() {
        assert_eq!(POLICY.admit(0, 10_000), Admission::Admit);
    }

    #[test]
    fn threshold_triggers_backpressure() {
        assert_eq!(POLICY.admit(99, 10), Admission::Admit);
        assert_eq!(POLICY.admit(100, 1), Admission::Backpressure);
    }

    #[test]
    fn hard_limit_drops_or_closes() {
        assert_eq!(POLICY.admit(60, 91), Admission::Drop);
        assert_eq!(POLICY.admit(60, 90), Admission::Admit);
        let closing = BackpressurePolicy {
            close_on_limit: true,
            ..POLICY
        };
        assert_eq!(closing.admit(60, 91), Admission::Close);
    }

    #[test]
    fn gauge_tracks_bytes() {
        let gauge = BufferGauge::new(100);
        gauge.add(70);
        gauge.add(50);
        assert_eq!(gauge.buffered(), 120);
        gauge.release(50);
        assert_eq!(gauge.buffered(), 70);
        gauge.release(500);
        assert_eq!(gauge.buffered(), 0);
    }

    #[tokio::test]
    async fn release_below_threshold_signals_drain() {
        let gauge = BufferGauge::new(100);
        gauge.add(150);
        gauge.release(60);

        // a permit stored before anyone waits is kept
        let woke = tokio::time::timeout(Duration::from_millis(100), gauge.drained()).await;
        assert!(woke.is_ok());
    }

    #[tokio::test]
    async fn release_above_threshold_stays_quiet() {
        let gauge = BufferGauge::new(100);
        gauge.add(300);
        gauge.release(100);

        let woke = tokio::time::timeout(Duration::from_millis(20), gauge.drained()).await;
        assert!(woke.is_err());
    }
}
