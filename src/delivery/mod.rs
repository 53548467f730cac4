//! Delivery layer: chunked send queue, backpressure control and the
//! transport seam.
//!
//! Frames flow `SendQueue` → [`Transport`] → writer task → socket. The
//! queue advances only on acceptance and pauses in
//! [`QueueState::Waiting`] until the [`BufferGauge`] signals drain.

pub mod backpressure;
pub mod connection_state;
pub mod queue;
pub mod transport;

pub use backpressure::{Admission, BackpressurePolicy, BufferGauge};
pub use connection_state::ConnectionState;
pub use queue::{QueueState, QueuedFrame, SendQueue};
pub use transport::{Outgoing, SendOutcome, Transport, WsTransport, run_writer};
