//! Session layer: user sessions spanning a binary and a text channel.
//!
//! The registry knows nothing about wire formats; it only correlates user
//! identifiers with the connections attached on each channel.

pub mod channel;
pub mod connection_id;
pub mod registry;

pub use channel::Channel;
pub use connection_id::ConnectionId;
pub use registry::{JoinOutcome, Session, SessionRegistry, UserSummary};
