//! State owned by exactly one live connection.

use super::queue::SendQueue;
use crate::session::{Channel, ConnectionId};

/// Per-connection delivery state: the outbound queue and the message id
/// counter.
///
/// Owned by the connection task and dropped with it, taking any
/// undelivered frames along.
#[derive(Debug)]
pub struct ConnectionState {
    id: ConnectionId,
    endpoint: Channel,
    next_message_id: u32,
    /// Outbound frames for this connection.
    pub queue: SendQueue,
}

impl ConnectionState {
    /// Creates the state for a connection opened on `endpoint`.
    #[must_use]
    pub fn new(id: ConnectionId, endpoint: Channel) -> Self {
        Self {
            id,
            endpoint,
            next_message_id: 0,
            queue: SendQueue::new(id),
        }
    }

    /// Handle of the connection.
    #[must_use]
    pub const fn id(&self) -> ConnectionId {
        self.id
    }

    /// Endpoint the connection was opened on.
    #[must_use]
    pub const fn endpoint(&self) -> Channel {
        self.endpoint
    }

    /// Returns the id for the next chunked message and advances the
    /// counter.
    pub fn allocate_message_id(&mut self) -> u32 {
        let id = self.next_message_id;
        self.next_message_id = self.next_message_id.wrapping_add(1);
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_ids_increase_per_connection() {
        let mut a = ConnectionState::new(ConnectionId::new(), Channel::Binary);
        let mut b = ConnectionState::new(ConnectionId::new(), Channel::Binary);

        assert_eq!(a.allocate_message_id(), 0);
        assert_eq!(a.allocate_message_id(), 1);
        assert_eq!(b.allocate_message_id(), 0);
        assert_eq!(a.allocate_message_id(), 2);
    }
}
