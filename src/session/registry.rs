//! Authoritative record of connected users and their channels.
//!
//! [`SessionRegistry`] maps user identifiers to [`Session`]s behind a
//! single [`tokio::sync::RwLock`]. A session lives exactly as long as at
//! least one of its channel handles is present.

use std::collections::HashMap;

use serde::Serialize;
use tokio::sync::RwLock;
use utoipa::ToSchema;

use super::{Channel, ConnectionId};

/// One user's session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    /// User-supplied identifier (the registry key).
    pub id: String,
    /// Registration order, assigned once when the session is created.
    pub ordinal: u64,
    /// Connection attached as the binary channel.
    pub binary: Option<ConnectionId>,
    /// Connection attached as the text channel.
    pub text: Option<ConnectionId>,
}

impl Session {
    /// Handle attached on `channel`, if any.
    #[must_use]
    pub const fn channel(&self, channel: Channel) -> Option<ConnectionId> {
        match channel {
            Channel::Binary => self.binary,
            Channel::Text => self.text,
        }
    }

    /// Returns `true` once both channels are attached.
    #[must_use]
    pub const fn is_complete(&self) -> bool {
        self.binary.is_some() && self.text.is_some()
    }

    /// Channels currently attached, binary first.
    #[must_use]
    pub fn attached_channels(&self) -> Vec<Channel> {
        [Channel::Binary, Channel::Text]
            .into_iter()
            .filter(|c| self.channel(*c).is_some())
            .collect()
    }

    fn slot_mut(&mut self, channel: Channel) -> &mut Option<ConnectionId> {
        match channel {
            Channel::Binary => &mut self.binary,
            Channel::Text => &mut self.text,
        }
    }

    fn is_detached(&self) -> bool {
        self.binary.is_none() && self.text.is_none()
    }
}

/// Entry of the connected-users listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct UserSummary {
    /// Registration order of the session.
    pub ordinal: u64,
    /// User identifier.
    pub uuid: String,
    /// Channels currently attached.
    pub channels: Vec<Channel>,
}

impl From<&Session> for UserSummary {
    fn from(session: &Session) -> Self {
        Self {
            ordinal: session.ordinal,
            uuid: session.id.clone(),
            channels: session.attached_channels(),
        }
    }
}

/// Result of [`SessionRegistry::join`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JoinOutcome {
    /// Ordinal of the (possibly new) session.
    pub ordinal: u64,
    /// Whether this join created the session.
    pub created: bool,
    /// Handle previously attached on the same channel, if it was replaced
    /// by a different connection.
    pub replaced: Option<ConnectionId>,
}

#[derive(Debug, Default)]
struct Inner {
    sessions: HashMap<String, Session>,
    next_ordinal: u64,
}

/// Registry of live sessions, shared by every connection.
///
/// # Concurrency
///
/// All mutation happens under the write lock, so a join and a detach never
/// interleave halfway. The registry holds no global state; each server
/// (or test) owns its own instance.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    inner: RwLock<Inner>,
}

impl SessionRegistry {
    /// Creates an empty registry. The first session gets ordinal 0.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Attaches `handle` as `channel` of the session `id`.
    ///
    /// An unknown `id` creates the session with the next ordinal. A known
    /// one only has the named channel set or overwritten; the other channel
    /// is untouched. Repeating the same join is a no-op.
    pub async fn join(&self, id: &str, channel: Channel, handle: ConnectionId) -> JoinOutcome {
        let mut inner = self.inner.write().await;
        let Inner {
            sessions,
            next_ordinal,
        } = &mut *inner;

        if let Some(session) = sessions.get_mut(id) {
            let previous = session.slot_mut(channel).replace(handle);
            return JoinOutcome {
                ordinal: session.ordinal,
                created: false,
                replaced: previous.filter(|p| *p != handle),
            };
        }

        let ordinal = *next_ordinal;
        *next_ordinal = next_ordinal.saturating_add(1);
        let mut session = Session {
            id: id.to_string(),
            ordinal,
            binary: None,
            text: None,
        };
        *session.slot_mut(channel) = Some(handle);
        sessions.insert(id.to_string(), session);
        JoinOutcome {
            ordinal,
            created: true,
            replaced: None,
        }
    }

    /// Clears every channel that references `handle` and erases sessions
    /// left with no channel. Returns the erased user identifiers.
    ///
    /// Calling it again for the same handle is a no-op.
    pub async fn detach(&self, handle: ConnectionId) -> Vec<String> {
        let mut inner = self.inner.write().await;
        let mut erased = Vec::new();
        inner.sessions.retain(|id, session| {
            let mut touched = false;
            for channel in [Channel::Binary, Channel::Text] {
                let slot = session.slot_mut(channel);
                if *slot == Some(handle) {
                    *slot = None;
                    touched = true;
                }
            }
            if touched && session.is_detached() {
                erased.push(id.clone());
                return false;
            }
            true
        });
        erased
    }

    /// Snapshot of all sessions ordered by ordinal.
    pub async fn list_all(&self) -> Vec<UserSummary> {
        let inner = self.inner.read().await;
        let mut users: Vec<UserSummary> = inner.sessions.values().map(UserSummary::from).collect();
        users.sort_by_key(|u| u.ordinal);
        users
    }

    /// Returns a copy of the session for `id`.
    pub async fn get(&self, id: &str) -> Option<Session> {
        self.inner.read().await.sessions.get(id).cloned()
    }

    /// Returns the number of sessions.
    pub async fn len(&self) -> usize {
        self.inner.read().await.sessions.len()
    }

    /// Returns `true` if no session exists.
    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.sessions.is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn both_channels_share_one_session() {
        let registry = SessionRegistry::new();
        let bin = ConnectionId::new();
        let txt = ConnectionId::new();

        let first = registry.join("u1", Channel::Binary, bin).await;
        let second = registry.join("u1", Channel::Text, txt).await;

        assert!(first.created);
        assert!(!second.created);
        assert_eq!(first.ordinal, second.ordinal);
        assert_eq!(registry.len().await, 1);

        let Some(session) = registry.get("u1").await else {
            panic!("session must exist");
        };
        assert_eq!(session.binary, Some(bin));
        assert_eq!(session.text, Some(txt));
        assert!(session.is_complete());
    }

    #[tokio::test]
    async fn ordinals_increase_per_new_id() {
        let registry = SessionRegistry::new();
        let a = registry.join("a", Channel::Text, ConnectionId::new()).await;
        let b = registry.join("b", Channel::Binary, ConnectionId::new()).await;
        let a_again = registry.join("a", Channel::Binary, ConnectionId::new()).await;
        let c = registry.join("c", Channel::Text, ConnectionId::new()).await;

        assert_eq!(a.ordinal, 0);
        assert_eq!(b.ordinal, 1);
        assert_eq!(a_again.ordinal, 0);
        assert_eq!(c.ordinal, 2);
    }

    #[tokio::test]
    async fn repeated_join_is_idempotent() {
        let registry = SessionRegistry::new();
        let conn = ConnectionId::new();
        let _ = registry.join("u1", Channel::Binary, conn).await;
        let again = registry.join("u1", Channel::Binary, conn).await;

        assert_eq!(again.replaced, None);
        assert_eq!(registry.len().await, 1);
        assert_eq!(registry.get("u1").await.and_then(|s| s.text), None);
    }

    #[tokio::test]
    async fn rejoin_replaces_only_named_channel() {
        let registry = SessionRegistry::new();
        let old = ConnectionId::new();
        let new = ConnectionId::new();
        let txt = ConnectionId::new();
        let _ = registry.join("u1", Channel::Binary, old).await;
        let _ = registry.join("u1", Channel::Text, txt).await;
        let outcome = registry.join("u1", Channel::Binary, new).await;

        assert_eq!(outcome.replaced, Some(old));
        let Some(session) = registry.get("u1").await else {
            panic!("session must exist");
        };
        assert_eq!(session.binary, Some(new));
        assert_eq!(session.text, Some(txt));

        // the replaced connection closing must not disturb the session
        assert!(registry.detach(old).await.is_empty());
        assert_eq!(registry.get("u1").await.map(|s| s.is_complete()), Some(true));
    }

    #[tokio::test]
    async fn teardown_erases_after_last_channel() {
        let registry = SessionRegistry::new();
        let bin = ConnectionId::new();
        let txt = ConnectionId::new();
        let _ = registry.join("u1", Channel::Binary, bin).await;
        let _ = registry.join("u1", Channel::Text, txt).await;

        assert!(registry.detach(bin).await.is_empty());
        let Some(session) = registry.get("u1").await else {
            panic!("session must survive first detach");
        };
        assert_eq!(session.binary, None);
        assert_eq!(session.text, Some(txt));

        assert_eq!(registry.detach(txt).await, vec!["u1".to_string()]);
        assert!(registry.is_empty().await);
        assert!(registry.detach(txt).await.is_empty());
    }

    #[tokio::test]
    async fn one_connection_can_serve_several_sessions() {
        let registry = SessionRegistry::new();
        let shared = ConnectionId::new();
        let _ = registry.join("a", Channel::Text, shared).await;
        let _ = registry.join("b", Channel::Text, shared).await;

        let mut erased = registry.detach(shared).await;
        erased.sort();
        assert_eq!(erased, vec!["a".to_string(), "b".to_string()]);
    }

    #[tokio::test]
    async fn list_all_is_ordered_by_ordinal() {
        let registry = SessionRegistry::new();
        for id in ["zeta", "alpha", "mid"] {
            let _ = registry.join(id, Channel::Text, ConnectionId::new()).await;
        }
        let users = registry.list_all().await;
        let ids: Vec<&str> = users.iter().map(|u| u.uuid.as_str()).collect();
        assert_eq!(ids, vec!["zeta", "alpha", "mid"]);
        assert_eq!(users.first().map(|u| u.channels.clone()), Some(vec![Channel::Text]));
    }

    #[tokio::test]
    async fn independent_registries_do_not_share_ordinals() {
        let one = SessionRegistry::new();
        let two = SessionRegistry::new();
        let _ = one.join("x", Channel::Text, ConnectionId::new()).await;
        let outcome = two.join("y", Channel::Text, ConnectionId::new()).await;
        assert_eq!(outcome.ordinal, 0);
    }
}
