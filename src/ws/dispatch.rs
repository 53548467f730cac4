//! Control message routing.
//!
//! [`Dispatcher::dispatch`] turns one inbound text frame into its effect:
//! a registry join, queued point cloud frames, a chat echo, or a users
//! dump. Malformed input is logged and ignored; the connection stays
//! open.

use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::codec::{ControlMessage, encode_snapshot, split_payload};
use crate::config::{DeliveryMode, ServerConfig};
use crate::delivery::{ConnectionState, SendOutcome, Transport};
use crate::generator::PayloadGenerator;
use crate::session::{Channel, SessionRegistry, UserSummary};

/// Effect of one dispatched message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// The connection was attached to a session.
    Joined {
        /// User identifier.
        uuid: String,
        /// Channel the connection was attached as.
        channel: Channel,
        /// Ordinal of the session.
        ordinal: u64,
        /// Whether the join created the session.
        created: bool,
    },
    /// Point cloud frames were queued.
    Queued {
        /// Message id shared by the chunks; `None` for a snapshot frame.
        message_id: Option<u32>,
        /// Number of frames queued.
        frames: usize,
        /// Size of the encoded point cloud.
        payload_len: usize,
    },
    /// The chat message was echoed to the sender.
    ChatEchoed,
    /// The connected users were logged.
    UsersListed(Vec<UserSummary>),
    /// Nothing happened.
    Ignored,
}

/// Routes control messages for every connection.
///
/// Cheap to clone; all clones share the registry and generator.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    registry: Arc<SessionRegistry>,
    generator: Arc<dyn PayloadGenerator>,
    delivery_mode: DeliveryMode,
    chunk_size: usize,
}

impl Dispatcher {
    /// Creates a dispatcher over `registry` using `generator` for requests.
    #[must_use]
    pub fn new(
        registry: Arc<SessionRegistry>,
        generator: Arc<dyn PayloadGenerator>,
        config: &ServerConfig,
    ) -> Self {
        Self {
            registry,
            generator,
            delivery_mode: config.delivery_mode,
            chunk_size: config.chunk_size,
        }
    }

    /// The session registry the dispatcher mutates.
    #[must_use]
    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.registry
    }

    /// Handles one inbound text frame from the connection owning `conn`.
    ///
    /// Binary replies are only queued on `conn`; the caller drives the
    /// queue. Chat replies go straight to `transport`.
    pub async fn dispatch(
        &self,
        conn: &mut ConnectionState,
        transport: &mut dyn Transport,
        text: &str,
    ) -> DispatchOutcome {
        let message = match ControlMessage::decode(text) {
            Ok(message) => message,
            Err(e) => {
                warn!(conn_id = %conn.id(), error = %e, "dropping control message");
                return DispatchOutcome::Ignored;
            }
        };
        debug!(conn_id = %conn.id(), kind = message.kind(), "control message");

        match message {
            ControlMessage::Join { uuid, channel } => self.join(conn, uuid, channel).await,
            ControlMessage::Request => self.request(conn).await,
            ControlMessage::Chat { chat_message } => Self::chat(conn, transport, chat_message),
            ControlMessage::CurUsers => self.cur_users().await,
            ControlMessage::Unknown(_) => DispatchOutcome::Ignored,
        }
    }

    async fn join(
        &self,
        conn: &ConnectionState,
        uuid: String,
        channel: Channel,
    ) -> DispatchOutcome {
        let outcome = self.registry.join(&uuid, channel, conn.id()).await;
        if channel != conn.endpoint() {
            debug!(
                conn_id = %conn.id(),
                endpoint = %conn.endpoint(),
                %channel,
                "join names a channel other than the endpoint"
            );
        }
        if let Some(previous) = outcome.replaced {
            debug!(%uuid, %channel, %previous, "channel handle replaced");
        }
        info!(
            %uuid,
            ordinal = outcome.ordinal,
            %channel,
            created = outcome.created,
            "user connected"
        );
        DispatchOutcome::Joined {
            uuid,
            channel,
            ordinal: outcome.ordinal,
            created: outcome.created,
        }
    }

    async fn request(&self, conn: &mut ConnectionState) -> DispatchOutcome {
        let generator = Arc::clone(&self.generator);
        let cloud = match tokio::task::spawn_blocking(move || generator.generate()).await {
            Ok(Ok(cloud)) => cloud,
            Ok(Err(e)) => {
                warn!(conn_id = %conn.id(), error = %e, "point cloud rejected");
                return DispatchOutcome::Ignored;
            }
            Err(e) => {
                error!(conn_id = %conn.id(), error = %e, "point cloud generation failed");
                return DispatchOutcome::Ignored;
            }
        };
        let payload = encode_snapshot(&cloud);
        let payload_len = payload.len();

        let (message_id, frames) = match self.delivery_mode {
            DeliveryMode::Snapshot => (None, usize::from(conn.queue.enqueue(payload))),
            DeliveryMode::Chunked => {
                let message_id = conn.allocate_message_id();
                let chunks = match split_payload(message_id, &payload, self.chunk_size) {
                    Ok(chunks) => chunks,
                    Err(e) => {
                        warn!(conn_id = %conn.id(), error = %e, "cannot chunk point cloud");
                        return DispatchOutcome::Ignored;
                    }
                };
                (Some(message_id), conn.queue.enqueue_all(chunks))
            }
        };

        info!(
            conn_id = %conn.id(),
            vertices = cloud.vertex_count(),
            payload_len,
            ?message_id,
            frames,
            "point cloud queued"
        );
        DispatchOutcome::Queued {
            message_id,
            frames,
            payload_len,
        }
    }

    fn chat(
        conn: &ConnectionState,
        transport: &mut dyn Transport,
        chat_message: String,
    ) -> DispatchOutcome {
        let reply = ControlMessage::Chat { chat_message };
        let text = match reply.encode() {
            Ok(text) => text,
            Err(e) => {
                warn!(conn_id = %conn.id(), error = %e, "cannot encode chat reply");
                return DispatchOutcome::Ignored;
            }
        };
        match transport.send_text(text) {
            SendOutcome::Accepted => DispatchOutcome::ChatEchoed,
            _ => {
                debug!(conn_id = %conn.id(), "chat echo on closed connection");
                DispatchOutcome::Ignored
            }
        }
    }

    async fn cur_users(&self) -> DispatchOutcome {
        let users = self.registry.list_all().await;
        info!(count = users.len(), "current connected users");
        for user in &users {
            info!(ordinal = user.ordinal, uuid = %user.uuid, "  connected user");
        }
        DispatchOutcome::UsersListed(users)
    }
}
