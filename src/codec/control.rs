//! JSON control messages exchanged as WebSocket text frames.
//!
//! Every message is an object with a `type` discriminator. A missing or
//! unrecognized `type` decodes to [`ControlMessage::Unknown`] instead of an
//! error; the dispatcher treats it as a no-op.

use serde_json::{Value, json};

use crate::error::PushError;
use crate::session::Channel;

/// A decoded control message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlMessage {
    /// Attach this connection to a user's session on one channel.
    Join {
        /// User-supplied session identifier.
        uuid: String,
        /// Role of the connection within the session.
        channel: Channel,
    },
    /// Ask for a freshly generated point cloud.
    Request,
    /// Chat text, echoed back to the sender.
    Chat {
        /// Message body.
        chat_message: String,
    },
    /// Log the list of connected users.
    CurUsers,
    /// Missing or unrecognized `type`; carries the type string if present.
    Unknown(Option<String>),
}

impl ControlMessage {
    /// Decodes a text frame.
    ///
    /// # Errors
    ///
    /// Returns [`PushError::MalformedControlMessage`] if `text` is not
    /// JSON or a known `type` lacks a required string field, and
    /// [`PushError::UnknownChannel`] if a join names an unknown channel.
    pub fn decode(text: &str) -> Result<Self, PushError> {
        let value: Value = serde_json::from_str(text)
            .map_err(|e| PushError::MalformedControlMessage(e.to_string()))?;

        let Some(kind) = value.get("type").and_then(Value::as_str) else {
            return Ok(Self::Unknown(None));
        };

        match kind {
            "join" => {
                let uuid = string_field(&value, "uuid")?;
                let channel = string_field(&value, "channel")?.parse()?;
                Ok(Self::Join { uuid, channel })
            }
            "request" => Ok(Self::Request),
            "chat" => Ok(Self::Chat {
                chat_message: string_field(&value, "chat_message")?,
            }),
            "curUsers" => Ok(Self::CurUsers),
            other => Ok(Self::Unknown(Some(other.to_string()))),
        }
    }

    /// Encodes the message as a compact JSON text frame.
    ///
    /// # Errors
    ///
    /// Returns [`PushError::MalformedControlMessage`] for
    /// [`ControlMessage::Unknown`], which has no wire form.
    pub fn encode(&self) -> Result<String, PushError> {
        let value = match self {
            Self::Join { uuid, channel } => json!({
                "type": "join",
                "uuid": uuid,
                "channel": channel,
            }),
            Self::Request => json!({ "type": "request" }),
            Self::Chat { chat_message } => json!({
                "type": "chat",
                "chat_message": chat_message,
            }),
            Self::CurUsers => json!({ "type": "curUsers" }),
            Self::Unknown(_) => {
                return Err(PushError::MalformedControlMessage(
                    "unknown message has no wire form".to_string(),
                ));
            }
        };
        Ok(value.to_string())
    }

    /// The `type` discriminator, for logging.
    #[must_use]
    pub fn kind(&self) -> &str {
        match self {
            Self::Join { .. } => "join",
            Self::Request => "request",
            Self::Chat { .. } => "chat",
            Self::CurUsers => "curUsers",
            Self::Unknown(Some(kind)) => kind,
            Self::Unknown(None) => "<none>",
        }
    }
}

fn string_field(value: &Value, key: &str) -> Result<String, PushError> {
    value
        .get(key)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| {
            PushError::MalformedControlMessage(format!("{key} missing or not a string"))
        })
}
