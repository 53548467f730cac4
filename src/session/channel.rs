//! The two logical connection roles a session can attach.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::PushError;

/// Connection role within a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    /// Carries point cloud frames.
    Binary,
    /// Carries chat text.
    Text,
}

impl Channel {
    /// Wire name of the channel, also used as the endpoint path segment.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Binary => "binary",
            Self::Text => "text",
        }
    }
}

impl FromStr for Channel {
    type Err = PushError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "binary" => Ok(Self::Binary),
            "text" => Ok(Self::Text),
            other => Err(PushError::UnknownChannel(other.to_string())),
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_wire_names() {
        assert_eq!("binary".parse::<Channel>().ok(), Some(Channel::Binary));
        assert_eq!("text".parse::<Channel>().ok(), Some(Channel::Text));
    }

    #[test]
    fn rejects_other_names() {
        assert!(matches!(
            "Binary".parse::<Channel>(),
            Err(PushError::UnknownChannel(ref s)) if s == "Binary"
        ));
        assert!("video".parse::<Channel>().is_err());
    }

    #[test]
    fn serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&Channel::Text).unwrap_or_default(),
            "\"text\""
        );
    }
}
