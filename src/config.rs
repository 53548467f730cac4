//! Server configuration loaded from environment variables.
//!
//! All settings come from environment variables (or a `.env` file via
//! `dotenvy`). Missing or unparsable numeric values fall back to their
//! defaults; values that would leave the server unable to deliver
//! payloads are rejected.

use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;

use crate::error::PushError;

/// Default chunk payload size: 1 MiB.
pub const DEFAULT_CHUNK_SIZE: usize = 1024 * 1024;

/// Default soft buffering limit before sending pauses: 16 MiB.
pub const DEFAULT_BACKPRESSURE_THRESHOLD: usize = 16 * 1024 * 1024;

/// Default hard buffering limit past which the transport drops sends: 64 MiB.
pub const DEFAULT_MAX_BACKPRESSURE: usize = 64 * 1024 * 1024;

/// Default number of vertices produced per `request`.
pub const DEFAULT_POINT_COUNT: usize = 200_000;

/// How a `request` reply is framed on the binary channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeliveryMode {
    /// One unfragmented snapshot frame.
    Snapshot,
    /// The snapshot bytes split into indexed chunk frames.
    #[default]
    Chunked,
}

impl FromStr for DeliveryMode {
    type Err = PushError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "snapshot" => Ok(Self::Snapshot),
            "chunked" => Ok(Self::Chunked),
            other => Err(PushError::InvalidConfig(format!(
                "unknown delivery mode `{other}`"
            ))),
        }
    }
}

impl fmt::Display for DeliveryMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Snapshot => f.write_str("snapshot"),
            Self::Chunked => f.write_str("chunked"),
        }
    }
}

/// Top-level server configuration.
///
/// Loaded once at startup via [`ServerConfig::from_env`].
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Socket address the WebSocket server binds to.
    pub listen_addr: SocketAddr,

    /// Framing used for `request` replies.
    pub delivery_mode: DeliveryMode,

    /// Maximum payload bytes per chunk frame.
    pub chunk_size: usize,

    /// Buffered bytes at or above which sends pause until drained.
    pub backpressure_threshold: usize,

    /// Buffered bytes past which the transport discards a send.
    pub max_backpressure: usize,

    /// Close the connection instead of dropping when `max_backpressure`
    /// would be exceeded.
    pub close_on_backpressure_limit: bool,

    /// Vertices produced by the point cloud generator per request.
    pub point_count: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from(([0, 0, 0, 0], 9001)),
            delivery_mode: DeliveryMode::Chunked,
            chunk_size: DEFAULT_CHUNK_SIZE,
            backpressure_threshold: DEFAULT_BACKPRESSURE_THRESHOLD,
            max_backpressure: DEFAULT_MAX_BACKPRESSURE,
            close_on_backpressure_limit: false,
            point_count: DEFAULT_POINT_COUNT,
        }
    }
}

impl ServerConfig {
    /// Loads configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv().ok()` to optionally load a `.env` file.
    ///
    /// # Errors
    ///
    /// Returns [`PushError::InvalidConfig`] if `LISTEN_HOST` is not an IP
    /// address, `DELIVERY_MODE` is unknown, or the resulting values fail
    /// [`ServerConfig::validate`].
    pub fn from_env() -> Result<Self, PushError> {
        dotenvy::dotenv().ok();

        let host: IpAddr = std::env::var("LISTEN_HOST")
            .unwrap_or_else(|_| "0.0.0.0".to_string())
            .parse()
            .map_err(|e| PushError::InvalidConfig(format!("LISTEN_HOST: {e}")))?;
        let port: u16 = parse_env("LISTEN_PORT", 9001);

        let delivery_mode = match std::env::var("DELIVERY_MODE") {
            Ok(raw) => raw.parse()?,
            Err(_) => DeliveryMode::default(),
        };

        let config = Self {
            listen_addr: SocketAddr::new(host, port),
            delivery_mode,
            chunk_size: parse_env("CHUNK_SIZE", DEFAULT_CHUNK_SIZE),
            backpressure_threshold: parse_env(
                "BACKPRESSURE_THRESHOLD",
                DEFAULT_BACKPRESSURE_THRESHOLD,
            ),
            max_backpressure: parse_env("MAX_BACKPRESSURE", DEFAULT_MAX_BACKPRESSURE),
            close_on_backpressure_limit: parse_env_bool("CLOSE_ON_BACKPRESSURE_LIMIT", false),
            point_count: parse_env("POINT_COUNT", DEFAULT_POINT_COUNT),
        };
        config.validate()?;
        Ok(config)
    }

    /// Checks the invariants the delivery path relies on.
    ///
    /// # Errors
    ///
    /// Returns [`PushError::InvalidConfig`] when `chunk_size` or
    /// `backpressure_threshold` is zero, or `max_backpressure` is below
    /// `backpressure_threshold`.
    pub fn validate(&self) -> Result<(), PushError> {
        if self.chunk_size == 0 {
            return Err(PushError::InvalidConfig(
                "CHUNK_SIZE must be positive".to_string(),
            ));
        }
        if self.backpressure_threshold == 0 {
            return Err(PushError::InvalidConfig(
                "BACKPRESSURE_THRESHOLD must be positive".to_string(),
            ));
        }
        if self.max_backpressure < self.backpressure_threshold {
            return Err(PushError::InvalidConfig(format!(
                "MAX_BACKPRESSURE ({}) is below BACKPRESSURE_THRESHOLD ({})",
                self.max_backpressure, self.backpressure_threshold
            )));
        }
        Ok(())
    }
}

/// Parses an environment variable as `T`, returning `default` on missing
/// or invalid values.
fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Parses an environment variable as a boolean. Accepts `"true"`, `"1"`,
/// `"false"`, `"0"` (case-insensitive). Returns `default` otherwise.
fn parse_env_bool(key: &str, default: bool) -> bool {
    match std::env::var(key)
        .ok()
        .map(|v| v.to_ascii_lowercase())
        .as_deref()
    {
        Some("true" | "1") => true,
        Some("false" | "0") => false,
        _ => default,
    }
}
