//! # pointcloud-push
//!
//! WebSocket push server that delivers point cloud payloads to clients in
//! ordered chunks under flow control, alongside a small JSON control
//! protocol for joining, requesting payloads, chat and user listing.
//!
//! A client opens two sockets, `/binary` and `/text`, and joins both under
//! one user id. A `request` on either socket generates a point cloud,
//! encodes it as a snapshot frame and queues it, split into indexed chunk
//! frames, on the requesting connection. The queue pauses whenever the
//! socket buffer crosses the backpressure threshold and resumes on drain.
//!
//! ## Architecture
//!
//! ```text
//! Clients (WebSocket /binary, /text; HTTP /health, /users)
//!     │
//!     ├── WS Handlers + connection loop (ws/)
//!     ├── REST Handlers (api/)
//!     │
//!     ├── Dispatcher (ws/dispatch)
//!     │     ├── SessionRegistry (session/)
//!     │     └── PayloadGenerator (generator/)
//!     │
//!     ├── Codec: control JSON, chunk + snapshot frames (codec/)
//!     │
//!     └── SendQueue → WsTransport → writer task (delivery/)
//! ```

pub mod api;
pub mod app_state;
pub mod codec;
pub mod config;
pub mod delivery;
pub mod error;
pub mod generator;
pub mod server;
pub mod session;
pub mod ws;
