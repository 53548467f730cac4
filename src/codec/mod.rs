//! Frame codec: control JSON messages and the binary chunk and snapshot
//! frames.
//!
//! Everything here is pure: no I/O, no shared state.

pub mod assembler;
pub mod chunk;
pub mod control;
pub mod snapshot;

pub use assembler::ChunkAssembler;
pub use chunk::{ChunkFrame, ChunkHeader, decode_chunk, encode_chunk, split_payload};
pub use control::ControlMessage;
pub use snapshot::{PointCloud, decode_snapshot, encode_snapshot};
