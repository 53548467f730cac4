//! Receiver-side reassembly of chunk frames.
//!
//! [`ChunkAssembler`] collects the chunks of one message in index order.
//! Since every chunked payload is an encoded snapshot, the assembler can
//! tell when a message is complete from the vertex count at its front.

use bytes::{Bytes, BytesMut};

use super::chunk::ChunkFrame;
use super::snapshot;
use crate::error::PushError;

/// Accumulates the chunks of a single message.
#[derive(Debug, Default)]
pub struct ChunkAssembler {
    message_id: Option<u32>,
    next_index: u32,
    buffer: BytesMut,
}

impl ChunkAssembler {
    /// Creates an empty assembler.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends the next chunk.
    ///
    /// The first chunk fixes the message id. Chunks must then arrive with
    /// consecutive indices starting at zero.
    ///
    /// # Errors
    ///
    /// Returns [`PushError::MalformedFrame`] on a foreign message id, a
    /// gap, a duplicate or a reordered index. The assembler is left
    /// unchanged in that case.
    pub fn push(&mut self, frame: ChunkFrame) -> Result<(), PushError> {
        if let Some(id) = self.message_id
            && id != frame.message_id
        {
            return Err(PushError::MalformedFrame(format!(
                "chunk of message {} while assembling message {id}",
                frame.message_id
            )));
        }
        if frame.chunk_index != self.next_index {
            return Err(PushError::MalformedFrame(format!(
                "expected chunk {}, got chunk {}",
                self.next_index, frame.chunk_index
            )));
        }
        self.message_id = Some(frame.message_id);
        self.next_index = self.next_index.saturating_add(1);
        self.buffer.extend_from_slice(&frame.payload);
        Ok(())
    }

    /// Message id fixed by the first chunk.
    #[must_use]
    pub const fn message_id(&self) -> Option<u32> {
        self.message_id
    }

    /// Number of chunks accepted so far.
    #[must_use]
    pub const fn chunks_received(&self) -> u32 {
        self.next_index
    }

    /// Payload bytes accepted so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Returns `true` if no payload bytes were accepted yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Total snapshot size announced by the payload, once its vertex count
    /// has arrived.
    #[must_use]
    pub fn expected_snapshot_len(&self) -> Option<usize> {
        let count = snapshot::peek_vertex_count(&self.buffer)?;
        usize::try_from(count).ok().and_then(snapshot::encoded_len)
    }

    /// Returns `true` once the accepted bytes cover the announced snapshot.
    #[must_use]
    pub fn is_complete_snapshot(&self) -> bool {
        self.expected_snapshot_len() == Some(self.buffer.len())
    }

    /// Consumes the assembler, returning the reassembled payload.
    #[must_use]
    pub fn finish(self) -> Bytes {
        self.buffer.freeze()
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::codec::{PointCloud, decode_chunk, decode_snapshot, encode_snapshot, split_payload};

    fn frame(message_id: u32, chunk_index: u32, payload: &'static [u8]) -> ChunkFrame {
        ChunkFrame {
            message_id,
            chunk_index,
            payload: Bytes::from_static(payload),
        }
    }

    #[test]
    fn accepts_in_order_chunks() {
        let mut asm = ChunkAssembler::new();
        assert!(asm.push(frame(3, 0, b"ab")).is_ok());
        assert!(asm.push(frame(3, 1, b"cd")).is_ok());
        assert_eq!(asm.message_id(), Some(3));
        assert_eq!(asm.chunks_received(), 2);
        assert_eq!(asm.finish(), Bytes::from_static(b"abcd"));
    }

    #[test]
    fn rejects_gap_duplicate_and_foreign_id() {
        let mut asm = ChunkAssembler::new();
        assert!(asm.push(frame(1, 1, b"x")).is_err());
        assert!(asm.push(frame(1, 0, b"a")).is_ok());
        assert!(asm.push(frame(1, 0, b"a")).is_err());
        assert!(asm.push(frame(2, 1, b"b")).is_err());
        assert!(asm.push(frame(1, 2, b"c")).is_err());
        assert_eq!(asm.len(), 1);
    }

    #[test]
    fn detects_complete_snapshot_across_chunks() {
        let Ok(cloud) = PointCloud::new(
            vec![1.0; 30],
            vec![7; 30],
            vec![0.5; 30],
            [0.0; 3],
            [1.0; 3],
        ) else {
            panic!("valid cloud");
        };
        let payload = encode_snapshot(&cloud);
        let Ok(frames) = split_payload(4, &payload, 64) else {
            panic!("split failed");
        };

        let mut asm = ChunkAssembler::new();
        let total = frames.len();
        for (i, raw) in frames.into_iter().enumerate() {
            let Ok(chunk) = decode_chunk(raw) else {
                panic!("chunk decodes");
            };
            assert!(asm.push(chunk).is_ok());
            assert_eq!(asm.is_complete_snapshot(), i + 1 == total);
        }
        let Ok(decoded) = decode_snapshot(&asm.finish()) else {
            panic!("snapshot decodes");
        };
        assert_eq!(decoded, cloud);
    }
}
