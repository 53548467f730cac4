//! Chunk frame layout: a fixed 16-byte little-endian header followed by
//! the chunk payload.
//!
//! ```text
//! offset 0:  message_id     u32
//! offset 4:  chunk_index    u32
//! offset 8:  payload_len    u64
//! offset 16: payload        payload_len bytes
//! ```

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::PushError;

/// Decoded chunk header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkHeader {
    /// Logical message this chunk belongs to.
    pub message_id: u32,
    /// Zero-based position of the chunk within its message.
    pub chunk_index: u32,
    /// Number of payload bytes following the header.
    pub payload_len: u64,
}

impl ChunkHeader {
    /// Encoded header size in bytes.
    pub const LEN: usize = 16;

    /// Appends the little-endian header to `buf`.
    pub fn encode(&self, buf: &mut BytesMut) {
        buf.put_u32_le(self.message_id);
        buf.put_u32_le(self.chunk_index);
        buf.put_u64_le(self.payload_len);
    }

    /// Reads a header from the front of `buf`.
    ///
    /// # Errors
    ///
    /// Returns [`PushError::MalformedFrame`] if fewer than
    /// [`ChunkHeader::LEN`] bytes remain.
    pub fn decode(buf: &mut impl Buf) -> Result<Self, PushError> {
        if buf.remaining() < Self::LEN {
            return Err(PushError::MalformedFrame(format!(
                "chunk header needs {} bytes, got {}",
                Self::LEN,
                buf.remaining()
            )));
        }
        Ok(Self {
            message_id: buf.get_u32_le(),
            chunk_index: buf.get_u32_le(),
            payload_len: buf.get_u64_le(),
        })
    }
}

/// One decoded chunk frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkFrame {
    /// Logical message this chunk belongs to.
    pub message_id: u32,
    /// Zero-based position of the chunk within its message.
    pub chunk_index: u32,
    /// Raw payload bytes of this fragment.
    pub payload: Bytes,
}

/// Encodes one chunk frame: header followed by `payload`.
#[must_use]
pub fn encode_chunk(message_id: u32, chunk_index: u32, payload: &[u8]) -> Bytes {
    let header = ChunkHeader {
        message_id,
        chunk_index,
        payload_len: payload.len() as u64,
    };
    let mut buf = BytesMut::with_capacity(ChunkHeader::LEN + payload.len());
    header.encode(&mut buf);
    buf.extend_from_slice(payload);
    buf.freeze()
}

/// Decodes one chunk frame.
///
/// The payload is a zero-copy slice of `input`.
///
/// # Errors
///
/// Returns [`PushError::MalformedFrame`] when `input` is shorter than the
/// header or the declared payload length differs from the bytes present.
pub fn decode_chunk(input: Bytes) -> Result<ChunkFrame, PushError> {
    let Some(mut header_bytes) = input.get(..ChunkHeader::LEN) else {
        return Err(PushError::MalformedFrame(format!(
            "chunk header needs {} bytes, got {}",
            ChunkHeader::LEN,
            input.len()
        )));
    };
    let header = ChunkHeader::decode(&mut header_bytes)?;
    let payload = input.slice(ChunkHeader::LEN..);
    if header.payload_len != payload.len() as u64 {
        return Err(PushError::MalformedFrame(format!(
            "declared payload length {} but {} bytes follow the header",
            header.payload_len,
            payload.len()
        )));
    }
    Ok(ChunkFrame {
        message_id: header.message_id,
        chunk_index: header.chunk_index,
        payload,
    })
}

/// Splits `payload` into encoded chunk frames of at most `chunk_size`
/// payload bytes, indexed `0..k` in order under one `message_id`.
///
/// An empty payload yields no frames.
///
/// # Errors
///
/// Returns [`PushError::InvalidConfig`] for a zero `chunk_size` and
/// [`PushError::PayloadTooLarge`] when the chunk count does not fit a
/// `u32` index.
pub fn split_payload(
    message_id: u32,
    payload: &[u8],
    chunk_size: usize,
) -> Result<Vec<Bytes>, PushError> {
    if chunk_size == 0 {
        return Err(PushError::InvalidConfig(
            "chunk size must be positive".to_string(),
        ));
    }
    let chunks = payload.len().div_ceil(chunk_size);
    if u32::try_from(chunks).is_err() {
        return Err(PushError::PayloadTooLarge { chunks });
    }
    Ok(payload
        .chunks(chunk_size)
        .zip(0u32..)
        .map(|(piece, index)| encode_chunk(message_id, index, piece))
        .collect())
}
