//! Point cloud snapshot frame.
//!
//! A snapshot carries one complete point cloud in a single buffer. In
//! chunked delivery mode the same bytes become the payload that is split
//! into chunk frames.
//!
//! ```text
//! vertex_count  u64
//! coords        vertex_count * 3 * f32   (xyz per vertex)
//! colors        vertex_count * 3 * u8    (rgb per vertex)
//! normals       vertex_count * 3 * f32   (xyz per vertex)
//! min_bound     3 * f32
//! max_bound     3 * f32
//! ```
//!
//! All multi-byte values are little-endian.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::PushError;

const VERTEX_COUNT_LEN: usize = 8;
const BOUNDS_LEN: usize = 2 * 3 * 4;
/// Bytes per vertex: coords (12) + colors (3) + normals (12).
const BYTES_PER_VERTEX: usize = 27;

/// A point cloud as produced by a [`crate::generator::PayloadGenerator`].
///
/// Construct through [`PointCloud::new`], which checks that every
/// per-vertex array holds exactly three components per vertex.
#[derive(Debug, Clone, PartialEq)]
pub struct PointCloud {
    coords: Vec<f32>,
    colors: Vec<u8>,
    normals: Vec<f32>,
    min_bound: [f32; 3],
    max_bound: [f32; 3],
}

impl PointCloud {
    /// Builds a point cloud from flat xyz / rgb arrays.
    ///
    /// # Errors
    ///
    /// Returns [`PushError::InvalidPointCloud`] if `coords` is not a whole
    /// number of triples, or `colors` / `normals` do not have the same
    /// length as `coords`.
    pub fn new(
        coords: Vec<f32>,
        colors: Vec<u8>,
        normals: Vec<f32>,
        min_bound: [f32; 3],
        max_bound: [f32; 3],
    ) -> Result<Self, PushError> {
        if coords.len() % 3 != 0 {
            return Err(PushError::InvalidPointCloud(format!(
                "{} coordinates is not a whole number of xyz triples",
                coords.len()
            )));
        }
        if colors.len() != coords.len() {
            return Err(PushError::InvalidPointCloud(format!(
                "expected {} color components, got {}",
                coords.len(),
                colors.len()
            )));
        }
        if normals.len() != coords.len() {
            return Err(PushError::InvalidPointCloud(format!(
                "expected {} normal components, got {}",
                coords.len(),
                normals.len()
            )));
        }
        Ok(Self {
            coords,
            colors,
            normals,
            min_bound,
            max_bound,
        })
    }

    /// Number of vertices.
    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.coords.len() / 3
    }

    /// Flat xyz coordinates.
    #[must_use]
    pub fn coords(&self) -> &[f32] {
        &self.coords
    }

    /// Flat rgb colors.
    #[must_use]
    pub fn colors(&self) -> &[u8] {
        &self.colors
    }

    /// Flat xyz normals.
    #[must_use]
    pub fn normals(&self) -> &[f32] {
        &self.normals
    }

    /// Lower corner of the bounding box.
    #[must_use]
    pub const fn min_bound(&self) -> [f32; 3] {
        self.min_bound
    }

    /// Upper corner of the bounding box.
    #[must_use]
    pub const fn max_bound(&self) -> [f32; 3] {
        self.max_bound
    }
}

/// Size of an encoded snapshot holding `vertex_count` vertices, or `None`
/// if it overflows `usize`.
#[must_use]
pub fn encoded_len(vertex_count: usize) -> Option<usize> {
    vertex_count
        .checked_mul(BYTES_PER_VERTEX)?
        .checked_add(VERTEX_COUNT_LEN + BOUNDS_LEN)
}

/// Encodes `cloud` as one snapshot frame.
#[must_use]
pub fn encode_snapshot(cloud: &PointCloud) -> Bytes {
    let vertex_count = cloud.vertex_count();
    let capacity = encoded_len(vertex_count).unwrap_or(0);
    let mut buf = BytesMut::with_capacity(capacity);

    buf.put_u64_le(vertex_count as u64);
    for c in &cloud.coords {
        buf.put_f32_le(*c);
    }
    buf.extend_from_slice(&cloud.colors);
    for n in &cloud.normals {
        buf.put_f32_le(*n);
    }
    for v in cloud.min_bound.iter().chain(cloud.max_bound.iter()) {
        buf.put_f32_le(*v);
    }
    buf.freeze()
}

/// Reads the vertex count announced at the front of a snapshot, if at
/// least eight bytes are available.
#[must_use]
pub fn peek_vertex_count(input: &[u8]) -> Option<u64> {
    let mut head = input.get(..VERTEX_COUNT_LEN)?;
    Some(head.get_u64_le())
}

/// Decodes one snapshot frame.
///
/// # Errors
///
/// Returns [`PushError::MalformedFrame`] if the input is truncated, has
/// trailing bytes, or announces a vertex count whose size overflows.
pub fn decode_snapshot(input: &[u8]) -> Result<PointCloud, PushError> {
    let Some(raw_count) = peek_vertex_count(input) else {
        return Err(PushError::MalformedFrame(format!(
            "snapshot needs at least {VERTEX_COUNT_LEN} bytes, got {}",
            input.len()
        )));
    };
    let expected = usize::try_from(raw_count)
        .ok()
        .and_then(|n| encoded_len(n).map(|len| (n, len)));
    let Some((vertex_count, expected_len)) = expected else {
        return Err(PushError::MalformedFrame(format!(
            "vertex count {raw_count} is out of range"
        )));
    };
    if input.len() != expected_len {
        return Err(PushError::MalformedFrame(format!(
            "snapshot of {vertex_count} vertices needs {expected_len} bytes, got {}",
            input.len()
        )));
    }

    let components = vertex_count * 3;
    let mut buf = input;
    buf.advance(VERTEX_COUNT_LEN);
    let coords: Vec<f32> = (0..components).map(|_| buf.get_f32_le()).collect();
    let mut colors = vec![0u8; components];
    buf.copy_to_slice(&mut colors);
    let normals: Vec<f32> = (0..components).map(|_| buf.get_f32_le()).collect();
    let min_bound = [buf.get_f32_le(), buf.get_f32_le(), buf.get_f32_le()];
    let max_bound = [buf.get_f32_le(), buf.get_f32_le(), buf.get_f32_le()];

    PointCloud::new(coords, colors, normals, min_bound, max_bound)
}
