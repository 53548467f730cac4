//! Point cloud payload generation.
//!
//! The dispatcher only knows the [`PayloadGenerator`] trait; what the cloud
//! depicts is up to the implementation.

pub mod sphere;

use std::fmt::Debug;

pub use sphere::SphereShellGenerator;

use crate::codec::PointCloud;
use crate::error::PushError;

/// Produces the point cloud sent in reply to a `request`.
///
/// Called on the blocking pool, so implementations may be CPU-heavy.
pub trait PayloadGenerator: Send + Sync + Debug {
    /// Generates one point cloud.
    ///
    /// # Errors
    ///
    /// Returns [`PushError::InvalidPointCloud`] if the produced arrays are
    /// inconsistent.
    fn generate(&self) -> Result<PointCloud, PushError>;
}
