//! Deterministic Fibonacci-sphere point cloud.

use std::f32::consts::PI;

use super::PayloadGenerator;
use crate::codec::PointCloud;
use crate::error::PushError;

/// Points spread evenly over a sphere shell with outward normals and a
/// blue-to-red height ramp.
#[derive(Debug, Clone, Copy)]
pub struct SphereShellGenerator {
    point_count: usize,
    radius: f32,
}

impl SphereShellGenerator {
    /// Generator of `point_count` points on the unit sphere.
    #[must_use]
    pub const fn new(point_count: usize) -> Self {
        Self {
            point_count,
            radius: 1.0,
        }
    }

    /// Same generator with another shell radius.
    #[must_use]
    pub const fn with_radius(mut self, radius: f32) -> Self {
        self.radius = radius;
        self
    }
}

impl PayloadGenerator for SphereShellGenerator {
    #[allow(clippy::cast_precision_loss)]
    fn generate(&self) -> Result<PointCloud, PushError> {
        let n = self.point_count;
        let mut coords = Vec::with_capacity(n * 3);
        let mut colors = Vec::with_capacity(n * 3);
        let mut normals = Vec::with_capacity(n * 3);
        let mut min_bound = [f32::MAX; 3];
        let mut max_bound = [f32::MIN; 3];

        let golden_angle = PI * (3.0 - 5.0f32.sqrt());
        let denom = n.saturating_sub(1).max(1) as f32;

        for i in 0..n {
            let y = 1.0 - 2.0 * (i as f32) / denom;
            let ring = (1.0 - y * y).max(0.0).sqrt();
            let theta = golden_angle * i as f32;
            let normal = [ring * theta.cos(), y, ring * theta.sin()];
            let point = normal.map(|c| c * self.radius);

            for ((lo, hi), p) in min_bound.iter_mut().zip(max_bound.iter_mut()).zip(point) {
                *lo = lo.min(p);
                *hi = hi.max(p);
            }

            let t = (y + 1.0) * 0.5;
            coords.extend_from_slice(&point);
            normals.extend_from_slice(&normal);
            colors.extend_from_slice(&[ramp(t), 64, ramp(1.0 - t)]);
        }

        if n == 0 {
            min_bound = [0.0; 3];
            max_bound = [0.0; 3];
        }
        PointCloud::new(coords, colors, normals, min_bound, max_bound)
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn ramp(t: f32) -> u8 {
    (t.clamp(0.0, 1.0) * 255.0).round() as u8
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn produces_requested_vertex_count() {
        let Ok(cloud) = SphereShellGenerator::new(1000).generate() else {
            panic!("generation failed");
        };
        assert_eq!(cloud.vertex_count(), 1000);
        assert_eq!(cloud.colors().len(), 3000);
        assert_eq!(cloud.normals().len(), 3000);
    }

    #[test]
    fn points_lie_on_the_shell_inside_bounds() {
        let Ok(cloud) = SphereShellGenerator::new(500).with_radius(2.0).generate() else {
            panic!("generation failed");
        };
        let (min, max) = (cloud.min_bound(), cloud.max_bound());
        for p in cloud.coords().chunks_exact(3) {
            let r = p.iter().map(|c| c * c).sum::<f32>().sqrt();
            assert!((r - 2.0).abs() < 1e-3);
            for ((c, lo), hi) in p.iter().zip(min).zip(max) {
                assert!(*c >= lo && *c <= hi);
            }
        }
        assert!((max[1] - 2.0).abs() < 1e-3);
        assert!((min[1] + 2.0).abs() < 1e-3);
    }

    #[test]
    fn output_is_deterministic() {
        let generator = SphereShellGenerator::new(64);
        assert_eq!(generator.generate().ok(), generator.generate().ok());
    }

    #[test]
    fn empty_cloud_has_zero_bounds() {
        let Ok(cloud) = SphereShellGenerator::new(0).generate() else {
            panic!("generation failed");
        };
        assert_eq!(cloud.vertex_count(), 0);
        assert_eq!(cloud.min_bound(), [0.0; 3]);
    }
}
