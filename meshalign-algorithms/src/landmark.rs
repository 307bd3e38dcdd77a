//! Least-squares transform between paired landmark sets
//!
//! Given ordered source and target landmarks (`source[i]` pairs with
//! `target[i]`), find the transform minimising the summed squared distance
//! between transformed source landmarks and their targets. Rotation comes from
//! the SVD of the cross-covariance of the centred sets (Kabsch), with a
//! reflection correction so the result is always a proper rotation.

use meshalign_core::{Error, Point3f, Result, Transform3D};
use nalgebra::{Matrix3, Vector3};
use serde::{Deserialize, Serialize};

/// Minimum number of landmark pairs for a solve
pub const MIN_LANDMARKS: usize = 3;

/// Relative singular value below which the landmark configuration is treated
/// as collinear or coincident
const DEGENERACY_TOLERANCE: f64 = 1e-10;

/// Degrees of freedom of the solved transform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LandmarkMode {
    /// Rotation and translation
    #[default]
    RigidBody,
    /// Rotation, translation and uniform scale
    Similarity,
}

/// How well-conditioned the landmark configuration was
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SolveQuality {
    Well,
    /// Landmarks are collinear or coincident; the rotation about the degenerate
    /// direction is arbitrary
    NearSingular,
}

/// Outcome of a landmark solve
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LandmarkSolution {
    pub transform: Transform3D,
    pub scale: f32,
    pub quality: SolveQuality,
}

impl LandmarkSolution {
    pub fn is_degenerate(&self) -> bool {
        self.quality == SolveQuality::NearSingular
    }
}

/// Closed-form landmark transform solver
#[derive(Debug, Clone, Copy, Default)]
pub struct LandmarkTransform {
    mode: LandmarkMode,
}

impl LandmarkTransform {
    pub fn new(mode: LandmarkMode) -> Self {
        Self { mode }
    }

    pub fn rigid() -> Self {
        Self::new(LandmarkMode::RigidBody)
    }

    pub fn similarity() -> Self {
        Self::new(LandmarkMode::Similarity)
    }

    pub fn mode(&self) -> LandmarkMode {
        self.mode
    }

    /// Transform mapping `source[i]` onto `target[i]` in the least-squares sense.
    ///
    /// # Errors
    /// `InsufficientLandmarks` unless both sets have the same length of at
    /// least [`MIN_LANDMARKS`].
    pub fn solve(&self, source: &[Point3f], target: &[Point3f]) -> Result<LandmarkSolution> {
        if source.len() != target.len() || source.len() < MIN_LANDMARKS {
            return Err(Error::InsufficientLandmarks {
                source_count: source.len(),
                target_count: target.len(),
            });
        }

        let n = source.len() as f64;
        let to_f64 = |p: &Point3f| Vector3::new(p.x as f64, p.y as f64, p.z as f64);

        let source_centroid = source.iter().map(to_f64).sum::<Vector3<f64>>() / n;
        let target_centroid = target.iter().map(to_f64).sum::<Vector3<f64>>() / n;

        let mut h = Matrix3::<f64>::zeros();
        let mut source_spread = 0.0;
        let mut target_spread = 0.0;
        for (src, tgt) in source.iter().zip(target) {
            let p = to_f64(src) - source_centroid;
            let q = to_f64(tgt) - target_centroid;
            h += p * q.transpose();
            source_spread += p.norm_squared();
            target_spread += q.norm_squared();
        }

        let svd = h.svd(true, true);
        let u = svd
            .u
            .ok_or_else(|| Error::NumericalDegeneracy("SVD U matrix not available".to_string()))?;
        let mut v_t = svd
            .v_t
            .ok_or_else(|| Error::NumericalDegeneracy("SVD V^T matrix not available".to_string()))?;

        let singular = svd.singular_values;
        let mut rotation = v_t.transpose() * u.transpose();

        // Ensure proper rotation (det(R) = 1) by flipping the weakest direction
        if rotation.determinant() < 0.0 {
            let weakest = singular.imin();
            let flipped = -v_t.row(weakest);
            v_t.set_row(weakest, &flipped);
            rotation = v_t.transpose() * u.transpose();
        }

        let mut sorted = [singular[0], singular[1], singular[2]];
        sorted.sort_by(|a, b| b.partial_cmp(a).unwrap_or(std::cmp::Ordering::Equal));
        let degenerate = source_spread <= f64::EPSILON
            || target_spread <= f64::EPSILON
            || sorted[1] <= DEGENERACY_TOLERANCE * sorted[0];

        let scale = match self.mode {
            LandmarkMode::RigidBody => 1.0,
            LandmarkMode::Similarity if source_spread > f64::EPSILON => {
                (target_spread / source_spread).sqrt()
            }
            LandmarkMode::Similarity => 1.0,
        };

        let translation = target_centroid - scale * (rotation * source_centroid);

        let quality = if degenerate {
            log::warn!(
                "landmark solve on {} near-singular pairs (singular values {:.3e}, {:.3e}, {:.3e})",
                source.len(),
                sorted[0],
                sorted[1],
                sorted[2]
            );
            SolveQuality::NearSingular
        } else {
            SolveQuality::Well
        };

        Ok(LandmarkSolution {
            transform: Transform3D::from_similarity(
                &rotation.cast::<f32>(),
                &translation.cast::<f32>(),
                scale as f32,
            ),
            scale: scale as f32,
            quality,
        })
    }
}

/// Root-mean-square residual of `transform` over the landmark pairs
pub fn rms_error(source: &[Point3f], target: &[Point3f], transform: &Transform3D) -> f32 {
    if source.is_empty() {
        return 0.0;
    }

    let sum_squared: f32 = source
        .iter()
        .zip(target)
        .map(|(s, t)| (transform.transform_point(s) - t).norm_squared())
        .sum();

    (sum_squared / source.len() as f32).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use meshalign_core::{UnitQuaternion, Vector3f};

    fn sample_points() -> Vec<Point3f> {
        vec![
            Point3f::new(0.0, 0.0, 0.0),
            Point3f::new(1.0, 0.0, 0.0),
            Point3f::new(0.0, 2.0, 0.0),
            Point3f::new(0.0, 0.0, 3.0),
            Point3f::new(1.0, 1.0, 1.0),
            Point3f::new(-0.5, 0.3, 2.0),
        ]
    }

    #[test]
    fn test_rigid_round_trip() {
        let rotation = UnitQuaternion::from_euler_angles(0.4, -0.9, 2.1);
        let truth = Transform3D::translation(Vector3f::new(1.0, -2.0, 0.5)) * Transform3D::rotation(rotation);

        let source = sample_points();
        let target = truth.transform_points(&source);

        let solution = LandmarkTransform::rigid().solve(&source, &target).unwrap();
        assert_eq!(solution.quality, SolveQuality::Well);
        assert_relative_eq!(solution.transform.matrix, truth.matrix, epsilon = 1e-5);
        assert!(rms_error(&source, &target, &solution.transform) < 1e-5);
    }

    #[test]
    fn test_similarity_recovers_scale() {
        let rotation = UnitQuaternion::from_euler_angles(-0.3, 0.2, 0.7);
        let truth = Transform3D::translation(Vector3f::new(0.0, 4.0, -1.0))
            * Transform3D::uniform_scaling(2.5)
            * Transform3D::rotation(rotation);

        let source = sample_points();
        let target = truth.transform_points(&source);

        let solution = LandmarkTransform::similarity().solve(&source, &target).unwrap();
        assert_relative_eq!(solution.scale, 2.5, epsilon = 1e-5);
        assert_relative_eq!(solution.transform.matrix, truth.matrix, epsilon = 1e-4);

        // rigid mode keeps unit scale even when the sets differ in size
        let rigid = LandmarkTransform::rigid().solve(&source, &target).unwrap();
        assert_eq!(rigid.scale, 1.0);
        assert_relative_eq!(rigid.transform.scale_factor(), 1.0, epsilon = 1e-5);
    }

    #[test]
    fn test_reflected_target_still_gives_rotation() {
        let source = sample_points();
        let target: Vec<Point3f> = source.iter().map(|p| Point3f::new(-p.x, p.y, p.z)).collect();

        let solution = LandmarkTransform::rigid().solve(&source, &target).unwrap();
        assert_relative_eq!(solution.transform.linear().determinant(), 1.0, epsilon = 1e-5);
    }

    #[test]
    fn test_insufficient_landmarks() {
        let source = sample_points();
        let solver = LandmarkTransform::rigid();

        assert!(matches!(
            solver.solve(&source[..2], &source[..2]),
            Err(Error::InsufficientLandmarks { source_count: 2, target_count: 2 })
        ));
        assert!(matches!(
            solver.solve(&source, &source[..4]),
            Err(Error::InsufficientLandmarks { source_count: 6, target_count: 4 })
        ));
    }

    #[test]
    fn test_collinear_landmarks_are_flagged() {
        let source: Vec<Point3f> = (0..5).map(|i| Point3f::new(i as f32, 0.0, 0.0)).collect();
        let target: Vec<Point3f> = source.iter().map(|p| p + Vector3f::new(0.0, 1.0, 0.0)).collect();

        let solution = LandmarkTransform::rigid().solve(&source, &target).unwrap();
        assert!(solution.is_degenerate());
        // the translation along the line is still recovered
        assert!(rms_error(&source, &target, &solution.transform) < 1e-5);
    }
}
