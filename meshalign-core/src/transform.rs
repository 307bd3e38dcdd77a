//! 3D transformation utilities

use nalgebra::{Matrix3, Matrix4, Point3, UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};

/// A coordinate axis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    /// All three axes in X, Y, Z order
    pub const ALL: [Axis; 3] = [Axis::X, Axis::Y, Axis::Z];

    /// Unit vector along this axis
    pub fn unit(self) -> Vector3<f32> {
        match self {
            Axis::X => Vector3::x(),
            Axis::Y => Vector3::y(),
            Axis::Z => Vector3::z(),
        }
    }
}

impl std::fmt::Display for Axis {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Axis::X => write!(f, "X"),
            Axis::Y => write!(f, "Y"),
            Axis::Z => write!(f, "Z"),
        }
    }
}

/// A 3D homogeneous transformation (rotation, translation and optional uniform scale)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform3D {
    pub matrix: Matrix4<f32>,
}

impl Transform3D {
    /// Create an identity transformation
    pub fn identity() -> Self {
        Self {
            matrix: Matrix4::identity(),
        }
    }

    /// Create a translation transformation
    pub fn translation(translation: Vector3<f32>) -> Self {
        Self {
            matrix: Matrix4::new_translation(&translation),
        }
    }

    /// Create a rotation transformation from a quaternion
    pub fn rotation(rotation: UnitQuaternion<f32>) -> Self {
        Self {
            matrix: rotation.to_homogeneous(),
        }
    }

    /// Create a uniform scaling transformation
    pub fn uniform_scaling(scale: f32) -> Self {
        Self {
            matrix: Matrix4::new_scaling(scale),
        }
    }

    /// Create `p -> scale * R * p + t` from its parts
    pub fn from_similarity(rotation: &Matrix3<f32>, translation: &Vector3<f32>, scale: f32) -> Self {
        let mut matrix = Matrix4::identity();
        matrix
            .fixed_view_mut::<3, 3>(0, 0)
            .copy_from(&(rotation * scale));
        matrix.fixed_view_mut::<3, 1>(0, 3).copy_from(translation);
        Self { matrix }
    }

    /// Rotation by `steps` quarter turns about `axis`, pivoting on `center`.
    ///
    /// Sines and cosines are exact (0, ±1), so a step of 0 is exactly the identity.
    pub fn quarter_turn_about(center: &Point3<f32>, axis: Axis, steps: u8) -> Self {
        let (c, s) = match steps % 4 {
            0 => (1.0, 0.0),
            1 => (0.0, 1.0),
            2 => (-1.0, 0.0),
            _ => (0.0, -1.0),
        };

        #[rustfmt::skip]
        let rotation = match axis {
            Axis::X => Matrix3::new(
                1.0, 0.0, 0.0,
                0.0, c,   -s,
                0.0, s,   c,
            ),
            Axis::Y => Matrix3::new(
                c,   0.0, s,
                0.0, 1.0, 0.0,
                -s,  0.0, c,
            ),
            Axis::Z => Matrix3::new(
                c,   -s,  0.0,
                s,   c,   0.0,
                0.0, 0.0, 1.0,
            ),
        };

        let to_center = Self::translation(center.coords);
        let from_center = Self::translation(-center.coords);
        to_center * Self::from_similarity(&rotation, &Vector3::zeros(), 1.0) * from_center
    }

    /// Linear (rotation and scale) part of the transformation
    pub fn linear(&self) -> Matrix3<f32> {
        self.matrix.fixed_view::<3, 3>(0, 0).into_owned()
    }

    /// Translation part of the transformation
    pub fn translation_part(&self) -> Vector3<f32> {
        self.matrix.fixed_view::<3, 1>(0, 3).into_owned()
    }

    /// Uniform scale factor, assuming the linear part is a scaled rotation
    pub fn scale_factor(&self) -> f32 {
        self.linear().determinant().abs().cbrt()
    }

    /// Apply the transformation to a point
    pub fn transform_point(&self, point: &Point3<f32>) -> Point3<f32> {
        let homogeneous = self.matrix * point.to_homogeneous();
        Point3::from_homogeneous(homogeneous).unwrap_or(*point)
    }

    /// Apply the transformation to every point of a set, out of place
    pub fn transform_points(&self, points: &[Point3<f32>]) -> Vec<Point3<f32>> {
        points.iter().map(|p| self.transform_point(p)).collect()
    }

    /// Apply the transformation to a vector
    pub fn transform_vector(&self, vector: &Vector3<f32>) -> Vector3<f32> {
        self.matrix.fixed_view::<3, 3>(0, 0) * vector
    }

    /// Compose this transformation with another (`other` is applied first)
    pub fn compose(self, other: Self) -> Self {
        Self {
            matrix: self.matrix * other.matrix,
        }
    }

    /// Get the inverse transformation
    pub fn inverse(self) -> Option<Self> {
        self.matrix.try_inverse().map(|inv_matrix| Self {
            matrix: inv_matrix,
        })
    }

    /// Check if this is approximately the identity transformation
    pub fn is_identity(&self, epsilon: f32) -> bool {
        let identity = Matrix4::identity();
        (self.matrix - identity).norm() < epsilon
    }
}

impl Default for Transform3D {
    fn default() -> Self {
        Self::identity()
    }
}

impl std::ops::Mul for Transform3D {
    type Output = Self;

    fn mul(self, rhs: Self) -> Self::Output {
        self.compose(rhs)
    }
}
