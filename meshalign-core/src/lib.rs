//! Core data structures and traits for meshalign
//!
//! This crate provides the fundamental types shared by the alignment pipeline:
//! points, triangle meshes, homogeneous transforms, the error type and the
//! traits at the seams between stages.

pub mod point;
pub mod mesh;
pub mod traits;
pub mod transform;
pub mod error;

pub use point::*;
pub use mesh::*;
pub use traits::*;
pub use transform::*;
pub use error::*;

/// Re-export commonly used types from nalgebra
pub use nalgebra::{Point3, Vector3, Matrix3, Matrix4, UnitQuaternion};
