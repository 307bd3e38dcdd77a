//! # Meshalign Algorithms
//!
//! Algorithms for rigidly aligning one triangle mesh to another.
//!
//! This crate provides oriented bounding box trees, closed-form landmark
//! registration, a quarter-turn rotation search over box corners, iterative
//! closest point refinement and Hausdorff distance scoring, tied together by
//! [`MeshAligner`].

pub mod nearest_neighbor;
pub mod distance;
pub mod landmark;
pub mod obb;
pub mod rotation_search;
pub mod registration;
pub mod alignment;

// Re-export commonly used items
pub use nearest_neighbor::*;
pub use distance::*;
pub use landmark::*;
pub use obb::*;
pub use rotation_search::*;
pub use registration::*;
pub use alignment::*;
