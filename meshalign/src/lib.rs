//! # meshalign
//!
//! Rigid alignment of one 3D surface mesh onto another.
//!
//! This is the umbrella crate that provides convenient access to all meshalign
//! functionality. Use the individual crates for more granular control over
//! dependencies.
//!
//! ## Features
//!
//! - **Core**: Points, triangle meshes, transforms and the error type
//! - **Algorithms**: OBB trees, landmark registration, ICP, Hausdorff scoring
//!   and the [`MeshAligner`](algorithms::MeshAligner) pipeline
//! - **I/O**: PLY, OBJ and STL reading and writing
//!
//! ## Quick Start
//!
//! ```rust
//! use meshalign::prelude::*;
//!
//! let source = TriangleMesh::sphere(1.0, 8, 8);
//! let target = source.transformed(&Transform3D::translation(Vector3f::new(0.5, 0.0, 0.0)));
//!
//! let report = MeshAligner::default().align(&source, &target).unwrap();
//! assert!(report.min_distance <= report.distance_before);
//! ```
//!
//! ## Feature Flags
//!
//! - `default`: Enables algorithms and io
//! - `algorithms`: Alignment algorithms
//! - `io`: File format support
//! - `all`: Enables all features

// Re-export core functionality
pub use meshalign_core::*;

// Re-export sub-crates
#[cfg(feature = "algorithms")]
pub use meshalign_algorithms as algorithms;

#[cfg(feature = "io")]
pub use meshalign_io as io;

/// Convenient imports for common use cases
pub mod prelude {
    pub use meshalign_core::*;

    #[cfg(feature = "algorithms")]
    pub use meshalign_algorithms::*;

    #[cfg(feature = "io")]
    pub use meshalign_io::*;
}
