//! Core traits for meshalign

use crate::{mesh::*, point::*, transform::Transform3D, Result};

/// Trait for nearest neighbor search functionality
pub trait NearestNeighborSearch {
    /// Find the closest indexed point to `query` as `(index, distance)`
    fn find_nearest(&self, query: &Point3f) -> Option<(usize, f32)>;
}

/// Trait for objects with spatial extent
pub trait Drawable {
    /// Get the bounding box of the object
    fn bounding_box(&self) -> (Point3f, Point3f);

    /// Get the center point of the object
    fn center(&self) -> Point3f {
        let (min, max) = self.bounding_box();
        nalgebra::center(&min, &max)
    }
}

/// Trait for objects that can be transformed
pub trait Transformable {
    /// Apply a transformation to the object
    fn transform(&mut self, transform: &Transform3D);
}

/// Receiver for the outcome of an alignment, typically a viewer or exporter.
///
/// `transform` maps `source` (as originally loaded) onto the selected alignment.
pub trait AlignmentSink {
    fn present(
        &mut self,
        source: &TriangleMesh,
        target: &TriangleMesh,
        transform: &Transform3D,
    ) -> Result<()>;
}

impl Drawable for [Point3f] {
    fn bounding_box(&self) -> (Point3f, Point3f) {
        bounds(self).unwrap_or((Point3f::origin(), Point3f::origin()))
    }
}

impl Drawable for TriangleMesh {
    fn bounding_box(&self) -> (Point3f, Point3f) {
        self.vertices.as_slice().bounding_box()
    }
}
