//! Mesh data structures and functionality

use crate::point::*;
use crate::transform::Transform3D;
use crate::traits::Transformable;
use serde::{Deserialize, Serialize};

/// A triangle mesh with vertices and faces
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriangleMesh {
    pub vertices: Vec<Point3f>,
    pub faces: Vec<[usize; 3]>,
    pub normals: Option<Vec<Vector3f>>,
}

impl TriangleMesh {
    /// Create a new empty mesh
    pub fn new() -> Self {
        Self {
            vertices: Vec::new(),
            faces: Vec::new(),
            normals: None,
        }
    }

    /// Create a mesh from vertices and faces
    pub fn from_vertices_and_faces(vertices: Vec<Point3f>, faces: Vec<[usize; 3]>) -> Self {
        Self {
            vertices,
            faces,
            normals: None,
        }
    }

    /// Latitude/longitude sphere centred at the origin.
    ///
    /// `theta_resolution` is the number of points around each ring and
    /// `phi_resolution` the number of points from pole to pole, both clamped to
    /// at least 3. The two poles come first, followed by the rings from north to
    /// south. With `(0.5, 8, 8)` this is the mesh substituted for unreadable
    /// input files.
    pub fn sphere(radius: f32, theta_resolution: usize, phi_resolution: usize) -> Self {
        let theta_res = theta_resolution.max(3);
        let phi_res = phi_resolution.max(3);
        let rings = phi_res - 2;

        let mut vertices = Vec::with_capacity(2 + rings * theta_res);
        vertices.push(Point3f::new(0.0, 0.0, radius));
        vertices.push(Point3f::new(0.0, 0.0, -radius));

        for j in 1..=rings {
            let phi = std::f32::consts::PI * j as f32 / (phi_res - 1) as f32;
            for i in 0..theta_res {
                let theta = 2.0 * std::f32::consts::PI * i as f32 / theta_res as f32;
                vertices.push(Point3f::new(
                    radius * phi.sin() * theta.cos(),
                    radius * phi.sin() * theta.sin(),
                    radius * phi.cos(),
                ));
            }
        }

        let ring = |j: usize, i: usize| 2 + (j - 1) * theta_res + (i % theta_res);

        let mut faces = Vec::with_capacity(2 * theta_res * (rings - 1) + 2 * theta_res);
        for i in 0..theta_res {
            faces.push([0, ring(1, i), ring(1, i + 1)]);
        }
        for j in 1..rings {
            for i in 0..theta_res {
                let a = ring(j, i);
                let b = ring(j, i + 1);
                let c = ring(j + 1, i);
                let d = ring(j + 1, i + 1);
                faces.push([a, c, d]);
                faces.push([a, d, b]);
            }
        }
        for i in 0..theta_res {
            faces.push([1, ring(rings, i + 1), ring(rings, i)]);
        }

        Self::from_vertices_and_faces(vertices, faces)
    }

    /// Get the number of vertices
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Get the number of faces
    pub fn face_count(&self) -> usize {
        self.faces.len()
    }

    /// Check if the mesh is empty
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty() || self.faces.is_empty()
    }

    /// Set vertex normals
    pub fn set_normals(&mut self, normals: Vec<Vector3f>) {
        if normals.len() == self.vertices.len() {
            self.normals = Some(normals);
        }
    }

    /// Mean of the vertex positions
    pub fn centroid(&self) -> Option<Point3f> {
        centroid(&self.vertices)
    }

    /// Check that every face references an existing vertex
    pub fn has_valid_faces(&self) -> bool {
        let n = self.vertices.len();
        self.faces.iter().all(|f| f.iter().all(|&i| i < n))
    }

    /// Index of the first vertex with a NaN or infinite coordinate
    pub fn first_non_finite_vertex(&self) -> Option<usize> {
        self.vertices
            .iter()
            .position(|v| !v.coords.iter().all(|c| c.is_finite()))
    }

    /// Copy of this mesh with `transform` applied to every vertex.
    ///
    /// Topology is shared unchanged; normals are rotated and re-normalized.
    pub fn transformed(&self, transform: &Transform3D) -> Self {
        let mut mesh = self.clone();
        mesh.transform(transform);
        mesh
    }
}

impl Transformable for TriangleMesh {
    fn transform(&mut self, transform: &Transform3D) {
        for vertex in &mut self.vertices {
            *vertex = transform.transform_point(vertex);
        }
        if let Some(normals) = &mut self.normals {
            for normal in normals.iter_mut() {
                let rotated = transform.transform_vector(normal);
                *normal = rotated.try_normalize(f32::EPSILON).unwrap_or(rotated);
            }
        }
    }
}

impl Default for TriangleMesh {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::UnitQuaternion;

    #[test]
    fn test_default_sphere_layout() {
        let sphere = TriangleMesh::sphere(0.5, 8, 8);
        assert_eq!(sphere.vertex_count(), 50);
        // 8 + 8 cap triangles and 5 bands of 16
        assert_eq!(sphere.face_count(), 96);
        assert!(sphere.has_valid_faces());

        for v in &sphere.vertices {
            assert_relative_eq!(v.coords.norm(), 0.5, epsilon = 1e-6);
        }
        assert_relative_eq!(sphere.centroid().unwrap(), Point3f::origin(), epsilon = 1e-6);
    }

    #[test]
    fn test_sphere_resolution_is_clamped() {
        let sphere = TriangleMesh::sphere(1.0, 1, 2);
        assert_eq!(sphere.vertex_count(), 5);
        assert!(sphere.has_valid_faces());
    }

    #[test]
    fn test_non_finite_vertices_are_found() {
        let mut mesh = TriangleMesh::sphere(1.0, 6, 5);
        assert_eq!(mesh.first_non_finite_vertex(), None);

        mesh.vertices[7].y = f32::INFINITY;
        mesh.vertices[3].x = f32::NAN;
        assert_eq!(mesh.first_non_finite_vertex(), Some(3));
    }

    #[test]
    fn test_transformed_preserves_topology() {
        let mut mesh = TriangleMesh::sphere(1.0, 6, 5);
        mesh.set_normals(mesh.vertices.iter().map(|v| v.coords.normalize()).collect());

        let rotation = UnitQuaternion::from_euler_angles(0.3, 0.1, -0.7);
        let t = Transform3D::translation(Vector3f::new(1.0, 2.0, 3.0)) * Transform3D::rotation(rotation);
        let moved = mesh.transformed(&t);

        assert_eq!(moved.faces, mesh.faces);
        assert_eq!(moved.vertex_count(), mesh.vertex_count());
        for (a, b) in mesh.vertices.iter().zip(&moved.vertices) {
            assert_relative_eq!(t.transform_point(a), *b);
        }
        for n in moved.normals.as_ref().unwrap() {
            assert_relative_eq!(n.norm(), 1.0, epsilon = 1e-5);
        }
        // the source mesh is untouched
        assert_relative_eq!(mesh.centroid().unwrap(), Point3f::origin(), epsilon = 1e-6);
    }
}
