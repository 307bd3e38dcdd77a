//! STL format support (ASCII and binary)

use crate::{IoError, MeshReader, MeshWriter};
use meshalign_core::{Point3f, Result, TriangleMesh};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;
use stl_io::{Normal, Triangle, Vertex};

pub struct StlReader;
pub struct StlWriter;

impl MeshReader for StlReader {
    fn read_mesh<P: AsRef<Path>>(path: P) -> Result<TriangleMesh> {
        let file = File::open(path)?;
        let mut reader = BufReader::new(file);

        // stl_io merges coincident vertices into an indexed mesh
        let stl = stl_io::read_stl(&mut reader).map_err(|e| IoError::parse(format!("STL: {e}")))?;

        let vertices: Vec<Point3f> = stl
            .vertices
            .iter()
            .map(|v| Point3f::new(v[0], v[1], v[2]))
            .collect();
        let faces: Vec<[usize; 3]> = stl.faces.iter().map(|face| face.vertices).collect();

        let mesh = TriangleMesh::from_vertices_and_faces(vertices, faces);
        if !mesh.has_valid_faces() {
            return Err(IoError::parse("STL face references a missing vertex").into());
        }
        Ok(mesh)
    }
}

impl MeshWriter for StlWriter {
    fn write_mesh<P: AsRef<Path>>(mesh: &TriangleMesh, path: P) -> Result<()> {
        if !mesh.has_valid_faces() {
            return Err(IoError::WriteError {
                message: "mesh face references a missing vertex".to_string(),
            }
            .into());
        }

        let triangles: Vec<Triangle> = mesh
            .faces
            .iter()
            .map(|&[a, b, c]| {
                let (pa, pb, pc) = (mesh.vertices[a], mesh.vertices[b], mesh.vertices[c]);
                let n = (pb - pa).cross(&(pc - pa));
                let n = if n.norm() > f32::EPSILON { n.normalize() } else { n };
                Triangle {
                    normal: Normal::new([n.x, n.y, n.z]),
                    vertices: [pa, pb, pc].map(|p| Vertex::new([p.x, p.y, p.z])),
                }
            })
            .collect();

        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        stl_io::write_stl(&mut writer, triangles.iter())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_stl_binary_roundtrip_merges_vertices() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("sphere.stl");

        let mesh = TriangleMesh::sphere(0.5, 8, 8);
        StlWriter::write_mesh(&mesh, &path).unwrap();
        let loaded = StlReader::read_mesh(&path).unwrap();

        assert_eq!(loaded.face_count(), mesh.face_count());
        assert_eq!(loaded.vertex_count(), mesh.vertex_count());
    }

    #[test]
    fn test_stl_ascii() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("triangle.stl");
        let stl_content = "solid tri
  facet normal 0 0 1
    outer loop
      vertex 0 0 0
      vertex 1 0 0
      vertex 0 1 0
    endloop
  endfacet
endsolid tri
";
        std::fs::write(&path, stl_content).unwrap();

        let mesh = StlReader::read_mesh(&path).unwrap();
        assert_eq!(mesh.vertex_count(), 3);
        assert_eq!(mesh.face_count(), 1);
    }
}
