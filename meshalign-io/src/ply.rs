//! PLY format support

use crate::{IoError, MeshReader, MeshWriter};
use meshalign_core::{Point3f, Result, TriangleMesh, Vector3f};
use ply_rs::{
    parser::Parser,
    ply::{Addable, DefaultElement, ElementDef, Ply, Property, PropertyDef, PropertyType, ScalarType},
    writer::Writer,
};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

pub struct PlyReader;
pub struct PlyWriter;

impl MeshReader for PlyReader {
    fn read_mesh<P: AsRef<Path>>(path: P) -> Result<TriangleMesh> {
        let file = File::open(path)?;
        let mut reader = BufReader::new(file);

        // Parse PLY header and payload
        let parser = Parser::<DefaultElement>::new();
        let ply = parser.read_ply(&mut reader)?;

        // Extract vertices
        let mut vertices = Vec::new();
        if let Some(vertex_element) = ply.payload.get("vertex") {
            for vertex in vertex_element {
                let x = extract_property_value(vertex, "x")?;
                let y = extract_property_value(vertex, "y")?;
                let z = extract_property_value(vertex, "z")?;

                vertices.push(Point3f::new(x, y, z));
            }
        }

        // Extract faces, fanning polygons into triangles
        let mut faces = Vec::new();
        if let Some(face_element) = ply.payload.get("face") {
            for face in face_element {
                let indices = extract_face_indices(face)?;
                for k in 1..indices.len().saturating_sub(1) {
                    faces.push([indices[0], indices[k], indices[k + 1]]);
                }
            }
        }

        // Extract normals if every vertex has them
        let normals = ply.payload.get("vertex").and_then(|vertex_element| {
            vertex_element
                .iter()
                .map(|vertex| {
                    Some(Vector3f::new(
                        extract_property_value(vertex, "nx").ok()?,
                        extract_property_value(vertex, "ny").ok()?,
                        extract_property_value(vertex, "nz").ok()?,
                    ))
                })
                .collect::<Option<Vec<_>>>()
                .filter(|normals| !normals.is_empty())
        });

        let mut mesh = TriangleMesh::from_vertices_and_faces(vertices, faces);
        if !mesh.has_valid_faces() {
            return Err(IoError::parse("PLY face references a missing vertex").into());
        }
        if let Some(normals) = normals {
            mesh.set_normals(normals);
        }

        Ok(mesh)
    }
}

impl MeshWriter for PlyWriter {
    fn write_mesh<P: AsRef<Path>>(mesh: &TriangleMesh, path: P) -> Result<()> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);

        let mut ply = Ply::<DefaultElement>::new();

        // Define vertex element
        let mut vertex_element = ElementDef::new("vertex".to_string());
        vertex_element.count = mesh.vertices.len();
        let mut scalar_names = vec!["x", "y", "z"];
        if mesh.normals.is_some() {
            scalar_names.extend(["nx", "ny", "nz"]);
        }
        for name in scalar_names {
            vertex_element.properties.add(PropertyDef::new(
                name.to_string(),
                PropertyType::Scalar(ScalarType::Float),
            ));
        }
        ply.header.elements.add(vertex_element);

        // Define face element
        let mut face_element = ElementDef::new("face".to_string());
        face_element.count = mesh.faces.len();
        face_element.properties.add(PropertyDef::new(
            "vertex_indices".to_string(),
            PropertyType::List(ScalarType::UChar, ScalarType::Int),
        ));
        ply.header.elements.add(face_element);

        // Add vertex data
        let mut vertices = Vec::with_capacity(mesh.vertices.len());
        for (i, vertex) in mesh.vertices.iter().enumerate() {
            let mut element = DefaultElement::new();
            element.insert("x".to_string(), Property::Float(vertex.x));
            element.insert("y".to_string(), Property::Float(vertex.y));
            element.insert("z".to_string(), Property::Float(vertex.z));

            if let Some(normal) = mesh.normals.as_ref().and_then(|normals| normals.get(i)) {
                element.insert("nx".to_string(), Property::Float(normal.x));
                element.insert("ny".to_string(), Property::Float(normal.y));
                element.insert("nz".to_string(), Property::Float(normal.z));
            }

            vertices.push(element);
        }
        ply.payload.insert("vertex".to_string(), vertices);

        // Add face data
        let mut faces = Vec::with_capacity(mesh.faces.len());
        for face in &mesh.faces {
            let indices = face
                .iter()
                .map(|&idx| {
                    i32::try_from(idx).map_err(|_| IoError::WriteError {
                        message: format!("vertex index {idx} does not fit a PLY int"),
                    })
                })
                .collect::<std::result::Result<Vec<_>, _>>()?;
            let mut element = DefaultElement::new();
            element.insert("vertex_indices".to_string(), Property::ListInt(indices));
            faces.push(element);
        }
        ply.payload.insert("face".to_string(), faces);

        let writer_instance = Writer::new();
        writer_instance.write_ply(&mut writer, &mut ply)?;

        Ok(())
    }
}

/// Extract a property value as f32 from a PLY element
fn extract_property_value(element: &DefaultElement, name: &str) -> std::result::Result<f32, IoError> {
    match element.get(name) {
        Some(Property::Float(val)) => Ok(*val),
        Some(Property::Double(val)) => Ok(*val as f32),
        Some(Property::Int(val)) => Ok(*val as f32),
        Some(Property::UInt(val)) => Ok(*val as f32),
        Some(Property::Short(val)) => Ok(*val as f32),
        Some(Property::UShort(val)) => Ok(*val as f32),
        Some(Property::Char(val)) => Ok(*val as f32),
        Some(Property::UChar(val)) => Ok(*val as f32),
        _ => Err(IoError::parse(format!(
            "Property '{}' not found or invalid type",
            name
        ))),
    }
}

/// Extract face indices from a PLY face element
fn extract_face_indices(element: &DefaultElement) -> std::result::Result<Vec<usize>, IoError> {
    fn convert<T: Copy + TryInto<usize>>(indices: &[T]) -> std::result::Result<Vec<usize>, IoError> {
        indices
            .iter()
            .map(|&idx| {
                idx.try_into()
                    .map_err(|_| IoError::parse("Negative face index"))
            })
            .collect()
    }

    match element.get("vertex_indices").or_else(|| element.get("vertex_index")) {
        Some(Property::ListInt(indices)) => convert(indices),
        Some(Property::ListUInt(indices)) => convert(indices),
        Some(Property::ListShort(indices)) => convert(indices),
        Some(Property::ListUShort(indices)) => convert(indices),
        Some(Property::ListUChar(indices)) => convert(indices),
        _ => Err(IoError::parse("Face indices not found")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use tempfile::tempdir;

    #[test]
    fn test_ply_mesh_roundtrip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("sphere.ply");

        let mesh = TriangleMesh::sphere(0.5, 8, 8);
        PlyWriter::write_mesh(&mesh, &path).unwrap();
        let loaded = PlyReader::read_mesh(&path).unwrap();

        assert_eq!(loaded.vertex_count(), mesh.vertex_count());
        assert_eq!(loaded.faces, mesh.faces);
        for (a, b) in mesh.vertices.iter().zip(&loaded.vertices) {
            assert_relative_eq!(a, b, epsilon = 1e-6);
        }
        assert!(loaded.normals.is_none());
    }

    #[test]
    fn test_ply_ascii_quads_and_normals() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("quad.ply");
        let ply_content = "ply
format ascii 1.0
comment two triangles and a quad
element vertex 4
property float x
property float y
property float z
property float nx
property float ny
property float nz
element face 1
property list uchar int vertex_indices
end_header
0.0 0.0 0.0 0.0 0.0 1.0
1.0 0.0 0.0 0.0 0.0 1.0
1.0 1.0 0.0 0.0 0.0 1.0
0.0 1.0 0.0 0.0 0.0 1.0
4 0 1 2 3
";
        std::fs::write(&path, ply_content).unwrap();

        let mesh = PlyReader::read_mesh(&path).unwrap();
        assert_eq!(mesh.vertex_count(), 4);
        assert_eq!(mesh.faces, vec![[0, 1, 2], [0, 2, 3]]);
        assert_eq!(mesh.normals.as_ref().map(Vec::len), Some(4));
    }

    #[test]
    fn test_ply_face_out_of_range() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("broken.ply");
        let ply_content = "ply
format ascii 1.0
element vertex 3
property float x
property float y
property float z
element face 1
property list uchar int vertex_indices
end_header
0 0 0
1 0 0
0 1 0
3 0 1 7
";
        std::fs::write(&path, ply_content).unwrap();

        assert!(matches!(
            PlyReader::read_mesh(&path),
            Err(meshalign_core::Error::Parse(_))
        ));
    }
}
