//! Movie.BYU geometry support (`.g`)
//!
//! Layout: a header `parts points polygons edges`, one `first last` polygon
//! range per part, the point coordinates, then 1-based polygon connectivity
//! where a negated index closes each polygon. Parts are merged on read.

use crate::tokens::Tokens;
use crate::{IoError, MeshReader, MeshWriter};
use meshalign_core::{Point3f, Result, TriangleMesh};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

pub struct ByuReader;
pub struct ByuWriter;

impl ByuReader {
    pub fn parse_str(content: &str) -> Result<TriangleMesh> {
        let mut tokens = Tokens::new("BYU", content);

        let parts: usize = tokens.parse("part count")?;
        let point_count: usize = tokens.parse("point count")?;
        let polygon_count: usize = tokens.parse("polygon count")?;
        let _edge_count: usize = tokens.parse("edge count")?;

        for _ in 0..parts {
            tokens.parse::<usize>("part start")?;
            tokens.parse::<usize>("part end")?;
        }

        let mut vertices = Vec::with_capacity(point_count);
        for _ in 0..point_count {
            let x = tokens.parse::<f32>("point coordinate")?;
            let y = tokens.parse::<f32>("point coordinate")?;
            let z = tokens.parse::<f32>("point coordinate")?;
            vertices.push(Point3f::new(x, y, z));
        }

        let mut faces = Vec::with_capacity(polygon_count);
        let mut polygon = Vec::new();
        for _ in 0..polygon_count {
            polygon.clear();
            loop {
                let index: i64 = tokens.parse("polygon index")?;
                if index == 0 {
                    return Err(tokens.error("polygon index 0 (indices are 1-based)").into());
                }
                polygon.push(index.unsigned_abs() as usize - 1);
                if index < 0 {
                    break;
                }
            }
            for k in 1..polygon.len().saturating_sub(1) {
                faces.push([polygon[0], polygon[k], polygon[k + 1]]);
            }
        }

        let mesh = TriangleMesh::from_vertices_and_faces(vertices, faces);
        if !mesh.has_valid_faces() {
            return Err(IoError::parse("BYU polygon references a missing point").into());
        }
        Ok(mesh)
    }
}

impl MeshReader for ByuReader {
    fn read_mesh<P: AsRef<Path>>(path: P) -> Result<TriangleMesh> {
        let bytes = std::fs::read(path)?;
        Self::parse_str(&String::from_utf8_lossy(&bytes))
    }
}

impl MeshWriter for ByuWriter {
    fn write_mesh<P: AsRef<Path>>(mesh: &TriangleMesh, path: P) -> Result<()> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);

        writeln!(writer, "1 {} {} {}", mesh.vertex_count(), mesh.face_count(), mesh.face_count() * 3)?;
        writeln!(writer, "1 {}", mesh.face_count())?;
        for v in &mesh.vertices {
            writeln!(writer, "{} {} {}", v.x, v.y, v.z)?;
        }
        for [a, b, c] in &mesh.faces {
            writeln!(writer, "{} {} -{}", a + 1, b + 1, c + 1)?;
        }

        writer.flush()?;
        Ok(())
    }
}
