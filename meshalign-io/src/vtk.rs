//! Legacy VTK polydata support (ASCII only)
//!
//! The reader accepts both cell layouts: the classic `count size` lists where
//! every cell starts with its length, and the `OFFSETS`/`CONNECTIVITY` arrays
//! written by file version 5.1. Polygons are fanned into triangles and strips
//! are unrolled with alternating winding. Vertex and line cells are skipped.

use crate::tokens::Tokens;
use crate::{IoError, MeshReader, MeshWriter};
use meshalign_core::{Point3f, Result, TriangleMesh};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

pub struct VtkReader;
pub struct VtkWriter;

impl VtkReader {
    /// Parse the text of a legacy VTK file
    pub fn parse_str(content: &str) -> Result<TriangleMesh> {
        let mut lines = content.splitn(4, '\n');
        let version = lines.next().unwrap_or_default().trim();
        let _title = lines.next();
        let encoding = lines.next().unwrap_or_default().trim();
        let body = lines.next().unwrap_or_default();

        if !version.starts_with("# vtk DataFile") {
            return Err(IoError::parse("VTK: missing \"# vtk DataFile\" header").into());
        }
        if encoding.eq_ignore_ascii_case("BINARY") {
            return Err(IoError::InvalidFormat {
                format: "binary legacy VTK files are not supported".to_string(),
            }
            .into());
        }
        if !encoding.eq_ignore_ascii_case("ASCII") {
            return Err(IoError::parse(format!("VTK: unknown encoding {:?}", encoding)).into());
        }

        let mut tokens = Tokens::new("VTK", body);
        tokens.keyword("DATASET")?;
        let dataset = tokens.expect("dataset type")?;
        if !dataset.eq_ignore_ascii_case("POLYDATA") {
            return Err(IoError::InvalidFormat {
                format: format!("VTK dataset {} is not POLYDATA", dataset),
            }
            .into());
        }

        let mut vertices = Vec::new();
        let mut faces = Vec::new();

        while let Some(section) = tokens.next() {
            match section.to_ascii_uppercase().as_str() {
                "POINTS" => {
                    let count: usize = tokens.parse("point count")?;
                    let _data_type = tokens.expect("point data type")?;
                    vertices.reserve(count);
                    for _ in 0..count {
                        let x = tokens.parse::<f32>("point coordinate")?;
                        let y = tokens.parse::<f32>("point coordinate")?;
                        let z = tokens.parse::<f32>("point coordinate")?;
                        vertices.push(Point3f::new(x, y, z));
                    }
                }
                "POLYGONS" => {
                    for cell in read_cells(&mut tokens)? {
                        for k in 1..cell.len().saturating_sub(1) {
                            faces.push([cell[0], cell[k], cell[k + 1]]);
                        }
                    }
                }
                "TRIANGLE_STRIPS" => {
                    for cell in read_cells(&mut tokens)? {
                        for (i, w) in cell.windows(3).enumerate() {
                            if w[0] == w[1] || w[1] == w[2] || w[0] == w[2] {
                                continue;
                            }
                            faces.push(if i % 2 == 0 { [w[0], w[1], w[2]] } else { [w[1], w[0], w[2]] });
                        }
                    }
                }
                "VERTICES" | "LINES" => {
                    read_cells(&mut tokens)?;
                }
                // attribute data follows the geometry
                "POINT_DATA" | "CELL_DATA" | "FIELD" | "METADATA" => break,
                other => return Err(tokens.error(format!("unexpected section {:?}", other)).into()),
            }
        }

        let mesh = TriangleMesh::from_vertices_and_faces(vertices, faces);
        if !mesh.has_valid_faces() {
            return Err(IoError::parse("VTK cell references a missing point").into());
        }
        Ok(mesh)
    }
}

/// Read one cell section after its keyword, in either layout
fn read_cells(tokens: &mut Tokens<'_>) -> std::result::Result<Vec<Vec<usize>>, IoError> {
    let count: usize = tokens.parse("cell count")?;
    let size: usize = tokens.parse("cell list size")?;

    if tokens.peek().map_or(false, |t| t.eq_ignore_ascii_case("OFFSETS")) {
        tokens.keyword("OFFSETS")?;
        let _offset_type = tokens.expect("offset data type")?;
        let offsets = (0..count)
            .map(|_| tokens.parse::<usize>("cell offset"))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        tokens.keyword("CONNECTIVITY")?;
        let _index_type = tokens.expect("connectivity data type")?;
        let connectivity = (0..size)
            .map(|_| tokens.parse::<usize>("point index"))
            .collect::<std::result::Result<Vec<_>, _>>()?;

        return offsets
            .windows(2)
            .map(|w| {
                connectivity
                    .get(w[0]..w[1])
                    .map(<[usize]>::to_vec)
                    .ok_or_else(|| tokens.error(format!("cell offsets {}..{} out of range", w[0], w[1])))
            })
            .collect();
    }

    let mut cells = Vec::with_capacity(count);
    let mut consumed = 0;
    for _ in 0..count {
        let length: usize = tokens.parse("cell length")?;
        let cell = (0..length)
            .map(|_| tokens.parse::<usize>("point index"))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        consumed += length + 1;
        cells.push(cell);
    }
    if consumed != size {
        return Err(tokens.error(format!("cell list size is {} but {} values were read", size, consumed)));
    }
    Ok(cells)
}

impl MeshReader for VtkReader {
    fn read_mesh<P: AsRef<Path>>(path: P) -> Result<TriangleMesh> {
        let bytes = std::fs::read(path)?;
        Self::parse_str(&String::from_utf8_lossy(&bytes))
    }
}

impl MeshWriter for VtkWriter {
    fn write_mesh<P: AsRef<Path>>(mesh: &TriangleMesh, path: P) -> Result<()> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);

        writeln!(writer, "# vtk DataFile Version 3.0")?;
        writeln!(writer, "meshalign")?;
        writeln!(writer, "ASCII")?;
        writeln!(writer, "DATASET POLYDATA")?;

        writeln!(writer, "POINTS {} float", mesh.vertex_count())?;
        for v in &mesh.vertices {
            writeln!(writer, "{} {} {}", v.x, v.y, v.z)?;
        }

        writeln!(writer, "POLYGONS {} {}", mesh.face_count(), mesh.face_count() * 4)?;
        for [a, b, c] in &mesh.faces {
            writeln!(writer, "3 {} {} {}", a, b, c)?;
        }

        writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use meshalign_core::Error;

    const SQUARE: &str = "# vtk DataFile Version 3.0
unit square
ASCII
DATASET POLYDATA
POINTS 5 float
0 0 0  1 0 0  1 1 0
0 1 0  0.5 0.5 1
VERTICES 1 2
1 4
POLYGONS 2 9
4 0 1 2 3
3 0 1 4
POINT_DATA 5
SCALARS height float 1
LOOKUP_TABLE default
0 0 0 0 1
";

    #[test]
    fn test_polygons_are_fanned() {
        let mesh = VtkReader::parse_str(SQUARE).unwrap();

        assert_eq!(mesh.vertex_count(), 5);
        assert_eq!(mesh.vertices[4], Point3f::new(0.5, 0.5, 1.0));
        assert_eq!(mesh.faces, vec![[0, 1, 2], [0, 2, 3], [0, 1, 4]]);
    }

    #[test]
    fn test_triangle_strips_alternate_winding() {
        let content = "# vtk DataFile Version 2.0
strip
ascii
DATASET POLYDATA
POINTS 5 double
0 0 0 0 1 0 1 0 0 1 1 0 2 0 0
TRIANGLE_STRIPS 1 6
5 0 1 2 3 4
";
        let mesh = VtkReader::parse_str(content).unwrap();
        assert_eq!(mesh.faces, vec![[0, 1, 2], [2, 1, 3], [2, 3, 4]]);
    }

    #[test]
    fn test_offsets_and_connectivity_layout() {
        let content = "# vtk DataFile Version 5.1
new layout
ASCII
DATASET POLYDATA
POINTS 4 float
0 0 0 1 0 0 1 1 0 0 1 0
POLYGONS 3 7
OFFSETS vtktypeint64
0 3 7
CONNECTIVITY vtktypeint64
0 1 2
0 1 2 3
";
        let mesh = VtkReader::parse_str(content).unwrap();
        assert_eq!(mesh.faces, vec![[0, 1, 2], [0, 1, 2], [0, 2, 3]]);
    }

    #[test]
    fn test_non_finite_coordinates_are_read_as_written() {
        let content = SQUARE.replacen("0.5 0.5 1", "0.5 nan 1", 1);
        let mesh = VtkReader::parse_str(&content).unwrap();
        assert_eq!(mesh.first_non_finite_vertex(), Some(4));
    }

    #[test]
    fn test_malformed_files_are_rejected() {
        let binary = SQUARE.replacen("ASCII", "BINARY", 1);
        assert!(matches!(VtkReader::parse_str(&binary), Err(Error::UnsupportedFormat(_))));

        let grid = SQUARE.replacen("POLYDATA", "UNSTRUCTURED_GRID", 1);
        assert!(matches!(VtkReader::parse_str(&grid), Err(Error::UnsupportedFormat(_))));

        let no_header = SQUARE.replacen("# vtk DataFile Version 3.0", "vtk", 1);
        assert!(matches!(VtkReader::parse_str(&no_header), Err(Error::Parse(_))));

        let bad_size = SQUARE.replacen("POLYGONS 2 9", "POLYGONS 2 8", 1);
        assert!(matches!(VtkReader::parse_str(&bad_size), Err(Error::Parse(_))));

        let out_of_range = SQUARE.replacen("3 0 1 4", "3 0 1 9", 1);
        assert!(matches!(VtkReader::parse_str(&out_of_range), Err(Error::Parse(_))));

        let truncated = SQUARE.replacen("0 1 0  0.5 0.5 1", "0 1 0", 1);
        assert!(matches!(VtkReader::parse_str(&truncated), Err(Error::Parse(_))));
    }
}
