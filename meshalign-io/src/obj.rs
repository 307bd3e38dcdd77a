//! OBJ format support

use crate::{IoError, MeshReader, MeshWriter};
use meshalign_core::{Point3f, Result, TriangleMesh, Vector3f};
use obj::{IndexTuple, ObjData};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

pub struct ObjReader;
pub struct ObjWriter;

impl MeshReader for ObjReader {
    fn read_mesh<P: AsRef<Path>>(path: P) -> Result<TriangleMesh> {
        let file = File::open(path)?;
        let data = ObjData::load_buf(BufReader::new(file))
            .map_err(|e| IoError::parse(format!("OBJ: {e}")))?;

        let vertices: Vec<Point3f> = data
            .position
            .iter()
            .map(|p| Point3f::new(p[0], p[1], p[2]))
            .collect();

        // Polygons are fanned into triangles; groups and objects are flattened
        let mut faces = Vec::new();
        let mut normal_slots: Vec<Option<usize>> = vec![None; vertices.len()];
        for group in data.objects.iter().flat_map(|object| object.groups.iter()) {
            for poly in &group.polys {
                let corners: &[IndexTuple] = &poly.0;
                for tuple in corners {
                    if let (Some(slot), Some(n)) = (normal_slots.get_mut(tuple.0), tuple.2) {
                        slot.get_or_insert(n);
                    }
                }
                for k in 1..corners.len().saturating_sub(1) {
                    faces.push([corners[0].0, corners[k].0, corners[k + 1].0]);
                }
            }
        }

        let normals = normal_slots
            .iter()
            .map(|slot| slot.and_then(|n| data.normal.get(n)))
            .map(|n| n.map(|n| Vector3f::new(n[0], n[1], n[2])))
            .collect::<Option<Vec<_>>>()
            .filter(|normals| !normals.is_empty());

        let mut mesh = TriangleMesh::from_vertices_and_faces(vertices, faces);
        if !mesh.has_valid_faces() {
            return Err(IoError::parse("OBJ face references a missing vertex").into());
        }
        if let Some(normals) = normals {
            mesh.set_normals(normals);
        }

        Ok(mesh)
    }
}

impl MeshWriter for ObjWriter {
    fn write_mesh<P: AsRef<Path>>(mesh: &TriangleMesh, path: P) -> Result<()> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);

        writeln!(writer, "# {} vertices, {} faces", mesh.vertex_count(), mesh.face_count())?;
        for v in &mesh.vertices {
            writeln!(writer, "v {} {} {}", v.x, v.y, v.z)?;
        }

        match &mesh.normals {
            Some(normals) => {
                for n in normals {
                    writeln!(writer, "vn {} {} {}", n.x, n.y, n.z)?;
                }
                for [a, b, c] in &mesh.faces {
                    writeln!(writer, "f {0}//{0} {1}//{1} {2}//{2}", a + 1, b + 1, c + 1)?;
                }
            }
            None => {
                for [a, b, c] in &mesh.faces {
                    writeln!(writer, "f {} {} {}", a + 1, b + 1, c + 1)?;
                }
            }
        }

        writer.flush()?;
        Ok(())
    }
}
