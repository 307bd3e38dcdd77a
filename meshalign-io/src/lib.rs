//! Mesh loading and export
//!
//! This crate reads and writes triangle meshes in PLY, OBJ, STL, legacy VTK
//! and BYU, and wraps format dispatch in a [`MeshLoader`] whose [`LoadPolicy`]
//! decides what happens when a path has no readable extension. VTK XML
//! (`.vtp`) is recognised but has no reader.

pub mod byu;
pub mod error;
pub mod obj;
pub mod ply;
pub mod stl;
mod tokens;
pub mod vtk;

pub use error::*;

use meshalign_core::{Error, Result, TriangleMesh};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Trait for reading meshes from files
pub trait MeshReader {
    fn read_mesh<P: AsRef<Path>>(path: P) -> Result<TriangleMesh>;
}

/// Trait for writing meshes to files
pub trait MeshWriter {
    fn write_mesh<P: AsRef<Path>>(mesh: &TriangleMesh, path: P) -> Result<()>;
}

/// Mesh file formats recognised by extension
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MeshFormat {
    Ply,
    Obj,
    Stl,
    /// Legacy VTK (`.vtk`)
    Vtk,
    /// VTK XML polydata (`.vtp`)
    Vtp,
    /// BYU geometry (`.g`)
    Byu,
}

impl MeshFormat {
    /// Format for the lower-cased extension of `path`, if recognised
    pub fn from_path(path: &Path) -> Option<Self> {
        let extension = path.extension()?.to_str()?.to_ascii_lowercase();
        match extension.as_str() {
            "ply" => Some(MeshFormat::Ply),
            "obj" => Some(MeshFormat::Obj),
            "stl" => Some(MeshFormat::Stl),
            "vtk" => Some(MeshFormat::Vtk),
            "vtp" => Some(MeshFormat::Vtp),
            "g" => Some(MeshFormat::Byu),
            _ => None,
        }
    }

    /// Whether this crate has a reader for the format
    pub fn is_readable(self) -> bool {
        !matches!(self, MeshFormat::Vtp)
    }

    pub fn extension(self) -> &'static str {
        match self {
            MeshFormat::Ply => "ply",
            MeshFormat::Obj => "obj",
            MeshFormat::Stl => "stl",
            MeshFormat::Vtk => "vtk",
            MeshFormat::Vtp => "vtp",
            MeshFormat::Byu => "g",
        }
    }
}

/// Auto-detect format and read mesh
pub fn read_mesh<P: AsRef<Path>>(path: P) -> Result<TriangleMesh> {
    let path = path.as_ref();
    let format = MeshFormat::from_path(path).ok_or_else(|| {
        Error::UnsupportedFormat(format!("Unsupported mesh format: {:?}", path.extension()))
    })?;

    if !path.exists() {
        return Err(IoError::FileNotFound {
            path: path.display().to_string(),
        }
        .into());
    }

    match format {
        MeshFormat::Ply => ply::PlyReader::read_mesh(path),
        MeshFormat::Obj => obj::ObjReader::read_mesh(path),
        MeshFormat::Stl => stl::StlReader::read_mesh(path),
        MeshFormat::Vtk => vtk::VtkReader::read_mesh(path),
        MeshFormat::Byu => byu::ByuReader::read_mesh(path),
        other => Err(IoError::InvalidFormat {
            format: format!("no reader for .{} files", other.extension()),
        }
        .into()),
    }
}

/// Auto-detect format and write mesh
pub fn write_mesh<P: AsRef<Path>>(mesh: &TriangleMesh, path: P) -> Result<()> {
    let path = path.as_ref();
    match MeshFormat::from_path(path) {
        Some(MeshFormat::Ply) => ply::PlyWriter::write_mesh(mesh, path),
        Some(MeshFormat::Obj) => obj::ObjWriter::write_mesh(mesh, path),
        Some(MeshFormat::Stl) => stl::StlWriter::write_mesh(mesh, path),
        Some(MeshFormat::Vtk) => vtk::VtkWriter::write_mesh(mesh, path),
        Some(MeshFormat::Byu) => byu::ByuWriter::write_mesh(mesh, path),
        _ => Err(Error::UnsupportedFormat(format!(
            "Cannot write mesh format: {:?}",
            path.extension()
        ))),
    }
}

/// What to do with a path whose extension names no known format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LoadPolicy {
    /// Substitute [`default_mesh`]
    #[default]
    Lenient,
    /// Fail with `InvalidInput`
    Strict,
}

/// The mesh substituted for unrecognised paths: a sphere of radius 0.5 with
/// 8 points per ring and 8 from pole to pole
pub fn default_mesh() -> TriangleMesh {
    TriangleMesh::sphere(0.5, 8, 8)
}

/// Loads meshes under a [`LoadPolicy`]
#[derive(Debug, Clone, Copy, Default)]
pub struct MeshLoader {
    policy: LoadPolicy,
}

impl MeshLoader {
    pub fn new(policy: LoadPolicy) -> Self {
        Self { policy }
    }

    pub fn strict() -> Self {
        Self::new(LoadPolicy::Strict)
    }

    pub fn policy(&self) -> LoadPolicy {
        self.policy
    }

    /// Load a mesh, applying the policy to unrecognised extensions.
    ///
    /// A recognised format whose file is missing is `FileNotFound` under both
    /// policies. A file with no vertices, or with a NaN or infinite coordinate,
    /// is rejected as `InvalidInput`.
    pub fn load<P: AsRef<Path>>(&self, path: P) -> Result<TriangleMesh> {
        let path = path.as_ref();

        if MeshFormat::from_path(path).is_none() {
            return match self.policy {
                LoadPolicy::Lenient => {
                    log::warn!(
                        "{}: unrecognised mesh extension, using the default sphere",
                        path.display()
                    );
                    Ok(default_mesh())
                }
                LoadPolicy::Strict => Err(Error::InvalidInput(format!(
                    "{}: unrecognised mesh extension",
                    path.display()
                ))),
            };
        }

        let mesh = read_mesh(path)?;
        if mesh.vertices.is_empty() {
            return Err(Error::InvalidInput(format!(
                "{}: mesh has no vertices",
                path.display()
            )));
        }
        if let Some(index) = mesh.first_non_finite_vertex() {
            return Err(Error::InvalidInput(format!(
                "{}: vertex {} has a non-finite coordinate: {:?}",
                path.display(),
                index,
                mesh.vertices[index]
            )));
        }

        log::info!(
            "loaded {}: {} vertices, {} faces",
            path.display(),
            mesh.vertex_count(),
            mesh.face_count()
        );
        Ok(mesh)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use meshalign_core::Point3f;
    use tempfile::tempdir;

    #[test]
    fn test_format_detection_is_case_insensitive() {
        assert_eq!(MeshFormat::from_path(Path::new("a/b.PLY")), Some(MeshFormat::Ply));
        assert_eq!(MeshFormat::from_path(Path::new("mesh.Obj")), Some(MeshFormat::Obj));
        assert_eq!(MeshFormat::from_path(Path::new("mesh.g")), Some(MeshFormat::Byu));
        assert_eq!(MeshFormat::from_path(Path::new("mesh.xyz")), None);
        assert_eq!(MeshFormat::from_path(Path::new("mesh")), None);
        assert!(!MeshFormat::Vtp.is_readable());
        assert!(MeshFormat::Vtk.is_readable() && MeshFormat::Byu.is_readable());
    }

    #[test]
    fn test_lenient_policy_substitutes_sphere() {
        let loader = MeshLoader::default();
        assert_eq!(loader.policy(), LoadPolicy::Lenient);

        for path in ["does/not/exist.xyz", "no_extension"] {
            let mesh = loader.load(path).unwrap();
            assert_eq!(mesh.vertex_count(), 50);
            assert_eq!(mesh.face_count(), 96);
            assert_eq!(mesh, default_mesh());
        }
    }

    #[test]
    fn test_strict_policy_rejects_unknown_extension() {
        let result = MeshLoader::strict().load("mesh.xyz");
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_missing_file_is_not_found_under_both_policies() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("missing.ply");

        for policy in [LoadPolicy::Lenient, LoadPolicy::Strict] {
            let result = MeshLoader::new(policy).load(&path);
            assert!(matches!(result, Err(Error::FileNotFound { .. })));
        }
    }

    #[test]
    fn test_recognised_formats_without_reader() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("mesh.vtp");
        std::fs::write(&path, "<VTKFile/>").unwrap();

        assert!(matches!(read_mesh(&path), Err(Error::UnsupportedFormat(_))));
        assert!(matches!(MeshLoader::default().load(&path), Err(Error::UnsupportedFormat(_))));
    }

    #[test]
    fn test_write_then_load_each_format() {
        let dir = tempdir().unwrap();
        let mesh = default_mesh();

        for name in ["out.ply", "out.obj", "out.stl", "out.vtk", "out.g"] {
            let path = dir.path().join(name);
            write_mesh(&mesh, &path).unwrap();
            let loaded = MeshLoader::strict().load(&path).unwrap();
            assert_eq!(loaded.face_count(), mesh.face_count());
        }

        for name in ["out.vtk", "out.g"] {
            let loaded = read_mesh(dir.path().join(name)).unwrap();
            assert_eq!(loaded.faces, mesh.faces);
            for (a, b) in loaded.vertices.iter().zip(&mesh.vertices) {
                assert_relative_eq!(*a, *b, epsilon = 1e-6);
            }
        }

        assert!(matches!(
            write_mesh(&mesh, dir.path().join("out.vtp")),
            Err(Error::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn test_empty_mesh_file_is_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("empty.obj");
        std::fs::write(&path, "# nothing here\n").unwrap();

        assert!(matches!(MeshLoader::default().load(&path), Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_non_finite_vertices_are_rejected() {
        let dir = tempdir().unwrap();
        let mut mesh = default_mesh();
        mesh.vertices[3] = Point3f::new(0.1, f32::NAN, 0.2);

        for name in ["nan.vtk", "nan.g"] {
            let path = dir.path().join(name);
            write_mesh(&mesh, &path).unwrap();

            for policy in [LoadPolicy::Lenient, LoadPolicy::Strict] {
                let result = MeshLoader::new(policy).load(&path);
                assert!(matches!(result, Err(Error::InvalidInput(_))), "{}: {:?}", name, result);
            }
        }
    }
}
