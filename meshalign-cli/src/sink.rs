//! Receivers for the selected alignment

use meshalign::io::write_mesh;
use meshalign::{AlignmentSink, Drawable, Result, Transform3D, TriangleMesh};
use std::path::PathBuf;

/// Logs where the aligned source ends up relative to the target
#[derive(Debug, Default)]
pub struct LoggingSink;

impl AlignmentSink for LoggingSink {
    fn present(
        &mut self,
        source: &TriangleMesh,
        target: &TriangleMesh,
        transform: &Transform3D,
    ) -> Result<()> {
        let aligned_center = transform.transform_point(&source.center());
        let target_center = target.center();
        log::info!(
            "aligned source center ({:.4}, {:.4}, {:.4}), target center ({:.4}, {:.4}, {:.4})",
            aligned_center.x,
            aligned_center.y,
            aligned_center.z,
            target_center.x,
            target_center.y,
            target_center.z
        );
        log::debug!("transform: {}", transform.matrix);
        Ok(())
    }
}

/// Writes the aligned source mesh to a file (format chosen by extension)
#[derive(Debug)]
pub struct ExportSink {
    path: PathBuf,
}

impl ExportSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl AlignmentSink for ExportSink {
    fn present(
        &mut self,
        source: &TriangleMesh,
        _target: &TriangleMesh,
        transform: &Transform3D,
    ) -> Result<()> {
        write_mesh(&source.transformed(transform), &self.path)?;
        log::info!("wrote aligned source to {}", self.path.display());
        Ok(())
    }
}
