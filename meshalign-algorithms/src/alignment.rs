//! Two-stage mesh alignment with best-candidate selection
//!
//! The source is aligned coarsely by its bounding box corners, then refined by
//! ICP. The original, box-aligned and refined placements are each scored by
//! their Hausdorff distance to the target and the closest one is kept.

use crate::distance::hausdorff_distance;
use crate::registration::{IcpOptions, IcpResult, IterativeClosestPoint};
use crate::rotation_search::{align_by_obb, ObbAlignOptions, RotationSearchResult};
use meshalign_core::{AlignmentSink, Error, Result, Transform3D, TriangleMesh};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which placement of the source was selected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AlignmentCandidate {
    Original,
    ObbAligned,
    IcpRefined,
}

impl AlignmentCandidate {
    /// Candidates in selection priority order
    pub const ALL: [AlignmentCandidate; 3] = [
        AlignmentCandidate::Original,
        AlignmentCandidate::ObbAligned,
        AlignmentCandidate::IcpRefined,
    ];
}

impl fmt::Display for AlignmentCandidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AlignmentCandidate::Original => write!(f, "original alignment"),
            AlignmentCandidate::ObbAligned => write!(f, "alignment by OBB"),
            AlignmentCandidate::IcpRefined => write!(f, "alignment by ICP"),
        }
    }
}

/// Options for [`MeshAligner`]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AlignmentOptions {
    pub obb: ObbAlignOptions,
    pub icp: IcpOptions,
    /// A candidate within this distance of the minimum counts as a tie; ties
    /// go to the earlier candidate
    pub tie_tolerance: f32,
}

impl Default for AlignmentOptions {
    fn default() -> Self {
        Self {
            obb: ObbAlignOptions::default(),
            icp: IcpOptions::default(),
            tie_tolerance: 0.0,
        }
    }
}

impl AlignmentOptions {
    pub fn with_obb(mut self, obb: ObbAlignOptions) -> Self {
        self.obb = obb;
        self
    }

    pub fn with_icp(mut self, icp: IcpOptions) -> Self {
        self.icp = icp;
        self
    }

    pub fn with_tie_tolerance(mut self, tolerance: f32) -> Self {
        self.tie_tolerance = tolerance;
        self
    }
}

/// Transform and search details of the bounding box stage
#[derive(Debug, Clone)]
pub struct ObbSummary {
    pub transform: Transform3D,
    pub search: RotationSearchResult,
}

/// Everything measured during one alignment
#[derive(Debug, Clone)]
pub struct AlignmentReport {
    pub selected: AlignmentCandidate,
    pub distance_before: f32,
    pub distance_after_obb: f32,
    pub distance_after_icp: f32,
    pub min_distance: f32,
    /// False when the box alignment made things worse and was discarded
    pub obb_accepted: bool,
    pub obb: ObbSummary,
    pub icp: IcpResult,
    /// Maps the original source onto `mesh`
    pub transform: Transform3D,
    /// The selected placement of the source
    pub mesh: TriangleMesh,
}

impl AlignmentReport {
    /// Distance of the selected candidate
    pub fn distance(&self) -> f32 {
        self.distance_of(self.selected)
    }

    pub fn distance_of(&self, candidate: AlignmentCandidate) -> f32 {
        match candidate {
            AlignmentCandidate::Original => self.distance_before,
            AlignmentCandidate::ObbAligned => self.distance_after_obb,
            AlignmentCandidate::IcpRefined => self.distance_after_icp,
        }
    }
}

/// Aligns a source mesh to a target mesh
#[derive(Debug, Clone, Copy, Default)]
pub struct MeshAligner {
    options: AlignmentOptions,
}

impl MeshAligner {
    pub fn new(options: AlignmentOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &AlignmentOptions {
        &self.options
    }

    pub fn align(&self, source: &TriangleMesh, target: &TriangleMesh) -> Result<AlignmentReport> {
        if source.vertices.is_empty() || target.vertices.is_empty() {
            return Err(Error::InvalidInput(format!(
                "cannot align meshes with {} and {} vertices",
                source.vertex_count(),
                target.vertex_count()
            )));
        }
        for (role, mesh) in [("source", source), ("target", target)] {
            if let Some(index) = mesh.first_non_finite_vertex() {
                return Err(Error::InvalidInput(format!(
                    "{} vertex {} has a non-finite coordinate: {:?}",
                    role, index, mesh.vertices[index]
                )));
            }
        }
        if self.options.tie_tolerance.is_nan() || self.options.tie_tolerance < 0.0 {
            return Err(Error::InvalidInput(format!(
                "tie tolerance must be non-negative, got {}",
                self.options.tie_tolerance
            )));
        }
        self.options.icp.validate()?;

        let distance_before = hausdorff_distance(&target.vertices, &source.vertices)?;

        let obb = align_by_obb(source, target, &self.options.obb)?;
        let distance_after_obb = hausdorff_distance(&target.vertices, &obb.mesh.vertices)?;
        log::info!(
            "distance before alignment {:.6}, after OBB alignment {:.6}",
            distance_before,
            distance_after_obb
        );

        let obb_accepted = distance_after_obb <= distance_before;
        let (working, working_transform) = if obb_accepted {
            (obb.mesh, obb.transform)
        } else {
            log::warn!("OBB alignment increased the distance; refining from the original placement");
            (source.clone(), Transform3D::identity())
        };

        let icp = IterativeClosestPoint::new(self.options.icp).register(&working, target)?;
        let refined = working.transformed(&icp.transform);
        let distance_after_icp = hausdorff_distance(&target.vertices, &refined.vertices)?;

        let distances = [distance_before, distance_after_obb, distance_after_icp];
        let min_distance = distances.iter().copied().fold(f32::INFINITY, f32::min);
        let selected = select_candidate(&distances, self.options.tie_tolerance);

        log::info!(
            "distance before, after OBB, after ICP, min: {:.6}, {:.6}, {:.6}, {:.6}",
            distance_before,
            distance_after_obb,
            distance_after_icp,
            min_distance
        );
        log::info!("using {}", selected);

        let (transform, mesh) = match selected {
            AlignmentCandidate::Original => (Transform3D::identity(), source.clone()),
            AlignmentCandidate::ObbAligned => (obb.transform, source.transformed(&obb.transform)),
            AlignmentCandidate::IcpRefined => (icp.transform * working_transform, refined),
        };

        Ok(AlignmentReport {
            selected,
            distance_before,
            distance_after_obb,
            distance_after_icp,
            min_distance,
            obb_accepted,
            obb: ObbSummary {
                transform: obb.transform,
                search: obb.search,
            },
            icp,
            transform,
            mesh,
        })
    }
}

/// First candidate whose distance lies within `tolerance` of the minimum
fn select_candidate(distances: &[f32; 3], tolerance: f32) -> AlignmentCandidate {
    let min = distances.iter().copied().fold(f32::INFINITY, f32::min);
    AlignmentCandidate::ALL
        .iter()
        .zip(distances)
        .find(|(_, &d)| d - min <= tolerance)
        .map(|(&candidate, _)| candidate)
        .unwrap_or(AlignmentCandidate::IcpRefined)
}

/// Hand the selected alignment to a sink
pub fn present<S: AlignmentSink + ?Sized>(
    report: &AlignmentReport,
    source: &TriangleMesh,
    target: &TriangleMesh,
    sink: &mut S,
) -> Result<()> {
    sink.present(source, target, &report.transform)
}
