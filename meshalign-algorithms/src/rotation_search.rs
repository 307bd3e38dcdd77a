//! Coarse alignment from oriented bounding box corners
//!
//! Box corners only match up to the sign and order of the box axes, so the
//! source landmarks are tried under quarter turns about each coordinate axis.
//! Each candidate is solved as a similarity transform against the target
//! landmarks, applied to the whole source mesh and scored by its Hausdorff
//! distance to the target mesh.

use crate::distance::HausdorffScorer;
use crate::landmark::LandmarkTransform;
use crate::obb::{ObbTree, ObbTreeOptions};
use meshalign_core::{centroid, Axis, Error, Point3f, Result, Transform3D, TriangleMesh};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Quarter turns tried per axis (0°, 90°, 180°, 270°)
pub const QUARTER_TURNS: u8 = 4;

/// One scored orientation of the source landmarks
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RotationCandidate {
    pub axis: Axis,
    pub step: u8,
    pub distance: f32,
}

impl RotationCandidate {
    pub fn degrees(&self) -> f32 {
        90.0 * self.step as f32
    }
}

#[derive(Debug, Clone)]
pub struct RotationSearchResult {
    /// Source landmarks under the winning rotation
    pub best_landmarks: Vec<Point3f>,
    pub best_distance: f32,
    pub axis: Axis,
    pub step: u8,
    /// Every candidate in evaluation order (X, Y, Z; 0 to 3 quarter turns each)
    pub candidates: Vec<RotationCandidate>,
}

/// Search over quarter-turn orientations of the source landmarks
pub struct RotationSearch<'a> {
    source: &'a TriangleMesh,
    scorer: HausdorffScorer,
    solver: LandmarkTransform,
}

impl<'a> RotationSearch<'a> {
    pub fn new(source: &'a TriangleMesh, target: &TriangleMesh) -> Result<Self> {
        if source.vertices.is_empty() {
            return Err(Error::InvalidInput(
                "rotation search needs a non-empty source mesh".to_string(),
            ));
        }
        Ok(Self {
            source,
            scorer: HausdorffScorer::new(&target.vertices)?,
            solver: LandmarkTransform::similarity(),
        })
    }

    /// Evaluate all 12 orientations and keep the first strict minimum
    pub fn search(
        &self,
        source_landmarks: &[Point3f],
        target_landmarks: &[Point3f],
    ) -> Result<RotationSearchResult> {
        let center = centroid(source_landmarks).ok_or_else(|| {
            Error::InvalidInput("rotation search needs source landmarks".to_string())
        })?;

        let orientations: Vec<(Axis, u8)> = Axis::ALL
            .iter()
            .flat_map(|&axis| (0..QUARTER_TURNS).map(move |step| (axis, step)))
            .collect();

        let scored = orientations
            .par_iter()
            .map(|&(axis, step)| {
                let rotated = Transform3D::quarter_turn_about(&center, axis, step)
                    .transform_points(source_landmarks);
                let distance = self.score(&rotated, target_landmarks)?;
                Ok((RotationCandidate { axis, step, distance }, rotated))
            })
            .collect::<Result<Vec<_>>>()?;

        let mut best: Option<(RotationCandidate, Vec<Point3f>)> = None;
        let mut candidates = Vec::with_capacity(scored.len());
        for (candidate, rotated) in scored {
            log::debug!(
                "rotation {} {:>3}°: distance {:.6}",
                candidate.axis,
                candidate.degrees(),
                candidate.distance
            );
            candidates.push(candidate);
            let improves = best
                .as_ref()
                .map_or(true, |(current, _)| candidate.distance < current.distance);
            if improves {
                best = Some((candidate, rotated));
            }
        }

        let (winner, best_landmarks) = best.ok_or_else(|| {
            Error::NumericalDegeneracy("no rotation candidate could be scored".to_string())
        })?;

        log::info!(
            "best OBB orientation: {} {}° (distance {:.6})",
            winner.axis,
            winner.degrees(),
            winner.distance
        );

        Ok(RotationSearchResult {
            best_landmarks,
            best_distance: winner.distance,
            axis: winner.axis,
            step: winner.step,
            candidates,
        })
    }

    fn score(&self, rotated: &[Point3f], target_landmarks: &[Point3f]) -> Result<f32> {
        let solution = self.solver.solve(rotated, target_landmarks)?;
        let moved = solution.transform.transform_points(&self.source.vertices);
        self.scorer.score(&moved)
    }
}

/// Options for [`align_by_obb`]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ObbAlignOptions {
    /// Depth of the OBB trees built over each mesh
    pub max_depth: usize,
    /// Tree level whose box corners are used as landmarks
    pub landmark_level: usize,
    pub max_points_per_leaf: usize,
}

impl Default for ObbAlignOptions {
    fn default() -> Self {
        let tree = ObbTreeOptions::default();
        Self {
            max_depth: tree.max_depth,
            landmark_level: 0,
            max_points_per_leaf: tree.max_points_per_leaf,
        }
    }
}

impl ObbAlignOptions {
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn with_landmark_level(mut self, level: usize) -> Self {
        self.landmark_level = level;
        self
    }

    pub fn with_max_points_per_leaf(mut self, max_points: usize) -> Self {
        self.max_points_per_leaf = max_points;
        self
    }

    fn tree_options(&self) -> ObbTreeOptions {
        ObbTreeOptions::default()
            .with_max_depth(self.max_depth)
            .with_max_points_per_leaf(self.max_points_per_leaf)
    }
}

/// Result of a bounding box alignment
#[derive(Debug, Clone)]
pub struct ObbAlignment {
    /// Source mesh moved onto the target
    pub mesh: TriangleMesh,
    /// Transform applied to the source
    pub transform: Transform3D,
    pub search: RotationSearchResult,
}

/// Align `source` to `target` by matching their bounding box corners.
///
/// The source is not modified; the aligned copy is returned.
pub fn align_by_obb(
    source: &TriangleMesh,
    target: &TriangleMesh,
    options: &ObbAlignOptions,
) -> Result<ObbAlignment> {
    let tree_options = options.tree_options();
    let source_tree = ObbTree::from_mesh(source, &tree_options)?;
    let target_tree = ObbTree::from_mesh(target, &tree_options)?;

    let source_landmarks = source_tree.landmarks(options.landmark_level);
    let target_landmarks = target_tree.landmarks(options.landmark_level);
    if source_landmarks.len() != target_landmarks.len() {
        // trees with different shapes below the landmark level
        return Err(Error::InsufficientLandmarks {
            source_count: source_landmarks.len(),
            target_count: target_landmarks.len(),
        });
    }

    let search = RotationSearch::new(source, target)?.search(&source_landmarks, &target_landmarks)?;

    let solution = LandmarkTransform::similarity().solve(&search.best_landmarks, &target_landmarks)?;
    let mesh = source.transformed(&solution.transform);

    Ok(ObbAlignment {
        mesh,
        transform: solution.transform,
        search,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distance::hausdorff_distance;
    use meshalign_core::Vector3f;

    /// Sphere stretched to distinct semi-axes 3, 2 and 1
    fn ellipsoid() -> TriangleMesh {
        let mut mesh = TriangleMesh::sphere(1.0, 16, 12);
        for v in &mut mesh.vertices {
            v.x *= 3.0;
            v.y *= 2.0;
        }
        mesh
    }

    #[test]
    fn test_search_evaluates_twelve_candidates_in_order() {
        let source = ellipsoid();
        let target = source.transformed(&Transform3D::translation(Vector3f::new(0.5, 0.0, 0.0)));
        let tree = ObbTreeOptions::default();
        let src = ObbTree::from_mesh(&source, &tree).unwrap().landmarks(0);
        let tgt = ObbTree::from_mesh(&target, &tree).unwrap().landmarks(0);

        let result = RotationSearch::new(&source, &target).unwrap().search(&src, &tgt).unwrap();

        assert_eq!(result.candidates.len(), 12);
        assert_eq!(result.candidates[0].axis, Axis::X);
        assert_eq!(result.candidates[0].step, 0);
        assert_eq!(result.candidates[4].axis, Axis::Y);
        assert_eq!(result.candidates[11].axis, Axis::Z);
        assert_eq!(result.candidates[11].step, 3);

        let min = result
            .candidates
            .iter()
            .map(|c| c.distance)
            .fold(f32::INFINITY, f32::min);
        assert_eq!(result.best_distance, min);
        // first minimum wins
        let first = result.candidates.iter().find(|c| c.distance == min).unwrap();
        assert_eq!((first.axis, first.step), (result.axis, result.step));
    }

    #[test]
    fn test_search_is_deterministic() {
        let source = ellipsoid();
        let target = source.transformed(&Transform3D::quarter_turn_about(
            &Point3f::origin(),
            Axis::Z,
            1,
        ));
        let a = align_by_obb(&source, &target, &ObbAlignOptions::default()).unwrap();
        let b = align_by_obb(&source, &target, &ObbAlignOptions::default()).unwrap();

        assert_eq!(a.search.candidates, b.search.candidates);
        assert_eq!(a.search.best_landmarks, b.search.best_landmarks);
        assert_eq!(a.transform, b.transform);
    }

    #[test]
    fn test_align_recovers_rotated_ellipsoid() {
        let source = ellipsoid();
        let truth = Transform3D::translation(Vector3f::new(1.0, 0.0, 0.0))
            * Transform3D::quarter_turn_about(&Point3f::origin(), Axis::X, 1);
        let target = source.transformed(&truth);

        let before = hausdorff_distance(&source.vertices, &target.vertices).unwrap();
        let aligned = align_by_obb(&source, &target, &ObbAlignOptions::default()).unwrap();
        let after = hausdorff_distance(&aligned.mesh.vertices, &target.vertices).unwrap();

        assert!(before > 1.0);
        assert!(after < 1e-3, "distance after OBB alignment: {after}");
        assert!(aligned.search.best_distance < 1e-3);
        // source is left untouched
        assert_eq!(source, ellipsoid());
    }

    #[test]
    fn test_level_one_landmarks() {
        let source = ellipsoid();
        let target = source.transformed(&Transform3D::translation(Vector3f::new(0.0, 0.2, 0.0)));
        let options = ObbAlignOptions::default().with_landmark_level(1);
        let aligned = align_by_obb(&source, &target, &options).unwrap();
        assert_eq!(aligned.search.best_landmarks.len(), 16);
    }

    #[test]
    fn test_missing_landmarks_fail() {
        let source = ellipsoid();
        let search = RotationSearch::new(&source, &source).unwrap();
        assert!(matches!(search.search(&[], &[]), Err(Error::InvalidInput(_))));
        assert!(RotationSearch::new(&TriangleMesh::new(), &source).is_err());
    }
}
