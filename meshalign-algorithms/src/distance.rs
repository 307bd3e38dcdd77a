//! Hausdorff distance between point sets
//!
//! The symmetric distance is `max(h(a, b), h(b, a))` with the directed distance
//! `h(a, b) = max over a of (min over b of |a - b|)`. Both directions use
//! point-to-point distances to the other set's vertices.

use crate::nearest_neighbor::PointIndex;
use meshalign_core::{Error, Point3f, Result};

/// Both directed distances together with the symmetric one
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HausdorffDistance {
    /// `h(a, b)`
    pub forward: f32,
    /// `h(b, a)`
    pub backward: f32,
    /// `max(forward, backward)`
    pub distance: f32,
}

/// Directed Hausdorff distance `h(from, to)`
pub fn directed_hausdorff(from: &[Point3f], to: &[Point3f]) -> Result<f32> {
    if from.is_empty() {
        return Err(Error::InvalidInput(
            "Hausdorff distance needs a non-empty query set".to_string(),
        ));
    }
    let index = PointIndex::new(to)?;
    Ok(directed_with_index(from, &index))
}

/// Directed distance against a prebuilt index of the `to` set
pub fn directed_with_index(from: &[Point3f], to: &PointIndex) -> f32 {
    to.nearest_all(from)
        .into_iter()
        .fold(0.0_f32, |acc, (_, d)| acc.max(d))
}

/// Symmetric Hausdorff distance with both directed components
pub fn hausdorff_report(a: &[Point3f], b: &[Point3f]) -> Result<HausdorffDistance> {
    if a.is_empty() || b.is_empty() {
        return Err(Error::InvalidInput(format!(
            "Hausdorff distance needs two non-empty point sets (got {} and {} points)",
            a.len(),
            b.len()
        )));
    }

    let forward = directed_hausdorff(a, b)?;
    let backward = directed_hausdorff(b, a)?;

    Ok(HausdorffDistance {
        forward,
        backward,
        distance: forward.max(backward),
    })
}

/// Symmetric Hausdorff distance between two point sets
pub fn hausdorff_distance(a: &[Point3f], b: &[Point3f]) -> Result<f32> {
    hausdorff_report(a, b).map(|h| h.distance)
}

/// Scores many candidate point sets against one fixed reference set.
///
/// The reference index is built once and reused for every candidate.
pub struct HausdorffScorer {
    reference: Vec<Point3f>,
    reference_index: PointIndex,
}

impl HausdorffScorer {
    pub fn new(reference: &[Point3f]) -> Result<Self> {
        Ok(Self {
            reference: reference.to_vec(),
            reference_index: PointIndex::new(reference)?,
        })
    }

    /// Symmetric Hausdorff distance from `candidate` to the reference set
    pub fn score(&self, candidate: &[Point3f]) -> Result<f32> {
        if candidate.is_empty() {
            return Err(Error::InvalidInput(
                "cannot score an empty candidate point set".to_string(),
            ));
        }
        let candidate_index = PointIndex::new(candidate)?;
        let forward = directed_with_index(&self.reference, &candidate_index);
        let backward = directed_with_index(candidate, &self.reference_index);
        Ok(forward.max(backward))
    }
}
