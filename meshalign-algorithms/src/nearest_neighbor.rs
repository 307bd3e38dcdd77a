//! Nearest neighbor search implementations

use kiddo::immutable::float::kdtree::ImmutableKdTree;
use kiddo::SquaredEuclidean;
use meshalign_core::{Error, NearestNeighborSearch, Point3f, Result};
use rayon::prelude::*;

/// Immutable k-d tree over a fixed point set
pub struct PointIndex {
    tree: ImmutableKdTree<f32, u32, 3, 32>,
    len: usize,
}

impl PointIndex {
    /// Build the index. Fails on an empty point set.
    pub fn new(points: &[Point3f]) -> Result<Self> {
        if points.is_empty() {
            return Err(Error::InvalidInput(
                "cannot index an empty point set".to_string(),
            ));
        }
        if points.len() > u32::MAX as usize {
            return Err(Error::InvalidInput(format!(
                "point set too large to index: {} points",
                points.len()
            )));
        }

        let coords: Vec<[f32; 3]> = points.iter().map(|p| [p.x, p.y, p.z]).collect();
        Ok(Self {
            tree: ImmutableKdTree::new_from_slice(&coords),
            len: points.len(),
        })
    }

    /// Number of indexed points
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Closest indexed point as `(index, squared distance)`
    pub fn nearest_squared(&self, query: &Point3f) -> (usize, f32) {
        let nearest = self
            .tree
            .nearest_one::<SquaredEuclidean>(&[query.x, query.y, query.z]);
        (nearest.item as usize, nearest.distance)
    }

    /// Closest indexed point for every query, in query order
    pub fn nearest_all(&self, queries: &[Point3f]) -> Vec<(usize, f32)> {
        queries
            .par_iter()
            .map(|q| {
                let (idx, dist_sq) = self.nearest_squared(q);
                (idx, dist_sq.sqrt())
            })
            .collect()
    }
}

impl NearestNeighborSearch for PointIndex {
    fn find_nearest(&self, query: &Point3f) -> Option<(usize, f32)> {
        let (idx, dist_sq) = self.nearest_squared(query);
        Some((idx, dist_sq.sqrt()))
    }
}

/// Simple brute force nearest neighbor search for small datasets
pub struct BruteForceSearch {
    points: Vec<Point3f>,
}

impl BruteForceSearch {
    pub fn new(points: &[Point3f]) -> Self {
        Self {
            points: points.to_vec(),
        }
    }
}

impl NearestNeighborSearch for BruteForceSearch {
    fn find_nearest(&self, query: &Point3f) -> Option<(usize, f32)> {
        self.points
            .iter()
            .enumerate()
            .map(|(idx, point)| (idx, (point - query).norm_squared()))
            .min_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))
            .map(|(idx, dist_sq)| (idx, dist_sq.sqrt()))
    }
}
