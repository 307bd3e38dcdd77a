//! Registration algorithms

use crate::landmark::{LandmarkMode, LandmarkTransform, MIN_LANDMARKS};
use crate::nearest_neighbor::PointIndex;
use meshalign_core::{centroid, Error, Point3f, Result, Transform3D, TriangleMesh};
use serde::{Deserialize, Serialize};

/// How the per-iteration mean distance is measured
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MeanDistanceMode {
    /// Root of the mean squared distance
    #[default]
    Rms,
    /// Mean of the absolute distances
    Absolute,
}

/// Progress of an ICP run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IcpState {
    Init,
    Iterating,
    /// The mean distance fell below the threshold
    Converged,
    /// The iteration limit was reached first
    MaxIterReached,
}

/// Parameters for [`IterativeClosestPoint`]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IcpOptions {
    pub max_iterations: usize,
    /// Convergence threshold on the mean distance
    pub max_mean_distance: f32,
    /// Upper bound on the number of source points matched per iteration
    pub max_landmarks: usize,
    pub check_mean_distance: bool,
    /// Start from the translation taking the source centroid to the target centroid
    pub start_by_matching_centroids: bool,
    pub mode: LandmarkMode,
    pub mean_distance_mode: MeanDistanceMode,
}

impl Default for IcpOptions {
    fn default() -> Self {
        Self {
            max_iterations: 500,
            max_mean_distance: 1e-5,
            max_landmarks: 100,
            check_mean_distance: true,
            start_by_matching_centroids: true,
            mode: LandmarkMode::RigidBody,
            mean_distance_mode: MeanDistanceMode::Rms,
        }
    }
}

impl IcpOptions {
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn with_max_mean_distance(mut self, distance: f32) -> Self {
        self.max_mean_distance = distance;
        self
    }

    pub fn with_max_landmarks(mut self, max_landmarks: usize) -> Self {
        self.max_landmarks = max_landmarks;
        self
    }

    pub fn with_check_mean_distance(mut self, check: bool) -> Self {
        self.check_mean_distance = check;
        self
    }

    pub fn with_start_by_matching_centroids(mut self, enabled: bool) -> Self {
        self.start_by_matching_centroids = enabled;
        self
    }

    pub fn with_mode(mut self, mode: LandmarkMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_mean_distance_mode(mut self, mode: MeanDistanceMode) -> Self {
        self.mean_distance_mode = mode;
        self
    }

    /// Reject option combinations that cannot run
    pub fn validate(&self) -> Result<()> {
        if self.max_iterations == 0 {
            return Err(Error::InvalidInput("Max iterations must be positive".to_string()));
        }
        if self.max_landmarks < MIN_LANDMARKS {
            return Err(Error::InvalidInput(format!(
                "Max landmarks must be at least {}, got {}",
                MIN_LANDMARKS, self.max_landmarks
            )));
        }
        if self.max_mean_distance.is_nan() || self.max_mean_distance < 0.0 {
            return Err(Error::InvalidInput(format!(
                "Max mean distance must be non-negative, got {}",
                self.max_mean_distance
            )));
        }
        Ok(())
    }
}

/// Result of ICP registration
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IcpResult {
    /// Accumulated transformation taking the source onto the target
    pub transform: Transform3D,
    /// Terminal state, either `Converged` or `MaxIterReached`
    pub state: IcpState,
    /// Number of iterations performed
    pub iterations: usize,
    /// Mean distance measured in the last iteration (infinite if never measured)
    pub mean_distance: f32,
}

impl IcpResult {
    pub fn converged(&self) -> bool {
        self.state == IcpState::Converged
    }

    /// Turn a run that hit the iteration limit into an error
    pub fn require_converged(self) -> Result<Self> {
        if self.converged() {
            Ok(self)
        } else {
            Err(Error::IterationLimitExceeded {
                iterations: self.iterations,
                mean_distance: self.mean_distance,
            })
        }
    }
}

/// Iterative closest point registration of one vertex set onto another.
///
/// Each iteration matches a uniformly strided sample of the source to the
/// nearest target vertices, solves a landmark transform for the matched pairs
/// and composes it onto the accumulated transform.
#[derive(Debug, Clone, Copy, Default)]
pub struct IterativeClosestPoint {
    options: IcpOptions,
}

impl IterativeClosestPoint {
    pub fn new(options: IcpOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &IcpOptions {
        &self.options
    }

    /// Register `source` onto `target` mesh vertices
    pub fn register(&self, source: &TriangleMesh, target: &TriangleMesh) -> Result<IcpResult> {
        self.register_points(&source.vertices, &target.vertices)
    }

    /// Register a source point set onto a target point set
    pub fn register_points(&self, source: &[Point3f], target: &[Point3f]) -> Result<IcpResult> {
        self.options.validate()?;
        if source.is_empty() || target.is_empty() {
            return Err(Error::InvalidInput("Source or target point set is empty".to_string()));
        }

        let mut state = IcpState::Init;
        let landmarks = sample_landmarks(source, self.options.max_landmarks);
        let target_index = PointIndex::new(target)?;
        let solver = LandmarkTransform::new(self.options.mode);

        let mut transform = Transform3D::identity();
        if self.options.start_by_matching_centroids {
            if let (Some(src), Some(tgt)) = (centroid(source), centroid(target)) {
                transform = Transform3D::translation(tgt - src);
            }
        }

        let mut points = transform.transform_points(&landmarks);
        let mut iterations = 0;
        let mut mean_distance = f32::INFINITY;

        log::debug!(
            "ICP: {} of {} source points as landmarks, {} target points",
            landmarks.len(),
            source.len(),
            target.len()
        );

        while state == IcpState::Init || state == IcpState::Iterating {
            state = IcpState::Iterating;

            let matches: Vec<Point3f> = target_index
                .nearest_all(&points)
                .into_iter()
                .map(|(idx, _)| target[idx])
                .collect();

            let delta = solver.solve(&points, &matches)?.transform;
            transform = delta * transform;
            iterations += 1;

            if iterations >= self.options.max_iterations {
                state = IcpState::MaxIterReached;
            }

            points = delta.transform_points(&points);

            if self.options.check_mean_distance {
                mean_distance = compute_mean_distance(&points, &matches, self.options.mean_distance_mode);
                log::trace!("ICP iteration {}: mean distance {:.3e}", iterations, mean_distance);
                if mean_distance < self.options.max_mean_distance {
                    state = IcpState::Converged;
                }
            }
        }

        match state {
            IcpState::Converged => log::info!(
                "ICP converged after {} iterations (mean distance {:.3e})",
                iterations,
                mean_distance
            ),
            _ => log::warn!(
                "ICP reached the iteration limit of {} (mean distance {:.3e})",
                iterations,
                mean_distance
            ),
        }

        Ok(IcpResult {
            transform,
            state,
            iterations,
            mean_distance,
        })
    }
}

/// Uniformly strided subset of at most `max_landmarks` points
fn sample_landmarks(points: &[Point3f], max_landmarks: usize) -> Vec<Point3f> {
    if points.len() <= max_landmarks {
        return points.to_vec();
    }
    let step = points.len() / max_landmarks;
    points.iter().step_by(step).take(max_landmarks).copied().collect()
}

/// Mean distance between moved points and their matches
fn compute_mean_distance(points: &[Point3f], matches: &[Point3f], mode: MeanDistanceMode) -> f32 {
    if points.is_empty() {
        return 0.0;
    }
    let n = points.len() as f32;
    let pairs = points.iter().zip(matches.iter());
    match mode {
        MeanDistanceMode::Rms => {
            let sum_squared: f32 = pairs.map(|(p, m)| (p - m).magnitude_squared()).sum();
            (sum_squared / n).sqrt()
        }
        MeanDistanceMode::Absolute => pairs.map(|(p, m)| (p - m).magnitude()).sum::<f32>() / n,
    }
}
