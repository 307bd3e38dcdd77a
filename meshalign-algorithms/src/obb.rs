//! Oriented bounding box tree
//!
//! Each node fits a box to its points along their principal axes (eigenvectors
//! of the covariance matrix). Nodes are split at the median projection along
//! their longest edge until the depth limit is reached or too few points
//! remain. The corners of the boxes at a given level serve as coarse landmarks
//! for alignment.

use meshalign_core::{Error, Point3f, Result, TriangleMesh, Vector3f};
use nalgebra::{Matrix3, SymmetricEigen, Vector2, Vector3, U3};
use serde::{Deserialize, Serialize};

/// Eigenvalues closer than this, relative to the largest, count as repeated
const REPEATED_EIGENVALUE_TOLERANCE: f64 = 1e-5;

/// Hull edges shorter than this, relative to the hull radius, are skipped
const HULL_EDGE_TOLERANCE: f64 = 1e-6;

/// Options for building an [`ObbTree`]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ObbTreeOptions {
    /// Deepest level that may be created (the root is level 0)
    pub max_depth: usize,
    /// Nodes holding this many points or fewer are not split
    pub max_points_per_leaf: usize,
}

impl Default for ObbTreeOptions {
    fn default() -> Self {
        Self {
            max_depth: 1,
            max_points_per_leaf: 32,
        }
    }
}

impl ObbTreeOptions {
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn with_max_points_per_leaf(mut self, max_points: usize) -> Self {
        self.max_points_per_leaf = max_points;
        self
    }
}

/// A box given by its minimum corner and three full-length edge vectors.
///
/// Edges are ordered by decreasing variance of the enclosed points along them,
/// and `axes[2]` points along `axes[0] × axes[1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OrientedBox {
    pub corner: Point3f,
    pub axes: [Vector3f; 3],
}

impl OrientedBox {
    /// Fit a box to `points` along their principal axes.
    ///
    /// When two principal variances coincide the axes inside their plane are
    /// taken from the minimum-area rectangle around the projected points, so
    /// a rotated copy of the same shape gets the same extents.
    pub fn fit(points: &[Point3f]) -> Result<Self> {
        if points.is_empty() {
            return Err(Error::InvalidInput(
                "cannot fit a bounding box to zero points".to_string(),
            ));
        }

        let n = points.len() as f64;
        let to_f64 = |p: &Point3f| Vector3::new(p.x as f64, p.y as f64, p.z as f64);
        let mean = points.iter().map(to_f64).sum::<Vector3<f64>>() / n;
        let centered: Vec<Vector3<f64>> = points.iter().map(|p| to_f64(p) - mean).collect();

        let mut covariance = Matrix3::<f64>::zeros();
        for d in &centered {
            covariance += d * d.transpose();
        }
        covariance /= n;

        let directions = principal_directions(&SymmetricEigen::new(covariance), &centered);

        let mut min = [f64::INFINITY; 3];
        let mut max = [f64::NEG_INFINITY; 3];
        for d in &centered {
            for (k, dir) in directions.iter().enumerate() {
                let t = d.dot(dir);
                min[k] = min[k].min(t);
                max[k] = max[k].max(t);
            }
        }

        let corner = mean + directions[0] * min[0] + directions[1] * min[1] + directions[2] * min[2];
        let axes = [0, 1, 2].map(|k| (directions[k] * (max[k] - min[k])).cast::<f32>());

        Ok(Self {
            corner: Point3f::from(corner.cast::<f32>()),
            axes,
        })
    }

    pub fn center(&self) -> Point3f {
        self.corner + (self.axes[0] + self.axes[1] + self.axes[2]) * 0.5
    }

    /// Edge lengths in axis order
    pub fn extents(&self) -> Vector3f {
        Vector3f::new(self.axes[0].norm(), self.axes[1].norm(), self.axes[2].norm())
    }

    pub fn volume(&self) -> f32 {
        let e = self.extents();
        e.x * e.y * e.z
    }

    /// Index of the longest edge
    pub fn longest_axis(&self) -> usize {
        self.extents().imax()
    }

    /// The eight corners: `c, c+a0, c+a1, c+a0+a1, c+a2, c+a0+a2, c+a1+a2, c+a0+a1+a2`
    pub fn corners(&self) -> [Point3f; 8] {
        let [a0, a1, a2] = self.axes;
        let c = self.corner;
        [
            c,
            c + a0,
            c + a1,
            c + a0 + a1,
            c + a2,
            c + a0 + a2,
            c + a1 + a2,
            c + a0 + a1 + a2,
        ]
    }

    /// Whether `point` lies inside the box, allowing `tolerance` outside each face
    pub fn contains(&self, point: &Point3f, tolerance: f32) -> bool {
        let d = point - self.corner;
        self.axes.iter().all(|axis| {
            let length = axis.norm();
            if length <= f32::EPSILON {
                return d.dot(axis).abs() <= tolerance;
            }
            let t = d.dot(axis) / length;
            t >= -tolerance && t <= length + tolerance
        })
    }
}

/// A node of the tree together with its children
#[derive(Debug, Clone)]
pub struct ObbNode {
    pub obb: OrientedBox,
    pub depth: usize,
    pub point_count: usize,
    children: Option<Box<[ObbNode; 2]>>,
}

impl ObbNode {
    pub fn children(&self) -> Option<&[ObbNode; 2]> {
        self.children.as_deref()
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_none()
    }
}

/// Hierarchy of oriented bounding boxes over a point set
#[derive(Debug, Clone)]
pub struct ObbTree {
    root: ObbNode,
    level: usize,
    node_count: usize,
}

impl ObbTree {
    /// Build the tree over `points`.
    ///
    /// # Errors
    /// `InvalidInput` when `points` is empty.
    pub fn build(points: &[Point3f], options: &ObbTreeOptions) -> Result<Self> {
        if points.is_empty() {
            return Err(Error::InvalidInput(
                "cannot build an OBB tree over zero points".to_string(),
            ));
        }

        let mut level = 0;
        let mut node_count = 0;
        let root = build_node(points.to_vec(), 0, options, &mut level, &mut node_count)?;

        log::debug!(
            "built OBB tree over {} points: {} nodes, {} levels",
            points.len(),
            node_count,
            level + 1
        );

        Ok(Self {
            root,
            level,
            node_count,
        })
    }

    /// Build the tree over the vertices of `mesh`
    pub fn from_mesh(mesh: &TriangleMesh, options: &ObbTreeOptions) -> Result<Self> {
        Self::build(&mesh.vertices, options)
    }

    pub fn root(&self) -> &ObbNode {
        &self.root
    }

    /// Deepest level present in the tree
    pub fn level(&self) -> usize {
        self.level
    }

    pub fn node_count(&self) -> usize {
        self.node_count
    }

    /// Boxes present at `level`, depth first with the lower half before the upper half
    pub fn boxes_at_level(&self, level: usize) -> Vec<&OrientedBox> {
        let mut boxes = Vec::new();
        collect_level(&self.root, level, &mut boxes);
        boxes
    }

    /// Corner landmarks of every box at `level`.
    ///
    /// Level 0 yields the 8 corners of the root box. Branches that end above
    /// `level` contribute nothing.
    pub fn landmarks(&self, level: usize) -> Vec<Point3f> {
        self.boxes_at_level(level)
            .into_iter()
            .flat_map(|b| b.corners())
            .collect()
    }

    /// Corner landmarks of every leaf box
    pub fn leaf_landmarks(&self) -> Vec<Point3f> {
        let mut leaves = Vec::new();
        collect_leaves(&self.root, &mut leaves);
        leaves.into_iter().flat_map(|b| b.corners()).collect()
    }
}

/// Unit box directions, ordered by decreasing variance with `d2 = d0 × d1`
fn principal_directions(
    eigen: &SymmetricEigen<f64, U3>,
    centered: &[Vector3<f64>],
) -> [Vector3<f64>; 3] {
    let mut order = [0usize, 1, 2];
    order.sort_by(|&a, &b| {
        eigen.eigenvalues[b]
            .partial_cmp(&eigen.eigenvalues[a])
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    let values = order.map(|k| eigen.eigenvalues[k]);
    let vectors = order.map(|k| eigen.eigenvectors.column(k).normalize());

    let tolerance = REPEATED_EIGENVALUE_TOLERANCE * values[0].abs();
    let repeated = |i: usize| (values[i] - values[i + 1]).abs() <= tolerance;

    let (a0, a1) = match (repeated(0), repeated(1)) {
        (true, false) => {
            let [u, v] = min_area_axes(centered, &vectors[0], &vectors[1]);
            widest_first(centered, u, v)
        }
        (false, true) => {
            let [u, v] = min_area_axes(centered, &vectors[1], &vectors[2]);
            (vectors[0], widest_first(centered, u, v).0)
        }
        // distinct variances, or all three equal
        _ => (vectors[0], vectors[1]),
    };

    [a0, a1, a0.cross(&a1).normalize()]
}

fn spread(centered: &[Vector3<f64>], direction: &Vector3<f64>) -> f64 {
    let (min, max) = centered.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), d| {
        let t = d.dot(direction);
        (lo.min(t), hi.max(t))
    });
    max - min
}

fn widest_first(
    centered: &[Vector3<f64>],
    u: Vector3<f64>,
    v: Vector3<f64>,
) -> (Vector3<f64>, Vector3<f64>) {
    if spread(centered, &v) > spread(centered, &u) {
        (v, u)
    } else {
        (u, v)
    }
}

/// Sides of the minimum-area rectangle enclosing the points projected onto
/// the plane spanned by the orthonormal `e1` and `e2`.
///
/// One side of that rectangle lies along an edge of the convex hull, so only
/// hull edge directions are tried.
fn min_area_axes(
    centered: &[Vector3<f64>],
    e1: &Vector3<f64>,
    e2: &Vector3<f64>,
) -> [Vector3<f64>; 2] {
    let projected: Vec<Vector2<f64>> = centered
        .iter()
        .map(|d| Vector2::new(d.dot(e1), d.dot(e2)))
        .collect();
    let hull = convex_hull(projected);

    let radius = hull.iter().map(|p| p.norm()).fold(0.0, f64::max);
    let min_edge = HULL_EDGE_TOLERANCE * radius;

    let width = |direction: &Vector2<f64>| {
        let (lo, hi) = hull.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), p| {
            let t = p.dot(direction);
            (lo.min(t), hi.max(t))
        });
        hi - lo
    };

    let mut best: Option<(f64, Vector2<f64>)> = None;
    for (i, p) in hull.iter().enumerate() {
        let edge = hull[(i + 1) % hull.len()] - p;
        let length = edge.norm();
        if length <= min_edge {
            continue;
        }
        let along = edge / length;
        let across = Vector2::new(-along.y, along.x);
        let area = width(&along) * width(&across);
        if best.map_or(true, |(best_area, _)| area < best_area) {
            best = Some((area, along));
        }
    }

    match best {
        Some((_, w)) => [e1 * w.x + e2 * w.y, e2 * w.x - e1 * w.y],
        None => [*e1, *e2],
    }
}

/// Counter-clockwise convex hull (monotone chain) without collinear points
fn convex_hull(mut points: Vec<Vector2<f64>>) -> Vec<Vector2<f64>> {
    points.sort_by(|a, b| {
        a.x.partial_cmp(&b.x)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.y.partial_cmp(&b.y).unwrap_or(std::cmp::Ordering::Equal))
    });
    points.dedup();
    if points.len() < 3 {
        return points;
    }

    let cross = |o: &Vector2<f64>, a: &Vector2<f64>, b: &Vector2<f64>| {
        (a.x - o.x) * (b.y - o.y) - (a.y - o.y) * (b.x - o.x)
    };

    let mut hull: Vec<Vector2<f64>> = Vec::with_capacity(points.len() + 1);
    // lower hull
    for p in &points {
        while hull.len() >= 2 && cross(&hull[hull.len() - 2], &hull[hull.len() - 1], p) <= 0.0 {
            hull.pop();
        }
        hull.push(*p);
    }
    // upper hull
    let lower_len = hull.len() + 1;
    for p in points.iter().rev().skip(1) {
        while hull.len() >= lower_len && cross(&hull[hull.len() - 2], &hull[hull.len() - 1], p) <= 0.0 {
            hull.pop();
        }
        hull.push(*p);
    }
    hull.pop();
    hull
}

fn build_node(
    points: Vec<Point3f>,
    depth: usize,
    options: &ObbTreeOptions,
    level: &mut usize,
    node_count: &mut usize,
) -> Result<ObbNode> {
    let obb = OrientedBox::fit(&points)?;
    *level = (*level).max(depth);
    *node_count += 1;

    let point_count = points.len();
    let splittable =
        depth < options.max_depth && point_count > options.max_points_per_leaf && point_count >= 2;

    let children = if splittable {
        let (lower, upper) = split_at_median(points, &obb);
        let lower = build_node(lower, depth + 1, options, level, node_count)?;
        let upper = build_node(upper, depth + 1, options, level, node_count)?;
        Some(Box::new([lower, upper]))
    } else {
        None
    };

    Ok(ObbNode {
        obb,
        depth,
        point_count,
        children,
    })
}

/// Split at the median projection onto the longest edge. Both halves are non-empty
/// for two or more points.
fn split_at_median(points: Vec<Point3f>, obb: &OrientedBox) -> (Vec<Point3f>, Vec<Point3f>) {
    let axis = obb.axes[obb.longest_axis()];
    let mut keyed: Vec<(f32, Point3f)> = points
        .into_iter()
        .map(|p| ((p - obb.corner).dot(&axis), p))
        .collect();
    keyed.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));

    let upper = keyed.split_off(keyed.len() / 2);
    (
        keyed.into_iter().map(|(_, p)| p).collect(),
        upper.into_iter().map(|(_, p)| p).collect(),
    )
}

fn collect_level<'a>(node: &'a ObbNode, level: usize, out: &mut Vec<&'a OrientedBox>) {
    if node.depth == level {
        out.push(&node.obb);
    } else if let Some(children) = node.children() {
        for child in children.iter() {
            collect_level(child, level, out);
        }
    }
}

fn collect_leaves<'a>(node: &'a ObbNode, out: &mut Vec<&'a OrientedBox>) {
    match node.children() {
        Some(children) => children.iter().for_each(|child| collect_leaves(child, out)),
        None => out.push(&node.obb),
    }
}
