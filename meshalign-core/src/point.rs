//! Point types and related functionality

use nalgebra::{Point3, Vector3};

/// A 3D point with floating point coordinates
pub type Point3f = Point3<f32>;

/// A 3D vector with floating point components
pub type Vector3f = Vector3<f32>;

/// Arithmetic mean of a point set, or `None` when the set is empty
pub fn centroid(points: &[Point3f]) -> Option<Point3f> {
    if points.is_empty() {
        return None;
    }

    let sum = points
        .iter()
        .fold(Vector3f::zeros(), |acc, p| acc + p.coords);
    Some(Point3f::from(sum / points.len() as f32))
}

/// Axis-aligned bounds of a point set as `(min, max)`, or `None` when empty
pub fn bounds(points: &[Point3f]) -> Option<(Point3f, Point3f)> {
    let first = *points.first()?;
    let mut min = first;
    let mut max = first;

    for p in points {
        min.x = min.x.min(p.x);
        min.y = min.y.min(p.y);
        min.z = min.z.min(p.z);

        max.x = max.x.max(p.x);
        max.y = max.y.max(p.y);
        max.z = max.z.max(p.z);
    }

    Some((min, max))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_centroid() {
        let points = vec![
            Point3f::new(0.0, 0.0, 0.0),
            Point3f::new(2.0, 0.0, 0.0),
            Point3f::new(0.0, 4.0, 0.0),
            Point3f::new(2.0, 4.0, 8.0),
        ];
        let c = centroid(&points).unwrap();
        assert_relative_eq!(c, Point3f::new(1.0, 2.0, 2.0));
        assert!(centroid(&[]).is_none());
    }

    #[test]
    fn test_bounds() {
        let points = vec![Point3f::new(-1.0, 2.0, 0.5), Point3f::new(3.0, -2.0, 0.0)];
        let (min, max) = bounds(&points).unwrap();
        assert_eq!(min, Point3f::new(-1.0, -2.0, 0.0));
        assert_eq!(max, Point3f::new(3.0, 2.0, 0.5));
        assert!(bounds(&[]).is_none());
    }
}
