//! Integration tests for meshalign-algorithms
//!
//! These tests run the full alignment pipeline (bounding box alignment, ICP
//! refinement and candidate selection) on synthetic meshes with known offsets.

use meshalign_algorithms::*;
use meshalign_core::{Axis, Point3f, Transform3D, TriangleMesh, Vector3f};

/// Latitude/longitude sphere stretched to distinct semi-axes
fn create_ellipsoid(a: f32, b: f32, c: f32) -> TriangleMesh {
    let mut mesh = TriangleMesh::sphere(1.0, 16, 12);
    for v in &mut mesh.vertices {
        v.x *= a;
        v.y *= b;
        v.z *= c;
    }
    mesh
}

/// Quarter turn about X through the origin, then a unit shift along X
fn rotated_and_shifted() -> Transform3D {
    Transform3D::translation(Vector3f::new(1.0, 0.0, 0.0))
        * Transform3D::quarter_turn_about(&Point3f::origin(), Axis::X, 1)
}

#[test]
fn test_unit_sphere_rotated_and_translated() {
    let source = TriangleMesh::sphere(1.0, 8, 8);
    let target = source.transformed(&rotated_and_shifted());

    let report = MeshAligner::default().align(&source, &target).unwrap();

    assert!(report.distance_before > 0.5);
    assert!(report.obb_accepted);
    assert_ne!(report.selected, AlignmentCandidate::Original);
    assert!(report.distance_after_obb < 1e-4, "box alignment distance {}", report.distance_after_obb);
    assert!(report.min_distance < 1e-4, "final distance {}", report.min_distance);
    assert!(report.icp.converged(), "ICP ended in {:?}", report.icp.state);
    assert_eq!(report.distance(), report.min_distance);

    let scale = report.transform.scale_factor();
    assert!((scale - 1.0).abs() < 1e-4, "scale {}", scale);
}

#[test]
fn test_ellipsoid_rotated_and_translated_is_recovered() {
    let source = create_ellipsoid(3.0, 2.0, 1.0);
    let target = source.transformed(&rotated_and_shifted());

    let report = MeshAligner::default().align(&source, &target).unwrap();

    assert!(report.distance_before > 1.0);
    assert!(report.obb_accepted);
    assert!(report.min_distance < 1e-3, "final distance {}", report.min_distance);
    assert_ne!(report.selected, AlignmentCandidate::Original);

    let final_distance = hausdorff_distance(&report.mesh.vertices, &target.vertices).unwrap();
    assert!(final_distance < 1e-3);
}

#[test]
fn test_pipeline_is_deterministic() {
    let source = create_ellipsoid(2.5, 1.5, 0.8);
    let target = source.transformed(
        &(Transform3D::translation(Vector3f::new(-0.4, 0.7, 0.1))
            * Transform3D::quarter_turn_about(&Point3f::new(0.2, 0.0, 0.0), Axis::Z, 3)),
    );

    let aligner = MeshAligner::default();
    let first = aligner.align(&source, &target).unwrap();
    let second = aligner.align(&source, &target).unwrap();

    assert_eq!(first.selected, second.selected);
    assert_eq!(first.distance_before, second.distance_before);
    assert_eq!(first.distance_after_obb, second.distance_after_obb);
    assert_eq!(first.distance_after_icp, second.distance_after_icp);
    assert_eq!(first.obb.search.candidates, second.obb.search.candidates);
    assert_eq!(first.transform, second.transform);
}

#[test]
fn test_selected_distance_is_monotone_over_offsets() {
    let source = create_ellipsoid(2.0, 1.2, 0.6);
    let aligner = MeshAligner::default();

    for (axis, step) in [(Axis::X, 2), (Axis::Y, 1), (Axis::Z, 1)] {
        let target = source.transformed(
            &(Transform3D::translation(Vector3f::new(0.3, 0.3, -0.2))
                * Transform3D::quarter_turn_about(&Point3f::origin(), axis, step)),
        );
        let report = aligner.align(&source, &target).unwrap();
        assert!(report.min_distance <= report.distance_before);
        assert!(report.distance() <= report.distance_before);
    }
}

#[test]
fn test_small_offset_refined_by_icp() {
    let source = create_ellipsoid(2.0, 1.5, 1.0);
    let nudge = Transform3D::translation(Vector3f::new(0.02, -0.01, 0.015))
        * Transform3D::rotation(meshalign_core::UnitQuaternion::from_euler_angles(0.0, 0.0, 0.05));
    let target = source.transformed(&nudge);

    let icp = IterativeClosestPoint::new(IcpOptions::default().with_max_mean_distance(1e-4))
        .register(&source, &target)
        .unwrap();
    assert!(icp.converged());

    let moved = source.transformed(&icp.transform);
    assert!(hausdorff_distance(&moved.vertices, &target.vertices).unwrap() < 1e-3);
}

#[test]
fn test_stage_outputs_are_consistent() {
    let source = create_ellipsoid(3.0, 2.0, 1.0);
    let target = source.transformed(&rotated_and_shifted());

    let report = MeshAligner::default().align(&source, &target).unwrap();

    assert_eq!(report.obb.search.candidates.len(), 12);
    assert_eq!(report.obb.search.best_landmarks.len(), 8);
    assert!(report.icp.iterations >= 1);
    assert_eq!(report.mesh.face_count(), source.face_count());
}
