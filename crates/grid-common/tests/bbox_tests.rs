//! Tests for BoundingBox operations used by the extent resolver and grid.

use grid_common::bbox::BoundingBox;

// ============================================================================
// Constructor tests
// ============================================================================

#[test]
fn test_bbox_new() {
    let bbox = BoundingBox::new(400000.0, 2600000.0, 410000.0, 2612000.0);
    assert_eq!(bbox.min_x, 400000.0);
    assert_eq!(bbox.min_y, 2600000.0);
    assert_eq!(bbox.max_x, 410000.0);
    assert_eq!(bbox.max_y, 2612000.0);
}

#[test]
fn test_bbox_copy() {
    let bbox1 = BoundingBox::new(0.0, 0.0, 10.0, 10.0);
    let bbox2 = bbox1;
    assert_eq!(bbox1, bbox2);
}

#[test]
fn test_from_single_point_is_degenerate() {
    let bbox = BoundingBox::from_points([(5.0, 7.0)]).unwrap();
    assert_eq!(bbox, BoundingBox::new(5.0, 7.0, 5.0, 7.0));
    assert!(bbox.is_degenerate());
}

// ============================================================================
// Dimension tests
// ============================================================================

#[test]
fn test_width_height() {
    let bbox = BoundingBox::new(0.0, 0.0, 250.0, 100.0);
    assert_eq!(bbox.width(), 250.0);
    assert_eq!(bbox.height(), 100.0);
}

#[test]
fn test_center() {
    let bbox = BoundingBox::new(-10.0, -20.0, 10.0, 40.0);
    assert_eq!(bbox.center(), (0.0, 10.0));
}

// ============================================================================
// Union / include tests
// ============================================================================

#[test]
fn test_union_covers_both() {
    let a = BoundingBox::new(0.0, 0.0, 1.0, 1.0);
    let b = BoundingBox::new(-1.0, 0.5, 0.5, 3.0);
    let u = a.union(&b);
    assert_eq!(u, BoundingBox::new(-1.0, 0.0, 1.0, 3.0));
    assert_eq!(u, b.union(&a));
}

#[test]
fn test_include_point_inside_is_noop() {
    let mut bbox = BoundingBox::new(0.0, 0.0, 10.0, 10.0);
    bbox.include_point(5.0, 5.0);
    assert_eq!(bbox, BoundingBox::new(0.0, 0.0, 10.0, 10.0));
}

// ============================================================================
// Intersection tests
// ============================================================================

#[test]
fn test_touching_edges_do_not_intersect() {
    let a = BoundingBox::new(0.0, 0.0, 100.0, 100.0);
    let b = BoundingBox::new(100.0, 0.0, 200.0, 100.0);
    assert!(!a.intersects(&b));
    assert!(a.intersection(&b).is_none());
}

#[test]
fn test_contained_box_intersection_is_inner() {
    let outer = BoundingBox::new(0.0, 0.0, 100.0, 100.0);
    let inner = BoundingBox::new(10.0, 10.0, 20.0, 20.0);
    assert_eq!(outer.intersection(&inner), Some(inner));
}

#[test]
fn test_contains_point_edges_inclusive() {
    let bbox = BoundingBox::new(0.0, 0.0, 10.0, 10.0);
    assert!(bbox.contains_point(0.0, 0.0));
    assert!(bbox.contains_point(10.0, 10.0));
    assert!(!bbox.contains_point(10.0001, 5.0));
}

#[test]
fn test_to_array_order() {
    let bbox = BoundingBox::new(1.0, 2.0, 3.0, 4.0);
    assert_eq!(bbox.to_array(), [1.0, 2.0, 3.0, 4.0]);
}
