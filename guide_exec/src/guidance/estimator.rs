//! Heading and cross-track estimation
//!
//! Both estimates are signed with the same convention: positive means "to
//! the left" by the right hand rule with z up. The sign comes from the z
//! component of the cross product of the two directions extended into 3D.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use nalgebra::{Vector2, Vector3};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Below this magnitude a target vector is treated as zero and the heading
/// error is defined to be exactly zero.
pub const TARGET_VEC_EPSILON: f64 = 1e-9;

/// Below this squared length a segment is treated as degenerate and the
/// cross-track projection collapses to the segment start.
pub const SEGMENT_LENGTH_SQ_EPSILON: f64 = 1e-12;

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Get the signed angle in degrees between the heading direction and the
/// direction to the target, in `[-180, 180]`.
///
/// Positive means the target lies to the left of the heading. The heading is
/// expected to be a unit vector. A target vector shorter than
/// `TARGET_VEC_EPSILON` gives exactly zero.
pub fn heading_error_deg(heading: Vector2<f64>, target_vec: Vector2<f64>) -> f64 {
    let target_norm = target_vec.norm();

    if target_norm < TARGET_VEC_EPSILON {
        return 0.0;
    }

    let target_unit = target_vec / target_norm;

    // Clamp guards against dot products creeping just outside [-1, 1]
    let angle_deg = heading
        .dot(&target_unit)
        .clamp(-1.0, 1.0)
        .acos()
        .to_degrees();

    let cross = Vector3::new(heading[0], heading[1], 0.0)
        .cross(&Vector3::new(target_unit[0], target_unit[1], 0.0));

    if cross[2] >= 0.0 {
        angle_deg
    } else {
        -angle_deg
    }
}

/// Get the signed lateral distance in meters from a point to a path segment.
///
/// The point is projected onto the segment with the projection parameter
/// clamped to `[0, 1]`, so positions beyond either end measure to the
/// nearest endpoint. Positive means the point lies to the left of the
/// segment direction. A degenerate segment (squared length below
/// `SEGMENT_LENGTH_SQ_EPSILON`) gives the distance to the segment start,
/// positive by convention.
pub fn cross_track_m(
    point: Vector2<f64>,
    seg_start: Vector2<f64>,
    seg_end: Vector2<f64>,
) -> f64 {
    let seg_vec = seg_end - seg_start;
    let offset = point - seg_start;

    let length_sq = seg_vec.norm_squared();

    if length_sq < SEGMENT_LENGTH_SQ_EPSILON {
        return offset.norm();
    }

    let t = (offset.dot(&seg_vec) / length_sq).clamp(0.0, 1.0);
    let projection = seg_start + seg_vec * t;
    let distance_m = (point - projection).norm();

    let cross = Vector3::new(seg_vec[0], seg_vec[1], 0.0)
        .cross(&Vector3::new(offset[0], offset[1], 0.0));

    if cross[2] >= 0.0 {
        distance_m
    } else {
        -distance_m
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_heading_error_aligned() {
        let heading = Vector2::new(1.0, 0.0);

        assert!(heading_error_deg(heading, heading).abs() < 1e-6);

        // Scaling the target vector must not change the angle
        assert!(heading_error_deg(heading, Vector2::new(100.0, 0.0)).abs() < 1e-6);
    }

    #[test]
    fn test_heading_error_opposed() {
        let heading = Vector2::new(1.0, 0.0);
        let error = heading_error_deg(heading, -heading);

        assert!((error.abs() - 180.0).abs() < 1e-6);
    }

    #[test]
    fn test_heading_error_sign() {
        let heading = Vector2::new(1.0, 0.0);

        // Target to the left is positive
        let left = heading_error_deg(heading, Vector2::new(0.0, 1.0));
        assert!((left - 90.0).abs() < 1e-6);

        // Target to the right is negative
        let right = heading_error_deg(heading, Vector2::new(0.0, -1.0));
        assert!((right + 90.0).abs() < 1e-6);

        let quarter_left = heading_error_deg(heading, Vector2::new(1.0, 1.0));
        assert!((quarter_left - 45.0).abs() < 1e-6);
    }

    #[test]
    fn test_heading_error_zero_target() {
        let heading = Vector2::new(1.0, 0.0);

        assert_eq!(heading_error_deg(heading, Vector2::new(0.0, 0.0)), 0.0);
        assert_eq!(heading_error_deg(heading, Vector2::new(1e-12, -1e-12)), 0.0);
    }

    #[test]
    fn test_cross_track_on_segment() {
        let a = Vector2::new(0.0, 0.0);
        let b = Vector2::new(2.0, 0.0);

        assert!(cross_track_m(Vector2::new(1.0, 0.0), a, b).abs() < 1e-9);
        assert!(cross_track_m(a, a, b).abs() < 1e-9);
        assert!(cross_track_m(b, a, b).abs() < 1e-9);
    }

    #[test]
    fn test_cross_track_sign() {
        let a = Vector2::new(0.0, 0.0);
        let b = Vector2::new(2.0, 0.0);

        // Left of the segment direction is positive
        let left = cross_track_m(Vector2::new(1.0, 0.5), a, b);
        assert!((left - 0.5).abs() < 1e-9);

        // Reflecting the point across the segment flips the sign
        let right = cross_track_m(Vector2::new(1.0, -0.5), a, b);
        assert!((right + 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_cross_track_clamped_projection() {
        let a = Vector2::new(0.0, 0.0);
        let b = Vector2::new(1.0, 0.0);

        // Beyond the end of the segment the distance is to the endpoint
        let beyond = cross_track_m(Vector2::new(2.0, 1.0), a, b);
        assert!((beyond - std::f64::consts::SQRT_2).abs() < 1e-9);

        // Before the start of the segment, to the start point
        let before = cross_track_m(Vector2::new(-1.0, -1.0), a, b);
        assert!((before + std::f64::consts::SQRT_2).abs() < 1e-9);
    }

    #[test]
    fn test_cross_track_degenerate_segment() {
        let a = Vector2::new(1.0, 1.0);

        // Zero length segment measures from its start, positive either side
        let above = cross_track_m(Vector2::new(1.0, 4.0), a, a);
        assert!((above - 3.0).abs() < 1e-9);

        let below = cross_track_m(Vector2::new(1.0, -2.0), a, a);
        assert!((below - 3.0).abs() < 1e-9);
    }
}
