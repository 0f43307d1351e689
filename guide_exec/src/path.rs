//! # Path
//!
//! This module defines the recorded path that guidance follows. A path wraps
//! an ordered sequence of planar points together with the cumulative
//! arclength along them, and provides the point queries the guidance loop is
//! built from: nearest point, arclength lookahead and local tangent.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use nalgebra::Vector2;
use serde::{Deserialize, Serialize};

// Internal
use crate::route::RoutePoint;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Added to the norm of a tangent difference before normalising, so that a
/// locally degenerate (zero length) difference yields a finite direction
/// instead of a division fault.
pub const TANGENT_EPSILON: f64 = 1e-9;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A recorded path to follow.
///
/// Immutable once constructed. Point indices are zero based and contiguous.
/// The cumulative arclength starts at zero and is monotonically
/// non-decreasing, which is what makes the lookahead query a binary search.
#[derive(Clone, Serialize, Deserialize, Debug)]
pub struct Path {
    /// The points making up the path
    points_m: Vec<Vector2<f64>>,

    /// Cumulative arclength at each point, `arclength_m[0] == 0.0`
    arclength_m: Vec<f64>,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Errors in constructing a path
#[derive(Debug, thiserror::Error)]
pub enum PathError {
    #[error("A path needs at least 2 points, got {0}")]
    TooFewPoints(usize),

    #[error("Point {0} of the path has a non-finite coordinate")]
    NonFiniteCoord(usize),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Path {
    /// Create a new path from a sequence of points.
    pub fn from_points(points_m: Vec<Vector2<f64>>) -> Result<Self, PathError> {
        if points_m.len() < 2 {
            return Err(PathError::TooFewPoints(points_m.len()));
        }

        for (i, point) in points_m.iter().enumerate() {
            if !point[0].is_finite() || !point[1].is_finite() {
                return Err(PathError::NonFiniteCoord(i));
            }
        }

        // Accumulate the arclength in a single pass over the points
        let mut arclength_m = Vec::with_capacity(points_m.len());
        arclength_m.push(0.0);
        for i in 1..points_m.len() {
            let segment_m = (points_m[i] - points_m[i - 1]).norm();
            arclength_m.push(arclength_m[i - 1] + segment_m);
        }

        Ok(Self {
            points_m,
            arclength_m,
        })
    }

    /// Create a new path from the planar projection of a loaded route.
    pub fn from_route(route: &[RoutePoint]) -> Result<Self, PathError> {
        Self::from_points(
            route
                .iter()
                .map(|p| Vector2::new(p.position_m[0], p.position_m[1]))
                .collect(),
        )
    }

    /// Get the number of points in the path
    pub fn num_points(&self) -> usize {
        self.points_m.len()
    }

    /// Get the point at the given index
    pub fn point(&self, index: usize) -> Vector2<f64> {
        self.points_m[index]
    }

    /// Get the cumulative arclength at the given index, in meters
    pub fn arclength(&self, index: usize) -> f64 {
        self.arclength_m[index]
    }

    /// Get the total length of the path in meters
    pub fn length(&self) -> f64 {
        self.arclength_m[self.arclength_m.len() - 1]
    }

    /// Get the index of the path point closest to the given position.
    ///
    /// Ties are broken towards the lowest index.
    pub fn nearest_index(&self, position_m: Vector2<f64>) -> usize {
        let mut nearest = 0;
        let mut min_dist_sq = f64::INFINITY;

        for (i, point) in self.points_m.iter().enumerate() {
            let dist_sq = (point - position_m).norm_squared();
            if dist_sq < min_dist_sq {
                min_dist_sq = dist_sq;
                nearest = i;
            }
        }

        nearest
    }

    /// Get the index of the first point at least `lookahead_m` of arclength
    /// beyond the given reference index.
    ///
    /// The result is clamped to `[ref_index, num_points - 1]`: a lookahead
    /// overshooting the end of the path targets the final point, which is the
    /// defined end-of-path behaviour rather than an error.
    pub fn lookahead_index(&self, ref_index: usize, lookahead_m: f64) -> usize {
        let target_s = self.arclength_m[ref_index] + lookahead_m;

        self.arclength_m
            .partition_point(|&s| s < target_s)
            .max(ref_index)
            .min(self.points_m.len() - 1)
    }

    /// Get the unit tangent of the path at the given index.
    ///
    /// Interior points use the central difference of their neighbours, the
    /// first and last points use one sided differences.
    pub fn tangent_at(&self, index: usize) -> Vector2<f64> {
        let last = self.points_m.len() - 1;

        let diff = if index == 0 {
            self.points_m[1] - self.points_m[0]
        } else if index >= last {
            self.points_m[last] - self.points_m[last - 1]
        } else {
            self.points_m[index + 1] - self.points_m[index - 1]
        };

        diff / (diff.norm() + TANGENT_EPSILON)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn straight_path() -> Path {
        Path::from_points(vec![
            Vector2::new(0.0, 0.0),
            Vector2::new(1.0, 0.0),
            Vector2::new(2.0, 0.0),
            Vector2::new(3.0, 0.0),
        ])
        .unwrap()
    }

    #[test]
    fn test_arclength() {
        let path = Path::from_points(vec![
            Vector2::new(0.0, 0.0),
            Vector2::new(3.0, 4.0),
            Vector2::new(3.0, 4.0),
            Vector2::new(6.0, 8.0),
        ])
        .unwrap();

        assert_eq!(path.arclength(0), 0.0);
        assert_eq!(path.arclength(1), 5.0);
        assert_eq!(path.arclength(2), 5.0);
        assert_eq!(path.arclength(3), 10.0);
        assert_eq!(path.length(), 10.0);

        // Non-decreasing
        for i in 1..path.num_points() {
            assert!(path.arclength(i) >= path.arclength(i - 1));
        }
    }

    #[test]
    fn test_invalid_paths() {
        assert!(matches!(
            Path::from_points(vec![Vector2::new(0.0, 0.0)]),
            Err(PathError::TooFewPoints(1))
        ));
        assert!(matches!(
            Path::from_points(vec![]),
            Err(PathError::TooFewPoints(0))
        ));
        assert!(matches!(
            Path::from_points(vec![
                Vector2::new(0.0, 0.0),
                Vector2::new(f64::NAN, 1.0)
            ]),
            Err(PathError::NonFiniteCoord(1))
        ));
        assert!(matches!(
            Path::from_points(vec![
                Vector2::new(0.0, f64::INFINITY),
                Vector2::new(1.0, 1.0)
            ]),
            Err(PathError::NonFiniteCoord(0))
        ));
    }

    #[test]
    fn test_nearest_index() {
        let path = straight_path();

        // Querying a path point returns its own index
        for i in 0..path.num_points() {
            assert_eq!(path.nearest_index(path.point(i)), i);
        }

        assert_eq!(path.nearest_index(Vector2::new(1.2, 0.5)), 1);
        assert_eq!(path.nearest_index(Vector2::new(10.0, 0.0)), 3);

        // Equidistant between points 1 and 2, the lower index wins
        assert_eq!(path.nearest_index(Vector2::new(1.5, 0.0)), 1);
    }

    #[test]
    fn test_lookahead_index() {
        let path = straight_path();

        // Zero lookahead returns the reference point itself
        for i in 0..path.num_points() {
            assert_eq!(path.lookahead_index(i, 0.0), i);
        }

        assert_eq!(path.lookahead_index(0, 1.0), 1);
        assert_eq!(path.lookahead_index(0, 1.5), 2);
        assert_eq!(path.lookahead_index(1, 1.0), 2);

        // Overshooting the remaining arclength targets the final point
        assert_eq!(path.lookahead_index(0, 100.0), 3);
        assert_eq!(path.lookahead_index(3, 1.0), 3);
    }

    #[test]
    fn test_tangent() {
        let path = Path::from_points(vec![
            Vector2::new(0.0, 0.0),
            Vector2::new(1.0, 0.0),
            Vector2::new(1.0, 1.0),
        ])
        .unwrap();

        // Forward difference at the start
        let t0 = path.tangent_at(0);
        assert!((t0[0] - 1.0).abs() < 1e-6);
        assert!(t0[1].abs() < 1e-6);

        // Central difference at the bend: normalised (1, 1)
        let t1 = path.tangent_at(1);
        assert!((t1[0] - std::f64::consts::FRAC_1_SQRT_2).abs() < 1e-6);
        assert!((t1[1] - std::f64::consts::FRAC_1_SQRT_2).abs() < 1e-6);

        // Backward difference at the end
        let t2 = path.tangent_at(2);
        assert!(t2[0].abs() < 1e-6);
        assert!((t2[1] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_tangent_degenerate() {
        // Duplicate points make the central difference zero length, the
        // tangent must still be finite
        let path = Path::from_points(vec![
            Vector2::new(1.0, 1.0),
            Vector2::new(1.0, 1.0),
            Vector2::new(1.0, 1.0),
        ])
        .unwrap();

        let t = path.tangent_at(1);
        assert!(t[0].is_finite());
        assert!(t[1].is_finite());
    }
}
