//! # Goal files and selection
//!
//! A goal is a single route point chosen as the stopping target of a run. It
//! is stored as a small JSON record so the selection can be made once and
//! reused across runs:
//!
//! ```json
//! {"idx": 42, "timestamp": 12.5, "t": [1.0, 2.0, 0.0], "q": [0.0, 0.0, 0.0, 1.0]}
//! ```
//!
//! `t` is the position and `q` the optional attitude quaternion in
//! `[x, y, z, w]` component order.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use nalgebra::{UnitQuaternion, Vector2, Vector3};
use serde::{Deserialize, Serialize};
use thiserror::Error;

// Internal
use crate::route::RoutePoint;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// The stopping target of a guidance run.
#[derive(Debug, Copy, Clone, Serialize, Deserialize)]
pub struct Goal {
    /// Index of the chosen point within its route
    pub idx: usize,

    /// Timestamp of the chosen point, in seconds
    #[serde(rename = "timestamp")]
    pub timestamp_s: f64,

    /// Position of the goal, in meters
    #[serde(rename = "t")]
    pub position_m: Vector3<f64>,

    /// Attitude at the goal, if the route carried one
    #[serde(rename = "q", default, skip_serializing_if = "Option::is_none")]
    pub attitude_q: Option<UnitQuaternion<f64>>,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Errors in loading, saving, or selecting a goal.
#[derive(Debug, Error)]
pub enum GoalError {
    #[error("Cannot select a goal from an empty route")]
    EmptyRoute,

    #[error("Goal index {idx} is outside the route (which has {len} points)")]
    IndexOutOfRange { idx: usize, len: usize },

    #[error("Could not read the goal file: {0}")]
    FileReadError(std::io::Error),

    #[error("Could not write the goal file: {0}")]
    FileWriteError(std::io::Error),

    #[error("Could not parse the goal file: {0}")]
    ParseError(serde_json::Error),

    #[error("Could not serialise the goal: {0}")]
    SerialiseError(serde_json::Error),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Goal {
    /// Get the goal position projected into the ground plane.
    pub fn position_2d(&self) -> Vector2<f64> {
        self.position_m.xy()
    }
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Load a goal from the JSON file at the given path.
pub fn load_goal<P: AsRef<std::path::Path>>(file_path: P) -> Result<Goal, GoalError> {
    let goal_str = std::fs::read_to_string(file_path).map_err(GoalError::FileReadError)?;

    serde_json::from_str(&goal_str).map_err(GoalError::ParseError)
}

/// Save a goal as pretty JSON at the given path.
pub fn save_goal<P: AsRef<std::path::Path>>(goal: &Goal, file_path: P) -> Result<(), GoalError> {
    let goal_str = serde_json::to_string_pretty(goal).map_err(GoalError::SerialiseError)?;

    std::fs::write(file_path, goal_str).map_err(GoalError::FileWriteError)
}

/// Select the route point at the given index as the goal.
pub fn select_by_index(route: &[RoutePoint], idx: usize) -> Result<Goal, GoalError> {
    if idx >= route.len() {
        return Err(GoalError::IndexOutOfRange {
            idx,
            len: route.len(),
        });
    }

    Ok(goal_at(route, idx))
}

/// Select the route point nearest to the given ground-plane position as the
/// goal. Ties go to the lower index.
pub fn select_nearest(route: &[RoutePoint], position_m: Vector2<f64>) -> Result<Goal, GoalError> {
    if route.is_empty() {
        return Err(GoalError::EmptyRoute);
    }

    let mut best_idx = 0;
    let mut best_dist_sq = f64::INFINITY;

    for (idx, point) in route.iter().enumerate() {
        let dist_sq = (point.position_m.xy() - position_m).norm_squared();

        if dist_sq < best_dist_sq {
            best_dist_sq = dist_sq;
            best_idx = idx;
        }
    }

    Ok(goal_at(route, best_idx))
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

fn goal_at(route: &[RoutePoint], idx: usize) -> Goal {
    let point = &route[idx];

    Goal {
        idx,
        timestamp_s: point.timestamp_s,
        position_m: point.position_m,
        attitude_q: point.attitude_q,
    }
}
