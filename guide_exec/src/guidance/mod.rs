//! # Guidance module
//!
//! Guidance is responsible for keeping the robot on a previously recorded
//! path. Each step it takes the current position, finds the nearest path
//! point (or uses the source's index hint when replaying the path itself),
//! projects a pursuit target one lookahead distance further along the path,
//! and computes the signed heading error towards that target and the signed
//! cross-track error from the local path segment. The step also measures the
//! straight line distance to the goal, and when that drops to the goal
//! radius the run is complete.
//!
//! The loop runs in one of two ways. Offline it sweeps every path index once
//! in order, emitting one record per point whatever the goal flag does,
//! which makes the output directly comparable between runs. Live it polls a
//! position source at a fixed rate, skipping cycles with nothing to read,
//! until the goal is reached, the source dries up, or the run is cancelled.
//!
//! Positive errors always mean "to the left", by the right hand rule.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

pub mod estimator;
pub mod params;
pub mod source;
pub mod state;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// Internal
pub use estimator::*;
pub use params::Params;
pub use source::*;
pub use state::*;
