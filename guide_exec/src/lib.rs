//! # Guidance library.
//!
//! This library holds the path following code shared by the guidance
//! executables, and allows other crates in the workspace to use it.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

/// Goal files and selection - choosing and persisting the stopping target
pub mod goal;

/// Guidance module - computes steering guidance along a recorded path
pub mod guidance;

/// Path model - a recorded path and its point queries
pub mod path;

/// Live pose transport - the file channel between localisation and guidance
pub mod pose;

/// Route loading - recorded route CSVs with flexible headers
pub mod route;
