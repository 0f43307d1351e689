//! # Route loading
//!
//! A route is a CSV of recorded poses, one row per sample. Recorders differ
//! in their column naming, so the loader normalises the header before
//! reading:
//!
//! - position comes from `tx`/`ty`/`tz`, or from `x`/`y`/`z` when the former
//!   are not all present
//! - the timestamp comes from `timestamp` or `t`, with the row index standing
//!   in when neither exists
//! - an orientation quaternion is read from `qx`/`qy`/`qz`/`qw` when all four
//!   columns are present
//!
//! Header matching is case-insensitive and ignores surrounding whitespace.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use csv;
use nalgebra::{Quaternion, UnitQuaternion, Vector3};
use thiserror::Error;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A single recorded pose along a route.
#[derive(Debug, Copy, Clone)]
pub struct RoutePoint {
    /// Timestamp of the sample, in seconds
    pub timestamp_s: f64,

    /// Recorded position, in meters
    pub position_m: Vector3<f64>,

    /// Recorded attitude, if the route carries one. The guidance geometry
    /// never uses this, it is passed through for consumers that do.
    pub attitude_q: Option<UnitQuaternion<f64>>,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Errors in loading a route file.
#[derive(Debug, Error)]
pub enum RouteError {
    #[error("Could not read the route file: {0}")]
    ReadError(csv::Error),

    #[error("The route file has no position columns (need tx/ty/tz or x/y/z)")]
    MissingPositionColumns,

    #[error("Row {row} of the route has an unparsable `{column}` value")]
    BadField { row: usize, column: String },
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Load a route from the CSV file at the given path.
pub fn load_route<P: AsRef<std::path::Path>>(file_path: P) -> Result<Vec<RoutePoint>, RouteError> {
    let reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_path(file_path)
        .map_err(RouteError::ReadError)?;

    read_route(reader)
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

fn read_route<R: std::io::Read>(mut reader: csv::Reader<R>) -> Result<Vec<RoutePoint>, RouteError> {
    let headers = reader.headers().map_err(RouteError::ReadError)?.clone();

    let find = |name: &str| {
        headers
            .iter()
            .position(|h| h.trim().eq_ignore_ascii_case(name))
    };

    // Position columns, preferring the recorder's tx/ty/tz naming
    let pos_cols = match (find("tx"), find("ty"), find("tz")) {
        (Some(x), Some(y), Some(z)) => [x, y, z],
        _ => match (find("x"), find("y"), find("z")) {
            (Some(x), Some(y), Some(z)) => [x, y, z],
            _ => return Err(RouteError::MissingPositionColumns),
        },
    };

    let time_col = find("timestamp").or_else(|| find("t"));

    // Orientation only counts when all four components are present
    let quat_cols = match (find("qx"), find("qy"), find("qz"), find("qw")) {
        (Some(x), Some(y), Some(z), Some(w)) => Some([x, y, z, w]),
        _ => None,
    };

    let mut route = Vec::new();

    for (row, record) in reader.records().enumerate() {
        let record = record.map_err(RouteError::ReadError)?;

        let field = |col: usize, column: &str| -> Result<f64, RouteError> {
            record
                .get(col)
                .and_then(|v| v.trim().parse::<f64>().ok())
                .ok_or_else(|| RouteError::BadField {
                    row,
                    column: column.to_string(),
                })
        };

        let position_m = Vector3::new(
            field(pos_cols[0], "x")?,
            field(pos_cols[1], "y")?,
            field(pos_cols[2], "z")?,
        );

        let timestamp_s = match time_col {
            Some(col) => field(col, "timestamp")?,
            None => row as f64,
        };

        let attitude_q = match quat_cols {
            Some([qx, qy, qz, qw]) => Some(UnitQuaternion::from_quaternion(Quaternion::new(
                field(qw, "qw")?,
                field(qx, "qx")?,
                field(qy, "qy")?,
                field(qz, "qz")?,
            ))),
            None => None,
        };

        route.push(RoutePoint {
            timestamp_s,
            position_m,
            attitude_q,
        });
    }

    Ok(route)
}
