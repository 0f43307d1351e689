//! # Live pose transport
//!
//! Online guidance reads the robot's current pose from a small text file
//! which an external localisation process keeps overwriting. Each line is
//!
//! ```text
//! timestamp x y z [qx qy qz qw]
//! ```
//!
//! with exactly 4 or exactly 8 whitespace-separated fields. The reader takes
//! the most recent non-empty line and treats anything unparsable as "no
//! sample", never as an error, since a read can race a partial write.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use nalgebra::{Quaternion, UnitQuaternion, Vector3};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A pose sampled from the live channel.
#[derive(Debug, Copy, Clone)]
pub struct LivePose {
    /// Timestamp of the sample, in seconds
    pub timestamp_s: f64,

    /// Position in meters
    pub position_m: Vector3<f64>,

    /// Attitude, identity when the sample carried no quaternion
    pub attitude_q: UnitQuaternion<f64>,
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Parse a single live pose line.
///
/// Accepts the 4-field form (no attitude, identity is substituted) and the
/// 8-field form. Any other field count, or a field which doesn't parse as a
/// float, gives `None`.
pub fn parse_live_pose(line: &str) -> Option<LivePose> {
    let fields = line
        .split_whitespace()
        .map(|f| f.parse::<f64>().ok())
        .collect::<Option<Vec<f64>>>()?;

    let attitude_q = match fields.len() {
        4 => UnitQuaternion::identity(),
        8 => UnitQuaternion::from_quaternion(Quaternion::new(
            fields[7], fields[4], fields[5], fields[6],
        )),
        _ => return None,
    };

    Some(LivePose {
        timestamp_s: fields[0],
        position_m: Vector3::new(fields[1], fields[2], fields[3]),
        attitude_q,
    })
}

/// Read the most recent pose from the live pose file.
///
/// Returns `None` if the file is missing, empty, or its last non-empty line
/// doesn't parse.
pub fn read_live_pose<P: AsRef<std::path::Path>>(file_path: P) -> Option<LivePose> {
    let contents = std::fs::read_to_string(file_path).ok()?;

    contents
        .lines()
        .rev()
        .find(|line| !line.trim().is_empty())
        .and_then(parse_live_pose)
}

/// Write a pose to the live pose file, truncating any previous contents.
pub fn write_live_pose<P: AsRef<std::path::Path>>(
    file_path: P,
    pose: &LivePose,
) -> std::io::Result<()> {
    std::fs::write(file_path, format_live_pose(pose))
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

fn format_live_pose(pose: &LivePose) -> String {
    format!(
        "{:.6} {:.6} {:.6} {:.6} {:.6} {:.6} {:.6} {:.6}\n",
        pose.timestamp_s,
        pose.position_m.x,
        pose.position_m.y,
        pose.position_m.z,
        pose.attitude_q.coords.x,
        pose.attitude_q.coords.y,
        pose.attitude_q.coords.z,
        pose.attitude_q.coords.w,
    )
}
