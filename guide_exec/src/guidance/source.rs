//! Position sources
//!
//! A position source supplies the guidance loop with its per-step pose
//! samples. The three implementations cover the ways a run can be driven:
//! replaying the path itself (offline), polling the live pose file written
//! by an external localisation process (online), and an in-process shared
//! cell for embedding the loop alongside its pose producer.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Mutex;

// External
use nalgebra::Vector2;

// Internal
use crate::path::Path;
use crate::pose;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A single position sample handed to the guidance loop.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct PoseSample {
    /// Current position in the ground plane, in meters
    pub position_m: Vector2<f64>,

    /// Index of the path point this sample sits on, if the source knows it.
    /// Replay sources do, live sources don't.
    pub path_index: Option<usize>,
}

/// Replays the points of a path in order, driving offline runs.
pub struct RouteReplay<'a> {
    path: &'a Path,
    next_index: usize,
}

/// Polls the live pose file for the most recent sample, driving online runs.
pub struct LivePoseFile {
    file_path: PathBuf,
}

/// An in-process latest-value pose cell.
///
/// The producer side publishes positions as they become available, the
/// consumer side takes the latest unconsumed one. A publish replaces any
/// position the consumer hasn't taken yet, and consuming the same position
/// twice yields `Pending` the second time.
#[derive(Clone, Default)]
pub struct SharedPoseCell {
    inner: Arc<Mutex<CellState>>,
}

#[derive(Default)]
struct CellState {
    position_m: Option<Vector2<f64>>,
    version: u64,
    consumed: u64,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// The outcome of asking a source for its next sample.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum SourceStep {
    /// A sample is available
    Sample(PoseSample),

    /// Nothing parsable right now, try again next cycle
    Pending,

    /// The source will never produce another sample
    Exhausted,
}

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// Capability of supplying per-step position samples to the guidance loop.
pub trait PositionSource {
    fn next_sample(&mut self) -> SourceStep;
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl<'a> RouteReplay<'a> {
    pub fn new(path: &'a Path) -> Self {
        Self {
            path,
            next_index: 0,
        }
    }
}

impl PositionSource for RouteReplay<'_> {
    fn next_sample(&mut self) -> SourceStep {
        if self.next_index >= self.path.num_points() {
            return SourceStep::Exhausted;
        }

        let sample = PoseSample {
            position_m: self.path.point(self.next_index),
            path_index: Some(self.next_index),
        };

        self.next_index += 1;

        SourceStep::Sample(sample)
    }
}

impl LivePoseFile {
    pub fn new<P: Into<PathBuf>>(file_path: P) -> Self {
        Self {
            file_path: file_path.into(),
        }
    }
}

impl PositionSource for LivePoseFile {
    fn next_sample(&mut self) -> SourceStep {
        match pose::read_live_pose(&self.file_path) {
            Some(pose) => SourceStep::Sample(PoseSample {
                position_m: pose.position_m.xy(),
                path_index: None,
            }),
            None => SourceStep::Pending,
        }
    }
}

impl SharedPoseCell {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish a new position, replacing any unconsumed one.
    pub fn publish(&self, position_m: Vector2<f64>) {
        if let Ok(mut cell) = self.inner.lock() {
            cell.position_m = Some(position_m);
            cell.version += 1;
        }
    }
}

impl PositionSource for SharedPoseCell {
    fn next_sample(&mut self) -> SourceStep {
        let mut cell = match self.inner.lock() {
            Ok(cell) => cell,
            Err(_) => return SourceStep::Pending,
        };

        if cell.version == cell.consumed {
            return SourceStep::Pending;
        }

        cell.consumed = cell.version;

        match cell.position_m {
            Some(position_m) => SourceStep::Sample(PoseSample {
                position_m,
                path_index: None,
            }),
            None => SourceStep::Pending,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_route_replay() {
        let path = Path::from_points(vec![
            Vector2::new(0.0, 0.0),
            Vector2::new(1.0, 0.0),
            Vector2::new(2.0, 0.0),
        ])
        .unwrap();

        let mut replay = RouteReplay::new(&path);

        for i in 0..path.num_points() {
            assert_eq!(
                replay.next_sample(),
                SourceStep::Sample(PoseSample {
                    position_m: path.point(i),
                    path_index: Some(i),
                })
            );
        }

        // Once exhausted, always exhausted
        assert_eq!(replay.next_sample(), SourceStep::Exhausted);
        assert_eq!(replay.next_sample(), SourceStep::Exhausted);
    }

    #[test]
    fn test_shared_cell_latest_wins() {
        let cell = SharedPoseCell::new();
        let mut consumer = cell.clone();

        // Nothing published yet
        assert_eq!(consumer.next_sample(), SourceStep::Pending);

        // Two publishes before a consume, only the latest is seen
        cell.publish(Vector2::new(1.0, 0.0));
        cell.publish(Vector2::new(2.0, 0.0));

        assert_eq!(
            consumer.next_sample(),
            SourceStep::Sample(PoseSample {
                position_m: Vector2::new(2.0, 0.0),
                path_index: None,
            })
        );

        // Consumed, nothing new until the next publish
        assert_eq!(consumer.next_sample(), SourceStep::Pending);

        cell.publish(Vector2::new(3.0, 0.0));
        assert!(matches!(consumer.next_sample(), SourceStep::Sample(_)));
    }

    #[test]
    fn test_live_pose_file_missing() {
        let mut source = LivePoseFile::new("/nonexistent/LivePose.txt");

        assert_eq!(source.next_sample(), SourceStep::Pending);
    }

    #[test]
    fn test_live_pose_file_reads_latest() {
        let file_path = std::env::temp_dir().join(format!(
            "guide_source_test_{}.txt",
            std::process::id()
        ));

        std::fs::write(&file_path, "1.0 5.0 6.0 0.0\n2.0 7.0 8.0 0.0\n").unwrap();

        let mut source = LivePoseFile::new(&file_path);

        assert_eq!(
            source.next_sample(),
            SourceStep::Sample(PoseSample {
                position_m: Vector2::new(7.0, 8.0),
                path_index: None,
            })
        );

        std::fs::remove_file(&file_path).unwrap();
    }
}
