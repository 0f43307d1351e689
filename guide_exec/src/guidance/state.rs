//! Guidance loop state

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

// External
use log::{trace, warn};
use nalgebra::Vector2;
use serde::{Deserialize, Serialize};

// Internal
use super::*;
use crate::path::Path;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// The guidance loop.
///
/// Holds the path to follow, the goal and the loaded parameters, none of
/// which change over a run, plus the current mode. One instance drives one
/// run, offline or live.
pub struct Guidance<'a> {
    path: &'a Path,

    /// Goal position in the ground plane
    goal_position_m: Vector2<f64>,

    params: Params,

    /// Executing mode
    mode: GuidanceMode,
}

/// The output of a single guidance step.
///
/// Kept flat so tabular sinks can serialise it row by row without any
/// flattening of their own.
#[derive(Debug, Copy, Clone, Serialize, Deserialize)]
pub struct GuidanceRecord {
    /// Index of the path point the step referenced
    pub reference_index: usize,

    /// Current position
    pub position_x_m: f64,
    pub position_y_m: f64,

    /// Index of the pursuit target point
    pub target_index: usize,

    /// Position of the pursuit target point
    pub target_x_m: f64,
    pub target_y_m: f64,

    /// Signed angle between the local path direction and the direction to
    /// the target, positive left
    pub heading_error_deg: f64,

    /// Signed lateral offset from the local path segment, positive left
    pub cross_track_error_m: f64,

    /// Straight line distance to the goal
    pub distance_to_goal_m: f64,

    /// Whether this step put us within the goal radius
    pub goal_reached: bool,
}

/// Aggregate summary of a guidance run.
#[derive(Debug, Default, Copy, Clone, Serialize)]
pub struct GuidanceReport {
    /// Number of records the run emitted
    pub num_records: usize,

    /// Distance to goal at the final emitted record
    pub final_distance_to_goal_m: f64,

    /// Largest unsigned cross-track error seen over the run
    pub max_abs_cross_track_error_m: f64,

    /// Largest unsigned heading error seen over the run
    pub max_abs_heading_error_deg: f64,

    /// Whether any step of the run was within the goal radius
    pub goal_reached: bool,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// The possible modes of the guidance loop. `GoalReached` and `Cancelled`
/// are terminal.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum GuidanceMode {
    Running,
    GoalReached,
    Cancelled,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl<'a> Guidance<'a> {
    /// Create a new guidance loop over the given path, towards the given
    /// goal position.
    ///
    /// The parameters are expected to have been validated on load.
    pub fn new(path: &'a Path, goal_position_m: Vector2<f64>, params: Params) -> Self {
        Self {
            path,
            goal_position_m,
            params,
            mode: GuidanceMode::Running,
        }
    }

    /// Get the current mode of the loop.
    pub fn mode(&self) -> GuidanceMode {
        self.mode
    }

    /// Cancel the loop. Terminal modes are kept, so cancelling a loop which
    /// already reached its goal leaves it in `GoalReached`.
    pub fn cancel(&mut self) {
        if self.mode == GuidanceMode::Running {
            self.mode = GuidanceMode::Cancelled;
        }
    }

    /// Evaluate the guidance for a single position sample.
    ///
    /// Finds the reference point (the sample's index hint when it has one,
    /// otherwise the nearest path point), picks the pursuit target one
    /// lookahead ahead of it, and computes the signed errors and goal
    /// distance. Reaching the goal radius latches the mode to `GoalReached`.
    pub fn step(&mut self, sample: &PoseSample) -> GuidanceRecord {
        let position_m = sample.position_m;
        let last = self.path.num_points() - 1;

        // Index hints beyond the path clamp to the final point
        let reference_index = match sample.path_index {
            Some(index) => index.min(last),
            None => self.path.nearest_index(position_m),
        };

        let target_index = self
            .path
            .lookahead_index(reference_index, self.params.lookahead_m);
        let target_m = self.path.point(target_index);

        let heading = self.path.tangent_at(reference_index);
        let heading_error_deg = heading_error_deg(heading, target_m - position_m);

        // The local segment runs from the reference point to its successor,
        // degenerating to a point at the end of the path
        let cross_track_error_m = cross_track_m(
            position_m,
            self.path.point(reference_index),
            self.path.point((reference_index + 1).min(last)),
        );

        let distance_to_goal_m = (self.goal_position_m - position_m).norm();
        let goal_reached = distance_to_goal_m <= self.params.goal_radius_m;

        if goal_reached && self.mode == GuidanceMode::Running {
            self.mode = GuidanceMode::GoalReached;
        }

        GuidanceRecord {
            reference_index,
            position_x_m: position_m[0],
            position_y_m: position_m[1],
            target_index,
            target_x_m: target_m[0],
            target_y_m: target_m[1],
            heading_error_deg,
            cross_track_error_m,
            distance_to_goal_m,
            goal_reached,
        }
    }

    /// Run the batch sweep over every point of the path.
    ///
    /// Each path index is stepped exactly once in order. The goal flag is
    /// recorded as it goes but the sweep never stops early, so the sink
    /// always sees one record per path point.
    pub fn run_offline<F: FnMut(&GuidanceRecord)>(&mut self, mut sink: F) -> GuidanceReport {
        let mut report = GuidanceReport::default();
        let mut source = RouteReplay::new(self.path);

        while let SourceStep::Sample(sample) = source.next_sample() {
            let record = self.step(&sample);
            report.update(&record);
            sink(&record);
        }

        report
    }

    /// Run the polling loop against a live position source.
    ///
    /// Samples the source at the configured rate. A pending source skips the
    /// step, emits nothing, and retries after the same interval. The loop
    /// ends when the goal is reached, the cancel flag is set, or the source
    /// reports it is exhausted.
    pub fn run_live<S, F>(
        &mut self,
        source: &mut S,
        cancel: &AtomicBool,
        mut sink: F,
    ) -> GuidanceReport
    where
        S: PositionSource,
        F: FnMut(&GuidanceRecord),
    {
        let mut report = GuidanceReport::default();
        let cycle_duration = Duration::from_secs_f64(1.0 / self.params.rate_hz);

        loop {
            let cycle_start = Instant::now();

            // Cancellation is polled once per cycle, never mid step
            if cancel.load(Ordering::SeqCst) {
                self.cancel();
                break;
            }

            match source.next_sample() {
                SourceStep::Sample(sample) => {
                    let record = self.step(&sample);
                    report.update(&record);
                    sink(&record);

                    if self.mode == GuidanceMode::GoalReached {
                        break;
                    }
                }
                SourceStep::Pending => {
                    trace!("No pose sample this cycle");
                }
                SourceStep::Exhausted => {
                    warn!("Position source exhausted, stopping the loop");
                    break;
                }
            }

            // Sleep out the remainder of the cycle, warning on overrun
            match cycle_duration.checked_sub(cycle_start.elapsed()) {
                Some(remaining) => thread::sleep(remaining),
                None => warn!(
                    "Guidance cycle overran by {:.06} s",
                    cycle_start.elapsed().as_secs_f64() - cycle_duration.as_secs_f64()
                ),
            }
        }

        report
    }
}

impl GuidanceReport {
    /// Fold a record into the running summary.
    fn update(&mut self, record: &GuidanceRecord) {
        self.num_records += 1;
        self.final_distance_to_goal_m = record.distance_to_goal_m;
        self.max_abs_cross_track_error_m = self
            .max_abs_cross_track_error_m
            .max(record.cross_track_error_m.abs());
        self.max_abs_heading_error_deg = self
            .max_abs_heading_error_deg
            .max(record.heading_error_deg.abs());
        self.goal_reached |= record.goal_reached;
    }
}

#[cfg(test)]
mod test {
    use super::*;

    /// Source yielding a fixed sequence of steps, then `Exhausted`.
    struct ScriptedSource {
        steps: std::vec::IntoIter<SourceStep>,
    }

    impl ScriptedSource {
        fn new(steps: Vec<SourceStep>) -> Self {
            Self {
                steps: steps.into_iter(),
            }
        }
    }

    impl PositionSource for ScriptedSource {
        fn next_sample(&mut self) -> SourceStep {
            self.steps.next().unwrap_or(SourceStep::Exhausted)
        }
    }

    fn straight_path() -> Path {
        Path::from_points(vec![
            Vector2::new(0.0, 0.0),
            Vector2::new(1.0, 0.0),
            Vector2::new(2.0, 0.0),
            Vector2::new(3.0, 0.0),
        ])
        .unwrap()
    }

    fn params(goal_radius_m: f64, rate_hz: f64) -> Params {
        Params {
            lookahead_m: 1.0,
            goal_radius_m,
            rate_hz,
            pose_file_path: String::new(),
        }
    }

    fn sample_at(x: f64, y: f64) -> SourceStep {
        SourceStep::Sample(PoseSample {
            position_m: Vector2::new(x, y),
            path_index: None,
        })
    }

    #[test]
    fn test_offline_straight_line() {
        let path = straight_path();
        let mut guidance = Guidance::new(&path, Vector2::new(3.0, 0.0), params(0.05, 10.0));

        let mut records = Vec::new();
        let report = guidance.run_offline(|r| records.push(*r));

        // One record per path point, in index order
        assert_eq!(records.len(), 4);
        assert_eq!(report.num_records, 4);
        for (i, record) in records.iter().enumerate() {
            assert_eq!(record.reference_index, i);
        }

        // At the start: target one lookahead ahead, no errors, 3 m to go
        assert_eq!(records[0].target_index, 1);
        assert!(records[0].heading_error_deg.abs() < 1e-6);
        assert!(records[0].cross_track_error_m.abs() < 1e-6);
        assert!((records[0].distance_to_goal_m - 3.0).abs() < 1e-6);
        assert!(!records[0].goal_reached);

        // Only the final point is within the goal radius
        assert!(!records[1].goal_reached);
        assert!(!records[2].goal_reached);
        assert!(records[3].goal_reached);
        assert!(records[3].distance_to_goal_m.abs() < 1e-9);

        assert_eq!(guidance.mode(), GuidanceMode::GoalReached);
        assert!(report.goal_reached);
        assert!(report.final_distance_to_goal_m.abs() < 1e-9);
    }

    #[test]
    fn test_offline_never_stops_early() {
        let path = straight_path();

        // Goal on the first point, reached immediately
        let mut guidance = Guidance::new(&path, Vector2::new(0.0, 0.0), params(0.25, 10.0));

        let mut records = Vec::new();
        let report = guidance.run_offline(|r| records.push(*r));

        // The sweep still covers every point
        assert_eq!(records.len(), 4);
        assert!(records[0].goal_reached);
        assert!(!records[3].goal_reached);

        // The mode latched at the first step and stayed latched
        assert_eq!(guidance.mode(), GuidanceMode::GoalReached);
        assert!(report.goal_reached);
    }

    #[test]
    fn test_offline_bend() {
        let path = Path::from_points(vec![
            Vector2::new(0.0, 0.0),
            Vector2::new(1.0, 0.0),
            Vector2::new(1.0, 1.0),
        ])
        .unwrap();

        // The tangent at the bend splits the corner
        let tangent = path.tangent_at(1);
        assert!(heading_error_deg(tangent, Vector2::new(1.0, 1.0)).abs() < 1e-6);
        assert!((heading_error_deg(tangent, Vector2::new(-1.0, -1.0)).abs() - 180.0).abs() < 1e-6);

        let mut guidance = Guidance::new(&path, Vector2::new(1.0, 1.0), params(0.05, 10.0));

        let mut records = Vec::new();
        guidance.run_offline(|r| records.push(*r));

        // From the bend the target is the end point, directly to the left of
        // the corner-splitting tangent by 45 degrees
        assert_eq!(records[1].target_index, 2);
        assert!((records[1].heading_error_deg - 45.0).abs() < 1e-6);

        assert!(records[2].goal_reached);
    }

    #[test]
    fn test_live_reaches_goal() {
        let path = straight_path();
        let mut guidance = Guidance::new(&path, Vector2::new(3.0, 0.0), params(0.25, 1000.0));

        // The second sample sits exactly on the goal radius, which counts as
        // reached
        let mut source = ScriptedSource::new(vec![sample_at(2.0, 0.1), sample_at(2.75, 0.0)]);

        let cancel = AtomicBool::new(false);
        let mut records = Vec::new();
        let report = guidance.run_live(&mut source, &cancel, |r| records.push(*r));

        assert_eq!(records.len(), 2);
        assert!(!records[0].goal_reached);
        assert!(records[1].goal_reached);
        assert_eq!(records[1].distance_to_goal_m, 0.25);

        assert_eq!(guidance.mode(), GuidanceMode::GoalReached);
        assert!(report.goal_reached);
        assert_eq!(report.final_distance_to_goal_m, 0.25);
    }

    #[test]
    fn test_live_skips_pending() {
        let path = straight_path();
        let mut guidance = Guidance::new(&path, Vector2::new(3.0, 0.0), params(0.25, 1000.0));

        let mut source = ScriptedSource::new(vec![
            SourceStep::Pending,
            sample_at(1.0, 0.2),
            SourceStep::Pending,
            SourceStep::Pending,
            sample_at(3.0, 0.0),
        ]);

        let cancel = AtomicBool::new(false);
        let mut records = Vec::new();
        guidance.run_live(&mut source, &cancel, |r| records.push(*r));

        // Pending cycles emit nothing
        assert_eq!(records.len(), 2);
        assert_eq!(guidance.mode(), GuidanceMode::GoalReached);
    }

    #[test]
    fn test_live_cancelled() {
        let path = straight_path();
        let mut guidance = Guidance::new(&path, Vector2::new(3.0, 0.0), params(0.25, 1000.0));

        let mut source = ScriptedSource::new(vec![sample_at(0.0, 0.0)]);

        // Flag already set, the loop must stop before taking any sample
        let cancel = AtomicBool::new(true);
        let mut records = Vec::new();
        let report = guidance.run_live(&mut source, &cancel, |r| records.push(*r));

        assert_eq!(records.len(), 0);
        assert_eq!(report.num_records, 0);
        assert_eq!(guidance.mode(), GuidanceMode::Cancelled);
    }

    #[test]
    fn test_live_source_exhausted() {
        let path = straight_path();
        let mut guidance = Guidance::new(&path, Vector2::new(3.0, 0.0), params(0.25, 1000.0));

        // One sample well short of the goal, then the source dries up
        let mut source = ScriptedSource::new(vec![sample_at(0.5, 0.0)]);

        let cancel = AtomicBool::new(false);
        let mut records = Vec::new();
        guidance.run_live(&mut source, &cancel, |r| records.push(*r));

        assert_eq!(records.len(), 1);
        assert_eq!(guidance.mode(), GuidanceMode::Running);
    }

    #[test]
    fn test_live_with_shared_cell() {
        let path = straight_path();
        let mut guidance = Guidance::new(&path, Vector2::new(3.0, 0.0), params(0.25, 1000.0));

        let cell = SharedPoseCell::new();
        cell.publish(Vector2::new(2.9, 0.0));

        let cancel = AtomicBool::new(false);
        let mut source = cell.clone();
        let mut records = Vec::new();
        guidance.run_live(&mut source, &cancel, |r| records.push(*r));

        assert_eq!(records.len(), 1);
        assert_eq!(guidance.mode(), GuidanceMode::GoalReached);
    }

    #[test]
    fn test_step_uses_index_hint() {
        let path = straight_path();
        let mut guidance = Guidance::new(&path, Vector2::new(3.0, 0.0), params(0.25, 10.0));

        // The position is nearest to index 0, but the hint pins index 2
        let record = guidance.step(&PoseSample {
            position_m: Vector2::new(0.1, 0.0),
            path_index: Some(2),
        });

        assert_eq!(record.reference_index, 2);
        assert_eq!(record.target_index, 3);

        // An overlong hint clamps to the final point
        let record = guidance.step(&PoseSample {
            position_m: Vector2::new(0.1, 0.0),
            path_index: Some(100),
        });

        assert_eq!(record.reference_index, 3);
    }
}
