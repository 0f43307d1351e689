//! Main guidance executable entry point.
//!
//! `guide_exec` keeps a robot on a previously recorded route. Three
//! subcommands cover the workflow:
//!
//!   - `goal` - pick the stopping point on a route and write it to a goal
//!     JSON file, either by route index or by nearest position
//!   - `offline` - sweep the whole route as a batch, producing one guidance
//!     record per route point
//!   - `live` - poll the live pose file at the configured rate, logging
//!     steering guidance until the goal is reached or Ctrl-C
//!
//! Runs are configured by `params/guidance.toml` under the software root
//! (set by the `GUIDE_SW_ROOT` environment variable, defaulting to the
//! working directory). Each run creates a timestamped session directory
//! holding the log file, the guidance CSV and the run summary.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

// External
use color_eyre::{
    eyre::{eyre, WrapErr},
    Report,
};
use log::{info, warn};
use nalgebra::Vector2;
use owo_colors::OwoColorize;
use structopt::StructOpt;

// Internal
use guide_lib::{
    goal::{self, Goal},
    guidance::{Guidance, GuidanceMode, GuidanceRecord, GuidanceReport, LivePoseFile, Params},
    path::Path,
    route,
};
use util::{
    archive::Archiver,
    logger::{logger_init, LevelFilter},
    session::Session,
};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Console sink for live runs.
///
/// Prints a guidance line whenever the reference index or the reached flag
/// changes, so a stationary robot doesn't flood the log with identical
/// lines.
struct ConsoleSink {
    last: Option<(usize, bool)>,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Command line options for the guidance executable
#[derive(Debug, StructOpt)]
#[structopt(name = "guide_exec", about = "Path following guidance")]
enum Cmd {
    /// Sweep the whole route offline, producing one guidance record per
    /// route point.
    #[structopt(name = "offline")]
    Offline {
        /// The route CSV to follow
        #[structopt(long)]
        route: PathBuf,

        /// The goal JSON file to aim for
        #[structopt(long)]
        goal: PathBuf,

        /// Where to write the guidance CSV, defaults to guidance.csv in the
        /// session archive
        #[structopt(long)]
        output: Option<PathBuf>,
    },

    /// Follow the route live, polling the pose file until the goal is
    /// reached or the run is interrupted.
    #[structopt(name = "live")]
    Live {
        /// The route CSV to follow
        #[structopt(long)]
        route: PathBuf,

        /// The goal JSON file to aim for
        #[structopt(long)]
        goal: PathBuf,

        /// The live pose file to poll, defaults to the parameter file value
        #[structopt(long)]
        pose_file: Option<PathBuf>,

        /// Where to write the guidance CSV, defaults to guidance.csv in the
        /// session archive
        #[structopt(long)]
        output: Option<PathBuf>,
    },

    /// Select a goal point on a route and write it to a goal JSON file.
    #[structopt(name = "goal")]
    Goal {
        /// The route CSV to select from
        #[structopt(long)]
        route: PathBuf,

        /// Where to write the goal JSON
        #[structopt(long)]
        out: PathBuf,

        /// Select the route point at this index
        #[structopt(long)]
        index: Option<usize>,

        /// Select the route point nearest to this x y position
        #[structopt(long, number_of_values = 2, allow_hyphen_values = true)]
        near: Option<Vec<f64>>,
    },
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Executable main function, entry point.
fn main() -> Result<(), Report> {
    color_eyre::install()?;

    let cmd = Cmd::from_args();

    // ---- EARLY INITIALISATION ----

    // Initialise session
    let session =
        Session::new("guide_exec", "sessions").wrap_err("Failed to create the session")?;

    // Initialise logger
    logger_init(LevelFilter::Trace, &session).wrap_err("Failed to initialise logging")?;

    info!("Guidance Executable\n");
    info!("Session directory: {:?}\n", session.session_root);

    // ---- COMMAND EXECUTION ----

    let result = match cmd {
        Cmd::Offline {
            route,
            goal,
            output,
        } => exec_offline(&session, route, goal, output),
        Cmd::Live {
            route,
            goal,
            pose_file,
            output,
        } => exec_live(&session, route, goal, pose_file, output),
        Cmd::Goal {
            route,
            out,
            index,
            near,
        } => exec_goal(route, out, index, near),
    };

    // Let the save thread drain before reporting the outcome
    session.exit();

    result
}

/// Run the offline sweep over a whole route.
fn exec_offline(
    session: &Session,
    route_path: PathBuf,
    goal_path: PathBuf,
    output: Option<PathBuf>,
) -> Result<(), Report> {
    let params = Params::load("guidance.toml").wrap_err("Could not load guidance params")?;

    let (path, goal) = load_run_inputs(&route_path, &goal_path)?;

    let mut archiver = create_archiver(session, output)?;

    let mut guidance = Guidance::new(&path, goal.position_2d(), params);

    info!("Starting the offline sweep over {} points", path.num_points());

    let mut records = Vec::with_capacity(path.num_points());
    let report = guidance.run_offline(|record| records.push(*record));

    for record in &records {
        archiver
            .serialise(record)
            .wrap_err("Could not archive a guidance record")?;
    }

    log_report(&report);
    session.save("run_summary.json", report);

    Ok(())
}

/// Follow the route live until the goal is reached or the run is cancelled.
fn exec_live(
    session: &Session,
    route_path: PathBuf,
    goal_path: PathBuf,
    pose_file: Option<PathBuf>,
    output: Option<PathBuf>,
) -> Result<(), Report> {
    let params = Params::load("guidance.toml").wrap_err("Could not load guidance params")?;

    let (path, goal) = load_run_inputs(&route_path, &goal_path)?;

    let mut archiver = create_archiver(session, output)?;

    // Ctrl-C sets the cancel flag, which the loop polls once per cycle
    let cancel = Arc::new(AtomicBool::new(false));
    let handler_flag = cancel.clone();
    ctrlc::set_handler(move || handler_flag.store(true, Ordering::SeqCst))
        .wrap_err("Could not set the Ctrl-C handler")?;

    let pose_file = pose_file.unwrap_or_else(|| PathBuf::from(&params.pose_file_path));
    info!(
        "Polling live poses from {:?} at {} Hz, goal radius {} m",
        pose_file, params.rate_hz, params.goal_radius_m
    );

    let mut source = LivePoseFile::new(pose_file);
    let mut guidance = Guidance::new(&path, goal.position_2d(), params);

    let mut console = ConsoleSink::new();
    let report = guidance.run_live(&mut source, &cancel, |record| {
        if let Err(e) = archiver.serialise(record) {
            warn!("Could not archive a guidance record: {}", e);
        }

        console.print(record);
    });

    match guidance.mode() {
        GuidanceMode::GoalReached => info!("Run complete, goal reached"),
        GuidanceMode::Cancelled => warn!("Run cancelled before reaching the goal"),
        GuidanceMode::Running => warn!("Run stopped without reaching the goal"),
    }

    log_report(&report);
    session.save("run_summary.json", report);

    Ok(())
}

/// Select a goal on a route and write it out.
fn exec_goal(
    route_path: PathBuf,
    out: PathBuf,
    index: Option<usize>,
    near: Option<Vec<f64>>,
) -> Result<(), Report> {
    let route = route::load_route(&route_path)
        .wrap_err_with(|| format!("Could not load the route from {:?}", route_path))?;

    info!("Loaded {} route points from {:?}", route.len(), route_path);

    let goal = match (index, near) {
        (Some(idx), None) => goal::select_by_index(&route, idx),
        (None, Some(near)) if near.len() == 2 => {
            goal::select_nearest(&route, Vector2::new(near[0], near[1]))
        }
        _ => return Err(eyre!("Specify exactly one of --index or --near <x> <y>")),
    }
    .wrap_err("Could not select the goal")?;

    goal::save_goal(&goal, &out)
        .wrap_err_with(|| format!("Could not write the goal to {:?}", out))?;

    info!(
        "Goal written to {:?}: route point {} at ({:.3}, {:.3}) m",
        out, goal.idx, goal.position_m[0], goal.position_m[1]
    );

    Ok(())
}

/// Load the route, build the path to follow, and load the goal for a run.
fn load_run_inputs(route_path: &PathBuf, goal_path: &PathBuf) -> Result<(Path, Goal), Report> {
    let route = route::load_route(route_path)
        .wrap_err_with(|| format!("Could not load the route from {:?}", route_path))?;

    info!("Loaded {} route points from {:?}", route.len(), route_path);

    let path = Path::from_route(&route).wrap_err("The route does not make a valid path")?;

    let goal = goal::load_goal(goal_path)
        .wrap_err_with(|| format!("Could not load the goal from {:?}", goal_path))?;

    info!(
        "Goal is route point {} at ({:.3}, {:.3}) m",
        goal.idx, goal.position_m[0], goal.position_m[1]
    );

    Ok((path, goal))
}

/// Create the guidance record archiver, either at the explicit output path
/// or inside the session archive.
fn create_archiver(session: &Session, output: Option<PathBuf>) -> Result<Archiver, Report> {
    match output {
        Some(path) => {
            info!("Guidance records will be written to {:?}", path);
            Archiver::from_file(path)
        }
        None => Archiver::from_session(session, "guidance.csv"),
    }
    .wrap_err("Could not create the guidance archive")
}

/// Log the aggregate summary of a run.
fn log_report(report: &GuidanceReport) {
    info!(
        "Run summary: {} records, final distance to goal {:.3} m, max |cross track| {:.3} m, \
         max |heading error| {:.1} deg",
        report.num_records,
        report.final_distance_to_goal_m,
        report.max_abs_cross_track_error_m,
        report.max_abs_heading_error_deg,
    );

    if report.goal_reached {
        info!("{}", "GOAL REACHED".bright_green());
    }
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl ConsoleSink {
    fn new() -> Self {
        Self { last: None }
    }

    /// Print a live guidance line if this record changed anything the
    /// operator can act on.
    fn print(&mut self, record: &GuidanceRecord) {
        let key = (record.reference_index, record.goal_reached);

        if self.last == Some(key) {
            return;
        }
        self.last = Some(key);

        if record.goal_reached {
            info!(
                "idx={} dist_to_goal {:.3} m {}",
                record.reference_index,
                record.distance_to_goal_m,
                "GOAL REACHED".bright_green()
            );
        } else {
            // Positive heading error means the target is to our left
            let turn = if record.heading_error_deg >= 0.0 {
                "left"
            } else {
                "right"
            };

            info!(
                "idx={} turn {} {:.1} deg fwd {} dist_to_goal {:.3} m",
                record.reference_index,
                turn,
                record.heading_error_deg.abs(),
                record.target_index,
                record.distance_to_goal_m
            );
        }
    }
}
