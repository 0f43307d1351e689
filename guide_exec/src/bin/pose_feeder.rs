//! Live pose feeder.
//!
//! Replays a recorded route into the live pose file at a fixed rate, for
//! exercising the live guidance loop end to end without a real localisation
//! process. Each tick overwrites the file with the next route point, and
//! `--loop` starts the route over when it runs out.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

// External
use color_eyre::{
    eyre::{eyre, WrapErr},
    Report,
};
use log::{debug, info, trace, warn};
use nalgebra::UnitQuaternion;
use structopt::StructOpt;

// Internal
use guide_lib::{
    guidance::Params,
    pose::{self, LivePose},
    route::{self, RoutePoint},
};
use util::{
    logger::{logger_init, LevelFilter},
    session::Session,
};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Replay rates below this are treated as configuration mistakes.
const MIN_RATE_HZ: f64 = 1e-3;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Command line options for the pose feeder
#[derive(Debug, StructOpt)]
#[structopt(
    name = "guide_pose_feeder",
    about = "Replays a route into the live pose file"
)]
struct Opt {
    /// The route CSV to replay
    #[structopt(long)]
    route: PathBuf,

    /// The live pose file to write, defaults to the parameter file value
    #[structopt(long)]
    pose_file: Option<PathBuf>,

    /// Replay rate in poses per second
    #[structopt(long, default_value = "10.0")]
    rate: f64,

    /// Start the route over when the end is reached
    #[structopt(long = "loop")]
    loop_forever: bool,
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Executable main function, entry point.
fn main() -> Result<(), Report> {
    color_eyre::install()?;

    let opt = Opt::from_args();

    // ---- EARLY INITIALISATION ----

    let session =
        Session::new("guide_pose_feeder", "sessions").wrap_err("Failed to create the session")?;

    logger_init(LevelFilter::Trace, &session).wrap_err("Failed to initialise logging")?;

    info!("Pose Feeder\n");

    // ---- VALIDATE OPTIONS ----

    if !(opt.rate.is_finite() && opt.rate >= MIN_RATE_HZ) {
        return Err(eyre!(
            "--rate must be at least {} Hz, got {}",
            MIN_RATE_HZ,
            opt.rate
        ));
    }

    // ---- LOAD THE ROUTE ----

    let route = route::load_route(&opt.route)
        .wrap_err_with(|| format!("Could not load the route from {:?}", opt.route))?;

    if route.is_empty() {
        return Err(eyre!("The route at {:?} is empty", opt.route));
    }

    let pose_file = match opt.pose_file {
        Some(path) => path,
        None => {
            let params = Params::load("guidance.toml")
                .wrap_err("Could not load guidance params for the default pose file")?;
            PathBuf::from(params.pose_file_path)
        }
    };

    info!(
        "Replaying {} route points to {:?} at {} Hz{}",
        route.len(),
        pose_file,
        opt.rate,
        if opt.loop_forever { ", looping" } else { "" }
    );

    // Ctrl-C stops the replay between ticks
    let stop = Arc::new(AtomicBool::new(false));
    let handler_flag = stop.clone();
    ctrlc::set_handler(move || handler_flag.store(true, Ordering::SeqCst))
        .wrap_err("Could not set the Ctrl-C handler")?;

    let tick = Duration::from_secs_f64(1.0 / opt.rate);

    let result = feed(&route, &pose_file, tick, opt.loop_forever, &stop);

    session.exit();

    result
}

/// Replay the route into the pose file until it runs out or the stop flag
/// is set. Write failures are fatal, the consumer side would otherwise poll
/// a stale pose forever.
fn feed(
    route: &[RoutePoint],
    pose_file: &PathBuf,
    tick: Duration,
    loop_forever: bool,
    stop: &AtomicBool,
) -> Result<(), Report> {
    let mut idx = 0;

    loop {
        if stop.load(Ordering::SeqCst) {
            warn!("Replay interrupted");
            break;
        }

        let point = &route[idx];
        let pose = LivePose {
            timestamp_s: point.timestamp_s,
            position_m: point.position_m,
            attitude_q: point.attitude_q.unwrap_or_else(UnitQuaternion::identity),
        };

        pose::write_live_pose(pose_file, &pose)
            .wrap_err_with(|| format!("Could not write the pose file {:?}", pose_file))?;

        trace!("Fed pose {} of {}", idx + 1, route.len());

        idx += 1;
        if idx >= route.len() {
            if loop_forever {
                debug!("End of the route, starting over");
                idx = 0;
            } else {
                info!("End of the route");
                break;
            }
        }

        thread::sleep(tick);
    }

    Ok(())
}
