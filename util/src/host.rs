//! Host environment utility functions

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::path::PathBuf;
use thiserror::Error;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Environment variable pointing at the root of the software checkout.
pub const SW_ROOT_ENV_VAR: &str = "GUIDE_SW_ROOT";

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Errors in resolving host information.
#[derive(Debug, Error)]
pub enum HostError {
    #[error(
        "GUIDE_SW_ROOT is not set and the current directory is not accessible: {0}"
    )]
    NoRootAvailable(std::io::Error),
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Get the root directory of the software.
///
/// This is the directory holding the `params` and `sessions` directories. It
/// is taken from the `GUIDE_SW_ROOT` environment variable if set, and falls
/// back to the current working directory so that the executables can be run
/// from a checkout without any environment setup.
pub fn get_guide_sw_root() -> Result<PathBuf, HostError> {
    match std::env::var(SW_ROOT_ENV_VAR) {
        Ok(root) => Ok(PathBuf::from(root)),
        Err(_) => std::env::current_dir().map_err(HostError::NoRootAvailable),
    }
}
