//! Guidance parameters

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::Deserialize;
use thiserror::Error;

// Internal
use util::params;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for guidance
#[derive(Deserialize, Debug, Clone)]
pub struct Params {
    /// Arclength ahead of the reference point at which the pursuit target is
    /// picked, in meters
    pub lookahead_m: f64,

    /// Distance from the goal at or below which the goal counts as reached,
    /// in meters
    pub goal_radius_m: f64,

    /// Rate at which the live loop samples the pose source, in hertz
    pub rate_hz: f64,

    /// Default path of the live pose file, overridable on the command line
    pub pose_file_path: String,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Errors in loading or validating the guidance parameters.
#[derive(Debug, Error)]
pub enum ParamsError {
    #[error("Could not load parameters: {0}")]
    LoadError(params::LoadError),

    #[error("lookahead_m must be finite and non-negative, got {0}")]
    InvalidLookahead(f64),

    #[error("goal_radius_m must be finite and non-negative, got {0}")]
    InvalidGoalRadius(f64),

    #[error("rate_hz must be finite and positive, got {0}")]
    InvalidRateHz(f64),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Params {
    /// Load and validate the guidance parameters from the given file in the
    /// params directory.
    pub fn load(param_file_name: &str) -> Result<Self, ParamsError> {
        let params: Self = params::load(param_file_name).map_err(ParamsError::LoadError)?;

        params.validate()?;

        Ok(params)
    }

    /// Check the loaded values make sense. NaNs fail every comparison so the
    /// conditions are written in the rejecting direction.
    pub fn validate(&self) -> Result<(), ParamsError> {
        if !(self.lookahead_m.is_finite() && self.lookahead_m >= 0.0) {
            return Err(ParamsError::InvalidLookahead(self.lookahead_m));
        }

        if !(self.goal_radius_m.is_finite() && self.goal_radius_m >= 0.0) {
            return Err(ParamsError::InvalidGoalRadius(self.goal_radius_m));
        }

        if !(self.rate_hz.is_finite() && self.rate_hz > 0.0) {
            return Err(ParamsError::InvalidRateHz(self.rate_hz));
        }

        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn valid() -> Params {
        Params {
            lookahead_m: 1.0,
            goal_radius_m: 0.25,
            rate_hz: 10.0,
            pose_file_path: "/tmp/LivePose.txt".into(),
        }
    }

    #[test]
    fn test_valid_params() {
        assert!(valid().validate().is_ok());

        // Zero lookahead and zero radius are allowed
        let mut params = valid();
        params.lookahead_m = 0.0;
        params.goal_radius_m = 0.0;
        assert!(params.validate().is_ok());
    }

    #[test]
    fn test_invalid_params() {
        let mut params = valid();
        params.lookahead_m = -1.0;
        assert!(matches!(
            params.validate(),
            Err(ParamsError::InvalidLookahead(_))
        ));

        let mut params = valid();
        params.goal_radius_m = f64::NAN;
        assert!(matches!(
            params.validate(),
            Err(ParamsError::InvalidGoalRadius(_))
        ));

        let mut params = valid();
        params.rate_hz = 0.0;
        assert!(matches!(params.validate(), Err(ParamsError::InvalidRateHz(_))));

        let mut params = valid();
        params.rate_hz = f64::INFINITY;
        assert!(matches!(params.validate(), Err(ParamsError::InvalidRateHz(_))));
    }
}
