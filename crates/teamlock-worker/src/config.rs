//! Worker configuration.

use std::path::PathBuf;

use teamlock_media::TeamAssignConfig;

use crate::error::{WorkerError, WorkerResult};

/// Worker configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Directory of decoded frames, one image per frame in name order
    pub frames_dir: PathBuf,
    /// Tracks JSON produced by the tracker
    pub tracks_path: PathBuf,
    /// Where the annotated tracks are written
    pub output_path: PathBuf,
    /// Directory for the calibration scatter plot, disabled when unset
    pub debug_dir: Option<PathBuf>,
    /// Prometheus text dump written after the run, disabled when unset
    pub metrics_path: Option<PathBuf>,
    /// Pipeline settings
    pub assign: TeamAssignConfig,
}

impl WorkerConfig {
    /// Create config from environment variables.
    pub fn from_env() -> WorkerResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Create config from any key lookup.
    ///
    /// `TEAMLOCK_CONFIG_PATH` supplies a base [`TeamAssignConfig`]; the
    /// individual overrides are applied on top before validation.
    pub fn from_lookup<F>(lookup: F) -> WorkerResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| -> WorkerResult<PathBuf> {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from)
                .ok_or_else(|| WorkerError::config(format!("{key} is not set")))
        };
        let optional = |key: &str| lookup(key).filter(|v| !v.trim().is_empty()).map(PathBuf::from);

        let mut assign = match optional("TEAMLOCK_CONFIG_PATH") {
            Some(path) => TeamAssignConfig::from_json_file(path)?,
            None => TeamAssignConfig::default(),
        };

        if let Some(window) = parse_var(&lookup, "TEAMLOCK_VOTE_WINDOW")? {
            assign.stabilizer.vote_window = window;
        }
        if let Some(threshold) = parse_var(&lookup, "TEAMLOCK_LOCK_THRESHOLD")? {
            assign.stabilizer.lock_threshold = threshold;
        }
        if let Some(seed) = parse_var(&lookup, "TEAMLOCK_SEED")? {
            assign.sampler.seed = seed;
            assign.calibration.seed = seed;
        }

        Ok(Self {
            frames_dir: required("TEAMLOCK_FRAMES_DIR")?,
            tracks_path: required("TEAMLOCK_TRACKS_PATH")?,
            output_path: required("TEAMLOCK_OUTPUT_PATH")?,
            debug_dir: optional("TEAMLOCK_DEBUG_DIR"),
            metrics_path: optional("TEAMLOCK_METRICS_PATH"),
            assign: assign.validated()?,
        })
    }
}

fn parse_var<F, T>(lookup: &F, key: &str) -> WorkerResult<Option<T>>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| WorkerError::config(format!("{key} has invalid value {raw:?}"))),
        None => Ok(None),
    }
}
