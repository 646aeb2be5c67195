//! Run-scoped structured logging.
//!
//! Every event carries the run id so the lines of one batch run can be
//! grouped in aggregated JSON logs.

use std::path::Path;

use teamlock_media::AssignmentReport;
use tracing::{error, info, warn, Span};
use uuid::Uuid;

/// Structured lifecycle events of one assignment run.
#[derive(Debug, Clone)]
pub struct RunLogger {
    run_id: Uuid,
}

impl Default for RunLogger {
    fn default() -> Self {
        Self::new()
    }
}

impl RunLogger {
    /// Logger with a freshly generated run id.
    pub fn new() -> Self {
        Self {
            run_id: Uuid::new_v4(),
        }
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Span wrapping the whole run.
    pub fn span(&self) -> Span {
        tracing::info_span!("team_assignment", run_id = %self.run_id)
    }

    /// Inputs resolved and indexed.
    pub fn inputs_loaded(&self, frames_dir: &Path, frames: usize, track_frames: usize, detections: usize) {
        info!(
            run_id = %self.run_id,
            frames_dir = %frames_dir.display(),
            frames,
            track_frames,
            detections,
            "Inputs loaded"
        );
    }

    /// Run finished and output written.
    pub fn finished(&self, report: &AssignmentReport, output: &Path) {
        if !report.calibrated {
            warn!(
                run_id = %self.run_id,
                frames = report.frames,
                "No team model, every player left unassigned"
            );
        }
        info!(
            run_id = %self.run_id,
            output = %output.display(),
            frames = report.frames,
            calibrated = report.calibrated,
            votes = report.votes,
            abstentions = report.abstentions,
            locked = report.locks.len(),
            "Assignment written"
        );
    }

    /// Run aborted.
    pub fn failed(&self, err: &dyn std::error::Error) {
        error!(run_id = %self.run_id, error = %err, "Assignment run failed");
    }
}
