//! One batch team assignment run: read inputs, assign, write outputs.

use std::path::Path;

use chrono::{DateTime, Utc};
use metrics_exporter_prometheus::PrometheusHandle;
use serde::Serialize;
use teamlock_media::diagnostics::sink_for_dir;
use teamlock_media::{AssignmentReport, TeamAssigner};
use teamlock_models::Tracks;
use uuid::Uuid;

use crate::config::WorkerConfig;
use crate::error::{WorkerError, WorkerResult};
use crate::frames::ImageSequence;
use crate::logging::RunLogger;
use crate::metrics::dump_metrics;

/// Document written to the output path.
#[derive(Debug, Serialize)]
pub struct AssignmentOutput<'a> {
    pub run_id: Uuid,
    pub generated_at: DateTime<Utc>,
    pub report: &'a AssignmentReport,
    pub tracks: &'a Tracks,
}

/// Batch team assignment job.
#[derive(Debug)]
pub struct AssignmentJob {
    config: WorkerConfig,
    logger: RunLogger,
}

impl AssignmentJob {
    pub fn new(config: WorkerConfig) -> Self {
        Self {
            config,
            logger: RunLogger::new(),
        }
    }

    pub fn run_id(&self) -> Uuid {
        self.logger.run_id()
    }

    /// Execute the run. When `metrics` is given, the rendered counters are
    /// written to the configured metrics path afterwards.
    pub fn run(&self, metrics: Option<&PrometheusHandle>) -> WorkerResult<AssignmentReport> {
        let span = self.logger.span();
        let _guard = span.enter();

        let mut tracks = load_tracks(&self.config.tracks_path)?;
        let frames = ImageSequence::open(&self.config.frames_dir)?;
        self.logger.inputs_loaded(
            &self.config.frames_dir,
            frames.paths().len(),
            tracks.len(),
            tracks.frames.iter().map(|f| f.len()).sum(),
        );

        let assigner = TeamAssigner::new(self.config.assign.clone())
            .with_diagnostics(sink_for_dir(self.config.debug_dir.as_deref()));
        let report = match assigner.run(&frames, &mut tracks) {
            Ok(report) => report,
            Err(e) => {
                self.logger.failed(&e);
                return Err(e.into());
            }
        };

        let output = AssignmentOutput {
            run_id: self.logger.run_id(),
            generated_at: Utc::now(),
            report: &report,
            tracks: &tracks,
        };
        write_json(&self.config.output_path, &output)?;

        if let (Some(handle), Some(path)) = (metrics, self.config.metrics_path.as_deref()) {
            dump_metrics(handle, path)?;
        }

        self.logger.finished(&report, &self.config.output_path);
        Ok(report)
    }
}

/// Read a tracks document.
pub fn load_tracks(path: &Path) -> WorkerResult<Tracks> {
    if !path.is_file() {
        return Err(WorkerError::InputNotFound(path.to_path_buf()));
    }
    let raw = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&raw)?)
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> WorkerResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, serde_json::to_string_pretty(value)?)?;
    Ok(())
}
