//! Prometheus export of the pipeline counters.

use std::path::Path;

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use tracing::info;

use crate::error::{WorkerError, WorkerResult};

/// Install the Prometheus recorder as the global metrics recorder.
/// Returns a handle that can be used to render metrics.
pub fn init_metrics() -> WorkerResult<PrometheusHandle> {
    PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| WorkerError::metrics(e.to_string()))
}

/// Render the current metrics in Prometheus text format to `path`.
pub fn dump_metrics(handle: &PrometheusHandle, path: &Path) -> WorkerResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, handle.render())?;
    info!(path = %path.display(), "Wrote metrics");
    Ok(())
}
