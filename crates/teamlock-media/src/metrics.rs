//! Metrics emitted by the team assignment pipeline.
//!
//! Recording is a no-op unless the host installs a recorder (the worker
//! installs the Prometheus exporter).

use metrics::counter;

/// Metric names as constants for consistency.
pub mod names {
    pub const FRAMES_PROCESSED_TOTAL: &str = "teamlock_frames_processed_total";
    pub const VOTES_TOTAL: &str = "teamlock_votes_total";
    pub const PLAYERS_LOCKED_TOTAL: &str = "teamlock_players_locked_total";
    pub const CALIBRATION_FAILURES_TOTAL: &str = "teamlock_calibration_failures_total";
}

/// Record the outcome of one classification attempt.
pub fn record_vote(voted: bool) {
    let outcome = if voted { "vote" } else { "abstain" };
    counter!(names::VOTES_TOTAL, "outcome" => outcome).increment(1);
}

/// Record a processed frame.
pub fn record_frame() {
    counter!(names::FRAMES_PROCESSED_TOTAL).increment(1);
}

/// Record a failed calibration.
pub fn record_calibration_failure(reason: &'static str) {
    counter!(names::CALIBRATION_FAILURES_TOTAL, "reason" => reason).increment(1);
}
