//! Batch team assignment worker.
//!
//! This crate provides:
//! - Environment-driven configuration
//! - Frame directories as a frame source
//! - The assignment job (tracks in, annotated tracks out)
//! - Structured run logging and Prometheus metric dumps

pub mod config;
pub mod error;
pub mod frames;
pub mod job;
pub mod logging;
pub mod metrics;

pub use config::WorkerConfig;
pub use error::{WorkerError, WorkerResult};
pub use frames::ImageSequence;
pub use job::{AssignmentJob, AssignmentOutput};
pub use logging::RunLogger;
