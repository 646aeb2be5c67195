//! Team assignment for tracked players.
//!
//! This crate provides:
//! - Jersey color sampling from a central strip of each bounding box
//! - Local contrast normalization (CLAHE on L*)
//! - A swappable two-way color clustering capability (k-means)
//! - Hue-ordered team calibration on a reference frame
//! - Per-frame nearest-prototype voting
//! - Vote-window stabilization with permanent locks
//! - Optional calibration diagnostics

pub mod assigner;
pub mod calibration;
pub mod clahe;
pub mod classifier;
pub mod clustering;
pub mod color;
pub mod config;
#[cfg(feature = "opencv")]
pub mod cv;
pub mod diagnostics;
pub mod error;
pub mod metrics;
pub mod sampler;
pub mod stabilizer;

pub use assigner::{AssignmentReport, FrameSource, TeamAssigner};
pub use calibration::{Calibration, ClusterModel, ClusterModelBuilder};
pub use classifier::{vote_for_sample, TeamClassifier};
pub use clustering::{ClusterFit, ColorClusterer, KMeans};
pub use config::{
    CalibrationConfig, ClassifierConfig, SamplerConfig, StabilizerConfig, TeamAssignConfig,
};
pub use diagnostics::{DiagnosticsSink, NoopSink, ScatterPlotSink};
pub use error::{MediaError, MediaResult};
pub use sampler::ColorSampler;
pub use stabilizer::{transition, IdentityStabilizer, PlayerLock, PlayerRecord, PlayerState, VoteWindow};
