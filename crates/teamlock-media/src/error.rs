//! Error types for team assignment.
//!
//! Per-player, per-frame problems never surface here: they degrade to "no
//! sample" or "no vote". Only run-wide preconditions become errors.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for team assignment operations.
pub type MediaResult<T> = Result<T, MediaError>;

/// Errors that can occur during team assignment.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("No input frames")]
    NoFrames,

    #[error("Frame count mismatch: {frames} frames but tracks for {tracks}")]
    FrameCountMismatch { frames: usize, tracks: usize },

    #[error("Failed to read frame {index}: {message}")]
    FrameRead { index: usize, message: String },

    #[error("Not enough valid calibration samples: found {found}, need {required}")]
    InsufficientSamples { found: usize, required: usize },

    #[error("Clustering failed: {0}")]
    Clustering(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
}

impl MediaError {
    /// Create a frame read failure.
    pub fn frame_read(index: usize, message: impl Into<String>) -> Self {
        Self::FrameRead {
            index,
            message: message.into(),
        }
    }

    /// Create a clustering failure.
    pub fn clustering(message: impl Into<String>) -> Self {
        Self::Clustering(message.into())
    }

    /// Create an invalid configuration error.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig(message.into())
    }
}
