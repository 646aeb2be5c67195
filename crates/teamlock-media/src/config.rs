//! Configuration for the team assignment pipeline.

use std::path::Path;

use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::error::{MediaError, MediaResult};

/// Configuration for the whole team assignment pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct TeamAssignConfig {
    /// Per-detection color sampling
    #[validate(nested)]
    pub sampler: SamplerConfig,

    /// One-time team prototype fitting on the reference frame
    #[validate(nested)]
    pub calibration: CalibrationConfig,

    /// Per-frame nearest-prototype classification
    #[validate(nested)]
    pub classifier: ClassifierConfig,

    /// Vote window and lock policy
    #[validate(nested)]
    pub stabilizer: StabilizerConfig,

    /// Display color for unassigned players (default: mid gray)
    pub fallback_color: [u8; 3],
}

/// Color sampler settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct SamplerConfig {
    /// Minimum crop width and height in pixels (default: 5)
    #[validate(range(min = 1))]
    pub min_box_size: u32,

    /// Width of the central strip as a fraction of crop width (default: 0.2)
    #[validate(range(exclusive_min = 0.0, max = 1.0))]
    pub strip_fraction: f64,

    /// CLAHE contrast clip limit (default: 3.0)
    #[validate(range(min = 0.0))]
    pub clahe_clip_limit: f64,

    /// CLAHE tile grid size per axis (default: 8)
    #[validate(range(min = 1, max = 64))]
    pub clahe_tile_grid: u32,

    /// k-means restarts per strip (default: 10)
    #[validate(range(min = 1))]
    pub n_init: u32,

    /// Maximum Lloyd iterations per restart (default: 300)
    #[validate(range(min = 1))]
    pub max_iter: u32,

    /// Seed for k-means++ initialisation
    pub seed: u64,
}

/// Reference-frame calibration settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct CalibrationConfig {
    /// Minimum valid samples needed to fit the two team prototypes (default: 2)
    #[validate(range(min = 2))]
    pub min_samples: usize,

    /// k-means restarts for the prototype fit (default: 1)
    #[validate(range(min = 1))]
    pub n_init: u32,

    /// Maximum Lloyd iterations (default: 300)
    #[validate(range(min = 1))]
    pub max_iter: u32,

    /// Seed for k-means++ initialisation
    pub seed: u64,
}

/// Per-frame classifier settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Samples with every channel below this are treated as shadow (default: 10.0)
    #[validate(range(min = 0.0, max = 255.0))]
    pub dark_threshold: f64,
}

/// Identity stabilizer settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
#[validate(schema(function = "validate_lock_policy"))]
pub struct StabilizerConfig {
    /// Number of recent votes kept per player (default: 5)
    #[validate(range(min = 1))]
    pub vote_window: usize,

    /// Occurrences of the majority team needed to lock (default: 3)
    #[validate(range(min = 1))]
    pub lock_threshold: usize,
}

fn validate_lock_policy(config: &StabilizerConfig) -> Result<(), ValidationError> {
    if config.lock_threshold > config.vote_window {
        return Err(ValidationError::new("lock_threshold_exceeds_window"));
    }
    Ok(())
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            min_box_size: 5,
            strip_fraction: 0.2,
            clahe_clip_limit: 3.0,
            clahe_tile_grid: 8,
            n_init: 10,
            max_iter: 300,
            seed: 0x5eed_0001,
        }
    }
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            min_samples: 2,
            n_init: 1,
            max_iter: 300,
            seed: 0x5eed_0002,
        }
    }
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            dark_threshold: 10.0,
        }
    }
}

impl Default for StabilizerConfig {
    fn default() -> Self {
        Self {
            vote_window: 5,
            lock_threshold: 3,
        }
    }
}

impl Default for TeamAssignConfig {
    fn default() -> Self {
        Self {
            sampler: SamplerConfig::default(),
            calibration: CalibrationConfig::default(),
            classifier: ClassifierConfig::default(),
            stabilizer: StabilizerConfig::default(),
            fallback_color: [128, 128, 128],
        }
    }
}

impl TeamAssignConfig {
    /// Three-vote window: a player locks only on three agreeing votes in a row.
    pub fn compact() -> Self {
        Self {
            stabilizer: StabilizerConfig {
                vote_window: 3,
                lock_threshold: 3,
            },
            ..Default::default()
        }
    }

    /// Fast configuration with fewer per-strip restarts.
    pub fn fast() -> Self {
        Self {
            sampler: SamplerConfig {
                n_init: 3,
                max_iter: 100,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    /// Validate, returning the config on success.
    pub fn validated(self) -> MediaResult<Self> {
        self.validate()
            .map_err(|e| MediaError::invalid_config(e.to_string()))?;
        Ok(self)
    }

    /// Load from a JSON file. Missing fields take their defaults.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> MediaResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(MediaError::FileNotFound(path.to_path_buf()));
        }
        let raw = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&raw)?;
        config.validated()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(TeamAssignConfig::default().validated().is_ok());
        assert!(TeamAssignConfig::compact().validated().is_ok());
        assert!(TeamAssignConfig::fast().validated().is_ok());
    }

    #[test]
    fn test_threshold_above_window_rejected() {
        let mut config = TeamAssignConfig::default();
        config.stabilizer.vote_window = 2;
        config.stabilizer.lock_threshold = 3;
        assert!(matches!(
            config.validated(),
            Err(MediaError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_zero_strip_fraction_rejected() {
        let mut config = TeamAssignConfig::default();
        config.sampler.strip_fraction = 0.0;
        assert!(config.validated().is_err());
    }

    #[test]
    fn test_single_calibration_sample_rejected() {
        let mut config = TeamAssignConfig::default();
        config.calibration.min_samples = 1;
        assert!(config.validated().is_err());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("teamlock.json");
        std::fs::write(&path, r#"{"stabilizer": {"vote_window": 7}}"#).unwrap();

        let config = TeamAssignConfig::from_json_file(&path).unwrap();
        assert_eq!(config.stabilizer.vote_window, 7);
        assert_eq!(config.stabilizer.lock_threshold, 3);
        assert_eq!(config.sampler.min_box_size, 5);
    }

    #[test]
    fn test_missing_file() {
        let result = TeamAssignConfig::from_json_file("/nonexistent/teamlock.json");
        assert!(matches!(result, Err(MediaError::FileNotFound(_))));
    }
}
