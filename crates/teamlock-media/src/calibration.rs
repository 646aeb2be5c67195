//! Team prototype calibration.
//!
//! Runs once per video on a single reference frame: every valid jersey
//! sample from every role category is pooled and split into two clusters.
//! Centroids are then numbered by ascending hue, which is the only thing
//! making "team 1" mean the same visual cluster from run to run.

use teamlock_models::{Rgb, TeamId};
use tracing::{info, warn};

use crate::clustering::{ClusterFit, ColorClusterer, KMeans};
use crate::color::hue;
use crate::config::CalibrationConfig;
use crate::error::{MediaError, MediaResult};

/// Immutable two-team color model.
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterModel {
    /// Calibration partition; centroids in the order the clusterer produced them
    fit: ClusterFit,
    /// Team for each raw cluster index
    teams: [TeamId; 2],
}

impl ClusterModel {
    /// Build a model from a two-cluster fit, numbering teams by ascending hue.
    ///
    /// Equal hues keep the raw order.
    pub fn from_fit(fit: ClusterFit) -> MediaResult<Self> {
        let [first, second] = fit.centroids.as_slice() else {
            return Err(MediaError::clustering(format!(
                "expected 2 centroids, got {}",
                fit.centroids.len()
            )));
        };
        let teams = teams_by_hue(first, second);
        Ok(Self { fit, teams })
    }

    /// Build a model directly from two centroids.
    pub fn from_centroids(first: Rgb, second: Rgb) -> Self {
        Self {
            teams: teams_by_hue(&first, &second),
            fit: ClusterFit {
                centroids: vec![first, second],
                labels: Vec::new(),
                inertia: 0.0,
            },
        }
    }

    /// Raw centroids.
    pub fn centroids(&self) -> &[Rgb] {
        &self.fit.centroids
    }

    /// The calibration partition.
    pub fn fit(&self) -> &ClusterFit {
        &self.fit
    }

    /// Team mapped to a raw cluster index.
    pub fn team_for_cluster(&self, cluster: usize) -> TeamId {
        self.teams.get(cluster).copied().unwrap_or(TeamId::Unassigned)
    }

    /// Prototype color of a team, `None` for the unassigned sentinel.
    pub fn team_color(&self, team: TeamId) -> Option<Rgb> {
        self.teams
            .iter()
            .position(|t| *t == team && team.is_assigned())
            .and_then(|i| self.fit.centroids.get(i).copied())
    }

    /// Team whose cluster `clusterer` assigns `color` to.
    pub fn team_for<C: ColorClusterer + ?Sized>(&self, clusterer: &C, color: &Rgb) -> TeamId {
        self.team_for_cluster(clusterer.nearest(&self.fit, color))
    }
}

fn teams_by_hue(first: &Rgb, second: &Rgb) -> [TeamId; 2] {
    if hue(second) < hue(first) {
        [TeamId::Two, TeamId::One]
    } else {
        [TeamId::One, TeamId::Two]
    }
}

/// Output of a successful calibration.
#[derive(Debug, Clone)]
pub struct Calibration {
    /// The fitted model; its partition labels index into `samples`
    pub model: ClusterModel,
    /// Samples that passed validation, in input order
    pub samples: Vec<Rgb>,
}

/// Fits the [`ClusterModel`] from reference-frame samples.
#[derive(Debug, Clone)]
pub struct ClusterModelBuilder<C = KMeans> {
    min_samples: usize,
    clusterer: C,
}

impl ClusterModelBuilder<KMeans> {
    /// Create a builder backed by k-means.
    pub fn new(config: &CalibrationConfig) -> Self {
        Self::with_clusterer(
            config.min_samples,
            KMeans::two_way(config.n_init, config.max_iter, config.seed),
        )
    }
}

impl<C: ColorClusterer> ClusterModelBuilder<C> {
    /// Create a builder with a custom clustering backend.
    pub fn with_clusterer(min_samples: usize, clusterer: C) -> Self {
        Self {
            min_samples: min_samples.max(2),
            clusterer,
        }
    }

    /// Fit the model. Absent and NaN samples are skipped.
    pub fn build<I>(&self, samples: I) -> MediaResult<Calibration>
    where
        I: IntoIterator<Item = Option<Rgb>>,
    {
        let mut valid = Vec::new();
        for (index, sample) in samples.into_iter().enumerate() {
            match sample {
                Some(color) if !color.has_nan() => valid.push(color),
                other => warn!(index, sample = ?other, "Skipping invalid calibration sample"),
            }
        }

        if valid.len() < self.min_samples {
            return Err(MediaError::InsufficientSamples {
                found: valid.len(),
                required: self.min_samples,
            });
        }

        let model = ClusterModel::from_fit(self.clusterer.fit(&valid)?)?;
        info!(
            samples = valid.len(),
            team1 = ?model.team_color(TeamId::One).map(|c| c.to_bytes()),
            team2 = ?model.team_color(TeamId::Two).map(|c| c.to_bytes()),
            "Calibrated team colors"
        );

        Ok(Calibration {
            model,
            samples: valid,
        })
    }
}
