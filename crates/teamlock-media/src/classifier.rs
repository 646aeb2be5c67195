//! Per-frame team classification.
//!
//! Turns one fresh jersey sample into a raw team vote. No temporal logic
//! lives here; see [`crate::stabilizer`] for that.

use image::RgbImage;
use teamlock_models::{BoundingBox, PlayerId, Rgb, TeamId};
use tracing::debug;

use crate::calibration::ClusterModel;
use crate::clustering::{ColorClusterer, KMeans};
use crate::config::ClassifierConfig;
use crate::sampler::ColorSampler;

/// Vote for a sample against a fitted model, letting `clusterer` pick the cluster.
///
/// Returns `None` (abstain) for absent, NaN or near-black samples.
pub fn vote_for_sample<C: ColorClusterer + ?Sized>(
    clusterer: &C,
    model: &ClusterModel,
    sample: Option<Rgb>,
    dark_threshold: f64,
) -> Option<TeamId> {
    let color = sample?;
    if color.has_nan() || color.is_near_black(dark_threshold) {
        return None;
    }
    Some(model.team_for(clusterer, &color))
}

/// Samples a detection and votes for its team.
#[derive(Debug, Clone)]
pub struct TeamClassifier<C = KMeans> {
    sampler: ColorSampler<C>,
    config: ClassifierConfig,
}

impl<C: ColorClusterer> TeamClassifier<C> {
    /// Create a classifier around a sampler.
    pub fn new(sampler: ColorSampler<C>, config: ClassifierConfig) -> Self {
        Self { sampler, config }
    }

    /// Underlying sampler.
    pub fn sampler(&self) -> &ColorSampler<C> {
        &self.sampler
    }

    /// Raw vote for one detection in one frame.
    ///
    /// Abstains when there is no model, when the box yields no sample, or
    /// when the sample is unreliable.
    pub fn classify(
        &self,
        model: Option<&ClusterModel>,
        frame: &RgbImage,
        bbox: &BoundingBox,
        player_id: PlayerId,
    ) -> Option<TeamId> {
        let model = model?;
        let sample = self.sampler.sample(frame, bbox);
        let vote = vote_for_sample(self.sampler.clusterer(), model, sample, self.config.dark_threshold);
        if vote.is_none() {
            debug!(player_id, sample = ?sample, "No vote for player");
        }
        vote
    }
}
