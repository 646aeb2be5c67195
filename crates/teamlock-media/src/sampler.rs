//! Jersey color sampling.
//!
//! Extracts one representative color from a player's bounding box:
//!
//! ```text
//! crop ─▶ central strip ─▶ CLAHE ─▶ 2-way cluster ─▶ dominant label
//!              │                                          │
//!              └──────── mean of raw pixels under ◀───────┘
//! ```
//!
//! The narrow central strip keeps grass and limbs out of the sample. The
//! contrast-normalized copy is only used to decide which pixels belong to
//! the jersey; the reported color comes from the untouched pixels.

use image::{imageops, RgbImage};
use teamlock_models::{BoundingBox, Rgb};
use tracing::debug;

use crate::clahe::Clahe;
use crate::clustering::{ColorClusterer, KMeans};
use crate::config::SamplerConfig;

/// Stateless color sampler.
#[derive(Debug, Clone)]
pub struct ColorSampler<C = KMeans> {
    config: SamplerConfig,
    clahe: Clahe,
    clusterer: C,
}

impl ColorSampler<KMeans> {
    /// Create a sampler backed by k-means.
    pub fn new(config: SamplerConfig) -> Self {
        let clusterer = KMeans::two_way(config.n_init, config.max_iter, config.seed);
        Self::with_clusterer(config, clusterer)
    }
}

impl Default for ColorSampler<KMeans> {
    fn default() -> Self {
        Self::new(SamplerConfig::default())
    }
}

impl<C: ColorClusterer> ColorSampler<C> {
    /// Create a sampler with a custom clustering backend.
    pub fn with_clusterer(config: SamplerConfig, clusterer: C) -> Self {
        Self {
            clahe: Clahe::new(config.clahe_clip_limit, config.clahe_tile_grid),
            config,
            clusterer,
        }
    }

    /// Clustering backend, shared with classification.
    pub fn clusterer(&self) -> &C {
        &self.clusterer
    }

    /// Sample the jersey color inside `bbox`.
    ///
    /// Returns `None` for empty or undersized crops and whenever the strip
    /// cannot be partitioned.
    pub fn sample(&self, frame: &RgbImage, bbox: &BoundingBox) -> Option<Rgb> {
        let rect = bbox.to_pixel_rect(frame.width(), frame.height());
        if rect.is_empty() {
            return None;
        }
        if rect.width < self.config.min_box_size || rect.height < self.config.min_box_size {
            return None;
        }

        let (strip_x, strip_width) = self.strip_bounds(rect.width);
        let strip = imageops::crop_imm(frame, rect.x + strip_x, rect.y, strip_width, rect.height).to_image();
        if (strip.width() * strip.height()) < 2 {
            return None;
        }

        let normalized = self.clahe.apply_rgb(&strip);
        let points: Vec<Rgb> = normalized.pixels().map(|p| Rgb::from_bytes(p.0)).collect();

        let fit = match self.clusterer.fit(&points) {
            Ok(fit) => fit,
            Err(e) => {
                debug!(error = %e, "Strip clustering failed");
                return None;
            }
        };
        let dominant = fit.dominant()?;

        let mut sum = [0.0f64; 3];
        let mut count = 0usize;
        for (raw, &label) in strip.pixels().zip(&fit.labels) {
            if label == dominant {
                sum[0] += raw.0[0] as f64;
                sum[1] += raw.0[1] as f64;
                sum[2] += raw.0[2] as f64;
                count += 1;
            }
        }
        if count == 0 {
            return None;
        }

        let n = count as f64;
        Some(Rgb::new(sum[0] / n, sum[1] / n, sum[2] / n))
    }

    /// Offset and width of the central strip within a crop of `width` pixels.
    fn strip_bounds(&self, width: u32) -> (u32, u32) {
        let strip_width = ((width as f64 * self.config.strip_fraction) as u32).clamp(1, width);
        let center = width / 2;
        let start = center.saturating_sub(strip_width / 2).min(width - strip_width);
        (start, strip_width)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clustering::{ClusterFit, MockColorClusterer};
    use crate::error::MediaError;
    use image::Rgb as Pixel;

    const GRASS: Pixel<u8> = Pixel([40, 140, 40]);
    const JERSEY: Pixel<u8> = Pixel([200, 30, 30]);

    /// Green field with a player whose torso column is mostly jersey,
    /// with a darker band of shorts at the bottom.
    fn player_frame() -> (RgbImage, BoundingBox) {
        let mut frame = RgbImage::from_pixel(120, 120, GRASS);
        for y in 20..100 {
            for x in 40..80 {
                let pixel = if y >= 80 { Pixel([20, 20, 90]) } else { JERSEY };
                frame.put_pixel(x, y, pixel);
            }
        }
        (frame, BoundingBox::new(40.0, 20.0, 80.0, 100.0))
    }

    #[test]
    fn test_samples_dominant_jersey_color() {
        let (frame, bbox) = player_frame();
        let color = ColorSampler::default().sample(&frame, &bbox).unwrap();

        assert!((color.r - 200.0).abs() < 1e-9, "{color:?}");
        assert!((color.g - 30.0).abs() < 1e-9);
        assert!((color.b - 30.0).abs() < 1e-9);
    }

    #[test]
    fn test_small_box_is_absent() {
        let (frame, _) = player_frame();
        let sampler = ColorSampler::default();
        assert!(sampler.sample(&frame, &BoundingBox::new(40.0, 20.0, 44.0, 60.0)).is_none());
        assert!(sampler.sample(&frame, &BoundingBox::new(40.0, 20.0, 80.0, 24.0)).is_none());
    }

    #[test]
    fn test_empty_crop_is_absent() {
        let (frame, _) = player_frame();
        let sampler = ColorSampler::default();
        assert!(sampler.sample(&frame, &BoundingBox::new(500.0, 500.0, 600.0, 600.0)).is_none());
        assert!(sampler.sample(&frame, &BoundingBox::new(60.0, 60.0, 50.0, 50.0)).is_none());
    }

    #[test]
    fn test_box_partially_outside_frame_is_clamped() {
        let frame = RgbImage::from_pixel(50, 50, JERSEY);
        let color = ColorSampler::default()
            .sample(&frame, &BoundingBox::new(30.0, -10.0, 70.0, 40.0))
            .unwrap();
        assert_eq!(color.to_bytes(), JERSEY.0);
    }

    #[test]
    fn test_strip_is_centered_and_nonempty() {
        let sampler = ColorSampler::default();
        assert_eq!(sampler.strip_bounds(40), (16, 8));
        assert_eq!(sampler.strip_bounds(5), (2, 1));
        assert_eq!(sampler.strip_bounds(6), (3, 1));
    }

    #[test]
    fn test_clustering_failure_is_absent() {
        let mut clusterer = MockColorClusterer::new();
        clusterer
            .expect_fit()
            .returning(|_| Err(MediaError::clustering("boom")));

        let (frame, bbox) = player_frame();
        let sampler = ColorSampler::with_clusterer(SamplerConfig::default(), clusterer);
        assert!(sampler.sample(&frame, &bbox).is_none());
    }

    #[test]
    fn test_uses_raw_pixels_of_dominant_label() {
        // Label every pixel 1 so the dominant cluster is the whole strip.
        let mut clusterer = MockColorClusterer::new();
        clusterer.expect_fit().times(1).returning(|points| {
            Ok(ClusterFit {
                centroids: vec![Rgb::default(), Rgb::default()],
                labels: vec![1; points.len()],
                inertia: 0.0,
            })
        });

        let frame = RgbImage::from_pixel(30, 30, Pixel([10, 100, 250]));
        let sampler = ColorSampler::with_clusterer(SamplerConfig::default(), clusterer);
        let color = sampler
            .sample(&frame, &BoundingBox::new(0.0, 0.0, 30.0, 30.0))
            .unwrap();
        assert_eq!(color.to_bytes(), [10, 100, 250]);
    }

    #[test]
    fn test_partitions_normalized_strip_but_averages_raw_pixels() {
        // Brightness ramp down the box; full equalization on one tile
        let frame = RgbImage::from_fn(30, 40, |_, y| {
            Pixel([(80 + 3 * y) as u8, (40 + y) as u8, (30 + 2 * y) as u8])
        });
        let config = SamplerConfig {
            clahe_clip_limit: 0.0,
            clahe_tile_grid: 1,
            ..Default::default()
        };

        // Central strip of a 30 px crop is columns 12..18
        let raw: Vec<Rgb> = (0..40u32)
            .flat_map(|y| (12..18u32).map(move |x| (x, y)))
            .map(|(x, y)| Rgb::from_bytes(frame.get_pixel(x, y).0))
            .collect();
        let top = 24 * 6;

        let raw_points = raw.clone();
        let mut clusterer = MockColorClusterer::new();
        clusterer
            .expect_fit()
            .withf(move |points| points.len() == raw_points.len() && points != raw_points.as_slice())
            .times(1)
            .returning(move |points| {
                Ok(ClusterFit {
                    centroids: vec![Rgb::default(), Rgb::default()],
                    labels: (0..points.len()).map(|i| usize::from(i >= top)).collect(),
                    inertia: 0.0,
                })
            });

        let sampler = ColorSampler::with_clusterer(config, clusterer);
        let color = sampler
            .sample(&frame, &BoundingBox::new(0.0, 0.0, 30.0, 40.0))
            .unwrap();

        let n = top as f64;
        let expected = raw[..top].iter().fold(Rgb::default(), |acc, p| {
            Rgb::new(acc.r + p.r / n, acc.g + p.g / n, acc.b + p.b / n)
        });
        assert!(color.distance(&expected) < 1e-9, "{color:?} vs {expected:?}");
    }
}
