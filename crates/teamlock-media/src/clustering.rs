//! Unsupervised color partitioning.
//!
//! Both the per-strip dominant color search and the reference-frame team
//! calibration need a two-way split of a set of colors. The algorithm sits
//! behind [`ColorClusterer`] so it can be swapped or mocked.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use teamlock_models::Rgb;

use crate::error::{MediaError, MediaResult};

/// Result of fitting a partition.
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterFit {
    /// One centroid per cluster
    pub centroids: Vec<Rgb>,
    /// Cluster index for each input point, in input order
    pub labels: Vec<usize>,
    /// Sum of squared distances to the assigned centroid
    pub inertia: f64,
}

impl ClusterFit {
    /// Number of points assigned to each cluster.
    pub fn counts(&self) -> Vec<usize> {
        let mut counts = vec![0; self.centroids.len()];
        for &label in &self.labels {
            if let Some(c) = counts.get_mut(label) {
                *c += 1;
            }
        }
        counts
    }

    /// Index of the most populated cluster. Ties go to the lower index.
    pub fn dominant(&self) -> Option<usize> {
        let counts = self.counts();
        let max = *counts.iter().max()?;
        counts.iter().position(|&c| c == max)
    }
}

/// Capability to partition colors and to assign new colors to a fitted partition.
#[cfg_attr(test, mockall::automock)]
pub trait ColorClusterer {
    /// Fit a partition over `points`.
    fn fit(&self, points: &[Rgb]) -> MediaResult<ClusterFit>;

    /// Index of the centroid in `fit` closest to `point`.
    fn nearest(&self, fit: &ClusterFit, point: &Rgb) -> usize;
}

/// Index of the centroid nearest to `point`. Ties go to the lower index.
pub fn nearest_centroid(centroids: &[Rgb], point: &Rgb) -> usize {
    let mut best = 0;
    let mut best_dist = f64::INFINITY;
    for (i, c) in centroids.iter().enumerate() {
        let d = c.distance_sq(point);
        if d < best_dist {
            best = i;
            best_dist = d;
        }
    }
    best
}

/// k-means with k-means++ seeding and best-of-`n_init` restarts.
#[derive(Debug, Clone, PartialEq)]
pub struct KMeans {
    /// Number of clusters
    pub k: usize,
    /// Independent restarts; the lowest inertia wins
    pub n_init: u32,
    /// Lloyd iterations per restart
    pub max_iter: u32,
    /// Stop once total squared centroid shift falls below this
    pub tolerance: f64,
    /// Seed for initialisation, so identical inputs give identical fits
    pub seed: u64,
}

impl Default for KMeans {
    fn default() -> Self {
        Self {
            k: 2,
            n_init: 10,
            max_iter: 300,
            tolerance: 1e-4,
            seed: 0,
        }
    }
}

impl KMeans {
    /// Two-cluster k-means.
    pub fn two_way(n_init: u32, max_iter: u32, seed: u64) -> Self {
        Self {
            k: 2,
            n_init: n_init.max(1),
            max_iter: max_iter.max(1),
            seed,
            ..Default::default()
        }
    }

    fn init_plus_plus(&self, points: &[Rgb], rng: &mut StdRng) -> Vec<Rgb> {
        let mut centroids = Vec::with_capacity(self.k);
        centroids.push(points[rng.random_range(0..points.len())]);

        let mut dists: Vec<f64> = points.iter().map(|p| p.distance_sq(&centroids[0])).collect();

        while centroids.len() < self.k {
            let total: f64 = dists.iter().sum();
            let next = if total > 0.0 {
                let target = rng.random::<f64>() * total;
                let mut acc = 0.0;
                let mut chosen = points.len() - 1;
                for (i, d) in dists.iter().enumerate() {
                    acc += d;
                    if acc >= target && *d > 0.0 {
                        chosen = i;
                        break;
                    }
                }
                chosen
            } else {
                // Every point coincides with a centroid already
                rng.random_range(0..points.len())
            };

            let centroid = points[next];
            for (d, p) in dists.iter_mut().zip(points) {
                *d = d.min(p.distance_sq(&centroid));
            }
            centroids.push(centroid);
        }
        centroids
    }

    fn lloyd(&self, points: &[Rgb], mut centroids: Vec<Rgb>) -> ClusterFit {
        let mut labels = vec![0usize; points.len()];

        for _ in 0..self.max_iter {
            for (label, p) in labels.iter_mut().zip(points) {
                *label = nearest_centroid(&centroids, p);
            }

            let mut sums = vec![[0.0f64; 3]; self.k];
            let mut counts = vec![0usize; self.k];
            for (&label, p) in labels.iter().zip(points) {
                sums[label][0] += p.r;
                sums[label][1] += p.g;
                sums[label][2] += p.b;
                counts[label] += 1;
            }

            let mut shift = 0.0;
            for (i, centroid) in centroids.iter_mut().enumerate() {
                // Empty clusters keep their previous centroid
                if counts[i] == 0 {
                    continue;
                }
                let n = counts[i] as f64;
                let updated = Rgb::new(sums[i][0] / n, sums[i][1] / n, sums[i][2] / n);
                shift += centroid.distance_sq(&updated);
                *centroid = updated;
            }

            if shift <= self.tolerance {
                break;
            }
        }

        let mut inertia = 0.0;
        for (label, p) in labels.iter_mut().zip(points) {
            *label = nearest_centroid(&centroids, p);
            inertia += centroids[*label].distance_sq(p);
        }

        ClusterFit {
            centroids,
            labels,
            inertia,
        }
    }
}

impl ColorClusterer for KMeans {
    fn fit(&self, points: &[Rgb]) -> MediaResult<ClusterFit> {
        if self.k == 0 {
            return Err(MediaError::clustering("k must be at least 1"));
        }
        if points.len() < self.k {
            return Err(MediaError::clustering(format!(
                "{} points cannot form {} clusters",
                points.len(),
                self.k
            )));
        }
        if points.iter().any(Rgb::has_nan) {
            return Err(MediaError::clustering("input contains NaN"));
        }

        #[cfg(feature = "opencv")]
        match crate::cv::kmeans(points, self.k, self.n_init, self.max_iter, self.tolerance, self.seed) {
            Ok(fit) => return Ok(fit),
            Err(e) => tracing::debug!(error = %e, "OpenCV k-means failed, using built-in"),
        }

        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut best: Option<ClusterFit> = None;

        for _ in 0..self.n_init.max(1) {
            let seeds = self.init_plus_plus(points, &mut rng);
            let fit = self.lloyd(points, seeds);
            if best.as_ref().map_or(true, |b| fit.inertia < b.inertia) {
                best = Some(fit);
            }
        }

        best.ok_or_else(|| MediaError::clustering("no restart produced a fit"))
    }

    fn nearest(&self, fit: &ClusterFit, point: &Rgb) -> usize {
        nearest_centroid(&fit.centroids, point)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blob(center: Rgb, n: usize) -> Vec<Rgb> {
        (0..n)
            .map(|i| {
                let j = (i % 5) as f64 - 2.0;
                Rgb::new(center.r + j, center.g - j, center.b + j * 0.5)
            })
            .collect()
    }

    #[test]
    fn test_separates_two_blobs() {
        let red = Rgb::new(200.0, 20.0, 20.0);
        let blue = Rgb::new(20.0, 20.0, 200.0);
        let mut points = blob(red, 30);
        points.extend(blob(blue, 20));

        let fit = KMeans::two_way(5, 100, 7).fit(&points).unwrap();
        assert_eq!(fit.centroids.len(), 2);

        let red_label = fit.labels[0];
        assert!(fit.labels[..30].iter().all(|&l| l == red_label));
        assert!(fit.labels[30..].iter().all(|&l| l != red_label));
        assert!(fit.centroids[red_label].distance(&red) < 2.0);
        assert_eq!(fit.dominant(), Some(red_label));
    }

    #[test]
    fn test_same_seed_same_fit() {
        let mut points = blob(Rgb::new(10.0, 180.0, 40.0), 12);
        points.extend(blob(Rgb::new(230.0, 230.0, 230.0), 9));

        let kmeans = KMeans::two_way(3, 50, 42);
        assert_eq!(kmeans.fit(&points).unwrap(), kmeans.fit(&points).unwrap());
    }

    #[test]
    fn test_identical_points_are_allowed() {
        let points = vec![Rgb::new(50.0, 60.0, 70.0); 8];
        let fit = KMeans::two_way(2, 10, 1).fit(&points).unwrap();
        assert!(fit.inertia.abs() < 1e-9);
        assert_eq!(fit.dominant(), Some(0));
    }

    #[test]
    fn test_too_few_points() {
        let result = KMeans::two_way(1, 10, 1).fit(&[Rgb::new(1.0, 2.0, 3.0)]);
        assert!(matches!(result, Err(MediaError::Clustering(_))));
    }

    #[test]
    fn test_nan_rejected() {
        let points = vec![Rgb::new(f64::NAN, 0.0, 0.0), Rgb::new(1.0, 1.0, 1.0)];
        assert!(KMeans::default().fit(&points).is_err());
    }

    #[test]
    fn test_nearest_tie_prefers_lower_index() {
        let centroids = vec![Rgb::new(0.0, 0.0, 0.0), Rgb::new(10.0, 0.0, 0.0)];
        assert_eq!(nearest_centroid(&centroids, &Rgb::new(5.0, 0.0, 0.0)), 0);
        assert_eq!(nearest_centroid(&centroids, &Rgb::new(6.0, 0.0, 0.0)), 1);
    }

    #[test]
    fn test_dominant_tie_prefers_lower_index() {
        let fit = ClusterFit {
            centroids: vec![Rgb::default(), Rgb::default()],
            labels: vec![1, 0, 1, 0],
            inertia: 0.0,
        };
        assert_eq!(fit.dominant(), Some(0));
    }
}
