//! Optional calibration diagnostics.
//!
//! The core never touches the filesystem itself; it hands each successful
//! calibration to a [`DiagnosticsSink`]. [`ScatterPlotSink`] renders the
//! classic "color clusters" debug plot: calibration samples projected onto
//! their first two principal components, outlined by cluster, with the
//! centroids marked.

use std::path::{Path, PathBuf};

use image::{Rgb as Pixel, RgbImage};
use ndarray::{Array1, Array2, Axis};
use teamlock_models::Rgb;
use tracing::info;

use crate::calibration::Calibration;
use crate::error::{MediaError, MediaResult};

/// File name written by [`ScatterPlotSink`].
pub const SCATTER_FILE_NAME: &str = "color_clusters.png";

const CANVAS_WIDTH: u32 = 640;
const CANVAS_HEIGHT: u32 = 480;
const MARGIN: f64 = 40.0;

// Viridis end points, one outline color per cluster
const CLUSTER_OUTLINES: [Pixel<u8>; 2] = [Pixel([68, 1, 84]), Pixel([253, 231, 37])];
const CENTROID_MARK: Pixel<u8> = Pixel([220, 0, 0]);
const BACKGROUND: Pixel<u8> = Pixel([255, 255, 255]);

/// Receives calibration results for observability.
pub trait DiagnosticsSink {
    /// Called once, after the team model is fitted.
    fn on_calibration(&mut self, calibration: &Calibration) -> MediaResult<()>;
}

/// Sink that discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSink;

impl DiagnosticsSink for NoopSink {
    fn on_calibration(&mut self, _calibration: &Calibration) -> MediaResult<()> {
        Ok(())
    }
}

/// Two-component PCA projection of RGB colors.
#[derive(Debug, Clone)]
pub struct PcaProjection {
    mean: Array1<f64>,
    /// 3x2 matrix, principal axes as columns
    basis: Array2<f64>,
}

impl PcaProjection {
    /// Fit the projection. Needs at least one point.
    pub fn fit(points: &[Rgb]) -> Option<Self> {
        let flat: Vec<f64> = points.iter().flat_map(|p| p.to_array()).collect();
        let data = Array2::from_shape_vec((points.len(), 3), flat).ok()?;
        let mean = data.mean_axis(Axis(0))?;

        let centered = &data - &mean;
        let denom = (points.len().saturating_sub(1)).max(1) as f64;
        let mut cov = centered.t().dot(&centered) / denom;

        let first = dominant_eigenvector(&cov, Array1::from(vec![1.0, 0.0, 0.0]));
        let lambda = first.dot(&cov.dot(&first));
        let outer = first
            .view()
            .insert_axis(Axis(1))
            .dot(&first.view().insert_axis(Axis(0)));
        cov = cov - outer * lambda;

        let mut seed = Array1::from(vec![0.0, 1.0, 0.0]);
        seed = &seed - &(&first * first.dot(&seed));
        let second = dominant_eigenvector(&cov, seed);

        let mut basis = Array2::zeros((3, 2));
        basis.column_mut(0).assign(&first);
        basis.column_mut(1).assign(&second);

        Some(Self { mean, basis })
    }

    /// Project one color onto the two principal axes.
    pub fn project(&self, color: &Rgb) -> [f64; 2] {
        let centered = Array1::from(color.to_array().to_vec()) - &self.mean;
        let p = centered.dot(&self.basis);
        [p[0], p[1]]
    }
}

/// Power iteration; falls back to `seed` when the matrix has no energy left.
fn dominant_eigenvector(matrix: &Array2<f64>, seed: Array1<f64>) -> Array1<f64> {
    let mut v = normalized(seed).unwrap_or_else(|| Array1::from(vec![0.0, 0.0, 1.0]));
    for _ in 0..100 {
        match normalized(matrix.dot(&v)) {
            Some(next) => v = next,
            None => break,
        }
    }
    v
}

fn normalized(v: Array1<f64>) -> Option<Array1<f64>> {
    let norm = v.dot(&v).sqrt();
    (norm > 1e-12).then(|| v / norm)
}

/// Writes a PCA scatter plot of the calibration samples as a PNG.
#[derive(Debug, Clone)]
pub struct ScatterPlotSink {
    dir: PathBuf,
}

impl ScatterPlotSink {
    /// Write plots into `dir` (created on demand).
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Path of the plot file.
    pub fn output_path(&self) -> PathBuf {
        self.dir.join(SCATTER_FILE_NAME)
    }

    /// Render the plot in memory.
    pub fn render(calibration: &Calibration) -> MediaResult<RgbImage> {
        let projection = PcaProjection::fit(&calibration.samples)
            .ok_or_else(|| MediaError::clustering("cannot project empty sample set"))?;

        let samples: Vec<[f64; 2]> = calibration
            .samples
            .iter()
            .map(|s| projection.project(s))
            .collect();
        let centroids: Vec<[f64; 2]> = calibration
            .model
            .centroids()
            .iter()
            .map(|c| projection.project(c))
            .collect();

        let all = samples.iter().chain(centroids.iter());
        let (mut min_x, mut max_x, mut min_y, mut max_y) =
            (f64::INFINITY, f64::NEG_INFINITY, f64::INFINITY, f64::NEG_INFINITY);
        for p in all {
            min_x = min_x.min(p[0]);
            max_x = max_x.max(p[0]);
            min_y = min_y.min(p[1]);
            max_y = max_y.max(p[1]);
        }
        let span_x = (max_x - min_x).max(1e-6);
        let span_y = (max_y - min_y).max(1e-6);

        let to_canvas = |p: &[f64; 2]| -> (i64, i64) {
            let x = MARGIN + (p[0] - min_x) / span_x * (CANVAS_WIDTH as f64 - 2.0 * MARGIN);
            // Screen y grows downward
            let y = CANVAS_HEIGHT as f64 - MARGIN - (p[1] - min_y) / span_y * (CANVAS_HEIGHT as f64 - 2.0 * MARGIN);
            (x.round() as i64, y.round() as i64)
        };

        let mut canvas = RgbImage::from_pixel(CANVAS_WIDTH, CANVAS_HEIGHT, BACKGROUND);

        for ((point, sample), label) in samples
            .iter()
            .zip(&calibration.samples)
            .zip(&calibration.model.fit().labels)
        {
            let (cx, cy) = to_canvas(point);
            let outline = CLUSTER_OUTLINES[label % CLUSTER_OUTLINES.len()];
            fill_square(&mut canvas, cx, cy, 6, outline);
            fill_square(&mut canvas, cx, cy, 4, Pixel(sample.to_bytes()));
        }

        for point in &centroids {
            let (cx, cy) = to_canvas(point);
            draw_cross(&mut canvas, cx, cy, 9, CENTROID_MARK);
        }

        Ok(canvas)
    }
}

impl DiagnosticsSink for ScatterPlotSink {
    fn on_calibration(&mut self, calibration: &Calibration) -> MediaResult<()> {
        let canvas = Self::render(calibration)?;
        std::fs::create_dir_all(&self.dir)?;
        let path = self.output_path();
        canvas.save(&path)?;
        info!(path = %path.display(), "Wrote color cluster plot");
        Ok(())
    }
}

fn put(canvas: &mut RgbImage, x: i64, y: i64, color: Pixel<u8>) {
    if x >= 0 && y >= 0 && (x as u32) < canvas.width() && (y as u32) < canvas.height() {
        canvas.put_pixel(x as u32, y as u32, color);
    }
}

fn fill_square(canvas: &mut RgbImage, cx: i64, cy: i64, half: i64, color: Pixel<u8>) {
    for y in cy - half..=cy + half {
        for x in cx - half..=cx + half {
            put(canvas, x, y, color);
        }
    }
}

fn draw_cross(canvas: &mut RgbImage, cx: i64, cy: i64, half: i64, color: Pixel<u8>) {
    for d in -half..=half {
        for t in -1..=1 {
            put(canvas, cx + d, cy + d + t, color);
            put(canvas, cx + d, cy - d + t, color);
        }
    }
}

/// Convenience for hosts that take the debug directory from configuration.
pub fn sink_for_dir(dir: Option<&Path>) -> Box<dyn DiagnosticsSink> {
    match dir {
        Some(dir) => Box::new(ScatterPlotSink::new(dir)),
        None => Box::new(NoopSink),
    }
}
