//! Contrast Limited Adaptive Histogram Equalization.
//!
//! Applied to the L* channel only, so chroma is preserved while local
//! lighting differences (stadium shadows, floodlights) are flattened.
//!
//! The image is split into a grid of tiles. Each tile gets a clipped,
//! equalized lookup table and every pixel is mapped through a bilinear
//! blend of the four nearest tile tables.

use image::{Rgb as Pixel, RgbImage};

use crate::color::{lab_to_rgb, rgb_to_lab, Lab};

const BINS: usize = 256;

/// CLAHE operator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Clahe {
    /// Relative histogram clip limit; `<= 0` disables clipping
    pub clip_limit: f64,
    /// Tiles per axis (shrinks for images smaller than the grid)
    pub tile_grid: u32,
}

impl Default for Clahe {
    fn default() -> Self {
        Self {
            clip_limit: 3.0,
            tile_grid: 8,
        }
    }
}

impl Clahe {
    /// Create a new operator.
    pub fn new(clip_limit: f64, tile_grid: u32) -> Self {
        Self {
            clip_limit,
            tile_grid: tile_grid.max(1),
        }
    }

    /// Equalize a single 8-bit channel stored row-major.
    pub fn apply_channel(&self, channel: &[u8], width: u32, height: u32) -> Vec<u8> {
        let (w, h) = (width as usize, height as usize);
        if w == 0 || h == 0 || channel.len() != w * h {
            return channel.to_vec();
        }

        let tiles_x = (self.tile_grid as usize).min(w).max(1);
        let tiles_y = (self.tile_grid as usize).min(h).max(1);

        let bound = |i: usize, tiles: usize, len: usize| i * len / tiles;

        let mut luts = vec![[0u8; BINS]; tiles_x * tiles_y];
        for ty in 0..tiles_y {
            let (y0, y1) = (bound(ty, tiles_y, h), bound(ty + 1, tiles_y, h));
            for tx in 0..tiles_x {
                let (x0, x1) = (bound(tx, tiles_x, w), bound(tx + 1, tiles_x, w));

                let mut hist = [0u32; BINS];
                for y in y0..y1 {
                    for &v in &channel[y * w + x0..y * w + x1] {
                        hist[v as usize] += 1;
                    }
                }
                let area = ((y1 - y0) * (x1 - x0)) as u32;
                luts[ty * tiles_x + tx] = self.tile_lut(&mut hist, area);
            }
        }

        let tile_w = w as f64 / tiles_x as f64;
        let tile_h = h as f64 / tiles_y as f64;

        let mut out = vec![0u8; w * h];
        for y in 0..h {
            let (ty1, ty2, ya) = neighbours(y, tile_h, tiles_y);
            for x in 0..w {
                let (tx1, tx2, xa) = neighbours(x, tile_w, tiles_x);
                let v = channel[y * w + x] as usize;

                let top = luts[ty1 * tiles_x + tx1][v] as f64 * (1.0 - xa)
                    + luts[ty1 * tiles_x + tx2][v] as f64 * xa;
                let bottom = luts[ty2 * tiles_x + tx1][v] as f64 * (1.0 - xa)
                    + luts[ty2 * tiles_x + tx2][v] as f64 * xa;

                out[y * w + x] = (top * (1.0 - ya) + bottom * ya).round().clamp(0.0, 255.0) as u8;
            }
        }
        out
    }

    /// Equalize the luminance of an RGB image, leaving a*/b* untouched.
    ///
    /// With the `opencv` feature the OpenCV CLAHE is used, falling back to
    /// the built-in implementation if it fails.
    pub fn apply_rgb(&self, image: &RgbImage) -> RgbImage {
        #[cfg(feature = "opencv")]
        match crate::cv::clahe_lab(image, self.clip_limit, self.tile_grid) {
            Ok(out) => return out,
            Err(e) => tracing::debug!(error = %e, "OpenCV CLAHE failed, using built-in"),
        }
        self.apply_rgb_builtin(image)
    }

    /// Built-in CLAHE on L* quantised to 256 levels.
    pub fn apply_rgb_builtin(&self, image: &RgbImage) -> RgbImage {
        let (width, height) = image.dimensions();
        let labs: Vec<Lab> = image.pixels().map(|p| rgb_to_lab(p.0)).collect();

        let luminance: Vec<u8> = labs
            .iter()
            .map(|lab| (lab.l * 255.0 / 100.0).round().clamp(0.0, 255.0) as u8)
            .collect();
        let equalized = self.apply_channel(&luminance, width, height);

        let mut out = RgbImage::new(width, height);
        for (i, pixel) in out.pixels_mut().enumerate() {
            let lab = Lab {
                l: equalized[i] as f64 * 100.0 / 255.0,
                ..labs[i]
            };
            *pixel = Pixel(lab_to_rgb(lab));
        }
        out
    }

    fn tile_lut(&self, hist: &mut [u32; BINS], area: u32) -> [u8; BINS] {
        let mut lut = [0u8; BINS];
        if area == 0 {
            return lut;
        }

        if self.clip_limit > 0.0 {
            let limit = ((self.clip_limit * area as f64 / BINS as f64) as u32).max(1);

            let mut clipped = 0u32;
            for bin in hist.iter_mut() {
                if *bin > limit {
                    clipped += *bin - limit;
                    *bin = limit;
                }
            }

            let per_bin = clipped / BINS as u32;
            let residual = (clipped % BINS as u32) as usize;
            for bin in hist.iter_mut() {
                *bin += per_bin;
            }
            if residual > 0 {
                let step = (BINS / residual).max(1);
                for i in (0..BINS).step_by(step).take(residual) {
                    hist[i] += 1;
                }
            }
        }

        let scale = 255.0 / area as f64;
        let mut sum = 0u32;
        for (i, bin) in hist.iter().enumerate() {
            sum += bin;
            lut[i] = (sum as f64 * scale).round().clamp(0.0, 255.0) as u8;
        }
        lut
    }
}

/// Neighbouring tile indices along one axis and the blend weight of the second.
fn neighbours(pos: usize, tile_len: f64, tiles: usize) -> (usize, usize, f64) {
    let f = (pos as f64 + 0.5) / tile_len - 0.5;
    let lower = f.floor();
    let weight = f - lower;

    if lower < 0.0 {
        return (0, 0, 0.0);
    }
    let first = lower as usize;
    if first + 1 >= tiles {
        return (tiles - 1, tiles - 1, 0.0);
    }
    (first, first + 1, weight)
}
