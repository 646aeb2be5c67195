//! OpenCV implementations of the strip normalization and partitioning.
//!
//! Only compiled with the `opencv` feature. Callers fall back to the pure
//! Rust paths in [`crate::clahe`] and [`crate::clustering`] on any error.

use image::RgbImage;
use opencv::core::{self, Mat, Scalar, Size, TermCriteria, Vector, CV_32F, CV_8UC3};
use opencv::imgproc;
use opencv::prelude::*;
use teamlock_models::Rgb;

use crate::clustering::ClusterFit;

fn to_mat(image: &RgbImage) -> opencv::Result<Mat> {
    let (width, height) = image.dimensions();
    let mut mat =
        Mat::new_rows_cols_with_default(height as i32, width as i32, CV_8UC3, Scalar::all(0.0))?;
    mat.data_bytes_mut()?.copy_from_slice(image.as_raw());
    Ok(mat)
}

/// CLAHE on the L channel of the Lab representation, a/b untouched.
pub fn clahe_lab(image: &RgbImage, clip_limit: f64, tile_grid: u32) -> opencv::Result<RgbImage> {
    let (width, height) = image.dimensions();
    let rgb = to_mat(image)?;

    let mut lab = Mat::default();
    imgproc::cvt_color_def(&rgb, &mut lab, imgproc::COLOR_RGB2Lab)?;

    let mut planes: Vector<Mat> = Vector::new();
    core::split(&lab, &mut planes)?;

    // Tile grid shrinks for strips thinner than the grid
    let grid = Size::new(
        tile_grid.min(width).max(1) as i32,
        tile_grid.min(height).max(1) as i32,
    );
    let mut clahe = imgproc::create_clahe(clip_limit, grid)?;
    let mut lightness = Mat::default();
    clahe.apply(&planes.get(0)?, &mut lightness)?;
    planes.set(0, lightness)?;

    let mut merged = Mat::default();
    core::merge(&planes, &mut merged)?;
    let mut out = Mat::default();
    imgproc::cvt_color_def(&merged, &mut out, imgproc::COLOR_Lab2RGB)?;

    RgbImage::from_raw(width, height, out.data_bytes()?.to_vec())
        .ok_or_else(|| opencv::Error::new(core::StsUnmatchedSizes, "normalized strip size changed"))
}

/// `cv::kmeans` with k-means++ centers. Seeds the OpenCV RNG first so
/// repeated calls on the same input agree.
pub fn kmeans(
    points: &[Rgb],
    k: usize,
    attempts: u32,
    max_iter: u32,
    tolerance: f64,
    seed: u64,
) -> opencv::Result<ClusterFit> {
    let mut data =
        Mat::new_rows_cols_with_default(points.len() as i32, 3, CV_32F, Scalar::all(0.0))?;
    for (row, p) in points.iter().enumerate() {
        for (col, v) in p.to_array().into_iter().enumerate() {
            *data.at_2d_mut::<f32>(row as i32, col as i32)? = v as f32;
        }
    }

    core::set_rng_seed(seed as i32)?;
    let criteria = TermCriteria::new(
        core::TermCriteria_Type::COUNT as i32 + core::TermCriteria_Type::EPS as i32,
        max_iter as i32,
        tolerance,
    )?;

    let mut labels = Mat::default();
    let mut centers = Mat::default();
    let inertia = core::kmeans(
        &data,
        k as i32,
        &mut labels,
        criteria,
        attempts.max(1) as i32,
        core::KMEANS_PP_CENTERS,
        &mut centers,
    )?;

    let mut centroids = Vec::with_capacity(k);
    for row in 0..k as i32 {
        centroids.push(Rgb::new(
            *centers.at_2d::<f32>(row, 0)? as f64,
            *centers.at_2d::<f32>(row, 1)? as f64,
            *centers.at_2d::<f32>(row, 2)? as f64,
        ));
    }
    let labels = (0..points.len() as i32)
        .map(|row| labels.at_2d::<i32>(row, 0).map(|l| (*l).max(0) as usize))
        .collect::<opencv::Result<Vec<_>>>()?;

    Ok(ClusterFit {
        centroids,
        labels,
        inertia,
    })
}
