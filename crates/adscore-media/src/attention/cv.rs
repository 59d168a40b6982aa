//! OpenCV backends for optical flow, spectral residual saliency and color
//! histograms.
//!
//! Frames arrive as RGB `image` buffers and are copied into `Mat`s; results
//! go back out as plain vectors or `ndarray` planes so the callers stay
//! backend-agnostic.

use image::RgbImage;
use ndarray::Array2;
use opencv::{
    core::{self, Mat, Scalar, Vec2f, Vector, CV_32FC1, CV_8UC1, CV_8UC3},
    imgproc,
    prelude::*,
    saliency, video,
};

use super::motion::FarnebackParams;

pub type CvResult<T> = Result<T, opencv::Error>;

fn failure(message: impl Into<String>) -> opencv::Error {
    opencv::Error::new(core::StsError, message.into())
}

/// Copy an RGB frame into an 8-bit 3-channel `Mat` (RGB order).
pub fn rgb_mat(frame: &RgbImage) -> CvResult<Mat> {
    let (w, h) = frame.dimensions();
    let mut mat = Mat::new_rows_cols_with_default(h as i32, w as i32, CV_8UC3, Scalar::all(0.0))?;
    mat.data_bytes_mut()?.copy_from_slice(frame.as_raw());
    Ok(mat)
}

/// Single-channel luma `Mat` of an RGB frame.
pub fn gray_mat(frame: &RgbImage) -> CvResult<Mat> {
    let rgb = rgb_mat(frame)?;
    let mut gray = Mat::default();
    imgproc::cvt_color_def(&rgb, &mut gray, imgproc::COLOR_RGB2GRAY)?;
    Ok(gray)
}

/// 8-bit `Mat` from a 0..=255 luma plane.
fn plane_mat(plane: &Array2<f32>) -> CvResult<Mat> {
    let (h, w) = plane.dim();
    let mut mat = Mat::new_rows_cols_with_default(h as i32, w as i32, CV_8UC1, Scalar::all(0.0))?;
    for (dst, v) in mat.data_bytes_mut()?.iter_mut().zip(plane.iter()) {
        *dst = v.round().clamp(0.0, 255.0) as u8;
    }
    Ok(mat)
}

/// Single-channel `Mat` of any depth as an f32 plane.
fn mat_plane(mat: &Mat) -> CvResult<Array2<f32>> {
    let mut float = Mat::default();
    mat.convert_to(&mut float, CV_32FC1, 1.0, 0.0)?;
    let (rows, cols) = (float.rows().max(0) as usize, float.cols().max(0) as usize);
    let data = float.data_typed::<f32>()?.to_vec();
    Array2::from_shape_vec((rows, cols), data).map_err(|e| failure(e.to_string()))
}

/// Mean Farneback flow magnitude between two frames, in pixels.
pub fn mean_flow_magnitude(
    prev: &RgbImage,
    next: &RgbImage,
    params: &FarnebackParams,
) -> CvResult<f64> {
    let prev = gray_mat(prev)?;
    let next = gray_mat(next)?;
    let mut flow = Mat::default();
    video::calc_optical_flow_farneback(
        &prev,
        &next,
        &mut flow,
        params.pyr_scale as f64,
        params.levels as i32,
        params.win_size as i32,
        params.iterations as i32,
        params.poly_n as i32,
        params.poly_sigma as f64,
        0,
    )?;

    let vectors = flow.data_typed::<Vec2f>()?;
    if vectors.is_empty() {
        return Ok(0.0);
    }
    let sum: f64 = vectors
        .iter()
        .map(|v| ((v[0] as f64).powi(2) + (v[1] as f64).powi(2)).sqrt())
        .sum();
    Ok(sum / vectors.len() as f64)
}

/// Spectral residual saliency map, same size as the plane.
pub fn spectral_residual(gray: &Array2<f32>) -> CvResult<Array2<f32>> {
    let src = plane_mat(gray)?;
    let mut model = saliency::StaticSaliencySpectralResidual::create()?;
    let mut map = Mat::default();
    if !model.compute_saliency(&src, &mut map)? {
        return Err(failure("spectral residual produced no map"));
    }
    mat_plane(&map)
}

/// L2-normalised joint RGB histogram with `bins^3` entries, red-major.
pub fn color_histogram(frame: &RgbImage, bins: i32) -> CvResult<Vec<f64>> {
    let mut images: Vector<Mat> = Vector::new();
    images.push(rgb_mat(frame)?);
    let channels = Vector::from_slice(&[0, 1, 2]);
    let hist_size = Vector::from_slice(&[bins, bins, bins]);
    let ranges = Vector::from_slice(&[0.0f32, 256.0, 0.0, 256.0, 0.0, 256.0]);

    let mut hist = Mat::default();
    imgproc::calc_hist(
        &images,
        &channels,
        &Mat::default(),
        &mut hist,
        &hist_size,
        &ranges,
        false,
    )?;

    let mut normalized = Mat::default();
    core::normalize(
        &hist,
        &mut normalized,
        1.0,
        0.0,
        core::NORM_L2,
        -1,
        &Mat::default(),
    )?;
    Ok(normalized
        .data_typed::<f32>()?
        .iter()
        .map(|v| *v as f64)
        .collect())
}
