//! Float planes for the signal stages.
//!
//! Planes are `Array2<f32>` indexed `[[y, x]]`. Resizing and Gaussian blur go
//! through `image::imageops` on `Luma<f32>` buffers. Those filters clamp f32
//! subpixels to `[0, 1]`, so a plane is mapped affinely into that range and
//! back; the filters are normalised, so the round trip is exact up to rounding.

use image::imageops::{self, FilterType};
use image::{ImageBuffer, Luma, RgbImage};
use ndarray::Array2;

type LumaF32 = ImageBuffer<Luma<f32>, Vec<f32>>;

/// Convert an RGB frame to a luma plane with values in 0..=255.
pub fn to_gray(frame: &RgbImage) -> Array2<f32> {
    let gray = imageops::grayscale(frame);
    let (w, h) = gray.dimensions();
    let data = gray.into_raw().into_iter().map(f32::from).collect();
    Array2::from_shape_vec((h as usize, w as usize), data)
        .unwrap_or_else(|_| Array2::zeros((h as usize, w as usize)))
}

/// Value range of a plane, `None` when it is constant or not finite.
fn value_range(src: &Array2<f32>) -> Option<(f32, f32)> {
    let (lo, hi) = src
        .iter()
        .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), v| (lo.min(*v), hi.max(*v)));
    (lo.is_finite() && hi.is_finite() && hi > lo).then_some((lo, hi))
}

fn to_unit_image(src: &Array2<f32>, lo: f32, hi: f32) -> Option<LumaF32> {
    let (h, w) = src.dim();
    let scale = 1.0 / (hi - lo);
    let data = src.iter().map(|v| (v - lo) * scale).collect();
    ImageBuffer::from_raw(w as u32, h as u32, data)
}

fn from_unit_image(img: LumaF32, lo: f32, hi: f32) -> Array2<f32> {
    let (w, h) = img.dimensions();
    let span = hi - lo;
    let data = img.into_raw().into_iter().map(|v| v * span + lo).collect();
    Array2::from_shape_vec((h as usize, w as usize), data)
        .unwrap_or_else(|_| Array2::from_elem((h as usize, w as usize), lo))
}

/// Run an imageops filter on a plane in unit range.
fn through_image(
    src: &Array2<f32>,
    out_dim: (usize, usize),
    filter: impl FnOnce(&LumaF32) -> LumaF32,
) -> Array2<f32> {
    let fill = src.iter().copied().find(|v| v.is_finite()).unwrap_or(0.0);
    let Some((lo, hi)) = value_range(src) else {
        return Array2::from_elem(out_dim, fill);
    };
    match to_unit_image(src, lo, hi) {
        Some(img) => from_unit_image(filter(&img), lo, hi),
        None => Array2::from_elem(out_dim, fill),
    }
}

/// Resize to `width` x `height` with a triangle (bilinear) filter.
pub fn resize(src: &Array2<f32>, width: usize, height: usize) -> Array2<f32> {
    let (h, w) = src.dim();
    if h == 0 || w == 0 || width == 0 || height == 0 {
        return Array2::zeros((height, width));
    }
    through_image(src, (height, width), |img| {
        imageops::resize(img, width as u32, height as u32, FilterType::Triangle)
    })
}

/// Gaussian blur.
pub fn gaussian_blur(src: &Array2<f32>, sigma: f32) -> Array2<f32> {
    if src.is_empty() {
        return src.clone();
    }
    through_image(src, src.dim(), |img| imageops::blur(img, sigma))
}

/// Uniform kernel of length `2 * radius + 1`.
pub fn box_kernel(radius: usize) -> Vec<f32> {
    let len = 2 * radius + 1;
    vec![1.0 / len as f32; len]
}

#[inline]
fn clamp_index(i: isize, len: usize) -> usize {
    i.clamp(0, len as isize - 1) as usize
}

/// Separable correlation with odd-length kernels (horizontal then vertical).
///
/// Kernels may be signed, which `imageops` filters cannot express.
pub fn convolve_separable(src: &Array2<f32>, kx: &[f32], ky: &[f32]) -> Array2<f32> {
    let (h, w) = src.dim();
    if h == 0 || w == 0 {
        return src.clone();
    }
    let rx = (kx.len() / 2) as isize;
    let ry = (ky.len() / 2) as isize;

    let mut tmp = Array2::<f32>::zeros((h, w));
    for y in 0..h {
        for x in 0..w {
            let mut acc = 0.0f32;
            for (k, weight) in kx.iter().enumerate() {
                let sx = clamp_index(x as isize + k as isize - rx, w);
                acc += weight * src[[y, sx]];
            }
            tmp[[y, x]] = acc;
        }
    }

    let mut out = Array2::<f32>::zeros((h, w));
    for y in 0..h {
        for x in 0..w {
            let mut acc = 0.0f32;
            for (k, weight) in ky.iter().enumerate() {
                let sy = clamp_index(y as isize + k as isize - ry, h);
                acc += weight * tmp[[sy, x]];
            }
            out[[y, x]] = acc;
        }
    }
    out
}

/// Mean filter over a `(2 * radius + 1)` square window.
pub fn box_blur(src: &Array2<f32>, radius: usize) -> Array2<f32> {
    let k = box_kernel(radius);
    convolve_separable(src, &k, &k)
}

/// Bilinear sample at a fractional position, clamped to the plane.
pub fn sample_bilinear(src: &Array2<f32>, fx: f32, fy: f32) -> f32 {
    let (h, w) = src.dim();
    let fx = fx.clamp(0.0, (w - 1) as f32);
    let fy = fy.clamp(0.0, (h - 1) as f32);
    let x0 = fx.floor() as usize;
    let y0 = fy.floor() as usize;
    let x1 = (x0 + 1).min(w - 1);
    let y1 = (y0 + 1).min(h - 1);
    let ax = fx - x0 as f32;
    let ay = fy - y0 as f32;
    let top = src[[y0, x0]] * (1.0 - ax) + src[[y0, x1]] * ax;
    let bottom = src[[y1, x0]] * (1.0 - ax) + src[[y1, x1]] * ax;
    top * (1.0 - ay) + bottom * ay
}

/// Blur then drop every other row and column.
pub fn pyr_down(src: &Array2<f32>) -> Array2<f32> {
    let (h, w) = src.dim();
    if h == 0 || w == 0 {
        return src.clone();
    }
    let blurred = gaussian_blur(src, 1.0);
    let nh = h.div_ceil(2).max(1);
    let nw = w.div_ceil(2).max(1);
    Array2::from_shape_fn((nh, nw), |(y, x)| {
        blurred[[(2 * y).min(h - 1), (2 * x).min(w - 1)]]
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_box_blur_constant_plane() {
        let plane = Array2::from_elem((6, 8), 3.0f32);
        let out = box_blur(&plane, 2);
        assert!(out.iter().all(|v| (v - 3.0).abs() < 1e-5));
    }

    #[test]
    fn test_resize_preserves_constant() {
        let plane = Array2::from_elem((4, 4), 0.25f32);
        let out = resize(&plane, 9, 7);
        assert_eq!(out.dim(), (7, 9));
        assert!(out.iter().all(|v| (v - 0.25).abs() < 1e-6));
    }

    #[test]
    fn test_resize_keeps_range_outside_unit_interval() {
        let plane = Array2::from_shape_fn((8, 8), |(_, x)| x as f32 * 40.0 - 100.0);
        let out = resize(&plane, 16, 16);
        let lo = out.iter().copied().fold(f32::INFINITY, f32::min);
        let hi = out.iter().copied().fold(f32::NEG_INFINITY, f32::max);
        assert!(lo >= -100.0 - 1e-3 && lo < -60.0, "lo = {lo}");
        assert!(hi <= 180.0 + 1e-3 && hi > 140.0, "hi = {hi}");
    }

    #[test]
    fn test_gaussian_blur_smooths_impulse() {
        let mut plane = Array2::<f32>::zeros((15, 15));
        plane[[7, 7]] = 255.0;
        let out = gaussian_blur(&plane, 1.5);
        assert!(out[[7, 7]] < 255.0);
        assert!(out[[7, 8]] > 0.0);
        assert!((out[[7, 6]] - out[[7, 8]]).abs() < 1e-3);
    }

    #[test]
    fn test_pyr_down_dims() {
        let plane = Array2::<f32>::zeros((9, 16));
        assert_eq!(pyr_down(&plane).dim(), (5, 8));
    }

    #[test]
    fn test_to_gray_dimensions() {
        let frame = RgbImage::from_pixel(5, 3, image::Rgb([255, 255, 255]));
        let gray = to_gray(&frame);
        assert_eq!(gray.dim(), (3, 5));
        assert!((gray[[0, 0]] - 255.0).abs() < 1.0);
    }
}
