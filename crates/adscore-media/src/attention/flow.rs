//! Dense optical flow (Farneback polynomial expansion), pure Rust.
//!
//! Used when the crate is built without the `opencv` feature.
//!
//! # Algorithm
//! 1. Build a Gaussian pyramid of each grayscale frame
//! 2. Approximate every pixel neighbourhood by a quadratic polynomial
//!    `f(p) ~ p'Ap + b'p + c` using Gaussian-weighted least squares
//! 3. From the coarsest level down, estimate the displacement `d` that best
//!    explains `b2 = b1 - 2Ad`, averaging the normal equations over a window
//!    and refining `iterations` times per level
//!
//! Polynomial expansions are per frame, so callers expand each frame once and
//! reuse the pyramid for both pairs the frame takes part in.

use ndarray::Array2;

use super::imgops::{box_blur, convolve_separable, gaussian_blur, pyr_down, resize, sample_bilinear};
use super::motion::FarnebackParams;

/// Smallest pyramid level side; coarser levels are skipped.
const MIN_LEVEL_SIDE: usize = 8;

/// Quadratic coefficients for every pixel of one pyramid level.
#[derive(Debug, Clone)]
pub struct PolyExpansion {
    pub bx: Array2<f32>,
    pub by: Array2<f32>,
    pub axx: Array2<f32>,
    pub ayy: Array2<f32>,
    pub axy: Array2<f32>,
}

impl PolyExpansion {
    pub fn dim(&self) -> (usize, usize) {
        self.bx.dim()
    }
}

/// Per-pixel displacement in pixels.
#[derive(Debug, Clone)]
pub struct FlowField {
    pub dx: Array2<f32>,
    pub dy: Array2<f32>,
}

impl FlowField {
    fn zeros(dim: (usize, usize)) -> Self {
        Self {
            dx: Array2::zeros(dim),
            dy: Array2::zeros(dim),
        }
    }

    /// Mean flow magnitude over all pixels.
    pub fn mean_magnitude(&self) -> f64 {
        let n = self.dx.len();
        if n == 0 {
            return 0.0;
        }
        let sum: f64 = self
            .dx
            .iter()
            .zip(self.dy.iter())
            .map(|(dx, dy)| ((*dx as f64).powi(2) + (*dy as f64).powi(2)).sqrt())
            .sum();
        let mean = sum / n as f64;
        if mean.is_finite() {
            mean
        } else {
            0.0
        }
    }
}

/// Weighted least-squares basis for the polynomial expansion.
#[derive(Debug, Clone)]
struct PolyBasis {
    g: Vec<f32>,
    xg: Vec<f32>,
    xxg: Vec<f32>,
    /// 1 / sum(x^2 g)
    inv_m2: f64,
    /// 1 / sum(x^2 y^2 g g)
    inv_m2_sq: f64,
    /// Inverse of the coupled (1, x^2, y^2) block
    inv_block: [[f64; 3]; 3],
}

impl PolyBasis {
    fn new(n: usize, sigma: f32) -> Self {
        let r = n as i32;
        let raw: Vec<f64> = (-r..=r)
            .map(|x| (-(x * x) as f64 / (2.0 * (sigma as f64).powi(2))).exp())
            .collect();
        let sum: f64 = raw.iter().sum();
        let g: Vec<f64> = raw.iter().map(|v| v / sum).collect();

        let offsets: Vec<f64> = (-r..=r).map(|x| x as f64).collect();
        let m2: f64 = g.iter().zip(&offsets).map(|(g, x)| g * x * x).sum();
        let m4: f64 = g.iter().zip(&offsets).map(|(g, x)| g * x.powi(4)).sum();

        let block = [[1.0, m2, m2], [m2, m4, m2 * m2], [m2, m2 * m2, m4]];

        Self {
            g: g.iter().map(|v| *v as f32).collect(),
            xg: g.iter().zip(&offsets).map(|(g, x)| (g * x) as f32).collect(),
            xxg: g.iter().zip(&offsets).map(|(g, x)| (g * x * x) as f32).collect(),
            inv_m2: 1.0 / m2,
            inv_m2_sq: 1.0 / (m2 * m2),
            inv_block: invert3(block),
        }
    }

    fn expand(&self, src: &Array2<f32>) -> PolyExpansion {
        let b1 = convolve_separable(src, &self.g, &self.g);
        let b2 = convolve_separable(src, &self.xg, &self.g);
        let b3 = convolve_separable(src, &self.g, &self.xg);
        let b4 = convolve_separable(src, &self.xxg, &self.g);
        let b5 = convolve_separable(src, &self.g, &self.xxg);
        let b6 = convolve_separable(src, &self.xg, &self.xg);

        let inv = &self.inv_block;
        let axx = Array2::from_shape_fn(src.dim(), |p| {
            (inv[1][0] * b1[p] as f64 + inv[1][1] * b4[p] as f64 + inv[1][2] * b5[p] as f64)
                as f32
        });
        let ayy = Array2::from_shape_fn(src.dim(), |p| {
            (inv[2][0] * b1[p] as f64 + inv[2][1] * b4[p] as f64 + inv[2][2] * b5[p] as f64)
                as f32
        });

        PolyExpansion {
            bx: b2.mapv(|v| (v as f64 * self.inv_m2) as f32),
            by: b3.mapv(|v| (v as f64 * self.inv_m2) as f32),
            axx,
            ayy,
            axy: b6.mapv(|v| (v as f64 * self.inv_m2_sq) as f32),
        }
    }
}

/// Inverse of a 3x3 matrix by cofactors; identity if singular.
fn invert3(m: [[f64; 3]; 3]) -> [[f64; 3]; 3] {
    let c00 = m[1][1] * m[2][2] - m[1][2] * m[2][1];
    let c01 = m[1][2] * m[2][0] - m[1][0] * m[2][2];
    let c02 = m[1][0] * m[2][1] - m[1][1] * m[2][0];
    let det = m[0][0] * c00 + m[0][1] * c01 + m[0][2] * c02;
    if det.abs() < 1e-12 {
        return [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]];
    }
    let inv_det = 1.0 / det;
    [
        [
            c00 * inv_det,
            (m[0][2] * m[2][1] - m[0][1] * m[2][2]) * inv_det,
            (m[0][1] * m[1][2] - m[0][2] * m[1][1]) * inv_det,
        ],
        [
            c01 * inv_det,
            (m[0][0] * m[2][2] - m[0][2] * m[2][0]) * inv_det,
            (m[0][2] * m[1][0] - m[0][0] * m[1][2]) * inv_det,
        ],
        [
            c02 * inv_det,
            (m[0][1] * m[2][0] - m[0][0] * m[2][1]) * inv_det,
            (m[0][0] * m[1][1] - m[0][1] * m[1][0]) * inv_det,
        ],
    ]
}

/// Farneback dense optical flow.
#[derive(Debug, Clone)]
pub struct FarnebackFlow {
    params: FarnebackParams,
    basis: PolyBasis,
}

impl Default for FarnebackFlow {
    fn default() -> Self {
        Self::new(FarnebackParams::default())
    }
}

impl FarnebackFlow {
    pub fn new(params: FarnebackParams) -> Self {
        let basis = PolyBasis::new(params.poly_n, params.poly_sigma);
        Self { params, basis }
    }

    pub fn params(&self) -> &FarnebackParams {
        &self.params
    }

    /// Polynomial expansion of every pyramid level, finest first.
    pub fn expand_pyramid(&self, gray: &Array2<f32>) -> Vec<PolyExpansion> {
        let mut levels = Vec::with_capacity(self.params.levels.max(1));
        let mut current = gray.clone();
        for level in 0..self.params.levels.max(1) {
            if level > 0 {
                let (h, w) = current.dim();
                if h.min(w) < 2 * MIN_LEVEL_SIDE {
                    break;
                }
                current = if (self.params.pyr_scale - 0.5).abs() < f32::EPSILON {
                    pyr_down(&current)
                } else {
                    let nw = ((w as f32 * self.params.pyr_scale).round() as usize).max(1);
                    let nh = ((h as f32 * self.params.pyr_scale).round() as usize).max(1);
                    resize(&gaussian_blur(&current, 1.0), nw, nh)
                };
            }
            levels.push(self.basis.expand(&current));
        }
        levels
    }

    /// Flow from `prev` to `next` given their pyramids.
    pub fn flow(&self, prev: &[PolyExpansion], next: &[PolyExpansion]) -> FlowField {
        let depth = prev.len().min(next.len());
        if depth == 0 {
            return FlowField::zeros((0, 0));
        }

        let mut flow: Option<FlowField> = None;
        for level in (0..depth).rev() {
            let (p1, p2) = (&prev[level], &next[level]);
            let dim = p1.dim();
            if p2.dim() != dim {
                return FlowField::zeros(prev[0].dim());
            }

            let mut current = match flow.take() {
                None => FlowField::zeros(dim),
                Some(coarse) => upscale_flow(&coarse, dim),
            };
            for _ in 0..self.params.iterations.max(1) {
                current = self.refine(p1, p2, &current);
            }
            flow = Some(current);
        }
        flow.unwrap_or_else(|| FlowField::zeros(prev[0].dim()))
    }

    /// Convenience: flow between two grayscale planes.
    pub fn flow_between(&self, prev: &Array2<f32>, next: &Array2<f32>) -> FlowField {
        let a = self.expand_pyramid(prev);
        let b = self.expand_pyramid(next);
        self.flow(&a, &b)
    }

    fn refine(&self, p1: &PolyExpansion, p2: &PolyExpansion, flow: &FlowField) -> FlowField {
        let dim = p1.dim();
        let mut g11 = Array2::<f32>::zeros(dim);
        let mut g12 = Array2::<f32>::zeros(dim);
        let mut g22 = Array2::<f32>::zeros(dim);
        let mut h1 = Array2::<f32>::zeros(dim);
        let mut h2 = Array2::<f32>::zeros(dim);

        for ((y, x), _) in p1.bx.indexed_iter() {
            let dx = flow.dx[[y, x]];
            let dy = flow.dy[[y, x]];
            let sx = x as f32 + dx;
            let sy = y as f32 + dy;

            let a11 = 0.5 * (p1.axx[[y, x]] + sample_bilinear(&p2.axx, sx, sy));
            let a22 = 0.5 * (p1.ayy[[y, x]] + sample_bilinear(&p2.ayy, sx, sy));
            let a12 = 0.25 * (p1.axy[[y, x]] + sample_bilinear(&p2.axy, sx, sy));

            let db1 = -0.5 * (sample_bilinear(&p2.bx, sx, sy) - p1.bx[[y, x]]) + a11 * dx + a12 * dy;
            let db2 = -0.5 * (sample_bilinear(&p2.by, sx, sy) - p1.by[[y, x]]) + a12 * dx + a22 * dy;

            g11[[y, x]] = a11 * a11 + a12 * a12;
            g12[[y, x]] = a12 * (a11 + a22);
            g22[[y, x]] = a12 * a12 + a22 * a22;
            h1[[y, x]] = a11 * db1 + a12 * db2;
            h2[[y, x]] = a12 * db1 + a22 * db2;
        }

        let radius = self.params.win_size / 2;
        let g11 = box_blur(&g11, radius);
        let g12 = box_blur(&g12, radius);
        let g22 = box_blur(&g22, radius);
        let h1 = box_blur(&h1, radius);
        let h2 = box_blur(&h2, radius);

        let mut next = flow.clone();
        for ((y, x), dx) in next.dx.indexed_iter_mut() {
            let det = g11[[y, x]] * g22[[y, x]] - g12[[y, x]] * g12[[y, x]];
            if det.abs() > 1e-9 {
                let ndx = (g22[[y, x]] * h1[[y, x]] - g12[[y, x]] * h2[[y, x]]) / det;
                let ndy = (g11[[y, x]] * h2[[y, x]] - g12[[y, x]] * h1[[y, x]]) / det;
                if ndx.is_finite() && ndy.is_finite() {
                    *dx = ndx;
                    next.dy[[y, x]] = ndy;
                }
            }
        }
        next
    }
}

fn upscale_flow(coarse: &FlowField, dim: (usize, usize)) -> FlowField {
    let (h, w) = dim;
    let (ch, cw) = coarse.dx.dim();
    let sx = w as f32 / cw.max(1) as f32;
    let sy = h as f32 / ch.max(1) as f32;
    FlowField {
        dx: resize(&coarse.dx, w, h).mapv(|v| v * sx),
        dy: resize(&coarse.dy, w, h).mapv(|v| v * sy),
    }
}
