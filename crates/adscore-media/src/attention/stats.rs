//! Small numeric helpers shared by the scoring stages.
//!
//! All helpers are total: empty input yields 0 (or an empty vector) and
//! non-finite values are treated as 0 rather than propagated.

/// Guard added to denominators, matching the calibration of the scoring model.
pub const EPSILON: f64 = 1e-6;

/// Replace non-finite values with 0.
pub fn sanitize(values: &[f64]) -> Vec<f64> {
    values
        .iter()
        .map(|v| if v.is_finite() { *v } else { 0.0 })
        .collect()
}

/// Arithmetic mean, 0 for empty input.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population standard deviation (ddof = 0).
pub fn std_dev(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mu = mean(values);
    let var = values.iter().map(|v| (v - mu) * (v - mu)).sum::<f64>() / values.len() as f64;
    var.sqrt()
}

/// Percentile with linear interpolation between closest ranks.
///
/// `q` is in [0, 100].
pub fn percentile(values: &[f64], q: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let rank = (q.clamp(0.0, 100.0) / 100.0) * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    let frac = rank - lo as f64;
    sorted[lo] + (sorted[hi] - sorted[lo]) * frac
}

/// Maximum value, 0 for empty input.
pub fn max(values: &[f64]) -> f64 {
    values.iter().copied().fold(f64::NEG_INFINITY, f64::max).max(0.0)
}

/// Divide by `max + EPSILON` when the maximum is positive; otherwise unchanged.
pub fn normalize_by_max(values: &[f64]) -> Vec<f64> {
    let values = sanitize(values);
    let peak = max(&values);
    if peak > 0.0 {
        values.iter().map(|v| v / (peak + EPSILON)).collect()
    } else {
        values
    }
}

/// Clip every value into [lo, hi].
pub fn clip(values: &[f64], lo: f64, hi: f64) -> Vec<f64> {
    sanitize(values).iter().map(|v| v.clamp(lo, hi)).collect()
}

/// `n` evenly spaced samples from `start` to `end` inclusive.
pub fn linspace(start: f64, end: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (end - start) / (n - 1) as f64;
            (0..n).map(|i| start + step * i as f64).collect()
        }
    }
}
