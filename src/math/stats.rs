//! Small statistics helpers.

use std::cmp::Ordering;

/// Mean of the finite entries; `None` when there are none.
pub fn nanmean(values: impl IntoIterator<Item = f64>) -> Option<f64> {
    let (sum, n) = values
        .into_iter()
        .filter(|v| v.is_finite())
        .fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    (n > 0).then(|| sum / n as f64)
}

/// Percentile `q` (0..=100) of already sorted values, linear interpolation
/// between closest ranks.
pub fn percentile_sorted(sorted: &[f64], q: f64) -> f64 {
    if sorted.is_empty() {
        return f64::NAN;
    }
    let pos = (q / 100.0).clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;
    sorted[lo] + (sorted[hi] - sorted[lo]) * frac
}

/// Percentiles of unsorted values (NaNs are dropped).
pub fn percentiles(values: &[f64], qs: &[f64]) -> Vec<f64> {
    let mut sorted: Vec<f64> = values.iter().copied().filter(|v| !v.is_nan()).collect();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
    qs.iter().map(|&q| percentile_sorted(&sorted, q)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nanmean_skips_non_finite() {
        assert_eq!(nanmean([1.0, f64::NAN, 3.0, f64::INFINITY]), Some(2.0));
        assert_eq!(nanmean([f64::NAN]), None);
    }

    #[test]
    fn percentile_interpolates_linearly() {
        let v = [4.0, 1.0, 3.0, 2.0, 5.0];
        let q = percentiles(&v, &[0.0, 25.0, 50.0, 90.0, 100.0]);
        assert_eq!(q[0], 1.0);
        assert_eq!(q[1], 2.0);
        assert_eq!(q[2], 3.0);
        assert!((q[3] - 4.6).abs() < 1e-12);
        assert_eq!(q[4], 5.0);
    }
}
