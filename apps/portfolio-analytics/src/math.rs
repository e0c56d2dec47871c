//! Statistical math utilities for analytics calculations.

use crate::constants::ZERO_TOLERANCE;

/// Calculate mean of a slice.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let sum: f64 = values.iter().sum();
    Some(sum / values.len() as f64)
}

/// Calculate sample standard deviation of a slice.
pub fn std_dev(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }

    let avg = mean(values)?;
    let variance_sum: f64 = values.iter().map(|v| (v - avg) * (v - avg)).sum();
    let variance = variance_sum / (values.len() - 1) as f64;

    Some(variance.max(0.0).sqrt())
}

/// Calculate downside deviation (only negative returns, zero target).
pub fn downside_deviation(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }

    let variance_sum: f64 = values
        .iter()
        .filter(|v| **v < 0.0)
        .map(|v| v * v)
        .sum();
    let variance = variance_sum / values.len() as f64; // Use total count

    Some(variance.sqrt())
}

/// Sample covariance of two equally long slices.
pub fn covariance(xs: &[f64], ys: &[f64]) -> Option<f64> {
    if xs.len() != ys.len() || xs.len() < 2 {
        return None;
    }

    let mean_x = mean(xs)?;
    let mean_y = mean(ys)?;
    let sum: f64 = xs
        .iter()
        .zip(ys)
        .map(|(x, y)| (x - mean_x) * (y - mean_y))
        .sum();

    Some(sum / (xs.len() - 1) as f64)
}

/// Pearson correlation coefficient, clamped to [-1, 1].
///
/// `None` when either side has no variance.
pub fn pearson(xs: &[f64], ys: &[f64]) -> Option<f64> {
    let cov = covariance(xs, ys)?;
    let sx = std_dev(xs)?;
    let sy = std_dev(ys)?;

    if sx <= ZERO_TOLERANCE || sy <= ZERO_TOLERANCE {
        return None;
    }

    let r = cov / (sx * sy);
    r.is_finite().then(|| r.clamp(-1.0, 1.0))
}

/// Percentile of already-sorted values, linear interpolation between ranks.
pub fn percentile(sorted: &[f64], pct: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }

    let pct = pct.clamp(0.0, 100.0);
    let rank = pct / 100.0 * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    let weight = rank - lower as f64;

    Some(sorted[lower] + (sorted[upper] - sorted[lower]) * weight)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mean() {
        let values = vec![10.0, 20.0, 30.0, 40.0];
        assert_eq!(mean(&values), Some(25.0));
        assert_eq!(mean(&[]), None);
    }

    #[test]
    fn test_std_dev() {
        let values = vec![10.0, 20.0, 30.0, 40.0];
        let Some(std) = std_dev(&values) else {
            panic!("std_dev should succeed for non-empty values");
        };
        // Expected std dev ~ 12.9
        assert!(std > 12.0 && std < 14.0);
        assert_eq!(std_dev(&[1.0]), None);
    }

    #[test]
    fn test_downside_deviation() {
        let Some(dd) = downside_deviation(&[0.01, 0.02, 0.03]) else {
            panic!("downside deviation should be defined for two or more values");
        };
        assert_eq!(dd, 0.0);

        let Some(dd) = downside_deviation(&[0.02, -0.02]) else {
            panic!("downside deviation should be defined for two or more values");
        };
        assert!((dd - (0.0004_f64 / 2.0).sqrt()).abs() < 1e-12);
    }

    #[test]
    fn test_pearson() {
        let xs = [1.0, 2.0, 3.0, 4.0];
        let ys = [2.0, 4.0, 6.0, 8.0];
        let Some(r) = pearson(&xs, &ys) else {
            panic!("perfectly linear series should correlate");
        };
        assert!((r - 1.0).abs() < 1e-12);

        let inverse = [8.0, 6.0, 4.0, 2.0];
        let Some(r) = pearson(&xs, &inverse) else {
            panic!("inverse series should correlate");
        };
        assert!((r + 1.0).abs() < 1e-12);

        assert_eq!(pearson(&xs, &[1.0, 1.0, 1.0, 1.0]), None);
        assert_eq!(pearson(&xs, &[1.0, 2.0]), None);
    }

    #[test]
    fn test_percentile() {
        let sorted = [1.0, 2.0, 3.0, 4.0, 5.0];
        assert_eq!(percentile(&sorted, 0.0), Some(1.0));
        assert_eq!(percentile(&sorted, 50.0), Some(3.0));
        assert_eq!(percentile(&sorted, 100.0), Some(5.0));
        assert_eq!(percentile(&sorted, 25.0), Some(2.0));
        assert_eq!(percentile(&sorted, 12.5), Some(1.5));
        assert_eq!(percentile(&[], 50.0), None);
    }
}
