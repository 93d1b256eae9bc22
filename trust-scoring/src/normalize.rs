// Normalization primitives
// Total, output-bounded transforms from raw windows onto [0, 1]

/// Monotone logistic squash. The exponent is clamped so no input, however
/// extreme, can overflow or escape (0, 1).
pub fn logistic(x: f64, sharpness: f64) -> f64 {
    let exponent = (sharpness * x).clamp(-100.0, 100.0);
    1.0 / (1.0 + (-exponent).exp())
}

/// Clamp to [0, 1]; NaN collapses to 0.0 so no NaN survives normalization.
pub fn clamp_unit(x: f64) -> f64 {
    if x.is_nan() {
        0.0
    } else {
        x.clamp(0.0, 1.0)
    }
}

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population standard deviation.
pub fn stddev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    let var = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64;
    var.sqrt()
}

/// Raw z-score of the last element against the window mean/stddev.
/// A constant window (stddev ~ 0) yields 0.0 rather than blowing up.
pub fn zscore_latest(values: &[f64]) -> Option<f64> {
    let last = *values.last()?;
    let sd = stddev(values);
    if sd < 1e-12 {
        return Some(0.0);
    }
    Some((last - mean(values)) / sd)
}

/// Z-score of the last element squashed onto [0, 1]. A constant window maps
/// to exactly 0.5.
pub fn zscore_unit(values: &[f64], sharpness: f64) -> Option<f64> {
    zscore_latest(values).map(|z| logistic(z, sharpness))
}

/// Average-rank percentile of the last element within the window, in [0, 1].
/// Ties resolve to the midrank, so a fully constant window sits at exactly 0.5.
pub fn percentile_rank(values: &[f64]) -> Option<f64> {
    let last = *values.last()?;
    let n = values.len() as f64;
    let below = values.iter().filter(|v| **v < last).count() as f64;
    let equal = values.iter().filter(|v| **v == last).count() as f64;
    // midrank: below + (equal + 1) / 2, shifted onto (0, 1)
    let rank = below + (equal + 1.0) / 2.0;
    Some(clamp_unit((rank - 0.5) / n))
}

/// Rescale the last element against the trailing `window` min/max. A flat
/// window (min == max) yields 0.5.
pub fn rolling_minmax(values: &[f64], window: usize) -> Option<f64> {
    if values.is_empty() || window == 0 {
        return None;
    }
    let tail = &values[values.len().saturating_sub(window)..];
    let last = *tail.last()?;
    let lo = tail.iter().cloned().fold(f64::INFINITY, f64::min);
    let hi = tail.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    if (hi - lo).abs() < 1e-12 {
        return Some(0.5);
    }
    Some(clamp_unit((last - lo) / (hi - lo)))
}

/// Threshold indicator graded below the floor: 1.0 at or above `floor`,
/// linearly down to 0.0 at zero. A non-positive floor always passes.
pub fn graded_floor(value: f64, floor: f64) -> f64 {
    if floor <= 0.0 {
        return 1.0;
    }
    clamp_unit(value / floor)
}

/// Period-over-period simple returns of a close series.
pub fn simple_returns(closes: &[f64]) -> Vec<f64> {
    closes
        .windows(2)
        .map(|w| if w[0] != 0.0 { (w[1] - w[0]) / w[0] } else { 0.0 })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_logistic_bounds_and_midpoint() {
        assert_relative_eq!(logistic(0.0, 5.0), 0.5);
        assert!(logistic(1e9, 5.0) < 1.0 && logistic(1e9, 5.0) > 0.99);
        assert!(logistic(-1e9, 5.0) > 0.0 && logistic(-1e9, 5.0) < 0.01);
    }

    #[test]
    fn test_logistic_monotone() {
        let mut prev = logistic(-10.0, 3.0);
        for i in -9..=10 {
            let next = logistic(f64::from(i), 3.0);
            assert!(next > prev);
            prev = next;
        }
    }

    #[test]
    fn test_zscore_constant_window_is_neutral() {
        let flat = vec![42.0; 30];
        assert_relative_eq!(zscore_latest(&flat).unwrap(), 0.0);
        assert_relative_eq!(zscore_unit(&flat, 5.0).unwrap(), 0.5);
    }

    #[test]
    fn test_zscore_direction() {
        let rising = vec![1.0, 2.0, 3.0, 4.0, 10.0];
        assert!(zscore_latest(&rising).unwrap() > 0.0);
        assert!(zscore_unit(&rising, 1.0).unwrap() > 0.5);
    }

    #[test]
    fn test_zscore_empty() {
        assert!(zscore_latest(&[]).is_none());
    }

    #[test]
    fn test_percentile_rank_extremes() {
        let values = vec![1.0, 2.0, 3.0, 4.0, 5.0];
        assert_relative_eq!(percentile_rank(&values).unwrap(), 0.9);
        let values = vec![5.0, 4.0, 3.0, 2.0, 1.0];
        assert_relative_eq!(percentile_rank(&values).unwrap(), 0.1);
    }

    #[test]
    fn test_percentile_rank_constant_window() {
        let flat = vec![7.0; 9];
        assert_relative_eq!(percentile_rank(&flat).unwrap(), 0.5);
    }

    #[test]
    fn test_percentile_rank_monotone_in_latest() {
        let base = [3.0, 1.0, 4.0, 1.0, 5.0];
        let mut prev = -1.0;
        for latest in [0.5, 1.0, 2.0, 4.5, 9.0] {
            let mut values = base.to_vec();
            values.push(latest);
            let rank = percentile_rank(&values).unwrap();
            assert!(rank >= prev);
            prev = rank;
        }
    }

    #[test]
    fn test_rolling_minmax_flat_window() {
        let flat = vec![10.0; 20];
        assert_relative_eq!(rolling_minmax(&flat, 20).unwrap(), 0.5);
    }

    #[test]
    fn test_rolling_minmax_position() {
        let values = vec![1.0, 5.0, 3.0];
        assert_relative_eq!(rolling_minmax(&values, 3).unwrap(), 0.5);
        let values = vec![1.0, 5.0, 5.0];
        assert_relative_eq!(rolling_minmax(&values, 3).unwrap(), 1.0);
        let values = vec![1.0, 5.0, 1.0];
        assert_relative_eq!(rolling_minmax(&values, 3).unwrap(), 0.0);
    }

    #[test]
    fn test_rolling_minmax_uses_trailing_window_only() {
        // 100.0 falls outside the 3-element window and must not stretch the range
        let values = vec![100.0, 1.0, 2.0, 3.0];
        assert_relative_eq!(rolling_minmax(&values, 3).unwrap(), 1.0);
    }

    #[test]
    fn test_graded_floor() {
        assert_relative_eq!(graded_floor(2_000_000.0, 1_000_000.0), 1.0);
        assert_relative_eq!(graded_floor(500_000.0, 1_000_000.0), 0.5);
        assert_relative_eq!(graded_floor(0.0, 1_000_000.0), 0.0);
        assert_relative_eq!(graded_floor(123.0, 0.0), 1.0);
    }

    #[test]
    fn test_no_nan_escapes() {
        assert_eq!(clamp_unit(f64::NAN), 0.0);
        assert_eq!(clamp_unit(f64::INFINITY), 1.0);
        assert_eq!(clamp_unit(f64::NEG_INFINITY), 0.0);
    }

    #[test]
    fn test_simple_returns() {
        let closes = vec![100.0, 110.0, 99.0];
        let rets = simple_returns(&closes);
        assert_relative_eq!(rets[0], 0.1);
        assert_relative_eq!(rets[1], -0.1);
    }
}
