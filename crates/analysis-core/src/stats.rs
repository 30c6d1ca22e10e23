//! Small numeric helpers shared by the engines.
//!
//! Everything here works on plain slices and never divides by zero: empty or
//! degenerate input falls back to a neutral value or `Measure::Undefined`.

use crate::Measure;

/// Arithmetic mean; 0.0 for an empty slice.
pub fn mean(data: &[f64]) -> f64 {
    if data.is_empty() {
        return 0.0;
    }
    data.iter().sum::<f64>() / data.len() as f64
}

/// Mean of the defined values only; `Undefined` when none are defined.
pub fn mean_defined(measures: &[Measure]) -> Measure {
    let values = defined_values(measures);
    if values.is_empty() {
        Measure::Undefined
    } else {
        Measure::new(mean(&values))
    }
}

pub fn defined_values(measures: &[Measure]) -> Vec<f64> {
    measures.iter().filter_map(|m| m.value()).collect()
}

/// Weighted mean of `data` with matching `weights`. Extra entries on either side are ignored.
pub fn weighted_mean(data: &[f64], weights: &[f64]) -> Measure {
    let (sum, total_weight) = data
        .iter()
        .zip(weights.iter())
        .fold((0.0, 0.0), |(s, w), (x, wt)| (s + x * wt, w + wt));
    Measure::ratio(sum, total_weight)
}

/// Ordinary least-squares fit of `data[i]` against `i`, returning `(intercept, slope)`.
/// Fewer than two points yield a flat line through the mean.
pub fn linear_trend(data: &[f64]) -> (f64, f64) {
    let n = data.len();
    if n < 2 {
        return (mean(data), 0.0);
    }
    let x_mean = (n - 1) as f64 / 2.0;
    let y_mean = mean(data);
    let (cov, var) = data.iter().enumerate().fold((0.0, 0.0), |(c, v), (i, y)| {
        let dx = i as f64 - x_mean;
        (c + dx * (y - y_mean), v + dx * dx)
    });
    let slope = if var > 0.0 { cov / var } else { 0.0 };
    (y_mean - slope * x_mean, slope)
}

/// Growth between two values, `Undefined` when the base is zero.
pub fn growth(previous: f64, current: f64) -> Measure {
    Measure::ratio(current - previous, previous)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_mean_handles_empty() {
        assert_eq!(mean(&[]), 0.0);
        assert_relative_eq!(mean(&[1.0, 2.0, 3.0]), 2.0);
    }

    #[test]
    fn test_mean_defined_skips_undefined() {
        let m = mean_defined(&[Measure::Defined(0.1), Measure::Undefined, Measure::Defined(0.3)]);
        assert_relative_eq!(m.value().unwrap(), 0.2);
        assert_eq!(mean_defined(&[Measure::Undefined]), Measure::Undefined);
    }

    #[test]
    fn test_weighted_mean() {
        let m = weighted_mean(&[0.1, 0.2, 0.3], &[1.0, 2.0, 3.0]);
        assert_relative_eq!(m.value().unwrap(), 1.4 / 6.0, epsilon = 1e-12);
        assert_eq!(weighted_mean(&[], &[]), Measure::Undefined);
    }

    #[test]
    fn test_linear_trend_exact_line() {
        let (intercept, slope) = linear_trend(&[1.0, 3.0, 5.0, 7.0]);
        assert_relative_eq!(intercept, 1.0, epsilon = 1e-12);
        assert_relative_eq!(slope, 2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_growth_zero_base() {
        assert_eq!(growth(0.0, 10.0), Measure::Undefined);
        assert_relative_eq!(growth(1_000_000.0, 1_150_000.0).value().unwrap(), 0.15, epsilon = 1e-12);
    }
}
