use analysis_core::stats;
use statrs::statistics::Statistics;

/// A growth model turns a historical growth series into one base growth rate.
///
/// `rates` is never empty; the engine fails the forecast before calling a
/// model when no growth rate could be computed.
pub trait GrowthModel: Send + Sync {
    fn name(&self) -> &'static str;

    /// Confidence at the first horizon year, 0-100.
    fn base_confidence(&self) -> f64;

    fn base_growth(&self, rates: &[f64]) -> f64;
}

/// Plain average of the growth series.
#[derive(Debug, Clone, Copy, Default)]
pub struct LinearTrend;

impl GrowthModel for LinearTrend {
    fn name(&self) -> &'static str {
        "linear_trend"
    }

    fn base_confidence(&self) -> f64 {
        75.0
    }

    fn base_growth(&self, rates: &[f64]) -> f64 {
        stats::mean(rates)
    }
}

/// Weighted average of the most recent periods, newest weighted heaviest.
#[derive(Debug, Clone, Copy)]
pub struct RecencyWeighted {
    pub weights: [f64; 3],
}

impl Default for RecencyWeighted {
    fn default() -> Self {
        Self { weights: [1.0, 2.0, 3.0] }
    }
}

impl GrowthModel for RecencyWeighted {
    fn name(&self) -> &'static str {
        "recency_weighted"
    }

    fn base_confidence(&self) -> f64 {
        80.0
    }

    fn base_growth(&self, rates: &[f64]) -> f64 {
        let window = rates.len().min(self.weights.len());
        let recent = &rates[rates.len() - window..];
        // Shorter series keep the heaviest weights
        let weights = &self.weights[self.weights.len() - window..];
        stats::weighted_mean(recent, weights).unwrap_or(stats::mean(rates))
    }
}

/// Average blended with the least-squares extrapolation of the next period.
#[derive(Debug, Clone, Copy)]
pub struct TrendAdjusted {
    pub blend: f64,
}

impl Default for TrendAdjusted {
    fn default() -> Self {
        Self { blend: 0.5 }
    }
}

impl GrowthModel for TrendAdjusted {
    fn name(&self) -> &'static str {
        "trend_adjusted"
    }

    fn base_confidence(&self) -> f64 {
        85.0
    }

    fn base_growth(&self, rates: &[f64]) -> f64 {
        let (intercept, slope) = stats::linear_trend(rates);
        let next = intercept + slope * rates.len() as f64;
        (1.0 - self.blend) * stats::mean(rates) + self.blend * next
    }
}

/// Average penalised by the dispersion of the series.
#[derive(Debug, Clone, Copy)]
pub struct VarianceAdjusted {
    pub penalty: f64,
}

impl Default for VarianceAdjusted {
    fn default() -> Self {
        Self { penalty: 0.5 }
    }
}

impl GrowthModel for VarianceAdjusted {
    fn name(&self) -> &'static str {
        "variance_adjusted"
    }

    fn base_confidence(&self) -> f64 {
        90.0
    }

    fn base_growth(&self, rates: &[f64]) -> f64 {
        let std_dev = if rates.len() < 2 { 0.0 } else { rates.std_dev() };
        stats::mean(rates) - self.penalty * std_dev
    }
}

pub fn default_models() -> Vec<Box<dyn GrowthModel>> {
    vec![
        Box::new(LinearTrend),
        Box::new(RecencyWeighted::default()),
        Box::new(TrendAdjusted::default()),
        Box::new(VarianceAdjusted::default()),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_linear_trend_is_mean() {
        assert_relative_eq!(LinearTrend.base_growth(&[0.1, 0.2, 0.3]), 0.2, epsilon = 1e-12);
    }

    #[test]
    fn test_recency_weights_latest_periods() {
        let model = RecencyWeighted::default();
        // Only the last three rates count: (0.1*1 + 0.2*2 + 0.3*3) / 6
        assert_relative_eq!(model.base_growth(&[5.0, 0.1, 0.2, 0.3]), 1.4 / 6.0, epsilon = 1e-12);
        // Two rates use weights 2 and 3
        assert_relative_eq!(model.base_growth(&[0.1, 0.2]), 0.8 / 5.0, epsilon = 1e-12);
    }

    #[test]
    fn test_trend_adjusted_extrapolates() {
        // Series 0.1, 0.2, 0.3 continues to 0.4; blended with mean 0.2
        assert_relative_eq!(TrendAdjusted::default().base_growth(&[0.1, 0.2, 0.3]), 0.3, epsilon = 1e-12);
        assert_relative_eq!(TrendAdjusted::default().base_growth(&[0.1]), 0.1, epsilon = 1e-12);
    }

    #[test]
    fn test_variance_adjusted_penalises_dispersion() {
        let model = VarianceAdjusted::default();
        assert_relative_eq!(model.base_growth(&[0.1, 0.1]), 0.1, epsilon = 1e-12);
        // Sample std of [0.1, 0.3] is sqrt(0.02)
        let expected = 0.2 - 0.5 * 0.02_f64.sqrt();
        assert_relative_eq!(model.base_growth(&[0.1, 0.3]), expected, epsilon = 1e-12);
        assert_relative_eq!(model.base_growth(&[0.4]), 0.4, epsilon = 1e-12);
    }

    #[test]
    fn test_default_model_confidences() {
        let confidences: Vec<f64> = default_models().iter().map(|m| m.base_confidence()).collect();
        assert_eq!(confidences, vec![75.0, 80.0, 85.0, 90.0]);
    }
}
