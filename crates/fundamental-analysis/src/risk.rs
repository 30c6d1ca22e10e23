use analysis_core::{
    AnalysisResult, AnalysisType, AssumptionProvider, Measure, MetricValue, StatementHistory,
    StatementYear,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

const SAFE_THRESHOLD: f64 = 3.0;
const DISTRESS_THRESHOLD: f64 = 1.8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskZone {
    Low,
    Moderate,
    High,
    /// Total assets or total liabilities is zero
    Undefined,
}

impl RiskZone {
    /// z > 3.0 low, 1.8 < z <= 3.0 moderate, z <= 1.8 high.
    pub fn classify(z: f64) -> Self {
        if z > SAFE_THRESHOLD {
            RiskZone::Low
        } else if z > DISTRESS_THRESHOLD {
            RiskZone::Moderate
        } else {
            RiskZone::High
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            RiskZone::Low => "Low risk",
            RiskZone::Moderate => "Moderate risk",
            RiskZone::High => "High risk",
            RiskZone::Undefined => "Undefined",
        }
    }
}

/// The five weighted terms of the score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ZScoreComponents {
    pub working_capital: f64,
    pub retained_earnings: f64,
    pub operating_income: f64,
    pub equity_to_liabilities: f64,
    pub asset_turnover: f64,
}

impl ZScoreComponents {
    pub fn total(&self) -> f64 {
        self.working_capital
            + self.retained_earnings
            + self.operating_income
            + self.equity_to_liabilities
            + self.asset_turnover
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ZScoreYear {
    pub year: i32,
    pub working_capital: f64,
    pub retained_earnings_estimate: f64,
    pub components: Option<ZScoreComponents>,
    pub z_score: Measure,
    pub zone: RiskZone,
    /// Percentage points, clamped to [0, 100]
    pub bankruptcy_probability: Measure,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskTrend {
    Improving,
    Deteriorating,
    Stable,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ZScoreAnalysis {
    pub years: Vec<ZScoreYear>,
    /// Direction between the first and last defined scores
    pub trend: Option<RiskTrend>,
}

pub fn bankruptcy_probability(z: f64) -> f64 {
    ((SAFE_THRESHOLD - z) / SAFE_THRESHOLD * 100.0).clamp(0.0, 100.0)
}

#[derive(Debug, Clone, Default)]
pub struct RiskEngine;

impl RiskEngine {
    pub fn new() -> Self {
        Self
    }

    pub fn analyze(&self, history: &StatementHistory, assumptions: &dyn AssumptionProvider) -> ZScoreAnalysis {
        let fraction = assumptions.retained_earnings_fraction();
        let years: Vec<ZScoreYear> = history.years().iter().map(|s| self.score_year(s, fraction)).collect();

        let defined: Vec<f64> = years.iter().filter_map(|y| y.z_score.value()).collect();
        let trend = match (defined.first(), defined.last()) {
            (Some(first), Some(last)) if defined.len() > 1 => Some(if last - first > 0.1 {
                RiskTrend::Improving
            } else if first - last > 0.1 {
                RiskTrend::Deteriorating
            } else {
                RiskTrend::Stable
            }),
            _ => None,
        };

        ZScoreAnalysis { years, trend }
    }

    pub fn score_year(&self, s: &StatementYear, retained_earnings_fraction: f64) -> ZScoreYear {
        let working_capital = s.current_assets - s.current_liabilities;
        let retained_earnings_estimate = s.shareholders_equity * retained_earnings_fraction;

        if s.total_assets == 0.0 || s.total_liabilities == 0.0 {
            tracing::debug!("Z-score undefined for {}: zero total assets or liabilities", s.year);
            return ZScoreYear {
                year: s.year,
                working_capital,
                retained_earnings_estimate,
                components: None,
                z_score: Measure::Undefined,
                zone: RiskZone::Undefined,
                bankruptcy_probability: Measure::Undefined,
            };
        }

        let components = ZScoreComponents {
            working_capital: 1.2 * working_capital / s.total_assets,
            retained_earnings: 1.4 * retained_earnings_estimate / s.total_assets,
            operating_income: 3.3 * s.operating_income / s.total_assets,
            equity_to_liabilities: 0.6 * s.shareholders_equity / s.total_liabilities,
            asset_turnover: 1.0 * s.revenue / s.total_assets,
        };
        let z = components.total();

        ZScoreYear {
            year: s.year,
            working_capital,
            retained_earnings_estimate,
            components: Some(components),
            z_score: Measure::new(z),
            zone: RiskZone::classify(z),
            bankruptcy_probability: Measure::new(bankruptcy_probability(z)),
        }
    }
}

impl ZScoreAnalysis {
    pub fn to_result(&self) -> AnalysisResult {
        let mut result = AnalysisResult::new(AnalysisType::ZScore);
        result.details = json!(self);

        let Some(latest) = self.years.last() else {
            return result;
        };

        result.insert_metric("z_score", MetricValue::number(latest.z_score));
        result.insert_metric("risk_zone", MetricValue::text(latest.zone.label()));
        match latest.bankruptcy_probability.value() {
            Some(p) => result.insert_metric("bankruptcy_probability", MetricValue::Percent(p)),
            None => result.insert_metric("bankruptcy_probability", MetricValue::Undefined),
        }
        result.insert_metric("working_capital", MetricValue::Currency(latest.working_capital));
        if let Some(trend) = self.trend {
            let label = match trend {
                RiskTrend::Improving => "improving",
                RiskTrend::Deteriorating => "deteriorating",
                RiskTrend::Stable => "stable",
            };
            result.insert_metric("z_score_trend", MetricValue::text(label));
        }

        match latest.z_score.value() {
            Some(z) => {
                result.interpretation = format!(
                    "Z-score for {} is {:.2} ({}), implying an estimated bankruptcy probability of {:.1}%.",
                    latest.year,
                    z,
                    latest.zone.label(),
                    bankruptcy_probability(z)
                );
                match latest.zone {
                    RiskZone::High => {
                        result.recommendations.push(
                            "Distress zone: prioritise liquidity, restructure short-term debt and cut cash burn."
                                .to_string(),
                        );
                    }
                    RiskZone::Moderate => {
                        result.recommendations.push(
                            "Grey zone: strengthen working capital and operating profitability to move into the safe zone."
                                .to_string(),
                        );
                    }
                    RiskZone::Low | RiskZone::Undefined => {}
                }
            }
            None => {
                result.interpretation = format!(
                    "Z-score for {} is undefined because total assets or total liabilities is zero.",
                    latest.year
                );
                result
                    .recommendations
                    .push("Provide non-zero total assets and liabilities to assess bankruptcy risk.".to_string());
            }
        }
        if self.trend == Some(RiskTrend::Deteriorating) {
            result
                .recommendations
                .push("The Z-score has deteriorated over the period; monitor solvency closely.".to_string());
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use analysis_core::StaticAssumptions;
    use approx::assert_relative_eq;

    fn statement() -> StatementYear {
        StatementYear {
            year: 2023,
            revenue: 4_000_000.0,
            gross_profit: 1_600_000.0,
            operating_income: 500_000.0,
            net_income: 300_000.0,
            total_assets: 5_000_000.0,
            current_assets: 2_000_000.0,
            current_liabilities: 1_000_000.0,
            total_liabilities: 2_000_000.0,
            shareholders_equity: 3_000_000.0,
            ..Default::default()
        }
    }

    #[test]
    fn test_zone_boundaries_are_exact() {
        assert_eq!(RiskZone::classify(3.0), RiskZone::Moderate);
        assert_eq!(RiskZone::classify(3.0000001), RiskZone::Low);
        assert_eq!(RiskZone::classify(1.8), RiskZone::High);
        assert_eq!(RiskZone::classify(1.8000001), RiskZone::Moderate);
    }

    #[test]
    fn test_probability_clamped() {
        assert_eq!(bankruptcy_probability(4.0), 0.0);
        assert_eq!(bankruptcy_probability(-1.0), 100.0);
        assert_relative_eq!(bankruptcy_probability(1.5), 50.0, epsilon = 1e-12);
    }

    #[test]
    fn test_score_year_formula() {
        let y = RiskEngine::new().score_year(&statement(), 0.7);
        // 1.2*0.2 + 1.4*0.42 + 3.3*0.1 + 0.6*1.5 + 1.0*0.8
        let expected = 0.24 + 0.588 + 0.33 + 0.9 + 0.8;
        assert_relative_eq!(y.z_score.value().unwrap(), expected, epsilon = 1e-12);
        assert_eq!(y.zone, RiskZone::Moderate);
    }

    #[test]
    fn test_zero_denominators_give_undefined_risk() {
        let engine = RiskEngine::new();
        let no_assets = engine.score_year(&StatementYear { total_assets: 0.0, ..statement() }, 0.7);
        assert_eq!(no_assets.zone, RiskZone::Undefined);
        assert_eq!(no_assets.bankruptcy_probability, Measure::Undefined);

        let no_liabilities = engine.score_year(&StatementYear { total_liabilities: 0.0, ..statement() }, 0.7);
        assert_eq!(no_liabilities.z_score, Measure::Undefined);
    }

    #[test]
    fn test_trend_and_result() {
        let history = StatementHistory::new(vec![
            StatementYear { year: 2022, operating_income: 900_000.0, ..statement() },
            StatementYear { year: 2023, operating_income: 100_000.0, ..statement() },
        ])
        .unwrap();
        let analysis = RiskEngine::new().analyze(&history, &StaticAssumptions::default());
        assert_eq!(analysis.trend, Some(RiskTrend::Deteriorating));

        let result = analysis.to_result();
        assert_eq!(result.analysis_type, AnalysisType::ZScore);
        assert!(result.metric("z_score").is_some());
        assert!(!result.recommendations.is_empty());
    }
}
