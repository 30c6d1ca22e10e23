//! Multi-model revenue, earnings and ROE projections.

pub mod models;

use analysis_core::{
    stats, AnalysisError, AnalysisResult, AnalysisType, AssumptionProvider, Measure, MetricValue, StatementHistory,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

pub use models::{default_models, GrowthModel, LinearTrend, RecencyWeighted, TrendAdjusted, VarianceAdjusted};

const MIN_YEARS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForecastConfig {
    /// Number of projected years
    pub horizon: u32,
    /// Confidence lost per additional horizon year
    pub confidence_decay: f64,
    /// Equity grows at this share of revenue growth
    pub equity_damping: f64,
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            horizon: 5,
            confidence_decay: 5.0,
            equity_damping: 0.85,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HorizonProjection {
    /// 1-based offset from the last historical year
    pub offset: u32,
    pub year: i32,
    pub growth: f64,
    pub revenue: f64,
    pub net_income: f64,
    pub equity: f64,
    pub roe: Measure,
    pub confidence: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelProjection {
    pub model: String,
    pub base_growth: f64,
    pub base_confidence: f64,
    pub horizons: Vec<HorizonProjection>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnsemblePoint {
    pub offset: u32,
    pub year: i32,
    pub revenue: f64,
    pub net_income: f64,
    /// Mean over the models with a defined ROE
    pub roe: Measure,
    pub confidence: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GrowthForecast {
    pub revenue_growth: Vec<Measure>,
    pub net_income_growth: Vec<Measure>,
    pub net_margin: f64,
    pub models: Vec<ModelProjection>,
    pub ensemble: Vec<EnsemblePoint>,
}

/// Arithmetic mean of every model's projection at each horizon.
///
/// Horizons are aligned by position; a model with fewer horizons simply
/// drops out of the later points.
pub fn ensemble(models: &[ModelProjection]) -> Vec<EnsemblePoint> {
    let horizons = models.iter().map(|m| m.horizons.len()).max().unwrap_or(0);

    (0..horizons)
        .filter_map(|index| {
            let points: Vec<&HorizonProjection> = models.iter().filter_map(|m| m.horizons.get(index)).collect();
            let first = points.first()?;
            let column = |f: fn(&HorizonProjection) -> f64| -> Vec<f64> { points.iter().map(|p| f(p)).collect() };
            let roes: Vec<Measure> = points.iter().map(|p| p.roe).collect();

            Some(EnsemblePoint {
                offset: first.offset,
                year: first.year,
                revenue: stats::mean(&column(|p| p.revenue)),
                net_income: stats::mean(&column(|p| p.net_income)),
                roe: stats::mean_defined(&roes),
                confidence: stats::mean(&column(|p| p.confidence)),
            })
        })
        .collect()
}

pub struct ForecastEngine {
    models: Vec<Box<dyn GrowthModel>>,
    config: ForecastConfig,
}

impl ForecastEngine {
    pub fn new() -> Self {
        Self {
            models: default_models(),
            config: ForecastConfig::default(),
        }
    }

    pub fn with_models(models: Vec<Box<dyn GrowthModel>>, config: ForecastConfig) -> Self {
        Self { models, config }
    }

    pub fn config(&self) -> &ForecastConfig {
        &self.config
    }

    pub fn forecast(
        &self,
        history: &StatementHistory,
        assumptions: &dyn AssumptionProvider,
    ) -> Result<GrowthForecast, AnalysisError> {
        history.require("forecast", MIN_YEARS)?;

        let years = history.years();
        let revenue_growth: Vec<Measure> = years
            .windows(2)
            .map(|w| stats::growth(w[0].revenue, w[1].revenue))
            .collect();
        let net_income_growth: Vec<Measure> = years
            .windows(2)
            .map(|w| stats::growth(w[0].net_income, w[1].net_income))
            .collect();

        let rates = stats::defined_values(&revenue_growth);
        if rates.is_empty() {
            return Err(AnalysisError::DivisionUndefined(format!(
                "no revenue growth rate is defined across {} years; every prior-year revenue is zero",
                history.len()
            )));
        }

        let margins: Vec<Measure> = years.iter().map(|s| Measure::ratio(s.net_income, s.revenue)).collect();
        let net_margin = match stats::mean_defined(&margins).value() {
            Some(m) => m,
            None => {
                tracing::warn!("No defined net margin in history, projecting zero earnings");
                0.0
            }
        };

        let last = history.latest();
        let models: Vec<ModelProjection> = self
            .models
            .iter()
            .map(|model| {
                let base_growth = model.base_growth(&rates);
                tracing::debug!("{} base growth {:.4}", model.name(), base_growth);
                let horizons = (1..=self.config.horizon)
                    .map(|offset| {
                        let growth = base_growth + assumptions.growth_shock(model.name(), offset);
                        let revenue = last.revenue * (1.0 + growth).powi(offset as i32);
                        let net_income = revenue * net_margin;
                        let equity = last.shareholders_equity
                            * (1.0 + self.config.equity_damping * growth).powi(offset as i32);
                        HorizonProjection {
                            offset,
                            year: last.year.saturating_add(offset as i32),
                            growth,
                            revenue,
                            net_income,
                            equity,
                            roe: Measure::ratio(net_income, equity),
                            confidence: (model.base_confidence()
                                - self.config.confidence_decay * (offset - 1) as f64)
                                .max(0.0),
                        }
                    })
                    .collect();
                ModelProjection {
                    model: model.name().to_string(),
                    base_growth,
                    base_confidence: model.base_confidence(),
                    horizons,
                }
            })
            .collect();

        Ok(GrowthForecast {
            ensemble: ensemble(&models),
            revenue_growth,
            net_income_growth,
            net_margin,
            models,
        })
    }
}

impl Default for ForecastEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl GrowthForecast {
    pub fn to_result(&self) -> AnalysisResult {
        let mut result = AnalysisResult::new(AnalysisType::Forecast);
        result.details = json!(self);

        result.insert_metric(
            "historical_revenue_growth",
            MetricValue::percent(stats::mean_defined(&self.revenue_growth)),
        );
        result.insert_metric(
            "historical_net_income_growth",
            MetricValue::percent(stats::mean_defined(&self.net_income_growth)),
        );
        result.insert_metric("net_margin", MetricValue::Percent(self.net_margin * 100.0));
        for point in &self.ensemble {
            result.insert_metric(format!("revenue_y{}", point.offset), MetricValue::Currency(point.revenue));
            result.insert_metric(format!("net_income_y{}", point.offset), MetricValue::Currency(point.net_income));
            result.insert_metric(format!("roe_y{}", point.offset), MetricValue::percent(point.roe));
            result.insert_metric(format!("confidence_y{}", point.offset), MetricValue::Number(point.confidence));
        }

        let (Some(first), Some(last)) = (self.ensemble.first(), self.ensemble.last()) else {
            return result;
        };
        let growth = stats::mean(&self.models.iter().map(|m| m.base_growth).collect::<Vec<_>>());
        result.interpretation = format!(
            "Ensemble of {} models projects revenue of {:.0} in {} and {:.0} in {} (average growth {:.1}%), with confidence falling from {:.0} to {:.0}.",
            self.models.len(),
            first.revenue,
            first.year,
            last.revenue,
            last.year,
            growth * 100.0,
            first.confidence,
            last.confidence
        );

        if growth < 0.0 {
            result
                .recommendations
                .push("Models project shrinking revenue; review pricing, demand and cost base.".to_string());
        }
        let spread = self
            .models
            .iter()
            .map(|m| m.base_growth)
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), g| (lo.min(g), hi.max(g)));
        if spread.1 - spread.0 > 0.05 {
            result.recommendations.push(
                "Growth models disagree by more than 5 points; treat long-horizon projections with caution.".to_string(),
            );
        }
        if last.roe.value().is_some_and(|roe| roe < 0.0) {
            result
                .recommendations
                .push("Projected ROE stays negative; a return to profitability is not yet visible.".to_string());
        }
        result
    }
}

#[cfg(test)]
mod tests;
