use analysis_core::{AnalysisError, SeededScenario, StatementHistory, StatementYear, StaticAssumptions};
use approx::assert_relative_eq;

use crate::*;

/// Helper: a statement year with the lines the forecast reads.
fn year(year: i32, revenue: f64, net_income: f64, equity: f64) -> StatementYear {
    StatementYear {
        year,
        revenue,
        net_income,
        shareholders_equity: equity,
        total_assets: equity * 2.0,
        ..Default::default()
    }
}

fn history() -> StatementHistory {
    StatementHistory::new(vec![
        year(2021, 1_000.0, 100.0, 500.0),
        year(2022, 1_100.0, 110.0, 550.0),
        year(2023, 1_210.0, 121.0, 600.0),
    ])
    .unwrap()
}

/// Model returning a fixed growth rate, for ensemble fixtures.
struct FixedGrowth(&'static str, f64, f64);

impl GrowthModel for FixedGrowth {
    fn name(&self) -> &'static str {
        self.0
    }

    fn base_confidence(&self) -> f64 {
        self.2
    }

    fn base_growth(&self, _rates: &[f64]) -> f64 {
        self.1
    }
}

#[test]
fn test_ensemble_is_mean_of_models() {
    let engine = ForecastEngine::with_models(
        vec![Box::new(FixedGrowth("slow", 0.10, 80.0)), Box::new(FixedGrowth("fast", 0.20, 60.0))],
        ForecastConfig::default(),
    );
    let forecast = engine.forecast(&history(), &StaticAssumptions::default()).unwrap();

    assert_eq!(forecast.ensemble.len(), 5);
    assert_relative_eq!(forecast.ensemble[0].revenue, (1_331.0 + 1_452.0) / 2.0, epsilon = 1e-9);
    assert_relative_eq!(forecast.ensemble[0].confidence, 70.0, epsilon = 1e-12);
    for (index, point) in forecast.ensemble.iter().enumerate() {
        let expected = (forecast.models[0].horizons[index].revenue + forecast.models[1].horizons[index].revenue) / 2.0;
        assert_relative_eq!(point.revenue, expected, epsilon = 1e-9);
        assert_eq!(point.year, 2023 + index as i32 + 1);
    }
}

#[test]
fn test_projection_formulas() {
    let engine = ForecastEngine::with_models(vec![Box::new(FixedGrowth("fixed", 0.10, 75.0))], ForecastConfig::default());
    let forecast = engine.forecast(&history(), &StaticAssumptions::default()).unwrap();
    let h2 = &forecast.models[0].horizons[1];

    assert_relative_eq!(forecast.net_margin, 0.1, epsilon = 1e-12);
    assert_relative_eq!(h2.revenue, 1_210.0 * 1.1 * 1.1, epsilon = 1e-9);
    assert_relative_eq!(h2.net_income, h2.revenue * 0.1, epsilon = 1e-9);
    assert_relative_eq!(h2.equity, 600.0 * 1.085 * 1.085, epsilon = 1e-9);
    assert_relative_eq!(h2.roe.value().unwrap(), h2.net_income / h2.equity, epsilon = 1e-12);
}

#[test]
fn test_confidence_decays_and_floors() {
    let forecast = ForecastEngine::new().forecast(&history(), &StaticAssumptions::default()).unwrap();
    let linear = forecast.models.iter().find(|m| m.model == "linear_trend").unwrap();
    let confidences: Vec<f64> = linear.horizons.iter().map(|h| h.confidence).collect();
    assert_eq!(confidences, vec![75.0, 70.0, 65.0, 60.0, 55.0]);

    let steep = ForecastConfig {
        confidence_decay: 30.0,
        ..ForecastConfig::default()
    };
    let forecast = ForecastEngine::with_models(default_models(), steep)
        .forecast(&history(), &StaticAssumptions::default())
        .unwrap();
    let confidences: Vec<f64> = forecast.models[0].horizons.iter().map(|h| h.confidence).collect();
    assert_eq!(confidences, vec![75.0, 45.0, 15.0, 0.0, 0.0]);
}

#[test]
fn test_two_years_is_insufficient() {
    let short = StatementHistory::new(vec![year(2022, 1_000.0, 100.0, 500.0), year(2023, 1_100.0, 110.0, 550.0)]).unwrap();
    let err = ForecastEngine::new().forecast(&short, &StaticAssumptions::default()).unwrap_err();
    assert!(matches!(err, AnalysisError::InsufficientHistory { required: 3, actual: 2, .. }));
}

#[test]
fn test_no_defined_growth_rate_fails() {
    let flat = StatementHistory::new(vec![
        year(2021, 0.0, 0.0, 500.0),
        year(2022, 0.0, 0.0, 500.0),
        year(2023, 0.0, 0.0, 500.0),
    ])
    .unwrap();
    let err = ForecastEngine::new().forecast(&flat, &StaticAssumptions::default()).unwrap_err();
    assert!(matches!(err, AnalysisError::DivisionUndefined(_)));
    assert!(err.to_string().contains("3 years"));
}

#[test]
fn test_zero_equity_gives_undefined_roe() {
    let no_equity = StatementHistory::new(vec![
        year(2021, 1_000.0, 100.0, 0.0),
        year(2022, 1_100.0, 110.0, 0.0),
        year(2023, 1_210.0, 121.0, 0.0),
    ])
    .unwrap();
    let forecast = ForecastEngine::new().forecast(&no_equity, &StaticAssumptions::default()).unwrap();
    assert!(forecast.ensemble.iter().all(|p| p.roe == Measure::Undefined));
    assert!(forecast.ensemble[0].revenue > 0.0);
}

#[test]
fn test_seeded_scenario_is_reproducible() {
    let scenario = SeededScenario::new(StaticAssumptions::default(), 42, 0.02).unwrap();
    let engine = ForecastEngine::new();
    let first = engine.forecast(&history(), &scenario).unwrap();
    let second = engine.forecast(&history(), &scenario).unwrap();
    assert_eq!(first.models, second.models);
    assert_eq!(first.ensemble, second.ensemble);

    for model in &first.models {
        for h in &model.horizons {
            assert!((h.growth - model.base_growth).abs() <= 0.02 + 1e-12);
        }
    }
}

#[test]
fn test_result_metrics() {
    let result = ForecastEngine::new()
        .forecast(&history(), &StaticAssumptions::default())
        .unwrap()
        .to_result();
    assert_eq!(result.analysis_type, AnalysisType::Forecast);
    assert!(result.metric("revenue_y5").is_some());
    assert!(result.interpretation.contains("4 models"));
}
