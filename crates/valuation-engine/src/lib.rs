//! Intrinsic value estimates for the latest statement year.

pub mod dcf;

use analysis_core::{
    stats, AnalysisError, AnalysisResult, AnalysisType, AssumptionProvider, Measure, MetricValue, ResolvedBenchmark,
    StatementHistory, StatementYear,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

pub use dcf::{dcf, sensitivity, DcfParams, DcfValuation, SensitivityCell, SensitivityGrid};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ValuationConfig {
    pub dcf_years: u32,
    /// Bounds for growth derived from revenue history
    pub min_growth: f64,
    pub max_growth: f64,
    /// Used when neither the provider nor history gives a growth rate
    pub fallback_growth: f64,
    pub adjusted_book_markup: f64,
    pub liquidation_discount: f64,
    pub sensitivity_step: f64,
}

impl Default for ValuationConfig {
    fn default() -> Self {
        Self {
            dcf_years: 5,
            min_growth: -0.05,
            max_growth: 0.25,
            fallback_growth: 0.05,
            adjusted_book_markup: 0.10,
            liquidation_discount: 0.30,
            sensitivity_step: 0.02,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValuationMethod {
    PriceToEarnings,
    PriceToBook,
    PriceToSales,
    EvToEbitda,
    Dcf,
}

impl ValuationMethod {
    pub fn name(&self) -> &'static str {
        match self {
            ValuationMethod::PriceToEarnings => "pe_valuation",
            ValuationMethod::PriceToBook => "pb_valuation",
            ValuationMethod::PriceToSales => "ps_valuation",
            ValuationMethod::EvToEbitda => "ev_ebitda_valuation",
            ValuationMethod::Dcf => "dcf_valuation",
        }
    }

    /// Share of the blended valuation; P/B only informs the asset view.
    pub fn weight(&self) -> f64 {
        match self {
            ValuationMethod::PriceToEarnings => 0.30,
            ValuationMethod::EvToEbitda => 0.30,
            ValuationMethod::Dcf => 0.25,
            ValuationMethod::PriceToSales => 0.15,
            ValuationMethod::PriceToBook => 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MultiplesValuation {
    pub ebitda: f64,
    pub price_to_earnings: Measure,
    pub price_to_book: Measure,
    pub price_to_sales: Measure,
    pub ev_to_ebitda: Measure,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AssetValuation {
    pub book_value: f64,
    pub adjusted_book_value: f64,
    pub liquidation_value: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeightedComponent {
    pub method: ValuationMethod,
    pub value: Measure,
    pub weight: f64,
    /// Weight after dropping undefined components, 0 when this one is undefined
    pub effective_weight: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValuationReport {
    pub year: i32,
    pub multiples: MultiplesValuation,
    pub dcf: Option<DcfValuation>,
    pub asset_based: AssetValuation,
    pub components: Vec<WeightedComponent>,
    pub weighted_value: Measure,
    pub sensitivity: SensitivityGrid,
}

impl ValuationReport {
    pub fn dcf_value(&self) -> Measure {
        self.dcf
            .as_ref()
            .map(|d| Measure::new(d.enterprise_value))
            .unwrap_or(Measure::Undefined)
    }
}

/// Blend component values with their weights, renormalizing over the defined ones.
pub fn weighted_valuation(values: &[(ValuationMethod, Measure)]) -> (Vec<WeightedComponent>, Measure) {
    let total_weight: f64 = values
        .iter()
        .filter(|(_, v)| v.is_defined())
        .map(|(m, _)| m.weight())
        .sum();

    let components: Vec<WeightedComponent> = values
        .iter()
        .map(|&(method, value)| WeightedComponent {
            method,
            value,
            weight: method.weight(),
            effective_weight: match value {
                Measure::Defined(_) if total_weight > 0.0 => method.weight() / total_weight,
                _ => 0.0,
            },
        })
        .collect();

    if total_weight <= 0.0 {
        return (components, Measure::Undefined);
    }
    let blended: f64 = components
        .iter()
        .filter_map(|c| c.value.value().map(|v| v * c.effective_weight))
        .sum();
    (components, Measure::new(blended))
}

#[derive(Debug, Clone, Default)]
pub struct ValuationEngine {
    config: ValuationConfig,
}

impl ValuationEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: ValuationConfig) -> Self {
        Self { config }
    }

    pub fn multiples(
        &self,
        s: &StatementYear,
        benchmark: &ResolvedBenchmark,
        depreciation_fraction: f64,
    ) -> MultiplesValuation {
        let b = &benchmark.values;
        let positive = |base: f64, multiple: f64| {
            if base > 0.0 {
                Measure::new(base * multiple)
            } else {
                Measure::Undefined
            }
        };
        let ebitda = s.net_income + depreciation_fraction * s.total_assets;

        MultiplesValuation {
            ebitda,
            price_to_earnings: positive(s.net_income, b.price_to_earnings),
            price_to_book: positive(s.shareholders_equity, b.price_to_book),
            price_to_sales: positive(s.revenue, b.price_to_sales),
            ev_to_ebitda: positive(ebitda, b.ev_to_ebitda),
        }
    }

    pub fn asset_based(&self, s: &StatementYear) -> AssetValuation {
        AssetValuation {
            book_value: s.shareholders_equity,
            adjusted_book_value: s.shareholders_equity * (1.0 + self.config.adjusted_book_markup),
            liquidation_value: s.total_assets * (1.0 - self.config.liquidation_discount),
        }
    }

    /// Provider override, else mean historical revenue growth clamped to the configured band.
    pub fn dcf_growth(&self, history: &StatementHistory, assumptions: &dyn AssumptionProvider) -> f64 {
        if let Some(growth) = assumptions.dcf_growth() {
            return growth;
        }
        let rates: Vec<Measure> = history
            .years()
            .windows(2)
            .map(|w| stats::growth(w[0].revenue, w[1].revenue))
            .collect();
        match stats::mean_defined(&rates).value() {
            Some(g) => g.clamp(self.config.min_growth, self.config.max_growth),
            None => self.config.fallback_growth,
        }
    }

    pub fn valuate(
        &self,
        history: &StatementHistory,
        benchmark: &ResolvedBenchmark,
        assumptions: &dyn AssumptionProvider,
    ) -> Result<ValuationReport, AnalysisError> {
        let latest = history.latest();
        let params = DcfParams {
            discount_rate: assumptions.discount_rate(),
            terminal_growth: assumptions.terminal_growth(),
            growth_rate: self.dcf_growth(history, assumptions),
            years: self.config.dcf_years,
        };
        params.validate()?;

        let base_fcf = latest.free_cash_flow();
        let dcf_valuation = if base_fcf > 0.0 {
            Some(dcf(base_fcf, &params)?)
        } else {
            tracing::debug!("Free cash flow {} is not positive, DCF left undefined", base_fcf);
            None
        };

        let multiples = self.multiples(latest, benchmark, assumptions.depreciation_fraction());
        let dcf_value = dcf_valuation
            .as_ref()
            .map(|d| Measure::new(d.enterprise_value))
            .unwrap_or(Measure::Undefined);
        let (components, weighted_value) = weighted_valuation(&[
            (ValuationMethod::PriceToEarnings, multiples.price_to_earnings),
            (ValuationMethod::EvToEbitda, multiples.ev_to_ebitda),
            (ValuationMethod::Dcf, dcf_value),
            (ValuationMethod::PriceToSales, multiples.price_to_sales),
        ]);

        Ok(ValuationReport {
            year: latest.year,
            asset_based: self.asset_based(latest),
            sensitivity: sensitivity(base_fcf, &params, self.config.sensitivity_step),
            multiples,
            dcf: dcf_valuation,
            components,
            weighted_value,
        })
    }
}

impl ValuationReport {
    pub fn to_result(&self) -> AnalysisResult {
        let mut result = AnalysisResult::new(AnalysisType::Valuation);
        result.details = json!(self);

        result.insert_metric(
            ValuationMethod::PriceToEarnings.name(),
            MetricValue::currency(self.multiples.price_to_earnings),
        );
        result.insert_metric(
            ValuationMethod::PriceToBook.name(),
            MetricValue::currency(self.multiples.price_to_book),
        );
        result.insert_metric(
            ValuationMethod::PriceToSales.name(),
            MetricValue::currency(self.multiples.price_to_sales),
        );
        result.insert_metric(
            ValuationMethod::EvToEbitda.name(),
            MetricValue::currency(self.multiples.ev_to_ebitda),
        );
        result.insert_metric(ValuationMethod::Dcf.name(), MetricValue::currency(self.dcf_value()));
        result.insert_metric("book_value", MetricValue::Currency(self.asset_based.book_value));
        result.insert_metric(
            "adjusted_book_value",
            MetricValue::Currency(self.asset_based.adjusted_book_value),
        );
        result.insert_metric("liquidation_value", MetricValue::Currency(self.asset_based.liquidation_value));
        result.insert_metric("weighted_valuation", MetricValue::currency(self.weighted_value));
        result.insert_metric("dcf_low", MetricValue::currency(self.sensitivity.low));
        result.insert_metric("dcf_high", MetricValue::currency(self.sensitivity.high));

        let defined = self.components.iter().filter(|c| c.value.is_defined()).count();
        result.interpretation = match self.weighted_value.value() {
            Some(value) => format!(
                "Weighted valuation for {} is {:.0}, blended from {} of {} methods. Book value is {:.0} and liquidation value {:.0}.",
                self.year,
                value,
                defined,
                self.components.len(),
                self.asset_based.book_value,
                self.asset_based.liquidation_value
            ),
            None => format!(
                "No earnings, EBITDA, sales or cash flow based valuation is defined for {}; only the asset view ({:.0} book value) applies.",
                self.year, self.asset_based.book_value
            ),
        };

        if self.dcf.is_none() {
            result
                .recommendations
                .push("Free cash flow is not positive; the DCF cannot support a valuation until cash generation improves.".to_string());
        }
        if !self.multiples.price_to_earnings.is_defined() {
            result
                .recommendations
                .push("The company is loss-making; earnings multiples are excluded from the blend.".to_string());
        }
        if let (Some(low), Some(high)) = (self.sensitivity.low.value(), self.sensitivity.high.value()) {
            if low > 0.0 && high / low > 2.0 {
                result.recommendations.push(
                    "DCF value more than doubles across the sensitivity range; validate discount and growth assumptions."
                        .to_string(),
                );
            }
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use analysis_core::{BenchmarkRepository, Region, StaticAssumptions};
    use approx::assert_relative_eq;

    fn statement(year: i32, revenue: f64) -> StatementYear {
        StatementYear {
            year,
            revenue,
            gross_profit: revenue * 0.4,
            operating_income: revenue * 0.15,
            net_income: revenue * 0.1,
            total_assets: 2_000_000.0,
            current_assets: 800_000.0,
            current_liabilities: 400_000.0,
            total_liabilities: 800_000.0,
            shareholders_equity: 1_200_000.0,
            cash_flow_operations: 200_000.0,
            cash_flow_investing: -80_000.0,
            cash_flow_financing: -20_000.0,
        }
    }

    fn history() -> StatementHistory {
        StatementHistory::new(vec![statement(2022, 1_000_000.0), statement(2023, 1_100_000.0)]).unwrap()
    }

    fn benchmark() -> ResolvedBenchmark {
        BenchmarkRepository::builtin().resolve("retail", Region::Domestic)
    }

    #[test]
    fn test_multiples_use_sector_table() {
        let m = ValuationEngine::new().multiples(&statement(2023, 1_100_000.0), &benchmark(), 0.05);
        assert_relative_eq!(m.price_to_earnings.value().unwrap(), 110_000.0 * 18.0, epsilon = 1e-6);
        assert_relative_eq!(m.ebitda, 110_000.0 + 100_000.0, epsilon = 1e-9);
        assert_relative_eq!(m.ev_to_ebitda.value().unwrap(), 210_000.0 * 10.0, epsilon = 1e-6);
    }

    #[test]
    fn test_loss_makes_pe_undefined() {
        let loss = StatementYear {
            net_income: -50_000.0,
            ..statement(2023, 1_100_000.0)
        };
        let m = ValuationEngine::new().multiples(&loss, &benchmark(), 0.05);
        assert_eq!(m.price_to_earnings, Measure::Undefined);
        // EBITDA stays positive thanks to the depreciation add-back
        assert!(m.ev_to_ebitda.is_defined());
    }

    #[test]
    fn test_weights_renormalize() {
        let (components, value) = weighted_valuation(&[
            (ValuationMethod::PriceToEarnings, Measure::Defined(100.0)),
            (ValuationMethod::EvToEbitda, Measure::Undefined),
            (ValuationMethod::Dcf, Measure::Undefined),
            (ValuationMethod::PriceToSales, Measure::Defined(200.0)),
        ]);
        // 0.30 and 0.15 renormalize to 2/3 and 1/3
        assert_relative_eq!(value.value().unwrap(), 100.0 * 2.0 / 3.0 + 200.0 / 3.0, epsilon = 1e-9);
        assert_eq!(components[1].effective_weight, 0.0);

        let (_, none) = weighted_valuation(&[(ValuationMethod::Dcf, Measure::Undefined)]);
        assert_eq!(none, Measure::Undefined);
    }

    #[test]
    fn test_growth_derivation() {
        let engine = ValuationEngine::new();
        assert_relative_eq!(engine.dcf_growth(&history(), &StaticAssumptions::default()), 0.1, epsilon = 1e-12);

        let fast = StatementHistory::new(vec![statement(2022, 1_000_000.0), statement(2023, 2_000_000.0)]).unwrap();
        assert_relative_eq!(engine.dcf_growth(&fast, &StaticAssumptions::default()), 0.25);

        let single = StatementHistory::new(vec![statement(2023, 1_000_000.0)]).unwrap();
        assert_relative_eq!(engine.dcf_growth(&single, &StaticAssumptions::default()), 0.05);

        let fixed = StaticAssumptions {
            dcf_growth: Some(0.02),
            ..StaticAssumptions::default()
        };
        assert_relative_eq!(engine.dcf_growth(&history(), &fixed), 0.02);
    }

    #[test]
    fn test_valuate_blends_all_methods() {
        let report = ValuationEngine::new()
            .valuate(&history(), &benchmark(), &StaticAssumptions::default())
            .unwrap();
        assert!(report.dcf.is_some());
        assert!(report.components.iter().all(|c| c.value.is_defined()));
        assert_relative_eq!(report.asset_based.adjusted_book_value, 1_320_000.0, epsilon = 1e-6);
        assert_relative_eq!(report.asset_based.liquidation_value, 1_400_000.0, epsilon = 1e-6);
        assert!(report.weighted_value.is_defined());
        assert!(report.to_result().metric("weighted_valuation").is_some());
    }

    #[test]
    fn test_valuate_rejects_invalid_discount() {
        let invalid = StaticAssumptions {
            discount_rate: 0.03,
            terminal_growth: 0.03,
            ..StaticAssumptions::default()
        };
        let err = ValuationEngine::new()
            .valuate(&history(), &benchmark(), &invalid)
            .unwrap_err();
        assert_eq!(err.kind(), "invalid_discount_assumption");
    }

    #[test]
    fn test_negative_fcf_leaves_dcf_undefined() {
        let burning = StatementHistory::new(vec![StatementYear {
            cash_flow_operations: -10_000.0,
            ..statement(2023, 1_000_000.0)
        }])
        .unwrap();
        let report = ValuationEngine::new()
            .valuate(&burning, &benchmark(), &StaticAssumptions::default())
            .unwrap();
        assert!(report.dcf.is_none());
        assert_eq!(report.sensitivity.high, Measure::Undefined);
        assert!(report.weighted_value.is_defined());
        assert!(!report.to_result().recommendations.is_empty());
    }
}
