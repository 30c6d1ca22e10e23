use analysis_core::{
    AnalysisResult, AnalysisType, AssumptionProvider, Measure, MetricValue, Rating,
    ResolvedBenchmark, SectorBenchmark, StatementHistory, StatementYear,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RatioCategory {
    Liquidity,
    Profitability,
    Efficiency,
    Leverage,
}

impl RatioCategory {
    pub fn analysis_type(&self) -> AnalysisType {
        match self {
            RatioCategory::Liquidity => AnalysisType::Liquidity,
            RatioCategory::Profitability => AnalysisType::Profitability,
            RatioCategory::Efficiency => AnalysisType::Efficiency,
            RatioCategory::Leverage => AnalysisType::Leverage,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            RatioCategory::Liquidity => "Liquidity",
            RatioCategory::Profitability => "Profitability",
            RatioCategory::Efficiency => "Efficiency",
            RatioCategory::Leverage => "Leverage",
        }
    }
}

/// Which way a metric improves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    HigherIsBetter,
    LowerIsBetter,
}

impl Direction {
    /// Company performance relative to the benchmark, oriented so that > 1.0 is better.
    pub fn relative(&self, company: f64, benchmark: f64) -> Measure {
        match self {
            Direction::HigherIsBetter if benchmark > 0.0 => Measure::ratio(company, benchmark),
            Direction::LowerIsBetter if company > 0.0 && benchmark > 0.0 => {
                Measure::ratio(benchmark, company)
            }
            _ => Measure::Undefined,
        }
    }
}

/// How a ratio is read: percentages go through the margin table, multiples
/// are rated against their benchmark.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RatioStyle {
    Percentage,
    Multiple,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RatioKind {
    CurrentRatio,
    QuickRatio,
    GrossMargin,
    OperatingMargin,
    NetMargin,
    ReturnOnEquity,
    ReturnOnAssets,
    ReturnOnInvestedCapital,
    AssetTurnover,
    DebtToEquity,
    EquityRatio,
}

impl RatioKind {
    pub const ALL: [RatioKind; 11] = [
        RatioKind::CurrentRatio,
        RatioKind::QuickRatio,
        RatioKind::GrossMargin,
        RatioKind::OperatingMargin,
        RatioKind::NetMargin,
        RatioKind::ReturnOnEquity,
        RatioKind::ReturnOnAssets,
        RatioKind::ReturnOnInvestedCapital,
        RatioKind::AssetTurnover,
        RatioKind::DebtToEquity,
        RatioKind::EquityRatio,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            RatioKind::CurrentRatio => "current_ratio",
            RatioKind::QuickRatio => "quick_ratio",
            RatioKind::GrossMargin => "gross_margin",
            RatioKind::OperatingMargin => "operating_margin",
            RatioKind::NetMargin => "net_margin",
            RatioKind::ReturnOnEquity => "roe",
            RatioKind::ReturnOnAssets => "roa",
            RatioKind::ReturnOnInvestedCapital => "roic",
            RatioKind::AssetTurnover => "asset_turnover",
            RatioKind::DebtToEquity => "debt_to_equity",
            RatioKind::EquityRatio => "equity_ratio",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            RatioKind::CurrentRatio => "Current ratio",
            RatioKind::QuickRatio => "Quick ratio",
            RatioKind::GrossMargin => "Gross margin",
            RatioKind::OperatingMargin => "Operating margin",
            RatioKind::NetMargin => "Net margin",
            RatioKind::ReturnOnEquity => "Return on equity",
            RatioKind::ReturnOnAssets => "Return on assets",
            RatioKind::ReturnOnInvestedCapital => "Return on invested capital",
            RatioKind::AssetTurnover => "Asset turnover",
            RatioKind::DebtToEquity => "Debt to equity",
            RatioKind::EquityRatio => "Equity ratio",
        }
    }

    pub fn category(&self) -> RatioCategory {
        match self {
            RatioKind::CurrentRatio | RatioKind::QuickRatio => RatioCategory::Liquidity,
            RatioKind::GrossMargin
            | RatioKind::OperatingMargin
            | RatioKind::NetMargin
            | RatioKind::ReturnOnEquity
            | RatioKind::ReturnOnAssets
            | RatioKind::ReturnOnInvestedCapital => RatioCategory::Profitability,
            RatioKind::AssetTurnover => RatioCategory::Efficiency,
            RatioKind::DebtToEquity | RatioKind::EquityRatio => RatioCategory::Leverage,
        }
    }

    pub fn direction(&self) -> Direction {
        match self {
            RatioKind::DebtToEquity => Direction::LowerIsBetter,
            _ => Direction::HigherIsBetter,
        }
    }

    pub fn style(&self) -> RatioStyle {
        match self {
            RatioKind::GrossMargin
            | RatioKind::OperatingMargin
            | RatioKind::NetMargin
            | RatioKind::ReturnOnEquity
            | RatioKind::ReturnOnAssets
            | RatioKind::ReturnOnInvestedCapital => RatioStyle::Percentage,
            RatioKind::CurrentRatio
            | RatioKind::QuickRatio
            | RatioKind::AssetTurnover
            | RatioKind::DebtToEquity
            | RatioKind::EquityRatio => RatioStyle::Multiple,
        }
    }

    /// Ratio value for one statement year; zero denominators give `Undefined`.
    pub fn compute(&self, s: &StatementYear, non_liquid_fraction: f64) -> Measure {
        match self {
            RatioKind::CurrentRatio => Measure::ratio(s.current_assets, s.current_liabilities),
            RatioKind::QuickRatio => Measure::ratio(
                s.current_assets * (1.0 - non_liquid_fraction),
                s.current_liabilities,
            ),
            RatioKind::GrossMargin => Measure::ratio(s.gross_profit, s.revenue),
            RatioKind::OperatingMargin => Measure::ratio(s.operating_income, s.revenue),
            RatioKind::NetMargin => Measure::ratio(s.net_income, s.revenue),
            RatioKind::ReturnOnEquity => Measure::ratio(s.net_income, s.shareholders_equity),
            RatioKind::ReturnOnAssets => Measure::ratio(s.net_income, s.total_assets),
            RatioKind::ReturnOnInvestedCapital => {
                Measure::ratio(s.operating_income, s.total_assets - s.current_liabilities)
            }
            RatioKind::AssetTurnover => Measure::ratio(s.revenue, s.total_assets),
            RatioKind::DebtToEquity => Measure::ratio(s.total_liabilities, s.shareholders_equity),
            RatioKind::EquityRatio => Measure::ratio(s.shareholders_equity, s.total_assets),
        }
    }

    /// Sector reference value. Quick ratio, asset turnover and equity ratio are
    /// derived from the stored ratios; operating margin and ROIC have none.
    pub fn benchmark(&self, b: &SectorBenchmark, non_liquid_fraction: f64) -> Measure {
        match self {
            RatioKind::CurrentRatio => Measure::new(b.current_ratio),
            RatioKind::QuickRatio => Measure::new(b.current_ratio * (1.0 - non_liquid_fraction)),
            RatioKind::GrossMargin => Measure::new(b.gross_margin),
            RatioKind::NetMargin => Measure::new(b.net_margin),
            RatioKind::ReturnOnEquity => Measure::new(b.roe),
            RatioKind::ReturnOnAssets => Measure::new(b.roa),
            // DuPont: ROA = net margin x asset turnover
            RatioKind::AssetTurnover => Measure::ratio(b.roa, b.net_margin),
            RatioKind::DebtToEquity => Measure::new(b.debt_to_equity),
            RatioKind::EquityRatio => Measure::ratio(1.0, 1.0 + b.debt_to_equity),
            RatioKind::OperatingMargin | RatioKind::ReturnOnInvestedCapital => Measure::Undefined,
        }
    }

    fn metric_value(&self, measure: Measure) -> MetricValue {
        match self.style() {
            RatioStyle::Percentage => MetricValue::percent(measure),
            RatioStyle::Multiple => MetricValue::number(measure),
        }
    }

    fn format(&self, measure: Measure) -> String {
        match (measure, self.style()) {
            (Measure::Undefined, _) => "undefined".to_string(),
            (Measure::Defined(v), RatioStyle::Percentage) => format!("{:.2}%", v * 100.0),
            (Measure::Defined(v), RatioStyle::Multiple) => format!("{:.2}x", v),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RatioAssessment {
    pub kind: RatioKind,
    pub value: Measure,
    pub benchmark: Measure,
    /// Company vs benchmark, oriented so that > 1.0 is better
    pub relative: Measure,
    pub rating: Rating,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct YearRatios {
    pub year: i32,
    pub ratios: Vec<RatioAssessment>,
}

impl YearRatios {
    pub fn get(&self, kind: RatioKind) -> Option<&RatioAssessment> {
        self.ratios.iter().find(|r| r.kind == kind)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RatioReport {
    pub sector: String,
    pub years: Vec<YearRatios>,
}

/// Rate a ratio value against its benchmark.
pub fn rate(kind: RatioKind, value: Measure, benchmark: Measure) -> (Measure, Rating) {
    let Measure::Defined(v) = value else {
        return (Measure::Undefined, Rating::Undefined);
    };
    let relative = benchmark.and_then(|b| kind.direction().relative(v, b));
    let rating = match kind.style() {
        RatioStyle::Percentage => Rating::from_percent(v * 100.0),
        RatioStyle::Multiple => match (relative, kind.direction()) {
            (Measure::Defined(r), _) => Rating::from_relative(r),
            (Measure::Undefined, _) if !benchmark.value().is_some_and(|b| b > 0.0) => Rating::Unrated,
            // No leverage at all
            (Measure::Undefined, Direction::LowerIsBetter) if v == 0.0 => Rating::Excellent,
            (Measure::Undefined, _) => Rating::Weak,
        },
    };
    (relative, rating)
}

#[derive(Debug, Clone, Default)]
pub struct RatioEngine;

impl RatioEngine {
    pub fn new() -> Self {
        Self
    }

    pub fn analyze(
        &self,
        history: &StatementHistory,
        benchmark: &ResolvedBenchmark,
        assumptions: &dyn AssumptionProvider,
    ) -> RatioReport {
        let non_liquid = assumptions.non_liquid_fraction();
        let years = history
            .years()
            .iter()
            .map(|statement| self.analyze_year(statement, &benchmark.values, non_liquid))
            .collect();

        RatioReport {
            sector: benchmark.sector.clone(),
            years,
        }
    }

    pub fn analyze_year(
        &self,
        statement: &StatementYear,
        benchmark: &SectorBenchmark,
        non_liquid_fraction: f64,
    ) -> YearRatios {
        let ratios = RatioKind::ALL
            .iter()
            .map(|&kind| {
                let value = kind.compute(statement, non_liquid_fraction);
                if !value.is_defined() {
                    tracing::debug!("{} undefined for {} (zero denominator)", kind.name(), statement.year);
                }
                let bench = kind.benchmark(benchmark, non_liquid_fraction);
                let (relative, rating) = rate(kind, value, bench);
                RatioAssessment {
                    kind,
                    value,
                    benchmark: bench,
                    relative,
                    rating,
                }
            })
            .collect();

        YearRatios {
            year: statement.year,
            ratios,
        }
    }
}

impl RatioReport {
    pub fn latest(&self) -> Option<&YearRatios> {
        self.years.last()
    }

    /// Build the report slot for one ratio category from the latest year,
    /// with the full per-year table in `details`.
    pub fn category_result(&self, category: RatioCategory) -> AnalysisResult {
        let mut result = AnalysisResult::new(category.analysis_type());

        let table: Vec<serde_json::Value> = self
            .years
            .iter()
            .map(|y| {
                let ratios: Vec<&RatioAssessment> =
                    y.ratios.iter().filter(|r| r.kind.category() == category).collect();
                json!({ "year": y.year, "ratios": ratios })
            })
            .collect();
        result.details = json!({ "sector": self.sector, "years": table });

        let Some(latest) = self.latest() else {
            result.interpretation = format!("No statements available for {} analysis", category.label());
            return result;
        };

        let mut summary = Vec::new();
        for assessment in latest.ratios.iter().filter(|r| r.kind.category() == category) {
            let kind = assessment.kind;
            result.insert_metric(kind.name(), kind.metric_value(assessment.value));
            result.insert_metric(
                format!("{}_benchmark", kind.name()),
                kind.metric_value(assessment.benchmark),
            );
            result.insert_metric(
                format!("{}_rating", kind.name()),
                MetricValue::text(assessment.rating.label()),
            );

            let bench_note = if assessment.benchmark.is_defined() {
                format!(" vs sector {}", kind.format(assessment.benchmark))
            } else {
                String::new()
            };
            summary.push(format!(
                "{} {} ({}{})",
                kind.label(),
                kind.format(assessment.value),
                assessment.rating.label(),
                bench_note
            ));

            if let Some(advice) = recommendation(assessment, latest.year) {
                result.recommendations.push(advice);
            }
        }

        result.interpretation = format!(
            "{} position for {}: {}.",
            category.label(),
            latest.year,
            summary.join("; ")
        );
        result
    }
}

fn recommendation(assessment: &RatioAssessment, year: i32) -> Option<String> {
    let kind = assessment.kind;
    match assessment.rating {
        Rating::Undefined => Some(format!(
            "{} is undefined for {} because its denominator is zero; verify the reported figures.",
            kind.label(),
            year
        )),
        Rating::Weak => Some(match kind {
            RatioKind::CurrentRatio | RatioKind::QuickRatio => format!(
                "{} is weak; improve short-term liquidity by building cash or reducing current liabilities.",
                kind.label()
            ),
            RatioKind::GrossMargin | RatioKind::OperatingMargin | RatioKind::NetMargin => format!(
                "{} is weak; review pricing and cost structure.",
                kind.label()
            ),
            RatioKind::ReturnOnEquity
            | RatioKind::ReturnOnAssets
            | RatioKind::ReturnOnInvestedCapital => format!(
                "{} is weak; capital is not generating adequate returns.",
                kind.label()
            ),
            RatioKind::AssetTurnover => {
                "Asset turnover is weak; the asset base is under-utilised relative to sales.".to_string()
            }
            RatioKind::DebtToEquity | RatioKind::EquityRatio => format!(
                "{} signals high leverage; consider deleveraging or strengthening equity.",
                kind.label()
            ),
        }),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use analysis_core::{BenchmarkRepository, Region, StaticAssumptions};
    use approx::assert_relative_eq;

    fn statement() -> StatementYear {
        StatementYear {
            year: 2023,
            revenue: 1_000_000.0,
            gross_profit: 400_000.0,
            operating_income: 150_000.0,
            net_income: 100_000.0,
            total_assets: 5_000_000.0,
            current_assets: 1_200_000.0,
            current_liabilities: 800_000.0,
            total_liabilities: 2_000_000.0,
            shareholders_equity: 3_000_000.0,
            cash_flow_operations: 180_000.0,
            cash_flow_investing: -60_000.0,
            cash_flow_financing: -20_000.0,
        }
    }

    fn report(statements: Vec<StatementYear>) -> RatioReport {
        let history = StatementHistory::new(statements).unwrap();
        let benchmark = BenchmarkRepository::builtin().resolve("retail", Region::Domestic);
        RatioEngine::new().analyze(&history, &benchmark, &StaticAssumptions::default())
    }

    #[test]
    fn test_current_ratio_reconstructs_current_assets() {
        let statements: Vec<StatementYear> = (0..4)
            .map(|i| StatementYear {
                year: 2020 + i,
                current_assets: 1_234_567.0 + i as f64 * 98_765.4,
                current_liabilities: 987_654.3 - i as f64 * 11_111.1,
                ..statement()
            })
            .collect();
        let report = report(statements.clone());

        for (year, s) in report.years.iter().zip(statements.iter()) {
            let current = year.get(RatioKind::CurrentRatio).unwrap().value.value().unwrap();
            assert_relative_eq!(current * s.current_liabilities, s.current_assets, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_zero_current_liabilities_is_undefined() {
        let report = report(vec![StatementYear {
            current_liabilities: 0.0,
            ..statement()
        }]);
        let current = report.years[0].get(RatioKind::CurrentRatio).unwrap();
        assert_eq!(current.value, Measure::Undefined);
        assert_eq!(current.rating, Rating::Undefined);

        let result = report.category_result(RatioCategory::Liquidity);
        assert_eq!(result.metric("current_ratio"), Some(&MetricValue::Undefined));
        assert!(!result.recommendations.is_empty());
    }

    #[test]
    fn test_roe_scenario_rated_weak() {
        let report = report(vec![statement()]);
        let roe = report.years[0].get(RatioKind::ReturnOnEquity).unwrap();
        assert_relative_eq!(roe.value.value().unwrap() * 100.0, 3.3333, epsilon = 1e-3);
        assert_eq!(roe.rating, Rating::Weak);
    }

    #[test]
    fn test_quick_ratio_uses_non_liquid_fraction() {
        let s = statement();
        let default_quick = RatioKind::QuickRatio.compute(&s, 0.30).value().unwrap();
        assert_relative_eq!(default_quick, 1_200_000.0 * 0.7 / 800_000.0, epsilon = 1e-12);
        let custom_quick = RatioKind::QuickRatio.compute(&s, 0.50).value().unwrap();
        assert!(custom_quick < default_quick);
    }

    #[test]
    fn test_leverage_rating_is_inverted() {
        // Retail benchmark D/E 0.9; 0.45 is twice as good
        let (relative, rating) = rate(RatioKind::DebtToEquity, Measure::Defined(0.45), Measure::Defined(0.9));
        assert_relative_eq!(relative.value().unwrap(), 2.0, epsilon = 1e-12);
        assert_eq!(rating, Rating::Excellent);

        let (_, rating) = rate(RatioKind::DebtToEquity, Measure::Defined(3.0), Measure::Defined(0.9));
        assert_eq!(rating, Rating::Weak);

        let (_, rating) = rate(RatioKind::DebtToEquity, Measure::Defined(0.0), Measure::Defined(0.9));
        assert_eq!(rating, Rating::Excellent);
    }

    #[test]
    fn test_ratio_without_benchmark_still_rated_when_percentage() {
        let (relative, rating) = rate(RatioKind::OperatingMargin, Measure::Defined(0.16), Measure::Undefined);
        assert_eq!(relative, Measure::Undefined);
        assert_eq!(rating, Rating::VeryGood);
    }

    #[test]
    fn test_category_result_contains_only_category_ratios() {
        let report = report(vec![statement()]);
        let result = report.category_result(RatioCategory::Leverage);
        assert_eq!(result.analysis_type, AnalysisType::Leverage);
        assert!(result.metric("debt_to_equity").is_some());
        assert!(result.metric("equity_ratio").is_some());
        assert!(result.metric("current_ratio").is_none());
        assert!(result.interpretation.contains("Leverage"));
    }
}
