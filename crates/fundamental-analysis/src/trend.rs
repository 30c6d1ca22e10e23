use analysis_core::stats::{growth, mean_defined};
use analysis_core::{
    AnalysisError, AnalysisResult, AnalysisType, Measure, MetricValue, StatementHistory,
    StatementYear,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

/// Growth of the tracked statement lines over one period (fractions).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LineGrowth {
    pub revenue: Measure,
    pub net_income: Measure,
    pub total_assets: Measure,
    pub equity: Measure,
}

impl LineGrowth {
    fn between(previous: &StatementYear, current: &StatementYear) -> Self {
        Self {
            revenue: growth(previous.revenue, current.revenue),
            net_income: growth(previous.net_income, current.net_income),
            total_assets: growth(previous.total_assets, current.total_assets),
            equity: growth(previous.shareholders_equity, current.shareholders_equity),
        }
    }

    fn entries(&self) -> [(&'static str, Measure); 4] {
        [
            ("revenue", self.revenue),
            ("net_income", self.net_income),
            ("total_assets", self.total_assets),
            ("equity", self.equity),
        ]
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GrowthPeriod {
    pub from_year: i32,
    pub to_year: i32,
    pub growth: LineGrowth,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HorizontalAnalysis {
    pub periods: Vec<GrowthPeriod>,
    /// Mean over the periods where each line's growth is defined
    pub average_growth: LineGrowth,
    /// Compound annual revenue growth, first to last year
    pub revenue_cagr: Measure,
}

/// Statement lines expressed in common-size terms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerticalLine {
    CostOfSales,
    GrossProfit,
    OperatingExpenses,
    OperatingIncome,
    NetIncome,
    CurrentAssets,
    NonCurrentAssets,
    CurrentLiabilities,
    NonCurrentLiabilities,
    Equity,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommonSizeBase {
    Revenue,
    TotalAssets,
}

impl VerticalLine {
    pub const ALL: [VerticalLine; 10] = [
        VerticalLine::CostOfSales,
        VerticalLine::GrossProfit,
        VerticalLine::OperatingExpenses,
        VerticalLine::OperatingIncome,
        VerticalLine::NetIncome,
        VerticalLine::CurrentAssets,
        VerticalLine::NonCurrentAssets,
        VerticalLine::CurrentLiabilities,
        VerticalLine::NonCurrentLiabilities,
        VerticalLine::Equity,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            VerticalLine::CostOfSales => "cost_of_sales",
            VerticalLine::GrossProfit => "gross_profit",
            VerticalLine::OperatingExpenses => "operating_expenses",
            VerticalLine::OperatingIncome => "operating_income",
            VerticalLine::NetIncome => "net_income",
            VerticalLine::CurrentAssets => "current_assets",
            VerticalLine::NonCurrentAssets => "non_current_assets",
            VerticalLine::CurrentLiabilities => "current_liabilities",
            VerticalLine::NonCurrentLiabilities => "non_current_liabilities",
            VerticalLine::Equity => "equity",
        }
    }

    pub fn base(&self) -> CommonSizeBase {
        match self {
            VerticalLine::CostOfSales
            | VerticalLine::GrossProfit
            | VerticalLine::OperatingExpenses
            | VerticalLine::OperatingIncome
            | VerticalLine::NetIncome => CommonSizeBase::Revenue,
            _ => CommonSizeBase::TotalAssets,
        }
    }

    pub fn amount(&self, s: &StatementYear) -> f64 {
        match self {
            VerticalLine::CostOfSales => s.revenue - s.gross_profit,
            VerticalLine::GrossProfit => s.gross_profit,
            VerticalLine::OperatingExpenses => s.gross_profit - s.operating_income,
            VerticalLine::OperatingIncome => s.operating_income,
            VerticalLine::NetIncome => s.net_income,
            VerticalLine::CurrentAssets => s.current_assets,
            VerticalLine::NonCurrentAssets => s.total_assets - s.current_assets,
            VerticalLine::CurrentLiabilities => s.current_liabilities,
            VerticalLine::NonCurrentLiabilities => s.total_liabilities - s.current_liabilities,
            VerticalLine::Equity => s.shareholders_equity,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommonSizeLine {
    pub line: VerticalLine,
    pub amount: f64,
    /// Share of revenue or total assets (fraction)
    pub share: Measure,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommonSizeYear {
    pub year: i32,
    pub lines: Vec<CommonSizeLine>,
}

impl CommonSizeYear {
    pub fn share(&self, line: VerticalLine) -> Measure {
        self.lines
            .iter()
            .find(|l| l.line == line)
            .map(|l| l.share)
            .unwrap_or(Measure::Undefined)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerticalAnalysis {
    pub years: Vec<CommonSizeYear>,
}

#[derive(Debug, Clone, Default)]
pub struct TrendEngine;

impl TrendEngine {
    pub fn new() -> Self {
        Self
    }

    /// Year-over-year growth for each consecutive pair of years.
    pub fn horizontal(&self, history: &StatementHistory) -> Result<HorizontalAnalysis, AnalysisError> {
        history.require("horizontal analysis", 2)?;
        let years = history.years();

        let periods: Vec<GrowthPeriod> = years
            .windows(2)
            .map(|w| GrowthPeriod {
                from_year: w[0].year,
                to_year: w[1].year,
                growth: LineGrowth::between(&w[0], &w[1]),
            })
            .collect();

        let collect = |f: fn(&LineGrowth) -> Measure| -> Vec<Measure> {
            periods.iter().map(|p| f(&p.growth)).collect()
        };
        let average_growth = LineGrowth {
            revenue: mean_defined(&collect(|g| g.revenue)),
            net_income: mean_defined(&collect(|g| g.net_income)),
            total_assets: mean_defined(&collect(|g| g.total_assets)),
            equity: mean_defined(&collect(|g| g.equity)),
        };

        let first = &years[0];
        let last = history.latest();
        let span = (i64::from(last.year) - i64::from(first.year)) as f64;
        let revenue_cagr = if first.revenue > 0.0 && last.revenue > 0.0 && span > 0.0 {
            Measure::new((last.revenue / first.revenue).powf(1.0 / span) - 1.0)
        } else {
            Measure::Undefined
        };

        Ok(HorizontalAnalysis {
            periods,
            average_growth,
            revenue_cagr,
        })
    }

    /// Common-size structure for every year.
    pub fn vertical(&self, history: &StatementHistory) -> VerticalAnalysis {
        let years = history
            .years()
            .iter()
            .map(|s| CommonSizeYear {
                year: s.year,
                lines: VerticalLine::ALL
                    .iter()
                    .map(|&line| {
                        let amount = line.amount(s);
                        let base = match line.base() {
                            CommonSizeBase::Revenue => s.revenue,
                            CommonSizeBase::TotalAssets => s.total_assets,
                        };
                        CommonSizeLine {
                            line,
                            amount,
                            share: Measure::ratio(amount, base),
                        }
                    })
                    .collect(),
            })
            .collect();
        VerticalAnalysis { years }
    }
}

fn pct(measure: Measure) -> String {
    measure
        .value()
        .map(|v| format!("{:.2}%", v * 100.0))
        .unwrap_or_else(|| "undefined".to_string())
}

impl HorizontalAnalysis {
    pub fn to_result(&self) -> AnalysisResult {
        let mut result = AnalysisResult::new(AnalysisType::Horizontal);
        result.details = json!(self);

        let Some(last) = self.periods.last() else {
            return result;
        };

        for (name, value) in last.growth.entries() {
            result.insert_metric(format!("{}_growth", name), MetricValue::percent(value));
        }
        for (name, value) in self.average_growth.entries() {
            result.insert_metric(format!("average_{}_growth", name), MetricValue::percent(value));
        }
        result.insert_metric("revenue_cagr", MetricValue::percent(self.revenue_cagr));

        result.interpretation = format!(
            "From {} to {} revenue changed {}, net income {}, total assets {} and equity {}. Average revenue growth over {} period(s): {}.",
            last.from_year,
            last.to_year,
            pct(last.growth.revenue),
            pct(last.growth.net_income),
            pct(last.growth.total_assets),
            pct(last.growth.equity),
            self.periods.len(),
            pct(self.average_growth.revenue),
        );

        let g = &last.growth;
        if g.revenue.value().is_some_and(|v| v < 0.0) {
            result
                .recommendations
                .push("Revenue declined in the latest year; investigate demand and market share.".to_string());
        }
        if let (Some(rev), Some(ni)) = (g.revenue.value(), g.net_income.value()) {
            if ni < rev {
                result.recommendations.push(
                    "Net income grew slower than revenue; margins are compressing, review cost growth.".to_string(),
                );
            }
        }
        if g.equity.value().is_some_and(|v| v < 0.0) {
            result
                .recommendations
                .push("Shareholders' equity shrank; check losses and distributions.".to_string());
        }
        for (name, value) in g.entries() {
            if !value.is_defined() {
                result.recommendations.push(format!(
                    "{} growth for {} is undefined because the prior-year value is zero.",
                    name, last.to_year
                ));
            }
        }
        result
    }
}

impl VerticalAnalysis {
    pub fn to_result(&self) -> AnalysisResult {
        let mut result = AnalysisResult::new(AnalysisType::Vertical);
        result.details = json!(self);

        let Some(latest) = self.years.last() else {
            return result;
        };

        for line in &latest.lines {
            result.insert_metric(format!("{}_pct", line.line.name()), MetricValue::percent(line.share));
        }

        result.interpretation = format!(
            "In {} cost of sales absorbed {} of revenue and operating expenses {}, leaving a net margin of {}. Current assets make up {} of total assets and equity finances {}.",
            latest.year,
            pct(latest.share(VerticalLine::CostOfSales)),
            pct(latest.share(VerticalLine::OperatingExpenses)),
            pct(latest.share(VerticalLine::NetIncome)),
            pct(latest.share(VerticalLine::CurrentAssets)),
            pct(latest.share(VerticalLine::Equity)),
        );

        if latest.share(VerticalLine::CostOfSales).value().is_some_and(|v| v > 0.70) {
            result
                .recommendations
                .push("Cost of sales exceeds 70% of revenue; negotiate input costs or revisit pricing.".to_string());
        }
        if latest.share(VerticalLine::Equity).value().is_some_and(|v| v < 0.30) {
            result
                .recommendations
                .push("Equity funds less than 30% of assets; the balance sheet relies heavily on liabilities.".to_string());
        }
        if latest.share(VerticalLine::CurrentLiabilities).value().unwrap_or(0.0)
            > latest.share(VerticalLine::CurrentAssets).value().unwrap_or(f64::INFINITY)
        {
            result
                .recommendations
                .push("Current liabilities exceed current assets; working capital is negative.".to_string());
        }
        if latest.lines.iter().any(|l| !l.share.is_defined()) {
            result.recommendations.push(format!(
                "Some common-size shares for {} are undefined because revenue or total assets is zero.",
                latest.year
            ));
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn year(year: i32, revenue: f64, net_income: f64) -> StatementYear {
        StatementYear {
            year,
            revenue,
            gross_profit: revenue * 0.4,
            operating_income: revenue * 0.15,
            net_income,
            total_assets: 5_000_000.0,
            current_assets: 1_500_000.0,
            current_liabilities: 700_000.0,
            total_liabilities: 2_000_000.0,
            shareholders_equity: 3_000_000.0,
            ..Default::default()
        }
    }

    #[test]
    fn test_horizontal_revenue_growth_scenario() {
        let history = StatementHistory::new(vec![
            year(2022, 1_000_000.0, 100_000.0),
            year(2023, 1_150_000.0, 120_000.0),
        ])
        .unwrap();
        let analysis = TrendEngine::new().horizontal(&history).unwrap();
        assert_eq!(analysis.periods.len(), 1);
        assert_relative_eq!(analysis.periods[0].growth.revenue.value().unwrap(), 0.15, epsilon = 1e-12);

        let result = analysis.to_result();
        match result.metric("revenue_growth") {
            Some(MetricValue::Percent(p)) => assert_relative_eq!(*p, 15.0, epsilon = 1e-9),
            other => panic!("unexpected metric: {:?}", other),
        }
    }

    #[test]
    fn test_horizontal_requires_two_years() {
        let history = StatementHistory::new(vec![year(2023, 1_000_000.0, 100_000.0)]).unwrap();
        let err = TrendEngine::new().horizontal(&history).unwrap_err();
        assert!(matches!(err, AnalysisError::InsufficientHistory { required: 2, actual: 1, .. }));
    }

    #[test]
    fn test_zero_base_growth_undefined() {
        let history = StatementHistory::new(vec![
            year(2022, 1_000_000.0, 0.0),
            year(2023, 1_100_000.0, 50_000.0),
        ])
        .unwrap();
        let analysis = TrendEngine::new().horizontal(&history).unwrap();
        assert_eq!(analysis.periods[0].growth.net_income, Measure::Undefined);
        assert_eq!(analysis.average_growth.net_income, Measure::Undefined);
        assert!(analysis.to_result().recommendations.iter().any(|r| r.contains("undefined")));
    }

    #[test]
    fn test_revenue_cagr() {
        let history = StatementHistory::new(vec![
            year(2021, 1_000_000.0, 100_000.0),
            year(2022, 1_100_000.0, 100_000.0),
            year(2023, 1_210_000.0, 100_000.0),
        ])
        .unwrap();
        let analysis = TrendEngine::new().horizontal(&history).unwrap();
        assert_relative_eq!(analysis.revenue_cagr.value().unwrap(), 0.10, epsilon = 1e-9);
    }

    #[test]
    fn test_vertical_common_size() {
        let history = StatementHistory::new(vec![year(2023, 1_000_000.0, 80_000.0)]).unwrap();
        let analysis = TrendEngine::new().vertical(&history);
        let y = &analysis.years[0];
        assert_relative_eq!(y.share(VerticalLine::CostOfSales).value().unwrap(), 0.60, epsilon = 1e-12);
        assert_relative_eq!(y.share(VerticalLine::OperatingExpenses).value().unwrap(), 0.25, epsilon = 1e-12);
        assert_relative_eq!(y.share(VerticalLine::NonCurrentAssets).value().unwrap(), 0.70, epsilon = 1e-12);
        assert_relative_eq!(y.share(VerticalLine::NonCurrentLiabilities).value().unwrap(), 0.26, epsilon = 1e-12);
        assert_relative_eq!(y.share(VerticalLine::Equity).value().unwrap(), 0.60, epsilon = 1e-12);
    }

    #[test]
    fn test_vertical_zero_revenue_undefined() {
        let history = StatementHistory::new(vec![year(2023, 0.0, 0.0)]).unwrap();
        let analysis = TrendEngine::new().vertical(&history);
        assert_eq!(analysis.years[0].share(VerticalLine::NetIncome), Measure::Undefined);
        assert!(analysis.years[0].share(VerticalLine::Equity).is_defined());
    }
}
