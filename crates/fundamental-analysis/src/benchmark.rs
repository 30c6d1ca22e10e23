use analysis_core::{
    AnalysisResult, AnalysisType, Measure, MetricValue, Region, ResolvedBenchmark, SectorBenchmark,
    StatementHistory, StatementYear,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::ratios::{Direction, RatioKind};

const MAX_POINTS: u8 = 5;

/// Metrics scored against the sector table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BenchmarkMetric {
    CurrentRatio,
    DebtToEquity,
    ReturnOnEquity,
    GrossMargin,
    NetMargin,
    ReturnOnAssets,
}

impl BenchmarkMetric {
    pub const ALL: [BenchmarkMetric; 6] = [
        BenchmarkMetric::CurrentRatio,
        BenchmarkMetric::DebtToEquity,
        BenchmarkMetric::ReturnOnEquity,
        BenchmarkMetric::GrossMargin,
        BenchmarkMetric::NetMargin,
        BenchmarkMetric::ReturnOnAssets,
    ];

    pub fn ratio_kind(&self) -> RatioKind {
        match self {
            BenchmarkMetric::CurrentRatio => RatioKind::CurrentRatio,
            BenchmarkMetric::DebtToEquity => RatioKind::DebtToEquity,
            BenchmarkMetric::ReturnOnEquity => RatioKind::ReturnOnEquity,
            BenchmarkMetric::GrossMargin => RatioKind::GrossMargin,
            BenchmarkMetric::NetMargin => RatioKind::NetMargin,
            BenchmarkMetric::ReturnOnAssets => RatioKind::ReturnOnAssets,
        }
    }

    pub fn name(&self) -> &'static str {
        self.ratio_kind().name()
    }

    pub fn direction(&self) -> Direction {
        self.ratio_kind().direction()
    }

    pub fn benchmark(&self, b: &SectorBenchmark) -> f64 {
        match self {
            BenchmarkMetric::CurrentRatio => b.current_ratio,
            BenchmarkMetric::DebtToEquity => b.debt_to_equity,
            BenchmarkMetric::ReturnOnEquity => b.roe,
            BenchmarkMetric::GrossMargin => b.gross_margin,
            BenchmarkMetric::NetMargin => b.net_margin,
            BenchmarkMetric::ReturnOnAssets => b.roa,
        }
    }

    pub fn from_statement(&self, s: &StatementYear) -> Measure {
        // None of the scored metrics depend on the non-liquid fraction
        self.ratio_kind().compute(s, 0.0)
    }
}

/// Discrete points for a performance ratio.
pub fn points_for(performance: f64) -> u8 {
    match performance {
        p if p >= 1.2 => 5,
        p if p >= 1.0 => 4,
        p if p >= 0.8 => 3,
        p if p >= 0.6 => 2,
        _ => 1,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Grade {
    A,
    B,
    C,
    D,
    F,
}

impl Grade {
    pub fn from_score(score: f64) -> Self {
        match score {
            s if s >= 85.0 => Grade::A,
            s if s >= 70.0 => Grade::B,
            s if s >= 55.0 => Grade::C,
            s if s >= 40.0 => Grade::D,
            _ => Grade::F,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Grade::A => "A",
            Grade::B => "B",
            Grade::C => "C",
            Grade::D => "D",
            Grade::F => "F",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricComparison {
    pub metric: BenchmarkMetric,
    pub company: Measure,
    pub benchmark: f64,
    /// company/benchmark, inverted for lower-is-better metrics
    pub performance_ratio: Measure,
    /// `None` when the metric could not be scored
    pub points: Option<u8>,
    /// (company - benchmark) / |benchmark| in percentage points
    pub variance_pct: Measure,
    pub is_better: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchmarkScore {
    pub sector: String,
    pub region: Region,
    pub comparisons: Vec<MetricComparison>,
    /// 0-100, undefined when no metric could be scored
    pub score: Measure,
    pub grade: Option<Grade>,
    pub strengths: Vec<BenchmarkMetric>,
    pub weaknesses: Vec<BenchmarkMetric>,
}

#[derive(Debug, Clone, Default)]
pub struct BenchmarkEngine;

impl BenchmarkEngine {
    pub fn new() -> Self {
        Self
    }

    pub fn company_metrics(&self, statement: &StatementYear) -> Vec<(BenchmarkMetric, Measure)> {
        BenchmarkMetric::ALL
            .iter()
            .map(|&m| (m, m.from_statement(statement)))
            .collect()
    }

    /// Score the latest year against the resolved benchmark.
    pub fn analyze(&self, history: &StatementHistory, benchmark: &ResolvedBenchmark) -> BenchmarkScore {
        self.compare(&self.company_metrics(history.latest()), benchmark)
    }

    pub fn compare(&self, metrics: &[(BenchmarkMetric, Measure)], benchmark: &ResolvedBenchmark) -> BenchmarkScore {
        let comparisons: Vec<MetricComparison> = metrics
            .iter()
            .map(|&(metric, company)| self.compare_metric(metric, company, metric.benchmark(&benchmark.values)))
            .collect();

        let scored: Vec<u8> = comparisons.iter().filter_map(|c| c.points).collect();
        let score = if scored.is_empty() {
            Measure::Undefined
        } else {
            let total: u32 = scored.iter().map(|&p| p as u32).sum();
            Measure::new(total as f64 / (scored.len() as f64 * MAX_POINTS as f64) * 100.0)
        };

        let by_variance = |items: Vec<&MetricComparison>| -> Vec<BenchmarkMetric> {
            let mut items = items;
            items.sort_by(|a, b| {
                let av = a.variance_pct.value().map(f64::abs).unwrap_or(0.0);
                let bv = b.variance_pct.value().map(f64::abs).unwrap_or(0.0);
                bv.partial_cmp(&av).unwrap_or(std::cmp::Ordering::Equal)
            });
            items.into_iter().map(|c| c.metric).collect()
        };
        let strengths = by_variance(comparisons.iter().filter(|c| c.points.is_some() && c.is_better).collect());
        let weaknesses = by_variance(comparisons.iter().filter(|c| c.points.is_some() && !c.is_better).collect());

        BenchmarkScore {
            sector: benchmark.sector.clone(),
            region: benchmark.region,
            grade: score.value().map(Grade::from_score),
            comparisons,
            score,
            strengths,
            weaknesses,
        }
    }

    fn compare_metric(&self, metric: BenchmarkMetric, company: Measure, benchmark: f64) -> MetricComparison {
        let variance_pct = company.and_then(|c| Measure::ratio(c - benchmark, benchmark.abs()).map(|v| v * 100.0));
        let unscored = MetricComparison {
            metric,
            company,
            benchmark,
            performance_ratio: Measure::Undefined,
            points: None,
            variance_pct,
            is_better: false,
        };

        let Measure::Defined(c) = company else {
            return unscored;
        };
        if benchmark <= 0.0 {
            return unscored;
        }

        match metric.direction() {
            Direction::LowerIsBetter if c < 0.0 => unscored,
            Direction::LowerIsBetter if c == 0.0 => MetricComparison {
                points: Some(MAX_POINTS),
                is_better: true,
                ..unscored
            },
            direction => {
                let performance_ratio = direction.relative(c, benchmark);
                let points = performance_ratio.value().map(points_for);
                MetricComparison {
                    performance_ratio,
                    points,
                    is_better: performance_ratio.value().is_some_and(|p| p >= 1.0),
                    ..unscored
                }
            }
        }
    }
}

impl BenchmarkScore {
    pub fn to_result(&self) -> AnalysisResult {
        let mut result = AnalysisResult::new(AnalysisType::Benchmark);
        result.details = json!(self);

        result.insert_metric("overall_score", MetricValue::number(self.score));
        result.insert_metric(
            "grade",
            self.grade
                .map(|g| MetricValue::text(g.label()))
                .unwrap_or(MetricValue::Undefined),
        );
        for c in &self.comparisons {
            result.insert_metric(format!("{}_performance", c.metric.name()), MetricValue::number(c.performance_ratio));
            result.insert_metric(
                format!("{}_points", c.metric.name()),
                c.points.map(|p| MetricValue::Number(p as f64)).unwrap_or(MetricValue::Undefined),
            );
        }
        result.insert_metric("strength_count", MetricValue::Number(self.strengths.len() as f64));
        result.insert_metric("weakness_count", MetricValue::Number(self.weaknesses.len() as f64));

        let names = |metrics: &[BenchmarkMetric]| -> String {
            if metrics.is_empty() {
                "none".to_string()
            } else {
                metrics.iter().map(|m| m.name()).collect::<Vec<_>>().join(", ")
            }
        };
        result.interpretation = match (self.score.value(), self.grade) {
            (Some(score), Some(grade)) => format!(
                "Overall benchmark score {:.1}/100 (grade {}) against the {} sector ({} benchmarks). Strengths: {}. Weaknesses: {}.",
                score,
                grade.label(),
                self.sector,
                self.region,
                names(&self.strengths),
                names(&self.weaknesses)
            ),
            _ => "No metric could be compared with the sector benchmark.".to_string(),
        };

        for metric in &self.weaknesses {
            result.recommendations.push(match metric.direction() {
                Direction::LowerIsBetter => format!(
                    "{} is above the sector benchmark; reduce reliance on debt.",
                    metric.ratio_kind().label()
                ),
                Direction::HigherIsBetter => format!(
                    "{} trails the sector benchmark; target the gap in the next planning cycle.",
                    metric.ratio_kind().label()
                ),
            });
        }
        result
    }
}
