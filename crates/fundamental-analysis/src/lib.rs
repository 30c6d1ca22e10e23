//! Statement-level engines: ratios, trends, bankruptcy risk and sector benchmarking.

pub mod benchmark;
pub mod ratios;
pub mod risk;
pub mod trend;

pub use benchmark::{BenchmarkEngine, BenchmarkMetric, BenchmarkScore, Grade, MetricComparison};
pub use ratios::{
    Direction, RatioAssessment, RatioCategory, RatioEngine, RatioKind, RatioReport, RatioStyle, YearRatios,
};
pub use risk::{RiskEngine, RiskTrend, RiskZone, ZScoreAnalysis, ZScoreComponents, ZScoreYear};
pub use trend::{
    CommonSizeBase, CommonSizeLine, CommonSizeYear, GrowthPeriod, HorizontalAnalysis, LineGrowth, TrendEngine,
    VerticalAnalysis, VerticalLine,
};
