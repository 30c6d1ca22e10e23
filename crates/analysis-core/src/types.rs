use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use crate::{AnalysisError, Region};

/// One fiscal year of statement figures. Missing fields deserialize to 0.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatementYear {
    pub year: i32,
    pub revenue: f64,
    #[serde(alias = "grossProfit")]
    pub gross_profit: f64,
    #[serde(alias = "operatingIncome")]
    pub operating_income: f64,
    #[serde(alias = "netIncome")]
    pub net_income: f64,
    #[serde(alias = "totalAssets")]
    pub total_assets: f64,
    #[serde(alias = "currentAssets")]
    pub current_assets: f64,
    #[serde(alias = "currentLiabilities")]
    pub current_liabilities: f64,
    #[serde(alias = "totalLiabilities")]
    pub total_liabilities: f64,
    #[serde(alias = "shareholdersEquity")]
    pub shareholders_equity: f64,
    #[serde(alias = "cashFlowOperations")]
    pub cash_flow_operations: f64,
    #[serde(alias = "cashFlowInvesting")]
    pub cash_flow_investing: f64,
    #[serde(alias = "cashFlowFinancing")]
    pub cash_flow_financing: f64,
}

impl StatementYear {
    fn monetary_fields(&self) -> [(&'static str, f64); 12] {
        [
            ("revenue", self.revenue),
            ("gross_profit", self.gross_profit),
            ("operating_income", self.operating_income),
            ("net_income", self.net_income),
            ("total_assets", self.total_assets),
            ("current_assets", self.current_assets),
            ("current_liabilities", self.current_liabilities),
            ("total_liabilities", self.total_liabilities),
            ("shareholders_equity", self.shareholders_equity),
            ("cash_flow_operations", self.cash_flow_operations),
            ("cash_flow_investing", self.cash_flow_investing),
            ("cash_flow_financing", self.cash_flow_financing),
        ]
    }

    /// Free cash flow proxy: operating cash flow plus (usually negative) investing cash flow.
    pub fn free_cash_flow(&self) -> f64 {
        self.cash_flow_operations + self.cash_flow_investing
    }
}

/// Fiscal years accepted in a statement history.
pub const YEAR_RANGE: std::ops::RangeInclusive<i32> = 1800..=9999;

/// Validated statement sequence, ascending by year, never mutated after construction.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatementHistory {
    years: Vec<StatementYear>,
}

impl StatementHistory {
    pub fn new(mut years: Vec<StatementYear>) -> Result<Self, AnalysisError> {
        if years.is_empty() {
            return Err(AnalysisError::InvalidData(
                "At least one statement year is required".to_string(),
            ));
        }

        for statement in &years {
            if !YEAR_RANGE.contains(&statement.year) {
                return Err(AnalysisError::InvalidData(format!(
                    "Statement year {} is outside {}..={}",
                    statement.year,
                    YEAR_RANGE.start(),
                    YEAR_RANGE.end()
                )));
            }
            if let Some((field, _)) = statement
                .monetary_fields()
                .iter()
                .find(|(_, value)| !value.is_finite())
            {
                return Err(AnalysisError::InvalidData(format!(
                    "{} in {} is not a finite number",
                    field, statement.year
                )));
            }
        }

        years.sort_by_key(|s| s.year);
        if let Some(pair) = years.windows(2).find(|w| w[0].year == w[1].year) {
            return Err(AnalysisError::InvalidData(format!(
                "Duplicate statement year {}",
                pair[0].year
            )));
        }

        Ok(Self { years })
    }

    pub fn years(&self) -> &[StatementYear] {
        &self.years
    }

    pub fn len(&self) -> usize {
        self.years.len()
    }

    pub fn is_empty(&self) -> bool {
        self.years.is_empty()
    }

    pub fn latest(&self) -> &StatementYear {
        // Non-empty by construction
        &self.years[self.years.len() - 1]
    }

    /// Fail with `InsufficientHistory` unless at least `required` years are present.
    pub fn require(&self, analysis: &'static str, required: usize) -> Result<(), AnalysisError> {
        if self.years.len() < required {
            return Err(AnalysisError::InsufficientHistory {
                analysis,
                required,
                actual: self.years.len(),
            });
        }
        Ok(())
    }
}

/// A numeric result that may be explicitly undefined (zero denominator, non-finite input).
///
/// Serializes as a plain number, or `null` when undefined.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "Option<f64>", into = "Option<f64>")]
pub enum Measure {
    Defined(f64),
    Undefined,
}

impl Measure {
    pub fn new(value: f64) -> Self {
        if value.is_finite() {
            Measure::Defined(value)
        } else {
            Measure::Undefined
        }
    }

    /// Guarded division: a zero denominator yields `Undefined` instead of inf/NaN.
    pub fn ratio(numerator: f64, denominator: f64) -> Self {
        if denominator == 0.0 {
            return Measure::Undefined;
        }
        Self::new(numerator / denominator)
    }

    pub fn value(&self) -> Option<f64> {
        match self {
            Measure::Defined(v) => Some(*v),
            Measure::Undefined => None,
        }
    }

    pub fn is_defined(&self) -> bool {
        matches!(self, Measure::Defined(_))
    }

    pub fn map(self, f: impl FnOnce(f64) -> f64) -> Self {
        match self {
            Measure::Defined(v) => Measure::new(f(v)),
            Measure::Undefined => Measure::Undefined,
        }
    }

    pub fn and_then(self, f: impl FnOnce(f64) -> Measure) -> Self {
        match self {
            Measure::Defined(v) => f(v),
            Measure::Undefined => Measure::Undefined,
        }
    }

    pub fn unwrap_or(self, default: f64) -> f64 {
        self.value().unwrap_or(default)
    }
}

impl From<Option<f64>> for Measure {
    fn from(value: Option<f64>) -> Self {
        value.map(Measure::new).unwrap_or(Measure::Undefined)
    }
}

impl From<Measure> for Option<f64> {
    fn from(measure: Measure) -> Self {
        measure.value()
    }
}

/// Typed metric value carried in an `AnalysisResult`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum MetricValue {
    Number(f64),
    /// Already scaled to percentage points (15.0 == 15%).
    Percent(f64),
    Currency(f64),
    Text(String),
    Undefined,
}

impl MetricValue {
    pub fn number(measure: Measure) -> Self {
        measure.value().map(MetricValue::Number).unwrap_or(MetricValue::Undefined)
    }

    /// Takes a fraction (0.15) and stores percentage points (15.0).
    pub fn percent(measure: Measure) -> Self {
        measure
            .value()
            .map(|v| MetricValue::Percent(v * 100.0))
            .unwrap_or(MetricValue::Undefined)
    }

    pub fn currency(measure: Measure) -> Self {
        measure.value().map(MetricValue::Currency).unwrap_or(MetricValue::Undefined)
    }

    pub fn text(value: impl Into<String>) -> Self {
        MetricValue::Text(value.into())
    }
}

/// Qualitative rating shared by the ratio tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rating {
    Excellent,
    VeryGood,
    Good,
    Average,
    Weak,
    /// No benchmark to compare against
    Unrated,
    /// The underlying ratio is undefined
    Undefined,
}

impl Rating {
    /// Margin-style threshold table, `percent` in percentage points.
    pub fn from_percent(percent: f64) -> Self {
        match percent {
            p if p >= 20.0 => Rating::Excellent,
            p if p >= 15.0 => Rating::VeryGood,
            p if p >= 10.0 => Rating::Good,
            p if p >= 5.0 => Rating::Average,
            _ => Rating::Weak,
        }
    }

    /// Rating from performance relative to a benchmark (1.0 == on par).
    pub fn from_relative(relative: f64) -> Self {
        match relative {
            r if r >= 1.2 => Rating::Excellent,
            r if r >= 1.0 => Rating::VeryGood,
            r if r >= 0.8 => Rating::Good,
            r if r >= 0.6 => Rating::Average,
            _ => Rating::Weak,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Rating::Excellent => "Excellent",
            Rating::VeryGood => "Very Good",
            Rating::Good => "Good",
            Rating::Average => "Average",
            Rating::Weak => "Weak",
            Rating::Unrated => "Unrated",
            Rating::Undefined => "Undefined",
        }
    }
}

impl fmt::Display for Rating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Closed set of analyses the orchestrator can run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisType {
    Horizontal,
    Vertical,
    Liquidity,
    Profitability,
    Efficiency,
    Leverage,
    #[serde(rename = "zscore", alias = "z_score")]
    ZScore,
    Forecast,
    Valuation,
    Benchmark,
}

impl AnalysisType {
    pub const ALL: [AnalysisType; 10] = [
        AnalysisType::Horizontal,
        AnalysisType::Vertical,
        AnalysisType::Liquidity,
        AnalysisType::Profitability,
        AnalysisType::Efficiency,
        AnalysisType::Leverage,
        AnalysisType::ZScore,
        AnalysisType::Forecast,
        AnalysisType::Valuation,
        AnalysisType::Benchmark,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AnalysisType::Horizontal => "horizontal",
            AnalysisType::Vertical => "vertical",
            AnalysisType::Liquidity => "liquidity",
            AnalysisType::Profitability => "profitability",
            AnalysisType::Efficiency => "efficiency",
            AnalysisType::Leverage => "leverage",
            AnalysisType::ZScore => "zscore",
            AnalysisType::Forecast => "forecast",
            AnalysisType::Valuation => "valuation",
            AnalysisType::Benchmark => "benchmark",
        }
    }
}

impl fmt::Display for AnalysisType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AnalysisType {
    type Err = AnalysisError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace(['-', ' '], "_");
        if normalized == "z_score" {
            return Ok(AnalysisType::ZScore);
        }
        AnalysisType::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == normalized)
            .ok_or_else(|| AnalysisError::InvalidData(format!("Unknown analysis type: {}", s)))
    }
}

/// Result of a single analysis type. Never partially populated: either an
/// engine produced the whole result or the slot holds a failure instead.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub analysis_type: AnalysisType,
    pub metrics: BTreeMap<String, MetricValue>,
    /// Per-year tables and other structured engine output
    pub details: serde_json::Value,
    pub interpretation: String,
    pub recommendations: Vec<String>,
}

impl AnalysisResult {
    pub fn new(analysis_type: AnalysisType) -> Self {
        Self {
            analysis_type,
            metrics: BTreeMap::new(),
            details: serde_json::Value::Null,
            interpretation: String::new(),
            recommendations: Vec::new(),
        }
    }

    pub fn insert_metric(&mut self, name: impl Into<String>, value: MetricValue) {
        self.metrics.insert(name.into(), value);
    }

    pub fn metric(&self, name: &str) -> Option<&MetricValue> {
        self.metrics.get(name)
    }
}

/// Outcome of one report slot.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AnalysisOutcome {
    Completed(AnalysisResult),
    Failed { error_kind: String, message: String },
}

impl AnalysisOutcome {
    pub fn is_failed(&self) -> bool {
        matches!(self, AnalysisOutcome::Failed { .. })
    }

    pub fn result(&self) -> Option<&AnalysisResult> {
        match self {
            AnalysisOutcome::Completed(result) => Some(result),
            AnalysisOutcome::Failed { .. } => None,
        }
    }
}

impl From<Result<AnalysisResult, AnalysisError>> for AnalysisOutcome {
    fn from(result: Result<AnalysisResult, AnalysisError>) -> Self {
        match result {
            Ok(result) => AnalysisOutcome::Completed(result),
            Err(e) => AnalysisOutcome::Failed {
                error_kind: e.kind().to_string(),
                message: e.to_string(),
            },
        }
    }
}

/// Request handed over by the input layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisRequest {
    #[serde(alias = "companyName")]
    pub company_name: String,
    #[serde(alias = "industry")]
    pub sector: String,
    #[serde(default)]
    pub region: String,
    /// Empty means every analysis type
    #[serde(default, alias = "analysisTypes")]
    pub analyses: BTreeSet<AnalysisType>,
    pub statements: Vec<StatementYear>,
}

impl AnalysisRequest {
    pub fn requested_types(&self) -> Vec<AnalysisType> {
        if self.analyses.is_empty() {
            AnalysisType::ALL.to_vec()
        } else {
            self.analyses.iter().copied().collect()
        }
    }
}

/// Full report: one outcome per requested analysis type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub company_name: String,
    pub sector: String,
    /// True when the requested sector was unknown and the default record was used
    pub sector_fallback: bool,
    pub region: Region,
    pub generated_at: DateTime<Utc>,
    pub results: BTreeMap<AnalysisType, AnalysisOutcome>,
}

impl AnalysisReport {
    pub fn get(&self, analysis_type: AnalysisType) -> Option<&AnalysisOutcome> {
        self.results.get(&analysis_type)
    }

    pub fn failed_count(&self) -> usize {
        self.results.values().filter(|o| o.is_failed()).count()
    }
}
