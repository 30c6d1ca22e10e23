use analysis_core::{
    AnalysisError, AnalysisOutcome, AnalysisReport, AnalysisRequest, AnalysisResult, AnalysisType,
    AssumptionProvider, BenchmarkRepository, Region, ResolvedBenchmark, StatementHistory,
};
use chrono::Utc;
use forecast_engine::ForecastEngine;
use fundamental_analysis::{BenchmarkEngine, RatioCategory, RatioEngine, RatioReport, RiskEngine, TrendEngine};
use rayon::prelude::*;
use std::collections::BTreeMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, OnceLock};
use valuation_engine::ValuationEngine;

/// Error kind reported for a slot whose engine panicked.
pub const INTERNAL_ERROR_KIND: &str = "internal";

/// Per-request state shared by the slots of one analysis run.
struct RunContext<'a> {
    history: &'a StatementHistory,
    benchmark: &'a ResolvedBenchmark,
    assumptions: &'a dyn AssumptionProvider,
    /// Computed on the first ratio slot, reused by the other categories
    ratios: OnceLock<RatioReport>,
}

pub struct AnalysisOrchestrator {
    benchmarks: Arc<BenchmarkRepository>,
    ratio_engine: RatioEngine,
    trend_engine: TrendEngine,
    risk_engine: RiskEngine,
    forecast_engine: ForecastEngine,
    valuation_engine: ValuationEngine,
    benchmark_engine: BenchmarkEngine,
}

impl AnalysisOrchestrator {
    pub fn new(benchmarks: Arc<BenchmarkRepository>) -> Self {
        Self {
            benchmarks,
            ratio_engine: RatioEngine::new(),
            trend_engine: TrendEngine::new(),
            risk_engine: RiskEngine::new(),
            forecast_engine: ForecastEngine::new(),
            valuation_engine: ValuationEngine::new(),
            benchmark_engine: BenchmarkEngine::new(),
        }
    }

    pub fn with_forecast_engine(mut self, engine: ForecastEngine) -> Self {
        self.forecast_engine = engine;
        self
    }

    pub fn with_valuation_engine(mut self, engine: ValuationEngine) -> Self {
        self.valuation_engine = engine;
        self
    }

    pub fn benchmarks(&self) -> &BenchmarkRepository {
        &self.benchmarks
    }

    /// Run every requested analysis and collect one outcome per type.
    ///
    /// Never fails as a whole: engine errors, invalid statement data and
    /// engine panics all end up as `Failed` slots in the report.
    pub fn analyze(&self, request: &AnalysisRequest, assumptions: &dyn AssumptionProvider) -> AnalysisReport {
        let requested = request.requested_types();
        tracing::info!(
            "Starting analysis for {} ({} statement years, {} analyses)",
            request.company_name,
            request.statements.len(),
            requested.len()
        );

        let region = Region::from_code_or_default(&request.region);
        let benchmark = self.benchmarks.resolve(&request.sector, region);

        let results: BTreeMap<AnalysisType, AnalysisOutcome> = match StatementHistory::new(request.statements.clone()) {
            Ok(history) => {
                let context = RunContext {
                    history: &history,
                    benchmark: &benchmark,
                    assumptions,
                    ratios: OnceLock::new(),
                };
                requested
                    .iter()
                    .map(|&analysis_type| (analysis_type, self.run_isolated(analysis_type, &context)))
                    .collect()
            }
            Err(e) => {
                tracing::warn!("Rejected statements for {}: {}", request.company_name, e);
                requested
                    .iter()
                    .map(|&analysis_type| (analysis_type, AnalysisOutcome::from(Err::<AnalysisResult, _>(e.clone()))))
                    .collect()
            }
        };

        let report = AnalysisReport {
            company_name: request.company_name.clone(),
            sector: benchmark.sector.clone(),
            sector_fallback: benchmark.fallback,
            region,
            generated_at: Utc::now(),
            results,
        };
        tracing::info!(
            "Finished analysis for {}: {} of {} analyses failed",
            report.company_name,
            report.failed_count(),
            report.results.len()
        );
        report
    }

    /// Analyze independent requests in parallel. Reports keep the request order.
    pub fn analyze_batch(
        &self,
        requests: &[AnalysisRequest],
        assumptions: &dyn AssumptionProvider,
    ) -> Vec<AnalysisReport> {
        tracing::info!("Running batch of {} analysis requests", requests.len());
        requests
            .par_iter()
            .map(|request| self.analyze(request, assumptions))
            .collect()
    }

    fn run_isolated(&self, analysis_type: AnalysisType, context: &RunContext<'_>) -> AnalysisOutcome {
        let run = panic::catch_unwind(AssertUnwindSafe(|| self.run(analysis_type, context)));

        match run {
            Ok(Ok(result)) => AnalysisOutcome::Completed(result),
            Ok(Err(e)) => {
                tracing::warn!("{} analysis failed: {}", analysis_type, e);
                AnalysisOutcome::from(Err::<AnalysisResult, _>(e))
            }
            Err(payload) => {
                let message = payload
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| payload.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "engine panicked".to_string());
                tracing::warn!("{} analysis panicked: {}", analysis_type, message);
                AnalysisOutcome::Failed {
                    error_kind: INTERNAL_ERROR_KIND.to_string(),
                    message,
                }
            }
        }
    }

    fn run(&self, analysis_type: AnalysisType, context: &RunContext<'_>) -> Result<AnalysisResult, AnalysisError> {
        tracing::debug!("Running {} analysis", analysis_type);
        let RunContext {
            history,
            benchmark,
            assumptions,
            ..
        } = *context;
        let ratios = |category: RatioCategory| {
            context
                .ratios
                .get_or_init(|| self.ratio_engine.analyze(history, benchmark, assumptions))
                .category_result(category)
        };

        match analysis_type {
            AnalysisType::Horizontal => Ok(self.trend_engine.horizontal(history)?.to_result()),
            AnalysisType::Vertical => Ok(self.trend_engine.vertical(history).to_result()),
            AnalysisType::Liquidity => Ok(ratios(RatioCategory::Liquidity)),
            AnalysisType::Profitability => Ok(ratios(RatioCategory::Profitability)),
            AnalysisType::Efficiency => Ok(ratios(RatioCategory::Efficiency)),
            AnalysisType::Leverage => Ok(ratios(RatioCategory::Leverage)),
            AnalysisType::ZScore => Ok(self.risk_engine.analyze(history, assumptions).to_result()),
            AnalysisType::Forecast => Ok(self.forecast_engine.forecast(history, assumptions)?.to_result()),
            AnalysisType::Valuation => Ok(self
                .valuation_engine
                .valuate(history, benchmark, assumptions)?
                .to_result()),
            AnalysisType::Benchmark => Ok(self.benchmark_engine.analyze(history, benchmark).to_result()),
        }
    }
}

impl Default for AnalysisOrchestrator {
    fn default() -> Self {
        Self::new(Arc::new(BenchmarkRepository::builtin()))
    }
}
