mod config;

use analysis_core::{AnalysisRequest, AnalysisType};
use analysis_orchestrator::AnalysisOrchestrator;
use anyhow::{Context, Result};
use clap::Parser;
use config::AnalyzerConfig;
use serde::Serialize;
use std::fs;
use std::io::{self, Read, Write};
use std::sync::Arc;

/// Analyze company financial statements: ratios, trends, bankruptcy risk,
/// forecasts, valuation and sector benchmarking.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// JSON request file; reads stdin when omitted or "-".
    input: Option<String>,

    /// Treat the input as an array of requests and analyze them in parallel.
    #[arg(long)]
    batch: bool,

    /// Comma-separated analysis types, overriding the ones in the request.
    #[arg(long, value_delimiter = ',')]
    analyses: Vec<AnalysisType>,

    /// Print compact JSON instead of pretty-printed output.
    #[arg(long)]
    compact: bool,

    /// List the sectors of the benchmark table and exit.
    #[arg(long)]
    list_sectors: bool,
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let json_logging = std::env::var("RUST_LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    // Logs go to stderr so stdout carries only the report
    if json_logging {
        tracing_subscriber::fmt()
            .json()
            .with_writer(io::stderr)
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
            )
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_writer(io::stderr)
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
            )
            .init();
    }

    let cli = Cli::parse();
    let config = AnalyzerConfig::from_env()?;
    let orchestrator = AnalysisOrchestrator::new(Arc::new(config.benchmark_repository()?));

    if cli.list_sectors {
        return write_output(&orchestrator.benchmarks().sectors(), cli.compact);
    }

    let input = read_input(cli.input.as_deref())?;
    let assumptions = config.provider()?;

    if cli.batch {
        let mut requests: Vec<AnalysisRequest> =
            serde_json::from_str(&input).context("Failed to parse batch of analysis requests")?;
        for request in &mut requests {
            override_analyses(request, &cli.analyses);
        }
        let reports = orchestrator.analyze_batch(&requests, assumptions.as_ref());
        write_output(&reports, cli.compact)
    } else {
        let mut request: AnalysisRequest =
            serde_json::from_str(&input).context("Failed to parse analysis request")?;
        override_analyses(&mut request, &cli.analyses);
        let report = orchestrator.analyze(&request, assumptions.as_ref());
        write_output(&report, cli.compact)
    }
}

fn read_input(path: Option<&str>) -> Result<String> {
    match path {
        None | Some("-") => {
            let mut input = String::new();
            io::stdin()
                .read_to_string(&mut input)
                .context("Failed to read request from stdin")?;
            Ok(input)
        }
        Some(path) => fs::read_to_string(path).with_context(|| format!("Failed to read request file {}", path)),
    }
}

fn override_analyses(request: &mut AnalysisRequest, analyses: &[AnalysisType]) {
    if !analyses.is_empty() {
        request.analyses = analyses.iter().copied().collect();
    }
}

fn write_output<T: Serialize>(value: &T, compact: bool) -> Result<()> {
    let mut stdout = io::stdout().lock();
    if compact {
        serde_json::to_writer(&mut stdout, value)?;
    } else {
        serde_json::to_writer_pretty(&mut stdout, value)?;
    }
    writeln!(stdout)?;
    Ok(())
}
