use analysis_core::{AssumptionProvider, BenchmarkRepository, SeededScenario, StaticAssumptions};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::str::FromStr;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyzerConfig {
    pub assumptions: StaticAssumptions,
    /// Seed for reproducible forecast growth shocks; unset means no shocks
    pub scenario_seed: Option<u64>,
    pub scenario_volatility: f64,
    /// JSON benchmark table; unset uses the built-in table
    pub benchmarks_path: Option<String>,
}

impl AnalyzerConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let config = Self {
            assumptions: StaticAssumptions {
                non_liquid_fraction: parse_or(&get, "ANALYSIS_NON_LIQUID_FRACTION", 0.30)?,
                retained_earnings_fraction: parse_or(&get, "ANALYSIS_RETAINED_EARNINGS_FRACTION", 0.70)?,
                depreciation_fraction: parse_or(&get, "ANALYSIS_DEPRECIATION_FRACTION", 0.05)?,
                discount_rate: parse_or(&get, "ANALYSIS_DISCOUNT_RATE", 0.10)?,
                terminal_growth: parse_or(&get, "ANALYSIS_TERMINAL_GROWTH", 0.03)?,
                dcf_growth: parse_opt(&get, "ANALYSIS_DCF_GROWTH")?,
            },
            scenario_seed: parse_opt(&get, "ANALYSIS_SCENARIO_SEED")?,
            scenario_volatility: parse_or(&get, "ANALYSIS_SCENARIO_VOLATILITY", 0.02)?,
            benchmarks_path: get("BENCHMARKS_PATH").filter(|p| !p.trim().is_empty()),
        };

        config.assumptions.validate().context("Invalid analysis assumptions")?;
        Ok(config)
    }

    /// Static assumptions, wrapped in a seeded scenario when a seed is configured.
    pub fn provider(&self) -> Result<Box<dyn AssumptionProvider>> {
        match self.scenario_seed {
            Some(seed) => {
                tracing::info!(
                    "Using seeded growth scenario (seed {}, volatility {})",
                    seed,
                    self.scenario_volatility
                );
                let scenario = SeededScenario::new(self.assumptions, seed, self.scenario_volatility)
                    .context("Invalid scenario settings")?;
                Ok(Box::new(scenario))
            }
            None => Ok(Box::new(self.assumptions)),
        }
    }

    pub fn benchmark_repository(&self) -> Result<BenchmarkRepository> {
        match &self.benchmarks_path {
            Some(path) => {
                let json = fs::read_to_string(path)
                    .with_context(|| format!("Failed to read benchmark table {}", path))?;
                let repository = BenchmarkRepository::from_json(&json)
                    .with_context(|| format!("Failed to load benchmark table {}", path))?;
                tracing::info!("Loaded {} benchmark sectors from {}", repository.sectors().len(), path);
                Ok(repository)
            }
            None => Ok(BenchmarkRepository::builtin()),
        }
    }
}

fn parse_or<T>(get: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    Ok(parse_opt(get, key)?.unwrap_or(default))
}

fn parse_opt<T>(get: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    get(key)
        .filter(|v| !v.trim().is_empty())
        .map(|v| v.trim().parse::<T>().with_context(|| format!("{} has an invalid value '{}'", key, v)))
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<AnalyzerConfig> {
        let vars: HashMap<String, String> = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        AnalyzerConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config(&[]).unwrap();
        assert_eq!(config.assumptions, StaticAssumptions::default());
        assert_eq!(config.scenario_seed, None);
        assert_eq!(config.scenario_volatility, 0.02);
        assert!(config.benchmarks_path.is_none());
    }

    #[test]
    fn test_overrides_and_scenario() {
        let config = config(&[
            ("ANALYSIS_DISCOUNT_RATE", "0.12"),
            ("ANALYSIS_DCF_GROWTH", "0.04"),
            ("ANALYSIS_SCENARIO_SEED", "7"),
        ])
        .unwrap();
        assert_eq!(config.assumptions.discount_rate, 0.12);
        assert_eq!(config.assumptions.dcf_growth, Some(0.04));

        let provider = config.provider().unwrap();
        assert_eq!(provider.discount_rate(), 0.12);
        assert_eq!(provider.growth_shock("linear_trend", 1), provider.growth_shock("linear_trend", 1));
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(config(&[("ANALYSIS_DISCOUNT_RATE", "ten percent")]).is_err());
        assert!(config(&[("ANALYSIS_DISCOUNT_RATE", "0.03")]).is_err());
        assert!(config(&[("ANALYSIS_DISCOUNT_RATE", "NaN")]).is_err());
        assert!(config(&[("ANALYSIS_TERMINAL_GROWTH", "inf")]).is_err());
        assert!(config(&[("ANALYSIS_NON_LIQUID_FRACTION", "1.5")]).is_err());
        assert!(config(&[("ANALYSIS_SCENARIO_SEED", "1"), ("ANALYSIS_SCENARIO_VOLATILITY", "-0.1")])
            .unwrap()
            .provider()
            .is_err());
    }

    #[test]
    fn test_missing_benchmark_file_is_reported() {
        let config = config(&[("BENCHMARKS_PATH", "/nonexistent/benchmarks.json")]).unwrap();
        let err = config.benchmark_repository().unwrap_err();
        assert!(err.to_string().contains("/nonexistent/benchmarks.json"));
    }
}
