//! Sector reference ratios and region adjustments.
//!
//! The repository is built once (built-in table or a JSON document) and then
//! only read. Engines receive it by reference; there is no process-wide table.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use crate::AnalysisError;

pub const DEFAULT_SECTOR: &str = "default";

/// Geographic scope of the comparison, each with a fixed benchmark multiplier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Region {
    #[default]
    Domestic,
    RegionalBloc,
    Continental,
    Global,
}

impl Region {
    pub fn multiplier(&self) -> f64 {
        match self {
            Region::Domestic => 1.0,
            Region::RegionalBloc => 1.05,
            Region::Continental => 0.95,
            Region::Global => 1.10,
        }
    }

    /// Parse an input region code. Unknown codes are `None`; callers decide the fallback.
    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim().to_lowercase().as_str() {
            "" | "domestic" | "local" => Some(Region::Domestic),
            "regional" | "regional_bloc" | "regional-bloc" => Some(Region::RegionalBloc),
            "continental" => Some(Region::Continental),
            "global" | "international" => Some(Region::Global),
            _ => None,
        }
    }

    /// Like `from_code`, falling back to `Domestic` with a warning.
    pub fn from_code_or_default(code: &str) -> Self {
        Self::from_code(code).unwrap_or_else(|| {
            tracing::warn!("Unknown region code '{}', using domestic benchmarks", code);
            Region::Domestic
        })
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Region::Domestic => write!(f, "Domestic"),
            Region::RegionalBloc => write!(f, "Regional Bloc"),
            Region::Continental => write!(f, "Continental"),
            Region::Global => write!(f, "Global"),
        }
    }
}

/// Reference values for one sector. Ratios are fractions (0.15 == 15%),
/// multiples are plain factors.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SectorBenchmark {
    pub current_ratio: f64,
    pub debt_to_equity: f64,
    pub roe: f64,
    pub gross_margin: f64,
    pub net_margin: f64,
    pub roa: f64,
    /// Valuation multiples
    pub price_to_earnings: f64,
    pub price_to_book: f64,
    pub price_to_sales: f64,
    pub ev_to_ebitda: f64,
}

impl SectorBenchmark {
    /// Every reference value scaled by `multiplier`.
    pub fn adjusted(&self, multiplier: f64) -> Self {
        Self {
            current_ratio: self.current_ratio * multiplier,
            debt_to_equity: self.debt_to_equity * multiplier,
            roe: self.roe * multiplier,
            gross_margin: self.gross_margin * multiplier,
            net_margin: self.net_margin * multiplier,
            roa: self.roa * multiplier,
            price_to_earnings: self.price_to_earnings * multiplier,
            price_to_book: self.price_to_book * multiplier,
            price_to_sales: self.price_to_sales * multiplier,
            ev_to_ebitda: self.ev_to_ebitda * multiplier,
        }
    }
}

/// Benchmark record after sector lookup and region adjustment.
#[derive(Debug, Clone, Serialize)]
pub struct ResolvedBenchmark {
    pub sector: String,
    /// True when the requested sector was unknown and the default record was used
    pub fallback: bool,
    pub region: Region,
    pub values: SectorBenchmark,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchmarkRepository {
    sectors: HashMap<String, SectorBenchmark>,
}

impl BenchmarkRepository {
    /// Built-in table covering the sectors offered by the input form.
    pub fn builtin() -> Self {
        let mut sectors = HashMap::new();
        sectors.insert(
            "technology".to_string(),
            SectorBenchmark {
                current_ratio: 2.5,
                debt_to_equity: 0.3,
                roe: 0.18,
                gross_margin: 0.60,
                net_margin: 0.15,
                roa: 0.10,
                price_to_earnings: 28.0,
                price_to_book: 6.0,
                price_to_sales: 5.0,
                ev_to_ebitda: 18.0,
            },
        );
        sectors.insert(
            "banking".to_string(),
            SectorBenchmark {
                current_ratio: 1.1,
                debt_to_equity: 8.0,
                roe: 0.12,
                gross_margin: 0.55,
                net_margin: 0.25,
                roa: 0.012,
                price_to_earnings: 12.0,
                price_to_book: 1.2,
                price_to_sales: 3.0,
                ev_to_ebitda: 10.0,
            },
        );
        sectors.insert(
            "energy".to_string(),
            SectorBenchmark {
                current_ratio: 1.4,
                debt_to_equity: 0.6,
                roe: 0.14,
                gross_margin: 0.35,
                net_margin: 0.10,
                roa: 0.07,
                price_to_earnings: 12.0,
                price_to_book: 1.8,
                price_to_sales: 1.2,
                ev_to_ebitda: 7.0,
            },
        );
        sectors.insert(
            "healthcare".to_string(),
            SectorBenchmark {
                current_ratio: 2.0,
                debt_to_equity: 0.5,
                roe: 0.16,
                gross_margin: 0.55,
                net_margin: 0.12,
                roa: 0.08,
                price_to_earnings: 22.0,
                price_to_book: 4.0,
                price_to_sales: 3.5,
                ev_to_ebitda: 15.0,
            },
        );
        sectors.insert(
            "retail".to_string(),
            SectorBenchmark {
                current_ratio: 1.3,
                debt_to_equity: 0.9,
                roe: 0.15,
                gross_margin: 0.30,
                net_margin: 0.04,
                roa: 0.06,
                price_to_earnings: 18.0,
                price_to_book: 3.0,
                price_to_sales: 0.8,
                ev_to_ebitda: 10.0,
            },
        );
        sectors.insert(DEFAULT_SECTOR.to_string(), Self::builtin_default());
        Self { sectors }
    }

    /// Load a table from JSON (`{"sectors": {"name": {...}}}`). A `default` record is required.
    pub fn from_json(json: &str) -> Result<Self, AnalysisError> {
        let parsed: BenchmarkRepository = serde_json::from_str(json)
            .map_err(|e| AnalysisError::InvalidData(format!("Benchmark table: {}", e)))?;
        let sectors: HashMap<String, SectorBenchmark> = parsed
            .sectors
            .into_iter()
            .map(|(name, values)| (name.trim().to_lowercase(), values))
            .collect();
        if !sectors.contains_key(DEFAULT_SECTOR) {
            return Err(AnalysisError::InvalidData(
                "Benchmark table must contain a 'default' sector".to_string(),
            ));
        }
        Ok(Self { sectors })
    }

    /// Builder used for test fixtures and custom tables.
    pub fn with_sector(mut self, name: &str, values: SectorBenchmark) -> Self {
        self.sectors.insert(name.trim().to_lowercase(), values);
        self
    }

    pub fn sectors(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.sectors.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }

    pub fn lookup(&self, sector: &str) -> Result<&SectorBenchmark, AnalysisError> {
        self.sectors
            .get(&sector.trim().to_lowercase())
            .ok_or_else(|| AnalysisError::UnknownSector(sector.to_string()))
    }

    /// Sector lookup with region adjustment. Unknown sectors recover to the default record.
    pub fn resolve(&self, sector: &str, region: Region) -> ResolvedBenchmark {
        let (name, values, fallback) = match self.lookup(sector) {
            Ok(values) => (sector.trim().to_lowercase(), *values, false),
            Err(e) => {
                tracing::warn!("{}, falling back to default benchmarks", e);
                let values = self
                    .sectors
                    .get(DEFAULT_SECTOR)
                    .copied()
                    .unwrap_or_else(Self::builtin_default);
                (DEFAULT_SECTOR.to_string(), values, true)
            }
        };
        ResolvedBenchmark {
            sector: name,
            fallback,
            region,
            values: values.adjusted(region.multiplier()),
        }
    }

    fn builtin_default() -> SectorBenchmark {
        SectorBenchmark {
            current_ratio: 1.5,
            debt_to_equity: 1.0,
            roe: 0.12,
            gross_margin: 0.35,
            net_margin: 0.08,
            roa: 0.06,
            price_to_earnings: 15.0,
            price_to_book: 2.0,
            price_to_sales: 1.5,
            ev_to_ebitda: 10.0,
        }
    }
}

impl Default for BenchmarkRepository {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_region_multipliers() {
        assert_eq!(Region::from_code("global"), Some(Region::Global));
        assert_eq!(Region::from_code(""), Some(Region::Domestic));
        assert_eq!(Region::from_code("mars"), None);
        assert_eq!(Region::from_code_or_default("mars"), Region::Domestic);
        assert_relative_eq!(Region::RegionalBloc.multiplier(), 1.05);
    }

    #[test]
    fn test_resolve_applies_region_adjustment() {
        let repo = BenchmarkRepository::builtin();
        let resolved = repo.resolve("Technology", Region::Global);
        assert!(!resolved.fallback);
        assert_eq!(resolved.sector, "technology");
        assert_relative_eq!(resolved.values.roe, 0.18 * 1.10, epsilon = 1e-12);
    }

    #[test]
    fn test_unknown_sector_falls_back() {
        let repo = BenchmarkRepository::builtin();
        assert!(matches!(repo.lookup("shipping"), Err(AnalysisError::UnknownSector(_))));
        let resolved = repo.resolve("shipping", Region::Domestic);
        assert!(resolved.fallback);
        assert_eq!(resolved.sector, DEFAULT_SECTOR);
    }

    #[test]
    fn test_from_json_requires_default() {
        let json = r#"{"sectors": {"mining": {"current_ratio": 1.0, "debt_to_equity": 1.0, "roe": 0.1,
            "gross_margin": 0.3, "net_margin": 0.1, "roa": 0.05, "price_to_earnings": 10.0,
            "price_to_book": 1.0, "price_to_sales": 1.0, "ev_to_ebitda": 6.0}}}"#;
        assert!(BenchmarkRepository::from_json(json).is_err());

        let with_default = json.replace("\"mining\"", "\"Default\"");
        let repo = BenchmarkRepository::from_json(&with_default).unwrap();
        assert_eq!(repo.sectors(), vec!["default"]);
    }
}
