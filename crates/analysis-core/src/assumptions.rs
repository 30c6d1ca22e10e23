//! Assumption providers: fixed values, and a seeded scenario that perturbs
//! forecast growth reproducibly.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::{AnalysisError, AssumptionProvider};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StaticAssumptions {
    pub non_liquid_fraction: f64,
    pub retained_earnings_fraction: f64,
    pub depreciation_fraction: f64,
    pub discount_rate: f64,
    pub terminal_growth: f64,
    #[serde(default)]
    pub dcf_growth: Option<f64>,
}

impl StaticAssumptions {
    pub fn validate(&self) -> Result<(), AnalysisError> {
        let fractions = [
            ("non_liquid_fraction", self.non_liquid_fraction),
            ("retained_earnings_fraction", self.retained_earnings_fraction),
            ("depreciation_fraction", self.depreciation_fraction),
        ];
        for (name, value) in fractions {
            if !(0.0..1.0).contains(&value) {
                return Err(AnalysisError::InvalidData(format!(
                    "{} must be within [0, 1), got {}",
                    name, value
                )));
            }
        }
        if let Some(growth) = self.dcf_growth {
            if !growth.is_finite() {
                return Err(AnalysisError::InvalidData(format!(
                    "dcf_growth must be finite, got {}",
                    growth
                )));
            }
        }
        check_discount(self.discount_rate, self.terminal_growth)
    }
}

/// Discount rate and terminal growth must both be finite, with the rate
/// strictly above the growth.
pub fn check_discount(discount_rate: f64, terminal_growth: f64) -> Result<(), AnalysisError> {
    if !discount_rate.is_finite() || !terminal_growth.is_finite() || discount_rate <= terminal_growth {
        return Err(AnalysisError::InvalidDiscountAssumption {
            discount_rate,
            terminal_growth,
        });
    }
    Ok(())
}

impl Default for StaticAssumptions {
    fn default() -> Self {
        Self {
            non_liquid_fraction: 0.30,
            retained_earnings_fraction: 0.70,
            depreciation_fraction: 0.05,
            discount_rate: 0.10,
            terminal_growth: 0.03,
            dcf_growth: None,
        }
    }
}

impl AssumptionProvider for StaticAssumptions {
    fn non_liquid_fraction(&self) -> f64 {
        self.non_liquid_fraction
    }

    fn retained_earnings_fraction(&self) -> f64 {
        self.retained_earnings_fraction
    }

    fn depreciation_fraction(&self) -> f64 {
        self.depreciation_fraction
    }

    fn discount_rate(&self) -> f64 {
        self.discount_rate
    }

    fn terminal_growth(&self) -> f64 {
        self.terminal_growth
    }

    fn dcf_growth(&self) -> Option<f64> {
        self.dcf_growth
    }
}

/// Static assumptions plus reproducible growth shocks.
///
/// Each (model, horizon) pair draws from its own `StdRng` seeded from the
/// scenario seed, so the shock does not depend on call order and identical
/// seeds always give identical forecasts.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeededScenario {
    pub base: StaticAssumptions,
    pub seed: u64,
    /// Shocks are uniform in [-volatility, volatility]
    pub volatility: f64,
}

impl SeededScenario {
    pub fn new(base: StaticAssumptions, seed: u64, volatility: f64) -> Result<Self, AnalysisError> {
        if !volatility.is_finite() || volatility < 0.0 {
            return Err(AnalysisError::InvalidData(format!(
                "Scenario volatility must be a non-negative number, got {}",
                volatility
            )));
        }
        Ok(Self { base, seed, volatility })
    }

    fn stream_seed(&self, model: &str, horizon: u32) -> u64 {
        // FNV-1a over the model name; stable across builds unlike std's hasher
        let name_hash = model.bytes().fold(0xcbf2_9ce4_8422_2325_u64, |hash, byte| {
            (hash ^ byte as u64).wrapping_mul(0x0100_0000_01b3)
        });
        self.seed ^ name_hash ^ (horizon as u64).wrapping_mul(0x9e37_79b9_7f4a_7c15)
    }
}

impl AssumptionProvider for SeededScenario {
    fn non_liquid_fraction(&self) -> f64 {
        self.base.non_liquid_fraction
    }

    fn retained_earnings_fraction(&self) -> f64 {
        self.base.retained_earnings_fraction
    }

    fn depreciation_fraction(&self) -> f64 {
        self.base.depreciation_fraction
    }

    fn discount_rate(&self) -> f64 {
        self.base.discount_rate
    }

    fn terminal_growth(&self) -> f64 {
        self.base.terminal_growth
    }

    fn dcf_growth(&self) -> Option<f64> {
        self.base.dcf_growth
    }

    fn growth_shock(&self, model: &str, horizon: u32) -> f64 {
        if self.volatility == 0.0 {
            return 0.0;
        }
        let mut rng = StdRng::seed_from_u64(self.stream_seed(model, horizon));
        rng.gen_range(-self.volatility..=self.volatility)
    }
}
