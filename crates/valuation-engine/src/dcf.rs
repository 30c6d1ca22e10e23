use analysis_core::{check_discount, AnalysisError, Measure};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DcfParams {
    pub discount_rate: f64,
    pub terminal_growth: f64,
    /// Free cash flow growth over the explicit projection
    pub growth_rate: f64,
    pub years: u32,
}

impl DcfParams {
    pub fn validate(&self) -> Result<(), AnalysisError> {
        if !self.growth_rate.is_finite() {
            return Err(AnalysisError::InvalidData(format!(
                "DCF growth rate must be finite, got {}",
                self.growth_rate
            )));
        }
        check_discount(self.discount_rate, self.terminal_growth)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DcfValuation {
    pub params: DcfParams,
    pub base_fcf: f64,
    pub projected_fcf: Vec<f64>,
    pub present_values: Vec<f64>,
    pub terminal_value: f64,
    pub terminal_present_value: f64,
    pub enterprise_value: f64,
}

/// Discounted cash flow with a Gordon-growth terminal value.
///
/// FCF_t = base * (1 + g)^t for t in 1..=years, each discounted by (1 + r)^t.
/// The terminal value FCF_n * (1 + tg) / (r - tg) is discounted by (1 + r)^n.
pub fn dcf(base_fcf: f64, params: &DcfParams) -> Result<DcfValuation, AnalysisError> {
    params.validate()?;

    let r = params.discount_rate;
    let projected_fcf: Vec<f64> = (1..=params.years)
        .map(|t| base_fcf * (1.0 + params.growth_rate).powi(t as i32))
        .collect();
    let present_values: Vec<f64> = projected_fcf
        .iter()
        .zip(1..=params.years)
        .map(|(fcf, t)| fcf / (1.0 + r).powi(t as i32))
        .collect();

    let final_fcf = projected_fcf.last().copied().unwrap_or(base_fcf);
    let terminal_value = final_fcf * (1.0 + params.terminal_growth) / (r - params.terminal_growth);
    let terminal_present_value = terminal_value / (1.0 + r).powi(params.years as i32);
    let enterprise_value = present_values.iter().sum::<f64>() + terminal_present_value;

    Ok(DcfValuation {
        params: *params,
        base_fcf,
        projected_fcf,
        present_values,
        terminal_value,
        terminal_present_value,
        enterprise_value,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SensitivityCell {
    pub discount_rate: f64,
    pub growth_rate: f64,
    pub enterprise_value: Measure,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensitivityGrid {
    /// Row-major: discount rate outer, growth inner, both ascending
    pub cells: Vec<SensitivityCell>,
    pub low: Measure,
    pub high: Measure,
}

/// Recompute the DCF on a 3x3 grid of discount rate and growth, each shifted by +/- `step`.
///
/// Cells with an invalid discount assumption, or any cell when the base
/// cash flow is not positive, are `Undefined`.
pub fn sensitivity(base_fcf: f64, params: &DcfParams, step: f64) -> SensitivityGrid {
    let shifts = [-step, 0.0, step];
    let cells: Vec<SensitivityCell> = shifts
        .iter()
        .flat_map(|dr| shifts.iter().map(move |dg| (params.discount_rate + dr, params.growth_rate + dg)))
        .map(|(discount_rate, growth_rate)| {
            let shifted = DcfParams {
                discount_rate,
                growth_rate,
                ..*params
            };
            let enterprise_value = if base_fcf > 0.0 {
                dcf(base_fcf, &shifted)
                    .map(|v| Measure::new(v.enterprise_value))
                    .unwrap_or(Measure::Undefined)
            } else {
                Measure::Undefined
            };
            SensitivityCell {
                discount_rate,
                growth_rate,
                enterprise_value,
            }
        })
        .collect();

    let defined: Vec<f64> = cells.iter().filter_map(|c| c.enterprise_value.value()).collect();
    let (low, high) = if defined.is_empty() {
        (Measure::Undefined, Measure::Undefined)
    } else {
        (
            Measure::new(defined.iter().copied().fold(f64::INFINITY, f64::min)),
            Measure::new(defined.iter().copied().fold(f64::NEG_INFINITY, f64::max)),
        )
    };

    SensitivityGrid { cells, low, high }
}
