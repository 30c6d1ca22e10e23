use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnalysisError {
    #[error("Insufficient history for {analysis}: requires at least {required} years, got {actual}")]
    InsufficientHistory {
        analysis: &'static str,
        required: usize,
        actual: usize,
    },

    #[error("Division undefined: {0}")]
    DivisionUndefined(String),

    #[error("Invalid discount assumption: discount rate {discount_rate} must exceed terminal growth {terminal_growth}")]
    InvalidDiscountAssumption {
        discount_rate: f64,
        terminal_growth: f64,
    },

    #[error("Unknown sector: {0}")]
    UnknownSector(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),
}

impl AnalysisError {
    /// Stable machine-readable tag, used in failed report slots.
    pub fn kind(&self) -> &'static str {
        match self {
            AnalysisError::InsufficientHistory { .. } => "insufficient_history",
            AnalysisError::DivisionUndefined(_) => "division_undefined",
            AnalysisError::InvalidDiscountAssumption { .. } => "invalid_discount_assumption",
            AnalysisError::UnknownSector(_) => "unknown_sector",
            AnalysisError::InvalidData(_) => "invalid_data",
        }
    }
}
