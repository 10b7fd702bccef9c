use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ValuationError {
    #[error("Invalid input for {field}: {reason}")]
    InvalidInput { field: String, reason: String },

    #[error("Invalid capital structure: {0}")]
    InvalidCapitalStructure(String),

    #[error("Invalid terminal condition: WACC ({wacc}) must exceed terminal growth rate ({terminal_growth})")]
    InvalidTerminalCondition {
        wacc: Decimal,
        terminal_growth: Decimal,
    },

    #[error("Shares outstanding must be positive, got {0}")]
    ZeroOrNegativeShareCount(Decimal),

    #[error("Degenerate simulation: {valid} of {trials} trials were valid and {retained} survived outlier removal")]
    DegenerateSimulation {
        trials: u32,
        valid: u32,
        retained: u32,
    },

    #[error("Division by zero in {context}")]
    DivisionByZero { context: String },

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl From<serde_json::Error> for ValuationError {
    fn from(e: serde_json::Error) -> Self {
        ValuationError::SerializationError(e.to_string())
    }
}
