use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// All monetary values. Wraps Decimal to prevent accidental f64 usage.
pub type Money = Decimal;

/// Rates expressed as decimals (0.05 = 5%). Never as percentages.
pub type Rate = Decimal;

/// Reporting currency
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Currency {
    INR,
    #[default]
    USD,
    GBP,
    EUR,
    Other(String),
}

impl Currency {
    pub fn symbol(&self) -> &str {
        match self {
            Currency::INR => "₹",
            Currency::USD => "$",
            Currency::GBP => "£",
            Currency::EUR => "€",
            Currency::Other(code) => code.as_str(),
        }
    }
}

/// Standard computation output envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationOutput<T: Serialize> {
    pub result: T,
    pub methodology: String,
    pub assumptions: serde_json::Value,
    pub warnings: Vec<String>,
    pub metadata: ComputationMetadata,
}

/// Metadata for every computation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationMetadata {
    pub version: String,
    pub computation_time_us: u64,
    pub precision: String,
}

/// Numeric representation a computation was carried out in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Precision {
    Decimal128,
    Float64,
}

impl Precision {
    fn label(self) -> &'static str {
        match self {
            Precision::Decimal128 => "rust_decimal_128bit",
            Precision::Float64 => "ieee754_f64",
        }
    }
}

/// Helper to wrap computation results with metadata
pub fn with_metadata<T: Serialize>(
    methodology: &str,
    assumptions: &impl Serialize,
    warnings: Vec<String>,
    elapsed_us: u64,
    result: T,
) -> ComputationOutput<T> {
    with_precision(
        Precision::Decimal128,
        methodology,
        assumptions,
        warnings,
        elapsed_us,
        result,
    )
}

/// Same as [`with_metadata`] but records the numeric precision explicitly.
pub fn with_precision<T: Serialize>(
    precision: Precision,
    methodology: &str,
    assumptions: &impl Serialize,
    warnings: Vec<String>,
    elapsed_us: u64,
    result: T,
) -> ComputationOutput<T> {
    ComputationOutput {
        result,
        methodology: methodology.to_string(),
        assumptions: serde_json::to_value(assumptions).unwrap_or_default(),
        warnings,
        metadata: ComputationMetadata {
            version: env!("CARGO_PKG_VERSION").to_string(),
            computation_time_us: elapsed_us,
            precision: precision.label().to_string(),
        },
    }
}
