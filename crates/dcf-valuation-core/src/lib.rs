pub mod error;
pub mod time_value;
pub mod types;

#[cfg(feature = "valuation")]
pub mod market_data;

#[cfg(feature = "valuation")]
pub mod valuation;

#[cfg(feature = "scenarios")]
pub mod scenarios;

#[cfg(feature = "monte_carlo")]
pub mod monte_carlo;

pub use error::ValuationError;
pub use types::*;

/// Standard result type for all valuation operations
pub type DcfResult<T> = Result<T, ValuationError>;
