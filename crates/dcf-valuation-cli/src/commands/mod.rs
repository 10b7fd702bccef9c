pub mod industry;
pub mod market_data;
pub mod monte_carlo;
pub mod scenarios;
pub mod valuation;
