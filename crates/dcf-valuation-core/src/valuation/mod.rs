pub mod analysis;
pub mod dcf;
pub mod industry;
pub mod projection;
pub mod wacc;
