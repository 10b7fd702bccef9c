//! Monte Carlo uncertainty bands around the deterministic valuation.
//!
//! Draws are made in `f64` from a single seeded stream; each trial is then
//! valued with the same decimal projection and discounting code as the
//! deterministic path.

pub mod perturbation;
pub mod simulation;
pub mod statistics;
