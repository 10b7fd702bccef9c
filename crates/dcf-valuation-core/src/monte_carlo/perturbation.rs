use rand::rngs::StdRng;
use rand::Rng;
use serde::{Deserialize, Serialize};
use statrs::distribution::{Normal, Triangular, Uniform};

use crate::error::ValuationError;
use crate::DcfResult;

/// Shape of the noise added around a base value.
///
/// All shapes are parameterised by the same standard deviation so that
/// switching shape changes the tails, not the spread.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistributionShape {
    #[default]
    Normal,
    /// Flat over `base ± sqrt(3)·σ`
    Uniform,
    /// Symmetric, peaked at the base, support `base ± sqrt(6)·σ`
    Triangular,
}

/// Inclusive bounds applied to every draw.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Clamp {
    pub min: f64,
    pub max: f64,
}

/// How one input is perturbed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PerturbationSpec {
    #[serde(default)]
    pub shape: DistributionShape,
    /// Standard deviation as a fraction of `|base|`
    pub relative_std_dev: f64,
    pub clamp: Clamp,
}

impl PerturbationSpec {
    pub fn new(relative_std_dev: f64, min: f64, max: f64) -> Self {
        PerturbationSpec {
            shape: DistributionShape::Normal,
            relative_std_dev,
            clamp: Clamp { min, max },
        }
    }

    /// Draw one perturbed value around `base` and clamp it.
    ///
    /// A zero spread (zero base or zero relative deviation) consumes no
    /// randomness and returns the clamped base.
    pub fn sample(&self, rng: &mut StdRng, base: f64) -> DcfResult<f64> {
        self.validate()?;
        if !base.is_finite() {
            return Err(ValuationError::InvalidInput {
                field: "base".into(),
                reason: format!("Base value must be finite, got {base}"),
            });
        }

        let std_dev = base.abs() * self.relative_std_dev;
        if std_dev == 0.0 {
            return Ok(base.clamp(self.clamp.min, self.clamp.max));
        }

        let raw = match self.shape {
            DistributionShape::Normal => {
                let n = Normal::new(base, std_dev).map_err(|e| invalid_distribution("Normal", e))?;
                rng.sample(n)
            }
            DistributionShape::Uniform => {
                let half = 3f64.sqrt() * std_dev;
                let u = Uniform::new(base - half, base + half)
                    .map_err(|e| invalid_distribution("Uniform", e))?;
                rng.sample(u)
            }
            DistributionShape::Triangular => {
                let half = 6f64.sqrt() * std_dev;
                let t = Triangular::new(base - half, base + half, base)
                    .map_err(|e| invalid_distribution("Triangular", e))?;
                rng.sample(t)
            }
        };
        Ok(raw.clamp(self.clamp.min, self.clamp.max))
    }

    fn validate(&self) -> DcfResult<()> {
        if !self.relative_std_dev.is_finite() || self.relative_std_dev < 0.0 {
            return Err(ValuationError::InvalidInput {
                field: "relative_std_dev".into(),
                reason: format!(
                    "Must be a non-negative number, got {}",
                    self.relative_std_dev
                ),
            });
        }
        if self.clamp.min.is_nan() || self.clamp.max.is_nan() || self.clamp.min > self.clamp.max {
            return Err(ValuationError::InvalidInput {
                field: "clamp".into(),
                reason: format!(
                    "Clamp minimum {} must not exceed maximum {}",
                    self.clamp.min, self.clamp.max
                ),
            });
        }
        Ok(())
    }
}

fn invalid_distribution(name: &str, e: impl std::fmt::Display) -> ValuationError {
    ValuationError::InvalidInput {
        field: "distribution".into(),
        reason: format!("Invalid {name} parameters: {e}"),
    }
}

/// Perturbation rules for the four uncertain inputs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PerturbationConfig {
    pub wacc: PerturbationSpec,
    pub terminal_growth: PerturbationSpec,
    /// Applied independently to every forecast year
    pub revenue_growth: PerturbationSpec,
    /// Applied independently to every forecast year
    pub ebitda_margin: PerturbationSpec,
}

impl Default for PerturbationConfig {
    fn default() -> Self {
        PerturbationConfig {
            wacc: PerturbationSpec::new(0.15, 0.05, 0.25),
            terminal_growth: PerturbationSpec::new(0.30, 0.0, 0.05),
            revenue_growth: PerturbationSpec::new(0.25, -0.5, 1.0),
            ebitda_margin: PerturbationSpec::new(0.15, 0.0, 0.6),
        }
    }
}
