//! Estimators that turn counts into conditional probabilities.

pub mod config;
pub mod rules;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::fitter::FitError;

pub use config::FitConfig;
pub use rules::NormalizationRule;

/// Parameter estimator used by a fit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Estimator {
    /// Observed relative frequencies.
    #[serde(rename = "mle")]
    MaximumLikelihood,
    /// Relative frequencies blended with a uniform prior of equivalent
    /// sample size `iss`.
    #[serde(rename = "bayes")]
    Bayesian,
}

impl Estimator {
    /// Short name, as accepted by `from_str`.
    pub fn name(&self) -> &'static str {
        match self {
            Self::MaximumLikelihood => "mle",
            Self::Bayesian => "bayes",
        }
    }
}

impl Default for Estimator {
    fn default() -> Self {
        Self::MaximumLikelihood
    }
}

impl FromStr for Estimator {
    type Err = FitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "mle" => Ok(Self::MaximumLikelihood),
            "bayes" => Ok(Self::Bayesian),
            _ => Err(FitError::UnknownEstimator(s.to_string())),
        }
    }
}

impl fmt::Display for Estimator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// What to do with a parent configuration that was never observed.
///
/// Maximum likelihood is undefined there (`0 / 0`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnobservedPolicy {
    /// Use the uniform distribution over the variable's levels.
    Uniform,
    /// Fail the fit with `UnobservedConfiguration`.
    Reject,
}

impl Default for UnobservedPolicy {
    fn default() -> Self {
        Self::Uniform
    }
}

impl UnobservedPolicy {
    /// Parse a policy name.
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "uniform" => Some(Self::Uniform),
            "reject" => Some(Self::Reject),
            _ => None,
        }
    }
}
