//! Fit configuration.
//!
//! ## Float Normalization for Deterministic Hashing
//!
//! `iss` is quantized to an integer before hashing (multiplied by 1e6 and
//! rounded to i64), so `params_hash` does not depend on float formatting.

use serde::{Deserialize, Serialize};

use super::{Estimator, NormalizationRule, UnobservedPolicy};
use crate::canonical::canonical_hash_hex;
use crate::fitter::FitError;

/// Quantization factor for float normalization.
const FLOAT_QUANTIZATION_FACTOR: f64 = 1_000_000.0;

/// Default imaginary sample size for the Bayesian estimator.
pub const DEFAULT_ISS: f64 = 10.0;

/// Parameters of a fit.
///
/// ## Parameters
///
/// - `estimator`: `mle` or `bayes`
/// - `iss`: prior equivalent sample size, used by `bayes` only
/// - `unobserved`: handling of parent configurations with no rows
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitConfig {
    /// Estimator to apply.
    pub estimator: Estimator,
    /// Imaginary sample size (must be finite and non-negative).
    pub iss: f64,
    /// Policy for unobserved parent configurations.
    pub unobserved: UnobservedPolicy,
}

/// Quantized parameters for deterministic hashing.
#[derive(Debug, Clone, Serialize)]
struct QuantizedFitParams {
    estimator: Estimator,
    iss: i64,
    unobserved: UnobservedPolicy,
}

impl FitConfig {
    /// Maximum-likelihood configuration.
    pub fn mle() -> Self {
        Self {
            estimator: Estimator::MaximumLikelihood,
            ..Self::default()
        }
    }

    /// Bayesian configuration with the given imaginary sample size.
    pub fn bayes(iss: f64) -> Self {
        Self {
            estimator: Estimator::Bayesian,
            iss,
            ..Self::default()
        }
    }

    /// Set the unobserved-configuration policy.
    pub fn with_unobserved(mut self, unobserved: UnobservedPolicy) -> Self {
        self.unobserved = unobserved;
        self
    }

    /// Build a configuration from an estimator name, as accepted on the
    /// command line.
    pub fn from_name(name: &str, iss: f64) -> Result<Self, FitError> {
        let estimator: Estimator = name.parse()?;
        Ok(Self {
            estimator,
            iss,
            ..Self::default()
        })
    }

    /// Check parameter ranges. `iss` is only checked for `bayes`.
    pub fn validate(&self) -> Result<(), FitError> {
        if self.estimator == Estimator::Bayesian && (!self.iss.is_finite() || self.iss < 0.0) {
            return Err(FitError::InvalidSampleSize(self.iss));
        }
        Ok(())
    }

    /// Resolve the normalization rule for a fit over `observations` rows.
    pub fn rule(&self, observations: usize) -> Result<NormalizationRule, FitError> {
        self.validate()?;
        Ok(match self.estimator {
            Estimator::MaximumLikelihood => NormalizationRule::MaximumLikelihood {
                unobserved: self.unobserved,
            },
            Estimator::Bayesian => NormalizationRule::Bayesian {
                iss: self.iss,
                observations,
                unobserved: self.unobserved,
            },
        })
    }

    /// Compute a hash of the fit parameters.
    ///
    /// Uses quantized float representation so equal configurations hash
    /// equally regardless of serialization settings.
    pub fn params_hash(&self) -> String {
        canonical_hash_hex(&QuantizedFitParams {
            estimator: self.estimator,
            iss: quantize_float(self.iss),
            unobserved: self.unobserved,
        })
    }
}

impl Default for FitConfig {
    fn default() -> Self {
        Self {
            estimator: Estimator::MaximumLikelihood,
            iss: DEFAULT_ISS,
            unobserved: UnobservedPolicy::Uniform,
        }
    }
}

/// Quantize a float to an i64 for deterministic hashing.
fn quantize_float(value: f64) -> i64 {
    (value * FLOAT_QUANTIZATION_FACTOR).round() as i64
}
