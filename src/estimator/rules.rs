//! Per-configuration normalization rules.
//!
//! A rule maps one block of counts (every level of the variable under a
//! fixed parent configuration, block sum `S`) to probabilities:
//!
//! - Maximum likelihood: `v / S`
//! - Bayesian: `prior * iss/(iss+n) + (v/S) * n/(iss+n)`, `prior = 1/m`,
//!   where `n` is the number of rows in the whole fit
//!
//! ## Unobserved Configurations (`S = 0`)
//!
//! Maximum likelihood defers to [`UnobservedPolicy`]. The Bayesian blend has
//! no empirical term to use, so the block is the prior alone; with `iss = 0`
//! the prior carries no weight either and the maximum-likelihood policy
//! applies, which keeps `bayes` at `iss = 0` identical to `mle`.

use super::UnobservedPolicy;

/// A normalization rule, resolved for one fit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NormalizationRule {
    /// Relative frequencies.
    MaximumLikelihood {
        /// Handling of `S = 0`.
        unobserved: UnobservedPolicy,
    },
    /// Relative frequencies smoothed toward the uniform distribution.
    Bayesian {
        /// Imaginary (equivalent) sample size of the prior.
        iss: f64,
        /// Number of observation rows in the fit.
        observations: usize,
        /// Handling of `S = 0` when `iss = 0`.
        unobserved: UnobservedPolicy,
    },
}

impl NormalizationRule {
    /// Normalize one block of counts.
    ///
    /// Returns `None` when the block is unobserved and the policy rejects it.
    pub fn normalize_block(&self, counts: &[u64]) -> Option<Vec<f64>> {
        let sum: u64 = counts.iter().sum();
        let m = counts.len();

        match *self {
            Self::MaximumLikelihood { unobserved } => {
                if sum == 0 {
                    return unobserved_block(unobserved, m);
                }
                let s = sum as f64;
                Some(counts.iter().map(|&v| v as f64 / s).collect())
            }
            Self::Bayesian { iss, observations, unobserved } => {
                if sum == 0 {
                    if iss == 0.0 {
                        return unobserved_block(unobserved, m);
                    }
                    return Some(uniform(m));
                }

                let n = observations as f64;
                let total = iss + n;
                let (prior_weight, data_weight) = if total > 0.0 {
                    (iss / total, n / total)
                } else {
                    (0.0, 1.0)
                };
                let prior = 1.0 / m as f64;
                let s = sum as f64;
                Some(
                    counts
                        .iter()
                        .map(|&v| prior * prior_weight + (v as f64 / s) * data_weight)
                        .collect(),
                )
            }
        }
    }
}

fn unobserved_block(policy: UnobservedPolicy, m: usize) -> Option<Vec<f64>> {
    match policy {
        UnobservedPolicy::Uniform => Some(uniform(m)),
        UnobservedPolicy::Reject => None,
    }
}

fn uniform(m: usize) -> Vec<f64> {
    vec![1.0 / m as f64; m]
}
