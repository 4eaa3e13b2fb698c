//! One-dimensional prior distributions with matching proposals.
//!
//! Every prior knows three things: how to draw a fresh value, how to
//! perturb an existing value (returning the log Hastings factor the sampler
//! needs), and how to evaluate its own log density.

use rand::Rng;
use thiserror::Error;

use crate::math::{normal_log_density, wrap};
use crate::rng::DNestRng;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PriorError {
    #[error("Bounds must be finite with lower < upper, got [{lower}, {upper}]")]
    InvalidBounds { lower: f64, upper: f64 },
    #[error("Log-uniform bounds must be positive, got [{lower}, {upper}]")]
    NonPositiveBounds { lower: f64, upper: f64 },
    #[error("Scale must be finite and positive, got {0}")]
    InvalidScale(f64),
    #[error("Location must be finite, got {0}")]
    InvalidLocation(f64),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Prior {
    /// Flat on `[lower, upper]`.
    Uniform { lower: f64, upper: f64 },
    /// Normal with mean `mu` and standard deviation `sigma`.
    Normal { mu: f64, sigma: f64 },
    /// Density proportional to `1/x` on `[lower, upper]`, both positive.
    ///
    /// Draws and proposals happen in log space, so values stay strictly
    /// positive.
    LogUniform { lower: f64, upper: f64 },
}

fn check_bounds(lower: f64, upper: f64) -> Result<(), PriorError> {
    if !lower.is_finite() || !upper.is_finite() || lower >= upper {
        return Err(PriorError::InvalidBounds { lower, upper });
    }
    Ok(())
}

impl Prior {
    pub fn uniform(lower: f64, upper: f64) -> Result<Self, PriorError> {
        let prior = Prior::Uniform { lower, upper };
        prior.validate()?;
        Ok(prior)
    }

    pub fn normal(mu: f64, sigma: f64) -> Result<Self, PriorError> {
        let prior = Prior::Normal { mu, sigma };
        prior.validate()?;
        Ok(prior)
    }

    pub fn log_uniform(lower: f64, upper: f64) -> Result<Self, PriorError> {
        let prior = Prior::LogUniform { lower, upper };
        prior.validate()?;
        Ok(prior)
    }

    /// Check the parameters of a prior, including one built directly from
    /// its variant fields.
    pub fn validate(&self) -> Result<(), PriorError> {
        match *self {
            Prior::Uniform { lower, upper } => check_bounds(lower, upper),
            Prior::Normal { mu, sigma } => {
                if !mu.is_finite() {
                    return Err(PriorError::InvalidLocation(mu));
                }
                if !sigma.is_finite() || sigma <= 0. {
                    return Err(PriorError::InvalidScale(sigma));
                }
                Ok(())
            }
            Prior::LogUniform { lower, upper } => {
                check_bounds(lower, upper)?;
                if lower <= 0. {
                    return Err(PriorError::NonPositiveBounds { lower, upper });
                }
                Ok(())
            }
        }
    }

    /// Draw a value from the prior.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        match *self {
            Prior::Uniform { lower, upper } => lower + (upper - lower) * rng.rand(),
            Prior::Normal { mu, sigma } => mu + sigma * rng.randn(),
            Prior::LogUniform { lower, upper } => {
                let (lo, hi) = (lower.ln(), upper.ln());
                (lo + (hi - lo) * rng.rand()).exp().clamp(lower, upper)
            }
        }
    }

    /// Propose a new value for `x` in place.
    ///
    /// Returns the log of the Hastings factor: the prior density ratio times
    /// the proposal asymmetry. Bounded priors use a symmetric wrapped step,
    /// so only the normal prior contributes a non-zero term.
    pub fn perturb<R: Rng + ?Sized>(&self, x: &mut f64, rng: &mut R) -> f64 {
        match *self {
            Prior::Uniform { lower, upper } => {
                *x += (upper - lower) * rng.randh();
                *x = wrap(*x, lower, upper);
                0.
            }
            Prior::Normal { mu, sigma } => {
                let before = -0.5 * ((*x - mu) / sigma).powi(2);
                *x += sigma * rng.randh();
                let after = -0.5 * ((*x - mu) / sigma).powi(2);
                after - before
            }
            Prior::LogUniform { lower, upper } => {
                // The log-space Jacobian cancels the 1/x density ratio.
                let (lo, hi) = (lower.ln(), upper.ln());
                let mut log_x = x.ln();
                log_x += (hi - lo) * rng.randh();
                *x = wrap(log_x, lo, hi).exp();
                // exp/ln rounding can land a hair outside the bounds
                *x = x.clamp(lower, upper);
                0.
            }
        }
    }

    /// Log density at `x`, `-inf` outside the support.
    pub fn log_density(&self, x: f64) -> f64 {
        if !self.contains(x) {
            return f64::NEG_INFINITY;
        }
        match *self {
            Prior::Uniform { lower, upper } => -(upper - lower).ln(),
            Prior::Normal { mu, sigma } => normal_log_density(x, mu, sigma),
            Prior::LogUniform { lower, upper } => -x.ln() - (upper.ln() - lower.ln()).ln(),
        }
    }

    pub fn contains(&self, x: f64) -> bool {
        match *self {
            Prior::Uniform { lower, upper } | Prior::LogUniform { lower, upper } => {
                (lower..=upper).contains(&x)
            }
            Prior::Normal { .. } => x.is_finite(),
        }
    }
}

/// Conditional distribution of a single observation given the parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Conditional {
    Normal { mu: f64, sigma: f64 },
    Uniform { lower: f64, upper: f64 },
}

impl Conditional {
    /// Draw a value. Invalid parameters give NaN.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        match *self {
            Conditional::Normal { mu, sigma } => {
                if sigma.is_nan() || sigma <= 0. {
                    return f64::NAN;
                }
                mu + sigma * rng.randn()
            }
            Conditional::Uniform { lower, upper } => {
                if lower.partial_cmp(&upper) != Some(std::cmp::Ordering::Less) {
                    return f64::NAN;
                }
                lower + (upper - lower) * rng.rand()
            }
        }
    }

    /// Log density of the observation. Invalid parameters give `-inf`.
    pub fn log_density(&self, value: f64) -> f64 {
        match *self {
            Conditional::Normal { mu, sigma } => {
                if sigma.is_nan() || sigma <= 0. {
                    return f64::NEG_INFINITY;
                }
                normal_log_density(value, mu, sigma)
            }
            Conditional::Uniform { lower, upper } => {
                if lower.partial_cmp(&upper) != Some(std::cmp::Ordering::Less)
                    || !(lower..=upper).contains(&value)
                {
                    return f64::NEG_INFINITY;
                }
                -(upper - lower).ln()
            }
        }
    }
}
