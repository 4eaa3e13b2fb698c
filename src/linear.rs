//! Straight line fit with unknown Gaussian noise.
//!
//! `y_i ~ Normal(m * x_i + b, sigma)` with independent priors on the slope
//! `m`, the intercept `b` and the noise scale `sigma`.

use std::f64::consts::PI;
use std::io::{self, Write};
use std::sync::Arc;

use rand::Rng;
use thiserror::Error;

use crate::data::Dataset;
use crate::math::residual_sum_of_squares;
use crate::model::Model;
use crate::prior::{Prior, PriorError};
use crate::rng::DNestRng;

/// Column labels, in print order.
pub const COLUMNS: [&str; 3] = ["m", "b", "sigma"];

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModelError {
    #[error("sigma must be finite and positive, got {0}")]
    NonPositiveSigma(f64),
    #[error("Parameter {name} must be finite, got {value}")]
    NonFinite { name: &'static str, value: f64 },
    #[error("Prior {0:?} for sigma allows non-positive values")]
    SigmaSupport(Prior),
    #[error("Invalid prior for {name}")]
    InvalidPrior {
        name: &'static str,
        #[source]
        source: PriorError,
    },
    #[error("Expected {expected} values, found {found}")]
    ColumnCount { expected: usize, found: usize },
    #[error("Invalid number {0:?}")]
    Parse(String),
}

/// Priors of the three parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearPriors {
    m: Prior,
    b: Prior,
    sigma: Prior,
}

impl Default for LinearPriors {
    fn default() -> Self {
        Self {
            m: Prior::Uniform {
                lower: -10.,
                upper: 10.,
            },
            b: Prior::Uniform {
                lower: -10.,
                upper: 10.,
            },
            sigma: Prior::LogUniform {
                lower: 1e-3,
                upper: 1e3,
            },
        }
    }
}

impl LinearPriors {
    /// The prior on `sigma` must only put mass on strictly positive values:
    /// either log-uniform or uniform with a positive lower bound.
    pub fn new(m: Prior, b: Prior, sigma: Prior) -> Result<Self, ModelError> {
        for (name, prior) in [("m", &m), ("b", &b), ("sigma", &sigma)] {
            prior
                .validate()
                .map_err(|source| ModelError::InvalidPrior { name, source })?;
        }
        match sigma {
            Prior::LogUniform { .. } => {}
            Prior::Uniform { lower, .. } if lower > 0. => {}
            _ => return Err(ModelError::SigmaSupport(sigma)),
        }
        Ok(Self { m, b, sigma })
    }

    pub fn m(&self) -> &Prior {
        &self.m
    }

    pub fn b(&self) -> &Prior {
        &self.b
    }

    pub fn sigma(&self) -> &Prior {
        &self.sigma
    }
}

#[derive(Debug, Clone)]
pub struct LinearRegression {
    m: f64,
    b: f64,
    sigma: f64,
    priors: LinearPriors,
    data: Arc<Dataset>,
}

impl LinearRegression {
    /// Create a model with default priors.
    ///
    /// The parameters start at `m = 0`, `b = 0`, `sigma = 1`. This is only a
    /// placeholder, call [`Model::from_prior`] before sampling.
    pub fn new(data: Arc<Dataset>) -> Self {
        Self::with_priors(data, LinearPriors::default())
    }

    pub fn with_priors(data: Arc<Dataset>, priors: LinearPriors) -> Self {
        Self {
            m: 0.,
            b: 0.,
            sigma: 1.,
            priors,
            data,
        }
    }

    /// Move the model to a specific point.
    pub fn with_parameters(mut self, m: f64, b: f64, sigma: f64) -> Result<Self, ModelError> {
        if !m.is_finite() {
            return Err(ModelError::NonFinite { name: "m", value: m });
        }
        if !b.is_finite() {
            return Err(ModelError::NonFinite { name: "b", value: b });
        }
        if !sigma.is_finite() || sigma <= 0. {
            return Err(ModelError::NonPositiveSigma(sigma));
        }
        self.m = m;
        self.b = b;
        self.sigma = sigma;
        Ok(self)
    }

    /// Parse a line written by [`Model::print`] back into `(m, b, sigma)`.
    pub fn parse_row(line: &str) -> Result<(f64, f64, f64), ModelError> {
        let values = line
            .split_whitespace()
            .map(|token| {
                token
                    .parse::<f64>()
                    .map_err(|_| ModelError::Parse(token.to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;
        match values[..] {
            [m, b, sigma] => Ok((m, b, sigma)),
            _ => Err(ModelError::ColumnCount {
                expected: COLUMNS.len(),
                found: values.len(),
            }),
        }
    }

    pub fn m(&self) -> f64 {
        self.m
    }

    pub fn b(&self) -> f64 {
        self.b
    }

    pub fn sigma(&self) -> f64 {
        self.sigma
    }

    pub fn priors(&self) -> &LinearPriors {
        &self.priors
    }

    pub fn data(&self) -> &Arc<Dataset> {
        &self.data
    }

    /// Sum of the prior log densities at the current point.
    pub fn log_prior(&self) -> f64 {
        self.priors.m.log_density(self.m)
            + self.priors.b.log_density(self.b)
            + self.priors.sigma.log_density(self.sigma)
    }
}

impl Model for LinearRegression {
    fn from_prior<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        self.m = self.priors.m.sample(rng);
        self.b = self.priors.b.sample(rng);
        self.sigma = self.priors.sigma.sample(rng);
    }

    fn perturb<R: Rng + ?Sized>(&mut self, rng: &mut R) -> f64 {
        match rng.rand_int(COLUMNS.len()) {
            0 => self.priors.m.perturb(&mut self.m, rng),
            1 => self.priors.b.perturb(&mut self.b, rng),
            _ => self.priors.sigma.perturb(&mut self.sigma, rng),
        }
    }

    fn log_likelihood(&self) -> f64 {
        let n = self.data.len() as f64;
        let rss = residual_sum_of_squares(self.data.x(), self.data.y(), self.m, self.b);
        -n * self.sigma.ln() - 0.5 * n * (2. * PI).ln() - rss / (2. * self.sigma * self.sigma)
    }

    fn print<W: Write + ?Sized>(&self, out: &mut W) -> io::Result<()> {
        write!(out, "{} {} {}", self.m, self.b, self.sigma)
    }

    fn description(&self) -> String {
        COLUMNS.join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use pretty_assertions::assert_eq;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn line_data() -> Arc<Dataset> {
        Arc::new(Dataset::new(vec![1., 2., 3.], vec![2., 4., 6.]).unwrap())
    }

    #[test]
    fn exact_fit_likelihood() {
        let model = LinearRegression::new(line_data())
            .with_parameters(2., 0., 1.)
            .unwrap();
        assert_relative_eq!(model.log_likelihood(), -1.5 * (2. * PI).ln());
        assert_relative_eq!(model.log_likelihood(), -2.756815599614018, epsilon = 1e-12);
    }

    #[test]
    fn likelihood_matches_pointwise_sum() {
        let model = LinearRegression::new(line_data())
            .with_parameters(1.3, -0.4, 0.7)
            .unwrap();
        let expected: f64 = model
            .data()
            .iter()
            .map(|(x, y)| crate::math::normal_log_density(y, 1.3 * x - 0.4, 0.7))
            .sum();
        assert_relative_eq!(model.log_likelihood(), expected, epsilon = 1e-12);
    }

    #[test]
    fn rejects_invalid_parameters() {
        let model = LinearRegression::new(line_data());
        assert_eq!(
            model.clone().with_parameters(1., 1., 0.).unwrap_err(),
            ModelError::NonPositiveSigma(0.)
        );
        assert!(model.clone().with_parameters(f64::NAN, 1., 1.).is_err());
        assert!(model.with_parameters(1., f64::INFINITY, 1.).is_err());
    }

    #[test]
    fn sigma_prior_must_be_positive() {
        let flat = Prior::uniform(-10., 10.).unwrap();
        assert!(LinearPriors::new(flat, flat, Prior::uniform(0., 10.).unwrap()).is_err());
        assert!(LinearPriors::new(flat, flat, Prior::normal(1., 1.).unwrap()).is_err());
        assert!(LinearPriors::new(flat, flat, Prior::uniform(0.1, 10.).unwrap()).is_ok());
    }

    #[test]
    fn rejects_unchecked_sigma_priors() {
        let flat = Prior::uniform(-10., 10.).unwrap();
        let zero_lower = Prior::LogUniform {
            lower: 0.,
            upper: 1.,
        };
        assert_eq!(
            LinearPriors::new(flat, flat, zero_lower),
            Err(ModelError::InvalidPrior {
                name: "sigma",
                source: PriorError::NonPositiveBounds {
                    lower: 0.,
                    upper: 1.
                },
            })
        );
        let empty = Prior::Uniform {
            lower: 1.,
            upper: 1.,
        };
        assert!(matches!(
            LinearPriors::new(flat, flat, empty),
            Err(ModelError::InvalidPrior { name: "sigma", .. })
        ));
        let bad_slope = Prior::Normal {
            mu: 0.,
            sigma: -1.,
        };
        assert!(matches!(
            LinearPriors::new(bad_slope, flat, Prior::log_uniform(0.1, 1.).unwrap()),
            Err(ModelError::InvalidPrior { name: "m", .. })
        ));
    }

    #[test]
    fn custom_uniform_sigma_prior_stays_positive() {
        let flat = Prior::uniform(-10., 10.).unwrap();
        let priors = LinearPriors::new(flat, flat, Prior::uniform(0.1, 10.).unwrap()).unwrap();
        let mut model = LinearRegression::with_priors(line_data(), priors);
        let mut rng = ChaCha8Rng::seed_from_u64(17);
        model.from_prior(&mut rng);
        for _ in 0..10_000 {
            model.perturb(&mut rng);
            assert!(model.sigma() >= 0.1 && model.sigma() <= 10.);
        }
    }

    #[test]
    fn description_is_fixed() {
        let fresh = LinearRegression::new(line_data());
        assert_eq!(fresh.description(), "m, b, sigma");

        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let mut moved = fresh.clone();
        moved.from_prior(&mut rng);
        moved.perturb(&mut rng);
        assert_eq!(moved.description(), fresh.description());
    }

    #[test]
    fn print_round_trip() -> anyhow::Result<()> {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let mut model = LinearRegression::new(line_data());
        model.from_prior(&mut rng);

        let mut out = Vec::new();
        model.print(&mut out)?;
        let line = String::from_utf8(out)?;
        assert_eq!(
            line.split_whitespace().count(),
            model.description().split(", ").count()
        );
        let (m, b, sigma) = LinearRegression::parse_row(&line)?;
        assert_eq!((m, b, sigma), (model.m(), model.b(), model.sigma()));
        Ok(())
    }

    #[test]
    fn parse_errors() {
        assert_eq!(
            LinearRegression::parse_row("1 2"),
            Err(ModelError::ColumnCount {
                expected: 3,
                found: 2
            })
        );
        assert_eq!(
            LinearRegression::parse_row("1 2 z"),
            Err(ModelError::Parse("z".to_string()))
        );
    }

    #[test]
    fn prior_support_after_moves() {
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let mut model = LinearRegression::new(line_data());
        model.from_prior(&mut rng);
        for _ in 0..10_000 {
            let log_h = model.perturb(&mut rng);
            assert_eq!(log_h, 0.);
            assert!(model.sigma() > 0.);
            assert!(model.log_prior().is_finite());
        }
    }
}
