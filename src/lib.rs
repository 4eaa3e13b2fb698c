//! Statistical models for likelihood-based nested sampling.
//!
//! A sampler explores a model through the [`Model`] trait: draw a point
//! from the prior, perturb it in place, evaluate the log likelihood and
//! print the parameters. [`LinearRegression`] fits a straight line with
//! unknown noise; [`builder`] assembles arbitrary models from named nodes.

pub mod builder;
pub(crate) mod data;
pub(crate) mod linear;
pub mod loading;
pub(crate) mod math;
pub(crate) mod model;
pub(crate) mod prior;
pub(crate) mod rng;

pub use builder::{BuildError, BuiltModel, ModelBuilder};
pub use data::{DataError, Dataset};
pub use linear::{LinearPriors, LinearRegression, ModelError};
pub use math::{normal_log_density, wrap};
pub use model::Model;
pub use prior::{Conditional, Prior, PriorError};
pub use rng::DNestRng;
