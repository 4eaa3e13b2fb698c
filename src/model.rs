//! Core abstraction for models driven by a nested sampler.
//!
//! Provides the `Model` trait: the contract between a user supplied
//! statistical model and the engine that explores it.

use std::io::{self, Write};

use rand::Rng;

/// A point in parameter space together with a fixed dataset.
///
/// The sampler owns one instance per particle. It calls
/// [`Model::from_prior`] once to get a valid starting point and then
/// repeatedly clones an instance, calls [`Model::perturb`] on the clone and
/// decides with [`Model::log_likelihood`] whether to keep it.
///
/// The trait is thread-safe so particles can be driven in parallel; any
/// data shared between instances must be immutable.
pub trait Model: Clone + Send + Sync {
    /// Overwrite every parameter with a draw from the prior.
    fn from_prior<R: Rng + ?Sized>(&mut self, rng: &mut R);

    /// Propose a change to the parameters in place.
    ///
    /// Returns the log of the Metropolis-Hastings factor for the move: the
    /// ratio of prior densities times the proposal asymmetry. The sampler
    /// adds this to its own acceptance test.
    fn perturb<R: Rng + ?Sized>(&mut self, rng: &mut R) -> f64;

    /// Log likelihood of the dataset at the current parameters.
    fn log_likelihood(&self) -> f64;

    /// Write the parameter values, space separated, in the order given by
    /// [`Model::description`].
    fn print<W: Write + ?Sized>(&self, out: &mut W) -> io::Result<()>;

    /// Comma separated column labels for the values written by
    /// [`Model::print`].
    fn description(&self) -> String;
}
