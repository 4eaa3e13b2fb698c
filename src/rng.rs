//! Random variates used by priors and proposals.
//!
//! Nested samplers hand every model a generic random number generator.
//! [`DNestRng`] adds the handful of draws that model code needs on top of
//! any [`rand::Rng`], most importantly [`DNestRng::randh`], the heavy-tailed
//! step scale used by all proposals in this crate.

use rand::Rng;
use rand_distr::{Exp1, StandardNormal};

/// Extension methods for drawing proposal variates from any [`Rng`].
pub trait DNestRng: Rng {
    /// Uniform draw from `[0, 1)`.
    fn rand(&mut self) -> f64 {
        self.random::<f64>()
    }

    /// Standard normal draw.
    fn randn(&mut self) -> f64 {
        self.sample(StandardNormal)
    }

    /// Heavy-tailed step size.
    ///
    /// Returns `10^(1.5 - 3|t|) * n` where `t` follows a Student-t
    /// distribution with two degrees of freedom and `n` is standard normal.
    /// Multiplied by the width of a prior this proposes jumps anywhere from
    /// tiny local moves to moves across the whole prior range.
    fn randh(&mut self) -> f64 {
        let a = self.randn();
        let e: f64 = self.sample(Exp1);
        let t = a / e.sqrt();
        let n = self.randn();
        10f64.powf(1.5 - 3. * t.abs()) * n
    }

    /// Uniform integer in `0..n`.
    ///
    /// Panics if `n` is zero.
    fn rand_int(&mut self, n: usize) -> usize {
        self.random_range(0..n)
    }
}

impl<R: Rng + ?Sized> DNestRng for R {}
