use std::f64::consts::PI;

use itertools::izip;
use multiversion::multiversion;

/// Fold `x` periodically into `[lo, hi)`.
///
/// Proposals that step out of a bounded prior re-enter from the other side,
/// which keeps the move symmetric.
#[inline]
pub fn wrap(x: f64, lo: f64, hi: f64) -> f64 {
    let width = hi - lo;
    let folded = (x - lo).rem_euclid(width) + lo;
    // rem_euclid can round up to exactly `width` for tiny negative inputs
    if folded >= hi {
        lo
    } else {
        folded
    }
}

/// Log density of a normal distribution at `x`.
#[inline]
pub fn normal_log_density(x: f64, mu: f64, sigma: f64) -> f64 {
    let z = (x - mu) / sigma;
    -0.5 * (2. * PI).ln() - sigma.ln() - 0.5 * z * z
}

/// `sum((y_i - m * x_i - b)^2)`
#[multiversion(targets("x86_64+avx+avx2+fma", "x86_64+avx", "x86+sse"))]
pub(crate) fn residual_sum_of_squares(x: &[f64], y: &[f64], m: f64, b: f64) -> f64 {
    assert!(x.len() == y.len());

    izip!(x, y)
        .map(|(&x, &y)| {
            let r = y - m * x - b;
            r * r
        })
        .sum()
}
