//! Convergence-controlled summation of infinite series.
//!
//! A [`Series`] only knows how to produce its `n`-th term. The summation
//! routines here add terms until the stopping rule is met or the iteration
//! cap is reached. Reaching the cap is an error: the partial sum is
//! reported, never returned as if it had converged.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// An infinite series `Σ_{n≥0} term(n)`.
pub trait Series {
    /// The `n`-th term.
    fn term(&self, n: usize) -> f64;

    /// An upper bound on `|term(m)|` for every `m >= n`.
    ///
    /// The default is `|term(n)|`, which is only a bound for series whose
    /// terms never vanish before the tail is negligible.
    fn envelope(&self, n: usize) -> f64 {
        self.term(n).abs()
    }
}

/// Accumulation strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Summation {
    /// Plain left-to-right accumulation.
    #[default]
    Forward,
    /// Kahan compensated accumulation.
    Kahan,
}

/// When a sum is considered converged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoppingRule {
    /// Stop at the first increment with `|increment| <= tol`.
    #[default]
    Increment,
    /// Also require the series envelope to be below `tol`, so a term that
    /// happens to vanish does not end the sum early.
    Envelope,
}

/// Errors raised by the summation routines.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SeriesError {
    #[error("Series tolerance must lie in (0, 1), got {0}")]
    InvalidTolerance(f64),

    #[error("Series did not converge after {iterations} terms (partial sum: {partial_sum}, last increment: {last_increment:.2e})")]
    MaxIterationsReached {
        iterations: usize,
        partial_sum: f64,
        last_increment: f64,
    },
}

/// Result of a converged sum.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeriesSum {
    pub value: f64,
    /// Number of terms added.
    pub iterations: usize,
    /// The last term added, an estimate of the absolute error.
    pub last_increment: f64,
}

impl SeriesSum {
    /// A value known in closed form, with no terms summed.
    pub fn exact(value: f64) -> Self {
        Self {
            value,
            iterations: 0,
            last_increment: 0.0,
        }
    }
}

fn check_tolerance(tol: f64) -> Result<(), SeriesError> {
    if tol > 0.0 && tol < 1.0 {
        Ok(())
    } else {
        Err(SeriesError::InvalidTolerance(tol))
    }
}

fn converged<S: Series + ?Sized>(series: &S, n: usize, increment: f64, tol: f64, rule: StoppingRule) -> bool {
    if increment.abs() > tol {
        return false;
    }
    match rule {
        StoppingRule::Increment => true,
        StoppingRule::Envelope => series.envelope(n) <= tol,
    }
}

/// Sum `series` term by term.
pub fn sum_forward<S: Series + ?Sized>(
    series: &S,
    tol: f64,
    max_iterations: usize,
    rule: StoppingRule,
) -> Result<SeriesSum, SeriesError> {
    check_tolerance(tol)?;

    let mut total = 0.0;
    let mut last_increment = 0.0;
    for n in 0..max_iterations {
        let increment = series.term(n);
        total += increment;
        last_increment = increment;
        if converged(series, n, increment, tol, rule) {
            return Ok(SeriesSum {
                value: total,
                iterations: n + 1,
                last_increment,
            });
        }
    }

    Err(SeriesError::MaxIterationsReached {
        iterations: max_iterations,
        partial_sum: total,
        last_increment,
    })
}

/// Sum `series` with Kahan compensation.
pub fn sum_kahan<S: Series + ?Sized>(
    series: &S,
    tol: f64,
    max_iterations: usize,
    rule: StoppingRule,
) -> Result<SeriesSum, SeriesError> {
    check_tolerance(tol)?;

    let mut total = 0.0;
    let mut compensation = 0.0;
    let mut last_increment = 0.0;
    for n in 0..max_iterations {
        let increment = series.term(n);
        let y = increment - compensation;
        let t = total + y;
        compensation = (t - total) - y;
        total = t;
        last_increment = increment;
        if converged(series, n, increment, tol, rule) {
            return Ok(SeriesSum {
                value: total,
                iterations: n + 1,
                last_increment,
            });
        }
    }

    Err(SeriesError::MaxIterationsReached {
        iterations: max_iterations,
        partial_sum: total,
        last_increment,
    })
}

/// Dispatch on a [`Summation`] strategy.
pub fn sum<S: Series + ?Sized>(
    series: &S,
    summation: Summation,
    tol: f64,
    max_iterations: usize,
    rule: StoppingRule,
) -> Result<SeriesSum, SeriesError> {
    match summation {
        Summation::Forward => sum_forward(series, tol, max_iterations, rule),
        Summation::Kahan => sum_kahan(series, tol, max_iterations, rule),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    struct Geometric(f64);

    impl Series for Geometric {
        fn term(&self, n: usize) -> f64 {
            self.0.powi(n as i32)
        }
    }

    /// 1/2^n with the second term knocked out.
    struct Gapped;

    impl Series for Gapped {
        fn term(&self, n: usize) -> f64 {
            if n == 1 {
                0.0
            } else {
                0.5f64.powi(n as i32)
            }
        }

        fn envelope(&self, n: usize) -> f64 {
            0.5f64.powi(n as i32)
        }
    }

    /// One followed by ten thousand terms each below half an ulp of one.
    struct Tiny;

    impl Series for Tiny {
        fn term(&self, n: usize) -> f64 {
            match n {
                0 => 1.0,
                1..=10_000 => 1e-16,
                _ => 0.0,
            }
        }
    }

    #[test]
    fn test_geometric_series() {
        let s = sum_forward(&Geometric(0.5), 1e-12, 1000, StoppingRule::Envelope).unwrap();
        assert_relative_eq!(s.value, 2.0, epsilon = 1e-11);
        assert!(s.last_increment.abs() <= 1e-12);
        assert_eq!(s.iterations, 41);
    }

    #[test]
    fn test_envelope_ignores_vanishing_term() {
        let plain = sum_forward(&Gapped, 1e-3, 100, StoppingRule::Increment).unwrap();
        assert_eq!(plain.iterations, 2);
        assert_eq!(plain.value, 1.0);

        let guarded = sum_forward(&Gapped, 1e-3, 100, StoppingRule::Envelope).unwrap();
        assert!(guarded.iterations > 2);
        assert_relative_eq!(guarded.value, 1.5, epsilon = 2e-3);
    }

    #[test]
    fn test_kahan_keeps_small_terms() {
        let forward = sum_forward(&Tiny, 1e-20, 20_000, StoppingRule::Increment).unwrap();
        let kahan = sum_kahan(&Tiny, 1e-20, 20_000, StoppingRule::Increment).unwrap();
        assert_eq!(forward.value, 1.0);
        assert_relative_eq!(kahan.value, 1.0 + 1e-12, max_relative = 1e-15);
        assert_eq!(kahan.iterations, 10_002);
    }

    #[test]
    fn test_iteration_cap_is_an_error() {
        let err = sum(&Geometric(1.0), Summation::Kahan, 1e-8, 50, StoppingRule::Envelope).unwrap_err();
        assert_eq!(
            err,
            SeriesError::MaxIterationsReached {
                iterations: 50,
                partial_sum: 50.0,
                last_increment: 1.0,
            }
        );
    }

    #[test]
    fn test_tolerance_must_be_in_unit_interval() {
        for tol in [0.0, -1e-3, 1.0, f64::NAN] {
            assert!(matches!(
                sum_forward(&Geometric(0.5), tol, 10, StoppingRule::Increment),
                Err(SeriesError::InvalidTolerance(_))
            ));
        }
    }
}
