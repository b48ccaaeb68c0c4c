//! One-dimensional series solutions for constant conditions.
//!
//! [`SeriesTermSolver`] evaluates the Fourier-series solution of the 1D heat
//! equation on `[0, l]` with Dirichlet ends for one [`TermKind`]:
//!
//! | kind | series (`s = x/l`, `τ = αt/l²`) |
//! |------|-------------------------------|
//! | initial, uniform | $a\,\frac{4}{\pi}\sum_{k\ \mathrm{odd}} \frac{\sin(k\pi s)}{k} e^{-k^2\pi^2\tau}$ |
//! | initial, linear / exponential | $a\sum_{m\ge1} B_m \sin(m\pi s) e^{-m^2\pi^2\tau}$ |
//! | boundary | $\frac{1}{d}\frac{2}{\pi}\sum_{m\ge1} \frac{(-1)^m a_2 - a_1}{m}\sin(m\pi s) e^{-m^2\pi^2\tau}$ |
//! | source | $-\frac{4 a_0 l^2}{\alpha\pi^3}\sum_{k\ \mathrm{odd}} \frac{\sin(k\pi s)}{k^3} e^{-k^2\pi^2\tau}$ |
//!
//! Boundary and source series are the transient part of the solution; the
//! time-independent part comes from
//! [`steady_state_dirichlet`](SeriesTermSolver::steady_state_dirichlet).

use std::f64::consts::PI;

use heat_geometry::Axis;

use crate::conditions::{AxisBoundary, Profile};
use crate::series::{self, Series, SeriesError, SeriesSum, StoppingRule, Summation};
use crate::solver::SolverError;
use crate::types::{BoundaryType, TermKind};

/// Relative distance from an end below which a position counts as the end.
pub const EDGE_TOLERANCE: f64 = 1e-9;

/// Below this value of `αt/l²` the series is replaced by its `t → 0` limit.
pub const VANISHING_DIFFUSION_TIME: f64 = 1e-9;

/// Default cap on the number of terms per sum.
pub const DEFAULT_MAX_ITERATIONS: usize = 100_000;

/// Physical parameters feeding a series.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TermParameters {
    /// Initial magnitude or source rate.
    pub a0: f64,
    /// Value at the lower end.
    pub a1: f64,
    /// Value at the upper end.
    pub a2: f64,
    pub k1: Option<f64>,
    pub k2: Option<f64>,
}

/// Everything a [`SeriesTermSolver`] needs to evaluate one axis.
///
/// `x` is measured from the lower end, so it lies in `[0, length]`.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeContext {
    pub axis: Axis,
    pub dimension: usize,
    pub length: f64,
    pub alpha: f64,
    pub x: f64,
    pub t: f64,
    pub kind: TermKind,
    pub boundary: BoundaryType,
    pub profile: Profile,
    pub params: TermParameters,
}

impl NodeContext {
    /// Initial temperature `a0 · profile(x/l)` between two zero ends.
    pub fn initial(axis: Axis, length: f64, alpha: f64, profile: Profile, a0: f64) -> Self {
        Self {
            axis,
            dimension: 1,
            length,
            alpha,
            x: 0.0,
            t: 0.0,
            kind: TermKind::Initial,
            boundary: BoundaryType::Dirichlet,
            profile,
            params: TermParameters {
                a0,
                ..Default::default()
            },
        }
    }

    /// Unit uniform initial temperature; the decay factor of one axis.
    pub fn unit(axis: Axis, length: f64, alpha: f64) -> Self {
        Self::initial(axis, length, alpha, Profile::Uniform, 1.0)
    }

    /// Contribution of the two faces normal to `boundary.axis()`, weighted by `1/dimension`.
    ///
    /// Only constant face values have a series here.
    pub fn boundary(boundary: &AxisBoundary, dimension: usize, length: f64, alpha: f64) -> Result<Self, SolverError> {
        if !(boundary.lower().is_constant() && boundary.upper().is_constant()) {
            return Err(SolverError::Unsupported(format!(
                "time-dependent boundary values ({} / {}) on the {} axis",
                boundary.lower().family(),
                boundary.upper().family(),
                boundary.axis()
            )));
        }
        Ok(Self {
            axis: boundary.axis(),
            dimension,
            length,
            alpha,
            x: 0.0,
            t: 0.0,
            kind: TermKind::Boundary,
            boundary: boundary.kind(),
            profile: Profile::Uniform,
            params: TermParameters {
                a0: 0.0,
                a1: boundary.lower().amplitude(),
                a2: boundary.upper().amplitude(),
                k1: boundary.k1(),
                k2: boundary.k2(),
            },
        })
    }

    /// Constant volumetric source `a0` between two zero ends.
    pub fn source(axis: Axis, length: f64, alpha: f64, a0: f64) -> Self {
        Self {
            kind: TermKind::Source,
            ..Self::initial(axis, length, alpha, Profile::Uniform, a0)
        }
    }
}

/// Series coefficients, fixed for the lifetime of a solver.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Coefficients {
    /// `amplitude · Σ sin(kπs) / k^power · e^{-k²π²τ}` over odd `k`.
    OddSine { amplitude: f64, power: i32 },
    /// Sine coefficients of `amplitude · (s - b)`.
    Linear { amplitude: f64, b: f64 },
    /// Sine coefficients of `amplitude · exp(-(s - b)/c)`.
    Exponential { amplitude: f64, b: f64, c: f64 },
    /// `weight · (2/π) Σ ((-1)^m a2 - a1)/m · sin(mπs) e^{-m²π²τ}`.
    Boundary { weight: f64, a1: f64, a2: f64 },
}

impl Coefficients {
    fn for_context(ctx: &NodeContext) -> Result<Self, SolverError> {
        let a0 = ctx.params.a0;
        match ctx.kind {
            TermKind::Initial => match ctx.profile {
                Profile::Uniform => Ok(Coefficients::OddSine {
                    amplitude: 4.0 * a0 / PI,
                    power: 1,
                }),
                Profile::Linear { b } => Ok(Coefficients::Linear { amplitude: a0, b }),
                Profile::Exponential { b, c } => Ok(Coefficients::Exponential { amplitude: a0, b, c }),
                Profile::Gaussian { .. } => Err(SolverError::Unsupported(format!(
                    "gaussian initial profile on the {} axis",
                    ctx.axis
                ))),
            },
            TermKind::Boundary => Ok(Coefficients::Boundary {
                weight: 1.0 / ctx.dimension as f64,
                a1: ctx.params.a1,
                a2: ctx.params.a2,
            }),
            TermKind::Source => match ctx.profile {
                Profile::Uniform => Ok(Coefficients::OddSine {
                    amplitude: -4.0 * a0 * ctx.length * ctx.length / (ctx.alpha * PI.powi(3)),
                    power: 3,
                }),
                other => Err(SolverError::Unsupported(format!(
                    "{} source profile on the {} axis",
                    other.family(),
                    ctx.axis
                ))),
            },
        }
    }

    /// The coefficient of the `n`-th term, without the sine and decay factors.
    /// Returns the wavenumber multiple alongside it.
    fn coefficient(&self, n: usize) -> (f64, f64) {
        match *self {
            Coefficients::OddSine { amplitude, power } => {
                let k = (2 * n + 1) as f64;
                (amplitude / k.powi(power), k)
            }
            Coefficients::Linear { amplitude, b } => {
                let m = (n + 1) as f64;
                let parity = alternating(n + 1);
                (amplitude * 2.0 / (m * PI) * (-parity - b * (1.0 - parity)), m)
            }
            Coefficients::Exponential { amplitude, b, c } => {
                let m = (n + 1) as f64;
                let parity = alternating(n + 1);
                let num = 2.0 * (b / c).exp() * m * PI * (1.0 - parity * (-1.0 / c).exp());
                (amplitude * num / (1.0 / (c * c) + m * m * PI * PI), m)
            }
            Coefficients::Boundary { weight, a1, a2 } => {
                let m = (n + 1) as f64;
                (weight * 2.0 / (m * PI) * (alternating(n + 1) * a2 - a1), m)
            }
        }
    }

    /// Bound on `|coefficient(m)|` for all `m >= n`.
    fn coefficient_bound(&self, n: usize) -> f64 {
        match *self {
            Coefficients::OddSine { amplitude, power } => amplitude.abs() / ((2 * n + 1) as f64).powi(power),
            Coefficients::Linear { amplitude, b } => {
                amplitude.abs() * 2.0 * (1.0 + 2.0 * b.abs()) / ((n + 1) as f64 * PI)
            }
            Coefficients::Exponential { amplitude, b, c } => {
                amplitude.abs() * 2.0 * (b / c).exp() * (1.0 + (-1.0 / c).exp()) / ((n + 1) as f64 * PI)
            }
            Coefficients::Boundary { weight, a1, a2 } => {
                weight.abs() * 2.0 * (a1.abs() + a2.abs()) / ((n + 1) as f64 * PI)
            }
        }
    }

    /// Sum of the series at `τ = 0` for `0 < s < 1`.
    fn limit(&self, s: f64) -> f64 {
        match *self {
            // Σ sin(kπs)/k = π/4 and Σ sin(kπs)/k³ = π³ s(1 - s)/8 over odd k.
            Coefficients::OddSine { amplitude, power: 1 } => amplitude * PI / 4.0,
            Coefficients::OddSine { amplitude, .. } => amplitude * PI.powi(3) * s * (1.0 - s) / 8.0,
            Coefficients::Linear { amplitude, b } => amplitude * (s - b),
            Coefficients::Exponential { amplitude, b, c } => amplitude * (-(s - b) / c).exp(),
            Coefficients::Boundary { weight, a1, a2 } => -weight * (a1 + (a2 - a1) * s),
        }
    }
}

fn alternating(m: usize) -> f64 {
    if m % 2 == 0 {
        1.0
    } else {
        -1.0
    }
}

/// The series at a fixed `(s, τ)`.
struct TermSeries<'a> {
    coefficients: &'a Coefficients,
    s: f64,
    tau: f64,
}

impl Series for TermSeries<'_> {
    fn term(&self, n: usize) -> f64 {
        let (coefficient, k) = self.coefficients.coefficient(n);
        coefficient * (k * PI * self.s).sin() * (-(k * k) * PI * PI * self.tau).exp()
    }

    fn envelope(&self, n: usize) -> f64 {
        let k = match self.coefficients {
            Coefficients::OddSine { .. } => (2 * n + 1) as f64,
            _ => (n + 1) as f64,
        };
        self.coefficients.coefficient_bound(n) * (-(k * k) * PI * PI * self.tau).exp()
    }
}

/// Evaluates one 1D series term at a movable position and time.
///
/// Position and time are the only mutable state; every evaluation is a pure
/// function of the current context, so repeated calls return identical
/// results.
#[derive(Debug, Clone)]
pub struct SeriesTermSolver {
    ctx: NodeContext,
    coefficients: Coefficients,
    max_iterations: usize,
    stopping: StoppingRule,
}

impl SeriesTermSolver {
    /// Check the context and fix the series coefficients.
    ///
    /// Fails with [`SolverError::Unsupported`] for anything but Dirichlet
    /// ends and for profiles without a series here.
    pub fn new(ctx: NodeContext) -> Result<Self, SolverError> {
        if !(ctx.length.is_finite() && ctx.length > 0.0) {
            return Err(SolverError::InvalidInput(format!(
                "axis length must be positive, got {}",
                ctx.length
            )));
        }
        if !(ctx.alpha.is_finite() && ctx.alpha > 0.0) {
            return Err(SolverError::InvalidInput(format!(
                "diffusivity must be positive, got {}",
                ctx.alpha
            )));
        }
        if !(1..=3).contains(&ctx.dimension) {
            return Err(SolverError::InvalidInput(format!("invalid dimension {}", ctx.dimension)));
        }
        if ctx.boundary != BoundaryType::Dirichlet {
            return Err(SolverError::Unsupported(format!(
                "{} boundaries on the {} axis have no series solution",
                ctx.boundary, ctx.axis
            )));
        }

        let coefficients = Coefficients::for_context(&ctx)?;
        Ok(Self {
            ctx,
            coefficients,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            stopping: StoppingRule::default(),
        })
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn with_stopping_rule(mut self, stopping: StoppingRule) -> Self {
        self.stopping = stopping;
        self
    }

    pub fn context(&self) -> &NodeContext {
        &self.ctx
    }

    /// Move the evaluation point, measured from the lower end.
    pub fn set_x_position(&mut self, x: f64) {
        self.ctx.x = x;
    }

    pub fn set_time(&mut self, t: f64) {
        self.ctx.t = t;
    }

    /// Sum the series with plain accumulation.
    pub fn sum_forward(&self, tol: f64) -> Result<f64, SolverError> {
        self.evaluate(tol, Summation::Forward).map(|s| s.value)
    }

    /// Sum the series with Kahan accumulation.
    pub fn sum_kahan(&self, tol: f64) -> Result<f64, SolverError> {
        self.evaluate(tol, Summation::Kahan).map(|s| s.value)
    }

    /// Sum the series and report how it converged.
    pub fn evaluate(&self, tol: f64, summation: Summation) -> Result<SeriesSum, SolverError> {
        let ctx = &self.ctx;
        if !(ctx.x.is_finite() && (0.0..=ctx.length).contains(&ctx.x)) {
            return Err(SolverError::InvalidInput(format!(
                "position {} lies outside [0, {}] on the {} axis",
                ctx.x, ctx.length, ctx.axis
            )));
        }
        if !(ctx.t.is_finite() && ctx.t >= 0.0) {
            return Err(SolverError::InvalidInput(format!("time must be non-negative, got {}", ctx.t)));
        }

        let s = ctx.x / ctx.length;
        if s <= EDGE_TOLERANCE || s >= 1.0 - EDGE_TOLERANCE {
            return Ok(SeriesSum::exact(0.0));
        }

        let threshold = ctx.kind.zero_threshold();
        let tau = ctx.alpha * ctx.t / (ctx.length * ctx.length);
        if tau <= VANISHING_DIFFUSION_TIME {
            return Ok(SeriesSum::exact(snap(self.coefficients.limit(s), threshold)));
        }

        let series = TermSeries {
            coefficients: &self.coefficients,
            s,
            tau,
        };
        let sum = series::sum(&series, summation, tol, self.max_iterations, self.stopping)
            .map_err(|e| self.series_error(e))?;

        Ok(SeriesSum {
            value: snap(sum.value, threshold),
            ..sum
        })
    }

    /// The time-independent part of the solution at the current position.
    ///
    /// The straight line between the two end values (scaled by `1/d`) for a
    /// boundary term, the parabolic profile `a0·x(l - x)/(2α)` for a source,
    /// and zero for an initial term.
    pub fn steady_state_dirichlet(&self) -> f64 {
        let ctx = &self.ctx;
        match self.coefficients {
            Coefficients::Boundary { weight, a1, a2 } => weight * (a1 + (a2 - a1) * ctx.x / ctx.length),
            _ if ctx.kind == TermKind::Source => ctx.params.a0 * ctx.x * (ctx.length - ctx.x) / (2.0 * ctx.alpha),
            _ => 0.0,
        }
    }

    /// Steady state plus series.
    pub fn value(&self, tol: f64, summation: Summation) -> Result<f64, SolverError> {
        Ok(self.steady_state_dirichlet() + self.evaluate(tol, summation)?.value)
    }

    fn series_error(&self, err: SeriesError) -> SolverError {
        match err {
            SeriesError::InvalidTolerance(tol) => {
                SolverError::InvalidInput(format!("series tolerance must lie in (0, 1), got {tol}"))
            }
            SeriesError::MaxIterationsReached {
                iterations,
                last_increment,
                ..
            } => SolverError::ConvergenceFailure {
                kind: self.ctx.kind,
                axis: self.ctx.axis,
                position: self.ctx.x,
                time: self.ctx.t,
                iterations,
                last_increment,
            },
        }
    }
}

fn snap(value: f64, threshold: f64) -> f64 {
    if value.abs() < threshold {
        0.0
    } else {
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn initial(a0: f64) -> SeriesTermSolver {
        let mut solver = SeriesTermSolver::new(NodeContext::initial(Axis::X, 1.0, 1.0, Profile::Uniform, a0)).unwrap();
        solver.set_time(0.01);
        solver
    }

    #[test]
    fn test_ends_are_exactly_zero() {
        let mut solver = initial(300.0);
        solver.set_x_position(0.0);
        assert_eq!(solver.sum_forward(1e-10).unwrap(), 0.0);
        solver.set_x_position(1.0);
        assert_eq!(solver.evaluate(1e-10, Summation::Kahan).unwrap(), SeriesSum::exact(0.0));
    }

    #[test]
    fn test_zero_time_limit() {
        let mut solver = initial(300.0);
        solver.set_time(0.0);
        for x in [0.5, 0.1, 0.93] {
            solver.set_x_position(x);
            assert_relative_eq!(solver.sum_forward(1e-10).unwrap(), 300.0, max_relative = 1e-14);
        }
    }

    #[test]
    fn test_repeated_sums_are_identical() {
        let mut solver = initial(300.0);
        solver.set_x_position(0.3);
        let first = solver.sum_forward(1e-12).unwrap();
        for _ in 0..5 {
            assert_eq!(solver.sum_forward(1e-12).unwrap().to_bits(), first.to_bits());
        }
        assert_eq!(solver.clone().sum_forward(1e-12).unwrap().to_bits(), first.to_bits());
    }

    #[test]
    fn test_increment_rule_is_the_default() {
        let mut solver = initial(300.0);
        solver.set_x_position(0.2);
        // The fifth odd mode vanishes at s = 0.2 and ends the plain sum.
        let plain = solver.evaluate(1e-10, Summation::Forward).unwrap();
        assert_eq!(plain.iterations, 3);
        let guarded = solver
            .clone()
            .with_stopping_rule(StoppingRule::Envelope)
            .evaluate(1e-10, Summation::Forward)
            .unwrap();
        assert!(guarded.iterations > plain.iterations);
    }

    #[test]
    fn test_kahan_matches_forward() {
        let mut solver = initial(300.0);
        solver.set_x_position(0.37);
        let forward = solver.sum_forward(1e-12).unwrap();
        let kahan = solver.sum_kahan(1e-12).unwrap();
        assert_relative_eq!(forward, kahan, max_relative = 1e-13);
    }

    #[test]
    fn test_linear_profile_limit_and_decay() {
        let profile = Profile::Linear { b: 0.25 };
        // sin(4π · 3/4) vanishes, so keep summing past it.
        let mut solver = SeriesTermSolver::new(NodeContext::initial(Axis::Y, 2.0, 0.5, profile, 10.0))
            .unwrap()
            .with_stopping_rule(StoppingRule::Envelope);
        solver.set_x_position(1.5);
        // Short times reproduce the profile away from the ends.
        solver.set_time(1e-6);
        assert_relative_eq!(solver.sum_forward(1e-12).unwrap(), 10.0 * (0.75 - 0.25), max_relative = 1e-3);
        // Long times leave only the first mode: B_1 = (2/π)(1 - 2b).
        solver.set_time(8.0);
        let tau = 0.5 * 8.0 / 4.0;
        let expected = 10.0 * 2.0 / PI * 0.5 * (0.75 * PI).sin() * (-PI * PI * tau).exp();
        assert_relative_eq!(solver.sum_forward(1e-14).unwrap(), expected, max_relative = 1e-6);
    }

    #[test]
    fn test_exponential_profile_short_time() {
        let profile = Profile::Exponential { b: 0.2, c: 0.5 };
        let mut solver = SeriesTermSolver::new(NodeContext::initial(Axis::X, 1.0, 1.0, profile, 3.0))
            .unwrap()
            .with_stopping_rule(StoppingRule::Envelope);
        solver.set_x_position(0.6);
        solver.set_time(1e-7);
        let expected = 3.0 * (-(0.6 - 0.2) / 0.5f64).exp();
        assert_relative_eq!(solver.sum_forward(1e-12).unwrap(), expected, max_relative = 1e-3);
    }

    #[test]
    fn test_source_reaches_parabola() {
        let mut solver = SeriesTermSolver::new(NodeContext::source(Axis::X, 2.0, 0.1, 5.0)).unwrap();
        solver.set_x_position(0.5);
        solver.set_time(0.0);
        assert_eq!(solver.value(1e-10, Summation::Forward).unwrap(), 0.0);
        solver.set_time(1e3);
        let steady = 5.0 * 0.5 * 1.5 / (2.0 * 0.1);
        assert_relative_eq!(solver.steady_state_dirichlet(), steady);
        assert_relative_eq!(solver.value(1e-10, Summation::Forward).unwrap(), steady, max_relative = 1e-12);
    }

    #[test]
    fn test_non_dirichlet_is_unsupported() {
        for kind in [BoundaryType::Neumann, BoundaryType::Robin, BoundaryType::MixedI, BoundaryType::MixedII] {
            let ctx = NodeContext {
                boundary: kind,
                ..NodeContext::unit(Axis::X, 1.0, 1.0)
            };
            assert!(matches!(SeriesTermSolver::new(ctx), Err(SolverError::Unsupported(_))), "{kind}");
        }
        let gaussian = Profile::Gaussian { b: 0.5, c: 0.1 };
        let ctx = NodeContext::initial(Axis::Z, 1.0, 1.0, gaussian, 1.0);
        assert!(matches!(SeriesTermSolver::new(ctx), Err(SolverError::Unsupported(_))));
    }

    #[test]
    fn test_iteration_cap_reports_context() {
        let mut solver = initial(300.0).with_max_iterations(2);
        solver.set_x_position(0.3);
        solver.set_time(1e-4);
        let err = solver.sum_forward(1e-12).unwrap_err();
        match err {
            SolverError::ConvergenceFailure {
                kind,
                axis,
                position,
                time,
                iterations,
                ..
            } => {
                assert_eq!(kind, TermKind::Initial);
                assert_eq!(axis, Axis::X);
                assert_eq!(position, 0.3);
                assert_eq!(time, 1e-4);
                assert_eq!(iterations, 2);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_rejects_positions_outside_axis() {
        let mut solver = initial(1.0);
        solver.set_x_position(1.5);
        assert!(matches!(solver.sum_forward(1e-10), Err(SolverError::InvalidInput(_))));
        solver.set_x_position(0.5);
        solver.set_time(-1.0);
        assert!(solver.sum_forward(1e-10).is_err());
    }
}
