//! Time integration of source responses by Duhamel's principle.
//!
//! A spatially uniform source `Q(t)` switched on at `t = 0` between zero
//! Dirichlet faces produces
//!
//! $$ u(\mathbf{x}, t) = \int_0^t Q(t - s)\, \prod_c f_c(x_c, s)\, ds $$
//!
//! where $f_c$ is the 1D decay of a unit initial temperature along axis $c$.
//! The integrand is steep near `s = 0` at nodes close to a face, so the
//! integral is taken in `w` with `s = t w²`, which clusters abscissae there.

/// Panels of the composite rule over `[0, 1]` in `w`.
pub const PANELS: usize = 8;

/// Gauss points per panel.
pub const POINTS: usize = 8;

/// An `n`-point Gauss-Legendre rule on `[-1, 1]`.
#[derive(Debug, Clone, PartialEq)]
pub struct GaussLegendre {
    nodes: Vec<f64>,
    weights: Vec<f64>,
}

impl GaussLegendre {
    /// Nodes are the roots of `P_n`, found by Newton iteration from the
    /// Chebyshev-like initial guesses.
    pub fn new(n: usize) -> Self {
        let mut nodes = Vec::with_capacity(n);
        let mut weights = Vec::with_capacity(n);

        for i in 0..n {
            let mut x = (std::f64::consts::PI * (i as f64 + 0.75) / (n as f64 + 0.5)).cos();
            let mut derivative = 1.0;
            for _ in 0..100 {
                let (p, dp) = legendre(n, x);
                derivative = dp;
                let dx = p / dp;
                x -= dx;
                if dx.abs() < 1e-15 {
                    break;
                }
            }
            let (_, dp) = legendre(n, x);
            if dp.is_finite() {
                derivative = dp;
            }
            nodes.push(x);
            weights.push(2.0 / ((1.0 - x * x) * derivative * derivative));
        }

        Self { nodes, weights }
    }

    pub fn nodes(&self) -> &[f64] {
        &self.nodes
    }

    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    /// Abscissae and weights of the composite rule over `[a, b]`.
    pub fn composite(&self, a: f64, b: f64, panels: usize) -> Vec<(f64, f64)> {
        let width = (b - a) / panels as f64;
        let mut points = Vec::with_capacity(panels * self.nodes.len());
        for p in 0..panels {
            let mid = a + (p as f64 + 0.5) * width;
            for (&x, &w) in self.nodes.iter().zip(&self.weights) {
                points.push((mid + 0.5 * width * x, 0.5 * width * w));
            }
        }
        points
    }

    /// `∫_a^b f` with the composite rule.
    pub fn integrate<F: FnMut(f64) -> f64>(&self, a: f64, b: f64, panels: usize, mut f: F) -> f64 {
        self.composite(a, b, panels).into_iter().map(|(x, w)| w * f(x)).sum()
    }
}

impl Default for GaussLegendre {
    fn default() -> Self {
        Self::new(POINTS)
    }
}

/// `(P_n(x), P_n'(x))` by the three-term recurrence.
fn legendre(n: usize, x: f64) -> (f64, f64) {
    let mut p0 = 1.0;
    let mut p1 = x;
    if n == 0 {
        return (1.0, 0.0);
    }
    for k in 2..=n {
        let k = k as f64;
        let p2 = ((2.0 * k - 1.0) * x * p1 - (k - 1.0) * p0) / k;
        p0 = p1;
        p1 = p2;
    }
    let dp = n as f64 * (x * p1 - p0) / (x * x - 1.0);
    (p1, dp)
}

/// Elapsed times `s` and weights for `∫_0^t g(s) ds` under `s = t w²`.
///
/// Empty for `t <= 0`.
pub fn duhamel_points(rule: &GaussLegendre, t: f64) -> Vec<(f64, f64)> {
    if t <= 0.0 {
        return Vec::new();
    }
    rule.composite(0.0, 1.0, PANELS)
        .into_iter()
        .map(|(w, weight)| (t * w * w, 2.0 * t * w * weight))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_weights_sum_to_interval_length() {
        for n in [1, 2, 5, 8, 12] {
            let rule = GaussLegendre::new(n);
            assert_relative_eq!(rule.weights().iter().sum::<f64>(), 2.0, epsilon = 1e-13);
            assert!(rule.nodes().iter().all(|x| x.abs() < 1.0));
        }
    }

    #[test]
    fn test_three_point_rule() {
        let rule = GaussLegendre::new(3);
        let mut nodes = rule.nodes().to_vec();
        nodes.sort_by(f64::total_cmp);
        assert_relative_eq!(nodes[0], -(0.6f64).sqrt(), epsilon = 1e-14);
        assert_relative_eq!(nodes[1], 0.0, epsilon = 1e-14);
        assert_relative_eq!(nodes[2], (0.6f64).sqrt(), epsilon = 1e-14);
    }

    #[test]
    fn test_polynomials_are_exact() {
        let rule = GaussLegendre::default();
        assert_relative_eq!(rule.integrate(0.0, 3.0, 1, |x| x * x), 9.0, epsilon = 1e-12);
        assert_relative_eq!(rule.integrate(-1.0, 2.0, 4, |x| x.powi(15)), (65536.0 - 1.0) / 16.0, max_relative = 1e-12);
    }

    #[test]
    fn test_duhamel_points_integrate_time() {
        let rule = GaussLegendre::default();
        let points = duhamel_points(&rule, 2.5);
        let length: f64 = points.iter().map(|(_, w)| w).sum();
        assert_relative_eq!(length, 2.5, epsilon = 1e-12);
        let first_moment: f64 = points.iter().map(|(s, w)| s * w).sum();
        assert_relative_eq!(first_moment, 2.5 * 2.5 / 2.0, epsilon = 1e-12);
        assert!(points.iter().all(|&(s, _)| s > 0.0 && s < 2.5));
        assert!(duhamel_points(&rule, 0.0).is_empty());
    }
}
