//! Superposition of per-axis series onto mesh nodes.
//!
//! Each contribution is evaluated once per axis at the node coordinates of
//! that axis ("sweeps", one row per time) and then broadcast onto the nodes
//! through the mesh's per-axis indices:
//!
//! - initial: `a · Π_c f_c(x_c)` with `a` carried by the first axis;
//! - boundary: `Σ_b [steady_b(x_b) + transient_b(x_b) · Π_{c≠b} U_c(x_c)]`
//!   where `U_c` is the decay of a unit initial temperature;
//! - source: the closed form in 1D for a constant rate, otherwise the
//!   Duhamel integral of `Q(t - s) · Π_c U_c(x_c, s)`.

use heat_geometry::{Axis, Side, StructuredMesh};
use ndarray::Array2;

use super::duhamel::{duhamel_points, GaussLegendre};
use super::uniform::{NodeContext, SeriesTermSolver};
use crate::conditions::Profile;
use crate::model::Model;
use crate::solver::SolverError;
use crate::types::{BoundaryNodePolicy, SolverSettings, TermKind};

/// Combines the initial, boundary and source contributions of a [`Model`].
pub struct TermAggregator<'a> {
    model: &'a Model,
    settings: SolverSettings,
}

impl<'a> TermAggregator<'a> {
    pub fn new(model: &'a Model, settings: SolverSettings) -> Result<Self, SolverError> {
        settings.validate()?;
        Ok(Self { model, settings })
    }

    fn mesh(&self) -> &StructuredMesh {
        self.model.mesh()
    }

    fn axes(&self) -> &'static [Axis] {
        self.model.geometry().axes()
    }

    fn length(&self, axis: Axis) -> Result<f64, SolverError> {
        self.model.geometry().length(axis).ok_or_else(|| {
            SolverError::InvalidInput(format!("the {} has no {axis} axis", self.model.geometry().name()))
        })
    }

    fn alpha(&self) -> f64 {
        self.model.material().alpha()
    }

    /// Context for the decay of `scale · profile` between the faces of `axis`.
    fn decay_context(&self, axis: Axis, profile: Profile, scale: f64) -> Result<NodeContext, SolverError> {
        let boundary = self.model.boundary().axis(axis).ok_or_else(|| {
            SolverError::InvalidInput(format!("no boundary condition for the {axis} axis"))
        })?;
        Ok(NodeContext {
            boundary: boundary.kind(),
            ..NodeContext::initial(axis, self.length(axis)?, self.alpha(), profile, scale)
        })
    }

    fn term_solver(&self, ctx: NodeContext) -> Result<SeriesTermSolver, SolverError> {
        Ok(SeriesTermSolver::new(ctx)?
            .with_max_iterations(self.settings.max_iterations)
            .with_stopping_rule(self.settings.stopping))
    }

    /// Series part of `ctx` at every node coordinate of its axis, one row per time.
    pub fn axis_sweep(&self, ctx: NodeContext, times: &[f64]) -> Result<Array2<f64>, SolverError> {
        let solver = self.term_solver(ctx)?;
        let coordinates = self.mesh().coordinates(solver.context().axis);
        self.settings
            .execution
            .fill_rows(times.len(), coordinates.len(), |row, out| {
                self.sweep_into(&solver, times[row], out)
            })
    }

    /// Steady part of `ctx` at every node coordinate of its axis.
    pub fn steady_sweep(&self, ctx: NodeContext) -> Result<Vec<f64>, SolverError> {
        let mut solver = self.term_solver(ctx)?;
        let length = solver.context().length;
        let coordinates = self.mesh().coordinates(solver.context().axis);
        Ok(coordinates
            .iter()
            .map(|&c| {
                solver.set_x_position(from_lower_end(c, length));
                solver.steady_state_dirichlet()
            })
            .collect())
    }

    fn sweep_into(&self, solver: &SeriesTermSolver, t: f64, out: &mut [f64]) -> Result<(), SolverError> {
        let mut solver = solver.clone();
        let length = solver.context().length;
        let coordinates = self.mesh().coordinates(solver.context().axis);
        solver.set_time(t);
        for (value, &c) in out.iter_mut().zip(coordinates) {
            solver.set_x_position(from_lower_end(c, length));
            *value = solver.evaluate(self.settings.tolerance, self.settings.summation)?.value;
        }
        Ok(())
    }

    fn unit_sweeps(&self, times: &[f64]) -> Result<Vec<Array2<f64>>, SolverError> {
        self.axes()
            .iter()
            .map(|&axis| self.axis_sweep(self.decay_context(axis, Profile::Uniform, 1.0)?, times))
            .collect()
    }

    /// Fill a `(times, nodes)` field from a per-node closure.
    fn node_field<F>(&self, rows: usize, value: F) -> Result<Array2<f64>, SolverError>
    where
        F: Fn(usize, usize) -> f64 + Send + Sync,
    {
        self.settings
            .execution
            .fill_rows(rows, self.mesh().num_nodes(), |row, out| {
                for (node, v) in out.iter_mut().enumerate() {
                    *v = value(row, node);
                }
                Ok(())
            })
    }

    /// Decay of the initial temperature.
    pub fn initial_field(&self, times: &[f64]) -> Result<Array2<f64>, SolverError> {
        let initial = self.model.initial();
        let mut sweeps = Vec::with_capacity(self.axes().len());
        for (i, &axis) in self.axes().iter().enumerate() {
            let profile = *initial.profile(axis).ok_or_else(|| {
                SolverError::InvalidInput(format!("no initial profile for the {axis} axis"))
            })?;
            let scale = if i == 0 { initial.amplitude() } else { 1.0 };
            let ctx = self.decay_context(axis, profile, scale)?;
            sweeps.push(self.axis_sweep(ctx, times)?);
        }
        log::debug!("initial sweeps done for {} axes", sweeps.len());

        let mesh = self.mesh();
        let axes = self.axes();
        self.node_field(times.len(), |row, node| {
            axes.iter()
                .zip(&sweeps)
                .map(|(&axis, sweep)| sweep[[row, mesh.axis_index(node, axis)]])
                .product()
        })
    }

    /// Response to the face values, including their steady state.
    pub fn boundary_field(&self, times: &[f64]) -> Result<Array2<f64>, SolverError> {
        let boundary = self.model.boundary();
        let dimension = self.axes().len();

        let mut steady = Vec::with_capacity(dimension);
        let mut transient = Vec::with_capacity(dimension);
        for &axis in self.axes() {
            let axis_boundary = boundary.axis(axis).ok_or_else(|| {
                SolverError::InvalidInput(format!("no boundary condition for the {axis} axis"))
            })?;
            let ctx = NodeContext::boundary(axis_boundary, dimension, self.length(axis)?, self.alpha())?;
            steady.push(self.steady_sweep(ctx.clone())?);
            transient.push(self.axis_sweep(ctx, times)?);
        }
        let unit = if dimension > 1 {
            self.unit_sweeps(times)?
        } else {
            Vec::new()
        };
        log::debug!("boundary sweeps done for {dimension} axes");

        let mesh = self.mesh();
        let axes = self.axes();
        self.node_field(times.len(), |row, node| {
            let mut total = 0.0;
            for (b, &axis) in axes.iter().enumerate() {
                let i = mesh.axis_index(node, axis);
                let mut decay = transient[b][[row, i]];
                for (c, &other) in axes.iter().enumerate() {
                    if c != b {
                        decay *= unit[c][[row, mesh.axis_index(node, other)]];
                    }
                }
                total += steady[b][i] + decay;
            }
            total
        })
    }

    /// Response to the volumetric source.
    pub fn source_field(&self, times: &[f64]) -> Result<Array2<f64>, SolverError> {
        let source = self.model.source();
        let mesh = self.mesh();
        if source.is_zero() {
            return Ok(Array2::zeros((times.len(), mesh.num_nodes())));
        }
        if let Some(fwhm) = source.fwhm() {
            return Err(SolverError::Unsupported(format!(
                "localised source (fwhm = {fwhm}) has no series solution"
            )));
        }

        let function = *source.function();
        let axes = self.axes();

        if axes.len() == 1 && function.is_constant() {
            let ctx = NodeContext::source(Axis::X, self.length(Axis::X)?, self.alpha(), function.amplitude());
            let steady = self.steady_sweep(ctx.clone())?;
            let transient = self.axis_sweep(ctx, times)?;
            return self.node_field(times.len(), |row, node| {
                let i = mesh.axis_index(node, Axis::X);
                steady[i] + transient[[row, i]]
            });
        }

        log::debug!("integrating {} source over {} axes", function.family(), axes.len());
        let rule = GaussLegendre::default();
        let solvers = axes
            .iter()
            .map(|&axis| self.term_solver(self.decay_context(axis, Profile::Uniform, 1.0)?))
            .collect::<Result<Vec<_>, _>>()?;
        let threshold = TermKind::Source.zero_threshold();

        self.settings
            .execution
            .fill_rows(times.len(), mesh.num_nodes(), |row, out| {
                let t = times[row];
                let mut factors: Vec<Vec<f64>> = solvers
                    .iter()
                    .map(|s| vec![0.0; mesh.coordinates(s.context().axis).len()])
                    .collect();
                for (elapsed, weight) in duhamel_points(&rule, t) {
                    let q = weight * function.value_at(t - elapsed);
                    for (solver, factor) in solvers.iter().zip(factors.iter_mut()) {
                        self.sweep_into(solver, elapsed, factor)?;
                    }
                    for (node, v) in out.iter_mut().enumerate() {
                        let product: f64 = axes
                            .iter()
                            .zip(&factors)
                            .map(|(&axis, f)| f[mesh.axis_index(node, axis)])
                            .product();
                        *v += q * product;
                    }
                }
                for v in out.iter_mut() {
                    if v.abs() < threshold {
                        *v = 0.0;
                    }
                }
                Ok(())
            })
    }

    /// Initial, boundary and source contributions summed, with the
    /// configured treatment of face nodes applied.
    pub fn total_field(&self, times: &[f64]) -> Result<Array2<f64>, SolverError> {
        if let Some(&bad) = times.iter().find(|t| !(t.is_finite() && **t >= 0.0)) {
            return Err(SolverError::InvalidInput(format!(
                "evaluation times must be finite and non-negative, got {bad}"
            )));
        }

        let mut total = self.initial_field(times)?;
        total += &self.boundary_field(times)?;
        total += &self.source_field(times)?;

        if self.settings.boundary_nodes == BoundaryNodePolicy::FaceMean {
            self.apply_face_values(&mut total, times);
        }
        Ok(total)
    }

    /// Overwrite every face node with the mean of the values prescribed on
    /// the faces it touches.
    fn apply_face_values(&self, field: &mut Array2<f64>, times: &[f64]) {
        let mesh = self.mesh();
        let boundary = self.model.boundary();
        for &node in mesh.boundary_nodes() {
            let faces = mesh.node_faces(node);
            let functions: Vec<_> = faces
                .iter()
                .filter_map(|face| {
                    let axis_boundary = boundary.axis(face.axis)?;
                    Some(match face.side {
                        Side::Lower => *axis_boundary.lower(),
                        Side::Upper => *axis_boundary.upper(),
                    })
                })
                .collect();
            if functions.is_empty() {
                continue;
            }
            for (row, &t) in times.iter().enumerate() {
                let sum: f64 = functions.iter().map(|f| f.value_at(t)).sum();
                field[[row, node]] = sum / functions.len() as f64;
            }
        }
    }
}

/// Distance of a centred coordinate from the lower end of its axis.
fn from_lower_end(coordinate: f64, length: f64) -> f64 {
    (coordinate + 0.5 * length).clamp(0.0, length)
}
