//! Field solver abstraction and implementations.
//!
//! The [`FieldSolver`] trait defines the interface a method for computing
//! the temperature of a [`Model`] must implement. The separable series
//! expansion ([`separable::SeparableSolver`]) is the implementation shipped
//! here.

pub mod separable;

use heat_geometry::Axis;
use thiserror::Error;

use crate::model::Model;
use crate::types::{TemperatureField, TermKind};

/// Errors that can occur during a solve.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SolverError {
    #[error("The {kind} series on the {axis} axis failed to converge after {iterations} terms at x = {position}, t = {time} (last increment: {last_increment:.2e})")]
    ConvergenceFailure {
        kind: TermKind,
        axis: Axis,
        /// Position along the axis, measured from its lower end.
        position: f64,
        time: f64,
        iterations: usize,
        last_increment: f64,
    },

    #[error("Unsupported configuration: {0}")]
    Unsupported(String),

    #[error("Invalid solver input: {0}")]
    InvalidInput(String),
}

/// The trait every temperature solver implements.
///
/// The CLI drives a solve through this trait without knowing how the field
/// is computed.
pub trait FieldSolver {
    /// Temperature at every mesh node of `model` for each of `times`.
    ///
    /// The returned field has one row per time and one column per node.
    fn solve(&self, model: &Model, times: &[f64]) -> Result<TemperatureField, SolverError>;

    /// Human-readable name of the solver method.
    fn method_name(&self) -> &str;
}
