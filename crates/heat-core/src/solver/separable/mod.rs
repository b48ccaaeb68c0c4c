//! Separable Fourier-series solver.
//!
//! The temperature on a line, rectangle or block with Dirichlet faces is
//! written as a superposition of 1D series solutions, one per axis and
//! contribution (initial temperature, face values, volumetric source).
//!
//! # Structure
//!
//! - [`uniform`]: the 1D series and their steady states.
//! - [`aggregate`]: broadcasting 1D sweeps onto mesh nodes.
//! - [`duhamel`]: quadrature for time-dependent and multi-axis sources.

pub mod aggregate;
pub mod duhamel;
pub mod uniform;

pub use aggregate::TermAggregator;
pub use uniform::{NodeContext, SeriesTermSolver, TermParameters};

use super::{FieldSolver, SolverError};
use crate::model::Model;
use crate::types::{SolverSettings, TemperatureField};

/// The series solver, holding the summation parameters.
#[derive(Debug, Clone, Default)]
pub struct SeparableSolver {
    pub settings: SolverSettings,
}

impl SeparableSolver {
    pub fn new(settings: SolverSettings) -> Self {
        Self { settings }
    }
}

impl FieldSolver for SeparableSolver {
    fn solve(&self, model: &Model, times: &[f64]) -> Result<TemperatureField, SolverError> {
        log::info!(
            "Solving {} ({} nodes, {} times) on {}",
            model.geometry().name(),
            model.mesh().num_nodes(),
            times.len(),
            self.settings.execution.describe()
        );

        let values = TermAggregator::new(model, self.settings)?.total_field(times)?;

        Ok(TemperatureField {
            times: times.to_vec(),
            values,
        })
    }

    fn method_name(&self) -> &str {
        "Separable Fourier series"
    }
}
