//! # Heat Core
//!
//! The numerical backbone of the heat solver. This crate computes transient
//! temperature fields in lines, rectangles and blocks by superposing
//! Fourier-series solutions of the heat equation.
//!
//! ## Architecture
//!
//! All solvers implement the [`solver::FieldSolver`] trait, which maps a
//! [`model::Model`] and a list of times to a [`types::TemperatureField`].
//! The implementation is the separable series solver
//! ([`solver::separable::SeparableSolver`]): 1D series are summed along each
//! axis and broadcast onto the mesh nodes.
//!
//! ## Modules
//!
//! - [`types`]: closed vocabularies, solver parameters, the field container.
//! - [`conditions`]: validated initial, boundary and source conditions.
//! - [`series`]: convergence-controlled summation.
//! - [`solver`]: the solver trait and the separable series solver.
//! - [`backend`]: serial and rayon-parallel row fills.
//! - [`settings`]: raw settings groups and their validation.
//! - [`model`]: a complete problem ready to solve.

pub mod backend;
pub mod conditions;
pub mod model;
pub mod series;
pub mod settings;
pub mod solver;
pub mod types;

pub use model::Model;
pub use settings::{Settings, SettingsError};
pub use solver::{FieldSolver, SolverError};
pub use types::{SolverSettings, TemperatureField};
