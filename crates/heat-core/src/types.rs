//! Core types shared across the solver.
//!
//! This module defines the closed vocabularies used by the condition types
//! and the series engine (boundary types, function families, term kinds),
//! the solver parameters, and the field container returned by a solve.

use std::fmt;
use std::str::FromStr;

use ndarray::{Array2, ArrayView1, Axis as ArrayAxis};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::backend::Execution;
use crate::series::{StoppingRule, Summation};
use crate::solver::SolverError;

/// A string that does not name a member of a closed set.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("\"{value}\" is not a valid {what}")]
pub struct ParseEnumError {
    pub what: &'static str,
    pub value: String,
}

/// Boundary condition kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BoundaryType {
    Dirichlet,
    Neumann,
    Robin,
    #[serde(rename = "mixedi")]
    MixedI,
    #[serde(rename = "mixedii")]
    MixedII,
}

impl BoundaryType {
    pub fn as_str(self) -> &'static str {
        match self {
            BoundaryType::Dirichlet => "dirichlet",
            BoundaryType::Neumann => "neumann",
            BoundaryType::Robin => "robin",
            BoundaryType::MixedI => "mixedI",
            BoundaryType::MixedII => "mixedII",
        }
    }
}

impl fmt::Display for BoundaryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BoundaryType {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "dirichlet" => Ok(BoundaryType::Dirichlet),
            "neumann" => Ok(BoundaryType::Neumann),
            "robin" => Ok(BoundaryType::Robin),
            "mixedi" => Ok(BoundaryType::MixedI),
            "mixedii" => Ok(BoundaryType::MixedII),
            _ => Err(ParseEnumError {
                what: "boundary type",
                value: s.to_string(),
            }),
        }
    }
}

/// Families of prescribed functions.
///
/// Spatial profiles of the initial temperature may use any family; time
/// functions of boundaries and sources use all but `Gaussian`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FunctionFamily {
    Uniform,
    Linear,
    Exponential,
    Gaussian,
}

impl FunctionFamily {
    pub fn as_str(self) -> &'static str {
        match self {
            FunctionFamily::Uniform => "uniform",
            FunctionFamily::Linear => "linear",
            FunctionFamily::Exponential => "exponential",
            FunctionFamily::Gaussian => "gaussian",
        }
    }
}

impl fmt::Display for FunctionFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FunctionFamily {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "uniform" => Ok(FunctionFamily::Uniform),
            "linear" => Ok(FunctionFamily::Linear),
            "exponential" => Ok(FunctionFamily::Exponential),
            "gaussian" => Ok(FunctionFamily::Gaussian),
            _ => Err(ParseEnumError {
                what: "function family",
                value: s.to_string(),
            }),
        }
    }
}

/// Which physical contribution a series evaluates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TermKind {
    Initial,
    Boundary,
    Source,
}

impl TermKind {
    /// Magnitude below which a summed series is reported as exactly zero.
    pub fn zero_threshold(self) -> f64 {
        match self {
            TermKind::Initial => 1e-10,
            TermKind::Boundary => 1e-8,
            TermKind::Source => 1e-10,
        }
    }
}

impl fmt::Display for TermKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TermKind::Initial => "initial",
            TermKind::Boundary => "boundary",
            TermKind::Source => "source",
        };
        f.write_str(name)
    }
}

/// Treatment of nodes that lie on the faces of the domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BoundaryNodePolicy {
    /// Each face node takes the mean of the values of the faces it touches.
    #[default]
    FaceMean,
    /// Keep the superposed series value.
    Superposed,
}

/// Parameters controlling a solve.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverSettings {
    /// Absolute tolerance of each series sum.
    pub tolerance: f64,
    /// Maximum number of terms per series.
    pub max_iterations: usize,
    pub summation: Summation,
    pub stopping: StoppingRule,
    pub boundary_nodes: BoundaryNodePolicy,
    pub execution: Execution,
}

impl Default for SolverSettings {
    fn default() -> Self {
        Self {
            tolerance: 1e-10,
            max_iterations: 100_000,
            summation: Summation::Forward,
            stopping: StoppingRule::Increment,
            boundary_nodes: BoundaryNodePolicy::FaceMean,
            execution: Execution::Parallel,
        }
    }
}

impl SolverSettings {
    pub fn validate(&self) -> Result<(), SolverError> {
        if !(self.tolerance > 0.0 && self.tolerance < 1.0) {
            return Err(SolverError::InvalidInput(format!(
                "tolerance must lie in (0, 1), got {}",
                self.tolerance
            )));
        }
        if self.max_iterations == 0 {
            return Err(SolverError::InvalidInput(
                "max_iterations must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

/// Temperatures at every mesh node for a list of times.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemperatureField {
    /// Evaluation times (s).
    pub times: Vec<f64>,
    /// Temperatures, shape `(times.len(), num_nodes)`.
    pub values: Array2<f64>,
}

impl TemperatureField {
    pub fn num_times(&self) -> usize {
        self.values.nrows()
    }

    pub fn num_nodes(&self) -> usize {
        self.values.ncols()
    }

    /// The field at the `step`-th time.
    pub fn snapshot(&self, step: usize) -> Option<ArrayView1<'_, f64>> {
        (step < self.num_times()).then(|| self.values.index_axis(ArrayAxis(0), step))
    }

    /// Smallest and largest temperature over all times and nodes.
    pub fn range(&self) -> Option<(f64, f64)> {
        self.values.iter().fold(None, |acc, &v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
    }
}
