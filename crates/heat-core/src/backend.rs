//! Serial and rayon-parallel row fills.
//!
//! Every result the solver produces is a `(rows × columns)` matrix whose
//! rows can be computed independently: one row per time for an axis sweep,
//! one row per time for the broadcast onto mesh nodes. [`Execution`] picks
//! whether rows are filled on the calling thread or across the rayon pool.

use ndarray::Array2;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::solver::SolverError;

/// Where row fills run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Execution {
    /// On the calling thread, rows in order.
    Serial,
    /// Across the global rayon thread pool.
    #[default]
    Parallel,
}

impl Execution {
    /// Fill a `(rows, cols)` matrix by calling `fill(row, slice)` once per row.
    ///
    /// The first error returned by `fill` aborts the fill.
    pub fn fill_rows<F>(self, rows: usize, cols: usize, fill: F) -> Result<Array2<f64>, SolverError>
    where
        F: Fn(usize, &mut [f64]) -> Result<(), SolverError> + Send + Sync,
    {
        let mut data = vec![0.0; rows * cols];

        if cols > 0 {
            match self {
                Execution::Serial => {
                    for (row, chunk) in data.chunks_mut(cols).enumerate() {
                        fill(row, chunk)?;
                    }
                }
                Execution::Parallel => {
                    data.par_chunks_mut(cols)
                        .enumerate()
                        .try_for_each(|(row, chunk)| fill(row, chunk))?;
                }
            }
        }

        Array2::from_shape_vec((rows, cols), data)
            .map_err(|e| SolverError::InvalidInput(e.to_string()))
    }

    /// Human-readable description of the backend.
    pub fn describe(self) -> String {
        match self {
            Execution::Serial => "serial".to_string(),
            Execution::Parallel => format!("parallel ({} threads)", rayon::current_num_threads()),
        }
    }
}
