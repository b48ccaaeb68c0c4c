//! Rectangular domains centred at the origin.
//!
//! A [`Geometry`] is a line, rectangle, or block described only by its side
//! lengths. Each side spans `[-l/2, l/2]` along its axis. Geometries are
//! validated on construction and never mutated afterwards; changing the
//! dimension or a length means building a new value.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while validating a domain or its mesh policy.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GeometryError {
    #[error("d={0} is not a valid dimension (expected 1, 2 or 3)")]
    InvalidDimension(usize),

    #[error("Please set the length in the {axis} direction (l{axis})")]
    MissingLength { axis: Axis },

    #[error("l{axis}={value} is not a finite number")]
    NonFiniteLength { axis: Axis, value: f64 },

    #[error("l{axis} must be positive, got {value}")]
    NonPositiveLength { axis: Axis, value: f64 },

    #[error("The mesh size should be \"coarse\", \"normal\" or \"fine\", not \"{0}\"")]
    InvalidMeshSize(String),
}

/// A Cartesian axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    /// All axes in x, y, z order.
    pub const ALL: [Axis; 3] = [Axis::X, Axis::Y, Axis::Z];

    /// Position of the axis in `[x, y, z]` arrays.
    pub fn index(self) -> usize {
        match self {
            Axis::X => 0,
            Axis::Y => 1,
            Axis::Z => 2,
        }
    }

    /// The axis stored at `index` in `[x, y, z]` arrays.
    pub fn from_index(index: usize) -> Option<Axis> {
        Axis::ALL.get(index).copied()
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Axis::X => "x",
            Axis::Y => "y",
            Axis::Z => "z",
        };
        f.write_str(name)
    }
}

/// Which end of an axis a face sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    /// The face at `-l/2`.
    Lower,
    /// The face at `+l/2`.
    Upper,
}

/// One face of the bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Face {
    pub axis: Axis,
    pub side: Side,
}

/// A validated 1D, 2D or 3D rectangular domain.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Geometry {
    dimension: usize,
    lx: f64,
    ly: Option<f64>,
    lz: Option<f64>,
}

impl Geometry {
    /// Validate a dimension and its required lengths.
    ///
    /// Lengths beyond the dimension are ignored and stored as `None`.
    pub fn new(
        dimension: usize,
        lx: Option<f64>,
        ly: Option<f64>,
        lz: Option<f64>,
    ) -> Result<Self, GeometryError> {
        if !(1..=3).contains(&dimension) {
            return Err(GeometryError::InvalidDimension(dimension));
        }

        let given = [lx, ly, lz];
        let mut lengths = [None; 3];
        for axis in &Axis::ALL[..dimension] {
            let value = given[axis.index()].ok_or(GeometryError::MissingLength { axis: *axis })?;
            lengths[axis.index()] = Some(check_length(*axis, value)?);
        }

        Ok(Self {
            dimension,
            lx: lengths[0].ok_or(GeometryError::MissingLength { axis: Axis::X })?,
            ly: lengths[1],
            lz: lengths[2],
        })
    }

    /// A line of length `lx`.
    pub fn line(lx: f64) -> Result<Self, GeometryError> {
        Self::new(1, Some(lx), None, None)
    }

    /// A rectangle of size `lx × ly`.
    pub fn rectangle(lx: f64, ly: f64) -> Result<Self, GeometryError> {
        Self::new(2, Some(lx), Some(ly), None)
    }

    /// A block of size `lx × ly × lz`.
    pub fn block(lx: f64, ly: f64, lz: f64) -> Result<Self, GeometryError> {
        Self::new(3, Some(lx), Some(ly), Some(lz))
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// `line`, `rectangle` or `block`.
    pub fn name(&self) -> &'static str {
        match self.dimension {
            1 => "line",
            2 => "rectangle",
            _ => "block",
        }
    }

    /// Side length along `axis`, or `None` when the axis is unused.
    pub fn length(&self, axis: Axis) -> Option<f64> {
        match axis {
            Axis::X => Some(self.lx),
            Axis::Y => self.ly,
            Axis::Z => self.lz,
        }
    }

    /// The axes spanned by this domain.
    pub fn axes(&self) -> &'static [Axis] {
        &Axis::ALL[..self.dimension]
    }

    /// The defined side lengths in x, y, z order.
    pub fn lengths(&self) -> Vec<f64> {
        self.axes().iter().filter_map(|&a| self.length(a)).collect()
    }

    /// The longest side length.
    pub fn max_length(&self) -> f64 {
        self.lengths().into_iter().fold(f64::NEG_INFINITY, f64::max)
    }

    /// Coordinate of `face` in the centred frame.
    pub fn face_position(&self, face: Face) -> Option<f64> {
        let half = 0.5 * self.length(face.axis)?;
        Some(match face.side {
            Side::Lower => -half,
            Side::Upper => half,
        })
    }
}

fn check_length(axis: Axis, value: f64) -> Result<f64, GeometryError> {
    if !value.is_finite() {
        return Err(GeometryError::NonFiniteLength { axis, value });
    }
    if value <= 0.0 {
        return Err(GeometryError::NonPositiveLength { axis, value });
    }
    Ok(value)
}
