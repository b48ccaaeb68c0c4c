//! Initial, boundary and source conditions.
//!
//! Every type here is validated on construction. Parameters a family needs
//! must be present and finite. Once any axis is Robin, every axis needs
//! `k1 < 0` and `k2 > 0`; without a Robin axis the coefficients are ignored.
//! Whether the series engine can actually evaluate a given combination is a
//! separate question answered by the solver, which reports unsupported
//! combinations instead of guessing.

use heat_geometry::Axis;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{BoundaryType, FunctionFamily, ParseEnumError};

/// Validation errors for condition types.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConditionError {
    #[error("{field} must be a finite number, got {value}")]
    NonFinite { field: String, value: f64 },

    #[error("{field} must be positive, got {value}")]
    NonPositive { field: String, value: f64 },

    #[error("{field} is required by the {family} function")]
    MissingParameter { field: String, family: FunctionFamily },

    #[error("the {family} function cannot describe a {usage}")]
    FamilyNotAllowed { family: FunctionFamily, usage: &'static str },

    #[error("{field} is required by the robin boundary on the {axis} axis")]
    MissingRobinCoefficient { field: String, axis: Axis },

    #[error("k1 must be negative, got {value} on the {axis} axis")]
    RobinK1 { axis: Axis, value: f64 },

    #[error("k2 must be positive, got {value} on the {axis} axis")]
    RobinK2 { axis: Axis, value: f64 },

    #[error("source location component {value} lies outside [-1/2, 1/2]")]
    LocationOutOfRange { value: f64 },

    #[error("expected {expected} per-axis entries, found {found}")]
    AxisCount { expected: usize, found: usize },

    #[error(transparent)]
    Parse(#[from] ParseEnumError),
}

impl ConditionError {
    /// Name of the offending field, when the error concerns a single one.
    pub fn field(&self) -> Option<String> {
        match self {
            ConditionError::NonFinite { field, .. }
            | ConditionError::NonPositive { field, .. }
            | ConditionError::MissingParameter { field, .. }
            | ConditionError::MissingRobinCoefficient { field, .. } => Some(field.clone()),
            ConditionError::RobinK1 { .. } => Some("k1".into()),
            ConditionError::RobinK2 { .. } => Some("k2".into()),
            ConditionError::LocationOutOfRange { .. } => Some("location".into()),
            _ => None,
        }
    }

    /// The axis the error concerns, for the Robin coefficient checks.
    pub fn axis(&self) -> Option<Axis> {
        match *self {
            ConditionError::MissingRobinCoefficient { axis, .. }
            | ConditionError::RobinK1 { axis, .. }
            | ConditionError::RobinK2 { axis, .. } => Some(axis),
            _ => None,
        }
    }
}

fn finite(field: &str, value: f64) -> Result<f64, ConditionError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(ConditionError::NonFinite {
            field: field.to_string(),
            value,
        })
    }
}

fn positive(field: &str, value: f64) -> Result<f64, ConditionError> {
    if finite(field, value)? > 0.0 {
        Ok(value)
    } else {
        Err(ConditionError::NonPositive {
            field: field.to_string(),
            value,
        })
    }
}

fn required(field: &str, family: FunctionFamily, value: Option<f64>) -> Result<f64, ConditionError> {
    let value = value.ok_or_else(|| ConditionError::MissingParameter {
        field: field.to_string(),
        family,
    })?;
    finite(field, value)
}

/// Spatial shape of the initial temperature along one axis, in terms of
/// the normalised position `s = x / l` with `s ∈ [0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "function", rename_all = "lowercase")]
pub enum Profile {
    /// `1`
    Uniform,
    /// `s - b`
    Linear { b: f64 },
    /// `exp(-(s - b) / c)` with `c > 0`
    Exponential { b: f64, c: f64 },
    /// `exp(-(s - b)² / (2c²))` with `c > 0`
    Gaussian { b: f64, c: f64 },
}

impl Profile {
    /// Validate the parameters a family needs; unused parameters are ignored.
    pub fn new(family: FunctionFamily, b: Option<f64>, c: Option<f64>) -> Result<Self, ConditionError> {
        Ok(match family {
            FunctionFamily::Uniform => Profile::Uniform,
            FunctionFamily::Linear => Profile::Linear {
                b: required("b", family, b)?,
            },
            FunctionFamily::Exponential => Profile::Exponential {
                b: required("b", family, b)?,
                c: positive("c", required("c", family, c)?)?,
            },
            FunctionFamily::Gaussian => Profile::Gaussian {
                b: required("b", family, b)?,
                c: positive("c", required("c", family, c)?)?,
            },
        })
    }

    pub fn family(&self) -> FunctionFamily {
        match self {
            Profile::Uniform => FunctionFamily::Uniform,
            Profile::Linear { .. } => FunctionFamily::Linear,
            Profile::Exponential { .. } => FunctionFamily::Exponential,
            Profile::Gaussian { .. } => FunctionFamily::Gaussian,
        }
    }

    /// Value of the shape at normalised position `s`.
    pub fn shape(&self, s: f64) -> f64 {
        match *self {
            Profile::Uniform => 1.0,
            Profile::Linear { b } => s - b,
            Profile::Exponential { b, c } => (-(s - b) / c).exp(),
            Profile::Gaussian { b, c } => (-(s - b).powi(2) / (2.0 * c * c)).exp(),
        }
    }
}

/// A prescribed value that may change with time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "function", rename_all = "lowercase")]
pub enum TimeFunction {
    /// `a`
    Uniform { a: f64 },
    /// `a·t + b`
    Linear { a: f64, b: f64 },
    /// `a·exp(-t / b)` with `b > 0`
    Exponential { a: f64, b: f64 },
}

impl TimeFunction {
    /// Validate a time function. `usage` names what it describes in errors.
    pub fn new(
        family: FunctionFamily,
        a: f64,
        b: Option<f64>,
        usage: &'static str,
    ) -> Result<Self, ConditionError> {
        let a = finite("a", a)?;
        Ok(match family {
            FunctionFamily::Uniform => TimeFunction::Uniform { a },
            FunctionFamily::Linear => TimeFunction::Linear {
                a,
                b: required("b", family, b)?,
            },
            FunctionFamily::Exponential => TimeFunction::Exponential {
                a,
                b: positive("b", required("b", family, b)?)?,
            },
            FunctionFamily::Gaussian => {
                return Err(ConditionError::FamilyNotAllowed { family, usage });
            }
        })
    }

    /// A constant value.
    pub fn constant(a: f64) -> Self {
        TimeFunction::Uniform { a }
    }

    pub fn family(&self) -> FunctionFamily {
        match self {
            TimeFunction::Uniform { .. } => FunctionFamily::Uniform,
            TimeFunction::Linear { .. } => FunctionFamily::Linear,
            TimeFunction::Exponential { .. } => FunctionFamily::Exponential,
        }
    }

    /// The `a` parameter.
    pub fn amplitude(&self) -> f64 {
        match *self {
            TimeFunction::Uniform { a } | TimeFunction::Linear { a, .. } | TimeFunction::Exponential { a, .. } => a,
        }
    }

    pub fn is_constant(&self) -> bool {
        matches!(self, TimeFunction::Uniform { .. })
    }

    pub fn value_at(&self, t: f64) -> f64 {
        match *self {
            TimeFunction::Uniform { a } => a,
            TimeFunction::Linear { a, b } => a * t + b,
            TimeFunction::Exponential { a, b } => a * (-t / b).exp(),
        }
    }
}

/// Initial temperature `a · Π_i profile_i(x_i / l_i)`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InitialCondition {
    a: f64,
    profiles: Vec<Profile>,
}

impl InitialCondition {
    pub fn new(a: f64, profiles: Vec<Profile>) -> Result<Self, ConditionError> {
        Ok(Self {
            a: finite("a", a)?,
            profiles,
        })
    }

    /// A uniform temperature `a` over a `dimension`-dimensional domain.
    pub fn uniform(a: f64, dimension: usize) -> Result<Self, ConditionError> {
        Self::new(a, vec![Profile::Uniform; dimension])
    }

    pub fn amplitude(&self) -> f64 {
        self.a
    }

    pub fn profiles(&self) -> &[Profile] {
        &self.profiles
    }

    pub fn profile(&self, axis: Axis) -> Option<&Profile> {
        self.profiles.get(axis.index())
    }
}

/// Conditions on the two faces normal to one axis.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AxisBoundary {
    axis: Axis,
    kind: BoundaryType,
    lower: TimeFunction,
    upper: TimeFunction,
    k1: Option<f64>,
    k2: Option<f64>,
}

impl AxisBoundary {
    /// One axis pair. The Robin coefficients are checked by
    /// [`BoundaryCondition::new`], which sees every axis.
    pub fn new(
        axis: Axis,
        kind: BoundaryType,
        lower: TimeFunction,
        upper: TimeFunction,
        k1: Option<f64>,
        k2: Option<f64>,
    ) -> Self {
        Self {
            axis,
            kind,
            lower,
            upper,
            k1,
            k2,
        }
    }

    /// Constant Dirichlet values `a1` at `-l/2` and `a2` at `+l/2`.
    pub fn dirichlet(axis: Axis, a1: f64, a2: f64) -> Result<Self, ConditionError> {
        Ok(Self::new(
            axis,
            BoundaryType::Dirichlet,
            TimeFunction::Uniform { a: finite("a1", a1)? },
            TimeFunction::Uniform { a: finite("a2", a2)? },
            None,
            None,
        ))
    }

    pub fn axis(&self) -> Axis {
        self.axis
    }

    pub fn kind(&self) -> BoundaryType {
        self.kind
    }

    /// Condition on the face at `-l/2`.
    pub fn lower(&self) -> &TimeFunction {
        &self.lower
    }

    /// Condition on the face at `+l/2`.
    pub fn upper(&self) -> &TimeFunction {
        &self.upper
    }

    pub fn k1(&self) -> Option<f64> {
        self.k1
    }

    pub fn k2(&self) -> Option<f64> {
        self.k2
    }
}

/// Boundary conditions for every axis of a domain.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BoundaryCondition {
    axes: Vec<AxisBoundary>,
}

impl BoundaryCondition {
    /// Collect the axis pairs.
    ///
    /// When any axis is Robin, every axis must carry `k1 < 0` and `k2 > 0`.
    /// All `k1` values are checked before any `k2`.
    pub fn new(axes: Vec<AxisBoundary>) -> Result<Self, ConditionError> {
        if axes.iter().any(|b| b.kind == BoundaryType::Robin) {
            for b in &axes {
                match b.k1 {
                    None => {
                        return Err(ConditionError::MissingRobinCoefficient {
                            field: "k1".into(),
                            axis: b.axis,
                        })
                    }
                    Some(value) if !(value.is_finite() && value < 0.0) => {
                        return Err(ConditionError::RobinK1 { axis: b.axis, value })
                    }
                    Some(_) => {}
                }
            }
            for b in &axes {
                match b.k2 {
                    None => {
                        return Err(ConditionError::MissingRobinCoefficient {
                            field: "k2".into(),
                            axis: b.axis,
                        })
                    }
                    Some(value) if !(value.is_finite() && value > 0.0) => {
                        return Err(ConditionError::RobinK2 { axis: b.axis, value })
                    }
                    Some(_) => {}
                }
            }
        }
        Ok(Self { axes })
    }

    /// The same constant Dirichlet pair on every axis.
    pub fn dirichlet(dimension: usize, a1: f64, a2: f64) -> Result<Self, ConditionError> {
        let axes = Axis::ALL[..dimension.min(3)]
            .iter()
            .map(|&axis| AxisBoundary::dirichlet(axis, a1, a2))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { axes })
    }

    pub fn axes(&self) -> &[AxisBoundary] {
        &self.axes
    }

    pub fn axis(&self, axis: Axis) -> Option<&AxisBoundary> {
        self.axes.iter().find(|b| b.axis == axis)
    }
}

/// A volumetric heat source with time dependence `Q(t)`.
///
/// Without a width the source fills the whole domain. With `fwhm` it is
/// localised around `location` (each component in units of the side
/// length, within `[-1/2, 1/2]`).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceTerm {
    function: TimeFunction,
    location: [f64; 3],
    fwhm: Option<f64>,
}

impl SourceTerm {
    pub fn new(function: TimeFunction, location: [f64; 3], fwhm: Option<f64>) -> Result<Self, ConditionError> {
        for &value in &location {
            if !(value.is_finite() && value.abs() <= 0.5) {
                return Err(ConditionError::LocationOutOfRange { value });
            }
        }
        let fwhm = fwhm.map(|w| positive("fwhm", w)).transpose()?;
        Ok(Self {
            function,
            location,
            fwhm,
        })
    }

    /// A constant source filling the domain.
    pub fn uniform(a: f64) -> Result<Self, ConditionError> {
        Self::new(TimeFunction::Uniform { a: finite("a", a)? }, [0.0; 3], None)
    }

    /// No source at all.
    pub fn none() -> Self {
        Self {
            function: TimeFunction::Uniform { a: 0.0 },
            location: [0.0; 3],
            fwhm: None,
        }
    }

    pub fn function(&self) -> &TimeFunction {
        &self.function
    }

    pub fn location(&self) -> [f64; 3] {
        self.location
    }

    pub fn fwhm(&self) -> Option<f64> {
        self.fwhm
    }

    /// True when the source contributes nothing at any time.
    pub fn is_zero(&self) -> bool {
        match *self.function() {
            TimeFunction::Uniform { a } | TimeFunction::Exponential { a, .. } => a == 0.0,
            TimeFunction::Linear { a, b } => a == 0.0 && b == 0.0,
        }
    }
}
