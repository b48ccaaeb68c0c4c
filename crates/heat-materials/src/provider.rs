//! Thermal property provider trait.
//!
//! Anything that can report a density, a conductivity and a specific heat
//! implements [`ThermalProperties`] and gets the thermal diffusivity for free.

use thiserror::Error;

/// Errors from material construction and lookup.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MaterialError {
    #[error("{property} must be a finite number, got {value}")]
    NonFinite { property: &'static str, value: f64 },

    #[error("{property} must be positive, got {value}")]
    NonPositive { property: &'static str, value: f64 },

    #[error("Material not found: {0}")]
    NotFound(String),
}

impl MaterialError {
    /// Short name of the offending property, if any.
    pub fn property(&self) -> Option<&'static str> {
        match self {
            MaterialError::NonFinite { property, .. } | MaterialError::NonPositive { property, .. } => {
                Some(*property)
            }
            MaterialError::NotFound(_) => None,
        }
    }
}

/// Provides the constant properties of a homogeneous material.
pub trait ThermalProperties: Send + Sync {
    /// Human-readable name of this material.
    fn name(&self) -> &str;

    /// Density $\rho$ (kg/m³).
    fn density(&self) -> f64;

    /// Thermal conductivity $k$ (W/(m·K)).
    fn conductivity(&self) -> f64;

    /// Specific heat capacity $c_p$ (J/(kg·K)).
    fn heat_capacity(&self) -> f64;

    /// Thermal diffusivity $\alpha = k / (\rho c_p)$ (m²/s).
    ///
    /// Computed from the current properties on every call.
    fn diffusivity(&self) -> f64 {
        self.conductivity() / (self.density() * self.heat_capacity())
    }
}

/// Check that a property is a positive finite number.
pub(crate) fn check_property(property: &'static str, value: f64) -> Result<f64, MaterialError> {
    if !value.is_finite() {
        return Err(MaterialError::NonFinite { property, value });
    }
    if value <= 0.0 {
        return Err(MaterialError::NonPositive { property, value });
    }
    Ok(value)
}
