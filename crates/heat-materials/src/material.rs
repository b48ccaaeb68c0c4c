//! Homogeneous materials with validated properties.

use serde::Serialize;

use crate::provider::{check_property, MaterialError, ThermalProperties};

/// A homogeneous material described by density, conductivity and heat capacity.
///
/// The setters re-validate their input, so a `Material` never holds a
/// non-positive property and [`alpha`](Material::alpha) always reflects the
/// values currently stored.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Material {
    name: String,
    rho: f64,
    k: f64,
    cp: f64,
}

impl Material {
    /// Construct a material.
    ///
    /// # Arguments
    /// * `name` - Display name.
    /// * `rho` - Density (kg/m³).
    /// * `k` - Thermal conductivity (W/(m·K)).
    /// * `cp` - Specific heat capacity (J/(kg·K)).
    pub fn new(name: impl Into<String>, rho: f64, k: f64, cp: f64) -> Result<Self, MaterialError> {
        Ok(Self {
            name: name.into(),
            rho: check_property("rho", rho)?,
            k: check_property("k", k)?,
            cp: check_property("cp", cp)?,
        })
    }

    /// Copper, the default material.
    pub fn copper() -> Self {
        Self {
            name: "Copper".into(),
            rho: 8960.0,
            k: 401.0,
            cp: 385.0,
        }
    }

    pub fn rho(&self) -> f64 {
        self.rho
    }

    pub fn k(&self) -> f64 {
        self.k
    }

    pub fn cp(&self) -> f64 {
        self.cp
    }

    /// Thermal diffusivity `k / (rho * cp)`.
    pub fn alpha(&self) -> f64 {
        self.k / (self.rho * self.cp)
    }

    pub fn set_rho(&mut self, rho: f64) -> Result<(), MaterialError> {
        self.rho = check_property("rho", rho)?;
        Ok(())
    }

    pub fn set_k(&mut self, k: f64) -> Result<(), MaterialError> {
        self.k = check_property("k", k)?;
        Ok(())
    }

    pub fn set_cp(&mut self, cp: f64) -> Result<(), MaterialError> {
        self.cp = check_property("cp", cp)?;
        Ok(())
    }
}

impl Default for Material {
    fn default() -> Self {
        Self::copper()
    }
}

impl ThermalProperties for Material {
    fn name(&self) -> &str {
        &self.name
    }

    fn density(&self) -> f64 {
        self.rho
    }

    fn conductivity(&self) -> f64 {
        self.k
    }

    fn heat_capacity(&self) -> f64 {
        self.cp
    }

    fn diffusivity(&self) -> f64 {
        self.alpha()
    }
}
