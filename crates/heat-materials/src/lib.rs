//! # Heat Materials
//!
//! Thermal properties of homogeneous materials. Every material implements
//! the [`ThermalProperties`](provider::ThermalProperties) trait, which
//! derives the thermal diffusivity $\alpha = k / (\rho c_p)$ from density,
//! conductivity and specific heat.
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`provider`] | `ThermalProperties` trait and `MaterialError` |
//! | [`material`] | validated `Material` value |
//! | [`library`] | room-temperature presets (copper, aluminium, steel, ...) |

pub mod library;
pub mod material;
pub mod provider;

pub use material::Material;
pub use provider::{MaterialError, ThermalProperties};
