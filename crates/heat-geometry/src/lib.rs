//! # Heat Geometry
//!
//! Domains and grids for the analytical heat solver. This crate provides:
//!
//! - **Domains** ([`domain`]): validated lines, rectangles and blocks
//!   centred at the origin, plus the [`Axis`](domain::Axis) and
//!   [`Face`](domain::Face) vocabulary shared by the other crates.
//! - **Structured meshes** ([`mesh`]): per-axis cell counts, node
//!   coordinates, VTK-ordered connectivity, and boundary node sets.

pub mod domain;
pub mod mesh;

pub use domain::{Axis, Face, Geometry, GeometryError, Side};
pub use mesh::{CellType, MeshSize, StructuredMesh};
