//! A complete heat conduction problem.

use std::sync::Arc;

use heat_geometry::{Geometry, MeshSize, StructuredMesh};
use heat_materials::Material;
use ndarray::Array1;

use crate::conditions::{BoundaryCondition, ConditionError, InitialCondition, SourceTerm};
use crate::settings::{Settings, SettingsError, SettingsGroup};
use crate::solver::separable::SeparableSolver;
use crate::solver::{FieldSolver, SolverError};
use crate::types::{SolverSettings, TemperatureField};

/// Domain, mesh, material and conditions of one simulation.
///
/// The mesh shares the model's geometry. Every per-axis list holds exactly
/// one entry per axis of the geometry.
#[derive(Debug, Clone)]
pub struct Model {
    geometry: Arc<Geometry>,
    mesh: StructuredMesh,
    material: Material,
    initial: InitialCondition,
    boundary: BoundaryCondition,
    source: SourceTerm,
}

impl Model {
    pub fn new(
        geometry: Geometry,
        mesh_size: MeshSize,
        material: Material,
        initial: InitialCondition,
        boundary: BoundaryCondition,
        source: SourceTerm,
    ) -> Result<Self, ConditionError> {
        let dimension = geometry.dimension();
        check_count(dimension, initial.profiles().len())?;
        check_count(dimension, boundary.axes().len())?;
        for &axis in geometry.axes() {
            if boundary.axis(axis).is_none() {
                return Err(ConditionError::AxisCount {
                    expected: dimension,
                    found: boundary.axes().iter().filter(|b| geometry.axes().contains(&b.axis())).count(),
                });
            }
        }

        let geometry = Arc::new(geometry);
        let mesh = StructuredMesh::new(Arc::clone(&geometry), mesh_size);
        Ok(Self {
            geometry,
            mesh,
            material,
            initial,
            boundary,
            source,
        })
    }

    /// Validate every settings group, in order, and assemble the model.
    pub fn from_settings(settings: &Settings) -> Result<Self, SettingsError> {
        let geometry = settings.geometry.build()?;
        let dimension = geometry.dimension();
        let mesh_size = settings.mesh.build()?;
        let material = settings.material.build()?;
        let initial = settings.initial.build(dimension)?;
        let source = settings.source.build()?;
        let boundary = settings.boundary.build(dimension)?;

        Self::new(geometry, mesh_size, material, initial, boundary, source).map_err(|e| SettingsError {
            group: SettingsGroup::Boundary,
            field: "axes".into(),
            message: e.to_string(),
        })
    }

    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    pub fn mesh(&self) -> &StructuredMesh {
        &self.mesh
    }

    pub fn material(&self) -> &Material {
        &self.material
    }

    pub fn initial(&self) -> &InitialCondition {
        &self.initial
    }

    pub fn boundary(&self) -> &BoundaryCondition {
        &self.boundary
    }

    pub fn source(&self) -> &SourceTerm {
        &self.source
    }

    /// Temperature at every node for each of `times`, using the series solver.
    pub fn solve(&self, times: &[f64], settings: &SolverSettings) -> Result<TemperatureField, SolverError> {
        SeparableSolver::new(*settings).solve(self, times)
    }

    /// Temperature at every node at a single time.
    pub fn solve_at(&self, t: f64, settings: &SolverSettings) -> Result<Array1<f64>, SolverError> {
        let field = self.solve(&[t], settings)?;
        Ok(field.values.row(0).to_owned())
    }
}

fn check_count(expected: usize, found: usize) -> Result<(), ConditionError> {
    if expected == found {
        Ok(())
    } else {
        Err(ConditionError::AxisCount { expected, found })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use heat_geometry::Axis;

    use crate::conditions::AxisBoundary;

    fn line_model(boundary: BoundaryCondition) -> Result<Model, ConditionError> {
        Model::new(
            Geometry::line(1.0).unwrap(),
            MeshSize::Coarse,
            Material::copper(),
            InitialCondition::uniform(1.0, 1).unwrap(),
            boundary,
            SourceTerm::none(),
        )
    }

    #[test]
    fn test_axis_counts_are_checked() {
        assert!(line_model(BoundaryCondition::dirichlet(1, 0.0, 0.0).unwrap()).is_ok());
        let err = line_model(BoundaryCondition::dirichlet(2, 0.0, 0.0).unwrap()).unwrap_err();
        assert_eq!(err, ConditionError::AxisCount { expected: 1, found: 2 });
        let wrong_axis = BoundaryCondition::new(vec![AxisBoundary::dirichlet(Axis::Y, 0.0, 0.0).unwrap()]).unwrap();
        assert!(line_model(wrong_axis).is_err());
    }

    #[test]
    fn test_mesh_shares_geometry() {
        let model = Model::from_settings(&Settings::default()).unwrap();
        assert!(std::ptr::eq(model.geometry(), model.mesh().geometry()));
        assert_eq!(model.mesh().num_nodes(), 121);
    }

    #[test]
    fn test_solve_at_has_one_value_per_node() {
        let model = Model::from_settings(&Settings::default()).unwrap();
        let settings = SolverSettings::default();
        let values = model.solve_at(0.5, &settings).unwrap();
        assert_eq!(values.len(), model.mesh().num_nodes());
        let field = model.solve(&[0.0, 0.5], &settings).unwrap();
        assert_eq!(field.values.dim(), (2, 121));
        assert_eq!(field.snapshot(1).unwrap(), values.view());
    }
}
