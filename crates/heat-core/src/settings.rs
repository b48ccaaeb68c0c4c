//! Raw simulation settings and their validation.
//!
//! [`Settings`] mirrors what a user writes in a job file: numbers and
//! names, grouped as `geometry`, `mesh`, `material`, `initial`, `source`
//! and `boundary`. Each group converts into its validated domain object;
//! the first problem is reported as a [`SettingsError`] naming the group
//! and the field.
//!
//! Per-axis lists (`initial.axes`, `boundary.axes`) hold either one entry
//! per axis or a single entry that applies to every axis.

use std::fmt;

use heat_geometry::{Axis, Geometry, GeometryError, MeshSize};
use heat_materials::{library, Material, MaterialError};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::conditions::{
    AxisBoundary, BoundaryCondition, ConditionError, InitialCondition, Profile, SourceTerm, TimeFunction,
};
use crate::types::{BoundaryType, FunctionFamily};

/// The six settings groups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SettingsGroup {
    Geometry,
    Mesh,
    Material,
    Initial,
    Source,
    Boundary,
}

impl fmt::Display for SettingsGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SettingsGroup::Geometry => "geometry",
            SettingsGroup::Mesh => "mesh",
            SettingsGroup::Material => "material",
            SettingsGroup::Initial => "initial",
            SettingsGroup::Source => "source",
            SettingsGroup::Boundary => "boundary",
        };
        f.write_str(name)
    }
}

/// A settings value that cannot be turned into a domain object.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("invalid {group} settings ({field}): {message}")]
pub struct SettingsError {
    pub group: SettingsGroup,
    pub field: String,
    pub message: String,
}

impl SettingsError {
    fn new(group: SettingsGroup, field: impl Into<String>, message: impl fmt::Display) -> Self {
        Self {
            group,
            field: field.into(),
            message: message.to_string(),
        }
    }

    fn from_geometry(group: SettingsGroup, err: GeometryError) -> Self {
        let field = match &err {
            GeometryError::InvalidDimension(_) => "dimension".to_string(),
            GeometryError::MissingLength { axis }
            | GeometryError::NonFiniteLength { axis, .. }
            | GeometryError::NonPositiveLength { axis, .. } => format!("l{axis}"),
            GeometryError::InvalidMeshSize(_) => "size".to_string(),
        };
        Self::new(group, field, err)
    }

    fn from_condition(group: SettingsGroup, prefix: &str, err: ConditionError) -> Self {
        let field = match err.field() {
            Some(field) => format!("{prefix}{field}"),
            None => prefix.trim_end_matches('.').to_string(),
        };
        Self::new(group, field, err)
    }
}

/// Complete raw settings.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub geometry: GeometrySettings,
    pub mesh: MeshSettings,
    pub material: MaterialSettings,
    pub initial: InitialSettings,
    pub source: SourceSettings,
    pub boundary: BoundarySettings,
}

impl Settings {
    /// Check every group in order without keeping the results.
    pub fn validate(&self) -> Result<(), SettingsError> {
        let geometry = self.geometry.build()?;
        let dimension = geometry.dimension();
        self.mesh.build()?;
        self.material.build()?;
        self.initial.build(dimension)?;
        self.source.build()?;
        self.boundary.build(dimension)?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeometrySettings {
    pub dimension: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lx: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ly: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lz: Option<f64>,
}

impl Default for GeometrySettings {
    fn default() -> Self {
        Self {
            dimension: 2,
            lx: Some(1.0),
            ly: Some(1.0),
            lz: None,
        }
    }
}

impl GeometrySettings {
    pub fn build(&self) -> Result<Geometry, SettingsError> {
        Geometry::new(self.dimension, self.lx, self.ly, self.lz)
            .map_err(|e| SettingsError::from_geometry(SettingsGroup::Geometry, e))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MeshSettings {
    pub size: String,
}

impl Default for MeshSettings {
    fn default() -> Self {
        Self {
            size: MeshSize::Coarse.to_string(),
        }
    }
}

impl MeshSettings {
    pub fn build(&self) -> Result<MeshSize, SettingsError> {
        self.size
            .parse::<MeshSize>()
            .map_err(|e| SettingsError::from_geometry(SettingsGroup::Mesh, e))
    }
}

/// A named material. Missing properties come from the preset of that name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MaterialSettings {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rho: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub k: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cp: Option<f64>,
}

impl Default for MaterialSettings {
    fn default() -> Self {
        Self {
            name: "Copper".into(),
            rho: None,
            k: None,
            cp: None,
        }
    }
}

impl MaterialSettings {
    pub fn build(&self) -> Result<Material, SettingsError> {
        let invalid = |e: MaterialError| {
            let field = e.property().unwrap_or("name");
            SettingsError::new(SettingsGroup::Material, field, e)
        };

        if let (Some(rho), Some(k), Some(cp)) = (self.rho, self.k, self.cp) {
            return Material::new(self.name.as_str(), rho, k, cp).map_err(invalid);
        }

        let mut material = library::lookup(&self.name).map_err(|e| {
            SettingsError::new(
                SettingsGroup::Material,
                "name",
                format!("{e}; give rho, k and cp explicitly for a custom material"),
            )
        })?;
        if let Some(rho) = self.rho {
            material.set_rho(rho).map_err(invalid)?;
        }
        if let Some(k) = self.k {
            material.set_k(k).map_err(invalid)?;
        }
        if let Some(cp) = self.cp {
            material.set_cp(cp).map_err(invalid)?;
        }
        Ok(material)
    }
}

/// Spatial profile of the initial temperature along one axis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfileSettings {
    pub function: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub b: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub c: Option<f64>,
}

impl Default for ProfileSettings {
    fn default() -> Self {
        Self {
            function: FunctionFamily::Uniform.to_string(),
            b: None,
            c: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InitialSettings {
    /// Magnitude of the initial temperature.
    pub a: f64,
    /// Profiles per axis; empty means uniform.
    pub axes: Vec<ProfileSettings>,
}

impl Default for InitialSettings {
    fn default() -> Self {
        Self { a: 1.0, axes: Vec::new() }
    }
}

impl InitialSettings {
    pub fn build(&self, dimension: usize) -> Result<InitialCondition, SettingsError> {
        let group = SettingsGroup::Initial;
        let entries = per_axis(group, &self.axes, dimension)?;

        let mut profiles = Vec::with_capacity(dimension);
        for (i, entry) in entries.into_iter().enumerate() {
            let prefix = format!("axes[{i}].");
            let profile = entry
                .map(|p| {
                    let family = parse_family(group, &prefix, &p.function)?;
                    Profile::new(family, p.b, p.c).map_err(|e| SettingsError::from_condition(group, &prefix, e))
                })
                .transpose()?
                .unwrap_or(Profile::Uniform);
            profiles.push(profile);
        }

        InitialCondition::new(self.a, profiles).map_err(|e| SettingsError::from_condition(group, "", e))
    }
}

/// Volumetric source `Q(t)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceSettings {
    pub function: String,
    pub a: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub b: Option<f64>,
    /// Centre of a localised source, in units of the side lengths.
    pub location: [f64; 3],
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fwhm: Option<f64>,
}

impl Default for SourceSettings {
    fn default() -> Self {
        Self {
            function: FunctionFamily::Uniform.to_string(),
            a: 0.0,
            b: None,
            location: [0.0; 3],
            fwhm: None,
        }
    }
}

impl SourceSettings {
    pub fn build(&self) -> Result<SourceTerm, SettingsError> {
        let group = SettingsGroup::Source;
        let invalid = |e: ConditionError| {
            let field = match e.field() {
                Some(field) => field,
                None => "function".to_string(),
            };
            SettingsError::new(group, field, e)
        };
        let family = parse_family(group, "", &self.function)?;
        let function = TimeFunction::new(family, self.a, self.b, "source").map_err(invalid)?;
        SourceTerm::new(function, self.location, self.fwhm).map_err(invalid)
    }
}

/// The pair of faces normal to one axis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AxisBoundarySettings {
    #[serde(rename = "type")]
    pub kind: String,
    /// Time family of the lower face value.
    pub g1: String,
    /// Time family of the upper face value.
    pub g2: String,
    pub a1: f64,
    pub a2: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub b1: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub b2: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub k1: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub k2: Option<f64>,
}

impl Default for AxisBoundarySettings {
    fn default() -> Self {
        Self {
            kind: BoundaryType::Dirichlet.to_string(),
            g1: FunctionFamily::Uniform.to_string(),
            g2: FunctionFamily::Uniform.to_string(),
            a1: 1.0,
            a2: 1.0,
            b1: None,
            b2: None,
            k1: None,
            k2: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoundarySettings {
    pub axes: Vec<AxisBoundarySettings>,
}

impl Default for BoundarySettings {
    fn default() -> Self {
        Self {
            axes: vec![AxisBoundarySettings::default()],
        }
    }
}

impl BoundarySettings {
    pub fn build(&self, dimension: usize) -> Result<BoundaryCondition, SettingsError> {
        let group = SettingsGroup::Boundary;
        if self.axes.is_empty() {
            return Err(SettingsError::new(group, "axes", "at least one boundary entry is required"));
        }
        let entries = per_axis(group, &self.axes, dimension)?;

        let mut axes = Vec::with_capacity(dimension);
        for (i, entry) in entries.into_iter().enumerate() {
            let prefix = format!("axes[{i}].");
            let Some(entry) = entry else { continue };
            let axis = Axis::from_index(i)
                .ok_or_else(|| SettingsError::new(group, "axes", format!("no axis with index {i}")))?;
            let kind = entry
                .kind
                .parse::<BoundaryType>()
                .map_err(|e| SettingsError::new(group, format!("{prefix}type"), e))?;
            let lower = face_function(group, &prefix, "1", &entry.g1, entry.a1, entry.b1)?;
            let upper = face_function(group, &prefix, "2", &entry.g2, entry.a2, entry.b2)?;
            axes.push(AxisBoundary::new(axis, kind, lower, upper, entry.k1, entry.k2));
        }
        BoundaryCondition::new(axes).map_err(|e| {
            let prefix = match e.axis() {
                Some(axis) => format!("axes[{}].", axis.index()),
                None => "axes.".to_string(),
            };
            SettingsError::from_condition(group, &prefix, e)
        })
    }
}

/// Time function of one face, with fields suffixed by the face number.
fn face_function(
    group: SettingsGroup,
    prefix: &str,
    face: &str,
    function: &str,
    a: f64,
    b: Option<f64>,
) -> Result<TimeFunction, SettingsError> {
    let family = function
        .parse::<FunctionFamily>()
        .map_err(|e| SettingsError::new(group, format!("{prefix}g{face}"), e))?;
    TimeFunction::new(family, a, b, "boundary value").map_err(|e| {
        let field = match e.field() {
            Some(field) => format!("{prefix}{field}{face}"),
            None => format!("{prefix}g{face}"),
        };
        SettingsError::new(group, field, e)
    })
}

fn parse_family(group: SettingsGroup, prefix: &str, name: &str) -> Result<FunctionFamily, SettingsError> {
    name.parse::<FunctionFamily>()
        .map_err(|e| SettingsError::new(group, format!("{prefix}function"), e))
}

/// Spread a per-axis list over `dimension` axes: empty means every axis is
/// `None`, a single entry is repeated.
fn per_axis<T>(group: SettingsGroup, entries: &[T], dimension: usize) -> Result<Vec<Option<&T>>, SettingsError> {
    match entries.len() {
        0 => Ok(vec![None; dimension]),
        1 => Ok(vec![Some(&entries[0]); dimension]),
        n if n == dimension => Ok(entries.iter().map(Some).collect()),
        n => Err(SettingsError::new(
            group,
            "axes",
            ConditionError::AxisCount {
                expected: dimension,
                found: n,
            },
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let settings = Settings::default();
        settings.validate().unwrap();
        let geometry = settings.geometry.build().unwrap();
        assert_eq!(geometry.name(), "rectangle");
        assert_eq!(settings.material.build().unwrap().alpha(), Material::copper().alpha());
        let boundary = settings.boundary.build(2).unwrap();
        assert_eq!(boundary.axes().len(), 2);
        assert_eq!(boundary.axis(Axis::Y).unwrap().upper().amplitude(), 1.0);
        assert!(settings.source.build().unwrap().is_zero());
    }

    #[test]
    fn test_missing_length_names_field() {
        let settings = GeometrySettings {
            dimension: 3,
            lz: None,
            ..Default::default()
        };
        let err = settings.build().unwrap_err();
        assert_eq!(err.group, SettingsGroup::Geometry);
        assert_eq!(err.field, "lz");
        assert!(err.to_string().starts_with("invalid geometry settings (lz)"));
    }

    #[test]
    fn test_mesh_size_is_checked() {
        let err = MeshSettings { size: "huge".into() }.build().unwrap_err();
        assert_eq!((err.group, err.field.as_str()), (SettingsGroup::Mesh, "size"));
        assert_eq!(MeshSettings { size: "Fine".into() }.build(), Ok(MeshSize::Fine));
    }

    #[test]
    fn test_material_preset_fills_gaps() {
        let settings = MaterialSettings {
            name: "aluminium".into(),
            rho: None,
            k: Some(200.0),
            cp: None,
        };
        let material = settings.build().unwrap();
        assert_eq!((material.rho(), material.k(), material.cp()), (2700.0, 200.0, 897.0));

        let unknown = MaterialSettings {
            name: "unobtainium".into(),
            rho: None,
            k: None,
            cp: None,
        };
        assert_eq!(unknown.build().unwrap_err().field, "name");

        let negative = MaterialSettings {
            cp: Some(-1.0),
            ..Default::default()
        };
        assert_eq!(negative.build().unwrap_err().field, "cp");
    }

    #[test]
    fn test_initial_profile_errors_name_axis() {
        let settings = InitialSettings {
            a: 20.0,
            axes: vec![
                ProfileSettings::default(),
                ProfileSettings {
                    function: "exponential".into(),
                    b: Some(0.0),
                    c: None,
                },
            ],
        };
        let err = settings.build(2).unwrap_err();
        assert_eq!(err.group, SettingsGroup::Initial);
        assert_eq!(err.field, "axes[1].c");

        let bad_family = InitialSettings {
            a: 1.0,
            axes: vec![ProfileSettings {
                function: "cubic".into(),
                ..Default::default()
            }],
        };
        assert_eq!(bad_family.build(3).unwrap_err().field, "axes[0].function");

        let wrong_count = InitialSettings {
            a: 1.0,
            axes: vec![ProfileSettings::default(); 2],
        };
        assert_eq!(wrong_count.build(3).unwrap_err().field, "axes");
    }

    #[test]
    fn test_single_entry_applies_to_every_axis() {
        let settings = InitialSettings {
            a: 5.0,
            axes: vec![ProfileSettings {
                function: "linear".into(),
                b: Some(0.5),
                c: None,
            }],
        };
        let initial = settings.build(3).unwrap();
        assert_eq!(initial.profiles(), &[Profile::Linear { b: 0.5 }; 3]);
    }

    #[test]
    fn test_robin_errors_name_field() {
        let robin = AxisBoundarySettings {
            kind: "robin".into(),
            k1: Some(0.5),
            k2: Some(2.0),
            ..Default::default()
        };
        // The Dirichlet x axis needs coefficients once y is Robin.
        let mut settings = BoundarySettings {
            axes: vec![AxisBoundarySettings::default(), robin],
        };
        let err = settings.build(2).unwrap_err();
        assert_eq!(err.group, SettingsGroup::Boundary);
        assert_eq!(err.field, "axes[0].k1");

        settings.axes[0].k1 = Some(-1.0);
        settings.axes[0].k2 = Some(1.0);
        assert_eq!(settings.build(2).unwrap_err().field, "axes[1].k1");
        settings.axes[1].k1 = Some(-0.5);
        assert!(settings.build(2).is_ok());

        let dirichlet = BoundarySettings {
            axes: vec![AxisBoundarySettings {
                k1: Some(0.0),
                k2: Some(-4.0),
                ..Default::default()
            }],
        };
        assert!(dirichlet.build(3).is_ok());

        let bad_type = BoundarySettings {
            axes: vec![AxisBoundarySettings {
                kind: "periodic".into(),
                ..Default::default()
            }],
        };
        assert_eq!(bad_type.build(1).unwrap_err().field, "axes[0].type");
    }

    #[test]
    fn test_boundary_face_function_fields() {
        let settings = BoundarySettings {
            axes: vec![AxisBoundarySettings {
                g2: "linear".into(),
                ..Default::default()
            }],
        };
        assert_eq!(settings.build(1).unwrap_err().field, "axes[0].b2");

        let gaussian = BoundarySettings {
            axes: vec![AxisBoundarySettings {
                g1: "gaussian".into(),
                ..Default::default()
            }],
        };
        assert_eq!(gaussian.build(1).unwrap_err().field, "axes[0].g1");
    }

    #[test]
    fn test_source_errors() {
        let err = SourceSettings {
            function: "gaussian".into(),
            a: 1.0,
            ..Default::default()
        }
        .build()
        .unwrap_err();
        assert_eq!((err.group, err.field.as_str()), (SettingsGroup::Source, "function"));

        let err = SourceSettings {
            a: 1.0,
            location: [0.7, 0.0, 0.0],
            ..Default::default()
        }
        .build()
        .unwrap_err();
        assert_eq!(err.field, "location");

        let decaying = SourceSettings {
            function: "exponential".into(),
            a: 2.0,
            b: Some(10.0),
            ..Default::default()
        }
        .build()
        .unwrap();
        assert_eq!(*decaying.function(), TimeFunction::Exponential { a: 2.0, b: 10.0 });
    }
}
