//! TOML configuration for simulation jobs.

use std::path::Path;

use anyhow::{bail, Context, Result};
use heat_core::settings::{
    BoundarySettings, GeometrySettings, InitialSettings, MaterialSettings, MeshSettings, Settings, SourceSettings,
};
use heat_core::SolverSettings;
use serde::{Deserialize, Serialize};

/// Top-level job configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobConfig {
    #[serde(default)]
    pub geometry: GeometrySettings,
    #[serde(default)]
    pub mesh: MeshSettings,
    #[serde(default)]
    pub material: MaterialSettings,
    #[serde(default)]
    pub initial: InitialSettings,
    #[serde(default)]
    pub source: SourceSettings,
    #[serde(default)]
    pub boundary: BoundarySettings,
    pub time: TimeSpec,
    #[serde(default)]
    pub solver: SolverSettings,
    #[serde(default)]
    pub output: OutputConfig,
}

impl Default for JobConfig {
    fn default() -> Self {
        let settings = Settings::default();
        Self {
            geometry: settings.geometry,
            mesh: settings.mesh,
            material: settings.material,
            initial: settings.initial,
            source: settings.source,
            boundary: settings.boundary,
            time: TimeSpec::Range {
                range: [0.0, 10.0],
                points: 11,
            },
            solver: SolverSettings::default(),
            output: OutputConfig::default(),
        }
    }
}

impl JobConfig {
    /// The six physical settings groups.
    pub fn settings(&self) -> Settings {
        Settings {
            geometry: self.geometry.clone(),
            mesh: self.mesh.clone(),
            material: self.material.clone(),
            initial: self.initial.clone(),
            source: self.source.clone(),
            boundary: self.boundary.clone(),
        }
    }

    /// Evaluation times in seconds.
    pub fn times(&self) -> Result<Vec<f64>> {
        let times = match &self.time {
            TimeSpec::Range { range, points } => {
                let [start, end] = *range;
                match *points {
                    0 => bail!("[time] points must be at least 1"),
                    1 => vec![start],
                    n => (0..n)
                        .map(|i| start + (end - start) * i as f64 / (n - 1) as f64)
                        .collect(),
                }
            }
            TimeSpec::List { values } => values.clone(),
        };
        if times.is_empty() {
            bail!("[time] lists no evaluation times");
        }
        if let Some(bad) = times.iter().find(|t| !(t.is_finite() && **t >= 0.0)) {
            bail!("[time] values must be finite and non-negative, got {bad}");
        }
        Ok(times)
    }
}

/// Time specification: either a range or explicit list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TimeSpec {
    Range { range: [f64; 2], points: usize },
    List { values: Vec<f64> },
}

/// Output configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Output directory (default: "./output").
    #[serde(default = "default_output_dir")]
    pub directory: String,
    /// Stem of every output file name (default: "heat").
    #[serde(default = "default_basename")]
    pub basename: String,
    /// One VTU file per time plus a PVD collection (default: true).
    #[serde(default = "default_true")]
    pub vtu: bool,
    /// Node table with one column per time (default: true).
    #[serde(default = "default_true")]
    pub csv: bool,
    /// The full field as JSON (default: false).
    #[serde(default)]
    pub json: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: default_output_dir(),
            basename: default_basename(),
            vtu: true,
            csv: true,
            json: false,
        }
    }
}

fn default_output_dir() -> String {
    "./output".into()
}
fn default_basename() -> String {
    "heat".into()
}
fn default_true() -> bool {
    true
}

/// Load and parse a TOML job configuration file.
pub fn load_config(path: &Path) -> Result<JobConfig> {
    let content =
        std::fs::read_to_string(path).with_context(|| format!("Cannot read configuration {}", path.display()))?;
    parse_config(&content).with_context(|| format!("Cannot parse configuration {}", path.display()))
}

pub fn parse_config(content: &str) -> Result<JobConfig> {
    Ok(toml::from_str(content)?)
}

/// The default job file, as written by `heat init`.
pub fn default_config_text() -> Result<String> {
    toml::to_string_pretty(&JobConfig::default()).context("Cannot serialise the default configuration")
}
