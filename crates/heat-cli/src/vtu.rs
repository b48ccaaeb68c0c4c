//! VTK XML output for temperature fields.
//!
//! Each time step becomes one UnstructuredGrid file (`.vtu`) holding the
//! mesh points, cells and a `Temperature` point array. A ParaView collection
//! (`.pvd`) ties the steps together. The settings that produced a field are
//! embedded as a JSON comment after the XML declaration so that
//! [`read_vtu`] can recover them.

use std::fmt::Display;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use heat_core::{Settings, TemperatureField};
use heat_geometry::StructuredMesh;
use thiserror::Error;

/// Error type for VTK operations.
#[derive(Debug, Error)]
pub enum VtkError {
    #[error("VTK I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("settings header: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{expected} values expected, found {found}")]
    Length { expected: usize, found: usize },

    #[error("malformed VTU file: {0}")]
    Format(String),
}

const SETTINGS_TAG: &str = "heat-settings";

/// VTK XML writer helper.
struct VtkWriter<W: Write> {
    writer: BufWriter<W>,
    indent: usize,
}

impl<W: Write> VtkWriter<W> {
    fn new(writer: W) -> Self {
        Self {
            writer: BufWriter::new(writer),
            indent: 0,
        }
    }

    fn write_indent(&mut self) -> std::io::Result<()> {
        for _ in 0..self.indent {
            write!(self.writer, "  ")?;
        }
        Ok(())
    }

    fn write_header(&mut self, kind: &str, settings: Option<&str>) -> std::io::Result<()> {
        writeln!(self.writer, "<?xml version=\"1.0\"?>")?;
        if let Some(json) = settings {
            writeln!(self.writer, "<!-- {SETTINGS_TAG}")?;
            writeln!(self.writer, "{json}")?;
            writeln!(self.writer, "-->")?;
        }
        writeln!(
            self.writer,
            "<VTKFile type=\"{kind}\" version=\"0.1\" byte_order=\"LittleEndian\">"
        )?;
        self.indent += 1;
        Ok(())
    }

    fn write_footer(&mut self) -> std::io::Result<()> {
        self.indent -= 1;
        writeln!(self.writer, "</VTKFile>")?;
        self.writer.flush()
    }

    fn start_element(&mut self, name: &str, attrs: &[(&str, String)]) -> std::io::Result<()> {
        self.write_indent()?;
        write!(self.writer, "<{name}")?;
        for (key, value) in attrs {
            write!(self.writer, " {key}=\"{value}\"")?;
        }
        writeln!(self.writer, ">")?;
        self.indent += 1;
        Ok(())
    }

    fn empty_element(&mut self, name: &str, attrs: &[(&str, String)]) -> std::io::Result<()> {
        self.write_indent()?;
        write!(self.writer, "<{name}")?;
        for (key, value) in attrs {
            write!(self.writer, " {key}=\"{value}\"")?;
        }
        writeln!(self.writer, "/>")
    }

    fn end_element(&mut self, name: &str) -> std::io::Result<()> {
        self.indent -= 1;
        self.write_indent()?;
        writeln!(self.writer, "</{name}>")
    }

    /// One ascii `DataArray`, `per_line` values to a line.
    fn write_data_array<T: Display>(
        &mut self,
        ty: &str,
        name: &str,
        components: usize,
        data: &[T],
        per_line: usize,
    ) -> std::io::Result<()> {
        self.write_indent()?;
        write!(self.writer, "<DataArray type=\"{ty}\" Name=\"{name}\"")?;
        if components > 1 {
            write!(self.writer, " NumberOfComponents=\"{components}\"")?;
        }
        writeln!(self.writer, " format=\"ascii\">")?;

        self.indent += 1;
        for chunk in data.chunks(per_line) {
            self.write_indent()?;
            for (i, v) in chunk.iter().enumerate() {
                if i > 0 {
                    write!(self.writer, " ")?;
                }
                write!(self.writer, "{v}")?;
            }
            writeln!(self.writer)?;
        }
        self.indent -= 1;

        self.write_indent()?;
        writeln!(self.writer, "</DataArray>")
    }
}

/// Shortest text that parses back to the same `f64`.
struct Exact(f64);

impl Display for Exact {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:e}", self.0)
    }
}

/// Settings as JSON safe to embed in an XML comment.
fn settings_comment(settings: &Settings) -> Result<String, VtkError> {
    let json = serde_json::to_string_pretty(settings)?;
    // "--" may not appear inside a comment; outside strings JSON never has it.
    Ok(json.replace("--", "-\\u002d"))
}

/// Write one time step of a field as a `.vtu` file.
pub fn write_vtu(
    path: &Path,
    mesh: &StructuredMesh,
    temperature: &[f64],
    time: f64,
    settings: Option<&Settings>,
) -> Result<(), VtkError> {
    if temperature.len() != mesh.num_nodes() {
        return Err(VtkError::Length {
            expected: mesh.num_nodes(),
            found: temperature.len(),
        });
    }
    let comment = settings.map(settings_comment).transpose()?;

    let mut w = VtkWriter::new(File::create(path)?);
    w.write_header("UnstructuredGrid", comment.as_deref())?;
    w.start_element("UnstructuredGrid", &[])?;

    w.start_element("FieldData", &[])?;
    w.write_data_array("Float64", "TimeValue", 1, &[Exact(time)], 1)?;
    w.end_element("FieldData")?;

    w.start_element(
        "Piece",
        &[
            ("NumberOfPoints", mesh.num_nodes().to_string()),
            ("NumberOfCells", mesh.num_cells().to_string()),
        ],
    )?;

    w.start_element("PointData", &[("Scalars", "Temperature".to_string())])?;
    let values: Vec<Exact> = temperature.iter().map(|&t| Exact(t)).collect();
    w.write_data_array("Float64", "Temperature", 1, &values, 6)?;
    w.end_element("PointData")?;

    w.start_element("Points", &[])?;
    let points: Vec<Exact> = mesh.points().iter().flatten().map(|&c| Exact(c)).collect();
    w.write_data_array("Float64", "Points", 3, &points, 6)?;
    w.end_element("Points")?;

    w.start_element("Cells", &[])?;
    w.write_data_array("Int64", "connectivity", 1, mesh.connectivity(), 16)?;
    w.write_data_array("Int64", "offsets", 1, &mesh.offsets(), 16)?;
    w.write_data_array("UInt8", "types", 1, &mesh.types(), 32)?;
    w.end_element("Cells")?;

    w.end_element("Piece")?;
    w.end_element("UnstructuredGrid")?;
    w.write_footer()?;
    Ok(())
}

/// Write a `.pvd` collection referencing `(time, file)` entries.
///
/// File names are written relative to the collection's directory.
pub fn write_pvd(path: &Path, entries: &[(f64, PathBuf)]) -> Result<(), VtkError> {
    let base = path.parent().unwrap_or_else(|| Path::new(""));
    let mut w = VtkWriter::new(File::create(path)?);
    w.write_header("Collection", None)?;
    w.start_element("Collection", &[])?;
    for (time, file) in entries {
        let relative = file.strip_prefix(base).unwrap_or(file);
        w.empty_element(
            "DataSet",
            &[
                ("timestep", Exact(*time).to_string()),
                ("group", String::new()),
                ("part", "0".to_string()),
                ("file", relative.display().to_string()),
            ],
        )?;
    }
    w.end_element("Collection")?;
    w.write_footer()?;
    Ok(())
}

/// Write every time step of `field` plus a collection file.
///
/// Steps are named `{basename}_{step:04}.vtu` inside `directory`; returns
/// the path of the collection, `{basename}.pvd`.
pub fn write_series(
    directory: &Path,
    basename: &str,
    mesh: &StructuredMesh,
    field: &TemperatureField,
    settings: Option<&Settings>,
) -> Result<PathBuf, VtkError> {
    std::fs::create_dir_all(directory)?;
    let mut entries = Vec::with_capacity(field.num_times());
    for (step, (&time, row)) in field.times.iter().zip(field.values.rows()).enumerate() {
        let path = directory.join(format!("{basename}_{step:04}.vtu"));
        write_vtu(&path, mesh, &row.to_vec(), time, settings)?;
        log::debug!("Wrote {} (t = {time})", path.display());
        entries.push((time, path));
    }
    let pvd = directory.join(format!("{basename}.pvd"));
    write_pvd(&pvd, &entries)?;
    Ok(pvd)
}

/// Contents recovered from a `.vtu` file.
#[derive(Debug, Clone, PartialEq)]
pub struct VtuSnapshot {
    /// Settings from the header comment, when present.
    pub settings: Option<Settings>,
    pub time: Option<f64>,
    pub points: Vec<[f64; 3]>,
    pub temperature: Vec<f64>,
}

impl VtuSnapshot {
    /// Smallest and largest temperature, or `None` without any values.
    pub fn temperature_range(&self) -> Option<(f64, f64)> {
        let (&first, rest) = self.temperature.split_first()?;
        Some(rest.iter().fold((first, first), |(lo, hi), &t| (lo.min(t), hi.max(t))))
    }
}

/// Read a file written by [`write_vtu`].
pub fn read_vtu(path: &Path) -> Result<VtuSnapshot, VtkError> {
    let content = std::fs::read_to_string(path)?;

    let settings = match content.find(&format!("<!-- {SETTINGS_TAG}")) {
        Some(start) => {
            let body = &content[start + SETTINGS_TAG.len() + 5..];
            let end = body
                .find("-->")
                .ok_or_else(|| VtkError::Format("unterminated settings comment".into()))?;
            Some(serde_json::from_str(&body[..end])?)
        }
        None => None,
    };

    let time = match data_array(&content, "TimeValue") {
        Ok(values) => values.first().copied(),
        Err(_) => None,
    };
    let temperature = data_array(&content, "Temperature")?;
    let coordinates = data_array(&content, "Points")?;
    if coordinates.len() % 3 != 0 {
        return Err(VtkError::Format(format!(
            "{} point coordinates is not a multiple of 3",
            coordinates.len()
        )));
    }
    let points: Vec<[f64; 3]> = coordinates.chunks(3).map(|c| [c[0], c[1], c[2]]).collect();
    if points.len() != temperature.len() {
        return Err(VtkError::Length {
            expected: points.len(),
            found: temperature.len(),
        });
    }

    Ok(VtuSnapshot {
        settings,
        time,
        points,
        temperature,
    })
}

/// Values of the `DataArray` called `name`.
fn data_array(content: &str, name: &str) -> Result<Vec<f64>, VtkError> {
    let key = format!("Name=\"{name}\"");
    let start = content
        .find(&key)
        .ok_or_else(|| VtkError::Format(format!("no {name} array")))?;
    let rest = &content[start..];
    let open = rest
        .find('>')
        .ok_or_else(|| VtkError::Format(format!("unterminated {name} tag")))?;
    let close = rest
        .find("</DataArray>")
        .ok_or_else(|| VtkError::Format(format!("unterminated {name} array")))?;
    rest[open + 1..close]
        .split_whitespace()
        .map(|token| {
            token
                .parse::<f64>()
                .map_err(|_| VtkError::Format(format!("bad value \"{token}\" in {name}")))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use heat_geometry::{Geometry, MeshSize};
    use ndarray::Array2;

    fn square_mesh() -> StructuredMesh {
        StructuredMesh::new(Arc::new(Geometry::rectangle(1.0, 2.0).unwrap()), MeshSize::Coarse)
    }

    #[test]
    fn test_vtu_structure() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("step.vtu");
        let mesh = square_mesh();
        let values = vec![1.5; mesh.num_nodes()];
        write_vtu(&path, &mesh, &values, 0.25, None).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("<?xml version=\"1.0\"?>"));
        assert!(content.contains("<VTKFile type=\"UnstructuredGrid\""));
        assert!(content.contains(&format!("NumberOfPoints=\"{}\"", mesh.num_nodes())));
        assert!(content.contains(&format!("NumberOfCells=\"{}\"", mesh.num_cells())));
        assert!(content.contains("<DataArray type=\"Float64\" Name=\"Temperature\" format=\"ascii\">"));
        assert!(content.contains("NumberOfComponents=\"3\""));
        assert!(content.contains("<DataArray type=\"UInt8\" Name=\"types\""));
        assert!(!content.contains(SETTINGS_TAG));
        assert!(content.trim_end().ends_with("</VTKFile>"));
    }

    #[test]
    fn test_read_recovers_field_and_settings() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("step.vtu");
        let mesh = square_mesh();
        let values: Vec<f64> = (0..mesh.num_nodes()).map(|i| 300.0 - 0.1 * i as f64 + 1e-13).collect();

        let mut settings = Settings::default();
        settings.material.name = "odd--name".into();
        write_vtu(&path, &mesh, &values, 1.0 / 3.0, Some(&settings)).unwrap();

        let snapshot = read_vtu(&path).unwrap();
        assert_eq!(snapshot.settings, Some(settings));
        assert_eq!(snapshot.time, Some(1.0 / 3.0));
        assert_eq!(snapshot.temperature, values);
        assert_eq!(snapshot.points, mesh.points().to_vec());
        let (lo, hi) = snapshot.temperature_range().unwrap();
        assert_eq!((lo, hi), (values[values.len() - 1], values[0]));
    }

    #[test]
    fn test_empty_temperature_has_no_range() {
        let snapshot = VtuSnapshot {
            settings: None,
            time: Some(0.0),
            points: Vec::new(),
            temperature: Vec::new(),
        };
        assert_eq!(snapshot.temperature_range(), None);

        let single = VtuSnapshot {
            temperature: vec![-2.5],
            ..snapshot
        };
        assert_eq!(single.temperature_range(), Some((-2.5, -2.5)));
    }

    #[test]
    fn test_length_mismatch_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mesh = square_mesh();
        let err = write_vtu(&dir.path().join("bad.vtu"), &mesh, &[0.0; 3], 0.0, None).unwrap_err();
        assert!(matches!(err, VtkError::Length { found: 3, .. }));
    }

    #[test]
    fn test_series_and_collection() {
        let dir = tempfile::tempdir().unwrap();
        let mesh = square_mesh();
        let field = TemperatureField {
            times: vec![0.0, 0.5, 1.0],
            values: Array2::from_shape_fn((3, mesh.num_nodes()), |(s, n)| (s * n) as f64),
        };
        let pvd = write_series(dir.path(), "run", &mesh, &field, None).unwrap();
        assert_eq!(pvd, dir.path().join("run.pvd"));

        for step in 0..3 {
            let path = dir.path().join(format!("run_{step:04}.vtu"));
            let snapshot = read_vtu(&path).unwrap();
            assert_eq!(snapshot.time, Some(field.times[step]));
            assert_eq!(snapshot.temperature, field.values.row(step).to_vec());
        }

        let collection = std::fs::read_to_string(&pvd).unwrap();
        assert!(collection.contains("<VTKFile type=\"Collection\""));
        assert!(collection.contains("<DataSet timestep=\"5e-1\" group=\"\" part=\"0\" file=\"run_0001.vtu\"/>"));
        assert_eq!(collection.matches("<DataSet").count(), 3);
    }
}
