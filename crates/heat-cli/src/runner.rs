//! Simulation runner: builds the model, solves it and writes the results.

use std::path::Path;
use std::time::Instant;

use anyhow::{Context, Result};
use heat_core::solver::separable::SeparableSolver;
use heat_core::{FieldSolver, Model, TemperatureField};
use heat_materials::ThermalProperties;

use crate::config::JobConfig;
use crate::vtu;

/// Results from a simulation run.
pub struct SimulationOutput {
    pub model: Model,
    pub field: TemperatureField,
}

/// Validate the settings groups of a job and assemble the model.
pub fn build_model(job: &JobConfig) -> Result<Model> {
    Ok(Model::from_settings(&job.settings())?)
}

/// Run a full simulation from a parsed job configuration.
pub fn run_simulation(job: &JobConfig) -> Result<SimulationOutput> {
    let times = job.times()?;
    let model = build_model(job)?;
    let mesh = model.mesh();

    println!(
        "Geometry: {} ({:?} m)",
        model.geometry().name(),
        model.geometry().lengths()
    );
    println!(
        "Mesh: {} nodes, {} cells ({})",
        mesh.num_nodes(),
        mesh.num_cells(),
        mesh.size()
    );
    println!(
        "Material: {} (alpha = {:.4e} m²/s)",
        model.material().name(),
        model.material().alpha()
    );
    println!("Times: {} from {} s to {} s", times.len(), times[0], times[times.len() - 1]);

    let solver = SeparableSolver::new(job.solver);
    println!("Method: {}", solver.method_name());

    let start = Instant::now();
    let field = solver.solve(&model, &times).context("Solve failed")?;
    log::info!("Solved {} time steps in {:.2?}", field.num_times(), start.elapsed());

    if let Some((lo, hi)) = field.range() {
        println!("Temperature range: {lo:.4} to {hi:.4}");
    }

    Ok(SimulationOutput { model, field })
}

/// Write every output format enabled in the job into `out_dir`.
pub fn write_outputs(output: &SimulationOutput, job: &JobConfig, out_dir: &Path) -> Result<()> {
    let basename = &job.output.basename;
    let settings = job.settings();

    if job.output.vtu {
        let pvd = vtu::write_series(out_dir, basename, output.model.mesh(), &output.field, Some(&settings))
            .with_context(|| format!("Cannot write VTU series to {}", out_dir.display()))?;
        println!("VTU series written to: {}", pvd.display());
    }

    if job.output.csv {
        let csv_path = out_dir.join(format!("{basename}.csv"));
        write_field_csv(&output.model, &output.field, &csv_path)?;
    }

    if job.output.json {
        let json_path = out_dir.join(format!("{basename}.json"));
        write_field_json(&output.field, &json_path)?;
    }

    Ok(())
}

/// Write the field as CSV: one row per node, one temperature column per time.
pub fn write_field_csv(model: &Model, field: &TemperatureField, path: &Path) -> Result<()> {
    use std::io::Write;

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let mut file = std::io::BufWriter::new(std::fs::File::create(path)?);

    // Metadata header
    writeln!(file, "# Heat series solver: temperature field")?;
    writeln!(file, "# Version: {}", env!("CARGO_PKG_VERSION"))?;
    writeln!(
        file,
        "# geometry: {} {:?} m",
        model.geometry().name(),
        model.geometry().lengths()
    )?;
    let material = model.material();
    writeln!(
        file,
        "# material: {} (rho={}, k={}, cp={})",
        material.name(),
        material.rho(),
        material.k(),
        material.cp()
    )?;
    writeln!(file, "#")?;

    write!(file, "node,x_m,y_m,z_m")?;
    for t in &field.times {
        write!(file, ",T_t={t}")?;
    }
    writeln!(file)?;

    let mesh = model.mesh();
    for node in 0..mesh.num_nodes() {
        let [x, y, z] = mesh.node_position(node);
        write!(file, "{node},{x:.6e},{y:.6e},{z:.6e}")?;
        for value in field.values.column(node) {
            write!(file, ",{value:.10e}")?;
        }
        writeln!(file)?;
    }
    file.flush()?;

    println!("Temperature table written to: {}", path.display());
    Ok(())
}

/// Write the field as JSON.
pub fn write_field_json(field: &TemperatureField, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let json = serde_json::to_string_pretty(field).map_err(|e| anyhow::anyhow!("JSON serialisation error: {}", e))?;
    std::fs::write(path, json)?;

    println!("Temperature field (JSON) written to: {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    use crate::config::{parse_config, TimeSpec};

    fn line_job() -> JobConfig {
        parse_config(
            r#"
[geometry]
dimension = 1
lx = 1.0

[material]
name = "Copper"

[initial]
a = 300.0

[[boundary.axes]]
type = "dirichlet"
a1 = 300.0
a2 = 300.0

[time]
values = [0.0, 1.0]

[solver]
stopping = "envelope"
"#,
        )
        .unwrap()
    }

    #[test]
    fn test_constant_problem_stays_constant() {
        let output = run_simulation(&line_job()).unwrap();
        assert_eq!(output.field.num_times(), 2);
        assert_eq!(output.field.num_nodes(), output.model.mesh().num_nodes());
        for &value in output.field.values.iter() {
            assert_relative_eq!(value, 300.0, epsilon = 1e-7);
        }
    }

    #[test]
    fn test_invalid_settings_name_the_field() {
        let mut job = line_job();
        job.material.name = "Unobtainium".into();
        let err = run_simulation(&job).err().unwrap();
        assert!(err.to_string().contains("material"), "{err}");

        let mut job = line_job();
        job.time = TimeSpec::List { values: vec![] };
        assert!(run_simulation(&job).is_err());
    }

    #[test]
    fn test_outputs_are_written() {
        let dir = tempfile::tempdir().unwrap();
        let mut job = line_job();
        job.output.json = true;
        job.output.basename = "line".into();
        let output = run_simulation(&job).unwrap();
        write_outputs(&output, &job, dir.path()).unwrap();

        for name in ["line.pvd", "line_0000.vtu", "line_0001.vtu", "line.csv", "line.json"] {
            assert!(dir.path().join(name).exists(), "missing {name}");
        }

        let csv = std::fs::read_to_string(dir.path().join("line.csv")).unwrap();
        let mut rows = csv.lines().filter(|l| !l.starts_with('#'));
        assert_eq!(rows.next(), Some("node,x_m,y_m,z_m,T_t=0,T_t=1"));
        assert_eq!(rows.count(), output.model.mesh().num_nodes());

        let json = std::fs::read_to_string(dir.path().join("line.json")).unwrap();
        let field: TemperatureField = serde_json::from_str(&json).unwrap();
        assert_eq!(field.times, vec![0.0, 1.0]);

        let snapshot = vtu::read_vtu(&dir.path().join("line_0001.vtu")).unwrap();
        assert_eq!(snapshot.settings, Some(job.settings()));
        assert_eq!(snapshot.temperature, output.field.values.row(1).to_vec());
    }
}
