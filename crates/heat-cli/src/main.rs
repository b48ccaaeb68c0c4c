//! Heat command-line interface.
//!
//! Run simulations from TOML configuration files:
//! ```sh
//! heat init job.toml
//! heat run job.toml
//! heat validate job.toml
//! heat inspect output/heat_0003.vtu
//! heat materials
//! ```

mod config;
mod runner;
mod vtu;

use anyhow::bail;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "heat")]
#[command(about = "Analytical heat conduction in lines, rectangles and blocks")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a simulation from a TOML configuration file.
    Run {
        /// Path to the job configuration file.
        config: PathBuf,
        /// Output directory (overrides config file setting).
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Validate a configuration file without running the simulation.
    Validate {
        /// Path to the job configuration file.
        config: PathBuf,
    },
    /// Write a configuration file holding the default settings.
    Init {
        /// Where to write the configuration.
        #[arg(default_value = "heat.toml")]
        path: PathBuf,
        /// Overwrite an existing file.
        #[arg(short, long)]
        force: bool,
    },
    /// Describe the mesh a configuration file would build.
    Mesh {
        /// Path to the job configuration file.
        config: PathBuf,
    },
    /// Summarise a VTU file written by `run`.
    Inspect {
        /// Path to the `.vtu` file.
        file: PathBuf,
    },
    /// Display the built-in material presets.
    Materials,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Run { config, output } => {
            println!("Heat Series Solver");
            println!("==================");
            let job = config::load_config(&config)?;
            println!("Configuration: {}", config.display());

            let result = runner::run_simulation(&job)?;

            let out_dir = output.unwrap_or_else(|| PathBuf::from(&job.output.directory));
            runner::write_outputs(&result, &job, &out_dir)?;

            println!("Simulation complete.");
            Ok(())
        }
        Commands::Validate { config } => {
            let job = config::load_config(&config)?;
            let times = job.times()?;
            runner::build_model(&job)?;
            job.solver.validate()?;
            println!("Configuration is valid: {} ({} times)", config.display(), times.len());
            Ok(())
        }
        Commands::Init { path, force } => {
            if path.exists() && !force {
                bail!("{} already exists; pass --force to overwrite", path.display());
            }
            std::fs::write(&path, config::default_config_text()?)?;
            println!("Default configuration written to: {}", path.display());
            Ok(())
        }
        Commands::Mesh { config } => {
            let job = config::load_config(&config)?;
            let model = runner::build_model(&job)?;
            let mesh = model.mesh();
            println!("{} mesh ({}):", model.geometry().name(), mesh.size());
            for &axis in model.geometry().axes() {
                let coords = mesh.coordinates(axis);
                println!(
                    "  {}: {} cells from {} to {} m",
                    axis,
                    mesh.axis_cells(axis),
                    coords[0],
                    coords[coords.len() - 1]
                );
            }
            println!(
                "  {} nodes, {} {:?} cells, {} on the boundary, {} vertices",
                mesh.num_nodes(),
                mesh.num_cells(),
                mesh.cell_type(),
                mesh.boundary_nodes().len(),
                mesh.vertex_nodes().len()
            );
            Ok(())
        }
        Commands::Inspect { file } => {
            let snapshot = vtu::read_vtu(&file)?;
            println!("{}:", file.display());
            if let Some(time) = snapshot.time {
                println!("  time: {time} s");
            }
            println!("  {} points", snapshot.points.len());
            match snapshot.temperature_range() {
                Some((lo, hi)) => println!("  temperature: {lo:.4} to {hi:.4}"),
                None => println!("  no temperature data"),
            }
            match snapshot.settings {
                Some(settings) => println!("{}", toml::to_string_pretty(&settings)?),
                None => println!("  no embedded settings"),
            }
            Ok(())
        }
        Commands::Materials => {
            println!("Available materials:");
            println!();
            println!(
                "  {:<16} {:>10} {:>10} {:>10} {:>12}",
                "name", "rho", "k", "cp", "alpha"
            );
            for &(name, rho, k, cp) in heat_materials::library::presets() {
                println!(
                    "  {:<16} {:>10} {:>10} {:>10} {:>12.4e}",
                    name,
                    rho,
                    k,
                    cp,
                    k / (rho * cp)
                );
            }
            println!();
            println!("Units: rho kg/m³, k W/(m·K), cp J/(kg·K), alpha m²/s");
            Ok(())
        }
    }
}
