#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! CLI for building parish density maps.
//!
//! ```text
//! parish_map periods
//! parish_map grid --reference parroquias.geojson [--out grilla.geojson]
//! parish_map map universities [--period 202410] [--out-dir out/]
//! ```
//!
//! Inputs are read from `--data-dir` using the file names in the
//! configuration; `--config` points at a TOML file overriding any subset
//! of the built-in defaults. Log verbosity is controlled by `RUST_LOG`.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use parish_map_geometry::Crs;
use parish_map_geometry::io::{read_feature_collection, to_geojson, write_feature_collection};
use parish_map_grid::build_grid;
use parish_map_pipeline::{
    DataDir, MapKind, MapRequest, PipelineConfig, available_periods, run_map, write_map,
};
use parish_map_style::StyleRegistry;

#[derive(Parser)]
#[command(
    name = "parish_map",
    about = "Adaptive density grids and choropleth layers over parish boundaries"
)]
struct Cli {
    /// TOML file overriding the default configuration
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Directory holding the input files
    #[arg(long, global = true, default_value = "data")]
    data_dir: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the academic periods found in the student data
    Periods,
    /// Build a grid sized from arbitrary reference polygons
    Grid {
        /// `GeoJSON` file with the reference polygons
        #[arg(long)]
        reference: PathBuf,
        /// Output `GeoJSON` file (stdout when omitted)
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Build one map and write its layers
    Map {
        /// Map to build (universities, schools, businesses, students, feeders)
        kind: MapKind,
        /// Academic period (defaults to the first known period)
        #[arg(long)]
        period: Option<String>,
        /// Directory the layers and summary are written to
        #[arg(long, default_value = "out")]
        out_dir: PathBuf,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    pretty_env_logger::init();
    let cli = Cli::parse();

    let config = PipelineConfig::load(cli.config.as_deref())?;
    log::debug!(
        "Data directory {}, projected CRS {}",
        cli.data_dir.display(),
        config.projected_crs
    );

    match cli.command {
        Commands::Periods => {
            let inputs = DataDir::new(&cli.data_dir, config);
            let periods = available_periods(&inputs)?;

            if periods.is_empty() {
                println!("No periods found.");
                return Ok(());
            }

            for period in &periods {
                println!("{period}");
            }
        }
        Commands::Grid { reference, out } => {
            let reference = read_feature_collection(&reference, Some(Crs::Wgs84))?;
            let grid = build_grid(&reference, &config.grid_options())?;

            match out {
                Some(path) => {
                    write_feature_collection(&path, &grid.cells)?;
                    println!(
                        "{} x {} cells of {:.1} m written to {}",
                        grid.columns,
                        grid.rows,
                        grid.cell_size,
                        path.display()
                    );
                }
                None => println!("{}", serde_json::to_string(&to_geojson(&grid.cells))?),
            }
        }
        Commands::Map {
            kind,
            period,
            out_dir,
        } => {
            let inputs = DataDir::new(&cli.data_dir, config.clone());
            let request = MapRequest { kind, period };
            let output = run_map(&inputs, &config, &request)?;

            let written = write_map(&output, &out_dir, &StyleRegistry::embedded())?;

            println!(
                "{kind} map for period {}: {} files in {}",
                output.selected_period.as_deref().unwrap_or("-"),
                written.len(),
                out_dir.display()
            );
            if let Some(range) = output.range {
                println!("Counts range from {} to {}", range.min, range.max);
            }
        }
    }

    Ok(())
}
