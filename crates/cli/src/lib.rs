use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::collections::BTreeMap;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use takeoff_core::{
    get_cost_by_category_with, get_total_cost, validate_calibration, AnnotationQuantity, CostItem,
    EstimateConfig, Project, UNCATEGORIZED,
};

/// Environment variable holding the log filter (e.g. `debug`, `takeoff_core=debug`)
pub const LOG_ENV: &str = "TAKEOFF_LOG";

#[derive(Debug, Parser)]
#[command(name = "takeoff-cli")]
#[command(about = "Quantity take-off and cost estimation for annotated drawings")]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Print the cost estimate of a project as JSON.
    Estimate {
        #[arg(value_name = "FILE")]
        file: PathBuf,
        /// Decimal places for quantities and totals.
        #[arg(long, default_value_t = 2)]
        decimals: u32,
        /// Category name for labels without one.
        #[arg(long, default_value = UNCATEGORIZED)]
        uncategorized: String,
    },
    /// Print the real-world quantity of every annotation as JSON.
    Measure {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
    /// Calibrate a project from a known length and write it back.
    Calibrate {
        #[arg(value_name = "FILE")]
        file: PathBuf,
        /// Known real-world length in meters.
        #[arg(long, allow_negative_numbers = true)]
        reference_length: f64,
        /// Measured length of the reference in pixels.
        #[arg(long, allow_negative_numbers = true)]
        pixel_distance: f64,
        /// Write to this path instead of overwriting FILE.
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Validate calibration inputs without touching a project.
    CheckCalibration {
        #[arg(long, allow_negative_numbers = true)]
        reference_length: f64,
        #[arg(long, allow_negative_numbers = true)]
        pixel_distance: f64,
    },
    /// Print CLI version.
    Version,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct EstimateOutput {
    project: String,
    calibrated: bool,
    meters_per_pixel: f64,
    items: Vec<CostItem>,
    total_cost: f64,
    cost_by_category: BTreeMap<String, f64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct MeasureOutput {
    project: String,
    calibrated: bool,
    quantities: Vec<AnnotationQuantity>,
}

/// Install the stderr logger; safe to call more than once
pub fn init_logging() {
    let env = env_logger::Env::default().filter_or(LOG_ENV, "warn");
    let _ = env_logger::Builder::from_env(env).format_timestamp(None).try_init();
}

pub fn run<I, T>(args: I) -> Result<()>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let cli = Cli::parse_from(args);

    match cli.command {
        Commands::Estimate { file, decimals, uncategorized } => {
            let config =
                EstimateConfig { decimal_places: decimals, uncategorized_label: uncategorized };
            run_estimate(&file, &config)
        }
        Commands::Measure { file } => run_measure(&file),
        Commands::Calibrate { file, reference_length, pixel_distance, output } => {
            run_calibrate(&file, reference_length, pixel_distance, output.as_deref())
        }
        Commands::CheckCalibration { reference_length, pixel_distance } => {
            validate_calibration(reference_length, pixel_distance)?;
            println!("ok: {:.6} m/px", reference_length / pixel_distance);
            Ok(())
        }
        Commands::Version => {
            println!("{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

fn run_estimate(file: &Path, config: &EstimateConfig) -> Result<()> {
    let project = load_project(file)?;

    let items = project.cost_items(config);
    let payload = EstimateOutput {
        project: project.name.clone(),
        calibrated: project.calibration().is_calibrated(),
        meters_per_pixel: project.calibration().meters_per_pixel(),
        total_cost: get_total_cost(&items),
        cost_by_category: get_cost_by_category_with(&items, config),
        items,
    };

    print_json(&payload)
}

fn run_measure(file: &Path) -> Result<()> {
    let project = load_project(file)?;

    let payload = MeasureOutput {
        project: project.name.clone(),
        calibrated: project.calibration().is_calibrated(),
        quantities: project.quantities(),
    };

    print_json(&payload)
}

fn run_calibrate(
    file: &Path,
    reference_length: f64,
    pixel_distance: f64,
    output: Option<&Path>,
) -> Result<()> {
    let mut project = load_project(file)?;
    project.calibrate(reference_length, pixel_distance).context("calibration rejected")?;

    let output = output.unwrap_or(file);
    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let json = project.to_json_pretty()?;
    fs::write(output, json)
        .with_context(|| format!("failed to write project to {}", output.display()))?;

    log::info!(
        "calibrated {} at {} m/px",
        output.display(),
        project.calibration().meters_per_pixel()
    );
    println!("{}", output.display());

    Ok(())
}

fn load_project(path: &Path) -> Result<Project> {
    if !path.exists() {
        anyhow::bail!("file does not exist: {}", path.display());
    }

    if !path.is_file() {
        anyhow::bail!("path is not a file: {}", path.display());
    }

    let bytes = fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    Project::from_json_slice(&bytes).context("failed to parse project")
}

fn print_json<T: Serialize>(payload: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(payload)?;
    println!("{json}");
    Ok(())
}
