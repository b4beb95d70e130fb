use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use dicom_stitch::{GridTolerances, TracingSink, VolumeLoader};
use tracing::info;

/// Stitch a folder of DICOM slices into a volume and print its geometry
#[derive(Parser)]
#[command(name = "dicom-stitch", version, about)]
struct Cli {
    /// Directory containing the .dcm files of one series
    directory: PathBuf,

    /// Relative slice spacing deviation above which the series is rejected
    #[arg(long, default_value_t = GridTolerances::default().spacing_error)]
    spacing_tolerance: f64,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();

    let tolerances = GridTolerances {
        spacing_error: cli.spacing_tolerance,
        ..GridTolerances::default()
    };
    let volume = VolumeLoader::new()
        .with_tolerances(tolerances)
        .load_from_directory(&cli.directory, &TracingSink)
        .with_context(|| format!("Failed to load volume from {}", cli.directory.display()))?;

    info!("Loaded volume from {}", cli.directory.display());

    let (columns, rows, slices) = volume.dim();
    println!("shape: {columns} x {rows} x {slices} (columns, rows, slices)");
    println!("element type: {}", volume.voxels.element_type());
    println!("slice spacing: {}", volume.slice_spacing);
    println!("affine:");
    for row in volume.transform.to_array().rows() {
        let values: Vec<String> = row.iter().map(|v| format!("{v:>10.4}")).collect();
        println!("  [{}]", values.join(", "));
    }

    Ok(())
}
