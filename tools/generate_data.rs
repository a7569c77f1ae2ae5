//! Synthetic dataset generator
//!
//! Walks the city grid, synthesizes features and labels for every point
//! and writes the result as a CSV file for train_model.
//!
//! Usage: cargo run --bin generate_data -- --output data/samples.csv --seed 42

use anyhow::Result;
use clap::Parser;
use site_recommender::generator::{DatasetGenerator, GeneratorConfig};
use site_recommender::geo::CityBounds;
use site_recommender::types::DevelopmentType;
use std::path::PathBuf;
use tracing::info;

#[derive(Parser, Debug)]
#[command(author, version, about = "Generate the synthetic training dataset")]
struct Args {
    /// Output CSV path
    #[arg(short, long, default_value = "data/samples.csv")]
    output: PathBuf,

    /// RNG seed; the same seed always yields the same dataset
    #[arg(short, long, default_value = "42")]
    seed: u64,

    /// Grid spacing in degrees (0.0005 is roughly 50 meters)
    #[arg(long, default_value = "0.0005")]
    grid_spacing: f64,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("site_recommender=info".parse()?)
                .add_directive("generate_data=info".parse()?),
        )
        .init();

    let args = Args::parse();

    let bounds = CityBounds::default();
    let generator = DatasetGenerator::new(
        bounds,
        GeneratorConfig {
            seed: args.seed,
            grid_spacing: args.grid_spacing,
        },
    );

    let dataset = generator.generate();

    println!("Generated {} samples", dataset.n_samples());
    println!("\nLabel distribution:");
    let counts = dataset.class_counts();
    for class in DevelopmentType::ALL {
        let count = counts[class.as_index()];
        let pct = count as f64 / dataset.n_samples() as f64 * 100.0;
        println!("  {:12} {:>6} ({:>5.1}%)", class.as_str(), count, pct);
    }

    if let Some(parent) = args.output.parent() {
        std::fs::create_dir_all(parent)?;
    }
    dataset.save_csv(&args.output)?;
    info!(path = %args.output.display(), "Dataset written");
    println!("\nDataset written to {}", args.output.display());

    Ok(())
}
