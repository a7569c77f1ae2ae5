//! Model trainer
//!
//! Loads the generated CSV dataset, fits the scaler + random-forest
//! pipeline on a stratified split, reports held-out accuracy and writes
//! the serialized pipeline artifact the service loads at startup.
//!
//! Usage: cargo run --bin train_model -- --input data/samples.csv --output models/pipeline.json

use anyhow::{Context, Result};
use clap::Parser;
use site_recommender::dataset::Dataset;
use site_recommender::models::forest::ForestConfig;
use site_recommender::models::trainer::{train, TrainingConfig};
use std::path::PathBuf;
use tracing::info;

#[derive(Parser, Debug)]
#[command(author, version, about = "Train the development-type classifier")]
struct Args {
    /// Input CSV produced by generate_data
    #[arg(short, long, default_value = "data/samples.csv")]
    input: PathBuf,

    /// Output path for the serialized pipeline
    #[arg(short, long, default_value = "models/pipeline.json")]
    output: PathBuf,

    /// Number of trees
    #[arg(short, long, default_value = "100")]
    trees: usize,

    /// Max tree depth
    #[arg(long, default_value = "12")]
    max_depth: usize,

    /// Held-out test fraction
    #[arg(long, default_value = "0.2")]
    test_ratio: f64,

    /// Split and forest seed
    #[arg(short, long, default_value = "42")]
    seed: u64,

    /// Disable inverse-frequency class weighting
    #[arg(long)]
    no_balanced_weights: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("site_recommender=info".parse()?)
                .add_directive("train_model=info".parse()?),
        )
        .init();

    let args = Args::parse();

    info!(path = %args.input.display(), "Loading dataset");
    let dataset = Dataset::load_csv(&args.input).with_context(|| {
        format!(
            "Failed to load {} (run generate_data first)",
            args.input.display()
        )
    })?;
    println!(
        "Loaded {} samples with {} features",
        dataset.n_samples(),
        dataset.n_features()
    );

    let config = TrainingConfig {
        test_ratio: args.test_ratio,
        seed: args.seed,
        forest: ForestConfig {
            n_trees: args.trees,
            max_depth: args.max_depth,
            seed: args.seed,
            balanced_class_weights: !args.no_balanced_weights,
            ..Default::default()
        },
    };

    println!("Training random forest with {} trees...", args.trees);
    let start_time = std::time::Instant::now();
    let (pipeline, report) = train(&dataset, &config)?;
    println!(
        "Training completed in {:.2}s\n",
        start_time.elapsed().as_secs_f64()
    );

    println!("Accuracy: {:.4}\n", report.accuracy);
    println!("Classification report:");
    println!("{}", report.to_table());

    println!("Feature importance ranking:");
    for (i, (name, importance)) in pipeline
        .forest
        .feature_importance_ranking()
        .iter()
        .enumerate()
    {
        let bar = "█".repeat((importance * 40.0) as usize);
        println!("{:2}. {:22} {:.4} {}", i + 1, name, importance, bar);
    }

    if let Some(parent) = args.output.parent() {
        std::fs::create_dir_all(parent)?;
    }
    pipeline.save(&args.output)?;
    println!("\nModel pipeline written to {}", args.output.display());

    Ok(())
}
