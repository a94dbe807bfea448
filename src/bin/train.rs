//! Offline training job.
//!
//! Loads historical listings, trains the random forest, reports held-out
//! metrics and publishes the artifact atomically.
//!
//! # Usage
//! ```sh
//! cargo run --bin train -- --input data/processed/used_cars_data_cleaned.csv
//! ```

use anyhow::{Context, Result};
use autovalue::application::ml::trainer;
use autovalue::config::TrainingEnvConfig;
use autovalue::infrastructure::artifact_store::ArtifactStore;
use autovalue::infrastructure::tabular_loader;
use clap::Parser;
use std::path::PathBuf;
use tracing::{Level, info};
use tracing_subscriber::prelude::*;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to training data CSV (overrides TRAINING_DATA_PATH)
    #[arg(long)]
    input: Option<PathBuf>,

    /// Path to output model file (overrides MODEL_PATH)
    #[arg(long)]
    output: Option<PathBuf>,

    /// Number of trees in the random forest
    #[arg(long)]
    n_trees: Option<usize>,

    /// Maximum depth of trees
    #[arg(long)]
    max_depth: Option<u16>,

    /// Random seed for the split and the forest
    #[arg(long)]
    seed: Option<u64>,
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let stdout_layer = tracing_subscriber::fmt::layer().with_target(false);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .with(stdout_layer)
        .init();

    let args = Args::parse();
    let mut config = TrainingEnvConfig::from_env()?;
    if let Some(input) = args.input {
        config.training_data_path = input;
    }
    if let Some(output) = args.output {
        config.model_path = output;
    }
    if let Some(n_trees) = args.n_trees {
        config.n_trees = n_trees;
    }
    if let Some(max_depth) = args.max_depth {
        config.max_depth = max_depth;
    }
    if let Some(seed) = args.seed {
        config.seed = seed;
    }
    config.validate()?;

    info!("Autovalue training {} starting...", env!("CARGO_PKG_VERSION"));
    let records = tabular_loader::load_listings(&config.training_data_path)
        .with_context(|| format!("Failed to load {:?}", config.training_data_path))?;

    let artifact = trainer::train(&records, &config.to_options()).context("Training failed")?;
    let metrics = artifact.metadata.metrics;
    info!(
        "MAE: ${:.2}, RMSE: ${:.2}, R2: {:.3}",
        metrics.mae, metrics.rmse, metrics.r2
    );

    ArtifactStore::new(&config.model_path)
        .save(&artifact)
        .context("Failed to save model artifact")?;
    info!("Done. Model saved successfully.");
    Ok(())
}
