//! Single-vehicle valuation.
//!
//! Reads one vehicle record as JSON (file or stdin), prints the current value
//! and the depreciation projection as JSON to stdout. Logs go to stderr.
//!
//! # Usage
//! ```sh
//! echo '{"year": 2019, "mileage": 38000, "make_name": "Toyota"}' | cargo run --bin valuate
//! ```

use anyhow::{Context, Result};
use autovalue::application::ml::predictor::{Predictor, VehicleValuator};
use autovalue::config::Config;
use autovalue::domain::vehicle::RawVehicleRecord;
use clap::Parser;
use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::PathBuf;
use tracing::{Level, info};
use tracing_subscriber::prelude::*;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Vehicle record JSON file; reads stdin when omitted
    record: Option<PathBuf>,

    /// Path to model file (overrides MODEL_PATH)
    #[arg(long)]
    model: Option<PathBuf>,

    /// Pretty-print the output
    #[arg(long)]
    pretty: bool,
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(io::stderr);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .with(stderr_layer)
        .init();

    let args = Args::parse();
    let config = Config::from_env()?;
    let model_path = args.model.unwrap_or(config.training.model_path);

    let predictor = Predictor::new(config.projection.to_settings());
    predictor
        .handle()
        .reload_from(&model_path)
        .with_context(|| format!("Failed to load model from {:?}", model_path))?;
    info!(
        model = predictor.name(),
        version = %predictor.version(),
        horizon_years = predictor.settings().horizon_years,
        "Predictor ready"
    );

    let record: RawVehicleRecord = match args.record {
        Some(path) => {
            let file = File::open(&path).with_context(|| format!("Failed to open {:?}", path))?;
            serde_json::from_reader(BufReader::new(file)).context("Failed to parse record JSON")?
        }
        None => {
            let mut input = String::new();
            io::stdin().read_to_string(&mut input)?;
            serde_json::from_str(&input).context("Failed to parse record JSON")?
        }
    };

    let result = predictor.project(&record)?;
    info!(
        current_value = %result.current_value,
        horizon = result.future_values.len(),
        "Valuation complete"
    );

    let output = if args.pretty {
        serde_json::to_string_pretty(&result)?
    } else {
        serde_json::to_string(&result)?
    };
    println!("{}", output);
    Ok(())
}
