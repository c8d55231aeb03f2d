//! orderscope: descriptive analytics over e-commerce order lines
//!
//! This is the main entrypoint that orchestrates loading, feature derivation,
//! the requested analysis views and output.

use anyhow::{Context, Result};
use clap::Parser;
use orderscope::{build_report, derive_features, load_orders, output, Args};
use std::time::Instant;
use tracing::{debug, info};

fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse();

    let default_filter = if args.verbose {
        "orderscope=debug"
    } else {
        "orderscope=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    run(&args)
}

fn run(args: &Args) -> Result<()> {
    let filter = args.order_filter()?;
    let start_time = Instant::now();

    // Step 1: Load raw records
    let load_start = Instant::now();
    let raw = load_orders(&args.input)?;
    info!(records = raw.len(), path = %args.input, "Data loaded");
    debug!(elapsed_s = load_start.elapsed().as_secs_f64(), "Load time");

    // Step 2: Derive calendar features
    let orders = derive_features(&raw)
        .with_context(|| format!("Failed to derive features from {}", args.input))?;

    // Step 3: Build the requested views
    let report_start = Instant::now();
    let report = build_report(&orders, &filter, args.view, args.top)?;
    debug!(elapsed_s = report_start.elapsed().as_secs_f64(), "Aggregation time");

    // Step 4: Render
    let rendered = output::render(&report, args.format)?;
    match &args.output {
        Some(path) => {
            std::fs::write(path, &rendered).with_context(|| format!("Failed to write {}", path))?;
            info!(path = %path, "Report saved");
        }
        None => println!("{}", rendered),
    }

    info!(
        elapsed_s = start_time.elapsed().as_secs_f64(),
        "Pipeline complete"
    );
    Ok(())
}
