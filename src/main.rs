//! Mapcalc Worker CLI
//!
//! Entry point for the `mapcalc-worker` command-line tool. Parses the three
//! job parameters, builds the effective configuration, runs the worker
//! against the real engine, and translates the result into a process exit
//! code.

use clap::Parser;
use mapcalc_worker::config::WorkerConfig;
use mapcalc_worker::engine::GrassEngine;
use mapcalc_worker::expression::Expression;
use mapcalc_worker::worker::{MapcalcJob, Worker};
use std::path::PathBuf;
use std::process;

#[derive(Parser)]
#[command(name = "mapcalc-worker")]
#[command(about = "Runs r.mapcalc in an isolated mapset", version)]
struct Cli {
    /// Saved region to compute in. Append @<mapset> if it lies outside the
    /// new mapset
    #[arg(long)]
    region: String,

    /// Name of the new mapset to create and run in
    #[arg(long)]
    newmapset: String,

    /// Mapcalc expression. Qualify input maps with @<mapset> as needed
    #[arg(long)]
    expression: String,

    /// Path to a worker config file
    #[arg(long, short = 'c')]
    config: Option<PathBuf>,

    /// Override the raster compressor (ZLIB, LZ4, ZSTD, BZIP2)
    #[arg(long)]
    compressor: Option<String>,

    /// Print the run outcome as JSON
    #[arg(long)]
    json: bool,
}

fn main() {
    let cli = Cli::parse();

    if cli.region.trim().is_empty() {
        eprintln!("Option 'region' must not be empty");
        process::exit(1);
    }
    if cli.newmapset.trim().is_empty() {
        eprintln!("Option 'newmapset' must not be empty");
        process::exit(1);
    }

    let config = match WorkerConfig::load(cli.config.as_deref(), cli.compressor.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error loading config: {}", e);
            process::exit(1);
        }
    };

    let expression = match Expression::new(cli.expression) {
        Ok(expression) => expression,
        Err(e) => {
            eprintln!("Invalid expression: {}", e);
            process::exit(1);
        }
    };

    let job = MapcalcJob {
        region: cli.region,
        mapset: cli.newmapset,
        expression,
    };

    let engine = GrassEngine::new(config.tools.clone());
    let worker = Worker::new(engine, config);

    match worker.run(&job) {
        Ok(outcome) => {
            if cli.json {
                match serde_json::to_string_pretty(&outcome) {
                    Ok(json) => println!("{}", json),
                    Err(e) => {
                        eprintln!("Error serializing outcome: {}", e);
                        process::exit(1);
                    }
                }
            }
        }
        Err(e) => {
            eprintln!("{}", e);
            process::exit(e.exit_code());
        }
    }
}
