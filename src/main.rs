//! Main entry point for the mcsign CLI app

use std::io;
use std::process::ExitCode;

use clap::Parser;
use tracing::info;

use mcsign::cli::Args;
use mcsign::{fsx, logging, workers, NbtDecoder, SignError};

fn main() -> ExitCode {
    let args = Args::parse();
    logging::init(args.log_level());

    if let Err(e) = run_app(args) {
        eprintln!("Error: {}", e);
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}

fn run_app(args: Args) -> Result<(), SignError> {
    let config = args.into_config()?;
    fsx::ensure_dir(&config.output_dir)?;

    let summary = workers::run(&config, io::stdin().lock(), &NbtDecoder)?;
    info!(
        regions = summary.dispatched,
        scanned = summary.completed,
        skipped = summary.skipped,
        with_signs = summary.with_matches,
        records = summary.records,
        bad_chunks = summary.bad_blocks,
        "done"
    );
    Ok(())
}
