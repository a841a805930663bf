//! placeseo CLI: local-business listing SEO pipeline.
//!
//! Runs the per-brand pipeline, gates its artifacts against the shared
//! schema, and archives or reports on brand directories.

mod commands;

use std::process::ExitCode;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<ExitCode> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli).await
}
