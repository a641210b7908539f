//! flowgraph CLI: flowchart-structure extraction from text.
//!
//! Reads annotated code, step procedures or foreign graph payloads and prints
//! the canonical graph as JSON for a renderer to consume.

mod commands;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli).await
}
