//! Print the GraphQL schema

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use librarian_server::graph::export_schema_sdl;

#[derive(Parser, Debug)]
pub struct SchemaArgs {
    /// Write the SDL to this file instead of stdout
    #[arg(long, short = 'o')]
    pub output: Option<PathBuf>,
}

pub fn run_schema(args: SchemaArgs) -> Result<()> {
    let sdl = export_schema_sdl();
    match args.output {
        Some(path) => {
            std::fs::write(&path, &sdl)
                .with_context(|| format!("Failed to write schema to {}", path.display()))?;
            tracing::info!("Wrote schema to {}", path.display());
        }
        None => print!("{sdl}"),
    }
    Ok(())
}
