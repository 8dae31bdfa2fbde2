//! Assemble command.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use scriptchain_assembler::assemble;
use std::path::PathBuf;

#[derive(Args)]
pub struct AssembleArgs {
    /// Path to script source file
    path: PathBuf,
}

pub fn run(args: AssembleArgs) -> Result<()> {
    let source = super::read_source(&args.path)?;
    let binary = assemble(&source).with_context(|| "Failed to assemble script")?;

    println!(
        "{}  Assembled {} ({} bytes)",
        "✓".green().bold(),
        args.path.display().to_string().bright_black(),
        binary.len()
    );
    println!("{}", hex::encode(&binary));
    Ok(())
}
