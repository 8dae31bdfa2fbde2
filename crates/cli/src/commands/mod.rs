//! CLI commands module.

use anyhow::{Context, Result};
use clap::Subcommand;
use scriptchain_chain::NodeConfig;
use std::fs;
use std::path::Path;

mod assemble;
mod run;
mod shell;
mod simulate;

#[derive(Subcommand)]
pub enum Commands {
    /// Assemble a script source file and print the binary as hex
    Assemble(assemble::AssembleArgs),
    /// Assemble and execute a script, printing the final stack
    Run(run::RunArgs),
    /// Play through a two-transfer example on a fresh chain
    Simulate(simulate::SimulateArgs),
    /// Interactive node shell
    Shell,
}

pub fn run(cmd: Commands, config: Option<&Path>) -> Result<()> {
    match cmd {
        Commands::Assemble(args) => assemble::run(args),
        Commands::Run(args) => run::run(args),
        Commands::Simulate(args) => simulate::run(args, load_config(config)?),
        Commands::Shell => shell::run(load_config(config)?),
    }
}

/// Read a script source file.
pub(crate) fn read_source(path: &Path) -> Result<String> {
    fs::read_to_string(path)
        .with_context(|| format!("Failed to read source file: {}", path.display()))
}

/// Node configuration from a JSON file, or the defaults.
pub(crate) fn load_config(path: Option<&Path>) -> Result<NodeConfig> {
    let Some(path) = path else {
        return Ok(NodeConfig::default());
    };
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    NodeConfig::from_json(&contents)
        .with_context(|| format!("Invalid config file: {}", path.display()))
}
