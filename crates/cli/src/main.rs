//! scriptchain CLI entry point.

use clap::Parser;
use std::path::PathBuf;
use tracing::Level;

mod commands;
mod display;

#[derive(Parser)]
#[command(name = "scriptchain")]
#[command(about = "A UTXO blockchain with a Bitcoin-style script VM", long_about = None)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Node configuration file (JSON)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<commands::Commands>,
}

fn main() {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Some(cmd) => {
            if let Err(e) = commands::run(cmd, cli.config.as_deref()) {
                eprintln!("Error: {:#}", e);
                std::process::exit(1);
            }
        }
        None => {
            println!("scriptchain - A UTXO blockchain with a script VM");
            println!("Run 'scriptchain --help' for usage information.");
        }
    }
}
