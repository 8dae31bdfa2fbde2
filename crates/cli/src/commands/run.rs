//! Run command: assemble a script and execute it.

use crate::display;
use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use scriptchain_assembler::assemble;
use scriptchain_vm::{ScriptContext, Vm};
use std::path::PathBuf;

#[derive(Args)]
pub struct RunArgs {
    /// Path to script source file
    path: PathBuf,

    /// Print every executed step
    #[arg(short, long)]
    trace: bool,
}

pub fn run(args: RunArgs) -> Result<()> {
    let source = super::read_source(&args.path)?;
    let binary = assemble(&source).with_context(|| "Failed to assemble script")?;

    let mut vm = Vm::new(binary, ScriptContext::default());
    if args.trace {
        vm = vm.with_tracing();
    }
    let outcome = vm.run();

    if args.trace {
        println!("{}", "Trace:".bold());
        println!("{}", vm.tracer().render());
        println!();
    }

    let result = outcome.with_context(|| "Script execution failed")?;
    display::print_stack(&result.stack);
    println!();
    if result.is_valid() {
        println!("{}  Valid ({} steps)", "✓".green().bold(), result.steps);
    } else {
        println!("{}  Invalid ({} steps)", "✗".red().bold(), result.steps);
    }
    Ok(())
}
