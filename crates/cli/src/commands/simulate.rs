//! Simulate command: a scripted run on a fresh chain.
//!
//! Alice mines the first block, pays 500 to herself, then spends it: 100
//! to Bob and 399 back to herself with a fee of 1. A third wallet mines the
//! later blocks so the final balances are easy to read.

use crate::display;
use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use scriptchain_chain::{Node, NodeConfig};
use scriptchain_consensus::DifficultyPolicy;
use scriptchain_core::{Hash, OutPoint, Transaction};

/// Fee paid by each scripted transaction.
const FEE: u64 = 1;

#[derive(Args)]
pub struct SimulateArgs {
    /// Leading zero bits required of every block (overrides the config)
    #[arg(short, long)]
    difficulty: Option<u32>,

    /// RNG seed for the miners (overrides the config)
    #[arg(short, long)]
    seed: Option<u64>,
}

pub fn run(args: SimulateArgs, mut config: NodeConfig) -> Result<()> {
    if let Some(difficulty) = args.difficulty {
        config.miner.difficulty = DifficultyPolicy::Fixed(difficulty);
    }
    if args.seed.is_some() {
        config.miner.seed = args.seed;
    }

    let outcome = simulate(config)?;

    println!();
    println!("{}", "Final balances:".bold().cyan());
    println!("  alice  {}", display::amount(outcome.alice).bright_cyan());
    println!("  bob    {}", display::amount(outcome.bob).bright_cyan());
    println!();
    Ok(())
}

pub(crate) struct Outcome {
    pub alice: u64,
    pub bob: u64,
}

pub(crate) fn simulate(config: NodeConfig) -> Result<Outcome> {
    let mut node = Node::new(config);
    node.create_wallet("alice")?;
    node.create_wallet("bob")?;
    node.create_wallet("carol")?;
    node.add_miner("alice")?;
    node.add_miner("carol")?;

    println!("{}", "Mining the first block for alice...".bold().cyan());
    let genesis = node.mine(Some("alice"))?;
    display::print_mined(&genesis);
    let reward = genesis
        .block
        .coinbase()
        .context("block has no coinbase")?
        .clone();

    println!("{}", "alice pays 500 to herself...".bold().cyan());
    let first = pay_self(&mut node, &reward)?;
    let mined = node.mine(Some("carol"))?;
    display::print_mined(&mined);
    display::print_block(&mined.block);

    println!();
    println!("{}", "alice pays 100 to bob...".bold().cyan());
    let point = OutPoint::new(first, 0);
    let bob_lock = node.wallet("bob")?.lock_script();
    let wallet = node.wallet_mut("alice")?;
    let change_lock = wallet.lock_script();
    wallet.unlock_own(point)?;
    wallet.stage_output(100, &bob_lock)?;
    wallet.stage_output(399, &change_lock)?;
    let tx = wallet.build_transaction(FEE)?;
    node.submit(tx)?;
    let mined = node.mine(Some("carol"))?;
    display::print_mined(&mined);
    display::print_block(&mined.block);

    Ok(Outcome {
        alice: node.balance("alice")?,
        bob: node.balance("bob")?,
    })
}

/// Spend the first block's reward into a 500 output for alice; the rest of
/// the reward after the fee goes to carol so alice only keeps the 500.
fn pay_self(node: &mut Node, reward: &Transaction) -> Result<Hash> {
    let carol_lock = node.wallet("carol")?.lock_script();
    let wallet = node.wallet_mut("alice")?;
    let own_lock = wallet.lock_script();
    let value = reward.outputs[0].value;

    wallet.unlock_own(OutPoint::new(reward.hash(), 0))?;
    wallet.stage_output(500, &own_lock)?;
    let rest = value
        .checked_sub(500 + FEE)
        .context("block reward too small for the example")?;
    if rest > 0 {
        wallet.stage_output(rest, &carol_lock)?;
    }
    let tx = wallet.build_transaction(FEE)?;
    Ok(node.submit(tx)?)
}
