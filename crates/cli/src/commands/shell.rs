//! Interactive node shell.

use crate::display;
use anyhow::{bail, Context, Result};
use colored::Colorize;
use scriptchain_chain::{Node, NodeConfig, BOOTSTRAP_WALLET};
use scriptchain_core::to_base_units;
use std::io::{self, BufRead, Write};

const HELP: &str = "\
Commands:
  init                                   bootstrap wallet mines the first block
  wallet <name>                          create a wallet
  miner <name>                           let a wallet mine
  miners-random <n>                      let up to n random wallets mine
  transfer <from> <to> <amount> [change] pay an amount (display units)
  txs-random <n>                         queue up to n small random transfers
  mine [miner]                           mine one block
  balance <name>                         show a wallet's balance
  utxos <name>                           list a wallet's spendable outputs
  block <height>                         show a block
  history                                list mined blocks
  fee                                    show the current fee
  pool                                   show pending transactions
  wallets                                list wallets and miners
  help                                   show this help
  exit                                   leave the shell";

#[derive(Debug, PartialEq, Eq)]
enum Flow {
    Continue,
    Exit,
}

pub fn run(config: NodeConfig) -> Result<()> {
    let mut node = Node::new(config);
    println!("{}", "scriptchain shell".bold().cyan());
    println!("Type 'help' for commands.");

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        print!("{} ", ">".bright_black());
        io::stdout().flush()?;

        let Some(line) = lines.next() else {
            break;
        };
        match execute(&mut node, &line?) {
            Ok(Flow::Exit) => break,
            Ok(Flow::Continue) => {}
            Err(e) => println!("{} {:#}", "error:".red().bold(), e),
        }
    }
    Ok(())
}

fn execute(node: &mut Node, line: &str) -> Result<Flow> {
    let words: Vec<&str> = line.split_whitespace().collect();
    let Some((&command, args)) = words.split_first() else {
        return Ok(Flow::Continue);
    };

    match (command, args) {
        ("exit" | "quit", _) => return Ok(Flow::Exit),
        ("help", _) => println!("{}", HELP),
        ("init", []) => {
            let mined = node.bootstrap()?;
            println!("{}  {} is mining", "✓".green().bold(), BOOTSTRAP_WALLET);
            display::print_mined(&mined);
        }
        ("wallet", [name]) => {
            let key = node.create_wallet(name)?;
            println!("{}  wallet {} {}", "✓".green().bold(), name, key.to_hex().bright_black());
        }
        ("miner", [name]) => {
            node.add_miner(name)?;
            println!("{}  {} is mining", "✓".green().bold(), name);
        }
        ("miners-random", [n]) => {
            let n: usize = n.parse().with_context(|| "Invalid count")?;
            for name in node.add_random_miners(n)? {
                println!("{}  {} is mining", "✓".green().bold(), name);
            }
        }
        ("txs-random", [n]) => {
            let n: usize = n.parse().with_context(|| "Invalid count")?;
            let queued = node.random_transfers(n)?;
            println!("{}  queued {} of {} transfers", "✓".green().bold(), queued.len(), n);
        }
        ("transfer", [from, to, amount, rest @ ..]) if rest.len() <= 1 => {
            let amount = to_base_units(amount).with_context(|| "Invalid amount")?;
            let fee = node.fee();
            let hash = node.transfer(from, to, amount, rest.first().copied())?;
            println!(
                "{}  queued {} (fee {})",
                "✓".green().bold(),
                display::short(&hash.to_hex()).bright_yellow(),
                display::amount(fee)
            );
        }
        ("mine", [miner @ ..]) if miner.len() <= 1 => {
            let mined = node.mine(miner.first().copied())?;
            display::print_mined(&mined);
        }
        ("balance", [name]) => {
            println!("{}", display::amount(node.balance(name)?).bright_cyan());
        }
        ("utxos", [name]) => {
            for (point, output) in node.spendable_outputs(name)? {
                println!(
                    "  {} {}",
                    point.to_string().bright_black(),
                    display::amount(output.value).bright_cyan()
                );
            }
        }
        ("block", [height]) => {
            let height: u64 = height.parse().with_context(|| "Invalid height")?;
            let block = node
                .block(height)
                .with_context(|| format!("No block at height {}", height))?;
            display::print_block(block);
        }
        ("history", []) => {
            for entry in node.history() {
                println!(
                    "  {} {} {} {}",
                    format!("#{}", entry.height).bright_black(),
                    display::short(&entry.hash.to_hex()).bright_yellow(),
                    entry.miner,
                    entry.timestamp.to_rfc3339().bright_black()
                );
            }
        }
        ("fee", []) => println!("{}", display::amount(node.fee())),
        ("pool", []) => {
            let stats = node.mempool().stats();
            println!("pending: {} / {}", stats.total_transactions, stats.capacity);
            for tx in node.mempool().get_all() {
                println!(
                    "  {} {}",
                    display::short(&tx.hash().to_hex()).bright_yellow(),
                    display::amount(tx.total_output()).bright_cyan()
                );
            }
        }
        ("wallets", []) => {
            println!("{} wallets", node.wallet_count());
            println!("wallets: {}", node.wallet_names().join(", "));
            println!("miners:  {}", node.miner_names().join(", "));
        }
        _ => bail!("unknown command or wrong arguments: {} (try 'help')", line.trim()),
    }
    Ok(Flow::Continue)
}

#[cfg(test)]
mod tests {
    use super::*;
    use scriptchain_consensus::{DifficultyPolicy, MinerConfig};

    fn node() -> Node {
        Node::new(NodeConfig {
            miner: MinerConfig {
                difficulty: DifficultyPolicy::Fixed(1),
                seed: Some(3),
                ..MinerConfig::default()
            },
            ..NodeConfig::default()
        })
    }

    #[test]
    fn test_shell_session() {
        let mut node = node();
        for line in ["wallet alice", "wallet bob", "miner alice", "mine", "", "fee", "history"] {
            assert_eq!(execute(&mut node, line).unwrap(), Flow::Continue, "{}", line);
        }
        assert_eq!(node.ledger().blockchain.len(), 1);

        execute(&mut node, "transfer alice bob 1.5").unwrap();
        execute(&mut node, "mine alice").unwrap();
        assert_eq!(node.balance("bob").unwrap(), 150_000_000);
        assert!(execute(&mut node, "block 1").is_ok());
        assert_eq!(execute(&mut node, "exit").unwrap(), Flow::Exit);
    }

    #[test]
    fn test_shell_random_session() {
        let mut node = node();
        for line in ["init", "wallet bob", "wallet carol", "miners-random 1", "txs-random 2", "pool"] {
            assert_eq!(execute(&mut node, line).unwrap(), Flow::Continue, "{}", line);
        }
        assert_eq!(node.miner_names().len(), 2);
        assert_eq!(node.mempool().len(), 1);

        execute(&mut node, "mine").unwrap();
        assert!(node.mempool().is_empty());
        assert!(execute(&mut node, "miners-random x").is_err());
        assert!(execute(&mut node, "init").is_err());
    }

    #[test]
    fn test_shell_errors() {
        let mut node = node();
        assert!(execute(&mut node, "frobnicate").is_err());
        assert!(execute(&mut node, "wallet").is_err());
        assert!(execute(&mut node, "balance nobody").is_err());
        assert!(execute(&mut node, "block 0").is_err());
        assert!(execute(&mut node, "mine").is_err());
        execute(&mut node, "wallet alice").unwrap();
        assert!(execute(&mut node, "transfer alice alice abc").is_err());
    }
}
