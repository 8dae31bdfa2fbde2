//! Terminal rendering of stacks, blocks and transactions.

use colored::Colorize;
use scriptchain_consensus::MinedBlock;
use scriptchain_core::{to_display_units, Block, Transaction};

/// Amount in display units.
pub fn amount(base: u64) -> String {
    to_display_units(base)
}

/// Short form of a hex digest.
pub fn short(hex: &str) -> &str {
    &hex[..hex.len().min(16)]
}

/// Stack item as hex, with the text alongside when it is printable ASCII.
pub fn stack_item(item: &[u8]) -> String {
    if item.is_empty() {
        return "<empty>".to_string();
    }
    let printable = item.iter().all(|b| b.is_ascii_graphic() || *b == b' ');
    if printable && item.len() > 1 {
        format!("{} \"{}\"", hex::encode(item), String::from_utf8_lossy(item))
    } else {
        hex::encode(item)
    }
}

/// Print a stack top first.
pub fn print_stack(stack: &[Vec<u8>]) {
    println!("{}", "Stack (top first):".bold().cyan());
    if stack.is_empty() {
        println!("  {}", "(empty)".bright_black());
    }
    for (i, item) in stack.iter().rev().enumerate() {
        println!("  {} {}", format!("{}.", i).bright_black(), stack_item(item));
    }
}

pub fn print_transaction(index: usize, tx: &Transaction) {
    let label = if tx.is_coinbase { " coinbase" } else { "" };
    println!(
        "  {} {}{}",
        format!("{}.", index).bright_black(),
        short(&tx.hash().to_hex()).bright_yellow(),
        label.bright_magenta()
    );
    for input in &tx.inputs {
        println!("       in   {}", input.outpoint().to_string().bright_black());
    }
    for (i, output) in tx.outputs.iter().enumerate() {
        println!(
            "       out  #{} {} {}",
            i,
            amount(output.value).bright_cyan(),
            output.lock_script.bright_black()
        );
    }
}

pub fn print_block(block: &Block) {
    println!();
    println!("{}", format!("Block #{}", block.height()).bold().cyan());
    println!("  Hash:         {}", block.hash().to_hex().bright_yellow());
    println!(
        "  Parent Hash:  {}",
        block.header.previous_hash.to_hex().bright_black()
    );
    println!(
        "  Merkle Root:  {}",
        block.header.merkle_root.to_hex().bright_black()
    );
    println!(
        "  Difficulty:   {} bits",
        block.header.difficulty.to_string().bright_cyan()
    );
    println!("  Nonce:        {}", block.header.nonce);
    println!("  Author:       {}", block.author.to_hex().bright_black());
    println!("  Timestamp:    {}", block.timestamp.to_rfc3339().bright_black());
    println!("  Transactions:");
    for (i, tx) in block.transactions.iter().enumerate() {
        print_transaction(i, tx);
    }
}

pub fn print_mined(mined: &MinedBlock) {
    println!(
        "{}  Mined block #{} after {} hashes",
        "✓".green().bold(),
        mined.block.height(),
        mined.attempts
    );
    println!(
        "    Accepted: {}  Rejected: {}  Fees: {}  Subsidy: {}",
        mined.accepted.len().to_string().bright_cyan(),
        mined.rejected.len().to_string().bright_cyan(),
        amount(mined.fees),
        amount(mined.subsidy)
    );
    for (hash, reason) in &mined.rejected {
        println!(
            "    {} {} {}",
            "✗".red(),
            short(&hash.to_hex()).bright_yellow(),
            reason.to_string().bright_black()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stack_item() {
        assert_eq!(stack_item(&[]), "<empty>");
        assert_eq!(stack_item(&[1]), "01");
        assert_eq!(stack_item(b"hi"), "6869 \"hi\"");
        assert_eq!(stack_item(&[0xff, 0x00]), "ff00");
    }

    #[test]
    fn test_short() {
        assert_eq!(short("0123456789abcdef0123"), "0123456789abcdef");
        assert_eq!(short("abc"), "abc");
    }
}
