//! Script assembler for scriptchain.
//!
//! Compiles human-readable script source into the binary instruction stream
//! executed by the scriptchain VM.
//!
//! # Example
//!
//! ```
//! use scriptchain_assembler::assemble;
//!
//! let binary = assemble("OP_1 OP_1 OP_ADD OP_2 OP_NUMEQUAL").unwrap();
//! assert_eq!(&binary[..3], b"BTC");
//! assert_eq!(&binary[3..], &[0x51, 0x51, 0x93, 0x52, 0x9c]);
//! ```
//!
//! # Pipeline
//!
//! 1. **Lexer** - Splits source into strings and words, dropping `#` comments
//! 2. **Parser** - Classifies words into keywords and integer literals
//! 3. **Compiler** - Encodes each token and prefixes the `BTC` magic tag
//!
//! # Script Language
//!
//! - **Keywords** - `OP_0`/`OP_FALSE`, `OP_1NEGATE`, `OP_1`/`OP_TRUE`,
//!   `OP_2`..`OP_16`, `OP_VERIFY`, `OP_DUP`, `OP_EQUALVERIFY`, `OP_ADD`,
//!   `OP_NUMEQUAL`, `OP_HASH160`, `OP_CHECKSIG` (case-insensitive)
//! - **Integers** - signed decimal or `0x` hexadecimal, no leading zeroes
//! - **Strings** - double-quoted ASCII, pushed as raw bytes

pub mod compiler;
pub mod lexer;
pub mod parser;

use thiserror::Error;

/// Assembler errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AssemblerError {
    #[error("syntax error: {0}")]
    Syntax(#[from] parser::SyntaxError),

    #[error("assemble error: {0}")]
    Compile(#[from] compiler::CompileError),
}

pub type Result<T> = std::result::Result<T, AssemblerError>;

/// Assemble source code into a script binary.
///
/// # Errors
///
/// Returns the first error found:
/// - Malformed literals, unknown keywords, unterminated strings, non-ASCII input
/// - Integers that do not fit 8 bytes, or strings beyond the largest push
pub fn assemble(source: &str) -> Result<Vec<u8>> {
    let tokens = parser::Parser::parse(source)?;
    let bytecode = compiler::Compiler::compile(&tokens)?;
    Ok(bytecode)
}

/// Assemble source and return both the tokens and the binary.
pub fn assemble_with_tokens(source: &str) -> Result<(Vec<parser::ScriptToken>, Vec<u8>)> {
    let tokens = parser::Parser::parse(source)?;
    let bytecode = compiler::Compiler::compile(&tokens)?;
    Ok((tokens, bytecode))
}

// Re-export commonly used types
pub use compiler::{CompileError, Compiler};
pub use lexer::{Lexer, Token};
pub use parser::{IntLiteral, Keyword, Parser, ScriptToken, SyntaxError};
