//! Emit script binaries from typed tokens.
//!
//! Output layout: the three-byte magic tag, then one encoded operation per
//! token. Byte strings pick the smallest push class that fits; integers are
//! always an 8-byte direct push.

use crate::parser::{IntLiteral, Keyword, ScriptToken};
use scriptchain_core::script::MAGIC;
use thiserror::Error;

/// Compiler errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CompileError {
    #[error("integer '{literal}' at line {line} does not fit in 8 bytes")]
    IntegerTooLarge { literal: String, line: usize },

    #[error("string of {0} bytes exceeds the maximum push size")]
    PushTooLarge(usize),
}

pub type Result<T> = std::result::Result<T, CompileError>;

/// Opcode constants (matching VM implementation)
mod opcodes {
    // Constants
    pub const OP_0: u8 = 0x00;
    pub const MAX_DIRECT_PUSH: u8 = 0x4b;
    pub const OP_PUSHDATA1: u8 = 0x4c;
    pub const OP_PUSHDATA2: u8 = 0x4d;
    pub const OP_PUSHDATA4: u8 = 0x4e;
    pub const OP_1NEGATE: u8 = 0x4f;
    pub const OP_1: u8 = 0x51;

    // Flow control
    pub const OP_VERIFY: u8 = 0x69;

    // Stack
    pub const OP_DUP: u8 = 0x76;

    // Bitwise logic
    pub const OP_EQUALVERIFY: u8 = 0x88;

    // Arithmetic
    pub const OP_ADD: u8 = 0x93;
    pub const OP_NUMEQUAL: u8 = 0x9c;

    // Crypto
    pub const OP_HASH160: u8 = 0xa9;
    pub const OP_CHECKSIG: u8 = 0xac;
}

/// Width of an encoded integer push.
pub const INT_WIDTH: usize = 8;

/// Script compiler
pub struct Compiler {
    bytecode: Vec<u8>,
}

impl Compiler {
    fn new() -> Self {
        Self {
            bytecode: MAGIC.to_vec(),
        }
    }

    /// Compile tokens to a magic-prefixed binary
    pub fn compile(tokens: &[ScriptToken]) -> Result<Vec<u8>> {
        let mut compiler = Self::new();
        for token in tokens {
            compiler.emit_token(token)?;
        }
        Ok(compiler.bytecode)
    }

    fn emit_token(&mut self, token: &ScriptToken) -> Result<()> {
        match token {
            ScriptToken::Integer(lit) => self.emit_integer(lit),
            ScriptToken::Str(s) => self.emit_push(s.as_bytes()),
            ScriptToken::Op(keyword) => {
                self.bytecode.push(keyword_opcode(*keyword));
                Ok(())
            }
        }
    }

    fn emit_integer(&mut self, lit: &IntLiteral) -> Result<()> {
        let value = lit.value().ok_or_else(|| CompileError::IntegerTooLarge {
            literal: format!(
                "{}{}{}",
                if lit.negative { "-" } else { "" },
                if lit.radix == 16 { "0x" } else { "" },
                lit.digits
            ),
            line: lit.line,
        })?;
        self.emit_push(&value.to_le_bytes())
    }

    fn emit_push(&mut self, data: &[u8]) -> Result<()> {
        let len = data.len();
        if len <= opcodes::MAX_DIRECT_PUSH as usize {
            self.bytecode.push(len as u8);
        } else if len <= u8::MAX as usize {
            self.bytecode.push(opcodes::OP_PUSHDATA1);
            self.bytecode.push(len as u8);
        } else if len <= u16::MAX as usize {
            self.bytecode.push(opcodes::OP_PUSHDATA2);
            self.bytecode.extend_from_slice(&(len as u16).to_le_bytes());
        } else {
            let len32 = u32::try_from(len).map_err(|_| CompileError::PushTooLarge(len))?;
            self.bytecode.push(opcodes::OP_PUSHDATA4);
            self.bytecode.extend_from_slice(&len32.to_le_bytes());
        }
        self.bytecode.extend_from_slice(data);
        Ok(())
    }
}

fn keyword_opcode(keyword: Keyword) -> u8 {
    match keyword {
        Keyword::False => opcodes::OP_0,
        Keyword::Negate1 => opcodes::OP_1NEGATE,
        Keyword::Small(n) => opcodes::OP_1 + (n - 1),
        Keyword::Verify => opcodes::OP_VERIFY,
        Keyword::Dup => opcodes::OP_DUP,
        Keyword::EqualVerify => opcodes::OP_EQUALVERIFY,
        Keyword::Add => opcodes::OP_ADD,
        Keyword::NumEqual => opcodes::OP_NUMEQUAL,
        Keyword::Hash160 => opcodes::OP_HASH160,
        Keyword::CheckSig => opcodes::OP_CHECKSIG,
    }
}
