//! VM execution loop.

use crate::{
    opcodes::Opcode,
    stack::{is_truthy, Stack},
    tracer::{TraceStep, Tracer},
};
use scriptchain_core::{hash160, script::MAGIC, Hash, PublicKey, Signature};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VmError {
    #[error("binary is not a script binary (missing magic tag)")]
    InvalidBinary,

    #[error("invalid opcode: 0x{0:02x}")]
    InvalidOpcode(u8),

    #[error("stack underflow")]
    StackUnderflow,

    #[error("push at pc {pc} needs {needed} bytes, {remaining} remain")]
    TruncatedProgram {
        pc: usize,
        needed: usize,
        remaining: usize,
    },

    #[error("verify failed")]
    VerifyFailed,

    #[error("numeric operand of {0} bytes exceeds 8 bytes")]
    NumberTooLong(usize),

    #[error("numeric overflow")]
    NumericOverflow,
}

/// How `OP_CHECKSIG` treats its operands.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckSigPolicy {
    /// Always push true without checking the signature.
    #[default]
    Stubbed,
    /// Verify an Ed25519 signature over the spend message.
    Verify,
}

/// What the script may consult besides its own stack.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScriptContext {
    pub checksig: CheckSigPolicy,
    /// Message covered by `OP_CHECKSIG` signatures.
    pub spend_message: Option<Hash>,
}

impl ScriptContext {
    pub fn new(checksig: CheckSigPolicy, spend_message: Option<Hash>) -> Self {
        Self {
            checksig,
            spend_message,
        }
    }
}

/// Execution result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionResult {
    /// Final stack, bottom first.
    pub stack: Vec<Vec<u8>>,
    pub steps: usize,
}

impl ExecutionResult {
    /// True when the top of the stack is neither empty nor a single zero byte.
    pub fn is_valid(&self) -> bool {
        match self.stack.last() {
            Some(top) => !(top.is_empty() || top.as_slice() == [0]),
            None => false,
        }
    }
}

/// The virtual machine state.
pub struct Vm {
    bytecode: Vec<u8>,
    pc: usize,
    stack: Stack,
    context: ScriptContext,
    tracer: Tracer,
    steps: usize,
}

impl Vm {
    /// Create a VM for a magic-prefixed binary.
    pub fn new(bytecode: Vec<u8>, context: ScriptContext) -> Self {
        Self {
            bytecode,
            pc: 0,
            stack: Stack::new(),
            context,
            tracer: Tracer::new(false),
            steps: 0,
        }
    }

    /// Record every executed step.
    pub fn with_tracing(mut self) -> Self {
        self.tracer = Tracer::new(true);
        self
    }

    pub fn tracer(&self) -> &Tracer {
        &self.tracer
    }

    pub fn stack(&self) -> &Stack {
        &self.stack
    }

    /// Check the magic tag, then run until the program ends.
    pub fn run(&mut self) -> Result<ExecutionResult, VmError> {
        if !self.bytecode.starts_with(MAGIC) {
            return Err(VmError::InvalidBinary);
        }
        self.pc = MAGIC.len();

        while self.pc < self.bytecode.len() {
            self.step()?;
        }

        Ok(ExecutionResult {
            stack: self.stack.items().to_vec(),
            steps: self.steps,
        })
    }

    /// Execute a single instruction.
    fn step(&mut self) -> Result<(), VmError> {
        // Fetch
        let pc = self.pc;
        let opcode_byte = self.bytecode[pc];
        let opcode = Opcode::from_byte(opcode_byte).ok_or(VmError::InvalidOpcode(opcode_byte))?;
        self.pc += 1;

        // Decode & Execute
        match opcode {
            Opcode::Op0 => self.stack.push(Vec::new()),

            Opcode::PushBytes(n) => {
                let data = self.read_bytes(pc, n as usize)?;
                self.stack.push(data);
            }

            Opcode::PushData1 => {
                let len = self.read_len(pc, 1)?;
                let data = self.read_bytes(pc, len)?;
                self.stack.push(data);
            }

            Opcode::PushData2 => {
                let len = self.read_len(pc, 2)?;
                let data = self.read_bytes(pc, len)?;
                self.stack.push(data);
            }

            Opcode::PushData4 => {
                let len = self.read_len(pc, 4)?;
                let data = self.read_bytes(pc, len)?;
                self.stack.push(data);
            }

            Opcode::Op1Negate => self.stack.push_num(-1),

            Opcode::PushNum(n) => self.stack.push_num(n as i64),

            Opcode::Verify => {
                let value = self.stack.pop()?;
                if !is_truthy(&value) {
                    return Err(VmError::VerifyFailed);
                }
            }

            Opcode::Dup => {
                let top = self.stack.top().ok_or(VmError::StackUnderflow)?.to_vec();
                self.stack.push(top);
            }

            Opcode::EqualVerify => {
                let (a, b) = self.stack.pop_pair()?;
                if a != b {
                    return Err(VmError::VerifyFailed);
                }
            }

            Opcode::Add => {
                let (a, b) = self.pop_num_pair()?;
                let sum = a.checked_add(b).ok_or(VmError::NumericOverflow)?;
                self.stack.push_num(sum);
            }

            Opcode::NumEqual => {
                let (a, b) = self.pop_num_pair()?;
                self.stack.push_bool(a == b);
            }

            Opcode::Hash160 => {
                let value = self.stack.pop()?;
                self.stack.push(hash160(&value).to_vec());
            }

            Opcode::CheckSig => {
                let (signature, public_key) = self.stack.pop_pair()?;
                let ok = self.check_signature(&signature, &public_key);
                self.stack.push_bool(ok);
            }
        }

        self.steps += 1;
        self.tracer.record(TraceStep {
            pc,
            opcode,
            stack_depth: self.stack.len(),
        });
        Ok(())
    }

    // =========================================================================
    // Operand decoding
    // =========================================================================

    fn read_bytes(&mut self, pc: usize, needed: usize) -> Result<Vec<u8>, VmError> {
        let remaining = self.bytecode.len() - self.pc;
        if needed > remaining {
            return Err(VmError::TruncatedProgram {
                pc,
                needed,
                remaining,
            });
        }
        let data = self.bytecode[self.pc..self.pc + needed].to_vec();
        self.pc += needed;
        Ok(data)
    }

    fn read_len(&mut self, pc: usize, width: usize) -> Result<usize, VmError> {
        let raw = self.read_bytes(pc, width)?;
        let mut buf = [0u8; 8];
        buf[..width].copy_from_slice(&raw);
        Ok(u64::from_le_bytes(buf) as usize)
    }

    fn pop_num_pair(&mut self) -> Result<(i64, i64), VmError> {
        let (a, b) = self.stack.pop_pair()?;
        Ok((
            crate::stack::decode_num(&a)?,
            crate::stack::decode_num(&b)?,
        ))
    }

    /// Under `Verify`, operands are the ASCII hex pushed by the standard
    /// scripts. Anything malformed is a failed check, not an error.
    fn check_signature(&self, signature: &[u8], public_key: &[u8]) -> bool {
        match self.context.checksig {
            CheckSigPolicy::Stubbed => true,
            CheckSigPolicy::Verify => {
                let Some(message) = self.context.spend_message else {
                    return false;
                };
                let parsed = std::str::from_utf8(signature)
                    .ok()
                    .and_then(|s| Signature::from_hex(s).ok())
                    .zip(
                        std::str::from_utf8(public_key)
                            .ok()
                            .and_then(|s| PublicKey::from_hex(s).ok()),
                    );
                match parsed {
                    Some((sig, key)) => key.verify(message.as_bytes(), &sig).is_ok(),
                    None => false,
                }
            }
        }
    }
}

/// Run a script binary to completion.
pub fn execute(bytecode: Vec<u8>, context: ScriptContext) -> Result<ExecutionResult, VmError> {
    Vm::new(bytecode, context).run()
}

/// True when the binary runs without error and leaves a valid top value.
pub fn is_valid_script(bytecode: Vec<u8>, context: ScriptContext) -> bool {
    execute(bytecode, context).is_ok_and(|result| result.is_valid())
}
