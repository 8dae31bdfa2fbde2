//! Stack-based script virtual machine for scriptchain.
//!
//! Executes the binaries produced by `scriptchain-assembler`: a `BTC` magic
//! tag followed by a Bitcoin-Script-compatible opcode stream operating on a
//! stack of byte arrays.

pub mod executor;
pub mod opcodes;
pub mod stack;
pub mod tracer;

pub use executor::{
    execute, is_valid_script, CheckSigPolicy, ExecutionResult, ScriptContext, Vm, VmError,
};
pub use opcodes::Opcode;
pub use stack::Stack;
pub use tracer::{TraceStep, Tracer};
