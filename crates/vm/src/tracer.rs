//! Execution tracer.

use crate::opcodes::Opcode;

/// A single trace entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceStep {
    /// Offset of the opcode within the binary, magic tag included.
    pub pc: usize,
    pub opcode: Opcode,
    /// Stack depth after the step.
    pub stack_depth: usize,
}

/// Records execution for debugging.
#[derive(Debug, Default)]
pub struct Tracer {
    steps: Vec<TraceStep>,
    enabled: bool,
}

impl Tracer {
    pub fn new(enabled: bool) -> Self {
        Self {
            steps: Vec::new(),
            enabled,
        }
    }

    pub fn record(&mut self, step: TraceStep) {
        if self.enabled {
            self.steps.push(step);
        }
    }

    pub fn steps(&self) -> &[TraceStep] {
        &self.steps
    }

    /// Human-readable trace, one line per step.
    pub fn render(&self) -> String {
        self.steps
            .iter()
            .enumerate()
            .map(|(i, step)| {
                format!(
                    "{:4}: PC={:04X} {:<16} depth={}",
                    i,
                    step.pc,
                    step.opcode.mnemonic(),
                    step.stack_depth
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}
