//! Tracing hooks for the Intcode VM.
//!
//! Tracing is opt-in: a [`TraceSink`] is handed to the VM at construction
//! with [`Vm::with_sink`](crate::vm::Vm::with_sink). Every hook has a no-op
//! default so a sink only implements the events it cares about.

use crate::vm::decode::Instruction;
use crate::vm::execute::VmError;

/// A sink that receives VM execution events.
pub trait TraceSink {
    /// Called before each instruction executes, with its raw operands.
    fn instruction(&mut self, _ip: usize, _instr: &Instruction, _operands: &[i64]) {}

    /// Called when an input value is consumed and stored at `addr`.
    fn input(&mut self, _ip: usize, _value: i64, _addr: i64) {}

    /// Called when a value is emitted.
    fn output(&mut self, _ip: usize, _value: i64) {}

    /// Called when the VM blocks on an empty input queue.
    fn blocked(&mut self, _ip: usize) {}

    /// Called when the VM executes HLT.
    fn halted(&mut self, _ip: usize, _steps: u64) {}

    /// Called when an instruction faults.
    fn fault(&mut self, _ip: usize, _error: &VmError) {}
}

/// Forwards every VM event to `tracing` at TRACE level.
#[derive(Debug, Clone, Default)]
pub struct LogSink {
    /// Label attached to every event, e.g. the engine's ring position.
    pub label: String,
}

impl LogSink {
    pub fn new(label: impl Into<String>) -> Self {
        Self { label: label.into() }
    }
}

impl TraceSink for LogSink {
    fn instruction(&mut self, ip: usize, instr: &Instruction, operands: &[i64]) {
        tracing::trace!(
            vm = %self.label,
            ip,
            op = instr.opcode.mnemonic(),
            modes = ?instr.operand_modes(),
            ?operands,
            "exec"
        );
    }

    fn input(&mut self, ip: usize, value: i64, addr: i64) {
        tracing::trace!(vm = %self.label, ip, value, addr, "input");
    }

    fn output(&mut self, ip: usize, value: i64) {
        tracing::trace!(vm = %self.label, ip, value, "output");
    }

    fn blocked(&mut self, ip: usize) {
        tracing::trace!(vm = %self.label, ip, "blocked on input");
    }

    fn halted(&mut self, ip: usize, steps: u64) {
        tracing::trace!(vm = %self.label, ip, steps, "halted");
    }

    fn fault(&mut self, ip: usize, error: &VmError) {
        tracing::trace!(vm = %self.label, ip, %error, "fault");
    }
}
