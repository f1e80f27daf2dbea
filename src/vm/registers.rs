//! Intcode VM registers.
//!
//! The machine has two registers:
//! - IP: the instruction pointer, the address of the next instruction word
//! - RB: the relative base, the offset applied to relative-mode operands

use crate::vm::decode::Mode;
use serde::{Serialize, Deserialize};

/// The Intcode register file.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registers {
    /// Instruction pointer.
    pub ip: usize,

    /// Relative base, adjusted only by the ARB instruction.
    pub relative_base: i64,
}

impl Registers {
    /// Create a register file with both registers zeroed.
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance the instruction pointer by `width` cells.
    /// Returns the old value.
    pub fn advance_ip(&mut self, width: usize) -> usize {
        let old = self.ip;
        self.ip += width;
        old
    }

    /// Set the instruction pointer to an absolute address.
    pub fn jump(&mut self, addr: usize) {
        self.ip = addr;
    }

    /// Address of operand `n` of the instruction at the instruction pointer.
    pub fn operand_addr(&self, n: usize) -> i64 {
        (self.ip + 1 + n) as i64
    }

    /// Compute the memory address an operand refers to.
    ///
    /// - Position: the operand itself
    /// - Relative: operand + relative base
    /// - Immediate: no address (the operand is a value)
    ///
    /// Returns `None` for immediate mode and when the relative sum overflows.
    pub fn effective_address(&self, operand: i64, mode: Mode) -> Option<i64> {
        match mode {
            Mode::Position => Some(operand),
            Mode::Relative => operand.checked_add(self.relative_base),
            Mode::Immediate => None,
        }
    }
}
