//! Intcode virtual machine.
//!
//! This module implements the complete Intcode machine:
//! - a zero-filled memory tape that grows on demand
//! - 2 registers: IP (instruction pointer) and RB (relative base)
//! - 10 opcodes with position, immediate and relative parameter modes
//! - a resumable run model that parks on input instead of failing

pub mod memory;
pub mod registers;
pub mod decode;
pub mod execute;
pub mod trace;

pub use memory::{Memory, MemoryError};
pub use registers::Registers;
pub use decode::{Instruction, Mode, Opcode, DecodeError};
pub use execute::{Vm, VmConfig, VmError, VmState, Snapshot};
pub use trace::{TraceSink, LogSink};
