//! # Intcode VM
//!
//! A virtual machine for the Intcode integer-tape instruction set.
//!
//! Programs run until they halt or need input that has not arrived yet. A
//! blocked VM keeps its full state and continues from the same instruction
//! once more input is pushed, which lets several VMs be chained into a
//! feedback ring and driven turn by turn from a single thread.

pub mod vm;
pub mod pipeline;
pub mod program;

// Re-export commonly used types
pub use vm::{Vm, VmConfig, VmError, VmState, Snapshot, Memory, MemoryError, Instruction, Mode, Opcode, DecodeError, TraceSink, LogSink};
pub use pipeline::{Ring, PipelineError, run_chain, run_feedback_loop};
pub use program::{parse_program, load_program, format_program, disassemble, LoadError};
