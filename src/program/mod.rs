//! Program text and disassembly.
//!
//! This module provides:
//! - A loader for comma-separated program text
//! - A disassembler (memory image → readable text)

pub mod loader;
pub mod disasm;

pub use loader::{parse_program, load_program, format_program, LoadError};
pub use disasm::disassemble;
