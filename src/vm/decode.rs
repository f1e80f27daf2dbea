//! Instruction decoder for Intcode.
//!
//! An instruction word packs the opcode into its two least significant
//! decimal digits. The digits above those hold one parameter mode per
//! operand, read right to left: the hundreds digit is the first operand's
//! mode, the thousands digit the second's, and so on. Missing digits mean
//! position mode.

use serde::{Serialize, Deserialize};
use thiserror::Error;

/// The largest operand count of any opcode.
pub const MAX_OPERANDS: usize = 3;

/// Parameter addressing mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Mode {
    /// The operand is an address to dereference (digit 0).
    #[default]
    Position,
    /// The operand is the value itself (digit 1).
    Immediate,
    /// The operand is an offset from the relative base (digit 2).
    Relative,
}

impl Mode {
    /// Create from a mode digit.
    pub fn from_digit(digit: i64) -> Option<Self> {
        match digit {
            0 => Some(Mode::Position),
            1 => Some(Mode::Immediate),
            2 => Some(Mode::Relative),
            _ => None,
        }
    }

    /// Convert to the mode digit.
    pub fn to_digit(self) -> i64 {
        match self {
            Mode::Position => 0,
            Mode::Immediate => 1,
            Mode::Relative => 2,
        }
    }
}

/// The Intcode opcode table.
///
/// Each opcode carries its operand count and, for instructions that store
/// a result, the index of the operand naming the write target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Opcode {
    // ==================== Arithmetic ====================

    /// mem[c] = a + b
    Add,
    /// mem[c] = a * b
    Mul,

    // ==================== I/O ====================

    /// mem[a] = next input, blocking when the queue is empty
    Input,
    /// Emit a
    Output,

    // ==================== Control Flow ====================

    /// If a != 0, jump to b
    JumpIfTrue,
    /// If a == 0, jump to b
    JumpIfFalse,

    // ==================== Comparison ====================

    /// mem[c] = (a < b) as i64
    LessThan,
    /// mem[c] = (a == b) as i64
    Equals,

    // ==================== Special ====================

    /// relative_base += a
    AdjustBase,
    /// Stop execution
    Halt,
}

impl Opcode {
    /// All opcodes, in numeric order.
    pub const ALL: [Opcode; 10] = [
        Opcode::Add,
        Opcode::Mul,
        Opcode::Input,
        Opcode::Output,
        Opcode::JumpIfTrue,
        Opcode::JumpIfFalse,
        Opcode::LessThan,
        Opcode::Equals,
        Opcode::AdjustBase,
        Opcode::Halt,
    ];

    /// Look up an opcode by its numeric code.
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            1 => Some(Opcode::Add),
            2 => Some(Opcode::Mul),
            3 => Some(Opcode::Input),
            4 => Some(Opcode::Output),
            5 => Some(Opcode::JumpIfTrue),
            6 => Some(Opcode::JumpIfFalse),
            7 => Some(Opcode::LessThan),
            8 => Some(Opcode::Equals),
            9 => Some(Opcode::AdjustBase),
            99 => Some(Opcode::Halt),
            _ => None,
        }
    }

    /// The numeric code.
    pub fn code(self) -> i64 {
        match self {
            Opcode::Add => 1,
            Opcode::Mul => 2,
            Opcode::Input => 3,
            Opcode::Output => 4,
            Opcode::JumpIfTrue => 5,
            Opcode::JumpIfFalse => 6,
            Opcode::LessThan => 7,
            Opcode::Equals => 8,
            Opcode::AdjustBase => 9,
            Opcode::Halt => 99,
        }
    }

    /// Number of operands following the instruction word.
    pub fn operand_count(self) -> usize {
        match self {
            Opcode::Add | Opcode::Mul | Opcode::LessThan | Opcode::Equals => 3,
            Opcode::JumpIfTrue | Opcode::JumpIfFalse => 2,
            Opcode::Input | Opcode::Output | Opcode::AdjustBase => 1,
            Opcode::Halt => 0,
        }
    }

    /// Index of the operand that names a write target, if any.
    pub fn write_operand(self) -> Option<usize> {
        match self {
            Opcode::Add | Opcode::Mul | Opcode::LessThan | Opcode::Equals => Some(2),
            Opcode::Input => Some(0),
            _ => None,
        }
    }

    /// Assembly mnemonic.
    pub fn mnemonic(self) -> &'static str {
        match self {
            Opcode::Add => "ADD",
            Opcode::Mul => "MUL",
            Opcode::Input => "IN",
            Opcode::Output => "OUT",
            Opcode::JumpIfTrue => "JNZ",
            Opcode::JumpIfFalse => "JZ",
            Opcode::LessThan => "LT",
            Opcode::Equals => "EQ",
            Opcode::AdjustBase => "ARB",
            Opcode::Halt => "HLT",
        }
    }
}

/// A decoded instruction word.
///
/// Only the first `opcode.operand_count()` entries of `modes` are meaningful;
/// the rest are [`Mode::Position`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instruction {
    pub opcode: Opcode,
    pub modes: [Mode; MAX_OPERANDS],
}

impl Instruction {
    /// Number of operands this instruction consumes.
    pub fn operand_count(&self) -> usize {
        self.opcode.operand_count()
    }

    /// Modes of the operands actually consumed.
    pub fn operand_modes(&self) -> &[Mode] {
        &self.modes[..self.operand_count()]
    }

    /// Instruction length in cells, including the instruction word.
    pub fn width(&self) -> usize {
        1 + self.operand_count()
    }
}

/// Decode an instruction word.
///
/// Mode digits beyond the opcode's operand count are ignored.
pub fn decode(word: i64) -> Result<Instruction, DecodeError> {
    if word < 0 {
        return Err(DecodeError::UnknownOpcode(word));
    }

    let opcode = Opcode::from_code(word % 100).ok_or(DecodeError::UnknownOpcode(word))?;

    let mut modes = [Mode::Position; MAX_OPERANDS];
    let mut digits = word / 100;
    for slot in modes.iter_mut().take(opcode.operand_count()) {
        let digit = digits % 10;
        *slot = Mode::from_digit(digit).ok_or(DecodeError::InvalidMode { word, digit })?;
        digits /= 10;
    }

    Ok(Instruction { opcode, modes })
}

/// Encode an instruction back to an instruction word.
pub fn encode(instr: &Instruction) -> i64 {
    instr
        .operand_modes()
        .iter()
        .rev()
        .fold(0, |acc, mode| acc * 10 + mode.to_digit())
        * 100
        + instr.opcode.code()
}

/// Errors that can occur during instruction decoding.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("unknown opcode in instruction word {0}")]
    UnknownOpcode(i64),

    #[error("invalid parameter mode {digit} in instruction word {word}")]
    InvalidMode { word: i64, digit: i64 },
}
