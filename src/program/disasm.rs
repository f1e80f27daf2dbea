//! Disassembler for Intcode programs.
//!
//! Converts a memory image back to readable assembly. Intcode freely mixes
//! code and data, so any word that does not decode (or whose operands would
//! run past the end of the image) is printed as `DAT` and skipped one cell
//! at a time.

use crate::vm::decode::{decode, Instruction, Mode};

/// Disassemble the instruction at `addr`.
///
/// Returns the text and the number of cells it covers, or `None` if `addr`
/// is past the end of the image.
pub fn disassemble_instruction(program: &[i64], addr: usize) -> Option<(String, usize)> {
    let word = *program.get(addr)?;
    let line = match decode(word) {
        Ok(instr) if addr + instr.width() <= program.len() => {
            let operands = &program[addr + 1..addr + instr.width()];
            (format_instruction(&instr, operands), instr.width())
        }
        _ => (format!("DAT {}", word), 1),
    };
    Some(line)
}

/// Disassemble a whole memory image.
pub fn disassemble(program: &[i64]) -> String {
    let mut output = String::new();
    output.push_str("; Intcode Disassembly\n");
    output.push_str("; -------------------\n\n");

    let mut addr = 0;
    while let Some((line, width)) = disassemble_instruction(program, addr) {
        let raw: Vec<String> = program[addr..addr + width].iter().map(i64::to_string).collect();
        output.push_str(&format!("{:04}: {:<28} ; {}\n", addr, line, raw.join(",")));
        addr += width;
    }

    output
}

/// Format a decoded instruction as assembly text.
fn format_instruction(instr: &Instruction, operands: &[i64]) -> String {
    let mnemonic = instr.opcode.mnemonic();
    if operands.is_empty() {
        return mnemonic.to_string();
    }

    let args: Vec<String> = operands
        .iter()
        .zip(instr.operand_modes())
        .map(|(&operand, &mode)| format_operand(operand, mode))
        .collect();
    format!("{} {}", mnemonic, args.join(", "))
}

/// Format an operand according to its mode.
fn format_operand(operand: i64, mode: Mode) -> String {
    match mode {
        Mode::Position => format!("[{}]", operand),
        Mode::Immediate => format!("{}", operand),
        Mode::Relative if operand < 0 => format!("[rb-{}]", operand.unsigned_abs()),
        Mode::Relative => format!("[rb+{}]", operand),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disassemble_halt() {
        let (text, width) = disassemble_instruction(&[99], 0).unwrap();
        assert_eq!(text, "HLT");
        assert_eq!(width, 1);
    }

    #[test]
    fn test_disassemble_modes() {
        let (text, width) = disassemble_instruction(&[1002, 4, 3, 4, 33], 0).unwrap();
        assert_eq!(text, "MUL [4], 3, [4]");
        assert_eq!(width, 4);

        let (text, _) = disassemble_instruction(&[204, -1], 0).unwrap();
        assert_eq!(text, "OUT [rb-1]");

        let (text, _) = disassemble_instruction(&[21107, 1, 2, 5], 0).unwrap();
        assert_eq!(text, "LT 1, 2, [rb+5]");
    }

    #[test]
    fn test_disassemble_data() {
        // 33 is not an opcode; a trailing ADD has no room for its operands
        let (text, width) = disassemble_instruction(&[33], 0).unwrap();
        assert_eq!(text, "DAT 33");
        assert_eq!(width, 1);

        let (text, width) = disassemble_instruction(&[1, 0], 0).unwrap();
        assert_eq!(text, "DAT 1");
        assert_eq!(width, 1);
    }

    #[test]
    fn test_disassemble_past_end() {
        assert_eq!(disassemble_instruction(&[], 0), None);
        assert_eq!(disassemble_instruction(&[1, 0, 0, 0, 99], 5), None);
        assert_eq!(disassemble_instruction(&[99], usize::MAX), None);
    }

    #[test]
    fn test_disassemble_listing() {
        let listing = disassemble(&[1, 9, 10, 3, 2, 3, 11, 0, 99, 30, 40, 50]);

        assert!(listing.contains("0000: ADD [9], [10], [3]"));
        assert!(listing.contains("0004: MUL [3], [11], [0]"));
        assert!(listing.contains("0008: HLT"));
        assert!(listing.contains("0009: DAT 30"));
    }
}
