//! Intcode program text.
//!
//! Programs are stored as comma-separated decimal integers, e.g.
//! `1,9,10,3,2,3,11,0,99,30,40,50`. Whitespace around tokens and a trailing
//! newline are tolerated.

use std::path::Path;
use thiserror::Error;

/// Parse program text into a memory image.
pub fn parse_program(text: &str) -> Result<Vec<i64>, LoadError> {
    let text = text.trim();
    if text.is_empty() {
        return Ok(Vec::new());
    }

    text.split(',')
        .enumerate()
        .map(|(index, token)| {
            let token = token.trim();
            token.parse::<i64>().map_err(|_| LoadError::Parse {
                index,
                token: token.to_string(),
            })
        })
        .collect()
}

/// Load a program file from disk.
pub fn load_program<P: AsRef<Path>>(path: P) -> Result<Vec<i64>, LoadError> {
    let text = std::fs::read_to_string(path.as_ref())
        .map_err(|e| LoadError::Io(format!("{}: {}", path.as_ref().display(), e)))?;
    parse_program(&text)
}

/// Format a memory image as program text.
pub fn format_program(program: &[i64]) -> String {
    program
        .iter()
        .map(i64::to_string)
        .collect::<Vec<_>>()
        .join(",")
}

/// Errors that can occur while loading a program.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoadError {
    #[error("I/O error: {0}")]
    Io(String),

    #[error("parse error at value {index}: {token:?} is not an integer")]
    Parse { index: usize, token: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_program() {
        assert_eq!(parse_program("1,0,0,3,99\n").unwrap(), vec![1, 0, 0, 3, 99]);
        assert_eq!(parse_program(" 104, -7 ,99").unwrap(), vec![104, -7, 99]);
        assert!(parse_program("").unwrap().is_empty());
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(
            parse_program("1,,99"),
            Err(LoadError::Parse { index: 1, token: String::new() })
        );
        assert_eq!(
            parse_program("1,2,x"),
            Err(LoadError::Parse { index: 2, token: "x".to_string() })
        );
    }

    #[test]
    fn test_format_program() {
        let program = vec![1102, 34915192, -1, 99];
        assert_eq!(format_program(&program), "1102,34915192,-1,99");
        assert_eq!(parse_program(&format_program(&program)).unwrap(), program);
    }

    #[test]
    fn test_load_missing_file() {
        let err = load_program("/nonexistent/program.txt").unwrap_err();
        assert!(matches!(err, LoadError::Io(_)));
    }
}
