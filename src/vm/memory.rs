//! Intcode memory subsystem.
//!
//! Memory is a tape of signed 64-bit cells addressed from zero. The tape
//! grows on demand: any read or write past the current end extends it with
//! zeros up to and including the touched address. It never shrinks.
//!
//! By default there is no upper bound on the address space. A cap can be
//! configured with [`Memory::with_limit`]; growth beyond it fails with
//! [`MemoryError::LimitExceeded`] instead of exhausting the host. Without a
//! cap, an address the host cannot allocate fails with
//! [`MemoryError::OutOfMemory`].

use serde::{Serialize, Deserialize};
use thiserror::Error;

/// Growable Intcode memory tape.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Memory {
    cells: Vec<i64>,
    limit: Option<usize>,
}

impl Memory {
    /// Create memory holding a copy of `program` at address 0.
    pub fn new(program: &[i64]) -> Self {
        Self {
            cells: program.to_vec(),
            limit: None,
        }
    }

    /// Create memory that refuses to grow past `limit` cells.
    pub fn with_limit(program: &[i64], limit: Option<usize>) -> Self {
        Self {
            cells: program.to_vec(),
            limit,
        }
    }

    /// Read a cell, extending the tape if the address is past the end.
    pub fn read(&mut self, addr: i64) -> Result<i64, MemoryError> {
        let index = self.index(addr)?;
        self.grow_to(index)?;
        Ok(self.cells[index])
    }

    /// Write a cell, extending the tape if the address is past the end.
    pub fn write(&mut self, addr: i64, value: i64) -> Result<(), MemoryError> {
        let index = self.index(addr)?;
        self.grow_to(index)?;
        self.cells[index] = value;
        Ok(())
    }

    /// Read the half-open range `start..end`, extending the tape to cover it.
    pub fn read_range(&mut self, start: i64, end: i64) -> Result<Vec<i64>, MemoryError> {
        let first = self.index(start)?;
        let last = self.index(end)?;
        if last <= first {
            return Ok(Vec::new());
        }
        self.grow_to(last - 1)?;
        Ok(self.cells[first..last].to_vec())
    }

    /// Number of cells currently backed by the tape.
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Check if the tape holds no cells at all.
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// The configured growth cap, if any.
    pub fn limit(&self) -> Option<usize> {
        self.limit
    }

    /// The backing cells.
    pub fn as_slice(&self) -> &[i64] {
        &self.cells
    }

    /// Dump a window of memory without growing it (for diagnostics).
    pub fn dump(&self, start: usize, count: usize) -> Vec<(usize, i64)> {
        let end = start.saturating_add(count).min(self.cells.len());
        (start.min(end)..end)
            .map(|i| (i, self.cells[i]))
            .collect()
    }

    fn index(&self, addr: i64) -> Result<usize, MemoryError> {
        usize::try_from(addr).map_err(|_| MemoryError::InvalidAddress(addr))
    }

    fn grow_to(&mut self, index: usize) -> Result<(), MemoryError> {
        if index < self.cells.len() {
            return Ok(());
        }
        if let Some(limit) = self.limit {
            if index >= limit {
                return Err(MemoryError::LimitExceeded { address: index, limit });
            }
        }
        self.cells
            .try_reserve(index + 1 - self.cells.len())
            .map_err(|_| MemoryError::OutOfMemory { address: index })?;
        self.cells.resize(index + 1, 0);
        Ok(())
    }
}

impl Default for Memory {
    fn default() -> Self {
        Self::new(&[])
    }
}

impl std::fmt::Debug for Memory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let non_zero = self.cells.iter().filter(|&&cell| cell != 0).count();

        f.debug_struct("Memory")
            .field("non_zero_cells", &non_zero)
            .field("total_cells", &self.cells.len())
            .field("limit", &self.limit)
            .finish()
    }
}

/// Errors that can occur during memory operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MemoryError {
    /// Negative addresses are never valid.
    #[error("invalid memory address {0}")]
    InvalidAddress(i64),

    /// Growth would exceed the configured cap.
    #[error("memory address {address} exceeds limit of {limit} cells")]
    LimitExceeded { address: usize, limit: usize },

    /// The host could not allocate enough cells to reach the address.
    #[error("cannot allocate memory up to address {address}")]
    OutOfMemory { address: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_read_write() {
        let mut mem = Memory::new(&[1, 2, 3]);

        mem.write(1, 42).unwrap();
        assert_eq!(mem.read(1).unwrap(), 42);
        assert_eq!(mem.read(2).unwrap(), 3);
    }

    #[test]
    fn test_read_past_end_grows() {
        let mut mem = Memory::new(&[7]);

        assert_eq!(mem.read(9).unwrap(), 0);
        assert_eq!(mem.len(), 10);
        assert_eq!(mem.read(0).unwrap(), 7);
    }

    #[test]
    fn test_far_write_zero_fills() {
        let mut mem = Memory::new(&[]);

        mem.write(10_000, -5).unwrap();
        assert_eq!(mem.len(), 10_001);
        assert!(mem.as_slice()[..10_000].iter().all(|&c| c == 0));
        assert_eq!(mem.read(10_000).unwrap(), -5);
    }

    #[test]
    fn test_negative_address() {
        let mut mem = Memory::new(&[1, 2, 3]);

        assert_eq!(mem.read(-1), Err(MemoryError::InvalidAddress(-1)));
        assert_eq!(mem.write(-7, 0), Err(MemoryError::InvalidAddress(-7)));
        assert_eq!(mem.read_range(-1, 2), Err(MemoryError::InvalidAddress(-1)));
        assert_eq!(mem.len(), 3);
    }

    #[test]
    fn test_read_range_extends() {
        let mut mem = Memory::new(&[1, 2]);

        assert_eq!(mem.read_range(1, 5).unwrap(), vec![2, 0, 0, 0]);
        assert_eq!(mem.len(), 5);
        assert!(mem.read_range(3, 3).unwrap().is_empty());
    }

    #[test]
    fn test_limit() {
        let mut mem = Memory::with_limit(&[0; 4], Some(8));

        assert!(mem.write(7, 1).is_ok());
        assert_eq!(
            mem.write(8, 1),
            Err(MemoryError::LimitExceeded { address: 8, limit: 8 })
        );
        assert_eq!(mem.len(), 8);
    }

    #[test]
    fn test_unallocatable_address() {
        let mut mem = Memory::new(&[1, 2]);
        let addr = 1i64 << 62;

        assert_eq!(
            mem.read(addr),
            Err(MemoryError::OutOfMemory { address: addr as usize })
        );
        assert!(mem.write(i64::MAX, 1).is_err());
        assert_eq!(mem.len(), 2);
    }

    #[test]
    fn test_dump_does_not_grow() {
        let mem = Memory::new(&[0, 5, 0, 9]);

        assert_eq!(mem.dump(1, 10), vec![(1, 5), (2, 0), (3, 9)]);
        assert!(mem.dump(20, 3).is_empty());
        assert_eq!(mem.len(), 4);
    }
}
