//! Cooperative scheduling of VMs wired in a ring.
//!
//! Only one VM runs at a time. A turn resumes the current VM until it halts
//! or blocks, forwards whatever it emitted to the next VM's input queue, and
//! moves on. The last VM in the ring feeds the first.

use crate::vm::{Vm, VmConfig, VmError};
use thiserror::Error;
use tracing::{debug, info};

/// The external signal fed to the first amplifier.
pub const SEED_SIGNAL: i64 = 0;

/// A ring of VMs passing outputs to their successor.
#[derive(Debug)]
pub struct Ring {
    engines: Vec<Vm>,
    current: usize,
    final_output: Option<i64>,
    turns: u64,
}

impl Ring {
    /// Build one VM per phase setting, each with its phase queued first.
    pub fn new(program: &[i64], phases: &[i64]) -> Result<Self, PipelineError> {
        Self::with_config(program, phases, VmConfig::default())
    }

    /// Like [`Ring::new`] with explicit VM settings.
    pub fn with_config(
        program: &[i64],
        phases: &[i64],
        config: VmConfig,
    ) -> Result<Self, PipelineError> {
        let engines = phases
            .iter()
            .map(|&phase| Vm::with_config(program, [phase], config))
            .collect();
        Self::from_engines(engines)
    }

    /// Wire already constructed VMs into a ring, in order.
    pub fn from_engines(engines: Vec<Vm>) -> Result<Self, PipelineError> {
        if engines.is_empty() {
            return Err(PipelineError::Empty);
        }
        Ok(Self {
            engines,
            current: 0,
            final_output: None,
            turns: 0,
        })
    }

    /// Queue the external signal on the first VM.
    pub fn push_seed(&mut self, signal: i64) {
        self.engines[0].push_input([signal]);
    }

    /// Give the current VM one turn and advance to its successor.
    pub fn turn(&mut self) -> Result<(), PipelineError> {
        let index = self.current;
        let last = self.engines.len() - 1;
        let next = (index + 1) % self.engines.len();

        let engine = &mut self.engines[index];
        let state = engine
            .resume()
            .map_err(|source| PipelineError::Engine { index, source })?;
        let outputs = engine.drain_outputs();

        self.turns += 1;
        debug!(turn = self.turns, engine = index, ?state, outputs = outputs.len(), "pipeline turn");

        if let Some(&value) = outputs.last() {
            if index == last {
                self.final_output = Some(value);
            }
            self.engines[next].push_input(outputs);
        }
        self.current = next;

        Ok(())
    }

    /// Take turns until every VM has halted.
    ///
    /// Returns the last value emitted by the final VM in the ring.
    pub fn run(&mut self) -> Result<i64, PipelineError> {
        while !self.is_done() {
            self.turn()?;
            if self.is_stalled() {
                return Err(PipelineError::Stalled { turns: self.turns });
            }
        }

        let signal = self.final_output.ok_or(PipelineError::Engine {
            index: self.engines.len() - 1,
            source: VmError::ExhaustedInput,
        })?;
        info!(signal, turns = self.turns, "feedback loop finished");
        Ok(signal)
    }

    /// Check if every VM has halted.
    pub fn is_done(&self) -> bool {
        self.engines.iter().all(Vm::is_halted)
    }

    /// No VM can make progress: each is halted or waiting on an empty queue.
    pub fn is_stalled(&self) -> bool {
        !self.is_done()
            && self
                .engines
                .iter()
                .all(|vm| vm.is_halted() || (vm.is_blocked() && vm.pending_inputs() == 0))
    }

    /// The VMs, in ring order.
    pub fn engines(&self) -> &[Vm] {
        &self.engines
    }

    /// Index of the VM that runs next.
    pub fn current(&self) -> usize {
        self.current
    }

    /// Turns taken so far.
    pub fn turns(&self) -> u64 {
        self.turns
    }
}

/// Run a feedback ring seeded with [`SEED_SIGNAL`] and return the final
/// VM's last output.
pub fn run_feedback_loop(program: &[i64], phases: &[i64]) -> Result<i64, PipelineError> {
    let mut ring = Ring::new(program, phases)?;
    ring.push_seed(SEED_SIGNAL);
    ring.run()
}

/// Run each VM once, in order, passing each one's last output on as the next
/// one's signal.
pub fn run_chain(program: &[i64], phases: &[i64], seed: i64) -> Result<i64, PipelineError> {
    if phases.is_empty() {
        return Err(PipelineError::Empty);
    }

    let mut signal = seed;
    for (index, &phase) in phases.iter().enumerate() {
        let mut vm = Vm::new(program, [phase, signal]);
        vm.resume()
            .map_err(|source| PipelineError::Engine { index, source })?;
        if !vm.is_halted() {
            return Err(PipelineError::Stalled { turns: index as u64 + 1 });
        }
        signal = vm
            .last_output()
            .map_err(|source| PipelineError::Engine { index, source })?;
        debug!(engine = index, phase, signal, "chain stage");
    }

    Ok(signal)
}

/// Errors that can occur while driving a pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PipelineError {
    #[error("pipeline needs at least one phase setting")]
    Empty,

    #[error("amplifier {index}: {source}")]
    Engine {
        index: usize,
        #[source]
        source: VmError,
    },

    #[error("pipeline stalled after {turns} turns: every running amplifier is waiting for input")]
    Stalled { turns: u64 },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vm::MemoryError;

    const FEEDBACK_1: [i64; 29] = [
        3, 26, 1001, 26, -4, 26, 3, 27, 1002, 27, 2, 27, 1, 27, 26, 27, 4, 27, 1001, 28, -1, 28,
        1005, 28, 6, 99, 0, 0, 5,
    ];

    const FEEDBACK_2: [i64; 57] = [
        3, 52, 1001, 52, -5, 52, 3, 53, 1, 52, 56, 54, 1007, 54, 5, 55, 1005, 55, 26, 1001, 54,
        -5, 54, 1105, 1, 12, 1, 53, 54, 53, 1008, 54, 0, 55, 1001, 55, 1, 55, 2, 53, 55, 53, 4,
        53, 1001, 56, -1, 56, 1005, 56, 6, 99, 0, 0, 0, 0, 10,
    ];

    #[test]
    fn test_feedback_loop() {
        assert_eq!(run_feedback_loop(&FEEDBACK_1, &[9, 8, 7, 6, 5]), Ok(139629729));
        assert_eq!(run_feedback_loop(&FEEDBACK_2, &[9, 7, 8, 5, 6]), Ok(18216));
    }

    #[test]
    fn test_ring_turn_forwards_outputs() {
        let mut ring = Ring::new(&FEEDBACK_1, &[9, 8, 7, 6, 5]).unwrap();
        ring.push_seed(SEED_SIGNAL);

        ring.turn().unwrap();

        assert_eq!(ring.current(), 1);
        assert!(ring.engines()[0].is_blocked());
        assert_eq!(ring.engines()[1].pending_inputs(), 2);
        assert!(!ring.is_stalled());
    }

    #[test]
    fn test_ring_silent_turn_advances() {
        // IN; OUT; IN; OUT; HLT
        let echo_twice = [3, 9, 4, 9, 3, 9, 4, 9, 99, 0];
        // IN a; IN b; OUT a + b; HLT
        let sum_two = [3, 11, 3, 12, 1, 11, 12, 13, 4, 13, 99, 0, 0, 0];
        let mut ring = Ring::from_engines(vec![
            Vm::new(&echo_twice, [1]),
            Vm::new(&sum_two, []),
            Vm::new(&echo_twice, [2]),
        ])
        .unwrap();

        ring.turn().unwrap();
        assert_eq!(ring.engines()[1].pending_inputs(), 1);

        // The summing VM takes one signal and waits for a second
        ring.turn().unwrap();
        assert_eq!(ring.current(), 2);
        assert!(ring.engines()[1].is_blocked());
        assert_eq!(ring.engines()[2].pending_inputs(), 1);
        assert!(!ring.is_stalled());

        assert_eq!(ring.run(), Ok(3));
        assert_eq!(ring.turns(), 6);
    }

    #[test]
    fn test_ring_leaves_program_untouched() {
        let program = FEEDBACK_1.to_vec();
        let mut ring = Ring::new(&program, &[9, 8, 7, 6, 5]).unwrap();
        ring.push_seed(SEED_SIGNAL);
        ring.run().unwrap();

        assert_eq!(program, FEEDBACK_1.to_vec());
        assert!(ring.engines().iter().all(|vm| vm.is_halted()));
    }

    #[test]
    fn test_chain() {
        let program = [3, 15, 3, 16, 1002, 16, 10, 16, 1, 16, 15, 15, 4, 15, 99, 0, 0];
        assert_eq!(run_chain(&program, &[4, 3, 2, 1, 0], SEED_SIGNAL), Ok(43210));

        let program = [
            3, 23, 3, 24, 1002, 24, 10, 24, 1002, 23, -1, 23, 101, 5, 23, 23, 1, 24, 23, 23, 4, 23,
            99, 0, 0,
        ];
        assert_eq!(run_chain(&program, &[0, 1, 2, 3, 4], SEED_SIGNAL), Ok(54321));
    }

    #[test]
    fn test_empty_pipeline() {
        assert_eq!(run_feedback_loop(&[99], &[]).unwrap_err(), PipelineError::Empty);
        assert_eq!(run_chain(&[99], &[], 0), Err(PipelineError::Empty));
    }

    #[test]
    fn test_stalled_ring() {
        // Reads two values and halts without output; the second VM starves
        let result = run_feedback_loop(&[3, 0, 3, 0, 99], &[1, 2]);

        assert_eq!(result, Err(PipelineError::Stalled { turns: 2 }));
    }

    #[test]
    fn test_no_final_output() {
        let result = run_feedback_loop(&[3, 0, 3, 0, 99], &[1]);

        assert_eq!(
            result,
            Err(PipelineError::Engine { index: 0, source: VmError::ExhaustedInput })
        );
    }

    #[test]
    fn test_engine_fault_propagates() {
        let result = run_feedback_loop(&[3, 0, 4, -1], &[0, 1]);

        assert_eq!(
            result,
            Err(PipelineError::Engine {
                index: 0,
                source: VmError::Memory(MemoryError::InvalidAddress(-1)),
            })
        );
    }
}
