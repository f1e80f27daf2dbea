//! Intcode execution engine.
//!
//! Implements the fetch-decode-execute cycle and the resumable run model.
//! A VM runs until it halts or needs input it does not have. In the second
//! case it parks on the input instruction without consuming it, so the next
//! [`Vm::resume`] retries that same instruction once input has been pushed.

use std::collections::VecDeque;

use crate::vm::decode::{self, DecodeError, Instruction, Mode, Opcode, MAX_OPERANDS};
use crate::vm::memory::{Memory, MemoryError};
use crate::vm::registers::Registers;
use crate::vm::trace::TraceSink;
use serde::{Serialize, Deserialize};
use thiserror::Error;

/// VM run state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VmState {
    /// VM is executing instructions.
    Running,
    /// VM is parked on an input instruction with an empty input queue.
    Blocked,
    /// VM executed HLT. Terminal.
    Halted,
    /// VM hit a decode, addressing or arithmetic error. Terminal.
    Faulted,
}

/// Construction-time VM settings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VmConfig {
    /// Maximum number of memory cells; `None` lets memory grow without bound.
    pub memory_limit: Option<usize>,
}

/// An Intcode virtual machine.
pub struct Vm {
    /// VM registers.
    pub regs: Registers,
    /// Main memory.
    pub mem: Memory,
    state: VmState,
    inputs: VecDeque<i64>,
    outputs: VecDeque<i64>,
    last_output: Option<i64>,
    /// Instructions executed to completion (blocked attempts excluded).
    steps: u64,
    sink: Option<Box<dyn TraceSink>>,
}

impl Vm {
    /// Create a VM holding its own copy of `program`, with `inputs` queued.
    pub fn new(program: &[i64], inputs: impl IntoIterator<Item = i64>) -> Self {
        Self::with_config(program, inputs, VmConfig::default())
    }

    /// Create a VM with explicit settings.
    pub fn with_config(
        program: &[i64],
        inputs: impl IntoIterator<Item = i64>,
        config: VmConfig,
    ) -> Self {
        Self {
            regs: Registers::new(),
            mem: Memory::with_limit(program, config.memory_limit),
            state: VmState::Running,
            inputs: inputs.into_iter().collect(),
            outputs: VecDeque::new(),
            last_output: None,
            steps: 0,
            sink: None,
        }
    }

    /// Attach a trace sink.
    pub fn with_sink(mut self, sink: Box<dyn TraceSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Run until the VM halts or blocks on input.
    ///
    /// Resuming a halted VM is a no-op. Resuming a faulted VM fails.
    pub fn resume(&mut self) -> Result<VmState, VmError> {
        self.resume_limited(u64::MAX)
    }

    /// Run for at most `max_steps` instruction attempts.
    ///
    /// Returns [`VmState::Running`] if the budget ran out first.
    pub fn resume_limited(&mut self, max_steps: u64) -> Result<VmState, VmError> {
        match self.state {
            VmState::Halted => return Ok(VmState::Halted),
            VmState::Faulted => return Err(VmError::NotRunning(VmState::Faulted)),
            VmState::Blocked => self.state = VmState::Running,
            VmState::Running => {}
        }

        let mut attempts = 0;
        while self.state == VmState::Running && attempts < max_steps {
            self.step()?;
            attempts += 1;
        }

        Ok(self.state)
    }

    /// Execute a single instruction.
    ///
    /// Returns the instruction that was fetched. If it was an input with no
    /// input queued, the VM is now [`VmState::Blocked`] and the instruction
    /// pointer has not moved.
    pub fn step(&mut self) -> Result<Instruction, VmError> {
        if self.state != VmState::Running {
            return Err(VmError::NotRunning(self.state));
        }

        let ip = self.regs.ip;
        match self.execute() {
            Ok(instr) => Ok(instr),
            Err(e) => {
                self.state = VmState::Faulted;
                self.regs.ip = ip;
                tracing::debug!(ip, error = %e, "vm fault");
                if let Some(sink) = self.sink.as_mut() {
                    sink.fault(ip, &e);
                }
                Err(e)
            }
        }
    }

    fn execute(&mut self) -> Result<Instruction, VmError> {
        // Fetch
        let ip = self.regs.ip;
        let word = self.mem.read(ip as i64)?;

        // Decode
        let instr = decode::decode(word)?;
        let count = instr.operand_count();

        // Resolve operands: values for reads, addresses for the write target
        let mut raw = [0i64; MAX_OPERANDS];
        let mut args = [0i64; MAX_OPERANDS];
        for n in 0..count {
            raw[n] = self.mem.read(self.regs.operand_addr(n))?;
            args[n] = if instr.opcode.write_operand() == Some(n) {
                self.write_target(raw[n], instr.modes[n])?
            } else {
                self.load(raw[n], instr.modes[n])?
            };
        }

        if let Some(sink) = self.sink.as_mut() {
            sink.instruction(ip, &instr, &raw[..count]);
        }

        // Execute
        let [a, b, c] = args;
        let mut next_ip = None;

        match instr.opcode {
            // ==================== Arithmetic ====================

            Opcode::Add => {
                let sum = a.checked_add(b).ok_or(VmError::Overflow { ip })?;
                self.mem.write(c, sum)?;
            }

            Opcode::Mul => {
                let product = a.checked_mul(b).ok_or(VmError::Overflow { ip })?;
                self.mem.write(c, product)?;
            }

            // ==================== I/O ====================

            Opcode::Input => {
                let Some(&value) = self.inputs.front() else {
                    self.state = VmState::Blocked;
                    if let Some(sink) = self.sink.as_mut() {
                        sink.blocked(ip);
                    }
                    return Ok(instr);
                };
                self.mem.write(a, value)?;
                self.inputs.pop_front();
                if let Some(sink) = self.sink.as_mut() {
                    sink.input(ip, value, a);
                }
            }

            Opcode::Output => {
                self.outputs.push_back(a);
                self.last_output = Some(a);
                if let Some(sink) = self.sink.as_mut() {
                    sink.output(ip, a);
                }
            }

            // ==================== Control Flow ====================

            Opcode::JumpIfTrue => {
                if a != 0 {
                    next_ip = Some(jump_target(b)?);
                }
            }

            Opcode::JumpIfFalse => {
                if a == 0 {
                    next_ip = Some(jump_target(b)?);
                }
            }

            // ==================== Comparison ====================

            Opcode::LessThan => {
                self.mem.write(c, i64::from(a < b))?;
            }

            Opcode::Equals => {
                self.mem.write(c, i64::from(a == b))?;
            }

            // ==================== Special ====================

            Opcode::AdjustBase => {
                self.regs.relative_base = self
                    .regs
                    .relative_base
                    .checked_add(a)
                    .ok_or(VmError::Overflow { ip })?;
            }

            Opcode::Halt => {
                self.state = VmState::Halted;
            }
        }

        match next_ip {
            Some(target) => self.regs.jump(target),
            None => {
                self.regs.advance_ip(instr.width());
            }
        }
        self.steps += 1;

        if self.state == VmState::Halted {
            if let Some(sink) = self.sink.as_mut() {
                sink.halted(ip, self.steps);
            }
        }

        Ok(instr)
    }

    /// Resolve a read operand to its value.
    fn load(&mut self, operand: i64, mode: Mode) -> Result<i64, VmError> {
        if mode == Mode::Immediate {
            return Ok(operand);
        }
        let addr = self
            .regs
            .effective_address(operand, mode)
            .ok_or(VmError::Overflow { ip: self.regs.ip })?;
        Ok(self.mem.read(addr)?)
    }

    /// Resolve a write operand to the address it names.
    fn write_target(&self, operand: i64, mode: Mode) -> Result<i64, VmError> {
        if mode == Mode::Immediate {
            return Err(VmError::InvalidWriteMode { ip: self.regs.ip });
        }
        self.regs
            .effective_address(operand, mode)
            .ok_or(VmError::Overflow { ip: self.regs.ip })
    }

    /// Queue more input. Allowed in any state.
    pub fn push_input(&mut self, values: impl IntoIterator<Item = i64>) {
        self.inputs.extend(values);
    }

    /// Take every output produced since the last drain, oldest first.
    pub fn drain_outputs(&mut self) -> Vec<i64> {
        self.outputs.drain(..).collect()
    }

    /// Take the oldest undrained output.
    pub fn next_output(&mut self) -> Result<i64, VmError> {
        self.outputs.pop_front().ok_or(VmError::ExhaustedInput)
    }

    /// The most recent output ever produced, drained or not.
    pub fn last_output(&self) -> Result<i64, VmError> {
        self.last_output.ok_or(VmError::ExhaustedInput)
    }

    /// Number of queued input values not yet consumed.
    pub fn pending_inputs(&self) -> usize {
        self.inputs.len()
    }

    /// Current run state.
    pub fn state(&self) -> VmState {
        self.state
    }

    /// Current instruction pointer.
    pub fn ip(&self) -> usize {
        self.regs.ip
    }

    /// Instructions executed so far.
    pub fn steps(&self) -> u64 {
        self.steps
    }

    /// Check if the VM has halted.
    pub fn is_halted(&self) -> bool {
        self.state == VmState::Halted
    }

    /// Check if the VM is waiting for input.
    pub fn is_blocked(&self) -> bool {
        self.state == VmState::Blocked
    }

    /// Check if the VM has faulted.
    pub fn is_faulted(&self) -> bool {
        self.state == VmState::Faulted
    }

    /// Capture the full machine state.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            regs: self.regs,
            state: self.state,
            memory: self.mem.clone(),
            inputs: self.inputs.iter().copied().collect(),
            outputs: self.outputs.iter().copied().collect(),
            last_output: self.last_output,
            steps: self.steps,
        }
    }

    /// Rebuild a VM from a snapshot. The trace sink is not part of a
    /// snapshot; attach one with [`Vm::with_sink`].
    pub fn from_snapshot(snapshot: Snapshot) -> Self {
        Self {
            regs: snapshot.regs,
            mem: snapshot.memory,
            state: snapshot.state,
            inputs: snapshot.inputs.into(),
            outputs: snapshot.outputs.into(),
            last_output: snapshot.last_output,
            steps: snapshot.steps,
            sink: None,
        }
    }
}

fn jump_target(addr: i64) -> Result<usize, VmError> {
    usize::try_from(addr).map_err(|_| VmError::Memory(MemoryError::InvalidAddress(addr)))
}

impl std::fmt::Debug for Vm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Vm")
            .field("state", &self.state)
            .field("steps", &self.steps)
            .field("regs", &self.regs)
            .field("mem", &self.mem)
            .field("inputs", &self.inputs.len())
            .field("outputs", &self.outputs.len())
            .finish()
    }
}

/// A serializable copy of a VM's state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub regs: Registers,
    pub state: VmState,
    pub memory: Memory,
    pub inputs: Vec<i64>,
    pub outputs: Vec<i64>,
    pub last_output: Option<i64>,
    pub steps: u64,
}

/// Errors that can occur during VM execution.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VmError {
    #[error("VM not running: {0:?}")]
    NotRunning(VmState),

    #[error("memory error: {0}")]
    Memory(#[from] MemoryError),

    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),

    #[error("write target in immediate mode at ip {ip}")]
    InvalidWriteMode { ip: usize },

    #[error("arithmetic overflow at ip {ip}")]
    Overflow { ip: usize },

    #[error("no output has been produced")]
    ExhaustedInput,
}
