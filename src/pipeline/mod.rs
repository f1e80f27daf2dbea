//! Amplifier pipelines.
//!
//! Several VMs share one program image and pass signals along a chain:
//! - [`run_chain`] runs each VM to completion once, left to right
//! - [`run_feedback_loop`] wires the chain into a ring and takes turns
//!   until every VM has halted

pub mod ring;

pub use ring::{Ring, PipelineError, run_chain, run_feedback_loop, SEED_SIGNAL};
