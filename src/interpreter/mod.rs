//! Execution engine
//!
//! This module provides the stepping interpreter:
//! - [`state`]: the complete [`state::VmState`] and console output model
//! - [`engine`]: the [`engine::Simulator`] facade (step, step back, run)
//! - [`scheduler`]: round-robin thread rotation, timers, monitor wake-ups
//! - [`ops`]: opcode semantics, split per concern
//! - [`stdlib`]: the JDK emulation layer intercepting well-known calls
//!
//! # Execution Model
//!
//! One `step()` executes exactly one instruction of exactly one thread,
//! plus scheduler bookkeeping; a deep state snapshot taken before each
//! step makes execution reversible. Inside a step there are no suspension
//! points — the call is atomic at the host level.

pub mod engine;
pub mod ops;
pub mod scheduler;
pub mod state;
pub mod stdlib;
