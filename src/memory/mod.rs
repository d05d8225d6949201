//! Memory model for the emulated JVM
//!
//! This module provides the core memory abstractions:
//! - [`value`]: the tagged runtime [`value::Value`] variant
//! - [`heap`]: the object arena, indexed by stable ids
//! - [`frame`]: activation records with locals and an operand stack
//! - [`thread`]: simulated thread state and lifecycle
//! - [`method_area`]: loaded classes and static fields
//!
//! # Design
//!
//! Everything here is plain owned data deriving `Clone`; a deep copy of the
//! whole machine state is a single `clone()`, which is what makes snapshot
//! history and reverse execution safe against later in-place mutation.

pub mod frame;
pub mod heap;
pub mod method_area;
pub mod thread;
pub mod value;
