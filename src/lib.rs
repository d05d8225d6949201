//! # Introduction
//!
//! Javelin is an educational Java virtual machine emulator: it ingests
//! Java-8 source, lowers it into a stack-machine instruction set, and
//! executes it under an inspectable, reversible, multi-threaded runtime.
//! A snapshot of the full machine state is captured before each step, so
//! execution can be navigated forward and backward.
//!
//! ## Execution pipeline
//!
//! ```text
//! Source → Lexer → Parser → AST → Compiler → Bytecode → Simulator → Snapshots
//! ```
//!
//! 1. [`parser`] — tokenises the source and builds an AST.
//! 2. [`compiler`] — lowers the AST into a flat instruction vector with a
//!    method offset table.
//! 3. [`interpreter`] — the stepping [`interpreter::engine::Simulator`]:
//!    one instruction of one thread per step, round-robin scheduling,
//!    monitors, and a standard-library emulation layer.
//! 4. [`memory`] — the memory model: tagged [`memory::value::Value`]
//!    variants, the heap arena, frames, threads, and the method area.
//! 5. [`snapshot`] — the bounded snapshot ring enabling reverse execution.
//!
//! ## Supported Java subset
//!
//! Classes, interfaces, inheritance, static and instance members,
//! constructors, the full statement and expression grammar including
//! lambdas (recorded, not executed) and `synchronized` blocks (lock
//! expression discarded), plus an emulated JDK surface: String, boxed
//! numerics, Math, collections, StringBuilder, Thread and monitors.

pub mod compiler;
pub mod interpreter;
pub mod memory;
pub mod parser;
pub mod snapshot;

pub use compiler::CompiledProgram;
pub use interpreter::engine::Simulator;
pub use interpreter::state::{VmState, VmStatus};
pub use parser::parse::ParseError;
pub use snapshot::ExecutionResult;

/// Compile Java source into an executable program: lexer, parser and
/// compiler in one call. Lexical errors surface as [`ParseError`]s with
/// their original position.
pub fn compile(source: &str) -> Result<CompiledProgram, ParseError> {
    let mut parser = parser::parse::Parser::new(source)?;
    let program = parser.parse_program()?;
    Ok(compiler::compile(&program))
}

/// Convenience constructor: compile and wrap in a paused [`Simulator`]
pub fn new_simulator(source: &str) -> Result<Simulator, ParseError> {
    Ok(Simulator::new(compile(source)?))
}
