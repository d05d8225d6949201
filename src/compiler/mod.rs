//! Bytecode compiler
//!
//! This module lowers the AST into the flat instruction vector the
//! interpreter executes:
//! - [`instruction`]: the [`instruction::Opcode`] set, structured operands,
//!   and the [`instruction::CompiledProgram`] container
//! - [`codegen`]: the AST walker that emits code, assigns local slots, and
//!   globalises per-method jump labels
//!
//! The compiler is total: it never fails on a parsed program. Anything it
//! cannot resolve statically (unknown methods, duck-typed fields) is left
//! to the interpreter's soft-fail dispatch.

pub mod codegen;
pub mod instruction;

pub use codegen::compile;
pub use instruction::{
    CompiledClass, CompiledField, CompiledMethod, CompiledParam, CompiledProgram, Instruction,
    Opcode, Operand,
};
