//! Bytecode instructions for the emulated JVM
//!
//! A stack-based instruction set. Unlike real class files the encoding is
//! symbolic: each [`Instruction`] carries an [`Opcode`], structured
//! [`Operand`]s, and the source line that produced it, so UI consumers can
//! render the program without a separate disassembler. Jump targets stored
//! in the global instruction vector are absolute indices.

use rustc_hash::FxHashMap;
use std::fmt;

use crate::memory::value::Value;

/// Opcodes for the VM
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Opcode {
    // Markers
    Nop,
    Line, // source-line marker for UI highlighting

    // Constants
    LoadConst,
    PushNull,

    // Locals
    LoadLocal,
    StoreLocal,

    // Objects and arrays
    New,
    NewArray,
    ArrayLength,
    ArrayLoad,
    ArrayStore,
    GetField,
    PutField,
    GetStatic,
    PutStatic,

    // Operand stack
    Dup,
    DupX1,
    Pop,
    Swap,

    // Arithmetic
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Neg,

    // Comparison
    CmpEq,
    CmpNe,
    CmpLt,
    CmpLe,
    CmpGt,
    CmpGe,

    // Logical
    And,
    Or,
    Not,

    // Control flow
    Goto,
    IfTrue,
    IfFalse,

    // Calls
    InvokeVirtual,
    InvokeInterface,
    InvokeSpecial,
    InvokeStatic,
    Return,
    ReturnValue,

    // Types
    Checkcast,
    InstanceOf,

    // Lambdas
    LambdaCreate,
    LambdaInvoke,

    // Miscellaneous
    Print,
    Throw,
    MonitorEnter,
    MonitorExit,
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Opcode::Nop => "NOP",
            Opcode::Line => "LINE",
            Opcode::LoadConst => "LOAD_CONST",
            Opcode::PushNull => "PUSH_NULL",
            Opcode::LoadLocal => "LOAD_LOCAL",
            Opcode::StoreLocal => "STORE_LOCAL",
            Opcode::New => "NEW",
            Opcode::NewArray => "NEWARRAY",
            Opcode::ArrayLength => "ARRAYLENGTH",
            Opcode::ArrayLoad => "ARRAYLOAD",
            Opcode::ArrayStore => "ARRAYSTORE",
            Opcode::GetField => "GETFIELD",
            Opcode::PutField => "PUTFIELD",
            Opcode::GetStatic => "GETSTATIC",
            Opcode::PutStatic => "PUTSTATIC",
            Opcode::Dup => "DUP",
            Opcode::DupX1 => "DUP_X1",
            Opcode::Pop => "POP",
            Opcode::Swap => "SWAP",
            Opcode::Add => "ADD",
            Opcode::Sub => "SUB",
            Opcode::Mul => "MUL",
            Opcode::Div => "DIV",
            Opcode::Mod => "MOD",
            Opcode::Neg => "NEG",
            Opcode::CmpEq => "CMP_EQ",
            Opcode::CmpNe => "CMP_NE",
            Opcode::CmpLt => "CMP_LT",
            Opcode::CmpLe => "CMP_LE",
            Opcode::CmpGt => "CMP_GT",
            Opcode::CmpGe => "CMP_GE",
            Opcode::And => "AND",
            Opcode::Or => "OR",
            Opcode::Not => "NOT",
            Opcode::Goto => "GOTO",
            Opcode::IfTrue => "IF_TRUE",
            Opcode::IfFalse => "IF_FALSE",
            Opcode::InvokeVirtual => "INVOKE_VIRTUAL",
            Opcode::InvokeInterface => "INVOKE_INTERFACE",
            Opcode::InvokeSpecial => "INVOKE_SPECIAL",
            Opcode::InvokeStatic => "INVOKE_STATIC",
            Opcode::Return => "RETURN",
            Opcode::ReturnValue => "RETURN_VALUE",
            Opcode::Checkcast => "CHECKCAST",
            Opcode::InstanceOf => "INSTANCEOF",
            Opcode::LambdaCreate => "LAMBDA_CREATE",
            Opcode::LambdaInvoke => "LAMBDA_INVOKE",
            Opcode::Print => "PRINT",
            Opcode::Throw => "THROW",
            Opcode::MonitorEnter => "MONITORENTER",
            Opcode::MonitorExit => "MONITOREXIT",
        };
        write!(f, "{}", name)
    }
}

/// Structured instruction operands
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Int(i64),
    Float(f64),
    Str(String),
    Bool(bool),
    Char(char),
    /// A class name, e.g. the target of `NEW` or the owner of `INVOKE_STATIC`
    Class(String),
    /// A method name with its argument-count descriptor
    Method { name: String, argc: usize },
    /// A field name with the class that owns it (statics)
    Field { name: String, owner: String },
    /// A local slot with its source-level name
    Local { index: usize, name: String },
    /// A jump target; absolute once the method is appended to the program
    Label(usize),
    /// A type name (casts, instanceof, array element types)
    Type(String),
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Int(n) => write!(f, "{}", n),
            Operand::Float(x) => write!(f, "{}", x),
            Operand::Str(s) => write!(f, "\"{}\"", s),
            Operand::Bool(b) => write!(f, "{}", b),
            Operand::Char(c) => write!(f, "'{}'", c),
            Operand::Class(name) => write!(f, "{}", name),
            Operand::Method { name, argc } => write!(f, "{}/{}", name, argc),
            Operand::Field { name, owner } => write!(f, "{}.{}", owner, name),
            Operand::Local { index, name } => write!(f, "{}:{}", index, name),
            Operand::Label(target) => write!(f, "->{}", target),
            Operand::Type(name) => write!(f, "{}", name),
        }
    }
}

/// One element of the flat instruction vector
#[derive(Debug, Clone, PartialEq)]
pub struct Instruction {
    pub opcode: Opcode,
    pub operands: Vec<Operand>,
    pub source_line: usize,
    pub comment: Option<String>,
}

impl Instruction {
    pub fn new(opcode: Opcode, operands: Vec<Operand>, source_line: usize) -> Self {
        Instruction {
            opcode,
            operands,
            source_line,
            comment: None,
        }
    }

    pub fn with_comment(mut self, comment: &str) -> Self {
        self.comment = Some(comment.to_string());
        self
    }

    pub fn operand(&self, index: usize) -> Option<&Operand> {
        self.operands.get(index)
    }

    /// The jump target of a control-flow instruction
    pub fn label_target(&self) -> Option<usize> {
        self.operands.iter().find_map(|op| match op {
            Operand::Label(target) => Some(*target),
            _ => None,
        })
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.opcode)?;
        for op in &self.operands {
            write!(f, " {}", op)?;
        }
        Ok(())
    }
}

/// One compiled parameter
#[derive(Debug, Clone)]
pub struct CompiledParam {
    pub name: String,
    pub param_type: String,
}

/// One compiled method: signature plus the location of its code in the
/// global instruction vector
#[derive(Debug, Clone)]
pub struct CompiledMethod {
    pub name: String,
    /// `name(T1,T2,...)`
    pub signature: String,
    pub params: Vec<CompiledParam>,
    pub return_type: String,
    pub is_static: bool,
    pub is_constructor: bool,
    /// None for abstract/native methods and interface signatures
    pub offset: Option<usize>,
    pub code_len: usize,
    pub max_locals: usize,
}

/// One compiled field
#[derive(Debug, Clone)]
pub struct CompiledField {
    pub name: String,
    pub field_type: String,
    pub is_static: bool,
    /// Literal initialiser value, when the source provided one
    pub constant: Option<Value>,
}

/// One compiled class or interface
#[derive(Debug, Clone)]
pub struct CompiledClass {
    pub name: String,
    pub super_class: Option<String>,
    pub interfaces: Vec<String>,
    pub fields: Vec<CompiledField>,
    pub methods: Vec<CompiledMethod>,
    pub is_interface: bool,
    pub is_abstract: bool,
}

impl CompiledClass {
    /// Find a method by name and arity, preferring exact arity matches and
    /// falling back to a name-only match
    pub fn find_method(&self, name: &str, argc: usize) -> Option<&CompiledMethod> {
        self.methods
            .iter()
            .find(|m| m.name == name && m.params.len() == argc)
            .or_else(|| self.methods.iter().find(|m| m.name == name))
    }
}

/// The compiler's output: classes, the entry point, and one flat
/// instruction vector shared by every method
#[derive(Debug, Clone)]
pub struct CompiledProgram {
    pub classes: Vec<CompiledClass>,
    pub main_class: String,
    pub main_method: String,
    pub instructions: Vec<Instruction>,
    /// `"Class.signature"` → start index in `instructions`
    pub method_offsets: FxHashMap<String, usize>,
}

impl CompiledProgram {
    pub fn class(&self, name: &str) -> Option<&CompiledClass> {
        self.classes.iter().find(|c| c.name == name)
    }

    /// Resolve a method by walking the superclass chain from `class_name`
    pub fn resolve_method(
        &self,
        class_name: &str,
        method: &str,
        argc: usize,
    ) -> Option<(&CompiledClass, &CompiledMethod)> {
        let mut current = Some(class_name.to_string());
        let mut hops = 0;
        while let Some(name) = current {
            if let Some(class) = self.class(&name) {
                if let Some(found) = class.find_method(method, argc) {
                    return Some((class, found));
                }
                current = class.super_class.clone();
            } else {
                return None;
            }
            hops += 1;
            if hops > 64 {
                return None;
            }
        }
        None
    }
}
