// AST definitions for the Java subset

/// Source location information for error reporting and line highlighting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceLocation {
    pub line: usize,
    pub column: usize,
}

impl SourceLocation {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

/// A type name as written in source. Generic arguments are preserved only
/// to reconstruct the display name; wildcards appear as a type named `?`.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeNode {
    pub name: String,
    pub type_args: Vec<TypeNode>,
    pub array_dims: usize,
}

impl TypeNode {
    pub fn new(name: &str) -> Self {
        TypeNode {
            name: name.to_string(),
            type_args: Vec::new(),
            array_dims: 0,
        }
    }

    pub fn is_void(&self) -> bool {
        self.name == "void" && self.array_dims == 0
    }

    /// Reconstruct the source spelling, e.g. `Map<String, Integer>[]`
    pub fn display_name(&self) -> String {
        let mut out = self.name.clone();
        if !self.type_args.is_empty() {
            let args: Vec<String> = self.type_args.iter().map(|t| t.display_name()).collect();
            out.push('<');
            out.push_str(&args.join(", "));
            out.push('>');
        }
        for _ in 0..self.array_dims {
            out.push_str("[]");
        }
        out
    }
}

/// Binary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
    BitAnd,
    BitOr,
}

/// Unary prefix operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnOp {
    Neg,
    Not,
}

/// A lambda body is either a bare expression or a block
#[derive(Debug, Clone)]
pub enum LambdaBody {
    Expr(Box<Expr>),
    Block(Vec<Stmt>),
}

/// Expressions
#[derive(Debug, Clone)]
pub enum Expr {
    IntLit(i64, SourceLocation),
    FloatLit(f64, SourceLocation),
    StringLit(String, SourceLocation),
    CharLit(char, SourceLocation),
    BoolLit(bool, SourceLocation),
    NullLit(SourceLocation),
    Ident(String, SourceLocation),
    This(SourceLocation),
    Super(SourceLocation),
    Binary {
        op: BinOp,
        left: Box<Expr>,
        right: Box<Expr>,
        location: SourceLocation,
    },
    Unary {
        op: UnOp,
        operand: Box<Expr>,
        location: SourceLocation,
    },
    /// `++x`, `x++`, `--x`, `x--`
    IncDec {
        target: Box<Expr>,
        increment: bool,
        prefix: bool,
        location: SourceLocation,
    },
    /// Assignment; `op` is Some for compound forms (`+=` etc.)
    Assign {
        target: Box<Expr>,
        op: Option<BinOp>,
        value: Box<Expr>,
        location: SourceLocation,
    },
    Ternary {
        condition: Box<Expr>,
        then_expr: Box<Expr>,
        else_expr: Box<Expr>,
        location: SourceLocation,
    },
    Cast {
        target_type: TypeNode,
        expr: Box<Expr>,
        location: SourceLocation,
    },
    InstanceOf {
        expr: Box<Expr>,
        target_type: TypeNode,
        location: SourceLocation,
    },
    FieldAccess {
        object: Box<Expr>,
        field: String,
        location: SourceLocation,
    },
    ArrayAccess {
        array: Box<Expr>,
        index: Box<Expr>,
        location: SourceLocation,
    },
    /// A call; `receiver` is None for unqualified calls on `this`/statics
    MethodCall {
        receiver: Option<Box<Expr>>,
        name: String,
        args: Vec<Expr>,
        location: SourceLocation,
    },
    New {
        class_name: String,
        args: Vec<Expr>,
        location: SourceLocation,
    },
    NewArray {
        element_type: TypeNode,
        dims: Vec<Expr>,
        init: Option<Vec<Expr>>,
        location: SourceLocation,
    },
    Lambda {
        params: Vec<String>,
        body: LambdaBody,
        location: SourceLocation,
    },
    /// Method reference `Target::method`
    MethodRef {
        target: String,
        method: String,
        location: SourceLocation,
    },
}

impl Expr {
    pub fn location(&self) -> SourceLocation {
        match self {
            Expr::IntLit(_, loc)
            | Expr::FloatLit(_, loc)
            | Expr::StringLit(_, loc)
            | Expr::CharLit(_, loc)
            | Expr::BoolLit(_, loc)
            | Expr::NullLit(loc)
            | Expr::Ident(_, loc)
            | Expr::This(loc)
            | Expr::Super(loc) => *loc,
            Expr::Binary { location, .. }
            | Expr::Unary { location, .. }
            | Expr::IncDec { location, .. }
            | Expr::Assign { location, .. }
            | Expr::Ternary { location, .. }
            | Expr::Cast { location, .. }
            | Expr::InstanceOf { location, .. }
            | Expr::FieldAccess { location, .. }
            | Expr::ArrayAccess { location, .. }
            | Expr::MethodCall { location, .. }
            | Expr::New { location, .. }
            | Expr::NewArray { location, .. }
            | Expr::Lambda { location, .. }
            | Expr::MethodRef { location, .. } => *location,
        }
    }
}

/// A catch clause; the body is kept in the AST but never executed (§ error
/// handling: try bodies run, catch is skipped, finally runs)
#[derive(Debug, Clone)]
pub struct CatchClause {
    pub exception_type: TypeNode,
    pub name: String,
    pub body: Vec<Stmt>,
    pub location: SourceLocation,
}

/// Statements
#[derive(Debug, Clone)]
pub enum Stmt {
    Block {
        statements: Vec<Stmt>,
        location: SourceLocation,
    },
    VarDecl {
        name: String,
        var_type: TypeNode,
        init: Option<Expr>,
        location: SourceLocation,
    },
    Expression {
        expr: Expr,
        location: SourceLocation,
    },
    If {
        condition: Expr,
        then_branch: Box<Stmt>,
        else_branch: Option<Box<Stmt>>,
        location: SourceLocation,
    },
    While {
        condition: Expr,
        body: Box<Stmt>,
        location: SourceLocation,
    },
    For {
        init: Option<Box<Stmt>>,
        condition: Option<Expr>,
        update: Option<Expr>,
        body: Box<Stmt>,
        location: SourceLocation,
    },
    ForEach {
        var_type: TypeNode,
        var_name: String,
        iterable: Expr,
        body: Box<Stmt>,
        location: SourceLocation,
    },
    Return {
        expr: Option<Expr>,
        location: SourceLocation,
    },
    Break {
        location: SourceLocation,
    },
    Continue {
        location: SourceLocation,
    },
    Throw {
        expr: Expr,
        location: SourceLocation,
    },
    Try {
        body: Vec<Stmt>,
        catches: Vec<CatchClause>,
        finally_block: Option<Vec<Stmt>>,
        location: SourceLocation,
    },
    /// `synchronized (expr) { ... }` — the lock expression is discarded by
    /// the parser; the body is an ordinary block
    Synchronized {
        body: Vec<Stmt>,
        location: SourceLocation,
    },
    Switch {
        expr: Expr,
        cases: Vec<SwitchCase>,
        location: SourceLocation,
    },
}

/// One `case value:` or `default:` arm
#[derive(Debug, Clone)]
pub struct SwitchCase {
    /// None for `default`
    pub value: Option<Expr>,
    pub statements: Vec<Stmt>,
    pub location: SourceLocation,
}

impl Stmt {
    pub fn location(&self) -> SourceLocation {
        match self {
            Stmt::Block { location, .. }
            | Stmt::VarDecl { location, .. }
            | Stmt::Expression { location, .. }
            | Stmt::If { location, .. }
            | Stmt::While { location, .. }
            | Stmt::For { location, .. }
            | Stmt::ForEach { location, .. }
            | Stmt::Return { location, .. }
            | Stmt::Break { location }
            | Stmt::Continue { location }
            | Stmt::Throw { location, .. }
            | Stmt::Try { location, .. }
            | Stmt::Synchronized { location, .. }
            | Stmt::Switch { location, .. } => *location,
        }
    }
}

/// Method parameter
#[derive(Debug, Clone)]
pub struct Param {
    pub name: String,
    pub param_type: TypeNode,
}

/// Field declaration (class or interface member)
#[derive(Debug, Clone)]
pub struct FieldDecl {
    pub name: String,
    pub field_type: TypeNode,
    pub is_static: bool,
    pub is_final: bool,
    pub init: Option<Expr>,
    pub location: SourceLocation,
}

/// Method or constructor declaration
#[derive(Debug, Clone)]
pub struct MethodDecl {
    pub name: String,
    pub params: Vec<Param>,
    pub return_type: TypeNode,
    /// None for abstract/native methods and interface signatures
    pub body: Option<Vec<Stmt>>,
    pub is_static: bool,
    pub is_abstract: bool,
    pub is_native: bool,
    pub is_constructor: bool,
    pub throws: Vec<String>,
    pub location: SourceLocation,
}

/// Class declaration
#[derive(Debug, Clone)]
pub struct ClassDecl {
    pub name: String,
    pub super_class: Option<String>,
    pub interfaces: Vec<String>,
    pub fields: Vec<FieldDecl>,
    pub methods: Vec<MethodDecl>,
    pub is_abstract: bool,
    pub location: SourceLocation,
}

/// Interface declaration
#[derive(Debug, Clone)]
pub struct InterfaceDecl {
    pub name: String,
    pub extends: Vec<String>,
    pub fields: Vec<FieldDecl>,
    pub methods: Vec<MethodDecl>,
    pub location: SourceLocation,
}

/// Top-level declaration
#[derive(Debug, Clone)]
pub enum Declaration {
    Class(ClassDecl),
    Interface(InterfaceDecl),
}

impl Declaration {
    pub fn name(&self) -> &str {
        match self {
            Declaration::Class(c) => &c.name,
            Declaration::Interface(i) => &i.name,
        }
    }
}

/// Top-level program structure
#[derive(Debug, Clone, Default)]
pub struct Program {
    pub declarations: Vec<Declaration>,
}

impl Program {
    pub fn new() -> Self {
        Program::default()
    }
}
