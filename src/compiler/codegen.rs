//! Compiler: AST → bytecode
//!
//! Each method is compiled in isolation with per-method labels; on `resolve`
//! the labels become local offsets, which are then shifted by the method's
//! starting index when its code is appended to the program's flat
//! instruction vector. Local slots are assigned densely; `this` always
//! occupies slot 0 in instance methods, and shadowing in nested blocks
//! allocates a fresh slot (slots are not reclaimed on block exit).
//!
//! A `LINE` marker is emitted before each source statement for UI
//! highlighting and scheduler step ranking.

use rustc_hash::FxHashMap;

use crate::compiler::instruction::{
    CompiledClass, CompiledField, CompiledMethod, CompiledParam, CompiledProgram, Instruction,
    Opcode, Operand,
};
use crate::memory::value::Value;
use crate::parser::ast::*;

/// Utility classes whose member calls compile to `INVOKE_STATIC`
const STATIC_UTILITY_CLASSES: &[&str] = &[
    "Math",
    "Integer",
    "Long",
    "Double",
    "Float",
    "Character",
    "String",
    "Collections",
    "Arrays",
    "System",
    "Objects",
    "Boolean",
    "Byte",
    "Short",
];

/// Compile a parsed program into bytecode
pub fn compile(program: &Program) -> CompiledProgram {
    let class_names: Vec<String> = program
        .declarations
        .iter()
        .map(|d| d.name().to_string())
        .collect();

    let mut instructions = Vec::new();
    let mut method_offsets = FxHashMap::default();
    let mut classes = Vec::new();

    for decl in &program.declarations {
        let ctx = ClassCtx::from_declaration(decl, &class_names);
        classes.push(compile_class(&ctx, &mut instructions, &mut method_offsets));
    }

    // The main class is the first class containing static main(String[])
    let main_class = classes
        .iter()
        .find(|c| {
            c.methods
                .iter()
                .any(|m| m.name == "main" && m.is_static && m.params.len() == 1)
        })
        .or(classes.first())
        .map(|c| c.name.clone())
        .unwrap_or_default();

    CompiledProgram {
        classes,
        main_class,
        main_method: "main".to_string(),
        instructions,
        method_offsets,
    }
}

/// Shared view of a class or interface during compilation
struct ClassCtx<'a> {
    name: &'a str,
    super_class: Option<&'a str>,
    interfaces: Vec<String>,
    fields: &'a [FieldDecl],
    methods: &'a [MethodDecl],
    is_interface: bool,
    is_abstract: bool,
    class_names: &'a [String],
}

impl<'a> ClassCtx<'a> {
    fn from_declaration(decl: &'a Declaration, class_names: &'a [String]) -> Self {
        match decl {
            Declaration::Class(c) => ClassCtx {
                name: &c.name,
                super_class: c.super_class.as_deref(),
                interfaces: c.interfaces.clone(),
                fields: &c.fields,
                methods: &c.methods,
                is_interface: false,
                is_abstract: c.is_abstract,
                class_names,
            },
            Declaration::Interface(i) => ClassCtx {
                name: &i.name,
                super_class: None,
                interfaces: i.extends.clone(),
                fields: &i.fields,
                methods: &i.methods,
                is_interface: true,
                is_abstract: true,
                class_names,
            },
        }
    }

    fn field(&self, name: &str) -> Option<&FieldDecl> {
        self.fields.iter().find(|f| f.name == name)
    }

    fn method(&self, name: &str) -> Option<&MethodDecl> {
        self.methods.iter().find(|m| m.name == name)
    }

    /// Whether a bare name refers to a class (declared, well-known utility,
    /// or conventionally capitalised like `Thread`)
    fn is_class_name(&self, name: &str) -> bool {
        self.class_names.iter().any(|c| c == name)
            || STATIC_UTILITY_CLASSES.contains(&name)
            || name.chars().next().is_some_and(|c| c.is_ascii_uppercase())
    }
}

/// Evaluate a literal initialiser to a constant, if it is one
fn const_eval(expr: &Expr) -> Option<Value> {
    match expr {
        Expr::IntLit(n, _) => Some(Value::Int(*n)),
        Expr::FloatLit(x, _) => Some(Value::Double(*x)),
        Expr::StringLit(s, _) => Some(Value::Str(s.clone())),
        Expr::CharLit(c, _) => Some(Value::Char(*c)),
        Expr::BoolLit(b, _) => Some(Value::Boolean(*b)),
        Expr::NullLit(_) => Some(Value::Null),
        Expr::Unary {
            op: UnOp::Neg,
            operand,
            ..
        } => match const_eval(operand)? {
            Value::Int(n) => Some(Value::Int(-n)),
            Value::Double(x) => Some(Value::Double(-x)),
            _ => None,
        },
        _ => None,
    }
}

fn signature_of(method: &MethodDecl) -> String {
    let params: Vec<String> = method
        .params
        .iter()
        .map(|p| p.param_type.display_name())
        .collect();
    format!("{}({})", method.name, params.join(","))
}

fn compile_class(
    ctx: &ClassCtx,
    instructions: &mut Vec<Instruction>,
    method_offsets: &mut FxHashMap<String, usize>,
) -> CompiledClass {
    let fields = ctx
        .fields
        .iter()
        .map(|f| CompiledField {
            name: f.name.clone(),
            field_type: f.field_type.display_name(),
            is_static: f.is_static,
            constant: f.init.as_ref().and_then(const_eval),
        })
        .collect();

    let mut methods = Vec::new();
    for method in ctx.methods {
        let signature = signature_of(method);
        let params: Vec<CompiledParam> = method
            .params
            .iter()
            .map(|p| CompiledParam {
                name: p.name.clone(),
                param_type: p.param_type.display_name(),
            })
            .collect();

        let (offset, code_len, max_locals) = if let Some(body) = &method.body {
            let mut mc = MethodCompiler::new(ctx, method);
            mc.compile_body(body);
            let (code, max_locals) = mc.finish();
            let start = instructions.len();
            for mut instruction in code {
                // Globalise jump targets
                for op in &mut instruction.operands {
                    if let Operand::Label(target) = op {
                        *target += start;
                    }
                }
                instructions.push(instruction);
            }
            let len = instructions.len() - start;
            method_offsets.insert(format!("{}.{}", ctx.name, signature), start);
            (Some(start), len, max_locals)
        } else {
            (None, 0, 0)
        };

        methods.push(CompiledMethod {
            name: method.name.clone(),
            signature,
            params,
            return_type: method.return_type.display_name(),
            is_static: method.is_static,
            is_constructor: method.is_constructor,
            offset,
            code_len,
            max_locals,
        });
    }

    CompiledClass {
        name: ctx.name.to_string(),
        super_class: ctx.super_class.map(|s| s.to_string()),
        interfaces: ctx.interfaces.clone(),
        fields,
        methods,
        is_interface: ctx.is_interface,
        is_abstract: ctx.is_abstract,
    }
}

/// Per-method compiler state
struct MethodCompiler<'a> {
    ctx: &'a ClassCtx<'a>,
    code: Vec<Instruction>,
    /// label id → local offset, filled by `place_label`
    labels: Vec<Option<usize>>,
    /// slot → name; lookups scan from the end so shadowing wins
    locals: Vec<String>,
    current_line: usize,
    is_static: bool,
    break_stack: Vec<usize>,
    continue_stack: Vec<usize>,
}

impl<'a> MethodCompiler<'a> {
    fn new(ctx: &'a ClassCtx<'a>, method: &MethodDecl) -> Self {
        let mut locals = Vec::new();
        if !method.is_static {
            // `this` always occupies slot 0 in instance methods
            locals.push("this".to_string());
        }
        for param in &method.params {
            locals.push(param.name.clone());
        }
        MethodCompiler {
            ctx,
            code: Vec::new(),
            labels: Vec::new(),
            locals,
            current_line: method.location.line,
            is_static: method.is_static,
            break_stack: Vec::new(),
            continue_stack: Vec::new(),
        }
    }

    fn compile_body(&mut self, body: &[Stmt]) {
        for stmt in body {
            self.compile_stmt(stmt);
        }
        // Implicit void return so pc never runs past the method's end
        self.emit(Opcode::Return, vec![]);
    }

    /// Resolve labels to local offsets and hand back the code
    fn finish(self) -> (Vec<Instruction>, usize) {
        let labels = self.labels;
        let mut code = self.code;
        for instruction in &mut code {
            for op in &mut instruction.operands {
                if let Operand::Label(id) = op {
                    *op = Operand::Label(labels[*id].expect("unplaced label"));
                }
            }
        }
        let max_locals = self.locals.len();
        (code, max_locals)
    }

    // ===== Emission helpers =====

    fn emit(&mut self, opcode: Opcode, operands: Vec<Operand>) -> usize {
        self.code
            .push(Instruction::new(opcode, operands, self.current_line));
        self.code.len() - 1
    }

    fn emit_line(&mut self, location: SourceLocation) {
        self.current_line = location.line;
        self.emit(Opcode::Line, vec![Operand::Int(location.line as i64)]);
    }

    fn new_label(&mut self) -> usize {
        self.labels.push(None);
        self.labels.len() - 1
    }

    fn place_label(&mut self, label: usize) {
        self.labels[label] = Some(self.code.len());
    }

    fn emit_jump(&mut self, opcode: Opcode, label: usize) {
        self.emit(opcode, vec![Operand::Label(label)]);
    }

    fn declare_local(&mut self, name: &str) -> usize {
        self.locals.push(name.to_string());
        self.locals.len() - 1
    }

    fn find_local(&self, name: &str) -> Option<usize> {
        self.locals.iter().rposition(|l| l == name)
    }

    fn local_operand(&self, slot: usize) -> Operand {
        Operand::Local {
            index: slot,
            name: self.locals[slot].clone(),
        }
    }

    fn emit_const_one(&mut self) {
        self.emit(Opcode::LoadConst, vec![Operand::Int(1)]);
    }

    // ===== Statements =====

    fn compile_stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Block { statements, .. } => {
                for s in statements {
                    self.compile_stmt(s);
                }
            }

            Stmt::VarDecl {
                name,
                var_type,
                init,
                location,
            } => {
                self.emit_line(*location);
                match init {
                    Some(expr) => self.compile_expr(expr),
                    None => self.emit_default(var_type),
                }
                let slot = self.declare_local(name);
                self.emit(Opcode::StoreLocal, vec![self.local_operand(slot)]);
            }

            Stmt::Expression { expr, location } => {
                self.emit_line(*location);
                self.compile_expr_statement(expr);
            }

            Stmt::If {
                condition,
                then_branch,
                else_branch,
                location,
            } => {
                self.emit_line(*location);
                self.compile_expr(condition);
                let else_label = self.new_label();
                let end_label = self.new_label();
                self.emit_jump(Opcode::IfFalse, else_label);
                self.compile_stmt(then_branch);
                self.emit_jump(Opcode::Goto, end_label);
                self.place_label(else_label);
                if let Some(else_branch) = else_branch {
                    self.compile_stmt(else_branch);
                }
                self.place_label(end_label);
            }

            Stmt::While {
                condition,
                body,
                location,
            } => {
                let head = self.new_label();
                let end = self.new_label();
                self.place_label(head);
                self.emit_line(*location);
                self.compile_expr(condition);
                self.emit_jump(Opcode::IfFalse, end);
                self.break_stack.push(end);
                self.continue_stack.push(head);
                self.compile_stmt(body);
                self.break_stack.pop();
                self.continue_stack.pop();
                self.emit_jump(Opcode::Goto, head);
                self.place_label(end);
            }

            Stmt::For {
                init,
                condition,
                update,
                body,
                location,
            } => {
                if let Some(init) = init {
                    self.compile_stmt(init);
                }
                let head = self.new_label();
                let cont = self.new_label();
                let end = self.new_label();
                self.place_label(head);
                if let Some(condition) = condition {
                    self.emit_line(*location);
                    self.compile_expr(condition);
                    self.emit_jump(Opcode::IfFalse, end);
                }
                self.break_stack.push(end);
                self.continue_stack.push(cont);
                self.compile_stmt(body);
                self.break_stack.pop();
                self.continue_stack.pop();
                self.place_label(cont);
                if let Some(update) = update {
                    self.emit_line(update.location());
                    self.compile_expr_statement(update);
                }
                self.emit_jump(Opcode::Goto, head);
                self.place_label(end);
            }

            Stmt::ForEach {
                var_name,
                iterable,
                body,
                location,
                ..
            } => {
                // iterable.iterator() into a synthetic local, then the
                // hasNext/next protocol
                self.emit_line(*location);
                self.compile_expr(iterable);
                self.emit(
                    Opcode::InvokeInterface,
                    vec![Operand::Method {
                        name: "iterator".to_string(),
                        argc: 0,
                    }],
                );
                let iter_slot = self.declare_local("$iterator");
                self.emit(Opcode::StoreLocal, vec![self.local_operand(iter_slot)]);
                let var_slot = self.declare_local(var_name);

                let head = self.new_label();
                let end = self.new_label();
                self.place_label(head);
                self.emit(Opcode::LoadLocal, vec![self.local_operand(iter_slot)]);
                self.emit(
                    Opcode::InvokeInterface,
                    vec![Operand::Method {
                        name: "hasNext".to_string(),
                        argc: 0,
                    }],
                );
                self.emit_jump(Opcode::IfFalse, end);
                self.emit(Opcode::LoadLocal, vec![self.local_operand(iter_slot)]);
                self.emit(
                    Opcode::InvokeInterface,
                    vec![Operand::Method {
                        name: "next".to_string(),
                        argc: 0,
                    }],
                );
                self.emit(Opcode::StoreLocal, vec![self.local_operand(var_slot)]);
                self.break_stack.push(end);
                self.continue_stack.push(head);
                self.compile_stmt(body);
                self.break_stack.pop();
                self.continue_stack.pop();
                self.emit_jump(Opcode::Goto, head);
                self.place_label(end);
            }

            Stmt::Return { expr, location } => {
                self.emit_line(*location);
                match expr {
                    Some(expr) => {
                        self.compile_expr(expr);
                        self.emit(Opcode::ReturnValue, vec![]);
                    }
                    None => {
                        self.emit(Opcode::Return, vec![]);
                    }
                }
            }

            Stmt::Break { location } => {
                self.emit_line(*location);
                match self.break_stack.last().copied() {
                    Some(label) => self.emit_jump(Opcode::Goto, label),
                    None => {
                        self.emit(Opcode::Nop, vec![]);
                    }
                }
            }

            Stmt::Continue { location } => {
                self.emit_line(*location);
                match self.continue_stack.last().copied() {
                    Some(label) => self.emit_jump(Opcode::Goto, label),
                    None => {
                        self.emit(Opcode::Nop, vec![]);
                    }
                }
            }

            Stmt::Throw { expr, location } => {
                self.emit_line(*location);
                self.compile_expr(expr);
                self.emit(Opcode::Throw, vec![]);
            }

            Stmt::Try {
                body,
                finally_block,
                ..
            } => {
                // Try bodies run; catch clauses are compiled away; finally
                // runs unconditionally in sequence after the try body
                for s in body {
                    self.compile_stmt(s);
                }
                if let Some(finally_block) = finally_block {
                    for s in finally_block {
                        self.compile_stmt(s);
                    }
                }
            }

            Stmt::Synchronized { body, .. } => {
                // The parser discarded the lock expression; the body is an
                // ordinary block
                for s in body {
                    self.compile_stmt(s);
                }
            }

            Stmt::Switch {
                expr,
                cases,
                location,
            } => self.compile_switch(expr, cases, *location),
        }
    }

    /// switch lowers to: store scrutinee, a test chain jumping to case
    /// labels, then the case bodies in order (natural fallthrough)
    fn compile_switch(&mut self, expr: &Expr, cases: &[SwitchCase], location: SourceLocation) {
        self.emit_line(location);
        self.compile_expr(expr);
        let slot = self.declare_local("$switch");
        self.emit(Opcode::StoreLocal, vec![self.local_operand(slot)]);

        let end = self.new_label();
        let case_labels: Vec<usize> = cases.iter().map(|_| self.new_label()).collect();

        let mut default_label = end;
        for (case, &label) in cases.iter().zip(&case_labels) {
            match &case.value {
                Some(value) => {
                    self.emit(Opcode::LoadLocal, vec![self.local_operand(slot)]);
                    self.compile_expr(value);
                    self.emit(Opcode::CmpEq, vec![]);
                    self.emit_jump(Opcode::IfTrue, label);
                }
                None => default_label = label,
            }
        }
        self.emit_jump(Opcode::Goto, default_label);

        self.break_stack.push(end);
        for (case, &label) in cases.iter().zip(&case_labels) {
            self.place_label(label);
            for s in &case.statements {
                self.compile_stmt(s);
            }
        }
        self.break_stack.pop();
        self.place_label(end);
    }

    fn emit_default(&mut self, var_type: &TypeNode) {
        if var_type.array_dims > 0 {
            self.emit(Opcode::PushNull, vec![]);
            return;
        }
        match Value::default_for(&var_type.name) {
            Value::Int(n) => {
                self.emit(Opcode::LoadConst, vec![Operand::Int(n)]);
            }
            Value::Long(n) => {
                self.emit(Opcode::LoadConst, vec![Operand::Int(n)]);
            }
            Value::Float(x) | Value::Double(x) => {
                self.emit(Opcode::LoadConst, vec![Operand::Float(x)]);
            }
            Value::Boolean(b) => {
                self.emit(Opcode::LoadConst, vec![Operand::Bool(b)]);
            }
            Value::Char(c) => {
                self.emit(Opcode::LoadConst, vec![Operand::Char(c)]);
            }
            Value::Str(s) => {
                self.emit(Opcode::LoadConst, vec![Operand::Str(s)]);
            }
            _ => {
                self.emit(Opcode::PushNull, vec![]);
            }
        }
    }

    // ===== Expressions =====

    /// Compile an expression in statement position, avoiding junk on the
    /// operand stack
    fn compile_expr_statement(&mut self, expr: &Expr) {
        if self.try_compile_print(expr) {
            return;
        }

        // Array stores need no value-producing epilogue in statement position
        if let Expr::Assign {
            target, op, value, ..
        } = expr
        {
            if let Expr::ArrayAccess { array, index, .. } = target.as_ref() {
                self.compile_array_store(array, index, *op, value);
                return;
            }
        }

        self.compile_expr(expr);
        self.emit(Opcode::Pop, vec![]);
    }

    /// Peephole: `System.out.print[ln](x)` → `PRINT`. An argument-less call
    /// pushes the empty string first so `PRINT` always pops one value.
    fn try_compile_print(&mut self, expr: &Expr) -> bool {
        let Expr::MethodCall {
            receiver: Some(receiver),
            name,
            args,
            ..
        } = expr
        else {
            return false;
        };
        if name != "println" && name != "print" {
            return false;
        }
        let Expr::FieldAccess { object, field, .. } = receiver.as_ref() else {
            return false;
        };
        if field != "out" || !matches!(object.as_ref(), Expr::Ident(n, _) if n == "System") {
            return false;
        }

        match args.first() {
            Some(arg) => self.compile_expr(arg),
            None => {
                self.emit(Opcode::LoadConst, vec![Operand::Str(String::new())]);
            }
        }
        self.emit(Opcode::Print, vec![Operand::Bool(name == "println")]);
        true
    }

    fn compile_expr(&mut self, expr: &Expr) {
        match expr {
            Expr::IntLit(n, _) => {
                self.emit(Opcode::LoadConst, vec![Operand::Int(*n)]);
            }
            Expr::FloatLit(x, _) => {
                self.emit(Opcode::LoadConst, vec![Operand::Float(*x)]);
            }
            Expr::StringLit(s, _) => {
                self.emit(Opcode::LoadConst, vec![Operand::Str(s.clone())]);
            }
            Expr::CharLit(c, _) => {
                self.emit(Opcode::LoadConst, vec![Operand::Char(*c)]);
            }
            Expr::BoolLit(b, _) => {
                self.emit(Opcode::LoadConst, vec![Operand::Bool(*b)]);
            }
            Expr::NullLit(_) => {
                self.emit(Opcode::PushNull, vec![]);
            }
            Expr::This(_) | Expr::Super(_) => {
                self.emit(
                    Opcode::LoadLocal,
                    vec![Operand::Local {
                        index: 0,
                        name: "this".to_string(),
                    }],
                );
            }
            Expr::Ident(name, _) => self.compile_ident_read(name),
            Expr::Binary {
                op, left, right, ..
            } => {
                self.compile_expr(left);
                self.compile_expr(right);
                self.emit(Self::binop_opcode(*op), vec![]);
            }
            Expr::Unary { op, operand, .. } => {
                self.compile_expr(operand);
                match op {
                    UnOp::Neg => self.emit(Opcode::Neg, vec![]),
                    UnOp::Not => self.emit(Opcode::Not, vec![]),
                };
            }
            Expr::IncDec {
                target,
                increment,
                prefix,
                ..
            } => self.compile_inc_dec(target, *increment, *prefix),
            Expr::Assign {
                target, op, value, ..
            } => self.compile_assign(target, *op, value),
            Expr::Ternary {
                condition,
                then_expr,
                else_expr,
                ..
            } => {
                self.compile_expr(condition);
                let else_label = self.new_label();
                let end_label = self.new_label();
                self.emit_jump(Opcode::IfFalse, else_label);
                self.compile_expr(then_expr);
                self.emit_jump(Opcode::Goto, end_label);
                self.place_label(else_label);
                self.compile_expr(else_expr);
                self.place_label(end_label);
            }
            Expr::Cast {
                target_type, expr, ..
            } => {
                self.compile_expr(expr);
                self.emit(
                    Opcode::Checkcast,
                    vec![Operand::Type(target_type.display_name())],
                );
            }
            Expr::InstanceOf {
                expr, target_type, ..
            } => {
                self.compile_expr(expr);
                self.emit(
                    Opcode::InstanceOf,
                    vec![Operand::Type(target_type.display_name())],
                );
            }
            Expr::FieldAccess { object, field, .. } => {
                if let Some(class_name) = self.static_receiver(object) {
                    self.emit(
                        Opcode::GetStatic,
                        vec![Operand::Field {
                            name: field.clone(),
                            owner: class_name,
                        }],
                    );
                } else {
                    self.compile_expr(object);
                    self.emit(Opcode::GetField, vec![Operand::Str(field.clone())]);
                }
            }
            Expr::ArrayAccess { array, index, .. } => {
                self.compile_expr(array);
                self.compile_expr(index);
                self.emit(Opcode::ArrayLoad, vec![]);
            }
            Expr::MethodCall {
                receiver,
                name,
                args,
                ..
            } => {
                if self.try_compile_print(expr) {
                    return;
                }
                self.compile_call(receiver.as_deref(), name, args);
            }
            Expr::New {
                class_name, args, ..
            } => {
                self.emit(Opcode::New, vec![Operand::Class(class_name.clone())]);
                self.emit(Opcode::Dup, vec![]);
                for arg in args {
                    self.compile_expr(arg);
                }
                self.emit(
                    Opcode::InvokeSpecial,
                    vec![
                        Operand::Method {
                            name: "<init>".to_string(),
                            argc: args.len(),
                        },
                        Operand::Class(class_name.clone()),
                    ],
                );
            }
            Expr::NewArray {
                element_type,
                dims,
                init,
                ..
            } => self.compile_new_array(element_type, dims, init.as_deref()),
            Expr::Lambda { params, body, .. } => {
                let marker = match body {
                    LambdaBody::Expr(_) => "expr",
                    LambdaBody::Block(_) => "block",
                };
                let info = format!("({}) -> {}", params.join(", "), marker);
                self.emit(Opcode::LambdaCreate, vec![Operand::Str(info)]);
            }
            Expr::MethodRef { target, method, .. } => {
                let info = format!("{}::{}", target, method);
                self.emit(Opcode::LambdaCreate, vec![Operand::Str(info)]);
            }
        }
    }

    fn binop_opcode(op: BinOp) -> Opcode {
        match op {
            BinOp::Add => Opcode::Add,
            BinOp::Sub => Opcode::Sub,
            BinOp::Mul => Opcode::Mul,
            BinOp::Div => Opcode::Div,
            BinOp::Mod => Opcode::Mod,
            BinOp::Eq => Opcode::CmpEq,
            BinOp::Ne => Opcode::CmpNe,
            BinOp::Lt => Opcode::CmpLt,
            BinOp::Le => Opcode::CmpLe,
            BinOp::Gt => Opcode::CmpGt,
            BinOp::Ge => Opcode::CmpGe,
            BinOp::And | BinOp::BitAnd => Opcode::And,
            BinOp::Or | BinOp::BitOr => Opcode::Or,
        }
    }

    /// Reading a bare identifier: local slot, static field, or an instance
    /// field of `this`
    fn compile_ident_read(&mut self, name: &str) {
        if let Some(slot) = self.find_local(name) {
            self.emit(Opcode::LoadLocal, vec![self.local_operand(slot)]);
            return;
        }
        if let Some(field) = self.ctx.field(name) {
            if field.is_static {
                self.emit(
                    Opcode::GetStatic,
                    vec![Operand::Field {
                        name: name.to_string(),
                        owner: self.ctx.name.to_string(),
                    }],
                );
                return;
            }
        }
        if !self.is_static {
            self.emit(
                Opcode::LoadLocal,
                vec![Operand::Local {
                    index: 0,
                    name: "this".to_string(),
                }],
            );
            self.emit(Opcode::GetField, vec![Operand::Str(name.to_string())]);
        } else {
            self.emit(
                Opcode::GetStatic,
                vec![Operand::Field {
                    name: name.to_string(),
                    owner: self.ctx.name.to_string(),
                }],
            );
        }
    }

    /// Is this receiver expression a class reference for static access?
    fn static_receiver(&self, object: &Expr) -> Option<String> {
        if let Expr::Ident(name, _) = object {
            if self.find_local(name).is_none()
                && self.ctx.field(name).is_none()
                && self.ctx.is_class_name(name)
            {
                return Some(name.clone());
            }
        }
        None
    }

    fn compile_call(&mut self, receiver: Option<&Expr>, name: &str, args: &[Expr]) {
        match receiver {
            None => {
                // Unqualified call: static if the declared method (or the
                // calling context) is static, otherwise a call on `this`
                let callee_static = self
                    .ctx
                    .method(name)
                    .map(|m| m.is_static)
                    .unwrap_or(self.is_static);
                if callee_static {
                    for arg in args {
                        self.compile_expr(arg);
                    }
                    self.emit(
                        Opcode::InvokeStatic,
                        vec![
                            Operand::Method {
                                name: name.to_string(),
                                argc: args.len(),
                            },
                            Operand::Class(self.ctx.name.to_string()),
                        ],
                    );
                } else {
                    self.emit(
                        Opcode::LoadLocal,
                        vec![Operand::Local {
                            index: 0,
                            name: "this".to_string(),
                        }],
                    );
                    for arg in args {
                        self.compile_expr(arg);
                    }
                    self.emit(
                        Opcode::InvokeVirtual,
                        vec![Operand::Method {
                            name: name.to_string(),
                            argc: args.len(),
                        }],
                    );
                }
            }
            Some(Expr::Super(_)) => {
                // super.m(...) and super(...) dispatch into the superclass
                self.emit(
                    Opcode::LoadLocal,
                    vec![Operand::Local {
                        index: 0,
                        name: "this".to_string(),
                    }],
                );
                for arg in args {
                    self.compile_expr(arg);
                }
                let owner = self.ctx.super_class.unwrap_or("Object").to_string();
                self.emit(
                    Opcode::InvokeSpecial,
                    vec![
                        Operand::Method {
                            name: name.to_string(),
                            argc: args.len(),
                        },
                        Operand::Class(owner),
                    ],
                );
            }
            Some(Expr::This(_)) if name == "<init>" => {
                // this(...) delegating constructor
                self.emit(
                    Opcode::LoadLocal,
                    vec![Operand::Local {
                        index: 0,
                        name: "this".to_string(),
                    }],
                );
                for arg in args {
                    self.compile_expr(arg);
                }
                self.emit(
                    Opcode::InvokeSpecial,
                    vec![
                        Operand::Method {
                            name: "<init>".to_string(),
                            argc: args.len(),
                        },
                        Operand::Class(self.ctx.name.to_string()),
                    ],
                );
            }
            Some(receiver) => {
                if let Some(class_name) = self.static_receiver(receiver) {
                    for arg in args {
                        self.compile_expr(arg);
                    }
                    self.emit(
                        Opcode::InvokeStatic,
                        vec![
                            Operand::Method {
                                name: name.to_string(),
                                argc: args.len(),
                            },
                            Operand::Class(class_name),
                        ],
                    );
                } else {
                    self.compile_expr(receiver);
                    for arg in args {
                        self.compile_expr(arg);
                    }
                    self.emit(
                        Opcode::InvokeVirtual,
                        vec![Operand::Method {
                            name: name.to_string(),
                            argc: args.len(),
                        }],
                    );
                }
            }
        }
    }

    fn compile_new_array(&mut self, element_type: &TypeNode, dims: &[Expr], init: Option<&[Expr]>) {
        let type_name = element_type.display_name();
        if let Some(elements) = init {
            // new T[]{...}: allocate then fill slot by slot
            self.emit(
                Opcode::LoadConst,
                vec![Operand::Int(elements.len() as i64)],
            );
            self.emit(
                Opcode::NewArray,
                vec![Operand::Type(type_name), Operand::Int(1)],
            );
            for (i, element) in elements.iter().enumerate() {
                self.emit(Opcode::Dup, vec![]);
                self.emit(Opcode::LoadConst, vec![Operand::Int(i as i64)]);
                self.compile_expr(element);
                self.emit(Opcode::ArrayStore, vec![]);
            }
        } else {
            for dim in dims {
                self.compile_expr(dim);
            }
            self.emit(
                Opcode::NewArray,
                vec![
                    Operand::Type(type_name),
                    Operand::Int(dims.len().max(1) as i64),
                ],
            );
        }
    }

    /// `a[i] = v` / `a[i] op= v` without leaving a value
    fn compile_array_store(
        &mut self,
        array: &Expr,
        index: &Expr,
        op: Option<BinOp>,
        value: &Expr,
    ) {
        self.compile_expr(array);
        self.compile_expr(index);
        if let Some(op) = op {
            self.compile_expr(array);
            self.compile_expr(index);
            self.emit(Opcode::ArrayLoad, vec![]);
            self.compile_expr(value);
            self.emit(Self::binop_opcode(op), vec![]);
        } else {
            self.compile_expr(value);
        }
        self.emit(Opcode::ArrayStore, vec![]);
    }

    fn compile_assign(&mut self, target: &Expr, op: Option<BinOp>, value: &Expr) {
        match target {
            Expr::Ident(name, _) => {
                if let Some(slot) = self.find_local(name) {
                    // Compound: load + e + op + dup + store
                    if let Some(op) = op {
                        self.emit(Opcode::LoadLocal, vec![self.local_operand(slot)]);
                        self.compile_expr(value);
                        self.emit(Self::binop_opcode(op), vec![]);
                    } else {
                        self.compile_expr(value);
                    }
                    self.emit(Opcode::Dup, vec![]);
                    self.emit(Opcode::StoreLocal, vec![self.local_operand(slot)]);
                    return;
                }
                if self.ctx.field(name).is_some_and(|f| f.is_static) || self.is_static {
                    let field = Operand::Field {
                        name: name.clone(),
                        owner: self.ctx.name.to_string(),
                    };
                    if let Some(op) = op {
                        self.emit(Opcode::GetStatic, vec![field.clone()]);
                        self.compile_expr(value);
                        self.emit(Self::binop_opcode(op), vec![]);
                    } else {
                        self.compile_expr(value);
                    }
                    self.emit(Opcode::Dup, vec![]);
                    self.emit(Opcode::PutStatic, vec![field]);
                    return;
                }
                // Instance field of `this`
                let this = Operand::Local {
                    index: 0,
                    name: "this".to_string(),
                };
                self.emit(Opcode::LoadLocal, vec![this]);
                if let Some(op) = op {
                    self.emit(Opcode::Dup, vec![]);
                    self.emit(Opcode::GetField, vec![Operand::Str(name.clone())]);
                    self.compile_expr(value);
                    self.emit(Self::binop_opcode(op), vec![]);
                } else {
                    self.compile_expr(value);
                }
                self.emit(Opcode::DupX1, vec![]);
                self.emit(Opcode::PutField, vec![Operand::Str(name.clone())]);
            }

            Expr::FieldAccess { object, field, .. } => {
                if let Some(class_name) = self.static_receiver(object) {
                    let operand = Operand::Field {
                        name: field.clone(),
                        owner: class_name,
                    };
                    if let Some(op) = op {
                        self.emit(Opcode::GetStatic, vec![operand.clone()]);
                        self.compile_expr(value);
                        self.emit(Self::binop_opcode(op), vec![]);
                    } else {
                        self.compile_expr(value);
                    }
                    self.emit(Opcode::Dup, vec![]);
                    self.emit(Opcode::PutStatic, vec![operand]);
                    return;
                }
                self.compile_expr(object);
                if let Some(op) = op {
                    self.emit(Opcode::Dup, vec![]);
                    self.emit(Opcode::GetField, vec![Operand::Str(field.clone())]);
                    self.compile_expr(value);
                    self.emit(Self::binop_opcode(op), vec![]);
                } else {
                    self.compile_expr(value);
                }
                self.emit(Opcode::DupX1, vec![]);
                self.emit(Opcode::PutField, vec![Operand::Str(field.clone())]);
            }

            Expr::ArrayAccess { array, index, .. } => {
                // Store, then reload so the expression leaves the stored value
                self.compile_array_store(array, index, op, value);
                self.compile_expr(array);
                self.compile_expr(index);
                self.emit(Opcode::ArrayLoad, vec![]);
            }

            // Assignments to anything else are compile-time no-ops that
            // still produce a value
            other => {
                self.compile_expr(other);
                self.emit(Opcode::Pop, vec![]);
                self.compile_expr(value);
            }
        }
    }

    fn compile_inc_dec(&mut self, target: &Expr, increment: bool, prefix: bool) {
        let op = if increment { Opcode::Add } else { Opcode::Sub };
        match target {
            Expr::Ident(name, _) if self.find_local(name).is_some() => {
                let slot = self.find_local(name).expect("checked above");
                let local = self.local_operand(slot);
                if prefix {
                    // load + const1 + add/sub + dup + store
                    self.emit(Opcode::LoadLocal, vec![local.clone()]);
                    self.emit_const_one();
                    self.emit(op, vec![]);
                    self.emit(Opcode::Dup, vec![]);
                    self.emit(Opcode::StoreLocal, vec![local]);
                } else {
                    // load + dup + const1 + add/sub + store
                    self.emit(Opcode::LoadLocal, vec![local.clone()]);
                    self.emit(Opcode::Dup, vec![]);
                    self.emit_const_one();
                    self.emit(op, vec![]);
                    self.emit(Opcode::StoreLocal, vec![local]);
                }
            }

            Expr::Ident(name, location) => {
                // Field of `this` (or a static); rewrite through the
                // assignment path: x++ behaves as (x += 1) with the
                // appropriate result
                let one = Expr::IntLit(1, *location);
                if prefix {
                    self.compile_assign(
                        target,
                        Some(if increment { BinOp::Add } else { BinOp::Sub }),
                        &one,
                    );
                } else {
                    // Old value first, then the update, dropping its result
                    self.compile_ident_read(name);
                    self.compile_assign(
                        target,
                        Some(if increment { BinOp::Add } else { BinOp::Sub }),
                        &one,
                    );
                    self.emit(Opcode::Pop, vec![]);
                }
            }

            Expr::FieldAccess { object, field, .. } => {
                if self.static_receiver(object).is_some() {
                    let location = target.location();
                    let one = Expr::IntLit(1, location);
                    let bin = Some(if increment { BinOp::Add } else { BinOp::Sub });
                    if prefix {
                        self.compile_assign(target, bin, &one);
                    } else {
                        self.compile_expr(target);
                        self.compile_assign(target, bin, &one);
                        self.emit(Opcode::Pop, vec![]);
                    }
                    return;
                }
                self.compile_expr(object);
                self.emit(Opcode::Dup, vec![]);
                self.emit(Opcode::GetField, vec![Operand::Str(field.clone())]);
                if prefix {
                    // [obj, v] -> [obj, v'] -> [v', obj, v'] -> [v']
                    self.emit_const_one();
                    self.emit(op, vec![]);
                    self.emit(Opcode::DupX1, vec![]);
                    self.emit(Opcode::PutField, vec![Operand::Str(field.clone())]);
                } else {
                    // [obj, v] -> [v, obj, v] -> [v, obj, v'] -> [v]
                    self.emit(Opcode::DupX1, vec![]);
                    self.emit_const_one();
                    self.emit(op, vec![]);
                    self.emit(Opcode::PutField, vec![Operand::Str(field.clone())]);
                }
            }

            Expr::ArrayAccess { array, index, .. } => {
                if prefix {
                    self.compile_expr(array);
                    self.compile_expr(index);
                    self.compile_expr(array);
                    self.compile_expr(index);
                    self.emit(Opcode::ArrayLoad, vec![]);
                    self.emit_const_one();
                    self.emit(op, vec![]);
                    self.emit(Opcode::ArrayStore, vec![]);
                    self.compile_expr(array);
                    self.compile_expr(index);
                    self.emit(Opcode::ArrayLoad, vec![]);
                } else {
                    self.compile_expr(array);
                    self.compile_expr(index);
                    self.emit(Opcode::ArrayLoad, vec![]);
                    self.compile_expr(array);
                    self.compile_expr(index);
                    self.compile_expr(array);
                    self.compile_expr(index);
                    self.emit(Opcode::ArrayLoad, vec![]);
                    self.emit_const_one();
                    self.emit(op, vec![]);
                    self.emit(Opcode::ArrayStore, vec![]);
                }
            }

            other => {
                // Not an lvalue; evaluate for effect
                self.compile_expr(other);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse::Parser;

    fn compile_source(source: &str) -> CompiledProgram {
        let mut parser = Parser::new(source).expect("lexing failed");
        let program = parser.parse_program().expect("parsing failed");
        compile(&program)
    }

    fn method_code<'a>(
        program: &'a CompiledProgram,
        class: &str,
        method: &str,
    ) -> &'a [Instruction] {
        let c = program.class(class).expect("class missing");
        let m = c
            .methods
            .iter()
            .find(|m| m.name == method)
            .expect("method missing");
        let start = m.offset.expect("method has no code");
        &program.instructions[start..start + m.code_len]
    }

    #[test]
    fn test_main_class_selection() {
        let program = compile_source(
            "class Helper { } class Entry { public static void main(String[] args) { } }",
        );
        assert_eq!(program.main_class, "Entry");
        assert_eq!(program.main_method, "main");
    }

    #[test]
    fn test_println_peephole() {
        let program = compile_source(
            "class M { public static void main(String[] args) { System.out.println(\"hi\"); } }",
        );
        let code = method_code(&program, "M", "main");
        assert!(code
            .iter()
            .any(|i| i.opcode == Opcode::Print && i.operand(0) == Some(&Operand::Bool(true))));
        assert!(!code
            .iter()
            .any(|i| matches!(i.opcode, Opcode::InvokeVirtual)));
    }

    #[test]
    fn test_empty_println_pushes_empty_string() {
        let program = compile_source(
            "class M { public static void main(String[] args) { System.out.println(); } }",
        );
        let code = method_code(&program, "M", "main");
        let print_pos = code.iter().position(|i| i.opcode == Opcode::Print).unwrap();
        assert_eq!(
            code[print_pos - 1].operand(0),
            Some(&Operand::Str(String::new()))
        );
    }

    #[test]
    fn test_postfix_increment_shape() {
        let program =
            compile_source("class M { static void m() { int x = 0; int y = x++; } }");
        let code = method_code(&program, "M", "m");
        // load + dup + const1 + add + store
        let ops: Vec<Opcode> = code.iter().map(|i| i.opcode).collect();
        let pattern = [
            Opcode::LoadLocal,
            Opcode::Dup,
            Opcode::LoadConst,
            Opcode::Add,
            Opcode::StoreLocal,
        ];
        assert!(
            ops.windows(5).any(|w| w == pattern),
            "postfix pattern missing in {:?}",
            ops
        );
    }

    #[test]
    fn test_prefix_increment_shape() {
        let program = compile_source("class M { static void m() { int x = 0; int y = ++x; } }");
        let code = method_code(&program, "M", "m");
        let ops: Vec<Opcode> = code.iter().map(|i| i.opcode).collect();
        let pattern = [
            Opcode::LoadLocal,
            Opcode::LoadConst,
            Opcode::Add,
            Opcode::Dup,
            Opcode::StoreLocal,
        ];
        assert!(
            ops.windows(5).any(|w| w == pattern),
            "prefix pattern missing in {:?}",
            ops
        );
    }

    #[test]
    fn test_compound_assignment_shape() {
        let program = compile_source("class M { static void m() { int x = 1; x += 2; } }");
        let code = method_code(&program, "M", "m");
        let ops: Vec<Opcode> = code.iter().map(|i| i.opcode).collect();
        let pattern = [
            Opcode::LoadLocal,
            Opcode::LoadConst,
            Opcode::Add,
            Opcode::Dup,
            Opcode::StoreLocal,
        ];
        assert!(
            ops.windows(5).any(|w| w == pattern),
            "compound pattern missing in {:?}",
            ops
        );
    }

    #[test]
    fn test_constructor_invocation_shape() {
        let program = compile_source(
            "class P { P(int x) { } } class M { static void m() { P p = new P(1); } }",
        );
        let code = method_code(&program, "M", "m");
        let ops: Vec<Opcode> = code.iter().map(|i| i.opcode).collect();
        let new_pos = ops.iter().position(|&o| o == Opcode::New).unwrap();
        assert_eq!(ops[new_pos + 1], Opcode::Dup);
        assert!(ops.contains(&Opcode::InvokeSpecial));
    }

    #[test]
    fn test_for_each_protocol() {
        let program =
            compile_source("class M { static void m(List<Integer> xs) { for (int x : xs) { } } }");
        let code = method_code(&program, "M", "m");
        let invoked: Vec<&str> = code
            .iter()
            .filter(|i| i.opcode == Opcode::InvokeInterface)
            .filter_map(|i| match i.operand(0) {
                Some(Operand::Method { name, .. }) => Some(name.as_str()),
                _ => None,
            })
            .collect();
        assert!(invoked.contains(&"iterator"));
        assert!(invoked.contains(&"hasNext"));
        assert!(invoked.contains(&"next"));
    }

    #[test]
    fn test_labels_are_globalised() {
        // Two methods with jumps: every label target must be a valid global
        // index within its own method's range
        let program = compile_source(
            "class M { static void a() { while (true) { } } static void b() { if (false) { } } }",
        );
        for (i, instruction) in program.instructions.iter().enumerate() {
            if let Some(target) = instruction.label_target() {
                assert!(
                    target <= program.instructions.len(),
                    "instruction {} jumps out of range ({})",
                    i,
                    target
                );
            }
        }
        // b's jump must land at or after b's start
        let b_start = program.method_offsets["M.b()"];
        let b = &program.instructions[b_start..];
        for instruction in b {
            if let Some(target) = instruction.label_target() {
                assert!(target >= b_start);
            }
        }
    }

    #[test]
    fn test_methods_end_with_return() {
        let program = compile_source("class M { static int f() { return 1; } static void g() { } }");
        let c = program.class("M").unwrap();
        for m in &c.methods {
            let start = m.offset.unwrap();
            let code = &program.instructions[start..start + m.code_len];
            assert_eq!(code.last().unwrap().opcode, Opcode::Return);
        }
    }

    #[test]
    fn test_array_literal_fill() {
        let program = compile_source("class M { static void m() { int[] a = new int[]{7, 8}; } }");
        let code = method_code(&program, "M", "m");
        let stores = code
            .iter()
            .filter(|i| i.opcode == Opcode::ArrayStore)
            .count();
        assert_eq!(stores, 2);
        assert!(code.iter().any(|i| i.opcode == Opcode::NewArray));
    }

    #[test]
    fn test_static_field_constant_seeding() {
        let program = compile_source("class M { static int COUNT = 3; static String NAME = \"x\"; int other = 9; }");
        let c = program.class("M").unwrap();
        assert_eq!(c.fields[0].constant, Some(Value::Int(3)));
        assert_eq!(c.fields[1].constant, Some(Value::Str("x".to_string())));
        assert_eq!(c.fields[2].constant, Some(Value::Int(9)));
        assert!(c.fields[0].is_static);
        assert!(!c.fields[2].is_static);
    }

    #[test]
    fn test_switch_lowering_has_tests_and_bodies() {
        let program = compile_source(
            "class M { static void m(int x) { switch (x) { case 1: break; default: } } }",
        );
        let code = method_code(&program, "M", "m");
        assert!(code.iter().any(|i| i.opcode == Opcode::CmpEq));
        assert!(code.iter().any(|i| i.opcode == Opcode::IfTrue));
    }

    #[test]
    fn test_line_markers_emitted() {
        let program = compile_source(
            "class M { static void m() {\n int a = 1;\n int b = 2;\n } }",
        );
        let code = method_code(&program, "M", "m");
        let lines: Vec<i64> = code
            .iter()
            .filter(|i| i.opcode == Opcode::Line)
            .filter_map(|i| match i.operand(0) {
                Some(Operand::Int(n)) => Some(*n),
                _ => None,
            })
            .collect();
        assert!(lines.contains(&2));
        assert!(lines.contains(&3));
    }
}
