//! Call-stack frames
//!
//! A [`StackFrame`] is one activation record on a thread's call stack:
//! compiler-assigned local slots, a LIFO operand stack, the program counter
//! into the global instruction vector, and the source line of the last
//! `LINE` marker executed.

use super::value::Value;

/// A local variable slot with its compile-time name and declared type
#[derive(Debug, Clone, PartialEq)]
pub struct LocalVariable {
    pub name: String,
    pub var_type: String,
    pub value: Value,
    pub slot: usize,
}

/// One activation record
#[derive(Debug, Clone, PartialEq)]
pub struct StackFrame {
    pub id: usize,
    pub class_name: String,
    pub method_name: String,
    pub method_signature: String,
    pub locals: Vec<LocalVariable>,
    pub operand_stack: Vec<Value>,
    /// Index into the global instruction vector
    pub pc: usize,
    pub line_number: usize,
    pub is_native: bool,
    /// Captured values, populated only for lambda invocations
    pub captured: Vec<Value>,
}

impl StackFrame {
    pub fn new(id: usize, class_name: &str, method_name: &str, signature: &str, pc: usize) -> Self {
        StackFrame {
            id,
            class_name: class_name.to_string(),
            method_name: method_name.to_string(),
            method_signature: signature.to_string(),
            locals: Vec::new(),
            operand_stack: Vec::new(),
            pc,
            line_number: 0,
            is_native: false,
            captured: Vec::new(),
        }
    }

    /// Push onto the operand stack
    pub fn push(&mut self, value: Value) {
        self.operand_stack.push(value);
    }

    /// Pop from the operand stack; an empty stack yields null rather than
    /// failing, matching the engine's soft-fail policy
    pub fn pop(&mut self) -> Value {
        self.operand_stack.pop().unwrap_or(Value::Null)
    }

    /// Read a local slot; unset slots read as null
    pub fn load_local(&self, slot: usize) -> Value {
        self.locals
            .iter()
            .find(|l| l.slot == slot)
            .map(|l| l.value.clone())
            .unwrap_or(Value::Null)
    }

    /// Write a local slot, creating it on first store
    pub fn store_local(&mut self, slot: usize, name: &str, value: Value) {
        if let Some(local) = self.locals.iter_mut().find(|l| l.slot == slot) {
            local.name = name.to_string();
            local.var_type = value.type_name().to_string();
            local.value = value;
        } else {
            self.locals.push(LocalVariable {
                name: name.to_string(),
                var_type: value.type_name().to_string(),
                value,
                slot,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operand_stack_lifo() {
        let mut frame = StackFrame::new(0, "Main", "main", "main(String[])", 0);
        frame.push(Value::Int(1));
        frame.push(Value::Int(2));
        assert_eq!(frame.pop(), Value::Int(2));
        assert_eq!(frame.pop(), Value::Int(1));
        assert_eq!(frame.pop(), Value::Null);
    }

    #[test]
    fn test_locals_create_on_store() {
        let mut frame = StackFrame::new(0, "Main", "main", "main(String[])", 0);
        assert_eq!(frame.load_local(1), Value::Null);
        frame.store_local(1, "x", Value::Int(5));
        assert_eq!(frame.load_local(1), Value::Int(5));
        frame.store_local(1, "x", Value::Int(6));
        assert_eq!(frame.locals.len(), 1);
        assert_eq!(frame.load_local(1), Value::Int(6));
    }
}
