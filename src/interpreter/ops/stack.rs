//! Stack, local and output opcodes

use crate::compiler::{Instruction, Operand};
use crate::interpreter::engine::Simulator;
use crate::memory::value::{value_to_string, Value};

impl Simulator {
    pub(crate) fn exec_line(&mut self, instruction: &Instruction) -> String {
        let line = match instruction.operand(0) {
            Some(Operand::Int(n)) => *n as usize,
            _ => 0,
        };
        if let Some(frame) = self.top_frame_mut() {
            frame.line_number = line;
        }
        format!("Line {}", line)
    }

    pub(crate) fn exec_load_const(&mut self, instruction: &Instruction) -> String {
        let value = match instruction.operand(0) {
            Some(Operand::Int(n)) => Value::Int(*n),
            Some(Operand::Float(x)) => Value::Double(*x),
            Some(Operand::Str(s)) => Value::Str(s.clone()),
            Some(Operand::Bool(b)) => Value::Boolean(*b),
            Some(Operand::Char(c)) => Value::Char(*c),
            _ => Value::Null,
        };
        let text = value_to_string(&value);
        self.push_value(value);
        format!("Pushed constant {}", text)
    }

    pub(crate) fn exec_push_null(&mut self) -> String {
        self.push_value(Value::Null);
        "Pushed null".to_string()
    }

    pub(crate) fn exec_load_local(&mut self, instruction: &Instruction) -> String {
        let (slot, name) = match instruction.operand(0) {
            Some(Operand::Local { index, name }) => (*index, name.clone()),
            _ => return "Malformed LOAD_LOCAL".to_string(),
        };
        let value = self
            .top_frame_mut()
            .map(|f| f.load_local(slot))
            .unwrap_or(Value::Null);
        let text = value_to_string(&value);
        self.push_value(value);
        format!("Loaded local '{}' = {}", name, text)
    }

    pub(crate) fn exec_store_local(&mut self, instruction: &Instruction) -> String {
        let (slot, name) = match instruction.operand(0) {
            Some(Operand::Local { index, name }) => (*index, name.clone()),
            _ => return "Malformed STORE_LOCAL".to_string(),
        };
        let value = self.pop_value();
        let text = value_to_string(&value);
        if let Some(frame) = self.top_frame_mut() {
            frame.store_local(slot, &name, value);
        }
        format!("Stored {} into local '{}'", text, name)
    }

    pub(crate) fn exec_dup(&mut self) -> String {
        if let Some(frame) = self.top_frame_mut() {
            if let Some(top) = frame.operand_stack.last().cloned() {
                frame.push(top);
                return "Duplicated top of stack".to_string();
            }
        }
        "Nothing to duplicate".to_string()
    }

    pub(crate) fn exec_dup_x1(&mut self) -> String {
        if let Some(frame) = self.top_frame_mut() {
            if frame.operand_stack.len() >= 2 {
                let y = frame.pop();
                let x = frame.pop();
                frame.push(y.clone());
                frame.push(x);
                frame.push(y);
                return "Duplicated top below second".to_string();
            }
        }
        "Stack too small for DUP_X1".to_string()
    }

    pub(crate) fn exec_pop(&mut self) -> String {
        let value = self.pop_value();
        format!("Popped {}", value_to_string(&value))
    }

    pub(crate) fn exec_swap(&mut self) -> String {
        if let Some(frame) = self.top_frame_mut() {
            if frame.operand_stack.len() >= 2 {
                let top = frame.pop();
                let below = frame.pop();
                frame.push(top);
                frame.push(below);
                return "Swapped top two values".to_string();
            }
        }
        "Stack too small for SWAP".to_string()
    }

    pub(crate) fn exec_print(&mut self, instruction: &Instruction) -> String {
        let is_println = matches!(instruction.operand(0), Some(Operand::Bool(true)));
        let value = self.pop_value();
        let text = self.state.display_value(&value);
        if is_println {
            self.state.output.println(&text);
            format!("println: {}", text)
        } else {
            self.state.output.print(&text);
            format!("print: {}", text)
        }
    }
}
