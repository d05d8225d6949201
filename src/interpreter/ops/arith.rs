//! Arithmetic, logic and comparison opcodes
//!
//! Integral arithmetic runs in `i64`, floating-point in `f64`; mixing
//! promotes to `f64`. Integer division truncates toward zero and division
//! or modulo by zero soft-fails to 0. `ADD` becomes string concatenation
//! when either operand is a string.

use crate::compiler::Opcode;
use crate::interpreter::engine::Simulator;
use crate::memory::heap::ObjectKind;
use crate::memory::value::{value_to_string, Value};

impl Simulator {
    /// Whether ADD on these operands is a string concatenation
    fn is_string_operand(&self, value: &Value) -> bool {
        match value {
            Value::Str(_) => true,
            Value::Reference(id) => self
                .state
                .heap
                .get(*id)
                .is_some_and(|o| o.kind == ObjectKind::Str),
            _ => false,
        }
    }

    /// Coerce a concatenation operand to text: primitives render their
    /// value, heap strings their contents, other references `ref@id`,
    /// null the literal "null"
    fn concat_text(&self, value: &Value) -> String {
        match value {
            Value::Reference(id) => match self.state.heap.get(*id) {
                Some(obj) if obj.kind == ObjectKind::Str => {
                    obj.string_value.clone().unwrap_or_default()
                }
                _ => value_to_string(value),
            },
            other => value_to_string(other),
        }
    }

    pub(crate) fn exec_arith(&mut self, opcode: Opcode) -> String {
        let b = self.pop_value();
        let a = self.pop_value();

        if opcode == Opcode::Add && (self.is_string_operand(&a) || self.is_string_operand(&b)) {
            let text = format!("{}{}", self.concat_text(&a), self.concat_text(&b));
            let description = format!("Concatenated to \"{}\"", text);
            self.push_value(Value::Str(text));
            return description;
        }

        let result = if a.is_float() || b.is_float() {
            let x = a.as_number().unwrap_or(0.0);
            let y = b.as_number().unwrap_or(0.0);
            let r = match opcode {
                Opcode::Add => x + y,
                Opcode::Sub => x - y,
                Opcode::Mul => x * y,
                Opcode::Div => {
                    if y == 0.0 {
                        0.0
                    } else {
                        x / y
                    }
                }
                Opcode::Mod => {
                    if y == 0.0 {
                        0.0
                    } else {
                        x % y
                    }
                }
                _ => 0.0,
            };
            Value::Double(r)
        } else {
            let x = a.as_int().unwrap_or(0);
            let y = b.as_int().unwrap_or(0);
            let r = match opcode {
                Opcode::Add => x.wrapping_add(y),
                Opcode::Sub => x.wrapping_sub(y),
                Opcode::Mul => x.wrapping_mul(y),
                // Integer division truncates toward zero; by-zero yields 0
                Opcode::Div => {
                    if y == 0 {
                        0
                    } else {
                        x.wrapping_div(y)
                    }
                }
                Opcode::Mod => {
                    if y == 0 {
                        0
                    } else {
                        x.wrapping_rem(y)
                    }
                }
                _ => 0,
            };
            Value::Int(r)
        };

        let description = format!(
            "{} {} {} = {}",
            value_to_string(&a),
            opcode,
            value_to_string(&b),
            value_to_string(&result)
        );
        self.push_value(result);
        description
    }

    pub(crate) fn exec_neg(&mut self) -> String {
        let value = self.pop_value();
        let result = match &value {
            Value::Int(n) => Value::Int(-n),
            Value::Long(n) => Value::Long(-n),
            Value::Byte(n) => Value::Byte(-n),
            Value::Short(n) => Value::Short(-n),
            Value::Float(x) => Value::Float(-x),
            Value::Double(x) => Value::Double(-x),
            Value::Char(c) => Value::Int(-(*c as i64)),
            _ => Value::Int(0),
        };
        let description = format!("Negated to {}", value_to_string(&result));
        self.push_value(result);
        description
    }

    pub(crate) fn exec_not(&mut self) -> String {
        let value = self.pop_value();
        let result = Value::Boolean(!value.is_truthy());
        let description = format!("Logical NOT = {}", value_to_string(&result));
        self.push_value(result);
        description
    }

    pub(crate) fn exec_logic(&mut self, opcode: Opcode) -> String {
        let b = self.pop_value();
        let a = self.pop_value();

        // Bitwise on integral pairs, truthiness otherwise
        let result = match (a.as_int(), b.as_int()) {
            (Some(x), Some(y))
                if !matches!(a, Value::Boolean(_)) && !matches!(b, Value::Boolean(_)) =>
            {
                match opcode {
                    Opcode::And => Value::Int(x & y),
                    _ => Value::Int(x | y),
                }
            }
            _ => match opcode {
                Opcode::And => Value::Boolean(a.is_truthy() && b.is_truthy()),
                _ => Value::Boolean(a.is_truthy() || b.is_truthy()),
            },
        };
        let description = format!("{} = {}", opcode, value_to_string(&result));
        self.push_value(result);
        description
    }

    /// Structural equality used by comparisons and collection lookups
    pub(crate) fn values_equal(&self, a: &Value, b: &Value) -> bool {
        if a.is_null() || b.is_null() {
            return a.is_null() && b.is_null();
        }
        // Numeric kinds compare by magnitude
        if a.is_numeric() && b.is_numeric() {
            return a.as_number() == b.as_number();
        }
        if let (Value::Boolean(x), Value::Boolean(y)) = (a, b) {
            return x == y;
        }
        // Strings (primitive or heap-backed) compare by contents
        if self.is_string_operand(a) && self.is_string_operand(b) {
            return self.concat_text(a) == self.concat_text(b);
        }
        // References compare by object id
        match (a.object_id(), b.object_id()) {
            (Some(x), Some(y)) => x == y,
            _ => false,
        }
    }

    pub(crate) fn exec_compare(&mut self, opcode: Opcode) -> String {
        let b = self.pop_value();
        let a = self.pop_value();

        let result = match opcode {
            Opcode::CmpEq => self.values_equal(&a, &b),
            Opcode::CmpNe => !self.values_equal(&a, &b),
            // Ordinal comparisons apply to numerics only; everything else
            // compares false
            _ => match (a.as_number(), b.as_number()) {
                (Some(x), Some(y))
                    if !matches!(a, Value::Boolean(_)) && !matches!(b, Value::Boolean(_)) =>
                {
                    match opcode {
                        Opcode::CmpLt => x < y,
                        Opcode::CmpLe => x <= y,
                        Opcode::CmpGt => x > y,
                        Opcode::CmpGe => x >= y,
                        _ => false,
                    }
                }
                _ => false,
            },
        };

        let description = format!(
            "{} {} {} = {}",
            value_to_string(&a),
            opcode,
            value_to_string(&b),
            result
        );
        self.push_value(Value::Boolean(result));
        description
    }
}
