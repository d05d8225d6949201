//! Object, array, field and type opcodes

use crate::compiler::{Instruction, Operand};
use crate::interpreter::engine::Simulator;
use crate::memory::heap::ObjectKind;
use crate::memory::value::{value_to_string, Value};

impl Simulator {
    pub(crate) fn exec_new(&mut self, instruction: &Instruction) -> String {
        let class_name = match instruction.operand(0) {
            Some(Operand::Class(name)) => name.clone(),
            _ => return "Malformed NEW".to_string(),
        };

        let step = self.state.step_number;
        // String instances are heap-backed strings, not plain objects
        let id = if class_name == "String" {
            self.state.heap.alloc_string("", step)
        } else {
            self.state.heap.alloc_object(&class_name, step)
        };

        // Seed declared instance fields, walking the superclass chain;
        // subclass declarations win over inherited ones
        let mut chain = Vec::new();
        let mut current = Some(class_name.clone());
        while let Some(name) = current {
            if let Some(class) = self.program.class(&name) {
                chain.push(name.clone());
                current = class.super_class.clone();
            } else {
                break;
            }
            if chain.len() > 64 {
                break;
            }
        }
        for name in chain {
            let fields: Vec<(String, Value)> = self
                .program
                .class(&name)
                .map(|c| {
                    c.fields
                        .iter()
                        .filter(|f| !f.is_static)
                        .map(|f| {
                            let value = f
                                .constant
                                .clone()
                                .unwrap_or_else(|| Value::default_for(base_of(&f.field_type)));
                            (f.name.clone(), value)
                        })
                        .collect()
                })
                .unwrap_or_default();
            if let Some(object) = self.state.heap.get_mut(id) {
                for (field_name, value) in fields {
                    if object.field(&field_name).is_none() {
                        object.set_field(&field_name, value);
                    }
                }
            }
        }

        self.push_value(Value::Reference(id));
        format!("Created new {} (obj@{})", class_name, id)
    }

    pub(crate) fn exec_new_array(&mut self, instruction: &Instruction) -> String {
        let element_type = match instruction.operand(0) {
            Some(Operand::Type(name)) => name.clone(),
            _ => "Object".to_string(),
        };
        let dims = match instruction.operand(1) {
            Some(Operand::Int(n)) => (*n).max(1) as usize,
            _ => 1,
        };

        // Innermost length was pushed last
        let mut lengths = Vec::with_capacity(dims);
        for _ in 0..dims {
            lengths.push(self.pop_value().as_int().unwrap_or(0).max(0));
        }
        lengths.reverse();

        let value = self.alloc_nested_array(&element_type, &lengths);
        let description = format!(
            "Created {}[{}] array",
            element_type,
            lengths
                .iter()
                .map(|l| l.to_string())
                .collect::<Vec<_>>()
                .join("][")
        );
        self.push_value(value);
        description
    }

    fn alloc_nested_array(&mut self, element_type: &str, lengths: &[i64]) -> Value {
        let step = self.state.step_number;
        let length = lengths.first().copied().unwrap_or(0) as usize;
        let elements: Vec<Value> = if lengths.len() <= 1 {
            vec![Value::default_for(element_type); length]
        } else {
            (0..length)
                .map(|_| self.alloc_nested_array(element_type, &lengths[1..]))
                .collect()
        };
        let id = self.state.heap.alloc_array(element_type, elements, step);
        Value::Array {
            id,
            element_type: element_type.to_string(),
        }
    }

    pub(crate) fn exec_array_length(&mut self) -> String {
        let value = self.pop_value();
        let length = value
            .object_id()
            .and_then(|id| self.state.heap.get(id))
            .map(|o| o.array_length())
            .unwrap_or(0);
        self.push_value(Value::Int(length as i64));
        format!("Array length = {}", length)
    }

    pub(crate) fn exec_array_load(&mut self) -> String {
        let index = self.pop_value().as_int().unwrap_or(0);
        let array = self.pop_value();

        let element = array
            .object_id()
            .and_then(|id| self.state.heap.get(id))
            .and_then(|o| o.array_elements.get(index.max(0) as usize).cloned());

        match element {
            Some(value) => {
                let text = value_to_string(&value);
                self.push_value(value);
                format!("Loaded [{}] = {}", index, text)
            }
            None => {
                self.push_value(Value::Null);
                format!("Index {} out of bounds; loaded null", index)
            }
        }
    }

    pub(crate) fn exec_array_store(&mut self) -> String {
        let value = self.pop_value();
        let index = self.pop_value().as_int().unwrap_or(-1);
        let array = self.pop_value();

        let text = value_to_string(&value);
        let stored = array
            .object_id()
            .and_then(|id| self.state.heap.get_mut(id))
            .and_then(|o| {
                let slot = o.array_elements.get_mut(index.max(0) as usize)?;
                *slot = value;
                Some(())
            });

        match stored {
            Some(()) => format!("Stored {} at [{}]", text, index),
            None => format!("Index {} out of bounds; store ignored", index),
        }
    }

    pub(crate) fn exec_get_field(&mut self, instruction: &Instruction) -> String {
        let name = match instruction.operand(0) {
            Some(Operand::Str(name)) => name.clone(),
            _ => return "Malformed GETFIELD".to_string(),
        };
        let object = self.pop_value();

        // Arrays expose their length as a pseudo-field
        if name == "length" {
            if let Some(obj) = object.object_id().and_then(|id| self.state.heap.get(id)) {
                if obj.kind == ObjectKind::Array {
                    let length = obj.array_length();
                    self.push_value(Value::Int(length as i64));
                    return format!("Array length = {}", length);
                }
            }
        }

        let value = object
            .object_id()
            .and_then(|id| self.state.heap.get(id))
            .and_then(|o| o.field(&name).cloned())
            .unwrap_or(Value::Null);
        let text = value_to_string(&value);
        self.push_value(value);
        format!("Read field '{}' = {}", name, text)
    }

    pub(crate) fn exec_put_field(&mut self, instruction: &Instruction) -> String {
        let name = match instruction.operand(0) {
            Some(Operand::Str(name)) => name.clone(),
            _ => return "Malformed PUTFIELD".to_string(),
        };
        let value = self.pop_value();
        let object = self.pop_value();
        let text = value_to_string(&value);

        match object.object_id().and_then(|id| self.state.heap.get_mut(id)) {
            Some(obj) => {
                // Creates the field if it does not exist yet
                obj.set_field(&name, value);
                format!("Set field '{}' = {}", name, text)
            }
            None => format!("Cannot set field '{}' on null", name),
        }
    }

    pub(crate) fn exec_get_static(&mut self, instruction: &Instruction) -> String {
        let (name, owner) = match instruction.operand(0) {
            Some(Operand::Field { name, owner }) => (name.clone(), owner.clone()),
            _ => return "Malformed GETSTATIC".to_string(),
        };

        if let Some(value) = well_known_constant(&owner, &name) {
            let text = value_to_string(&value);
            self.push_value(value);
            return format!("Read constant {}.{} = {}", owner, name, text);
        }

        let value = self
            .state
            .method_area
            .get_static(&owner, &name)
            .cloned()
            .unwrap_or(Value::Null);
        let text = value_to_string(&value);
        self.push_value(value);
        format!("Read static {}.{} = {}", owner, name, text)
    }

    pub(crate) fn exec_put_static(&mut self, instruction: &Instruction) -> String {
        let (name, owner) = match instruction.operand(0) {
            Some(Operand::Field { name, owner }) => (name.clone(), owner.clone()),
            _ => return "Malformed PUTSTATIC".to_string(),
        };
        let value = self.pop_value();
        let text = value_to_string(&value);
        self.state.method_area.set_static(&owner, &name, value);
        format!("Set static {}.{} = {}", owner, name, text)
    }

    pub(crate) fn exec_checkcast(&mut self, instruction: &Instruction) -> String {
        let target = match instruction.operand(0) {
            Some(Operand::Type(name)) => name.clone(),
            _ => return "Malformed CHECKCAST".to_string(),
        };
        let value = self.pop_value();

        // Primitive casts convert; reference casts are unchecked
        let result = match target.as_str() {
            "int" => Value::Int(value.as_number().unwrap_or(0.0) as i64),
            "long" => Value::Long(value.as_number().unwrap_or(0.0) as i64),
            "short" => Value::Short(value.as_number().unwrap_or(0.0) as i64),
            "byte" => Value::Byte(value.as_number().unwrap_or(0.0) as i64),
            "char" => {
                let code = value.as_int().unwrap_or(0).clamp(0, char::MAX as i64) as u32;
                Value::Char(char::from_u32(code).unwrap_or('\0'))
            }
            "float" => Value::Float(value.as_number().unwrap_or(0.0)),
            "double" => Value::Double(value.as_number().unwrap_or(0.0)),
            _ => value,
        };
        let text = value_to_string(&result);
        self.push_value(result);
        format!("Cast to {} = {}", target, text)
    }

    pub(crate) fn exec_instanceof(&mut self, instruction: &Instruction) -> String {
        let target = match instruction.operand(0) {
            Some(Operand::Type(name)) => name.clone(),
            _ => return "Malformed INSTANCEOF".to_string(),
        };
        let value = self.pop_value();

        let result = match &value {
            Value::Null => false,
            Value::Str(_) => target == "String" || target == "Object" || target == "CharSequence",
            Value::Reference(id) => {
                let class = self
                    .state
                    .heap
                    .get(*id)
                    .map(|o| o.class_name.clone())
                    .unwrap_or_default();
                self.state.method_area.is_subclass_of(&class, base_of(&target))
                    || class == base_of(&target)
            }
            Value::Array { element_type, .. } => {
                target == "Object" || target.trim_end_matches("[]") == element_type
            }
            Value::Lambda(_) => target == "Object",
            primitive => {
                primitive.type_name() == target || boxed_name(primitive.type_name()) == target
            }
        };
        self.push_value(Value::Boolean(result));
        format!("instanceof {} = {}", target, result)
    }

    pub(crate) fn exec_lambda_create(&mut self, instruction: &Instruction) -> String {
        let info = match instruction.operand(0) {
            Some(Operand::Str(info)) => info.clone(),
            _ => String::new(),
        };
        let step = self.state.step_number;
        let id = self.state.heap.alloc_lambda(&info, step);
        self.push_value(Value::Lambda(id));
        format!("Created lambda {} (obj@{})", info, id)
    }
}

fn base_of(type_name: &str) -> &str {
    type_name
        .split('<')
        .next()
        .unwrap_or(type_name)
        .trim_end_matches("[]")
}

fn boxed_name(primitive: &str) -> &str {
    match primitive {
        "int" => "Integer",
        "long" => "Long",
        "float" => "Float",
        "double" => "Double",
        "boolean" => "Boolean",
        "char" => "Character",
        "byte" => "Byte",
        "short" => "Short",
        other => other,
    }
}

/// Constants surfaced through GETSTATIC on the well-known classes
fn well_known_constant(owner: &str, name: &str) -> Option<Value> {
    match (owner, name) {
        ("Math", "PI") => Some(Value::Double(std::f64::consts::PI)),
        ("Math", "E") => Some(Value::Double(std::f64::consts::E)),
        ("Integer", "MAX_VALUE") => Some(Value::Int(i32::MAX as i64)),
        ("Integer", "MIN_VALUE") => Some(Value::Int(i32::MIN as i64)),
        ("Long", "MAX_VALUE") => Some(Value::Long(i64::MAX)),
        ("Long", "MIN_VALUE") => Some(Value::Long(i64::MIN)),
        ("Double", "MAX_VALUE") => Some(Value::Double(f64::MAX)),
        ("Double", "MIN_VALUE") => Some(Value::Double(f64::MIN_POSITIVE)),
        ("Byte", "MAX_VALUE") => Some(Value::Byte(i8::MAX as i64)),
        ("Byte", "MIN_VALUE") => Some(Value::Byte(i8::MIN as i64)),
        ("Short", "MAX_VALUE") => Some(Value::Short(i16::MAX as i64)),
        ("Short", "MIN_VALUE") => Some(Value::Short(i16::MIN as i64)),
        _ => None,
    }
}
