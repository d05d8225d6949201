//! StringBuilder/StringBuffer, exception types, Objects, System and
//! Scanner emulation
//!
//! Builders are backed by a single `$sb` field holding the accumulated
//! text. Exception objects record a `message` field at construction.
//! Scanner has no stdin to read from, so every method returns a zero or
//! empty default.

use crate::interpreter::engine::Simulator;
use crate::interpreter::state::VmStatus;
use crate::memory::value::{ObjectId, Value};

use super::string::string_hash_code;
use super::StdlibResult;

fn ok(value: Value, description: String) -> StdlibResult {
    Some((Some(value), description))
}

impl Simulator {
    pub(crate) fn builder_method(
        &mut self,
        id: ObjectId,
        method: &str,
        args: &[Value],
    ) -> StdlibResult {
        let text = self
            .state
            .heap
            .get(id)
            .and_then(|o| o.field("$sb").cloned())
            .and_then(|v| match v {
                Value::Str(s) => Some(s),
                _ => None,
            })
            .unwrap_or_default();

        match (method, args.len()) {
            ("<init>", 0) => {
                if let Some(obj) = self.state.heap.get_mut(id) {
                    obj.set_field("$sb", Value::Str(String::new()));
                }
                Some((None, "Created builder".to_string()))
            }
            ("<init>", 1) => {
                let initial = self.state.display_value(&args[0]);
                if let Some(obj) = self.state.heap.get_mut(id) {
                    obj.set_field("$sb", Value::Str(initial));
                }
                Some((None, "Created builder".to_string()))
            }
            ("append", 1) => {
                let appended = format!("{}{}", text, self.state.display_value(&args[0]));
                if let Some(obj) = self.state.heap.get_mut(id) {
                    obj.set_field("$sb", Value::Str(appended));
                }
                // Returns the receiver for chaining
                ok(Value::Reference(id), "builder.append".to_string())
            }
            ("toString", 0) => ok(Value::Str(text.clone()), format!("builder.toString -> {}", text)),
            ("length", 0) => ok(
                Value::Int(text.chars().count() as i64),
                "builder.length".to_string(),
            ),
            ("reverse", 0) => {
                let reversed: String = text.chars().rev().collect();
                if let Some(obj) = self.state.heap.get_mut(id) {
                    obj.set_field("$sb", Value::Str(reversed));
                }
                ok(Value::Reference(id), "builder.reverse".to_string())
            }
            ("delete", 2) => {
                let chars: Vec<char> = text.chars().collect();
                let start = args[0].as_int().unwrap_or(0).max(0) as usize;
                let end = (args[1].as_int().unwrap_or(0).max(0) as usize).min(chars.len());
                let mut result: String = chars[..start.min(chars.len())].iter().collect();
                if end < chars.len() {
                    result.extend(&chars[end..]);
                }
                if let Some(obj) = self.state.heap.get_mut(id) {
                    obj.set_field("$sb", Value::Str(result));
                }
                ok(Value::Reference(id), format!("builder.delete({}, {})", start, end))
            }
            ("insert", 2) => {
                let chars: Vec<char> = text.chars().collect();
                let offset = (args[0].as_int().unwrap_or(0).max(0) as usize).min(chars.len());
                let inserted = self.state.display_value(&args[1]);
                let mut result: String = chars[..offset].iter().collect();
                result.push_str(&inserted);
                result.extend(&chars[offset..]);
                if let Some(obj) = self.state.heap.get_mut(id) {
                    obj.set_field("$sb", Value::Str(result));
                }
                ok(Value::Reference(id), format!("builder.insert({})", offset))
            }
            ("charAt", 1) => {
                let index = args[0].as_int().unwrap_or(0).max(0) as usize;
                let c = text.chars().nth(index).unwrap_or('\0');
                ok(Value::Char(c), format!("builder.charAt({})", index))
            }
            ("isEmpty", 0) => ok(Value::Boolean(text.is_empty()), "builder.isEmpty".to_string()),
            _ => None,
        }
    }

    pub(crate) fn exception_method(
        &mut self,
        id: ObjectId,
        class_name: &str,
        method: &str,
        args: &[Value],
    ) -> StdlibResult {
        match method {
            "<init>" => {
                let message = args
                    .first()
                    .map(|v| Value::Str(self.state.display_value(v)))
                    .unwrap_or(Value::Null);
                if let Some(obj) = self.state.heap.get_mut(id) {
                    obj.set_field("message", message);
                }
                Some((None, format!("Created {}", class_name)))
            }
            "getMessage" | "getLocalizedMessage" => {
                let message = self
                    .state
                    .heap
                    .get(id)
                    .and_then(|o| o.field("message").cloned())
                    .unwrap_or(Value::Null);
                ok(message, format!("{}.getMessage", class_name))
            }
            "toString" => {
                let message = self
                    .state
                    .heap
                    .get(id)
                    .and_then(|o| o.field("message").cloned())
                    .unwrap_or(Value::Null);
                let text = match &message {
                    Value::Null => class_name.to_string(),
                    other => format!("{}: {}", class_name, self.state.display_value(other)),
                };
                ok(Value::Str(text), format!("{}.toString", class_name))
            }
            "printStackTrace" => ok(Value::Null, format!("{}.printStackTrace", class_name)),
            _ => None,
        }
    }

    pub(crate) fn scanner_method(&mut self, method: &str) -> StdlibResult {
        // No stdin is attached; everything reads as empty/zero
        let value = match method {
            "<init>" => return Some((None, "Created Scanner".to_string())),
            "nextInt" => Value::Int(0),
            "nextLong" => Value::Long(0),
            "nextDouble" => Value::Double(0.0),
            "nextFloat" => Value::Float(0.0),
            "nextBoolean" => Value::Boolean(false),
            "next" | "nextLine" => Value::Str(String::new()),
            "hasNext" | "hasNextInt" | "hasNextLine" | "hasNextDouble" => Value::Boolean(false),
            "close" => Value::Null,
            _ => return None,
        };
        ok(value, format!("Scanner.{} (no input attached)", method))
    }

    pub(crate) fn objects_static(&mut self, method: &str, args: &[Value]) -> StdlibResult {
        let label = format!("Objects.{}", method);
        match (method, args.len()) {
            ("equals", 2) => ok(Value::Boolean(self.values_equal(&args[0], &args[1])), label),
            ("isNull", 1) => ok(Value::Boolean(args[0].is_null()), label),
            ("nonNull", 1) => ok(Value::Boolean(!args[0].is_null()), label),
            ("requireNonNull", _) => ok(args.first().cloned().unwrap_or(Value::Null), label),
            ("hash", _) | ("hashCode", 1) => {
                let text = args
                    .iter()
                    .map(|v| self.state.display_value(v))
                    .collect::<Vec<_>>()
                    .join(",");
                ok(Value::Int(string_hash_code(&text) as i64), label)
            }
            ("toString", 1) => ok(Value::Str(self.state.display_value(&args[0])), label),
            ("toString", 2) => {
                let value = if args[0].is_null() {
                    self.state.display_value(&args[1])
                } else {
                    self.state.display_value(&args[0])
                };
                ok(Value::Str(value), label)
            }
            _ => None,
        }
    }

    pub(crate) fn system_static(&mut self, method: &str, args: &[Value]) -> StdlibResult {
        let label = format!("System.{}", method);
        match method {
            // Simulated clock: 50ms per step, matching the sleep conversion
            "currentTimeMillis" => ok(Value::Long(self.state.step_number as i64 * 50), label),
            "nanoTime" => ok(
                Value::Long(self.state.step_number as i64 * 50_000_000),
                label,
            ),
            "lineSeparator" => ok(Value::Str("\n".to_string()), label),
            "identityHashCode" => ok(
                Value::Int(args.first().and_then(Value::object_id).unwrap_or(0) as i64),
                label,
            ),
            "getProperty" => ok(Value::Str(String::new()), label),
            "exit" => {
                self.state.status = VmStatus::Completed;
                ok(Value::Null, "System.exit: execution completed".to_string())
            }
            "arraycopy" if args.len() == 5 => {
                let src = self
                    .state
                    .heap
                    .get(args[0].object_id().unwrap_or(usize::MAX))
                    .map(|o| o.array_elements.clone())
                    .unwrap_or_default();
                let src_pos = args[1].as_int().unwrap_or(0).max(0) as usize;
                let dest_id = args[2].object_id();
                let dest_pos = args[3].as_int().unwrap_or(0).max(0) as usize;
                let length = args[4].as_int().unwrap_or(0).max(0) as usize;
                if let Some(dest) = dest_id.and_then(|id| self.state.heap.get_mut(id)) {
                    for i in 0..length {
                        let (Some(value), Some(slot)) = (
                            src.get(src_pos + i).cloned(),
                            dest.array_elements.get_mut(dest_pos + i),
                        ) else {
                            break;
                        };
                        *slot = value;
                    }
                }
                ok(Value::Null, label)
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::compile;
    use crate::parser::parse::Parser;

    fn simulator() -> Simulator {
        let mut parser = Parser::new("class Empty { }").unwrap();
        let program = parser.parse_program().unwrap();
        Simulator::new(compile(&program))
    }

    #[test]
    fn test_builder_append_chain() {
        let mut sim = simulator();
        let id = sim.state.heap.alloc_object("StringBuilder", 0);
        sim.builder_method(id, "<init>", &[]);
        sim.builder_method(id, "append", &[Value::Str("ab".into())]);
        sim.builder_method(id, "append", &[Value::Int(3)]);
        let (value, _) = sim.builder_method(id, "toString", &[]).unwrap();
        assert_eq!(value, Some(Value::Str("ab3".to_string())));
    }

    #[test]
    fn test_exception_records_message() {
        let mut sim = simulator();
        let id = sim.state.heap.alloc_object("RuntimeException", 0);
        sim.exception_method(id, "RuntimeException", "<init>", &[Value::Str("boom".into())]);
        let (value, _) = sim
            .exception_method(id, "RuntimeException", "toString", &[])
            .unwrap();
        assert_eq!(value, Some(Value::Str("RuntimeException: boom".to_string())));
    }

    #[test]
    fn test_scanner_defaults() {
        let mut sim = simulator();
        let (value, _) = sim.scanner_method("nextInt").unwrap();
        assert_eq!(value, Some(Value::Int(0)));
        let (value, _) = sim.scanner_method("nextLine").unwrap();
        assert_eq!(value, Some(Value::Str(String::new())));
    }
}
