//! Standard-library emulation
//!
//! A dispatch layer that intercepts `INVOKE_*` before user-defined lookup
//! and emulates the well-known JDK surface directly. Family membership is
//! decided by explicit class-name lists; a hit pops nothing itself (the
//! invoke handler already did) and reports the value to push — `None`
//! for constructors, which must leave the receiver produced by `NEW; DUP`
//! untouched on the stack.
//!
//! Families, split one per file:
//! - [`string`]: String instance methods and statics (valueOf/format/join)
//! - [`numbers`]: boxed numerics, Character predicates, Math
//! - [`collections`]: map/set/list families, iterators, Collections, Arrays
//! - [`threads`]: Thread lifecycle, sleep/join/wait/notify
//! - [`misc`]: StringBuilder, exception types, Objects, System, Scanner

pub mod collections;
pub mod misc;
pub mod numbers;
pub mod string;
pub mod threads;

use crate::interpreter::engine::Simulator;
use crate::interpreter::state::{is_list_class, is_map_class, is_set_class};
use crate::memory::heap::ObjectKind;
use crate::memory::value::Value;

/// `Some((value_to_push, description))` when a call was handled;
/// `value_to_push = None` means push nothing (constructors)
pub(crate) type StdlibResult = Option<(Option<Value>, String)>;

/// The closed whitelist of emulated exception types
pub(crate) const EXCEPTION_CLASSES: &[&str] = &[
    "Throwable",
    "Error",
    "Exception",
    "RuntimeException",
    "IllegalArgumentException",
    "IllegalStateException",
    "NullPointerException",
    "ArithmeticException",
    "IndexOutOfBoundsException",
    "ArrayIndexOutOfBoundsException",
    "UnsupportedOperationException",
    "InterruptedException",
    "ClassCastException",
    "NumberFormatException",
];

impl Simulator {
    /// Intercept a call before user-defined lookup. Keyed on the receiver
    /// class (or static owner class), method name, and arity.
    pub(crate) fn invoke_stdlib(
        &mut self,
        method: &str,
        receiver: Option<&Value>,
        args: &[Value],
        static_class: Option<&str>,
    ) -> StdlibResult {
        let Some(receiver) = receiver else {
            // Static call: dispatch on the owner class
            let class = static_class?;
            return match class {
                "Math" => self.math_static(method, args),
                "Integer" | "Long" | "Double" | "Float" | "Byte" | "Short" | "Character"
                | "Boolean" | "Number" => self.number_static(class, method, args),
                "String" => self.string_static(method, args),
                "Collections" => self.collections_static(method, args),
                "Arrays" => self.arrays_static(method, args),
                "System" => self.system_static(method, args),
                "Objects" => self.objects_static(method, args),
                "Thread" => self.thread_static(method, args),
                _ => None,
            };
        };

        // wait/notify/notifyAll are Object methods, available everywhere
        if let Value::Reference(id) = receiver {
            if matches!(method, "wait" | "notify" | "notifyAll") {
                return self.object_monitor_method(*id, method);
            }
        }

        // Strings: primitive payloads and heap-backed String instances
        if let Some(text) = self.as_string_receiver(receiver) {
            if method == "<init>" {
                // new String(...): seed the instance with its argument
                let seeded = args
                    .first()
                    .map(|v| self.state.display_value(v))
                    .unwrap_or_default();
                if let Some(id) = receiver.object_id() {
                    if let Some(obj) = self.state.heap.get_mut(id) {
                        obj.string_value = Some(seeded);
                    }
                }
                return Some((None, "Created String".to_string()));
            }
            return self.string_method(&text, method, args);
        }

        // Boxed numerics on primitive receivers
        if receiver.is_numeric() || matches!(receiver, Value::Boolean(_)) {
            return self.primitive_method(receiver, method, args);
        }

        if let Value::Array { id, .. } = receiver {
            return self.array_receiver_method(*id, method, args);
        }

        let Value::Reference(id) = receiver else {
            return None;
        };
        let id = *id;
        let class_name = self.state.heap.get(id)?.class_name.clone();

        if is_map_class(&class_name) {
            return self.map_method(id, method, args);
        }
        if is_set_class(&class_name) {
            return self.set_method(id, &class_name, method, args);
        }
        if is_list_class(&class_name) {
            return self.list_method(id, &class_name, method, args);
        }
        if class_name == "$Iterator" || class_name == "$SetIterator" {
            return self.iterator_method(id, method);
        }
        if class_name == "$MapEntry" {
            return self.map_entry_method(id, method, args);
        }
        if class_name == "StringBuilder" || class_name == "StringBuffer" {
            return self.builder_method(id, method, args);
        }
        if class_name == "Scanner" {
            return self.scanner_method(method);
        }
        if EXCEPTION_CLASSES.contains(&class_name.as_str()) {
            return self.exception_method(id, &class_name, method, args);
        }
        if class_name == "Thread" || self.state.method_area.is_subclass_of(&class_name, "Thread")
        {
            return self.thread_instance_method(id, &class_name, method, args);
        }

        None
    }

    /// Resolve a value to string text when it is a string receiver
    pub(crate) fn as_string_receiver(&self, value: &Value) -> Option<String> {
        match value {
            Value::Str(s) => Some(s.clone()),
            Value::Reference(id) => {
                let obj = self.state.heap.get(*id)?;
                if obj.kind == ObjectKind::Str {
                    Some(obj.string_value.clone().unwrap_or_default())
                } else {
                    None
                }
            }
            _ => None,
        }
    }

    /// The stringified form used for map keys and set identity
    pub(crate) fn stringify_key(&self, value: &Value) -> String {
        self.state.display_value(value)
    }

    /// Allocate a `$Iterator` over a collection or array
    pub(crate) fn make_iterator(&mut self, target: Value, class: &str) -> Value {
        let step = self.state.step_number;
        let id = self.state.heap.alloc_object(class, step);
        if let Some(obj) = self.state.heap.get_mut(id) {
            obj.set_field("$target", target);
            obj.set_field("$index", Value::Int(0));
        }
        Value::Reference(id)
    }
}
