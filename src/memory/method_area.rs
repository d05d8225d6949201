//! Method area: loaded classes and static fields
//!
//! Runtime class metadata lives here; the bytecode itself stays in the
//! [`crate::compiler::CompiledProgram`] the simulator holds. The method
//! area answers class-hierarchy questions (`is_subclass_of`) and owns the
//! static-field store.

use rustc_hash::FxHashMap;

use super::value::Value;

/// Runtime view of a declared field
#[derive(Debug, Clone, PartialEq)]
pub struct FieldInfo {
    pub name: String,
    pub field_type: String,
    pub is_static: bool,
}

/// Runtime view of a declared method (signature only; code lives in the
/// compiled program)
#[derive(Debug, Clone, PartialEq)]
pub struct MethodInfo {
    pub name: String,
    pub signature: String,
    pub is_static: bool,
}

/// One loaded class
#[derive(Debug, Clone, PartialEq)]
pub struct ClassInfo {
    pub name: String,
    pub super_class: Option<String>,
    pub interfaces: Vec<String>,
    pub fields: Vec<FieldInfo>,
    pub methods: Vec<MethodInfo>,
    pub is_interface: bool,
    pub is_abstract: bool,
    pub loaded_at_step: usize,
}

/// Loaded classes plus static storage
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MethodArea {
    pub loaded_classes: FxHashMap<String, ClassInfo>,
    pub static_fields: FxHashMap<String, FxHashMap<String, Value>>,
    pub constant_pool: Vec<Value>,
}

impl MethodArea {
    pub fn new() -> Self {
        MethodArea::default()
    }

    pub fn class(&self, name: &str) -> Option<&ClassInfo> {
        self.loaded_classes.get(name)
    }

    /// Walk the superclass chain (and interface lists) to decide whether
    /// `class_name` is `ancestor` or derives from it. Every class derives
    /// from Object.
    pub fn is_subclass_of(&self, class_name: &str, ancestor: &str) -> bool {
        if class_name == ancestor || ancestor == "Object" {
            return true;
        }
        let mut current = Some(class_name.to_string());
        let mut hops = 0;
        while let Some(name) = current {
            if name == ancestor {
                return true;
            }
            let Some(info) = self.loaded_classes.get(&name) else {
                return false;
            };
            if info.interfaces.iter().any(|i| i == ancestor) {
                return true;
            }
            current = info.super_class.clone();
            hops += 1;
            if hops > 64 {
                // Malformed cyclic hierarchy; refuse to loop forever
                return false;
            }
        }
        false
    }

    pub fn get_static(&self, class: &str, field: &str) -> Option<&Value> {
        self.static_fields.get(class).and_then(|m| m.get(field))
    }

    pub fn set_static(&mut self, class: &str, field: &str, value: Value) {
        self.static_fields
            .entry(class.to_string())
            .or_default()
            .insert(field.to_string(), value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn class(name: &str, super_class: Option<&str>, interfaces: &[&str]) -> ClassInfo {
        ClassInfo {
            name: name.to_string(),
            super_class: super_class.map(|s| s.to_string()),
            interfaces: interfaces.iter().map(|s| s.to_string()).collect(),
            fields: Vec::new(),
            methods: Vec::new(),
            is_interface: false,
            is_abstract: false,
            loaded_at_step: 0,
        }
    }

    #[test]
    fn test_subclass_walk() {
        let mut area = MethodArea::new();
        area.loaded_classes
            .insert("Animal".into(), class("Animal", None, &[]));
        area.loaded_classes
            .insert("Dog".into(), class("Dog", Some("Animal"), &["Pet"]));

        assert!(area.is_subclass_of("Dog", "Animal"));
        assert!(area.is_subclass_of("Dog", "Pet"));
        assert!(area.is_subclass_of("Dog", "Dog"));
        assert!(area.is_subclass_of("Dog", "Object"));
        assert!(!area.is_subclass_of("Animal", "Dog"));
    }

    #[test]
    fn test_static_fields() {
        let mut area = MethodArea::new();
        area.set_static("Main", "counter", Value::Int(3));
        assert_eq!(area.get_static("Main", "counter"), Some(&Value::Int(3)));
        assert_eq!(area.get_static("Main", "missing"), None);
    }
}
