//! Heap arena for the emulated JVM
//!
//! Objects live in a flat vector indexed by [`ObjectId`]; callers hold ids,
//! never pointers, so cyclic object graphs (trees, linked lists) are safe.
//! There is no reclamation: objects persist for the whole session, which is
//! what makes reverse execution and heap visualisation straightforward.
//!
//! # Object kinds
//!
//! - `Object`: plain instance with an ordered field list. Map emulation
//!   repurposes the field list as its entry storage (field name =
//!   stringified key), which keeps key uniqueness natural.
//! - `Array`: `array_elements` plus an element type; `fields` stays empty
//!   except for `$`-prefixed bookkeeping entries.
//! - `Str`: interned `String` instances created via `new String(...)`.
//! - `Lambda`: carries a single `info` field with the captured descriptor.

use super::value::{ObjectId, Value};

/// What a heap object is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectKind {
    Object,
    Array,
    Lambda,
    Str,
}

/// One named slot in an object's ordered field list
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: String,
    pub value: Value,
}

/// A single allocated object
#[derive(Debug, Clone, PartialEq)]
pub struct HeapObject {
    pub id: ObjectId,
    pub kind: ObjectKind,
    pub class_name: String,
    /// Ordered field list; order is observable (map entries, visualisation)
    pub fields: Vec<Field>,
    pub array_elements: Vec<Value>,
    pub element_type: String,
    pub string_value: Option<String>,
    pub created_at_step: usize,
    /// Visualisation flags; the engine never collects, so objects stay reachable
    pub reachable: bool,
    pub gc_root: bool,
}

impl HeapObject {
    /// Look up a field by name
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.iter().find(|f| f.name == name).map(|f| &f.value)
    }

    /// Set a field, creating it if it does not exist (duck-typed field addition)
    pub fn set_field(&mut self, name: &str, value: Value) {
        if let Some(field) = self.fields.iter_mut().find(|f| f.name == name) {
            field.value = value;
        } else {
            self.fields.push(Field {
                name: name.to_string(),
                value,
            });
        }
    }

    /// Remove a field by name, returning its value
    pub fn remove_field(&mut self, name: &str) -> Option<Value> {
        let pos = self.fields.iter().position(|f| f.name == name)?;
        Some(self.fields.remove(pos).value)
    }

    pub fn array_length(&self) -> usize {
        self.array_elements.len()
    }

    /// Outgoing references, derived from fields and elements. Visualisation
    /// traversals must still track visited sets for cycles.
    pub fn references(&self) -> Vec<ObjectId> {
        self.fields
            .iter()
            .map(|f| &f.value)
            .chain(self.array_elements.iter())
            .filter_map(Value::object_id)
            .collect()
    }
}

/// The heap: a contiguous arena of objects
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Heap {
    objects: Vec<HeapObject>,
}

impl Heap {
    pub fn new() -> Self {
        Heap::default()
    }

    fn push(&mut self, mut object: HeapObject) -> ObjectId {
        let id = self.objects.len();
        object.id = id;
        self.objects.push(object);
        id
    }

    /// Allocate a plain instance of `class_name` with no fields yet
    pub fn alloc_object(&mut self, class_name: &str, step: usize) -> ObjectId {
        self.push(HeapObject {
            id: 0,
            kind: ObjectKind::Object,
            class_name: class_name.to_string(),
            fields: Vec::new(),
            array_elements: Vec::new(),
            element_type: String::new(),
            string_value: None,
            created_at_step: step,
            reachable: true,
            gc_root: false,
        })
    }

    /// Allocate an array with the given elements
    pub fn alloc_array(&mut self, element_type: &str, elements: Vec<Value>, step: usize) -> ObjectId {
        self.push(HeapObject {
            id: 0,
            kind: ObjectKind::Array,
            class_name: format!("{}[]", element_type),
            fields: Vec::new(),
            array_elements: elements,
            element_type: element_type.to_string(),
            string_value: None,
            created_at_step: step,
            reachable: true,
            gc_root: false,
        })
    }

    /// Allocate a String instance (for `new String(...)` and interning)
    pub fn alloc_string(&mut self, text: &str, step: usize) -> ObjectId {
        self.push(HeapObject {
            id: 0,
            kind: ObjectKind::Str,
            class_name: "String".to_string(),
            fields: Vec::new(),
            array_elements: Vec::new(),
            element_type: String::new(),
            string_value: Some(text.to_string()),
            created_at_step: step,
            reachable: true,
            gc_root: false,
        })
    }

    /// Allocate a lambda object carrying its serialised descriptor
    pub fn alloc_lambda(&mut self, info: &str, step: usize) -> ObjectId {
        let id = self.push(HeapObject {
            id: 0,
            kind: ObjectKind::Lambda,
            class_name: "Lambda".to_string(),
            fields: Vec::new(),
            array_elements: Vec::new(),
            element_type: String::new(),
            string_value: None,
            created_at_step: step,
            reachable: true,
            gc_root: false,
        });
        self.objects[id].set_field("info", Value::Str(info.to_string()));
        id
    }

    pub fn get(&self, id: ObjectId) -> Option<&HeapObject> {
        self.objects.get(id)
    }

    pub fn get_mut(&mut self, id: ObjectId) -> Option<&mut HeapObject> {
        self.objects.get_mut(id)
    }

    /// All objects, for snapshots and visualisation
    pub fn objects(&self) -> &[HeapObject] {
        &self.objects
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alloc_and_fields() {
        let mut heap = Heap::new();
        let id = heap.alloc_object("Point", 0);
        heap.get_mut(id).unwrap().set_field("x", Value::Int(1));
        heap.get_mut(id).unwrap().set_field("x", Value::Int(2));
        heap.get_mut(id).unwrap().set_field("y", Value::Int(3));

        let obj = heap.get(id).unwrap();
        assert_eq!(obj.field("x"), Some(&Value::Int(2)));
        assert_eq!(obj.fields.len(), 2);
        assert_eq!(obj.field("missing"), None);
    }

    #[test]
    fn test_array_alloc() {
        let mut heap = Heap::new();
        let id = heap.alloc_array("int", vec![Value::Int(0); 3], 1);
        let obj = heap.get(id).unwrap();
        assert_eq!(obj.kind, ObjectKind::Array);
        assert_eq!(obj.array_length(), 3);
        assert_eq!(obj.class_name, "int[]");
        assert_eq!(obj.created_at_step, 1);
    }

    #[test]
    fn test_references_derived() {
        let mut heap = Heap::new();
        let child = heap.alloc_object("Node", 0);
        let parent = heap.alloc_object("Node", 0);
        heap.get_mut(parent)
            .unwrap()
            .set_field("next", Value::Reference(child));
        assert_eq!(heap.get(parent).unwrap().references(), vec![child]);
        assert!(heap.get(child).unwrap().references().is_empty());
    }
}
