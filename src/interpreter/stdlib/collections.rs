//! Collection emulation: map/set/list families, iterators, Collections
//! and Arrays utilities
//!
//! Maps repurpose the receiver's ordered field list as entry storage
//! (field name = stringified key), which keeps key uniqueness natural and
//! the visual bucket layout trivial to derive. Sets and lists keep their
//! elements in `array_elements`. Iterators are synthetic `$Iterator` heap
//! objects holding a `$target` reference and a `$index` cursor.

use rand::seq::SliceRandom;

use crate::interpreter::engine::Simulator;
use crate::memory::value::{value_to_string, ObjectId, Value};

use super::StdlibResult;

fn ok(value: Value, description: String) -> StdlibResult {
    Some((Some(value), description))
}

fn done(description: String) -> StdlibResult {
    Some((Some(Value::Null), description))
}

impl Simulator {
    /// Order elements numerically when every element is numeric, otherwise
    /// lexicographically on the rendered value
    pub(crate) fn sort_values(&self, elements: &mut [Value]) {
        if elements.iter().all(Value::is_numeric) {
            elements.sort_by(|a, b| {
                a.as_number()
                    .unwrap_or(0.0)
                    .partial_cmp(&b.as_number().unwrap_or(0.0))
                    .unwrap_or(std::cmp::Ordering::Equal)
            });
        } else {
            elements.sort_by_key(|v| self.state.display_value(v));
        }
    }

    /// The backing elements of a list/set/array argument
    fn elements_of(&self, value: &Value) -> Vec<Value> {
        value
            .object_id()
            .and_then(|id| self.state.heap.get(id))
            .map(|o| o.array_elements.clone())
            .unwrap_or_default()
    }

    fn set_elements(&mut self, id: ObjectId, elements: Vec<Value>) {
        if let Some(obj) = self.state.heap.get_mut(id) {
            obj.array_elements = elements;
        }
    }

    fn alloc_value_array(&mut self, element_type: &str, elements: Vec<Value>) -> Value {
        let step = self.state.step_number;
        let id = self.state.heap.alloc_array(element_type, elements, step);
        Value::Array {
            id,
            element_type: element_type.to_string(),
        }
    }

    fn alloc_collection(&mut self, class: &str, elements: Vec<Value>) -> Value {
        let step = self.state.step_number;
        let id = self.state.heap.alloc_object(class, step);
        if let Some(obj) = self.state.heap.get_mut(id) {
            obj.array_elements = elements;
        }
        Value::Reference(id)
    }

    // ===== Map family =====

    pub(crate) fn map_method(&mut self, id: ObjectId, method: &str, args: &[Value]) -> StdlibResult {
        let key = args.first().map(|v| self.stringify_key(v)).unwrap_or_default();
        match (method, args.len()) {
            ("<init>", _) => Some((None, "Created map".to_string())),
            ("put", 2) => {
                let old = self
                    .state
                    .heap
                    .get_mut(id)
                    .map(|o| {
                        let old = o.field(&key).cloned();
                        o.set_field(&key, args[1].clone());
                        old
                    })
                    .unwrap_or(None);
                ok(
                    old.unwrap_or(Value::Null),
                    format!("map.put({}, {})", key, value_to_string(&args[1])),
                )
            }
            ("get", 1) => {
                let value = self
                    .state
                    .heap
                    .get(id)
                    .and_then(|o| o.field(&key).cloned())
                    .unwrap_or(Value::Null);
                let text = value_to_string(&value);
                ok(value, format!("map.get({}) -> {}", key, text))
            }
            ("containsKey", 1) => {
                let found = self
                    .state
                    .heap
                    .get(id)
                    .is_some_and(|o| o.field(&key).is_some());
                ok(Value::Boolean(found), format!("map.containsKey({})", key))
            }
            ("containsValue", 1) => {
                let fields = self
                    .state
                    .heap
                    .get(id)
                    .map(|o| o.fields.clone())
                    .unwrap_or_default();
                let found = fields
                    .iter()
                    .filter(|f| !f.name.starts_with('$'))
                    .any(|f| self.values_equal(&f.value, &args[0]));
                ok(Value::Boolean(found), "map.containsValue".to_string())
            }
            ("size", 0) => {
                let size = self.map_entry_count(id);
                ok(Value::Int(size as i64), format!("map.size -> {}", size))
            }
            ("isEmpty", 0) => {
                let size = self.map_entry_count(id);
                ok(Value::Boolean(size == 0), "map.isEmpty".to_string())
            }
            ("remove", 1) => {
                let old = self
                    .state
                    .heap
                    .get_mut(id)
                    .and_then(|o| o.remove_field(&key))
                    .unwrap_or(Value::Null);
                ok(old, format!("map.remove({})", key))
            }
            ("clear", 0) => {
                if let Some(obj) = self.state.heap.get_mut(id) {
                    obj.fields.retain(|f| f.name.starts_with('$'));
                }
                done("map.clear".to_string())
            }
            ("getOrDefault", 2) => {
                let value = self
                    .state
                    .heap
                    .get(id)
                    .and_then(|o| o.field(&key).cloned())
                    .unwrap_or_else(|| args[1].clone());
                ok(value, format!("map.getOrDefault({})", key))
            }
            ("putIfAbsent", 2) => {
                let existing = self.state.heap.get(id).and_then(|o| o.field(&key).cloned());
                match existing {
                    Some(value) => ok(value, format!("map.putIfAbsent({}) kept", key)),
                    None => {
                        if let Some(obj) = self.state.heap.get_mut(id) {
                            obj.set_field(&key, args[1].clone());
                        }
                        ok(Value::Null, format!("map.putIfAbsent({}) stored", key))
                    }
                }
            }
            ("entrySet", 0) => {
                let entries: Vec<(String, Value)> = self
                    .state
                    .heap
                    .get(id)
                    .map(|o| {
                        o.fields
                            .iter()
                            .filter(|f| !f.name.starts_with('$'))
                            .map(|f| (f.name.clone(), f.value.clone()))
                            .collect()
                    })
                    .unwrap_or_default();
                let step = self.state.step_number;
                let mut elements = Vec::with_capacity(entries.len());
                for (name, value) in entries {
                    let entry_id = self.state.heap.alloc_object("$MapEntry", step);
                    if let Some(entry) = self.state.heap.get_mut(entry_id) {
                        entry.set_field("key", Value::Str(name));
                        entry.set_field("value", value);
                    }
                    elements.push(Value::Reference(entry_id));
                }
                let array = self.alloc_value_array("$MapEntry", elements);
                ok(array, "map.entrySet".to_string())
            }
            ("keySet", 0) => {
                let keys: Vec<Value> = self
                    .state
                    .heap
                    .get(id)
                    .map(|o| {
                        o.fields
                            .iter()
                            .filter(|f| !f.name.starts_with('$'))
                            .map(|f| Value::Str(f.name.clone()))
                            .collect()
                    })
                    .unwrap_or_default();
                let array = self.alloc_value_array("String", keys);
                ok(array, "map.keySet".to_string())
            }
            ("values", 0) => {
                let values: Vec<Value> = self
                    .state
                    .heap
                    .get(id)
                    .map(|o| {
                        o.fields
                            .iter()
                            .filter(|f| !f.name.starts_with('$'))
                            .map(|f| f.value.clone())
                            .collect()
                    })
                    .unwrap_or_default();
                let array = self.alloc_value_array("Object", values);
                ok(array, "map.values".to_string())
            }
            ("forEach", _) => done("map.forEach is a no-op (lambdas are not executed)".to_string()),
            ("toString", 0) => {
                let text = self.state.display_value(&Value::Reference(id));
                ok(Value::Str(text), "map.toString".to_string())
            }
            _ => None,
        }
    }

    fn map_entry_count(&self, id: ObjectId) -> usize {
        self.state
            .heap
            .get(id)
            .map(|o| o.fields.iter().filter(|f| !f.name.starts_with('$')).count())
            .unwrap_or(0)
    }

    pub(crate) fn map_entry_method(&mut self, id: ObjectId, method: &str, args: &[Value]) -> StdlibResult {
        match (method, args.len()) {
            ("getKey", 0) => {
                let key = self
                    .state
                    .heap
                    .get(id)
                    .and_then(|o| o.field("key").cloned())
                    .unwrap_or(Value::Null);
                ok(key, "entry.getKey".to_string())
            }
            ("getValue", 0) => {
                let value = self
                    .state
                    .heap
                    .get(id)
                    .and_then(|o| o.field("value").cloned())
                    .unwrap_or(Value::Null);
                ok(value, "entry.getValue".to_string())
            }
            ("setValue", 1) => {
                let old = self
                    .state
                    .heap
                    .get_mut(id)
                    .map(|o| {
                        let old = o.field("value").cloned();
                        o.set_field("value", args[0].clone());
                        old
                    })
                    .unwrap_or(None);
                ok(old.unwrap_or(Value::Null), "entry.setValue".to_string())
            }
            _ => None,
        }
    }

    // ===== Set family =====

    pub(crate) fn set_method(
        &mut self,
        id: ObjectId,
        class: &str,
        method: &str,
        args: &[Value],
    ) -> StdlibResult {
        match (method, args.len()) {
            ("<init>", _) => Some((None, format!("Created {}", class))),
            ("add", 1) => {
                let key = self.stringify_key(&args[0]);
                let mut elements = self.elements_of(&Value::Reference(id));
                let duplicate = elements
                    .iter()
                    .any(|e| self.stringify_key(e) == key);
                if duplicate {
                    ok(Value::Boolean(false), format!("set.add({}) rejected duplicate", key))
                } else {
                    elements.push(args[0].clone());
                    if class == "TreeSet" {
                        self.sort_values(&mut elements);
                    }
                    self.set_elements(id, elements);
                    ok(Value::Boolean(true), format!("set.add({})", key))
                }
            }
            ("contains", 1) => {
                let key = self.stringify_key(&args[0]);
                let found = self
                    .elements_of(&Value::Reference(id))
                    .iter()
                    .any(|e| self.stringify_key(e) == key);
                ok(Value::Boolean(found), format!("set.contains({})", key))
            }
            ("remove", 1) => {
                let key = self.stringify_key(&args[0]);
                let mut elements = self.elements_of(&Value::Reference(id));
                let before = elements.len();
                elements.retain(|e| self.stringify_key(e) != key);
                let removed = elements.len() != before;
                self.set_elements(id, elements);
                ok(Value::Boolean(removed), format!("set.remove({})", key))
            }
            ("size", 0) => {
                let size = self.elements_of(&Value::Reference(id)).len();
                ok(Value::Int(size as i64), format!("set.size -> {}", size))
            }
            ("isEmpty", 0) => {
                let empty = self.elements_of(&Value::Reference(id)).is_empty();
                ok(Value::Boolean(empty), "set.isEmpty".to_string())
            }
            ("clear", 0) => {
                self.set_elements(id, Vec::new());
                done("set.clear".to_string())
            }
            ("iterator", 0) => {
                let iterator = self.make_iterator(Value::Reference(id), "$SetIterator");
                ok(iterator, "set.iterator".to_string())
            }
            ("toArray", 0) => {
                let elements = self.elements_of(&Value::Reference(id));
                let array = self.alloc_value_array("Object", elements);
                ok(array, "set.toArray".to_string())
            }
            ("forEach", _) => done("set.forEach is a no-op (lambdas are not executed)".to_string()),
            ("toString", 0) => {
                let text = self.state.display_value(&Value::Reference(id));
                ok(Value::Str(text), "set.toString".to_string())
            }
            _ => None,
        }
    }

    // ===== List / Deque / Queue family =====

    pub(crate) fn list_method(
        &mut self,
        id: ObjectId,
        class: &str,
        method: &str,
        args: &[Value],
    ) -> StdlibResult {
        let this = Value::Reference(id);
        match (method, args.len()) {
            ("<init>", 0) => Some((None, format!("Created {}", class))),
            ("<init>", 1) => {
                // Copy constructor
                let elements = self.elements_of(&args[0]);
                self.set_elements(id, elements);
                Some((None, format!("Created {} from collection", class)))
            }

            // Insertions
            ("add", 1) | ("addLast", 1) | ("offerLast", 1) | ("offer", 1) | ("enqueue", 1) => {
                let mut elements = self.elements_of(&this);
                elements.push(args[0].clone());
                if class == "PriorityQueue" {
                    self.sort_values(&mut elements);
                }
                self.set_elements(id, elements);
                ok(
                    Value::Boolean(true),
                    format!("{}.{}({})", class, method, value_to_string(&args[0])),
                )
            }
            ("add", 2) => {
                let index = args[0].as_int().unwrap_or(0).max(0) as usize;
                let mut elements = self.elements_of(&this);
                let index = index.min(elements.len());
                elements.insert(index, args[1].clone());
                self.set_elements(id, elements);
                done(format!("list.add({}, {})", index, value_to_string(&args[1])))
            }
            ("addFirst", 1) | ("offerFirst", 1) | ("push", 1) => {
                let mut elements = self.elements_of(&this);
                elements.insert(0, args[0].clone());
                self.set_elements(id, elements);
                ok(
                    Value::Boolean(true),
                    format!("{}.{}({})", class, method, value_to_string(&args[0])),
                )
            }
            ("addAll", 1) => {
                let mut elements = self.elements_of(&this);
                elements.extend(self.elements_of(&args[0]));
                self.set_elements(id, elements);
                ok(Value::Boolean(true), "list.addAll".to_string())
            }

            // Reads
            ("get", 1) => {
                let index = args[0].as_int().unwrap_or(0);
                let value = self
                    .elements_of(&this)
                    .get(index.max(0) as usize)
                    .cloned()
                    .unwrap_or(Value::Null);
                let text = value_to_string(&value);
                ok(value, format!("list.get({}) -> {}", index, text))
            }
            ("set", 2) => {
                let index = args[0].as_int().unwrap_or(0).max(0) as usize;
                let mut elements = self.elements_of(&this);
                let old = if index < elements.len() {
                    let old = elements[index].clone();
                    elements[index] = args[1].clone();
                    old
                } else {
                    Value::Null
                };
                self.set_elements(id, elements);
                ok(old, format!("list.set({})", index))
            }
            ("size", 0) => {
                let size = self.elements_of(&this).len();
                ok(Value::Int(size as i64), format!("{}.size -> {}", class, size))
            }
            ("isEmpty", 0) => {
                let empty = self.elements_of(&this).is_empty();
                ok(Value::Boolean(empty), "list.isEmpty".to_string())
            }
            ("contains", 1) => {
                let elements = self.elements_of(&this);
                let found = elements.iter().any(|e| self.values_equal(e, &args[0]));
                ok(Value::Boolean(found), "list.contains".to_string())
            }
            ("containsAll", 1) => {
                let elements = self.elements_of(&this);
                let other = self.elements_of(&args[0]);
                let all = other
                    .iter()
                    .all(|o| elements.iter().any(|e| self.values_equal(e, o)));
                ok(Value::Boolean(all), "list.containsAll".to_string())
            }
            ("indexOf", 1) => {
                let elements = self.elements_of(&this);
                let index = elements
                    .iter()
                    .position(|e| self.values_equal(e, &args[0]))
                    .map(|i| i as i64)
                    .unwrap_or(-1);
                ok(Value::Int(index), "list.indexOf".to_string())
            }
            ("lastIndexOf", 1) => {
                let elements = self.elements_of(&this);
                let index = elements
                    .iter()
                    .rposition(|e| self.values_equal(e, &args[0]))
                    .map(|i| i as i64)
                    .unwrap_or(-1);
                ok(Value::Int(index), "list.lastIndexOf".to_string())
            }

            // Removals
            ("remove", 0) | ("removeFirst", 0) | ("poll", 0) | ("pollFirst", 0) | ("pop", 0)
            | ("dequeue", 0) => {
                let mut elements = self.elements_of(&this);
                let value = if elements.is_empty() {
                    Value::Null
                } else {
                    elements.remove(0)
                };
                self.set_elements(id, elements);
                ok(value, format!("{}.{}", class, method))
            }
            ("removeLast", 0) | ("pollLast", 0) => {
                let mut elements = self.elements_of(&this);
                let value = elements.pop().unwrap_or(Value::Null);
                self.set_elements(id, elements);
                ok(value, format!("{}.{}", class, method))
            }
            ("remove", 1) => {
                let mut elements = self.elements_of(&this);
                // Java semantics: remove(int) is by index, remove(Object)
                // is by value
                let (value, note) = match &args[0] {
                    Value::Int(_) | Value::Short(_) | Value::Byte(_) => {
                        let index = args[0].as_int().unwrap_or(0);
                        if index >= 0 && (index as usize) < elements.len() {
                            (elements.remove(index as usize), format!("list.remove({})", index))
                        } else {
                            (Value::Null, format!("list.remove({}) out of bounds", index))
                        }
                    }
                    other => {
                        let removed = elements
                            .iter()
                            .position(|e| self.values_equal(e, other))
                            .map(|i| elements.remove(i))
                            .is_some();
                        (Value::Boolean(removed), "list.remove(value)".to_string())
                    }
                };
                self.set_elements(id, elements);
                ok(value, note)
            }
            ("removeAll", 1) => {
                let other = self.elements_of(&args[0]);
                let mut elements = self.elements_of(&this);
                let before = elements.len();
                elements.retain(|e| !other.iter().any(|o| self.values_equal(e, o)));
                let changed = elements.len() != before;
                self.set_elements(id, elements);
                ok(Value::Boolean(changed), "list.removeAll".to_string())
            }
            ("retainAll", 1) => {
                let other = self.elements_of(&args[0]);
                let mut elements = self.elements_of(&this);
                let before = elements.len();
                elements.retain(|e| other.iter().any(|o| self.values_equal(e, o)));
                let changed = elements.len() != before;
                self.set_elements(id, elements);
                ok(Value::Boolean(changed), "list.retainAll".to_string())
            }
            ("clear", 0) => {
                self.set_elements(id, Vec::new());
                done(format!("{}.clear", class))
            }

            // Peeks
            ("peek", 0) | ("peekFirst", 0) | ("element", 0) | ("getFirst", 0) => {
                let value = self.elements_of(&this).first().cloned().unwrap_or(Value::Null);
                ok(value, format!("{}.{}", class, method))
            }
            ("peekLast", 0) | ("getLast", 0) => {
                let value = self.elements_of(&this).last().cloned().unwrap_or(Value::Null);
                ok(value, format!("{}.{}", class, method))
            }

            // Views and transforms
            ("subList", 2) => {
                let elements = self.elements_of(&this);
                let from = args[0].as_int().unwrap_or(0).max(0) as usize;
                let to = (args[1].as_int().unwrap_or(0).max(0) as usize).min(elements.len());
                let slice = if from <= to {
                    elements[from..to].to_vec()
                } else {
                    Vec::new()
                };
                let list = self.alloc_collection("ArrayList", slice);
                ok(list, format!("list.subList({}, {})", from, to))
            }
            ("iterator", 0) | ("listIterator", 0) => {
                let iterator = self.make_iterator(this, "$Iterator");
                ok(iterator, format!("{}.iterator", class))
            }
            ("descendingIterator", 0) => {
                let mut elements = self.elements_of(&this);
                elements.reverse();
                let snapshot = self.alloc_value_array("Object", elements);
                let iterator = self.make_iterator(snapshot, "$Iterator");
                ok(iterator, "list.descendingIterator".to_string())
            }
            ("toArray", 0) => {
                let elements = self.elements_of(&this);
                let array = self.alloc_value_array("Object", elements);
                ok(array, "list.toArray".to_string())
            }
            ("sort", _) => {
                let mut elements = self.elements_of(&this);
                self.sort_values(&mut elements);
                self.set_elements(id, elements);
                done("list.sort".to_string())
            }
            ("reverse", 0) => {
                let mut elements = self.elements_of(&this);
                elements.reverse();
                self.set_elements(id, elements);
                done("list.reverse".to_string())
            }
            ("stream", 0) => ok(this, "list.stream aliases the backing elements".to_string()),
            ("forEach", _) => done("list.forEach is a no-op (lambdas are not executed)".to_string()),
            ("toString", 0) => {
                let text = self.state.display_value(&this);
                ok(Value::Str(text), "list.toString".to_string())
            }
            ("hashCode", 0) => {
                let text = self.state.display_value(&this);
                ok(
                    Value::Int(super::string::string_hash_code(&text) as i64),
                    "list.hashCode".to_string(),
                )
            }
            ("equals", 1) => {
                let a = self.elements_of(&this);
                let b = self.elements_of(&args[0]);
                let equal = a.len() == b.len()
                    && a.iter().zip(&b).all(|(x, y)| self.values_equal(x, y));
                ok(Value::Boolean(equal), "list.equals".to_string())
            }
            _ => None,
        }
    }

    // ===== Iterators =====

    pub(crate) fn iterator_method(&mut self, id: ObjectId, method: &str) -> StdlibResult {
        let (target, index) = {
            let obj = self.state.heap.get(id)?;
            (
                obj.field("$target").cloned().unwrap_or(Value::Null),
                obj.field("$index").and_then(Value::as_int).unwrap_or(0),
            )
        };
        let elements = self.elements_of(&target);

        match method {
            "hasNext" => {
                let has = (index as usize) < elements.len();
                ok(Value::Boolean(has), format!("iterator.hasNext -> {}", has))
            }
            "next" => {
                let value = elements
                    .get(index.max(0) as usize)
                    .cloned()
                    .unwrap_or(Value::Null);
                if let Some(obj) = self.state.heap.get_mut(id) {
                    obj.set_field("$index", Value::Int(index + 1));
                }
                let text = value_to_string(&value);
                ok(value, format!("iterator.next -> {}", text))
            }
            "remove" => done("iterator.remove is a no-op".to_string()),
            _ => None,
        }
    }

    /// Methods available directly on array receivers
    pub(crate) fn array_receiver_method(
        &mut self,
        id: ObjectId,
        method: &str,
        _args: &[Value],
    ) -> StdlibResult {
        let this = Value::Array {
            id,
            element_type: self
                .state
                .heap
                .get(id)
                .map(|o| o.element_type.clone())
                .unwrap_or_default(),
        };
        match method {
            "iterator" => {
                let iterator = self.make_iterator(this, "$Iterator");
                ok(iterator, "array.iterator".to_string())
            }
            "stream" => ok(this, "array.stream aliases the backing elements".to_string()),
            "clone" => {
                let elements = self.elements_of(&this);
                let element_type = self
                    .state
                    .heap
                    .get(id)
                    .map(|o| o.element_type.clone())
                    .unwrap_or_default();
                let copy = self.alloc_value_array(&element_type, elements);
                ok(copy, "array.clone".to_string())
            }
            _ => None,
        }
    }

    // ===== Collections utility =====

    pub(crate) fn collections_static(&mut self, method: &str, args: &[Value]) -> StdlibResult {
        let label = format!("Collections.{}", method);
        match method {
            "sort" => {
                let id = args.first().and_then(Value::object_id)?;
                let mut elements = self.elements_of(&args[0]);
                self.sort_values(&mut elements);
                self.set_elements(id, elements);
                done(label)
            }
            "reverse" => {
                let id = args.first().and_then(Value::object_id)?;
                let mut elements = self.elements_of(&args[0]);
                elements.reverse();
                self.set_elements(id, elements);
                done(label)
            }
            "shuffle" => {
                let id = args.first().and_then(Value::object_id)?;
                let mut elements = self.elements_of(&args[0]);
                elements.shuffle(&mut rand::thread_rng());
                self.set_elements(id, elements);
                done(label)
            }
            "min" | "max" => {
                let mut elements = self.elements_of(args.first()?);
                if elements.is_empty() {
                    return ok(Value::Null, label);
                }
                self.sort_values(&mut elements);
                let value = if method == "min" {
                    elements.first().cloned()
                } else {
                    elements.last().cloned()
                };
                ok(value.unwrap_or(Value::Null), label)
            }
            "frequency" if args.len() == 2 => {
                let elements = self.elements_of(&args[0]);
                let count = elements
                    .iter()
                    .filter(|e| self.values_equal(e, &args[1]))
                    .count();
                ok(Value::Int(count as i64), label)
            }
            "fill" if args.len() == 2 => {
                let id = args[0].object_id()?;
                let len = self.elements_of(&args[0]).len();
                self.set_elements(id, vec![args[1].clone(); len]);
                done(label)
            }
            "copy" if args.len() == 2 => {
                let dest = args[0].object_id()?;
                let src = self.elements_of(&args[1]);
                let mut elements = self.elements_of(&args[0]);
                for (i, value) in src.into_iter().enumerate() {
                    if i < elements.len() {
                        elements[i] = value;
                    } else {
                        elements.push(value);
                    }
                }
                self.set_elements(dest, elements);
                done(label)
            }
            "swap" if args.len() == 3 => {
                let id = args[0].object_id()?;
                let i = args[1].as_int().unwrap_or(0).max(0) as usize;
                let j = args[2].as_int().unwrap_or(0).max(0) as usize;
                let mut elements = self.elements_of(&args[0]);
                if i < elements.len() && j < elements.len() {
                    elements.swap(i, j);
                }
                self.set_elements(id, elements);
                done(label)
            }
            "nCopies" if args.len() == 2 => {
                let n = args[0].as_int().unwrap_or(0).max(0) as usize;
                let list = self.alloc_collection("ArrayList", vec![args[1].clone(); n]);
                ok(list, label)
            }
            "singleton" | "singletonList" => {
                let class = if method == "singleton" { "HashSet" } else { "ArrayList" };
                let element = args.first().cloned().unwrap_or(Value::Null);
                let list = self.alloc_collection(class, vec![element]);
                ok(list, label)
            }
            "emptyList" => ok(self.alloc_collection("ArrayList", Vec::new()), label),
            "emptySet" => ok(self.alloc_collection("HashSet", Vec::new()), label),
            "emptyMap" => {
                let step = self.state.step_number;
                let id = self.state.heap.alloc_object("HashMap", step);
                ok(Value::Reference(id), label)
            }
            "unmodifiableList" | "unmodifiableSet" | "unmodifiableMap"
            | "unmodifiableCollection" | "unmodifiableSortedSet" | "unmodifiableSortedMap" => {
                // Returned unchanged; immutability is not enforced
                ok(args.first().cloned().unwrap_or(Value::Null), label)
            }
            "binarySearch" if args.len() == 2 => {
                let elements = self.elements_of(&args[0]);
                let index = elements
                    .iter()
                    .position(|e| self.values_equal(e, &args[1]))
                    .map(|i| i as i64)
                    .unwrap_or(-1);
                ok(Value::Int(index), label)
            }
            "disjoint" if args.len() == 2 => {
                let a = self.elements_of(&args[0]);
                let b = self.elements_of(&args[1]);
                let disjoint = !a.iter().any(|x| b.iter().any(|y| self.values_equal(x, y)));
                ok(Value::Boolean(disjoint), label)
            }
            _ => None,
        }
    }

    // ===== Arrays utility =====

    pub(crate) fn arrays_static(&mut self, method: &str, args: &[Value]) -> StdlibResult {
        let label = format!("Arrays.{}", method);
        match method {
            "sort" => {
                let id = args.first().and_then(Value::object_id)?;
                let mut elements = self.elements_of(&args[0]);
                self.sort_values(&mut elements);
                self.set_elements(id, elements);
                done(label)
            }
            "fill" if args.len() == 2 => {
                let id = args[0].object_id()?;
                let len = self.elements_of(&args[0]).len();
                self.set_elements(id, vec![args[1].clone(); len]);
                done(label)
            }
            "copyOf" if args.len() == 2 => {
                let mut elements = self.elements_of(&args[0]);
                let element_type = args[0]
                    .object_id()
                    .and_then(|id| self.state.heap.get(id))
                    .map(|o| o.element_type.clone())
                    .unwrap_or_default();
                let new_len = args[1].as_int().unwrap_or(0).max(0) as usize;
                elements.resize(new_len, Value::default_for(&element_type));
                let array = self.alloc_value_array(&element_type, elements);
                ok(array, label)
            }
            "copyOfRange" if args.len() == 3 => {
                let elements = self.elements_of(&args[0]);
                let element_type = args[0]
                    .object_id()
                    .and_then(|id| self.state.heap.get(id))
                    .map(|o| o.element_type.clone())
                    .unwrap_or_default();
                let from = args[1].as_int().unwrap_or(0).max(0) as usize;
                let to = (args[2].as_int().unwrap_or(0).max(0) as usize).min(elements.len());
                let slice = if from <= to {
                    elements[from..to].to_vec()
                } else {
                    Vec::new()
                };
                let array = self.alloc_value_array(&element_type, slice);
                ok(array, label)
            }
            "equals" if args.len() == 2 => {
                let a = self.elements_of(&args[0]);
                let b = self.elements_of(&args[1]);
                let equal = a.len() == b.len()
                    && a.iter().zip(&b).all(|(x, y)| self.values_equal(x, y));
                ok(Value::Boolean(equal), label)
            }
            // Simplified: deep equality is not modelled
            "deepEquals" => ok(Value::Boolean(false), label),
            "toString" | "deepToString" => {
                let text = args
                    .first()
                    .map(|v| self.state.display_value(v))
                    .unwrap_or_else(|| "null".to_string());
                ok(Value::Str(text), label)
            }
            "asList" => {
                let elements = if args.len() == 1 && args[0].object_id().is_some() {
                    self.elements_of(&args[0])
                } else {
                    args.to_vec()
                };
                let list = self.alloc_collection("ArrayList", elements);
                ok(list, label)
            }
            "binarySearch" if args.len() == 2 => {
                let elements = self.elements_of(&args[0]);
                let index = elements
                    .iter()
                    .position(|e| self.values_equal(e, &args[1]))
                    .map(|i| i as i64)
                    .unwrap_or(-1);
                ok(Value::Int(index), label)
            }
            "stream" => ok(args.first().cloned().unwrap_or(Value::Null), label),
            _ => None,
        }
    }
}
