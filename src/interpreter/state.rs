//! Complete machine state
//!
//! [`VmState`] is the single source of truth the interpreter mutates: heap,
//! method area, threads, monitor table, console output, and execution
//! status. Everything derives `Clone`, so a snapshot for the history ring
//! or the facade is one deep `clone()` with no shared structure.

use rustc_hash::FxHashMap;

use crate::memory::heap::{Heap, ObjectKind};
use crate::memory::method_area::MethodArea;
use crate::memory::thread::{ThreadId, ThreadState};
use crate::memory::value::{value_to_string, ObjectId, Value};

/// Overall execution status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VmStatus {
    Paused,
    Running,
    Completed,
    Error,
}

/// Captured program output. `print` appends to the last line; `println`
/// then opens a fresh empty trailing line.
#[derive(Debug, Clone, PartialEq)]
pub struct Console {
    pub lines: Vec<String>,
}

impl Console {
    pub fn new() -> Self {
        Console {
            lines: vec![String::new()],
        }
    }

    pub fn print(&mut self, text: &str) {
        if let Some(last) = self.lines.last_mut() {
            last.push_str(text);
        }
    }

    pub fn println(&mut self, text: &str) {
        self.print(text);
        self.lines.push(String::new());
    }
}

impl Default for Console {
    fn default() -> Self {
        Self::new()
    }
}

/// The whole virtual machine state
#[derive(Debug, Clone, PartialEq)]
pub struct VmState {
    pub heap: Heap,
    pub method_area: MethodArea,
    /// Program counter of the active frame, mirrored for display
    pub pc: usize,
    pub status: VmStatus,
    pub step_number: usize,
    pub output: Console,
    pub threads: Vec<ThreadState>,
    pub active_thread: usize,
    /// object id → holding thread (None = free); one entry per live monitor
    pub monitors: FxHashMap<ObjectId, Option<ThreadId>>,
    pub error: Option<String>,
}

impl VmState {
    pub fn new() -> Self {
        VmState {
            heap: Heap::new(),
            method_area: MethodArea::new(),
            pc: 0,
            status: VmStatus::Paused,
            step_number: 0,
            output: Console::new(),
            threads: Vec::new(),
            active_thread: 0,
            monitors: FxHashMap::default(),
            error: None,
        }
    }

    pub fn current_thread(&self) -> Option<&ThreadState> {
        self.threads.get(self.active_thread)
    }

    pub fn current_thread_mut(&mut self) -> Option<&mut ThreadState> {
        self.threads.get_mut(self.active_thread)
    }

    /// Index of the thread backing a given heap object, if it was started
    pub fn thread_by_object(&self, object_id: ObjectId) -> Option<usize> {
        self.threads.iter().position(|t| t.object_id == Some(object_id))
    }

    /// Render a value for program output, resolving heap-backed strings and
    /// giving collections their familiar bracketed form. Total, and bounded
    /// on cyclic object graphs.
    pub fn display_value(&self, value: &Value) -> String {
        self.display_value_bounded(value, 4)
    }

    fn display_value_bounded(&self, value: &Value, depth: usize) -> String {
        if depth == 0 {
            return value_to_string(value);
        }
        match value {
            Value::Reference(id) => match self.heap.get(*id) {
                Some(obj) if obj.kind == ObjectKind::Str => {
                    obj.string_value.clone().unwrap_or_default()
                }
                Some(obj) if is_map_class(&obj.class_name) => {
                    let entries: Vec<String> = obj
                        .fields
                        .iter()
                        .filter(|f| !f.name.starts_with('$'))
                        .map(|f| {
                            format!("{}={}", f.name, self.display_value_bounded(&f.value, depth - 1))
                        })
                        .collect();
                    format!("{{{}}}", entries.join(", "))
                }
                Some(obj) if !obj.array_elements.is_empty() || is_collection_class(&obj.class_name) => {
                    let items: Vec<String> = obj
                        .array_elements
                        .iter()
                        .map(|v| self.display_value_bounded(v, depth - 1))
                        .collect();
                    format!("[{}]", items.join(", "))
                }
                _ => value_to_string(value),
            },
            Value::Array { id, .. } => match self.heap.get(*id) {
                Some(obj) => {
                    let items: Vec<String> = obj
                        .array_elements
                        .iter()
                        .map(|v| self.display_value_bounded(v, depth - 1))
                        .collect();
                    format!("[{}]", items.join(", "))
                }
                None => value_to_string(value),
            },
            other => value_to_string(other),
        }
    }
}

impl Default for VmState {
    fn default() -> Self {
        Self::new()
    }
}

/// Map emulation classes; membership is decided by explicit lists rather
/// than substring matching
pub const MAP_CLASSES: &[&str] = &[
    "HashMap",
    "LinkedHashMap",
    "TreeMap",
    "Hashtable",
    "Map",
    "SortedMap",
    "NavigableMap",
    "AbstractMap",
    "ConcurrentHashMap",
];

pub const SET_CLASSES: &[&str] = &[
    "HashSet",
    "LinkedHashSet",
    "TreeSet",
    "Set",
    "SortedSet",
    "NavigableSet",
    "AbstractSet",
];

pub const LIST_CLASSES: &[&str] = &[
    "ArrayList",
    "LinkedList",
    "Stack",
    "Vector",
    "List",
    "ArrayDeque",
    "Deque",
    "Queue",
    "PriorityQueue",
    "AbstractList",
    "Collection",
    "Iterable",
];

pub fn is_map_class(name: &str) -> bool {
    MAP_CLASSES.contains(&name)
}

pub fn is_set_class(name: &str) -> bool {
    SET_CLASSES.contains(&name)
}

pub fn is_list_class(name: &str) -> bool {
    LIST_CLASSES.contains(&name)
}

fn is_collection_class(name: &str) -> bool {
    is_set_class(name) || is_list_class(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_console_print_println() {
        let mut console = Console::new();
        console.print("Hello");
        console.print(", World!");
        assert_eq!(console.lines, vec!["Hello, World!"]);
        console.println("");
        assert_eq!(console.lines, vec!["Hello, World!", ""]);
        console.println("next");
        assert_eq!(console.lines, vec!["Hello, World!", "next", ""]);
    }

    #[test]
    fn test_display_resolves_heap_strings() {
        let mut state = VmState::new();
        let id = state.heap.alloc_string("boxed", 0);
        assert_eq!(state.display_value(&Value::Reference(id)), "boxed");
        assert_eq!(state.display_value(&Value::Int(3)), "3");
    }

    #[test]
    fn test_family_lists_are_explicit() {
        assert!(is_map_class("HashMap"));
        assert!(!is_map_class("MyMapLike"));
        assert!(is_list_class("ArrayDeque"));
        assert!(is_set_class("TreeSet"));
    }
}
