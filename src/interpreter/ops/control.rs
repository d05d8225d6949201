//! Control flow, calls, exceptions and monitors

use crate::compiler::{Instruction, Opcode, Operand};
use crate::interpreter::engine::Simulator;
use crate::interpreter::state::VmStatus;
use crate::memory::thread::{ThreadStatus, WaitTarget};
use crate::memory::value::{value_to_string, Value};

impl Simulator {
    pub(crate) fn exec_goto(&mut self, instruction: &Instruction) -> String {
        let Some(target) = instruction.label_target() else {
            return "Malformed GOTO".to_string();
        };
        if let Some(frame) = self.top_frame_mut() {
            frame.pc = target;
        }
        format!("Jumped to {}", target)
    }

    pub(crate) fn exec_branch(&mut self, instruction: &Instruction, jump_when: bool) -> String {
        let Some(target) = instruction.label_target() else {
            return "Malformed branch".to_string();
        };
        let condition = self.pop_value().is_truthy();
        if condition == jump_when {
            if let Some(frame) = self.top_frame_mut() {
                frame.pc = target;
            }
            format!("Condition {}; jumped to {}", condition, target)
        } else {
            format!("Condition {}; fell through", condition)
        }
    }

    pub(crate) fn exec_return(&mut self) -> String {
        if let Some(thread) = self.state.current_thread_mut() {
            if let Some(frame) = thread.stack.pop() {
                return format!(
                    "Returned from {}.{}",
                    frame.class_name, frame.method_name
                );
            }
        }
        "Return with no frame".to_string()
    }

    pub(crate) fn exec_return_value(&mut self) -> String {
        if let Some(thread) = self.state.current_thread_mut() {
            if let Some(mut frame) = thread.stack.pop() {
                let value = frame.pop();
                let text = value_to_string(&value);
                if let Some(caller) = thread.top_frame_mut() {
                    caller.push(value);
                }
                return format!(
                    "Returned {} from {}.{}",
                    text, frame.class_name, frame.method_name
                );
            }
        }
        "Return with no frame".to_string()
    }

    pub(crate) fn exec_throw(&mut self) -> String {
        let value = self.pop_value();
        let message = match &value {
            Value::Reference(id) => match self.state.heap.get(*id) {
                Some(obj) => {
                    let detail = obj
                        .field("message")
                        .map(|m| self.state.display_value(m))
                        .unwrap_or_default();
                    if detail.is_empty() || detail == "null" {
                        obj.class_name.clone()
                    } else {
                        format!("{}: {}", obj.class_name, detail)
                    }
                }
                None => "Exception".to_string(),
            },
            other => format!("Exception: {}", self.state.display_value(other)),
        };
        self.state.error = Some(message.clone());
        self.state.status = VmStatus::Error;
        format!("Uncaught exception: {}", message)
    }

    pub(crate) fn exec_monitor_enter(&mut self, ip: usize) -> String {
        let value = self.pop_value();
        let Some(object_id) = value.object_id() else {
            return "MONITORENTER on null; ignored".to_string();
        };
        let thread_id = self.state.active_thread;

        let owner = self.state.monitors.get(&object_id).copied().flatten();
        match owner {
            None => {
                // Free (or never locked): acquire
                self.state.monitors.insert(object_id, Some(thread_id));
                if let Some(thread) = self.state.current_thread_mut() {
                    if !thread.holds_monitor(object_id) {
                        thread.holding_monitors.push(object_id);
                    }
                }
                format!("Acquired monitor of obj@{}", object_id)
            }
            Some(holder) if holder == thread_id => {
                // Reentrant entry is tracked by membership, not a count
                format!("Re-entered monitor of obj@{}", object_id)
            }
            Some(holder) => {
                // Contended: restore the operand and retry this instruction
                // when the thread is next scheduled
                self.push_value(value);
                if let Some(thread) = self.state.current_thread_mut() {
                    thread.status = ThreadStatus::Blocked;
                    thread.waiting_on = Some(WaitTarget::Monitor(object_id));
                    if let Some(frame) = thread.top_frame_mut() {
                        frame.pc = ip;
                    }
                }
                format!(
                    "Blocked on monitor of obj@{} (held by thread {})",
                    object_id, holder
                )
            }
        }
    }

    pub(crate) fn exec_monitor_exit(&mut self) -> String {
        let value = self.pop_value();
        let Some(object_id) = value.object_id() else {
            return "MONITOREXIT on null; ignored".to_string();
        };
        let thread_id = self.state.active_thread;

        let holds = self
            .state
            .threads
            .get(thread_id)
            .is_some_and(|t| t.holds_monitor(object_id));
        if !holds {
            return format!("MONITOREXIT on obj@{} not held; ignored", object_id);
        }

        if let Some(thread) = self.state.threads.get_mut(thread_id) {
            thread.holding_monitors.retain(|&m| m != object_id);
        }
        self.state.release_monitor(object_id);
        format!("Released monitor of obj@{}", object_id)
    }

    pub(crate) fn exec_invoke(&mut self, instruction: &Instruction) -> String {
        let opcode = instruction.opcode;
        let (name, argc) = match instruction.operand(0) {
            Some(Operand::Method { name, argc }) => (name.clone(), *argc),
            _ => return "Malformed invoke".to_string(),
        };
        let owner = instruction.operands.iter().find_map(|op| match op {
            Operand::Class(class) => Some(class.clone()),
            _ => None,
        });

        // Pop arguments, preserving source order
        let mut args = Vec::with_capacity(argc);
        for _ in 0..argc {
            args.push(self.pop_value());
        }
        args.reverse();

        let receiver = if opcode == Opcode::InvokeStatic {
            None
        } else {
            Some(self.pop_value())
        };

        // Standard-library shims run before any user-defined lookup
        if let Some((value, description)) =
            self.invoke_stdlib(&name, receiver.as_ref(), &args, owner.as_deref())
        {
            if let Some(value) = value {
                self.push_value(value);
            }
            return description;
        }

        // User-defined dispatch, walking the superclass chain
        let dispatch_class = match (&receiver, opcode) {
            (_, Opcode::InvokeStatic) | (_, Opcode::InvokeSpecial) => {
                owner.clone().unwrap_or_default()
            }
            (Some(Value::Reference(id)), _) => self
                .state
                .heap
                .get(*id)
                .map(|o| o.class_name.clone())
                .unwrap_or_default(),
            (Some(Value::Str(_)), _) => "String".to_string(),
            _ => {
                return format!("Call to {}() on null/non-object; skipped", name);
            }
        };

        let resolved = self
            .program
            .resolve_method(&dispatch_class, &name, argc)
            .map(|(class, method)| (class.name.clone(), method.clone()));

        match resolved {
            Some((class_name, method)) if method.offset.is_some() => {
                let frame = self.build_frame(&class_name, &method, receiver, args);
                if let Some(thread) = self.state.current_thread_mut() {
                    thread.stack.push(frame);
                }
                format!("Invoking {}.{}", class_name, method.signature)
            }
            Some((class_name, method)) => {
                format!(
                    "{}.{} has no body; skipped",
                    class_name, method.signature
                )
            }
            None if name == "<init>" => {
                // Default constructor: nothing to run
                format!("Default constructor for {}", dispatch_class)
            }
            None => format!(
                "Method {}.{}/{} not found; skipped",
                dispatch_class, name, argc
            ),
        }
    }
}
