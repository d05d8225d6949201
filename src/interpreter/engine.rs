//! Execution engine
//!
//! The [`Simulator`] owns the compiled program and a single [`VmState`],
//! advancing it one instruction per `step()`. A deep snapshot is pushed
//! onto the history ring before every effective step, which is what makes
//! `step_back()` possible. Uncaught JVM exceptions never unwind the host:
//! they set `state.error` and flip the status to [`VmStatus::Error`],
//! after which `step()` is a no-op.

use crate::compiler::{CompiledMethod, CompiledProgram, Opcode};
use crate::memory::frame::StackFrame;
use crate::memory::method_area::{ClassInfo, FieldInfo, MethodInfo};
use crate::memory::thread::{ThreadState, ThreadStatus};
use crate::memory::value::Value;
use crate::snapshot::{ExecutionResult, History, DEFAULT_HISTORY_CAPACITY};

use super::state::{VmState, VmStatus};

/// Driver-level safety cap: `run()` never executes more steps than this
pub const MAX_RUN_STEPS: usize = 50_000;

/// The stepping JVM simulator
pub struct Simulator {
    pub(crate) program: CompiledProgram,
    pub(crate) state: VmState,
    history: History,
    is_running: bool,
    pub(crate) next_frame_id: usize,
}

impl Simulator {
    pub fn new(program: CompiledProgram) -> Self {
        let mut simulator = Simulator {
            program,
            state: VmState::new(),
            history: History::new(DEFAULT_HISTORY_CAPACITY),
            is_running: false,
            next_frame_id: 0,
        };
        simulator.initialise();
        simulator
    }

    /// Load classes, seed statics, and create the main thread
    fn initialise(&mut self) {
        self.state = VmState::new();
        self.next_frame_id = 0;

        for class in &self.program.classes {
            self.state.method_area.loaded_classes.insert(
                class.name.clone(),
                ClassInfo {
                    name: class.name.clone(),
                    super_class: class.super_class.clone(),
                    interfaces: class.interfaces.clone(),
                    fields: class
                        .fields
                        .iter()
                        .map(|f| FieldInfo {
                            name: f.name.clone(),
                            field_type: f.field_type.clone(),
                            is_static: f.is_static,
                        })
                        .collect(),
                    methods: class
                        .methods
                        .iter()
                        .map(|m| MethodInfo {
                            name: m.name.clone(),
                            signature: m.signature.clone(),
                            is_static: m.is_static,
                        })
                        .collect(),
                    is_interface: class.is_interface,
                    is_abstract: class.is_abstract,
                    loaded_at_step: 0,
                },
            );

            for field in class.fields.iter().filter(|f| f.is_static) {
                let value = field
                    .constant
                    .clone()
                    .unwrap_or_else(|| Value::default_for(base_type(&field.field_type)));
                self.state
                    .method_area
                    .set_static(&class.name, &field.name, value);
            }
        }

        // Main thread with an empty String[] for args
        let mut main_thread = ThreadState::new(0, "main");
        let main_class = self.program.main_class.clone();
        let main_method = self.program.main_method.clone();
        if let Some((class, method)) = self.program.resolve_method(&main_class, &main_method, 1) {
            let class_name = class.name.clone();
            let method = method.clone();
            let args_id = self.state.heap.alloc_array("String", Vec::new(), 0);
            let args = Value::Array {
                id: args_id,
                element_type: "String".to_string(),
            };
            let frame = self.build_frame(&class_name, &method, None, vec![args]);
            main_thread.stack.push(frame);
        }
        self.state.threads.push(main_thread);
        self.state.status = VmStatus::Paused;
    }

    /// Construct an activation record for a resolved method
    pub(crate) fn build_frame(
        &mut self,
        class_name: &str,
        method: &CompiledMethod,
        this: Option<Value>,
        args: Vec<Value>,
    ) -> StackFrame {
        let id = self.next_frame_id;
        self.next_frame_id += 1;
        let offset = method.offset.unwrap_or(0);
        let mut frame = StackFrame::new(id, class_name, &method.name, &method.signature, offset);

        let mut slot = 0;
        if !method.is_static {
            frame.store_local(0, "this", this.unwrap_or(Value::Null));
            slot = 1;
        }
        for (param, value) in method.params.iter().zip(args) {
            frame.store_local(slot, &param.name, value);
            slot += 1;
        }
        frame
    }

    /// Advance one instruction of the active thread per the step algorithm
    pub fn step(&mut self) -> ExecutionResult {
        // 1. Terminal states are sticky no-ops
        if matches!(self.state.status, VmStatus::Completed | VmStatus::Error) {
            return ExecutionResult {
                state: self.state.clone(),
                instruction: None,
                description: "Execution has finished".to_string(),
            };
        }

        // 2. Snapshot before mutating anything
        self.history.push(self.state.clone());

        // 3. Wake sleepers and released join waiters
        self.state.tick_threads();

        // 4. Select an executable thread
        let Some(thread_index) = self.state.select_executable_thread() else {
            if self.state.all_threads_terminated() || self.state.threads.is_empty() {
                self.state.status = VmStatus::Completed;
                return ExecutionResult {
                    state: self.state.clone(),
                    instruction: None,
                    description: "All threads terminated; execution complete".to_string(),
                };
            }
            // Let sleep timers make progress
            self.state.step_number += 1;
            return ExecutionResult {
                state: self.state.clone(),
                instruction: None,
                description: "All threads waiting".to_string(),
            };
        };

        // 5. Run the selected thread
        self.state.threads[thread_index].status = ThreadStatus::Running;
        let Some(frame) = self.state.threads[thread_index].top_frame() else {
            self.state.terminate_thread(thread_index);
            self.state.rotate_active_thread();
            return ExecutionResult {
                state: self.state.clone(),
                instruction: None,
                description: format!(
                    "Thread '{}' has no frames; terminated",
                    self.state.threads[thread_index].name
                ),
            };
        };

        // 6. Fetch and dispatch
        let ip = frame.pc;
        let instruction = match self.program.instructions.get(ip) {
            Some(instruction) => instruction.clone(),
            None => {
                // Past the end: the frame is done
                self.state.threads[thread_index].stack.pop();
                let description = "Method end reached; frame popped".to_string();
                self.finish_step(thread_index);
                return ExecutionResult {
                    state: self.state.clone(),
                    instruction: None,
                    description,
                };
            }
        };
        let description = self.execute_instruction(&instruction, ip);

        // 7–8. Bookkeeping, rotation, display pc
        self.finish_step(thread_index);

        // 9. Report
        ExecutionResult {
            state: self.state.clone(),
            instruction: Some(instruction),
            description,
        }
    }

    fn finish_step(&mut self, thread_index: usize) {
        self.state.step_number += 1;
        if let Some(thread) = self.state.threads.get_mut(thread_index) {
            thread.step_count += 1;
            if thread.stack.is_empty() {
                self.state.terminate_thread(thread_index);
            } else if thread.status == ThreadStatus::Running {
                thread.status = ThreadStatus::Runnable;
            }
        }
        self.state.rotate_active_thread();
        self.state.pc = self
            .state
            .current_thread()
            .and_then(|t| t.top_frame())
            .map(|f| f.pc)
            .unwrap_or(0);
    }

    /// Restore the most recent snapshot
    pub fn step_back(&mut self) -> ExecutionResult {
        match self.history.pop() {
            Some(snapshot) => {
                self.state = snapshot;
                ExecutionResult {
                    state: self.state.clone(),
                    instruction: None,
                    description: "Stepped back".to_string(),
                }
            }
            None => ExecutionResult {
                state: self.state.clone(),
                instruction: None,
                description: "No history to step back to".to_string(),
            },
        }
    }

    /// Reinitialise the machine and clear the history
    pub fn reset(&mut self) {
        self.history.clear();
        self.is_running = false;
        self.initialise();
    }

    /// Drive `step()` until completion, pause, or the safety cap
    pub fn run(&mut self) {
        self.is_running = true;
        if self.state.status == VmStatus::Paused {
            self.state.status = VmStatus::Running;
        }
        let mut steps = 0usize;
        while self.is_running && self.can_step_forward() && steps < MAX_RUN_STEPS {
            self.step();
            steps += 1;
        }
        self.is_running = false;
        if self.state.status == VmStatus::Running {
            self.state.status = VmStatus::Paused;
        }
    }

    pub fn pause(&mut self) {
        self.is_running = false;
        if self.state.status == VmStatus::Running {
            self.state.status = VmStatus::Paused;
        }
    }

    pub fn can_step_forward(&self) -> bool {
        !matches!(self.state.status, VmStatus::Completed | VmStatus::Error)
    }

    pub fn can_step_back(&self) -> bool {
        !self.history.is_empty()
    }

    /// Deep clone of the current state
    pub fn get_state(&self) -> VmState {
        self.state.clone()
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    pub fn program(&self) -> &CompiledProgram {
        &self.program
    }

    // ===== Operand stack helpers shared by the opcode handlers =====

    pub(crate) fn top_frame_mut(&mut self) -> Option<&mut StackFrame> {
        self.state.current_thread_mut().and_then(|t| t.top_frame_mut())
    }

    pub(crate) fn pop_value(&mut self) -> Value {
        self.top_frame_mut().map(|f| f.pop()).unwrap_or(Value::Null)
    }

    pub(crate) fn push_value(&mut self, value: Value) {
        if let Some(frame) = self.top_frame_mut() {
            frame.push(value);
        }
    }

    /// Is this instruction at `ip` a LINE marker? Used by drivers that step
    /// by source line.
    pub fn is_line_marker(&self, ip: usize) -> bool {
        self.program
            .instructions
            .get(ip)
            .is_some_and(|i| i.opcode == Opcode::Line)
    }
}

/// Strip array suffixes from a declared type for default-value selection
fn base_type(type_name: &str) -> &str {
    type_name.split('[').next().unwrap_or(type_name)
}
