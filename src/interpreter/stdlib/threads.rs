//! Thread emulation
//!
//! `start` spawns a simulated [`ThreadState`] whose first frame enters the
//! receiver's `run()` (resolved by walking the superclass chain). `sleep`
//! converts milliseconds into scheduler steps (`max(1, round(ms/50))`) for
//! visual pacing; `join` parks the caller on the target thread's
//! termination; `wait`/`notify` park and wake on object monitors.

use crate::interpreter::engine::Simulator;
use crate::memory::thread::{ThreadState, ThreadStatus, WaitTarget};
use crate::memory::value::{ObjectId, Value};

use super::StdlibResult;

fn ok(value: Value, description: String) -> StdlibResult {
    Some((Some(value), description))
}

/// Milliseconds → scheduler steps
fn sleep_steps(ms: f64) -> usize {
    ((ms / 50.0).round() as i64).max(1) as usize
}

impl Simulator {
    pub(crate) fn thread_static(&mut self, method: &str, args: &[Value]) -> StdlibResult {
        match method {
            "sleep" => {
                let ms = args.first().and_then(Value::as_number).unwrap_or(0.0);
                let until = self.state.step_number + sleep_steps(ms);
                if let Some(thread) = self.state.current_thread_mut() {
                    thread.status = ThreadStatus::TimedWaiting;
                    thread.sleep_until_step = Some(until);
                }
                ok(
                    Value::Null,
                    format!("Thread.sleep({}) until step {}", ms, until),
                )
            }
            "currentThread" => {
                let index = self.state.active_thread;
                let existing = self.state.threads.get(index).and_then(|t| t.object_id);
                let id = match existing {
                    Some(id) => id,
                    None => {
                        let step = self.state.step_number;
                        let name = self
                            .state
                            .threads
                            .get(index)
                            .map(|t| t.name.clone())
                            .unwrap_or_else(|| "main".to_string());
                        let id = self.state.heap.alloc_object("Thread", step);
                        if let Some(obj) = self.state.heap.get_mut(id) {
                            obj.set_field("name", Value::Str(name));
                            obj.set_field("priority", Value::Int(5));
                            obj.set_field("daemon", Value::Boolean(false));
                        }
                        if let Some(thread) = self.state.threads.get_mut(index) {
                            thread.object_id = Some(id);
                        }
                        id
                    }
                };
                ok(Value::Reference(id), "Thread.currentThread".to_string())
            }
            "yield" => ok(Value::Null, "Thread.yield".to_string()),
            "interrupted" => {
                let was = self
                    .state
                    .current_thread()
                    .map(|t| t.interrupted)
                    .unwrap_or(false);
                if let Some(thread) = self.state.current_thread_mut() {
                    thread.interrupted = false;
                }
                ok(Value::Boolean(was), "Thread.interrupted".to_string())
            }
            "activeCount" => {
                let count = self
                    .state
                    .threads
                    .iter()
                    .filter(|t| t.status != ThreadStatus::Terminated)
                    .count();
                ok(Value::Int(count as i64), "Thread.activeCount".to_string())
            }
            _ => None,
        }
    }

    pub(crate) fn thread_instance_method(
        &mut self,
        id: ObjectId,
        class_name: &str,
        method: &str,
        args: &[Value],
    ) -> StdlibResult {
        match method {
            // Only the base class constructor is emulated; subclass
            // constructors run as user code
            "<init>" if class_name == "Thread" => {
                let mut name = format!("Thread-{}", self.state.threads.len());
                let mut runnable = None;
                for arg in args {
                    match arg {
                        Value::Str(s) => name = s.clone(),
                        Value::Lambda(_) | Value::Reference(_) => runnable = Some(arg.clone()),
                        _ => {}
                    }
                }
                if let Some(obj) = self.state.heap.get_mut(id) {
                    obj.set_field("name", Value::Str(name.clone()));
                    obj.set_field("priority", Value::Int(5));
                    obj.set_field("daemon", Value::Boolean(false));
                    obj.set_field("status", Value::Str("NEW".to_string()));
                    if let Some(runnable) = runnable {
                        obj.set_field("$runnable", runnable);
                    }
                }
                Some((None, format!("Created thread '{}'", name)))
            }

            "start" => {
                let thread_id = self.state.threads.len();
                let name = self
                    .state
                    .heap
                    .get(id)
                    .and_then(|o| o.field("name").cloned())
                    .map(|v| self.state.display_value(&v))
                    .filter(|s| !s.is_empty() && s != "null")
                    .unwrap_or_else(|| format!("Thread-{}", thread_id));

                let mut thread = ThreadState::new(thread_id, &name);
                thread.object_id = Some(id);

                let run = self
                    .program
                    .resolve_method(class_name, "run", 0)
                    .map(|(class, method)| (class.name.clone(), method.clone()));
                if let Some((run_class, run_method)) = run {
                    if run_method.offset.is_some() {
                        let frame = self.build_frame(
                            &run_class,
                            &run_method,
                            Some(Value::Reference(id)),
                            Vec::new(),
                        );
                        thread.stack.push(frame);
                    }
                }

                self.state.threads.push(thread);
                if let Some(obj) = self.state.heap.get_mut(id) {
                    obj.set_field("status", Value::Str("RUNNABLE".to_string()));
                }
                ok(
                    Value::Null,
                    format!("Started thread '{}' (#{})", name, thread_id),
                )
            }

            "join" => {
                let target = self.state.thread_by_object(id);
                match target {
                    Some(target)
                        if self.state.threads[target].status != ThreadStatus::Terminated =>
                    {
                        if let Some(current) = self.state.current_thread_mut() {
                            current.status = ThreadStatus::Waiting;
                            current.waiting_on = Some(WaitTarget::Thread(target));
                        }
                        ok(
                            Value::Null,
                            format!("Joining thread #{}; caller waits", target),
                        )
                    }
                    _ => ok(Value::Null, "join: target already terminated".to_string()),
                }
            }

            "getName" => {
                let name = self
                    .state
                    .heap
                    .get(id)
                    .and_then(|o| o.field("name").cloned())
                    .unwrap_or(Value::Null);
                ok(name, "thread.getName".to_string())
            }
            "setName" => {
                let name = args.first().cloned().unwrap_or(Value::Null);
                if let Some(obj) = self.state.heap.get_mut(id) {
                    obj.set_field("name", name);
                }
                ok(Value::Null, "thread.setName".to_string())
            }
            "getId" => {
                let tid = self.state.thread_by_object(id).unwrap_or(0);
                ok(Value::Long(tid as i64), "thread.getId".to_string())
            }
            "getState" => {
                let status = self
                    .state
                    .thread_by_object(id)
                    .map(|t| status_name(self.state.threads[t].status))
                    .unwrap_or("NEW");
                ok(Value::Str(status.to_string()), "thread.getState".to_string())
            }
            "isAlive" => {
                let alive = self
                    .state
                    .thread_by_object(id)
                    .is_some_and(|t| self.state.threads[t].status != ThreadStatus::Terminated);
                ok(Value::Boolean(alive), "thread.isAlive".to_string())
            }
            "setPriority" => {
                let priority = args.first().and_then(Value::as_int).unwrap_or(5);
                if let Some(obj) = self.state.heap.get_mut(id) {
                    obj.set_field("priority", Value::Int(priority));
                }
                if let Some(t) = self.state.thread_by_object(id) {
                    // Stored but not used for dispatch
                    self.state.threads[t].priority = priority;
                }
                ok(Value::Null, format!("thread.setPriority({})", priority))
            }
            "getPriority" => {
                let priority = self
                    .state
                    .heap
                    .get(id)
                    .and_then(|o| o.field("priority").cloned())
                    .unwrap_or(Value::Int(5));
                ok(priority, "thread.getPriority".to_string())
            }
            "setDaemon" => {
                let daemon = args.first().map(Value::is_truthy).unwrap_or(false);
                if let Some(obj) = self.state.heap.get_mut(id) {
                    obj.set_field("daemon", Value::Boolean(daemon));
                }
                if let Some(t) = self.state.thread_by_object(id) {
                    self.state.threads[t].is_daemon = daemon;
                }
                ok(Value::Null, format!("thread.setDaemon({})", daemon))
            }
            "isDaemon" => {
                let daemon = self
                    .state
                    .heap
                    .get(id)
                    .and_then(|o| o.field("daemon").cloned())
                    .unwrap_or(Value::Boolean(false));
                ok(daemon, "thread.isDaemon".to_string())
            }
            "interrupt" => {
                // Flag only; sleepers keep sleeping until their timer fires
                if let Some(t) = self.state.thread_by_object(id) {
                    self.state.threads[t].interrupted = true;
                }
                ok(Value::Null, "thread.interrupt".to_string())
            }
            "isInterrupted" => {
                let interrupted = self
                    .state
                    .thread_by_object(id)
                    .is_some_and(|t| self.state.threads[t].interrupted);
                ok(Value::Boolean(interrupted), "thread.isInterrupted".to_string())
            }

            // run() and anything else falls through to user dispatch
            _ => None,
        }
    }

    /// wait/notify/notifyAll, available on every object
    pub(crate) fn object_monitor_method(&mut self, id: ObjectId, method: &str) -> StdlibResult {
        match method {
            "wait" => {
                let thread_id = self.state.active_thread;
                let held = self
                    .state
                    .threads
                    .get(thread_id)
                    .is_some_and(|t| t.holds_monitor(id));
                if let Some(thread) = self.state.current_thread_mut() {
                    thread.status = ThreadStatus::Waiting;
                    thread.waiting_on = Some(WaitTarget::Monitor(id));
                }
                if held {
                    if let Some(thread) = self.state.threads.get_mut(thread_id) {
                        thread.holding_monitors.retain(|&m| m != id);
                    }
                    self.state.release_monitor(id);
                }
                ok(Value::Null, format!("wait() on obj@{}; monitor released", id))
            }
            "notify" | "notifyAll" => {
                let mut woken = 0usize;
                for thread in &mut self.state.threads {
                    if thread.status == ThreadStatus::Waiting
                        && thread.waiting_on == Some(WaitTarget::Monitor(id))
                    {
                        thread.status = ThreadStatus::Runnable;
                        thread.waiting_on = None;
                        woken += 1;
                        if method == "notify" {
                            break;
                        }
                    }
                }
                ok(
                    Value::Null,
                    format!("{}() on obj@{} woke {} thread(s)", method, id, woken),
                )
            }
            _ => None,
        }
    }
}

fn status_name(status: ThreadStatus) -> &'static str {
    match status {
        ThreadStatus::New => "NEW",
        ThreadStatus::Runnable => "RUNNABLE",
        ThreadStatus::Running => "RUNNING",
        ThreadStatus::Blocked => "BLOCKED",
        ThreadStatus::Waiting => "WAITING",
        ThreadStatus::TimedWaiting => "TIMED_WAITING",
        ThreadStatus::Terminated => "TERMINATED",
    }
}
