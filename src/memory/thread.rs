//! Simulated thread state
//!
//! Threads follow the Java thread lifecycle states; at most one
//! thread is RUNNING at any inter-step observation point, and a thread in
//! BLOCKED/WAITING records what it waits for in [`WaitTarget`].

use super::frame::StackFrame;
use super::value::ObjectId;

/// Index into the VM's thread table
pub type ThreadId = usize;

/// Thread lifecycle states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThreadStatus {
    New,
    Runnable,
    Running,
    Blocked,
    Waiting,
    TimedWaiting,
    Terminated,
}

/// What a BLOCKED or WAITING thread is parked on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitTarget {
    /// An object monitor (`MONITORENTER` contention or `wait()`)
    Monitor(ObjectId),
    /// Another thread's termination (`join()`)
    Thread(ThreadId),
}

/// One simulated thread
#[derive(Debug, Clone, PartialEq)]
pub struct ThreadState {
    pub id: ThreadId,
    pub name: String,
    pub stack: Vec<StackFrame>,
    pub status: ThreadStatus,
    /// Step number at which a TIMED_WAITING thread wakes
    pub sleep_until_step: Option<usize>,
    pub waiting_on: Option<WaitTarget>,
    pub holding_monitors: Vec<ObjectId>,
    /// Heap object backing this thread (for Thread subclass instances)
    pub object_id: Option<ObjectId>,
    pub priority: i64,
    pub is_daemon: bool,
    pub step_count: usize,
    pub interrupted: bool,
}

impl ThreadState {
    pub fn new(id: ThreadId, name: &str) -> Self {
        ThreadState {
            id,
            name: name.to_string(),
            stack: Vec::new(),
            status: ThreadStatus::Runnable,
            sleep_until_step: None,
            waiting_on: None,
            holding_monitors: Vec::new(),
            object_id: None,
            priority: 5,
            is_daemon: false,
            step_count: 0,
            interrupted: false,
        }
    }

    /// Whether the scheduler may pick this thread
    pub fn is_schedulable(&self) -> bool {
        matches!(self.status, ThreadStatus::Runnable | ThreadStatus::Running)
    }

    pub fn top_frame(&self) -> Option<&StackFrame> {
        self.stack.last()
    }

    pub fn top_frame_mut(&mut self) -> Option<&mut StackFrame> {
        self.stack.last_mut()
    }

    /// Whether this thread still holds the given monitor
    pub fn holds_monitor(&self, id: ObjectId) -> bool {
        self.holding_monitors.contains(&id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schedulable_states() {
        let mut t = ThreadState::new(0, "main");
        assert!(t.is_schedulable());
        t.status = ThreadStatus::Blocked;
        assert!(!t.is_schedulable());
        t.status = ThreadStatus::Running;
        assert!(t.is_schedulable());
        t.status = ThreadStatus::Terminated;
        assert!(!t.is_schedulable());
    }
}
