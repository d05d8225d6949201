//! Thread scheduling
//!
//! Round-robin with no quantum: each step executes exactly one instruction
//! of the active thread, then rotates to the next RUNNABLE/RUNNING thread.
//! Timer-based states wake when their target step is reached; join waiters
//! wake when their target thread terminates. Priority is stored but not
//! used for dispatch. All of this runs single-threaded in the host: every
//! mutation is serialised at the step boundary.

use crate::memory::thread::{ThreadStatus, WaitTarget};
use crate::memory::value::ObjectId;

use super::state::VmState;

impl VmState {
    /// Promote threads whose wake condition has been reached: sleep timers
    /// that expired, and join waiters whose target thread terminated or
    /// never existed.
    pub fn tick_threads(&mut self) {
        let step = self.step_number;
        let thread_gone: Vec<bool> = self
            .threads
            .iter()
            .map(|t| t.status == ThreadStatus::Terminated)
            .collect();

        for thread in &mut self.threads {
            match thread.status {
                ThreadStatus::TimedWaiting => {
                    if thread.sleep_until_step.is_some_and(|until| until <= step) {
                        thread.status = ThreadStatus::Runnable;
                        thread.sleep_until_step = None;
                        thread.waiting_on = None;
                    }
                }
                ThreadStatus::Waiting => {
                    if let Some(WaitTarget::Thread(target)) = thread.waiting_on {
                        let released = match thread_gone.get(target) {
                            Some(&terminated) => terminated,
                            None => true, // target never existed
                        };
                        if released {
                            thread.status = ThreadStatus::Runnable;
                            thread.waiting_on = None;
                        }
                    }
                }
                _ => {}
            }
        }
    }

    /// Ensure the active thread is schedulable, rotating round-robin if it
    /// is not. Returns the selected thread index, or None when no thread
    /// can run.
    pub fn select_executable_thread(&mut self) -> Option<usize> {
        if self.threads.is_empty() {
            return None;
        }
        if self
            .current_thread()
            .is_some_and(|thread| thread.is_schedulable())
        {
            return Some(self.active_thread);
        }
        let count = self.threads.len();
        for offset in 1..=count {
            let candidate = (self.active_thread + offset) % count;
            if self.threads[candidate].is_schedulable() {
                self.active_thread = candidate;
                return Some(candidate);
            }
        }
        None
    }

    /// Move to the next RUNNABLE/RUNNING thread after a step completes
    pub fn rotate_active_thread(&mut self) {
        let count = self.threads.len();
        if count == 0 {
            return;
        }
        for offset in 1..=count {
            let candidate = (self.active_thread + offset) % count;
            if self.threads[candidate].is_schedulable() {
                self.active_thread = candidate;
                return;
            }
        }
    }

    pub fn all_threads_terminated(&self) -> bool {
        self.threads
            .iter()
            .all(|t| t.status == ThreadStatus::Terminated)
    }

    /// Release one monitor and wake exactly one thread blocked on it
    pub fn release_monitor(&mut self, object_id: ObjectId) {
        self.monitors.insert(object_id, None);
        if let Some(waiter) = self.threads.iter_mut().find(|t| {
            t.status == ThreadStatus::Blocked
                && t.waiting_on == Some(WaitTarget::Monitor(object_id))
        }) {
            waiter.status = ThreadStatus::Runnable;
            waiter.waiting_on = None;
        }
    }

    /// Terminate a thread, releasing every monitor it still holds
    pub fn terminate_thread(&mut self, index: usize) {
        let held: Vec<ObjectId> = match self.threads.get_mut(index) {
            Some(thread) => {
                thread.status = ThreadStatus::Terminated;
                thread.waiting_on = None;
                std::mem::take(&mut thread.holding_monitors)
            }
            None => return,
        };
        for object_id in held {
            self.release_monitor(object_id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::thread::ThreadState;

    fn state_with_threads(statuses: &[ThreadStatus]) -> VmState {
        let mut state = VmState::new();
        for (i, &status) in statuses.iter().enumerate() {
            let mut t = ThreadState::new(i, &format!("t{}", i));
            t.status = status;
            state.threads.push(t);
        }
        state
    }

    #[test]
    fn test_round_robin_rotation() {
        let mut state = state_with_threads(&[
            ThreadStatus::Runnable,
            ThreadStatus::Blocked,
            ThreadStatus::Runnable,
        ]);
        assert_eq!(state.select_executable_thread(), Some(0));
        state.rotate_active_thread();
        assert_eq!(state.active_thread, 2);
        state.rotate_active_thread();
        assert_eq!(state.active_thread, 0);
    }

    #[test]
    fn test_sleep_timer_wakes() {
        let mut state = state_with_threads(&[ThreadStatus::TimedWaiting]);
        state.threads[0].sleep_until_step = Some(5);
        state.step_number = 4;
        state.tick_threads();
        assert_eq!(state.threads[0].status, ThreadStatus::TimedWaiting);
        state.step_number = 5;
        state.tick_threads();
        assert_eq!(state.threads[0].status, ThreadStatus::Runnable);
        assert!(state.threads[0].sleep_until_step.is_none());
    }

    #[test]
    fn test_join_released_on_termination() {
        let mut state =
            state_with_threads(&[ThreadStatus::Waiting, ThreadStatus::Terminated]);
        state.threads[0].waiting_on = Some(WaitTarget::Thread(1));
        state.tick_threads();
        assert_eq!(state.threads[0].status, ThreadStatus::Runnable);
    }

    #[test]
    fn test_join_on_missing_thread_releases() {
        let mut state = state_with_threads(&[ThreadStatus::Waiting]);
        state.threads[0].waiting_on = Some(WaitTarget::Thread(9));
        state.tick_threads();
        assert_eq!(state.threads[0].status, ThreadStatus::Runnable);
    }

    #[test]
    fn test_monitor_release_wakes_one_waiter() {
        let mut state = state_with_threads(&[
            ThreadStatus::Runnable,
            ThreadStatus::Blocked,
            ThreadStatus::Blocked,
        ]);
        state.threads[1].waiting_on = Some(WaitTarget::Monitor(7));
        state.threads[2].waiting_on = Some(WaitTarget::Monitor(7));
        state.monitors.insert(7, Some(0));

        state.release_monitor(7);
        assert_eq!(state.monitors[&7], None);
        // Waking order is array order: exactly one waiter promoted
        assert_eq!(state.threads[1].status, ThreadStatus::Runnable);
        assert_eq!(state.threads[2].status, ThreadStatus::Blocked);
    }

    #[test]
    fn test_terminate_releases_held_monitors() {
        let mut state = state_with_threads(&[ThreadStatus::Running, ThreadStatus::Blocked]);
        state.threads[0].holding_monitors = vec![3];
        state.threads[1].waiting_on = Some(WaitTarget::Monitor(3));
        state.monitors.insert(3, Some(0));

        state.terminate_thread(0);
        assert_eq!(state.threads[0].status, ThreadStatus::Terminated);
        assert!(state.threads[0].holding_monitors.is_empty());
        assert_eq!(state.monitors[&3], None);
        assert_eq!(state.threads[1].status, ThreadStatus::Runnable);
    }
}
