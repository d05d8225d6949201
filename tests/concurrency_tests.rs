// Scheduler and monitor tests: thread spawning, sleep timers, join, and
// monitor acquisition/blocking via hand-assembled programs

use javelin::compiler::{
    CompiledClass, CompiledMethod, CompiledParam, CompiledProgram, Instruction, Opcode, Operand,
};
use javelin::interpreter::engine::Simulator;
use javelin::interpreter::state::{VmState, VmStatus};
use javelin::memory::thread::ThreadStatus;
use rustc_hash::FxHashMap;

fn run_collecting(source: &str) -> (Simulator, Vec<VmState>) {
    let program = javelin::compile(source).expect("compilation failed");
    let mut simulator = Simulator::new(program);
    let mut snapshots = Vec::new();
    let mut steps = 0;
    while simulator.can_step_forward() && steps < 50_000 {
        snapshots.push(simulator.step().state);
        steps += 1;
    }
    (simulator, snapshots)
}

/// Monitor table and per-thread holding lists must agree in both directions
fn assert_monitor_consistency(snapshot: &VmState) {
    for (&object_id, holder) in &snapshot.monitors {
        if let Some(thread_id) = holder {
            assert!(
                snapshot.threads[*thread_id].holding_monitors.contains(&object_id),
                "thread {} recorded as holder of obj@{} but does not list it",
                thread_id,
                object_id
            );
        }
    }
    for thread in &snapshot.threads {
        for &object_id in &thread.holding_monitors {
            assert_eq!(
                snapshot.monitors.get(&object_id),
                Some(&Some(thread.id)),
                "thread {} lists obj@{} but the monitor table disagrees",
                thread.id,
                object_id
            );
        }
    }
}

#[test]
fn test_two_workers_fill_shared_list() {
    let source = r#"
        class Worker extends Thread {
            ArrayList list;

            Worker(ArrayList list) {
                this.list = list;
            }

            public void run() {
                for (int i = 0; i < 3; i++) {
                    synchronized (list) {
                        list.add(i);
                    }
                }
            }
        }

        public class MonitorDemo {
            public static void main(String[] args) {
                ArrayList list = new ArrayList();
                Worker a = new Worker(list);
                Worker b = new Worker(list);
                a.start();
                b.start();
                a.join();
                b.join();
                System.out.println(list.size());
            }
        }
    "#;
    let (simulator, snapshots) = run_collecting(source);
    let state = simulator.get_state();

    assert_eq!(state.status, VmStatus::Completed);
    assert_eq!(state.output.lines[0], "6");
    assert_eq!(state.threads.len(), 3);
    assert!(state
        .threads
        .iter()
        .all(|t| t.status == ThreadStatus::Terminated));

    // The shared monitor may never report two holders; the table maps each
    // object to at most one thread, and the holder lists must agree
    for snapshot in &snapshots {
        assert_monitor_consistency(snapshot);
    }

    // The caller parked on join at some point
    assert!(snapshots.iter().any(|s| {
        s.threads[0].status == ThreadStatus::Waiting
    }));
}

#[test]
fn test_sleep_converts_to_timed_waiting() {
    let source = r#"
        public class Sleeper {
            public static void main(String[] args) {
                System.out.println("before");
                Thread.sleep(200);
                System.out.println("after");
            }
        }
    "#;
    let (simulator, snapshots) = run_collecting(source);

    assert_eq!(
        simulator.get_state().output.lines,
        vec!["before", "after", ""]
    );
    // 200ms converts to 4 scheduler steps of TIMED_WAITING
    let timed = snapshots
        .iter()
        .filter(|s| s.threads[0].status == ThreadStatus::TimedWaiting)
        .count();
    assert!(timed >= 3, "only {} TIMED_WAITING snapshots", timed);
    assert_eq!(simulator.get_state().status, VmStatus::Completed);
}

#[test]
fn test_round_robin_interleaves_two_threads() {
    let source = r#"
        class Ticker extends Thread {
            public void run() {
                for (int i = 0; i < 5; i++) {
                    int x = i;
                }
            }
        }

        public class Interleave {
            public static void main(String[] args) {
                Ticker a = new Ticker();
                Ticker b = new Ticker();
                a.start();
                b.start();
                a.join();
                b.join();
            }
        }
    "#;
    let (simulator, snapshots) = run_collecting(source);
    assert_eq!(simulator.get_state().status, VmStatus::Completed);

    // Both spawned threads accumulated steps: strict round-robin shares the
    // schedule instead of running one thread to completion first
    let final_state = simulator.get_state();
    assert_eq!(final_state.threads.len(), 3);
    assert!(final_state.threads[1].step_count > 0);
    assert!(final_state.threads[2].step_count > 0);

    // While both workers were alive, the active thread alternated
    let mut switches = 0;
    let mut last_active = None;
    for snapshot in &snapshots {
        if snapshot.threads.len() == 3 {
            if last_active.is_some() && last_active != Some(snapshot.active_thread) {
                switches += 1;
            }
            last_active = Some(snapshot.active_thread);
        }
    }
    assert!(switches > 2, "only {} active-thread switches", switches);
}

// ===== Hand-assembled monitor programs =====

fn instruction(opcode: Opcode, operands: Vec<Operand>) -> Instruction {
    Instruction::new(opcode, operands, 1)
}

fn method(
    name: &str,
    signature: &str,
    params: Vec<CompiledParam>,
    is_static: bool,
    offset: usize,
    code_len: usize,
) -> CompiledMethod {
    CompiledMethod {
        name: name.to_string(),
        signature: signature.to_string(),
        params,
        return_type: "void".to_string(),
        is_static,
        is_constructor: false,
        offset: Some(offset),
        code_len,
        max_locals: 2,
    }
}

fn lock_field() -> Operand {
    Operand::Field {
        name: "lock".to_string(),
        owner: "Main".to_string(),
    }
}

/// Main acquires a monitor, spawns a worker that contends for it, then
/// releases; the worker must block without consuming its MONITORENTER and
/// acquire after the release.
fn contention_program() -> CompiledProgram {
    let instructions = vec![
        // Main.main
        instruction(Opcode::New, vec![Operand::Class("Object".to_string())]), // 0
        instruction(Opcode::Dup, vec![]),                                     // 1
        instruction(Opcode::PutStatic, vec![lock_field()]),                   // 2
        instruction(Opcode::MonitorEnter, vec![]),                            // 3
        instruction(Opcode::New, vec![Operand::Class("Worker".to_string())]), // 4
        instruction(Opcode::Dup, vec![]),                                     // 5
        instruction(
            Opcode::InvokeSpecial,
            vec![
                Operand::Method {
                    name: "<init>".to_string(),
                    argc: 0,
                },
                Operand::Class("Worker".to_string()),
            ],
        ), // 6
        instruction(
            Opcode::InvokeVirtual,
            vec![Operand::Method {
                name: "start".to_string(),
                argc: 0,
            }],
        ), // 7
        instruction(Opcode::Pop, vec![]),                                     // 8
        instruction(Opcode::GetStatic, vec![lock_field()]),                   // 9
        instruction(Opcode::MonitorExit, vec![]),                             // 10
        instruction(Opcode::Return, vec![]),                                  // 11
        // Worker.run
        instruction(Opcode::GetStatic, vec![lock_field()]),                   // 12
        instruction(Opcode::MonitorEnter, vec![]),                            // 13
        instruction(Opcode::GetStatic, vec![lock_field()]),                   // 14
        instruction(Opcode::MonitorExit, vec![]),                             // 15
        instruction(Opcode::Return, vec![]),                                  // 16
    ];

    let main_class = CompiledClass {
        name: "Main".to_string(),
        super_class: None,
        interfaces: Vec::new(),
        fields: Vec::new(),
        methods: vec![method(
            "main",
            "main(String[])",
            vec![CompiledParam {
                name: "args".to_string(),
                param_type: "String[]".to_string(),
            }],
            true,
            0,
            12,
        )],
        is_interface: false,
        is_abstract: false,
    };
    let worker_class = CompiledClass {
        name: "Worker".to_string(),
        super_class: Some("Thread".to_string()),
        interfaces: Vec::new(),
        fields: Vec::new(),
        methods: vec![method("run", "run()", Vec::new(), false, 12, 5)],
        is_interface: false,
        is_abstract: false,
    };

    let mut method_offsets = FxHashMap::default();
    method_offsets.insert("Main.main(String[])".to_string(), 0);
    method_offsets.insert("Worker.run()".to_string(), 12);

    CompiledProgram {
        classes: vec![main_class, worker_class],
        main_class: "Main".to_string(),
        main_method: "main".to_string(),
        instructions,
        method_offsets,
    }
}

#[test]
fn test_contended_monitor_blocks_then_acquires() {
    let mut simulator = Simulator::new(contention_program());
    let mut snapshots = Vec::new();
    let mut steps = 0;
    while simulator.can_step_forward() && steps < 1_000 {
        snapshots.push(simulator.step().state);
        steps += 1;
    }

    assert_eq!(simulator.get_state().status, VmStatus::Completed);

    // The worker observed the held monitor and blocked on it
    let blocked = snapshots.iter().any(|s| {
        s.threads.len() == 2
            && s.threads[1].status == ThreadStatus::Blocked
            && s.monitors.values().any(|h| *h == Some(0))
    });
    assert!(blocked, "worker never blocked on the contended monitor");

    // After main released, the worker held the monitor itself
    let reacquired = snapshots
        .iter()
        .any(|s| s.threads.len() == 2 && s.monitors.values().any(|h| *h == Some(1)));
    assert!(reacquired, "worker never acquired the monitor");

    // A blocked MONITORENTER must not consume the instruction: the blocked
    // worker's pc still points at the MONITORENTER
    for snapshot in &snapshots {
        if snapshot.threads.len() == 2 && snapshot.threads[1].status == ThreadStatus::Blocked {
            assert_eq!(snapshot.threads[1].stack.last().unwrap().pc, 13);
        }
        assert_monitor_consistency(snapshot);
    }
}

/// Reentrant entry is tracked by membership; exit releases unconditionally
fn reentrant_program() -> CompiledProgram {
    let instructions = vec![
        instruction(Opcode::New, vec![Operand::Class("Object".to_string())]), // 0
        instruction(Opcode::Dup, vec![]),                                     // 1
        instruction(Opcode::Dup, vec![]),                                     // 2
        instruction(Opcode::MonitorEnter, vec![]),                            // 3
        instruction(Opcode::MonitorEnter, vec![]),                            // 4 (reentrant)
        instruction(Opcode::MonitorExit, vec![]),                             // 5
        instruction(Opcode::Return, vec![]),                                  // 6
    ];

    let main_class = CompiledClass {
        name: "Main".to_string(),
        super_class: None,
        interfaces: Vec::new(),
        fields: Vec::new(),
        methods: vec![method(
            "main",
            "main(String[])",
            vec![CompiledParam {
                name: "args".to_string(),
                param_type: "String[]".to_string(),
            }],
            true,
            0,
            7,
        )],
        is_interface: false,
        is_abstract: false,
    };

    let mut method_offsets = FxHashMap::default();
    method_offsets.insert("Main.main(String[])".to_string(), 0);

    CompiledProgram {
        classes: vec![main_class],
        main_class: "Main".to_string(),
        main_method: "main".to_string(),
        instructions,
        method_offsets,
    }
}

#[test]
fn test_monitor_reentry_and_unconditional_release() {
    let mut simulator = Simulator::new(reentrant_program());
    let mut snapshots = Vec::new();
    while simulator.can_step_forward() && snapshots.len() < 100 {
        snapshots.push(simulator.step().state);
    }

    // After the reentrant MONITORENTER the thread still holds exactly one
    // membership entry
    let held = snapshots
        .iter()
        .find(|s| s.monitors.values().any(|h| *h == Some(0)))
        .expect("monitor never acquired");
    assert_eq!(held.threads[0].holding_monitors.len(), 1);

    // A single MONITOREXIT releases despite two entries (membership, not a
    // recursion count)
    let released = snapshots
        .iter()
        .any(|s| s.monitors.values().any(|h| h.is_none()));
    assert!(released, "monitor never released");
    assert_eq!(simulator.get_state().status, VmStatus::Completed);
}

#[test]
fn test_scheduler_never_stalls_host_while_sleeping() {
    let source = r#"
        public class OnlySleep {
            public static void main(String[] args) {
                Thread.sleep(500);
            }
        }
    "#;
    let (simulator, snapshots) = run_collecting(source);

    // While the only thread slept, the scheduler kept advancing the step
    // counter instead of deadlocking
    assert_eq!(simulator.get_state().status, VmStatus::Completed);
    let waiting_steps = snapshots
        .iter()
        .filter(|s| s.threads.iter().all(|t| !matches!(t.status, ThreadStatus::Runnable | ThreadStatus::Running)))
        .count();
    assert!(waiting_steps >= 5, "expected waiting steps, got {}", waiting_steps);
}
