// End-to-end tests: compile Java source, run the simulator, and check the
// observable state

use javelin::interpreter::engine::Simulator;
use javelin::interpreter::state::{VmState, VmStatus};
use javelin::memory::thread::ThreadStatus;

/// Compile and wrap a source string, panicking on compile errors
fn simulator_for(source: &str) -> Simulator {
    let program = javelin::compile(source).expect("compilation failed");
    Simulator::new(program)
}

/// Run to completion, collecting a snapshot after every step
fn run_collecting(source: &str) -> (Simulator, Vec<VmState>) {
    let mut simulator = simulator_for(source);
    let mut snapshots = Vec::new();
    let mut steps = 0;
    while simulator.can_step_forward() && steps < 50_000 {
        let result = simulator.step();
        snapshots.push(result.state);
        steps += 1;
    }
    (simulator, snapshots)
}

fn output_of(simulator: &Simulator) -> Vec<String> {
    simulator.get_state().output.lines.clone()
}

#[test]
fn test_hello_world() {
    let source = r#"
        public class HelloWorld {
            public static void main(String[] args) {
                System.out.println("Hello, World!");
            }
        }
    "#;
    let (simulator, _) = run_collecting(source);
    let state = simulator.get_state();

    assert_eq!(state.output.lines, vec!["Hello, World!", ""]);
    assert_eq!(state.status, VmStatus::Completed);
    assert_eq!(state.threads.len(), 1);
    assert_eq!(state.threads[0].status, ThreadStatus::Terminated);
}

#[test]
fn test_arithmetic() {
    let source = r#"
        public class Arithmetic {
            public static void main(String[] args) {
                int a = 10, b = 5;
                System.out.println(a + b);
                System.out.println(a - b);
                System.out.println(a * b);
                System.out.println(a / b);
            }
        }
    "#;
    let (simulator, _) = run_collecting(source);
    assert_eq!(output_of(&simulator), vec!["15", "5", "50", "2", ""]);
}

#[test]
fn test_recursive_factorial() {
    let source = r#"
        public class Factorial {
            public static void main(String[] args) {
                System.out.println(factorial(5));
            }

            static int factorial(int n) {
                if (n <= 1) {
                    return 1;
                }
                return n * factorial(n - 1);
            }
        }
    "#;
    let (simulator, snapshots) = run_collecting(source);

    assert_eq!(output_of(&simulator)[0], "120");
    assert_eq!(simulator.get_state().status, VmStatus::Completed);

    // main + 5 recursive activations at the deepest point
    let max_depth = snapshots
        .iter()
        .map(|s| s.threads[0].stack.len())
        .max()
        .unwrap_or(0);
    assert!(max_depth >= 6, "max stack depth was {}", max_depth);

    // The stack drains back before the thread terminates
    assert!(snapshots
        .iter()
        .rev()
        .any(|s| s.threads[0].stack.len() == 1));
    assert!(simulator.get_state().threads[0].stack.is_empty());
}

#[test]
fn test_for_loop_sum() {
    let source = r#"
        public class LoopSum {
            public static void main(String[] args) {
                int sum = 0;
                for (int i = 1; i <= 5; i++) {
                    System.out.println(i);
                    sum += i;
                }
                System.out.println(sum);
            }
        }
    "#;
    let (simulator, _) = run_collecting(source);
    assert_eq!(
        output_of(&simulator),
        vec!["1", "2", "3", "4", "5", "15", ""]
    );
}

#[test]
fn test_binary_tree_preorder_dfs() {
    let source = r#"
        class Node {
            int value;
            Node left, right;

            Node(int value) {
                this.value = value;
            }
        }

        public class Tree {
            public static void main(String[] args) {
                Node root = new Node(1);
                root.left = new Node(2);
                root.right = new Node(3);
                root.left.left = new Node(4);
                root.left.right = new Node(5);
                root.right.right = new Node(6);
                System.out.println("DFS Preorder:");
                preorder(root);
            }

            static void preorder(Node node) {
                if (node == null) {
                    return;
                }
                System.out.println(node.value);
                preorder(node.left);
                preorder(node.right);
            }
        }
    "#;
    let (simulator, _) = run_collecting(source);
    assert_eq!(
        output_of(&simulator),
        vec!["DFS Preorder:", "1", "2", "4", "5", "3", "6", ""]
    );
}

#[test]
fn test_step_number_strictly_increases() {
    let source = r#"
        public class Count {
            public static void main(String[] args) {
                int x = 1 + 2;
            }
        }
    "#;
    let mut simulator = simulator_for(source);
    let mut previous = simulator.get_state().step_number;
    while simulator.can_step_forward() {
        let before_history = simulator.history_len();
        let result = simulator.step();
        if result.state.status == VmStatus::Completed && result.instruction.is_none() {
            break;
        }
        assert_eq!(result.state.step_number, previous + 1);
        assert_eq!(simulator.history_len(), before_history + 1);
        previous = result.state.step_number;
    }
}

#[test]
fn test_step_back_restores_exact_state() {
    let source = r#"
        public class Back {
            public static void main(String[] args) {
                int a = 1;
                int b = a + 2;
                System.out.println(b);
            }
        }
    "#;
    let mut simulator = simulator_for(source);

    // At several depths: the snapshot restored by step_back must equal the
    // pre-step state field for field
    for _ in 0..4 {
        let before = simulator.get_state();
        simulator.step();
        let restored = simulator.step_back().state;
        assert_eq!(before, restored);
        assert_eq!(simulator.get_state(), before);
        simulator.step();
    }
}

#[test]
fn test_at_most_one_running_thread_per_snapshot() {
    let source = r#"
        public class Single {
            public static void main(String[] args) {
                for (int i = 0; i < 10; i++) {
                    int x = i * 2;
                }
            }
        }
    "#;
    let (_, snapshots) = run_collecting(source);
    for snapshot in &snapshots {
        let running = snapshot
            .threads
            .iter()
            .filter(|t| t.status == ThreadStatus::Running)
            .count();
        assert!(running <= 1, "{} threads RUNNING", running);
    }
}

#[test]
fn test_frame_pcs_stay_in_range() {
    let source = r#"
        public class Range {
            public static void main(String[] args) {
                System.out.println(helper(3));
            }
            static int helper(int x) {
                return x * x;
            }
        }
    "#;
    let (simulator, snapshots) = run_collecting(source);
    let limit = simulator.program().instructions.len();
    for snapshot in &snapshots {
        for thread in &snapshot.threads {
            for frame in &thread.stack {
                assert!(
                    frame.pc <= limit,
                    "pc {} out of range (limit {})",
                    frame.pc,
                    limit
                );
            }
        }
    }
}

#[test]
fn test_string_hash_code_is_canonical() {
    let source = r#"
        public class Hash {
            public static void main(String[] args) {
                System.out.println("hello".hashCode());
                System.out.println("hello".hashCode());
            }
        }
    "#;
    let (simulator, _) = run_collecting(source);
    let output = output_of(&simulator);
    // Java's 31-fold: "hello".hashCode() == 99162322, and stable
    assert_eq!(output[0], "99162322");
    assert_eq!(output[0], output[1]);
}

#[test]
fn test_arrays_sort_idempotent_and_ordered() {
    let source = r#"
        public class SortDemo {
            public static void main(String[] args) {
                int[] xs = new int[]{5, 3, 9, 1};
                Arrays.sort(xs);
                System.out.println(xs[0] + "," + xs[1] + "," + xs[2] + "," + xs[3]);
                Arrays.sort(xs);
                System.out.println(xs[0] + "," + xs[1] + "," + xs[2] + "," + xs[3]);
            }
        }
    "#;
    let (simulator, _) = run_collecting(source);
    let output = output_of(&simulator);
    assert_eq!(output[0], "1,3,5,9");
    assert_eq!(output[1], output[0]);
}

#[test]
fn test_hashmap_put_get_size() {
    let source = r#"
        public class MapDemo {
            public static void main(String[] args) {
                HashMap map = new HashMap();
                map.put("a", 1);
                map.put("b", 2);
                map.put("a", 3);
                System.out.println(map.get("a"));
                System.out.println(map.get("b"));
                System.out.println(map.size());
                System.out.println(map.containsKey("c"));
            }
        }
    "#;
    let (simulator, _) = run_collecting(source);
    assert_eq!(output_of(&simulator), vec!["3", "2", "2", "false", ""]);
}

#[test]
fn test_arraylist_and_for_each() {
    let source = r#"
        public class ListDemo {
            public static void main(String[] args) {
                ArrayList list = new ArrayList();
                list.add(10);
                list.add(20);
                list.add(30);
                for (Object x : list) {
                    System.out.println(x);
                }
                System.out.println(list.size());
            }
        }
    "#;
    let (simulator, _) = run_collecting(source);
    assert_eq!(output_of(&simulator), vec!["10", "20", "30", "3", ""]);
}

#[test]
fn test_string_concatenation_and_methods() {
    let source = r#"
        public class Strings {
            public static void main(String[] args) {
                String name = "World";
                System.out.println("Hello, " + name + "!");
                System.out.println(name.length());
                System.out.println(name.toUpperCase());
                System.out.println("a,b,c".split(",").length);
                System.out.println("x" + 1 + true + null);
            }
        }
    "#;
    let (simulator, _) = run_collecting(source);
    assert_eq!(
        output_of(&simulator),
        vec!["Hello, World!", "5", "WORLD", "3", "x1truenull", ""]
    );
}

#[test]
fn test_virtual_dispatch_through_superclass() {
    let source = r#"
        class Animal {
            String speak() {
                return "...";
            }
        }

        class Dog extends Animal {
            String speak() {
                return "Woof";
            }
        }

        public class Dispatch {
            public static void main(String[] args) {
                Animal a = new Dog();
                Animal b = new Animal();
                System.out.println(a.speak());
                System.out.println(b.speak());
            }
        }
    "#;
    let (simulator, _) = run_collecting(source);
    assert_eq!(output_of(&simulator), vec!["Woof", "...", ""]);
}

#[test]
fn test_string_builder_chain() {
    let source = r#"
        public class Builder {
            public static void main(String[] args) {
                StringBuilder sb = new StringBuilder();
                sb.append("ab").append(3).append('!');
                System.out.println(sb.toString());
                System.out.println(sb.length());
            }
        }
    "#;
    let (simulator, _) = run_collecting(source);
    assert_eq!(output_of(&simulator), vec!["ab3!", "4", ""]);
}

#[test]
fn test_uncaught_throw_becomes_terminal_error() {
    let source = r#"
        public class Thrower {
            public static void main(String[] args) {
                System.out.println("before");
                throw new RuntimeException("boom");
            }
        }
    "#;
    let (mut simulator, _) = run_collecting(source);
    let state = simulator.get_state();

    assert_eq!(state.status, VmStatus::Error);
    assert_eq!(state.error.as_deref(), Some("RuntimeException: boom"));
    assert_eq!(state.output.lines[0], "before");

    // Terminal: further stepping is a no-op
    let step_before = state.step_number;
    let result = simulator.step();
    assert_eq!(result.state.step_number, step_before);
}

#[test]
fn test_try_finally_catch_skipped() {
    let source = r#"
        public class TryDemo {
            public static void main(String[] args) {
                try {
                    System.out.println("try");
                } catch (Exception e) {
                    System.out.println("catch");
                } finally {
                    System.out.println("finally");
                }
                System.out.println("after");
            }
        }
    "#;
    let (simulator, _) = run_collecting(source);
    // The try body runs, the catch body never does, finally always does
    assert_eq!(output_of(&simulator), vec!["try", "finally", "after", ""]);
}

#[test]
fn test_switch_with_fallthrough_and_break() {
    let source = r#"
        public class SwitchDemo {
            public static void main(String[] args) {
                switch (2) {
                    case 1:
                        System.out.println("one");
                        break;
                    case 2:
                        System.out.println("two");
                    case 3:
                        System.out.println("three");
                        break;
                    default:
                        System.out.println("other");
                }
            }
        }
    "#;
    let (simulator, _) = run_collecting(source);
    assert_eq!(output_of(&simulator), vec!["two", "three", ""]);
}

#[test]
fn test_static_fields_and_math() {
    let source = r#"
        public class Statics {
            static int counter = 7;

            public static void main(String[] args) {
                counter += 1;
                System.out.println(counter);
                System.out.println(Math.max(3, 9));
                System.out.println(Math.abs(-4));
                System.out.println(Integer.parseInt("42"));
            }
        }
    "#;
    let (simulator, _) = run_collecting(source);
    assert_eq!(output_of(&simulator), vec!["8", "9", "4", "42", ""]);
}

#[test]
fn test_reset_reinitialises_and_clears_history() {
    let source = r#"
        public class ResetDemo {
            public static void main(String[] args) {
                System.out.println("once");
            }
        }
    "#;
    let mut simulator = simulator_for(source);
    simulator.run();
    assert_eq!(simulator.get_state().status, VmStatus::Completed);
    assert!(simulator.can_step_back());

    simulator.reset();
    assert_eq!(simulator.get_state().status, VmStatus::Paused);
    assert!(!simulator.can_step_back());
    assert_eq!(simulator.get_state().output.lines, vec![""]);

    simulator.run();
    assert_eq!(output_of(&simulator), vec!["once", ""]);
}

#[test]
fn test_interfaces_and_default_methods() {
    let source = r#"
        interface Greeter {
            String name();

            default String greet() {
                return "hi";
            }
        }

        class English implements Greeter {
            public String name() {
                return "english";
            }
        }

        public class Ifaces {
            public static void main(String[] args) {
                English g = new English();
                System.out.println(g.name());
            }
        }
    "#;
    let (simulator, _) = run_collecting(source);
    assert_eq!(output_of(&simulator), vec!["english", ""]);
}

#[test]
fn test_instanceof_and_cast() {
    let source = r#"
        class Base { }
        class Derived extends Base { }

        public class Casts {
            public static void main(String[] args) {
                Base b = new Derived();
                System.out.println(b instanceof Derived);
                System.out.println(b instanceof Base);
                System.out.println((int) 3.7);
                System.out.println(null instanceof Base);
            }
        }
    "#;
    let (simulator, _) = run_collecting(source);
    assert_eq!(output_of(&simulator), vec!["true", "true", "3", "false", ""]);
}
