//! Cancellation, input and namespace policies under concurrency

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use pyrelay::kernel::{Kernel, MemorySink, Multiplexer, TaskStatus};
use pyrelay::runtime::{Namespace, NamespacePolicy, Value};
use pyrelay::util::config::KernelConfig;

fn setup() -> (Kernel, Arc<MemorySink>) {
    let mux = Arc::new(Multiplexer::new());
    let sink = MemorySink::new();
    mux.open_channel("main".into(), sink.clone());
    (Kernel::with_multiplexer(KernelConfig::default(), mux), sink)
}

fn settle() {
    thread::sleep(Duration::from_millis(100));
}

#[test]
fn test_input_reads_channel_lines() {
    let (kernel, sink) = setup();
    let mux = kernel.multiplexer();
    mux.send_input(&"main".into(), "Ada");
    mux.send_input(&"main".into(), "36");
    let code = "name = input('name? ')\nage = int(input())\nprint(name, age + 1)";
    let status = kernel
        .submit(code, &"main".into(), &Namespace::new())
        .unwrap()
        .join();
    assert_eq!(status, TaskStatus::Completed);
    assert_eq!(sink.output(), "name? Ada 37\n");
}

#[test]
fn test_input_at_end_of_input() {
    let (kernel, _) = setup();
    kernel.multiplexer().close_input(&"main".into());
    let status = kernel
        .submit("input()", &"main".into(), &Namespace::new())
        .unwrap()
        .join();
    assert_eq!(status, TaskStatus::Failed("EOFError: EOF when reading a line".into()));
}

#[test]
fn test_cancel_wakes_blocked_input() {
    let (kernel, sink) = setup();
    let handle = kernel
        .submit("print('waiting')\nline = input()", &"main".into(), &Namespace::new())
        .unwrap();
    settle();
    assert!(!handle.is_finished());
    handle.cancel();
    let status = handle.join();
    assert_eq!(
        status,
        TaskStatus::Failed("KeyboardInterrupt: execution cancelled".into())
    );
    assert_eq!(sink.output(), "waiting\n");
    assert!(sink.errors().contains("KeyboardInterrupt"));
}

#[test]
fn test_cancel_stops_busy_loop() {
    let (kernel, _) = setup();
    let handle = kernel
        .submit("n = 0\nwhile True:\n    n += 1", &"main".into(), &Namespace::new())
        .unwrap();
    settle();
    handle.cancel();
    assert!(matches!(handle.join(), TaskStatus::Failed(ref d) if d.starts_with("KeyboardInterrupt")));
}

#[test]
fn test_serialize_policy_runs_one_at_a_time() {
    let (kernel, _) = setup();
    let ns = Namespace::with_policy(NamespacePolicy::Serialize);
    let reader = kernel.submit("line = input()", &"main".into(), &ns).unwrap();
    settle();
    let writer = kernel.submit("y = 2", &"main".into(), &ns).unwrap();
    settle();
    // Waits behind the blocked reader
    assert!(!writer.is_finished());
    assert!(!ns.contains("y"));

    kernel.multiplexer().send_input(&"main".into(), "go");
    assert_eq!(reader.join(), TaskStatus::Completed);
    assert_eq!(writer.join(), TaskStatus::Completed);
    assert_eq!(ns.get("line"), Some(Value::str("go")));
    assert_eq!(ns.get("y"), Some(Value::Int(2)));
}

#[test]
fn test_serialize_policy_keeps_every_update() {
    let (kernel, _) = setup();
    let ns = Namespace::with_policy(NamespacePolicy::Serialize);
    ns.set("n", Value::Int(0));
    let code = "for i in range(500):\n    n = n + 1";
    let handles: Vec<_> = (0..4)
        .map(|_| kernel.submit(code, &"main".into(), &ns).unwrap())
        .collect();
    for handle in handles {
        assert_eq!(handle.join(), TaskStatus::Completed);
    }
    assert_eq!(ns.get("n"), Some(Value::Int(2000)));
}

#[test]
fn test_allow_race_policy_overlaps() {
    let (kernel, _) = setup();
    let ns = Namespace::with_policy(NamespacePolicy::AllowRace);
    let reader = kernel.submit("line = input()", &"main".into(), &ns).unwrap();
    settle();
    // Runs while the reader is still blocked
    let writer = kernel.submit("y = 2", &"main".into(), &ns).unwrap();
    assert_eq!(writer.join(), TaskStatus::Completed);
    assert!(!reader.is_finished());
    assert_eq!(ns.get("y"), Some(Value::Int(2)));

    kernel.multiplexer().send_input(&"main".into(), "go");
    assert_eq!(reader.join(), TaskStatus::Completed);
}

#[test]
fn test_allow_race_updates_stay_memory_safe() {
    let (kernel, _) = setup();
    let ns = Namespace::with_policy(NamespacePolicy::AllowRace);
    ns.set("n", Value::Int(0));
    let code = "for i in range(500):\n    n = n + 1";
    let handles: Vec<_> = (0..4)
        .map(|_| kernel.submit(code, &"main".into(), &ns).unwrap())
        .collect();
    for handle in handles {
        assert_eq!(handle.join(), TaskStatus::Completed);
    }
    // Updates may be lost, but the binding always holds a valid count
    match ns.get("n") {
        Some(Value::Int(n)) => assert!((1..=2000).contains(&n), "{}", n),
        other => panic!("unexpected {:?}", other),
    }
}
