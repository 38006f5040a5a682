//! Isolated and shared session consoles

use std::sync::Arc;

use pyrelay::kernel::{
    Console, IsolatedConsole, Kernel, MemorySink, Multiplexer, SharedConsole, SharedState,
    TaskStatus,
};
use pyrelay::runtime::NamespacePolicy;
use pyrelay::util::config::KernelConfig;

fn setup() -> (Kernel, Arc<MemorySink>) {
    let mux = Arc::new(Multiplexer::new());
    let sink = MemorySink::new();
    mux.open_channel("main".into(), sink.clone());
    (Kernel::with_multiplexer(KernelConfig::default(), mux), sink)
}

#[test]
fn test_isolated_consoles_do_not_see_each_other() {
    let (kernel, sink) = setup();
    let first = IsolatedConsole::new();
    let second = IsolatedConsole::new();

    let status = first.run(&kernel, "x = 1", &"main".into()).unwrap().join();
    assert_eq!(status, TaskStatus::Completed);
    let status = second
        .run(&kernel, "print(x)", &"main".into())
        .unwrap()
        .join();
    assert_eq!(
        status,
        TaskStatus::Failed("NameError: name 'x' is not defined".into())
    );
    let status = first.run(&kernel, "print(x)", &"main".into()).unwrap().join();
    assert_eq!(status, TaskStatus::Completed);
    assert_eq!(sink.output(), "1\n");
}

#[test]
fn test_shared_consoles_see_one_namespace() {
    let (kernel, sink) = setup();
    let state = SharedState::new(NamespacePolicy::Serialize);
    let first = SharedConsole::with_state(state.clone());
    first.run(&kernel, "x = 1", &"main".into()).unwrap().join();

    // A console created later still sees the binding
    let second = SharedConsole::with_state(state);
    let status = second
        .run(&kernel, "print(x)", &"main".into())
        .unwrap()
        .join();
    assert_eq!(status, TaskStatus::Completed);
    assert_eq!(sink.output(), "1\n");
}

#[test]
fn test_push_line_submits_complete_blocks() {
    let (kernel, sink) = setup();
    let mut console = IsolatedConsole::new();
    let channel = "main".into();

    assert!(console.push_line(&kernel, "total = 0", &channel).unwrap().unwrap().join().is_success());
    for line in ["for i in range(4):", "    total += i"] {
        assert!(console.push_line(&kernel, line, &channel).unwrap().is_none());
    }
    let handle = console.push_line(&kernel, "", &channel).unwrap().unwrap();
    assert_eq!(handle.join(), TaskStatus::Completed);
    let handle = console.push_line(&kernel, "print(total)", &channel).unwrap().unwrap();
    assert_eq!(handle.join(), TaskStatus::Completed);
    assert_eq!(sink.output(), "6\n");

    // Blank lines between statements submit nothing
    assert!(console.push_line(&kernel, "", &channel).unwrap().is_none());
}
