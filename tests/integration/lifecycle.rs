//! Task lifecycle: normalization, compile diagnostics, classification

use std::sync::Arc;

use pyrelay::kernel::{Kernel, MemorySink, Multiplexer, TaskStatus};
use pyrelay::kernel::task::EARLY_EXIT_NOTICE;
use pyrelay::runtime::{Namespace, Value};
use pyrelay::util::config::KernelConfig;

fn setup() -> (Kernel, Arc<MemorySink>) {
    let mux = Arc::new(Multiplexer::new());
    let sink = MemorySink::new();
    mux.open_channel("main".into(), sink.clone());
    (Kernel::with_multiplexer(KernelConfig::default(), mux), sink)
}

fn run(
    kernel: &Kernel,
    code: &str,
    ns: &Namespace,
) -> TaskStatus {
    kernel.submit(code, &"main".into(), ns).unwrap().join()
}

#[test]
fn test_bindings_persist_across_submissions() {
    let (kernel, sink) = setup();
    let ns = kernel.new_namespace();
    assert_eq!(run(&kernel, "x = 1", &ns), TaskStatus::Completed);
    assert_eq!(ns.get("x"), Some(Value::Int(1)));
    assert_eq!(sink.output(), "");
    assert_eq!(run(&kernel, "print(x)", &ns), TaskStatus::Completed);
    assert_eq!(sink.output(), "1\n");
}

#[test]
fn test_pasted_snippet_with_indented_blank_edges() {
    let (kernel, sink) = setup();
    let code = "\n    \n\t\ndef greet(name):\n    return 'hi ' + name\n\nprint(greet('bo'))\n   \n\n";
    assert_eq!(run(&kernel, code, &Namespace::new()), TaskStatus::Completed);
    assert_eq!(sink.output(), "hi bo\n");
}

#[test]
fn test_empty_program_is_skipped() {
    let (kernel, sink) = setup();
    for code in ["", "\n\n   \n", "# only a comment\n"] {
        assert_eq!(run(&kernel, code, &Namespace::new()), TaskStatus::Empty);
    }
    assert_eq!(sink.output(), "");
    assert_eq!(sink.errors(), "");
    assert_eq!(sink.statuses(), vec![TaskStatus::Empty; 3]);
}

#[test]
fn test_compile_error_carries_line_number() {
    let (kernel, sink) = setup();
    let ns = Namespace::new();
    let status = run(&kernel, "\n\nx = 1\nif x\n    print(x)", &ns);
    let TaskStatus::CompileError(detail) = status else {
        panic!("expected a compile error, got {:?}", status);
    };
    // Line numbers count from the normalized source
    assert!(detail.contains("File \"<snippet>\", line 2"), "{}", detail);
    assert!(detail.contains("SyntaxError"), "{}", detail);
    // Nothing ran, nothing written
    assert!(!ns.contains("x"));
    assert_eq!(sink.errors(), "");
}

#[test]
fn test_indentation_error_class() {
    let (kernel, _) = setup();
    let status = run(&kernel, "if True:\nprint(1)", &Namespace::new());
    assert!(matches!(status, TaskStatus::CompileError(ref d) if d.contains("IndentationError")));
}

#[test]
fn test_early_exit_then_later_submissions() {
    let (kernel, sink) = setup();
    let ns = kernel.new_namespace();
    let status = run(&kernel, "x = 5\nexit()\nx = 6", &ns);
    assert_eq!(status, TaskStatus::EarlyExit("SystemExit".into()));
    let errors = sink.errors();
    assert!(errors.starts_with("Traceback (most recent call last):"), "{}", errors);
    assert_eq!(sink.output(), format!("{}\n", EARLY_EXIT_NOTICE));

    assert_eq!(run(&kernel, "print(x)", &ns), TaskStatus::Completed);
    assert_eq!(sink.output(), format!("{}\n5\n", EARLY_EXIT_NOTICE));
}

#[test]
fn test_caught_system_exit_is_not_early_exit() {
    let (kernel, sink) = setup();
    let code = "try:\n    exit(2)\nexcept SystemExit as e:\n    print('caught', e.args)";
    assert_eq!(run(&kernel, code, &Namespace::new()), TaskStatus::Completed);
    assert_eq!(sink.output(), "caught [2]\n");
}

#[test]
fn test_failure_traceback_names_function() {
    let (kernel, sink) = setup();
    let code = "def div(a, b):\n    return a // b\n\nprint(div(7, 2))\nprint(div(1, 0))";
    let status = run(&kernel, code, &Namespace::new());
    assert_eq!(
        status,
        TaskStatus::Failed("ZeroDivisionError: integer division or modulo by zero".into())
    );
    assert_eq!(sink.output(), "3\n");
    let errors = sink.errors();
    assert!(errors.contains("line 5, in <module>"), "{}", errors);
    assert!(errors.contains("line 2, in div"), "{}", errors);
}

#[test]
fn test_runaway_recursion_fails_cleanly() {
    let mux = Arc::new(Multiplexer::new());
    let sink = MemorySink::new();
    mux.open_channel("main".into(), sink.clone());
    let config = KernelConfig {
        recursion_limit: 50,
        ..KernelConfig::default()
    };
    let kernel = Kernel::with_multiplexer(config, mux);
    let status = run(&kernel, "def f(n):\n    return f(n + 1)\nf(0)", &Namespace::new());
    assert!(
        matches!(status, TaskStatus::Failed(ref d) if d.starts_with("RecursionError")),
        "{:?}",
        status
    );
}

#[test]
fn test_overly_nested_source_is_compile_error() {
    let (kernel, sink) = setup();
    let code = format!("x = {}1", "-".repeat(100_000));
    let status = run(&kernel, &code, &Namespace::new());
    assert!(
        matches!(status, TaskStatus::CompileError(ref d) if d.contains("too many nested expressions")),
        "{:?}",
        status
    );
    assert_eq!(sink.errors(), "");
}

#[test]
fn test_deeply_nested_list_fails_cleanly() {
    let (kernel, sink) = setup();
    let ns = kernel.new_namespace();
    let build = "a = []
for i in range(100000):
    a = [a]";
    assert_eq!(run(&kernel, build, &ns), TaskStatus::Completed);

    let status = run(&kernel, "print(a)", &ns);
    assert!(
        matches!(status, TaskStatus::Failed(ref d) if d.starts_with("RecursionError")),
        "{:?}",
        status
    );
    let status = run(&kernel, "a == [a]", &ns);
    assert!(matches!(status, TaskStatus::Failed(ref d) if d.starts_with("RecursionError")));

    // Rebinding releases the whole chain
    assert_eq!(run(&kernel, "a = 0
print('ok')", &ns), TaskStatus::Completed);
    assert_eq!(sink.output(), "ok\n");
}

#[test]
fn test_oversized_sequences_fail_cleanly() {
    let (kernel, sink) = setup();
    let ns = kernel.new_namespace();
    for code in ["x = [1, 2] * (2 ** 31)", "x = 'ab' * (2 ** 62)", "x = list(range(2 ** 62))"] {
        let status = run(&kernel, code, &ns);
        assert!(
            matches!(status, TaskStatus::Failed(ref d) if d.starts_with("MemoryError")),
            "{}: {:?}",
            code,
            status
        );
    }
    let status = run(&kernel, "len(range(-9223372036854775807, 9223372036854775807))", &ns);
    assert!(matches!(status, TaskStatus::Failed(ref d) if d.starts_with("OverflowError")));

    assert!(!ns.contains("x"));
    assert_eq!(run(&kernel, "print(len([0] * 1000))", &ns), TaskStatus::Completed);
    assert_eq!(sink.output(), "1000\n");
}

#[test]
fn test_sequence_limit_is_configurable() {
    let mux = Arc::new(Multiplexer::new());
    mux.open_channel("main".into(), MemorySink::new());
    let config = KernelConfig {
        max_sequence_len: 10,
        ..KernelConfig::default()
    };
    let kernel = Kernel::with_multiplexer(config, mux);
    let ns = Namespace::new();
    assert_eq!(run(&kernel, "x = 'abcde' * 2", &ns), TaskStatus::Completed);
    for code in ["y = x + '!'", "y = list(range(11))", "y = sum([[1] * 6, [2] * 6], [])"] {
        let status = run(&kernel, code, &ns);
        assert!(
            matches!(status, TaskStatus::Failed(ref d) if d.starts_with("MemoryError")),
            "{}: {:?}",
            code,
            status
        );
    }
    assert!(!ns.contains("y"));
}

#[test]
fn test_failed_snippet_keeps_earlier_bindings() {
    let (kernel, _) = setup();
    let ns = Namespace::new();
    let status = run(&kernel, "a = [1, 2]\nb = a[5]", &ns);
    assert!(matches!(status, TaskStatus::Failed(ref d) if d.starts_with("IndexError")));
    assert_eq!(ns.get("a").map(|v| v.repr()), Some("[1, 2]".to_string()));
    assert_eq!(ns.get("b"), None::<Value>);
}

#[test]
fn test_status_json() {
    let (kernel, _) = setup();
    let status = run(&kernel, "raise ValueError('bad input')", &Namespace::new());
    assert_eq!(
        serde_json::to_value(&status).unwrap(),
        serde_json::json!({"status": "failed", "detail": "ValueError: bad input"})
    );
    assert_eq!(
        serde_json::to_string(&TaskStatus::Empty).unwrap(),
        r#"{"status":"empty"}"#
    );
}
