//! Stream routing between concurrent tasks and channels

use std::sync::Arc;

use pyrelay::kernel::{ContextId, Kernel, MemorySink, Multiplexer, SinkEvent, TaskStatus};
use pyrelay::runtime::{Namespace, StreamRole};
use pyrelay::util::config::KernelConfig;

fn kernel_with(channels: &[&str]) -> (Kernel, Vec<Arc<MemorySink>>) {
    let mux = Arc::new(Multiplexer::new());
    let sinks = channels
        .iter()
        .map(|name| {
            let sink = MemorySink::new();
            mux.open_channel((*name).into(), sink.clone());
            sink
        })
        .collect();
    (Kernel::with_multiplexer(KernelConfig::default(), mux), sinks)
}

fn finish_context(sink: &MemorySink) -> ContextId {
    sink.events()
        .into_iter()
        .find_map(|event| match event {
            SinkEvent::Finish { context, .. } => Some(context),
            _ => None,
        })
        .expect("task reported no status")
}

#[test]
fn test_concurrent_tasks_stay_on_their_channels() {
    let names = ["a", "b", "c", "d"];
    let (kernel, sinks) = kernel_with(&names);

    let handles: Vec<_> = names
        .iter()
        .map(|name| {
            let code = format!("for i in range(300):\n    print('{}', i)", name);
            kernel
                .submit(&code, &(*name).into(), &Namespace::new())
                .unwrap()
        })
        .collect();
    for handle in handles {
        assert_eq!(handle.join(), TaskStatus::Completed);
    }

    for (name, sink) in names.iter().zip(&sinks) {
        let expected: String = (0..300).map(|i| format!("{} {}\n", name, i)).collect();
        assert_eq!(sink.output(), expected, "channel {}", name);
        assert_eq!(sink.errors(), "");
        assert_eq!(sink.statuses(), vec![TaskStatus::Completed]);
    }
}

#[test]
fn test_error_output_routed_to_error_role() {
    let (kernel, sinks) = kernel_with(&["main"]);
    let code = "import sys\nprint('out')\nprint('err', file=sys.stderr)\nsys.stderr.write('raw\\n')";
    let status = kernel
        .submit(code, &"main".into(), &Namespace::new())
        .unwrap()
        .join();
    assert_eq!(status, TaskStatus::Completed);
    assert_eq!(sinks[0].output(), "out\n");
    assert_eq!(sinks[0].errors(), "err\nraw\n");
}

#[test]
fn test_unregistered_after_runtime_fault() {
    let (kernel, sinks) = kernel_with(&["main"]);
    let status = kernel
        .submit("print('partial')\nundefined_name", &"main".into(), &Namespace::new())
        .unwrap()
        .join();
    assert_eq!(
        status,
        TaskStatus::Failed("NameError: name 'undefined_name' is not defined".into())
    );
    assert_eq!(sinks[0].output(), "partial\n");
    assert!(sinks[0].errors().contains("NameError"));

    let context = finish_context(&sinks[0]);
    for role in StreamRole::ALL {
        assert_eq!(kernel.multiplexer().lookup(role, context), None);
    }
}

#[test]
fn test_writes_after_close_are_dropped() {
    let (kernel, sinks) = kernel_with(&["main"]);
    let ns = Namespace::new();
    kernel
        .submit("print('kept')", &"main".into(), &ns)
        .unwrap()
        .join();
    assert!(kernel.multiplexer().close_channel(&"main".into()));
    assert!(kernel.submit("print('lost')", &"main".into(), &ns).is_err());
    assert_eq!(sinks[0].output(), "kept\n");
}

#[test]
fn test_unbound_thread_writes_are_discarded() {
    let (kernel, sinks) = kernel_with(&["main"]);
    kernel
        .multiplexer()
        .write_current(StreamRole::Output, "from the host thread");
    assert_eq!(sinks[0].output(), "");
}
