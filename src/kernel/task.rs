//! Execution tasks
//!
//! Each submitted snippet runs on its own thread:
//!
//! ```text
//! Created → Normalizing → Compiling ─┬→ CompileFailed
//!                                    ├→ Empty
//!                                    └→ Running → Completed | EarlyExit | Failed
//!                                                   → CleanedUp
//! ```
//!
//! The stream binding is taken only once compilation succeeded, and is
//! released by its guard on every path out of `Running`.

use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use crossbeam::channel::{bounded, Receiver, Sender};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use super::channel::ChannelId;
use super::multiplexer::{ContextId, Multiplexer, StreamBinding};
use crate::frontend::{compile, normalize};
use crate::runtime::{self, ExceptionKind, GuestIo, Limits, Namespace, StreamError, StreamRole};

/// Notice written to the output stream when a snippet exits early
pub const EARLY_EXIT_NOTICE: &str = "Your program resulted in an attempt to exit.";

/// Lifecycle phase of a task, for logging
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskPhase {
    Created,
    Normalizing,
    Compiling,
    Running,
    CleanedUp,
}

impl fmt::Display for TaskPhase {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        let name = match self {
            TaskPhase::Created => "created",
            TaskPhase::Normalizing => "normalizing",
            TaskPhase::Compiling => "compiling",
            TaskPhase::Running => "running",
            TaskPhase::CleanedUp => "cleaned-up",
        };
        f.write_str(name)
    }
}

/// Terminal status of a task
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "detail", rename_all = "kebab-case")]
pub enum TaskStatus {
    /// Ran to the end
    Completed,
    /// Nothing to execute after normalization and compilation
    Empty,
    /// Rendered diagnostic
    CompileError(String),
    /// The snippet raised `SystemExit`
    EarlyExit(String),
    /// An uncaught exception, or a fault inside the interpreter
    Failed(String),
}

impl TaskStatus {
    /// Completed or empty
    pub fn is_success(&self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Empty)
    }

    pub fn label(&self) -> &'static str {
        match self {
            TaskStatus::Completed => "completed",
            TaskStatus::Empty => "empty",
            TaskStatus::CompileError(_) => "compile-error",
            TaskStatus::EarlyExit(_) => "early-exit",
            TaskStatus::Failed(_) => "failed",
        }
    }

    pub fn detail(&self) -> Option<&str> {
        match self {
            TaskStatus::CompileError(d) | TaskStatus::EarlyExit(d) | TaskStatus::Failed(d) => {
                Some(d)
            }
            TaskStatus::Completed | TaskStatus::Empty => None,
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        match self.detail() {
            Some(detail) => write!(f, "{}: {}", self.label(), detail),
            None => f.write_str(self.label()),
        }
    }
}

/// Cooperative cancellation flag
///
/// Cancelling drops the wake-up sender, so every blocked reader sees a
/// disconnected channel at once.
#[derive(Debug, Clone)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
    wake_tx: Arc<Mutex<Option<Sender<()>>>>,
    wake_rx: Receiver<()>,
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

impl CancelToken {
    pub fn new() -> Self {
        let (tx, rx) = bounded(0);
        Self {
            flag: Arc::new(AtomicBool::new(false)),
            wake_tx: Arc::new(Mutex::new(Some(tx))),
            wake_rx: rx,
        }
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
        self.wake_tx.lock().take();
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Becomes ready (disconnected) once cancelled
    pub(crate) fn receiver(&self) -> Receiver<()> {
        self.wake_rx.clone()
    }
}

/// Per-task I/O context handed to the interpreter
pub struct TaskIo {
    binding: StreamBinding,
    cancel: CancelToken,
}

impl TaskIo {
    pub fn new(
        binding: StreamBinding,
        cancel: CancelToken,
    ) -> Self {
        Self { binding, cancel }
    }

    pub fn context(&self) -> ContextId {
        self.binding.context()
    }

    pub fn channel(&self) -> &ChannelId {
        self.binding.channel()
    }
}

impl GuestIo for TaskIo {
    fn write(
        &self,
        role: StreamRole,
        data: &str,
    ) {
        self.binding
            .multiplexer()
            .write(role, self.binding.context(), data);
    }

    fn read_line(&self) -> Result<Option<String>, StreamError> {
        self.binding
            .multiplexer()
            .read_line(self.binding.context(), &self.cancel)
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

/// A runtime fault, forwarded to the kernel's supervisor when one is attached
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FaultReport {
    #[serde(skip)]
    pub context: ContextId,
    pub channel: ChannelId,
    pub status: TaskStatus,
    /// Rendered traceback or panic message
    pub traceback: String,
}

/// Everything a task thread needs
pub(crate) struct TaskSpec {
    pub code: String,
    pub channel: ChannelId,
    pub namespace: Namespace,
    pub limits: Limits,
    pub mux: Arc<Multiplexer>,
    pub cancel: CancelToken,
    pub supervisor: Option<Sender<FaultReport>>,
}

/// Body of a task thread
pub(crate) fn run_task(spec: TaskSpec) -> TaskStatus {
    let context = ContextId::current();
    let TaskSpec {
        code,
        channel,
        namespace,
        limits,
        mux,
        cancel,
        supervisor,
    } = spec;
    debug!("task {} on channel {}: {}", context, channel, TaskPhase::Created);

    let (status, fault) = execute(context, &code, &channel, &namespace, limits, &mux, cancel);

    debug!("task {} on channel {}: {}", context, channel, TaskPhase::CleanedUp);
    mux.finish(&channel, context, &status);
    info!("finished run with channel={} status={}", channel, status.label());

    if let (Some(traceback), Some(supervisor)) = (fault, supervisor) {
        let report = FaultReport {
            context,
            channel,
            status: status.clone(),
            traceback,
        };
        if supervisor.send(report).is_err() {
            debug!("supervisor detached; fault report dropped");
        }
    }
    status
}

/// Normalize, compile, bind, execute and classify. The binding is dropped
/// before this returns.
fn execute(
    context: ContextId,
    code: &str,
    channel: &ChannelId,
    namespace: &Namespace,
    limits: Limits,
    mux: &Arc<Multiplexer>,
    cancel: CancelToken,
) -> (TaskStatus, Option<String>) {
    debug!("task {}: {}", context, TaskPhase::Normalizing);
    let source = normalize(code);

    debug!("task {}: {}", context, TaskPhase::Compiling);
    let unit = match compile(&source) {
        Ok(unit) => unit,
        Err(e) => {
            debug!("task {}: compile error: {}", context, e);
            return (TaskStatus::CompileError(e.render(&source)), None);
        }
    };
    if unit.is_empty() {
        return (TaskStatus::Empty, None);
    }

    let io = TaskIo::new(mux.bind(context, channel.clone()), cancel);
    let _exec = namespace.execution_guard();

    debug!("task {}: {}", context, TaskPhase::Running);
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
        runtime::execute(&unit, namespace, &io, limits)
    }));

    match outcome {
        Ok(Ok(())) => (TaskStatus::Completed, None),
        Ok(Err(exc)) if exc.kind() == ExceptionKind::SystemExit => {
            io.write(StreamRole::Output, &format!("{}\n", EARLY_EXIT_NOTICE));
            io.write(StreamRole::Error, &exc.render());
            (TaskStatus::EarlyExit(exc.summary()), None)
        }
        Ok(Err(exc)) => {
            let traceback = exc.render();
            io.write(StreamRole::Error, &traceback);
            error!(
                "task {} on channel {} failed: {}",
                context,
                channel,
                exc.summary()
            );
            (TaskStatus::Failed(exc.summary()), Some(traceback))
        }
        Err(payload) => {
            let message = format!("internal error: {}", panic_message(payload.as_ref()));
            io.write(StreamRole::Error, &format!("{}\n", message));
            error!("task {} on channel {} panicked: {}", context, channel, message);
            (TaskStatus::Failed(message.clone()), Some(message))
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Handle to a submitted task
#[derive(Debug)]
pub struct TaskHandle {
    context: ContextId,
    channel: ChannelId,
    cancel: CancelToken,
    thread: JoinHandle<TaskStatus>,
}

impl TaskHandle {
    pub(crate) fn new(
        channel: ChannelId,
        cancel: CancelToken,
        thread: JoinHandle<TaskStatus>,
    ) -> Self {
        Self {
            context: ContextId::from_thread(thread.thread().id()),
            channel,
            cancel,
            thread,
        }
    }

    pub fn context(&self) -> ContextId {
        self.context
    }

    pub fn channel(&self) -> &ChannelId {
        &self.channel
    }

    /// Ask the task to stop. Blocked reads wake immediately; running code
    /// stops at the next statement with `KeyboardInterrupt`.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.thread.is_finished()
    }

    /// Wait for the terminal status
    pub fn join(self) -> TaskStatus {
        match self.thread.join() {
            Ok(status) => status,
            Err(payload) => {
                TaskStatus::Failed(format!("internal error: {}", panic_message(payload.as_ref())))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::channel::{MemorySink, SinkEvent};

    fn run_on(
        code: &str,
        namespace: &Namespace,
    ) -> (TaskStatus, Arc<MemorySink>, Arc<Multiplexer>) {
        let mux = Arc::new(Multiplexer::new());
        let sink = MemorySink::new();
        mux.open_channel("t".into(), sink.clone());
        let spec = TaskSpec {
            code: code.to_string(),
            channel: "t".into(),
            namespace: namespace.clone(),
            limits: Limits {
                recursion_limit: 20,
                ..Limits::default()
            },
            mux: mux.clone(),
            cancel: CancelToken::new(),
            supervisor: None,
        };
        let status = std::thread::spawn(move || run_task(spec)).join().unwrap();
        (status, sink, mux)
    }

    #[test]
    fn test_status_serialization() {
        let json = serde_json::to_string(&TaskStatus::CompileError("bad".into())).unwrap();
        assert_eq!(json, r#"{"status":"compile-error","detail":"bad"}"#);
        let json = serde_json::to_string(&TaskStatus::Completed).unwrap();
        assert_eq!(json, r#"{"status":"completed"}"#);
        let back: TaskStatus = serde_json::from_str(r#"{"status":"early-exit","detail":"SystemExit"}"#).unwrap();
        assert_eq!(back, TaskStatus::EarlyExit("SystemExit".into()));
    }

    #[test]
    fn test_completed_reports_finish() {
        let (status, sink, _) = run_on("\n\nprint('hi')\n\n", &Namespace::new());
        assert_eq!(status, TaskStatus::Completed);
        assert_eq!(sink.output(), "hi\n");
        assert_eq!(sink.statuses(), vec![TaskStatus::Completed]);
    }

    #[test]
    fn test_empty_program_skips_execution() {
        let (status, sink, _) = run_on("   \n# just a comment\n\n", &Namespace::new());
        assert_eq!(status, TaskStatus::Empty);
        assert_eq!(sink.output(), "");
        assert_eq!(sink.errors(), "");
    }

    #[test]
    fn test_compile_error_status_only() {
        let ns = Namespace::new();
        let (status, sink, _) = run_on("x = 1\ny = (", &ns);
        match status {
            TaskStatus::CompileError(detail) => assert!(detail.contains("line 2"), "{}", detail),
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(sink.errors(), "");
        assert!(ns.is_empty());
    }

    #[test]
    fn test_early_exit() {
        let (status, sink, _) = run_on("print('before')\nexit(3)\nprint('after')", &Namespace::new());
        assert_eq!(status, TaskStatus::EarlyExit("SystemExit: 3".into()));
        assert_eq!(sink.output(), format!("before\n{}\n", EARLY_EXIT_NOTICE));
        assert!(sink.errors().starts_with("Traceback (most recent call last):\n"));
        assert!(!sink.errors().contains(EARLY_EXIT_NOTICE));
        assert!(sink.errors().ends_with("SystemExit: 3\n"));
    }

    #[test]
    fn test_failure_writes_traceback() {
        let (status, sink, mux) = run_on("x = 1\nraise ValueError('boom')", &Namespace::new());
        assert_eq!(status, TaskStatus::Failed("ValueError: boom".into()));
        assert!(sink.errors().starts_with("Traceback (most recent call last):\n"));
        assert!(sink.errors().contains("line 2, in <module>"));
        // Nothing stays registered for the finished context
        let context = sink
            .events()
            .into_iter()
            .find_map(|event| match event {
                SinkEvent::Finish { context, .. } => Some(context),
                _ => None,
            })
            .unwrap();
        for role in StreamRole::ALL {
            assert_eq!(mux.lookup(role, context), None);
        }
    }

    #[test]
    fn test_cancel_token() {
        let token = CancelToken::new();
        let rx = token.receiver();
        assert!(!token.is_cancelled());
        token.cancel();
        assert!(token.is_cancelled());
        assert!(rx.recv().is_err());
    }
}
