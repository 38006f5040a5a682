//! Execution kernel
//!
//! [`Kernel::submit`] runs a snippet on its own thread against a caller's
//! namespace, with all of the snippet's stream traffic routed to one
//! session channel through the [`Multiplexer`].

pub mod channel;
pub mod console;
pub mod multiplexer;
pub mod task;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;

use crossbeam::channel::{unbounded, Receiver, Sender};
use parking_lot::Mutex;
use thiserror::Error;
use tracing::info;

pub use channel::{ChannelId, ConsoleSink, MemorySink, Sink, SinkEvent};
pub use console::{Console, IsolatedConsole, LineBuffer, PushOutcome, SharedConsole, SharedState};
pub use multiplexer::{write_current, ContextId, Multiplexer, StreamBinding};
pub use task::{CancelToken, FaultReport, TaskHandle, TaskIo, TaskPhase, TaskStatus};

use crate::runtime::{Limits, Namespace};
use crate::util::config::KernelConfig;
use task::{run_task, TaskSpec};

/// Kernel errors
#[derive(Debug, Error)]
pub enum KernelError {
    #[error("channel '{0}' is not open")]
    UnknownChannel(ChannelId),

    #[error("failed to spawn task thread: {0}")]
    Spawn(#[from] std::io::Error),
}

struct Shared {
    mux: Arc<Multiplexer>,
    config: KernelConfig,
    next_id: AtomicU64,
    supervisor: Mutex<Option<Sender<FaultReport>>>,
}

/// Entry point for running snippets
#[derive(Clone)]
pub struct Kernel {
    shared: Arc<Shared>,
}

impl std::fmt::Debug for Kernel {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("Kernel")
            .field("config", &self.shared.config)
            .finish_non_exhaustive()
    }
}

impl Default for Kernel {
    fn default() -> Self {
        Self::new(KernelConfig::default())
    }
}

impl Kernel {
    /// A kernel on the process-wide multiplexer
    pub fn new(config: KernelConfig) -> Self {
        Self::with_multiplexer(config, Multiplexer::global())
    }

    pub fn with_multiplexer(
        config: KernelConfig,
        mux: Arc<Multiplexer>,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                mux,
                config,
                next_id: AtomicU64::new(1),
                supervisor: Mutex::new(None),
            }),
        }
    }

    pub fn multiplexer(&self) -> &Arc<Multiplexer> {
        &self.shared.mux
    }

    pub fn config(&self) -> &KernelConfig {
        &self.shared.config
    }

    /// A fresh namespace under the configured policy
    pub fn new_namespace(&self) -> Namespace {
        Namespace::with_policy(self.shared.config.namespace_policy)
    }

    /// Attach a supervisor. Faulted tasks are reported on the returned
    /// receiver; attaching again replaces the previous supervisor.
    pub fn supervise(&self) -> Receiver<FaultReport> {
        let (tx, rx) = unbounded();
        *self.shared.supervisor.lock() = Some(tx);
        rx
    }

    /// Run `code` against `namespace` on a new task, routing its streams
    /// to `channel`.
    pub fn submit(
        &self,
        code: &str,
        channel: &ChannelId,
        namespace: &Namespace,
    ) -> Result<TaskHandle, KernelError> {
        if !self.shared.mux.is_open(channel) {
            return Err(KernelError::UnknownChannel(channel.clone()));
        }

        let id = self.shared.next_id.fetch_add(1, Ordering::Relaxed);
        let config = &self.shared.config;
        let cancel = CancelToken::new();
        let spec = TaskSpec {
            code: code.to_string(),
            channel: channel.clone(),
            namespace: namespace.clone(),
            limits: Limits {
                recursion_limit: config.recursion_limit,
                max_sequence_len: config.max_sequence_len,
            },
            mux: self.shared.mux.clone(),
            cancel: cancel.clone(),
            supervisor: self.shared.supervisor.lock().clone(),
        };

        let thread = thread::Builder::new()
            .name(format!("{}-{}", config.thread_name_prefix, id))
            .stack_size(config.stack_size)
            .spawn(move || run_task(spec))?;
        info!("spawned task {} for channel {}", id, channel);
        Ok(TaskHandle::new(channel.clone(), cancel, thread))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kernel() -> (Kernel, Arc<MemorySink>) {
        let mux = Arc::new(Multiplexer::new());
        let sink = MemorySink::new();
        mux.open_channel("main".into(), sink.clone());
        (Kernel::with_multiplexer(KernelConfig::default(), mux), sink)
    }

    #[test]
    fn test_unknown_channel() {
        let (kernel, _) = kernel();
        let err = kernel
            .submit("pass", &"nowhere".into(), &Namespace::new())
            .unwrap_err();
        assert!(matches!(err, KernelError::UnknownChannel(ref c) if c.as_str() == "nowhere"));
    }

    #[test]
    fn test_submit_runs_snippet() {
        let (kernel, sink) = kernel();
        let ns = kernel.new_namespace();
        let handle = kernel
            .submit("x = 40 + 2\nprint(x)", &"main".into(), &ns)
            .unwrap();
        assert_eq!(handle.channel().as_str(), "main");
        assert_eq!(handle.join(), TaskStatus::Completed);
        assert_eq!(sink.output(), "42\n");
        assert_eq!(ns.get("x"), Some(crate::runtime::Value::Int(42)));
    }

    #[test]
    fn test_supervisor_receives_faults() {
        let (kernel, _) = kernel();
        let faults = kernel.supervise();
        let ns = kernel.new_namespace();
        kernel
            .submit("print('ok')", &"main".into(), &ns)
            .unwrap()
            .join();
        let status = kernel
            .submit("1 / 0", &"main".into(), &ns)
            .unwrap()
            .join();
        assert_eq!(status, TaskStatus::Failed("ZeroDivisionError: division by zero".into()));

        let report = faults.try_recv().unwrap();
        assert_eq!(report.channel.as_str(), "main");
        assert_eq!(report.status, status);
        assert!(report.traceback.contains("line 1, in <module>"));
        assert!(faults.try_recv().is_err());
    }
}
