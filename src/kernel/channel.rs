//! Session channels
//!
//! A channel is the collaborator-facing end of a session: a [`Sink`] that
//! receives the output and error traffic of every task routed to it, plus an
//! input queue that `input()` and `sys.stdin.readline()` read from.

use std::fmt;
use std::io::Write;
use std::sync::Arc;

use crossbeam::channel::{unbounded, Receiver, Sender};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use super::multiplexer::ContextId;
use super::task::TaskStatus;
use crate::runtime::StreamRole;

/// Logical session channel identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChannelId(String);

impl ChannelId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ChannelId {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ChannelId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for ChannelId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Receiver of a channel's outbound traffic
pub trait Sink: Send + Sync {
    /// Append text written by a task to `role`
    fn write(
        &self,
        role: StreamRole,
        data: &str,
    );

    /// Terminal status of a task that ran on this channel
    fn finish(
        &self,
        context: ContextId,
        status: &TaskStatus,
    );
}

/// Something a [`MemorySink`] recorded
#[derive(Debug, Clone, PartialEq)]
pub enum SinkEvent {
    Write { role: StreamRole, data: String },
    Finish { context: ContextId, status: TaskStatus },
}

/// Sink that records every event in order
#[derive(Debug, Default)]
pub struct MemorySink {
    events: Mutex<Vec<SinkEvent>>,
}

impl MemorySink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn events(&self) -> Vec<SinkEvent> {
        self.events.lock().clone()
    }

    /// Concatenated text written to `role`
    pub fn text(
        &self,
        role: StreamRole,
    ) -> String {
        self.events
            .lock()
            .iter()
            .filter_map(|event| match event {
                SinkEvent::Write { role: r, data } if *r == role => Some(data.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn output(&self) -> String {
        self.text(StreamRole::Output)
    }

    pub fn errors(&self) -> String {
        self.text(StreamRole::Error)
    }

    /// Statuses reported so far, in order
    pub fn statuses(&self) -> Vec<TaskStatus> {
        self.events
            .lock()
            .iter()
            .filter_map(|event| match event {
                SinkEvent::Finish { status, .. } => Some(status.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

impl Sink for MemorySink {
    fn write(
        &self,
        role: StreamRole,
        data: &str,
    ) {
        self.events.lock().push(SinkEvent::Write {
            role,
            data: data.to_string(),
        });
    }

    fn finish(
        &self,
        context: ContextId,
        status: &TaskStatus,
    ) {
        self.events.lock().push(SinkEvent::Finish {
            context,
            status: status.clone(),
        });
    }
}

/// Sink that forwards to the host process's stdout and stderr
#[derive(Debug, Default)]
pub struct ConsoleSink {
    // Serializes writes so one task's text is never split by another's
    lock: Mutex<()>,
}

impl ConsoleSink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }
}

impl Sink for ConsoleSink {
    fn write(
        &self,
        role: StreamRole,
        data: &str,
    ) {
        let _guard = self.lock.lock();
        let result = match role {
            StreamRole::Output => {
                let mut out = std::io::stdout().lock();
                out.write_all(data.as_bytes()).and_then(|_| out.flush())
            }
            StreamRole::Error => {
                let mut err = std::io::stderr().lock();
                err.write_all(data.as_bytes()).and_then(|_| err.flush())
            }
            StreamRole::Input => Ok(()),
        };
        if let Err(e) = result {
            tracing::warn!("console sink write failed: {}", e);
        }
    }

    fn finish(
        &self,
        context: ContextId,
        status: &TaskStatus,
    ) {
        tracing::debug!("task {} finished: {}", context, status);
    }
}

/// Per-channel state held by the multiplexer
pub(crate) struct Endpoint {
    pub(crate) sink: Arc<dyn Sink>,
    input_tx: Mutex<Option<Sender<String>>>,
    input_rx: Receiver<String>,
}

impl Endpoint {
    pub(crate) fn new(sink: Arc<dyn Sink>) -> Self {
        let (tx, rx) = unbounded();
        Self {
            sink,
            input_tx: Mutex::new(Some(tx)),
            input_rx: rx,
        }
    }

    /// Queue a line; false once input has been closed
    pub(crate) fn send_input(
        &self,
        line: String,
    ) -> bool {
        match self.input_tx.lock().as_ref() {
            Some(tx) => tx.send(line).is_ok(),
            None => false,
        }
    }

    /// Close input; readers see end of input after draining queued lines
    pub(crate) fn close_input(&self) {
        self.input_tx.lock().take();
    }

    pub(crate) fn input(&self) -> Receiver<String> {
        self.input_rx.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_sink_filters_roles() {
        let sink = MemorySink::new();
        sink.write(StreamRole::Output, "a");
        sink.write(StreamRole::Error, "b");
        sink.write(StreamRole::Output, "c");
        assert_eq!(sink.output(), "ac");
        assert_eq!(sink.errors(), "b");
        assert_eq!(sink.events().len(), 3);
    }

    #[test]
    fn test_endpoint_input_close() {
        let endpoint = Endpoint::new(MemorySink::new());
        assert!(endpoint.send_input("one\n".into()));
        endpoint.close_input();
        assert!(!endpoint.send_input("two\n".into()));
        let rx = endpoint.input();
        assert_eq!(rx.recv().ok(), Some("one\n".to_string()));
        assert!(rx.recv().is_err());
    }

    #[test]
    fn test_channel_id() {
        let id = ChannelId::from("session-1");
        assert_eq!(id.to_string(), "session-1");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"session-1\"");
    }
}
