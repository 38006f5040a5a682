//! Stream multiplexer
//!
//! One registry per stream role maps the context of a running task to the
//! channel its traffic belongs to. Writes resolve the mapping at call time,
//! so concurrent tasks never see each other's output.
//!
//! Tasks normally reach the multiplexer through their [`TaskIo`]; the
//! process-wide instance and [`write_current`] serve entry points that only
//! know the calling thread.
//!
//! [`TaskIo`]: super::task::TaskIo

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::thread::ThreadId;

use crossbeam::channel::select;
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use tracing::{debug, trace, warn};

use super::channel::{ChannelId, Endpoint, Sink};
use super::task::{CancelToken, TaskStatus};
use crate::runtime::{StreamError, StreamRole};

/// Identity of the scheduling unit running a task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContextId(ThreadId);

impl ContextId {
    /// Context of the calling thread
    pub fn current() -> Self {
        Self(std::thread::current().id())
    }

    pub fn from_thread(id: ThreadId) -> Self {
        Self(id)
    }
}

impl fmt::Display for ContextId {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(f, "{:?}", self.0)
    }
}

/// Context → channel map for one stream role
#[derive(Debug)]
struct StreamRoute {
    role: StreamRole,
    map: RwLock<HashMap<ContextId, ChannelId>>,
}

impl StreamRoute {
    fn new(role: StreamRole) -> Self {
        Self {
            role,
            map: RwLock::new(HashMap::new()),
        }
    }
}

/// The process-wide multiplexer
static GLOBAL: Lazy<Arc<Multiplexer>> = Lazy::new(|| Arc::new(Multiplexer::new()));

/// Routes task stream traffic to session channels
pub struct Multiplexer {
    routes: [StreamRoute; 3],
    channels: RwLock<HashMap<ChannelId, Arc<Endpoint>>>,
}

impl Default for Multiplexer {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Multiplexer {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("Multiplexer")
            .field("routes", &self.routes)
            .field("channels", &self.channels.read().keys().collect::<Vec<_>>())
            .finish()
    }
}

impl Multiplexer {
    /// A standalone multiplexer
    pub fn new() -> Self {
        Self {
            routes: StreamRole::ALL.map(StreamRoute::new),
            channels: RwLock::new(HashMap::new()),
        }
    }

    /// The process-wide multiplexer
    pub fn global() -> Arc<Multiplexer> {
        GLOBAL.clone()
    }

    fn route(
        &self,
        role: StreamRole,
    ) -> &StreamRoute {
        let route = &self.routes[role as usize];
        debug_assert_eq!(route.role, role);
        route
    }

    // ---- registry ----

    /// Map `context` to `channel` for `role`, replacing any previous mapping
    pub fn register(
        &self,
        role: StreamRole,
        context: ContextId,
        channel: ChannelId,
    ) -> Option<ChannelId> {
        trace!("register {} {} -> {}", role, context, channel);
        self.route(role).map.write().insert(context, channel)
    }

    /// Remove the mapping for `context`; a missing mapping is a no-op
    pub fn unregister(
        &self,
        role: StreamRole,
        context: ContextId,
    ) -> Option<ChannelId> {
        trace!("unregister {} {}", role, context);
        self.route(role).map.write().remove(&context)
    }

    pub fn lookup(
        &self,
        role: StreamRole,
        context: ContextId,
    ) -> Option<ChannelId> {
        self.route(role).map.read().get(&context).cloned()
    }

    /// Register `context` on every role; dropping the guard unregisters it
    pub fn bind(
        self: &Arc<Self>,
        context: ContextId,
        channel: ChannelId,
    ) -> StreamBinding {
        for role in StreamRole::ALL {
            self.register(role, context, channel.clone());
        }
        StreamBinding {
            mux: self.clone(),
            context,
            channel,
        }
    }

    // ---- channels ----

    /// Open a channel, replacing an existing one with the same id
    pub fn open_channel(
        &self,
        id: ChannelId,
        sink: Arc<dyn Sink>,
    ) {
        debug!("open channel {}", id);
        self.channels.write().insert(id, Arc::new(Endpoint::new(sink)));
    }

    /// Close a channel; later writes routed to it are discarded
    pub fn close_channel(
        &self,
        id: &ChannelId,
    ) -> bool {
        debug!("close channel {}", id);
        match self.channels.write().remove(id) {
            Some(endpoint) => {
                endpoint.close_input();
                true
            }
            None => false,
        }
    }

    pub fn is_open(
        &self,
        id: &ChannelId,
    ) -> bool {
        self.channels.read().contains_key(id)
    }

    fn endpoint(
        &self,
        id: &ChannelId,
    ) -> Option<Arc<Endpoint>> {
        self.channels.read().get(id).cloned()
    }

    /// Queue a line of input for tasks reading from `id`.
    ///
    /// Returns false when the channel is unknown or its input is closed.
    pub fn send_input(
        &self,
        id: &ChannelId,
        line: impl Into<String>,
    ) -> bool {
        let mut line = line.into();
        if !line.ends_with('\n') {
            line.push('\n');
        }
        self.endpoint(id)
            .is_some_and(|endpoint| endpoint.send_input(line))
    }

    /// Signal end of input on `id`
    pub fn close_input(
        &self,
        id: &ChannelId,
    ) {
        if let Some(endpoint) = self.endpoint(id) {
            endpoint.close_input();
        }
    }

    // ---- traffic ----

    /// Append `data` to the channel mapped to `context` for `role`.
    ///
    /// Without a mapping, or with a mapping to a closed channel, the data is
    /// dropped.
    pub fn write(
        &self,
        role: StreamRole,
        context: ContextId,
        data: &str,
    ) {
        if role == StreamRole::Input {
            trace!("ignoring write to the input stream of {}", context);
            return;
        }
        let Some(channel) = self.lookup(role, context) else {
            trace!("discarding {} bytes from unbound {}", data.len(), context);
            return;
        };
        match self.endpoint(&channel) {
            Some(endpoint) => endpoint.sink.write(role, data),
            None => warn!("discarding write to closed channel {}", channel),
        }
    }

    /// Write on behalf of the calling thread
    pub fn write_current(
        &self,
        role: StreamRole,
        data: &str,
    ) {
        self.write(role, ContextId::current(), data);
    }

    /// Block for the next input line addressed to `context`'s channel.
    ///
    /// `Ok(None)` is end of input, including a channel closed meanwhile.
    pub fn read_line(
        &self,
        context: ContextId,
        cancel: &CancelToken,
    ) -> Result<Option<String>, StreamError> {
        if cancel.is_cancelled() {
            return Err(StreamError::Cancelled);
        }
        let channel = self
            .lookup(StreamRole::Input, context)
            .ok_or(StreamError::Unbound)?;
        let Some(endpoint) = self.endpoint(&channel) else {
            return Ok(None);
        };
        let input = endpoint.input();
        drop(endpoint);
        let cancelled = cancel.receiver();

        select! {
            recv(input) -> line => Ok(line.ok()),
            recv(cancelled) -> _ => Err(StreamError::Cancelled),
        }
    }

    /// Deliver a terminal status to a channel's sink
    pub(crate) fn finish(
        &self,
        channel: &ChannelId,
        context: ContextId,
        status: &TaskStatus,
    ) {
        match self.endpoint(channel) {
            Some(endpoint) => endpoint.sink.finish(context, status),
            None => warn!("channel {} closed before task {} finished", channel, context),
        }
    }
}

/// Write to the process-wide multiplexer on behalf of the calling thread
pub fn write_current(
    role: StreamRole,
    data: &str,
) {
    GLOBAL.write_current(role, data);
}

/// Registration of one context on all three roles
///
/// Dropping the binding unregisters the context, on every exit path.
#[derive(Debug)]
pub struct StreamBinding {
    mux: Arc<Multiplexer>,
    context: ContextId,
    channel: ChannelId,
}

impl StreamBinding {
    pub fn context(&self) -> ContextId {
        self.context
    }

    pub fn channel(&self) -> &ChannelId {
        &self.channel
    }

    pub fn multiplexer(&self) -> &Arc<Multiplexer> {
        &self.mux
    }
}

impl Drop for StreamBinding {
    fn drop(&mut self) {
        for role in StreamRole::ALL {
            self.mux.unregister(role, self.context);
        }
    }
}
