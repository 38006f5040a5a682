//! Session consoles
//!
//! A console owns the namespace its snippets run against. Isolated consoles
//! each get a fresh namespace; shared consoles built from the same
//! [`SharedState`] all see one namespace.

use once_cell::sync::Lazy;

use super::channel::ChannelId;
use super::task::TaskHandle;
use super::{Kernel, KernelError};
use crate::frontend::lexer::tokenize;
use crate::frontend::lexer::tokens::TokenKind;
use crate::frontend::{compile, normalize};
use crate::runtime::{Namespace, NamespacePolicy};

/// Result of feeding one line to a [`LineBuffer`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PushOutcome {
    /// The buffered source is an unfinished statement
    NeedMore,
    /// A complete snippet; the buffer has been reset
    Ready(String),
}

/// Accumulates interactive lines until they form a complete snippet
#[derive(Debug, Default, Clone)]
pub struct LineBuffer {
    lines: Vec<String>,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Drop whatever has been buffered
    pub fn reset(&mut self) {
        self.lines.clear();
    }

    pub fn push(
        &mut self,
        line: &str,
    ) -> PushOutcome {
        let line = line.trim_end_matches(['\r', '\n']);
        if self.lines.is_empty() && line.trim().is_empty() {
            return PushOutcome::Ready(String::new());
        }
        let blank = line.trim().is_empty();
        self.lines.push(line.to_string());

        // A block stays open until a blank line closes it
        if opens_block(&self.lines[0]) && !blank {
            return PushOutcome::NeedMore;
        }

        let source = self.lines.join("\n");
        match compile(&normalize(&source)) {
            Err(e) if e.is_incomplete() => PushOutcome::NeedMore,
            _ => {
                self.lines.clear();
                PushOutcome::Ready(source)
            }
        }
    }
}

/// True when the line's last token is the `:` of a block header
fn opens_block(line: &str) -> bool {
    let Ok(tokens) = tokenize(&normalize(line)) else {
        return false;
    };
    tokens
        .iter()
        .rev()
        .find(|token| {
            !matches!(
                token.kind,
                TokenKind::Newline | TokenKind::Indent | TokenKind::Dedent | TokenKind::Eof
            )
        })
        .is_some_and(|token| token.kind == TokenKind::Colon)
}

/// A session bound to a namespace
pub trait Console {
    fn namespace(&self) -> &Namespace;

    fn buffer_mut(&mut self) -> &mut LineBuffer;

    /// Submit a snippet against this console's namespace
    fn run(
        &self,
        kernel: &Kernel,
        code: &str,
        channel: &ChannelId,
    ) -> Result<TaskHandle, KernelError> {
        kernel.submit(code, channel, self.namespace())
    }

    /// Feed one interactive line; submits once a snippet is complete
    fn push_line(
        &mut self,
        kernel: &Kernel,
        line: &str,
        channel: &ChannelId,
    ) -> Result<Option<TaskHandle>, KernelError> {
        match self.buffer_mut().push(line) {
            PushOutcome::NeedMore => Ok(None),
            PushOutcome::Ready(source) if source.trim().is_empty() => Ok(None),
            PushOutcome::Ready(source) => self.run(kernel, &source, channel).map(Some),
        }
    }
}

/// Console with a private namespace
#[derive(Debug, Default)]
pub struct IsolatedConsole {
    namespace: Namespace,
    buffer: LineBuffer,
}

impl IsolatedConsole {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_policy(policy: NamespacePolicy) -> Self {
        Self {
            namespace: Namespace::with_policy(policy),
            buffer: LineBuffer::new(),
        }
    }
}

impl Console for IsolatedConsole {
    fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    fn buffer_mut(&mut self) -> &mut LineBuffer {
        &mut self.buffer
    }
}

static SHARED_STATE: Lazy<SharedState> = Lazy::new(SharedState::default);

/// State common to every console built from it
#[derive(Debug, Clone, Default)]
pub struct SharedState {
    namespace: Namespace,
}

impl SharedState {
    pub fn new(policy: NamespacePolicy) -> Self {
        Self {
            namespace: Namespace::with_policy(policy),
        }
    }

    /// The process-wide state used by [`SharedConsole::new`]
    pub fn global() -> SharedState {
        SHARED_STATE.clone()
    }

    pub fn namespace(&self) -> &Namespace {
        &self.namespace
    }
}

/// Console whose namespace is shared with every console of the same state.
///
/// Constructing one never resets the shared bindings.
#[derive(Debug)]
pub struct SharedConsole {
    state: SharedState,
    buffer: LineBuffer,
}

impl Default for SharedConsole {
    fn default() -> Self {
        Self::new()
    }
}

impl SharedConsole {
    pub fn new() -> Self {
        Self::with_state(SharedState::global())
    }

    pub fn with_state(state: SharedState) -> Self {
        Self {
            state,
            buffer: LineBuffer::new(),
        }
    }

    pub fn state(&self) -> &SharedState {
        &self.state
    }
}

impl Console for SharedConsole {
    fn namespace(&self) -> &Namespace {
        self.state.namespace()
    }

    fn buffer_mut(&mut self) -> &mut LineBuffer {
        &mut self.buffer
    }
}
