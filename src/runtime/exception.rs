//! Guest exceptions and tracebacks

use std::fmt::{self, Write as _};
use std::sync::Arc;

use super::value::Value;
use crate::frontend::SNIPPET_NAME;
use crate::util::span::line_text;

/// Built-in exception classes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExceptionKind {
    BaseException,
    Exception,
    SystemExit,
    KeyboardInterrupt,
    ValueError,
    TypeError,
    NameError,
    ZeroDivisionError,
    IndexError,
    RuntimeError,
    AssertionError,
    EOFError,
    ImportError,
    AttributeError,
    RecursionError,
    OverflowError,
    MemoryError,
}

impl ExceptionKind {
    pub const ALL: [ExceptionKind; 17] = [
        ExceptionKind::BaseException,
        ExceptionKind::Exception,
        ExceptionKind::SystemExit,
        ExceptionKind::KeyboardInterrupt,
        ExceptionKind::ValueError,
        ExceptionKind::TypeError,
        ExceptionKind::NameError,
        ExceptionKind::ZeroDivisionError,
        ExceptionKind::IndexError,
        ExceptionKind::RuntimeError,
        ExceptionKind::AssertionError,
        ExceptionKind::EOFError,
        ExceptionKind::ImportError,
        ExceptionKind::AttributeError,
        ExceptionKind::RecursionError,
        ExceptionKind::OverflowError,
        ExceptionKind::MemoryError,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ExceptionKind::BaseException => "BaseException",
            ExceptionKind::Exception => "Exception",
            ExceptionKind::SystemExit => "SystemExit",
            ExceptionKind::KeyboardInterrupt => "KeyboardInterrupt",
            ExceptionKind::ValueError => "ValueError",
            ExceptionKind::TypeError => "TypeError",
            ExceptionKind::NameError => "NameError",
            ExceptionKind::ZeroDivisionError => "ZeroDivisionError",
            ExceptionKind::IndexError => "IndexError",
            ExceptionKind::RuntimeError => "RuntimeError",
            ExceptionKind::AssertionError => "AssertionError",
            ExceptionKind::EOFError => "EOFError",
            ExceptionKind::ImportError => "ImportError",
            ExceptionKind::AttributeError => "AttributeError",
            ExceptionKind::RecursionError => "RecursionError",
            ExceptionKind::OverflowError => "OverflowError",
            ExceptionKind::MemoryError => "MemoryError",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|k| k.name() == name)
    }

    /// Direct base class
    pub fn parent(self) -> Option<Self> {
        match self {
            ExceptionKind::BaseException => None,
            ExceptionKind::Exception
            | ExceptionKind::SystemExit
            | ExceptionKind::KeyboardInterrupt => Some(ExceptionKind::BaseException),
            ExceptionKind::RecursionError => Some(ExceptionKind::RuntimeError),
            _ => Some(ExceptionKind::Exception),
        }
    }

    /// True when `self` is `other` or derives from it
    pub fn is_subclass_of(
        self,
        other: ExceptionKind,
    ) -> bool {
        let mut current = Some(self);
        while let Some(kind) = current {
            if kind == other {
                return true;
            }
            current = kind.parent();
        }
        false
    }
}

impl fmt::Display for ExceptionKind {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// An exception instance as seen by guest code (`except E as e`)
#[derive(Debug)]
pub struct ExceptionObject {
    pub kind: ExceptionKind,
    /// Constructor argument: the message, or the exit code for `SystemExit`
    pub payload: Option<Value>,
}

impl ExceptionObject {
    /// Text after `Kind: ` in a traceback
    pub fn message(&self) -> String {
        match &self.payload {
            None => String::new(),
            Some(value) => value.to_str(),
        }
    }
}

/// One traceback entry
#[derive(Debug, Clone)]
pub struct TraceFrame {
    /// `<module>` or the function name
    pub name: String,
    pub line: usize,
    /// Source the frame's code was compiled from
    pub source: Arc<str>,
}

/// A raised guest exception unwinding through the interpreter
#[derive(Debug, Clone, thiserror::Error)]
#[error("{}", self.summary())]
pub struct Exception {
    pub object: Arc<ExceptionObject>,
    /// Innermost frame first
    pub traceback: Vec<TraceFrame>,
}

impl Exception {
    pub fn new(
        kind: ExceptionKind,
        message: impl Into<String>,
    ) -> Self {
        let message = message.into();
        let payload = if message.is_empty() {
            None
        } else {
            Some(Value::str(message))
        };
        Exception::from_object(ExceptionObject { kind, payload })
    }

    pub fn from_object(object: ExceptionObject) -> Self {
        Self::from_shared(Arc::new(object))
    }

    pub fn from_shared(object: Arc<ExceptionObject>) -> Self {
        Self {
            object,
            traceback: Vec::new(),
        }
    }

    pub fn kind(&self) -> ExceptionKind {
        self.object.kind
    }

    pub fn is(
        &self,
        kind: ExceptionKind,
    ) -> bool {
        self.kind().is_subclass_of(kind)
    }

    /// `Kind: message`, or just `Kind` without a message
    pub fn summary(&self) -> String {
        let message = self.object.message();
        if message.is_empty() {
            self.kind().name().to_string()
        } else {
            format!("{}: {}", self.kind().name(), message)
        }
    }

    pub(crate) fn push_frame(
        &mut self,
        frame: TraceFrame,
    ) {
        self.traceback.push(frame);
    }

    /// Render a full traceback, most recent call last
    pub fn render(&self) -> String {
        let mut out = String::new();
        if !self.traceback.is_empty() {
            out.push_str("Traceback (most recent call last):\n");
            for frame in self.traceback.iter().rev() {
                let _ = writeln!(
                    out,
                    "  File \"{}\", line {}, in {}",
                    SNIPPET_NAME, frame.line, frame.name
                );
                if let Some(text) = line_text(&frame.source, frame.line) {
                    let _ = writeln!(out, "    {}", text.trim());
                }
            }
        }
        out.push_str(&self.summary());
        out.push('\n');
        out
    }
}

// Constructors for the common error kinds
impl Exception {
    pub fn type_error(message: impl Into<String>) -> Self {
        Exception::new(ExceptionKind::TypeError, message)
    }

    pub fn value_error(message: impl Into<String>) -> Self {
        Exception::new(ExceptionKind::ValueError, message)
    }

    pub fn name_error(name: &str) -> Self {
        Exception::new(
            ExceptionKind::NameError,
            format!("name '{}' is not defined", name),
        )
    }

    pub fn index_error(message: impl Into<String>) -> Self {
        Exception::new(ExceptionKind::IndexError, message)
    }

    pub fn zero_division(message: impl Into<String>) -> Self {
        Exception::new(ExceptionKind::ZeroDivisionError, message)
    }

    pub fn overflow() -> Self {
        Exception::new(ExceptionKind::OverflowError, "integer overflow")
    }

    pub fn memory_error() -> Self {
        Exception::new(ExceptionKind::MemoryError, "")
    }

    pub fn attribute_error(
        value: &Value,
        name: &str,
    ) -> Self {
        Exception::new(
            ExceptionKind::AttributeError,
            format!("'{}' object has no attribute '{}'", value.type_name(), name),
        )
    }
}
