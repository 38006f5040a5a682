//! Guest I/O seam
//!
//! The interpreter never touches host streams. Every `print`, `input` and
//! `sys.stdout.write` goes through the [`GuestIo`] handed to it for the run.

use std::fmt;

/// Standard stream role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamRole {
    Input,
    Output,
    Error,
}

impl StreamRole {
    pub const ALL: [StreamRole; 3] = [StreamRole::Input, StreamRole::Output, StreamRole::Error];

    /// Name of the matching `sys` attribute
    pub fn sys_name(self) -> &'static str {
        match self {
            StreamRole::Input => "stdin",
            StreamRole::Output => "stdout",
            StreamRole::Error => "stderr",
        }
    }
}

impl fmt::Display for StreamRole {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(f, "{}", self.sys_name())
    }
}

/// Why a read did not produce a line
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StreamError {
    #[error("no channel is bound to this context")]
    Unbound,
    #[error("read interrupted by cancellation")]
    Cancelled,
}

/// Stream access for one execution
pub trait GuestIo {
    /// Append text to the output or error stream
    fn write(
        &self,
        role: StreamRole,
        data: &str,
    );

    /// Block for the next input line; `Ok(None)` is end of input
    fn read_line(&self) -> Result<Option<String>, StreamError>;

    /// True once the run has been asked to stop
    fn is_cancelled(&self) -> bool;
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use parking_lot::Mutex;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicBool, Ordering};

    /// In-memory I/O for interpreter tests
    #[derive(Default)]
    pub struct CaptureIo {
        pub out: Mutex<String>,
        pub err: Mutex<String>,
        pub input: Mutex<VecDeque<String>>,
        pub cancelled: AtomicBool,
    }

    impl CaptureIo {
        pub fn with_input(lines: &[&str]) -> Self {
            let io = CaptureIo::default();
            io.input
                .lock()
                .extend(lines.iter().map(|l| format!("{}\n", l)));
            io
        }

        pub fn out(&self) -> String {
            self.out.lock().clone()
        }

        pub fn err(&self) -> String {
            self.err.lock().clone()
        }

        pub fn cancel(&self) {
            self.cancelled.store(true, Ordering::SeqCst);
        }
    }

    impl GuestIo for CaptureIo {
        fn write(
            &self,
            role: StreamRole,
            data: &str,
        ) {
            match role {
                StreamRole::Error => self.err.lock().push_str(data),
                _ => self.out.lock().push_str(data),
            }
        }

        fn read_line(&self) -> Result<Option<String>, StreamError> {
            Ok(self.input.lock().pop_front())
        }

        fn is_cancelled(&self) -> bool {
            self.cancelled.load(Ordering::SeqCst)
        }
    }
}
