//! pyrelay: a concurrent snippet execution kernel
//!
//! Snippets of a small Python-flavoured language run on their own threads
//! against caller-owned namespaces. Everything a snippet prints, and every
//! line it reads, travels through the session channel it was submitted on.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use pyrelay::kernel::{Kernel, MemorySink, Multiplexer};
//! use pyrelay::util::config::KernelConfig;
//!
//! let mux = Arc::new(Multiplexer::new());
//! let sink = MemorySink::new();
//! mux.open_channel("session".into(), sink.clone());
//!
//! let kernel = Kernel::with_multiplexer(KernelConfig::default(), mux);
//! let ns = kernel.new_namespace();
//! kernel.submit("x = 1", &"session".into(), &ns)?.join();
//! kernel.submit("print(x)", &"session".into(), &ns)?.join();
//! assert_eq!(sink.output(), "1\n");
//! # Ok::<(), pyrelay::kernel::KernelError>(())
//! ```

#![doc(html_root_url = "https://docs.rs/pyrelay")]
#![warn(rust_2018_idioms)]

pub mod frontend;
pub mod kernel;
pub mod runtime;

// Utility modules
pub mod util;

// Re-exports
pub use anyhow::{Context, Result};
pub use kernel::{ChannelId, Kernel, KernelError, TaskHandle, TaskStatus};
pub use runtime::{Namespace, NamespacePolicy};

use ::std::fs;
use ::std::path::Path;
use ::std::sync::Arc;

use tracing::debug;

use kernel::{ConsoleSink, Multiplexer};
use util::config::KernelConfig;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = "pyrelay";

/// Run a snippet to completion in a fresh namespace, printing to the host
/// console. Input reads see end of input.
pub fn run(source: &str) -> Result<TaskStatus> {
    debug!("run called with {} bytes", source.len());
    let mux = Arc::new(Multiplexer::new());
    let channel = ChannelId::from("main");
    mux.open_channel(channel.clone(), ConsoleSink::new());
    mux.close_input(&channel);

    let kernel = Kernel::with_multiplexer(KernelConfig::default(), mux);
    let namespace = kernel.new_namespace();
    let handle = kernel
        .submit(source, &channel, &namespace)
        .context("Failed to start task")?;
    Ok(handle.join())
}

/// Run a source file
pub fn run_file(path: &Path) -> Result<TaskStatus> {
    debug!("reading {}", path.display());
    let source = fs::read_to_string(path)
        .with_context(|| format!("Failed to read file: {}", path.display()))?;
    run(&source)
}
