//! Runtime system
//!
//! Values, namespaces and the tree-walking interpreter that executes a
//! [`CompiledUnit`](crate::frontend::CompiledUnit) against a namespace.

pub mod builtins;
pub mod exception;
pub mod interp;
pub mod io;
pub mod namespace;
pub mod ops;
pub mod value;

pub use exception::{Exception, ExceptionKind};
pub use interp::{Interpreter, Limits};
pub use io::{GuestIo, StreamError, StreamRole};
pub use namespace::{Namespace, NamespacePolicy};
pub use value::Value;

use crate::frontend::CompiledUnit;

/// Execute a compiled unit in place against `namespace`
pub fn execute(
    unit: &CompiledUnit,
    namespace: &Namespace,
    io: &dyn GuestIo,
    limits: Limits,
) -> Result<(), Exception> {
    tracing::trace!(
        "executing {} statements against {} bindings",
        unit.body().len(),
        namespace.len()
    );
    Interpreter::new(namespace, io, limits).run(unit)
}
