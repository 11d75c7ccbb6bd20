//! Execution engine: per-emulation state, the fault taxonomy and the interpreter.
//!
//! - [`Context`] - call-stack emulation, class-initialization tracking, heap and statics
//! - [`EmulationError`] / [`FaultKind`] - every way an emulation can stop
//! - [`MethodExecutor`] - the bytecode interpreter

mod context;
mod error;
mod interpreter;

pub use context::{Context, StackFrame};
pub use error::{EmulationError, FaultKind};
pub use interpreter::MethodExecutor;
