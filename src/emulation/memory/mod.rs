//! Memory model of the interpreter.
//!
//! - [`Heap`] - Per-context object storage with the two-phase object lifecycle
//! - [`OperandStack`] - Operand stack of one frame, with category-aware shuffles
//! - [`LocalVariables`] - Local variable slots of one frame

mod heap;
mod locals;
mod stack;

pub use heap::{Heap, HeapObject, ObjectState};
pub use locals::LocalVariables;
pub use stack::{shuffle, OperandStack, StackEntry};
