//! JVM instruction model and method body construction.
//!
//! This module holds the decoded form of JVM bytecode that the rest of the crate works on.
//! It does not parse class files; a class file reader produces these types, and tests and
//! tools build them directly through [`InstructionAssembler`].
//!
//! # Key Components
//!
//! - [`Opcode`] - Normalized JVM opcodes with their mnemonics
//! - [`Instruction`] / [`Operand`] - A decoded instruction and its operand
//! - [`Constant`] / [`MemberRef`] - Constant pool values and symbolic member references
//! - [`MethodBody`] - Ordered instruction list with index-based branch targets
//! - [`InstructionAssembler`] - Label-based builder for method bodies

mod body;
mod encoder;
mod instruction;
mod opcodes;

pub use body::MethodBody;
pub use encoder::InstructionAssembler;
pub use instruction::{ArrayType, Constant, Instruction, MemberRef, Operand};
pub use opcodes::Opcode;
