//! # jvmscope Prelude
//!
//! This module provides a convenient prelude for the most commonly used types and traits
//! from the jvmscope library. Import this module to get quick access to the types needed
//! to build classes, run methods and decrypt strings.

// ================================================================================================
// Core Types and Error Handling
// ================================================================================================

/// The main error type for all jvmscope operations
pub use crate::Error;

/// The result type used throughout jvmscope
pub use crate::Result;

pub use std::sync::Arc;

// ================================================================================================
// Class Model
// ================================================================================================

pub use crate::metadata::{
    ClassAccessFlags, ClassDictionary, ClassFile, ClassFileRc, FieldAccessFlags, FieldDef,
    MethodAccessFlags, MethodDef, MethodDescriptor,
};

pub use crate::assembly::{
    Constant, Instruction, InstructionAssembler, MemberRef, MethodBody, Opcode, Operand,
};

// ================================================================================================
// Emulation
// ================================================================================================

pub use crate::emulation::{
    Context, EmulationError, EmulationLimits, FaultKind, JavaValue, MethodExecutor, Provider,
    ProviderChain, StackFrame,
};

// ================================================================================================
// Analysis and Deobfuscation
// ================================================================================================

pub use crate::analysis::{Frame, FrameKind, MethodAnalyzer};

pub use crate::deobfuscation::{
    AllatoriObfuscator, DecryptionConfig, DecryptionPass, DecryptionSummary, Obfuscator,
};
