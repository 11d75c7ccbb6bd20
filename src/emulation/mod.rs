//! Partial JVM bytecode emulation.
//!
//! This module executes the decryption routines obfuscators embed in the classes they
//! protect. It is not a virtual machine: it models exactly the subset of the JVM such
//! routines are observed to touch, and fails closed on everything else.
//!
//! # Architecture
//!
//! - Runtime values ([`JavaValue`]) and the host payloads of heap objects ([`HostObject`])
//! - Memory model: [`Heap`], [`OperandStack`], [`LocalVariables`]
//! - Execution engine: [`Context`] and the [`MethodExecutor`] interpreter
//! - Call resolution through a [`ProviderChain`] of native stubs, comparison rules and
//!   recursive interpretation of program-defined methods
//! - Resource ceilings in [`EmulationLimits`]
//!
//! # Usage Examples
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use jvmscope::{
//!     assembly::InstructionAssembler,
//!     emulation::{Context, MethodExecutor, ProviderChain},
//!     metadata::{ClassDictionary, ClassFile, MethodAccessFlags, MethodDef},
//! };
//!
//! let mut asm = InstructionAssembler::new();
//! asm.aload(0)
//!     .invokevirtual("java/lang/String", "trim", "()Ljava/lang/String;")
//!     .areturn();
//! let method = MethodDef::new(
//!     "decrypt",
//!     "(Ljava/lang/String;)Ljava/lang/String;",
//!     MethodAccessFlags::STATIC,
//!     asm.finish()?,
//! );
//! let class = ClassFile::new("a/A").with_method(method.clone());
//!
//! let dictionary = Arc::new(ClassDictionary::new());
//! let chain = Arc::new(ProviderChain::jdk(Arc::clone(&dictionary))?);
//! let mut context = Context::new(chain, dictionary);
//!
//! let input = context.heap_mut().alloc_str("  secret  ")?;
//! let output = MethodExecutor::execute(&class, &method, vec![input], None, &mut context)?;
//! assert_eq!(context.heap().rust_string(output)?, "secret");
//! # Ok::<(), jvmscope::Error>(())
//! ```
//!
//! # Execution Limits
//!
//! - **Instruction limit**: steps charged across every frame of one emulation
//! - **Call depth limit**: synthetic call frames on the [`Context`]
//! - **Stack limit**: operand stack depth of each frame
//! - **Heap limit**: objects allocated on one [`Heap`]
//!
//! # Thread Safety
//!
//! A [`Context`] belongs to one emulation and is never shared. The [`ProviderChain`] and
//! the [`crate::metadata::ClassDictionary`] are immutable once built and are shared
//! across threads behind an `Arc`.

mod config;
mod engine;
mod memory;
pub mod runtime;
mod value;

pub use config::EmulationLimits;

pub use value::{
    ByteSink, ByteSource, CodeLocation, DigestAlgorithm, HandleKind, HeapRef, HostObject,
    HostView, JavaArray, JavaCallSite, JavaClass, JavaCollection, JavaConstantPool, JavaField,
    JavaInstance, JavaIterator, JavaMessageDigest, JavaMethod, JavaMethodHandle,
    JavaMethodType, JavaPattern, JavaStringBuilder, JavaThrowable, JavaValue, ZipEntryInfo,
    ZipStream,
};

pub use memory::{shuffle, Heap, HeapObject, LocalVariables, ObjectState, OperandStack, StackEntry};

pub use engine::{Context, EmulationError, FaultKind, MethodExecutor, StackFrame};

pub use runtime::provider::{
    ComparisonProvider, InvokeKind, MappedMethodProvider, MethodCall, MethodKey, NativeCatalog,
    NativeFn, NativeMethodProvider, Provider, ProviderChain, ProviderChainBuilder,
    ProviderOutcome,
};
