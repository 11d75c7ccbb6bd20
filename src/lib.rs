// Copyright 2025 Johann Kempter
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// SPDX-License-Identifier: Apache-2.0

#![doc(html_no_source)]
#![deny(missing_docs)]
#![allow(clippy::too_many_arguments)]
#![deny(unsafe_code)]

//! # jvmscope
//!
//! A partial JVM bytecode interpreter for neutralizing string encryption in obfuscated
//! class files. Built in pure Rust, `jvmscope` executes the obfuscator's own decryption
//! routines, with a catalog of JDK stand-ins beneath them, and folds the results back
//! into the program as plain string constants.
//!
//! ## Features
//!
//! - **Value-level interpreter** - The full JVM instruction set apart from exception handling and `invokedynamic`
//! - **Bounded execution** - Step, call-depth, stack and heap budgets on every run
//! - **Layered method resolution** - Native stubs, reference comparisons and program code behind one chain
//! - **Provenance analysis** - Proves which call arguments are constant-pool literals
//! - **Parallel rewriting** - Classes are processed on the rayon thread pool
//!
//! ## Quick Start
//!
//! ### Using the Prelude
//!
//! ```rust
//! use jvmscope::prelude::*;
//!
//! let mut asm = InstructionAssembler::new();
//! asm.iconst(6).iconst(7).op(Opcode::Imul).ireturn();
//! let class = ClassFile::new("demo/Math").with_method(MethodDef::new(
//!     "answer",
//!     "()I",
//!     MethodAccessFlags::STATIC,
//!     asm.finish()?,
//! ));
//!
//! let classes: Arc<ClassDictionary> = Arc::new(std::iter::once(class.clone()).collect());
//! let chain = Arc::new(ProviderChain::jdk(classes.clone())?);
//! let mut context = Context::new(chain, classes);
//!
//! let method = class.method("answer", "()I").ok_or(Error::Empty)?;
//! let result = MethodExecutor::execute(&class, method, Vec::new(), None, &mut context)?;
//! assert_eq!(result, JavaValue::Int(42));
//! # Ok::<(), jvmscope::Error>(())
//! ```
//!
//! ### String Decryption
//!
//! ```rust,no_run
//! use jvmscope::{
//!     deobfuscation::{AllatoriObfuscator, DecryptionConfig},
//!     metadata::ClassFile,
//! };
//!
//! # fn load() -> Vec<ClassFile> { Vec::new() }
//! let mut classes = load();
//! let config = DecryptionConfig::default().with_file("app.jar");
//! let summary = AllatoriObfuscator::new().deobfuscate(&mut classes, config)?;
//! println!("{summary}");
//! # Ok::<(), jvmscope::Error>(())
//! ```
//!
//! ## Architecture
//!
//! - [`metadata`] - Class, method and field model, and the [`metadata::ClassDictionary`]
//! - [`assembly`] - Instructions, method bodies and the label-based assembler
//! - [`emulation`] - Values, heap, execution context, provider chain and interpreter
//! - [`analysis`] - Operand-stack provenance analysis
//! - [`deobfuscation`] - Obfuscator recognition and the decryption pass
//!
//! ## Logging
//!
//! `jvmscope` logs through the [`log`](https://docs.rs/log) facade: one `info` line per
//! pass, `warn` for every call site that could not be decrypted, `debug` for each
//! decrypted one and `trace` for interpreter and analyzer internals. Install any logger
//! (for example `env_logger`) to see them.

#[macro_use]
pub(crate) mod error;
pub(crate) mod utils;

/// Shared functionality which is used in unit- and integration-tests
#[cfg(test)]
pub(crate) mod test;

/// Convenient re-exports of the most commonly used types and traits.
///
/// # Example
///
/// ```rust
/// use jvmscope::prelude::*;
///
/// let limits = EmulationLimits::decryption();
/// let config = DecryptionConfig::default().with_limits(limits);
/// assert!(config.parallel);
/// ```
pub mod prelude;

/// Class model: classes, members, descriptors and the class dictionary.
pub mod metadata;

/// JVM instructions and method bodies.
pub mod assembly;

/// Bytecode interpreter with its value model, heap and method providers.
pub mod emulation;

/// Static analysis of method bodies.
pub mod analysis;

/// Obfuscator-specific passes built on analysis and emulation.
pub mod deobfuscation;

/// `jvmscope` Result type
///
/// A type alias for [`std::result::Result<T, Error>`] where the error type is always [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// `jvmscope` Error type
///
/// The main error type for all operations in this crate. Interpreter faults arrive as
/// [`Error::Emulation`] and keep their [`emulation::FaultKind`].
///
/// # Examples
///
/// ```rust
/// use jvmscope::{emulation::{EmulationError, FaultKind}, Error};
///
/// let error: Error = EmulationError::DivisionByZero.into();
/// match &error {
///     Error::Emulation(inner) => println!("Fault: {inner}"),
///     Error::Malformed { message, .. } => println!("Malformed: {message}"),
///     other => println!("Error: {other}"),
/// }
/// assert_eq!(error.fault_kind(), Some(FaultKind::Runtime));
/// ```
pub use error::Error;
