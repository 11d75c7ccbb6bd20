//! Deobfuscation of obfuscated JVM classes.
//!
//! The deobfuscation layer combines the two other halves of the crate: the
//! [`analysis`](crate::analysis) proves which call arguments are constants, and the
//! [`emulation`](crate::emulation) interpreter runs the obfuscator's own decryption
//! routines on them.
//!
//! ```text
//!  classes ──► MethodAnalyzer ──► literal call sites ──► Obfuscator::decryptor
//!                                                               │
//!                                                               ▼
//!  rewritten classes ◄── fold ldc, drop call ◄── MethodExecutor (fresh Context)
//! ```
//!
//! # Key Components
//!
//! - [`Obfuscator`] - Recognizes the decryptor calls of one obfuscator
//! - [`AllatoriObfuscator`] - Allatori string encryption
//! - [`DecryptionPass`] - The rewriting pass
//! - [`DecryptionConfig`] - Limits and options for a run
//! - [`DecryptionSummary`] - Per-decryptor record of decrypted, failed and skipped calls
//!
//! # Example
//!
//! ```rust,no_run
//! use jvmscope::{
//!     deobfuscation::{AllatoriObfuscator, DecryptionConfig},
//!     metadata::ClassFile,
//! };
//!
//! # fn load() -> Vec<ClassFile> { Vec::new() }
//! let mut classes = load();
//! let summary = AllatoriObfuscator::new().deobfuscate(&mut classes, DecryptionConfig::default())?;
//! for (decryptor, failure) in summary.failures() {
//!     eprintln!("{decryptor}: {} ({})", failure.site, failure.reason);
//! }
//! # Ok::<(), jvmscope::Error>(())
//! ```

mod config;
mod decryptors;
mod obfuscators;
mod passes;

pub use config::{DecryptionConfig, ALLATORI_DECRYPTOR_DESCRIPTOR};
pub use decryptors::{CallSite, DecryptedCall, DecryptionSummary, FailedCall, FailureReason};
pub use obfuscators::{AllatoriObfuscator, Obfuscator};
pub use passes::DecryptionPass;
