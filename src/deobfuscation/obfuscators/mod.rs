//! Obfuscator-specific knowledge.
//!
//! The passes are generic; an [`Obfuscator`] tells them which call sites belong to it.

mod allatori;

pub use allatori::AllatoriObfuscator;

use crate::{
    assembly::MemberRef,
    metadata::{ClassDictionary, ClassFileRc},
};

/// Trait for handling a specific obfuscator.
///
/// # Example
///
/// ```rust
/// use jvmscope::{
///     assembly::MemberRef,
///     deobfuscation::Obfuscator,
///     metadata::{ClassDictionary, ClassFileRc},
/// };
///
/// struct Named(&'static str);
///
/// impl Obfuscator for Named {
///     fn id(&self) -> String { "named".to_string() }
///     fn name(&self) -> String { "Named".to_string() }
///
///     fn decryptor(&self, call: &MemberRef, classes: &ClassDictionary) -> Option<(ClassFileRc, usize)> {
///         if call.name != self.0 {
///             return None;
///         }
///         classes.method_with_body(&call.owner, &call.name, &call.descriptor)
///     }
/// }
/// ```
pub trait Obfuscator: Send + Sync {
    /// Unique lowercase identifier (e.g. "allatori").
    fn id(&self) -> String;

    /// Human-readable name used in logs.
    fn name(&self) -> String;

    /// The decryption routine `call` invokes, as its class and method index, or `None` if
    /// the call is not a decryptor call of this obfuscator.
    fn decryptor(&self, call: &MemberRef, classes: &ClassDictionary) -> Option<(ClassFileRc, usize)>;
}
