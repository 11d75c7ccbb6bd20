//! Allatori obfuscator support.
//!
//! Allatori hides string constants behind static helper methods of signature
//! `static String m(String)`. Every protected literal is replaced by its encrypted form
//! followed by a call to one of these helpers.
//!
//! # String Decryption
//!
//! The helpers derive part of their key from the call site: the caller's class and
//! method name, and the caller's constant pool size, all obtained through
//! `new Exception().getStackTrace()`. Some variants also read the program's own code
//! source. Decryption therefore runs the helper in the interpreter with an emulated
//! caller frame, see [`crate::deobfuscation::DecryptionPass`].
//!
//! | Variant | Key material |
//! |---------|--------------|
//! | String encryption "enable" | Caller class and method name |
//! | String encryption "maximum" | Caller frame plus constant pool size |
//!
//! Helpers are recognized purely by shape: a static method with a body, present in the
//! program, whose descriptor matches the configured decryptor descriptor.

use std::sync::Arc;

use crate::{
    assembly::MemberRef,
    deobfuscation::{
        obfuscators::Obfuscator, DecryptionConfig, DecryptionPass, DecryptionSummary,
    },
    metadata::{ClassDictionary, ClassFile, ClassFileRc},
    Result,
};

/// Allatori obfuscator implementation.
///
/// Stateless; the per-run results live in the [`DecryptionSummary`].
#[derive(Debug, Clone, Copy, Default)]
pub struct AllatoriObfuscator;

impl AllatoriObfuscator {
    /// Creates a new Allatori obfuscator instance.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Decrypts every Allatori-protected string literal in `classes`.
    ///
    /// # Errors
    /// Returns an error only if the emulation environment cannot be built or a rewrite
    /// produces an inconsistent body; per-call failures are reported in the summary.
    ///
    /// # Example
    ///
    /// ```rust
    /// use jvmscope::{
    ///     assembly::InstructionAssembler,
    ///     deobfuscation::{AllatoriObfuscator, DecryptionConfig},
    ///     metadata::{ClassFile, MethodAccessFlags, MethodDef},
    /// };
    ///
    /// let mut helper = InstructionAssembler::new();
    /// helper.aload(0).invokevirtual("java/lang/String", "trim", "()Ljava/lang/String;").areturn();
    ///
    /// let mut caller = InstructionAssembler::new();
    /// caller
    ///     .ldc_string("  hidden ")
    ///     .invokestatic("a/K", "d", "(Ljava/lang/String;)Ljava/lang/String;")
    ///     .areturn();
    ///
    /// let mut classes = vec![
    ///     ClassFile::new("a/K").with_method(MethodDef::new(
    ///         "d",
    ///         "(Ljava/lang/String;)Ljava/lang/String;",
    ///         MethodAccessFlags::STATIC,
    ///         helper.finish()?,
    ///     )),
    ///     ClassFile::new("a/Main").with_method(MethodDef::new(
    ///         "get",
    ///         "()Ljava/lang/String;",
    ///         MethodAccessFlags::STATIC,
    ///         caller.finish()?,
    ///     )),
    /// ];
    ///
    /// let summary = AllatoriObfuscator::new().deobfuscate(&mut classes, DecryptionConfig::default())?;
    /// assert_eq!(summary.decrypted_count(), 1);
    /// # Ok::<(), jvmscope::Error>(())
    /// ```
    pub fn deobfuscate(
        &self,
        classes: &mut [ClassFile],
        config: DecryptionConfig,
    ) -> Result<DecryptionSummary> {
        let pass = DecryptionPass::new(Arc::new(*self), config);
        pass.run(classes)?;
        Ok(pass.into_summary())
    }
}

impl Obfuscator for AllatoriObfuscator {
    fn id(&self) -> String {
        "allatori".to_string()
    }

    fn name(&self) -> String {
        "Allatori".to_string()
    }

    fn decryptor(&self, call: &MemberRef, classes: &ClassDictionary) -> Option<(ClassFileRc, usize)> {
        let (class, index) = classes.method_with_body(&call.owner, &call.name, &call.descriptor)?;
        let method = class.methods.get(index)?;
        method.is_static().then_some((class, index))
    }
}
