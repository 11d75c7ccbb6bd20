//! Configuration of the decryption pass.

use std::path::PathBuf;

use crate::emulation::EmulationLimits;

/// Descriptor of Allatori's string decryption routines.
pub const ALLATORI_DECRYPTOR_DESCRIPTOR: &str = "(Ljava/lang/String;)Ljava/lang/String;";

/// Configuration for [`crate::deobfuscation::DecryptionPass`].
///
/// # Example
///
/// ```rust
/// use jvmscope::{deobfuscation::DecryptionConfig, emulation::EmulationLimits};
///
/// let config = DecryptionConfig::default()
///     .with_limits(EmulationLimits::new().with_max_instructions(100_000))
///     .with_parallel(false);
/// assert_eq!(config.limits.max_instructions, 100_000);
/// ```
#[derive(Debug, Clone)]
pub struct DecryptionConfig {
    /// Descriptor a call must have to be treated as a decryptor call
    /// (default: [`ALLATORI_DECRYPTOR_DESCRIPTOR`]).
    pub decryptor_descriptor: String,

    /// Limits applied to each decryption attempt (default: [`EmulationLimits::decryption`]).
    pub limits: EmulationLimits,

    /// Process classes on the rayon thread pool (default: `true`).
    pub parallel: bool,

    /// Archive or class file the classes were read from, exposed to the native stubs
    /// that open the program's own code source.
    pub file: Option<PathBuf>,
}

impl Default for DecryptionConfig {
    fn default() -> Self {
        Self {
            decryptor_descriptor: ALLATORI_DECRYPTOR_DESCRIPTOR.to_string(),
            limits: EmulationLimits::decryption(),
            parallel: true,
            file: None,
        }
    }
}

impl DecryptionConfig {
    /// Sets the decryptor descriptor.
    #[must_use]
    pub fn with_descriptor(mut self, descriptor: impl Into<String>) -> Self {
        self.decryptor_descriptor = descriptor.into();
        self
    }

    /// Sets the per-attempt limits.
    #[must_use]
    pub fn with_limits(mut self, limits: EmulationLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Enables or disables parallel processing.
    #[must_use]
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Sets the originating file.
    #[must_use]
    pub fn with_file(mut self, file: impl Into<PathBuf>) -> Self {
        self.file = Some(file.into());
        self
    }
}
