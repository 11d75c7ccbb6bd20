use thiserror::Error;

use crate::emulation::{EmulationError, FaultKind};

macro_rules! malformed_error {
    // Single string version
    ($msg:expr) => {
        crate::Error::Malformed {
            message: $msg.to_string(),
            file: file!(),
            line: line!(),
        }
    };

    // Format string with arguments version
    ($fmt:expr, $($arg:tt)*) => {
        crate::Error::Malformed {
            message: format!($fmt, $($arg)*),
            file: file!(),
            line: line!(),
        }
    };
}

/// The generic Error type, which provides coverage for all errors this library can potentially
/// return.
///
/// Errors fall into three groups. Structural problems with the in-memory class model (bad
/// descriptors, unresolved assembler labels, corrupt archives) surface as [`Error::Malformed`].
/// Problems with how the library itself was assembled, such as a provider chain with two
/// native methods registered under the same key, surface as [`Error::Configuration`].
/// Everything that goes wrong while bytecode is being interpreted is an [`Error::Emulation`],
/// which carries an [`EmulationError`] and can be classified through [`Error::fault_kind`].
///
/// # Error Categories
///
/// ## Model Errors
/// - [`Error::Malformed`] - Corrupted or invalid class, method or archive structure
/// - [`Error::OutOfBounds`] - Attempted to read beyond the end of a buffer
/// - [`Error::Empty`] - Empty input provided
///
/// ## I/O and External Errors
/// - [`Error::FileError`] - Filesystem I/O errors
///
/// ## Assembly Errors
/// - [`Error::DuplicateLabel`] - A label was defined twice
/// - [`Error::UndefinedLabel`] - A branch targets a label that was never defined
/// - [`Error::Configuration`] - Invalid provider chain or pass configuration, including
///   native method keys registered twice
///
/// ## Execution Errors
/// - [`Error::Emulation`] - A fault raised by the interpreter or one of its providers
///
/// # Examples
///
/// ```rust
/// use jvmscope::{Error, emulation::FaultKind};
///
/// fn describe(error: &Error) -> &'static str {
///     match error.fault_kind() {
///         Some(FaultKind::UnresolvedMember) => "missing native",
///         Some(FaultKind::StepBudget) => "did not terminate",
///         Some(_) => "emulation fault",
///         None => "not an emulation fault",
///     }
/// }
/// ```
#[derive(Error, Debug)]
pub enum Error {
    /// The class model is damaged and could not be processed.
    ///
    /// The error includes the source location where the malformation was detected
    /// for debugging purposes.
    ///
    /// # Fields
    ///
    /// * `message` - Detailed description of what was malformed
    /// * `file` - Source file where the error was detected
    /// * `line` - Source line where the error was detected
    #[error("Malformed - {file}:{line}: {message}")]
    Malformed {
        /// The message to be printed for the Malformed error
        message: String,
        /// The source file in which this error occured
        file: &'static str,
        /// The source line in which this error occured
        line: u32,
    },

    /// An out of bound access was attempted while reading a buffer.
    #[error("Out of Bound read would have occurred!")]
    OutOfBounds,

    /// Provided input was empty.
    #[error("Provided input was empty")]
    Empty,

    /// File I/O error.
    ///
    /// Wraps standard I/O errors that can occur while native stubs read from
    /// the originating file, such as missing files or permission issues.
    #[error("{0}")]
    FileError(#[from] std::io::Error),

    /// Generic error for miscellaneous failures.
    #[error("{0}")]
    Error(String),

    /// A label was defined more than once while assembling a method body.
    #[error("Duplicate label - {0}")]
    DuplicateLabel(String),

    /// A branch refers to a label that was never defined.
    #[error("Undefined label - {0}")]
    UndefinedLabel(String),

    /// The library was assembled with an invalid configuration.
    ///
    /// Raised by builders, for example when a provider chain is built without
    /// any provider or a decryption pass is given a zero step budget.
    #[error("Invalid configuration - {0}")]
    Configuration(String),

    /// Bytecode emulation failed.
    ///
    /// Carries the precise fault raised by the interpreter, the provider chain,
    /// or a native stub.
    #[error("Emulation failed - {0}")]
    Emulation(#[from] EmulationError),
}

impl Error {
    /// Returns the fault classification if this error was raised during emulation.
    #[must_use]
    pub fn fault_kind(&self) -> Option<FaultKind> {
        match self {
            Error::Emulation(error) => Some(error.kind()),
            _ => None,
        }
    }

    /// Returns the wrapped emulation fault, if any.
    #[must_use]
    pub fn as_emulation(&self) -> Option<&EmulationError> {
        match self {
            Error::Emulation(error) => Some(error),
            _ => None,
        }
    }
}
