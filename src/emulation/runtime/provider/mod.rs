//! Method, comparison and type-check resolution.
//!
//! Every `invoke*`, `if_acmp*`, `checkcast` and `instanceof` the interpreter executes is
//! answered by a [`ProviderChain`]: an ordered list of [`Provider`] implementations queried
//! first-match-wins. Three providers ship with the crate:
//!
//! - [`NativeMethodProvider`] - a fixed catalog of JDK method stubs keyed by owner and
//!   signature, with no overload or inheritance fallback
//! - [`ComparisonProvider`] - reference equality and instance-of checks for JDK objects
//! - [`MappedMethodProvider`] - recursive interpretation of methods defined by the program
//!   being analyzed, plus instance-of checks along its class hierarchy
//!
//! A provider that answers `can_invoke` with `true` is authoritative: its result or fault
//! is final and later providers are not consulted.

mod chain;
mod comparison;
mod mapped;
mod native;

pub use chain::{ProviderChain, ProviderChainBuilder};
pub use comparison::ComparisonProvider;
pub use mapped::MappedMethodProvider;
pub use native::{MethodKey, NativeCatalog, NativeFn, NativeMethodProvider};

use crate::{
    emulation::{Context, EmulationError, JavaValue},
    Result,
};

/// How a call site invokes its target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvokeKind {
    /// `invokestatic`
    Static,
    /// `invokevirtual`
    Virtual,
    /// `invokespecial` (constructors, private and super calls)
    Special,
    /// `invokeinterface`
    Interface,
}

/// A resolved call site with its evaluated arguments.
#[derive(Debug, Clone)]
pub struct MethodCall<'a> {
    /// Internal name of the owner named by the call site
    pub owner: &'a str,
    /// Method name
    pub name: &'a str,
    /// Method descriptor
    pub descriptor: &'a str,
    /// Invocation kind
    pub kind: InvokeKind,
    /// Receiver for instance calls
    pub receiver: Option<JavaValue>,
    /// Arguments in declaration order
    pub args: &'a [JavaValue],
}

impl<'a> MethodCall<'a> {
    /// Creates a static call.
    #[must_use]
    pub fn new_static(owner: &'a str, name: &'a str, descriptor: &'a str, args: &'a [JavaValue]) -> Self {
        MethodCall {
            owner,
            name,
            descriptor,
            kind: InvokeKind::Static,
            receiver: None,
            args,
        }
    }

    /// Creates an instance call.
    #[must_use]
    pub fn new_instance(
        kind: InvokeKind,
        owner: &'a str,
        name: &'a str,
        descriptor: &'a str,
        receiver: JavaValue,
        args: &'a [JavaValue],
    ) -> Self {
        MethodCall {
            owner,
            name,
            descriptor,
            kind,
            receiver: Some(receiver),
            args,
        }
    }

    /// Name followed by descriptor.
    #[must_use]
    pub fn signature(&self) -> String {
        format!("{}{}", self.name, self.descriptor)
    }

    /// `true` for `<init>` calls.
    #[must_use]
    pub fn is_constructor(&self) -> bool {
        self.name == "<init>"
    }

    /// The receiver of an instance call.
    ///
    /// # Errors
    /// Returns a type fault for static calls.
    pub fn this(&self) -> Result<JavaValue> {
        self.receiver.ok_or_else(|| {
            EmulationError::TypeMismatch {
                operation: "receiver",
                expected: "instance call",
                found: "static call",
            }
            .into()
        })
    }

    /// Argument `index`.
    ///
    /// # Errors
    /// Returns an out-of-bounds fault.
    pub fn arg(&self, index: usize) -> Result<JavaValue> {
        self.args.get(index).copied().ok_or_else(|| {
            EmulationError::ArgumentIndexOutOfBounds {
                index,
                count: self.args.len(),
            }
            .into()
        })
    }

    /// The fault raised when no provider handles this call.
    #[must_use]
    pub fn unresolved(&self) -> crate::Error {
        EmulationError::UnresolvedMethod {
            owner: self.owner.to_string(),
            name: self.name.to_string(),
            descriptor: self.descriptor.to_string(),
        }
        .into()
    }
}

/// Result of offering a call to the chain.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ProviderOutcome {
    /// A provider handled the call; `JavaValue::Void` for `void` methods.
    Handled(JavaValue),
    /// No provider claims the call.
    NotApplicable,
}

/// A source of method, comparison and type-check semantics.
///
/// All capabilities default to "not handled", so a provider implements only what it
/// knows. `can_*` queries must be cheap and side-effect free; the matching action is
/// called only after its query returned `true`.
pub trait Provider: Send + Sync {
    /// Name used in diagnostics.
    fn name(&self) -> &'static str;

    /// `true` if this provider implements the call.
    fn can_invoke(&self, _call: &MethodCall<'_>, _context: &Context) -> bool {
        false
    }

    /// Performs the call.
    ///
    /// # Errors
    /// Any fault raised while performing the call.
    fn invoke(&self, call: &MethodCall<'_>, _context: &mut Context) -> Result<JavaValue> {
        Err(call.unresolved())
    }

    /// `true` if this provider can decide reference equality of the two values.
    fn can_compare(&self, _first: JavaValue, _second: JavaValue, _context: &Context) -> bool {
        false
    }

    /// Decides reference equality.
    ///
    /// # Errors
    /// Any fault raised while comparing.
    fn compare(&self, first: JavaValue, second: JavaValue, context: &Context) -> Result<bool> {
        Err(unresolved_comparison(first, second, context))
    }

    /// `true` if this provider can answer `value instanceof target`.
    fn can_check_instance_of(&self, _value: JavaValue, _target: &str, _context: &Context) -> bool {
        false
    }

    /// Answers `value instanceof target`.
    ///
    /// # Errors
    /// Any fault raised while checking.
    fn instance_of(&self, value: JavaValue, target: &str, context: &Context) -> Result<bool> {
        Err(unresolved_instance_of(value, target, context))
    }

    /// Native method keys this provider registers, used to reject duplicates across
    /// providers when a chain is built.
    fn native_keys(&self) -> Vec<MethodKey> {
        Vec::new()
    }
}

pub(crate) fn describe(value: JavaValue, context: &Context) -> String {
    match value {
        JavaValue::Reference(_) => context
            .heap()
            .class_name(value)
            .map_or_else(|_| value.type_name().to_string(), ToString::to_string),
        other => other.type_name().to_string(),
    }
}

pub(crate) fn unresolved_comparison(first: JavaValue, second: JavaValue, context: &Context) -> crate::Error {
    EmulationError::UnresolvedComparison {
        first: describe(first, context),
        second: describe(second, context),
    }
    .into()
}

pub(crate) fn unresolved_instance_of(value: JavaValue, target: &str, context: &Context) -> crate::Error {
    EmulationError::UnresolvedInstanceOf {
        class_name: describe(value, context),
        target: target.to_string(),
    }
    .into()
}
