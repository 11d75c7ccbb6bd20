//! Emulation error types and result handling.
//!
//! This module defines the faults that can occur while interpreting JVM bytecode,
//! and the coarse [`FaultKind`] classification callers use to decide how to react.

use std::fmt;

use crate::assembly::Opcode;

/// Coarse classification of an [`EmulationError`].
///
/// | Kind               | Meaning                                                     |
/// |--------------------|-------------------------------------------------------------|
/// | `UnresolvedMember` | No provider handles a call, field, class or type query     |
/// | `Type`             | A value had the wrong shape for the operation              |
/// | `State`            | A value or the call stack was in the wrong lifecycle state |
/// | `StepBudget`       | A step, call depth or allocation ceiling was hit           |
/// | `Host`             | A native stub failed on the host side                      |
/// | `Runtime`          | The program itself would have thrown                       |
/// | `Unsupported`      | The instruction or body is outside the modeled subset      |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FaultKind {
    /// No provider resolves the requested member or capability.
    UnresolvedMember,
    /// Operand or payload type mismatch.
    Type,
    /// Invalid lifecycle state (uninitialized value, double initialization, empty call stack).
    State,
    /// A resource ceiling was reached.
    StepBudget,
    /// Host-side failure inside a native stub.
    Host,
    /// A JVM runtime exception the interpreted code would have raised.
    Runtime,
    /// Opcode or body shape not modeled by the interpreter.
    Unsupported,
}

impl fmt::Display for FaultKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FaultKind::UnresolvedMember => "unresolved member",
            FaultKind::Type => "type fault",
            FaultKind::State => "state fault",
            FaultKind::StepBudget => "step budget exhausted",
            FaultKind::Host => "host failure",
            FaultKind::Runtime => "runtime exception",
            FaultKind::Unsupported => "unsupported",
        };
        f.write_str(name)
    }
}

/// Errors that can occur during JVM bytecode emulation.
#[derive(Debug, Clone, PartialEq)]
pub enum EmulationError {
    /// Operand stack underflow (pop from empty stack).
    StackUnderflow,
    /// Operand stack grew past its limit.
    StackOverflow {
        /// Maximum allowed depth.
        limit: usize,
    },
    /// A stack shuffle would split a category-2 value.
    StackShapeMismatch {
        /// Instruction mnemonic.
        instruction: &'static str,
    },
    /// Synthetic call stack underflow (pop with no frame).
    CallStackUnderflow,
    /// Local variable index out of bounds.
    LocalIndexOutOfBounds {
        /// The requested index.
        index: usize,
        /// Number of locals available.
        count: usize,
    },
    /// Argument index out of bounds in a provider call.
    ArgumentIndexOutOfBounds {
        /// The requested index.
        index: usize,
        /// Number of arguments available.
        count: usize,
    },
    /// Number of arguments does not match the method descriptor.
    ArgumentCountMismatch {
        /// Parameters declared by the descriptor.
        expected: usize,
        /// Arguments supplied.
        found: usize,
    },
    /// Value type mismatch in an operation.
    TypeMismatch {
        /// Operation being performed.
        operation: &'static str,
        /// Expected type.
        expected: &'static str,
        /// Actual type found.
        found: &'static str,
    },
    /// Heap object payload mismatch when narrowing to a host type.
    HeapTypeMismatch {
        /// Expected payload kind.
        expected: &'static str,
        /// Actual payload kind.
        found: &'static str,
    },
    /// A constructor was applied to an object of a different declared type.
    ConstructorTypeMismatch {
        /// Type the constructor builds.
        expected: String,
        /// Declared type of the receiver.
        found: String,
    },
    /// Payload read of an object whose constructor has not run.
    UninitializedObject {
        /// Declared type of the object.
        class_name: String,
    },
    /// Second initialization of an already constructed object.
    AlreadyInitialized {
        /// Declared type of the object.
        class_name: String,
    },
    /// Invalid heap reference.
    InvalidHeapReference {
        /// The invalid reference ID.
        reference_id: u32,
    },
    /// No provider resolves the method.
    UnresolvedMethod {
        /// Owning class.
        owner: String,
        /// Method name.
        name: String,
        /// Method descriptor.
        descriptor: String,
    },
    /// The field is not declared by any program class.
    UnresolvedField {
        /// Owning class.
        owner: String,
        /// Field name.
        name: String,
    },
    /// No provider can compare the two values.
    UnresolvedComparison {
        /// Declared type of the first value.
        first: String,
        /// Declared type of the second value.
        second: String,
    },
    /// No provider answers the instance-of query.
    UnresolvedInstanceOf {
        /// Declared type of the value.
        class_name: String,
        /// Queried type.
        target: String,
    },
    /// A class lookup through reflection failed.
    ClassNotFound {
        /// The requested class name.
        name: String,
    },
    /// Method has no code.
    MissingMethodBody {
        /// Owning class.
        owner: String,
        /// Method name.
        name: String,
        /// Method descriptor.
        descriptor: String,
    },
    /// Instruction count limit exceeded.
    InstructionLimitExceeded {
        /// Number of instructions executed.
        executed: u64,
        /// Maximum allowed.
        limit: u64,
    },
    /// Call depth limit exceeded.
    CallDepthExceeded {
        /// Current call depth.
        depth: usize,
        /// Maximum allowed depth.
        limit: usize,
    },
    /// Heap object limit exceeded.
    HeapLimitExceeded {
        /// Maximum number of objects.
        limit: usize,
    },
    /// A native stub failed on the host side.
    HostFailure {
        /// The failing operation.
        operation: &'static str,
        /// Description of the failure.
        message: String,
    },
    /// Null reference access.
    NullReference,
    /// Integer division by zero.
    DivisionByZero,
    /// Array index out of bounds.
    ArrayIndexOutOfBounds {
        /// The invalid index.
        index: i64,
        /// Array length.
        length: usize,
    },
    /// Array element type does not fit the instruction.
    ArrayElementTypeMismatch {
        /// Expected element type.
        expected: &'static str,
        /// Actual element type.
        found: &'static str,
    },
    /// Array allocation with a negative length.
    NegativeArraySize {
        /// The requested length.
        size: i32,
    },
    /// String index out of bounds.
    StringIndexOutOfBounds {
        /// The invalid index.
        index: i64,
        /// String length.
        length: usize,
    },
    /// Failed `checkcast`.
    ClassCast {
        /// Declared type of the value.
        from_type: String,
        /// Target type.
        to_type: String,
    },
    /// Number parsing failed.
    NumberFormat {
        /// The rejected input.
        input: String,
    },
    /// The program threw an exception.
    ExceptionThrown {
        /// Declared type of the thrown object.
        class_name: String,
    },
    /// Unsupported opcode.
    UnsupportedOpcode {
        /// The unsupported opcode.
        opcode: Opcode,
    },
    /// Invalid operand for instruction.
    InvalidOperand {
        /// Instruction mnemonic.
        instruction: &'static str,
        /// Description of what was expected.
        expected: &'static str,
    },
    /// Invalid branch target.
    InvalidBranchTarget {
        /// The invalid target index.
        target: usize,
    },
    /// Execution ran past the last instruction.
    FellOffEnd {
        /// Owning class.
        owner: String,
        /// Method name.
        method: String,
    },
    /// Invalid method or field descriptor.
    InvalidDescriptor {
        /// The descriptor.
        descriptor: String,
    },
}

impl EmulationError {
    /// Classifies the fault.
    #[must_use]
    pub fn kind(&self) -> FaultKind {
        match self {
            EmulationError::UnresolvedMethod { .. }
            | EmulationError::UnresolvedField { .. }
            | EmulationError::UnresolvedComparison { .. }
            | EmulationError::UnresolvedInstanceOf { .. }
            | EmulationError::ClassNotFound { .. } => FaultKind::UnresolvedMember,

            EmulationError::TypeMismatch { .. }
            | EmulationError::HeapTypeMismatch { .. }
            | EmulationError::ConstructorTypeMismatch { .. }
            | EmulationError::ArrayElementTypeMismatch { .. }
            | EmulationError::ArgumentCountMismatch { .. } => FaultKind::Type,

            EmulationError::UninitializedObject { .. }
            | EmulationError::AlreadyInitialized { .. }
            | EmulationError::CallStackUnderflow
            | EmulationError::InvalidHeapReference { .. } => FaultKind::State,

            EmulationError::InstructionLimitExceeded { .. }
            | EmulationError::CallDepthExceeded { .. }
            | EmulationError::HeapLimitExceeded { .. }
            | EmulationError::StackOverflow { .. } => FaultKind::StepBudget,

            EmulationError::HostFailure { .. } => FaultKind::Host,

            EmulationError::NullReference
            | EmulationError::DivisionByZero
            | EmulationError::ArrayIndexOutOfBounds { .. }
            | EmulationError::NegativeArraySize { .. }
            | EmulationError::StringIndexOutOfBounds { .. }
            | EmulationError::ClassCast { .. }
            | EmulationError::NumberFormat { .. }
            | EmulationError::ExceptionThrown { .. } => FaultKind::Runtime,

            EmulationError::StackUnderflow
            | EmulationError::StackShapeMismatch { .. }
            | EmulationError::LocalIndexOutOfBounds { .. }
            | EmulationError::ArgumentIndexOutOfBounds { .. }
            | EmulationError::MissingMethodBody { .. }
            | EmulationError::UnsupportedOpcode { .. }
            | EmulationError::InvalidOperand { .. }
            | EmulationError::InvalidBranchTarget { .. }
            | EmulationError::FellOffEnd { .. }
            | EmulationError::InvalidDescriptor { .. } => FaultKind::Unsupported,
        }
    }

    /// Shorthand for [`EmulationError::HostFailure`].
    pub fn host(operation: &'static str, message: impl fmt::Display) -> Self {
        EmulationError::HostFailure {
            operation,
            message: message.to_string(),
        }
    }
}

impl fmt::Display for EmulationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EmulationError::StackUnderflow => write!(f, "operand stack underflow"),
            EmulationError::StackOverflow { limit } => {
                write!(f, "operand stack overflow (limit: {limit})")
            }
            EmulationError::StackShapeMismatch { instruction } => {
                write!(f, "{instruction} would split a category-2 value")
            }
            EmulationError::CallStackUnderflow => write!(f, "call stack underflow"),
            EmulationError::LocalIndexOutOfBounds { index, count } => {
                write!(
                    f,
                    "local variable index {index} out of bounds (count: {count})"
                )
            }
            EmulationError::ArgumentIndexOutOfBounds { index, count } => {
                write!(f, "argument index {index} out of bounds (count: {count})")
            }
            EmulationError::ArgumentCountMismatch { expected, found } => {
                write!(f, "expected {expected} arguments, found {found}")
            }
            EmulationError::TypeMismatch {
                operation,
                expected,
                found,
            } => {
                write!(f, "{operation}: expected {expected}, found {found}")
            }
            EmulationError::HeapTypeMismatch { expected, found } => {
                write!(f, "heap object is a {found}, expected {expected}")
            }
            EmulationError::ConstructorTypeMismatch { expected, found } => {
                write!(f, "constructor of {expected} applied to a {found}")
            }
            EmulationError::UninitializedObject { class_name } => {
                write!(f, "object of type {class_name} used before construction")
            }
            EmulationError::AlreadyInitialized { class_name } => {
                write!(f, "object of type {class_name} constructed twice")
            }
            EmulationError::InvalidHeapReference { reference_id } => {
                write!(f, "invalid heap reference: {reference_id}")
            }
            EmulationError::UnresolvedMethod {
                owner,
                name,
                descriptor,
            } => write!(f, "no provider for {owner}.{name}{descriptor}"),
            EmulationError::UnresolvedField { owner, name } => {
                write!(f, "unresolved field {owner}.{name}")
            }
            EmulationError::UnresolvedComparison { first, second } => {
                write!(f, "no provider can compare {first} with {second}")
            }
            EmulationError::UnresolvedInstanceOf { class_name, target } => {
                write!(f, "no provider can check {class_name} instanceof {target}")
            }
            EmulationError::ClassNotFound { name } => write!(f, "class not found: {name}"),
            EmulationError::MissingMethodBody {
                owner,
                name,
                descriptor,
            } => write!(f, "method {owner}.{name}{descriptor} has no body"),
            EmulationError::InstructionLimitExceeded { executed, limit } => {
                write!(
                    f,
                    "instruction limit exceeded: {executed} executed (limit: {limit})"
                )
            }
            EmulationError::CallDepthExceeded { depth, limit } => {
                write!(f, "call depth {depth} exceeded limit {limit}")
            }
            EmulationError::HeapLimitExceeded { limit } => {
                write!(f, "heap object limit exceeded (limit: {limit})")
            }
            EmulationError::HostFailure { operation, message } => {
                write!(f, "{operation} failed: {message}")
            }
            EmulationError::NullReference => write!(f, "null reference"),
            EmulationError::DivisionByZero => write!(f, "division by zero"),
            EmulationError::ArrayIndexOutOfBounds { index, length } => {
                write!(f, "array index {index} out of bounds (length: {length})")
            }
            EmulationError::ArrayElementTypeMismatch { expected, found } => {
                write!(f, "array element type mismatch: expected {expected}, found {found}")
            }
            EmulationError::NegativeArraySize { size } => {
                write!(f, "negative array size: {size}")
            }
            EmulationError::StringIndexOutOfBounds { index, length } => {
                write!(f, "string index {index} out of bounds (length: {length})")
            }
            EmulationError::ClassCast { from_type, to_type } => {
                write!(f, "{from_type} cannot be cast to {to_type}")
            }
            EmulationError::NumberFormat { input } => {
                write!(f, "invalid number format: {input:?}")
            }
            EmulationError::ExceptionThrown { class_name } => {
                write!(f, "exception thrown: {class_name}")
            }
            EmulationError::UnsupportedOpcode { opcode } => {
                write!(f, "unsupported opcode {opcode} (0x{:02X})", opcode.code())
            }
            EmulationError::InvalidOperand {
                instruction,
                expected,
            } => {
                write!(f, "invalid operand for {instruction}: expected {expected}")
            }
            EmulationError::InvalidBranchTarget { target } => {
                write!(f, "invalid branch target: {target}")
            }
            EmulationError::FellOffEnd { owner, method } => {
                write!(f, "execution ran past the end of {owner}.{method}")
            }
            EmulationError::InvalidDescriptor { descriptor } => {
                write!(f, "invalid descriptor: {descriptor}")
            }
        }
    }
}

impl std::error::Error for EmulationError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kinds() {
        assert_eq!(
            EmulationError::UnresolvedMethod {
                owner: "java/lang/String".to_string(),
                name: "strip".to_string(),
                descriptor: "()Ljava/lang/String;".to_string(),
            }
            .kind(),
            FaultKind::UnresolvedMember
        );
        assert_eq!(
            EmulationError::InstructionLimitExceeded {
                executed: 10,
                limit: 10
            }
            .kind(),
            FaultKind::StepBudget
        );
        assert_eq!(
            EmulationError::UninitializedObject {
                class_name: "java/lang/StringBuilder".to_string()
            }
            .kind(),
            FaultKind::State
        );
        assert_eq!(EmulationError::host("URL.openStream", "denied").kind(), FaultKind::Host);
        assert_eq!(
            EmulationError::UnsupportedOpcode {
                opcode: Opcode::Jsr
            }
            .kind(),
            FaultKind::Unsupported
        );
    }

    #[test]
    fn test_display() {
        let error = EmulationError::UnsupportedOpcode {
            opcode: Opcode::Invokedynamic,
        };
        assert_eq!(error.to_string(), "unsupported opcode invokedynamic (0xBA)");
    }
}
