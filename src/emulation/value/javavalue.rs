//! Operand stack and local variable values.

use std::fmt;

use crate::{
    emulation::EmulationError,
    metadata::FieldType,
    Result,
};

/// Handle to an object on a [`crate::emulation::Heap`].
///
/// Handles are only meaningful for the heap (and therefore the context) that issued them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HeapRef(u32);

impl HeapRef {
    pub(crate) fn new(id: u32) -> Self {
        HeapRef(id)
    }

    /// Numeric identity of the handle.
    #[must_use]
    pub fn id(self) -> u32 {
        self.0
    }
}

impl fmt::Display for HeapRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{}", self.0)
    }
}

/// A JVM value as it lives on the operand stack or in a local slot.
///
/// `boolean`, `byte`, `char` and `short` are held as [`JavaValue::Int`], as the JVM does.
/// [`JavaValue::Top`] fills the second local slot of a `long` or `double`; loading it is a
/// type fault. [`JavaValue::Void`] is what a `void` method call produces and never reaches
/// the operand stack.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum JavaValue {
    /// Result of a `void` call
    Void,
    /// Unusable slot (upper half of a category-2 local, or never written)
    #[default]
    Top,
    /// `int` and the smaller integral types
    Int(i32),
    /// `long`
    Long(i64),
    /// `float`
    Float(f32),
    /// `double`
    Double(f64),
    /// `null`
    Null,
    /// A heap object
    Reference(HeapRef),
}

impl JavaValue {
    /// Name of the value's shape, used in fault messages.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            JavaValue::Void => "void",
            JavaValue::Top => "top",
            JavaValue::Int(_) => "int",
            JavaValue::Long(_) => "long",
            JavaValue::Float(_) => "float",
            JavaValue::Double(_) => "double",
            JavaValue::Null => "null",
            JavaValue::Reference(_) => "reference",
        }
    }

    /// Stack category: 2 for `long` and `double`, 1 otherwise.
    #[must_use]
    pub fn category(&self) -> usize {
        match self {
            JavaValue::Long(_) | JavaValue::Double(_) => 2,
            _ => 1,
        }
    }

    /// `true` for `null`.
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, JavaValue::Null)
    }

    /// `true` for `null` and heap references.
    #[must_use]
    pub fn is_reference_like(&self) -> bool {
        matches!(self, JavaValue::Null | JavaValue::Reference(_))
    }

    /// The heap handle, if this is a non-null reference.
    #[must_use]
    pub fn as_reference(&self) -> Option<HeapRef> {
        match self {
            JavaValue::Reference(reference) => Some(*reference),
            _ => None,
        }
    }

    /// Narrows to `int`.
    ///
    /// # Errors
    /// Returns a type fault for any other variant.
    pub fn as_int(&self, operation: &'static str) -> Result<i32> {
        match self {
            JavaValue::Int(value) => Ok(*value),
            other => Err(other.mismatch(operation, "int")),
        }
    }

    /// Narrows to `long`.
    ///
    /// # Errors
    /// Returns a type fault for any other variant.
    pub fn as_long(&self, operation: &'static str) -> Result<i64> {
        match self {
            JavaValue::Long(value) => Ok(*value),
            other => Err(other.mismatch(operation, "long")),
        }
    }

    /// Narrows to `float`.
    ///
    /// # Errors
    /// Returns a type fault for any other variant.
    pub fn as_float(&self, operation: &'static str) -> Result<f32> {
        match self {
            JavaValue::Float(value) => Ok(*value),
            other => Err(other.mismatch(operation, "float")),
        }
    }

    /// Narrows to `double`.
    ///
    /// # Errors
    /// Returns a type fault for any other variant.
    pub fn as_double(&self, operation: &'static str) -> Result<f64> {
        match self {
            JavaValue::Double(value) => Ok(*value),
            other => Err(other.mismatch(operation, "double")),
        }
    }

    /// Checks that the value is `null` or a reference.
    ///
    /// # Errors
    /// Returns a type fault for primitives.
    pub fn expect_reference(self, operation: &'static str) -> Result<JavaValue> {
        if self.is_reference_like() {
            Ok(self)
        } else {
            Err(self.mismatch(operation, "reference"))
        }
    }

    /// Checks that the value fits a slot of type `field_type`.
    ///
    /// # Errors
    /// Returns a type fault if the shapes disagree.
    pub fn expect_type(self, field_type: &FieldType, operation: &'static str) -> Result<JavaValue> {
        let fits = match field_type {
            FieldType::Boolean
            | FieldType::Byte
            | FieldType::Char
            | FieldType::Short
            | FieldType::Int => matches!(self, JavaValue::Int(_)),
            FieldType::Long => matches!(self, JavaValue::Long(_)),
            FieldType::Float => matches!(self, JavaValue::Float(_)),
            FieldType::Double => matches!(self, JavaValue::Double(_)),
            FieldType::Object(_) | FieldType::Array(_) => self.is_reference_like(),
            FieldType::Void => matches!(self, JavaValue::Void),
        };
        if fits {
            Ok(self)
        } else {
            Err(self.mismatch(operation, field_type_shape(field_type)))
        }
    }

    /// The zero value of a field or array element of type `field_type`.
    #[must_use]
    pub fn default_for(field_type: &FieldType) -> JavaValue {
        match field_type {
            FieldType::Boolean
            | FieldType::Byte
            | FieldType::Char
            | FieldType::Short
            | FieldType::Int => JavaValue::Int(0),
            FieldType::Long => JavaValue::Long(0),
            FieldType::Float => JavaValue::Float(0.0),
            FieldType::Double => JavaValue::Double(0.0),
            FieldType::Object(_) | FieldType::Array(_) => JavaValue::Null,
            FieldType::Void => JavaValue::Void,
        }
    }

    fn mismatch(&self, operation: &'static str, expected: &'static str) -> crate::Error {
        EmulationError::TypeMismatch {
            operation,
            expected,
            found: self.type_name(),
        }
        .into()
    }
}

fn field_type_shape(field_type: &FieldType) -> &'static str {
    match field_type {
        FieldType::Boolean | FieldType::Byte | FieldType::Char | FieldType::Short | FieldType::Int => {
            "int"
        }
        FieldType::Long => "long",
        FieldType::Float => "float",
        FieldType::Double => "double",
        FieldType::Object(_) | FieldType::Array(_) => "reference",
        FieldType::Void => "void",
    }
}

impl From<i32> for JavaValue {
    fn from(value: i32) -> Self {
        JavaValue::Int(value)
    }
}

impl From<i64> for JavaValue {
    fn from(value: i64) -> Self {
        JavaValue::Long(value)
    }
}

impl From<f32> for JavaValue {
    fn from(value: f32) -> Self {
        JavaValue::Float(value)
    }
}

impl From<f64> for JavaValue {
    fn from(value: f64) -> Self {
        JavaValue::Double(value)
    }
}

impl From<bool> for JavaValue {
    fn from(value: bool) -> Self {
        JavaValue::Int(i32::from(value))
    }
}

impl From<HeapRef> for JavaValue {
    fn from(value: HeapRef) -> Self {
        JavaValue::Reference(value)
    }
}

impl fmt::Display for JavaValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JavaValue::Void => write!(f, "void"),
            JavaValue::Top => write!(f, "top"),
            JavaValue::Int(value) => write!(f, "{value}"),
            JavaValue::Long(value) => write!(f, "{value}L"),
            JavaValue::Float(value) => write!(f, "{value}F"),
            JavaValue::Double(value) => write!(f, "{value}D"),
            JavaValue::Null => write!(f, "null"),
            JavaValue::Reference(reference) => write!(f, "{reference}"),
        }
    }
}
