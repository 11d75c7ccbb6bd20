//! Typed JVM arrays.

use crate::{
    assembly::ArrayType,
    emulation::{EmulationError, JavaValue},
    metadata::FieldType,
    Result,
};

/// Element storage of a JVM array.
///
/// Each primitive element type keeps its own vector so that loads and stores apply the
/// JVM's truncation and sign/zero extension rules. Reference arrays remember their
/// component type for `Class.getName()` and `instanceof` checks.
#[derive(Debug, Clone, PartialEq)]
pub enum JavaArray {
    /// `boolean[]`
    Boolean(Vec<i8>),
    /// `byte[]`
    Byte(Vec<i8>),
    /// `char[]`
    Char(Vec<u16>),
    /// `short[]`
    Short(Vec<i16>),
    /// `int[]`
    Int(Vec<i32>),
    /// `long[]`
    Long(Vec<i64>),
    /// `float[]`
    Float(Vec<f32>),
    /// `double[]`
    Double(Vec<f64>),
    /// Arrays of objects or of other arrays
    Reference {
        /// Component type descriptor (`Ljava/lang/String;`, `[I`)
        component: String,
        /// Elements, `JavaValue::Null` or references
        elements: Vec<JavaValue>,
    },
}

impl JavaArray {
    /// Allocates a zeroed primitive array for `newarray`.
    #[must_use]
    pub fn primitive(kind: ArrayType, length: usize) -> Self {
        match kind {
            ArrayType::Boolean => JavaArray::Boolean(vec![0; length]),
            ArrayType::Byte => JavaArray::Byte(vec![0; length]),
            ArrayType::Char => JavaArray::Char(vec![0; length]),
            ArrayType::Short => JavaArray::Short(vec![0; length]),
            ArrayType::Int => JavaArray::Int(vec![0; length]),
            ArrayType::Long => JavaArray::Long(vec![0; length]),
            ArrayType::Float => JavaArray::Float(vec![0.0; length]),
            ArrayType::Double => JavaArray::Double(vec![0.0; length]),
        }
    }

    /// Allocates a zeroed array whose elements have type `component`.
    #[must_use]
    pub fn of_component(component: &FieldType, length: usize) -> Self {
        match component {
            FieldType::Boolean => JavaArray::primitive(ArrayType::Boolean, length),
            FieldType::Byte => JavaArray::primitive(ArrayType::Byte, length),
            FieldType::Char => JavaArray::primitive(ArrayType::Char, length),
            FieldType::Short => JavaArray::primitive(ArrayType::Short, length),
            FieldType::Int => JavaArray::primitive(ArrayType::Int, length),
            FieldType::Long => JavaArray::primitive(ArrayType::Long, length),
            FieldType::Float => JavaArray::primitive(ArrayType::Float, length),
            FieldType::Double => JavaArray::primitive(ArrayType::Double, length),
            other => JavaArray::Reference {
                component: other.descriptor(),
                elements: vec![JavaValue::Null; length],
            },
        }
    }

    /// Wraps existing bytes as a `byte[]`.
    #[must_use]
    pub fn from_bytes(bytes: &[u8]) -> Self {
        JavaArray::Byte(bytes.iter().map(|byte| *byte as i8).collect())
    }

    /// Number of elements.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            JavaArray::Boolean(values) | JavaArray::Byte(values) => values.len(),
            JavaArray::Char(values) => values.len(),
            JavaArray::Short(values) => values.len(),
            JavaArray::Int(values) => values.len(),
            JavaArray::Long(values) => values.len(),
            JavaArray::Float(values) => values.len(),
            JavaArray::Double(values) => values.len(),
            JavaArray::Reference { elements, .. } => elements.len(),
        }
    }

    /// `true` for zero-length arrays.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Short element kind name, as used by the array instructions.
    #[must_use]
    pub fn element_kind(&self) -> &'static str {
        match self {
            JavaArray::Boolean(_) => "boolean",
            JavaArray::Byte(_) => "byte",
            JavaArray::Char(_) => "char",
            JavaArray::Short(_) => "short",
            JavaArray::Int(_) => "int",
            JavaArray::Long(_) => "long",
            JavaArray::Float(_) => "float",
            JavaArray::Double(_) => "double",
            JavaArray::Reference { .. } => "reference",
        }
    }

    /// Array type descriptor (`[B`, `[Ljava/lang/String;`).
    #[must_use]
    pub fn descriptor(&self) -> String {
        match self {
            JavaArray::Boolean(_) => "[Z".to_string(),
            JavaArray::Byte(_) => "[B".to_string(),
            JavaArray::Char(_) => "[C".to_string(),
            JavaArray::Short(_) => "[S".to_string(),
            JavaArray::Int(_) => "[I".to_string(),
            JavaArray::Long(_) => "[J".to_string(),
            JavaArray::Float(_) => "[F".to_string(),
            JavaArray::Double(_) => "[D".to_string(),
            JavaArray::Reference { component, .. } => format!("[{component}"),
        }
    }

    fn checked_index(&self, index: i32) -> Result<usize> {
        let length = self.len();
        match usize::try_from(index) {
            Ok(position) if position < length => Ok(position),
            _ => Err(EmulationError::ArrayIndexOutOfBounds {
                index: i64::from(index),
                length,
            }
            .into()),
        }
    }

    /// Reads element `index`, widening small integral types to `int`.
    ///
    /// # Errors
    /// Returns a runtime fault if `index` is out of bounds.
    pub fn load(&self, index: i32) -> Result<JavaValue> {
        let position = self.checked_index(index)?;
        Ok(match self {
            JavaArray::Boolean(values) | JavaArray::Byte(values) => {
                JavaValue::Int(i32::from(values[position]))
            }
            JavaArray::Char(values) => JavaValue::Int(i32::from(values[position])),
            JavaArray::Short(values) => JavaValue::Int(i32::from(values[position])),
            JavaArray::Int(values) => JavaValue::Int(values[position]),
            JavaArray::Long(values) => JavaValue::Long(values[position]),
            JavaArray::Float(values) => JavaValue::Float(values[position]),
            JavaArray::Double(values) => JavaValue::Double(values[position]),
            JavaArray::Reference { elements, .. } => elements[position],
        })
    }

    /// Writes element `index`, truncating `int` values for the small integral types.
    ///
    /// # Errors
    /// Returns a runtime fault if `index` is out of bounds and a type fault if the value
    /// does not fit the element type.
    pub fn store(&mut self, index: i32, value: JavaValue) -> Result<()> {
        let position = self.checked_index(index)?;
        match self {
            JavaArray::Boolean(values) | JavaArray::Byte(values) => {
                values[position] = value.as_int("bastore")? as i8;
            }
            JavaArray::Char(values) => values[position] = value.as_int("castore")? as u16,
            JavaArray::Short(values) => values[position] = value.as_int("sastore")? as i16,
            JavaArray::Int(values) => values[position] = value.as_int("iastore")?,
            JavaArray::Long(values) => values[position] = value.as_long("lastore")?,
            JavaArray::Float(values) => values[position] = value.as_float("fastore")?,
            JavaArray::Double(values) => values[position] = value.as_double("dastore")?,
            JavaArray::Reference { elements, .. } => {
                elements[position] = value.expect_reference("aastore")?;
            }
        }
        Ok(())
    }

    /// The contents of a `byte[]` or `boolean[]` as unsigned bytes.
    ///
    /// # Errors
    /// Returns a type fault for other element types.
    pub fn bytes(&self) -> Result<Vec<u8>> {
        match self {
            JavaArray::Byte(values) | JavaArray::Boolean(values) => {
                Ok(values.iter().map(|value| *value as u8).collect())
            }
            other => Err(EmulationError::ArrayElementTypeMismatch {
                expected: "byte",
                found: other.element_kind(),
            }
            .into()),
        }
    }

    /// The contents of a `char[]`.
    ///
    /// # Errors
    /// Returns a type fault for other element types.
    pub fn chars(&self) -> Result<&[u16]> {
        match self {
            JavaArray::Char(values) => Ok(values),
            other => Err(EmulationError::ArrayElementTypeMismatch {
                expected: "char",
                found: other.element_kind(),
            }
            .into()),
        }
    }

    /// The elements of a reference array.
    ///
    /// # Errors
    /// Returns a type fault for primitive arrays.
    pub fn references(&self) -> Result<&[JavaValue]> {
        match self {
            JavaArray::Reference { elements, .. } => Ok(elements),
            other => Err(EmulationError::ArrayElementTypeMismatch {
                expected: "reference",
                found: other.element_kind(),
            }
            .into()),
        }
    }

    /// Copies `length` elements from `source[source_position..]` into
    /// `self[destination_position..]`, with `System.arraycopy` bounds semantics.
    ///
    /// # Errors
    /// Returns a runtime fault for out-of-range positions and a type fault for
    /// incompatible element types.
    pub fn copy_from(
        &mut self,
        destination_position: i32,
        source: &JavaArray,
        source_position: i32,
        length: i32,
    ) -> Result<()> {
        let out_of_bounds = |index: i32, length: usize| -> crate::Error {
            EmulationError::ArrayIndexOutOfBounds {
                index: i64::from(index),
                length,
            }
            .into()
        };
        if length < 0 {
            return Err(out_of_bounds(length, source.len()));
        }
        let (Ok(from), Ok(to), count) = (
            usize::try_from(source_position),
            usize::try_from(destination_position),
            length as usize,
        ) else {
            return Err(out_of_bounds(source_position.min(destination_position), self.len()));
        };
        if from + count > source.len() {
            return Err(out_of_bounds(source_position.saturating_add(length), source.len()));
        }
        if to + count > self.len() {
            return Err(out_of_bounds(destination_position.saturating_add(length), self.len()));
        }

        match (self, source) {
            (JavaArray::Boolean(dst), JavaArray::Boolean(src))
            | (JavaArray::Byte(dst), JavaArray::Byte(src)) => {
                dst[to..to + count].copy_from_slice(&src[from..from + count]);
            }
            (JavaArray::Char(dst), JavaArray::Char(src)) => {
                dst[to..to + count].copy_from_slice(&src[from..from + count]);
            }
            (JavaArray::Short(dst), JavaArray::Short(src)) => {
                dst[to..to + count].copy_from_slice(&src[from..from + count]);
            }
            (JavaArray::Int(dst), JavaArray::Int(src)) => {
                dst[to..to + count].copy_from_slice(&src[from..from + count]);
            }
            (JavaArray::Long(dst), JavaArray::Long(src)) => {
                dst[to..to + count].copy_from_slice(&src[from..from + count]);
            }
            (JavaArray::Float(dst), JavaArray::Float(src)) => {
                dst[to..to + count].copy_from_slice(&src[from..from + count]);
            }
            (JavaArray::Double(dst), JavaArray::Double(src)) => {
                dst[to..to + count].copy_from_slice(&src[from..from + count]);
            }
            (
                JavaArray::Reference { elements: dst, .. },
                JavaArray::Reference { elements: src, .. },
            ) => {
                dst[to..to + count].copy_from_slice(&src[from..from + count]);
            }
            (destination, source) => {
                return Err(EmulationError::ArrayElementTypeMismatch {
                    expected: destination.element_kind(),
                    found: source.element_kind(),
                }
                .into())
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emulation::FaultKind;

    #[test]
    fn test_store_truncates_and_load_extends() {
        let mut bytes = JavaArray::primitive(ArrayType::Byte, 2);
        bytes.store(0, JavaValue::Int(0x1ff)).unwrap();
        assert_eq!(bytes.load(0).unwrap(), JavaValue::Int(-1));

        let mut chars = JavaArray::primitive(ArrayType::Char, 1);
        chars.store(0, JavaValue::Int(-1)).unwrap();
        assert_eq!(chars.load(0).unwrap(), JavaValue::Int(0xffff));
    }

    #[test]
    fn test_bounds() {
        let array = JavaArray::primitive(ArrayType::Int, 3);
        let error = array.load(3).unwrap_err();
        assert_eq!(error.fault_kind(), Some(FaultKind::Runtime));
        assert!(array.load(-1).is_err());
    }

    #[test]
    fn test_store_type_check() {
        let mut longs = JavaArray::primitive(ArrayType::Long, 1);
        let error = longs.store(0, JavaValue::Int(1)).unwrap_err();
        assert_eq!(error.fault_kind(), Some(FaultKind::Type));
    }

    #[test]
    fn test_copy_from() {
        let source = JavaArray::Char(vec![1, 2, 3, 4]);
        let mut destination = JavaArray::primitive(ArrayType::Char, 4);
        destination.copy_from(1, &source, 2, 2).unwrap();
        assert_eq!(destination, JavaArray::Char(vec![0, 3, 4, 0]));
        assert!(destination.copy_from(3, &source, 0, 2).is_err());
        assert!(destination
            .copy_from(0, &JavaArray::primitive(ArrayType::Int, 4), 0, 1)
            .is_err());
    }

    #[test]
    fn test_descriptors() {
        let strings = JavaArray::of_component(&FieldType::Object("java/lang/String".to_string()), 2);
        assert_eq!(strings.descriptor(), "[Ljava/lang/String;");
        assert_eq!(strings.load(1).unwrap(), JavaValue::Null);
        assert_eq!(JavaArray::from_bytes(&[0xff]).bytes().unwrap(), vec![0xff]);
    }
}
