//! Field and method descriptor parsing.
//!
//! Descriptors use the JVM grammar (`I`, `Ljava/lang/String;`, `[[B`,
//! `(ILjava/lang/Object;)V`). Parsing is strict: trailing input or unterminated
//! class names are reported as [`crate::Error::Malformed`].

use std::fmt;

use crate::Result;

/// A parsed field type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FieldType {
    /// `B`
    Byte,
    /// `C`
    Char,
    /// `D`
    Double,
    /// `F`
    Float,
    /// `I`
    Int,
    /// `J`
    Long,
    /// `S`
    Short,
    /// `Z`
    Boolean,
    /// `V`, only valid as a method return type
    Void,
    /// `L<internal name>;`
    Object(String),
    /// `[<component>`
    Array(Box<FieldType>),
}

impl FieldType {
    /// Parses a complete field descriptor.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if the input is not exactly one field type.
    pub fn parse(descriptor: &str) -> Result<Self> {
        let (field_type, rest) = Self::parse_prefix(descriptor)?;
        if !rest.is_empty() {
            return Err(malformed_error!(
                "Trailing input '{}' in field descriptor '{}'",
                rest,
                descriptor
            ));
        }
        if field_type == FieldType::Void {
            return Err(malformed_error!("Field descriptor can not be void"));
        }
        Ok(field_type)
    }

    fn parse_prefix(input: &str) -> Result<(Self, &str)> {
        let Some(first) = input.chars().next() else {
            return Err(malformed_error!("Empty type descriptor"));
        };
        let rest = &input[first.len_utf8()..];
        let field_type = match first {
            'B' => FieldType::Byte,
            'C' => FieldType::Char,
            'D' => FieldType::Double,
            'F' => FieldType::Float,
            'I' => FieldType::Int,
            'J' => FieldType::Long,
            'S' => FieldType::Short,
            'Z' => FieldType::Boolean,
            'V' => FieldType::Void,
            'L' => {
                let Some(end) = rest.find(';') else {
                    return Err(malformed_error!("Unterminated class name in '{}'", input));
                };
                if end == 0 {
                    return Err(malformed_error!("Empty class name in '{}'", input));
                }
                return Ok((FieldType::Object(rest[..end].to_string()), &rest[end + 1..]));
            }
            '[' => {
                let (component, rest) = Self::parse_prefix(rest)?;
                if component == FieldType::Void {
                    return Err(malformed_error!("Array of void in '{}'", input));
                }
                return Ok((FieldType::Array(Box::new(component)), rest));
            }
            other => {
                return Err(malformed_error!(
                    "Invalid type character '{}' in '{}'",
                    other,
                    input
                ))
            }
        };
        Ok((field_type, rest))
    }

    /// Parses the operand of `checkcast`, `anewarray` and friends, which is either an
    /// internal class name or an array descriptor.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] for an invalid array descriptor.
    pub fn from_class_operand(name: &str) -> Result<Self> {
        if name.starts_with('[') {
            Self::parse(name)
        } else {
            Ok(FieldType::Object(name.to_string()))
        }
    }

    /// Number of local variable / operand stack words the type occupies.
    #[must_use]
    pub fn slot_size(&self) -> usize {
        match self {
            FieldType::Long | FieldType::Double => 2,
            FieldType::Void => 0,
            _ => 1,
        }
    }

    /// `true` for class and array types.
    #[must_use]
    pub fn is_reference(&self) -> bool {
        matches!(self, FieldType::Object(_) | FieldType::Array(_))
    }

    /// `true` for `V`.
    #[must_use]
    pub fn is_void(&self) -> bool {
        matches!(self, FieldType::Void)
    }

    /// The descriptor string of this type.
    #[must_use]
    pub fn descriptor(&self) -> String {
        match self {
            FieldType::Object(name) => format!("L{name};"),
            FieldType::Array(component) => format!("[{}", component.descriptor()),
            primitive => primitive.primitive_code().to_string(),
        }
    }

    /// The name `Class.getName()` reports for this type.
    ///
    /// Primitives use their keyword (`int`), classes their dotted name
    /// (`java.lang.String`) and arrays their descriptor with dots (`[Ljava.lang.String;`).
    #[must_use]
    pub fn java_name(&self) -> String {
        match self {
            FieldType::Byte => "byte".to_string(),
            FieldType::Char => "char".to_string(),
            FieldType::Double => "double".to_string(),
            FieldType::Float => "float".to_string(),
            FieldType::Int => "int".to_string(),
            FieldType::Long => "long".to_string(),
            FieldType::Short => "short".to_string(),
            FieldType::Boolean => "boolean".to_string(),
            FieldType::Void => "void".to_string(),
            FieldType::Object(name) => name.replace('/', "."),
            FieldType::Array(_) => self.descriptor().replace('/', "."),
        }
    }

    /// The internal name used for `Class` objects: the class name for object types,
    /// the descriptor for arrays and the keyword for primitives.
    #[must_use]
    pub fn internal_name(&self) -> String {
        match self {
            FieldType::Object(name) => name.clone(),
            FieldType::Array(_) => self.descriptor(),
            primitive => primitive.java_name(),
        }
    }

    fn primitive_code(&self) -> char {
        match self {
            FieldType::Byte => 'B',
            FieldType::Char => 'C',
            FieldType::Double => 'D',
            FieldType::Float => 'F',
            FieldType::Int => 'I',
            FieldType::Long => 'J',
            FieldType::Short => 'S',
            FieldType::Boolean => 'Z',
            FieldType::Void => 'V',
            FieldType::Object(_) => 'L',
            FieldType::Array(_) => '[',
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.java_name())
    }
}

/// A parsed method descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MethodDescriptor {
    /// Parameter types in declaration order
    pub parameters: Vec<FieldType>,
    /// Return type, [`FieldType::Void`] for `V`
    pub return_type: FieldType,
}

impl MethodDescriptor {
    /// Parses a method descriptor.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] for anything that is not `(<params>)<return>`.
    pub fn parse(descriptor: &str) -> Result<Self> {
        let Some(mut rest) = descriptor.strip_prefix('(') else {
            return Err(malformed_error!(
                "Method descriptor '{}' does not start with '('",
                descriptor
            ));
        };

        let mut parameters = Vec::new();
        loop {
            if let Some(after) = rest.strip_prefix(')') {
                rest = after;
                break;
            }
            let (parameter, after) = FieldType::parse_prefix(rest)?;
            if parameter == FieldType::Void {
                return Err(malformed_error!(
                    "Void parameter in method descriptor '{}'",
                    descriptor
                ));
            }
            parameters.push(parameter);
            rest = after;
        }

        let (return_type, rest) = FieldType::parse_prefix(rest)?;
        if !rest.is_empty() {
            return Err(malformed_error!(
                "Trailing input '{}' in method descriptor '{}'",
                rest,
                descriptor
            ));
        }

        Ok(MethodDescriptor {
            parameters,
            return_type,
        })
    }

    /// Number of local slots the parameters occupy, excluding `this`.
    #[must_use]
    pub fn argument_slots(&self) -> usize {
        self.parameters.iter().map(FieldType::slot_size).sum()
    }

    /// The descriptor string.
    #[must_use]
    pub fn descriptor(&self) -> String {
        let parameters: String = self.parameters.iter().map(FieldType::descriptor).collect();
        format!("({parameters}){}", self.return_type.descriptor())
    }
}

impl fmt::Display for MethodDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.descriptor())
    }
}
