//! Classes, methods and fields as produced by a class file reader.

use std::sync::Arc;

use bitflags::bitflags;

use crate::{
    assembly::{Constant, MethodBody},
    metadata::MethodDescriptor,
    Result,
};

/// A reference to a `ClassFile`
pub type ClassFileRc = Arc<ClassFile>;

bitflags! {
    #[derive(PartialEq, Eq, Debug, Clone, Copy, Default)]
    /// Access flags of a class (`access_flags` of the `ClassFile` structure)
    pub struct ClassAccessFlags : u16 {
        /// Declared public
        const PUBLIC = 0x0001;
        /// Declared final
        const FINAL = 0x0010;
        /// Treat superclass methods specially in `invokespecial`
        const SUPER = 0x0020;
        /// Is an interface
        const INTERFACE = 0x0200;
        /// Declared abstract
        const ABSTRACT = 0x0400;
        /// Not present in source code
        const SYNTHETIC = 0x1000;
        /// Declared as an annotation interface
        const ANNOTATION = 0x2000;
        /// Declared as an enum class
        const ENUM = 0x4000;
    }
}

bitflags! {
    #[derive(PartialEq, Eq, Debug, Clone, Copy, Default)]
    /// Access flags of a method
    pub struct MethodAccessFlags : u16 {
        /// Declared public
        const PUBLIC = 0x0001;
        /// Declared private
        const PRIVATE = 0x0002;
        /// Declared protected
        const PROTECTED = 0x0004;
        /// Declared static
        const STATIC = 0x0008;
        /// Declared final
        const FINAL = 0x0010;
        /// Declared synchronized
        const SYNCHRONIZED = 0x0020;
        /// A bridge method generated by the compiler
        const BRIDGE = 0x0040;
        /// Declared with a variable number of arguments
        const VARARGS = 0x0080;
        /// Declared native
        const NATIVE = 0x0100;
        /// Declared abstract
        const ABSTRACT = 0x0400;
        /// Declared strictfp
        const STRICT = 0x0800;
        /// Not present in source code
        const SYNTHETIC = 0x1000;
    }
}

bitflags! {
    #[derive(PartialEq, Eq, Debug, Clone, Copy, Default)]
    /// Access flags of a field
    pub struct FieldAccessFlags : u16 {
        /// Declared public
        const PUBLIC = 0x0001;
        /// Declared private
        const PRIVATE = 0x0002;
        /// Declared protected
        const PROTECTED = 0x0004;
        /// Declared static
        const STATIC = 0x0008;
        /// Declared final
        const FINAL = 0x0010;
        /// Declared volatile
        const VOLATILE = 0x0040;
        /// Declared transient
        const TRANSIENT = 0x0080;
        /// Not present in source code
        const SYNTHETIC = 0x1000;
        /// Declared as an element of an enum
        const ENUM = 0x4000;
    }
}

/// A method declaration, with its code if it has any.
#[derive(Debug, Clone, PartialEq)]
pub struct MethodDef {
    /// Method name (`<init>` and `<clinit>` included)
    pub name: String,
    /// Method descriptor
    pub descriptor: String,
    /// Access flags
    pub access: MethodAccessFlags,
    /// Code, `None` for abstract and native methods
    pub body: Option<MethodBody>,
}

impl MethodDef {
    /// Creates a method with code.
    pub fn new(
        name: impl Into<String>,
        descriptor: impl Into<String>,
        access: MethodAccessFlags,
        body: MethodBody,
    ) -> Self {
        MethodDef {
            name: name.into(),
            descriptor: descriptor.into(),
            access,
            body: Some(body),
        }
    }

    /// Creates a method without code.
    pub fn abstract_method(
        name: impl Into<String>,
        descriptor: impl Into<String>,
        access: MethodAccessFlags,
    ) -> Self {
        MethodDef {
            name: name.into(),
            descriptor: descriptor.into(),
            access,
            body: None,
        }
    }

    /// `true` if the method is static.
    #[must_use]
    pub fn is_static(&self) -> bool {
        self.access.contains(MethodAccessFlags::STATIC)
    }

    /// `true` if the method is an instance or class initializer.
    #[must_use]
    pub fn is_initializer(&self) -> bool {
        self.name == "<init>" || self.name == "<clinit>"
    }

    /// The parsed descriptor.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if the descriptor is invalid.
    pub fn parsed_descriptor(&self) -> Result<MethodDescriptor> {
        MethodDescriptor::parse(&self.descriptor)
    }
}

/// A field declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDef {
    /// Field name
    pub name: String,
    /// Field descriptor
    pub descriptor: String,
    /// Access flags
    pub access: FieldAccessFlags,
    /// Value of the `ConstantValue` attribute, if present
    pub constant_value: Option<Constant>,
}

impl FieldDef {
    /// Creates a field without a constant value.
    pub fn new(name: impl Into<String>, descriptor: impl Into<String>, access: FieldAccessFlags) -> Self {
        FieldDef {
            name: name.into(),
            descriptor: descriptor.into(),
            access,
            constant_value: None,
        }
    }

    /// Attaches a `ConstantValue` attribute.
    #[must_use]
    pub fn with_constant(mut self, value: Constant) -> Self {
        self.constant_value = Some(value);
        self
    }

    /// `true` if the field is static.
    #[must_use]
    pub fn is_static(&self) -> bool {
        self.access.contains(FieldAccessFlags::STATIC)
    }
}

/// A parsed class.
///
/// Holds what the interpreter and the decryption pass need: names, the inheritance
/// edges, the size of the constant pool (stack traces report it as a line number and
/// `sun.reflect.ConstantPool.getSize` returns it) and the members.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassFile {
    /// Internal name (`a/b/C`)
    pub name: String,
    /// Internal name of the superclass, `None` only for `java/lang/Object`
    pub super_name: Option<String>,
    /// Internal names of the directly implemented interfaces
    pub interfaces: Vec<String>,
    /// Access flags
    pub access: ClassAccessFlags,
    /// Number of constant pool entries (`constant_pool_count`)
    pub constant_pool_size: u16,
    /// Declared fields
    pub fields: Vec<FieldDef>,
    /// Declared methods
    pub methods: Vec<MethodDef>,
}

impl ClassFile {
    /// Creates an empty public class extending `java/lang/Object`.
    pub fn new(name: impl Into<String>) -> Self {
        ClassFile {
            name: name.into(),
            super_name: Some("java/lang/Object".to_string()),
            interfaces: Vec::new(),
            access: ClassAccessFlags::PUBLIC | ClassAccessFlags::SUPER,
            constant_pool_size: 0,
            fields: Vec::new(),
            methods: Vec::new(),
        }
    }

    /// Sets the superclass.
    #[must_use]
    pub fn with_super(mut self, super_name: impl Into<String>) -> Self {
        self.super_name = Some(super_name.into());
        self
    }

    /// Adds an implemented interface.
    #[must_use]
    pub fn with_interface(mut self, interface: impl Into<String>) -> Self {
        self.interfaces.push(interface.into());
        self
    }

    /// Sets the constant pool size.
    #[must_use]
    pub fn with_constant_pool_size(mut self, size: u16) -> Self {
        self.constant_pool_size = size;
        self
    }

    /// Adds a method.
    #[must_use]
    pub fn with_method(mut self, method: MethodDef) -> Self {
        self.methods.push(method);
        self
    }

    /// Adds a field.
    #[must_use]
    pub fn with_field(mut self, field: FieldDef) -> Self {
        self.fields.push(field);
        self
    }

    /// Dotted class name (`a.b.C`).
    #[must_use]
    pub fn java_name(&self) -> String {
        self.name.replace('/', ".")
    }

    /// Finds a method by exact name and descriptor.
    #[must_use]
    pub fn method(&self, name: &str, descriptor: &str) -> Option<&MethodDef> {
        self.methods
            .iter()
            .find(|method| method.name == name && method.descriptor == descriptor)
    }

    /// Finds a method by name and descriptor, returning its index.
    #[must_use]
    pub fn method_index(&self, name: &str, descriptor: &str) -> Option<usize> {
        self.methods
            .iter()
            .position(|method| method.name == name && method.descriptor == descriptor)
    }

    /// Finds a declared field by name.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|field| field.name == name)
    }

    /// The static initializer, if the class declares one with code.
    #[must_use]
    pub fn static_initializer(&self) -> Option<&MethodDef> {
        self.method("<clinit>", "()V")
            .filter(|method| method.body.is_some())
    }
}
