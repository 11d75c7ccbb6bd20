//! Class, member and descriptor model.
//!
//! These are the types a class file reader produces and the interpreter consumes:
//! [`ClassFile`] with its [`MethodDef`] and [`FieldDef`] members, parsed
//! [`MethodDescriptor`] / [`FieldType`] values, and the [`ClassDictionary`] that maps
//! internal class names to parsed classes for the whole program.

mod class;
mod descriptor;
mod dictionary;

pub use class::{
    ClassAccessFlags, ClassFile, ClassFileRc, FieldAccessFlags, FieldDef, MethodAccessFlags,
    MethodDef,
};
pub use descriptor::{FieldType, MethodDescriptor};
pub use dictionary::{ClassDictionary, ClassMap};
