//! Runtime values.
//!
//! [`JavaValue`] is what the operand stack and local slots hold: primitives by value and
//! objects as [`HeapRef`] handles. Object payloads live on the heap as [`HostObject`]
//! values and are reached through [`HostView`] narrowing.

mod array;
mod host;
mod javavalue;

pub use array::JavaArray;
pub use host::{
    ByteSink, ByteSource, CodeLocation, DigestAlgorithm, HandleKind, HostObject, HostView,
    JavaCallSite, JavaClass, JavaCollection, JavaConstantPool, JavaField, JavaInstance,
    JavaIterator, JavaMessageDigest, JavaMethod, JavaMethodHandle, JavaMethodType, JavaPattern,
    JavaStringBuilder, JavaThrowable, ZipEntryInfo, ZipStream,
};
pub use javavalue::{HeapRef, JavaValue};
