//! Host payloads backing heap objects.
//!
//! Native stubs model JDK objects with plain Rust values. [`HostObject`] is the closed set
//! of those payloads; [`HostView`] lets stubs narrow a heap object to the concrete payload
//! type they expect, failing with a type fault when the object holds something else.

use rustc_hash::FxHashMap;
use widestring::U16String;

use crate::{
    emulation::{JavaArray, JavaValue, StackFrame},
    utils::ZipReader,
};

/// `java.lang.StringBuilder` and `java.lang.StringBuffer` contents.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct JavaStringBuilder {
    /// UTF-16 contents
    pub buffer: U16String,
}

/// `java.io.ByteArrayOutputStream` state.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ByteSink {
    /// Bytes written so far
    pub data: Vec<u8>,
}

/// A readable byte stream (`java.io.InputStream`).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ByteSource {
    /// Stream contents
    pub data: Vec<u8>,
    /// Read position
    pub position: usize,
}

impl ByteSource {
    /// Creates a stream positioned at the start of `data`.
    #[must_use]
    pub fn new(data: Vec<u8>) -> Self {
        ByteSource { data, position: 0 }
    }

    /// Reads up to `buffer.len()` bytes, returning `None` at end of stream.
    pub fn read(&mut self, buffer: &mut [u8]) -> Option<usize> {
        let remaining = self.data.len().saturating_sub(self.position);
        if remaining == 0 {
            return if buffer.is_empty() { Some(0) } else { None };
        }
        let count = remaining.min(buffer.len());
        buffer[..count].copy_from_slice(&self.data[self.position..self.position + count]);
        self.position += count;
        Some(count)
    }
}

/// `java.util.zip.ZipInputStream` state: the archive and the entry being read.
#[derive(Debug, Clone)]
pub struct ZipStream {
    /// Local header walker over the archive bytes
    pub reader: ZipReader,
    /// Decompressed contents of the current entry
    pub entry: Option<ByteSource>,
}

/// `java.util.zip.ZipEntry`.
#[derive(Debug, Clone, PartialEq)]
pub struct ZipEntryInfo {
    /// Entry name
    pub name: String,
    /// Extra field, `None` when empty
    pub extra: Option<Vec<u8>>,
}

/// A `java.lang.Throwable` or subclass; the concrete class is the object's declared type.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct JavaThrowable {
    /// Detail message
    pub message: Option<U16String>,
    /// Stack trace captured at construction, most recent frame first
    pub stack_trace: Vec<StackFrame>,
}

/// A `java.lang.Class` object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JavaClass {
    /// Internal name for classes, descriptor for arrays, keyword for primitives
    pub name: String,
}

/// A `java.lang.reflect.Method`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JavaMethod {
    /// Declaring class (internal name)
    pub owner: String,
    /// Method name
    pub name: String,
    /// Method descriptor
    pub descriptor: String,
    /// Whether `setAccessible(true)` was called
    pub accessible: bool,
}

/// A `java.lang.reflect.Field`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JavaField {
    /// Declaring class (internal name)
    pub owner: String,
    /// Field name
    pub name: String,
    /// Field descriptor
    pub descriptor: String,
}

/// How a method handle invokes its target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleKind {
    /// `findStatic`
    Static,
    /// `findVirtual`
    Virtual,
}

/// A `java.lang.invoke.MethodHandle`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JavaMethodHandle {
    /// Target class (internal name)
    pub owner: String,
    /// Target method name
    pub name: String,
    /// Target method descriptor
    pub descriptor: String,
    /// Invocation kind
    pub kind: HandleKind,
}

/// A `java.lang.invoke.MethodType`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JavaMethodType {
    /// Method descriptor
    pub descriptor: String,
}

/// A `java.lang.invoke.ConstantCallSite`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JavaCallSite {
    /// The bound method handle
    pub target: JavaMethodHandle,
}

/// A `sun.reflect.ConstantPool` for a class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JavaConstantPool {
    /// Class the pool belongs to (internal name)
    pub owner: String,
    /// Number of entries
    pub size: i32,
}

/// `java.security.ProtectionDomain`, `java.security.CodeSource` and `java.net.URL` all
/// reduce to the location of the code being run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeLocation {
    /// URL spec (`file:/path/to/app.jar`)
    pub url: String,
}

/// An ordered collection (`java.util.Set`, `java.util.SortedMap` keys).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct JavaCollection {
    /// Elements in iteration order
    pub elements: Vec<JavaValue>,
}

/// A `java.util.Iterator` over a snapshot of a collection.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct JavaIterator {
    /// Remaining elements
    pub elements: Vec<JavaValue>,
    /// Index of the next element
    pub cursor: usize,
}

/// A compiled `java.util.regex.Pattern`.
#[derive(Debug, Clone)]
pub struct JavaPattern {
    /// Source expression
    pub source: String,
    /// Host regex
    pub regex: regex::Regex,
}

/// Supported `java.security.MessageDigest` algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DigestAlgorithm {
    /// `MD5`
    Md5,
    /// `SHA-1`
    Sha1,
}

/// A `java.security.MessageDigest` accumulating input.
#[derive(Debug, Clone, PartialEq)]
pub struct JavaMessageDigest {
    /// Algorithm
    pub algorithm: DigestAlgorithm,
    /// Bytes passed to `update` since the last `digest`
    pub pending: Vec<u8>,
}

/// An instance of a program-defined class.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct JavaInstance {
    /// Instance fields that were written, by name
    pub fields: FxHashMap<String, JavaValue>,
}

/// The payload of an initialized heap object.
#[derive(Debug, Clone)]
pub enum HostObject {
    /// `java.lang.String`
    String(U16String),
    /// `java.lang.StringBuilder` / `java.lang.StringBuffer`
    StringBuilder(JavaStringBuilder),
    /// Any array
    Array(JavaArray),
    /// `java.io.ByteArrayOutputStream`
    ByteSink(ByteSink),
    /// `java.io.InputStream`
    ByteSource(ByteSource),
    /// `java.util.zip.ZipInputStream`
    ZipStream(ZipStream),
    /// `java.util.zip.ZipEntry`
    ZipEntry(ZipEntryInfo),
    /// `java.lang.Throwable` and subclasses
    Throwable(JavaThrowable),
    /// `java.lang.Class`
    Class(JavaClass),
    /// `java.lang.reflect.Method`
    Method(JavaMethod),
    /// `java.lang.reflect.Field`
    Field(JavaField),
    /// `java.lang.invoke.MethodHandle`
    MethodHandle(JavaMethodHandle),
    /// `java.lang.invoke.MethodType`
    MethodType(JavaMethodType),
    /// `java.lang.invoke.ConstantCallSite`
    CallSite(JavaCallSite),
    /// `sun.reflect.ConstantPool`
    ConstantPool(JavaConstantPool),
    /// `java.lang.StackTraceElement`
    StackTraceElement(StackFrame),
    /// `java.security.ProtectionDomain`, `java.security.CodeSource`, `java.net.URL`
    CodeLocation(CodeLocation),
    /// `java.util.Set` / `java.util.SortedMap`
    Collection(JavaCollection),
    /// `java.util.Iterator`
    Iterator(JavaIterator),
    /// `java.util.regex.Pattern`
    Pattern(JavaPattern),
    /// `java.security.MessageDigest`
    MessageDigest(JavaMessageDigest),
    /// Instance of a program class
    Instance(JavaInstance),
    /// An object whose state is not modeled (`Thread`, `ClassLoader`, `Object`, ...)
    Opaque,
}

impl HostObject {
    /// Payload kind name, used in fault messages.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            HostObject::String(_) => "String",
            HostObject::StringBuilder(_) => "StringBuilder",
            HostObject::Array(_) => "Array",
            HostObject::ByteSink(_) => "ByteSink",
            HostObject::ByteSource(_) => "ByteSource",
            HostObject::ZipStream(_) => "ZipStream",
            HostObject::ZipEntry(_) => "ZipEntry",
            HostObject::Throwable(_) => "Throwable",
            HostObject::Class(_) => "Class",
            HostObject::Method(_) => "Method",
            HostObject::Field(_) => "Field",
            HostObject::MethodHandle(_) => "MethodHandle",
            HostObject::MethodType(_) => "MethodType",
            HostObject::CallSite(_) => "CallSite",
            HostObject::ConstantPool(_) => "ConstantPool",
            HostObject::StackTraceElement(_) => "StackTraceElement",
            HostObject::CodeLocation(_) => "CodeLocation",
            HostObject::Collection(_) => "Collection",
            HostObject::Iterator(_) => "Iterator",
            HostObject::Pattern(_) => "Pattern",
            HostObject::MessageDigest(_) => "MessageDigest",
            HostObject::Instance(_) => "Instance",
            HostObject::Opaque => "Opaque",
        }
    }

    /// Declared type inferred for a directly wrapped payload.
    #[must_use]
    pub fn inferred_type(&self) -> String {
        let name = match self {
            HostObject::String(_) => "java/lang/String",
            HostObject::StringBuilder(_) => "java/lang/StringBuilder",
            HostObject::Array(array) => return array.descriptor(),
            HostObject::ByteSink(_) => "java/io/ByteArrayOutputStream",
            HostObject::ByteSource(_) => "java/io/InputStream",
            HostObject::ZipStream(_) => "java/util/zip/ZipInputStream",
            HostObject::ZipEntry(_) => "java/util/zip/ZipEntry",
            HostObject::Throwable(_) => "java/lang/Throwable",
            HostObject::Class(_) => "java/lang/Class",
            HostObject::Method(_) => "java/lang/reflect/Method",
            HostObject::Field(_) => "java/lang/reflect/Field",
            HostObject::MethodHandle(_) => "java/lang/invoke/MethodHandle",
            HostObject::MethodType(_) => "java/lang/invoke/MethodType",
            HostObject::CallSite(_) => "java/lang/invoke/ConstantCallSite",
            HostObject::ConstantPool(_) => "sun/reflect/ConstantPool",
            HostObject::StackTraceElement(_) => "java/lang/StackTraceElement",
            HostObject::CodeLocation(_) => "java/net/URL",
            HostObject::Collection(_) => "java/util/Set",
            HostObject::Iterator(_) => "java/util/Iterator",
            HostObject::Pattern(_) => "java/util/regex/Pattern",
            HostObject::MessageDigest(_) => "java/security/MessageDigest",
            HostObject::Instance(_) | HostObject::Opaque => "java/lang/Object",
        };
        name.to_string()
    }
}

/// Narrowing from a [`HostObject`] to one concrete payload type.
pub trait HostView: Sized {
    /// Payload kind name reported on mismatch.
    const KIND: &'static str;

    /// Borrows the payload if the object holds this type.
    fn view(object: &HostObject) -> Option<&Self>;

    /// Mutably borrows the payload if the object holds this type.
    fn view_mut(object: &mut HostObject) -> Option<&mut Self>;
}

macro_rules! host_view {
    ($payload:ty, $variant:ident) => {
        impl HostView for $payload {
            const KIND: &'static str = stringify!($variant);

            fn view(object: &HostObject) -> Option<&Self> {
                match object {
                    HostObject::$variant(payload) => Some(payload),
                    _ => None,
                }
            }

            fn view_mut(object: &mut HostObject) -> Option<&mut Self> {
                match object {
                    HostObject::$variant(payload) => Some(payload),
                    _ => None,
                }
            }
        }
    };
}

host_view!(U16String, String);
host_view!(JavaStringBuilder, StringBuilder);
host_view!(JavaArray, Array);
host_view!(ByteSink, ByteSink);
host_view!(ByteSource, ByteSource);
host_view!(ZipStream, ZipStream);
host_view!(ZipEntryInfo, ZipEntry);
host_view!(JavaThrowable, Throwable);
host_view!(JavaClass, Class);
host_view!(JavaMethod, Method);
host_view!(JavaField, Field);
host_view!(JavaMethodHandle, MethodHandle);
host_view!(JavaMethodType, MethodType);
host_view!(JavaCallSite, CallSite);
host_view!(JavaConstantPool, ConstantPool);
host_view!(StackFrame, StackTraceElement);
host_view!(CodeLocation, CodeLocation);
host_view!(JavaCollection, Collection);
host_view!(JavaIterator, Iterator);
host_view!(JavaPattern, Pattern);
host_view!(JavaMessageDigest, MessageDigest);
host_view!(JavaInstance, Instance);
