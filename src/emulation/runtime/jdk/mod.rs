//! Native stubs for the JDK subset that string decryptors call.
//!
//! Each submodule exposes `register`, which adds its stubs to a [`NativeCatalog`]. A stub
//! receives the [`MethodCall`] (receiver and arguments) and the [`Context`] and either
//! returns the method's value or fails closed with an [`EmulationError`]. Constructors
//! move their receiver from `Uninitialized` to `Initialized` through [`construct`].
//!
//! | Module | Owners |
//! |--------|--------|
//! | `lang` | `Object`, `System`, `Thread`, `StackTraceElement`, `Long`, `Integer`, `SharedSecrets` |
//! | `string` | `String` |
//! | `builder` | `StringBuilder`, `StringBuffer` |
//! | `throwable` | `Throwable`, `Exception`, `NullPointerException`, `RuntimeException`, `BootstrapMethodError` |
//! | `reflect` | `Class`, `reflect.Method`, `reflect.Field`, `ProtectionDomain`, `CodeSource`, `URL`, `ConstantPool` |
//! | `invoke` | `MethodType`, `MethodHandles$Lookup`, `MethodHandle`, `ConstantCallSite` |
//! | `io` | `ByteArrayOutputStream`, `InputStream`, `ZipInputStream`, `ZipEntry` |
//! | `util` | `Pattern`, `Charset`, `SortedMap`, `Set`, `Iterator` |
//! | `security` | `MessageDigest` |

mod builder;
mod invoke;
mod io;
mod lang;
mod reflect;
mod security;
mod string;
mod throwable;
mod util;

use widestring::U16String;

use crate::{
    emulation::{
        runtime::provider::{MethodCall, NativeCatalog},
        Context, EmulationError, HostObject, JavaArray, JavaClass, JavaValue, ObjectState,
        StackFrame,
    },
    Result,
};

/// Registers every JDK stub.
///
/// # Errors
/// Returns [`crate::Error::Configuration`] if two modules claim the same key.
pub(crate) fn register_all(catalog: &mut NativeCatalog) -> Result<()> {
    lang::register(catalog)?;
    string::register(catalog)?;
    builder::register(catalog)?;
    throwable::register(catalog)?;
    reflect::register(catalog)?;
    invoke::register(catalog)?;
    io::register(catalog)?;
    util::register(catalog)?;
    security::register(catalog)?;
    Ok(())
}

/// Known supertypes of the JDK classes stubs create, excluding `java/lang/Object`.
pub(crate) fn supertypes(class_name: &str) -> &'static [&'static str] {
    match class_name {
        "java/lang/String" => &[
            "java/io/Serializable",
            "java/lang/Comparable",
            "java/lang/CharSequence",
        ],
        "java/lang/StringBuilder" | "java/lang/StringBuffer" => &[
            "java/lang/AbstractStringBuilder",
            "java/lang/CharSequence",
            "java/lang/Appendable",
            "java/io/Serializable",
        ],
        "java/lang/Exception" | "java/lang/Error" => &["java/lang/Throwable", "java/io/Serializable"],
        "java/lang/RuntimeException" => &[
            "java/lang/Exception",
            "java/lang/Throwable",
            "java/io/Serializable",
        ],
        "java/lang/NullPointerException" => &[
            "java/lang/RuntimeException",
            "java/lang/Exception",
            "java/lang/Throwable",
            "java/io/Serializable",
        ],
        "java/lang/BootstrapMethodError" => &[
            "java/lang/LinkageError",
            "java/lang/Error",
            "java/lang/Throwable",
            "java/io/Serializable",
        ],
        "java/io/ByteArrayOutputStream" => &[
            "java/io/OutputStream",
            "java/io/Closeable",
            "java/io/Flushable",
            "java/lang/AutoCloseable",
        ],
        "java/io/InputStream" => &["java/io/Closeable", "java/lang/AutoCloseable"],
        "java/util/zip/ZipInputStream" => &[
            "java/util/zip/InflaterInputStream",
            "java/io/FilterInputStream",
            "java/io/InputStream",
            "java/io/Closeable",
            "java/lang/AutoCloseable",
        ],
        "java/lang/Class" => &[
            "java/io/Serializable",
            "java/lang/reflect/GenericDeclaration",
            "java/lang/reflect/Type",
            "java/lang/reflect/AnnotatedElement",
        ],
        "java/lang/reflect/Method" => &[
            "java/lang/reflect/Executable",
            "java/lang/reflect/AccessibleObject",
            "java/lang/reflect/Member",
            "java/lang/reflect/GenericDeclaration",
            "java/lang/reflect/AnnotatedElement",
        ],
        "java/lang/reflect/Field" => &[
            "java/lang/reflect/AccessibleObject",
            "java/lang/reflect/Member",
            "java/lang/reflect/AnnotatedElement",
        ],
        "java/lang/invoke/ConstantCallSite" => &["java/lang/invoke/CallSite"],
        "java/util/Set" => &["java/util/Collection", "java/lang/Iterable"],
        "java/util/SortedMap" => &["java/util/Map"],
        "java/lang/Throwable" | "java/lang/StackTraceElement" | "java/net/URL" => {
            &["java/io/Serializable"]
        }
        _ => &[],
    }
}

/// Runs the constructor transition for `call`'s receiver with the call's owner as the
/// expected type.
///
/// A receiver that is already initialized and whose declared type is not the owner is a
/// program subclass calling its JDK super constructor; that call is a no-op.
pub(super) fn construct(call: &MethodCall<'_>, context: &mut Context, object: HostObject) -> Result<JavaValue> {
    let this = call.this()?;
    let heap = context.heap_mut();
    {
        let target = heap.object(this)?;
        if target.is_initialized() && target.class_name != call.owner {
            return Ok(JavaValue::Void);
        }
    }
    heap.initialize(this, call.owner, object)?;
    Ok(JavaValue::Void)
}

/// `int` argument `index`.
pub(super) fn int_arg(call: &MethodCall<'_>, index: usize) -> Result<i32> {
    call.arg(index)?.as_int("argument")
}

/// Copy of the string argument `index`; `null` is a runtime fault.
pub(super) fn string_arg(call: &MethodCall<'_>, index: usize, context: &Context) -> Result<U16String> {
    Ok(context.heap().string(call.arg(index)?)?.clone())
}

/// Copy of the receiver's string contents.
pub(super) fn this_string(call: &MethodCall<'_>, context: &Context) -> Result<U16String> {
    Ok(context.heap().string(call.this()?)?.clone())
}

/// Unsigned copy of a `byte[]` argument.
pub(super) fn bytes_arg(call: &MethodCall<'_>, index: usize, context: &Context) -> Result<Vec<u8>> {
    context.heap().narrow::<JavaArray>(call.arg(index)?)?.bytes()
}

/// Allocates a fresh string.
pub(super) fn new_string(context: &mut Context, value: U16String) -> Result<JavaValue> {
    context.heap_mut().alloc_string(value)
}

/// Allocates a `byte[]`.
pub(super) fn new_bytes(context: &mut Context, bytes: &[u8]) -> Result<JavaValue> {
    context
        .heap_mut()
        .wrap(HostObject::Array(JavaArray::from_bytes(bytes)))
}

/// Allocates a reference array of component class `component` (internal name).
pub(super) fn new_reference_array(
    context: &mut Context,
    component: &str,
    elements: Vec<JavaValue>,
) -> Result<JavaValue> {
    let component = if component.starts_with('[') {
        component.to_string()
    } else {
        format!("L{component};")
    };
    context
        .heap_mut()
        .wrap(HostObject::Array(JavaArray::Reference { component, elements }))
}

/// Allocates a `java.lang.Class` for `name` (internal name, array descriptor or
/// primitive keyword).
pub(super) fn new_class(context: &mut Context, name: &str) -> Result<JavaValue> {
    context.heap_mut().wrap(HostObject::Class(JavaClass {
        name: name.to_string(),
    }))
}

/// Allocates a `StackTraceElement[]` for `frames`, most recent first.
pub(super) fn stack_trace_array(context: &mut Context, frames: Vec<StackFrame>) -> Result<JavaValue> {
    let mut elements = Vec::with_capacity(frames.len());
    for frame in frames {
        elements.push(context.heap_mut().wrap(HostObject::StackTraceElement(frame))?);
    }
    new_reference_array(context, "java/lang/StackTraceElement", elements)
}

/// `Class.getName()` form of a class name: dots instead of slashes, array descriptors
/// kept as descriptors.
pub(super) fn binary_name(name: &str) -> String {
    name.replace('/', ".")
}

/// The text `String.valueOf(Object)` produces for `value`.
pub(super) fn display_string(value: JavaValue, context: &Context) -> Result<U16String> {
    if value.is_null() {
        return Ok(U16String::from_str("null"));
    }
    let object = context.heap().object(value)?;
    let payload = match &object.state {
        ObjectState::Initialized(payload) => payload,
        ObjectState::Uninitialized => {
            return Err(EmulationError::UninitializedObject {
                class_name: object.class_name.clone(),
            }
            .into())
        }
    };
    let text = match payload {
        HostObject::String(value) => return Ok(value.clone()),
        HostObject::StringBuilder(builder) => return Ok(builder.buffer.clone()),
        HostObject::Class(class) => format!("class {}", binary_name(&class.name)),
        HostObject::Throwable(throwable) => {
            let name = binary_name(&object.class_name);
            match &throwable.message {
                Some(message) => format!("{name}: {}", message.to_string_lossy()),
                None => name,
            }
        }
        HostObject::StackTraceElement(frame) => frame.to_string(),
        HostObject::CodeLocation(location) => location.url.clone(),
        HostObject::Pattern(pattern) => pattern.source.clone(),
        _ => format!("{}@{:x}", binary_name(&object.class_name), value_id(value)),
    };
    Ok(U16String::from_str(&text))
}

fn value_id(value: JavaValue) -> u32 {
    value.as_reference().map_or(0, |reference| reference.id())
}

/// A `StringIndexOutOfBoundsException`.
pub(super) fn string_index(index: i64, length: usize) -> crate::Error {
    EmulationError::StringIndexOutOfBounds { index, length }.into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        emulation::{JavaStringBuilder, NativeCatalog},
        metadata::ClassDictionary,
        test::jdk_context,
    };

    #[test]
    fn test_catalog_has_no_duplicates() {
        let mut catalog = NativeCatalog::new();
        register_all(&mut catalog).unwrap();
        assert!(catalog.len() > 100);
    }

    #[test]
    fn test_display_string() {
        let mut context = jdk_context(ClassDictionary::new());
        let builder = context
            .heap_mut()
            .wrap(HostObject::StringBuilder(JavaStringBuilder {
                buffer: U16String::from_str("abc"),
            }))
            .unwrap();
        let class = new_class(&mut context, "a/b/C").unwrap();

        assert_eq!(display_string(JavaValue::Null, &context).unwrap().to_string_lossy(), "null");
        assert_eq!(display_string(builder, &context).unwrap().to_string_lossy(), "abc");
        assert_eq!(display_string(class, &context).unwrap().to_string_lossy(), "class a.b.C");
    }
}
