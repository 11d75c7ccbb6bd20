//! `java.lang` core stubs.
//!
//! | Method | Behavior |
//! |--------|----------|
//! | `Object.<init>()` | Completes construction of plain objects |
//! | `Object.getClass()` | `Class` of the receiver's declared type |
//! | `System.currentTimeMillis()` | Host wall clock |
//! | `System.arraycopy(...)` | Bounds-checked element copy |
//! | `Thread.currentThread()` | Opaque thread object |
//! | `Thread.getStackTrace()` | Synthetic call stack, with a `Thread.getStackTrace` frame on top |
//! | `StackTraceElement.getClassName/getMethodName/getLineNumber` | Frame fields |
//! | `Long.parseLong`, `Integer.parseInt` | Radix parsing with `NumberFormatException` |
//! | `SharedSecrets.getJavaLangAccess()` | Opaque access object |
//! | `JavaLangAccess.getConstantPool(Class)` | Constant pool handle of a program class |
//! | `ConstantPool.getSize()` | Constant pool entry count |

use std::time::{SystemTime, UNIX_EPOCH};

use widestring::U16String;

use crate::{
    emulation::{
        runtime::{
            jdk::{construct, int_arg, new_class, new_string, stack_trace_array, string_arg},
            provider::{MethodCall, NativeCatalog},
        },
        Context, EmulationError, HostObject, JavaArray, JavaClass, JavaConstantPool, JavaValue,
        StackFrame,
    },
    Result,
};

/// Registers the `java.lang` core stubs.
///
/// # Errors
/// Returns [`crate::Error::Configuration`] on a key collision.
pub fn register(catalog: &mut NativeCatalog) -> Result<()> {
    catalog.register("java/lang/Object", "<init>()V", object_init)?;
    catalog.register("java/lang/Object", "getClass()Ljava/lang/Class;", object_get_class)?;

    catalog.register("java/lang/System", "currentTimeMillis()J", system_current_time_millis)?;
    catalog.register(
        "java/lang/System",
        "arraycopy(Ljava/lang/Object;ILjava/lang/Object;II)V",
        system_arraycopy,
    )?;

    catalog.register("java/lang/Thread", "currentThread()Ljava/lang/Thread;", thread_current)?;
    catalog.register(
        "java/lang/Thread",
        "getStackTrace()[Ljava/lang/StackTraceElement;",
        thread_get_stack_trace,
    )?;

    catalog.register(
        "java/lang/StackTraceElement",
        "getClassName()Ljava/lang/String;",
        frame_get_class_name,
    )?;
    catalog.register(
        "java/lang/StackTraceElement",
        "getMethodName()Ljava/lang/String;",
        frame_get_method_name,
    )?;
    catalog.register("java/lang/StackTraceElement", "getLineNumber()I", frame_get_line_number)?;

    catalog.register("java/lang/Long", "parseLong(Ljava/lang/String;)J", long_parse)?;
    catalog.register("java/lang/Long", "parseLong(Ljava/lang/String;I)J", long_parse_radix)?;
    catalog.register("java/lang/Integer", "parseInt(Ljava/lang/String;)I", integer_parse)?;

    // reflective constant pool access used to size key tables
    catalog.register(
        "sun/misc/SharedSecrets",
        "getJavaLangAccess()Lsun/misc/JavaLangAccess;",
        shared_secrets_access,
    )?;
    catalog.register(
        "sun/misc/JavaLangAccess",
        "getConstantPool(Ljava/lang/Class;)Lsun/reflect/ConstantPool;",
        access_get_constant_pool,
    )?;
    catalog.register("sun/reflect/ConstantPool", "getSize()I", constant_pool_get_size)?;
    Ok(())
}

fn object_init(call: &MethodCall<'_>, context: &mut Context) -> Result<JavaValue> {
    construct(call, context, HostObject::Opaque)
}

fn object_get_class(call: &MethodCall<'_>, context: &mut Context) -> Result<JavaValue> {
    let name = context.heap().class_name(call.this()?)?.to_string();
    new_class(context, &name)
}

fn system_current_time_millis(_call: &MethodCall<'_>, _context: &mut Context) -> Result<JavaValue> {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|error| EmulationError::host("System.currentTimeMillis", error))?
        .as_millis();
    Ok(JavaValue::Long(i64::try_from(millis).unwrap_or(i64::MAX)))
}

fn system_arraycopy(call: &MethodCall<'_>, context: &mut Context) -> Result<JavaValue> {
    let source = context.heap().narrow::<JavaArray>(call.arg(0)?)?.clone();
    let source_position = int_arg(call, 1)?;
    let destination = call.arg(2)?;
    let destination_position = int_arg(call, 3)?;
    let length = int_arg(call, 4)?;

    context
        .heap_mut()
        .narrow_mut::<JavaArray>(destination)?
        .copy_from(destination_position, &source, source_position, length)?;
    Ok(JavaValue::Void)
}

fn thread_current(_call: &MethodCall<'_>, context: &mut Context) -> Result<JavaValue> {
    context.heap_mut().wrap_as("java/lang/Thread", HostObject::Opaque)
}

fn thread_get_stack_trace(_call: &MethodCall<'_>, context: &mut Context) -> Result<JavaValue> {
    // a real VM reports getStackTrace itself as the innermost frame
    context.push("java/lang/Thread", "getStackTrace", 0)?;
    let frames = context.snapshot();
    context.pop()?;
    stack_trace_array(context, frames)
}

fn this_frame(call: &MethodCall<'_>, context: &Context) -> Result<StackFrame> {
    Ok(context.heap().narrow::<StackFrame>(call.this()?)?.clone())
}

fn frame_get_class_name(call: &MethodCall<'_>, context: &mut Context) -> Result<JavaValue> {
    let frame = this_frame(call, context)?;
    new_string(context, U16String::from_str(&frame.class_name))
}

fn frame_get_method_name(call: &MethodCall<'_>, context: &mut Context) -> Result<JavaValue> {
    let frame = this_frame(call, context)?;
    new_string(context, U16String::from_str(&frame.method_name))
}

fn frame_get_line_number(call: &MethodCall<'_>, context: &mut Context) -> Result<JavaValue> {
    Ok(JavaValue::Int(this_frame(call, context)?.line_number))
}

/// `Long.parseLong` / `Integer.parseInt` semantics over Rust's radix parser.
fn parse_integer(text: &U16String, radix: i32) -> Result<i64> {
    let input = text.to_string_lossy();
    let number_format = || EmulationError::NumberFormat {
        input: input.clone(),
    };
    let radix = u32::try_from(radix)
        .ok()
        .filter(|radix| (2..=36).contains(radix))
        .ok_or_else(number_format)?;
    Ok(i64::from_str_radix(&input, radix).map_err(|_| number_format())?)
}

fn long_parse(call: &MethodCall<'_>, context: &mut Context) -> Result<JavaValue> {
    let text = string_arg(call, 0, context)?;
    Ok(JavaValue::Long(parse_integer(&text, 10)?))
}

fn long_parse_radix(call: &MethodCall<'_>, context: &mut Context) -> Result<JavaValue> {
    let text = string_arg(call, 0, context)?;
    let radix = int_arg(call, 1)?;
    Ok(JavaValue::Long(parse_integer(&text, radix)?))
}

fn integer_parse(call: &MethodCall<'_>, context: &mut Context) -> Result<JavaValue> {
    let text = string_arg(call, 0, context)?;
    let value = parse_integer(&text, 10)?;
    let value = i32::try_from(value).map_err(|_| EmulationError::NumberFormat {
        input: text.to_string_lossy(),
    })?;
    Ok(JavaValue::Int(value))
}

fn shared_secrets_access(_call: &MethodCall<'_>, context: &mut Context) -> Result<JavaValue> {
    context
        .heap_mut()
        .wrap_as("sun/misc/JavaLangAccess", HostObject::Opaque)
}

fn access_get_constant_pool(call: &MethodCall<'_>, context: &mut Context) -> Result<JavaValue> {
    let name = context.heap().narrow::<JavaClass>(call.arg(0)?)?.name.clone();
    let class = context
        .dictionary()
        .get(&name)
        .ok_or_else(|| EmulationError::ClassNotFound { name: name.clone() })?;
    let size = i32::from(class.constant_pool_size);
    context
        .heap_mut()
        .wrap(HostObject::ConstantPool(JavaConstantPool { owner: name, size }))
}

fn constant_pool_get_size(call: &MethodCall<'_>, context: &mut Context) -> Result<JavaValue> {
    let pool = context.heap().narrow::<JavaConstantPool>(call.this()?)?;
    Ok(JavaValue::Int(pool.size))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        assembly::ArrayType,
        emulation::FaultKind,
        metadata::{ClassDictionary, ClassFile},
        test::{call_static, call_virtual, jdk_context},
    };

    #[test]
    fn test_arraycopy() {
        let mut context = jdk_context(ClassDictionary::new());
        let heap = context.heap_mut();
        let source = heap.wrap(HostObject::Array(JavaArray::from_bytes(&[1, 2, 3, 4]))).unwrap();
        let destination = heap
            .wrap(HostObject::Array(JavaArray::primitive(ArrayType::Byte, 4)))
            .unwrap();

        call_static(
            &mut context,
            "java/lang/System",
            "arraycopy",
            "(Ljava/lang/Object;ILjava/lang/Object;II)V",
            &[source, JavaValue::Int(1), destination, JavaValue::Int(0), JavaValue::Int(3)],
        )
        .unwrap();
        let bytes = context.heap().narrow::<JavaArray>(destination).unwrap().bytes().unwrap();
        assert_eq!(bytes, vec![2, 3, 4, 0]);

        let error = call_static(
            &mut context,
            "java/lang/System",
            "arraycopy",
            "(Ljava/lang/Object;ILjava/lang/Object;II)V",
            &[source, JavaValue::Int(2), destination, JavaValue::Int(0), JavaValue::Int(3)],
        )
        .unwrap_err();
        assert_eq!(error.fault_kind(), Some(FaultKind::Runtime));
    }

    #[test]
    fn test_thread_stack_trace() {
        let mut context = jdk_context(ClassDictionary::new());
        context.push("a/Caller", "main", 10).unwrap();
        context.push("a/Decrypter", "decrypt", 31).unwrap();

        let trace = call_virtual(
            &mut context,
            "java/lang/Thread",
            "getStackTrace",
            "()[Ljava/lang/StackTraceElement;",
            JavaValue::Null,
            &[],
        )
        .unwrap();
        // the temporary frame is gone again
        assert_eq!(context.depth(), 2);

        let elements = context.heap().narrow::<JavaArray>(trace).unwrap().clone();
        assert_eq!(elements.len(), 3);
        let top = elements.load(0).unwrap();
        let caller = elements.load(2).unwrap();
        assert_eq!(context.heap().narrow::<StackFrame>(top).unwrap().method_name, "getStackTrace");

        let line = call_virtual(
            &mut context,
            "java/lang/StackTraceElement",
            "getLineNumber",
            "()I",
            elements.load(1).unwrap(),
            &[],
        )
        .unwrap();
        assert_eq!(line, JavaValue::Int(31));

        let name = call_virtual(
            &mut context,
            "java/lang/StackTraceElement",
            "getClassName",
            "()Ljava/lang/String;",
            caller,
            &[],
        )
        .unwrap();
        assert_eq!(context.heap().rust_string(name).unwrap(), "a.Caller");
    }

    #[test]
    fn test_parse_numbers() {
        let mut context = jdk_context(ClassDictionary::new());
        let text = context.heap_mut().alloc_str("-ff").unwrap();
        let value = call_static(
            &mut context,
            "java/lang/Long",
            "parseLong",
            "(Ljava/lang/String;I)J",
            &[text, JavaValue::Int(16)],
        )
        .unwrap();
        assert_eq!(value, JavaValue::Long(-255));

        let error = call_static(
            &mut context,
            "java/lang/Long",
            "parseLong",
            "(Ljava/lang/String;I)J",
            &[text, JavaValue::Int(37)],
        )
        .unwrap_err();
        assert_eq!(error.fault_kind(), Some(FaultKind::Runtime));

        let big = context.heap_mut().alloc_str("4294967296").unwrap();
        let error = call_static(
            &mut context,
            "java/lang/Integer",
            "parseInt",
            "(Ljava/lang/String;)I",
            &[big],
        )
        .unwrap_err();
        assert!(matches!(
            error.as_emulation(),
            Some(EmulationError::NumberFormat { .. })
        ));
    }

    #[test]
    fn test_constant_pool_size() {
        let dictionary: ClassDictionary =
            std::iter::once(ClassFile::new("a/Keys").with_constant_pool_size(77)).collect();
        let mut context = jdk_context(dictionary);

        let access = call_static(
            &mut context,
            "sun/misc/SharedSecrets",
            "getJavaLangAccess",
            "()Lsun/misc/JavaLangAccess;",
            &[],
        )
        .unwrap();
        let class = new_class(&mut context, "a/Keys").unwrap();
        let pool = call_virtual(
            &mut context,
            "sun/misc/JavaLangAccess",
            "getConstantPool",
            "(Ljava/lang/Class;)Lsun/reflect/ConstantPool;",
            access,
            &[class],
        )
        .unwrap();
        let size = call_virtual(&mut context, "sun/reflect/ConstantPool", "getSize", "()I", pool, &[])
            .unwrap();
        assert_eq!(size, JavaValue::Int(77));

        let unknown = new_class(&mut context, "a/Missing").unwrap();
        let error = call_virtual(
            &mut context,
            "sun/misc/JavaLangAccess",
            "getConstantPool",
            "(Ljava/lang/Class;)Lsun/reflect/ConstantPool;",
            access,
            &[unknown],
        )
        .unwrap_err();
        assert_eq!(error.fault_kind(), Some(FaultKind::UnresolvedMember));
    }

    #[test]
    fn test_object_lifecycle() {
        let mut context = jdk_context(ClassDictionary::new());
        let object = context.heap_mut().placeholder("java/lang/Object").unwrap();
        call_virtual(&mut context, "java/lang/Object", "<init>", "()V", object, &[]).unwrap();
        assert!(context.heap().is_initialized(object).unwrap());

        let class = call_virtual(
            &mut context,
            "java/lang/Object",
            "getClass",
            "()Ljava/lang/Class;",
            object,
            &[],
        )
        .unwrap();
        assert_eq!(context.heap().narrow::<JavaClass>(class).unwrap().name, "java/lang/Object");
    }
}
