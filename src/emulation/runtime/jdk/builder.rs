//! `java.lang.StringBuilder` and `java.lang.StringBuffer` stubs.
//!
//! Both classes share the [`JavaStringBuilder`] payload; only the declared type of the
//! heap object differs. Every `append` and `insert` returns its receiver so chained calls
//! keep working on the same object.

use widestring::U16String;

use crate::{
    emulation::{
        runtime::{
            jdk::{construct, display_string, int_arg, new_string, string_arg, string_index},
            provider::{MethodCall, NativeCatalog},
        },
        Context, EmulationError, HostObject, JavaStringBuilder, JavaValue,
    },
    Result,
};

const BUILDER: &str = "java/lang/StringBuilder";
const BUFFER: &str = "java/lang/StringBuffer";

/// Registers the builder stubs.
///
/// # Errors
/// Returns [`crate::Error::Configuration`] on a key collision.
pub fn register(catalog: &mut NativeCatalog) -> Result<()> {
    catalog.register(BUILDER, "<init>()V", builder_init)?;
    catalog.register(BUILDER, "<init>(Ljava/lang/String;)V", builder_init_string)?;
    catalog.register(BUILDER, "append(I)Ljava/lang/StringBuilder;", append_int)?;
    catalog.register(BUILDER, "append(C)Ljava/lang/StringBuilder;", append_char)?;
    catalog.register(
        BUILDER,
        "append(Ljava/lang/String;)Ljava/lang/StringBuilder;",
        append_string,
    )?;
    catalog.register(
        BUILDER,
        "append(Ljava/lang/Object;)Ljava/lang/StringBuilder;",
        append_object,
    )?;
    catalog.register(BUILDER, "toString()Ljava/lang/String;", to_string)?;
    catalog.register(BUILDER, "length()I", length)?;
    catalog.register(BUILDER, "charAt(I)C", char_at)?;
    catalog.register(BUILDER, "setCharAt(IC)V", set_char_at)?;
    catalog.register(BUILDER, "reverse()Ljava/lang/StringBuilder;", reverse)?;

    catalog.register(BUFFER, "<init>(Ljava/lang/String;)V", builder_init_string)?;
    catalog.register(BUFFER, "<init>(I)V", buffer_init_capacity)?;
    catalog.register(BUFFER, "<init>()V", builder_init)?;
    catalog.register(
        BUFFER,
        "insert(ILjava/lang/String;)Ljava/lang/StringBuffer;",
        insert_string,
    )?;
    catalog.register(
        BUFFER,
        "append(Ljava/lang/String;)Ljava/lang/StringBuffer;",
        append_string,
    )?;
    catalog.register(BUFFER, "append(C)Ljava/lang/StringBuffer;", append_char)?;
    catalog.register(BUFFER, "toString()Ljava/lang/String;", to_string)?;
    Ok(())
}

/// Applies `apply` to the receiver's code units and returns the receiver.
fn edit<F>(call: &MethodCall<'_>, context: &mut Context, apply: F) -> Result<JavaValue>
where
    F: FnOnce(&mut Vec<u16>) -> Result<()>,
{
    let this = call.this()?;
    let builder = context.heap_mut().narrow_mut::<JavaStringBuilder>(this)?;
    let mut units = std::mem::take(&mut builder.buffer).into_vec();
    let outcome = apply(&mut units);
    builder.buffer = U16String::from_vec(units);
    outcome.map(|()| this)
}

fn contents(call: &MethodCall<'_>, context: &Context) -> Result<Vec<u16>> {
    Ok(context
        .heap()
        .narrow::<JavaStringBuilder>(call.this()?)?
        .buffer
        .as_slice()
        .to_vec())
}

/// The argument string, `"null"` for a null reference.
fn string_or_null(call: &MethodCall<'_>, index: usize, context: &Context) -> Result<U16String> {
    if call.arg(index)?.is_null() {
        return Ok(U16String::from_str("null"));
    }
    string_arg(call, index, context)
}

fn builder_init(call: &MethodCall<'_>, context: &mut Context) -> Result<JavaValue> {
    construct(call, context, HostObject::StringBuilder(JavaStringBuilder::default()))
}

fn builder_init_string(call: &MethodCall<'_>, context: &mut Context) -> Result<JavaValue> {
    let buffer = string_arg(call, 0, context)?;
    construct(call, context, HostObject::StringBuilder(JavaStringBuilder { buffer }))
}

fn buffer_init_capacity(call: &MethodCall<'_>, context: &mut Context) -> Result<JavaValue> {
    let capacity = int_arg(call, 0)?;
    if capacity < 0 {
        return Err(EmulationError::NegativeArraySize { size: capacity }.into());
    }
    construct(call, context, HostObject::StringBuilder(JavaStringBuilder::default()))
}

fn append_int(call: &MethodCall<'_>, context: &mut Context) -> Result<JavaValue> {
    let value = int_arg(call, 0)?;
    edit(call, context, |units| {
        units.extend(value.to_string().encode_utf16());
        Ok(())
    })
}

fn append_char(call: &MethodCall<'_>, context: &mut Context) -> Result<JavaValue> {
    // char arguments arrive widened to int
    let unit = int_arg(call, 0)? as u16;
    edit(call, context, |units| {
        units.push(unit);
        Ok(())
    })
}

fn append_string(call: &MethodCall<'_>, context: &mut Context) -> Result<JavaValue> {
    let suffix = string_or_null(call, 0, context)?;
    edit(call, context, |units| {
        units.extend_from_slice(suffix.as_slice());
        Ok(())
    })
}

fn append_object(call: &MethodCall<'_>, context: &mut Context) -> Result<JavaValue> {
    let suffix = display_string(call.arg(0)?, context)?;
    edit(call, context, |units| {
        units.extend_from_slice(suffix.as_slice());
        Ok(())
    })
}

fn to_string(call: &MethodCall<'_>, context: &mut Context) -> Result<JavaValue> {
    let units = contents(call, context)?;
    new_string(context, U16String::from_vec(units))
}

fn length(call: &MethodCall<'_>, context: &mut Context) -> Result<JavaValue> {
    let length = context
        .heap()
        .narrow::<JavaStringBuilder>(call.this()?)?
        .buffer
        .len();
    Ok(JavaValue::Int(i32::try_from(length).unwrap_or(i32::MAX)))
}

fn position(index: i32, length: usize) -> Result<usize> {
    usize::try_from(index)
        .ok()
        .filter(|position| *position < length)
        .ok_or_else(|| string_index(i64::from(index), length))
}

fn char_at(call: &MethodCall<'_>, context: &mut Context) -> Result<JavaValue> {
    let index = int_arg(call, 0)?;
    let units = contents(call, context)?;
    let position = position(index, units.len())?;
    Ok(JavaValue::Int(i32::from(units[position])))
}

fn set_char_at(call: &MethodCall<'_>, context: &mut Context) -> Result<JavaValue> {
    let index = int_arg(call, 0)?;
    let unit = int_arg(call, 1)? as u16;
    edit(call, context, |units| {
        let position = position(index, units.len())?;
        units[position] = unit;
        Ok(())
    })?;
    Ok(JavaValue::Void)
}

/// Reverses code units, then restores the order inside each surrogate pair.
fn reverse_units(units: &mut [u16]) {
    units.reverse();
    let mut index = 0;
    while index + 1 < units.len() {
        let low = (0xdc00..=0xdfff).contains(&units[index]);
        let high = (0xd800..=0xdbff).contains(&units[index + 1]);
        if low && high {
            units.swap(index, index + 1);
            index += 2;
        } else {
            index += 1;
        }
    }
}

fn reverse(call: &MethodCall<'_>, context: &mut Context) -> Result<JavaValue> {
    edit(call, context, |units| {
        reverse_units(units);
        Ok(())
    })
}

fn insert_string(call: &MethodCall<'_>, context: &mut Context) -> Result<JavaValue> {
    let offset = int_arg(call, 0)?;
    let inserted = string_or_null(call, 1, context)?;
    edit(call, context, |units| {
        let at = usize::try_from(offset)
            .ok()
            .filter(|at| *at <= units.len())
            .ok_or_else(|| string_index(i64::from(offset), units.len()))?;
        units.splice(at..at, inserted.as_slice().iter().copied());
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        emulation::FaultKind,
        metadata::ClassDictionary,
        test::{call_virtual, jdk_context},
    };

    fn new_builder(context: &mut Context, owner: &str) -> JavaValue {
        let builder = context.heap_mut().placeholder(owner).unwrap();
        call_virtual(context, owner, "<init>", "()V", builder, &[]).unwrap();
        builder
    }

    fn text(context: &mut Context, owner: &str, builder: JavaValue) -> String {
        let value =
            call_virtual(context, owner, "toString", "()Ljava/lang/String;", builder, &[]).unwrap();
        context.heap().rust_string(value).unwrap()
    }

    #[test]
    fn test_append_chain_matches_host() {
        let mut context = jdk_context(ClassDictionary::new());
        let builder = new_builder(&mut context, BUILDER);
        let part = context.heap_mut().alloc_str("key").unwrap();

        let returned = call_virtual(
            &mut context,
            BUILDER,
            "append",
            "(Ljava/lang/String;)Ljava/lang/StringBuilder;",
            builder,
            &[part],
        )
        .unwrap();
        assert_eq!(returned, builder);
        call_virtual(
            &mut context,
            BUILDER,
            "append",
            "(C)Ljava/lang/StringBuilder;",
            builder,
            &[JavaValue::Int(i32::from(b'-'))],
        )
        .unwrap();
        call_virtual(
            &mut context,
            BUILDER,
            "append",
            "(I)Ljava/lang/StringBuilder;",
            builder,
            &[JavaValue::Int(-42)],
        )
        .unwrap();
        call_virtual(
            &mut context,
            BUILDER,
            "append",
            "(Ljava/lang/String;)Ljava/lang/StringBuilder;",
            builder,
            &[JavaValue::Null],
        )
        .unwrap();

        let mut expected = String::new();
        expected.push_str("key");
        expected.push('-');
        expected.push_str(&(-42).to_string());
        expected.push_str("null");
        assert_eq!(text(&mut context, BUILDER, builder), expected);

        let length = call_virtual(&mut context, BUILDER, "length", "()I", builder, &[]).unwrap();
        assert_eq!(length, JavaValue::Int(expected.len() as i32));
    }

    #[test]
    fn test_set_char_at_and_bounds() {
        let mut context = jdk_context(ClassDictionary::new());
        let initial = context.heap_mut().alloc_str("abc").unwrap();
        let builder = context.heap_mut().placeholder(BUILDER).unwrap();
        call_virtual(&mut context, BUILDER, "<init>", "(Ljava/lang/String;)V", builder, &[initial])
            .unwrap();

        call_virtual(
            &mut context,
            BUILDER,
            "setCharAt",
            "(IC)V",
            builder,
            &[JavaValue::Int(1), JavaValue::Int(i32::from(b'X'))],
        )
        .unwrap();
        assert_eq!(text(&mut context, BUILDER, builder), "aXc");

        let error = call_virtual(
            &mut context,
            BUILDER,
            "charAt",
            "(I)C",
            builder,
            &[JavaValue::Int(3)],
        )
        .unwrap_err();
        assert_eq!(error.fault_kind(), Some(FaultKind::Runtime));
    }

    #[test]
    fn test_reverse_keeps_surrogate_pairs() {
        let mut units: Vec<u16> = "ab\u{1F600}c".encode_utf16().collect();
        reverse_units(&mut units);
        assert_eq!(String::from_utf16(&units).unwrap(), "c\u{1F600}ba");
    }

    #[test]
    fn test_string_buffer_insert() {
        let mut context = jdk_context(ClassDictionary::new());
        let buffer = new_builder(&mut context, BUFFER);
        let tail = context.heap_mut().alloc_str("world").unwrap();
        let head = context.heap_mut().alloc_str("hello ").unwrap();

        call_virtual(
            &mut context,
            BUFFER,
            "append",
            "(Ljava/lang/String;)Ljava/lang/StringBuffer;",
            buffer,
            &[tail],
        )
        .unwrap();
        call_virtual(
            &mut context,
            BUFFER,
            "insert",
            "(ILjava/lang/String;)Ljava/lang/StringBuffer;",
            buffer,
            &[JavaValue::Int(0), head],
        )
        .unwrap();
        assert_eq!(text(&mut context, BUFFER, buffer), "hello world");
        assert_eq!(context.heap().class_name(buffer).unwrap(), BUFFER);

        let error = call_virtual(
            &mut context,
            BUFFER,
            "insert",
            "(ILjava/lang/String;)Ljava/lang/StringBuffer;",
            buffer,
            &[JavaValue::Int(99), head],
        )
        .unwrap_err();
        assert_eq!(error.fault_kind(), Some(FaultKind::Runtime));
    }

    #[test]
    fn test_negative_capacity() {
        let mut context = jdk_context(ClassDictionary::new());
        let buffer = context.heap_mut().placeholder(BUFFER).unwrap();
        let error = call_virtual(&mut context, BUFFER, "<init>", "(I)V", buffer, &[JavaValue::Int(-1)])
            .unwrap_err();
        assert_eq!(error.fault_kind(), Some(FaultKind::Runtime));
    }
}
