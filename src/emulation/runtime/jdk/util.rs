//! `java.util` and `java.nio.charset` stubs.

use regex::Regex;
use widestring::U16String;

use crate::{
    emulation::{
        runtime::{
            jdk::{
                display_string, new_reference_array, new_string, string::split, string::Charset,
                string_arg,
            },
            provider::{MethodCall, NativeCatalog},
        },
        Context, EmulationError, HostObject, JavaCollection, JavaIterator, JavaPattern, JavaValue,
    },
    Result,
};

/// Registers the collection, regex and charset stubs.
///
/// # Errors
/// Returns [`crate::Error::Configuration`] on a key collision.
pub fn register(catalog: &mut NativeCatalog) -> Result<()> {
    const PATTERN: &str = "java/util/regex/Pattern";
    catalog.register(
        PATTERN,
        "compile(Ljava/lang/String;)Ljava/util/regex/Pattern;",
        pattern_compile,
    )?;
    catalog.register(PATTERN, "pattern()Ljava/lang/String;", pattern_source)?;
    catalog.register(
        PATTERN,
        "split(Ljava/lang/CharSequence;)[Ljava/lang/String;",
        pattern_split,
    )?;

    catalog.register(
        "java/nio/charset/Charset",
        "availableCharsets()Ljava/util/SortedMap;",
        charset_available,
    )?;
    catalog.register("java/util/SortedMap", "keySet()Ljava/util/Set;", sorted_map_key_set)?;
    catalog.register("java/util/Set", "iterator()Ljava/util/Iterator;", set_iterator)?;
    catalog.register("java/util/Set", "size()I", set_size)?;
    catalog.register("java/util/Iterator", "hasNext()Z", iterator_has_next)?;
    catalog.register("java/util/Iterator", "next()Ljava/lang/Object;", iterator_next)?;
    Ok(())
}

fn pattern_compile(call: &MethodCall<'_>, context: &mut Context) -> Result<JavaValue> {
    let source = string_arg(call, 0, context)?.to_string_lossy();
    let regex = Regex::new(&source).map_err(|error| EmulationError::host("Pattern.compile", error))?;
    context
        .heap_mut()
        .wrap(HostObject::Pattern(JavaPattern { source, regex }))
}

fn pattern_source(call: &MethodCall<'_>, context: &mut Context) -> Result<JavaValue> {
    let source = context.heap().narrow::<JavaPattern>(call.this()?)?.source.clone();
    context.heap_mut().alloc_str(&source)
}

fn pattern_split(call: &MethodCall<'_>, context: &mut Context) -> Result<JavaValue> {
    let regex = context.heap().narrow::<JavaPattern>(call.this()?)?.regex.clone();
    let input = display_string(call.arg(0)?, context)?.to_string_lossy();
    let mut elements = Vec::new();
    for part in split(&input, &regex) {
        elements.push(new_string(context, U16String::from_str(&part))?);
    }
    new_reference_array(context, "java/lang/String", elements)
}

/// The map's keys stand in for the map: the only supported operation is `keySet`.
fn charset_available(_call: &MethodCall<'_>, context: &mut Context) -> Result<JavaValue> {
    let mut elements = Vec::with_capacity(Charset::NAMES.len());
    for name in Charset::NAMES {
        elements.push(context.heap_mut().alloc_str(name)?);
    }
    context.heap_mut().wrap_as(
        "java/util/SortedMap",
        HostObject::Collection(JavaCollection { elements }),
    )
}

fn sorted_map_key_set(call: &MethodCall<'_>, context: &mut Context) -> Result<JavaValue> {
    let keys = context.heap().narrow::<JavaCollection>(call.this()?)?.clone();
    context.heap_mut().wrap(HostObject::Collection(keys))
}

fn set_iterator(call: &MethodCall<'_>, context: &mut Context) -> Result<JavaValue> {
    let elements = context
        .heap()
        .narrow::<JavaCollection>(call.this()?)?
        .elements
        .clone();
    context
        .heap_mut()
        .wrap(HostObject::Iterator(JavaIterator { elements, cursor: 0 }))
}

fn set_size(call: &MethodCall<'_>, context: &mut Context) -> Result<JavaValue> {
    let size = context.heap().narrow::<JavaCollection>(call.this()?)?.elements.len();
    Ok(JavaValue::Int(i32::try_from(size).unwrap_or(i32::MAX)))
}

fn iterator_has_next(call: &MethodCall<'_>, context: &mut Context) -> Result<JavaValue> {
    let iterator = context.heap().narrow::<JavaIterator>(call.this()?)?;
    Ok(JavaValue::Int(i32::from(iterator.cursor < iterator.elements.len())))
}

fn iterator_next(call: &MethodCall<'_>, context: &mut Context) -> Result<JavaValue> {
    let iterator = context.heap_mut().narrow_mut::<JavaIterator>(call.this()?)?;
    let Some(next) = iterator.elements.get(iterator.cursor).copied() else {
        return Err(EmulationError::ExceptionThrown {
            class_name: "java/util/NoSuchElementException".to_string(),
        }
        .into());
    };
    iterator.cursor += 1;
    Ok(next)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        emulation::{FaultKind, JavaArray},
        metadata::ClassDictionary,
        test::{call_static, call_virtual, jdk_context},
    };

    #[test]
    fn test_iterate_available_charsets() {
        let mut context = jdk_context(ClassDictionary::new());
        let map = call_static(
            &mut context,
            "java/nio/charset/Charset",
            "availableCharsets",
            "()Ljava/util/SortedMap;",
            &[],
        )
        .unwrap();
        let keys = call_virtual(&mut context, "java/util/SortedMap", "keySet", "()Ljava/util/Set;", map, &[])
            .unwrap();
        let iterator = call_virtual(
            &mut context,
            "java/util/Set",
            "iterator",
            "()Ljava/util/Iterator;",
            keys,
            &[],
        )
        .unwrap();

        let mut names = Vec::new();
        while call_virtual(&mut context, "java/util/Iterator", "hasNext", "()Z", iterator, &[]).unwrap()
            == JavaValue::Int(1)
        {
            let name = call_virtual(
                &mut context,
                "java/util/Iterator",
                "next",
                "()Ljava/lang/Object;",
                iterator,
                &[],
            )
            .unwrap();
            names.push(context.heap().rust_string(name).unwrap());
        }
        assert_eq!(names, Charset::NAMES.to_vec());
        let mut sorted = names.clone();
        sorted.sort();
        assert_eq!(names, sorted);

        let error = call_virtual(
            &mut context,
            "java/util/Iterator",
            "next",
            "()Ljava/lang/Object;",
            iterator,
            &[],
        )
        .unwrap_err();
        assert_eq!(error.fault_kind(), Some(FaultKind::Runtime));
    }

    #[test]
    fn test_pattern() {
        let mut context = jdk_context(ClassDictionary::new());
        let source = context.heap_mut().alloc_str("[,;]").unwrap();
        let pattern = call_static(
            &mut context,
            "java/util/regex/Pattern",
            "compile",
            "(Ljava/lang/String;)Ljava/util/regex/Pattern;",
            &[source],
        )
        .unwrap();
        let input = context.heap_mut().alloc_str("a,b;;c,,").unwrap();
        let parts = call_virtual(
            &mut context,
            "java/util/regex/Pattern",
            "split",
            "(Ljava/lang/CharSequence;)[Ljava/lang/String;",
            pattern,
            &[input],
        )
        .unwrap();
        let parts = context.heap().narrow::<JavaArray>(parts).unwrap().clone();
        let parts: Vec<String> = parts
            .references()
            .unwrap()
            .iter()
            .map(|part| context.heap().rust_string(*part).unwrap())
            .collect();
        assert_eq!(parts, vec!["a", "b", "", "c"]);

        let broken = context.heap_mut().alloc_str("(").unwrap();
        let error = call_static(
            &mut context,
            "java/util/regex/Pattern",
            "compile",
            "(Ljava/lang/String;)Ljava/util/regex/Pattern;",
            &[broken],
        )
        .unwrap_err();
        assert_eq!(error.fault_kind(), Some(FaultKind::Host));
    }
}
