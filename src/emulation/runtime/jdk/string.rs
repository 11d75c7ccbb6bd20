//! `java.lang.String` stubs.
//!
//! Strings are UTF-16 code unit sequences, so indices, lengths and `hashCode` match the
//! JVM exactly, including for text with surrogate pairs. `split` compiles its argument
//! with the `regex` crate, which covers the character classes and alternations that
//! decryptors split on.
//!
//! Supported charsets for the byte conversions: `UTF-8`, `ISO-8859-1`, `US-ASCII`,
//! `UTF-16BE`, `UTF-16LE` and `UTF-16` (with byte order mark), under their common
//! aliases and case-insensitively.

use regex::Regex;
use widestring::U16String;

use crate::{
    emulation::{
        runtime::{
            jdk::{
                bytes_arg, construct, display_string, int_arg, new_bytes, new_reference_array,
                new_string, string_arg, string_index, this_string,
            },
            provider::{MethodCall, NativeCatalog},
        },
        Context, EmulationError, HostObject, JavaArray, JavaValue,
    },
    utils::java_hash_code,
    Result,
};

/// Character sets the byte conversions understand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Charset {
    Utf8,
    Latin1,
    Ascii,
    Utf16Be,
    Utf16Le,
    Utf16,
}

impl Charset {
    /// Canonical names, as `Charset.availableCharsets()` reports them.
    pub(super) const NAMES: [&'static str; 6] = [
        "ISO-8859-1",
        "US-ASCII",
        "UTF-16",
        "UTF-16BE",
        "UTF-16LE",
        "UTF-8",
    ];

    pub(super) fn lookup(name: &str) -> Result<Self> {
        let charset = match name.to_ascii_uppercase().as_str() {
            "UTF-8" | "UTF8" => Charset::Utf8,
            "ISO-8859-1" | "ISO8859_1" | "ISO8859-1" | "LATIN1" | "ISO-LATIN-1" => Charset::Latin1,
            "US-ASCII" | "ASCII" | "ASCII7" => Charset::Ascii,
            "UTF-16BE" | "UNICODEBIGUNMARKED" => Charset::Utf16Be,
            "UTF-16LE" | "UNICODELITTLEUNMARKED" => Charset::Utf16Le,
            "UTF-16" | "UTF_16" | "UNICODE" => Charset::Utf16,
            _ => {
                return Err(EmulationError::host(
                    "Charset.forName",
                    format!("unsupported charset {name}"),
                )
                .into())
            }
        };
        Ok(charset)
    }

    pub(super) fn decode(self, bytes: &[u8]) -> U16String {
        match self {
            Charset::Utf8 => U16String::from_str(&String::from_utf8_lossy(bytes)),
            Charset::Latin1 => U16String::from_vec(bytes.iter().map(|byte| u16::from(*byte)).collect::<Vec<_>>()),
            Charset::Ascii => U16String::from_vec(
                bytes
                    .iter()
                    .map(|byte| if byte.is_ascii() { u16::from(*byte) } else { 0xfffd })
                    .collect::<Vec<_>>(),
            ),
            Charset::Utf16Be => decode_utf16(bytes, true),
            Charset::Utf16Le => decode_utf16(bytes, false),
            Charset::Utf16 => match bytes {
                [0xfe, 0xff, rest @ ..] => decode_utf16(rest, true),
                [0xff, 0xfe, rest @ ..] => decode_utf16(rest, false),
                _ => decode_utf16(bytes, true),
            },
        }
    }

    pub(super) fn encode(self, units: &[u16]) -> Vec<u8> {
        match self {
            Charset::Utf8 => {
                // unpaired surrogates become '?', as the JDK encoder does
                let text: String = char::decode_utf16(units.iter().copied())
                    .map(|unit| unit.unwrap_or('?'))
                    .collect();
                text.into_bytes()
            }
            Charset::Latin1 => units
                .iter()
                .map(|unit| u8::try_from(*unit).unwrap_or(b'?'))
                .collect(),
            Charset::Ascii => units
                .iter()
                .map(|unit| u8::try_from(*unit).ok().filter(u8::is_ascii).unwrap_or(b'?'))
                .collect(),
            Charset::Utf16Be => units.iter().flat_map(|unit| unit.to_be_bytes()).collect(),
            Charset::Utf16Le => units.iter().flat_map(|unit| unit.to_le_bytes()).collect(),
            Charset::Utf16 => [0xfe, 0xff]
                .into_iter()
                .chain(units.iter().flat_map(|unit| unit.to_be_bytes()))
                .collect(),
        }
    }
}

fn decode_utf16(bytes: &[u8], big_endian: bool) -> U16String {
    let mut units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|pair| {
            if big_endian {
                u16::from_be_bytes([pair[0], pair[1]])
            } else {
                u16::from_le_bytes([pair[0], pair[1]])
            }
        })
        .collect();
    if bytes.len() % 2 != 0 {
        units.push(0xfffd);
    }
    U16String::from_vec(units)
}

/// Registers the `java.lang.String` stubs.
///
/// # Errors
/// Returns [`crate::Error::Configuration`] on a key collision.
pub fn register(catalog: &mut NativeCatalog) -> Result<()> {
    const OWNER: &str = "java/lang/String";

    catalog.register(OWNER, "<init>([CII)V", string_init_chars_range)?;
    catalog.register(OWNER, "<init>([C)V", string_init_chars)?;
    catalog.register(OWNER, "<init>([B)V", string_init_bytes)?;
    catalog.register(OWNER, "<init>([BLjava/lang/String;)V", string_init_bytes_charset)?;

    catalog.register(OWNER, "intern()Ljava/lang/String;", string_intern)?;
    catalog.register(OWNER, "equals(Ljava/lang/Object;)Z", string_equals)?;
    catalog.register(OWNER, "trim()Ljava/lang/String;", string_trim)?;
    catalog.register(OWNER, "toCharArray()[C", string_to_char_array)?;
    catalog.register(OWNER, "length()I", string_length)?;
    catalog.register(OWNER, "hashCode()I", string_hash_code)?;
    catalog.register(OWNER, "charAt(I)C", string_char_at)?;
    catalog.register(OWNER, "indexOf(I)I", string_index_of)?;
    catalog.register(OWNER, "indexOf(II)I", string_index_of_from)?;
    catalog.register(OWNER, "lastIndexOf(I)I", string_last_index_of)?;
    catalog.register(OWNER, "substring(I)Ljava/lang/String;", string_substring)?;
    catalog.register(OWNER, "substring(II)Ljava/lang/String;", string_substring_range)?;
    catalog.register(OWNER, "split(Ljava/lang/String;)[Ljava/lang/String;", string_split)?;

    catalog.register(OWNER, "valueOf(Ljava/lang/Object;)Ljava/lang/String;", string_value_of)?;
    catalog.register(OWNER, "valueOf([CII)Ljava/lang/String;", string_value_of_chars)?;
    catalog.register(OWNER, "getBytes(Ljava/lang/String;)[B", string_get_bytes_charset)?;
    catalog.register(OWNER, "getBytes()[B", string_get_bytes)?;
    Ok(())
}

/// `chars[offset..offset + count]` with `String(char[], int, int)` bounds checks.
fn char_range(chars: &[u16], offset: i32, count: i32) -> Result<U16String> {
    let length = chars.len();
    let start = usize::try_from(offset).map_err(|_| string_index(i64::from(offset), length))?;
    let count = usize::try_from(count).map_err(|_| string_index(i64::from(count), length))?;
    let end = start
        .checked_add(count)
        .filter(|end| *end <= length)
        .ok_or_else(|| string_index(i64::from(offset) + count as i64, length))?;
    Ok(U16String::from_vec(chars[start..end].to_vec()))
}

fn char_array_arg(call: &MethodCall<'_>, index: usize, context: &Context) -> Result<Vec<u16>> {
    Ok(context
        .heap()
        .narrow::<JavaArray>(call.arg(index)?)?
        .chars()?
        .to_vec())
}

fn string_init_chars_range(call: &MethodCall<'_>, context: &mut Context) -> Result<JavaValue> {
    let chars = char_array_arg(call, 0, context)?;
    let value = char_range(&chars, int_arg(call, 1)?, int_arg(call, 2)?)?;
    construct(call, context, HostObject::String(value))
}

fn string_init_chars(call: &MethodCall<'_>, context: &mut Context) -> Result<JavaValue> {
    let chars = char_array_arg(call, 0, context)?;
    construct(call, context, HostObject::String(U16String::from_vec(chars)))
}

fn string_init_bytes(call: &MethodCall<'_>, context: &mut Context) -> Result<JavaValue> {
    let bytes = bytes_arg(call, 0, context)?;
    construct(call, context, HostObject::String(Charset::Utf8.decode(&bytes)))
}

fn string_init_bytes_charset(call: &MethodCall<'_>, context: &mut Context) -> Result<JavaValue> {
    let bytes = bytes_arg(call, 0, context)?;
    let charset = Charset::lookup(&string_arg(call, 1, context)?.to_string_lossy())?;
    construct(call, context, HostObject::String(charset.decode(&bytes)))
}

fn string_intern(call: &MethodCall<'_>, context: &mut Context) -> Result<JavaValue> {
    let value = this_string(call, context)?;
    context.intern(&value)
}

fn string_equals(call: &MethodCall<'_>, context: &mut Context) -> Result<JavaValue> {
    let this = context.heap().string(call.this()?)?;
    let other = call.arg(0)?;
    if other.is_null() {
        return Ok(JavaValue::Int(0));
    }
    let equal = matches!(context.heap().payload(other)?, HostObject::String(value) if value == this);
    Ok(JavaValue::Int(i32::from(equal)))
}

fn string_trim(call: &MethodCall<'_>, context: &mut Context) -> Result<JavaValue> {
    let value = this_string(call, context)?;
    let units = value.as_slice();
    let start = units.iter().position(|unit| *unit > 0x20).unwrap_or(units.len());
    let end = units
        .iter()
        .rposition(|unit| *unit > 0x20)
        .map_or(start, |position| position + 1);
    if start == 0 && end == units.len() {
        // String.trim returns the receiver itself when nothing is stripped
        return call.this();
    }
    new_string(context, U16String::from_vec(units[start..end].to_vec()))
}

fn string_to_char_array(call: &MethodCall<'_>, context: &mut Context) -> Result<JavaValue> {
    let value = this_string(call, context)?;
    context
        .heap_mut()
        .wrap(HostObject::Array(JavaArray::Char(value.into_vec())))
}

fn string_length(call: &MethodCall<'_>, context: &mut Context) -> Result<JavaValue> {
    let length = context.heap().string(call.this()?)?.len();
    Ok(JavaValue::Int(i32::try_from(length).unwrap_or(i32::MAX)))
}

fn string_hash_code(call: &MethodCall<'_>, context: &mut Context) -> Result<JavaValue> {
    let value = context.heap().string(call.this()?)?;
    Ok(JavaValue::Int(java_hash_code(value.as_slice())))
}

fn string_char_at(call: &MethodCall<'_>, context: &mut Context) -> Result<JavaValue> {
    let index = int_arg(call, 0)?;
    let value = context.heap().string(call.this()?)?;
    let unit = usize::try_from(index)
        .ok()
        .and_then(|position| value.as_slice().get(position))
        .ok_or_else(|| string_index(i64::from(index), value.len()))?;
    Ok(JavaValue::Int(i32::from(*unit)))
}

/// The UTF-16 encoding of code point `code_point`, `None` if it is not a valid one.
fn code_point_units(code_point: i32) -> Option<Vec<u16>> {
    if let Ok(unit) = u16::try_from(code_point) {
        return Some(vec![unit]);
    }
    let character = char::from_u32(u32::try_from(code_point).ok()?)?;
    let mut buffer = [0u16; 2];
    Some(character.encode_utf16(&mut buffer).to_vec())
}

fn index_of(units: &[u16], code_point: i32, from: i32) -> i32 {
    let Some(needle) = code_point_units(code_point) else {
        return -1;
    };
    let start = usize::try_from(from.max(0)).unwrap_or(0);
    if start >= units.len() {
        return -1;
    }
    units[start..]
        .windows(needle.len())
        .position(|window| window == needle.as_slice())
        .map_or(-1, |position| i32::try_from(start + position).unwrap_or(-1))
}

fn string_index_of(call: &MethodCall<'_>, context: &mut Context) -> Result<JavaValue> {
    let code_point = int_arg(call, 0)?;
    let value = context.heap().string(call.this()?)?;
    Ok(JavaValue::Int(index_of(value.as_slice(), code_point, 0)))
}

fn string_index_of_from(call: &MethodCall<'_>, context: &mut Context) -> Result<JavaValue> {
    let code_point = int_arg(call, 0)?;
    let from = int_arg(call, 1)?;
    let value = context.heap().string(call.this()?)?;
    Ok(JavaValue::Int(index_of(value.as_slice(), code_point, from)))
}

fn string_last_index_of(call: &MethodCall<'_>, context: &mut Context) -> Result<JavaValue> {
    let code_point = int_arg(call, 0)?;
    let value = context.heap().string(call.this()?)?;
    let position = code_point_units(code_point).and_then(|needle| {
        value
            .as_slice()
            .windows(needle.len())
            .rposition(|window| window == needle.as_slice())
    });
    Ok(JavaValue::Int(
        position.map_or(-1, |position| i32::try_from(position).unwrap_or(-1)),
    ))
}

fn substring(call: &MethodCall<'_>, context: &mut Context, begin: i32, end: Option<i32>) -> Result<JavaValue> {
    let value = this_string(call, context)?;
    let length = value.len();
    let end = match end {
        Some(end) => end,
        None => i32::try_from(length).unwrap_or(i32::MAX),
    };
    let start = usize::try_from(begin)
        .ok()
        .filter(|start| *start <= length)
        .ok_or_else(|| string_index(i64::from(begin), length))?;
    let stop = usize::try_from(end)
        .ok()
        .filter(|stop| *stop <= length && *stop >= start)
        .ok_or_else(|| string_index(i64::from(end) - i64::from(begin), length))?;
    if start == 0 && stop == length {
        return call.this();
    }
    new_string(context, U16String::from_vec(value.as_slice()[start..stop].to_vec()))
}

fn string_substring(call: &MethodCall<'_>, context: &mut Context) -> Result<JavaValue> {
    let begin = int_arg(call, 0)?;
    substring(call, context, begin, None)
}

fn string_substring_range(call: &MethodCall<'_>, context: &mut Context) -> Result<JavaValue> {
    let begin = int_arg(call, 0)?;
    let end = int_arg(call, 1)?;
    substring(call, context, begin, Some(end))
}

/// `String.split(regex)` with a limit of zero: a zero-width match at the start yields no
/// leading empty string, and trailing empty strings are removed.
pub(super) fn split(input: &str, pattern: &Regex) -> Vec<String> {
    let mut parts = Vec::new();
    let mut start = 0;
    let mut matched = false;
    for found in pattern.find_iter(input) {
        if found.end() == 0 {
            continue;
        }
        matched = true;
        parts.push(input[start..found.start()].to_string());
        start = found.end();
    }
    if !matched {
        return vec![input.to_string()];
    }
    parts.push(input[start..].to_string());
    while parts.last().is_some_and(String::is_empty) {
        parts.pop();
    }
    parts
}

fn string_split(call: &MethodCall<'_>, context: &mut Context) -> Result<JavaValue> {
    let input = this_string(call, context)?.to_string_lossy();
    let source = string_arg(call, 0, context)?.to_string_lossy();
    let pattern = Regex::new(&source).map_err(|error| EmulationError::host("String.split", error))?;

    let mut elements = Vec::new();
    for part in split(&input, &pattern) {
        elements.push(new_string(context, U16String::from_str(&part))?);
    }
    new_reference_array(context, "java/lang/String", elements)
}

fn string_value_of(call: &MethodCall<'_>, context: &mut Context) -> Result<JavaValue> {
    let value = call.arg(0)?;
    if !value.is_null() && matches!(context.heap().payload(value)?, HostObject::String(_)) {
        // toString() of a string is the string itself
        return Ok(value);
    }
    let text = display_string(value, context)?;
    new_string(context, text)
}

fn string_value_of_chars(call: &MethodCall<'_>, context: &mut Context) -> Result<JavaValue> {
    let chars = char_array_arg(call, 0, context)?;
    let value = char_range(&chars, int_arg(call, 1)?, int_arg(call, 2)?)?;
    new_string(context, value)
}

fn string_get_bytes_charset(call: &MethodCall<'_>, context: &mut Context) -> Result<JavaValue> {
    let value = this_string(call, context)?;
    let charset = Charset::lookup(&string_arg(call, 0, context)?.to_string_lossy())?;
    new_bytes(context, &charset.encode(value.as_slice()))
}

fn string_get_bytes(call: &MethodCall<'_>, context: &mut Context) -> Result<JavaValue> {
    let value = this_string(call, context)?;
    new_bytes(context, &Charset::Utf8.encode(value.as_slice()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        emulation::FaultKind,
        metadata::ClassDictionary,
        test::{call_static, call_virtual, jdk_context},
    };

    const OWNER: &str = "java/lang/String";

    fn text(context: &Context, value: JavaValue) -> String {
        context.heap().rust_string(value).unwrap()
    }

    #[test]
    fn test_trim_matches_host() {
        let mut context = jdk_context(ClassDictionary::new());
        for input in ["  secret  ", "\t\nx y\r", "plain", "   ", ""] {
            let value = context.heap_mut().alloc_str(input).unwrap();
            let trimmed =
                call_virtual(&mut context, OWNER, "trim", "()Ljava/lang/String;", value, &[]).unwrap();
            assert_eq!(text(&context, trimmed), input.trim());
        }

        let plain = context.heap_mut().alloc_str("plain").unwrap();
        let trimmed = call_virtual(&mut context, OWNER, "trim", "()Ljava/lang/String;", plain, &[]).unwrap();
        assert_eq!(trimmed, plain);
    }

    #[test]
    fn test_char_at_and_hash() {
        let mut context = jdk_context(ClassDictionary::new());
        let value = context.heap_mut().alloc_str("hello").unwrap();

        let unit = call_virtual(&mut context, OWNER, "charAt", "(I)C", value, &[JavaValue::Int(1)]).unwrap();
        assert_eq!(unit, JavaValue::Int(i32::from(b'e')));
        let hash = call_virtual(&mut context, OWNER, "hashCode", "()I", value, &[]).unwrap();
        assert_eq!(hash, JavaValue::Int(99_162_322));

        let error =
            call_virtual(&mut context, OWNER, "charAt", "(I)C", value, &[JavaValue::Int(5)]).unwrap_err();
        assert!(matches!(
            error.as_emulation(),
            Some(EmulationError::StringIndexOutOfBounds { index: 5, length: 5 })
        ));
    }

    #[test]
    fn test_index_of_supplementary() {
        let mut context = jdk_context(ClassDictionary::new());
        let value = context.heap_mut().alloc_str("a\u{1F600}b\u{1F600}").unwrap();
        let emoji = JavaValue::Int(0x1F600);

        let first = call_virtual(&mut context, OWNER, "indexOf", "(I)I", value, &[emoji]).unwrap();
        assert_eq!(first, JavaValue::Int(1));
        let next =
            call_virtual(&mut context, OWNER, "indexOf", "(II)I", value, &[emoji, JavaValue::Int(2)]).unwrap();
        assert_eq!(next, JavaValue::Int(4));
        let last = call_virtual(&mut context, OWNER, "lastIndexOf", "(I)I", value, &[emoji]).unwrap();
        assert_eq!(last, JavaValue::Int(4));
        let missing =
            call_virtual(&mut context, OWNER, "indexOf", "(I)I", value, &[JavaValue::Int('z' as i32)]).unwrap();
        assert_eq!(missing, JavaValue::Int(-1));
    }

    #[test]
    fn test_substring_bounds() {
        let mut context = jdk_context(ClassDictionary::new());
        let value = context.heap_mut().alloc_str("decrypt").unwrap();

        let tail = call_virtual(
            &mut context,
            OWNER,
            "substring",
            "(I)Ljava/lang/String;",
            value,
            &[JavaValue::Int(2)],
        )
        .unwrap();
        assert_eq!(text(&context, tail), "crypt");

        let middle = call_virtual(
            &mut context,
            OWNER,
            "substring",
            "(II)Ljava/lang/String;",
            value,
            &[JavaValue::Int(2), JavaValue::Int(4)],
        )
        .unwrap();
        assert_eq!(text(&context, middle), "cr");

        let error = call_virtual(
            &mut context,
            OWNER,
            "substring",
            "(II)Ljava/lang/String;",
            value,
            &[JavaValue::Int(4), JavaValue::Int(2)],
        )
        .unwrap_err();
        assert_eq!(error.fault_kind(), Some(FaultKind::Runtime));
    }

    #[test]
    fn test_split_semantics() {
        let comma = Regex::new(",").unwrap();
        assert_eq!(split("a,b,,c,,", &comma), vec!["a", "b", "", "c"]);
        assert_eq!(split("abc", &comma), vec!["abc"]);
        assert_eq!(split(",", &comma), Vec::<String>::new());
        assert_eq!(split("", &comma), vec![""]);

        let empty = Regex::new("").unwrap();
        assert_eq!(split("ab", &empty), vec!["a", "b"]);
    }

    #[test]
    fn test_split_stub() {
        let mut context = jdk_context(ClassDictionary::new());
        let value = context.heap_mut().alloc_str("k1|k2|k3").unwrap();
        let pattern = context.heap_mut().alloc_str("\\|").unwrap();
        let parts = call_virtual(
            &mut context,
            OWNER,
            "split",
            "(Ljava/lang/String;)[Ljava/lang/String;",
            value,
            &[pattern],
        )
        .unwrap();
        let array = context.heap().narrow::<JavaArray>(parts).unwrap().clone();
        assert_eq!(array.descriptor(), "[Ljava/lang/String;");
        assert_eq!(array.len(), 3);
        assert_eq!(text(&context, array.load(2).unwrap()), "k3");
    }

    #[test]
    fn test_constructor_from_bytes() {
        let mut context = jdk_context(ClassDictionary::new());
        let bytes = new_bytes(&mut context, &[0x00, 0x68, 0x00, 0x69]).unwrap();
        let charset = context.heap_mut().alloc_str("utf-16be").unwrap();
        let value = context.heap_mut().placeholder(OWNER).unwrap();

        call_virtual(
            &mut context,
            OWNER,
            "<init>",
            "([BLjava/lang/String;)V",
            value,
            &[bytes, charset],
        )
        .unwrap();
        assert_eq!(text(&context, value), "hi");

        let unknown = context.heap_mut().alloc_str("EBCDIC-XYZ").unwrap();
        let other = context.heap_mut().placeholder(OWNER).unwrap();
        let error = call_virtual(
            &mut context,
            OWNER,
            "<init>",
            "([BLjava/lang/String;)V",
            other,
            &[bytes, unknown],
        )
        .unwrap_err();
        assert_eq!(error.fault_kind(), Some(FaultKind::Host));
        assert!(!context.heap().is_initialized(other).unwrap());
    }

    #[test]
    fn test_equals_and_value_of() {
        let mut context = jdk_context(ClassDictionary::new());
        let first = context.heap_mut().alloc_str("abc").unwrap();
        let second = context.heap_mut().alloc_str("abc").unwrap();
        let number = context.heap_mut().wrap(HostObject::Opaque).unwrap();

        let equal = call_virtual(&mut context, OWNER, "equals", "(Ljava/lang/Object;)Z", first, &[second])
            .unwrap();
        assert_eq!(equal, JavaValue::Int(1));
        let equal = call_virtual(&mut context, OWNER, "equals", "(Ljava/lang/Object;)Z", first, &[number])
            .unwrap();
        assert_eq!(equal, JavaValue::Int(0));
        let equal = call_virtual(
            &mut context,
            OWNER,
            "equals",
            "(Ljava/lang/Object;)Z",
            first,
            &[JavaValue::Null],
        )
        .unwrap();
        assert_eq!(equal, JavaValue::Int(0));

        let same = call_static(
            &mut context,
            OWNER,
            "valueOf",
            "(Ljava/lang/Object;)Ljava/lang/String;",
            &[first],
        )
        .unwrap();
        assert_eq!(same, first);
        let null = call_static(
            &mut context,
            OWNER,
            "valueOf",
            "(Ljava/lang/Object;)Ljava/lang/String;",
            &[JavaValue::Null],
        )
        .unwrap();
        assert_eq!(text(&context, null), "null");
    }

    #[test]
    fn test_charsets() {
        let units: Vec<u16> = "h\u{e9}".encode_utf16().collect();
        assert_eq!(Charset::Utf8.encode(&units), "h\u{e9}".as_bytes());
        assert_eq!(Charset::Latin1.encode(&units), vec![b'h', 0xe9]);
        assert_eq!(Charset::Ascii.encode(&units), vec![b'h', b'?']);
        assert_eq!(Charset::Utf16.encode(&units), vec![0xfe, 0xff, 0, b'h', 0, 0xe9]);
        assert_eq!(Charset::Utf16.decode(&[0xff, 0xfe, b'h', 0]).to_string_lossy(), "h");
        assert_eq!(Charset::lookup("latin1").unwrap(), Charset::Latin1);
    }
}
