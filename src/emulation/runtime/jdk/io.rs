//! Byte stream and zip stream stubs.
//!
//! Some decryptors read their key material from the archive they were loaded from:
//! `getProtectionDomain().getCodeSource().getLocation().openStream()` wrapped in a
//! `ZipInputStream`. The archive is walked front to back through its local headers, the
//! same way the JDK stream does.

use crate::{
    emulation::{
        runtime::{
            jdk::{bytes_arg, construct, int_arg, new_bytes},
            provider::{MethodCall, NativeCatalog},
        },
        ByteSink, ByteSource, Context, EmulationError, HostObject, JavaArray, JavaValue,
        ZipEntryInfo, ZipStream,
    },
    utils::ZipReader,
    Result,
};

/// Registers the stream stubs.
///
/// # Errors
/// Returns [`crate::Error::Configuration`] on a key collision.
pub fn register(catalog: &mut NativeCatalog) -> Result<()> {
    const SINK: &str = "java/io/ByteArrayOutputStream";
    catalog.register(SINK, "<init>()V", sink_init)?;
    catalog.register(SINK, "<init>(I)V", sink_init_sized)?;
    catalog.register(SINK, "write(I)V", sink_write_byte)?;
    catalog.register(SINK, "write([B)V", sink_write)?;
    catalog.register(SINK, "write([BII)V", sink_write_range)?;
    catalog.register(SINK, "toByteArray()[B", sink_to_byte_array)?;
    catalog.register(SINK, "size()I", sink_size)?;
    catalog.register(SINK, "close()V", close)?;

    catalog.register("java/io/InputStream", "read([BII)I", source_read)?;
    catalog.register("java/io/InputStream", "read()I", source_read_byte)?;
    catalog.register("java/io/InputStream", "close()V", close)?;

    const ZIP: &str = "java/util/zip/ZipInputStream";
    catalog.register(ZIP, "<init>(Ljava/io/InputStream;)V", zip_init)?;
    catalog.register(ZIP, "getNextEntry()Ljava/util/zip/ZipEntry;", zip_next_entry)?;
    catalog.register(ZIP, "closeEntry()V", zip_close_entry)?;
    catalog.register(ZIP, "read([BII)I", zip_read)?;
    catalog.register(ZIP, "close()V", close)?;

    catalog.register("java/util/zip/ZipEntry", "getName()Ljava/lang/String;", entry_get_name)?;
    catalog.register("java/util/zip/ZipEntry", "getExtra()[B", entry_get_extra)?;
    Ok(())
}

fn close(call: &MethodCall<'_>, context: &mut Context) -> Result<JavaValue> {
    context.heap().payload(call.this()?)?;
    Ok(JavaValue::Void)
}

fn sink_init(call: &MethodCall<'_>, context: &mut Context) -> Result<JavaValue> {
    construct(call, context, HostObject::ByteSink(ByteSink::default()))
}

fn sink_init_sized(call: &MethodCall<'_>, context: &mut Context) -> Result<JavaValue> {
    let size = int_arg(call, 0)?;
    let capacity = usize::try_from(size).map_err(|_| EmulationError::NegativeArraySize { size })?;
    construct(
        call,
        context,
        HostObject::ByteSink(ByteSink {
            data: Vec::with_capacity(capacity.min(1 << 16)),
        }),
    )
}

fn sink_write_byte(call: &MethodCall<'_>, context: &mut Context) -> Result<JavaValue> {
    let value = int_arg(call, 0)?;
    context
        .heap_mut()
        .narrow_mut::<ByteSink>(call.this()?)?
        .data
        .push(value as u8);
    Ok(JavaValue::Void)
}

fn sink_write(call: &MethodCall<'_>, context: &mut Context) -> Result<JavaValue> {
    let bytes = bytes_arg(call, 0, context)?;
    context
        .heap_mut()
        .narrow_mut::<ByteSink>(call.this()?)?
        .data
        .extend_from_slice(&bytes);
    Ok(JavaValue::Void)
}

fn sink_write_range(call: &MethodCall<'_>, context: &mut Context) -> Result<JavaValue> {
    let bytes = bytes_arg(call, 0, context)?;
    let range = checked_range(int_arg(call, 1)?, int_arg(call, 2)?, bytes.len())?;
    context
        .heap_mut()
        .narrow_mut::<ByteSink>(call.this()?)?
        .data
        .extend_from_slice(&bytes[range]);
    Ok(JavaValue::Void)
}

fn sink_to_byte_array(call: &MethodCall<'_>, context: &mut Context) -> Result<JavaValue> {
    let data = context.heap().narrow::<ByteSink>(call.this()?)?.data.clone();
    new_bytes(context, &data)
}

fn sink_size(call: &MethodCall<'_>, context: &mut Context) -> Result<JavaValue> {
    let size = context.heap().narrow::<ByteSink>(call.this()?)?.data.len();
    Ok(JavaValue::Int(i32::try_from(size).unwrap_or(i32::MAX)))
}

/// `off`/`len` validation shared by the `([BII)` overloads.
fn checked_range(offset: i32, length: i32, capacity: usize) -> Result<std::ops::Range<usize>> {
    let start = usize::try_from(offset).ok();
    let count = usize::try_from(length).ok();
    match (start, count) {
        (Some(start), Some(count)) if start.saturating_add(count) <= capacity => Ok(start..start + count),
        _ => Err(EmulationError::ArrayIndexOutOfBounds {
            index: i64::from(offset) + i64::from(length),
            length: capacity,
        }
        .into()),
    }
}

/// Reads from `source` into `buffer[offset..offset + length]`, returning the
/// `InputStream.read` result (`-1` at end of stream).
fn read_into(
    context: &mut Context,
    source: Option<ByteSource>,
    buffer: JavaValue,
    offset: i32,
    length: i32,
) -> Result<(Option<ByteSource>, i32)> {
    let capacity = context.heap().narrow::<JavaArray>(buffer)?.len();
    let range = checked_range(offset, length, capacity)?;
    if range.is_empty() {
        return Ok((source, 0));
    }
    let Some(mut source) = source else {
        return Ok((None, -1));
    };

    let mut chunk = vec![0u8; range.len()];
    let Some(count) = source.read(&mut chunk) else {
        return Ok((Some(source), -1));
    };
    match context.heap_mut().narrow_mut::<JavaArray>(buffer)? {
        JavaArray::Byte(values) => {
            for (slot, byte) in values[range.start..range.start + count].iter_mut().zip(&chunk) {
                *slot = *byte as i8;
            }
        }
        other => {
            return Err(EmulationError::ArrayElementTypeMismatch {
                expected: "byte",
                found: other.element_kind(),
            }
            .into())
        }
    }
    Ok((Some(source), i32::try_from(count).unwrap_or(i32::MAX)))
}

fn source_read(call: &MethodCall<'_>, context: &mut Context) -> Result<JavaValue> {
    let this = call.this()?;
    let source = context.heap().narrow::<ByteSource>(this)?.clone();
    let (source, count) = read_into(context, Some(source), call.arg(0)?, int_arg(call, 1)?, int_arg(call, 2)?)?;
    if let Some(source) = source {
        *context.heap_mut().narrow_mut::<ByteSource>(this)? = source;
    }
    Ok(JavaValue::Int(count))
}

fn source_read_byte(call: &MethodCall<'_>, context: &mut Context) -> Result<JavaValue> {
    let source = context.heap_mut().narrow_mut::<ByteSource>(call.this()?)?;
    let mut byte = [0u8; 1];
    Ok(JavaValue::Int(match source.read(&mut byte) {
        Some(1) => i32::from(byte[0]),
        _ => -1,
    }))
}

fn zip_init(call: &MethodCall<'_>, context: &mut Context) -> Result<JavaValue> {
    let source = context.heap_mut().narrow_mut::<ByteSource>(call.arg(0)?)?;
    let remaining = source.data.get(source.position..).unwrap_or_default().to_vec();
    source.position = source.data.len();
    construct(
        call,
        context,
        HostObject::ZipStream(ZipStream {
            reader: ZipReader::new(remaining),
            entry: None,
        }),
    )
}

fn zip_next_entry(call: &MethodCall<'_>, context: &mut Context) -> Result<JavaValue> {
    let stream = context.heap_mut().narrow_mut::<ZipStream>(call.this()?)?;
    let next = stream
        .reader
        .next_entry()
        .map_err(|error| EmulationError::host("ZipInputStream.getNextEntry", error))?;
    let Some(entry) = next else {
        stream.entry = None;
        return Ok(JavaValue::Null);
    };
    stream.entry = Some(ByteSource::new(entry.data));
    let info = ZipEntryInfo {
        name: entry.name,
        extra: (!entry.extra.is_empty()).then_some(entry.extra),
    };
    context.heap_mut().wrap(HostObject::ZipEntry(info))
}

fn zip_close_entry(call: &MethodCall<'_>, context: &mut Context) -> Result<JavaValue> {
    context.heap_mut().narrow_mut::<ZipStream>(call.this()?)?.entry = None;
    Ok(JavaValue::Void)
}

fn zip_read(call: &MethodCall<'_>, context: &mut Context) -> Result<JavaValue> {
    let this = call.this()?;
    let entry = context.heap_mut().narrow_mut::<ZipStream>(this)?.entry.take();
    let (entry, count) = read_into(context, entry, call.arg(0)?, int_arg(call, 1)?, int_arg(call, 2)?)?;
    context.heap_mut().narrow_mut::<ZipStream>(this)?.entry = entry;
    Ok(JavaValue::Int(count))
}

fn entry_get_name(call: &MethodCall<'_>, context: &mut Context) -> Result<JavaValue> {
    let name = context.heap().narrow::<ZipEntryInfo>(call.this()?)?.name.clone();
    context.heap_mut().alloc_str(&name)
}

fn entry_get_extra(call: &MethodCall<'_>, context: &mut Context) -> Result<JavaValue> {
    match context.heap().narrow::<ZipEntryInfo>(call.this()?)?.extra.clone() {
        Some(extra) => new_bytes(context, &extra),
        None => Ok(JavaValue::Null),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        emulation::FaultKind,
        metadata::ClassDictionary,
        test::{call_virtual, jdk_context, zip_archive},
    };

    fn read(context: &mut Context, owner: &str, stream: JavaValue, buffer: JavaValue, offset: i32, length: i32) -> Result<JavaValue> {
        call_virtual(
            context,
            owner,
            "read",
            "([BII)I",
            stream,
            &[buffer, JavaValue::Int(offset), JavaValue::Int(length)],
        )
    }

    #[test]
    fn test_byte_array_output_stream() {
        let mut context = jdk_context(ClassDictionary::new());
        let sink = context
            .heap_mut()
            .placeholder("java/io/ByteArrayOutputStream")
            .unwrap();
        call_virtual(&mut context, "java/io/ByteArrayOutputStream", "<init>", "()V", sink, &[]).unwrap();

        let bytes = new_bytes(&mut context, &[10, 20, 30, 40]).unwrap();
        call_virtual(&mut context, "java/io/ByteArrayOutputStream", "write", "([B)V", sink, &[bytes])
            .unwrap();
        call_virtual(
            &mut context,
            "java/io/ByteArrayOutputStream",
            "write",
            "([BII)V",
            sink,
            &[bytes, JavaValue::Int(1), JavaValue::Int(2)],
        )
        .unwrap();
        let error = call_virtual(
            &mut context,
            "java/io/ByteArrayOutputStream",
            "write",
            "([BII)V",
            sink,
            &[bytes, JavaValue::Int(3), JavaValue::Int(2)],
        )
        .unwrap_err();
        assert_eq!(error.fault_kind(), Some(FaultKind::Runtime));

        let result = call_virtual(
            &mut context,
            "java/io/ByteArrayOutputStream",
            "toByteArray",
            "()[B",
            sink,
            &[],
        )
        .unwrap();
        assert_eq!(
            context.heap().narrow::<JavaArray>(result).unwrap().bytes().unwrap(),
            vec![10, 20, 30, 40, 20, 30]
        );
    }

    #[test]
    fn test_input_stream_read() {
        let mut context = jdk_context(ClassDictionary::new());
        let source = context
            .heap_mut()
            .wrap(HostObject::ByteSource(ByteSource::new(vec![1, 2, 3])))
            .unwrap();
        let buffer = context
            .heap_mut()
            .wrap(HostObject::Array(JavaArray::from_bytes(&[0; 4])))
            .unwrap();

        assert_eq!(read(&mut context, "java/io/InputStream", source, buffer, 1, 3).unwrap(), JavaValue::Int(3));
        assert_eq!(
            context.heap().narrow::<JavaArray>(buffer).unwrap().bytes().unwrap(),
            vec![0, 1, 2, 3]
        );
        assert_eq!(read(&mut context, "java/io/InputStream", source, buffer, 0, 4).unwrap(), JavaValue::Int(-1));
        assert_eq!(read(&mut context, "java/io/InputStream", source, buffer, 0, 0).unwrap(), JavaValue::Int(0));
    }

    #[test]
    fn test_zip_input_stream() {
        let mut context = jdk_context(ClassDictionary::new());
        let archive = zip_archive(&[
            ("META-INF/MANIFEST.MF", &[][..], &b"Manifest-Version: 1.0"[..]),
            ("a/Key.class", &[7, 7][..], &[0xca, 0xfe, 0xba, 0xbe, 0x01][..]),
        ]);
        let source = context
            .heap_mut()
            .wrap(HostObject::ByteSource(ByteSource::new(archive)))
            .unwrap();
        let zip = context
            .heap_mut()
            .placeholder("java/util/zip/ZipInputStream")
            .unwrap();
        call_virtual(
            &mut context,
            "java/util/zip/ZipInputStream",
            "<init>",
            "(Ljava/io/InputStream;)V",
            zip,
            &[source],
        )
        .unwrap();

        let next_entry = |context: &mut Context| {
            call_virtual(
                context,
                "java/util/zip/ZipInputStream",
                "getNextEntry",
                "()Ljava/util/zip/ZipEntry;",
                zip,
                &[],
            )
            .unwrap()
        };

        let manifest = next_entry(&mut context);
        let extra = call_virtual(&mut context, "java/util/zip/ZipEntry", "getExtra", "()[B", manifest, &[])
            .unwrap();
        assert_eq!(extra, JavaValue::Null);

        let entry = next_entry(&mut context);
        let name = call_virtual(
            &mut context,
            "java/util/zip/ZipEntry",
            "getName",
            "()Ljava/lang/String;",
            entry,
            &[],
        )
        .unwrap();
        assert_eq!(context.heap().rust_string(name).unwrap(), "a/Key.class");
        let extra = call_virtual(&mut context, "java/util/zip/ZipEntry", "getExtra", "()[B", entry, &[])
            .unwrap();
        assert_eq!(context.heap().narrow::<JavaArray>(extra).unwrap().bytes().unwrap(), vec![7, 7]);

        let buffer = new_bytes(&mut context, &[0; 8]).unwrap();
        let zip_owner = "java/util/zip/ZipInputStream";
        assert_eq!(read(&mut context, zip_owner, zip, buffer, 0, 8).unwrap(), JavaValue::Int(5));
        assert_eq!(read(&mut context, zip_owner, zip, buffer, 0, 8).unwrap(), JavaValue::Int(-1));
        call_virtual(&mut context, zip_owner, "closeEntry", "()V", zip, &[]).unwrap();

        assert_eq!(next_entry(&mut context), JavaValue::Null);
        assert_eq!(read(&mut context, zip_owner, zip, buffer, 0, 8).unwrap(), JavaValue::Int(-1));
    }
}
