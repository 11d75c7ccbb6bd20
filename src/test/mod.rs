//! Shared helpers for unit tests.

use std::{io::Write, sync::Arc};

use flate2::{write::DeflateEncoder, Compression};

use crate::{
    emulation::{Context, InvokeKind, JavaValue, MethodCall, ProviderChain},
    metadata::ClassDictionary,
    Result,
};

/// Fresh context over `dictionary` with the JDK provider chain.
pub fn jdk_context(dictionary: ClassDictionary) -> Context {
    let dictionary = Arc::new(dictionary);
    let chain = ProviderChain::jdk(Arc::clone(&dictionary)).unwrap();
    Context::new(Arc::new(chain), dictionary)
}

/// Resolves a static call through the context's provider chain.
pub fn call_static(
    context: &mut Context,
    owner: &str,
    name: &str,
    descriptor: &str,
    args: &[JavaValue],
) -> Result<JavaValue> {
    let chain = Arc::clone(context.provider());
    chain.invoke(&MethodCall::new_static(owner, name, descriptor, args), context)
}

/// Resolves a virtual call on `receiver` through the context's provider chain.
pub fn call_virtual(
    context: &mut Context,
    owner: &str,
    name: &str,
    descriptor: &str,
    receiver: JavaValue,
    args: &[JavaValue],
) -> Result<JavaValue> {
    let chain = Arc::clone(context.provider());
    let call = MethodCall::new_instance(InvokeKind::Virtual, owner, name, descriptor, receiver, args);
    chain.invoke(&call, context)
}

// Builds an archive of deflated entries: (name, extra field, contents). Local headers only,
// sizes known up front, crc left zero.
pub fn zip_archive(entries: &[(&str, &[u8], &[u8])]) -> Vec<u8> {
    let mut archive = Vec::new();
    for (name, extra, data) in entries {
        let mut encoder = DeflateEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(data).unwrap();
        let compressed = encoder.finish().unwrap();

        archive.extend_from_slice(&0x0403_4b50u32.to_le_bytes());
        archive.extend_from_slice(&20u16.to_le_bytes()); // version needed
        archive.extend_from_slice(&0u16.to_le_bytes()); // flags
        archive.extend_from_slice(&8u16.to_le_bytes()); // deflate
        archive.extend_from_slice(&[0; 4]); // time, date
        archive.extend_from_slice(&[0; 4]); // crc
        archive.extend_from_slice(&(compressed.len() as u32).to_le_bytes());
        archive.extend_from_slice(&(data.len() as u32).to_le_bytes());
        archive.extend_from_slice(&(name.len() as u16).to_le_bytes());
        archive.extend_from_slice(&(extra.len() as u16).to_le_bytes());
        archive.extend_from_slice(name.as_bytes());
        archive.extend_from_slice(extra);
        archive.extend_from_slice(&compressed);
    }
    // end of central directory, no entries
    archive.extend_from_slice(&0x0605_4b50u32.to_le_bytes());
    archive.extend_from_slice(&[0; 18]);
    archive
}
