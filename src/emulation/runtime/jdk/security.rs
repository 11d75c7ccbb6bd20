//! `java.security.MessageDigest` stubs (MD5 and SHA-1).

use md5::Md5;
use sha1::{Digest, Sha1};

use crate::{
    emulation::{
        runtime::{
            jdk::{bytes_arg, new_bytes, string_arg},
            provider::{MethodCall, NativeCatalog},
        },
        Context, DigestAlgorithm, EmulationError, HostObject, JavaMessageDigest, JavaValue,
    },
    Result,
};

/// Registers the digest stubs.
///
/// # Errors
/// Returns [`crate::Error::Configuration`] on a key collision.
pub fn register(catalog: &mut NativeCatalog) -> Result<()> {
    const DIGEST: &str = "java/security/MessageDigest";
    catalog.register(
        DIGEST,
        "getInstance(Ljava/lang/String;)Ljava/security/MessageDigest;",
        digest_get_instance,
    )?;
    catalog.register(DIGEST, "update([B)V", digest_update)?;
    catalog.register(DIGEST, "digest()[B", digest_finish)?;
    catalog.register(DIGEST, "digest([B)[B", digest_finish_with)?;
    Ok(())
}

fn hash(algorithm: DigestAlgorithm, data: &[u8]) -> Vec<u8> {
    match algorithm {
        DigestAlgorithm::Md5 => Md5::digest(data).to_vec(),
        DigestAlgorithm::Sha1 => Sha1::digest(data).to_vec(),
    }
}

fn digest_get_instance(call: &MethodCall<'_>, context: &mut Context) -> Result<JavaValue> {
    let name = string_arg(call, 0, context)?.to_string_lossy();
    let algorithm = match name.to_ascii_uppercase().as_str() {
        "MD5" => DigestAlgorithm::Md5,
        "SHA-1" | "SHA1" | "SHA" => DigestAlgorithm::Sha1,
        _ => {
            return Err(EmulationError::host(
                "MessageDigest.getInstance",
                format!("{name} MessageDigest not available"),
            )
            .into())
        }
    };
    context
        .heap_mut()
        .wrap(HostObject::MessageDigest(JavaMessageDigest {
            algorithm,
            pending: Vec::new(),
        }))
}

fn digest_update(call: &MethodCall<'_>, context: &mut Context) -> Result<JavaValue> {
    let bytes = bytes_arg(call, 0, context)?;
    context
        .heap_mut()
        .narrow_mut::<JavaMessageDigest>(call.this()?)?
        .pending
        .extend_from_slice(&bytes);
    Ok(JavaValue::Void)
}

fn digest_finish(call: &MethodCall<'_>, context: &mut Context) -> Result<JavaValue> {
    let digest = context.heap_mut().narrow_mut::<JavaMessageDigest>(call.this()?)?;
    let pending = std::mem::take(&mut digest.pending);
    let result = hash(digest.algorithm, &pending);
    new_bytes(context, &result)
}

fn digest_finish_with(call: &MethodCall<'_>, context: &mut Context) -> Result<JavaValue> {
    let bytes = bytes_arg(call, 0, context)?;
    let digest = context.heap_mut().narrow_mut::<JavaMessageDigest>(call.this()?)?;
    let mut pending = std::mem::take(&mut digest.pending);
    pending.extend_from_slice(&bytes);
    let result = hash(digest.algorithm, &pending);
    new_bytes(context, &result)
}
