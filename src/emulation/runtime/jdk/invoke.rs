//! `java.lang.invoke` stubs.
//!
//! Allatori's bootstrap methods resolve their targets through `MethodHandles.Lookup` and
//! wrap them in a `ConstantCallSite`. Handles record their target only; nothing here
//! invokes them.

use crate::{
    emulation::{
        runtime::{
            jdk::{construct, string_arg},
            provider::{MethodCall, NativeCatalog},
        },
        Context, EmulationError, HandleKind, HostObject, JavaCallSite, JavaClass, JavaMethodHandle,
        JavaMethodType, JavaValue,
    },
    metadata::MethodDescriptor,
    Result,
};

const FIND_SIGNATURE: &str =
    "(Ljava/lang/Class;Ljava/lang/String;Ljava/lang/invoke/MethodType;)Ljava/lang/invoke/MethodHandle;";

/// Registers the method handle stubs.
///
/// # Errors
/// Returns [`crate::Error::Configuration`] on a key collision.
pub fn register(catalog: &mut NativeCatalog) -> Result<()> {
    catalog.register(
        "java/lang/invoke/MethodType",
        "fromMethodDescriptorString(Ljava/lang/String;Ljava/lang/ClassLoader;)Ljava/lang/invoke/MethodType;",
        method_type_from_descriptor,
    )?;
    catalog.register(
        "java/lang/invoke/MethodHandles$Lookup",
        &format!("findStatic{FIND_SIGNATURE}"),
        lookup_find_static,
    )?;
    catalog.register(
        "java/lang/invoke/MethodHandles$Lookup",
        &format!("findVirtual{FIND_SIGNATURE}"),
        lookup_find_virtual,
    )?;
    catalog.register(
        "java/lang/invoke/MethodHandle",
        "asType(Ljava/lang/invoke/MethodType;)Ljava/lang/invoke/MethodHandle;",
        handle_as_type,
    )?;
    catalog.register(
        "java/lang/invoke/ConstantCallSite",
        "<init>(Ljava/lang/invoke/MethodHandle;)V",
        call_site_init,
    )?;
    Ok(())
}

fn method_type_from_descriptor(call: &MethodCall<'_>, context: &mut Context) -> Result<JavaValue> {
    let descriptor = string_arg(call, 0, context)?.to_string_lossy();
    if MethodDescriptor::parse(&descriptor).is_err() {
        return Err(EmulationError::InvalidDescriptor { descriptor }.into());
    }
    context
        .heap_mut()
        .wrap(HostObject::MethodType(JavaMethodType { descriptor }))
}

fn find(call: &MethodCall<'_>, context: &mut Context, kind: HandleKind) -> Result<JavaValue> {
    let owner = context.heap().narrow::<JavaClass>(call.arg(0)?)?.name.clone();
    let name = string_arg(call, 1, context)?.to_string_lossy();
    let descriptor = context
        .heap()
        .narrow::<JavaMethodType>(call.arg(2)?)?
        .descriptor
        .clone();
    context.heap_mut().wrap(HostObject::MethodHandle(JavaMethodHandle {
        owner,
        name,
        descriptor,
        kind,
    }))
}

fn lookup_find_static(call: &MethodCall<'_>, context: &mut Context) -> Result<JavaValue> {
    find(call, context, HandleKind::Static)
}

fn lookup_find_virtual(call: &MethodCall<'_>, context: &mut Context) -> Result<JavaValue> {
    find(call, context, HandleKind::Virtual)
}

fn handle_as_type(call: &MethodCall<'_>, context: &mut Context) -> Result<JavaValue> {
    let this = call.this()?;
    context.heap().narrow::<JavaMethodHandle>(this)?;
    Ok(this)
}

fn call_site_init(call: &MethodCall<'_>, context: &mut Context) -> Result<JavaValue> {
    let target = context
        .heap()
        .narrow::<JavaMethodHandle>(call.arg(0)?)?
        .clone();
    construct(call, context, HostObject::CallSite(JavaCallSite { target }))
}
