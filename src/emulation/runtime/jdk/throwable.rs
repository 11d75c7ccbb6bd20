//! Throwable stubs.
//!
//! Decryptors construct exceptions only to read their stack trace, so a throwable is its
//! message plus the synthetic call stack captured at construction. Throwing one with
//! `athrow` is still a fault in the interpreter.

use crate::{
    emulation::{
        runtime::{
            jdk::{construct, display_string, new_string, stack_trace_array, string_arg},
            provider::{MethodCall, NativeCatalog},
        },
        Context, HostObject, JavaThrowable, JavaValue,
    },
    Result,
};

/// Owners with the full `<init>()V` / `getStackTrace` / `toString` set.
const THROWABLES: [&str; 3] = [
    "java/lang/Throwable",
    "java/lang/Exception",
    "java/lang/NullPointerException",
];

/// Registers the throwable stubs.
///
/// # Errors
/// Returns [`crate::Error::Configuration`] on a key collision.
pub fn register(catalog: &mut NativeCatalog) -> Result<()> {
    for owner in THROWABLES {
        catalog.register(owner, "<init>()V", throwable_init)?;
        catalog.register(
            owner,
            "getStackTrace()[Ljava/lang/StackTraceElement;",
            throwable_get_stack_trace,
        )?;
        catalog.register(owner, "toString()Ljava/lang/String;", throwable_to_string)?;
    }
    catalog.register(
        "java/lang/RuntimeException",
        "<init>(Ljava/lang/String;)V",
        throwable_init_message,
    )?;
    catalog.register("java/lang/BootstrapMethodError", "<init>()V", throwable_init)?;
    Ok(())
}

fn throwable_init(call: &MethodCall<'_>, context: &mut Context) -> Result<JavaValue> {
    let throwable = JavaThrowable {
        message: None,
        stack_trace: context.snapshot(),
    };
    construct(call, context, HostObject::Throwable(throwable))
}

fn throwable_init_message(call: &MethodCall<'_>, context: &mut Context) -> Result<JavaValue> {
    let message = if call.arg(0)?.is_null() {
        None
    } else {
        Some(string_arg(call, 0, context)?)
    };
    let throwable = JavaThrowable {
        message,
        stack_trace: context.snapshot(),
    };
    construct(call, context, HostObject::Throwable(throwable))
}

fn throwable_get_stack_trace(call: &MethodCall<'_>, context: &mut Context) -> Result<JavaValue> {
    let frames = context
        .heap()
        .narrow::<JavaThrowable>(call.this()?)?
        .stack_trace
        .clone();
    stack_trace_array(context, frames)
}

fn throwable_to_string(call: &MethodCall<'_>, context: &mut Context) -> Result<JavaValue> {
    let text = display_string(call.this()?, context)?;
    new_string(context, text)
}

#[cfg(test)]
mod tests {
    use crate::{
        emulation::{FaultKind, JavaArray, StackFrame},
        metadata::ClassDictionary,
        test::{call_virtual, jdk_context},
    };

    #[test]
    fn test_captures_stack_at_construction() {
        let mut context = jdk_context(ClassDictionary::new());
        context.push("a/Main", "main", 5).unwrap();
        context.push("a/Strings", "decrypt", 88).unwrap();

        let exception = context.heap_mut().placeholder("java/lang/Exception").unwrap();
        call_virtual(&mut context, "java/lang/Exception", "<init>", "()V", exception, &[]).unwrap();
        // frames pushed later are not part of the trace
        context.push("a/Other", "later", 1).unwrap();

        let trace = call_virtual(
            &mut context,
            "java/lang/Exception",
            "getStackTrace",
            "()[Ljava/lang/StackTraceElement;",
            exception,
            &[],
        )
        .unwrap();
        let array = context.heap().narrow::<JavaArray>(trace).unwrap().clone();
        assert_eq!(array.len(), 2);
        let top = context
            .heap()
            .narrow::<StackFrame>(array.load(0).unwrap())
            .unwrap()
            .clone();
        assert_eq!(top, StackFrame::new("a/Strings", "decrypt", 88));
    }

    #[test]
    fn test_to_string_and_exact_owner() {
        let mut context = jdk_context(ClassDictionary::new());
        let message = context.heap_mut().alloc_str("bad key").unwrap();
        let exception = context
            .heap_mut()
            .placeholder("java/lang/RuntimeException")
            .unwrap();
        call_virtual(
            &mut context,
            "java/lang/RuntimeException",
            "<init>",
            "(Ljava/lang/String;)V",
            exception,
            &[message],
        )
        .unwrap();

        let text = call_virtual(
            &mut context,
            "java/lang/Throwable",
            "toString",
            "()Ljava/lang/String;",
            exception,
            &[],
        )
        .unwrap();
        assert_eq!(
            context.heap().rust_string(text).unwrap(),
            "java.lang.RuntimeException: bad key"
        );

        // no inheritance fallback: RuntimeException.toString is not registered
        let error = call_virtual(
            &mut context,
            "java/lang/RuntimeException",
            "toString",
            "()Ljava/lang/String;",
            exception,
            &[],
        )
        .unwrap_err();
        assert_eq!(error.fault_kind(), Some(FaultKind::UnresolvedMember));
    }

    #[test]
    fn test_constructor_type_mismatch() {
        let mut context = jdk_context(ClassDictionary::new());
        let exception = context.heap_mut().placeholder("java/lang/Exception").unwrap();
        let error = call_virtual(
            &mut context,
            "java/lang/NullPointerException",
            "<init>",
            "()V",
            exception,
            &[],
        )
        .unwrap_err();
        assert_eq!(error.fault_kind(), Some(FaultKind::Type));
    }
}
