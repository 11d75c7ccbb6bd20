//! Interpretation of program-defined methods.

use std::sync::Arc;

use log::trace;

use crate::{
    emulation::{
        runtime::provider::{comparison::is_assignable, MethodCall, Provider},
        Context, InvokeKind, EmulationError, HostObject, JavaInstance, JavaValue, MethodExecutor,
    },
    metadata::{ClassDictionary, ClassFileRc},
    Result,
};

/// Runs methods whose code is in the class dictionary through the [`MethodExecutor`].
///
/// Virtual and interface calls dispatch on the receiver's runtime class; other calls
/// resolve from the owner named by the call site. Both walk up through superclasses and
/// interfaces present in the dictionary. Constructors and initializers are never
/// inherited. When a constructor of a program class runs on a receiver that is still
/// uninitialized, the receiver becomes a plain
/// program instance before the body executes; a super-constructor call on an already
/// initialized receiver runs the body without re-initializing.
#[derive(Debug, Clone)]
pub struct MappedMethodProvider {
    dictionary: Arc<ClassDictionary>,
}

impl MappedMethodProvider {
    /// Creates a provider over `dictionary`.
    #[must_use]
    pub fn new(dictionary: Arc<ClassDictionary>) -> Self {
        MappedMethodProvider { dictionary }
    }

    /// The method with code that `call` dispatches to.
    fn resolve(&self, call: &MethodCall<'_>, context: &Context) -> Option<(ClassFileRc, usize)> {
        if call.name.starts_with('<') {
            return self
                .dictionary
                .method_with_body(call.owner, call.name, call.descriptor);
        }
        if matches!(call.kind, InvokeKind::Virtual | InvokeKind::Interface) {
            let runtime = call
                .receiver
                .filter(|receiver| matches!(receiver, JavaValue::Reference(_)))
                .and_then(|receiver| context.heap().class_name(receiver).ok());
            if let Some(found) = runtime
                .and_then(|class_name| self.dictionary.resolve_method(class_name, call.name, call.descriptor))
                .filter(|(class, index)| class.methods.get(*index).is_some_and(|method| !method.is_static()))
            {
                return Some(found);
            }
        }
        self.dictionary.resolve_method(call.owner, call.name, call.descriptor)
    }
}

impl Provider for MappedMethodProvider {
    fn name(&self) -> &'static str {
        "mapped"
    }

    fn can_invoke(&self, call: &MethodCall<'_>, context: &Context) -> bool {
        self.resolve(call, context).is_some()
    }

    fn invoke(&self, call: &MethodCall<'_>, context: &mut Context) -> Result<JavaValue> {
        let Some((class, index)) = self.resolve(call, context) else {
            return Err(call.unresolved());
        };
        let Some(method) = class.methods.get(index) else {
            return Err(call.unresolved());
        };

        let receiver = if method.is_static() {
            None
        } else {
            let this = call.this()?;
            if this.is_null() {
                return Err(EmulationError::NullReference.into());
            }
            if call.is_constructor() && !context.heap().is_initialized(this)? {
                context.heap_mut().initialize(
                    this,
                    &class.name,
                    HostObject::Instance(JavaInstance::default()),
                )?;
            }
            Some(this)
        };

        trace!(
            "mapped {}.{}{} to {}",
            call.owner,
            call.name,
            call.descriptor,
            class.name
        );
        MethodExecutor::execute(&class, method, call.args.to_vec(), receiver, context)
    }

    fn can_check_instance_of(&self, value: JavaValue, _target: &str, context: &Context) -> bool {
        matches!(value, JavaValue::Reference(_))
            && context
                .heap()
                .class_name(value)
                .is_ok_and(|name| self.dictionary.contains(name))
    }

    fn instance_of(&self, value: JavaValue, target: &str, context: &Context) -> Result<bool> {
        let declared = context.heap().class_name(value)?;
        Ok(is_assignable(declared, target, &self.dictionary))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        assembly::{InstructionAssembler, MethodBody, Opcode},
        emulation::FaultKind,
        metadata::{ClassFile, MethodAccessFlags, MethodDef},
        test::jdk_context,
    };

    fn dictionary() -> ClassDictionary {
        let mut answer = InstructionAssembler::new();
        answer.iconst(41).iconst(1).op(Opcode::Iadd).ireturn();

        let mut constructor = InstructionAssembler::new();
        constructor
            .aload(0)
            .invokespecial("java/lang/Object", "<init>", "()V")
            .return_void();

        [ClassFile::new("a/Calc")
            .with_method(MethodDef::new(
                "answer",
                "()I",
                MethodAccessFlags::PUBLIC | MethodAccessFlags::STATIC,
                answer.finish().unwrap(),
            ))
            .with_method(MethodDef::new(
                "<init>",
                "()V",
                MethodAccessFlags::PUBLIC,
                constructor.finish().unwrap(),
            ))]
        .into_iter()
        .collect()
    }

    #[test]
    fn test_static_call() {
        let mut context = jdk_context(dictionary());
        let provider = MappedMethodProvider::new(context.dictionary().clone());

        let call = MethodCall::new_static("a/Calc", "answer", "()I", &[]);
        assert!(provider.can_invoke(&call, &context));
        assert_eq!(provider.invoke(&call, &mut context).unwrap(), JavaValue::Int(42));
        assert_eq!(context.depth(), 0);

        let call = MethodCall::new_static("a/Calc", "missing", "()I", &[]);
        assert!(!provider.can_invoke(&call, &context));
    }

    #[test]
    fn test_constructor_initializes_receiver() {
        let mut context = jdk_context(dictionary());
        let provider = MappedMethodProvider::new(context.dictionary().clone());

        let object = context.heap_mut().placeholder("a/Calc").unwrap();
        let call = MethodCall::new_instance(
            InvokeKind::Special,
            "a/Calc",
            "<init>",
            "()V",
            object,
            &[],
        );
        assert_eq!(provider.invoke(&call, &mut context).unwrap(), JavaValue::Void);
        assert!(context.heap().narrow::<JavaInstance>(object).is_ok());
        assert!(provider.can_check_instance_of(object, "a/Calc", &context));
        assert!(provider.instance_of(object, "java/lang/Object", &context).unwrap());

        let other = context.heap_mut().placeholder("a/Other").unwrap();
        let call = MethodCall::new_instance(
            InvokeKind::Special,
            "a/Calc",
            "<init>",
            "()V",
            other,
            &[],
        );
        let error = provider.invoke(&call, &mut context).unwrap_err();
        assert_eq!(error.fault_kind(), Some(FaultKind::Type));
    }

    fn returns(value: i32) -> MethodBody {
        let mut asm = InstructionAssembler::new();
        asm.iconst(value).ireturn();
        asm.finish().unwrap()
    }

    fn hierarchy() -> ClassDictionary {
        let mut constructor = InstructionAssembler::new();
        constructor
            .aload(0)
            .invokespecial("java/lang/Object", "<init>", "()V")
            .return_void();

        [
            ClassFile::new("a/Base")
                .with_method(MethodDef::new("v", "()I", MethodAccessFlags::PUBLIC, returns(1)))
                .with_method(MethodDef::new(
                    "s",
                    "()I",
                    MethodAccessFlags::PUBLIC | MethodAccessFlags::STATIC,
                    returns(3),
                )),
            ClassFile::new("a/Sub")
                .with_super("a/Base")
                .with_method(MethodDef::new("v", "()I", MethodAccessFlags::PUBLIC, returns(2))),
            ClassFile::new("a/Only").with_super("a/Base").with_method(MethodDef::new(
                "<init>",
                "()V",
                MethodAccessFlags::PUBLIC,
                constructor.finish().unwrap(),
            )),
        ]
        .into_iter()
        .collect()
    }

    fn instance(context: &mut Context, class_name: &str) -> JavaValue {
        let object = context.heap_mut().placeholder(class_name).unwrap();
        context
            .heap_mut()
            .initialize(object, class_name, HostObject::Instance(JavaInstance::default()))
            .unwrap();
        object
    }

    #[test]
    fn test_virtual_call_dispatches_on_receiver() {
        let mut context = jdk_context(hierarchy());
        let provider = MappedMethodProvider::new(context.dictionary().clone());

        let sub = instance(&mut context, "a/Sub");
        let call = MethodCall::new_instance(InvokeKind::Virtual, "a/Base", "v", "()I", sub, &[]);
        assert_eq!(provider.invoke(&call, &mut context).unwrap(), JavaValue::Int(2));

        // invokespecial names the exact implementation
        let call = MethodCall::new_instance(InvokeKind::Special, "a/Base", "v", "()I", sub, &[]);
        assert_eq!(provider.invoke(&call, &mut context).unwrap(), JavaValue::Int(1));

        let base = instance(&mut context, "a/Base");
        let call = MethodCall::new_instance(InvokeKind::Interface, "a/Base", "v", "()I", base, &[]);
        assert_eq!(provider.invoke(&call, &mut context).unwrap(), JavaValue::Int(1));
    }

    #[test]
    fn test_inherited_methods_resolve_through_subclass() {
        let mut context = jdk_context(hierarchy());
        let provider = MappedMethodProvider::new(context.dictionary().clone());

        let only = instance(&mut context, "a/Only");
        let call = MethodCall::new_instance(InvokeKind::Virtual, "a/Only", "v", "()I", only, &[]);
        assert!(provider.can_invoke(&call, &context));
        assert_eq!(provider.invoke(&call, &mut context).unwrap(), JavaValue::Int(1));

        let call = MethodCall::new_static("a/Sub", "s", "()I", &[]);
        assert_eq!(provider.invoke(&call, &mut context).unwrap(), JavaValue::Int(3));

        // constructors are not inherited
        let call = MethodCall::new_instance(InvokeKind::Special, "a/Sub", "<init>", "()V", only, &[]);
        assert!(!provider.can_invoke(&call, &context));
    }

    #[test]
    fn test_interpreted_virtual_calls() {
        let mut context = jdk_context(hierarchy());
        let mut asm = InstructionAssembler::new();
        asm.new_object("a/Only")
            .op(Opcode::Dup)
            .invokespecial("a/Only", "<init>", "()V")
            .invokevirtual("a/Only", "v", "()I")
            .ireturn();
        let driver = ClassFile::new("a/Main").with_method(MethodDef::new(
            "run",
            "()I",
            MethodAccessFlags::STATIC,
            asm.finish().unwrap(),
        ));
        let method = &driver.methods[0];
        let result = MethodExecutor::execute(&driver, method, Vec::new(), None, &mut context).unwrap();
        assert_eq!(result, JavaValue::Int(1));
    }
}
