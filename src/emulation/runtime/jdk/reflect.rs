//! Reflection stubs: `Class`, `Method`, `Field` and the code location chain.
//!
//! Reflective lookups only see the class dictionary. `Method.invoke` re-enters the
//! provider chain, so a reflectively called program method runs in the interpreter like
//! any other call. Primitive parameters and return values would need boxing, which is not
//! modeled; such methods fault with a type error instead of running.

use std::fs;

use crate::{
    emulation::{
        runtime::{
            jdk::{binary_name, new_class, new_reference_array, string_arg},
            provider::{InvokeKind, MethodCall, NativeCatalog},
        },
        ByteSource, CodeLocation, Context, EmulationError, HostObject, JavaArray, JavaClass,
        JavaField, JavaMethod, JavaValue,
    },
    metadata::{ClassFileRc, FieldType, MethodDescriptor},
    utils::java_hash_str,
    Result,
};

/// Registers the reflection stubs.
///
/// # Errors
/// Returns [`crate::Error::Configuration`] on a key collision.
pub fn register(catalog: &mut NativeCatalog) -> Result<()> {
    const CLASS: &str = "java/lang/Class";
    catalog.register(CLASS, "forName(Ljava/lang/String;)Ljava/lang/Class;", class_for_name)?;
    catalog.register(CLASS, "getName()Ljava/lang/String;", class_get_name)?;
    catalog.register(
        CLASS,
        "getDeclaredMethod(Ljava/lang/String;[Ljava/lang/Class;)Ljava/lang/reflect/Method;",
        class_get_declared_method,
    )?;
    catalog.register(
        CLASS,
        "getDeclaredMethods()[Ljava/lang/reflect/Method;",
        class_get_declared_methods,
    )?;
    catalog.register(
        CLASS,
        "getDeclaredFields()[Ljava/lang/reflect/Field;",
        class_get_declared_fields,
    )?;
    catalog.register(CLASS, "getClassLoader()Ljava/lang/ClassLoader;", class_get_class_loader)?;
    catalog.register(CLASS, "getSuperclass()Ljava/lang/Class;", class_get_superclass)?;
    catalog.register(CLASS, "getInterfaces()[Ljava/lang/Class;", class_get_interfaces)?;
    catalog.register(
        CLASS,
        "getProtectionDomain()Ljava/security/ProtectionDomain;",
        class_get_protection_domain,
    )?;
    catalog.register(
        "java/security/ProtectionDomain",
        "getCodeSource()Ljava/security/CodeSource;",
        protection_domain_get_code_source,
    )?;
    catalog.register(
        "java/security/CodeSource",
        "getLocation()Ljava/net/URL;",
        code_source_get_location,
    )?;
    catalog.register("java/net/URL", "openStream()Ljava/io/InputStream;", url_open_stream)?;

    const METHOD: &str = "java/lang/reflect/Method";
    catalog.register(METHOD, "getName()Ljava/lang/String;", method_get_name)?;
    catalog.register(METHOD, "getReturnType()Ljava/lang/Class;", method_get_return_type)?;
    catalog.register(
        METHOD,
        "getParameterTypes()[Ljava/lang/Class;",
        method_get_parameter_types,
    )?;
    catalog.register(METHOD, "setAccessible(Z)V", method_set_accessible)?;
    catalog.register(METHOD, "hashCode()I", method_hash_code)?;
    catalog.register(
        METHOD,
        "invoke(Ljava/lang/Object;[Ljava/lang/Object;)Ljava/lang/Object;",
        method_invoke,
    )?;

    const FIELD: &str = "java/lang/reflect/Field";
    catalog.register(FIELD, "getName()Ljava/lang/String;", field_get_name)?;
    catalog.register(FIELD, "getType()Ljava/lang/Class;", field_get_type)?;
    Ok(())
}

fn this_class(call: &MethodCall<'_>, context: &Context) -> Result<String> {
    Ok(context.heap().narrow::<JavaClass>(call.this()?)?.name.clone())
}

/// The dictionary entry for a reflected class; JDK classes are not reflectable.
fn program_class(name: &str, context: &Context) -> Result<ClassFileRc> {
    context.dictionary().get(name).ok_or_else(|| {
        EmulationError::ClassNotFound {
            name: binary_name(name),
        }
        .into()
    })
}

/// Descriptor of the type a `Class` object names.
fn class_descriptor(name: &str) -> String {
    match name {
        "byte" => "B",
        "char" => "C",
        "double" => "D",
        "float" => "F",
        "int" => "I",
        "long" => "J",
        "short" => "S",
        "boolean" => "Z",
        "void" => "V",
        array if array.starts_with('[') => return array.to_string(),
        class => return format!("L{class};"),
    }
    .to_string()
}

fn class_for_name(call: &MethodCall<'_>, context: &mut Context) -> Result<JavaValue> {
    let name = string_arg(call, 0, context)?.to_string_lossy().replace('.', "/");
    new_class(context, &name)
}

fn class_get_name(call: &MethodCall<'_>, context: &mut Context) -> Result<JavaValue> {
    let name = this_class(call, context)?;
    context.heap_mut().alloc_str(&binary_name(&name))
}

fn class_get_declared_method(call: &MethodCall<'_>, context: &mut Context) -> Result<JavaValue> {
    let owner = this_class(call, context)?;
    let name = string_arg(call, 0, context)?.to_string_lossy();

    let parameters = call.arg(1)?;
    let mut prefix = String::from("(");
    if !parameters.is_null() {
        let elements = context
            .heap()
            .narrow::<JavaArray>(parameters)?
            .references()?
            .to_vec();
        for element in elements {
            let class = &context.heap().narrow::<JavaClass>(element)?.name;
            prefix.push_str(&class_descriptor(class));
        }
    }
    prefix.push(')');

    let class = program_class(&owner, context)?;
    let Some(method) = class
        .methods
        .iter()
        .find(|method| method.name == name && method.descriptor.starts_with(&prefix))
    else {
        return Err(EmulationError::ExceptionThrown {
            class_name: "java/lang/NoSuchMethodException".to_string(),
        }
        .into());
    };
    let reflected = HostObject::Method(JavaMethod {
        owner: owner.clone(),
        name: method.name.clone(),
        descriptor: method.descriptor.clone(),
        accessible: false,
    });
    context.heap_mut().wrap(reflected)
}

fn class_get_declared_methods(call: &MethodCall<'_>, context: &mut Context) -> Result<JavaValue> {
    let owner = this_class(call, context)?;
    let class = program_class(&owner, context)?;
    let mut elements = Vec::new();
    for method in class.methods.iter().filter(|method| !method.is_initializer()) {
        elements.push(context.heap_mut().wrap(HostObject::Method(JavaMethod {
            owner: owner.clone(),
            name: method.name.clone(),
            descriptor: method.descriptor.clone(),
            accessible: false,
        }))?);
    }
    new_reference_array(context, "java/lang/reflect/Method", elements)
}

fn class_get_declared_fields(call: &MethodCall<'_>, context: &mut Context) -> Result<JavaValue> {
    let owner = this_class(call, context)?;
    let class = program_class(&owner, context)?;
    let mut elements = Vec::with_capacity(class.fields.len());
    for field in &class.fields {
        elements.push(context.heap_mut().wrap(HostObject::Field(JavaField {
            owner: owner.clone(),
            name: field.name.clone(),
            descriptor: field.descriptor.clone(),
        }))?);
    }
    new_reference_array(context, "java/lang/reflect/Field", elements)
}

fn class_get_class_loader(_call: &MethodCall<'_>, _context: &mut Context) -> Result<JavaValue> {
    Ok(JavaValue::Null)
}

fn class_get_superclass(call: &MethodCall<'_>, context: &mut Context) -> Result<JavaValue> {
    let name = this_class(call, context)?;
    if name == "java/lang/Object" || !name.contains('/') {
        return Ok(JavaValue::Null);
    }
    match program_class(&name, context)?.super_name.clone() {
        Some(super_name) => new_class(context, &super_name),
        None => Ok(JavaValue::Null),
    }
}

fn class_get_interfaces(call: &MethodCall<'_>, context: &mut Context) -> Result<JavaValue> {
    let name = this_class(call, context)?;
    let class = program_class(&name, context)?;
    let mut elements = Vec::with_capacity(class.interfaces.len());
    for interface in &class.interfaces {
        elements.push(new_class(context, interface)?);
    }
    new_reference_array(context, "java/lang/Class", elements)
}

fn class_get_protection_domain(_call: &MethodCall<'_>, context: &mut Context) -> Result<JavaValue> {
    let Some(file) = context.file() else {
        return Err(EmulationError::host(
            "Class.getProtectionDomain",
            "no originating file attached to the context",
        )
        .into());
    };
    let location = CodeLocation {
        url: format!("file:{}", file.display()),
    };
    context
        .heap_mut()
        .wrap_as("java/security/ProtectionDomain", HostObject::CodeLocation(location))
}

fn protection_domain_get_code_source(call: &MethodCall<'_>, context: &mut Context) -> Result<JavaValue> {
    let location = context.heap().narrow::<CodeLocation>(call.this()?)?.clone();
    context
        .heap_mut()
        .wrap_as("java/security/CodeSource", HostObject::CodeLocation(location))
}

fn code_source_get_location(call: &MethodCall<'_>, context: &mut Context) -> Result<JavaValue> {
    let location = context.heap().narrow::<CodeLocation>(call.this()?)?.clone();
    context
        .heap_mut()
        .wrap_as("java/net/URL", HostObject::CodeLocation(location))
}

fn url_open_stream(call: &MethodCall<'_>, context: &mut Context) -> Result<JavaValue> {
    let url = context.heap().narrow::<CodeLocation>(call.this()?)?.url.clone();
    let Some(path) = url.strip_prefix("file:") else {
        return Err(EmulationError::host("URL.openStream", format!("refusing to open {url}")).into());
    };
    let data = fs::read(path)
        .map_err(|error| EmulationError::host("URL.openStream", format!("{path}: {error}")))?;
    context
        .heap_mut()
        .wrap(HostObject::ByteSource(ByteSource::new(data)))
}

fn this_method(call: &MethodCall<'_>, context: &Context) -> Result<JavaMethod> {
    Ok(context.heap().narrow::<JavaMethod>(call.this()?)?.clone())
}

fn method_get_name(call: &MethodCall<'_>, context: &mut Context) -> Result<JavaValue> {
    let method = this_method(call, context)?;
    context.heap_mut().alloc_str(&method.name)
}

fn method_get_return_type(call: &MethodCall<'_>, context: &mut Context) -> Result<JavaValue> {
    let method = this_method(call, context)?;
    let descriptor = MethodDescriptor::parse(&method.descriptor)?;
    new_class(context, &descriptor.return_type.internal_name())
}

fn method_get_parameter_types(call: &MethodCall<'_>, context: &mut Context) -> Result<JavaValue> {
    let method = this_method(call, context)?;
    let descriptor = MethodDescriptor::parse(&method.descriptor)?;
    let mut elements = Vec::with_capacity(descriptor.parameters.len());
    for parameter in &descriptor.parameters {
        elements.push(new_class(context, &parameter.internal_name())?);
    }
    new_reference_array(context, "java/lang/Class", elements)
}

fn method_set_accessible(call: &MethodCall<'_>, context: &mut Context) -> Result<JavaValue> {
    let flag = call.arg(0)?.as_int("Method.setAccessible")? != 0;
    context.heap_mut().narrow_mut::<JavaMethod>(call.this()?)?.accessible = flag;
    Ok(JavaValue::Void)
}

fn method_hash_code(call: &MethodCall<'_>, context: &mut Context) -> Result<JavaValue> {
    let method = this_method(call, context)?;
    Ok(JavaValue::Int(
        java_hash_str(&binary_name(&method.owner)) ^ java_hash_str(&method.name),
    ))
}

fn method_invoke(call: &MethodCall<'_>, context: &mut Context) -> Result<JavaValue> {
    let method = this_method(call, context)?;
    let descriptor = MethodDescriptor::parse(&method.descriptor)?;
    if let Some(primitive) = descriptor
        .parameters
        .iter()
        .chain(std::iter::once(&descriptor.return_type))
        .find(|field_type| !field_type.is_reference() && !field_type.is_void())
    {
        return Err(EmulationError::TypeMismatch {
            operation: "Method.invoke",
            expected: "reference",
            found: primitive_name(primitive),
        }
        .into());
    }

    let arguments = call.arg(1)?;
    let args = if arguments.is_null() {
        Vec::new()
    } else {
        context
            .heap()
            .narrow::<JavaArray>(arguments)?
            .references()?
            .to_vec()
    };
    if args.len() != descriptor.parameters.len() {
        return Err(EmulationError::ExceptionThrown {
            class_name: "java/lang/IllegalArgumentException".to_string(),
        }
        .into());
    }

    let is_static = context
        .dictionary()
        .get(&method.owner)
        .and_then(|class| class.method(&method.name, &method.descriptor).map(|m| m.is_static()))
        .unwrap_or(false);
    let target = if is_static {
        MethodCall::new_static(&method.owner, &method.name, &method.descriptor, &args)
    } else {
        let receiver = call.arg(0)?;
        if receiver.is_null() {
            return Err(EmulationError::NullReference.into());
        }
        MethodCall::new_instance(
            InvokeKind::Virtual,
            &method.owner,
            &method.name,
            &method.descriptor,
            receiver,
            &args,
        )
    };

    let chain = context.provider().clone();
    match chain.invoke(&target, context)? {
        JavaValue::Void => Ok(JavaValue::Null),
        value => Ok(value),
    }
}

fn primitive_name(field_type: &FieldType) -> &'static str {
    match field_type {
        FieldType::Byte => "byte",
        FieldType::Char => "char",
        FieldType::Double => "double",
        FieldType::Float => "float",
        FieldType::Int => "int",
        FieldType::Long => "long",
        FieldType::Short => "short",
        FieldType::Boolean => "boolean",
        _ => "reference",
    }
}

fn field_get_name(call: &MethodCall<'_>, context: &mut Context) -> Result<JavaValue> {
    let name = context.heap().narrow::<JavaField>(call.this()?)?.name.clone();
    context.heap_mut().alloc_str(&name)
}

fn field_get_type(call: &MethodCall<'_>, context: &mut Context) -> Result<JavaValue> {
    let descriptor = context.heap().narrow::<JavaField>(call.this()?)?.descriptor.clone();
    let field_type = FieldType::parse(&descriptor)?;
    new_class(context, &field_type.internal_name())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        assembly::InstructionAssembler,
        emulation::FaultKind,
        metadata::{ClassDictionary, ClassFile, FieldAccessFlags, FieldDef, MethodAccessFlags, MethodDef},
        test::{call_static, call_virtual, jdk_context},
    };

    fn dictionary() -> ClassDictionary {
        let mut identity = InstructionAssembler::new();
        identity.aload(0).areturn();
        let mut count = InstructionAssembler::new();
        count.iconst(3).ireturn();

        [ClassFile::new("a/Keys")
            .with_interface("java/lang/Runnable")
            .with_field(FieldDef::new(
                "table",
                "[I",
                FieldAccessFlags::PRIVATE | FieldAccessFlags::STATIC,
            ))
            .with_method(MethodDef::new(
                "echo",
                "(Ljava/lang/String;)Ljava/lang/String;",
                MethodAccessFlags::PUBLIC | MethodAccessFlags::STATIC,
                identity.finish().unwrap(),
            ))
            .with_method(MethodDef::new(
                "count",
                "()I",
                MethodAccessFlags::PUBLIC | MethodAccessFlags::STATIC,
                count.finish().unwrap(),
            ))]
        .into_iter()
        .collect()
    }

    fn for_name(context: &mut Context, name: &str) -> JavaValue {
        let name = context.heap_mut().alloc_str(name).unwrap();
        call_static(
            context,
            "java/lang/Class",
            "forName",
            "(Ljava/lang/String;)Ljava/lang/Class;",
            &[name],
        )
        .unwrap()
    }

    fn declared_method(context: &mut Context, class: JavaValue, name: &str, parameters: &[&str]) -> Result<JavaValue> {
        let name = context.heap_mut().alloc_str(name).unwrap();
        let mut elements = Vec::new();
        for parameter in parameters {
            elements.push(new_class(context, parameter).unwrap());
        }
        let parameters = new_reference_array(context, "java/lang/Class", elements).unwrap();
        call_virtual(
            context,
            "java/lang/Class",
            "getDeclaredMethod",
            "(Ljava/lang/String;[Ljava/lang/Class;)Ljava/lang/reflect/Method;",
            class,
            &[name, parameters],
        )
    }

    #[test]
    fn test_for_name_and_get_name() {
        let mut context = jdk_context(dictionary());
        let class = for_name(&mut context, "a.Keys");
        assert_eq!(context.heap().narrow::<JavaClass>(class).unwrap().name, "a/Keys");
        let name = call_virtual(
            &mut context,
            "java/lang/Class",
            "getName",
            "()Ljava/lang/String;",
            class,
            &[],
        )
        .unwrap();
        assert_eq!(context.heap().rust_string(name).unwrap(), "a.Keys");
    }

    #[test]
    fn test_declared_method_lookup_and_invoke() {
        let mut context = jdk_context(dictionary());
        let class = for_name(&mut context, "a.Keys");
        let method = declared_method(&mut context, class, "echo", &["java/lang/String"]).unwrap();
        call_virtual(
            &mut context,
            "java/lang/reflect/Method",
            "setAccessible",
            "(Z)V",
            method,
            &[JavaValue::Int(1)],
        )
        .unwrap();
        assert!(context.heap().narrow::<JavaMethod>(method).unwrap().accessible);

        let argument = context.heap_mut().alloc_str("payload").unwrap();
        let arguments = new_reference_array(&mut context, "java/lang/Object", vec![argument]).unwrap();
        let result = call_virtual(
            &mut context,
            "java/lang/reflect/Method",
            "invoke",
            "(Ljava/lang/Object;[Ljava/lang/Object;)Ljava/lang/Object;",
            method,
            &[JavaValue::Null, arguments],
        )
        .unwrap();
        assert_eq!(result, argument);

        let error = declared_method(&mut context, class, "echo", &["int"]).unwrap_err();
        assert_eq!(error.fault_kind(), Some(FaultKind::Runtime));
    }

    #[test]
    fn test_invoke_rejects_primitive_return() {
        let mut context = jdk_context(dictionary());
        let class = for_name(&mut context, "a.Keys");
        let method = declared_method(&mut context, class, "count", &[]).unwrap();
        let error = call_virtual(
            &mut context,
            "java/lang/reflect/Method",
            "invoke",
            "(Ljava/lang/Object;[Ljava/lang/Object;)Ljava/lang/Object;",
            method,
            &[JavaValue::Null, JavaValue::Null],
        )
        .unwrap_err();
        assert_eq!(error.fault_kind(), Some(FaultKind::Type));
    }

    #[test]
    fn test_method_metadata() {
        let mut context = jdk_context(dictionary());
        let class = for_name(&mut context, "a.Keys");
        let method = declared_method(&mut context, class, "echo", &["java/lang/String"]).unwrap();

        let hash = call_virtual(&mut context, "java/lang/reflect/Method", "hashCode", "()I", method, &[])
            .unwrap();
        assert_eq!(hash, JavaValue::Int(java_hash_str("a.Keys") ^ java_hash_str("echo")));

        let parameters = call_virtual(
            &mut context,
            "java/lang/reflect/Method",
            "getParameterTypes",
            "()[Ljava/lang/Class;",
            method,
            &[],
        )
        .unwrap();
        let array = context.heap().narrow::<JavaArray>(parameters).unwrap().clone();
        assert_eq!(array.len(), 1);
        let first = context.heap().narrow::<JavaClass>(array.load(0).unwrap()).unwrap();
        assert_eq!(first.name, "java/lang/String");

        let methods = call_virtual(
            &mut context,
            "java/lang/Class",
            "getDeclaredMethods",
            "()[Ljava/lang/reflect/Method;",
            class,
            &[],
        )
        .unwrap();
        assert_eq!(context.heap().narrow::<JavaArray>(methods).unwrap().len(), 2);
    }

    #[test]
    fn test_fields_and_hierarchy() {
        let mut context = jdk_context(dictionary());
        let class = for_name(&mut context, "a.Keys");
        let fields = call_virtual(
            &mut context,
            "java/lang/Class",
            "getDeclaredFields",
            "()[Ljava/lang/reflect/Field;",
            class,
            &[],
        )
        .unwrap();
        let field = context.heap().narrow::<JavaArray>(fields).unwrap().load(0).unwrap();
        let field_type = call_virtual(
            &mut context,
            "java/lang/reflect/Field",
            "getType",
            "()Ljava/lang/Class;",
            field,
            &[],
        )
        .unwrap();
        assert_eq!(context.heap().narrow::<JavaClass>(field_type).unwrap().name, "[I");

        let superclass = call_virtual(
            &mut context,
            "java/lang/Class",
            "getSuperclass",
            "()Ljava/lang/Class;",
            class,
            &[],
        )
        .unwrap();
        assert_eq!(
            context.heap().narrow::<JavaClass>(superclass).unwrap().name,
            "java/lang/Object"
        );

        let missing = for_name(&mut context, "a.Missing");
        let error = call_virtual(
            &mut context,
            "java/lang/Class",
            "getInterfaces",
            "()[Ljava/lang/Class;",
            missing,
            &[],
        )
        .unwrap_err();
        assert_eq!(error.fault_kind(), Some(FaultKind::UnresolvedMember));
    }

    #[test]
    fn test_code_location_chain() {
        let path = std::env::temp_dir().join("jvmscope-reflect-location.bin");
        std::fs::write(&path, [1u8, 2, 3]).unwrap();

        let mut context = jdk_context(dictionary()).with_file(&path);
        let class = for_name(&mut context, "a.Keys");
        let domain = call_virtual(
            &mut context,
            "java/lang/Class",
            "getProtectionDomain",
            "()Ljava/security/ProtectionDomain;",
            class,
            &[],
        )
        .unwrap();
        let source = call_virtual(
            &mut context,
            "java/security/ProtectionDomain",
            "getCodeSource",
            "()Ljava/security/CodeSource;",
            domain,
            &[],
        )
        .unwrap();
        let url = call_virtual(
            &mut context,
            "java/security/CodeSource",
            "getLocation",
            "()Ljava/net/URL;",
            source,
            &[],
        )
        .unwrap();
        assert_eq!(context.heap().class_name(url).unwrap(), "java/net/URL");
        let stream = call_virtual(
            &mut context,
            "java/net/URL",
            "openStream",
            "()Ljava/io/InputStream;",
            url,
            &[],
        )
        .unwrap();
        assert_eq!(context.heap().narrow::<ByteSource>(stream).unwrap().data, vec![1, 2, 3]);
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_protection_domain_requires_file() {
        let mut context = jdk_context(dictionary());
        let class = for_name(&mut context, "a.Keys");
        let error = call_virtual(
            &mut context,
            "java/lang/Class",
            "getProtectionDomain",
            "()Ljava/security/ProtectionDomain;",
            class,
            &[],
        )
        .unwrap_err();
        assert_eq!(error.fault_kind(), Some(FaultKind::Host));
    }
}
