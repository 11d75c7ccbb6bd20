//! Reference comparison and type checks for JDK objects.

use crate::{
    emulation::{
        runtime::{jdk, provider::Provider},
        Context, HostObject, JavaValue, ObjectState,
    },
    metadata::{ClassDictionary, FieldType},
    Result,
};

/// Answers `if_acmp*` for any pair of references and `instanceof` for objects whose
/// declared type is not a program class.
///
/// Equality is identity, except that two `java.lang.Class` objects naming the same class
/// are equal: stubs such as `Object.getClass()` materialize a fresh object per call.
#[derive(Debug, Clone, Copy, Default)]
pub struct ComparisonProvider;

impl ComparisonProvider {
    /// Creates the provider.
    #[must_use]
    pub fn new() -> Self {
        ComparisonProvider
    }
}

impl Provider for ComparisonProvider {
    fn name(&self) -> &'static str {
        "comparison"
    }

    fn can_compare(&self, first: JavaValue, second: JavaValue, _context: &Context) -> bool {
        first.is_reference_like() && second.is_reference_like()
    }

    fn compare(&self, first: JavaValue, second: JavaValue, context: &Context) -> Result<bool> {
        if first == second {
            return Ok(true);
        }
        if first.is_null() || second.is_null() {
            return Ok(false);
        }
        let first_class = class_object_name(first, context)?;
        let second_class = class_object_name(second, context)?;
        Ok(matches!((first_class, second_class), (Some(a), Some(b)) if a == b))
    }

    fn can_check_instance_of(&self, value: JavaValue, _target: &str, context: &Context) -> bool {
        match value {
            JavaValue::Null => true,
            JavaValue::Reference(_) => context
                .heap()
                .class_name(value)
                .is_ok_and(|name| !context.dictionary().contains(name)),
            _ => false,
        }
    }

    fn instance_of(&self, value: JavaValue, target: &str, context: &Context) -> Result<bool> {
        if value.is_null() {
            return Ok(false);
        }
        let declared = context.heap().class_name(value)?;
        Ok(is_assignable(declared, target, context.dictionary()))
    }
}

fn class_object_name(value: JavaValue, context: &Context) -> Result<Option<&str>> {
    Ok(match &context.heap().object(value)?.state {
        ObjectState::Initialized(HostObject::Class(class)) => Some(class.name.as_str()),
        _ => None,
    })
}

/// `true` if a value declared as `from` may be stored in a slot of type `target`.
///
/// Both names are internal names or array descriptors. Program classes are resolved
/// through `dictionary`; JDK types through a fixed supertype table.
pub(crate) fn is_assignable(from: &str, target: &str, dictionary: &ClassDictionary) -> bool {
    if from == target || target == "java/lang/Object" {
        return true;
    }

    if from.starts_with('[') {
        if matches!(target, "java/lang/Cloneable" | "java/io/Serializable") {
            return true;
        }
        let (Ok(FieldType::Array(source)), Ok(FieldType::Array(destination))) =
            (FieldType::parse(from), FieldType::parse(target))
        else {
            return false;
        };
        return if source.is_reference() && destination.is_reference() {
            is_assignable(&source.internal_name(), &destination.internal_name(), dictionary)
        } else {
            source == destination
        };
    }

    dictionary
        .ancestors(from)
        .iter()
        .any(|name| name == target || jdk::supertypes(name).contains(&target))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        emulation::{JavaArray, JavaClass},
        metadata::ClassFile,
        test::jdk_context,
    };

    #[test]
    fn test_identity_and_class_equality() {
        let mut context = jdk_context(ClassDictionary::new());
        let provider = ComparisonProvider::new();
        let heap = context.heap_mut();
        let first = heap.alloc_str("a").unwrap();
        let second = heap.alloc_str("a").unwrap();
        let class_a = heap
            .wrap(HostObject::Class(JavaClass {
                name: "a/A".to_string(),
            }))
            .unwrap();
        let class_b = heap
            .wrap(HostObject::Class(JavaClass {
                name: "a/A".to_string(),
            }))
            .unwrap();

        assert!(provider.compare(first, first, &context).unwrap());
        assert!(!provider.compare(first, second, &context).unwrap());
        assert!(provider.compare(class_a, class_b, &context).unwrap());
        assert!(!provider.compare(first, JavaValue::Null, &context).unwrap());
        assert!(provider
            .compare(JavaValue::Null, JavaValue::Null, &context)
            .unwrap());
        assert!(!provider.can_compare(JavaValue::Int(1), first, &context));
    }

    #[test]
    fn test_instance_of_jdk_types() {
        let mut context = jdk_context(ClassDictionary::new());
        let provider = ComparisonProvider::new();
        let string = context.heap_mut().alloc_str("x").unwrap();
        let array = context
            .heap_mut()
            .wrap(HostObject::Array(JavaArray::of_component(
                &FieldType::Object("java/lang/String".to_string()),
                1,
            )))
            .unwrap();

        let check = |value: JavaValue, target: &str| provider.instance_of(value, target, &context).unwrap();
        assert!(check(string, "java/lang/CharSequence"));
        assert!(check(string, "java/lang/Object"));
        assert!(!check(string, "java/lang/StringBuilder"));
        assert!(check(array, "[Ljava/lang/Object;"));
        assert!(check(array, "java/io/Serializable"));
        assert!(!check(array, "[I"));
        assert!(!check(JavaValue::Null, "java/lang/String"));
    }

    #[test]
    fn test_program_classes_through_jdk_supertypes() {
        let dictionary: ClassDictionary = [ClassFile::new("a/Failure").with_super("java/lang/RuntimeException")]
            .into_iter()
            .collect();
        assert!(is_assignable("a/Failure", "java/lang/Throwable", &dictionary));
        assert!(!is_assignable("a/Failure", "java/lang/Error", &dictionary));
    }
}
