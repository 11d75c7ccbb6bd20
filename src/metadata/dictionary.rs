//! The class dictionary: every program class available to the interpreter, by name.

use std::sync::Arc;

use crossbeam_skiplist::SkipMap;

use crate::metadata::{ClassFile, ClassFileRc, MethodDef};

/// A map that holds the mapping of internal class name to parsed `ClassFile`
pub type ClassMap = SkipMap<String, ClassFileRc>;

/// Program classes indexed by internal name.
///
/// Populated before execution starts and read-only afterwards; lookups are lock-free,
/// so one dictionary is shared by every worker of a parallel pass.
#[derive(Default)]
pub struct ClassDictionary {
    classes: ClassMap,
}

impl ClassDictionary {
    /// Creates an empty dictionary.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a class.
    pub fn insert(&mut self, class: ClassFile) -> ClassFileRc {
        let class = Arc::new(class);
        self.classes.insert(class.name.clone(), class.clone());
        class
    }

    /// Looks a class up by internal name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<ClassFileRc> {
        self.classes.get(name).map(|entry| entry.value().clone())
    }

    /// `true` if a class with this internal name is present.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.classes.contains_key(name)
    }

    /// Number of classes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.classes.len()
    }

    /// `true` if the dictionary holds no classes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    /// All classes, ordered by name.
    #[must_use]
    pub fn classes(&self) -> Vec<ClassFileRc> {
        self.classes.iter().map(|entry| entry.value().clone()).collect()
    }

    /// Finds a method with code by owner, name and descriptor.
    ///
    /// Lookup is exact: methods inherited from a superclass are not found through a subclass.
    #[must_use]
    pub fn method_with_body(&self, owner: &str, name: &str, descriptor: &str) -> Option<(ClassFileRc, usize)> {
        let class = self.get(owner)?;
        let index = class.method_index(name, descriptor)?;
        let method: &MethodDef = class.methods.get(index)?;
        method.body.as_ref()?;
        Some((class, index))
    }

    /// Finds the method with code that a call naming `owner` resolves to: `owner` itself,
    /// then its superclasses, then its interfaces, as far as the dictionary reaches.
    #[must_use]
    pub fn resolve_method(&self, owner: &str, name: &str, descriptor: &str) -> Option<(ClassFileRc, usize)> {
        self.ancestors(owner)
            .iter()
            .find_map(|class_name| self.method_with_body(class_name, name, descriptor))
    }

    /// `true` if `class_name` is `target` or inherits from or implements it, following
    /// only edges between classes present in the dictionary.
    #[must_use]
    pub fn is_subtype_of(&self, class_name: &str, target: &str) -> bool {
        self.ancestors(class_name).iter().any(|name| name == target)
    }

    /// `class_name` followed by every superclass and interface reachable from it through
    /// the dictionary. Names outside the dictionary are included but not expanded.
    #[must_use]
    pub fn ancestors(&self, class_name: &str) -> Vec<String> {
        let mut pending = vec![class_name.to_string()];
        let mut visited: Vec<String> = Vec::new();
        while let Some(current) = pending.pop() {
            if visited.contains(&current) {
                continue;
            }
            if let Some(class) = self.get(&current) {
                pending.extend(class.interfaces.iter().rev().cloned());
                pending.extend(class.super_name.iter().cloned());
            }
            visited.push(current);
        }
        visited
    }
}

impl FromIterator<ClassFile> for ClassDictionary {
    fn from_iter<T: IntoIterator<Item = ClassFile>>(iter: T) -> Self {
        let mut dictionary = ClassDictionary::new();
        for class in iter {
            dictionary.insert(class);
        }
        dictionary
    }
}

impl std::fmt::Debug for ClassDictionary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.classes.iter().map(|entry| entry.key().clone()))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        assembly::{Instruction, MethodBody, Opcode},
        metadata::MethodAccessFlags,
    };

    fn dictionary() -> ClassDictionary {
        [
            ClassFile::new("a/Base")
                .with_interface("a/Marker")
                .with_method(MethodDef::new(
                    "shared",
                    "()V",
                    MethodAccessFlags::PUBLIC,
                    MethodBody::new(vec![Instruction::new(Opcode::Return)]),
                )),
            ClassFile::new("a/Child")
                .with_super("a/Base")
                .with_method(MethodDef::new(
                    "run",
                    "()V",
                    MethodAccessFlags::PUBLIC,
                    MethodBody::new(vec![Instruction::new(Opcode::Return)]),
                ))
                .with_method(MethodDef::abstract_method(
                    "stub",
                    "()V",
                    MethodAccessFlags::ABSTRACT,
                )),
            ClassFile::new("a/Marker").with_method(MethodDef::new(
                "marked",
                "()V",
                MethodAccessFlags::PUBLIC,
                MethodBody::new(vec![Instruction::new(Opcode::Return)]),
            )),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn test_lookup() {
        let dictionary = dictionary();
        assert_eq!(dictionary.len(), 3);
        assert!(dictionary.contains("a/Child"));
        assert!(dictionary.get("a/Missing").is_none());
        assert!(dictionary.method_with_body("a/Child", "run", "()V").is_some());
        assert!(dictionary.method_with_body("a/Child", "stub", "()V").is_none());
        assert!(dictionary.method_with_body("a/Base", "run", "()V").is_none());

        let names: Vec<String> = dictionary.classes().iter().map(|c| c.name.clone()).collect();
        assert_eq!(names, vec!["a/Base", "a/Child", "a/Marker"]);
    }

    #[test]
    fn test_resolve_inherited() {
        let dictionary = dictionary();
        let owner = |name: &str| {
            dictionary
                .resolve_method("a/Child", name, "()V")
                .map(|(class, _)| class.name.clone())
        };
        assert_eq!(owner("run").as_deref(), Some("a/Child"));
        assert_eq!(owner("shared").as_deref(), Some("a/Base"));
        assert_eq!(owner("marked").as_deref(), Some("a/Marker"));
        assert_eq!(owner("stub"), None);
        assert!(dictionary.resolve_method("a/Base", "run", "()V").is_none());
        assert!(dictionary.resolve_method("a/Missing", "run", "()V").is_none());
    }

    #[test]
    fn test_subtypes() {
        let dictionary = dictionary();
        assert!(dictionary.is_subtype_of("a/Child", "a/Base"));
        assert!(dictionary.is_subtype_of("a/Child", "a/Marker"));
        assert!(dictionary.is_subtype_of("a/Child", "java/lang/Object"));
        assert!(!dictionary.is_subtype_of("a/Base", "a/Child"));
    }
}
