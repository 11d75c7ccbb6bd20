//! Native method catalog and the provider that serves it.

use std::fmt;

use log::trace;
use rustc_hash::FxHashMap;

use crate::{
    emulation::{
        runtime::{
            jdk,
            provider::{MethodCall, Provider},
        },
        Context, JavaValue,
    },
    Error, Result,
};

/// Exact lookup key of a native method.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MethodKey {
    /// Owner internal name (`java/lang/String`)
    pub owner: String,
    /// Method name followed by descriptor (`trim()Ljava/lang/String;`)
    pub signature: String,
}

impl MethodKey {
    /// Creates a key.
    #[must_use]
    pub fn new(owner: &str, signature: &str) -> Self {
        MethodKey {
            owner: owner.to_string(),
            signature: signature.to_string(),
        }
    }
}

impl fmt::Display for MethodKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.owner, self.signature)
    }
}

/// Signature of a native method stub.
pub type NativeFn = fn(&MethodCall<'_>, &mut Context) -> Result<JavaValue>;

/// Table of native method stubs.
///
/// Keys are exact: no overload selection and no lookup along the class hierarchy. A
/// stub registered on `java/lang/Throwable` does not answer calls naming
/// `java/lang/Exception`; each owner is registered explicitly.
#[derive(Default, Clone)]
pub struct NativeCatalog {
    methods: FxHashMap<MethodKey, NativeFn>,
}

impl NativeCatalog {
    /// Creates an empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The stubs for the JDK subset that string decryptors use.
    ///
    /// # Errors
    /// Returns [`Error::Configuration`] if two stubs claim the same key.
    pub fn jdk() -> Result<Self> {
        let mut catalog = NativeCatalog::new();
        jdk::register_all(&mut catalog)?;
        Ok(catalog)
    }

    /// Adds a stub.
    ///
    /// # Errors
    /// Returns [`Error::Configuration`] if the key is already registered.
    pub fn register(&mut self, owner: &str, signature: &str, handler: NativeFn) -> Result<()> {
        let key = MethodKey::new(owner, signature);
        if self.methods.contains_key(&key) {
            return Err(Error::Configuration(format!(
                "duplicate native method registration {key}"
            )));
        }
        self.methods.insert(key, handler);
        Ok(())
    }

    /// Looks up a stub.
    #[must_use]
    pub fn get(&self, owner: &str, signature: &str) -> Option<NativeFn> {
        self.methods.get(&MethodKey::new(owner, signature)).copied()
    }

    /// `true` if a stub is registered for the key.
    #[must_use]
    pub fn contains(&self, owner: &str, signature: &str) -> bool {
        self.get(owner, signature).is_some()
    }

    /// Number of stubs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.methods.len()
    }

    /// `true` if the catalog is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }

    /// All keys, sorted.
    #[must_use]
    pub fn keys(&self) -> Vec<MethodKey> {
        let mut keys: Vec<MethodKey> = self.methods.keys().cloned().collect();
        keys.sort();
        keys
    }
}

impl fmt::Debug for NativeCatalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeCatalog")
            .field("methods", &self.methods.len())
            .finish()
    }
}

/// Provider serving calls from a [`NativeCatalog`].
#[derive(Debug, Clone)]
pub struct NativeMethodProvider {
    catalog: NativeCatalog,
}

impl NativeMethodProvider {
    /// Wraps a catalog.
    #[must_use]
    pub fn new(catalog: NativeCatalog) -> Self {
        NativeMethodProvider { catalog }
    }

    /// Provider for the JDK stub catalog.
    ///
    /// # Errors
    /// See [`NativeCatalog::jdk`].
    pub fn jdk() -> Result<Self> {
        Ok(Self::new(NativeCatalog::jdk()?))
    }

    /// The served catalog.
    #[must_use]
    pub fn catalog(&self) -> &NativeCatalog {
        &self.catalog
    }
}

impl Provider for NativeMethodProvider {
    fn name(&self) -> &'static str {
        "native"
    }

    fn can_invoke(&self, call: &MethodCall<'_>, _context: &Context) -> bool {
        self.catalog.contains(call.owner, &call.signature())
    }

    fn invoke(&self, call: &MethodCall<'_>, context: &mut Context) -> Result<JavaValue> {
        let Some(handler) = self.catalog.get(call.owner, &call.signature()) else {
            return Err(call.unresolved());
        };
        trace!("native {}.{}{}", call.owner, call.name, call.descriptor);
        handler(call, context)
    }

    fn native_keys(&self) -> Vec<MethodKey> {
        self.catalog.keys()
    }
}
