//! Ordered, immutable provider chain.

use std::{fmt, sync::Arc};

use rustc_hash::FxHashSet;

use crate::{
    emulation::{
        runtime::provider::{
            unresolved_comparison, unresolved_instance_of, ComparisonProvider,
            MappedMethodProvider, MethodCall, NativeMethodProvider, Provider, ProviderOutcome,
        },
        Context, JavaValue,
    },
    metadata::ClassDictionary,
    Error, Result,
};

/// The providers consulted by the interpreter, in resolution order.
///
/// A chain is assembled once through [`ProviderChainBuilder`] and shared read-only
/// (behind an `Arc`) by every context.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use jvmscope::{
///     emulation::{NativeMethodProvider, ProviderChain},
///     metadata::ClassDictionary,
/// };
///
/// let dictionary = Arc::new(ClassDictionary::new());
/// let chain = ProviderChain::builder()
///     .register_native_provider(NativeMethodProvider::jdk()?)
///     .register_mapped_provider(dictionary)
///     .build()?;
/// assert_eq!(chain.names(), vec!["native", "mapped"]);
/// # Ok::<(), jvmscope::Error>(())
/// ```
pub struct ProviderChain {
    providers: Vec<Box<dyn Provider>>,
}

impl ProviderChain {
    /// Starts assembling a chain.
    #[must_use]
    pub fn builder() -> ProviderChainBuilder {
        ProviderChainBuilder::default()
    }

    /// The standard chain: JDK natives, JDK comparisons, then program methods.
    ///
    /// # Errors
    /// Returns a configuration error if the JDK catalog is inconsistent.
    pub fn jdk(dictionary: Arc<ClassDictionary>) -> Result<Self> {
        ProviderChain::builder()
            .register_native_provider(NativeMethodProvider::jdk()?)
            .register_comparison_provider(ComparisonProvider::new())
            .register_mapped_provider(dictionary)
            .build()
    }

    /// Provider names in resolution order.
    #[must_use]
    pub fn names(&self) -> Vec<&'static str> {
        self.providers.iter().map(|provider| provider.name()).collect()
    }

    /// Number of providers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.providers.len()
    }

    /// `true` if the chain has no providers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    /// Offers a call to the providers; the first one that claims it decides the outcome.
    ///
    /// # Errors
    /// Any fault raised by the claiming provider.
    pub fn resolve(&self, call: &MethodCall<'_>, context: &mut Context) -> Result<ProviderOutcome> {
        match self
            .providers
            .iter()
            .find(|provider| provider.can_invoke(call, context))
        {
            Some(provider) => Ok(ProviderOutcome::Handled(provider.invoke(call, context)?)),
            None => Ok(ProviderOutcome::NotApplicable),
        }
    }

    /// Performs a call, treating an unclaimed call as an unresolved member.
    ///
    /// # Errors
    /// Returns an unresolved-member fault if no provider claims the call, or any fault
    /// raised by the claiming provider.
    pub fn invoke(&self, call: &MethodCall<'_>, context: &mut Context) -> Result<JavaValue> {
        match self.resolve(call, context)? {
            ProviderOutcome::Handled(value) => Ok(value),
            ProviderOutcome::NotApplicable => Err(call.unresolved()),
        }
    }

    /// Decides reference equality for `if_acmpeq` / `if_acmpne`.
    ///
    /// # Errors
    /// Returns an unresolved-member fault if no provider can compare the values.
    pub fn compare(&self, first: JavaValue, second: JavaValue, context: &Context) -> Result<bool> {
        match self
            .providers
            .iter()
            .find(|provider| provider.can_compare(first, second, context))
        {
            Some(provider) => provider.compare(first, second, context),
            None => Err(unresolved_comparison(first, second, context)),
        }
    }

    /// Answers `value instanceof target` for `checkcast` / `instanceof`.
    ///
    /// # Errors
    /// Returns an unresolved-member fault if no provider can answer.
    pub fn instance_of(&self, value: JavaValue, target: &str, context: &Context) -> Result<bool> {
        match self
            .providers
            .iter()
            .find(|provider| provider.can_check_instance_of(value, target, context))
        {
            Some(provider) => provider.instance_of(value, target, context),
            None => Err(unresolved_instance_of(value, target, context)),
        }
    }
}

impl fmt::Debug for ProviderChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderChain")
            .field("providers", &self.names())
            .finish()
    }
}

/// Builder for [`ProviderChain`]. Providers are consulted in registration order.
#[derive(Default)]
pub struct ProviderChainBuilder {
    providers: Vec<Box<dyn Provider>>,
}

impl ProviderChainBuilder {
    /// Appends a native method provider.
    #[must_use]
    pub fn register_native_provider(self, provider: NativeMethodProvider) -> Self {
        self.register(Box::new(provider))
    }

    /// Appends a comparison provider.
    #[must_use]
    pub fn register_comparison_provider(self, provider: ComparisonProvider) -> Self {
        self.register(Box::new(provider))
    }

    /// Appends a provider interpreting the methods of `dictionary`.
    #[must_use]
    pub fn register_mapped_provider(self, dictionary: Arc<ClassDictionary>) -> Self {
        self.register(Box::new(MappedMethodProvider::new(dictionary)))
    }

    /// Appends any provider.
    #[must_use]
    pub fn register(mut self, provider: Box<dyn Provider>) -> Self {
        self.providers.push(provider);
        self
    }

    /// Freezes the chain.
    ///
    /// # Errors
    /// Returns [`Error::Configuration`] for an empty chain and
    /// when two providers register the same native key.
    pub fn build(self) -> Result<ProviderChain> {
        if self.providers.is_empty() {
            return Err(Error::Configuration(
                "provider chain has no providers".to_string(),
            ));
        }

        let mut seen = FxHashSet::default();
        for provider in &self.providers {
            for key in provider.native_keys() {
                if !seen.insert(key.clone()) {
                    return Err(Error::Configuration(format!(
                        "duplicate native method registration {key}"
                    )));
                }
            }
        }

        Ok(ProviderChain {
            providers: self.providers,
        })
    }
}
