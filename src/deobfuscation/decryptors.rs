//! Tracking of decryptor call sites across a pass.
//!
//! [`DecryptionSummary`] is shared by every worker of the decryption pass. Each
//! attempted call site ends up in exactly one bucket: decrypted, failed (the emulation
//! faulted or returned something other than a string) or skipped (the argument was not
//! a provable literal). The buckets are keyed by decryptor so callers can tell which
//! decryptors were fully neutralized.
//!
//! # Example
//!
//! ```rust
//! use jvmscope::deobfuscation::{CallSite, DecryptionSummary, FailureReason};
//!
//! let summary = DecryptionSummary::new();
//! let site = CallSite::new("a/Main", "main", "([Ljava/lang/String;)V", 4);
//! summary.record_success("a/K.d", site.clone(), "secret".to_string());
//! summary.record_failure("a/K.d", site, FailureReason::NonStringResult);
//!
//! assert_eq!(summary.decrypted_count(), 1);
//! assert_eq!(summary.failed_count(), 1);
//! assert!(summary.removable_decryptors().is_empty());
//! ```

use std::fmt;

use dashmap::DashMap;

use crate::emulation::FaultKind;

/// A call instruction inside a method.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CallSite {
    /// Internal name of the calling class
    pub class_name: String,
    /// Calling method name
    pub method_name: String,
    /// Calling method descriptor
    pub method_descriptor: String,
    /// Index of the call instruction in the caller's body
    pub index: usize,
}

impl CallSite {
    /// Creates a call site.
    pub fn new(
        class_name: impl Into<String>,
        method_name: impl Into<String>,
        method_descriptor: impl Into<String>,
        index: usize,
    ) -> Self {
        Self {
            class_name: class_name.into(),
            method_name: method_name.into(),
            method_descriptor: method_descriptor.into(),
            index,
        }
    }
}

impl fmt::Display for CallSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}{} @{}",
            self.class_name, self.method_name, self.method_descriptor, self.index
        )
    }
}

/// Record of a successfully decrypted call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecryptedCall {
    /// Where the call was
    pub site: CallSite,
    /// The plaintext that replaced it
    pub value: String,
}

/// Record of a failed decryption attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct FailedCall {
    /// Where the call was
    pub site: CallSite,
    /// Why it failed
    pub reason: FailureReason,
}

/// Reasons a call site was left untouched.
#[derive(Debug, Clone, PartialEq)]
pub enum FailureReason {
    /// The emulation faulted.
    EmulationFailed {
        /// Fault category, `None` for errors raised outside the interpreter
        kind: Option<FaultKind>,
        /// Rendered error
        message: String,
    },
    /// The decryptor returned `null` or a non-string value.
    NonStringResult,
    /// The literal feeding the call is shared with another consumer.
    SharedLiteral,
}

impl FailureReason {
    /// Builds an [`FailureReason::EmulationFailed`] from an error.
    #[must_use]
    pub fn emulation(error: &crate::Error) -> Self {
        Self::EmulationFailed {
            kind: error.fault_kind(),
            message: error.to_string(),
        }
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmulationFailed {
                kind: Some(kind),
                message,
            } => write!(f, "emulation failed ({kind}): {message}"),
            Self::EmulationFailed { kind: None, message } => write!(f, "emulation failed: {message}"),
            Self::NonStringResult => write!(f, "decryptor did not return a string"),
            Self::SharedLiteral => write!(f, "literal has more than one consumer"),
        }
    }
}

/// Outcome of a decryption pass, safe to update from many threads.
#[derive(Debug, Default)]
pub struct DecryptionSummary {
    /// Decrypted call sites per decryptor (`owner.name`).
    decrypted: DashMap<String, boxcar::Vec<DecryptedCall>>,

    /// Failed call sites per decryptor.
    failed: DashMap<String, boxcar::Vec<FailedCall>>,

    /// Call sites per decryptor whose argument was not a provable literal.
    skipped: DashMap<String, boxcar::Vec<CallSite>>,
}

impl DecryptionSummary {
    /// Creates an empty summary.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a decrypted call site.
    pub fn record_success(&self, decryptor: &str, site: CallSite, value: String) {
        self.decrypted
            .entry(decryptor.to_string())
            .or_default()
            .push(DecryptedCall { site, value });
    }

    /// Records a failed call site.
    pub fn record_failure(&self, decryptor: &str, site: CallSite, reason: FailureReason) {
        self.failed
            .entry(decryptor.to_string())
            .or_default()
            .push(FailedCall { site, reason });
    }

    /// Records a call site whose argument was not a literal.
    pub fn record_skipped(&self, decryptor: &str, site: CallSite) {
        self.skipped.entry(decryptor.to_string()).or_default().push(site);
    }

    /// Number of decrypted call sites.
    #[must_use]
    pub fn decrypted_count(&self) -> usize {
        self.decrypted.iter().map(|entry| entry.value().count()).sum()
    }

    /// Number of failed call sites.
    #[must_use]
    pub fn failed_count(&self) -> usize {
        self.failed.iter().map(|entry| entry.value().count()).sum()
    }

    /// Number of skipped call sites.
    #[must_use]
    pub fn skipped_count(&self) -> usize {
        self.skipped.iter().map(|entry| entry.value().count()).sum()
    }

    /// Decrypted call sites of one decryptor.
    #[must_use]
    pub fn decrypted_for(&self, decryptor: &str) -> Vec<DecryptedCall> {
        self.decrypted
            .get(decryptor)
            .map(|calls| calls.iter().map(|(_, call)| call.clone()).collect())
            .unwrap_or_default()
    }

    /// Every failed call site, ordered by decryptor then call site.
    #[must_use]
    pub fn failures(&self) -> Vec<(String, FailedCall)> {
        let mut failures: Vec<(String, FailedCall)> = self
            .failed
            .iter()
            .flat_map(|entry| {
                let decryptor = entry.key().clone();
                entry
                    .value()
                    .iter()
                    .map(|(_, call)| (decryptor.clone(), call.clone()))
                    .collect::<Vec<_>>()
            })
            .collect();
        failures.sort_by(|(a, left), (b, right)| {
            a.cmp(b)
                .then_with(|| left.site.class_name.cmp(&right.site.class_name))
                .then_with(|| left.site.method_name.cmp(&right.site.method_name))
                .then_with(|| left.site.index.cmp(&right.site.index))
        });
        failures
    }

    /// Every decryptor that was called, sorted.
    #[must_use]
    pub fn decryptors(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .decrypted
            .iter()
            .map(|entry| entry.key().clone())
            .chain(self.failed.iter().map(|entry| entry.key().clone()))
            .chain(self.skipped.iter().map(|entry| entry.key().clone()))
            .collect();
        names.sort();
        names.dedup();
        names
    }

    /// Decryptors with at least one decrypted call site and no failed or skipped ones:
    /// nothing in the program calls them anymore.
    #[must_use]
    pub fn removable_decryptors(&self) -> Vec<String> {
        self.decryptors()
            .into_iter()
            .filter(|name| {
                self.decrypted.contains_key(name)
                    && !self.failed.contains_key(name)
                    && !self.skipped.contains_key(name)
            })
            .collect()
    }
}

impl fmt::Display for DecryptionSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} decrypted, {} failed, {} skipped across {} decryptors",
            self.decrypted_count(),
            self.failed_count(),
            self.skipped_count(),
            self.decryptors().len()
        )
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use rayon::prelude::*;

    use super::*;
    use crate::emulation::EmulationError;

    fn site(index: usize) -> CallSite {
        CallSite::new("a/Main", "run", "()V", index)
    }

    #[test]
    fn test_concurrent_recording() {
        let summary = Arc::new(DecryptionSummary::new());
        (0..64usize).into_par_iter().for_each(|index| {
            let decryptor = if index % 2 == 0 { "a/K.d" } else { "a/L.d" };
            summary.record_success(decryptor, site(index), index.to_string());
        });
        assert_eq!(summary.decrypted_count(), 64);
        assert_eq!(summary.decrypted_for("a/K.d").len(), 32);
        assert_eq!(summary.decryptors(), vec!["a/K.d".to_string(), "a/L.d".to_string()]);
        assert_eq!(summary.removable_decryptors().len(), 2);
    }

    #[test]
    fn test_removable_decryptors() {
        let summary = DecryptionSummary::new();
        summary.record_success("a/K.d", site(1), "x".into());
        summary.record_success("a/L.d", site(2), "y".into());
        summary.record_skipped("a/L.d", site(3));
        summary.record_failure("a/M.d", site(4), FailureReason::NonStringResult);

        assert_eq!(summary.removable_decryptors(), vec!["a/K.d".to_string()]);
        assert_eq!(summary.skipped_count(), 1);
        assert_eq!(summary.to_string(), "2 decrypted, 1 failed, 1 skipped across 3 decryptors");
    }

    #[test]
    fn test_failure_reason() {
        let error: crate::Error = EmulationError::DivisionByZero.into();
        let reason = FailureReason::emulation(&error);
        assert!(matches!(
            reason,
            FailureReason::EmulationFailed {
                kind: Some(FaultKind::Runtime),
                ..
            }
        ));
        assert!(reason.to_string().starts_with("emulation failed (runtime exception)"));

        let summary = DecryptionSummary::new();
        summary.record_failure("b/K.d", site(9), reason.clone());
        summary.record_failure("a/K.d", site(2), FailureReason::SharedLiteral);
        let failures = summary.failures();
        assert_eq!(failures[0].0, "a/K.d");
        assert_eq!(failures[1].1.reason, reason);
    }
}
