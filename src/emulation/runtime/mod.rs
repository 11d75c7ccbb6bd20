//! Behavior of everything the interpreter does not execute itself.
//!
//! [`provider`] resolves calls, reference comparisons and type checks; the `jdk` module
//! holds the native stubs standing in for the Java standard library.

pub(crate) mod jdk;
pub mod provider;
