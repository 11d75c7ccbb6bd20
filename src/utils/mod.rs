//! Helpers shared by the native stubs: deflate, zip walking and Java hashing.

pub mod decompress;
pub mod hash;
mod zip;

pub use hash::{java_hash_code, java_hash_str};
pub use zip::ZipReader;
