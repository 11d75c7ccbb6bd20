//! Built-in deobfuscation passes.
//!
//! | Pass | Description |
//! |------|-------------|
//! | [`DecryptionPass`] | Replaces decryptor calls on string literals by their plaintext |

mod decryption;

pub use decryption::DecryptionPass;
