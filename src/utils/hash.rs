//! Java-compatible hash functions.

/// `java.lang.String.hashCode()` over UTF-16 code units: `s[0]*31^(n-1) + ... + s[n-1]`
/// with 32-bit wrapping arithmetic.
#[must_use]
pub fn java_hash_code(units: &[u16]) -> i32 {
    units
        .iter()
        .fold(0i32, |hash, unit| hash.wrapping_mul(31).wrapping_add(i32::from(*unit)))
}

/// [`java_hash_code`] of Rust text.
#[must_use]
pub fn java_hash_str(value: &str) -> i32 {
    let units: Vec<u16> = value.encode_utf16().collect();
    java_hash_code(&units)
}
