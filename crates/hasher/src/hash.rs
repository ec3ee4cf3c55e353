//! String digests shared by every other hashing step.

use sha2::{Digest, Sha256};

/// SHA-256 of `input` as 64 lowercase hex characters.
#[must_use]
pub fn hash_string(input: &str) -> String {
    hex::encode(Sha256::digest(input.as_bytes()))
}

/// SHA-256 over the concatenation of `inputs` in the given order.
///
/// Order matters; callers that need order independence sort first.
///
/// # Example
///
/// ```
/// use pkgkey_hasher::{hash_string, hash_strings};
///
/// assert_eq!(hash_strings(["ab", "c"]), hash_string("abc"));
/// assert_ne!(hash_strings(["a", "b"]), hash_strings(["b", "a"]));
/// ```
#[must_use]
pub fn hash_strings<I, S>(inputs: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut hasher = Sha256::new();
    for input in inputs {
        hasher.update(input.as_ref().as_bytes());
    }
    hex::encode(hasher.finalize())
}
