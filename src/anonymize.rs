//! Pseudonymization of sender names and group names.
//!
//! The pipeline only relies on the [`Anonymizer`] contract: a
//! deterministic mapping from plaintext to a stable pseudonymous id,
//! practically collision-free under one key/scope and non-invertible
//! without the key. The `scope` parameter namespaces ids, so the same
//! person gets a different pseudonym in each conversation.
//!
//! [`KeyedAnonymizer`] is the shipped implementation: HMAC-SHA256 keyed
//! by `key ‖ scope`, hex-encoded.

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Deterministic pseudonymization contract.
pub trait Anonymizer {
    /// Maps `plaintext` to a stable pseudonymous id, namespaced by
    /// `scope` when one is given.
    fn anonymize(&self, plaintext: &str, scope: Option<&str>) -> String;
}

/// HMAC-SHA256 anonymizer holding the caller's secret key.
///
/// # Example
///
/// ```
/// use chatstitch::anonymize::{Anonymizer, KeyedAnonymizer};
///
/// let anon = KeyedAnonymizer::new("SECRET");
/// let a = anon.anonymize("The person", Some("group-id"));
/// let b = anon.anonymize("The person", Some("group-id"));
/// assert_eq!(a, b);
/// assert_ne!(a, anon.anonymize("The person", Some("other-group")));
/// ```
#[derive(Debug, Clone)]
pub struct KeyedAnonymizer {
    key: String,
}

impl KeyedAnonymizer {
    /// Creates an anonymizer from a secret key, ideally a long random
    /// string.
    pub fn new(key: impl Into<String>) -> Self {
        Self { key: key.into() }
    }
}

impl Anonymizer for KeyedAnonymizer {
    fn anonymize(&self, plaintext: &str, scope: Option<&str>) -> String {
        let salt = format!("{}{}", self.key, scope.unwrap_or(""));
        let mut mac =
            HmacSha256::new_from_slice(salt.as_bytes()).expect("HMAC can take key of any size");
        mac.update(plaintext.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }
}
