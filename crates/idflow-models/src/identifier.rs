//! Profile identifiers and the identity key derived from them.

use sha2::{Digest, Sha256};

/// A `(provider key, provider value)` pair referencing one account on one
/// external identity system.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProfileIdentifier {
    /// Key of the identity provider responsible for this identifier
    pub provider_key: String,
    /// Provider-specific account reference
    pub provider_value: String,
}

impl ProfileIdentifier {
    pub fn new(provider_key: impl Into<String>, provider_value: impl Into<String>) -> Self {
        Self {
            provider_key: provider_key.into(),
            provider_value: provider_value.into(),
        }
    }
}

impl<K: Into<String>, V: Into<String>> From<(K, V)> for ProfileIdentifier {
    fn from((key, value): (K, V)) -> Self {
        Self::new(key, value)
    }
}

impl std::fmt::Display for ProfileIdentifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.provider_key, self.provider_value)
    }
}

/// Deterministic 64-bit hash of an identifier.
///
/// The first eight bytes (little endian) of SHA-256 over the length-prefixed key
/// followed by the value. The length prefix keeps `("ab", "c")` and `("a", "bc")`
/// apart. Stable across processes, builds and platforms, so keys written by one
/// run are reproduced by the next.
pub fn stable_hash(identifier: &ProfileIdentifier) -> u64 {
    let mut hasher = Sha256::new();
    hasher.update((identifier.provider_key.len() as u64).to_le_bytes());
    hasher.update(identifier.provider_key.as_bytes());
    hasher.update(identifier.provider_value.as_bytes());
    let digest = hasher.finalize();

    let mut prefix = [0u8; 8];
    prefix.copy_from_slice(&digest[..8]);
    u64::from_le_bytes(prefix)
}

/// Order-independent 32-bit identity key of an identifier set.
///
/// `XOR over i of 3 * stable_hash(i)`, truncated to 32 bits. An empty set maps to 0.
pub fn identity_key<'a, I>(identifiers: I) -> u32
where
    I: IntoIterator<Item = &'a ProfileIdentifier>,
{
    let folded = identifiers
        .into_iter()
        .fold(0u64, |acc, identifier| {
            acc ^ stable_hash(identifier).wrapping_mul(3)
        });

    (folded & u64::from(u32::MAX)) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(pairs: &[(&str, &str)]) -> Vec<ProfileIdentifier> {
        pairs.iter().map(|&(k, v)| ProfileIdentifier::new(k, v)).collect()
    }

    #[test]
    fn test_identity_key_is_order_independent() {
        let forward = ids(&[("steam", "1100001"), ("ros", "alice"), ("discord", "42")]);
        let mut reversed = forward.clone();
        reversed.reverse();

        assert_eq!(identity_key(&forward), identity_key(&reversed));
    }

    #[test]
    fn test_identity_key_empty_set_is_zero() {
        assert_eq!(identity_key(&Vec::<ProfileIdentifier>::new()), 0);
    }

    #[test]
    fn test_identity_key_single_identifier() {
        let single = ids(&[("steam", "1100001")]);
        let expected = (stable_hash(&single[0]).wrapping_mul(3) & 0xFFFF_FFFF) as u32;
        assert_eq!(identity_key(&single), expected);
    }

    #[test]
    fn test_stable_hash_is_deterministic() {
        let a = ProfileIdentifier::new("ros", "alice");
        let b = ProfileIdentifier::new("ros", "alice");
        assert_eq!(stable_hash(&a), stable_hash(&b));
    }

    #[test]
    fn test_stable_hash_separates_key_and_value() {
        let a = ProfileIdentifier::new("ab", "c");
        let b = ProfileIdentifier::new("a", "bc");
        assert_ne!(stable_hash(&a), stable_hash(&b));
    }

    #[test]
    fn test_identifier_equality_is_pairwise() {
        assert_eq!(
            ProfileIdentifier::new("steam", "1"),
            ProfileIdentifier::from(("steam", "1"))
        );
        assert_ne!(
            ProfileIdentifier::new("steam", "1"),
            ProfileIdentifier::new("steam", "2")
        );
        assert_ne!(
            ProfileIdentifier::new("steam", "1"),
            ProfileIdentifier::new("ros", "1")
        );
    }

    #[test]
    fn test_identifier_display() {
        assert_eq!(ProfileIdentifier::new("ros", "alice").to_string(), "ros:alice");
    }
}
