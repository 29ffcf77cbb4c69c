//! Identifier generation.
//!
//! [`IdService`] hands out three kinds of values:
//!
//! - random 128-bit identifiers for records that need no stability,
//! - deterministic identifiers derived from a node's qualified name,
//! - 40-character version tokens for nodes without an explicit stamp.
//!
//! The service owns its random generator; create one per run and pass it
//! to whatever needs identifiers.

use rand::{Rng, RngCore, SeedableRng};
use rand_chacha::ChaCha20Rng;
use sha2::{Digest, Sha256};
use uuid::{Builder, Uuid};

/// A 128-bit identifier rendered as 8-4-4-4-12 lowercase hex groups.
pub type Identifier = Uuid;

/// Length of a generated version token.
pub const VERSION_TOKEN_LEN: usize = 40;

const VERSION_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz1234567890";

/// Source of random and deterministic identifiers.
///
/// Both streams are ChaCha20, so seeded output and name-derived
/// identifiers do not change across `rand` releases.
pub struct IdService {
    rng: ChaCha20Rng,
}

impl Default for IdService {
    fn default() -> Self {
        Self::new()
    }
}

impl IdService {
    /// Creates a service seeded from operating system entropy.
    pub fn new() -> Self {
        Self {
            rng: ChaCha20Rng::from_entropy(),
        }
    }

    /// Creates a service with a fixed seed, so random output is reproducible.
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: ChaCha20Rng::seed_from_u64(seed),
        }
    }

    /// Returns a fresh identifier unrelated to any content.
    pub fn random_identifier(&mut self) -> Identifier {
        let mut bytes = [0u8; 16];
        self.rng.fill(&mut bytes);
        Builder::from_random_bytes(bytes).into_uuid()
    }

    /// Derives the identifier for `key`.
    ///
    /// The SHA-256 digest of the key is the key of a ChaCha20 stream, from
    /// which the 16 identifier bytes are drawn. Equal keys give equal identifiers
    /// in every process; the shared generator is left untouched.
    pub fn identifier_for(&self, key: &str) -> Identifier {
        let digest = Sha256::digest(key.as_bytes());
        let mut seed = [0u8; 32];
        seed.copy_from_slice(&digest);

        let mut stream = ChaCha20Rng::from_seed(seed);
        let mut bytes = [0u8; 16];
        stream.fill_bytes(&mut bytes);
        Builder::from_random_bytes(bytes).into_uuid()
    }

    /// Returns a random version token of [`VERSION_TOKEN_LEN`] characters
    /// drawn from lowercase letters and digits.
    pub fn fresh_version_token(&mut self) -> String {
        (0..VERSION_TOKEN_LEN)
            .map(|_| VERSION_ALPHABET[self.rng.gen_range(0..VERSION_ALPHABET.len())] as char)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn test_identifier_for_is_stable() {
        let a = IdService::with_seed(1);
        let b = IdService::new();
        let key = "Catalog.Goods.Attribute.Title";
        assert_eq!(a.identifier_for(key), a.identifier_for(key));
        assert_eq!(a.identifier_for(key), b.identifier_for(key));
        assert_ne!(a.identifier_for(key), a.identifier_for("Catalog.Goods"));
    }

    #[test]
    fn test_identifier_for_known_values() {
        let ids = IdService::new();
        assert_eq!(
            ids.identifier_for("Catalog.Goods").to_string(),
            "69eed1a6-d396-4763-918a-2eac0e6119e9"
        );
        assert_eq!(
            ids.identifier_for("Configuration.Demo").to_string(),
            "4cb7a1ee-9c1f-4e65-9a2e-1cf32ca7911f"
        );
    }

    #[test]
    fn test_identifier_for_does_not_collide() {
        let ids = IdService::with_seed(7);
        let mut seen = HashSet::new();
        for i in 0..10_000 {
            let key = format!("Catalog.Item{i}.Attribute.Field{}", i % 97);
            assert!(seen.insert(ids.identifier_for(&key)), "collision for {key}");
        }
    }

    #[test]
    fn test_identifier_text_layout() {
        let ids = IdService::with_seed(3);
        let text = ids.identifier_for("Configuration.Demo").to_string();
        let groups: Vec<usize> = text.split('-').map(str::len).collect();
        assert_eq!(groups, vec![8, 4, 4, 4, 12]);
        assert!(text.chars().all(|c| c == '-' || c.is_ascii_hexdigit()));
        assert_eq!(text, text.to_lowercase());
    }

    #[test]
    fn test_random_identifiers_differ() {
        let mut ids = IdService::new();
        assert_ne!(ids.random_identifier(), ids.random_identifier());
    }

    #[test]
    fn test_seeded_service_is_reproducible() {
        let mut a = IdService::with_seed(42);
        let mut b = IdService::with_seed(42);
        assert_eq!(a.random_identifier(), b.random_identifier());
        assert_eq!(a.fresh_version_token(), b.fresh_version_token());
    }

    #[test]
    fn test_version_token_shape() {
        let mut ids = IdService::new();
        let token = ids.fresh_version_token();
        assert_eq!(token.len(), VERSION_TOKEN_LEN);
        assert!(
            token
                .bytes()
                .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit())
        );
    }
}
