// src/utils/token.rs

use rand::Rng;
use sha2::{Digest, Sha256};

/// Generate a confirmation token with 256 bits of entropy, hex-encoded.
/// Never derived from user data.
pub fn generate_token() -> String {
    let mut rng = rand::thread_rng();
    let bytes: [u8; 32] = rng.gen();
    hex::encode(bytes)
}

/// Hash a token for storage. Only the hash is persisted; the raw token is
/// handed to the user exactly once.
pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_length_and_uniqueness() {
        let a = generate_token();
        let b = generate_token();
        assert_eq!(a.len(), 64); // 32 bytes hex-encoded
        assert_eq!(b.len(), 64);
        assert_ne!(a, b);
    }

    #[test]
    fn test_hash_is_deterministic_and_distinct_from_input() {
        let token = generate_token();
        let h1 = hash_token(&token);
        let h2 = hash_token(&token);
        assert_eq!(h1, h2);
        assert_ne!(h1, token);
        assert_eq!(h1.len(), 64); // SHA-256 hex
    }
}
