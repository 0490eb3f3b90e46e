//! Refresh-secret generation and hashing.
//!
//! Refresh secrets are 32 random bytes, hex-encoded. Only the SHA-256 of a
//! secret is persisted; the plaintext travels to the client exactly once
//! inside the `<session_id>.<secret>` wire form.

use rand::RngCore;
use sha2::{Digest, Sha256};

/// Secret length in bytes (64 hex chars on the wire).
const SECRET_LEN: usize = 32;

/// Generate a fresh random refresh secret (hex-encoded).
pub fn generate_secret() -> String {
    let mut bytes = [0u8; SECRET_LEN];
    rand::rngs::OsRng.fill_bytes(&mut bytes);
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

/// Hash a refresh secret for at-rest storage and comparison.
pub fn hash_secret(secret: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(secret.as_bytes());
    let result = hasher.finalize();
    result.iter().map(|b| format!("{b:02x}")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_secret_shape() {
        let secret = generate_secret();
        assert_eq!(secret.len(), 64);
        assert!(secret.bytes().all(|b| b.is_ascii_hexdigit()));
    }

    #[test]
    fn test_secrets_are_unique() {
        assert_ne!(generate_secret(), generate_secret());
    }

    #[test]
    fn test_hash_secret_deterministic() {
        let secret = generate_secret();
        assert_eq!(hash_secret(&secret), hash_secret(&secret));
        assert_ne!(hash_secret(&secret), hash_secret("other"));
        assert_eq!(hash_secret(&secret).len(), 64);
    }
}
