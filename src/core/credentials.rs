//! Salted password digests
//!
//! Passwords are stored as hex-encoded SHA-256 digests of `salt || password`,
//! with a fresh random 16-byte salt per account. The plaintext never leaves
//! this module's callers.

use rand::RngCore;
use sha2::{Digest, Sha256};

/// Generate a fresh random salt, hex-encoded.
pub fn generate_salt() -> String {
    let mut bytes = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Digest a password with the given hex salt.
pub fn hash_password(salt: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(password.as_bytes());
    hex::encode(hasher.finalize())
}

/// Check a plaintext password against a stored salt + digest pair.
pub fn verify_password(salt: &str, digest: &str, password: &str) -> bool {
    hash_password(salt, password) == digest
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roundtrip() {
        let salt = generate_salt();
        let digest = hash_password(&salt, "hunter2");

        assert!(verify_password(&salt, &digest, "hunter2"));
        assert!(!verify_password(&salt, &digest, "hunter3"));
    }

    #[test]
    fn test_salts_differ() {
        assert_ne!(generate_salt(), generate_salt());
    }

    #[test]
    fn test_same_password_different_salt_different_digest() {
        let a = hash_password(&generate_salt(), "hunter2");
        let b = hash_password(&generate_salt(), "hunter2");
        assert_ne!(a, b);
    }

    #[test]
    fn test_digest_is_hex_sha256() {
        let digest = hash_password("00", "x");
        assert_eq!(digest.len(), 64);
        assert!(digest.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
