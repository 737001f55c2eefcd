//! Salted secret hashing for `User::hashed_secret`, backing registration
//! and login (spec.md §6 `/users/register`, `/users/login`).
//!
//! This is not a production password KDF (no bcrypt/argon2 in the teacher's
//! dependency stack) — it mirrors the teacher's own stance in
//! `calimero-auth::utils::generate_random_challenge`, which reaches for
//! `sha2`/`rand` rather than a dedicated password-hashing crate.

use rand::RngCore;
use sha2::{Digest, Sha256};

const SALT_BYTES: usize = 16;

/// Hash `secret` with a fresh random salt, returning `"<salt-hex>:<hash-hex>"`.
pub fn hash_secret(secret: &str) -> String {
    let mut salt = [0u8; SALT_BYTES];
    rand::thread_rng().fill_bytes(&mut salt);
    let salt_hex = hex::encode(salt);
    let digest = digest_with_salt(&salt_hex, secret);
    format!("{salt_hex}:{digest}")
}

/// Verify `secret` against a value produced by [`hash_secret`].
pub fn verify_secret(secret: &str, stored: &str) -> bool {
    let Some((salt_hex, expected)) = stored.split_once(':') else {
        return false;
    };
    digest_with_salt(salt_hex, secret) == expected
}

fn digest_with_salt(salt_hex: &str, secret: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt_hex.as_bytes());
    hasher.update(b":");
    hasher.update(secret.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verifies_the_same_secret() {
        let stored = hash_secret("correct horse battery staple");
        assert!(verify_secret("correct horse battery staple", &stored));
    }

    #[test]
    fn rejects_a_different_secret() {
        let stored = hash_secret("correct horse battery staple");
        assert!(!verify_secret("wrong", &stored));
    }

    #[test]
    fn two_hashes_of_the_same_secret_differ_by_salt() {
        assert_ne!(hash_secret("same"), hash_secret("same"));
    }
}
