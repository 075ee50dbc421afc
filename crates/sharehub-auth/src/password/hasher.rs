//! Argon2id password hashing and verification.

use argon2::{
    Argon2,
    password_hash::{
        PasswordHash, PasswordHasher as ArgonHasher, PasswordVerifier, SaltString, rand_core::OsRng,
    },
};
use sha2::{Digest, Sha256};

use sharehub_core::error::AppError;
use sharehub_core::traits::security::{PasswordHasher, PasswordVerification};

/// Handles password hashing and verification using Argon2id.
///
/// Stored hashes from earlier deployments may be hex-encoded SHA-256 or
/// PHC strings of other algorithms; a matching candidate against such a
/// hash verifies but signals that the hash should be rewritten.
#[derive(Debug, Clone)]
pub struct Argon2Hasher;

impl Argon2Hasher {
    /// Creates a new password hasher instance.
    pub fn new() -> Self {
        Self
    }

    fn verify_legacy_sha256(&self, password: &str, hash: &str) -> PasswordVerification {
        let digest = Sha256::digest(password.as_bytes());
        let hex = digest.iter().map(|b| format!("{b:02x}")).collect::<String>();
        if hex == hash.to_lowercase() {
            PasswordVerification::ValidNeedsRehash
        } else {
            PasswordVerification::Invalid
        }
    }
}

impl PasswordHasher for Argon2Hasher {
    /// Hashes a plaintext password using Argon2id with a random salt.
    fn hash(&self, plain: &str) -> Result<String, AppError> {
        let salt = SaltString::generate(&mut OsRng);
        let argon2 = Argon2::default();

        let hash = argon2
            .hash_password(plain.as_bytes(), &salt)
            .map_err(|e| AppError::internal(format!("Password hashing failed: {e}")))?;

        Ok(hash.to_string())
    }

    /// Verifies a plaintext password against a stored hash.
    ///
    /// A match against anything other than a current Argon2id hash is
    /// reported as `ValidNeedsRehash` so the caller can transparently
    /// upgrade the stored value.
    fn verify(&self, plain: &str, hash: &str) -> Result<PasswordVerification, AppError> {
        let Ok(parsed_hash) = PasswordHash::new(hash) else {
            // Not a PHC string; the only legacy format ever written was
            // hex-encoded SHA-256.
            return Ok(self.verify_legacy_sha256(plain, hash));
        };

        let argon2 = Argon2::default();
        match argon2.verify_password(plain.as_bytes(), &parsed_hash) {
            Ok(()) => {
                if parsed_hash.algorithm.as_str() == "argon2id" {
                    Ok(PasswordVerification::Valid)
                } else {
                    Ok(PasswordVerification::ValidNeedsRehash)
                }
            }
            Err(argon2::password_hash::Error::Password) => Ok(PasswordVerification::Invalid),
            Err(e) => Err(AppError::internal(format!(
                "Password verification failed: {e}"
            ))),
        }
    }
}

impl Default for Argon2Hasher {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify() {
        let hasher = Argon2Hasher::new();
        let hash = hasher.hash("correct horse").expect("hash");
        assert!(hash.starts_with("$argon2id$"));

        assert_eq!(
            hasher.verify("correct horse", &hash).expect("verify"),
            PasswordVerification::Valid
        );
        assert_eq!(
            hasher.verify("battery staple", &hash).expect("verify"),
            PasswordVerification::Invalid
        );
    }

    #[test]
    fn test_legacy_sha256_signals_rehash() {
        let hasher = Argon2Hasher::new();
        // SHA-256 of "secret"
        let legacy = "2bb80d537b1da3e38bd30361aa855686bde0eacd7162fef6a25fe97bf527a25b";

        assert_eq!(
            hasher.verify("secret", legacy).expect("verify"),
            PasswordVerification::ValidNeedsRehash
        );
        assert_eq!(
            hasher.verify("wrong", legacy).expect("verify"),
            PasswordVerification::Invalid
        );
    }
}
