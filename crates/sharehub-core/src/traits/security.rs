//! Hashing and secure-random contracts.

use crate::result::AppResult;

/// Outcome of verifying a password candidate against a stored hash.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PasswordVerification {
    /// The candidate does not match.
    Invalid,
    /// The candidate matches.
    Valid,
    /// The candidate matches, but the stored hash uses a legacy algorithm
    /// or outdated parameters and should be transparently rehashed.
    ValidNeedsRehash,
}

impl PasswordVerification {
    /// Whether the candidate matched, regardless of hash freshness.
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid | Self::ValidNeedsRehash)
    }
}

/// Hashes and verifies share passwords.
///
/// Hashing is synchronous, CPU-bound work; only the enclosing request's
/// deadline bounds it.
pub trait PasswordHasher: Send + Sync + 'static {
    /// Hash a plaintext password.
    fn hash(&self, plain: &str) -> AppResult<String>;

    /// Verify a plaintext candidate against a stored hash, signalling
    /// when a matching hash should be upgraded.
    fn verify(&self, plain: &str, hash: &str) -> AppResult<PasswordVerification>;
}

/// Generates cryptographically secure random strings for share tokens
/// and temporary passwords.
pub trait SecureRandom: Send + Sync + 'static {
    /// Generate a random string of `length` characters from a
    /// human-readable alphabet.
    fn generate(&self, length: usize) -> String;
}

/// A pluggable password-policy rule consulted before a share password is
/// accepted.
///
/// Implementations return a policy violation whose hint explains the
/// requirement to the end user.
pub trait PasswordPolicy: Send + Sync + 'static {
    /// Validate a candidate plaintext password.
    fn validate(&self, password: &str) -> AppResult<()>;
}
