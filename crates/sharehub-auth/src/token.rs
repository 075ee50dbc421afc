//! Share token generation.

use rand::Rng;

use sharehub_core::traits::security::SecureRandom;

/// Alphabet without easily confused characters (no 0/O, 1/l/I, u/v).
/// Share tokens end up in URLs that people read to each other.
const HUMAN_READABLE: &[u8] = b"abcdefgijkmnopqrstwxyzABCDEFGHJKLMNPQRSTWXYZ23456789";

/// Generates cryptographically secure random share tokens.
#[derive(Debug, Clone)]
pub struct RandomTokenGenerator;

impl RandomTokenGenerator {
    /// Creates a new token generator.
    pub fn new() -> Self {
        Self
    }
}

impl SecureRandom for RandomTokenGenerator {
    fn generate(&self, length: usize) -> String {
        let mut rng = rand::thread_rng();
        (0..length)
            .map(|_| {
                let idx = rng.gen_range(0..HUMAN_READABLE.len());
                HUMAN_READABLE[idx] as char
            })
            .collect()
    }
}

impl Default for RandomTokenGenerator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_length_and_alphabet() {
        let generator = RandomTokenGenerator::new();
        let token = generator.generate(15);
        assert_eq!(token.len(), 15);
        assert!(token.bytes().all(|b| HUMAN_READABLE.contains(&b)));
    }

    #[test]
    fn test_tokens_differ() {
        let generator = RandomTokenGenerator::new();
        assert_ne!(generator.generate(15), generator.generate(15));
    }
}
