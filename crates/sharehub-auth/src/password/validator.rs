//! Password policy enforcement for new share passwords.

use sharehub_core::error::AppError;
use sharehub_core::traits::security::PasswordPolicy;

/// Validates password strength before a share password is accepted.
#[derive(Debug, Clone)]
pub struct StrengthValidator {
    /// Minimum password length.
    min_length: usize,
}

impl StrengthValidator {
    /// Creates a new validator with the given minimum length.
    pub fn new(min_length: usize) -> Self {
        Self { min_length }
    }
}

impl PasswordPolicy for StrengthValidator {
    /// Validates a password against all configured policies.
    ///
    /// Returns `Ok(())` if the password meets all requirements, or a
    /// policy violation describing the first one it fails.
    fn validate(&self, password: &str) -> Result<(), AppError> {
        if password.chars().count() < self.min_length {
            return Err(AppError::policy(
                format!(
                    "share password shorter than the configured minimum of {}",
                    self.min_length
                ),
                format!(
                    "Password must be at least {} characters long",
                    self.min_length
                ),
            ));
        }

        let estimate = zxcvbn::zxcvbn(password, &[]);
        if estimate.score() < zxcvbn::Score::Three {
            return Err(AppError::policy(
                format!("share password entropy score {} below 3", estimate.score()),
                "Password is too weak. Please use a stronger password with more entropy.",
            ));
        }

        Ok(())
    }
}

impl Default for StrengthValidator {
    fn default() -> Self {
        Self::new(8)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sharehub_core::error::ErrorKind;

    #[test]
    fn test_short_password_rejected() {
        let validator = StrengthValidator::new(8);
        let err = validator.validate("abc12").expect_err("should reject");
        assert_eq!(err.kind, ErrorKind::Policy);
        assert!(err.user_message().contains("at least 8 characters"));
    }

    #[test]
    fn test_weak_password_rejected() {
        let validator = StrengthValidator::new(8);
        assert!(validator.validate("password").is_err());
    }

    #[test]
    fn test_strong_password_accepted() {
        let validator = StrengthValidator::new(8);
        assert!(validator.validate("mv!K3rn7-plover-Qz").is_ok());
    }
}
