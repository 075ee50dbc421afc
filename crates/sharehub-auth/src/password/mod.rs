//! Password hashing and policy validation.

pub mod hasher;
pub mod validator;

pub use hasher::Argon2Hasher;
pub use validator::StrengthValidator;
