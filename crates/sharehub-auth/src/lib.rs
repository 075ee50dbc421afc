//! # sharehub-auth
//!
//! Security utilities for ShareHub: Argon2id password hashing with a
//! legacy-rehash signal, password strength validation, and share-token
//! generation.

pub mod password;
pub mod token;

pub use password::{Argon2Hasher, StrengthValidator};
pub use token::RandomTokenGenerator;
