//! Collaborator contracts consumed by the share engine.
//!
//! The engine never talks to the account directory, the node storage
//! engine, or the hashing utilities directly — everything goes through
//! these traits so the orchestration logic is testable in isolation.

pub mod directory;
pub mod node;
pub mod security;

pub use directory::{GroupResolver, IdentityResolver};
pub use node::{FileNode, NodeKind, NodeResolver};
pub use security::{PasswordHasher, PasswordPolicy, PasswordVerification, SecureRandom};
