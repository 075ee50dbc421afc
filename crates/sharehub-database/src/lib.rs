//! # sharehub-database
//!
//! The primary storage-backed share provider: PostgreSQL persistence for
//! user, group, and link shares in a single flat relation, plus pool
//! management and the migration runner.

pub mod connection;
pub mod migration;
pub mod provider;

pub use connection::DatabasePool;
pub use provider::DbShareProvider;
