//! # sharehub-provider
//!
//! The share provider contract: the capability trait every storage
//! backend implements, the typed registry that routes share types to
//! providers, the aggregated access-list type, and an in-memory provider
//! for tests and single-process deployments.

pub mod memory;
pub mod provider;
pub mod registry;

pub use memory::MemoryShareProvider;
pub use provider::{AccessEntry, AccessList, ShareProvider};
pub use registry::ProviderRegistry;
