//! # sharehub-service
//!
//! The share orchestration layer: the manager that validates, persists,
//! cascades, promotes, and aggregates shares through the provider
//! registry and the external collaborator contracts.
//!
//! The manager follows constructor injection — all dependencies are
//! provided at construction time via `Arc` references.

pub mod share;

pub use share::{GuardVerdict, ShareGuard, ShareManager, ShareObserver};
