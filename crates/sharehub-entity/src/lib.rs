//! # sharehub-entity
//!
//! Domain entity models for ShareHub: the share record, its type enum,
//! and the scoped attribute extension model.

pub mod share;

pub use share::{Share, ShareAttribute, ShareAttributes, ShareType};
