//! Lifecycle guards and observers.
//!
//! The cancelable "before" notification of a mutation is a synchronous
//! validation phase: every registered [`ShareGuard`] returns an explicit
//! verdict, and the manager checks the verdicts before touching any
//! provider. Observation of completed mutations goes through the
//! separate, non-cancelable [`ShareObserver`] channel.

use async_trait::async_trait;

use sharehub_core::events::ShareEvent;
use sharehub_entity::share::Share;

/// Outcome of a guard consultation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardVerdict {
    /// Let the mutation proceed.
    Allow,
    /// Halt the mutation, with a reason shown to the caller.
    Deny {
        /// Why the mutation was rejected.
        reason: String,
    },
}

impl GuardVerdict {
    /// Construct a denial with the given reason.
    pub fn deny(reason: impl Into<String>) -> Self {
        Self::Deny {
            reason: reason.into(),
        }
    }
}

/// A veto point consulted before a share is created or deleted.
///
/// Both hooks default to allowing, so implementations override only the
/// phase they care about.
#[async_trait]
pub trait ShareGuard: Send + Sync + 'static {
    /// Consulted after validation, before the share reaches its
    /// provider.
    async fn before_create(&self, _share: &Share) -> GuardVerdict {
        GuardVerdict::Allow
    }

    /// Consulted before a share (not its cascade children) is deleted.
    async fn before_delete(&self, _share: &Share) -> GuardVerdict {
        GuardVerdict::Allow
    }
}

/// A non-cancelable observer of completed share mutations.
pub trait ShareObserver: Send + Sync + 'static {
    /// Called after the mutation was persisted.
    fn notify(&self, event: &ShareEvent);
}
