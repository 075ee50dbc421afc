//! Share-related domain events.

use serde::{Deserialize, Serialize};

use crate::types::id::{NodeId, ShareId, UserId};

/// Events related to share lifecycle operations.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ShareEvent {
    /// A share was created.
    Created {
        /// The share id within its provider.
        share_id: ShareId,
        /// The provider that persisted the share.
        provider_id: String,
        /// The share type (user, group, link, ...).
        share_type: String,
        /// The shared node.
        node_id: NodeId,
        /// The account that created the share.
        initiator: UserId,
    },
    /// A share was updated.
    Updated {
        /// The share id within its provider.
        share_id: ShareId,
        /// The shared node.
        node_id: NodeId,
        /// Whether the password changed in this update.
        password_changed: bool,
        /// Whether the expiration date changed in this update.
        expiration_changed: bool,
    },
    /// A share was deleted. Cascade deletions emit one event per removed
    /// share, children before parents.
    Deleted {
        /// The share id within its provider.
        share_id: ShareId,
        /// The share type (user, group, link, ...).
        share_type: String,
        /// The previously shared node.
        node_id: NodeId,
    },
    /// A recipient removed a share from their own view without affecting
    /// other recipients.
    DeletedFromSelf {
        /// The share id within its provider.
        share_id: ShareId,
        /// The recipient who left the share.
        recipient: UserId,
    },
    /// A recipient moved the share target within their own tree.
    Moved {
        /// The share id within its provider.
        share_id: ShareId,
        /// The acting recipient.
        recipient: UserId,
        /// The new target path.
        target: String,
    },
}
