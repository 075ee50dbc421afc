//! The share provider capability contract.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use sharehub_core::result::AppResult;
use sharehub_core::types::id::{GroupId, NodeId, ShareId, UserId};
use sharehub_core::types::pagination::Paging;
use sharehub_entity::share::{Share, ShareType};

/// A recipient's effective entry point to a node, resolved through group
/// membership and per-recipient overrides.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessEntry {
    /// The node granting access.
    pub node_id: NodeId,
    /// The recipient's path to it.
    pub path: String,
}

/// Aggregated set of identities able to reach a node through shares.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AccessList {
    /// Recipients with access. Entries carry the resolved per-recipient
    /// path when current access was requested, `None` otherwise.
    pub users: BTreeMap<UserId, Option<AccessEntry>>,
    /// Whether any link share grants anonymous access.
    pub public: bool,
    /// Whether any federated grant exists.
    pub remote: bool,
}

impl AccessList {
    /// An empty access list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a recipient; when both sides carry a resolved path the one
    /// with fewer path components wins (the higher mount point).
    pub fn add_user(&mut self, user: UserId, entry: Option<AccessEntry>) {
        match self.users.entry(user) {
            std::collections::btree_map::Entry::Vacant(slot) => {
                slot.insert(entry);
            }
            std::collections::btree_map::Entry::Occupied(mut slot) => {
                if let (Some(existing), Some(incoming)) = (slot.get().as_ref(), entry.as_ref()) {
                    let depth = |e: &AccessEntry| e.path.matches('/').count();
                    if depth(incoming) < depth(existing) {
                        slot.insert(entry);
                    }
                } else if slot.get().is_none() && entry.is_some() {
                    slot.insert(entry);
                }
            }
        }
    }

    /// Union another provider's result into this one.
    pub fn merge(&mut self, other: AccessList) {
        for (user, entry) in other.users {
            self.add_user(user, entry);
        }
        self.public = self.public || other.public;
        self.remote = self.remote || other.remote;
    }
}

/// Capability contract implemented by every share storage backend.
///
/// A provider owns the persistence of one or more share types. The
/// manager resolves the responsible provider through the registry and
/// never touches storage directly. All errors are provider-level unless
/// a lookup legitimately finds nothing, which is `NotFound`.
#[async_trait]
pub trait ShareProvider: Send + Sync + 'static {
    /// Stable identifier of this provider; the first half of a full
    /// share id (`"{provider}:{id}"`).
    fn identifier(&self) -> &str;

    /// The share types this provider persists.
    fn supported_types(&self) -> &[ShareType];

    /// Whether this provider persists the given share type.
    fn supports_type(&self, share_type: ShareType) -> bool {
        self.supported_types().contains(&share_type)
    }

    /// Persist a validated share and assign its id. Fails with a
    /// provider error on a storage-constraint violation.
    async fn create(&self, share: Share) -> AppResult<Share>;

    /// Update a persisted share. Providers that deliver passwords out of
    /// band receive the new plaintext alongside the hashed share.
    async fn update(&self, share: Share, plaintext_password: Option<&str>) -> AppResult<Share>;

    /// Delete a persisted share. Deleting a group share also removes its
    /// per-recipient override rows.
    async fn delete(&self, share: &Share) -> AppResult<()>;

    /// Fetch a share by its provider-internal id. When `recipient` is
    /// given, group shares are resolved to that recipient's effective
    /// view (override wins over the inherited group values).
    async fn get_by_id(&self, id: ShareId, recipient: Option<&UserId>) -> AppResult<Share>;

    /// Shares a user created, ordered by id. With `include_reshares`,
    /// shares the user owns but did not initiate are included; combined
    /// with a node filter this widens to every share on the node.
    async fn get_shares_by(
        &self,
        user: &UserId,
        share_type: ShareType,
        node: Option<NodeId>,
        include_reshares: bool,
        paging: Paging,
    ) -> AppResult<Vec<Share>>;

    /// Shares a user receives, resolving transitive group membership and
    /// per-recipient overrides.
    async fn get_shared_with(
        &self,
        user: &UserId,
        share_type: ShareType,
        node: Option<NodeId>,
        paging: Paging,
    ) -> AppResult<Vec<Share>>;

    /// Canonical user and group shares on a node, for duplicate checks.
    async fn get_shares_by_path(&self, node: NodeId) -> AppResult<Vec<Share>>;

    /// Resolve a link-like share by its token.
    async fn get_by_token(&self, token: &str) -> AppResult<Share>;

    /// All direct children of a share across both parent relations:
    /// per-recipient overrides of a group share and re-shares chaining
    /// to it.
    async fn get_children(&self, share: &Share) -> AppResult<Vec<Share>>;

    /// Recipients reachable through shares on any of `nodes`. With
    /// `current_access`, each recipient's effective entry path is
    /// resolved through group membership and overrides instead of a
    /// static is-shared flag.
    async fn get_access_list(&self, nodes: &[NodeId], current_access: bool) -> AppResult<AccessList>;

    /// Move the share target within the acting recipient's tree. For
    /// group shares this upserts the recipient's override row.
    async fn move_share(&self, share: Share, recipient: &UserId) -> AppResult<Share>;

    /// Remove the share from one recipient's view. Group shares get a
    /// zero-permission override row; the canonical row is untouched.
    async fn delete_from_self(&self, share: &Share, recipient: &UserId) -> AppResult<()>;

    /// Undo a recipient's self-removal by restoring the override's
    /// permissions from the canonical group share.
    async fn restore(&self, share: &Share, recipient: &UserId) -> AppResult<Share>;

    /// An account was deleted; remove the shares of `share_type` that
    /// die with it. Link shares are removed on deletion of either the
    /// owner or the initiator; user and group shares only on deletion of
    /// the exact matching party.
    async fn user_deleted(&self, user: &UserId, share_type: ShareType) -> AppResult<()>;

    /// A group was deleted; remove its shares and their override rows.
    async fn group_deleted(&self, group: &GroupId) -> AppResult<()>;

    /// An account left a group; remove its override rows under that
    /// group's shares.
    async fn user_removed_from_group(&self, user: &UserId, group: &GroupId) -> AppResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_access_list_prefers_higher_mount() {
        let mut al = AccessList::new();
        al.add_user(
            UserId::new("u1"),
            Some(AccessEntry {
                node_id: NodeId(10),
                path: "/docs/reports/q3".to_string(),
            }),
        );
        al.add_user(
            UserId::new("u1"),
            Some(AccessEntry {
                node_id: NodeId(4),
                path: "/docs".to_string(),
            }),
        );

        let entry = al.users[&UserId::new("u1")].as_ref().expect("entry");
        assert_eq!(entry.node_id, NodeId(4));
    }

    #[test]
    fn test_merge_flags() {
        let mut a = AccessList::new();
        let mut b = AccessList::new();
        b.public = true;
        b.add_user(UserId::new("u2"), None);
        a.merge(b);
        assert!(a.public);
        assert!(!a.remote);
        assert!(a.users.contains_key(&UserId::new("u2")));
    }
}
