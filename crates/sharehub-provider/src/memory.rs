//! In-memory share provider for tests and single-process deployments.
//!
//! Behaviorally equivalent to the PostgreSQL provider: same supported
//! types, same group-override resolution, same deletion rules. State
//! lives in a tokio-mutexed map, so it is suitable for a single process
//! only.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;
use tracing::{info, warn};

use sharehub_core::error::AppError;
use sharehub_core::result::AppResult;
use sharehub_core::traits::directory::GroupResolver;
use sharehub_core::types::id::{GroupId, NodeId, ShareId, UserId};
use sharehub_core::types::pagination::Paging;
use sharehub_core::types::permissions::SharePermissions;
use sharehub_entity::share::{Share, ShareType};

use crate::provider::{AccessEntry, AccessList, ShareProvider};

const PROVIDER_ID: &str = "memory";

const SUPPORTED: &[ShareType] = &[ShareType::User, ShareType::Group, ShareType::Link];

/// Internal state of the in-memory provider.
#[derive(Debug, Default)]
struct InnerState {
    /// Row id -> share, including per-recipient override rows.
    rows: BTreeMap<i64, Share>,
    /// Next row id to assign.
    next_id: i64,
}

impl InnerState {
    fn insert(&mut self, mut share: Share) -> Share {
        self.next_id += 1;
        share.id = Some(ShareId(self.next_id));
        share.provider_id = Some(PROVIDER_ID.to_string());
        if share.created_at.is_none() {
            share.created_at = Some(Utc::now());
        }
        self.rows.insert(self.next_id, share.clone());
        share
    }

    fn override_row_id(&self, parent: ShareId, recipient: &UserId) -> Option<i64> {
        self.rows
            .values()
            .find(|row| {
                row.share_type == ShareType::GroupOverride
                    && row.override_of == Some(parent)
                    && row.shared_with.as_deref() == Some(recipient.as_str())
            })
            .and_then(|row| row.id.map(|id| id.0))
    }
}

/// In-memory share provider guarded by a tokio mutex.
#[derive(Clone)]
pub struct MemoryShareProvider {
    state: Arc<Mutex<InnerState>>,
    groups: Arc<dyn GroupResolver>,
}

impl MemoryShareProvider {
    /// Creates an empty in-memory provider. Group membership is needed
    /// to resolve group shares to their recipients.
    pub fn new(groups: Arc<dyn GroupResolver>) -> Self {
        Self {
            state: Arc::new(Mutex::new(InnerState::default())),
            groups,
        }
    }

    /// Builds a per-recipient override row for a group share.
    fn override_draft(parent: &Share, recipient: &UserId) -> Share {
        Share {
            id: None,
            provider_id: None,
            share_type: ShareType::GroupOverride,
            shared_with: Some(recipient.as_str().to_string()),
            shared_by: parent.shared_by.clone(),
            share_owner: parent.share_owner.clone(),
            node_id: parent.node_id,
            node_kind: parent.node_kind,
            permissions: parent.permissions,
            password: None,
            send_password_by_chat: false,
            token: None,
            expiration: parent.expiration,
            label: None,
            target: parent.target.clone(),
            override_of: parent.id,
            reshare_of: None,
            attributes: parent.attributes.clone(),
            created_at: parent.created_at,
        }
    }

    /// Applies a recipient's override values onto the canonical group
    /// share, if an override row exists.
    fn resolve_group_override(state: &InnerState, mut share: Share, recipient: &UserId) -> Share {
        let Some(id) = share.id else {
            return share;
        };
        if let Some(row_id) = state.override_row_id(id, recipient) {
            if let Some(row) = state.rows.get(&row_id) {
                share.permissions = row.permissions;
                share.target = row.target.clone();
                share.shared_by = row.shared_by.clone();
            }
        }
        share
    }

    fn persisted_id(share: &Share) -> AppResult<i64> {
        share
            .id
            .map(|id| id.0)
            .ok_or_else(|| AppError::provider("Share has not been persisted by this provider"))
    }
}

#[async_trait]
impl ShareProvider for MemoryShareProvider {
    fn identifier(&self) -> &str {
        PROVIDER_ID
    }

    fn supported_types(&self) -> &[ShareType] {
        SUPPORTED
    }

    async fn create(&self, share: Share) -> AppResult<Share> {
        if !self.supports_type(share.share_type) {
            return Err(AppError::provider(format!(
                "Share type '{}' is not handled by this provider",
                share.share_type.as_str()
            )));
        }

        let mut state = self.state.lock().await;
        let share = state.insert(share);
        info!(
            share_id = %share.id.map(|i| i.0).unwrap_or_default(),
            share_type = share.share_type.as_str(),
            node_id = %share.node_id,
            "Share persisted"
        );
        Ok(share)
    }

    async fn update(&self, share: Share, _plaintext_password: Option<&str>) -> AppResult<Share> {
        let id = Self::persisted_id(&share)?;
        let mut state = self.state.lock().await;

        let Some(existing) = state.rows.get_mut(&id) else {
            return Err(AppError::not_found(format!("Share {id} not found")));
        };

        existing.share_owner = share.share_owner.clone();
        existing.shared_by = share.shared_by.clone();
        existing.permissions = share.permissions;
        existing.attributes = share.attributes.clone();
        existing.node_id = share.node_id;
        existing.expiration = share.expiration;
        match share.share_type {
            ShareType::User => {
                existing.shared_with = share.shared_with.clone();
            }
            ShareType::Link => {
                existing.password = share.password.clone();
                existing.send_password_by_chat = share.send_password_by_chat;
                existing.token = share.token.clone();
                existing.label = share.label.clone();
            }
            _ => {}
        }
        let updated = existing.clone();

        // Group updates propagate onto the override rows; permissions
        // only onto overrides that are not hidden markers.
        if share.share_type == ShareType::Group {
            let parent = ShareId(id);
            for row in state.rows.values_mut() {
                if row.override_of == Some(parent) {
                    row.share_owner = share.share_owner.clone();
                    row.shared_by = share.shared_by.clone();
                    row.node_id = share.node_id;
                    row.expiration = share.expiration;
                    if !row.permissions.is_empty() {
                        row.permissions = share.permissions;
                        row.attributes = share.attributes.clone();
                    }
                }
            }
        }

        Ok(updated)
    }

    async fn delete(&self, share: &Share) -> AppResult<()> {
        let id = Self::persisted_id(share)?;
        let mut state = self.state.lock().await;

        state.rows.remove(&id);
        if share.share_type == ShareType::Group {
            let parent = ShareId(id);
            state.rows.retain(|_, row| row.override_of != Some(parent));
        }
        info!(share_id = %id, share_type = share.share_type.as_str(), "Share deleted");
        Ok(())
    }

    async fn get_by_id(&self, id: ShareId, recipient: Option<&UserId>) -> AppResult<Share> {
        let state = self.state.lock().await;
        let share = state
            .rows
            .get(&id.0)
            .filter(|row| SUPPORTED.contains(&row.share_type))
            .cloned()
            .ok_or_else(|| AppError::not_found(format!("Share {id} not found")))?;

        match (recipient, share.share_type) {
            (Some(user), ShareType::Group) => {
                Ok(Self::resolve_group_override(&state, share, user))
            }
            _ => Ok(share),
        }
    }

    async fn get_shares_by(
        &self,
        user: &UserId,
        share_type: ShareType,
        node: Option<NodeId>,
        include_reshares: bool,
        paging: Paging,
    ) -> AppResult<Vec<Share>> {
        let state = self.state.lock().await;
        let matches: Vec<Share> = state
            .rows
            .values()
            .filter(|row| row.share_type == share_type)
            .filter(|row| {
                if !include_reshares {
                    row.shared_by == *user
                } else if node.is_none() {
                    row.share_owner == *user || row.shared_by == *user
                } else {
                    // With a node filter, "including reshares" widens to
                    // every share on the node.
                    true
                }
            })
            .filter(|row| node.is_none_or(|n| row.node_id == n))
            .cloned()
            .collect();

        Ok(paging.slice(matches))
    }

    async fn get_shared_with(
        &self,
        user: &UserId,
        share_type: ShareType,
        node: Option<NodeId>,
        paging: Paging,
    ) -> AppResult<Vec<Share>> {
        match share_type {
            ShareType::User => {
                let state = self.state.lock().await;
                let matches: Vec<Share> = state
                    .rows
                    .values()
                    .filter(|row| {
                        row.share_type == ShareType::User
                            && row.shared_with.as_deref() == Some(user.as_str())
                    })
                    .filter(|row| node.is_none_or(|n| row.node_id == n))
                    .cloned()
                    .collect();
                Ok(paging.slice(matches))
            }
            ShareType::Group => {
                // Enumerate every group of the recipient; pagination is
                // applied to the final result set only.
                let groups = self.groups.groups_of(user).await?;
                let state = self.state.lock().await;
                let matches: Vec<Share> = state
                    .rows
                    .values()
                    .filter(|row| row.share_type == ShareType::Group)
                    .filter(|row| {
                        row.shared_with
                            .as_deref()
                            .is_some_and(|g| groups.iter().any(|gid| gid.as_str() == g))
                    })
                    .filter(|row| node.is_none_or(|n| row.node_id == n))
                    .cloned()
                    .collect();

                Ok(paging
                    .slice(matches)
                    .into_iter()
                    .map(|share| Self::resolve_group_override(&state, share, user))
                    .collect())
            }
            _ => Err(AppError::provider(format!(
                "Share type '{}' has no recipient lookup in this provider",
                share_type.as_str()
            ))),
        }
    }

    async fn get_shares_by_path(&self, node: NodeId) -> AppResult<Vec<Share>> {
        let state = self.state.lock().await;
        Ok(state
            .rows
            .values()
            .filter(|row| {
                row.node_id == node
                    && matches!(row.share_type, ShareType::User | ShareType::Group)
            })
            .cloned()
            .collect())
    }

    async fn get_by_token(&self, token: &str) -> AppResult<Share> {
        let state = self.state.lock().await;
        state
            .rows
            .values()
            .find(|row| {
                row.share_type == ShareType::Link && row.token.as_deref() == Some(token)
            })
            .cloned()
            .ok_or_else(|| AppError::not_found("Share not found"))
    }

    async fn get_children(&self, share: &Share) -> AppResult<Vec<Share>> {
        let id = Self::persisted_id(share)?;
        let parent = ShareId(id);
        let state = self.state.lock().await;
        Ok(state
            .rows
            .values()
            .filter(|row| row.override_of == Some(parent) || row.reshare_of == Some(parent))
            .cloned()
            .collect())
    }

    async fn get_access_list(
        &self,
        nodes: &[NodeId],
        current_access: bool,
    ) -> AppResult<AccessList> {
        let rows: Vec<Share> = {
            let state = self.state.lock().await;
            state
                .rows
                .values()
                .filter(|row| nodes.contains(&row.node_id))
                .filter(|row| {
                    SUPPORTED.contains(&row.share_type)
                        || (current_access && row.share_type == ShareType::GroupOverride)
                })
                .cloned()
                .collect()
        };

        let mut list = AccessList::new();
        // Candidate rows per recipient, keyed by row id so overrides can
        // suppress their parent.
        let mut candidates: BTreeMap<UserId, BTreeMap<i64, Share>> = BTreeMap::new();
        let mut add = |user: UserId, row: &Share| {
            if let Some(id) = row.id {
                candidates.entry(user).or_default().insert(id.0, row.clone());
            }
        };

        for row in &rows {
            match row.share_type {
                ShareType::User => {
                    if let Some(user) = row.recipient_user() {
                        add(user, row);
                    }
                }
                ShareType::Group => {
                    let Some(group) = row.recipient_group() else {
                        continue;
                    };
                    if !self.groups.group_exists(&group).await? {
                        continue;
                    }
                    for member in self.groups.members_of(&group).await? {
                        add(member, row);
                    }
                }
                ShareType::GroupOverride => {
                    if let Some(user) = row.recipient_user() {
                        add(user, row);
                    }
                }
                ShareType::Link => list.public = true,
                _ => {}
            }
        }

        for (user, mut rows) in candidates {
            if current_access {
                // An override replaces its parent; a zero-permission
                // override hides the share entirely.
                let overrides: Vec<(i64, Option<i64>, SharePermissions)> = rows
                    .values()
                    .filter(|row| row.share_type == ShareType::GroupOverride)
                    .filter_map(|row| {
                        row.id.map(|id| (id.0, row.override_of.map(|p| p.0), row.permissions))
                    })
                    .collect();
                for (row_id, parent, permissions) in overrides {
                    if let Some(parent) = parent {
                        rows.remove(&parent);
                    }
                    if permissions.is_empty() {
                        rows.remove(&row_id);
                    }
                }

                let best = rows
                    .values()
                    .min_by_key(|row| row.target.matches('/').count());
                if let Some(row) = best {
                    list.add_user(
                        user,
                        Some(AccessEntry {
                            node_id: row.node_id,
                            path: row.target.clone(),
                        }),
                    );
                }
            } else {
                list.add_user(user, None);
            }
        }

        Ok(list)
    }

    async fn move_share(&self, share: Share, recipient: &UserId) -> AppResult<Share> {
        let id = Self::persisted_id(&share)?;
        let mut state = self.state.lock().await;

        match share.share_type {
            ShareType::User => {
                let Some(row) = state.rows.get_mut(&id) else {
                    return Err(AppError::not_found(format!("Share {id} not found")));
                };
                row.target = share.target.clone();
                Ok(row.clone())
            }
            ShareType::Group => {
                match state.override_row_id(ShareId(id), recipient) {
                    Some(row_id) => {
                        if let Some(row) = state.rows.get_mut(&row_id) {
                            row.target = share.target.clone();
                        }
                    }
                    None => {
                        let mut draft = Self::override_draft(&share, recipient);
                        draft.target = share.target.clone();
                        state.insert(draft);
                    }
                }
                Ok(share)
            }
            _ => Err(AppError::provider("Cannot move a link share")),
        }
    }

    async fn delete_from_self(&self, share: &Share, recipient: &UserId) -> AppResult<()> {
        let id = Self::persisted_id(share)?;

        match share.share_type {
            ShareType::Group => {
                let Some(group) = share.recipient_group() else {
                    return Err(AppError::provider("Group share without a group recipient"));
                };
                if !self.groups.group_exists(&group).await? {
                    return Err(AppError::provider(format!(
                        "Group '{group}' does not exist"
                    )));
                }
                if !self.groups.is_member(recipient, &group).await? {
                    return Err(AppError::provider(format!(
                        "Account '{recipient}' is not a member of group '{group}'"
                    )));
                }

                let mut state = self.state.lock().await;
                match state.override_row_id(ShareId(id), recipient) {
                    Some(row_id) => {
                        if let Some(row) = state.rows.get_mut(&row_id) {
                            row.permissions = SharePermissions::NONE;
                        }
                    }
                    None => {
                        let mut draft = Self::override_draft(share, recipient);
                        draft.permissions = SharePermissions::NONE;
                        state.insert(draft);
                    }
                }
                Ok(())
            }
            ShareType::User => {
                if share.shared_with.as_deref() != Some(recipient.as_str()) {
                    return Err(AppError::provider("Recipient does not match"));
                }
                self.delete(share).await
            }
            _ => Err(AppError::provider(format!(
                "Share type '{}' cannot be removed from self",
                share.share_type.as_str()
            ))),
        }
    }

    async fn restore(&self, share: &Share, recipient: &UserId) -> AppResult<Share> {
        let id = Self::persisted_id(share)?;
        let mut state = self.state.lock().await;

        let Some(group_permissions) = state.rows.get(&id).map(|row| row.permissions) else {
            return Err(AppError::not_found(format!("Share {id} not found")));
        };
        if let Some(row_id) = state.override_row_id(ShareId(id), recipient) {
            if let Some(row) = state.rows.get_mut(&row_id) {
                row.permissions = group_permissions;
            }
        }

        let share = state
            .rows
            .get(&id)
            .cloned()
            .ok_or_else(|| AppError::not_found(format!("Share {id} not found")))?;
        Ok(Self::resolve_group_override(&state, share, recipient))
    }

    async fn user_deleted(&self, user: &UserId, share_type: ShareType) -> AppResult<()> {
        let mut state = self.state.lock().await;
        let uid = user.as_str();

        match share_type {
            ShareType::User => {
                state.rows.retain(|_, row| {
                    !(row.share_type == ShareType::User
                        && (row.share_owner == *user || row.shared_with.as_deref() == Some(uid)))
                });
            }
            ShareType::Group => {
                state.rows.retain(|_, row| {
                    let owned = matches!(
                        row.share_type,
                        ShareType::Group | ShareType::GroupOverride
                    ) && row.share_owner == *user;
                    let received_override = row.share_type == ShareType::GroupOverride
                        && row.shared_with.as_deref() == Some(uid);
                    !(owned || received_override)
                });
            }
            ShareType::Link => {
                // A link dies with either its owner or its initiator so
                // no anonymous grant outlives the accounts behind it.
                state.rows.retain(|_, row| {
                    !(row.share_type == ShareType::Link
                        && (row.share_owner == *user || row.shared_by == *user))
                });
            }
            _ => {
                warn!(
                    share_type = share_type.as_str(),
                    "Account removal requested for a share type this provider does not hold"
                );
            }
        }
        Ok(())
    }

    async fn group_deleted(&self, group: &GroupId) -> AppResult<()> {
        let mut state = self.state.lock().await;
        let group_rows: Vec<ShareId> = state
            .rows
            .values()
            .filter(|row| {
                row.share_type == ShareType::Group
                    && row.shared_with.as_deref() == Some(group.as_str())
            })
            .filter_map(|row| row.id)
            .collect();

        state.rows.retain(|_, row| {
            !row.override_of.is_some_and(|parent| group_rows.contains(&parent))
        });
        state
            .rows
            .retain(|_, row| !row.id.is_some_and(|id| group_rows.contains(&id)));
        Ok(())
    }

    async fn user_removed_from_group(&self, user: &UserId, group: &GroupId) -> AppResult<()> {
        let mut state = self.state.lock().await;
        let group_rows: Vec<ShareId> = state
            .rows
            .values()
            .filter(|row| {
                row.share_type == ShareType::Group
                    && row.shared_with.as_deref() == Some(group.as_str())
            })
            .filter_map(|row| row.id)
            .collect();

        state.rows.retain(|_, row| {
            !(row.share_type == ShareType::GroupOverride
                && row.shared_with.as_deref() == Some(user.as_str())
                && row.override_of.is_some_and(|parent| group_rows.contains(&parent)))
        });
        Ok(())
    }
}
