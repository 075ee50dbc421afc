//! PostgreSQL share provider.
//!
//! Persists user, group, and link shares in the flat `shares` relation.
//! Per-recipient group overrides are `group_override` rows pointing at
//! their canonical group share through `override_of`; link-like
//! re-shares chain to their origin through `reshare_of`.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder};
use tracing::{info, warn};

use sharehub_core::error::{AppError, ErrorKind};
use sharehub_core::result::AppResult;
use sharehub_core::traits::directory::GroupResolver;
use sharehub_core::traits::node::NodeKind;
use sharehub_core::types::id::{GroupId, NodeId, ShareId, UserId};
use sharehub_core::types::pagination::Paging;
use sharehub_core::types::permissions::SharePermissions;
use sharehub_entity::share::{Share, ShareAttributes, ShareType};
use sharehub_provider::provider::{AccessEntry, AccessList, ShareProvider};

const PROVIDER_ID: &str = "local";

const SUPPORTED: &[ShareType] = &[ShareType::User, ShareType::Group, ShareType::Link];

/// Row mapping for the `shares` relation.
#[derive(Debug, sqlx::FromRow)]
struct ShareRow {
    id: ShareId,
    share_type: ShareType,
    shared_with: Option<String>,
    owner_id: UserId,
    initiator_id: UserId,
    item_type: NodeKind,
    node_source: NodeId,
    target_path: String,
    permissions: SharePermissions,
    token: Option<String>,
    password_hash: Option<String>,
    send_password_by_chat: bool,
    expiration: Option<chrono::DateTime<chrono::Utc>>,
    label: Option<String>,
    override_of: Option<ShareId>,
    reshare_of: Option<ShareId>,
    attributes: Option<String>,
    created_at: chrono::DateTime<chrono::Utc>,
}

impl TryFrom<ShareRow> for Share {
    type Error = AppError;

    fn try_from(row: ShareRow) -> Result<Self, Self::Error> {
        let attributes = row
            .attributes
            .as_deref()
            .map(ShareAttributes::from_db)
            .transpose()?;
        Ok(Share {
            id: Some(row.id),
            provider_id: Some(PROVIDER_ID.to_string()),
            share_type: row.share_type,
            shared_with: row.shared_with,
            shared_by: row.initiator_id,
            share_owner: row.owner_id,
            node_id: row.node_source,
            node_kind: row.item_type,
            permissions: row.permissions,
            password: row.password_hash,
            send_password_by_chat: row.send_password_by_chat,
            token: row.token,
            expiration: row.expiration,
            label: row.label,
            target: row.target_path,
            override_of: row.override_of,
            reshare_of: row.reshare_of,
            attributes,
            created_at: Some(row.created_at),
        })
    }
}

fn db_err(context: &'static str) -> impl FnOnce(sqlx::Error) -> AppError {
    move |e| AppError::with_source(ErrorKind::Database, context, e)
}

/// The primary storage-backed share provider.
#[derive(Clone)]
pub struct DbShareProvider {
    pool: PgPool,
    groups: Arc<dyn GroupResolver>,
}

impl DbShareProvider {
    /// Create a new provider on a connection pool. Group membership is
    /// needed to resolve group shares to their recipients.
    pub fn new(pool: PgPool, groups: Arc<dyn GroupResolver>) -> Self {
        Self { pool, groups }
    }

    fn persisted_id(share: &Share) -> AppResult<ShareId> {
        share
            .id
            .ok_or_else(|| AppError::provider("Share has not been persisted by this provider"))
    }

    fn rows_to_shares(rows: Vec<ShareRow>) -> AppResult<Vec<Share>> {
        rows.into_iter().map(Share::try_from).collect()
    }

    /// Fetch the recipient's override row for a group share, if any.
    async fn override_row(
        &self,
        parent: ShareId,
        recipient: &UserId,
    ) -> AppResult<Option<Share>> {
        let row = sqlx::query_as::<_, ShareRow>(
            "SELECT * FROM shares WHERE share_type = 'group_override' \
             AND override_of = $1 AND shared_with = $2",
        )
        .bind(parent)
        .bind(recipient.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err("Failed to fetch group override"))?;

        row.map(Share::try_from).transpose()
    }

    /// Apply the recipient's override values onto the canonical group
    /// share: permissions, target, and initiator win over the inherited
    /// group values.
    async fn resolve_group_override(
        &self,
        mut share: Share,
        recipient: &UserId,
    ) -> AppResult<Share> {
        let Some(id) = share.id else {
            return Ok(share);
        };
        if let Some(row) = self.override_row(id, recipient).await? {
            share.permissions = row.permissions;
            share.target = row.target;
            share.shared_by = row.shared_by;
        }
        Ok(share)
    }

    /// Insert a per-recipient override row for a group share.
    async fn insert_override(
        &self,
        parent: &Share,
        recipient: &UserId,
        permissions: SharePermissions,
        target: &str,
    ) -> AppResult<()> {
        let parent_id = Self::persisted_id(parent)?;
        sqlx::query(
            "INSERT INTO shares (share_type, shared_with, owner_id, initiator_id, item_type, \
             node_source, target_path, permissions, override_of, attributes) \
             VALUES ('group_override', $1, $2, $3, $4, $5, $6, $7, $8, $9)",
        )
        .bind(recipient.as_str())
        .bind(&parent.share_owner)
        .bind(&parent.shared_by)
        .bind(parent.node_kind)
        .bind(parent.node_id)
        .bind(target)
        .bind(permissions)
        .bind(parent_id)
        .bind(
            parent
                .attributes
                .as_ref()
                .map(ShareAttributes::to_db)
                .transpose()?
                .flatten(),
        )
        .execute(&self.pool)
        .await
        .map_err(db_err("Failed to insert group override"))?;
        Ok(())
    }

    /// Ids of the canonical group shares granted to a group.
    async fn group_share_ids(&self, group: &GroupId) -> AppResult<Vec<i64>> {
        sqlx::query_scalar::<_, i64>(
            "SELECT id FROM shares WHERE share_type = 'group' AND shared_with = $1",
        )
        .bind(group.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(db_err("Failed to enumerate group shares"))
    }
}

#[async_trait]
impl ShareProvider for DbShareProvider {
    fn identifier(&self) -> &str {
        PROVIDER_ID
    }

    fn supported_types(&self) -> &[ShareType] {
        SUPPORTED
    }

    async fn create(&self, mut share: Share) -> AppResult<Share> {
        if !self.supports_type(share.share_type) {
            return Err(AppError::provider(format!(
                "Share type '{}' is not handled by this provider",
                share.share_type.as_str()
            )));
        }

        let attributes = share
            .attributes
            .as_ref()
            .map(ShareAttributes::to_db)
            .transpose()?
            .flatten();

        let row = sqlx::query_as::<_, ShareRow>(
            "INSERT INTO shares (share_type, shared_with, owner_id, initiator_id, item_type, \
             node_source, target_path, permissions, token, password_hash, \
             send_password_by_chat, expiration, label, reshare_of, attributes) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15) \
             RETURNING *",
        )
        .bind(share.share_type)
        .bind(&share.shared_with)
        .bind(&share.share_owner)
        .bind(&share.shared_by)
        .bind(share.node_kind)
        .bind(share.node_id)
        .bind(&share.target)
        .bind(share.permissions)
        .bind(&share.token)
        .bind(&share.password)
        .bind(share.send_password_by_chat)
        .bind(share.expiration)
        .bind(&share.label)
        .bind(share.reshare_of)
        .bind(attributes)
        .fetch_one(&self.pool)
        .await
        .map_err(db_err("Failed to create share"))?;

        share.id = Some(row.id);
        share.provider_id = Some(PROVIDER_ID.to_string());
        share.created_at = Some(row.created_at);
        info!(
            share_id = %row.id,
            share_type = share.share_type.as_str(),
            node_id = %share.node_id,
            "Share persisted"
        );
        Ok(share)
    }

    async fn update(&self, share: Share, _plaintext_password: Option<&str>) -> AppResult<Share> {
        let id = Self::persisted_id(&share)?;
        let attributes = share
            .attributes
            .as_ref()
            .map(ShareAttributes::to_db)
            .transpose()?
            .flatten();

        match share.share_type {
            ShareType::User => {
                sqlx::query(
                    "UPDATE shares SET shared_with = $2, owner_id = $3, initiator_id = $4, \
                     permissions = $5, attributes = $6, node_source = $7, expiration = $8 \
                     WHERE id = $1",
                )
                .bind(id)
                .bind(&share.shared_with)
                .bind(&share.share_owner)
                .bind(&share.shared_by)
                .bind(share.permissions)
                .bind(&attributes)
                .bind(share.node_id)
                .bind(share.expiration)
                .execute(&self.pool)
                .await
                .map_err(db_err("Failed to update share"))?;
            }
            ShareType::Group => {
                sqlx::query(
                    "UPDATE shares SET owner_id = $2, initiator_id = $3, permissions = $4, \
                     attributes = $5, node_source = $6, expiration = $7 WHERE id = $1",
                )
                .bind(id)
                .bind(&share.share_owner)
                .bind(&share.shared_by)
                .bind(share.permissions)
                .bind(&attributes)
                .bind(share.node_id)
                .bind(share.expiration)
                .execute(&self.pool)
                .await
                .map_err(db_err("Failed to update share"))?;

                // Propagate onto the override rows.
                sqlx::query(
                    "UPDATE shares SET owner_id = $2, initiator_id = $3, node_source = $4, \
                     expiration = $5 WHERE override_of = $1 AND share_type = 'group_override'",
                )
                .bind(id)
                .bind(&share.share_owner)
                .bind(&share.shared_by)
                .bind(share.node_id)
                .bind(share.expiration)
                .execute(&self.pool)
                .await
                .map_err(db_err("Failed to update group overrides"))?;

                // Permissions only onto overrides that are not hidden
                // markers.
                sqlx::query(
                    "UPDATE shares SET permissions = $2, attributes = $3 \
                     WHERE override_of = $1 AND share_type = 'group_override' \
                     AND permissions <> 0",
                )
                .bind(id)
                .bind(share.permissions)
                .bind(&attributes)
                .execute(&self.pool)
                .await
                .map_err(db_err("Failed to update group override permissions"))?;
            }
            ShareType::Link => {
                sqlx::query(
                    "UPDATE shares SET password_hash = $2, send_password_by_chat = $3, \
                     owner_id = $4, initiator_id = $5, permissions = $6, attributes = $7, \
                     node_source = $8, token = $9, expiration = $10, label = $11 WHERE id = $1",
                )
                .bind(id)
                .bind(&share.password)
                .bind(share.send_password_by_chat)
                .bind(&share.share_owner)
                .bind(&share.shared_by)
                .bind(share.permissions)
                .bind(&attributes)
                .bind(share.node_id)
                .bind(&share.token)
                .bind(share.expiration)
                .bind(&share.label)
                .execute(&self.pool)
                .await
                .map_err(db_err("Failed to update share"))?;
            }
            _ => {
                return Err(AppError::provider(format!(
                    "Share type '{}' is not handled by this provider",
                    share.share_type.as_str()
                )));
            }
        }

        Ok(share)
    }

    async fn delete(&self, share: &Share) -> AppResult<()> {
        let id = Self::persisted_id(share)?;

        if share.share_type == ShareType::Group {
            sqlx::query("DELETE FROM shares WHERE id = $1 OR override_of = $1")
                .bind(id)
                .execute(&self.pool)
                .await
                .map_err(db_err("Failed to delete share"))?;
        } else {
            sqlx::query("DELETE FROM shares WHERE id = $1")
                .bind(id)
                .execute(&self.pool)
                .await
                .map_err(db_err("Failed to delete share"))?;
        }
        info!(share_id = %id, share_type = share.share_type.as_str(), "Share deleted");
        Ok(())
    }

    async fn get_by_id(&self, id: ShareId, recipient: Option<&UserId>) -> AppResult<Share> {
        let row = sqlx::query_as::<_, ShareRow>(
            "SELECT * FROM shares WHERE id = $1 AND share_type = ANY($2)",
        )
        .bind(id)
        .bind(SUPPORTED)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err("Failed to fetch share"))?;

        let share = row
            .map(Share::try_from)
            .transpose()?
            .ok_or_else(|| AppError::not_found(format!("Share {id} not found")))?;

        match (recipient, share.share_type) {
            (Some(user), ShareType::Group) => self.resolve_group_override(share, user).await,
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
        let mut qb = QueryBuilder::<Postgres>::new("SELECT * FROM shares WHERE share_type = ");
        qb.push_bind(share_type);

        if !include_reshares {
            qb.push(" AND initiator_id = ").push_bind(user.as_str());
        } else if node.is_none() {
            qb.push(" AND (owner_id = ")
                .push_bind(user.as_str())
                .push(" OR initiator_id = ")
                .push_bind(user.as_str())
                .push(")");
        }
        // With a node filter, "including reshares" widens to every share
        // on the node.
        if let Some(node) = node {
            qb.push(" AND node_source = ").push_bind(node);
        }

        qb.push(" ORDER BY id");
        if let Some(limit) = paging.limit {
            qb.push(" LIMIT ").push_bind(limit as i64);
        }
        qb.push(" OFFSET ").push_bind(paging.offset as i64);

        let rows: Vec<ShareRow> = qb
            .build_query_as()
            .fetch_all(&self.pool)
            .await
            .map_err(db_err("Failed to list shares"))?;
        Self::rows_to_shares(rows)
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
                let mut qb = QueryBuilder::<Postgres>::new(
                    "SELECT * FROM shares WHERE share_type = 'user' AND shared_with = ",
                );
                qb.push_bind(user.as_str());
                if let Some(node) = node {
                    qb.push(" AND node_source = ").push_bind(node);
                }
                qb.push(" ORDER BY id");
                if let Some(limit) = paging.limit {
                    qb.push(" LIMIT ").push_bind(limit as i64);
                }
                qb.push(" OFFSET ").push_bind(paging.offset as i64);

                let rows: Vec<ShareRow> = qb
                    .build_query_as()
                    .fetch_all(&self.pool)
                    .await
                    .map_err(db_err("Failed to list received shares"))?;
                Self::rows_to_shares(rows)
            }
            ShareType::Group => {
                // Enumerate every group of the recipient; pagination is
                // applied to the final result set only.
                let groups: Vec<String> = self
                    .groups
                    .groups_of(user)
                    .await?
                    .into_iter()
                    .map(|g| g.0)
                    .collect();
                if groups.is_empty() {
                    return Ok(Vec::new());
                }

                let mut qb = QueryBuilder::<Postgres>::new(
                    "SELECT * FROM shares WHERE share_type = 'group' AND shared_with = ANY(",
                );
                qb.push_bind(groups).push(")");
                if let Some(node) = node {
                    qb.push(" AND node_source = ").push_bind(node);
                }
                qb.push(" ORDER BY id");
                if let Some(limit) = paging.limit {
                    qb.push(" LIMIT ").push_bind(limit as i64);
                }
                qb.push(" OFFSET ").push_bind(paging.offset as i64);

                let rows: Vec<ShareRow> = qb
                    .build_query_as()
                    .fetch_all(&self.pool)
                    .await
                    .map_err(db_err("Failed to list received group shares"))?;

                let mut shares = Vec::with_capacity(rows.len());
                for row in rows {
                    let share = Share::try_from(row)?;
                    shares.push(self.resolve_group_override(share, user).await?);
                }
                Ok(shares)
            }
            _ => Err(AppError::provider(format!(
                "Share type '{}' has no recipient lookup in this provider",
                share_type.as_str()
            ))),
        }
    }

    async fn get_shares_by_path(&self, node: NodeId) -> AppResult<Vec<Share>> {
        let rows = sqlx::query_as::<_, ShareRow>(
            "SELECT * FROM shares WHERE node_source = $1 \
             AND share_type IN ('user', 'group') ORDER BY id",
        )
        .bind(node)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err("Failed to list shares by path"))?;
        Self::rows_to_shares(rows)
    }

    async fn get_by_token(&self, token: &str) -> AppResult<Share> {
        let row = sqlx::query_as::<_, ShareRow>(
            "SELECT * FROM shares WHERE share_type = 'link' AND token = $1",
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err("Failed to fetch share by token"))?;

        row.map(Share::try_from)
            .transpose()?
            .ok_or_else(|| AppError::not_found("Share not found"))
    }

    async fn get_children(&self, share: &Share) -> AppResult<Vec<Share>> {
        let id = Self::persisted_id(share)?;
        let rows = sqlx::query_as::<_, ShareRow>(
            "SELECT * FROM shares WHERE override_of = $1 OR reshare_of = $1 ORDER BY id",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err("Failed to list share children"))?;
        Self::rows_to_shares(rows)
    }

    async fn get_access_list(
        &self,
        nodes: &[NodeId],
        current_access: bool,
    ) -> AppResult<AccessList> {
        if nodes.is_empty() {
            return Ok(AccessList::new());
        }

        let mut types = SUPPORTED.to_vec();
        if current_access {
            types.push(ShareType::GroupOverride);
        }
        let node_ids: Vec<i64> = nodes.iter().map(|n| n.0).collect();

        let rows = sqlx::query_as::<_, ShareRow>(
            "SELECT * FROM shares WHERE node_source = ANY($1) AND share_type = ANY($2) \
             ORDER BY id",
        )
        .bind(&node_ids)
        .bind(&types)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err("Failed to collect access list"))?;
        let shares = Self::rows_to_shares(rows)?;

        let mut list = AccessList::new();
        let mut candidates: BTreeMap<UserId, BTreeMap<i64, Share>> = BTreeMap::new();
        let mut add = |user: UserId, share: &Share| {
            if let Some(id) = share.id {
                candidates
                    .entry(user)
                    .or_default()
                    .insert(id.0, share.clone());
            }
        };

        for share in &shares {
            match share.share_type {
                ShareType::User => {
                    if let Some(user) = share.recipient_user() {
                        add(user, share);
                    }
                }
                ShareType::Group => {
                    let Some(group) = share.recipient_group() else {
                        continue;
                    };
                    if !self.groups.group_exists(&group).await? {
                        continue;
                    }
                    for member in self.groups.members_of(&group).await? {
                        add(member, share);
                    }
                }
                ShareType::GroupOverride => {
                    if let Some(user) = share.recipient_user() {
                        add(user, share);
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
                        row.id
                            .map(|id| (id.0, row.override_of.map(|p| p.0), row.permissions))
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

        match share.share_type {
            ShareType::User => {
                sqlx::query("UPDATE shares SET target_path = $2 WHERE id = $1")
                    .bind(id)
                    .bind(&share.target)
                    .execute(&self.pool)
                    .await
                    .map_err(db_err("Failed to move share"))?;
                Ok(share)
            }
            ShareType::Group => {
                match self.override_row(id, recipient).await? {
                    Some(row) => {
                        let row_id = Self::persisted_id(&row)?;
                        sqlx::query("UPDATE shares SET target_path = $2 WHERE id = $1")
                            .bind(row_id)
                            .bind(&share.target)
                            .execute(&self.pool)
                            .await
                            .map_err(db_err("Failed to move share"))?;
                    }
                    None => {
                        self.insert_override(&share, recipient, share.permissions, &share.target)
                            .await?;
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

                match self.override_row(id, recipient).await? {
                    Some(row) => {
                        if !row.permissions.is_empty() {
                            let row_id = Self::persisted_id(&row)?;
                            sqlx::query("UPDATE shares SET permissions = 0 WHERE id = $1")
                                .bind(row_id)
                                .execute(&self.pool)
                                .await
                                .map_err(db_err("Failed to hide share"))?;
                        }
                    }
                    None => {
                        self.insert_override(
                            share,
                            recipient,
                            SharePermissions::NONE,
                            &share.target,
                        )
                        .await?;
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

        let permissions = sqlx::query_scalar::<_, SharePermissions>(
            "SELECT permissions FROM shares WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err("Failed to fetch share"))?
        .ok_or_else(|| AppError::not_found(format!("Share {id} not found")))?;

        sqlx::query(
            "UPDATE shares SET permissions = $3 WHERE override_of = $1 \
             AND share_type = 'group_override' AND shared_with = $2",
        )
        .bind(id)
        .bind(recipient.as_str())
        .bind(permissions)
        .execute(&self.pool)
        .await
        .map_err(db_err("Failed to restore share"))?;

        self.get_by_id(id, Some(recipient)).await
    }

    async fn user_deleted(&self, user: &UserId, share_type: ShareType) -> AppResult<()> {
        match share_type {
            ShareType::User => {
                sqlx::query(
                    "DELETE FROM shares WHERE share_type = 'user' \
                     AND (owner_id = $1 OR shared_with = $1)",
                )
                .bind(user.as_str())
                .execute(&self.pool)
                .await
                .map_err(db_err("Failed to remove account shares"))?;
            }
            ShareType::Group => {
                sqlx::query(
                    "DELETE FROM shares WHERE \
                     (share_type IN ('group', 'group_override') AND owner_id = $1) \
                     OR (share_type = 'group_override' AND shared_with = $1)",
                )
                .bind(user.as_str())
                .execute(&self.pool)
                .await
                .map_err(db_err("Failed to remove account group shares"))?;
            }
            ShareType::Link => {
                // A link dies with either its owner or its initiator so
                // no anonymous grant outlives the accounts behind it.
                sqlx::query(
                    "DELETE FROM shares WHERE share_type = 'link' \
                     AND (owner_id = $1 OR initiator_id = $1)",
                )
                .bind(user.as_str())
                .execute(&self.pool)
                .await
                .map_err(db_err("Failed to remove account link shares"))?;
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
        let ids = self.group_share_ids(group).await?;
        if !ids.is_empty() {
            sqlx::query(
                "DELETE FROM shares WHERE share_type = 'group_override' \
                 AND override_of = ANY($1)",
            )
            .bind(&ids)
            .execute(&self.pool)
            .await
            .map_err(db_err("Failed to remove group overrides"))?;
        }

        sqlx::query("DELETE FROM shares WHERE share_type = 'group' AND shared_with = $1")
            .bind(group.as_str())
            .execute(&self.pool)
            .await
            .map_err(db_err("Failed to remove group shares"))?;
        Ok(())
    }

    async fn user_removed_from_group(&self, user: &UserId, group: &GroupId) -> AppResult<()> {
        let ids = self.group_share_ids(group).await?;
        if ids.is_empty() {
            return Ok(());
        }

        sqlx::query(
            "DELETE FROM shares WHERE share_type = 'group_override' \
             AND shared_with = $1 AND override_of = ANY($2)",
        )
        .bind(user.as_str())
        .bind(&ids)
        .execute(&self.pool)
        .await
        .map_err(db_err("Failed to remove member overrides"))?;
        Ok(())
    }
}
