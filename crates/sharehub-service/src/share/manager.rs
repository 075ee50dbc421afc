//! The share manager — communication hub for all sharing operations.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use futures::future::BoxFuture;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use sharehub_core::config::sharing::{MAX_TOKEN_LENGTH, SharingPolicy};
use sharehub_core::error::{AppError, ErrorKind};
use sharehub_core::events::ShareEvent;
use sharehub_core::result::AppResult;
use sharehub_core::traits::directory::{GroupResolver, IdentityResolver};
use sharehub_core::traits::node::{NodeKind, NodeResolver};
use sharehub_core::traits::security::{
    PasswordHasher, PasswordPolicy, PasswordVerification, SecureRandom,
};
use sharehub_core::types::id::{GroupId, NodeId, ShareId, UserId};
use sharehub_core::types::pagination::Paging;
use sharehub_core::types::permissions::SharePermissions;
use sharehub_entity::share::{Share, ShareType};
use sharehub_provider::provider::ShareProvider;
use sharehub_provider::registry::ProviderRegistry;

use super::hooks::{GuardVerdict, ShareGuard, ShareObserver};

/// Orchestrates share creation, validation, mutation, cascade deletion,
/// and lookup across the registered providers.
///
/// All operations are synchronous and request-scoped: every call
/// re-reads current storage, and a policy snapshot is taken once at the
/// start of each operation.
pub struct ShareManager {
    pub(super) registry: Arc<ProviderRegistry>,
    pub(super) identity: Arc<dyn IdentityResolver>,
    pub(super) groups: Arc<dyn GroupResolver>,
    pub(super) nodes: Arc<dyn NodeResolver>,
    pub(super) hasher: Arc<dyn PasswordHasher>,
    random: Arc<dyn SecureRandom>,
    policy: RwLock<SharingPolicy>,
    pub(super) password_policies: Vec<Arc<dyn PasswordPolicy>>,
    guards: Vec<Arc<dyn ShareGuard>>,
    observers: Vec<Arc<dyn ShareObserver>>,
}

impl ShareManager {
    /// Creates a new share manager.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        registry: Arc<ProviderRegistry>,
        identity: Arc<dyn IdentityResolver>,
        groups: Arc<dyn GroupResolver>,
        nodes: Arc<dyn NodeResolver>,
        hasher: Arc<dyn PasswordHasher>,
        random: Arc<dyn SecureRandom>,
        policy: SharingPolicy,
    ) -> Self {
        Self {
            registry,
            identity,
            groups,
            nodes,
            hasher,
            random,
            policy: RwLock::new(policy),
            password_policies: Vec::new(),
            guards: Vec::new(),
            observers: Vec::new(),
        }
    }

    /// Register a password-policy rule consulted for new share
    /// passwords.
    pub fn with_password_policy(mut self, policy: Arc<dyn PasswordPolicy>) -> Self {
        self.password_policies.push(policy);
        self
    }

    /// Register a lifecycle guard.
    pub fn with_guard(mut self, guard: Arc<dyn ShareGuard>) -> Self {
        self.guards.push(guard);
        self
    }

    /// Register a mutation observer.
    pub fn with_observer(mut self, observer: Arc<dyn ShareObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    /// Snapshot the current sharing policy.
    pub async fn policy(&self) -> SharingPolicy {
        self.policy.read().await.clone()
    }

    /// Replace the sharing policy.
    pub async fn set_policy(&self, policy: SharingPolicy) {
        *self.policy.write().await = policy;
    }

    pub(super) fn dispatch(&self, event: ShareEvent) {
        for observer in &self.observers {
            observer.notify(&event);
        }
    }

    async fn check_create_guards(&self, share: &Share) -> AppResult<()> {
        for guard in &self.guards {
            if let GuardVerdict::Deny { reason } = guard.before_create(share).await {
                return Err(AppError::policy(
                    format!("share creation vetoed: {reason}"),
                    reason,
                ));
            }
        }
        Ok(())
    }

    async fn check_delete_guards(&self, share: &Share) -> AppResult<()> {
        for guard in &self.guards {
            if let GuardVerdict::Deny { reason } = guard.before_delete(share).await {
                return Err(AppError::policy(
                    format!("share deletion vetoed: {reason}"),
                    reason,
                ));
            }
        }
        Ok(())
    }

    /// The provider a persisted share belongs to; falls back to the
    /// type-routed provider for shares that were never persisted.
    fn provider_of(&self, share: &Share) -> AppResult<Arc<dyn ShareProvider>> {
        match share.provider_id.as_deref() {
            Some(id) => self.registry.provider_by_id(id),
            None => self.registry.provider_for_type(share.share_type),
        }
    }

    // ---------------------------------------------------------------
    // Create
    // ---------------------------------------------------------------

    /// Validate and persist a new share.
    pub async fn create_share(&self, mut share: Share) -> AppResult<Share> {
        let policy = self.policy().await;
        self.can_share(&policy, &share.shared_by).await?;

        let node = self
            .nodes
            .node_for_user(&share.shared_by, share.node_id)
            .await?
            .ok_or_else(|| AppError::validation("Shared path must be set"))?;

        // The owner is always the owner of the path; the resolver
        // reports the effective owner for mounted storage.
        share.share_owner = node.owner.clone();
        share.node_kind = node.kind;

        self.general_create_checks(&share, &node).await?;

        match share.share_type {
            ShareType::User => {
                self.user_create_checks(&policy, &share, &node).await?;
                self.validate_expiration(&policy.internal_expiration, &mut share, true)?;
            }
            ShareType::Group => {
                self.group_create_checks(&policy, &share).await?;
                self.validate_expiration(&policy.internal_expiration, &mut share, true)?;
            }
            ShareType::Remote | ShareType::RemoteGroup => {
                self.validate_expiration(&policy.remote_expiration, &mut share, true)?;
            }
            ShareType::Link | ShareType::Email => {
                self.link_create_checks(&policy, &share)?;

                // Record the origin of a re-shared link so cascade
                // deletion of the origin reaches it.
                if share.share_owner != share.shared_by {
                    share.reshare_of = self
                        .origin_share_id(&share.shared_by, share.node_id)
                        .await?;
                }

                share.token = Some(self.generate_token(&policy).await?);
                self.validate_expiration(&policy.link_expiration, &mut share, true)?;

                self.verify_share_password(&policy, &share.shared_by, share.password.as_deref())
                    .await?;
                if share.send_password_by_chat && share.password.is_none() {
                    return Err(AppError::validation(
                        "Cannot enable sending the password by chat with an empty password",
                    ));
                }

                // Email providers deliver the plaintext out of band and
                // hash it themselves.
                if share.share_type == ShareType::Link {
                    if let Some(plain) = share.password.take() {
                        share.password = Some(self.hasher.hash(&plain)?);
                    }
                }
            }
            ShareType::Room => {}
            ShareType::GroupOverride => {
                // Rejected by the general checks already.
                return Err(AppError::validation("Unknown share type"));
            }
        }

        if share.share_type == ShareType::User
            && share.shared_with.as_deref() == Some(share.share_owner.as_str())
        {
            return Err(AppError::validation("Cannot share with the share owner"));
        }

        share.target = normalize_target(&policy.share_folder, &node.name);

        self.check_create_guards(&share).await?;

        let provider = self.registry.provider_for_type(share.share_type)?;
        let share = provider.create(share).await?;

        if let Some(id) = share.id {
            self.dispatch(ShareEvent::Created {
                share_id: id,
                provider_id: provider.identifier().to_string(),
                share_type: share.share_type.as_str().to_string(),
                node_id: share.node_id,
                initiator: share.shared_by.clone(),
            });
        }
        info!(
            share_id = %share.id.map(|i| i.0).unwrap_or_default(),
            share_type = share.share_type.as_str(),
            node_id = %share.node_id,
            initiator = %share.shared_by,
            "Share created"
        );
        Ok(share)
    }

    /// The share through which an account received access to a node,
    /// used to chain a re-share to its origin.
    async fn origin_share_id(&self, user: &UserId, node: NodeId) -> AppResult<Option<ShareId>> {
        for share_type in [ShareType::User, ShareType::Group] {
            let Ok(provider) = self.registry.provider_for_type(share_type) else {
                continue;
            };
            let received = provider
                .get_shared_with(user, share_type, Some(node), Paging::all())
                .await?;
            if let Some(origin) = received.into_iter().next() {
                return Ok(origin.id);
            }
        }
        Ok(None)
    }

    // ---------------------------------------------------------------
    // Update
    // ---------------------------------------------------------------

    /// Validate and persist changes to an existing share.
    pub fn update_share<'a>(&'a self, mut share: Share) -> BoxFuture<'a, AppResult<Share>> {
        Box::pin(async move {
        let policy = self.policy().await;
        self.can_share(&policy, &share.shared_by).await?;

        let full_id = share
            .full_id()
            .ok_or_else(|| AppError::validation("Share does not have a full ID"))?;
        let original = self.get_share_by_id(&full_id, None).await?;

        if share.share_type != original.share_type {
            return Err(AppError::validation("Cannot change share type"));
        }
        if share.shared_with != original.shared_with && share.share_type != ShareType::User {
            return Err(AppError::validation(
                "Can only update recipient on user shares",
            ));
        }
        if share.share_type == ShareType::User
            && share.shared_with.as_deref() == Some(share.share_owner.as_str())
        {
            return Err(AppError::validation("Cannot share with the share owner"));
        }

        share.share_owner = original.share_owner.clone();
        let node = self
            .nodes
            .node_for_user(&share.shared_by, share.node_id)
            .await?
            .ok_or_else(|| AppError::validation("Shared path must be set"))?;
        share.node_kind = node.kind;

        self.general_create_checks(&share, &node).await?;

        let expiration_changed = share.expiration != original.expiration;
        let mut password_changed = false;
        let mut plaintext_password = None;

        match share.share_type {
            ShareType::User => {
                self.user_create_checks(&policy, &share, &node).await?;
                if expiration_changed {
                    self.validate_expiration(&policy.internal_expiration, &mut share, false)?;
                }
            }
            ShareType::Group => {
                self.group_create_checks(&policy, &share).await?;
                if expiration_changed {
                    self.validate_expiration(&policy.internal_expiration, &mut share, false)?;
                }
            }
            ShareType::Link | ShareType::Email => {
                self.link_create_checks(&policy, &share)?;

                let candidate = share.password.clone();
                password_changed = self
                    .update_password_if_needed(&policy, &mut share, &original)
                    .await?;
                if password_changed {
                    plaintext_password = candidate;
                }

                if share.send_password_by_chat && share.password.is_none() {
                    return Err(AppError::validation(
                        "Cannot enable sending the password by chat with an empty password",
                    ));
                }
                // The flag only makes sense for a password the recipient
                // does not already know, so toggling it in either
                // direction requires a fresh password in the same
                // update.
                if !password_changed {
                    if !original.send_password_by_chat && share.send_password_by_chat {
                        return Err(AppError::validation(
                            "Cannot enable sending the password by chat without setting a new password",
                        ));
                    }
                    if original.send_password_by_chat && !share.send_password_by_chat {
                        return Err(AppError::validation(
                            "Cannot disable sending the password by chat without setting a new password",
                        ));
                    }
                }

                if expiration_changed {
                    self.validate_expiration(&policy.link_expiration, &mut share, false)?;
                }
            }
            ShareType::Remote | ShareType::RemoteGroup => {
                if expiration_changed {
                    self.validate_expiration(&policy.remote_expiration, &mut share, false)?;
                }
            }
            ShareType::Room | ShareType::GroupOverride => {}
        }

        let provider = self.provider_of(&share)?;
        let share = provider
            .update(
                share,
                if share_needs_plaintext(&original) {
                    plaintext_password.as_deref()
                } else {
                    None
                },
            )
            .await?;

        if let Some(id) = share.id {
            self.dispatch(ShareEvent::Updated {
                share_id: id,
                node_id: share.node_id,
                password_changed,
                expiration_changed,
            });
        }
        info!(
            share_id = %share.id.map(|i| i.0).unwrap_or_default(),
            share_type = share.share_type.as_str(),
            "Share updated"
        );
        Ok(share)
        })
    }

    /// Rehash and store the password only when the plaintext actually
    /// changed; otherwise the original hash is kept. Returns whether the
    /// password was updated.
    async fn update_password_if_needed(
        &self,
        policy: &SharingPolicy,
        share: &mut Share,
        original: &Share,
    ) -> AppResult<bool> {
        let changed = match (&share.password, &original.password) {
            (None, None) => false,
            (None, Some(_)) | (Some(_), None) => true,
            (Some(candidate), Some(hash)) => {
                candidate != hash && !self.hasher.verify(candidate, hash)?.is_valid()
            }
        };

        if !changed {
            // The candidate is either the stored hash itself or the
            // matching plaintext; keep the original.
            share.password = original.password.clone();
            return Ok(false);
        }

        self.verify_share_password(policy, &share.shared_by, share.password.as_deref())
            .await?;
        if let Some(plain) = share.password.take() {
            share.password = Some(self.hasher.hash(&plain)?);
        }
        Ok(true)
    }

    // ---------------------------------------------------------------
    // Delete
    // ---------------------------------------------------------------

    /// Delete a share, its descendants (children strictly before the
    /// parent), and then try to preserve re-shares that depended on the
    /// removed access.
    pub async fn delete_share(&self, share: &Share) -> AppResult<()> {
        if share.full_id().is_none() {
            return Err(AppError::validation("Share does not have a full ID"));
        }

        self.check_delete_guards(share).await?;

        self.delete_children(share).await?;

        let provider = self.provider_of(share)?;
        provider.delete(share).await?;

        if let Some(id) = share.id {
            self.dispatch(ShareEvent::Deleted {
                share_id: id,
                share_type: share.share_type.as_str().to_string(),
                node_id: share.node_id,
            });
        }
        info!(
            share_id = %share.id.map(|i| i.0).unwrap_or_default(),
            share_type = share.share_type.as_str(),
            "Share deleted"
        );

        self.promote_reshares(share).await;
        Ok(())
    }

    /// Depth-first deletion of all descendants across every provider.
    /// There is no compensation if a call in the middle fails: rows
    /// already deleted stay deleted.
    fn delete_children<'a>(&'a self, share: &'a Share) -> BoxFuture<'a, AppResult<()>> {
        Box::pin(async move {
            for provider in self.registry.all() {
                for child in provider.get_children(share).await? {
                    self.delete_children(&child).await?;

                    // A child may belong to a different provider than
                    // its parent; route it through its own.
                    let child_provider = self.provider_of(&child)?;
                    child_provider.delete(&child).await?;

                    if let Some(id) = child.id {
                        self.dispatch(ShareEvent::Deleted {
                            share_id: id,
                            share_type: child.share_type.as_str().to_string(),
                            node_id: child.node_id,
                        });
                    }
                }
            }
            Ok(())
        })
    }

    /// After a share is deleted, re-shares that hung off the removed
    /// recipient's access are re-validated; the ones that fail get their
    /// origin reassigned to the deleted share's initiator. Re-shares
    /// that cannot be reassigned are left in place — they fail access
    /// checks when used rather than being eagerly deleted.
    async fn promote_reshares(&self, share: &Share) {
        let node = match self.nodes.resolve(share.node_id).await {
            Ok(Some(node)) => node,
            Ok(None) => return,
            Err(e) => {
                debug!(error = %e, "Skipping re-share promotion, node unresolved");
                return;
            }
        };

        let affected: Vec<UserId> = match share.share_type {
            ShareType::User => share.recipient_user().into_iter().collect(),
            ShareType::Group => {
                let Some(group) = share.recipient_group() else {
                    return;
                };
                match self.groups.members_of(&group).await {
                    Ok(members) => members
                        .into_iter()
                        .filter(|u| *u != share.share_owner && *u != share.shared_by)
                        .collect(),
                    Err(e) => {
                        debug!(error = %e, "Skipping re-share promotion, group unresolved");
                        return;
                    }
                }
            }
            _ => return,
        };

        let mut candidates = Vec::new();
        let mut seen = HashSet::new();
        for user in &affected {
            for share_type in [
                ShareType::Group,
                ShareType::User,
                ShareType::Link,
                ShareType::Remote,
                ShareType::Email,
            ] {
                let Ok(provider) = self.registry.provider_for_type(share_type) else {
                    continue;
                };
                let node_filter = (node.kind == NodeKind::File).then_some(node.id);
                let shares = match provider
                    .get_shares_by(user, share_type, node_filter, false, Paging::all())
                    .await
                {
                    Ok(shares) => shares,
                    Err(e) => {
                        debug!(error = %e, "Skipping re-share candidates of one provider");
                        continue;
                    }
                };

                for candidate in shares {
                    if node.kind == NodeKind::Folder
                        && !self.is_within(user, candidate.node_id, node.id).await
                    {
                        continue;
                    }
                    if let Some(full_id) = candidate.full_id() {
                        if seen.insert(full_id) {
                            candidates.push(candidate);
                        }
                    }
                }
            }
        }

        for mut candidate in candidates {
            let check = self.recheck_share(&candidate).await;
            match check {
                Ok(()) => {}
                Err(e) if e.kind == ErrorKind::Policy => {
                    debug!(
                        full_id = %candidate.full_id().unwrap_or_default(),
                        reason = %e,
                        "Promoting re-share to a direct share"
                    );
                    candidate.shared_by = share.shared_by.clone();
                    if let Err(e) = self.update_share(candidate.clone()).await {
                        warn!(
                            full_id = %candidate.full_id().unwrap_or_default(),
                            error = %e,
                            "Failed to promote re-share; leaving it in place"
                        );
                    }
                }
                Err(e) => {
                    debug!(
                        full_id = %candidate.full_id().unwrap_or_default(),
                        error = %e,
                        "Re-share could not be re-validated"
                    );
                }
            }
        }
    }

    /// Re-run the general creation checks for an existing share.
    async fn recheck_share(&self, share: &Share) -> AppResult<()> {
        let node = self
            .nodes
            .node_for_user(&share.shared_by, share.node_id)
            .await?
            .ok_or_else(|| {
                AppError::policy(
                    format!(
                        "initiator '{}' no longer reaches node {}",
                        share.shared_by, share.node_id
                    ),
                    "You are not allowed to share this item",
                )
            })?;
        self.general_create_checks(share, &node).await
    }

    /// Whether `node` equals `folder` or lies below it in `user`'s tree.
    async fn is_within(&self, user: &UserId, node: NodeId, folder: NodeId) -> bool {
        if node == folder {
            return true;
        }
        match self.nodes.ancestors(user, node).await {
            Ok(ancestors) => ancestors.iter().any(|a| a.id == folder),
            Err(_) => false,
        }
    }

    // ---------------------------------------------------------------
    // Recipient-scoped operations
    // ---------------------------------------------------------------

    /// Remove a share from one recipient's view. Other recipients of a
    /// group share are unaffected.
    pub async fn delete_from_self(&self, share: &Share, recipient: &UserId) -> AppResult<()> {
        if share.full_id().is_none() {
            return Err(AppError::validation("Share does not have a full ID"));
        }

        let provider = self.provider_of(share)?;
        provider.delete_from_self(share, recipient).await?;

        if let Some(id) = share.id {
            self.dispatch(ShareEvent::DeletedFromSelf {
                share_id: id,
                recipient: recipient.clone(),
            });
        }
        info!(
            share_id = %share.id.map(|i| i.0).unwrap_or_default(),
            recipient = %recipient,
            "Share removed from recipient view"
        );
        Ok(())
    }

    /// Undo a recipient's self-removal.
    pub async fn restore_share(&self, share: &Share, recipient: &UserId) -> AppResult<Share> {
        let provider = self.provider_of(share)?;
        provider.restore(share, recipient).await
    }

    /// Move the share target within the acting recipient's tree.
    pub async fn move_share(&self, share: Share, recipient: &UserId) -> AppResult<Share> {
        if share.share_type.is_link_like() {
            return Err(AppError::validation("Cannot change target of link share"));
        }

        match share.share_type {
            ShareType::User => {
                if share.shared_with.as_deref() != Some(recipient.as_str()) {
                    return Err(AppError::validation("Invalid share recipient"));
                }
            }
            ShareType::Group => {
                let Some(group) = share.recipient_group() else {
                    return Err(AppError::validation("Invalid share recipient"));
                };
                if !self.groups.group_exists(&group).await? {
                    return Err(AppError::validation(format!(
                        "Group \"{group}\" does not exist"
                    )));
                }
                if !self.groups.is_member(recipient, &group).await? {
                    return Err(AppError::validation("Invalid share recipient"));
                }
            }
            _ => {}
        }

        let provider = self.provider_of(&share)?;
        let moved = provider.move_share(share, recipient).await?;

        if let Some(id) = moved.id {
            self.dispatch(ShareEvent::Moved {
                share_id: id,
                recipient: recipient.clone(),
                target: moved.target.clone(),
            });
        }
        Ok(moved)
    }

    // ---------------------------------------------------------------
    // Lookup
    // ---------------------------------------------------------------

    /// Whether a share still grants anything. Expired shares are deleted
    /// on the spot and reported invalid.
    pub(super) async fn check_share_valid(&self, share: &Share) -> AppResult<bool> {
        if share.is_expired(Utc::now()) {
            debug!(
                share_id = %share.id.map(|i| i.0).unwrap_or_default(),
                "Deleting expired share discovered during lookup"
            );
            self.delete_share(share).await?;
            return Ok(false);
        }
        Ok(true)
    }

    /// Shares created by an account, ordered by id. Expired shares
    /// discovered on the way are deleted and replaced from the next
    /// page so pagination stays stable.
    pub async fn get_shares_by(
        &self,
        user: &UserId,
        share_type: ShareType,
        node: Option<NodeId>,
        include_reshares: bool,
        paging: Paging,
    ) -> AppResult<Vec<Share>> {
        let Ok(provider) = self.registry.provider_for_type(share_type) else {
            return Ok(Vec::new());
        };

        let Some(limit) = paging.limit else {
            let shares = provider
                .get_shares_by(user, share_type, node, include_reshares, paging)
                .await?;
            let mut valid = Vec::with_capacity(shares.len());
            for share in shares {
                if self.check_share_valid(&share).await? {
                    valid.push(share);
                }
            }
            return Ok(valid);
        };

        let mut result = Vec::new();
        let mut offset = paging.offset;
        loop {
            let page = provider
                .get_shares_by(
                    user,
                    share_type,
                    node,
                    include_reshares,
                    Paging::new(limit, offset),
                )
                .await?;
            let fetched = page.len();

            let mut consumed = 0;
            for share in page {
                consumed += 1;
                if self.check_share_valid(&share).await? {
                    result.push(share);
                }
                if result.len() == limit {
                    break;
                }
            }

            if result.len() == limit || fetched < limit {
                break;
            }
            offset += consumed;
        }
        Ok(result)
    }

    /// Shares an account receives, with group shares resolved to the
    /// recipient's effective view.
    pub async fn get_shared_with(
        &self,
        user: &UserId,
        share_type: ShareType,
        node: Option<NodeId>,
        paging: Paging,
    ) -> AppResult<Vec<Share>> {
        let Ok(provider) = self.registry.provider_for_type(share_type) else {
            return Ok(Vec::new());
        };

        let shares = provider
            .get_shared_with(user, share_type, node, paging)
            .await?;
        let mut valid = Vec::with_capacity(shares.len());
        for share in shares {
            if self.check_share_valid(&share).await? {
                valid.push(share);
            }
        }
        Ok(valid)
    }

    /// Resolve a share by its full id, `"{provider_id}:{id}"`.
    pub async fn get_share_by_id(
        &self,
        full_id: &str,
        recipient: Option<&UserId>,
    ) -> AppResult<Share> {
        let (provider_id, raw_id) = full_id
            .split_once(':')
            .ok_or_else(|| AppError::validation(format!("Invalid share ID '{full_id}'")))?;
        let id: ShareId = raw_id
            .parse()
            .map_err(|_| AppError::not_found(format!("Cannot find share with ID '{full_id}'")))?;

        let provider = self
            .registry
            .provider_by_id(provider_id)
            .map_err(|_| AppError::not_found(format!("Cannot find share with ID '{full_id}'")))?;
        let share = provider.get_by_id(id, recipient).await?;

        if !self.check_share_valid(&share).await? {
            return Err(AppError::not_found(
                "The requested share does not exist anymore",
            ));
        }
        Ok(share)
    }

    /// Resolve a link-like share by its token.
    pub async fn get_share_by_token(&self, token: &str) -> AppResult<Share> {
        let policy = self.policy().await;

        let mut found = None;
        for provider in self.registry.all() {
            match provider.get_by_token(token).await {
                Ok(share) => {
                    found = Some(share);
                    break;
                }
                Err(e) if e.kind == ErrorKind::NotFound => continue,
                Err(e) => return Err(e),
            }
        }
        let mut share = found.ok_or_else(|| {
            AppError::not_found("The requested share does not exist anymore")
        })?;

        if share.share_type == ShareType::Link && !policy.allow_links {
            return Err(AppError::not_found(
                "The requested share does not exist anymore",
            ));
        }
        if !self.check_share_valid(&share).await? {
            return Err(AppError::not_found(
                "The requested share does not exist anymore",
            ));
        }

        // Folder links lose their write bits while public upload is
        // disabled.
        if share.share_type.is_link_like()
            && share.node_kind == NodeKind::Folder
            && !policy.allow_public_upload
        {
            share.permissions = share
                .permissions
                .without(SharePermissions::CREATE | SharePermissions::UPDATE);
        }
        Ok(share)
    }

    /// Verify a password candidate against a share, transparently
    /// upgrading legacy hashes on success.
    pub async fn check_password(&self, share: &Share, password: Option<&str>) -> AppResult<bool> {
        let (Some(hash), Some(candidate)) = (&share.password, password) else {
            return Ok(false);
        };

        let verification = self.hasher.verify(candidate, hash)?;
        if !verification.is_valid() {
            return Ok(false);
        }

        if verification == PasswordVerification::ValidNeedsRehash {
            let mut upgraded = share.clone();
            upgraded.password = Some(self.hasher.hash(candidate)?);
            let provider = self.provider_of(&upgraded)?;
            provider.update(upgraded, None).await?;
            debug!(
                share_id = %share.id.map(|i| i.0).unwrap_or_default(),
                "Rehashed legacy share password"
            );
        }
        Ok(true)
    }

    // ---------------------------------------------------------------
    // Directory lifecycle
    // ---------------------------------------------------------------

    /// An account was removed; fan the cleanup out to every provider.
    pub async fn user_deleted(&self, user: &UserId) -> AppResult<()> {
        for share_type in [
            ShareType::User,
            ShareType::Group,
            ShareType::Link,
            ShareType::Remote,
            ShareType::Email,
        ] {
            let Ok(provider) = self.registry.provider_for_type(share_type) else {
                continue;
            };
            provider.user_deleted(user, share_type).await?;
        }
        info!(user = %user, "Removed shares of deleted account");
        Ok(())
    }

    /// A group was removed; clean up its shares and drop it from the
    /// sharing exclusion list.
    pub async fn group_deleted(&self, group: &GroupId) -> AppResult<()> {
        for share_type in [ShareType::Group, ShareType::RemoteGroup] {
            let Ok(provider) = self.registry.provider_for_type(share_type) else {
                continue;
            };
            provider.group_deleted(group).await?;
        }

        let mut policy = self.policy.write().await;
        policy.excluded_groups.retain(|g| g != group);
        info!(group = %group, "Removed shares of deleted group");
        Ok(())
    }

    /// An account left a group; its per-recipient overrides under that
    /// group's shares go away.
    pub async fn user_removed_from_group(
        &self,
        user: &UserId,
        group: &GroupId,
    ) -> AppResult<()> {
        for share_type in [ShareType::Group, ShareType::RemoteGroup] {
            let Ok(provider) = self.registry.provider_for_type(share_type) else {
                continue;
            };
            provider.user_removed_from_group(user, group).await?;
        }
        Ok(())
    }

    // ---------------------------------------------------------------
    // Tokens
    // ---------------------------------------------------------------

    /// Generate a share token that no registered provider knows yet,
    /// escalating the length after repeated collisions.
    pub(super) async fn generate_token(&self, policy: &SharingPolicy) -> AppResult<String> {
        let mut length = policy.effective_token_length();

        loop {
            for _ in 0..3 {
                let token = self.random.generate(length);
                if !self.token_exists(&token).await? {
                    return Ok(token);
                }
            }

            length += 1;
            if length > MAX_TOKEN_LENGTH {
                return Err(AppError::provider(
                    "Unable to generate a unique share token, maximum token length exceeded",
                ));
            }
        }
    }

    async fn token_exists(&self, token: &str) -> AppResult<bool> {
        for provider in self.registry.all() {
            match provider.get_by_token(token).await {
                Ok(_) => return Ok(true),
                Err(e) if e.kind == ErrorKind::NotFound => continue,
                Err(e) => return Err(e),
            }
        }
        Ok(false)
    }
}

/// Whether a provider needs the plaintext password alongside an update
/// (email providers deliver it out of band).
fn share_needs_plaintext(share: &Share) -> bool {
    share.share_type == ShareType::Email
}

/// Join the configured share folder and the node name into a normalized
/// target path.
fn normalize_target(share_folder: &str, name: &str) -> String {
    let folder = share_folder.trim_end_matches('/');
    if folder.is_empty() {
        format!("/{name}")
    } else {
        format!("{folder}/{name}")
    }
}
