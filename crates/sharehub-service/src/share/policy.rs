//! The validation and policy engine behind share creation and update.
//!
//! Checks run in a fixed order: global enablement, general checks on the
//! recipient/node/permissions, type-specific checks, then the
//! expiration-date and password policies. The policy snapshot taken at
//! operation entry is used throughout, so a concurrent configuration
//! change never lands in the middle of the pipeline.

use chrono::{DateTime, Duration, Local, LocalResult, NaiveDate, NaiveTime, TimeZone, Utc};

use sharehub_core::config::sharing::{ExpirationPolicy, SharingPolicy};
use sharehub_core::error::AppError;
use sharehub_core::result::AppResult;
use sharehub_core::traits::node::{FileNode, NodeKind};
use sharehub_core::types::id::UserId;
use sharehub_core::types::permissions::SharePermissions;
use sharehub_entity::share::{Share, ShareType};

use super::manager::ShareManager;

impl ShareManager {
    /// Whether the initiator may share at all.
    pub(super) async fn can_share(&self, policy: &SharingPolicy, user: &UserId) -> AppResult<()> {
        if !policy.enabled {
            return Err(AppError::policy(
                "sharing is globally disabled",
                "Sharing is disabled",
            ));
        }

        let groups = self.groups.groups_of(user).await?;
        if policy.sharing_disabled_for(&groups) {
            return Err(AppError::policy(
                format!("account '{user}' is in a sharing-excluded group"),
                "Sharing is disabled for you",
            ));
        }
        Ok(())
    }

    /// Checks shared by every share type: recipient shape, node
    /// shareability, and permission bounds.
    pub(super) async fn general_create_checks(
        &self,
        share: &Share,
        node: &FileNode,
    ) -> AppResult<()> {
        match share.share_type {
            ShareType::User => {
                let Some(recipient) = share.recipient_user() else {
                    return Err(AppError::validation("Share recipient is not a valid user"));
                };
                if !self.identity.user_exists(&recipient).await? {
                    return Err(AppError::validation("Share recipient is not a valid user"));
                }
                if recipient == share.shared_by {
                    return Err(AppError::validation("Cannot share with yourself"));
                }
            }
            ShareType::Group => {
                let Some(recipient) = share.recipient_group() else {
                    return Err(AppError::validation("Share recipient is not a valid group"));
                };
                if !self.groups.group_exists(&recipient).await? {
                    return Err(AppError::validation("Share recipient is not a valid group"));
                }
            }
            ShareType::Link => {
                if share.shared_with.is_some() {
                    return Err(AppError::validation("Share recipient should be empty"));
                }
            }
            ShareType::Email | ShareType::Remote | ShareType::RemoteGroup | ShareType::Room => {
                if share.shared_with.is_none() {
                    return Err(AppError::validation("Share recipient should not be empty"));
                }
            }
            ShareType::GroupOverride => {
                return Err(AppError::validation("Unknown share type"));
            }
        }

        if node.is_root() {
            return Err(AppError::validation("You cannot share your root folder"));
        }
        if !node.is_shareable() {
            return Err(AppError::policy(
                format!(
                    "account '{}' holds no share permission on node {}",
                    share.shared_by, node.id
                ),
                format!("You are not allowed to share {}", node.name),
            ));
        }

        if !share.permissions.is_valid() {
            return Err(AppError::validation(
                "Valid permissions are required for sharing",
            ));
        }

        // Single file shares never carry create or delete bits.
        if node.kind == NodeKind::File
            && share
                .permissions
                .intersects(SharePermissions::CREATE | SharePermissions::DELETE)
        {
            return Err(AppError::validation(
                "File shares cannot have create or delete permissions",
            ));
        }

        // A share never exceeds what its creator holds on the node.
        if !share.permissions.is_subset_of(node.permissions) {
            return Err(AppError::policy(
                format!(
                    "requested permissions {} exceed {} held on '{}'",
                    share.permissions, node.permissions, node.path
                ),
                "Cannot increase permissions",
            ));
        }

        // Link-like shares may drop the read bit to allow upload-only
        // folders; everything else needs at least read.
        if !share.share_type.is_link_like()
            && !share.permissions.contains(SharePermissions::READ)
        {
            return Err(AppError::validation("Shares need at least read permissions"));
        }

        Ok(())
    }

    /// Pre-creation checks for user shares: group-restricted sharing and
    /// duplicate detection across direct and group-derived access.
    pub(super) async fn user_create_checks(
        &self,
        policy: &SharingPolicy,
        share: &Share,
        node: &FileNode,
    ) -> AppResult<()> {
        let Some(recipient) = share.recipient_user() else {
            return Err(AppError::validation("Share recipient is not a valid user"));
        };

        if policy.only_share_with_group_members {
            let sharer_groups = self.groups.groups_of(&share.shared_by).await?;
            let recipient_groups = self.groups.groups_of(&recipient).await?;
            let common = sharer_groups.iter().any(|g| {
                recipient_groups.contains(g)
                    && !policy.only_share_with_group_members_exclude.contains(g)
            });
            if !common {
                return Err(AppError::policy(
                    format!(
                        "accounts '{}' and '{recipient}' share no allowed group",
                        share.shared_by
                    ),
                    "Sharing is only allowed with group members",
                ));
            }
        }

        let provider = self.registry.provider_for_type(ShareType::User)?;
        for existing in provider.get_shares_by_path(node.id).await? {
            if existing.full_id().is_some() && existing.full_id() == share.full_id() {
                continue;
            }

            if existing.share_type == ShareType::User
                && existing.shared_with == share.shared_with
            {
                return Err(AppError::policy(
                    format!(
                        "node {} is already shared with account '{recipient}'",
                        node.id
                    ),
                    "This item is already shared with this account",
                ));
            }

            // Already reachable through a group share from another
            // owner.
            if existing.share_type == ShareType::Group {
                let Some(group) = existing.recipient_group() else {
                    continue;
                };
                if self.groups.is_member(&recipient, &group).await?
                    && existing.share_owner != share.share_owner
                {
                    return Err(AppError::policy(
                        format!(
                            "node {} already reaches account '{recipient}' through group '{group}'",
                            node.id
                        ),
                        "This item is already shared with this account",
                    ));
                }
            }
        }

        Ok(())
    }

    /// Pre-creation checks for group shares.
    pub(super) async fn group_create_checks(
        &self,
        policy: &SharingPolicy,
        share: &Share,
    ) -> AppResult<()> {
        if !policy.allow_group_sharing {
            return Err(AppError::policy(
                "group sharing is disabled",
                "Group sharing is not allowed",
            ));
        }

        let Some(group) = share.recipient_group() else {
            return Err(AppError::validation("Share recipient is not a valid group"));
        };

        if policy.only_share_with_group_members {
            if policy.only_share_with_group_members_exclude.contains(&group)
                || !self.groups.is_member(&share.shared_by, &group).await?
            {
                return Err(AppError::policy(
                    format!(
                        "account '{}' may not share with group '{group}'",
                        share.shared_by
                    ),
                    "Sharing is only allowed within your own groups",
                ));
            }
        }

        let provider = self.registry.provider_for_type(ShareType::Group)?;
        for existing in provider.get_shares_by_path(share.node_id).await? {
            if existing.full_id().is_some() && existing.full_id() == share.full_id() {
                continue;
            }
            if existing.share_type == ShareType::Group
                && existing.shared_with == share.shared_with
            {
                return Err(AppError::policy(
                    format!("node {} is already shared with group '{group}'", share.node_id),
                    "Path is already shared with this group",
                ));
            }
        }

        Ok(())
    }

    /// Pre-creation checks for link and email shares.
    pub(super) fn link_create_checks(
        &self,
        policy: &SharingPolicy,
        share: &Share,
    ) -> AppResult<()> {
        if !policy.allow_links {
            return Err(AppError::policy(
                "link sharing is disabled",
                "Link sharing is not allowed",
            ));
        }

        if share.node_kind == NodeKind::Folder
            && !policy.allow_public_upload
            && share.permissions.intersects(
                SharePermissions::CREATE | SharePermissions::UPDATE | SharePermissions::DELETE,
            )
        {
            return Err(AppError::validation("Public upload is not allowed"));
        }

        Ok(())
    }

    /// Validate (and default) the expiration date against one class of
    /// expiration policy. Dates are evaluated at local-timezone day
    /// boundaries and stored as the end of their day.
    pub(super) fn validate_expiration(
        &self,
        class: &ExpirationPolicy,
        share: &mut Share,
        is_new: bool,
    ) -> AppResult<()> {
        let today = Local::now().date_naive();
        let mut expiration = share.expiration;

        if let Some(exp) = expiration {
            let exp_end = local_end_of_day(exp.with_timezone(&Local).date_naive());
            if local_start_of_day(today) >= exp_end {
                return Err(AppError::policy(
                    format!("expiration {} lies in the past", exp.date_naive()),
                    "Expiration date is in the past",
                ));
            }
            expiration = Some(exp_end);
        }

        if is_new && expiration.is_none() && class.default_enabled {
            expiration = Some(local_end_of_day(today + Duration::days(class.days)));
        }

        if class.is_enforced() {
            let Some(exp) = expiration else {
                return Err(AppError::validation("Expiration date is enforced"));
            };
            let max = local_end_of_day(today + Duration::days(class.days));
            if exp > max {
                return Err(AppError::policy(
                    format!(
                        "expiration {} exceeds the enforced window of {} days",
                        exp.date_naive(),
                        class.days
                    ),
                    format!(
                        "Cannot set expiration date more than {} days in the future",
                        class.days
                    ),
                ));
            }
        }

        share.expiration = expiration;
        Ok(())
    }

    /// Enforce the password policy for a link-like share: required when
    /// enforcement applies to the sharer, and every registered rule must
    /// accept it.
    pub(super) async fn verify_share_password(
        &self,
        policy: &SharingPolicy,
        sharer: &UserId,
        password: Option<&str>,
    ) -> AppResult<()> {
        let Some(password) = password else {
            let groups = self.groups.groups_of(sharer).await?;
            if policy.password_enforced_for(&groups) {
                return Err(AppError::validation(
                    "Passwords are enforced for link and mail shares",
                ));
            }
            return Ok(());
        };

        for rule in &self.password_policies {
            rule.validate(password)?;
        }
        Ok(())
    }
}

/// The first instant of a local calendar day, in UTC.
fn local_start_of_day(date: NaiveDate) -> DateTime<Utc> {
    to_utc(date, NaiveTime::MIN)
}

/// The last counted second of a local calendar day, in UTC. Expiration
/// dates are stored at this boundary so a share lives through its final
/// day.
fn local_end_of_day(date: NaiveDate) -> DateTime<Utc> {
    let time = NaiveTime::from_hms_opt(23, 59, 59).unwrap_or(NaiveTime::MIN);
    to_utc(date, time)
}

fn to_utc(date: NaiveDate, time: NaiveTime) -> DateTime<Utc> {
    match Local.from_local_datetime(&date.and_time(time)) {
        LocalResult::Single(dt) | LocalResult::Ambiguous(dt, _) => dt.with_timezone(&Utc),
        // A local time skipped by a DST jump; fall back to reading the
        // naive timestamp as UTC.
        LocalResult::None => Utc.from_utc_datetime(&date.and_time(time)),
    }
}
