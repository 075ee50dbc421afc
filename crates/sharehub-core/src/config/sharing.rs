//! The organization-wide sharing policy.
//!
//! One typed field per tunable. The manager snapshots this value object
//! once at the start of every operation, so a policy change never lands
//! in the middle of a validation pipeline.

use serde::{Deserialize, Serialize};

use crate::types::id::GroupId;

/// Share token length bounds. Tokens are access credentials embedded in
/// URLs, so the configured length is clamped into this window.
pub const MIN_TOKEN_LENGTH: usize = 6;
/// Upper bound for generated share tokens.
pub const MAX_TOKEN_LENGTH: usize = 32;

/// Expiration-date policy for one class of share types.
///
/// The three classes (internal, remote, link) are configured
/// independently.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExpirationPolicy {
    /// Whether new shares without an explicit date get a default one.
    #[serde(default)]
    pub default_enabled: bool,
    /// Whether an expiration date is mandatory and bounded. Only
    /// effective together with `default_enabled`.
    #[serde(default)]
    pub enforced: bool,
    /// Number of days ahead used for the default date and, when enforced,
    /// as the maximum allowed distance into the future.
    #[serde(default = "default_expire_days")]
    pub days: i64,
}

impl ExpirationPolicy {
    /// Whether the expiration window is actually enforced.
    pub fn is_enforced(&self) -> bool {
        self.default_enabled && self.enforced
    }
}

impl Default for ExpirationPolicy {
    fn default() -> Self {
        Self {
            default_enabled: false,
            enforced: false,
            days: default_expire_days(),
        }
    }
}

/// Organization-wide sharing policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SharingPolicy {
    /// Global enable flag; when false no share can be created.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Whether link shares are allowed at all.
    #[serde(default = "default_true")]
    pub allow_links: bool,
    /// Whether group shares are allowed at all.
    #[serde(default = "default_true")]
    pub allow_group_sharing: bool,
    /// Whether link/email folder shares may carry write permissions.
    #[serde(default = "default_true")]
    pub allow_public_upload: bool,
    /// Restrict sharing to recipients the sharer shares a group with.
    #[serde(default)]
    pub only_share_with_group_members: bool,
    /// Groups that do not count for the group-membership restriction.
    #[serde(default)]
    pub only_share_with_group_members_exclude: Vec<GroupId>,
    /// Members of these groups cannot create shares at all.
    #[serde(default)]
    pub excluded_groups: Vec<GroupId>,
    /// Require a password on link and email shares.
    #[serde(default)]
    pub enforce_link_password: bool,
    /// Members of these groups are exempt from password enforcement.
    #[serde(default)]
    pub link_password_exclude_groups: Vec<GroupId>,
    /// Folder under which received shares are mounted in the recipient
    /// tree.
    #[serde(default = "default_share_folder")]
    pub share_folder: String,
    /// Requested length of generated share tokens; clamped into
    /// [`MIN_TOKEN_LENGTH`]..=[`MAX_TOKEN_LENGTH`].
    #[serde(default = "default_token_length")]
    pub token_length: usize,
    /// Expiration policy for user and group shares.
    #[serde(default)]
    pub internal_expiration: ExpirationPolicy,
    /// Expiration policy for remote (federated) shares.
    #[serde(default)]
    pub remote_expiration: ExpirationPolicy,
    /// Expiration policy for link and email shares.
    #[serde(default)]
    pub link_expiration: ExpirationPolicy,
}

impl SharingPolicy {
    /// Whether a member of any of `groups` is barred from sharing.
    pub fn sharing_disabled_for(&self, groups: &[GroupId]) -> bool {
        groups.iter().any(|g| self.excluded_groups.contains(g))
    }

    /// Whether a password is enforced for a sharer in `groups`.
    pub fn password_enforced_for(&self, groups: &[GroupId]) -> bool {
        if !self.enforce_link_password {
            return false;
        }
        !groups
            .iter()
            .any(|g| self.link_password_exclude_groups.contains(g))
    }

    /// The effective token length.
    pub fn effective_token_length(&self) -> usize {
        self.token_length.clamp(MIN_TOKEN_LENGTH, MAX_TOKEN_LENGTH)
    }
}

impl Default for SharingPolicy {
    fn default() -> Self {
        Self {
            enabled: true,
            allow_links: true,
            allow_group_sharing: true,
            allow_public_upload: true,
            only_share_with_group_members: false,
            only_share_with_group_members_exclude: Vec::new(),
            excluded_groups: Vec::new(),
            enforce_link_password: false,
            link_password_exclude_groups: Vec::new(),
            share_folder: default_share_folder(),
            token_length: default_token_length(),
            internal_expiration: ExpirationPolicy::default(),
            remote_expiration: ExpirationPolicy::default(),
            link_expiration: ExpirationPolicy::default(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_share_folder() -> String {
    "/".to_string()
}

fn default_token_length() -> usize {
    15
}

fn default_expire_days() -> i64 {
    7
}
