//! Share entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use sharehub_core::traits::node::NodeKind;
use sharehub_core::types::id::{GroupId, NodeId, ShareId, UserId};
use sharehub_core::types::permissions::SharePermissions;

use crate::share::attributes::ShareAttributes;

/// Type of share.
///
/// The recipient column's semantics depend on the type: a user id for
/// user shares, a group id for group shares, absent for link shares, an
/// address for email and remote shares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "share_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ShareType {
    /// A share directly with another account.
    User,
    /// A share with every member of a group.
    Group,
    /// A per-recipient override row customizing (or hiding) a group
    /// share for one member. Never created through the manager.
    GroupOverride,
    /// An anonymous link, optionally password protected.
    Link,
    /// A link delivered to an email address.
    Email,
    /// A federated share with an account on another instance.
    Remote,
    /// A federated share with a group on another instance.
    RemoteGroup,
    /// A share with a conversation room.
    Room,
}

impl ShareType {
    /// Return the type as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Group => "group",
            Self::GroupOverride => "group_override",
            Self::Link => "link",
            Self::Email => "email",
            Self::Remote => "remote",
            Self::RemoteGroup => "remote_group",
            Self::Room => "room",
        }
    }

    /// Whether the share is accessed through an opaque token rather than
    /// an authenticated account.
    pub fn is_link_like(&self) -> bool {
        matches!(self, Self::Link | Self::Email)
    }

    /// Whether the share crosses the instance boundary.
    pub fn is_remote(&self) -> bool {
        matches!(self, Self::Remote | Self::RemoteGroup)
    }
}

/// A persisted access grant on a filesystem node.
///
/// The node itself is referenced lazily by id and resolved on demand; a
/// share never eagerly loads it. `password` holds the stored hash once
/// persisted, but transiently carries plaintext while a create or update
/// request travels through validation — providers and the manager hash it
/// before it reaches storage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Share {
    /// Row id within the owning provider; `None` until persisted.
    pub id: Option<ShareId>,
    /// Identifier of the provider that persisted this share; `None`
    /// until persisted.
    pub provider_id: Option<String>,
    /// Type of share.
    pub share_type: ShareType,
    /// Recipient column; semantics depend on `share_type`.
    pub shared_with: Option<String>,
    /// The account that created the share.
    pub shared_by: UserId,
    /// The account owning the shared node. Resolved from the node by the
    /// manager at create time.
    pub share_owner: UserId,
    /// The shared node.
    pub node_id: NodeId,
    /// Whether the node is a file or a folder.
    pub node_kind: NodeKind,
    /// Granted capabilities.
    pub permissions: SharePermissions,
    /// Password hash (plaintext transiently during create/update). Only
    /// meaningful for link and email shares.
    #[serde(skip_serializing)]
    pub password: Option<String>,
    /// Whether the password is delivered over the chat system instead of
    /// alongside the link. Requires a non-empty password.
    pub send_password_by_chat: bool,
    /// Opaque access credential for link and email shares.
    pub token: Option<String>,
    /// When the share stops granting access. Expired shares are deleted
    /// lazily by the next lookup that discovers them.
    pub expiration: Option<DateTime<Utc>>,
    /// Optional display label for link shares.
    pub label: Option<String>,
    /// Target path in the recipient's tree.
    pub target: String,
    /// The group share this row overrides for one recipient.
    pub override_of: Option<ShareId>,
    /// The origin share this re-share chains to.
    pub reshare_of: Option<ShareId>,
    /// Scoped attribute extensions, e.g. `permissions/download`.
    pub attributes: Option<ShareAttributes>,
    /// When the share was created; set by the provider.
    pub created_at: Option<DateTime<Utc>>,
}

impl Share {
    /// Start a new unpersisted share. The owner is initialized to the
    /// initiator and corrected from the node's owner during creation.
    pub fn draft(
        share_type: ShareType,
        node_id: NodeId,
        node_kind: NodeKind,
        shared_by: UserId,
    ) -> Self {
        Self {
            id: None,
            provider_id: None,
            share_type,
            shared_with: None,
            share_owner: shared_by.clone(),
            shared_by,
            node_id,
            node_kind,
            permissions: SharePermissions::default(),
            password: None,
            send_password_by_chat: false,
            token: None,
            expiration: None,
            label: None,
            target: String::new(),
            override_of: None,
            reshare_of: None,
            attributes: None,
            created_at: None,
        }
    }

    /// The externally visible identifier, `"{provider_id}:{id}"`.
    /// `None` while the share is unpersisted.
    pub fn full_id(&self) -> Option<String> {
        match (&self.provider_id, self.id) {
            (Some(provider), Some(id)) => Some(format!("{provider}:{id}")),
            _ => None,
        }
    }

    /// Whether the share's expiration date has passed at `now`.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expiration.is_some_and(|exp| exp <= now)
    }

    /// The recipient as a user id, for user shares and override rows.
    pub fn recipient_user(&self) -> Option<UserId> {
        match self.share_type {
            ShareType::User | ShareType::GroupOverride => {
                self.shared_with.as_deref().map(UserId::from)
            }
            _ => None,
        }
    }

    /// The recipient as a group id, for group shares.
    pub fn recipient_group(&self) -> Option<GroupId> {
        match self.share_type {
            ShareType::Group => self.shared_with.as_deref().map(GroupId::from),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn draft() -> Share {
        Share::draft(
            ShareType::User,
            NodeId(7),
            NodeKind::File,
            UserId::new("alice"),
        )
    }

    #[test]
    fn test_full_id_requires_persistence() {
        let mut share = draft();
        assert_eq!(share.full_id(), None);

        share.id = Some(ShareId(42));
        share.provider_id = Some("local".to_string());
        assert_eq!(share.full_id().as_deref(), Some("local:42"));
    }

    #[test]
    fn test_expiry() {
        let now = Utc::now();
        let mut share = draft();
        assert!(!share.is_expired(now));

        share.expiration = Some(now - Duration::days(1));
        assert!(share.is_expired(now));

        share.expiration = Some(now + Duration::days(1));
        assert!(!share.is_expired(now));
    }

    #[test]
    fn test_typed_recipients() {
        let mut share = draft();
        share.shared_with = Some("bob".to_string());
        assert_eq!(share.recipient_user(), Some(UserId::new("bob")));
        assert_eq!(share.recipient_group(), None);

        share.share_type = ShareType::Group;
        share.shared_with = Some("staff".to_string());
        assert_eq!(share.recipient_group(), Some(GroupId::new("staff")));
        assert_eq!(share.recipient_user(), None);
    }
}
