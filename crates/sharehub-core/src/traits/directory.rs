//! Account and group directory contracts.

use async_trait::async_trait;

use crate::result::AppResult;
use crate::types::id::{GroupId, UserId};

/// Resolves accounts in the external directory.
#[async_trait]
pub trait IdentityResolver: Send + Sync + 'static {
    /// Whether an account with this id exists.
    async fn user_exists(&self, user: &UserId) -> AppResult<bool>;
}

/// Resolves groups and group membership in the external directory.
///
/// Membership enumeration is the dominant cost of most share lookups and
/// is not paginated; implementations should keep it cheap.
#[async_trait]
pub trait GroupResolver: Send + Sync + 'static {
    /// Whether a group with this id exists.
    async fn group_exists(&self, group: &GroupId) -> AppResult<bool>;

    /// All groups the account belongs to, transitively.
    async fn groups_of(&self, user: &UserId) -> AppResult<Vec<GroupId>>;

    /// Whether the account is a member of the group.
    async fn is_member(&self, user: &UserId, group: &GroupId) -> AppResult<bool>;

    /// All member accounts of the group.
    async fn members_of(&self, group: &GroupId) -> AppResult<Vec<UserId>>;
}
