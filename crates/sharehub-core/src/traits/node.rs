//! Filesystem node resolution contract.
//!
//! Shares reference nodes lazily by id; the engine resolves them on
//! demand through this trait. The storage engine behind it is an
//! external collaborator.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::result::AppResult;
use crate::types::id::{NodeId, UserId};
use crate::types::permissions::SharePermissions;

/// Whether a node is a file or a folder. Only folder shares may carry
/// create or delete permissions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(type_name = "node_kind", rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    /// A regular file.
    File,
    /// A folder (container).
    Folder,
}

impl NodeKind {
    /// Return the kind as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::File => "file",
            Self::Folder => "folder",
        }
    }
}

/// A resolved filesystem node as seen from one account's tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileNode {
    /// The node id.
    pub id: NodeId,
    /// The owning account. For nodes on external mounts the resolver
    /// reports the effective owner of the mount origin.
    pub owner: UserId,
    /// File or folder.
    pub kind: NodeKind,
    /// The node's name (last path component).
    pub name: String,
    /// Path relative to the resolved tree's root; `"/"` is the root
    /// folder itself.
    pub path: String,
    /// Effective permissions of the account whose tree was resolved,
    /// including permissions inherited through received shares.
    pub permissions: SharePermissions,
}

impl FileNode {
    /// Whether this node is the root folder of the resolved tree.
    pub fn is_root(&self) -> bool {
        self.path == "/"
    }

    /// Whether the resolved account may share this node.
    pub fn is_shareable(&self) -> bool {
        self.permissions.contains(SharePermissions::SHARE)
    }
}

/// Resolves nodes and ancestor chains in the node storage engine.
#[async_trait]
pub trait NodeResolver: Send + Sync + 'static {
    /// Resolve a node as visible in `user`'s tree, with that account's
    /// effective permissions. Returns `None` when the node does not
    /// exist or is not reachable for the account.
    async fn node_for_user(&self, user: &UserId, id: NodeId) -> AppResult<Option<FileNode>>;

    /// Resolve a node in its owner's tree.
    async fn resolve(&self, id: NodeId) -> AppResult<Option<FileNode>>;

    /// The node's ancestor folders in `user`'s tree, nearest first,
    /// excluding the node itself and the tree root.
    async fn ancestors(&self, user: &UserId, id: NodeId) -> AppResult<Vec<FileNode>>;
}
