//! Shared fixtures for the manager test suites: an in-memory account
//! directory, an in-memory node tree, and a fully wired manager backed
//! by the in-memory share provider.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;

use sharehub_auth::password::Argon2Hasher;
use sharehub_auth::token::RandomTokenGenerator;
use sharehub_core::config::sharing::SharingPolicy;
use sharehub_core::result::AppResult;
use sharehub_core::traits::directory::{GroupResolver, IdentityResolver};
use sharehub_core::traits::node::{FileNode, NodeKind, NodeResolver};
use sharehub_core::types::id::{GroupId, NodeId, UserId};
use sharehub_core::types::permissions::SharePermissions;
use sharehub_entity::share::{Share, ShareType};
use sharehub_provider::memory::MemoryShareProvider;
use sharehub_provider::registry::ProviderRegistry;
use sharehub_service::ShareManager;

/// In-memory account and group directory.
#[derive(Default)]
pub struct InMemoryDirectory {
    users: Mutex<HashSet<String>>,
    groups: Mutex<HashMap<String, HashSet<String>>>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_user(&self, user: &str) {
        self.users
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(user.to_string());
    }

    /// Add a group and its members; members are created as users too.
    pub fn add_group(&self, group: &str, members: &[&str]) {
        for member in members {
            self.add_user(member);
        }
        self.groups
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(
                group.to_string(),
                members.iter().map(|m| m.to_string()).collect(),
            );
    }

    pub fn remove_from_group(&self, group: &str, member: &str) {
        if let Some(members) = self
            .groups
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get_mut(group)
        {
            members.remove(member);
        }
    }

    pub fn remove_group(&self, group: &str) {
        self.groups
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(group);
    }
}

#[async_trait]
impl IdentityResolver for InMemoryDirectory {
    async fn user_exists(&self, user: &UserId) -> AppResult<bool> {
        Ok(self
            .users
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(user.as_str()))
    }
}

#[async_trait]
impl GroupResolver for InMemoryDirectory {
    async fn group_exists(&self, group: &GroupId) -> AppResult<bool> {
        Ok(self
            .groups
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(group.as_str()))
    }

    async fn groups_of(&self, user: &UserId) -> AppResult<Vec<GroupId>> {
        Ok(self
            .groups
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|(_, members)| members.contains(user.as_str()))
            .map(|(group, _)| GroupId::new(group.clone()))
            .collect())
    }

    async fn is_member(&self, user: &UserId, group: &GroupId) -> AppResult<bool> {
        Ok(self
            .groups
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(group.as_str())
            .is_some_and(|members| members.contains(user.as_str())))
    }

    async fn members_of(&self, group: &GroupId) -> AppResult<Vec<UserId>> {
        let mut members: Vec<UserId> = self
            .groups
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(group.as_str())
            .map(|members| members.iter().map(|m| UserId::new(m.clone())).collect())
            .unwrap_or_default();
        members.sort();
        Ok(members)
    }
}

struct StoredNode {
    node: FileNode,
    parent: Option<i64>,
}

/// In-memory node tree with per-account permission views.
#[derive(Default)]
pub struct InMemoryTree {
    nodes: Mutex<HashMap<i64, StoredNode>>,
    views: Mutex<HashMap<(String, i64), SharePermissions>>,
}

impl InMemoryTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an account's root folder.
    pub fn add_root(&self, owner: &str, id: i64) {
        self.nodes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(
                id,
                StoredNode {
                    node: FileNode {
                        id: NodeId(id),
                        owner: UserId::new(owner),
                        kind: NodeKind::Folder,
                        name: String::new(),
                        path: "/".to_string(),
                        permissions: SharePermissions::ALL,
                    },
                    parent: None,
                },
            );
    }

    /// Add a node below an existing parent, with the owner's effective
    /// permissions.
    pub fn add_node(
        &self,
        id: i64,
        owner: &str,
        parent: i64,
        name: &str,
        kind: NodeKind,
        permissions: SharePermissions,
    ) {
        let mut nodes = self.nodes.lock().unwrap_or_else(PoisonError::into_inner);
        let parent_path = nodes
            .get(&parent)
            .map(|p| p.node.path.clone())
            .expect("parent node must exist");
        let path = if parent_path == "/" {
            format!("/{name}")
        } else {
            format!("{parent_path}/{name}")
        };
        nodes.insert(
            id,
            StoredNode {
                node: FileNode {
                    id: NodeId(id),
                    owner: UserId::new(owner),
                    kind,
                    name: name.to_string(),
                    path,
                    permissions,
                },
                parent: Some(parent),
            },
        );
    }

    /// Grant an account a view on a node with the given effective
    /// permissions.
    pub fn grant(&self, user: &str, id: i64, permissions: SharePermissions) {
        self.views
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert((user.to_string(), id), permissions);
    }

    /// Drop an account's view on a node.
    pub fn revoke(&self, user: &str, id: i64) {
        self.views
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&(user.to_string(), id));
    }
}

#[async_trait]
impl NodeResolver for InMemoryTree {
    async fn node_for_user(&self, user: &UserId, id: NodeId) -> AppResult<Option<FileNode>> {
        let nodes = self.nodes.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(stored) = nodes.get(&id.0) else {
            return Ok(None);
        };
        if stored.node.owner == *user {
            return Ok(Some(stored.node.clone()));
        }

        let views = self.views.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(views
            .get(&(user.as_str().to_string(), id.0))
            .map(|permissions| FileNode {
                permissions: *permissions,
                ..stored.node.clone()
            }))
    }

    async fn resolve(&self, id: NodeId) -> AppResult<Option<FileNode>> {
        let nodes = self.nodes.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(nodes.get(&id.0).map(|stored| stored.node.clone()))
    }

    async fn ancestors(&self, _user: &UserId, id: NodeId) -> AppResult<Vec<FileNode>> {
        let nodes = self.nodes.lock().unwrap_or_else(PoisonError::into_inner);
        let mut chain = Vec::new();
        let mut current = nodes.get(&id.0).and_then(|stored| stored.parent);
        while let Some(parent_id) = current {
            let Some(stored) = nodes.get(&parent_id) else {
                break;
            };
            if stored.node.is_root() {
                break;
            }
            chain.push(stored.node.clone());
            current = stored.parent;
        }
        Ok(chain)
    }
}

/// A fully wired manager over the in-memory provider and fixtures.
pub struct TestEnv {
    pub directory: Arc<InMemoryDirectory>,
    pub tree: Arc<InMemoryTree>,
    pub registry: Arc<ProviderRegistry>,
    pub provider: Arc<MemoryShareProvider>,
    pub manager: ShareManager,
}

impl TestEnv {
    pub fn new() -> Self {
        Self::with_policy(SharingPolicy::default())
    }

    pub fn with_policy(policy: SharingPolicy) -> Self {
        Self::build(policy, |manager| manager)
    }

    /// Build an environment, letting the caller attach guards,
    /// observers, or password rules to the manager.
    pub fn build(
        policy: SharingPolicy,
        configure: impl FnOnce(ShareManager) -> ShareManager,
    ) -> Self {
        let directory = Arc::new(InMemoryDirectory::new());
        let tree = Arc::new(InMemoryTree::new());
        let registry = Arc::new(ProviderRegistry::new());
        let provider = Arc::new(MemoryShareProvider::new(
            directory.clone() as Arc<dyn GroupResolver>
        ));
        registry
            .register(provider.clone())
            .expect("provider registration");

        let manager = ShareManager::new(
            registry.clone(),
            directory.clone(),
            directory.clone(),
            tree.clone(),
            Arc::new(Argon2Hasher::new()),
            Arc::new(RandomTokenGenerator::new()),
            policy,
        );

        Self {
            directory,
            tree,
            registry,
            provider,
            manager: configure(manager),
        }
    }

    /// Seed the common scenario: accounts a, b, c; group g0 with
    /// members u1 and u2; a's tree with folder /docs (node 2) and file
    /// /docs/notes.txt (node 3).
    pub fn seed(&self) {
        for user in ["a", "b", "c"] {
            self.directory.add_user(user);
        }
        self.directory.add_group("g0", &["u1", "u2"]);

        self.tree.add_root("a", 1);
        self.tree
            .add_node(2, "a", 1, "docs", NodeKind::Folder, SharePermissions::ALL);
        self.tree.add_node(
            3,
            "a",
            2,
            "notes.txt",
            NodeKind::File,
            SharePermissions::READ | SharePermissions::UPDATE | SharePermissions::SHARE,
        );
    }
}

pub fn user_share(by: &str, with: &str, node: i64, permissions: SharePermissions) -> Share {
    let mut share = Share::draft(ShareType::User, NodeId(node), NodeKind::File, UserId::new(by));
    share.shared_with = Some(with.to_string());
    share.permissions = permissions;
    share
}

pub fn group_share(by: &str, with: &str, node: i64, permissions: SharePermissions) -> Share {
    let mut share = Share::draft(
        ShareType::Group,
        NodeId(node),
        NodeKind::Folder,
        UserId::new(by),
    );
    share.shared_with = Some(with.to_string());
    share.permissions = permissions;
    share
}

pub fn link_share(by: &str, node: i64, permissions: SharePermissions) -> Share {
    let mut share = Share::draft(
        ShareType::Link,
        NodeId(node),
        NodeKind::Folder,
        UserId::new(by),
    );
    share.permissions = permissions;
    share
}

/// The full id of a persisted share.
pub fn full_id(share: &Share) -> String {
    share.full_id().expect("share should be persisted")
}
