//! Access-list aggregation.
//!
//! A node is reachable through shares on itself and on any ancestor
//! folder, across every registered provider. The aggregation unions the
//! per-provider results and always includes the owning account.

use sharehub_core::result::AppResult;
use sharehub_core::types::id::NodeId;
use sharehub_provider::provider::{AccessEntry, AccessList};

use super::manager::ShareManager;

impl ShareManager {
    /// Aggregate every identity able to reach a node through any share.
    ///
    /// With `recursive`, shares on the node's ancestor folders are
    /// included. With `current_access`, each recipient's effective entry
    /// path is resolved through group membership and overrides instead
    /// of a static is-shared flag.
    pub async fn get_access_list(
        &self,
        node_id: NodeId,
        recursive: bool,
        current_access: bool,
    ) -> AppResult<AccessList> {
        let Some(node) = self.nodes.resolve(node_id).await? else {
            return Ok(AccessList::new());
        };
        let owner = node.owner.clone();
        if !self.identity.user_exists(&owner).await? {
            return Ok(AccessList::new());
        }

        let mut list = AccessList::new();
        let owner_entry = current_access.then(|| AccessEntry {
            node_id: node.id,
            path: node.path.clone(),
        });
        list.add_user(owner.clone(), owner_entry);

        let mut nodes = vec![node.id];
        if recursive {
            let ancestors = self.nodes.ancestors(&owner, node_id).await?;
            nodes.extend(ancestors.iter().map(|a| a.id));
        }

        for provider in self.registry.all() {
            let partial = provider.get_access_list(&nodes, current_access).await?;
            list.merge(partial);
        }

        Ok(list)
    }
}
