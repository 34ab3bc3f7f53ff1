pub mod file;

#[cfg(test)]
use mockall::automock;

use crate::{
    error::StoreError,
    policy::model::{GatewayInfo, PolicyResource},
    tree::PatchTree,
};

pub use file::FileStore;

/// Hierarchical policy store that only accepts whole-subtree patches
#[cfg_attr(test, automock)]
pub trait PolicyStore {
    /// Current gateway policy with its revision; `NotFound` when absent
    fn fetch_policy(&self, domain: &str, id: &str) -> Result<PolicyResource, StoreError>;

    /// Tier-0 gateway attributes used to derive its default rule
    fn fetch_gateway(&self, domain: &str, gateway_id: &str) -> Result<GatewayInfo, StoreError>;

    /// Apply a patch tree atomically; `Conflict` when its revision is stale
    fn submit_tree(&self, tree: &PatchTree) -> Result<(), StoreError>;
}
