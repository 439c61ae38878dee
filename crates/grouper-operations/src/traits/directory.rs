use async_trait::async_trait;
use grouper_core::GroupSpec;

use crate::Result;
use crate::types::ProvisionResponse;

/// The remote directory that owns the actual groups.
#[async_trait]
pub trait DirectoryProvisioner: Send + Sync {
    /// Asks the directory to create a group.
    ///
    /// A rejected request is an `Ok` response with `success == false`;
    /// `Err` is reserved for transport failures.
    async fn create_group(&self, group: &GroupSpec) -> Result<ProvisionResponse>;
}
