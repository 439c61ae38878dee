use async_trait::async_trait;
use grouper_core::{GroupType, UserId};

use crate::Result;
use crate::types::Approver;

/// Decides whether someone may approve a request for a group type.
#[async_trait]
pub trait ApproverValidator: Send + Sync {
    async fn is_valid_approver(&self, approver: &UserId, group_type: GroupType) -> Result<bool>;
}

/// Looks up the people configured as default approvers.
#[async_trait]
pub trait DefaultApproverSource: Send + Sync {
    async fn fetch(&self, id: &UserId) -> Result<Approver>;
}
