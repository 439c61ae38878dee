use std::sync::Arc;

use chrono::Utc;
use grouper_core::{JoinRequest, RequestId, RequestStatus, Requester, Stored, UserId};
use tracing::info;

use super::deny::set_status;
use crate::Result;
use crate::notify::NotificationDispatcher;
use crate::traits::RequestStore;
use crate::types::RequestEvent;

pub struct JoinGroupInput {
    pub approver: UserId,
    pub group_id: String,
    pub join_reason: Option<String>,
}

/// Requests to join an existing group. Joining touches only the store, so
/// none of these run as a transaction.
pub struct JoinGroupOperation<S> {
    store: Arc<S>,
    notifications: NotificationDispatcher,
}

impl<S> JoinGroupOperation<S>
where
    S: RequestStore<JoinRequest>,
{
    /// Create the operation over a join request store.
    pub fn new(store: Arc<S>, notifications: NotificationDispatcher) -> Self {
        Self {
            store,
            notifications,
        }
    }

    /// Stores a pending join request for `requester` and notifies the
    /// approver.
    ///
    /// # Errors
    ///
    /// Returns [`OperationError::DuplicateRequest`](crate::OperationError::DuplicateRequest)
    /// if the requester already asked this approver to join this group.
    pub async fn request(
        &self,
        requester: &Requester,
        input: JoinGroupInput,
    ) -> Result<Stored<JoinRequest>> {
        let request = JoinRequest {
            creator: requester.id.clone(),
            approver: input.approver,
            group_id: input.group_id,
            join_reason: input.join_reason,
            status: RequestStatus::Pending,
            created_at: Utc::now(),
        };

        let stored = self.store.insert(request).await?;
        info!(
            request_id = %stored.id,
            group_id = %stored.record.group_id,
            approver = %stored.record.approver,
            "join request awaiting approval"
        );
        self.notifications
            .dispatch(RequestEvent::JoinRequested(stored.clone()));
        Ok(stored)
    }

    /// # Errors
    ///
    /// Returns [`OperationError::RequestNotFound`](crate::OperationError::RequestNotFound)
    /// if no join request has this id.
    pub async fn approve(&self, id: RequestId) -> Result<Stored<JoinRequest>> {
        set_status(self.store.as_ref(), id, RequestStatus::Approved).await
    }

    /// # Errors
    ///
    /// Returns [`OperationError::RequestNotFound`](crate::OperationError::RequestNotFound)
    /// if no join request has this id.
    pub async fn deny(&self, id: RequestId) -> Result<Stored<JoinRequest>> {
        set_status(self.store.as_ref(), id, RequestStatus::Denied).await
    }
}
