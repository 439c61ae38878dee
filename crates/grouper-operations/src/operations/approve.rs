use std::sync::Arc;
use std::time::Duration;

use grouper_core::{CreateRequest, RequestId};
use grouper_saga::Transaction;
use tracing::info;

use super::steps::{self, GROUPS_CREATE_STEP, GroupSource, SET_APPROVED_STEP};
use super::transaction;
use crate::Result;
use crate::notify::NotificationDispatcher;
use crate::traits::{DirectoryProvisioner, RequestStore};
use crate::types::{ProvisionResponse, RequestEvent};

/// Approves a pending create request and provisions its group.
pub struct ApproveCreateOperation<S, D> {
    store: Arc<S>,
    directory: Arc<D>,
    notifications: NotificationDispatcher,
    directory_timeout: Duration,
}

impl<S, D> ApproveCreateOperation<S, D>
where
    S: RequestStore<CreateRequest> + 'static,
    D: DirectoryProvisioner + 'static,
{
    /// Create the operation; `directory_timeout` bounds the provisioning call.
    pub fn new(
        store: Arc<S>,
        directory: Arc<D>,
        notifications: NotificationDispatcher,
        directory_timeout: Duration,
    ) -> Self {
        Self {
            store,
            directory,
            notifications,
            directory_timeout,
        }
    }

    /// # Errors
    ///
    /// Returns [`OperationError::SagaFailed`](crate::OperationError::SagaFailed)
    /// if the request does not exist or is no longer pending, in which case
    /// nothing is provisioned, or if the directory refuses the group, in
    /// which case the request is back to pending.
    pub async fn execute(&self, id: RequestId) -> Result<ProvisionResponse> {
        let transaction = Transaction::builder()
            .step(steps::set_approved(Arc::clone(&self.store), id))
            .step(steps::provision_group(
                Arc::clone(&self.directory),
                GroupSource::FromStep(SET_APPROVED_STEP),
                self.directory_timeout,
            ))
            .build()?;
        let mut responses = transaction::run("approve", transaction).await?;
        let stored = transaction::take_request(&mut responses, SET_APPROVED_STEP)?;
        let response = transaction::take_directory(&mut responses, GROUPS_CREATE_STEP)?;

        info!(request_id = %stored.id, approver = %stored.record.approver, "create request approved");
        self.notifications.dispatch(RequestEvent::GroupCreated {
            request_id: stored.id,
            group: stored.record.group,
            response: response.clone(),
        });
        Ok(response)
    }
}
