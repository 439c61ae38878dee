use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use grouper_core::{CreateRequest, GroupSpec, RequestId, RequestStatus, Stored};
use grouper_saga::{ExecutionContext, Step, StepAction, StepUndo};
use tracing::debug;

use crate::Result;
use crate::error::OperationError;
use crate::traits::{DirectoryProvisioner, RequestStore};
use crate::types::{StatusTransition, StepResponse};

pub(crate) const INSERT_STEP: &str = "insert";
pub(crate) const SET_APPROVED_STEP: &str = "setApproved";
pub(crate) const GROUPS_CREATE_STEP: &str = "groupsCreate";

pub(crate) type RequestStep = Step<StepResponse, OperationError>;

fn stored_request<'a>(
    step: &str,
    response: &'a StepResponse,
) -> Result<&'a Stored<CreateRequest>> {
    response
        .as_request()
        .ok_or_else(|| OperationError::UnexpectedResponse {
            step: step.to_string(),
        })
}

struct InsertRequest<S> {
    store: Arc<S>,
    request: CreateRequest,
}

#[async_trait]
impl<S> StepAction<StepResponse, OperationError> for InsertRequest<S>
where
    S: RequestStore<CreateRequest> + 'static,
{
    async fn execute(&self, _ctx: &ExecutionContext<StepResponse>) -> Result<StepResponse> {
        let stored = self.store.insert(self.request.clone()).await?;
        debug!(
            request_id = %stored.id,
            status = %stored.record.status,
            creator = %stored.record.creator,
            "inserted create request"
        );
        Ok(StepResponse::Request(stored))
    }
}

struct RemoveInsertedRequest<S> {
    store: Arc<S>,
}

#[async_trait]
impl<S> StepUndo<StepResponse, OperationError> for RemoveInsertedRequest<S>
where
    S: RequestStore<CreateRequest> + 'static,
{
    async fn compensate(
        &self,
        _ctx: &ExecutionContext<StepResponse>,
        output: &StepResponse,
    ) -> Result<()> {
        let stored = stored_request(INSERT_STEP, output)?;
        debug!(request_id = %stored.id, "removing inserted create request");
        if self.store.remove(&stored.id).await?.is_none() {
            debug!(request_id = %stored.id, "inserted request was already gone");
        }
        Ok(())
    }

    fn description(&self) -> Option<String> {
        Some("remove the inserted create request".to_string())
    }
}

/// Persists the request. Undone by deleting the record it created.
pub(crate) fn insert_request<S>(store: Arc<S>, request: CreateRequest) -> RequestStep
where
    S: RequestStore<CreateRequest> + 'static,
{
    Step::new(
        INSERT_STEP,
        InsertRequest {
            store: Arc::clone(&store),
            request,
        },
    )
    .with_undo(RemoveInsertedRequest { store })
}

/// Moves `id` from `from` to `to`, turning anything but an applied change
/// into a step error.
async fn transition<S>(
    store: &S,
    id: RequestId,
    from: RequestStatus,
    to: RequestStatus,
) -> Result<Stored<CreateRequest>>
where
    S: RequestStore<CreateRequest> + ?Sized,
{
    match store.transition(&id, from, to).await? {
        StatusTransition::Applied(stored) => Ok(stored),
        StatusTransition::NotFound => Err(OperationError::RequestNotFound(id)),
        StatusTransition::Conflict { current } => Err(OperationError::StatusConflict {
            id,
            expected: from,
            actual: current,
        }),
    }
}

struct SetApproved<S> {
    store: Arc<S>,
    id: RequestId,
}

#[async_trait]
impl<S> StepAction<StepResponse, OperationError> for SetApproved<S>
where
    S: RequestStore<CreateRequest> + 'static,
{
    async fn execute(&self, _ctx: &ExecutionContext<StepResponse>) -> Result<StepResponse> {
        let stored = transition(
            self.store.as_ref(),
            self.id,
            RequestStatus::Pending,
            RequestStatus::Approved,
        )
        .await?;
        debug!(request_id = %stored.id, "approved create request");
        Ok(StepResponse::Request(stored))
    }
}

struct RevertToPending<S> {
    store: Arc<S>,
}

#[async_trait]
impl<S> StepUndo<StepResponse, OperationError> for RevertToPending<S>
where
    S: RequestStore<CreateRequest> + 'static,
{
    async fn compensate(
        &self,
        _ctx: &ExecutionContext<StepResponse>,
        output: &StepResponse,
    ) -> Result<()> {
        let stored = stored_request(SET_APPROVED_STEP, output)?;
        debug!(request_id = %stored.id, "reverting create request to pending");
        transition(
            self.store.as_ref(),
            stored.id,
            RequestStatus::Approved,
            RequestStatus::Pending,
        )
        .await?;
        Ok(())
    }

    fn description(&self) -> Option<String> {
        Some("revert the request status to Pending".to_string())
    }
}

/// Marks a pending request approved. Undone by putting it back to pending,
/// provided nothing else changed it in between.
pub(crate) fn set_approved<S>(store: Arc<S>, id: RequestId) -> RequestStep
where
    S: RequestStore<CreateRequest> + 'static,
{
    Step::new(
        SET_APPROVED_STEP,
        SetApproved {
            store: Arc::clone(&store),
            id,
        },
    )
    .with_undo(RevertToPending { store })
}

/// Where the provisioning step finds the group to create.
pub(crate) enum GroupSource {
    Given(GroupSpec),
    /// The request returned by an earlier step.
    FromStep(&'static str),
}

struct ProvisionGroup<D> {
    directory: Arc<D>,
    source: GroupSource,
    timeout: Duration,
}

impl<D> ProvisionGroup<D> {
    fn group(&self, ctx: &ExecutionContext<StepResponse>) -> Result<GroupSpec> {
        match &self.source {
            GroupSource::Given(group) => Ok(group.clone()),
            GroupSource::FromStep(step) => {
                let response = ctx.get(step).ok_or_else(|| OperationError::UnexpectedResponse {
                    step: (*step).to_string(),
                })?;
                Ok(stored_request(step, response)?.record.group.clone())
            }
        }
    }
}

#[async_trait]
impl<D> StepAction<StepResponse, OperationError> for ProvisionGroup<D>
where
    D: DirectoryProvisioner + 'static,
{
    async fn execute(&self, ctx: &ExecutionContext<StepResponse>) -> Result<StepResponse> {
        let group = self.group(ctx)?;
        let response = tokio::time::timeout(self.timeout, self.directory.create_group(&group))
            .await
            .map_err(|_| OperationError::DirectoryTimeout {
                timeout: self.timeout,
            })??;

        if !response.success {
            return Err(OperationError::ProvisioningRejected {
                message: response.message.unwrap_or_default(),
            });
        }
        debug!(
            group_type = %group.group_type,
            group_id = response.group_id.as_deref().unwrap_or("-"),
            "directory created group"
        );
        Ok(StepResponse::Directory(response))
    }
}

/// Creates the group in the directory. Irreversible; a call that outlives
/// `timeout` counts as a failure.
pub(crate) fn provision_group<D>(
    directory: Arc<D>,
    source: GroupSource,
    timeout: Duration,
) -> RequestStep
where
    D: DirectoryProvisioner + 'static,
{
    Step::new(
        GROUPS_CREATE_STEP,
        ProvisionGroup {
            directory,
            source,
            timeout,
        },
    )
}
