use grouper_core::{CreateRequest, Stored};
use grouper_saga::{AuditLog, Executor, Transaction};
use indexmap::IndexMap;
use tracing::{debug, error, warn};

use crate::Result;
use crate::error::OperationError;
use crate::types::{ProvisionResponse, StepResponse};

pub(crate) type Responses = IndexMap<String, StepResponse>;

/// Runs a request transaction and logs how it ended.
pub(crate) async fn run(
    workflow: &'static str,
    transaction: Transaction<StepResponse, OperationError>,
) -> Result<Responses> {
    run_audited(workflow, transaction).await.0
}

/// Like [`run`], also handing back the per-step audit log.
///
/// A failed rollback is logged at error level once per failed undo, since
/// the store and the directory now disagree until someone intervenes. Both
/// failure logs carry the audit summary so the whole run reads in one line.
pub(crate) async fn run_audited(
    workflow: &'static str,
    transaction: Transaction<StepResponse, OperationError>,
) -> (Result<Responses>, AuditLog) {
    debug!(workflow, steps = ?transaction.step_ids(), "running request transaction");
    let (outcome, audit) = Executor::new().execute_with_audit(transaction).await;

    if let Some(failure) = outcome.failure() {
        let failed_step = failure.error_info().step_id();
        let cause = failure.error_info().error();
        if failure.compensation_failed() {
            for attempt in failure.undo_info().iter().filter(|a| !a.is_success()) {
                error!(
                    workflow,
                    failed_step,
                    cause = %cause,
                    compensation_step = attempt.step_id(),
                    compensation = attempt.description(),
                    error = attempt.error().map(ToString::to_string).unwrap_or_default(),
                    audit = %audit,
                    "compensation failed; manual reconciliation required"
                );
            }
        } else {
            warn!(
                workflow,
                failed_step,
                cause = %cause,
                compensated = failure.undo_info().len(),
                audit = %audit,
                "request transaction rolled back"
            );
        }
    }

    (outcome.into_result().map_err(OperationError::from), audit)
}

pub(crate) fn take_request(responses: &mut Responses, step: &str) -> Result<Stored<CreateRequest>> {
    match responses.swap_remove(step) {
        Some(StepResponse::Request(stored)) => Ok(stored),
        _ => Err(OperationError::UnexpectedResponse {
            step: step.to_string(),
        }),
    }
}

pub(crate) fn take_directory(responses: &mut Responses, step: &str) -> Result<ProvisionResponse> {
    responses
        .swap_remove(step)
        .and_then(StepResponse::into_directory)
        .ok_or_else(|| OperationError::UnexpectedResponse {
            step: step.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use grouper_saga::StepStatus;

    use super::*;
    use crate::mocks::{FlakyRequestStore, MockDirectory, pending_create_request};
    use crate::operations::steps::{self, GROUPS_CREATE_STEP, GroupSource, INSERT_STEP};
    use crate::providers::InMemoryRequestStore;
    use crate::traits::RequestStore;

    fn create_transaction<S>(
        store: &Arc<S>,
        directory: MockDirectory,
    ) -> anyhow::Result<Transaction<StepResponse, OperationError>>
    where
        S: RequestStore<CreateRequest> + 'static,
    {
        let request = pending_create_request();
        let group = request.group.clone();
        Ok(Transaction::builder()
            .step(steps::insert_request(Arc::clone(store), request))
            .step(steps::provision_group(
                Arc::new(directory),
                GroupSource::Given(group),
                Duration::from_secs(5),
            ))
            .build()?)
    }

    #[tokio::test]
    async fn audit_marks_every_step_completed_on_success() -> anyhow::Result<()> {
        let store = Arc::new(InMemoryRequestStore::new());
        let transaction = create_transaction(&store, MockDirectory::accepting())?;

        let (result, audit) = run_audited("create", transaction).await;

        let mut responses = result?;
        assert!(take_directory(&mut responses, GROUPS_CREATE_STEP)?.success);
        assert_eq!(audit.summary(), "insert=completed groupsCreate=completed");
        assert_eq!(
            audit.get(INSERT_STEP).and_then(|r| r.compensation()),
            Some("remove the inserted create request")
        );
        Ok(())
    }

    #[tokio::test]
    async fn audit_shows_rollback_of_insert() -> anyhow::Result<()> {
        let store = Arc::new(InMemoryRequestStore::new());
        let transaction = create_transaction(&store, MockDirectory::rejecting("taken"))?;

        let (result, audit) = run_audited("create", transaction).await;

        assert!(matches!(result, Err(OperationError::SagaFailed { .. })));
        assert_eq!(audit.summary(), "insert=compensated groupsCreate=failed");
        assert!(store.is_empty().await);
        Ok(())
    }

    #[tokio::test]
    async fn audit_shows_failed_compensation() -> anyhow::Result<()> {
        let store = Arc::new(FlakyRequestStore::new().failing_remove("connection reset"));
        let transaction = create_transaction(&store, MockDirectory::failing("unreachable"))?;

        let (result, audit) = run_audited("create", transaction).await;

        assert!(result.is_err_and(|err| err.requires_reconciliation()));
        assert_eq!(
            audit.status_of(INSERT_STEP),
            Some(StepStatus::CompensationFailed)
        );
        assert_eq!(store.len().await, 1);
        Ok(())
    }
}
