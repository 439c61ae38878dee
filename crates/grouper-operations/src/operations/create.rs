use std::sync::Arc;

use chrono::Utc;
use grouper_core::{
    CreateRequest, GroupSpec, GrouperConfig, RequestId, RequestStatus, Requester, Stored, UserId,
};
use grouper_saga::Transaction;
use tracing::{debug, info};

use super::steps::{self, GROUPS_CREATE_STEP, GroupSource, INSERT_STEP};
use super::transaction;
use crate::Result;
use crate::error::OperationError;
use crate::notify::NotificationDispatcher;
use crate::traits::{ApproverValidator, DirectoryProvisioner, RequestStore};
use crate::types::{ProvisionResponse, RequestEvent};

pub struct CreateGroupInput {
    pub approver: UserId,
    pub group: GroupSpec,
}

#[derive(Debug)]
pub enum CreateGroupOutcome {
    /// The requester may create groups directly; the directory already has it.
    Provisioned {
        request_id: RequestId,
        response: ProvisionResponse,
    },
    /// The request is stored and waits for the approver.
    PendingApproval(Stored<CreateRequest>),
}

pub struct CreateGroupOperation<S, D, V> {
    store: Arc<S>,
    directory: Arc<D>,
    validator: V,
    notifications: NotificationDispatcher,
    config: Arc<GrouperConfig>,
}

impl<S, D, V> CreateGroupOperation<S, D, V>
where
    S: RequestStore<CreateRequest> + 'static,
    D: DirectoryProvisioner + 'static,
    V: ApproverValidator,
{
    /// Create the operation from its collaborators.
    pub fn new(
        store: Arc<S>,
        directory: Arc<D>,
        validator: V,
        notifications: NotificationDispatcher,
        config: Arc<GrouperConfig>,
    ) -> Self {
        Self {
            store,
            directory,
            validator,
            notifications,
            config,
        }
    }

    /// Submits a group creation request on behalf of `requester`.
    ///
    /// The requester becomes the creator and the group owner. Requesters with
    /// an auto-approved rank get the group provisioned immediately; everyone
    /// else gets a pending request addressed to `input.approver`.
    ///
    /// # Errors
    ///
    /// Returns an error if the group is malformed, the approver is not allowed
    /// to approve this kind of group, or the store or directory fails. A
    /// failed provisioning removes the stored request again before returning.
    pub async fn execute(
        &self,
        requester: &Requester,
        input: CreateGroupInput,
    ) -> Result<CreateGroupOutcome> {
        input.group.validate()?;
        let group = input.group.with_owner(requester.domain_user());
        let request = CreateRequest {
            creator: requester.id.clone(),
            approver: input.approver,
            group,
            status: RequestStatus::Pending,
            created_at: Utc::now(),
        };

        if self.config.is_auto_approved(&requester.rank) {
            debug!(creator = %request.creator, rank = %requester.rank, "rank is auto-approved");
            self.create_immediately(request).await
        } else {
            self.request_approval(request).await
        }
    }

    async fn create_immediately(&self, mut request: CreateRequest) -> Result<CreateGroupOutcome> {
        request.status = RequestStatus::Approved;
        let group = request.group.clone();

        let transaction = Transaction::builder()
            .step(steps::insert_request(Arc::clone(&self.store), request))
            .step(steps::provision_group(
                Arc::clone(&self.directory),
                GroupSource::Given(group.clone()),
                self.config.directory().timeout(),
            ))
            .build()?;
        let mut responses = transaction::run("create", transaction).await?;
        let stored = transaction::take_request(&mut responses, INSERT_STEP)?;
        let response = transaction::take_directory(&mut responses, GROUPS_CREATE_STEP)?;

        info!(request_id = %stored.id, creator = %stored.record.creator, "group created");
        self.notifications.dispatch(RequestEvent::GroupCreated {
            request_id: stored.id,
            group,
            response: response.clone(),
        });
        Ok(CreateGroupOutcome::Provisioned {
            request_id: stored.id,
            response,
        })
    }

    async fn request_approval(&self, request: CreateRequest) -> Result<CreateGroupOutcome> {
        let group_type = request.group.group_type;
        if !self
            .validator
            .is_valid_approver(&request.approver, group_type)
            .await?
        {
            return Err(OperationError::InvalidApprover {
                approver: request.approver,
                minimum_rank: group_type.minimum_approver_rank(),
            });
        }

        let stored = self.store.insert(request).await?;
        info!(
            request_id = %stored.id,
            approver = %stored.record.approver,
            "create request awaiting approval"
        );
        self.notifications
            .dispatch(RequestEvent::CreateRequested(stored.clone()));
        Ok(CreateGroupOutcome::PendingApproval(stored))
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use grouper_core::{GroupType, RequestStatus};

    use super::*;
    use crate::mocks::{
        FlakyRequestStore, MockApproverValidator, MockDirectory, MockNotifier, requester,
        sample_group,
    };
    use crate::providers::InMemoryRequestStore;

    struct Harness<S> {
        store: Arc<S>,
        directory: Arc<MockDirectory>,
        notifier: Arc<MockNotifier>,
        operation: CreateGroupOperation<S, MockDirectory, MockApproverValidator>,
    }

    fn harness<S>(store: S, directory: MockDirectory, approver_valid: bool) -> Harness<S>
    where
        S: RequestStore<CreateRequest> + 'static,
    {
        let store = Arc::new(store);
        let directory = Arc::new(directory);
        let notifier = Arc::new(MockNotifier::new());
        let config = GrouperConfig::default()
            .with_auto_approve_ranks(&["סאל"])
            .with_directory_timeout(Duration::from_secs(5));
        let operation = CreateGroupOperation::new(
            Arc::clone(&store),
            Arc::clone(&directory),
            MockApproverValidator::new(approver_valid),
            NotificationDispatcher::new(notifier.clone()),
            Arc::new(config),
        );
        Harness {
            store,
            directory,
            notifier,
            operation,
        }
    }

    fn input() -> CreateGroupInput {
        CreateGroupInput {
            approver: UserId::from("approver-1"),
            group: sample_group(),
        }
    }

    #[tokio::test]
    async fn auto_approved_rank_provisions_and_keeps_record() -> anyhow::Result<()> {
        let h = harness(InMemoryRequestStore::new(), MockDirectory::accepting(), false);

        let outcome = h.operation.execute(&requester("סאל"), input()).await?;

        let CreateGroupOutcome::Provisioned { request_id, response } = outcome else {
            panic!("expected provisioned outcome");
        };
        assert!(response.success);
        let stored = h.store.get(&request_id).await.expect("record kept");
        assert_eq!(stored.record.status, RequestStatus::Approved);
        assert_eq!(stored.record.creator, UserId::from("requester-1"));
        assert_eq!(stored.record.group.owner, "jdoe");
        assert!(stored.record.group.members.contains(&"jdoe".to_string()));
        assert!(h.notifier.wait_for_attempts(1).await);
        assert_eq!(h.notifier.events()[0].kind(), "group_created");
        Ok(())
    }

    #[tokio::test]
    async fn rejected_provisioning_removes_inserted_record() {
        let h = harness(
            InMemoryRequestStore::new(),
            MockDirectory::rejecting("group name already exists"),
            false,
        );

        let err = h
            .operation
            .execute(&requester("סאל"), input())
            .await
            .expect_err("directory rejected");

        match &err {
            OperationError::SagaFailed {
                step,
                source,
                compensated,
            } => {
                assert_eq!(step, "groupsCreate");
                assert!(matches!(**source, OperationError::ProvisioningRejected { .. }));
                assert_eq!(compensated, &vec!["insert".to_string()]);
            }
            other => panic!("expected SagaFailed, got {other:?}"),
        }
        assert!(!err.requires_reconciliation());
        assert!(h.store.is_empty().await);
        assert!(!h.notifier.wait_for_attempts(1).await);
    }

    #[tokio::test]
    async fn failed_removal_is_reported_as_compensation_failure() {
        let h = harness(
            FlakyRequestStore::new().failing_remove("connection reset"),
            MockDirectory::failing("directory unreachable"),
            false,
        );

        let err = h
            .operation
            .execute(&requester("סאל"), input())
            .await
            .expect_err("directory failed");

        assert!(err.requires_reconciliation());
        let OperationError::SagaCompensationFailed {
            step,
            compensation_failures,
            ..
        } = err
        else {
            panic!("expected SagaCompensationFailed");
        };
        assert_eq!(step, "groupsCreate");
        assert_eq!(compensation_failures.len(), 1);
        assert_eq!(compensation_failures[0].step, "insert");
        assert_eq!(
            compensation_failures[0].description,
            "remove the inserted create request"
        );
        assert_eq!(h.store.len().await, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn directory_timeout_rolls_back() {
        let h = harness(
            InMemoryRequestStore::new(),
            MockDirectory::accepting().with_delay(Duration::from_secs(60)),
            false,
        );

        let err = h
            .operation
            .execute(&requester("סאל"), input())
            .await
            .expect_err("timed out");

        let OperationError::SagaFailed { source, .. } = err else {
            panic!("expected SagaFailed");
        };
        assert!(matches!(*source, OperationError::DirectoryTimeout { .. }));
        assert!(h.store.is_empty().await);
    }

    #[tokio::test]
    async fn other_ranks_get_pending_request() -> anyhow::Result<()> {
        let h = harness(InMemoryRequestStore::new(), MockDirectory::accepting(), true);

        let outcome = h.operation.execute(&requester("rookie"), input()).await?;

        let CreateGroupOutcome::PendingApproval(stored) = outcome else {
            panic!("expected pending request");
        };
        assert_eq!(stored.record.status, RequestStatus::Pending);
        assert!(h.directory.requested_groups().is_empty());
        assert!(h.notifier.wait_for_attempts(1).await);
        assert_eq!(h.notifier.events()[0].kind(), "create_requested");
        Ok(())
    }

    #[tokio::test]
    async fn invalid_approver_names_minimum_rank() {
        let h = harness(InMemoryRequestStore::new(), MockDirectory::accepting(), false);
        let mut input = input();
        input.group.group_type = GroupType::Security;

        let err = h
            .operation
            .execute(&requester("rookie"), input)
            .await
            .expect_err("invalid approver");

        assert!(matches!(
            err,
            OperationError::InvalidApprover {
                minimum_rank: "סאל",
                ..
            }
        ));
        assert!(h.store.is_empty().await);
    }

    #[tokio::test]
    async fn malformed_group_is_rejected_before_anything_runs() {
        let h = harness(InMemoryRequestStore::new(), MockDirectory::accepting(), true);
        let mut input = input();
        input.group.hierarchy = String::new();

        let err = h
            .operation
            .execute(&requester("סאל"), input)
            .await
            .expect_err("invalid group");

        assert!(matches!(err, OperationError::Core(_)));
        assert!(h.directory.requested_groups().is_empty());
        assert!(h.store.is_empty().await);
    }
}
