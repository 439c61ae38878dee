use std::collections::HashSet;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use grouper_core::{
    Classification, CreateRequest, GroupSpec, GroupType, JoinRequest, RequestId, RequestStatus,
    Requester, Stored, UserId,
};

use crate::Result;
use crate::error::OperationError;
use crate::providers::InMemoryRequestStore;
use crate::traits::{
    ApproverValidator, DefaultApproverSource, DirectoryProvisioner, Notifier, RequestStore,
};
use crate::types::{Approver, ProvisionResponse, RequestEvent, RequestFilter, StatusTransition};

#[must_use]
pub fn sample_group() -> GroupSpec {
    GroupSpec {
        hierarchy: "unit/branch/team".to_string(),
        classification: Classification::Blue,
        owner: "someone-else".to_string(),
        members: vec!["asmith".to_string()],
        group_type: GroupType::Distribution,
        group_name: Some("team-announcements".to_string()),
        display_name: None,
    }
}

#[must_use]
pub fn requester(rank: &str) -> Requester {
    Requester {
        id: UserId::from("requester-1"),
        email: "jdoe@example.org".to_string(),
        rank: rank.to_string(),
        hierarchy: vec!["unit".to_string(), "branch".to_string()],
    }
}

#[must_use]
pub fn pending_create_request() -> CreateRequest {
    CreateRequest {
        creator: UserId::from("requester-1"),
        approver: UserId::from("approver-1"),
        group: sample_group().with_owner("jdoe"),
        status: RequestStatus::Pending,
        created_at: Utc::now(),
    }
}

#[must_use]
pub fn sample_create_request() -> Stored<CreateRequest> {
    Stored {
        id: RequestId::new(),
        record: pending_create_request(),
    }
}

#[must_use]
pub fn pending_join_request(group_id: &str) -> JoinRequest {
    JoinRequest {
        creator: UserId::from("requester-1"),
        approver: UserId::from("approver-1"),
        group_id: group_id.to_string(),
        join_reason: None,
        status: RequestStatus::Pending,
        created_at: Utc::now(),
    }
}

enum DirectoryBehavior {
    Accept,
    Reject(String),
    Fail(String),
}

pub struct MockDirectory {
    behavior: DirectoryBehavior,
    delay: Option<Duration>,
    requested: Mutex<Vec<GroupSpec>>,
}

impl MockDirectory {
    fn with_behavior(behavior: DirectoryBehavior) -> Self {
        Self {
            behavior,
            delay: None,
            requested: Mutex::new(Vec::new()),
        }
    }

    #[must_use]
    pub fn accepting() -> Self {
        Self::with_behavior(DirectoryBehavior::Accept)
    }

    /// Answers with `success: false` and `message`.
    #[must_use]
    pub fn rejecting(message: &str) -> Self {
        Self::with_behavior(DirectoryBehavior::Reject(message.to_string()))
    }

    /// Fails the call itself, like a dropped connection.
    #[must_use]
    pub fn failing(message: &str) -> Self {
        Self::with_behavior(DirectoryBehavior::Fail(message.to_string()))
    }

    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn requested_groups(&self) -> Vec<GroupSpec> {
        self.requested.lock().expect("lock poisoned").clone()
    }
}

#[async_trait]
impl DirectoryProvisioner for MockDirectory {
    async fn create_group(&self, group: &GroupSpec) -> Result<ProvisionResponse> {
        let count = {
            let mut requested = self.requested.lock().expect("lock poisoned");
            requested.push(group.clone());
            requested.len()
        };
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        match &self.behavior {
            DirectoryBehavior::Accept => Ok(ProvisionResponse {
                success: true,
                message: None,
                group_id: Some(format!("group-{count}")),
            }),
            DirectoryBehavior::Reject(message) => Ok(ProvisionResponse {
                success: false,
                message: Some(message.clone()),
                group_id: None,
            }),
            DirectoryBehavior::Fail(message) => Err(OperationError::Directory(message.clone())),
        }
    }
}

pub struct MockNotifier {
    failure: Option<String>,
    attempts: AtomicUsize,
    events: Mutex<Vec<RequestEvent>>,
}

impl Default for MockNotifier {
    fn default() -> Self {
        Self::new()
    }
}

impl MockNotifier {
    #[must_use]
    pub fn new() -> Self {
        Self {
            failure: None,
            attempts: AtomicUsize::new(0),
            events: Mutex::new(Vec::new()),
        }
    }

    #[must_use]
    pub fn failing(message: &str) -> Self {
        Self {
            failure: Some(message.to_string()),
            ..Self::new()
        }
    }

    /// Events delivered successfully.
    pub fn events(&self) -> Vec<RequestEvent> {
        self.events.lock().expect("lock poisoned").clone()
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    /// Yields to the runtime until `expected` deliveries were attempted.
    /// Returns false if they never happen.
    pub async fn wait_for_attempts(&self, expected: usize) -> bool {
        for _ in 0..100 {
            if self.attempts() >= expected {
                return true;
            }
            tokio::task::yield_now().await;
        }
        self.attempts() >= expected
    }
}

#[async_trait]
impl Notifier for MockNotifier {
    async fn notify(&self, event: RequestEvent) -> Result<()> {
        let result = match &self.failure {
            Some(message) => Err(OperationError::Notification(message.clone())),
            None => {
                self.events.lock().expect("lock poisoned").push(event);
                Ok(())
            }
        };
        self.attempts.fetch_add(1, Ordering::SeqCst);
        result
    }
}

pub struct MockApproverValidator {
    valid: bool,
}

impl MockApproverValidator {
    #[must_use]
    pub fn new(valid: bool) -> Self {
        Self { valid }
    }
}

#[async_trait]
impl ApproverValidator for MockApproverValidator {
    async fn is_valid_approver(&self, _approver: &UserId, _group_type: GroupType) -> Result<bool> {
        Ok(self.valid)
    }
}

#[derive(Default)]
pub struct MockApproverSource {
    known: HashSet<String>,
    fetches: AtomicUsize,
}

impl MockApproverSource {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_approvers(mut self, ids: &[&str]) -> Self {
        self.known.extend(ids.iter().map(ToString::to_string));
        self
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DefaultApproverSource for MockApproverSource {
    async fn fetch(&self, id: &UserId) -> Result<Approver> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if !self.known.contains(id.as_str()) {
            return Err(OperationError::ApproverLookup(format!("no user with id {id}")));
        }
        Ok(Approver {
            id: id.clone(),
            full_name: format!("Approver {id}"),
            rank: Some("סאל".to_string()),
            hierarchy: vec!["unit".to_string()],
        })
    }
}

/// In-memory create request store whose writes can be made to fail.
pub struct FlakyRequestStore {
    inner: InMemoryRequestStore<CreateRequest>,
    remove_error: Option<String>,
    status_error: Option<(RequestStatus, String)>,
}

impl Default for FlakyRequestStore {
    fn default() -> Self {
        Self::new()
    }
}

impl FlakyRequestStore {
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: InMemoryRequestStore::new(),
            remove_error: None,
            status_error: None,
        }
    }

    #[must_use]
    pub fn failing_remove(mut self, message: &str) -> Self {
        self.remove_error = Some(message.to_string());
        self
    }

    /// Fails updates and transitions that set `status`; others go through.
    #[must_use]
    pub fn failing_status_update(mut self, status: RequestStatus, message: &str) -> Self {
        self.status_error = Some((status, message.to_string()));
        self
    }

    pub async fn get(&self, id: &RequestId) -> Option<Stored<CreateRequest>> {
        self.inner.get(id).await
    }

    pub async fn len(&self) -> usize {
        self.inner.len().await
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.is_empty().await
    }
}

#[async_trait]
impl RequestStore<CreateRequest> for FlakyRequestStore {
    async fn insert(&self, record: CreateRequest) -> Result<Stored<CreateRequest>> {
        self.inner.insert(record).await
    }

    async fn update_status(
        &self,
        id: &RequestId,
        status: RequestStatus,
    ) -> Result<Option<Stored<CreateRequest>>> {
        match &self.status_error {
            Some((failing, message)) if *failing == status => {
                Err(OperationError::Store(message.clone()))
            }
            _ => self.inner.update_status(id, status).await,
        }
    }

    async fn transition(
        &self,
        id: &RequestId,
        from: RequestStatus,
        to: RequestStatus,
    ) -> Result<StatusTransition<CreateRequest>> {
        match &self.status_error {
            Some((failing, message)) if *failing == to => {
                Err(OperationError::Store(message.clone()))
            }
            _ => self.inner.transition(id, from, to).await,
        }
    }

    async fn remove(&self, id: &RequestId) -> Result<Option<Stored<CreateRequest>>> {
        match &self.remove_error {
            Some(message) => Err(OperationError::Store(message.clone())),
            None => self.inner.remove(id).await,
        }
    }

    async fn find(&self, filter: &RequestFilter) -> Result<Vec<Stored<CreateRequest>>> {
        self.inner.find(filter).await
    }
}
