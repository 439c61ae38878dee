use grouper_core::{
    ApprovalRecord, CreateRequest, GroupSpec, JoinRequest, RequestId, RequestStatus, Stored, UserId,
};
use serde::{Deserialize, Serialize};

/// What the directory service answered to a provisioning call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProvisionResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_id: Option<String>,
}

/// A person the directory returned for a default approver id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Approver {
    pub id: UserId,
    pub full_name: String,
    #[serde(default)]
    pub rank: Option<String>,
    #[serde(default)]
    pub hierarchy: Vec<String>,
}

/// Result of one step in a group request transaction.
#[derive(Debug, Clone, PartialEq)]
pub enum StepResponse {
    Request(Stored<CreateRequest>),
    Directory(ProvisionResponse),
}

impl StepResponse {
    /// The stored request, if this step produced one.
    #[must_use]
    pub fn as_request(&self) -> Option<&Stored<CreateRequest>> {
        match self {
            Self::Request(stored) => Some(stored),
            Self::Directory(_) => None,
        }
    }

    /// The directory answer, if this step produced one.
    #[must_use]
    pub fn into_directory(self) -> Option<ProvisionResponse> {
        match self {
            Self::Directory(response) => Some(response),
            Self::Request(_) => None,
        }
    }
}

/// Events handed to the notifier once a workflow has finished.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestEvent {
    /// A create request now waits for its approver.
    CreateRequested(Stored<CreateRequest>),
    /// The directory accepted a new group.
    GroupCreated {
        request_id: RequestId,
        group: GroupSpec,
        response: ProvisionResponse,
    },
    /// A join request now waits for its approver.
    JoinRequested(Stored<JoinRequest>),
}

impl RequestEvent {
    /// Short name for logs.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::CreateRequested(_) => "create_requested",
            Self::GroupCreated { .. } => "group_created",
            Self::JoinRequested(_) => "join_requested",
        }
    }

    /// Id of the request the event is about.
    #[must_use]
    pub fn request_id(&self) -> RequestId {
        match self {
            Self::CreateRequested(stored) => stored.id,
            Self::GroupCreated { request_id, .. } => *request_id,
            Self::JoinRequested(stored) => stored.id,
        }
    }
}

/// What a conditional status change found.
#[derive(Debug, Clone, PartialEq)]
pub enum StatusTransition<T> {
    /// The record was in the expected status and now has the new one.
    Applied(Stored<T>),
    NotFound,
    /// The record exists but was not in the expected status; nothing changed.
    Conflict { current: RequestStatus },
}

/// Selects stored requests. Unset fields match anything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestFilter {
    pub creator: Option<UserId>,
    pub approver: Option<UserId>,
    pub status: Option<RequestStatus>,
}

impl RequestFilter {
    /// Requests submitted by `creator`.
    #[must_use]
    pub fn by_creator(creator: UserId) -> Self {
        Self {
            creator: Some(creator),
            ..Self::default()
        }
    }

    /// Requests addressed to `approver`.
    #[must_use]
    pub fn by_approver(approver: UserId) -> Self {
        Self {
            approver: Some(approver),
            ..Self::default()
        }
    }

    /// Narrow the filter to one status.
    #[must_use]
    pub fn with_status(mut self, status: RequestStatus) -> Self {
        self.status = Some(status);
        self
    }

    /// Whether `record` passes every set field.
    #[must_use]
    pub fn matches<T: ApprovalRecord>(&self, record: &T) -> bool {
        self.creator.as_ref().is_none_or(|c| c == record.creator())
            && self.approver.as_ref().is_none_or(|a| a == record.approver())
            && self.status.is_none_or(|s| s == record.status())
    }
}
