use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::CoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum GroupType {
    Distribution,
    Security,
}

impl GroupType {
    /// Lowest rank an approver must hold for this kind of group.
    #[must_use]
    pub fn minimum_approver_rank(self) -> &'static str {
        match self {
            Self::Distribution => "רסן",
            Self::Security => "סאל",
        }
    }
}

impl fmt::Display for GroupType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Distribution => "distribution",
            Self::Security => "security",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Classification {
    Blue,
    LimitedPurple,
    Administrative,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RequestStatus {
    Pending,
    Approved,
    Denied,
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Pending => "Pending",
            Self::Approved => "Approved",
            Self::Denied => "Denied",
        };
        write!(f, "{s}")
    }
}

/// Directory identifier of a person.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    /// Wrap a directory user id.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The raw id.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UserId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for UserId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Identifier assigned to a request when it is stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(Uuid);

impl RequestId {
    /// Generate a fresh random id.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// The underlying UUID.
    #[must_use]
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for RequestId {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|source| CoreError::InvalidRequestId {
                value: s.to_string(),
                source,
            })
    }
}

/// The group a create request asks for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupSpec {
    pub hierarchy: String,
    pub classification: Classification,
    pub owner: String,
    pub members: Vec<String>,
    #[serde(rename = "type")]
    pub group_type: GroupType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

impl GroupSpec {
    /// Checks the fields the directory service cannot accept empty.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidGroup`] naming the first offending field.
    pub fn validate(&self) -> crate::Result<()> {
        if self.hierarchy.trim().is_empty() {
            return Err(invalid("hierarchy", "must not be empty"));
        }
        if let Some(index) = self.members.iter().position(|m| m.trim().is_empty()) {
            return Err(invalid("members", format!("entry {index} is empty")));
        }
        if self
            .group_name
            .as_deref()
            .is_some_and(|name| name.trim().is_empty())
        {
            return Err(invalid("groupName", "must not be blank when given"));
        }
        if self
            .display_name
            .as_deref()
            .is_some_and(|name| name.trim().is_empty())
        {
            return Err(invalid("displayName", "must not be blank when given"));
        }
        Ok(())
    }

    /// Sets the owner and makes sure the owner is also a member.
    #[must_use]
    pub fn with_owner(mut self, owner: impl Into<String>) -> Self {
        let owner = owner.into();
        if !self.members.contains(&owner) {
            self.members.push(owner.clone());
        }
        self.owner = owner;
        self
    }
}

fn invalid(field: &'static str, reason: impl Into<String>) -> CoreError {
    CoreError::InvalidGroup {
        field,
        reason: reason.into(),
    }
}

/// The authenticated caller of a workflow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Requester {
    pub id: UserId,
    pub email: String,
    pub rank: String,
    pub hierarchy: Vec<String>,
}

impl Requester {
    /// Local part of the requester's email, used as the directory user name.
    #[must_use]
    pub fn domain_user(&self) -> &str {
        self.email
            .split_once('@')
            .map_or(self.email.as_str(), |(local, _)| local)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRequest {
    pub creator: UserId,
    pub approver: UserId,
    pub group: GroupSpec,
    pub status: RequestStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinRequest {
    pub creator: UserId,
    pub approver: UserId,
    pub group_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub join_reason: Option<String>,
    pub status: RequestStatus,
    pub created_at: DateTime<Utc>,
}

/// A request that moves through the approval workflow.
pub trait ApprovalRecord: Clone + Send + Sync + 'static {
    fn status(&self) -> RequestStatus;

    fn set_status(&mut self, status: RequestStatus);

    fn creator(&self) -> &UserId;

    fn approver(&self) -> &UserId;
}

impl ApprovalRecord for CreateRequest {
    fn status(&self) -> RequestStatus {
        self.status
    }

    fn set_status(&mut self, status: RequestStatus) {
        self.status = status;
    }

    fn creator(&self) -> &UserId {
        &self.creator
    }

    fn approver(&self) -> &UserId {
        &self.approver
    }
}

impl ApprovalRecord for JoinRequest {
    fn status(&self) -> RequestStatus {
        self.status
    }

    fn set_status(&mut self, status: RequestStatus) {
        self.status = status;
    }

    fn creator(&self) -> &UserId {
        &self.creator
    }

    fn approver(&self) -> &UserId {
        &self.approver
    }
}

/// A record together with the id the store assigned to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stored<T> {
    pub id: RequestId,
    #[serde(flatten)]
    pub record: T,
}
