use async_trait::async_trait;
use grouper_core::{ApprovalRecord, RequestId, RequestStatus, Stored};

use crate::Result;
use crate::types::{RequestFilter, StatusTransition};

/// Persistence for one kind of request.
#[async_trait]
pub trait RequestStore<T: ApprovalRecord>: Send + Sync {
    /// Stores a new record and returns it with its assigned id.
    ///
    /// # Errors
    ///
    /// Returns [`OperationError::DuplicateRequest`](crate::OperationError::DuplicateRequest)
    /// when the store enforces uniqueness and an equivalent record exists.
    async fn insert(&self, record: T) -> Result<Stored<T>>;

    /// Sets the status of a record. Returns `None` if no record has this id.
    async fn update_status(
        &self,
        id: &RequestId,
        status: RequestStatus,
    ) -> Result<Option<Stored<T>>>;

    /// Sets the status of a record only if it currently is `from`.
    ///
    /// The check and the write happen atomically, so two concurrent
    /// transitions out of the same status cannot both apply.
    async fn transition(
        &self,
        id: &RequestId,
        from: RequestStatus,
        to: RequestStatus,
    ) -> Result<StatusTransition<T>>;

    /// Deletes a record. Returns `None` if no record has this id.
    async fn remove(&self, id: &RequestId) -> Result<Option<Stored<T>>>;

    /// Records matching the filter, oldest first.
    async fn find(&self, filter: &RequestFilter) -> Result<Vec<Stored<T>>>;
}
