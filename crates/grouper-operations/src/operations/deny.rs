use std::marker::PhantomData;
use std::sync::Arc;

use grouper_core::{ApprovalRecord, RequestId, RequestStatus, Stored};
use tracing::info;

use crate::Result;
use crate::error::OperationError;
use crate::traits::RequestStore;

/// Moves a stored record to `status`, failing if it does not exist.
pub(crate) async fn set_status<S, T>(
    store: &S,
    id: RequestId,
    status: RequestStatus,
) -> Result<Stored<T>>
where
    S: RequestStore<T> + ?Sized,
    T: ApprovalRecord,
{
    let stored = store
        .update_status(&id, status)
        .await?
        .ok_or(OperationError::RequestNotFound(id))?;
    info!(request_id = %id, %status, approver = %stored.record.approver(), "request status changed");
    Ok(stored)
}

/// Denies a create or join request. Nothing is provisioned, so there is
/// nothing to roll back.
pub struct DenyRequestOperation<S, T> {
    store: Arc<S>,
    _record: PhantomData<fn() -> T>,
}

impl<S, T> DenyRequestOperation<S, T>
where
    S: RequestStore<T>,
    T: ApprovalRecord,
{
    /// Create the operation over one request store.
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            _record: PhantomData,
        }
    }

    /// # Errors
    ///
    /// Returns [`OperationError::RequestNotFound`] if no record has this id.
    pub async fn execute(&self, id: RequestId) -> Result<Stored<T>> {
        set_status(self.store.as_ref(), id, RequestStatus::Denied).await
    }
}
