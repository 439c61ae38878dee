use std::marker::PhantomData;
use std::sync::Arc;

use grouper_core::{ApprovalRecord, RequestStatus, Stored, UserId};

use crate::Result;
use crate::traits::RequestStore;
use crate::types::RequestFilter;

/// Read-only queries over one kind of request.
pub struct ListRequestsOperation<S, T> {
    store: Arc<S>,
    _record: PhantomData<fn() -> T>,
}

impl<S, T> ListRequestsOperation<S, T>
where
    S: RequestStore<T>,
    T: ApprovalRecord,
{
    /// Create the queries over one request store.
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            _record: PhantomData,
        }
    }

    /// Everything `creator` has asked for, in any status.
    pub async fn by_creator(&self, creator: &UserId) -> Result<Vec<Stored<T>>> {
        self.store
            .find(&RequestFilter::by_creator(creator.clone()))
            .await
    }

    /// Everything addressed to `approver`, in any status.
    pub async fn by_approver(&self, approver: &UserId) -> Result<Vec<Stored<T>>> {
        self.store
            .find(&RequestFilter::by_approver(approver.clone()))
            .await
    }

    /// Requests still waiting for `approver`.
    pub async fn pending_for_approver(&self, approver: &UserId) -> Result<Vec<Stored<T>>> {
        self.store
            .find(&RequestFilter::by_approver(approver.clone()).with_status(RequestStatus::Pending))
            .await
    }
}
