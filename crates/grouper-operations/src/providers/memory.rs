use async_trait::async_trait;
use grouper_core::{ApprovalRecord, JoinRequest, RequestId, RequestStatus, Stored};
use indexmap::IndexMap;
use tokio::sync::RwLock;
use tracing::debug;

use crate::Result;
use crate::error::OperationError;
use crate::traits::RequestStore;
use crate::types::{RequestFilter, StatusTransition};

type UniqueKey<T> = Box<dyn Fn(&T) -> String + Send + Sync>;

/// Request store kept in process memory, in insertion order.
pub struct InMemoryRequestStore<T> {
    records: RwLock<IndexMap<RequestId, T>>,
    unique_key: Option<UniqueKey<T>>,
}

impl<T: ApprovalRecord> Default for InMemoryRequestStore<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: ApprovalRecord> InMemoryRequestStore<T> {
    /// Create an empty store without a uniqueness rule.
    #[must_use]
    pub fn new() -> Self {
        Self {
            records: RwLock::new(IndexMap::new()),
            unique_key: None,
        }
    }

    /// Rejects inserts whose key equals the key of a stored record.
    #[must_use]
    pub fn with_unique_key<F>(key: F) -> Self
    where
        F: Fn(&T) -> String + Send + Sync + 'static,
    {
        Self {
            records: RwLock::new(IndexMap::new()),
            unique_key: Some(Box::new(key)),
        }
    }

    /// Look up a record by id.
    pub async fn get(&self, id: &RequestId) -> Option<Stored<T>> {
        self.records.read().await.get(id).map(|record| Stored {
            id: *id,
            record: record.clone(),
        })
    }

    /// Number of stored records.
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

impl InMemoryRequestStore<JoinRequest> {
    /// One join request per creator, approver and group.
    #[must_use]
    pub fn for_join_requests() -> Self {
        Self::with_unique_key(|request: &JoinRequest| {
            format!(
                "{}\u{1f}{}\u{1f}{}",
                request.creator, request.approver, request.group_id
            )
        })
    }
}

#[async_trait]
impl<T: ApprovalRecord> RequestStore<T> for InMemoryRequestStore<T> {
    async fn insert(&self, record: T) -> Result<Stored<T>> {
        let mut records = self.records.write().await;
        if let Some(key_of) = &self.unique_key {
            let key = key_of(&record);
            if records.values().any(|existing| key_of(existing) == key) {
                return Err(OperationError::DuplicateRequest {
                    creator: record.creator().clone(),
                    approver: record.approver().clone(),
                });
            }
        }
        let id = RequestId::new();
        records.insert(id, record.clone());
        debug!(request_id = %id, total = records.len(), "stored request");
        Ok(Stored { id, record })
    }

    async fn update_status(
        &self,
        id: &RequestId,
        status: RequestStatus,
    ) -> Result<Option<Stored<T>>> {
        let mut records = self.records.write().await;
        Ok(records.get_mut(id).map(|record| {
            record.set_status(status);
            Stored {
                id: *id,
                record: record.clone(),
            }
        }))
    }

    async fn transition(
        &self,
        id: &RequestId,
        from: RequestStatus,
        to: RequestStatus,
    ) -> Result<StatusTransition<T>> {
        let mut records = self.records.write().await;
        let Some(record) = records.get_mut(id) else {
            return Ok(StatusTransition::NotFound);
        };
        let current = record.status();
        if current != from {
            return Ok(StatusTransition::Conflict { current });
        }
        record.set_status(to);
        Ok(StatusTransition::Applied(Stored {
            id: *id,
            record: record.clone(),
        }))
    }

    async fn remove(&self, id: &RequestId) -> Result<Option<Stored<T>>> {
        let mut records = self.records.write().await;
        Ok(records
            .shift_remove(id)
            .map(|record| Stored { id: *id, record }))
    }

    async fn find(&self, filter: &RequestFilter) -> Result<Vec<Stored<T>>> {
        let records = self.records.read().await;
        Ok(records
            .iter()
            .filter(|(_, record)| filter.matches(*record))
            .map(|(id, record)| Stored {
                id: *id,
                record: record.clone(),
            })
            .collect())
    }
}
