use std::sync::Arc;

use async_trait::async_trait;
use grouper_core::{ApproverCacheConfig, GroupType, UserId};
use tokio::sync::{Mutex, RwLock, broadcast};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::Result;
use crate::traits::{ApproverValidator, DefaultApproverSource};
use crate::types::Approver;

struct Snapshot {
    approvers: Vec<Approver>,
    loaded_at: Instant,
}

struct Shared<S> {
    source: Arc<S>,
    ids: Vec<UserId>,
    config: ApproverCacheConfig,
    snapshot: RwLock<Option<Snapshot>>,
}

impl<S: DefaultApproverSource> Shared<S> {
    async fn reload(&self) -> usize {
        let mut approvers = Vec::with_capacity(self.ids.len());
        for id in &self.ids {
            match self.source.fetch(id).await {
                Ok(approver) => approvers.push(approver),
                Err(err) => {
                    warn!(approver_id = %id, error = %err, "failed to load default approver");
                }
            }
        }

        let loaded = approvers.len();
        *self.snapshot.write().await = Some(Snapshot {
            approvers,
            loaded_at: Instant::now(),
        });
        debug!(loaded, configured = self.ids.len(), "refreshed default approvers");
        loaded
    }
}

/// Default approvers loaded from the directory and refreshed on an interval.
///
/// Built with [`initialize`](Self::initialize), which performs the first load
/// and starts the refresh task, and torn down with
/// [`shutdown`](Self::shutdown). A snapshot older than the configured
/// staleness window is treated as empty.
pub struct DefaultApproverCache<S> {
    shared: Arc<Shared<S>>,
    shutdown_tx: broadcast::Sender<()>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl<S> DefaultApproverCache<S>
where
    S: DefaultApproverSource + 'static,
{
    /// Load every configured approver once, then start the refresh task.
    pub async fn initialize(source: Arc<S>, ids: Vec<UserId>, config: ApproverCacheConfig) -> Self {
        let shared = Arc::new(Shared {
            source,
            ids,
            config,
            snapshot: RwLock::new(None),
        });
        shared.reload().await;

        let (shutdown_tx, mut shutdown_rx) = broadcast::channel(1);
        let task_shared = Arc::clone(&shared);
        let interval = config.refresh_interval();
        let handle = tokio::spawn(async move {
            loop {
                tokio::select! {
                    () = tokio::time::sleep(interval) => {
                        task_shared.reload().await;
                    }
                    _ = shutdown_rx.recv() => {
                        debug!("stopping default approver refresh");
                        break;
                    }
                }
            }
        });

        info!(
            configured = shared.ids.len(),
            refresh_secs = interval.as_secs(),
            "default approver cache started"
        );
        Self {
            shared,
            shutdown_tx,
            handle: Mutex::new(Some(handle)),
        }
    }

    /// Reloads every configured approver now. Returns how many were loaded.
    pub async fn refresh(&self) -> usize {
        self.shared.reload().await
    }

    /// The cached approvers, or nothing if the last load is too old.
    pub async fn snapshot(&self) -> Vec<Approver> {
        let snapshot = self.shared.snapshot.read().await;
        match snapshot.as_ref() {
            Some(s) if s.loaded_at.elapsed() <= self.shared.config.max_staleness() => {
                s.approvers.clone()
            }
            Some(s) => {
                warn!(
                    age_secs = s.loaded_at.elapsed().as_secs(),
                    "default approver snapshot is stale"
                );
                Vec::new()
            }
            None => Vec::new(),
        }
    }

    /// Whether `id` is a default approver in the current snapshot.
    pub async fn contains(&self, id: &UserId) -> bool {
        self.snapshot()
            .await
            .iter()
            .any(|approver| approver.id == *id)
    }

    /// Whether the refresh task is still alive.
    pub async fn is_running(&self) -> bool {
        self.handle
            .lock()
            .await
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Stops the refresh task and waits for it to exit. Calling it again is a
    /// no-op.
    pub async fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());
        if let Some(handle) = self.handle.lock().await.take() {
            if let Err(err) = handle.await {
                warn!(error = %err, "default approver refresh task failed");
            }
            info!("default approver cache stopped");
        }
    }
}

/// Accepts cached default approvers for any group and asks `inner` about
/// everyone else.
pub struct DefaultApproverValidator<V, S> {
    cache: Arc<DefaultApproverCache<S>>,
    inner: V,
}

impl<V, S> DefaultApproverValidator<V, S> {
    /// Wrap `inner` with the default approvers from `cache`.
    pub fn new(cache: Arc<DefaultApproverCache<S>>, inner: V) -> Self {
        Self { cache, inner }
    }
}

#[async_trait]
impl<V, S> ApproverValidator for DefaultApproverValidator<V, S>
where
    V: ApproverValidator,
    S: DefaultApproverSource + 'static,
{
    async fn is_valid_approver(&self, approver: &UserId, group_type: GroupType) -> Result<bool> {
        if self.cache.contains(approver).await {
            debug!(approver_id = %approver, "approver is a default approver");
            return Ok(true);
        }
        self.inner.is_valid_approver(approver, group_type).await
    }
}
