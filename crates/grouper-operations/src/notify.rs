use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::traits::Notifier;
use crate::types::RequestEvent;

/// Delivers events in the background so a slow or failing notifier never
/// affects the workflow that produced the event.
#[derive(Clone)]
pub struct NotificationDispatcher {
    notifier: Arc<dyn Notifier>,
}

impl NotificationDispatcher {
    /// Dispatch through `notifier`.
    pub fn new(notifier: Arc<dyn Notifier>) -> Self {
        Self { notifier }
    }

    /// Spawns delivery of `event` on the current tokio runtime.
    ///
    /// Delivery errors are logged and dropped. The handle only exists so
    /// callers that care (tests, graceful shutdown) can wait for delivery.
    ///
    /// # Panics
    ///
    /// Panics if called outside of a tokio runtime.
    pub fn dispatch(&self, event: RequestEvent) -> JoinHandle<()> {
        let notifier = Arc::clone(&self.notifier);
        let kind = event.kind();
        let request_id = event.request_id();
        tokio::spawn(async move {
            match notifier.notify(event).await {
                Ok(()) => debug!(event = kind, %request_id, "notification delivered"),
                Err(err) => warn!(
                    event = kind,
                    %request_id,
                    error = %err,
                    "failed to deliver notification"
                ),
            }
        })
    }
}
