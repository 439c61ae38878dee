use async_trait::async_trait;
use tracing::info;

use crate::Result;
use crate::traits::Notifier;
use crate::types::RequestEvent;

/// Notifier that only writes events to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

#[async_trait]
impl Notifier for TracingNotifier {
    async fn notify(&self, event: RequestEvent) -> Result<()> {
        match &event {
            RequestEvent::CreateRequested(stored) => info!(
                event = event.kind(),
                request_id = %stored.id,
                creator = %stored.record.creator,
                approver = %stored.record.approver,
                "create request awaiting approval"
            ),
            RequestEvent::GroupCreated {
                request_id,
                group,
                response,
            } => info!(
                event = event.kind(),
                %request_id,
                group_type = %group.group_type,
                group_id = response.group_id.as_deref().unwrap_or("-"),
                "group created"
            ),
            RequestEvent::JoinRequested(stored) => info!(
                event = event.kind(),
                request_id = %stored.id,
                group_id = %stored.record.group_id,
                approver = %stored.record.approver,
                "join request awaiting approval"
            ),
        }
        Ok(())
    }
}
