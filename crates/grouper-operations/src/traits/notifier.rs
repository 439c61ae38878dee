use async_trait::async_trait;

use crate::Result;
use crate::types::RequestEvent;

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, event: RequestEvent) -> Result<()>;
}
