use async_trait::async_trait;

use super::signup_repository::RepositoryError;
use crate::models::waitlist_event::{NewWaitlistEvent, WaitlistEvent};

#[async_trait]
pub trait EventLogRepository: Send + Sync {
    async fn append(&self, event: &NewWaitlistEvent) -> Result<(), RepositoryError>;
    /// Most recent events first.
    async fn recent(&self, limit: usize) -> Result<Vec<WaitlistEvent>, RepositoryError>;
}
