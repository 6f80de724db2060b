use async_trait::async_trait;
use sqlx::PgPool;

use super::event_log_repository::EventLogRepository;
use super::signup_repository::RepositoryError;
use crate::models::waitlist_event::{NewWaitlistEvent, WaitlistEvent};

pub struct PostgresEventLogRepository {
    pub pool: PgPool,
}

#[async_trait]
impl EventLogRepository for PostgresEventLogRepository {
    async fn append(&self, event: &NewWaitlistEvent) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            INSERT INTO waitlist_events (timestamp, event_type, status, email, actor)
            VALUES (now(), $1, $2, $3, $4)
            "#,
        )
        .bind(event.event_type.as_str())
        .bind(&event.status)
        .bind(&event.email)
        .bind(&event.actor)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn recent(&self, limit: usize) -> Result<Vec<WaitlistEvent>, RepositoryError> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows = sqlx::query_as::<_, WaitlistEvent>(
            r#"
            SELECT timestamp, event_type, status, email, actor
            FROM waitlist_events
            ORDER BY timestamp DESC, id DESC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}
