use async_trait::async_trait;
use std::sync::Mutex;
use time::OffsetDateTime;

use super::event_log_repository::EventLogRepository;
use super::signup_repository::{RepositoryError, SignupRepository};
use crate::models::signup::{NewSignup, SignupRecord, SignupStatus};
use crate::models::waitlist_event::{NewWaitlistEvent, WaitlistEvent};

fn poisoned() -> RepositoryError {
    RepositoryError::Unavailable("in-memory store lock poisoned".into())
}

/// Row store kept in process memory. Used for `STORAGE_BACKEND=memory` and as
/// the fake behind service and route tests.
#[derive(Debug, Default)]
pub struct InMemorySignupRepository {
    rows: Mutex<Vec<SignupRecord>>,
    pub should_fail: bool,
}

impl InMemorySignupRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records(records: Vec<SignupRecord>) -> Self {
        Self {
            rows: Mutex::new(records),
            should_fail: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            rows: Mutex::new(vec![]),
            should_fail: true,
        }
    }

    pub fn snapshot(&self) -> Vec<SignupRecord> {
        self.rows.lock().map(|rows| rows.clone()).unwrap_or_default()
    }

    fn check(&self) -> Result<(), RepositoryError> {
        if self.should_fail {
            return Err(RepositoryError::Unavailable("mock row store failure".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl SignupRepository for InMemorySignupRepository {
    async fn find_by_email(&self, email: &str) -> Result<Option<SignupRecord>, RepositoryError> {
        self.check()?;
        let rows = self.rows.lock().map_err(|_| poisoned())?;
        Ok(rows
            .iter()
            .find(|row| row.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn find_by_token(&self, token: &str) -> Result<Option<SignupRecord>, RepositoryError> {
        self.check()?;
        let rows = self.rows.lock().map_err(|_| poisoned())?;
        Ok(rows.iter().find(|row| row.token == token).cloned())
    }

    async fn insert(&self, signup: &NewSignup) -> Result<SignupRecord, RepositoryError> {
        self.check()?;
        let mut rows = self.rows.lock().map_err(|_| poisoned())?;
        if rows
            .iter()
            .any(|row| row.email.eq_ignore_ascii_case(&signup.email) || row.token == signup.token)
        {
            return Err(RepositoryError::DuplicateEmail);
        }
        let record = signup.clone().into_record();
        rows.push(record.clone());
        Ok(record)
    }

    async fn update_status(
        &self,
        email: &str,
        status: SignupStatus,
        verified_at: Option<OffsetDateTime>,
    ) -> Result<Option<SignupRecord>, RepositoryError> {
        self.check()?;
        let mut rows = self.rows.lock().map_err(|_| poisoned())?;
        let Some(row) = rows
            .iter_mut()
            .find(|row| row.email.eq_ignore_ascii_case(email))
        else {
            return Ok(None);
        };
        row.status = status;
        if row.verified_at.is_none() {
            row.verified_at = verified_at;
        }
        Ok(Some(row.clone()))
    }

    async fn list_all(&self) -> Result<Vec<SignupRecord>, RepositoryError> {
        self.check()?;
        let rows = self.rows.lock().map_err(|_| poisoned())?;
        Ok(rows.clone())
    }

    async fn delete_by_email(&self, email: &str) -> Result<Option<SignupRecord>, RepositoryError> {
        self.check()?;
        let mut rows = self.rows.lock().map_err(|_| poisoned())?;
        let position = rows
            .iter()
            .position(|row| row.email.eq_ignore_ascii_case(email));
        Ok(position.map(|idx| rows.remove(idx)))
    }

    async fn delete_by_status(
        &self,
        status: SignupStatus,
        created_before: Option<OffsetDateTime>,
    ) -> Result<Vec<SignupRecord>, RepositoryError> {
        self.check()?;
        let mut rows = self.rows.lock().map_err(|_| poisoned())?;
        let (removed, kept): (Vec<_>, Vec<_>) = rows.drain(..).partition(|row| {
            row.status == status && created_before.map_or(true, |cutoff| row.created_at < cutoff)
        });
        *rows = kept;
        Ok(removed)
    }
}

#[derive(Debug, Default)]
pub struct InMemoryEventLog {
    events: Mutex<Vec<WaitlistEvent>>,
    pub should_fail: bool,
}

impl InMemoryEventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            events: Mutex::new(vec![]),
            should_fail: true,
        }
    }

    pub fn snapshot(&self) -> Vec<WaitlistEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl EventLogRepository for InMemoryEventLog {
    async fn append(&self, event: &NewWaitlistEvent) -> Result<(), RepositoryError> {
        if self.should_fail {
            return Err(RepositoryError::Unavailable("mock event log failure".into()));
        }
        let mut events = self.events.lock().map_err(|_| poisoned())?;
        events.push(event.clone().into_event(OffsetDateTime::now_utc()));
        Ok(())
    }

    async fn recent(&self, limit: usize) -> Result<Vec<WaitlistEvent>, RepositoryError> {
        if self.should_fail {
            return Err(RepositoryError::Unavailable("mock event log failure".into()));
        }
        let events = self.events.lock().map_err(|_| poisoned())?;
        Ok(events.iter().rev().take(limit).cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::Duration;

    fn signup(email: &str, token: &str, created_at: OffsetDateTime) -> NewSignup {
        NewSignup {
            name: "Test".into(),
            email: email.into(),
            token: token.into(),
            created_at,
            client_info: None,
        }
    }

    #[tokio::test]
    async fn insert_rejects_duplicate_email() {
        let repo = InMemorySignupRepository::new();
        let now = OffsetDateTime::now_utc();
        repo.insert(&signup("a@b.co", "t1", now)).await.unwrap();

        let err = repo.insert(&signup("A@B.co", "t2", now)).await.unwrap_err();
        assert!(matches!(err, RepositoryError::DuplicateEmail));
        assert_eq!(repo.snapshot().len(), 1);
    }

    #[tokio::test]
    async fn update_status_never_overwrites_verified_at() {
        let repo = InMemorySignupRepository::new();
        let now = OffsetDateTime::now_utc();
        repo.insert(&signup("a@b.co", "t1", now)).await.unwrap();

        let first = now + Duration::minutes(1);
        let second = now + Duration::minutes(2);
        repo.update_status("a@b.co", SignupStatus::Verified, Some(first))
            .await
            .unwrap();
        let row = repo
            .update_status("a@b.co", SignupStatus::Verified, Some(second))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(row.verified_at, Some(first));
    }

    #[tokio::test]
    async fn delete_by_status_honours_cutoff() {
        let repo = InMemorySignupRepository::new();
        let now = OffsetDateTime::now_utc();
        repo.insert(&signup("old@b.co", "t1", now - Duration::days(10)))
            .await
            .unwrap();
        repo.insert(&signup("new@b.co", "t2", now)).await.unwrap();

        let removed = repo
            .delete_by_status(SignupStatus::Unverified, Some(now - Duration::days(7)))
            .await
            .unwrap();
        assert_eq!(removed.len(), 1);
        assert_eq!(removed[0].email, "old@b.co");
        assert_eq!(repo.snapshot().len(), 1);
    }

    #[tokio::test]
    async fn failing_store_surfaces_errors() {
        let repo = InMemorySignupRepository::failing();
        assert!(repo.list_all().await.is_err());
    }

    #[tokio::test]
    async fn event_log_returns_newest_first() {
        let log = InMemoryEventLog::new();
        log.append(&NewWaitlistEvent::submission("SUCCESS", "a@b.co"))
            .await
            .unwrap();
        log.append(&NewWaitlistEvent::verification("SUCCESS", "a@b.co"))
            .await
            .unwrap();

        let recent = log.recent(1).await.unwrap();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].event_type, "VERIFICATION");
    }
}
