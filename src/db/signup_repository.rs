use async_trait::async_trait;
use thiserror::Error;
use time::OffsetDateTime;

use crate::models::signup::{NewSignup, SignupRecord, SignupStatus};

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("email already registered")]
    DuplicateEmail,
    #[error("row store unavailable: {0}")]
    Unavailable(String),
}

/// Storage for waitlist rows. Emails passed in are expected to be normalized
/// (trimmed, lower-cased); tokens are matched exactly.
#[async_trait]
pub trait SignupRepository: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<SignupRecord>, RepositoryError>;
    async fn find_by_token(&self, token: &str) -> Result<Option<SignupRecord>, RepositoryError>;
    /// Appends an UNVERIFIED row. Fails with `DuplicateEmail` when the email is taken.
    async fn insert(&self, signup: &NewSignup) -> Result<SignupRecord, RepositoryError>;
    /// Sets the status of the row for `email`. `verified_at` only fills an empty
    /// timestamp; an existing one is never overwritten.
    async fn update_status(
        &self,
        email: &str,
        status: SignupStatus,
        verified_at: Option<OffsetDateTime>,
    ) -> Result<Option<SignupRecord>, RepositoryError>;
    /// All rows, oldest first.
    async fn list_all(&self) -> Result<Vec<SignupRecord>, RepositoryError>;
    async fn delete_by_email(&self, email: &str) -> Result<Option<SignupRecord>, RepositoryError>;
    /// Deletes every row with `status`, limited to rows created strictly before
    /// `created_before` when given. Returns the removed rows.
    async fn delete_by_status(
        &self,
        status: SignupStatus,
        created_before: Option<OffsetDateTime>,
    ) -> Result<Vec<SignupRecord>, RepositoryError>;
}
