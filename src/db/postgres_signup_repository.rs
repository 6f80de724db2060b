use async_trait::async_trait;
use sqlx::PgPool;
use time::OffsetDateTime;

use super::signup_repository::{RepositoryError, SignupRepository};
use crate::models::signup::{NewSignup, SignupRecord, SignupStatus};

const SIGNUP_COLUMNS: &str = "name, email, created_at, status, token, verified_at, client_info";

pub struct PostgresSignupRepository {
    pub pool: PgPool,
}

fn map_insert_error(err: sqlx::Error) -> RepositoryError {
    match err {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
            RepositoryError::DuplicateEmail
        }
        other => RepositoryError::Database(other),
    }
}

#[async_trait]
impl SignupRepository for PostgresSignupRepository {
    async fn find_by_email(&self, email: &str) -> Result<Option<SignupRecord>, RepositoryError> {
        let sql = format!(
            "SELECT {} FROM waitlist_signups WHERE email = $1",
            SIGNUP_COLUMNS
        );
        let row = sqlx::query_as::<_, SignupRecord>(&sql)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn find_by_token(&self, token: &str) -> Result<Option<SignupRecord>, RepositoryError> {
        let sql = format!(
            "SELECT {} FROM waitlist_signups WHERE token = $1",
            SIGNUP_COLUMNS
        );
        let row = sqlx::query_as::<_, SignupRecord>(&sql)
            .bind(token)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn insert(&self, signup: &NewSignup) -> Result<SignupRecord, RepositoryError> {
        let sql = format!(
            r#"
            INSERT INTO waitlist_signups (name, email, created_at, status, token, client_info)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {}
            "#,
            SIGNUP_COLUMNS
        );
        sqlx::query_as::<_, SignupRecord>(&sql)
            .bind(&signup.name)
            .bind(&signup.email)
            .bind(signup.created_at)
            .bind(SignupStatus::Unverified)
            .bind(&signup.token)
            .bind(signup.client_info.as_deref())
            .fetch_one(&self.pool)
            .await
            .map_err(map_insert_error)
    }

    async fn update_status(
        &self,
        email: &str,
        status: SignupStatus,
        verified_at: Option<OffsetDateTime>,
    ) -> Result<Option<SignupRecord>, RepositoryError> {
        let sql = format!(
            r#"
            UPDATE waitlist_signups
            SET status = $2,
                verified_at = COALESCE(verified_at, $3)
            WHERE email = $1
            RETURNING {}
            "#,
            SIGNUP_COLUMNS
        );
        let row = sqlx::query_as::<_, SignupRecord>(&sql)
            .bind(email)
            .bind(status)
            .bind(verified_at)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn list_all(&self) -> Result<Vec<SignupRecord>, RepositoryError> {
        let sql = format!(
            "SELECT {} FROM waitlist_signups ORDER BY created_at ASC, email ASC",
            SIGNUP_COLUMNS
        );
        let rows = sqlx::query_as::<_, SignupRecord>(&sql)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn delete_by_email(&self, email: &str) -> Result<Option<SignupRecord>, RepositoryError> {
        let sql = format!(
            "DELETE FROM waitlist_signups WHERE email = $1 RETURNING {}",
            SIGNUP_COLUMNS
        );
        let row = sqlx::query_as::<_, SignupRecord>(&sql)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn delete_by_status(
        &self,
        status: SignupStatus,
        created_before: Option<OffsetDateTime>,
    ) -> Result<Vec<SignupRecord>, RepositoryError> {
        let sql = format!(
            r#"
            DELETE FROM waitlist_signups
            WHERE status = $1
              AND ($2::timestamptz IS NULL OR created_at < $2)
            RETURNING {}
            "#,
            SIGNUP_COLUMNS
        );
        let rows = sqlx::query_as::<_, SignupRecord>(&sql)
            .bind(status)
            .bind(created_before)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }
}
