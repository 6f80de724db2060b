use std::sync::Arc;

use dashmap::DashMap;
use thiserror::Error;
use time::OffsetDateTime;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::config::Config;
use crate::db::event_log_repository::EventLogRepository;
use crate::db::signup_repository::{RepositoryError, SignupRepository};
use crate::models::signup::{NewSignup, SignupForm, SignupStatus};
use crate::models::stats::{format_rate, PublicStats};
use crate::models::waitlist_event::{NewWaitlistEvent, UNKNOWN_EMAIL};
use crate::services::email_templates::verification_email;
use crate::services::smtp_mailer::{MailError, Mailer};
use crate::utils::client_info::describe_client;
use crate::utils::email::{is_valid_email, normalize_email};

/// Per-email mutexes serializing record creation and status transitions.
pub type EmailLocks = Arc<DashMap<String, Arc<Mutex<()>>>>;

/// Held lock on one email. Dropping it releases the mutex and evicts the map
/// entry once no other caller holds or awaits it.
pub struct EmailGuard {
    guard: Option<OwnedMutexGuard<()>>,
    locks: EmailLocks,
    email: String,
}

impl Drop for EmailGuard {
    fn drop(&mut self) {
        self.guard.take();
        self.locks
            .remove_if(&self.email, |_, lock| Arc::strong_count(lock) == 1);
    }
}

pub async fn lock_email(locks: &EmailLocks, email: &str) -> EmailGuard {
    let lock = locks
        .entry(email.to_string())
        .or_insert_with(|| Arc::new(Mutex::new(())))
        .clone();
    EmailGuard {
        guard: Some(lock.lock_owned().await),
        locks: locks.clone(),
        email: email.to_string(),
    }
}

/// Appends a metrics row. Failures are logged and swallowed.
pub async fn record_event(events: &dyn EventLogRepository, event: NewWaitlistEvent) {
    if let Err(err) = events.append(&event).await {
        warn!(
            error = %err,
            event_type = %event.event_type,
            status = %event.status,
            "failed to append waitlist event"
        );
    }
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Error: Email is required")]
    MissingEmail,
    #[error("Error: Name is required")]
    MissingName,
    #[error("Error: Invalid email format")]
    InvalidEmail,
}

#[derive(Debug, Error)]
pub enum WaitlistError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("Error: {0}")]
    Repository(#[from] RepositoryError),
    #[error("Error: {0}")]
    Mail(#[from] MailError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    Registered { token: String },
    AlreadyRegistered,
}

impl SubmitOutcome {
    pub fn message(&self) -> &'static str {
        match self {
            SubmitOutcome::Registered { .. } => "Success: Verification email sent",
            SubmitOutcome::AlreadyRegistered => "Email already registered",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerifyOutcome {
    Verified { name: String },
    AlreadyVerified { name: String },
    Invalid,
}

fn validate(name: &str, email: &str) -> Result<(), ValidationError> {
    if email.is_empty() {
        return Err(ValidationError::MissingEmail);
    }
    if name.is_empty() {
        return Err(ValidationError::MissingName);
    }
    if !is_valid_email(email) {
        return Err(ValidationError::InvalidEmail);
    }
    Ok(())
}

#[derive(Clone)]
pub struct WaitlistService {
    signups: Arc<dyn SignupRepository>,
    events: Arc<dyn EventLogRepository>,
    mailer: Arc<dyn Mailer>,
    config: Arc<Config>,
    locks: EmailLocks,
}

impl WaitlistService {
    pub fn new(
        signups: Arc<dyn SignupRepository>,
        events: Arc<dyn EventLogRepository>,
        mailer: Arc<dyn Mailer>,
        config: Arc<Config>,
        locks: EmailLocks,
    ) -> Self {
        Self {
            signups,
            events,
            mailer,
            config,
            locks,
        }
    }

    pub async fn submit(&self, form: &SignupForm) -> Result<SubmitOutcome, WaitlistError> {
        let name = form.name.trim();
        let email = normalize_email(&form.email);

        if let Err(err) = validate(name, &email) {
            info!(%email, reason = %err, "rejected waitlist submission");
            return Err(err.into());
        }

        match self.register(name, &email, form).await {
            Ok(outcome) => {
                if let SubmitOutcome::Registered { .. } = outcome {
                    record_event(
                        self.events.as_ref(),
                        NewWaitlistEvent::submission("SUCCESS", &email),
                    )
                    .await;
                }
                Ok(outcome)
            }
            Err(err) => {
                error!(%email, error = %err, "waitlist submission failed");
                record_event(
                    self.events.as_ref(),
                    NewWaitlistEvent::submission("ERROR", &email),
                )
                .await;
                Err(err)
            }
        }
    }

    async fn register(
        &self,
        name: &str,
        email: &str,
        form: &SignupForm,
    ) -> Result<SubmitOutcome, WaitlistError> {
        let _guard = lock_email(&self.locks, email).await;

        if self.signups.find_by_email(email).await?.is_some() {
            info!(%email, "email already registered");
            return Ok(SubmitOutcome::AlreadyRegistered);
        }

        let now = OffsetDateTime::now_utc();
        let signup = NewSignup {
            name: name.to_string(),
            email: email.to_string(),
            token: Uuid::new_v4().to_string(),
            created_at: now,
            client_info: self
                .config
                .layout
                .captures_client_info()
                .then(|| describe_client(form, now)),
        };

        let record = match self.signups.insert(&signup).await {
            Ok(record) => record,
            Err(RepositoryError::DuplicateEmail) => {
                info!(%email, "email already registered (unique violation)");
                return Ok(SubmitOutcome::AlreadyRegistered);
            }
            Err(err) => return Err(err.into()),
        };
        info!(%email, "added waitlist signup");

        let content = verification_email(
            &self.config.branding,
            &record.name,
            &self.config.verification_url(&record.token),
        );
        self.mailer.send_templated_email(&record.email, &content).await?;
        info!(%email, "verification email sent");

        Ok(SubmitOutcome::Registered {
            token: record.token,
        })
    }

    pub async fn verify(&self, token: &str) -> Result<VerifyOutcome, WaitlistError> {
        let Some(found) = self.signups.find_by_token(token).await? else {
            info!("verification token not found");
            record_event(
                self.events.as_ref(),
                NewWaitlistEvent::verification("FAILED", UNKNOWN_EMAIL),
            )
            .await;
            return Ok(VerifyOutcome::Invalid);
        };

        if found.is_verified() {
            info!(email = %found.email, "email already verified");
            return Ok(VerifyOutcome::AlreadyVerified { name: found.name });
        }

        let _guard = lock_email(&self.locks, &found.email).await;

        // Another request may have verified while we waited for the lock.
        let current = match self.signups.find_by_token(token).await? {
            Some(current) if current.is_verified() => {
                return Ok(VerifyOutcome::AlreadyVerified { name: current.name })
            }
            Some(current) => current,
            None => return Ok(VerifyOutcome::Invalid),
        };

        let verified_at = self
            .config
            .layout
            .records_verified_at()
            .then(OffsetDateTime::now_utc);
        let updated = self
            .signups
            .update_status(&current.email, SignupStatus::Verified, verified_at)
            .await?;
        let Some(updated) = updated else {
            return Ok(VerifyOutcome::Invalid);
        };

        info!(email = %updated.email, "email verified");
        record_event(
            self.events.as_ref(),
            NewWaitlistEvent::verification("SUCCESS", &updated.email),
        )
        .await;

        Ok(VerifyOutcome::Verified { name: updated.name })
    }

    pub async fn stats(&self) -> Result<PublicStats, WaitlistError> {
        let rows = self.signups.list_all().await?;
        let total = rows.len();
        let verified = rows.iter().filter(|row| row.is_verified()).count();

        Ok(PublicStats {
            total_signups: total,
            verified_emails: verified,
            verification_rate: format_rate(verified, total),
            timestamp: OffsetDateTime::now_utc(),
        })
    }
}
