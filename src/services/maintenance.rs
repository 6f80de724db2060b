use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use time::{format_description::well_known::Rfc3339, Duration, OffsetDateTime};
use tracing::{error, info};

use crate::config::Config;
use crate::db::event_log_repository::EventLogRepository;
use crate::db::signup_repository::{RepositoryError, SignupRepository};
use crate::models::signup::{SignupRecord, SignupStatus};
use crate::models::stats::{
    format_rate, LaunchEntry, LaunchList, RecentSignup, WaitlistSummary, WeeklyReport,
};
use crate::models::waitlist_event::{NewWaitlistEvent, WaitlistEvent, ACTOR_ADMIN};
use crate::services::email_templates::{test_email, verification_email, TEST_VERIFICATION_TOKEN};
use crate::services::smtp_mailer::{MailError, Mailer};
use crate::services::waitlist::{lock_email, record_event, EmailLocks};
use crate::utils::csv::csv_row;
use crate::utils::email::normalize_email;

pub const STALE_REMOVAL_KIND: &str = "STALE_UNVERIFIED";

#[derive(Debug, Error)]
pub enum MaintenanceError {
    #[error("{0} is not in the waitlist")]
    NotFound(String),
    #[error("{email} is VERIFIED and cannot be moved back to UNVERIFIED")]
    IrreversibleTransition { email: String },
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("row store error: {0}")]
    Repository(#[from] RepositoryError),
    #[error("mail error: {0}")]
    Mail(#[from] MailError),
}

#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RemovalResult {
    pub email: String,
    pub removed: bool,
    pub message: String,
}

#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BulkRemoval {
    pub status: SignupStatus,
    pub count: usize,
    pub emails: Vec<String>,
}

#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct StatusChange {
    pub email: String,
    pub from: SignupStatus,
    pub to: SignupStatus,
    pub changed: bool,
}

#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CleanupReport {
    pub removed: usize,
    pub max_age_days: i64,
    #[serde(with = "time::serde::rfc3339")]
    pub cutoff: OffsetDateTime,
    pub emails: Vec<String>,
}

fn rfc3339(ts: OffsetDateTime) -> String {
    ts.format(&Rfc3339).unwrap_or_else(|_| ts.to_string())
}

#[derive(Clone)]
pub struct MaintenanceService {
    signups: Arc<dyn SignupRepository>,
    events: Arc<dyn EventLogRepository>,
    mailer: Arc<dyn Mailer>,
    config: Arc<Config>,
    locks: EmailLocks,
}

impl MaintenanceService {
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

    pub async fn list(&self) -> Result<Vec<SignupRecord>, MaintenanceError> {
        Ok(self.signups.list_all().await?)
    }

    pub async fn find(&self, email: &str) -> Result<SignupRecord, MaintenanceError> {
        let email = normalize_email(email);
        self.signups
            .find_by_email(&email)
            .await?
            .ok_or(MaintenanceError::NotFound(email))
    }

    /// Deletes the record so the address can sign up again.
    pub async fn remove(&self, email: &str) -> Result<SignupRecord, MaintenanceError> {
        let email = normalize_email(email);
        let _guard = lock_email(&self.locks, &email).await;

        let removed = self
            .signups
            .delete_by_email(&email)
            .await?
            .ok_or_else(|| MaintenanceError::NotFound(email.clone()))?;

        info!(%email, status = %removed.status, "removed waitlist signup");
        record_event(
            self.events.as_ref(),
            NewWaitlistEvent::removal(&email, removed.status, ACTOR_ADMIN),
        )
        .await;
        Ok(removed)
    }

    pub async fn remove_many(&self, emails: &[String]) -> Vec<RemovalResult> {
        let mut results = Vec::with_capacity(emails.len());
        for raw in emails {
            let email = raw.trim().to_string();
            let result = match self.remove(&email).await {
                Ok(_) => RemovalResult {
                    message: format!(
                        "SUCCESS: Removed {} from waitlist. They can now sign up again.",
                        email
                    ),
                    email,
                    removed: true,
                },
                Err(MaintenanceError::NotFound(_)) => RemovalResult {
                    message: format!("EMAIL NOT FOUND: {} is not in the waitlist.", email),
                    email,
                    removed: false,
                },
                Err(err) => {
                    error!(%email, error = %err, "bulk removal entry failed");
                    RemovalResult {
                        message: format!("ERROR: {}", err),
                        email,
                        removed: false,
                    }
                }
            };
            results.push(result);
        }
        results
    }

    pub async fn remove_by_status(
        &self,
        status: SignupStatus,
    ) -> Result<BulkRemoval, MaintenanceError> {
        let removed = self.signups.delete_by_status(status, None).await?;
        let emails: Vec<String> = removed.into_iter().map(|row| row.email).collect();

        info!(%status, count = emails.len(), "removed waitlist signups by status");
        record_event(
            self.events.as_ref(),
            NewWaitlistEvent::bulk_removal(status.as_str(), emails.len(), ACTOR_ADMIN),
        )
        .await;

        Ok(BulkRemoval {
            status,
            count: emails.len(),
            emails,
        })
    }

    /// Manual status override. Only UNVERIFIED -> VERIFIED is allowed; asking
    /// for the current status is a no-op.
    pub async fn change_status(
        &self,
        email: &str,
        status: SignupStatus,
    ) -> Result<StatusChange, MaintenanceError> {
        let email = normalize_email(email);
        let _guard = lock_email(&self.locks, &email).await;

        let current = self
            .signups
            .find_by_email(&email)
            .await?
            .ok_or_else(|| MaintenanceError::NotFound(email.clone()))?;

        if current.status == status {
            return Ok(StatusChange {
                email,
                from: status,
                to: status,
                changed: false,
            });
        }
        if current.is_verified() {
            return Err(MaintenanceError::IrreversibleTransition { email });
        }

        let verified_at = self
            .config
            .layout
            .records_verified_at()
            .then(OffsetDateTime::now_utc);
        self.signups
            .update_status(&email, status, verified_at)
            .await?
            .ok_or_else(|| MaintenanceError::NotFound(email.clone()))?;

        info!(%email, from = %current.status, to = %status, "changed signup status");
        record_event(
            self.events.as_ref(),
            NewWaitlistEvent::status_change(&email, current.status, status, ACTOR_ADMIN),
        )
        .await;

        Ok(StatusChange {
            email,
            from: current.status,
            to: status,
            changed: true,
        })
    }

    /// Purges UNVERIFIED rows created more than `max_age_days` ago.
    pub async fn cleanup_stale(
        &self,
        max_age_days: Option<i64>,
        actor: &str,
    ) -> Result<CleanupReport, MaintenanceError> {
        let days = max_age_days.unwrap_or(self.config.stale_unverified_days);
        if days < 0 {
            return Err(MaintenanceError::InvalidInput(format!(
                "days must not be negative (got {})",
                days
            )));
        }

        let cutoff = OffsetDateTime::now_utc() - Duration::days(days);
        let removed = self
            .signups
            .delete_by_status(SignupStatus::Unverified, Some(cutoff))
            .await?;
        let emails: Vec<String> = removed.into_iter().map(|row| row.email).collect();

        info!(count = emails.len(), days, actor, "cleaned up stale unverified signups");
        record_event(
            self.events.as_ref(),
            NewWaitlistEvent::bulk_removal(STALE_REMOVAL_KIND, emails.len(), actor),
        )
        .await;

        Ok(CleanupReport {
            removed: emails.len(),
            max_age_days: days,
            cutoff,
            emails,
        })
    }

    pub async fn summary(&self) -> Result<WaitlistSummary, MaintenanceError> {
        let rows = self.signups.list_all().await?;
        let now = OffsetDateTime::now_utc();
        let day_ago = now - Duration::days(1);

        let verified = rows.iter().filter(|row| row.is_verified()).count();
        let recent: Vec<RecentSignup> = rows
            .iter()
            .filter(|row| row.created_at >= day_ago)
            .map(|row| RecentSignup {
                name: row.name.clone(),
                email: row.email.clone(),
                status: row.status,
                timestamp: row.created_at,
            })
            .collect();

        Ok(WaitlistSummary {
            total_emails: rows.len(),
            verified_emails: verified,
            unverified_emails: rows.len() - verified,
            verification_rate: format_rate(verified, rows.len()),
            recent_signups_24h: recent.len(),
            recent_signups_list: recent,
            last_updated: now,
        })
    }

    pub async fn weekly_report(&self) -> Result<WeeklyReport, MaintenanceError> {
        let rows = self.signups.list_all().await?;
        let now = OffsetDateTime::now_utc();
        let week_ago = now - Duration::days(7);

        let total_signups = rows.len();
        let total_verified = rows.iter().filter(|row| row.is_verified()).count();
        let this_week: Vec<&SignupRecord> =
            rows.iter().filter(|row| row.created_at >= week_ago).collect();
        let new_signups = this_week.len();
        let new_verifications = this_week.iter().filter(|row| row.is_verified()).count();

        let weekly_verification_rate = format_rate(new_verifications, new_signups);
        let overall_verification_rate = format_rate(total_verified, total_signups);

        let text = format!(
            "{product} Waitlist - Weekly Report\n\
             \n\
             This Week:\n\
             - New Signups: {new_signups}\n\
             - New Verifications: {new_verifications}\n\
             - Verification Rate: {weekly_rate}\n\
             \n\
             Total:\n\
             - Total Signups: {total_signups}\n\
             - Total Verified: {total_verified}\n\
             - Overall Verification Rate: {overall_rate}\n\
             \n\
             Generated: {generated}\n",
            product = self.config.branding.product_name,
            new_signups = new_signups,
            new_verifications = new_verifications,
            weekly_rate = weekly_verification_rate,
            total_signups = total_signups,
            total_verified = total_verified,
            overall_rate = overall_verification_rate,
            generated = rfc3339(now),
        );

        Ok(WeeklyReport {
            new_signups,
            new_verifications,
            weekly_verification_rate,
            total_signups,
            total_verified,
            overall_verification_rate,
            generated_at: now,
            text,
        })
    }

    /// Builds the weekly report and mails it to `REPORT_RECIPIENT` when one is set.
    pub async fn deliver_weekly_report(&self) -> Result<WeeklyReport, MaintenanceError> {
        let report = self.weekly_report().await?;
        info!(
            new_signups = report.new_signups,
            new_verifications = report.new_verifications,
            "weekly waitlist report generated"
        );

        if let Some(recipient) = self.config.report_recipient.as_deref() {
            let subject = format!(
                "{} Waitlist - Weekly Report",
                self.config.branding.product_name
            );
            self.mailer
                .send_email_generic(recipient, &subject, &report.text)
                .await?;
            info!(%recipient, "weekly report emailed");
        }
        Ok(report)
    }

    pub async fn launch_list(&self) -> Result<LaunchList, MaintenanceError> {
        let emails: Vec<LaunchEntry> = self
            .signups
            .list_all()
            .await?
            .into_iter()
            .filter(SignupRecord::is_verified)
            .map(|row| LaunchEntry {
                name: row.name,
                email: row.email,
                verified_at: row.verified_at,
            })
            .collect();

        let csv_format = emails
            .iter()
            .map(|entry| csv_row([entry.name.as_str(), entry.email.as_str()]))
            .collect::<Vec<_>>()
            .join("\n");

        Ok(LaunchList {
            count: emails.len(),
            emails,
            csv_format,
        })
    }

    /// Every row as CSV, one column per field of the configured layout.
    pub async fn export_csv(&self) -> Result<String, MaintenanceError> {
        let layout = self.config.layout;
        let rows = self.signups.list_all().await?;

        let mut out = csv_row(layout.columns().iter().copied());
        out.push('\n');
        for row in rows {
            let mut fields = vec![
                row.name,
                row.email,
                rfc3339(row.created_at),
                row.status.to_string(),
                row.token,
            ];
            if layout.records_verified_at() {
                fields.push(row.verified_at.map(rfc3339).unwrap_or_default());
            }
            if layout.captures_client_info() {
                fields.push(row.client_info.unwrap_or_default());
            }
            out.push_str(&csv_row(fields.iter().map(String::as_str)));
            out.push('\n');
        }
        Ok(out)
    }

    pub async fn events(&self, limit: usize) -> Result<Vec<WaitlistEvent>, MaintenanceError> {
        Ok(self.events.recent(limit).await?)
    }

    pub async fn send_test_email(&self, to: &str) -> Result<(), MaintenanceError> {
        let (subject, body) = test_email(&self.config.branding);
        self.mailer.send_email_generic(to.trim(), &subject, &body).await?;
        info!(to, "test email sent");
        Ok(())
    }

    /// Sends the real verification template with a dummy token.
    pub async fn send_test_verification(&self, to: &str) -> Result<(), MaintenanceError> {
        let content = verification_email(
            &self.config.branding,
            "Test User",
            &self.config.verification_url(TEST_VERIFICATION_TOKEN),
        );
        self.mailer.send_templated_email(to.trim(), &content).await?;
        info!(to, "test verification email sent");
        Ok(())
    }
}
