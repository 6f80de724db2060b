use async_trait::async_trait;
use tracing::info;

use crate::services::email_templates::EmailContent;
use crate::services::smtp_mailer::{MailError, Mailer};

/// Writes outgoing mail to the log instead of sending it. For local runs.
#[derive(Debug, Default, Clone)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send_templated_email(
        &self,
        to: &str,
        content: &EmailContent,
    ) -> Result<(), MailError> {
        info!(to, subject = %content.subject, body = %content.text, "mail delivery skipped (log provider)");
        Ok(())
    }

    async fn send_email_generic(
        &self,
        to: &str,
        subject: &str,
        body: &str,
    ) -> Result<(), MailError> {
        info!(to, subject, body, "mail delivery skipped (log provider)");
        Ok(())
    }
}
