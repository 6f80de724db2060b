use async_trait::async_trait;
use reqwest::Client;
use std::sync::Arc;

use crate::services::email_templates::EmailContent;
use crate::services::smtp_mailer::{LogMailer, MailError, Mailer};

use super::sendgrid_mailer::SendgridMailer;
use super::smtp_mailer::SmtpMailer;

#[derive(Clone)]
enum AppSender {
    Smtp(Arc<SmtpMailer>),
    Sendgrid(Arc<SendgridMailer>),
    Log(LogMailer),
}

/// Mail transport picked at startup from `EMAIL_PROVIDER`.
#[derive(Clone)]
pub struct PluggableMailer {
    app_sender: AppSender,
}

impl PluggableMailer {
    pub fn from_env(http: &Client) -> Result<Self, MailError> {
        let provider = std::env::var("EMAIL_PROVIDER").unwrap_or_else(|_| "smtp".into());
        Self::for_provider(&provider, http)
    }

    fn for_provider(provider: &str, http: &Client) -> Result<Self, MailError> {
        let app_sender = match provider.trim().to_ascii_lowercase().as_str() {
            "smtp" => AppSender::Smtp(Arc::new(SmtpMailer::new()?)),
            "sendgrid" => AppSender::Sendgrid(Arc::new(SendgridMailer::from_env(http)?)),
            "log" | "none" => AppSender::Log(LogMailer),
            other => {
                return Err(MailError::Other(format!(
                    "Unsupported EMAIL_PROVIDER: {} (expected 'smtp', 'sendgrid' or 'log')",
                    other
                )))
            }
        };
        Ok(Self { app_sender })
    }

    pub fn provider_name(&self) -> &'static str {
        match self.app_sender {
            AppSender::Smtp(_) => "smtp",
            AppSender::Sendgrid(_) => "sendgrid",
            AppSender::Log(_) => "log",
        }
    }
}

#[async_trait]
impl Mailer for PluggableMailer {
    async fn send_templated_email(
        &self,
        to: &str,
        content: &EmailContent,
    ) -> Result<(), MailError> {
        match &self.app_sender {
            AppSender::Smtp(smtp) => smtp.send_templated_email(to, content).await,
            AppSender::Sendgrid(sg) => sg.send_templated_email(to, content).await,
            AppSender::Log(log) => log.send_templated_email(to, content).await,
        }
    }

    async fn send_email_generic(
        &self,
        to: &str,
        subject: &str,
        body: &str,
    ) -> Result<(), MailError> {
        match &self.app_sender {
            AppSender::Smtp(smtp) => smtp.send_email_generic(to, subject, body).await,
            AppSender::Sendgrid(sg) => sg.send_email_generic(to, subject, body).await,
            AppSender::Log(log) => log.send_email_generic(to, subject, body).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_provider_needs_no_environment() {
        let mailer = PluggableMailer::for_provider("LOG", &Client::new()).unwrap();
        assert_eq!(mailer.provider_name(), "log");
    }

    #[test]
    fn unknown_provider_is_rejected() {
        let err = PluggableMailer::for_provider("mailjet", &Client::new())
            .err()
            .expect("mailjet is not wired");
        assert!(err.to_string().contains("Unsupported EMAIL_PROVIDER: mailjet"));
    }
}
