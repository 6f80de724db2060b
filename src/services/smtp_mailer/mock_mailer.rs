use crate::services::email_templates::EmailContent;
use crate::services::smtp_mailer::{MailError, Mailer};
use async_trait::async_trait;
use std::sync::Mutex;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentEmail {
    pub to: String,
    pub subject: String,
    pub text: String,
    pub html: Option<String>,
}

/// A mock mailer that records sent emails for testing purposes.
#[derive(Debug, Default)]
pub struct MockMailer {
    pub sent_emails: Mutex<Vec<SentEmail>>,
    pub fail_send: bool,
}

impl MockMailer {
    pub fn failing() -> Self {
        Self {
            fail_send: true,
            ..Default::default()
        }
    }

    pub fn sent(&self) -> Vec<SentEmail> {
        self.sent_emails.lock().unwrap().clone()
    }
}

#[async_trait]
impl Mailer for MockMailer {
    async fn send_templated_email(
        &self,
        to: &str,
        content: &EmailContent,
    ) -> Result<(), MailError> {
        if self.fail_send {
            return Err(MailError::Other("mock failure".into()));
        }
        self.sent_emails.lock().unwrap().push(SentEmail {
            to: to.to_string(),
            subject: content.subject.clone(),
            text: content.text.clone(),
            html: Some(content.html.clone()),
        });
        Ok(())
    }

    async fn send_email_generic(
        &self,
        to: &str,
        subject: &str,
        body: &str,
    ) -> Result<(), MailError> {
        if self.fail_send {
            return Err(MailError::Other("mock fail".into()));
        }
        self.sent_emails.lock().unwrap().push(SentEmail {
            to: to.to_string(),
            subject: subject.to_string(),
            text: body.to_string(),
            html: None,
        });
        Ok(())
    }
}
