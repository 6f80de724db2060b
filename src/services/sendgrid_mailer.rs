use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

use crate::services::email_templates::EmailContent;
use crate::services::smtp_mailer::{MailError, Mailer};

const SENDGRID_API_BASE: &str = "https://api.sendgrid.com";

#[derive(Clone)]
pub struct SendgridMailer {
    api_key: String,
    from: String,
    api_base: String,
    http: Client,
}

impl SendgridMailer {
    pub fn from_env(http: &Client) -> Result<Self, MailError> {
        Self::from_lookup(http, |key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(http: &Client, lookup: F) -> Result<Self, MailError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let api_key = var("SENDGRID_API_KEY")
            .ok_or_else(|| MailError::EnvVarMissing("SENDGRID_API_KEY".into()))?;

        // Prefer a generic EMAIL_FROM; fall back to SMTP_FROM
        let from = var("EMAIL_FROM")
            .or_else(|| var("SMTP_FROM"))
            .ok_or_else(|| MailError::EnvVarMissing("EMAIL_FROM or SMTP_FROM".into()))?;

        Ok(Self::with_base(http, api_key, from, SENDGRID_API_BASE))
    }

    pub fn with_base(
        http: &Client,
        api_key: impl Into<String>,
        from: impl Into<String>,
        api_base: &str,
    ) -> Self {
        Self {
            api_key: api_key.into(),
            from: from.into(),
            api_base: api_base.trim_end_matches('/').to_string(),
            http: http.clone(),
        }
    }

    async fn send(&self, to: &str, subject: &str, content: Value) -> Result<(), MailError> {
        let payload = json!({
            "personalizations": [ { "to": [ { "email": to } ] } ],
            "from": { "email": self.from },
            "subject": subject,
            "content": content
        });

        let resp = self
            .http
            .post(format!("{}/v3/mail/send", self.api_base))
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| MailError::SendError(e.to_string()))?;

        if resp.status().is_success() {
            Ok(())
        } else {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            Err(MailError::SendError(format!(
                "SendGrid send failed: {} {}",
                status, text
            )))
        }
    }
}

#[async_trait]
impl Mailer for SendgridMailer {
    async fn send_templated_email(
        &self,
        to: &str,
        content: &EmailContent,
    ) -> Result<(), MailError> {
        // SendGrid requires text/plain before text/html
        let parts = json!([
            { "type": "text/plain", "value": content.text },
            { "type": "text/html", "value": content.html }
        ]);
        self.send(to, &content.subject, parts).await
    }

    async fn send_email_generic(
        &self,
        to: &str,
        subject: &str,
        body: &str,
    ) -> Result<(), MailError> {
        let parts = json!([ { "type": "text/plain", "value": body } ]);
        self.send(to, subject, parts).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    #[test]
    fn blank_api_key_counts_as_missing() {
        let err = SendgridMailer::from_lookup(&Client::new(), |key| match key {
            "SENDGRID_API_KEY" => Some("  ".into()),
            "EMAIL_FROM" => Some("team@x.com".into()),
            _ => None,
        })
        .err()
        .expect("blank key should be rejected");
        assert!(matches!(err, MailError::EnvVarMissing(key) if key == "SENDGRID_API_KEY"));
    }

    #[test]
    fn from_falls_back_to_smtp_from() {
        let mailer = SendgridMailer::from_lookup(&Client::new(), |key| match key {
            "SENDGRID_API_KEY" => Some("sg-key".into()),
            "EMAIL_FROM" => Some(String::new()),
            "SMTP_FROM" => Some("smtp@x.com".into()),
            _ => None,
        })
        .expect("mailer");
        assert_eq!(mailer.from, "smtp@x.com");
        assert_eq!(mailer.api_base, SENDGRID_API_BASE);
    }

    #[tokio::test]
    async fn templated_email_posts_both_parts() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/v3/mail/send")
                    .header("authorization", "Bearer sg-key")
                    .body_contains("text/html")
                    .body_contains("ada@x.com");
                then.status(202);
            })
            .await;

        let mailer =
            SendgridMailer::with_base(&Client::new(), "sg-key", "team@x.com", &server.url(""));
        let content = EmailContent {
            subject: "Verify".into(),
            text: "plain".into(),
            html: "<p>html</p>".into(),
        };

        mailer
            .send_templated_email("ada@x.com", &content)
            .await
            .expect("send");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn failed_status_surfaces_body() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.any_request();
                then.status(401).body("bad key");
            })
            .await;

        let mailer =
            SendgridMailer::with_base(&Client::new(), "nope", "team@x.com", &server.url(""));
        let err = mailer
            .send_email_generic("ada@x.com", "Hi", "body")
            .await
            .unwrap_err();

        mock.assert_async().await;
        match err {
            MailError::SendError(msg) => {
                assert!(msg.contains("401"));
                assert!(msg.contains("bad key"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
