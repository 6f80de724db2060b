use async_trait::async_trait;
use lettre::{
    message::{Mailbox, MultiPart},
    transport::smtp::{
        authentication::Credentials,
        client::{Tls, TlsParameters},
    },
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use std::sync::Arc;

use crate::services::email_templates::EmailContent;
use crate::services::smtp_mailer::{Mailer, SmtpConfig, TlsMode};

use super::MailError;

#[derive(Clone)]
pub struct SmtpMailer {
    transport: Arc<AsyncSmtpTransport<Tokio1Executor>>,
    sender: Mailbox,
    reply_to: Option<Mailbox>,
}

impl SmtpMailer {
    pub fn new() -> Result<Self, MailError> {
        Self::from_config(&SmtpConfig::from_env()?)
    }

    pub fn from_config(config: &SmtpConfig) -> Result<Self, MailError> {
        let sender: Mailbox = config.from.parse()?;
        let reply_to = config
            .reply_to
            .as_deref()
            .map(str::parse::<Mailbox>)
            .transpose()?;

        Ok(Self {
            transport: Arc::new(build_transport(config)?),
            sender,
            reply_to,
        })
    }

    fn message_builder(&self, to: &str, subject: &str) -> Result<lettre::message::MessageBuilder, MailError> {
        let recipient: Mailbox = to.parse()?;
        let mut builder = Message::builder()
            .from(self.sender.clone())
            .to(recipient)
            .subject(subject);
        if let Some(reply_to) = &self.reply_to {
            builder = builder.reply_to(reply_to.clone());
        }
        Ok(builder)
    }

    async fn deliver(&self, email: Message) -> Result<(), MailError> {
        self.transport
            .send(email)
            .await
            .map(|_| ())
            .map_err(|e| e.into())
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send_templated_email(
        &self,
        to: &str,
        content: &EmailContent,
    ) -> Result<(), MailError> {
        let email = self
            .message_builder(to, &content.subject)?
            .multipart(MultiPart::alternative_plain_html(
                content.text.clone(),
                content.html.clone(),
            ))?;
        self.deliver(email).await
    }

    async fn send_email_generic(
        &self,
        to: &str,
        subject: &str,
        body: &str,
    ) -> Result<(), MailError> {
        let email = self.message_builder(to, subject)?.body(body.to_string())?;
        self.deliver(email).await
    }
}

fn build_transport(config: &SmtpConfig) -> Result<AsyncSmtpTransport<Tokio1Executor>, MailError> {
    let mut builder = match config.tls_mode {
        TlsMode::StartTls => {
            let tls = TlsParameters::new(config.host.clone())?;
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)?
                .port(config.port)
                .tls(Tls::Required(tls))
        }
        TlsMode::Implicit => {
            let tls = TlsParameters::new(config.host.clone())?;
            AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host)?
                .port(config.port)
                .tls(Tls::Wrapper(tls))
        }
        TlsMode::None => {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.host).port(config.port)
        }
    };

    if let (Some(username), Some(password)) = (config.username.as_ref(), config.password.as_ref()) {
        builder = builder.credentials(Credentials::new(username.clone(), password.clone()));
    }

    Ok(builder.build())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config() -> SmtpConfig {
        SmtpConfig {
            host: "smtp.example.com".to_string(),
            port: 587,
            username: Some("user".to_string()),
            password: Some("pass".to_string()),
            from: "Waitlist Team <team@example.com>".to_string(),
            reply_to: Some("support@example.com".to_string()),
            tls_mode: TlsMode::StartTls,
        }
    }

    #[tokio::test]
    async fn build_transport_prefers_starttls_on_standard_ports() {
        let config = base_config();
        assert!(build_transport(&config).is_ok());
    }

    #[tokio::test]
    async fn build_transport_supports_wrapper_tls_on_port_465() {
        let mut config = base_config();
        config.port = 465;
        config.tls_mode = TlsMode::Implicit;
        assert!(build_transport(&config).is_ok());
    }

    #[tokio::test]
    async fn build_transport_allows_plaintext_when_disabled() {
        let mut config = base_config();
        config.tls_mode = TlsMode::None;
        assert!(build_transport(&config).is_ok());
    }

    #[tokio::test]
    async fn from_config_rejects_malformed_sender() {
        let mut config = base_config();
        config.from = "not an address".to_string();
        assert!(matches!(
            SmtpMailer::from_config(&config),
            Err(MailError::InvalidEmailAddress(_))
        ));
    }

    #[tokio::test]
    async fn templated_message_builds_for_valid_recipient() {
        let mailer = SmtpMailer::from_config(&base_config()).unwrap();
        let content = EmailContent {
            subject: "Hello".into(),
            text: "plain".into(),
            html: "<p>html</p>".into(),
        };
        let message = mailer
            .message_builder("ada@x.com", &content.subject)
            .unwrap()
            .multipart(MultiPart::alternative_plain_html(
                content.text.clone(),
                content.html.clone(),
            ));
        assert!(message.is_ok());
        assert!(mailer.message_builder("nope", "Hello").is_err());
    }
}
