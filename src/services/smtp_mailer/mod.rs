use async_trait::async_trait;
use std::fmt;

use crate::services::email_templates::EmailContent;

#[derive(Debug)]
pub enum MailError {
    Other(String),
    InvalidEmailAddress(String),
    SendError(String),
    EnvVarMissing(String),
}

impl fmt::Display for MailError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MailError::Other(e) => write!(f, "Error: {}", e),
            MailError::InvalidEmailAddress(e) => write!(f, "Invalid Address: {}", e),
            MailError::SendError(e) => write!(f, "Send error: {}", e),
            MailError::EnvVarMissing(e) => write!(f, "Env Var Missing: {}", e),
        }
    }
}

impl std::error::Error for MailError {}

use lettre::transport::smtp::Error as SmtpError;

impl From<SmtpError> for MailError {
    fn from(err: SmtpError) -> Self {
        MailError::SendError(err.to_string())
    }
}

impl From<lettre::error::Error> for MailError {
    fn from(err: lettre::error::Error) -> Self {
        MailError::SendError(err.to_string())
    }
}

impl From<AddressError> for MailError {
    fn from(e: AddressError) -> Self {
        MailError::InvalidEmailAddress(e.to_string())
    }
}

#[async_trait]
pub trait Mailer: Send + Sync {
    /// Sends a rendered template as a text + HTML alternative message.
    async fn send_templated_email(&self, to: &str, content: &EmailContent)
        -> Result<(), MailError>;
    async fn send_email_generic(&self, to: &str, subject: &str, body: &str)
        -> Result<(), MailError>;
}

mod log_mailer;
#[cfg(test)]
mod mock_mailer;
mod smtp_impl;

use lettre::address::AddressError;
pub use log_mailer::LogMailer;
#[cfg(test)]
pub use mock_mailer::{MockMailer, SentEmail};
pub use smtp_impl::SmtpMailer;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TlsMode {
    StartTls,
    Implicit,
    None,
}

impl TlsMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            TlsMode::StartTls => "starttls",
            TlsMode::Implicit => "implicit_tls",
            TlsMode::None => "none",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "starttls" => Some(TlsMode::StartTls),
            "implicit" | "implicit_tls" | "tls" => Some(TlsMode::Implicit),
            "none" | "off" => Some(TlsMode::None),
            _ => None,
        }
    }
}

impl fmt::Display for TlsMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub from: String,
    pub reply_to: Option<String>,
    pub tls_mode: TlsMode,
}

impl SmtpConfig {
    pub fn from_env() -> Result<Self, MailError> {
        let var = |key: &str| {
            std::env::var(key)
                .ok()
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let required =
            |key: &str| var(key).ok_or_else(|| MailError::EnvVarMissing(key.to_string()));

        let host = required("SMTP_HOST")?;
        let from = required("SMTP_FROM")?;
        let port: u16 = required("SMTP_PORT")?
            .parse()
            .map_err(|_| MailError::Other("SMTP_PORT must be a valid port".into()))?;

        // SMTP_TLS_DISABLED predates SMTP_TLS_MODE and still wins when set.
        let tls_disabled = var("SMTP_TLS_DISABLED")
            .map(|v| v.eq_ignore_ascii_case("true"))
            .unwrap_or(false);
        let tls_mode = if tls_disabled {
            TlsMode::None
        } else {
            match var("SMTP_TLS_MODE") {
                Some(raw) => TlsMode::parse(&raw)
                    .ok_or_else(|| MailError::Other(format!("Unsupported SMTP_TLS_MODE: {}", raw)))?,
                None if port == 465 => TlsMode::Implicit,
                None => TlsMode::StartTls,
            }
        };

        Ok(SmtpConfig {
            host,
            port,
            username: var("SMTP_USERNAME"),
            password: var("SMTP_PASSWORD"),
            from,
            reply_to: var("EMAIL_REPLY_TO"),
            tls_mode,
        })
    }
}
