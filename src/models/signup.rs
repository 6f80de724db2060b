use std::fmt;

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;

#[derive(sqlx::Type, Debug, Deserialize, Serialize, PartialEq, Eq, Copy, Clone, Hash)]
#[sqlx(type_name = "signup_status", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum SignupStatus {
    Unverified,
    Verified,
}

impl SignupStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SignupStatus::Unverified => "UNVERIFIED",
            SignupStatus::Verified => "VERIFIED",
        }
    }
}

impl fmt::Display for SignupStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One row of the waitlist.
#[derive(Debug, FromRow, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SignupRecord {
    pub name: String,
    pub email: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    pub status: SignupStatus,
    pub token: String,
    #[serde(with = "time::serde::rfc3339::option")]
    pub verified_at: Option<OffsetDateTime>,
    pub client_info: Option<String>,
}

impl SignupRecord {
    pub fn is_verified(&self) -> bool {
        self.status == SignupStatus::Verified
    }
}

#[derive(Debug, Clone)]
pub struct NewSignup {
    pub name: String,
    pub email: String,
    pub token: String,
    pub created_at: OffsetDateTime,
    pub client_info: Option<String>,
}

impl NewSignup {
    pub fn into_record(self) -> SignupRecord {
        SignupRecord {
            name: self.name,
            email: self.email,
            created_at: self.created_at,
            status: SignupStatus::Unverified,
            token: self.token,
            verified_at: None,
            client_info: self.client_info,
        }
    }
}

/// Form body posted by the landing page.
#[derive(Debug, Default, Deserialize, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct SignupForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub user_agent: Option<String>,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub screen_resolution: Option<String>,
    #[serde(default)]
    pub timezone: Option<String>,
}
