use std::fmt;

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;

use super::signup::SignupStatus;

pub const ACTOR_PUBLIC: &str = "public";
pub const ACTOR_ADMIN: &str = "admin";
pub const ACTOR_SCHEDULER: &str = "scheduler";

pub const UNKNOWN_EMAIL: &str = "unknown";
pub const BULK_OPERATION_EMAIL: &str = "bulk_operation";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventType {
    Submission,
    Verification,
    EmailRemoval,
    StatusChange,
    BulkRemoval,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::Submission => "SUBMISSION",
            EventType::Verification => "VERIFICATION",
            EventType::EmailRemoval => "EMAIL_REMOVAL",
            EventType::StatusChange => "STATUS_CHANGE",
            EventType::BulkRemoval => "BULK_REMOVAL",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A row of the append-only metrics table.
#[derive(Debug, FromRow, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct WaitlistEvent {
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    pub event_type: String,
    pub status: String,
    pub email: String,
    pub actor: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewWaitlistEvent {
    pub event_type: EventType,
    pub status: String,
    pub email: String,
    pub actor: String,
}

impl NewWaitlistEvent {
    pub fn new(event_type: EventType, status: impl Into<String>, email: &str, actor: &str) -> Self {
        Self {
            event_type,
            status: status.into(),
            email: email.to_string(),
            actor: actor.to_string(),
        }
    }

    pub fn submission(status: &str, email: &str) -> Self {
        Self::new(EventType::Submission, status, email, ACTOR_PUBLIC)
    }

    pub fn verification(status: &str, email: &str) -> Self {
        Self::new(EventType::Verification, status, email, ACTOR_PUBLIC)
    }

    pub fn removal(email: &str, removed_status: SignupStatus, actor: &str) -> Self {
        Self::new(
            EventType::EmailRemoval,
            format!("REMOVED_{}", removed_status),
            email,
            actor,
        )
    }

    pub fn status_change(email: &str, from: SignupStatus, to: SignupStatus, actor: &str) -> Self {
        Self::new(
            EventType::StatusChange,
            format!("{}_TO_{}", from, to),
            email,
            actor,
        )
    }

    pub fn bulk_removal(kind: &str, count: usize, actor: &str) -> Self {
        Self::new(
            EventType::BulkRemoval,
            format!("{}_COUNT_{}", kind, count),
            BULK_OPERATION_EMAIL,
            actor,
        )
    }

    pub fn into_event(self, timestamp: OffsetDateTime) -> WaitlistEvent {
        WaitlistEvent {
            timestamp,
            event_type: self.event_type.to_string(),
            status: self.status,
            email: self.email,
            actor: self.actor,
        }
    }
}
