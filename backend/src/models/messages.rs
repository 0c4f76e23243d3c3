use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Row, postgres::PgRow};
use std::str::FromStr;
use uuid::Uuid;

use super::matches::ApplicationStatus;
use super::swipes::decode_text;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    Text,
    /// Posted on behalf of the recruiter when the application status moves.
    Status,
}

impl MessageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageKind::Text => "text",
            MessageKind::Status => "status",
        }
    }
}

impl FromStr for MessageKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "text" => Ok(MessageKind::Text),
            "status" => Ok(MessageKind::Status),
            other => Err(format!("unknown message kind: {}", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub match_id: Uuid,
    pub sender_id: Uuid,
    pub kind: MessageKind,
    pub content: String,
    pub is_read: bool,
    pub read_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl<'r> FromRow<'r, PgRow> for Message {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            match_id: row.try_get("match_id")?,
            sender_id: row.try_get("sender_id")?,
            kind: decode_text(row, "kind")?,
            content: row.try_get("content")?,
            is_read: row.try_get("is_read")?,
            read_at: row.try_get("read_at")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

/// One entry of a user's inbox: a matched pair seen from the reader's side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversation {
    pub match_id: Uuid,
    pub other_user_id: Uuid,
    pub other_user_name: String,
    pub job_title: String,
    pub company_name: String,
    /// Messages from the other party the reader has not read yet.
    pub unread_count: i64,
    pub application_status: ApplicationStatus,
    pub last_message: Option<String>,
    pub last_message_at: Option<DateTime<Utc>>,
    pub matched_at: Option<DateTime<Utc>>,
}

impl Conversation {
    /// Inbox ordering key: latest message, or the match time for a silent pair.
    pub fn activity_at(&self) -> Option<DateTime<Utc>> {
        self.last_message_at.or(self.matched_at)
    }
}

impl<'r> FromRow<'r, PgRow> for Conversation {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            match_id: row.try_get("match_id")?,
            other_user_id: row.try_get("other_user_id")?,
            other_user_name: row.try_get("other_user_name")?,
            job_title: row.try_get("job_title")?,
            company_name: row.try_get("company_name")?,
            unread_count: row.try_get("unread_count")?,
            application_status: decode_text(row, "application_status")?,
            last_message: row.try_get("last_message")?,
            last_message_at: row.try_get("last_message_at")?,
            matched_at: row.try_get("matched_at")?,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    pub content: String,
}

#[derive(Debug, Deserialize)]
pub struct MessagePage {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}
