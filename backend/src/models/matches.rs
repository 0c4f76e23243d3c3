use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Row, postgres::PgRow};
use std::str::FromStr;
use uuid::Uuid;

use super::swipes::decode_text;
use super::users::{JobRef, Role};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStatus {
    /// One side has expressed interest.
    Pending,
    /// Both sides have expressed interest.
    Matched,
    /// Either side walked away. Terminal.
    Unmatched,
}

impl MatchStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchStatus::Pending => "pending",
            MatchStatus::Matched => "matched",
            MatchStatus::Unmatched => "unmatched",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, MatchStatus::Unmatched)
    }
}

impl FromStr for MatchStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(MatchStatus::Pending),
            "matched" => Ok(MatchStatus::Matched),
            "unmatched" => Ok(MatchStatus::Unmatched),
            other => Err(format!("unknown match status: {}", other)),
        }
    }
}

/// Hiring pipeline status a recruiter moves a matched candidate through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationStatus {
    Active,
    Reviewing,
    Interview,
    Offered,
    Rejected,
    Withdrawn,
    Hired,
}

impl ApplicationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApplicationStatus::Active => "active",
            ApplicationStatus::Reviewing => "reviewing",
            ApplicationStatus::Interview => "interview",
            ApplicationStatus::Offered => "offered",
            ApplicationStatus::Rejected => "rejected",
            ApplicationStatus::Withdrawn => "withdrawn",
            ApplicationStatus::Hired => "hired",
        }
    }

    /// System message posted into the match's chat when the status changes.
    pub fn chat_notice(&self) -> &'static str {
        match self {
            ApplicationStatus::Reviewing => "📋 Your application is being reviewed",
            ApplicationStatus::Interview => "🎉 Congratulations! You've been invited for an interview",
            ApplicationStatus::Offered => "🎊 Amazing news! You've received a job offer",
            ApplicationStatus::Rejected => "We've decided to move forward with other candidates",
            ApplicationStatus::Hired => "🎉 Welcome to the team! You're hired!",
            ApplicationStatus::Active | ApplicationStatus::Withdrawn => "Application status updated",
        }
    }
}

impl FromStr for ApplicationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(ApplicationStatus::Active),
            "reviewing" => Ok(ApplicationStatus::Reviewing),
            "interview" => Ok(ApplicationStatus::Interview),
            "offered" => Ok(ApplicationStatus::Offered),
            "rejected" => Ok(ApplicationStatus::Rejected),
            "withdrawn" => Ok(ApplicationStatus::Withdrawn),
            "hired" => Ok(ApplicationStatus::Hired),
            other => Err(format!("unknown application status: {}", other)),
        }
    }
}

/// Identity of a match row: one row per (job, job seeker).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PairKey {
    pub job_id: Uuid,
    pub job_seeker_id: Uuid,
}

impl PairKey {
    pub fn new(job_id: Uuid, job_seeker_id: Uuid) -> Self {
        Self { job_id, job_seeker_id }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Match {
    pub id: Uuid,
    pub job_id: Uuid,
    pub job_seeker_id: Uuid,
    pub recruiter_id: Uuid,
    pub status: MatchStatus,
    pub application_status: ApplicationStatus,
    pub job_seeker_swiped_at: Option<DateTime<Utc>>,
    pub recruiter_swiped_at: Option<DateTime<Utc>>,
    pub matched_at: Option<DateTime<Utc>>,
    pub job_seeker_unread: i32,
    pub recruiter_unread: i32,
    pub last_activity_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Match {
    pub fn key(&self) -> PairKey {
        PairKey::new(self.job_id, self.job_seeker_id)
    }

    pub fn involves(&self, user_id: Uuid) -> bool {
        self.job_seeker_id == user_id || self.recruiter_id == user_id
    }

    /// The other party of the match, if `user_id` is one of the two.
    pub fn counterpart_of(&self, user_id: Uuid) -> Option<Uuid> {
        if user_id == self.job_seeker_id {
            Some(self.recruiter_id)
        } else if user_id == self.recruiter_id {
            Some(self.job_seeker_id)
        } else {
            None
        }
    }

    /// Unread messages waiting for `user_id`.
    pub fn unread_for(&self, user_id: Uuid) -> i32 {
        if user_id == self.job_seeker_id {
            self.job_seeker_unread
        } else if user_id == self.recruiter_id {
            self.recruiter_unread
        } else {
            0
        }
    }

    pub fn party_column(role: Role) -> &'static str {
        match role {
            Role::JobSeeker => "job_seeker_id",
            Role::Recruiter => "recruiter_id",
        }
    }

    /// Column holding the other party for a user of `role`.
    pub fn counterpart_column(role: Role) -> &'static str {
        match role {
            Role::JobSeeker => "recruiter_id",
            Role::Recruiter => "job_seeker_id",
        }
    }
}

impl<'r> FromRow<'r, PgRow> for Match {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            job_id: row.try_get("job_id")?,
            job_seeker_id: row.try_get("job_seeker_id")?,
            recruiter_id: row.try_get("recruiter_id")?,
            status: decode_text(row, "status")?,
            application_status: decode_text(row, "application_status")?,
            job_seeker_swiped_at: row.try_get("job_seeker_swiped_at")?,
            recruiter_swiped_at: row.try_get("recruiter_swiped_at")?,
            matched_at: row.try_get("matched_at")?,
            job_seeker_unread: row.try_get("job_seeker_unread")?,
            recruiter_unread: row.try_get("recruiter_unread")?,
            last_activity_at: row.try_get("last_activity_at")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

/// A match row together with the job card and the names of both parties.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchSummary {
    #[serde(flatten)]
    pub record: Match,
    pub job: JobRef,
    pub job_seeker_name: String,
    pub recruiter_name: String,
}

impl<'r> FromRow<'r, PgRow> for MatchSummary {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        let record = Match::from_row(row)?;
        let job = JobRef {
            id: record.job_id,
            recruiter_id: record.recruiter_id,
            title: row.try_get("job_title")?,
            company_name: row.try_get("company_name")?,
        };
        Ok(Self {
            record,
            job,
            job_seeker_name: row.try_get("job_seeker_name")?,
            recruiter_name: row.try_get("recruiter_name")?,
        })
    }
}

/// Result of the swipe entry point.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwipeOutcome {
    pub is_match: bool,
    #[serde(rename = "match", skip_serializing_if = "Option::is_none")]
    pub summary: Option<MatchSummary>,
}

impl SwipeOutcome {
    pub fn no_match() -> Self {
        Self {
            is_match: false,
            summary: None,
        }
    }

    pub fn matched(summary: MatchSummary) -> Self {
        Self {
            is_match: true,
            summary: Some(summary),
        }
    }
}

/// What the conditional match upsert observed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    /// This call moved the pair into `matched`.
    Matched(Match),
    /// Another writer already moved the pair into `matched`.
    AlreadyMatched(Match),
    /// The pair is `unmatched` and stays that way.
    Terminal(Match),
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub application_status: ApplicationStatus,
}
