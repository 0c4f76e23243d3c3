use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::swipes::SwipeCategory;

/// Which side of the marketplace a user is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    JobSeeker,
    Recruiter,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::JobSeeker => "job_seeker",
            Role::Recruiter => "recruiter",
        }
    }

    /// Job seekers swipe on jobs, recruiters swipe on candidate profiles.
    pub fn swipe_category(&self) -> SwipeCategory {
        match self {
            Role::JobSeeker => SwipeCategory::Job,
            Role::Recruiter => SwipeCategory::Profile,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "job_seeker" => Ok(Role::JobSeeker),
            "recruiter" => Ok(Role::Recruiter),
            other => Err(format!("unknown role: {}", other)),
        }
    }
}

/// Identity handed to the core by the identity service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Identity {
    pub user_id: Uuid,
    pub role: Role,
}

impl Identity {
    pub fn new(user_id: Uuid, role: Role) -> Self {
        Self { user_id, role }
    }
}

/// Aggregate per-user counters maintained by the core.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserCounters {
    pub total_swipes: i32,
    pub total_matches: i32,
}

/// A job as seen through the job directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct JobRef {
    pub id: Uuid,
    pub recruiter_id: Uuid,
    pub title: String,
    pub company_name: String,
}

/// A candidate profile as seen through the profile directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct ProfileRef {
    pub id: Uuid,
    pub user_id: Uuid,
}
