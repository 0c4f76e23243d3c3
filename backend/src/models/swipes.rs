use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Row, postgres::PgRow};
use std::str::FromStr;
use uuid::Uuid;

/// What kind of card was swiped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SwipeCategory {
    Job,
    Profile,
}

impl SwipeCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            SwipeCategory::Job => "job",
            SwipeCategory::Profile => "profile",
        }
    }
}

impl FromStr for SwipeCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "job" => Ok(SwipeCategory::Job),
            "profile" => Ok(SwipeCategory::Profile),
            other => Err(format!("unknown swipe category: {}", other)),
        }
    }
}

/// Swipe direction. Wire values follow the card gesture: left passes,
/// right signals interest, up signals strong interest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SwipeDirection {
    #[serde(rename = "left")]
    Reject,
    #[serde(rename = "right")]
    Interested,
    #[serde(rename = "up")]
    SuperInterested,
}

impl SwipeDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            SwipeDirection::Reject => "left",
            SwipeDirection::Interested => "right",
            SwipeDirection::SuperInterested => "up",
        }
    }

    pub fn is_qualifying(&self) -> bool {
        !matches!(self, SwipeDirection::Reject)
    }
}

impl FromStr for SwipeDirection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "left" => Ok(SwipeDirection::Reject),
            "right" => Ok(SwipeDirection::Interested),
            "up" => Ok(SwipeDirection::SuperInterested),
            other => Err(format!("unknown swipe direction: {}", other)),
        }
    }
}

/// One row of the swipe ledger. Unique per (swiper, target, category).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Swipe {
    pub id: Uuid,
    pub swiper_id: Uuid,
    pub target_id: Uuid,
    pub category: SwipeCategory,
    pub direction: SwipeDirection,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Swipe {
    pub fn is_qualifying(&self) -> bool {
        self.direction.is_qualifying()
    }
}

impl<'r> FromRow<'r, PgRow> for Swipe {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            swiper_id: row.try_get("swiper_id")?,
            target_id: row.try_get("target_id")?,
            category: decode_text(row, "category")?,
            direction: decode_text(row, "direction")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

/// Reads a text column and parses it into one of the model enums.
pub(crate) fn decode_text<T>(row: &PgRow, column: &str) -> Result<T, sqlx::Error>
where
    T: FromStr<Err = String>,
{
    let raw: String = row.try_get(column)?;
    raw.parse().map_err(|e: String| sqlx::Error::ColumnDecode {
        index: column.to_string(),
        source: e.into(),
    })
}

#[derive(Debug, Deserialize)]
pub struct SwipeRequest {
    pub target_id: Uuid,
    pub direction: SwipeDirection,
    #[serde(default)]
    pub category: Option<SwipeCategory>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_reject_is_non_qualifying() {
        assert!(!SwipeDirection::Reject.is_qualifying());
        assert!(SwipeDirection::Interested.is_qualifying());
        assert!(SwipeDirection::SuperInterested.is_qualifying());
    }

    #[test]
    fn swipe_request_uses_gesture_names() {
        let req: SwipeRequest = serde_json::from_str(
            r#"{"target_id":"6f1c1f0e-8a4e-4b8a-9d55-0c8f0d7a1e11","direction":"up"}"#,
        )
        .unwrap();
        assert_eq!(req.direction, SwipeDirection::SuperInterested);
        assert!(req.category.is_none());

        let bad = serde_json::from_str::<SwipeRequest>(
            r#"{"target_id":"6f1c1f0e-8a4e-4b8a-9d55-0c8f0d7a1e11","direction":"down"}"#,
        );
        assert!(bad.is_err());
    }
}
