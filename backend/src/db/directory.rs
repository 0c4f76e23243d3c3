use crate::models::{JobRef, ProfileRef};
use anyhow::Result;
use sqlx::PgPool;
use uuid::Uuid;

// Read-only lookups into the job and profile directories. Those tables are
// owned by the listing and profile services.

pub async fn get_job(pool: &PgPool, job_id: Uuid) -> Result<Option<JobRef>> {
    let job = sqlx::query_as::<_, JobRef>(
        "SELECT id, recruiter_id, title, company_name FROM jobs WHERE id = $1",
    )
    .bind(job_id)
    .fetch_optional(pool)
    .await?;

    Ok(job)
}

pub async fn get_profile(pool: &PgPool, profile_id: Uuid) -> Result<Option<ProfileRef>> {
    let profile = sqlx::query_as::<_, ProfileRef>(
        "SELECT id, user_id FROM job_seeker_profiles WHERE id = $1",
    )
    .bind(profile_id)
    .fetch_optional(pool)
    .await?;

    Ok(profile)
}

pub async fn get_profile_by_user(pool: &PgPool, user_id: Uuid) -> Result<Option<ProfileRef>> {
    let profile = sqlx::query_as::<_, ProfileRef>(
        "SELECT id, user_id FROM job_seeker_profiles WHERE user_id = $1",
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await?;

    Ok(profile)
}

pub async fn get_first_name(pool: &PgPool, user_id: Uuid) -> Result<Option<String>> {
    let name = sqlx::query_scalar::<_, String>("SELECT first_name FROM users WHERE id = $1")
        .bind(user_id)
        .fetch_optional(pool)
        .await?;

    Ok(name)
}
