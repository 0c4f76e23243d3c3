use crate::models::{
    ApplicationStatus, Identity, JobRef, Match, MatchStatus, MatchSummary, PairKey, Transition,
};
use anyhow::{Result, anyhow};
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

// Match row operations. Each mutation is one conditional statement keyed on
// the (job_id, job_seeker_id) unique constraint.

pub async fn find_pair(pool: &PgPool, key: PairKey) -> Result<Option<Match>> {
    let row = sqlx::query_as::<_, Match>(
        r#"
        SELECT * FROM matches
        WHERE job_id = $1 AND job_seeker_id = $2
        "#,
    )
    .bind(key.job_id)
    .bind(key.job_seeker_id)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

pub async fn upsert_pending(
    pool: &PgPool,
    job: &JobRef,
    job_seeker_id: Uuid,
    seeker_swiped_at: DateTime<Utc>,
) -> Result<Match> {
    sqlx::query(
        r#"
        INSERT INTO matches (job_id, job_seeker_id, recruiter_id, status, job_seeker_swiped_at, last_activity_at)
        VALUES ($1, $2, $3, 'pending', $4, $4)
        ON CONFLICT (job_id, job_seeker_id) DO NOTHING
        "#,
    )
    .bind(job.id)
    .bind(job_seeker_id)
    .bind(job.recruiter_id)
    .bind(seeker_swiped_at)
    .execute(pool)
    .await?;

    find_pair(pool, PairKey::new(job.id, job_seeker_id))
        .await?
        .ok_or_else(|| anyhow!("match row for job {} missing after upsert", job.id))
}

pub async fn commit_match(
    pool: &PgPool,
    job: &JobRef,
    job_seeker_id: Uuid,
    seeker_swiped_at: DateTime<Utc>,
    recruiter_swiped_at: DateTime<Utc>,
) -> Result<Transition> {
    let now = Utc::now();
    let mut tx = pool.begin().await?;

    // Only an absent or pending row advances. A row already matched or
    // unmatched makes the DO UPDATE a no-op and RETURNING yields nothing.
    let advanced = sqlx::query_as::<_, Match>(
        r#"
        INSERT INTO matches (
            job_id, job_seeker_id, recruiter_id, status,
            job_seeker_swiped_at, recruiter_swiped_at, matched_at, last_activity_at
        )
        VALUES ($1, $2, $3, 'matched', $4, $5, $6, $6)
        ON CONFLICT (job_id, job_seeker_id) DO UPDATE
        SET status = 'matched',
            job_seeker_swiped_at = COALESCE(matches.job_seeker_swiped_at, EXCLUDED.job_seeker_swiped_at),
            recruiter_swiped_at = EXCLUDED.recruiter_swiped_at,
            matched_at = EXCLUDED.matched_at,
            last_activity_at = EXCLUDED.matched_at,
            updated_at = EXCLUDED.matched_at
        WHERE matches.status = 'pending'
        RETURNING *
        "#,
    )
    .bind(job.id)
    .bind(job_seeker_id)
    .bind(job.recruiter_id)
    .bind(seeker_swiped_at)
    .bind(recruiter_swiped_at)
    .bind(now)
    .fetch_optional(&mut *tx)
    .await?;

    if let Some(row) = advanced {
        sqlx::query(
            r#"
            UPDATE users SET total_matches = total_matches + 1, updated_at = NOW()
            WHERE id IN ($1, $2)
            "#,
        )
        .bind(job_seeker_id)
        .bind(job.recruiter_id)
        .execute(&mut *tx)
        .await?;

        sqlx::query("UPDATE jobs SET match_count = match_count + 1 WHERE id = $1")
            .bind(job.id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        return Ok(Transition::Matched(row));
    }

    tx.rollback().await?;

    let current = find_pair(pool, PairKey::new(job.id, job_seeker_id))
        .await?
        .ok_or_else(|| anyhow!("match row for job {} missing after upsert", job.id))?;

    match current.status {
        MatchStatus::Matched => Ok(Transition::AlreadyMatched(current)),
        MatchStatus::Unmatched => Ok(Transition::Terminal(current)),
        MatchStatus::Pending => Err(anyhow!(
            "match {} stayed pending through a conditional upsert",
            current.id
        )),
    }
}

pub async fn find_reciprocal_job(
    pool: &PgPool,
    job_seeker_id: Uuid,
    recruiter_id: Uuid,
) -> Result<Option<(JobRef, DateTime<Utc>)>> {
    let row = sqlx::query_as::<_, (Uuid, Uuid, String, String, DateTime<Utc>)>(
        r#"
        SELECT j.id, j.recruiter_id, j.title, j.company_name, s.updated_at
        FROM swipes s
        JOIN jobs j ON j.id = s.target_id
        LEFT JOIN matches m ON m.job_id = j.id AND m.job_seeker_id = s.swiper_id
        WHERE s.swiper_id = $1
          AND s.category = 'job'
          AND s.direction IN ('right', 'up')
          AND j.recruiter_id = $2
          AND (m.status IS NULL OR m.status <> 'unmatched')
        ORDER BY CASE WHEN m.status = 'matched' THEN 1 ELSE 0 END, s.created_at ASC
        LIMIT 1
        "#,
    )
    .bind(job_seeker_id)
    .bind(recruiter_id)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|(id, recruiter_id, title, company_name, swiped_at)| {
        (
            JobRef {
                id,
                recruiter_id,
                title,
                company_name,
            },
            swiped_at,
        )
    }))
}

pub async fn unmatch(pool: &PgPool, match_id: Uuid, requester_id: Uuid) -> Result<Option<Match>> {
    let row = sqlx::query_as::<_, Match>(
        r#"
        UPDATE matches
        SET status = 'unmatched', updated_at = NOW(), last_activity_at = NOW()
        WHERE id = $1
          AND (job_seeker_id = $2 OR recruiter_id = $2)
          AND status <> 'unmatched'
        RETURNING *
        "#,
    )
    .bind(match_id)
    .bind(requester_id)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

pub async fn get_match_for_party(
    pool: &PgPool,
    match_id: Uuid,
    user_id: Uuid,
) -> Result<Option<MatchSummary>> {
    let summary = sqlx::query_as::<_, MatchSummary>(
        r#"
        SELECT m.*, j.title AS job_title, j.company_name,
               js.first_name AS job_seeker_name, rc.first_name AS recruiter_name
        FROM matches m
        JOIN jobs j ON j.id = m.job_id
        JOIN users js ON js.id = m.job_seeker_id
        JOIN users rc ON rc.id = m.recruiter_id
        WHERE m.id = $1 AND (m.job_seeker_id = $2 OR m.recruiter_id = $2)
        "#,
    )
    .bind(match_id)
    .bind(user_id)
    .fetch_optional(pool)
    .await?;

    Ok(summary)
}

pub async fn list_matches(pool: &PgPool, identity: Identity) -> Result<Vec<MatchSummary>> {
    let query = format!(
        r#"
        SELECT m.*, j.title AS job_title, j.company_name,
               js.first_name AS job_seeker_name, rc.first_name AS recruiter_name
        FROM matches m
        JOIN jobs j ON j.id = m.job_id
        JOIN users js ON js.id = m.job_seeker_id
        JOIN users rc ON rc.id = m.recruiter_id
        WHERE m.{} = $1 AND m.status = 'matched'
        ORDER BY m.last_activity_at DESC
        "#,
        Match::party_column(identity.role)
    );

    let summaries = sqlx::query_as::<_, MatchSummary>(&query)
        .bind(identity.user_id)
        .fetch_all(pool)
        .await?;

    Ok(summaries)
}

/// The status change and its chat notice land in one statement, so an unmatch
/// racing the update either blocks both or neither.
pub async fn update_application_status(
    pool: &PgPool,
    match_id: Uuid,
    recruiter_id: Uuid,
    status: ApplicationStatus,
    notice: &str,
) -> Result<Option<MatchSummary>> {
    let summary = sqlx::query_as::<_, MatchSummary>(
        r#"
        WITH updated AS (
            UPDATE matches
            SET application_status = $3,
                job_seeker_unread = job_seeker_unread + 1,
                last_activity_at = NOW(),
                updated_at = NOW()
            WHERE id = $1 AND recruiter_id = $2 AND status = 'matched'
            RETURNING *
        ),
        notice AS (
            INSERT INTO messages (match_id, sender_id, kind, content)
            SELECT id, $2, 'status', $4 FROM updated
        )
        SELECT m.*, j.title AS job_title, j.company_name,
               js.first_name AS job_seeker_name, rc.first_name AS recruiter_name
        FROM updated m
        JOIN jobs j ON j.id = m.job_id
        JOIN users js ON js.id = m.job_seeker_id
        JOIN users rc ON rc.id = m.recruiter_id
        "#,
    )
    .bind(match_id)
    .bind(recruiter_id)
    .bind(status.as_str())
    .bind(notice)
    .fetch_optional(pool)
    .await?;

    Ok(summary)
}
