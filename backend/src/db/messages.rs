use crate::models::{Conversation, Identity, Match, Message, MessageKind};
use anyhow::Result;
use sqlx::PgPool;
use uuid::Uuid;

// Chat message operations

/// Inserts the message only if the sender belongs to a matched row, and bumps
/// the recipient's unread counter in the same statement.
pub async fn insert_message(
    pool: &PgPool,
    match_id: Uuid,
    sender_id: Uuid,
    kind: MessageKind,
    content: &str,
) -> Result<Option<Message>> {
    let message = sqlx::query_as::<_, Message>(
        r#"
        WITH touched AS (
            UPDATE matches
            SET last_activity_at = NOW(),
                updated_at = NOW(),
                job_seeker_unread = job_seeker_unread + CASE WHEN recruiter_id = $2 THEN 1 ELSE 0 END,
                recruiter_unread = recruiter_unread + CASE WHEN job_seeker_id = $2 THEN 1 ELSE 0 END
            WHERE id = $1
              AND status = 'matched'
              AND (job_seeker_id = $2 OR recruiter_id = $2)
            RETURNING id
        )
        INSERT INTO messages (match_id, sender_id, kind, content)
        SELECT id, $2, $3, $4 FROM touched
        RETURNING id, match_id, sender_id, kind, content, is_read, read_at, created_at
        "#,
    )
    .bind(match_id)
    .bind(sender_id)
    .bind(kind.as_str())
    .bind(content)
    .fetch_optional(pool)
    .await?;

    Ok(message)
}

pub async fn list_messages(
    pool: &PgPool,
    match_id: Uuid,
    reader_id: Uuid,
    limit: i64,
    offset: i64,
) -> Result<Option<Vec<Message>>> {
    let is_party = sqlx::query_scalar::<_, bool>(
        r#"
        SELECT EXISTS(
            SELECT 1 FROM matches
            WHERE id = $1 AND (job_seeker_id = $2 OR recruiter_id = $2)
        )
        "#,
    )
    .bind(match_id)
    .bind(reader_id)
    .fetch_one(pool)
    .await?;

    if !is_party {
        return Ok(None);
    }

    let mut messages = sqlx::query_as::<_, Message>(
        r#"
        SELECT id, match_id, sender_id, kind, content, is_read, read_at, created_at
        FROM messages
        WHERE match_id = $1
        ORDER BY created_at DESC
        LIMIT $2 OFFSET $3
        "#,
    )
    .bind(match_id)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    // newest page, shown oldest first
    messages.reverse();

    Ok(Some(messages))
}

pub async fn mark_read(pool: &PgPool, match_id: Uuid, reader_id: Uuid) -> Result<Option<u64>> {
    let (found, flipped) = sqlx::query_as::<_, (i64, i64)>(
        r#"
        WITH reader AS (
            UPDATE matches
            SET job_seeker_unread = CASE WHEN job_seeker_id = $2 THEN 0 ELSE job_seeker_unread END,
                recruiter_unread = CASE WHEN recruiter_id = $2 THEN 0 ELSE recruiter_unread END
            WHERE id = $1 AND (job_seeker_id = $2 OR recruiter_id = $2)
            RETURNING id
        ),
        flipped AS (
            UPDATE messages
            SET is_read = TRUE, read_at = NOW()
            WHERE match_id IN (SELECT id FROM reader)
              AND sender_id <> $2
              AND is_read = FALSE
            RETURNING 1
        )
        SELECT (SELECT COUNT(*) FROM reader), (SELECT COUNT(*) FROM flipped)
        "#,
    )
    .bind(match_id)
    .bind(reader_id)
    .fetch_one(pool)
    .await?;

    if found == 0 {
        return Ok(None);
    }

    Ok(Some(flipped as u64))
}

/// Inbox view for one reader. The unread count only covers the other party's
/// messages, so a reader's own status notices never show up as unread.
pub async fn list_conversations(pool: &PgPool, reader: Identity) -> Result<Vec<Conversation>> {
    let query = format!(
        r#"
        SELECT m.id AS match_id, u.id AS other_user_id, u.first_name AS other_user_name,
               j.title AS job_title, j.company_name, unread.cnt AS unread_count,
               m.application_status, last_msg.content AS last_message,
               last_msg.created_at AS last_message_at, m.matched_at
        FROM matches m
        JOIN jobs j ON j.id = m.job_id
        JOIN users u ON u.id = m.{counterpart}
        LEFT JOIN LATERAL (
            SELECT content, created_at FROM messages
            WHERE match_id = m.id
            ORDER BY created_at DESC
            LIMIT 1
        ) last_msg ON TRUE
        CROSS JOIN LATERAL (
            SELECT COUNT(*) AS cnt FROM messages
            WHERE match_id = m.id AND sender_id <> $1 AND is_read = FALSE
        ) unread
        WHERE m.{party} = $1 AND m.status = 'matched'
        ORDER BY COALESCE(last_msg.created_at, m.matched_at) DESC
        "#,
        counterpart = Match::counterpart_column(reader.role),
        party = Match::party_column(reader.role),
    );

    let conversations = sqlx::query_as::<_, Conversation>(&query)
        .bind(reader.user_id)
        .fetch_all(pool)
        .await?;

    Ok(conversations)
}
