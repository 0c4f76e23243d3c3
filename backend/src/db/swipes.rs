use crate::models::{Swipe, SwipeCategory, SwipeDirection};
use anyhow::Result;
use sqlx::PgPool;
use uuid::Uuid;

// Swipe ledger operations

/// Upsert keyed on (swiper, target, category). The swiper's swipe counter is
/// bumped by the same statement so a retried request never leaves the two
/// out of step.
pub async fn record_swipe(
    pool: &PgPool,
    swiper_id: Uuid,
    target_id: Uuid,
    category: SwipeCategory,
    direction: SwipeDirection,
) -> Result<Swipe> {
    let swipe = sqlx::query_as::<_, Swipe>(
        r#"
        WITH recorded AS (
            INSERT INTO swipes (swiper_id, target_id, category, direction)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (swiper_id, target_id, category)
            DO UPDATE SET direction = EXCLUDED.direction, updated_at = NOW()
            RETURNING id, swiper_id, target_id, category, direction, created_at, updated_at
        ),
        counted AS (
            UPDATE users
            SET total_swipes = total_swipes + 1, last_swipe_date = NOW(), updated_at = NOW()
            WHERE id = $1
        )
        SELECT id, swiper_id, target_id, category, direction, created_at, updated_at
        FROM recorded
        "#,
    )
    .bind(swiper_id)
    .bind(target_id)
    .bind(category.as_str())
    .bind(direction.as_str())
    .fetch_one(pool)
    .await?;

    Ok(swipe)
}

pub async fn find_swipe(
    pool: &PgPool,
    swiper_id: Uuid,
    target_id: Uuid,
    category: SwipeCategory,
) -> Result<Option<Swipe>> {
    let swipe = sqlx::query_as::<_, Swipe>(
        r#"
        SELECT id, swiper_id, target_id, category, direction, created_at, updated_at
        FROM swipes
        WHERE swiper_id = $1 AND target_id = $2 AND category = $3
        "#,
    )
    .bind(swiper_id)
    .bind(target_id)
    .bind(category.as_str())
    .fetch_optional(pool)
    .await?;

    Ok(swipe)
}

pub async fn get_swipe_history(pool: &PgPool, swiper_id: Uuid, limit: i64) -> Result<Vec<Swipe>> {
    let swipes = sqlx::query_as::<_, Swipe>(
        r#"
        SELECT id, swiper_id, target_id, category, direction, created_at, updated_at
        FROM swipes
        WHERE swiper_id = $1
        ORDER BY updated_at DESC
        LIMIT $2
        "#,
    )
    .bind(swiper_id)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(swipes)
}

/// Dev-only: forget every swipe a user made. Match rows are left alone.
pub async fn delete_swipes_for_user(pool: &PgPool, swiper_id: Uuid) -> Result<u64> {
    let result = sqlx::query("DELETE FROM swipes WHERE swiper_id = $1")
        .bind(swiper_id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected())
}
