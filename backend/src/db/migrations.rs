use anyhow::Result;
use sqlx::PgPool;

/// Applies the embedded schema for swipes, matches and messages.
pub async fn run_migrations(pool: &PgPool) -> Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    tracing::info!("database schema up to date");
    Ok(())
}
