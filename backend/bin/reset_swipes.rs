use anyhow::Result;
use clap::{Arg, Command};
use swipematch::db::{DatabaseConfig, get_db_pool, swipes};
use tracing::{info, warn};
use uuid::Uuid;

#[tokio::main]
async fn main() -> Result<()> {
    swipematch::utils::init_logging();

    let matches = Command::new("reset-swipes")
        .about("Development helper: forget every swipe a user has made")
        .arg(
            Arg::new("user-id")
                .long("user-id")
                .help("UUID of the user whose swipes are deleted")
                .required(true),
        )
        .arg(
            Arg::new("confirm")
                .long("confirm")
                .help("Confirm the deletion (nothing is deleted without it)")
                .action(clap::ArgAction::SetTrue),
        )
        .get_matches();

    let user_id: Uuid = matches
        .get_one::<String>("user-id")
        .ok_or_else(|| anyhow::anyhow!("--user-id is required"))?
        .parse()
        .map_err(|e| anyhow::anyhow!("--user-id must be a UUID: {}", e))?;

    if !matches.get_flag("confirm") {
        warn!(%user_id, "Reset not confirmed. Use --confirm to delete this user's swipes.");
        return Ok(());
    }

    let db_config = DatabaseConfig::from_env()?;
    let pool = get_db_pool(&db_config).await?;
    info!("Connected to database");

    let deleted = swipes::delete_swipes_for_user(&pool, user_id).await?;
    info!(%user_id, deleted, "Swipe history cleared; match rows were left untouched");

    Ok(())
}
