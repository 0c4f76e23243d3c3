use std::sync::Arc;
use swipematch::db::{DatabaseConfig, PgStore, migrations::run_migrations};
use swipematch::{AppState, Config, create_router, get_db_pool, utils};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    utils::init_logging();

    let config = Config::from_env()?;
    let db_config = DatabaseConfig::from_env()?;
    let pool = get_db_pool(&db_config).await?;

    // Run migrations
    run_migrations(&pool).await?;

    let store = Arc::new(PgStore::new(pool));
    let state = AppState::new(store, config.session.clone());
    let app = create_router(state, &config.allowed_origins);

    let listener = tokio::net::TcpListener::bind(&format!("0.0.0.0:{}", config.port)).await?;
    tracing::info!("Server running on port {}", config.port);

    axum::serve(listener, app).await?;

    Ok(())
}
