use std::sync::Arc;

use accounts::{
    AppState,
    config::Settings,
    middleware::TracingRequestLogger,
    repositories::{PgAccountDirectory, PgCollaborationStore},
    routes,
};
use anyhow::Result;
use common::database;
use sqlx::migrate::Migrator;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("Starting account service");

    // A missing or weak signing secret stops startup here
    let settings = Settings::load()?;

    // Initialize database connection pool
    let pool = database::init_pool(&settings.database).await?;

    // Check database connectivity
    if database::health_check(&pool).await? {
        info!("Database connection successful");
    } else {
        anyhow::bail!("Failed to connect to database");
    }

    database::run_migrations(&pool, &MIGRATOR).await?;

    let app_state = AppState::new(
        &settings,
        Arc::new(PgAccountDirectory::new(pool.clone())),
        Arc::new(PgCollaborationStore::new(pool)),
        Arc::new(TracingRequestLogger),
    )?;

    // Start the web server
    let app = routes::create_router(app_state);

    let address = settings.server.bind_address();
    let listener = TcpListener::bind(&address).await?;
    info!("Account service listening on {}", address);

    axum::serve(listener, app).await?;

    Ok(())
}
