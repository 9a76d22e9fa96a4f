//! Boutique stock platform - Backend Server

use std::{net::SocketAddr, sync::Arc, time::Duration};

use boutique_backend::{
    create_app, services::Notifier, store::PgInventoryStore, AppState, Config,
};
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    dotenvy::dotenv().ok();
    let config = Config::load()?;

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "boutique_server=debug,boutique_backend=debug,tower_http=debug,sqlx=warn".into());
    let registry = tracing_subscriber::registry().with(filter);
    if config.is_production() {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    tracing::info!("Starting Boutique Stock Server");
    tracing::info!("Environment: {}", config.environment);

    // Create database connection pool
    tracing::info!("Connecting to database...");
    let db_pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .min_connections(config.database.min_connections)
        .acquire_timeout(Duration::from_secs(30))
        .connect(&config.database.url)
        .await?;

    tracing::info!("Database connection established");

    // Run migrations in development
    if config.environment == "development" {
        tracing::info!("Running database migrations...");
        sqlx::migrate!("./migrations").run(&db_pool).await?;
        tracing::info!("Migrations completed");
    }

    // Notification fan-out
    let notifier = Notifier::from_config(&config.notifications, Some(db_pool.clone()))?;
    if notifier.spawn_relay_listener().is_some() {
        tracing::info!(
            channel = %config.notifications.pg_channel,
            "Notification relay enabled"
        );
    }

    tracing::info!(
        order_stock_policy = ?config.inventory.order_stock_policy,
        "Inventory settings loaded"
    );

    // Create application state
    let store = Arc::new(PgInventoryStore::new(db_pool));
    let state = AppState::new(store, notifier, config.clone());

    // Build application
    let app = create_app(state);

    // Start server
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
