use anyhow::Context;
use tracing_subscriber::EnvFilter;

use portfolio_api::config;
use portfolio_api::database::DatabaseManager;
use portfolio_api::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up DATABASE_URL, JWT_SECRET, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("portfolio_api=info,tower_http=info")),
        )
        .init();

    // Initialize configuration (this loads the config singleton)
    let config = config::config().clone();
    config.validate()?;
    tracing::info!("Starting Portfolio API in {:?} mode", config.environment);

    // validate() only lets a missing DATABASE_URL through in development
    let state = if config.database.url.is_some() {
        let database = DatabaseManager::connect(&config.database).await?;
        database.migrate().await?;
        AppState::with_postgres(config.clone(), database)?
    } else {
        tracing::warn!("DATABASE_URL not set; using in-memory stores, data is lost on restart");
        AppState::in_memory(config.clone())?
    };

    tokio::fs::create_dir_all(&config.storage.upload_dir)
        .await
        .with_context(|| format!("failed to create upload dir {}", config.storage.upload_dir.display()))?;

    let app = portfolio_api::app(state.clone());

    let bind_addr = format!("0.0.0.0:{}", config.api.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;

    tracing::info!("Portfolio API listening on http://{}", bind_addr);

    axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;

    if let Some(database) = &state.database {
        database.close().await;
    }
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
