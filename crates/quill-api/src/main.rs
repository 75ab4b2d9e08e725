mod auth;
mod config;
mod error;
mod routes;
mod validation;

use std::sync::Arc;

use config::AppConfig;
use quill_core::db::{Database, LibSqlNoteStore};
use quill_core::NoteService;
use routes::{app_router, AppState};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Only load .env in development; production uses platform-native env injection.
    #[cfg(debug_assertions)]
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("quill_api=info".parse()?),
        )
        .init();

    let config = Arc::new(AppConfig::from_env()?);
    tracing::info!("Starting quill-api with config: {:?}", config);

    let db = open_database(&config).await?;
    let notes = NoteService::new(Arc::new(LibSqlNoteStore::new(db)));

    let state = AppState::new(config, notes);
    let bind_addr = state.config.bind_addr.clone();
    let router = app_router(state);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!("quill-api listening on {}", bind_addr);
    axum::serve(listener, router).await?;
    Ok(())
}

async fn open_database(config: &AppConfig) -> quill_core::Result<Database> {
    if let Some(replica) = config.replica.clone() {
        tracing::info!(path = %config.database_path, "Opening embedded replica");
        return Database::open_replica(&config.database_path, replica).await;
    }
    if config.database_path == ":memory:" {
        tracing::warn!("Using an in-memory database; notes will not survive a restart");
        return Database::open_in_memory().await;
    }
    tracing::info!(path = %config.database_path, "Opening local database");
    Database::open(&config.database_path).await
}
