//! Formcredits service entrypoint.

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use formcredits_service::{create_router, AppState, ServiceConfig};
use formcredits_store::RocksStore;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,formcredits_service=debug")),
        )
        .init();

    let config = ServiceConfig::from_env();

    tracing::info!(
        bind_addr = %config.bind_addr,
        db_path = %config.db_path,
        signup_bonus = %config.credits.signup_bonus,
        "Starting formcredits service"
    );

    let store = Arc::new(RocksStore::open(&config.db_path)?);

    let bind_addr = config.bind_addr.clone();
    let state = AppState::new(store, config);
    let router = create_router(state);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!(addr = %bind_addr, "Listening");

    axum::serve(listener, router).await?;

    Ok(())
}
