use std::net::SocketAddr;
use std::sync::Arc;

use portfolio_inbox::{
    config::{get_config, init_config},
    database::pool::{create_pool, run_migrations},
    routes,
    store::{DocumentStore, MemoryStore, PgDocumentStore},
    utils::logging::init_tracing,
    AppState,
};
use tokio::net::TcpListener;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing("portfolio_inbox=info,tower_http=info");
    init_config()?;
    let config = get_config()?;

    let store: Arc<dyn DocumentStore> = match config.database_url.as_deref() {
        Some(database_url) => {
            let pool = create_pool(database_url).await?;
            run_migrations(&pool).await?;
            info!("Using Postgres contact store");
            Arc::new(PgDocumentStore::new(pool))
        }
        None => {
            warn!("DATABASE_URL not set, contact messages are kept in memory only");
            Arc::new(MemoryStore::new())
        }
    };

    let app_state = AppState::from_config(config, store)?;
    if !app_state.chat_service.is_configured() {
        warn!("GEMINI_API_KEY not set, chat assistant answers with the disabled notice");
    }

    let app = routes::router(app_state);

    let addr: SocketAddr = config.server_address.parse()?;
    info!("Server listening on {}", addr);
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = ?e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
