//! Sonora Search Service
//!
//! Internal RPC service answering the `Find*` streams with PostgreSQL
//! full-text matches.
//!
//! Listens on `SEARCH_LISTEN` (default `0.0.0.0:8082`).

use std::sync::Arc;

use anyhow::Result;
use axum::Router;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;

use sn_common::shutdown_signal;
use sn_config::ConfigLoader;
use sn_platform::search::{search_rpc_router, PgSearchRepository, SearchIndex};
use sn_platform::shared::{db, health_router, HealthState};

#[tokio::main]
async fn main() -> Result<()> {
    sn_common::init_logging("sn-search-server");

    info!("Starting Sonora Search Service");

    let config = ConfigLoader::new().load()?;
    config.validate()?;

    let pool = db::connect(&config.database).await?;
    if config.database.apply_schema {
        db::apply_schema(&pool).await?;
    }

    let index: Arc<dyn SearchIndex> = Arc::new(PgSearchRepository::new(pool.clone()));

    let health = HealthState::new(Some(pool), Some(env!("CARGO_PKG_VERSION").to_string()));
    let app = Router::new()
        .merge(search_rpc_router(index))
        .nest("/health", health_router(health.clone()))
        .layer(TraceLayer::new_for_http());

    let listener = TcpListener::bind(&config.services.search_listen).await?;
    info!("Search service listening on {}", config.services.search_listen);
    health.set_ready();

    axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;

    info!("Sonora Search Service shutdown complete");
    Ok(())
}
