//! Sonora User Service
//!
//! Internal RPC service owning user profiles: profile reads and edits,
//! password changes, avatar uploads and playlist owner lookups.
//!
//! Listens on `USER_LISTEN` (default `0.0.0.0:8083`). Avatars are written
//! under `MEDIA_PATH`, which the API server serves at `/media`.

use std::sync::Arc;

use anyhow::Result;
use axum::Router;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;

use sn_common::shutdown_signal;
use sn_config::ConfigLoader;
use sn_platform::auth::{Argon2Config, PasswordPolicy, PasswordService};
use sn_platform::blob::{BlobStore, FsBlobStore};
use sn_platform::shared::file::UploadPolicy;
use sn_platform::shared::{db, health_router, HealthState};
use sn_platform::usecase::PgUnitOfWork;
use sn_platform::user::{user_rpc_router, UserRepository, UserService};

#[tokio::main]
async fn main() -> Result<()> {
    sn_common::init_logging("sn-user-server");

    info!("Starting Sonora User Service");

    let config = ConfigLoader::new().load()?;
    config.validate()?;

    let pool = db::connect(&config.database).await?;
    if config.database.apply_schema {
        db::apply_schema(&pool).await?;
    }

    let blobs: Arc<dyn BlobStore> = Arc::new(FsBlobStore::new(&config.media.path));
    let users = Arc::new(UserService::new(
        PgUnitOfWork::new(pool.clone()),
        Arc::new(UserRepository::new(pool.clone())),
        Arc::new(PasswordService::new(Argon2Config::default(), PasswordPolicy::default())?),
        blobs,
        UploadPolicy::avatars(&config.media),
    ));

    let health = HealthState::new(Some(pool), Some(env!("CARGO_PKG_VERSION").to_string()));
    let app = Router::new()
        .merge(user_rpc_router(users))
        .nest("/health", health_router(health.clone()))
        .layer(TraceLayer::new_for_http());

    let listener = TcpListener::bind(&config.services.user_listen).await?;
    info!("User service listening on {}", config.services.user_listen);
    health.set_ready();

    axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;

    info!("Sonora User Service shutdown complete");
    Ok(())
}
