//! Sonora Authorization Service
//!
//! Internal RPC service behind the API server: account creation,
//! credential checks and session version bumps on logout.
//!
//! Listens on `AUTH_LISTEN` (default `0.0.0.0:8081`).

use std::sync::Arc;

use anyhow::Result;
use axum::Router;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;

use sn_common::shutdown_signal;
use sn_config::ConfigLoader;
use sn_platform::auth::{authorization_rpc_router, AccountService, Argon2Config, PasswordPolicy, PasswordService};
use sn_platform::shared::{db, health_router, HealthState};
use sn_platform::user::UserRepository;

#[tokio::main]
async fn main() -> Result<()> {
    sn_common::init_logging("sn-auth-server");

    info!("Starting Sonora Authorization Service");

    let config = ConfigLoader::new().load()?;
    config.validate()?;

    let pool = db::connect(&config.database).await?;
    if config.database.apply_schema {
        db::apply_schema(&pool).await?;
    }

    let users = Arc::new(UserRepository::new(pool.clone()));
    let passwords = Arc::new(PasswordService::new(Argon2Config::default(), PasswordPolicy::default())?);
    let accounts = Arc::new(AccountService::new(users, passwords));

    let health = HealthState::new(Some(pool), Some(env!("CARGO_PKG_VERSION").to_string()));
    let app = Router::new()
        .merge(authorization_rpc_router(accounts))
        .nest("/health", health_router(health.clone()))
        .layer(TraceLayer::new_for_http());

    let listener = TcpListener::bind(&config.services.auth_listen).await?;
    info!("Authorization service listening on {}", config.services.auth_listen);
    health.set_ready();

    axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;

    info!("Sonora Authorization Service shutdown complete");
    Ok(())
}
