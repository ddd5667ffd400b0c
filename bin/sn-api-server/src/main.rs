//! Sonora API Server
//!
//! Public HTTP backend:
//! - `/auth`: sign-up, login, logout
//! - `/api`: catalog, playlists, likes, feed, search, user profiles
//! - `/media`: stored uploads
//! - `/health`, `/swagger-ui`
//!
//! Accounts, profiles and search are served by the sibling RPC services;
//! catalog data is read from PostgreSQL directly.
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `SONORA_CONFIG` | - | Path to the TOML configuration file |
//! | `API_LISTEN` | `0.0.0.0:8080` | HTTP listen address |
//! | `AUTH_CONNECT` | `http://127.0.0.1:8081` | Authorization service |
//! | `SEARCH_CONNECT` | `http://127.0.0.1:8082` | Search service |
//! | `USER_CONNECT` | `http://127.0.0.1:8083` | User service |
//! | `SECRET` | - | Token signing secret |
//! | `MEDIA_PATH` | `./media` | Blob store root |
//! | `RUST_LOG` | `info` | Log level |

use std::sync::Arc;

use anyhow::Result;
use axum::body::Body;
use axum::extract::DefaultBodyLimit;
use axum::http::{header, HeaderName, HeaderValue, Method, Request};
use axum::{middleware, Router};
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::services::ServeDir;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, info_span};
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa_axum::router::OpenApiRouter;
use utoipa_swagger_ui::SwaggerUi;

use sn_common::{shutdown_signal, REQUEST_ID_HEADER};
use sn_config::{AppConfig, ConfigLoader, MIB};
use sn_platform::album::{albums_router, AlbumRepository, AlbumService, AlbumsState};
use sn_platform::artist::{artists_router, ArtistRepository, ArtistService, ArtistsState};
use sn_platform::auth::token_service::{TokenConfig, TokenService};
use sn_platform::auth::{auth_router, csrf_router, AuthAgent, AuthState, RpcAuthAgent};
use sn_platform::blob::{BlobStore, FsBlobStore};
use sn_platform::feed::{feed_router, FeedState};
use sn_platform::like::{likes_router, LikeRepository, LikeService, LikeTarget};
use sn_platform::playlist::operations::{
    AddPlaylistOwnerUseCase, AddTrackUseCase, CreatePlaylistUseCase, DeletePlaylistUseCase, PlaylistQueries,
    RemoveTrackUseCase, ReorderTrackUseCase, UpdatePlaylistUseCase, UploadPlaylistCoverUseCase,
};
use sn_platform::playlist::{playlists_router, PlaylistRepository, PlaylistsState};
use sn_platform::search::{search_router, RpcSearchAgent, SearchAgent, SearchService, SearchState};
use sn_platform::shared::db;
use sn_platform::shared::file::UploadPolicy;
use sn_platform::shared::middleware::require_anti_forgery;
use sn_platform::shared::{health_router, AdmissionLayer, AdmissionState, HealthState};
use sn_platform::track::{tracks_router, TrackRepository, TrackService, TracksState};
use sn_platform::user::{users_router, RpcUserAgent, UserAgent, UsersState};
use sn_platform::usecase::PgUnitOfWork;

#[tokio::main]
async fn main() -> Result<()> {
    sn_common::init_logging("sn-api-server");

    info!("Starting Sonora API Server");

    let config = ConfigLoader::new().load()?;
    config.validate()?;

    let pool = db::connect(&config.database).await?;
    if config.database.apply_schema {
        db::apply_schema(&pool).await?;
    }
    let uow = PgUnitOfWork::new(pool.clone());

    // Repositories
    let artist_repo = Arc::new(ArtistRepository::new(pool.clone()));
    let album_repo = Arc::new(AlbumRepository::new(pool.clone()));
    let track_repo = Arc::new(TrackRepository::new(pool.clone()));
    let playlist_repo = Arc::new(PlaylistRepository::new(pool.clone()));
    let like_repo = Arc::new(LikeRepository::new(pool.clone()));
    info!("Repositories initialized");

    // Upstream services
    let auth_agent: Arc<dyn AuthAgent> = Arc::new(RpcAuthAgent::connect(&config.services.auth_connect)?);
    let user_agent: Arc<dyn UserAgent> = Arc::new(RpcUserAgent::connect(&config.services.user_connect)?);
    let search_agent: Arc<dyn SearchAgent> = Arc::new(RpcSearchAgent::connect(&config.services.search_connect)?);
    info!(
        auth = %config.services.auth_connect,
        user = %config.services.user_connect,
        search = %config.services.search_connect,
        "RPC channels configured"
    );

    let blobs: Arc<dyn BlobStore> = Arc::new(FsBlobStore::new(&config.media.path));
    let tokens = Arc::new(TokenService::new(TokenConfig::from_app_config(&config.auth)));

    // Catalog services
    let likes = Arc::new(LikeService::new(like_repo));
    let artists = Arc::new(ArtistService::new(
        uow.clone(),
        artist_repo.clone(),
        likes.clone(),
        blobs.clone(),
        UploadPolicy::avatars(&config.media),
    ));
    let albums = Arc::new(AlbumService::new(
        uow.clone(),
        album_repo.clone(),
        artist_repo.clone(),
        artists.clone(),
        likes.clone(),
        blobs.clone(),
        UploadPolicy::album_covers(&config.media),
    ));
    let tracks = Arc::new(TrackService::new(
        uow.clone(),
        track_repo.clone(),
        album_repo,
        artist_repo,
        playlist_repo.clone(),
        artists.clone(),
        likes.clone(),
        blobs.clone(),
        UploadPolicy::records(&config.media),
        config.media.default_track_cover.clone(),
    ));
    let playlist_queries = Arc::new(PlaylistQueries::new(
        playlist_repo.clone(),
        likes.clone(),
        user_agent.clone(),
    ));
    let search = Arc::new(SearchService::new(search_agent));

    let playlists_state = PlaylistsState {
        create_use_case: Arc::new(CreatePlaylistUseCase::new(
            uow.clone(),
            playlist_repo.clone(),
            user_agent.clone(),
        )),
        update_use_case: Arc::new(UpdatePlaylistUseCase::new(uow.clone(), playlist_repo.clone())),
        cover_use_case: Arc::new(UploadPlaylistCoverUseCase::new(
            playlist_repo.clone(),
            blobs,
            UploadPolicy::playlist_covers(&config.media),
        )),
        add_track_use_case: Arc::new(AddTrackUseCase::new(uow.clone(), playlist_repo.clone(), track_repo)),
        remove_track_use_case: Arc::new(RemoveTrackUseCase::new(uow.clone(), playlist_repo.clone())),
        reorder_use_case: Arc::new(ReorderTrackUseCase::new(uow.clone(), playlist_repo.clone())),
        add_owner_use_case: Arc::new(AddPlaylistOwnerUseCase::new(
            uow.clone(),
            playlist_repo.clone(),
            user_agent.clone(),
        )),
        delete_use_case: Arc::new(DeletePlaylistUseCase::new(uow, playlist_repo)),
        queries: playlist_queries.clone(),
        tracks: tracks.clone(),
        max_upload_size: config.media.max_upload_size,
    };
    info!("Use cases initialized");

    let auth_state = AuthState {
        auth: auth_agent.clone(),
        tokens: tokens.clone(),
        secure_cookies: config.auth.secure_cookies,
    };
    let admission = AdmissionState {
        tokens,
        auth: auth_agent,
        request_timeout: config.http.request_timeout(),
    };

    // Everything under /api passes the anti-forgery check on mutations
    let (api_routes, mut openapi) = OpenApiRouter::new()
        .nest("/api/csrf", csrf_router(auth_state.clone()))
        .nest(
            "/api/users",
            users_router(UsersState {
                users: user_agent,
                tracks: tracks.clone(),
                albums: albums.clone(),
                artists: artists.clone(),
                playlists: playlist_queries.clone(),
                max_upload_size: config.media.max_upload_size,
            }),
        )
        .nest(
            "/api/artists",
            artists_router(ArtistsState {
                artists: artists.clone(),
                albums: albums.clone(),
                tracks: tracks.clone(),
                max_upload_size: config.media.max_upload_size,
            })
            .merge(likes_router(likes.clone(), LikeTarget::Artist)),
        )
        .nest(
            "/api/albums",
            albums_router(AlbumsState {
                albums: albums.clone(),
                artists: artists.clone(),
                tracks: tracks.clone(),
                max_upload_size: config.media.max_upload_size,
            })
            .merge(likes_router(likes.clone(), LikeTarget::Album)),
        )
        .nest(
            "/api/tracks",
            tracks_router(TracksState {
                tracks: tracks.clone(),
                artists: artists.clone(),
                max_record_size: config.media.max_record_size,
            })
            .merge(likes_router(likes.clone(), LikeTarget::Track)),
        )
        .nest(
            "/api/playlists",
            playlists_router(playlists_state).merge(likes_router(likes, LikeTarget::Playlist)),
        )
        .nest(
            "/api/feed",
            feed_router(FeedState {
                albums: albums.clone(),
                artists: artists.clone(),
                tracks: tracks.clone(),
                playlists: playlist_queries.clone(),
                items_per_kind: config.feed.items_per_kind,
            }),
        )
        .nest(
            "/api/search",
            search_router(SearchState {
                search,
                albums,
                artists,
                tracks,
                playlists: playlist_queries,
            }),
        )
        .split_for_parts();

    let (auth_routes, auth_openapi) = OpenApiRouter::new()
        .nest("/auth", auth_router(auth_state))
        .split_for_parts();
    openapi.merge(auth_openapi);

    openapi.info.title = "Sonora API".to_string();
    openapi.info.version = env!("CARGO_PKG_VERSION").to_string();
    openapi.info.description = Some("Catalog, playlists, search and accounts".to_string());
    if let Some(components) = openapi.components.as_mut() {
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(HttpBuilder::new().scheme(HttpAuthScheme::Bearer).bearer_format("JWT").build()),
        );
    }

    let health = HealthState::new(Some(pool), Some(env!("CARGO_PKG_VERSION").to_string()));

    let app = Router::new()
        .merge(api_routes.layer(middleware::from_fn(require_anti_forgery)))
        .merge(auth_routes)
        .nest("/health", health_router(health.clone()))
        .nest_service("/media", ServeDir::new(&config.media.path))
        .merge(SwaggerUi::new("/swagger-ui").url("/q/openapi", openapi))
        .layer(AdmissionLayer::new(admission))
        .layer(DefaultBodyLimit::max(body_limit(&config)))
        .layer(TimeoutLayer::new(config.http.request_timeout()))
        .layer(cors_layer(&config))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
            let request_id = request
                .headers()
                .get(REQUEST_ID_HEADER)
                .and_then(|v| v.to_str().ok())
                .unwrap_or_default();
            info_span!("http", method = %request.method(), uri = %request.uri(), request_id)
        }))
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid));

    let listener = TcpListener::bind(&config.http.listen).await?;
    info!("API server listening on http://{}", config.http.listen);
    health.set_ready();

    axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;

    info!("Sonora API Server shutdown complete");
    Ok(())
}

/// Multipart bodies carry the record plus a few text fields.
fn body_limit(config: &AppConfig) -> usize {
    config.media.max_record_size.max(config.media.max_upload_size) + MIB
}

/// Credentialed CORS for the configured origins; no origins allows any
/// origin without credentials.
fn cors_layer(config: &AppConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .http
        .cors_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    if origins.is_empty() {
        return CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any);
    }

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([
            header::AUTHORIZATION,
            header::CONTENT_TYPE,
            HeaderName::from_static("x-csrf-token"),
        ])
        .expose_headers([HeaderName::from_static(REQUEST_ID_HEADER)])
        .allow_credentials(true)
}
