//! Auth API Endpoints
//!
//! - POST /auth/signup - Create a user
//! - POST /auth/login - Password login, sets the session cookie
//! - GET /auth/logout - Revoke every session of the caller
//! - GET /api/csrf - Issue an anti-forgery token

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::info;
use utoipa::ToSchema;
use utoipa_axum::{router::OpenApiRouter, routes};

use crate::auth::agent::AuthAgent;
use crate::auth::token_service::TokenService;
use crate::shared::api_common::{IdResponse, JsonBody, StatusResponse};
use crate::shared::error::PlatformError;
use crate::shared::middleware::{
    AntiForgeryChecked, Authenticated, RequestContext, ANTI_FORGERY_COOKIE, SESSION_COOKIE,
};
use crate::user::entity::{NewUser, Sex};

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SignUpRequest {
    pub username: String,
    pub password: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    /// `YYYY-MM-DD`
    #[schema(value_type = String, format = Date)]
    pub birth_date: NaiveDate,
    pub sex: Sex,
}

impl From<SignUpRequest> for NewUser {
    fn from(req: SignUpRequest) -> Self {
        NewUser {
            username: req.username,
            email: req.email,
            password: req.password,
            first_name: req.first_name,
            last_name: req.last_name,
            sex: req.sex,
            birth_date: req.birth_date,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LoginResponse {
    pub jwt: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CsrfResponse {
    pub csrf: String,
}

#[derive(Clone)]
pub struct AuthState {
    pub auth: Arc<dyn AuthAgent>,
    pub tokens: Arc<TokenService>,
    /// Mark cookies `Secure`
    pub secure_cookies: bool,
}

fn cookie_max_age(ttl: chrono::Duration) -> time::Duration {
    time::Duration::seconds(ttl.num_seconds())
}

/// Create a user
#[utoipa::path(
    post,
    path = "/signup",
    tag = "auth",
    request_body = SignUpRequest,
    responses(
        (status = 200, description = "User created", body = IdResponse),
        (status = 400, description = "Validation error"),
        (status = 409, description = "Username or email taken")
    )
)]
pub async fn sign_up(
    State(state): State<AuthState>,
    RequestContext(ctx): RequestContext,
    JsonBody(req): JsonBody<SignUpRequest>,
) -> Result<Json<IdResponse>, PlatformError> {
    let id = state.auth.sign_up(&ctx, req.into()).await?;
    Ok(Json(IdResponse { id }))
}

/// Log in with username and password
///
/// Returns the session token and also sets it as an HTTP-only cookie.
#[utoipa::path(
    post,
    path = "/login",
    tag = "auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = LoginResponse),
        (status = 401, description = "Wrong password"),
        (status = 404, description = "Unknown username")
    )
)]
pub async fn login(
    State(state): State<AuthState>,
    RequestContext(ctx): RequestContext,
    jar: CookieJar,
    JsonBody(req): JsonBody<LoginRequest>,
) -> Result<(CookieJar, Json<LoginResponse>), PlatformError> {
    let user = state.auth.login(&ctx, &req.username, &req.password).await?;
    let jwt = state.tokens.issue_session(user.id, user.version)?;

    let cookie = Cookie::build((SESSION_COOKIE, jwt.clone()))
        .path("/")
        .http_only(true)
        .secure(state.secure_cookies)
        .same_site(SameSite::Lax)
        .max_age(cookie_max_age(state.tokens.session_ttl()))
        .build();

    Ok((jar.add(cookie), Json(LoginResponse { jwt })))
}

/// Log out everywhere
///
/// Bumps the caller's version, which invalidates every session token
/// issued so far, and clears the session cookie.
#[utoipa::path(
    get,
    path = "/logout",
    tag = "auth",
    responses(
        (status = 200, description = "Logged out", body = StatusResponse),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Missing or invalid anti-forgery token")
    )
)]
pub async fn logout(
    State(state): State<AuthState>,
    checked: AntiForgeryChecked,
    jar: CookieJar,
) -> Result<(CookieJar, Json<StatusResponse>), PlatformError> {
    let version = state.auth.logout(&checked.ctx, checked.user.id).await?;
    info!(user_id = checked.user.id, version, "Sessions revoked");

    let cookie = Cookie::build((SESSION_COOKIE, ""))
        .path("/")
        .http_only(true)
        .max_age(time::Duration::ZERO)
        .build();

    Ok((jar.add(cookie), Json(StatusResponse::ok())))
}

/// Issue an anti-forgery token
///
/// The token is bound to the caller and must be echoed in the
/// `X-CSRF-TOKEN` header on state-changing requests.
#[utoipa::path(
    get,
    path = "",
    tag = "auth",
    responses(
        (status = 200, description = "Token issued", body = CsrfResponse),
        (status = 401, description = "Not authenticated")
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_csrf(
    State(state): State<AuthState>,
    auth: Authenticated,
    jar: CookieJar,
) -> Result<(CookieJar, Json<CsrfResponse>), PlatformError> {
    let csrf = state.tokens.issue_anti_forgery(auth.user.id)?;

    let cookie = Cookie::build((ANTI_FORGERY_COOKIE, csrf.clone()))
        .path("/")
        .secure(state.secure_cookies)
        .same_site(SameSite::Strict)
        .max_age(cookie_max_age(state.tokens.anti_forgery_ttl()))
        .build();

    Ok((jar.add(cookie), Json(CsrfResponse { csrf })))
}

/// Routes under `/auth`.
pub fn auth_router(state: AuthState) -> OpenApiRouter {
    OpenApiRouter::new()
        .routes(routes!(sign_up))
        .routes(routes!(login))
        .routes(routes!(logout))
        .with_state(state)
}

/// Routes under `/api/csrf`.
pub fn csrf_router(state: AuthState) -> OpenApiRouter {
    OpenApiRouter::new().routes(routes!(get_csrf)).with_state(state)
}
