//! Request Admission
//!
//! Session admission resolves the caller from a bearer credential (the
//! `Authorization` header, or the `Token` cookie when no header is sent),
//! verifies it, and checks the embedded version against the user's current
//! one. Anti-forgery admission guards state-changing methods with a token
//! bound to the caller's id.
//!
//! [`AdmissionLayer`] puts the shared [`AdmissionState`] into request
//! extensions so the extractors below work under any router state.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use axum::extract::{FromRequestParts, Request};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::http::Method;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum_extra::extract::CookieJar;
use tower::{Layer, Service};
use tracing::debug;

use sn_common::REQUEST_ID_HEADER;

use crate::auth::agent::AuthAgent;
use crate::auth::token_service::{extract_bearer_token, TokenService};
use crate::shared::error::{PlatformError, Result};
use crate::usecase::ExecutionContext;
use crate::user::entity::User;

pub const SESSION_COOKIE: &str = "Token";
pub const ANTI_FORGERY_COOKIE: &str = "X-CSRF-TOKEN";
pub const ANTI_FORGERY_HEADER: &str = "X-CSRF-TOKEN";

/// Services the admission checks need.
#[derive(Clone)]
pub struct AdmissionState {
    pub tokens: Arc<TokenService>,
    pub auth: Arc<dyn AuthAgent>,
    /// Deadline given to every request envelope.
    pub request_timeout: Duration,
}

/// Caller resolved earlier in the same request.
#[derive(Clone)]
struct ResolvedCaller(Option<User>);

fn admission_state(parts: &Parts) -> Result<AdmissionState> {
    parts
        .extensions
        .get::<AdmissionState>()
        .cloned()
        .ok_or_else(|| PlatformError::internal("admission state not configured"))
}

/// Request envelope without a caller.
fn base_context(parts: &Parts, state: &AdmissionState) -> ExecutionContext {
    let ctx = match parts.headers.get(REQUEST_ID_HEADER).and_then(|v| v.to_str().ok()) {
        Some(id) => ExecutionContext::with_request_id(id),
        None => ExecutionContext::create(),
    };
    ctx.with_timeout(state.request_timeout)
}

/// The session credential. A present but malformed `Authorization` header
/// is an error; the cookie is only consulted when the header is absent.
fn session_token(parts: &Parts) -> Result<Option<String>> {
    if let Some(value) = parts.headers.get(AUTHORIZATION) {
        let token = value
            .to_str()
            .ok()
            .and_then(extract_bearer_token)
            .ok_or_else(|| PlatformError::unauthorized("malformed Authorization header"))?;
        return Ok(Some(token.to_string()));
    }

    Ok(CookieJar::from_headers(&parts.headers)
        .get(SESSION_COOKIE)
        .map(|c| c.value().to_string())
        .filter(|v| !v.is_empty()))
}

/// Resolve the caller once per request. `Ok(None)` means no credential
/// was presented.
async fn resolve_caller(parts: &mut Parts, state: &AdmissionState, ctx: &ExecutionContext) -> Result<Option<User>> {
    if let Some(ResolvedCaller(caller)) = parts.extensions.get::<ResolvedCaller>() {
        return Ok(caller.clone());
    }

    let caller = match session_token(parts)? {
        None => None,
        Some(token) => {
            let identity = state.tokens.verify_session(&token)?;
            let user = match state.auth.get_user(ctx, identity.user_id).await {
                Ok(user) => user,
                Err(err) if err.is_not_found() => return Err(PlatformError::unauthorized("no such user")),
                Err(err) => return Err(err),
            };
            if user.version != identity.version {
                debug!(user_id = user.id, token_version = identity.version, "Session revoked");
                return Err(PlatformError::unauthorized("session has been revoked"));
            }
            Some(user)
        }
    };

    parts.extensions.insert(ResolvedCaller(caller.clone()));
    Ok(caller)
}

/// Verify the anti-forgery token against the admitted caller.
async fn check_anti_forgery(parts: &mut Parts) -> Result<User> {
    let state = admission_state(parts)?;
    let ctx = base_context(parts, &state);
    let caller = resolve_caller(parts, &state, &ctx)
        .await?
        .ok_or_else(|| PlatformError::unauthorized("missing authentication token"))?;

    let header = parts
        .headers
        .get(ANTI_FORGERY_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| PlatformError::forbidden("missing anti-forgery token"))?;

    if let Some(cookie) = CookieJar::from_headers(&parts.headers).get(ANTI_FORGERY_COOKIE) {
        if cookie.value() != header {
            return Err(PlatformError::forbidden("anti-forgery cookie and header differ"));
        }
    }

    let user_id = state
        .tokens
        .verify_anti_forgery(header)
        .map_err(|_| PlatformError::forbidden("invalid anti-forgery token"))?;
    if user_id != caller.id {
        return Err(PlatformError::forbidden("anti-forgery token belongs to another user"));
    }
    Ok(caller)
}

/// A request with an admitted caller. Rejects with 401 otherwise.
pub struct Authenticated {
    pub ctx: ExecutionContext,
    pub user: User,
}

impl<S> FromRequestParts<S> for Authenticated
where
    S: Send + Sync,
{
    type Rejection = PlatformError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> std::result::Result<Self, Self::Rejection> {
        let state = admission_state(parts)?;
        let ctx = base_context(parts, &state);
        let user = resolve_caller(parts, &state, &ctx)
            .await?
            .ok_or_else(|| PlatformError::unauthorized("missing authentication token"))?;

        Ok(Authenticated {
            ctx: ctx.with_caller(Some(user.clone())),
            user,
        })
    }
}

/// A request whose caller may be anonymous. Invalid credentials count as
/// anonymous.
pub struct OptionalAuth(pub ExecutionContext);

impl<S> FromRequestParts<S> for OptionalAuth
where
    S: Send + Sync,
{
    type Rejection = PlatformError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> std::result::Result<Self, Self::Rejection> {
        let state = admission_state(parts)?;
        let ctx = base_context(parts, &state);
        let caller = match resolve_caller(parts, &state, &ctx).await {
            Ok(caller) => caller,
            Err(err) => {
                debug!(error = %err, "Ignoring invalid credential on optional route");
                None
            }
        };
        Ok(OptionalAuth(ctx.with_caller(caller)))
    }
}

/// Envelope for routes that never look at credentials.
pub struct RequestContext(pub ExecutionContext);

impl<S> FromRequestParts<S> for RequestContext
where
    S: Send + Sync,
{
    type Rejection = PlatformError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> std::result::Result<Self, Self::Rejection> {
        let state = admission_state(parts)?;
        Ok(RequestContext(base_context(parts, &state)))
    }
}

/// Anti-forgery check for handlers on safe methods that still change state.
pub struct AntiForgeryChecked {
    pub ctx: ExecutionContext,
    pub user: User,
}

impl<S> FromRequestParts<S> for AntiForgeryChecked
where
    S: Send + Sync,
{
    type Rejection = PlatformError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> std::result::Result<Self, Self::Rejection> {
        let user = check_anti_forgery(parts).await?;
        let state = admission_state(parts)?;
        let ctx = base_context(parts, &state).with_caller(Some(user.clone()));
        Ok(AntiForgeryChecked { ctx, user })
    }
}

fn is_state_changing(method: &Method) -> bool {
    matches!(*method, Method::POST | Method::PUT | Method::PATCH | Method::DELETE)
}

/// `axum::middleware::from_fn` guard for routers whose mutations need an
/// anti-forgery token.
///
/// The token must arrive in the `X-CSRF-TOKEN` header. The cookie of the
/// same name alone is not enough, since browsers attach it to cross-site
/// requests; when it is sent it must equal the header (double submit).
pub async fn require_anti_forgery(req: Request, next: Next) -> Response {
    if !is_state_changing(req.method()) {
        return next.run(req).await;
    }

    let (mut parts, body) = req.into_parts();
    match check_anti_forgery(&mut parts).await {
        Ok(_) => next.run(Request::from_parts(parts, body)).await,
        Err(err) => err.into_response(),
    }
}

/// Layer that injects [`AdmissionState`] into request extensions.
#[derive(Clone)]
pub struct AdmissionLayer {
    state: AdmissionState,
}

impl AdmissionLayer {
    pub fn new(state: AdmissionState) -> Self {
        Self { state }
    }
}

impl<S> Layer<S> for AdmissionLayer {
    type Service = AdmissionMiddleware<S>;

    fn layer(&self, inner: S) -> Self::Service {
        AdmissionMiddleware {
            inner,
            state: self.state.clone(),
        }
    }
}

#[derive(Clone)]
pub struct AdmissionMiddleware<S> {
    inner: S,
    state: AdmissionState,
}

impl<S, B> Service<axum::http::Request<B>> for AdmissionMiddleware<S>
where
    S: Service<axum::http::Request<B>, Response = Response> + Send + Clone + 'static,
    S::Future: Send + 'static,
    B: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = std::result::Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<std::result::Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: axum::http::Request<B>) -> Self::Future {
        req.extensions_mut().insert(self.state.clone());
        Box::pin(self.inner.call(req))
    }
}
