//! Admission middleware tests
//!
//! Drives a small router through the admission layer and the anti-forgery
//! guard with an in-memory Authorization agent.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::response::Response;
use axum::routing::{get, post};
use axum::{middleware, Router};
use chrono::NaiveDate;
use http_body_util::BodyExt;
use parking_lot::Mutex;
use tower::ServiceExt;

use sn_platform::auth::token_service::{TokenConfig, TokenService};
use sn_platform::auth::AuthAgent;
use sn_platform::shared::middleware::require_anti_forgery;
use sn_platform::shared::{AdmissionLayer, AdmissionState, Authenticated, OptionalAuth};
use sn_platform::user::{NewUser, Sex, User};
use sn_platform::{ExecutionContext, PlatformError, Result};

const SECRET: &str = "admission-test-secret-0123456789";

#[derive(Default)]
struct FakeAuthAgent {
    users: Mutex<HashMap<i64, User>>,
}

impl FakeAuthAgent {
    fn with_users(ids: &[i64]) -> Self {
        let agent = Self::default();
        for &id in ids {
            agent.users.lock().insert(id, user(id));
        }
        agent
    }

    fn bump_version(&self, id: i64) {
        if let Some(user) = self.users.lock().get_mut(&id) {
            user.version += 1;
        }
    }
}

#[async_trait]
impl AuthAgent for FakeAuthAgent {
    async fn sign_up(&self, _ctx: &ExecutionContext, _user: NewUser) -> Result<i64> {
        Err(PlatformError::internal("not used"))
    }

    async fn login(&self, _ctx: &ExecutionContext, _username: &str, _password: &str) -> Result<User> {
        Err(PlatformError::internal("not used"))
    }

    async fn logout(&self, _ctx: &ExecutionContext, user_id: i64) -> Result<i64> {
        self.bump_version(user_id);
        Ok(self.users.lock()[&user_id].version)
    }

    async fn get_user(&self, _ctx: &ExecutionContext, user_id: i64) -> Result<User> {
        self.users
            .lock()
            .get(&user_id)
            .cloned()
            .ok_or_else(|| PlatformError::not_found("user", user_id))
    }
}

fn user(id: i64) -> User {
    User {
        id,
        version: 1,
        username: format!("user{}", id),
        email: format!("user{}@example.com", id),
        first_name: "Test".into(),
        last_name: "User".into(),
        sex: Sex::F,
        birth_date: NaiveDate::from_ymd_opt(1999, 5, 17).unwrap(),
        avatar_src: None,
    }
}

fn tokens() -> Arc<TokenService> {
    Arc::new(TokenService::new(TokenConfig {
        secret: SECRET.into(),
        ..Default::default()
    }))
}

async fn me(auth: Authenticated) -> String {
    auth.user.id.to_string()
}

async fn open(OptionalAuth(ctx): OptionalAuth) -> String {
    ctx.caller_id().map_or_else(|| "anonymous".to_string(), |id| id.to_string())
}

fn app(tokens: Arc<TokenService>, agent: Arc<FakeAuthAgent>) -> Router {
    let state = AdmissionState {
        tokens,
        auth: agent,
        request_timeout: Duration::from_secs(5),
    };
    Router::new()
        .route("/me", get(me))
        .route("/open", get(open))
        .route("/mutate", post(me))
        .layer(middleware::from_fn(require_anti_forgery))
        .layer(AdmissionLayer::new(state))
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, String) {
    let response: Response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    (status, String::from_utf8(body.to_vec()).unwrap())
}

fn get_with(uri: &str, headers: &[(&str, String)]) -> Request<Body> {
    let mut builder = Request::get(uri);
    for (name, value) in headers {
        builder = builder.header(*name, value);
    }
    builder.body(Body::empty()).unwrap()
}

fn post_with(uri: &str, headers: &[(&str, String)]) -> Request<Body> {
    let mut builder = Request::post(uri);
    for (name, value) in headers {
        builder = builder.header(*name, value);
    }
    builder.body(Body::empty()).unwrap()
}

mod session_tests {
    use super::*;

    #[tokio::test]
    async fn test_anonymous_requests() {
        let app = app(tokens(), Arc::new(FakeAuthAgent::with_users(&[1])));

        let (status, body) = send(&app, get_with("/me", &[])).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert!(body.contains("message"));

        let (status, body) = send(&app, get_with("/open", &[])).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "anonymous");
    }

    #[tokio::test]
    async fn test_bearer_header_admits_caller() {
        let tokens = tokens();
        let app = app(tokens.clone(), Arc::new(FakeAuthAgent::with_users(&[7])));
        let jwt = tokens.issue_session(7, 1).unwrap();

        let (status, body) = send(&app, get_with("/me", &[("authorization", format!("Bearer {}", jwt))])).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "7");
    }

    #[tokio::test]
    async fn test_cookie_used_without_header() {
        let tokens = tokens();
        let app = app(tokens.clone(), Arc::new(FakeAuthAgent::with_users(&[7])));
        let jwt = tokens.issue_session(7, 1).unwrap();

        let (status, body) = send(&app, get_with("/me", &[("cookie", format!("Token={}", jwt))])).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "7");
    }

    #[tokio::test]
    async fn test_malformed_header_wins_over_cookie() {
        let tokens = tokens();
        let app = app(tokens.clone(), Arc::new(FakeAuthAgent::with_users(&[7])));
        let jwt = tokens.issue_session(7, 1).unwrap();

        let headers = [
            ("authorization", "Basic dXNlcjpwYXNz".to_string()),
            ("cookie", format!("Token={}", jwt)),
        ];
        let (status, _) = send(&app, get_with("/me", &headers)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_logout_revokes_outstanding_tokens() {
        let tokens = tokens();
        let agent = Arc::new(FakeAuthAgent::with_users(&[7]));
        let app = app(tokens.clone(), agent.clone());
        let jwt = tokens.issue_session(7, 1).unwrap();
        let bearer = [("authorization", format!("Bearer {}", jwt))];

        assert_eq!(send(&app, get_with("/me", &bearer)).await.0, StatusCode::OK);

        agent.logout(&ExecutionContext::create(), 7).await.unwrap();

        assert_eq!(send(&app, get_with("/me", &bearer)).await.0, StatusCode::UNAUTHORIZED);
        let (status, body) = send(&app, get_with("/open", &bearer)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "anonymous");
    }

    #[tokio::test]
    async fn test_token_for_deleted_user_is_rejected() {
        let tokens = tokens();
        let app = app(tokens.clone(), Arc::new(FakeAuthAgent::with_users(&[])));
        let jwt = tokens.issue_session(99, 1).unwrap();

        let (status, _) = send(&app, get_with("/me", &[("authorization", format!("Bearer {}", jwt))])).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_token_signed_with_other_secret_is_rejected() {
        let foreign = TokenService::new(TokenConfig {
            secret: "some-other-secret-0123456789abcd".into(),
            ..Default::default()
        });
        let app = app(tokens(), Arc::new(FakeAuthAgent::with_users(&[7])));
        let jwt = foreign.issue_session(7, 1).unwrap();

        let (status, _) = send(&app, get_with("/me", &[("authorization", format!("Bearer {}", jwt))])).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }
}

mod anti_forgery_tests {
    use super::*;

    fn session(tokens: &TokenService, id: i64) -> (&'static str, String) {
        ("authorization", format!("Bearer {}", tokens.issue_session(id, 1).unwrap()))
    }

    #[tokio::test]
    async fn test_safe_methods_skip_check() {
        let tokens = tokens();
        let app = app(tokens.clone(), Arc::new(FakeAuthAgent::with_users(&[3])));

        let (status, _) = send(&app, get_with("/me", &[session(&tokens, 3)])).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_mutation_requires_token() {
        let tokens = tokens();
        let app = app(tokens.clone(), Arc::new(FakeAuthAgent::with_users(&[3])));

        let (status, body) = send(&app, post_with("/mutate", &[session(&tokens, 3)])).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert!(body.contains("anti-forgery"));
    }

    #[tokio::test]
    async fn test_mutation_with_valid_token() {
        let tokens = tokens();
        let app = app(tokens.clone(), Arc::new(FakeAuthAgent::with_users(&[3])));
        let csrf = tokens.issue_anti_forgery(3).unwrap();

        let headers = [
            session(&tokens, 3),
            ("x-csrf-token", csrf.clone()),
            ("cookie", format!("X-CSRF-TOKEN={}", csrf)),
        ];
        let (status, body) = send(&app, post_with("/mutate", &headers)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "3");
    }

    #[tokio::test]
    async fn test_token_bound_to_other_user() {
        let tokens = tokens();
        let app = app(tokens.clone(), Arc::new(FakeAuthAgent::with_users(&[3, 4])));
        let csrf = tokens.issue_anti_forgery(4).unwrap();

        let (status, _) = send(&app, post_with("/mutate", &[session(&tokens, 3), ("x-csrf-token", csrf)])).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_cookie_must_match_header() {
        let tokens = tokens();
        let app = app(tokens.clone(), Arc::new(FakeAuthAgent::with_users(&[3])));
        let csrf = tokens.issue_anti_forgery(3).unwrap();

        let headers = [
            session(&tokens, 3),
            ("x-csrf-token", csrf),
            ("cookie", "X-CSRF-TOKEN=stale".to_string()),
        ];
        let (status, _) = send(&app, post_with("/mutate", &headers)).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_cookie_without_header_is_forbidden() {
        let tokens = tokens();
        let app = app(tokens.clone(), Arc::new(FakeAuthAgent::with_users(&[3])));
        let csrf = tokens.issue_anti_forgery(3).unwrap();

        let headers = [session(&tokens, 3), ("cookie", format!("X-CSRF-TOKEN={}", csrf))];
        let (status, _) = send(&app, post_with("/mutate", &headers)).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_garbage_token_is_forbidden() {
        let tokens = tokens();
        let app = app(tokens.clone(), Arc::new(FakeAuthAgent::with_users(&[3])));

        let headers = [session(&tokens, 3), ("x-csrf-token", "not-a-token".to_string())];
        let (status, _) = send(&app, post_with("/mutate", &headers)).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_anonymous_mutation_is_unauthorized() {
        let app = app(tokens(), Arc::new(FakeAuthAgent::with_users(&[3])));

        let (status, _) = send(&app, post_with("/mutate", &[])).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }
}
