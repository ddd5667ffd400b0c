//! Internal RPC tests
//!
//! Agents talk to real axum servers on loopback listeners, or to wiremock
//! servers where only the request count matters.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::response::Response;
use axum::routing::post;
use axum::Router;
use bytes::Bytes;
use chrono::NaiveDate;
use futures::stream;
use tokio::net::TcpListener;
use wiremock::matchers::method;
use wiremock::{Mock, MockServer, ResponseTemplate};

use sn_platform::auth::{AuthAgent, RpcAuthAgent};
use sn_platform::rpc::messages::{AvatarExtra, AvatarPathReply, TrackMessage, UserIdRequest, UserMessage};
use sn_platform::rpc::server::read_chunks;
use sn_platform::rpc::{streaming, RpcRequest, RpcUpload, Unary};
use sn_platform::search::{search_rpc_router, RpcSearchAgent, SearchAgent, SearchIndex, SearchService};
use sn_platform::user::{RpcUserAgent, Sex, User, UserAgent};
use sn_platform::{Album, Artist, ExecutionContext, Playlist, PlatformError, Result, Track};

async fn serve(router: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{}", addr)
}

fn track(id: i64, name: &str) -> Track {
    Track {
        id,
        name: name.to_string(),
        album_id: None,
        album_position: None,
        cover_src: "albums/default.png".into(),
        record_src: format!("records/{}.mp3", id),
        duration: 180,
        listens: 0,
    }
}

/// Returns five albums for any query and fails every track lookup.
struct FakeIndex;

#[async_trait]
impl SearchIndex for FakeIndex {
    async fn albums(&self, query: &str, _amount: u32) -> Result<Vec<Album>> {
        Ok((1..=5)
            .map(|id| Album {
                id,
                name: format!("{} {}", query, id),
                description: None,
                cover_src: String::new(),
            })
            .collect())
    }

    async fn artists(&self, _query: &str, _amount: u32) -> Result<Vec<Artist>> {
        Ok(Vec::new())
    }

    async fn tracks(&self, _query: &str, _amount: u32) -> Result<Vec<Track>> {
        Err(PlatformError::internal("index unavailable"))
    }

    async fn playlists(&self, _query: &str, _amount: u32) -> Result<Vec<Playlist>> {
        Ok(Vec::new())
    }
}

mod search_tests {
    use super::*;

    #[tokio::test]
    async fn test_find_consumes_at_most_amount() {
        let url = serve(search_rpc_router(Arc::new(FakeIndex))).await;
        let agent = RpcSearchAgent::connect(&url).unwrap();

        let albums = agent.find_albums(&ExecutionContext::create(), "gor", 2).await.unwrap();
        assert_eq!(albums.len(), 2);
        assert_eq!(albums[0].name, "gor 1");

        let artists = agent.find_artists(&ExecutionContext::create(), "gor", 5).await.unwrap();
        assert!(artists.is_empty());
    }

    #[tokio::test]
    async fn test_server_error_surfaces() {
        let url = serve(search_rpc_router(Arc::new(FakeIndex))).await;
        let agent = RpcSearchAgent::connect(&url).unwrap();

        let err = agent.find_tracks(&ExecutionContext::create(), "gor", 5).await.unwrap_err();
        assert!(matches!(err, PlatformError::Upstream { .. }));
    }

    #[tokio::test]
    async fn test_mid_stream_error_discards_partial_results() {
        async fn find_tracks() -> Response {
            streaming(stream::iter(vec![
                Ok(TrackMessage::from(track(1, "Feel Good Inc."))),
                Ok(TrackMessage::from(track(2, "Clint Eastwood"))),
                Err(PlatformError::internal("connection reset")),
            ]))
        }

        let url = serve(Router::new().route("/Search/FindTracks", post(find_tracks))).await;
        let agent = RpcSearchAgent::connect(&url).unwrap();

        assert!(agent.find_tracks(&ExecutionContext::create(), "gor", 5).await.is_err());
        // The error comes after the requested amount, so it is never read.
        let first = agent.find_tracks(&ExecutionContext::create(), "gor", 1).await.unwrap();
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].name, "Feel Good Inc.");
    }

    #[tokio::test]
    async fn test_zero_amount_opens_no_stream() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let agent = Arc::new(RpcSearchAgent::connect(&server.uri()).unwrap());
        let search = SearchService::new(agent);
        let results = search.search(&ExecutionContext::create(), "gor", 0).await.unwrap();
        assert!(results.albums.is_empty());
        assert!(results.tracks.is_empty());
    }

    #[tokio::test]
    async fn test_failing_upstream_fails_search() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let agent = Arc::new(RpcSearchAgent::connect(&server.uri()).unwrap());
        let search = SearchService::new(agent);
        let err = search.search(&ExecutionContext::create(), "gor", 5).await.unwrap_err();
        assert!(matches!(err, PlatformError::Upstream { .. }));
    }
}

mod unary_tests {
    use super::*;

    fn user(id: i64, username: &str) -> User {
        User {
            id,
            version: 3,
            username: username.to_string(),
            email: "kim@example.com".into(),
            first_name: "Kim".into(),
            last_name: "Lee".into(),
            sex: Sex::O,
            birth_date: NaiveDate::from_ymd_opt(1990, 2, 28).unwrap(),
            avatar_src: Some("avatars/abc.png".into()),
        }
    }

    /// Echoes the caller's request id as the username; id 404 is missing.
    async fn get_user(RpcRequest(ctx, request): RpcRequest<UserIdRequest>) -> Unary<UserMessage> {
        if request.user_id == 404 {
            return Unary(Err(PlatformError::not_found("user", request.user_id)));
        }
        Unary(Ok(UserMessage::from(user(request.user_id, &ctx.request_id))))
    }

    #[tokio::test]
    async fn test_round_trip_carries_request_id() {
        let url = serve(Router::new().route("/Authorization/GetUserById", post(get_user))).await;
        let agent = RpcAuthAgent::connect(&url).unwrap();

        let ctx = ExecutionContext::with_request_id("req-42").with_timeout(Duration::from_secs(5));
        let found = agent.get_user(&ctx, 9).await.unwrap();
        assert_eq!(found.id, 9);
        assert_eq!(found.version, 3);
        assert_eq!(found.username, "req-42");
        assert_eq!(found.sex, Sex::O);
        assert_eq!(found.avatar_src.as_deref(), Some("avatars/abc.png"));
    }

    #[tokio::test]
    async fn test_not_found_status_maps_to_not_found() {
        let url = serve(Router::new().route("/Authorization/GetUserById", post(get_user))).await;
        let agent = RpcAuthAgent::connect(&url).unwrap();

        let err = agent.get_user(&ExecutionContext::create(), 404).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_expired_deadline_fails_before_sending() {
        let agent = RpcAuthAgent::connect("http://127.0.0.1:9").unwrap();
        let ctx = ExecutionContext::create().with_timeout(Duration::ZERO);

        let err = agent.get_user(&ctx, 1).await.unwrap_err();
        assert!(matches!(err, PlatformError::Upstream { ref message, .. } if message.contains("deadline")));
    }

    #[tokio::test]
    async fn test_unreachable_service_is_upstream_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());
        drop(listener);

        let agent = RpcAuthAgent::connect(&url).unwrap();
        let err = agent.get_user(&ExecutionContext::create(), 1).await.unwrap_err();
        assert!(matches!(err, PlatformError::Upstream { .. }));
    }
}

mod upload_tests {
    use super::*;

    const LIMIT: usize = 4096;

    async fn upload_avatar(upload: RpcUpload<AvatarExtra>) -> Unary<AvatarPathReply> {
        let RpcUpload { head, chunks, .. } = upload;
        let result = async {
            let data = read_chunks(chunks, LIMIT).await?;
            Ok::<_, PlatformError>(AvatarPathReply {
                path: format!("avatars/{}-{}.{}", head.user_id, data.len(), head.extension),
            })
        }
        .await;
        Unary(result)
    }

    #[tokio::test]
    async fn test_avatar_streams_in_chunks() {
        let url = serve(Router::new().route("/User/UploadAvatar", post(upload_avatar))).await;
        let agent = RpcUserAgent::connect(&url).unwrap();

        let data = Bytes::from(vec![0x89u8; 2500]);
        let path = agent
            .upload_avatar(&ExecutionContext::create(), 5, "png", data)
            .await
            .unwrap();
        assert_eq!(path, "avatars/5-2500.png");
    }

    #[tokio::test]
    async fn test_oversized_avatar_is_rejected() {
        let url = serve(Router::new().route("/User/UploadAvatar", post(upload_avatar))).await;
        let agent = RpcUserAgent::connect(&url).unwrap();

        let data = Bytes::from(vec![0u8; LIMIT + 1]);
        let err = agent
            .upload_avatar(&ExecutionContext::create(), 5, "png", data)
            .await
            .unwrap_err();
        assert!(matches!(err, PlatformError::PayloadTooLarge { limit: LIMIT }));
    }
}
