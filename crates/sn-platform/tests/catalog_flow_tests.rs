//! PostgreSQL-backed flows
//!
//! Each test applies the schema into a throwaway schema of the database at
//! `DATABASE_URL`. Without a reachable database the tests are skipped.

use std::sync::Arc;

use bytes::Bytes;
use chrono::NaiveDate;
use futures::future::join_all;
use sqlx::postgres::PgPoolOptions;
use sqlx::{Executor, PgPool};
use uuid::Uuid;

use sn_config::MediaConfig;
use sn_platform::artist::ArtistService;
use sn_platform::auth::{AccountService, Argon2Config, PasswordPolicy, PasswordService};
use sn_platform::blob::{BlobStore, MemoryBlobStore};
use sn_platform::like::LikeService;
use sn_platform::playlist::operations::{
    AddPlaylistOwnerCommand, AddPlaylistOwnerUseCase, AddTrackCommand, AddTrackUseCase, CreatePlaylistCommand,
    CreatePlaylistUseCase, DeletePlaylistCommand, DeletePlaylistUseCase, PlaylistQueries, RemoveTrackCommand,
    RemoveTrackUseCase, ReorderTrackCommand, ReorderTrackUseCase, UpdatePlaylistCommand, UpdatePlaylistUseCase,
    UploadPlaylistCoverCommand, UploadPlaylistCoverUseCase,
};
use sn_platform::shared::db::apply_schema;
use sn_platform::shared::file::UploadPolicy;
use sn_platform::shared::ErrorKind;
use sn_platform::track::TrackService;
use sn_platform::user::{NewUser, Sex, UserAgent, UserService};
use sn_platform::{
    AlbumRepository, ArtistRepository, ExecutionContext, LikeRepository, LikeTarget, PgUnitOfWork, PlatformError,
    PlaylistRepository, TrackRepository, UserRepository,
};

async fn test_pool() -> Option<PgPool> {
    let Ok(url) = std::env::var("DATABASE_URL") else {
        eprintln!("DATABASE_URL not set; skipping");
        return None;
    };

    let schema = format!("sn_test_{}", Uuid::new_v4().simple());
    let search_path = format!("SET search_path TO {}", schema);
    let pool = match PgPoolOptions::new()
        .max_connections(5)
        .after_connect(move |conn, _meta| {
            let search_path = search_path.clone();
            Box::pin(async move {
                conn.execute(search_path.as_str()).await?;
                Ok(())
            })
        })
        .connect(&url)
        .await
    {
        Ok(pool) => pool,
        Err(e) => {
            eprintln!("database unreachable ({}); skipping", e);
            return None;
        }
    };

    pool.execute(format!("CREATE SCHEMA {}", schema).as_str()).await.unwrap();
    apply_schema(&pool).await.unwrap();
    Some(pool)
}

struct Harness {
    pool: PgPool,
    blobs: Arc<MemoryBlobStore>,
    accounts: AccountService,
    artists: Arc<ArtistService>,
    tracks: Arc<TrackService>,
    likes: Arc<LikeService>,
    queries: PlaylistQueries,
    create: CreatePlaylistUseCase,
    add_track: AddTrackUseCase,
    remove_track: RemoveTrackUseCase,
    reorder: ReorderTrackUseCase,
    update: UpdatePlaylistUseCase,
    cover: UploadPlaylistCoverUseCase,
    add_owner: AddPlaylistOwnerUseCase,
    delete: DeletePlaylistUseCase,
}

impl Harness {
    fn new(pool: PgPool) -> Self {
        let media = MediaConfig::default();
        let uow = PgUnitOfWork::new(pool.clone());
        let store = Arc::new(MemoryBlobStore::new());
        let blobs: Arc<dyn BlobStore> = store.clone();
        let passwords = Arc::new(PasswordService::new(Argon2Config::testing(), PasswordPolicy::default()).unwrap());
        let user_repo = Arc::new(UserRepository::new(pool.clone()));
        let artist_repo = Arc::new(ArtistRepository::new(pool.clone()));
        let album_repo = Arc::new(AlbumRepository::new(pool.clone()));
        let track_repo = Arc::new(TrackRepository::new(pool.clone()));
        let playlist_repo = Arc::new(PlaylistRepository::new(pool.clone()));

        let users: Arc<dyn UserAgent> = Arc::new(UserService::new(
            uow.clone(),
            user_repo.clone(),
            passwords.clone(),
            blobs.clone(),
            UploadPolicy::avatars(&media),
        ));
        let likes = Arc::new(LikeService::new(Arc::new(LikeRepository::new(pool.clone()))));
        let artists = Arc::new(ArtistService::new(
            uow.clone(),
            artist_repo.clone(),
            likes.clone(),
            blobs.clone(),
            UploadPolicy::avatars(&media),
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
            UploadPolicy::records(&media),
            media.default_track_cover.clone(),
        ));

        Self {
            pool,
            blobs: store,
            accounts: AccountService::new(user_repo, passwords),
            artists,
            tracks,
            likes: likes.clone(),
            queries: PlaylistQueries::new(playlist_repo.clone(), likes, users.clone()),
            create: CreatePlaylistUseCase::new(uow.clone(), playlist_repo.clone(), users.clone()),
            add_track: AddTrackUseCase::new(uow.clone(), playlist_repo.clone(), track_repo),
            remove_track: RemoveTrackUseCase::new(uow.clone(), playlist_repo.clone()),
            reorder: ReorderTrackUseCase::new(uow.clone(), playlist_repo.clone()),
            update: UpdatePlaylistUseCase::new(uow.clone(), playlist_repo.clone()),
            cover: UploadPlaylistCoverUseCase::new(
                playlist_repo.clone(),
                blobs,
                UploadPolicy::playlist_covers(&media),
            ),
            add_owner: AddPlaylistOwnerUseCase::new(uow.clone(), playlist_repo.clone(), users),
            delete: DeletePlaylistUseCase::new(uow, playlist_repo),
        }
    }

    /// Signs a user up and returns a context acting as them.
    async fn user(&self, username: &str) -> ExecutionContext {
        let id = self.accounts.sign_up(new_user(username, &format!("{}@example.com", username))).await.unwrap();
        let user = self.accounts.get_user(id).await.unwrap();
        ExecutionContext::create().with_caller(Some(user))
    }

    async fn tracks_for(&self, ctx: &ExecutionContext, count: usize) -> Vec<i64> {
        let artist = self.artists.create(ctx, "Gorillaz".into(), None).await.unwrap();
        let mut ids = Vec::with_capacity(count);
        for n in 0..count {
            let mut record = b"ID3".to_vec();
            record.extend_from_slice(format!("track-{}-{}", artist, n).as_bytes());
            let id = self
                .tracks
                .create(
                    ctx,
                    sn_platform::NewTrack {
                        name: format!("Track {}", n + 1),
                        album_id: None,
                        album_position: None,
                        artist_ids: vec![artist],
                        duration: 200,
                    },
                    Bytes::from(record),
                )
                .await
                .unwrap();
            ids.push(id);
        }
        ids
    }

    async fn playlist(&self, ctx: &ExecutionContext, co_owners: Vec<i64>) -> i64 {
        self.create
            .execute(
                ctx,
                CreatePlaylistCommand {
                    name: "Road trip".into(),
                    description: Some("Long drives".into()),
                    co_owners,
                },
            )
            .await
            .unwrap()
    }

    async fn order(&self, ctx: &ExecutionContext, playlist_id: i64) -> Vec<i64> {
        self.tracks
            .list_by_playlist(ctx, playlist_id)
            .await
            .unwrap()
            .into_iter()
            .map(|t| t.track.id)
            .collect()
    }
}

fn new_user(username: &str, email: &str) -> NewUser {
    NewUser {
        username: username.to_string(),
        email: email.to_string(),
        password: "Passw0rdOk".into(),
        first_name: "Test".into(),
        last_name: "User".into(),
        sex: Sex::M,
        birth_date: NaiveDate::from_ymd_opt(1995, 3, 14).unwrap(),
    }
}

fn png(tag: &str) -> Bytes {
    let mut data = b"\x89PNG\r\n\x1a\n".to_vec();
    data.extend_from_slice(tag.as_bytes());
    Bytes::from(data)
}

fn kind(err: PlatformError) -> ErrorKind {
    err.kind()
}

mod playlist_flow_tests {
    use super::*;

    #[tokio::test]
    async fn test_add_reorder_remove_keep_positions_dense() {
        let Some(pool) = test_pool().await else { return };
        let h = Harness::new(pool);
        let alice = h.user("alice").await;
        let t = h.tracks_for(&alice, 3).await;
        let playlist_id = h.playlist(&alice, vec![]).await;

        for &track_id in &t {
            let added = h.add_track.execute(&alice, AddTrackCommand { playlist_id, track_id }).await.unwrap();
            assert!(added);
        }
        let again = h.add_track.execute(&alice, AddTrackCommand { playlist_id, track_id: t[0] }).await.unwrap();
        assert!(!again);
        assert_eq!(h.order(&alice, playlist_id).await, vec![t[0], t[1], t[2]]);

        let position = h
            .reorder
            .execute(&alice, ReorderTrackCommand { playlist_id, track_id: t[2], position: 1 })
            .await
            .unwrap();
        assert_eq!(position, 1);
        assert_eq!(h.order(&alice, playlist_id).await, vec![t[2], t[0], t[1]]);

        let position = h
            .reorder
            .execute(&alice, ReorderTrackCommand { playlist_id, track_id: t[2], position: 99 })
            .await
            .unwrap();
        assert_eq!(position, 3);
        assert_eq!(h.order(&alice, playlist_id).await, vec![t[0], t[1], t[2]]);

        let removed = h
            .remove_track
            .execute(&alice, RemoveTrackCommand { playlist_id, track_id: t[0] })
            .await
            .unwrap();
        assert!(removed);
        let removed = h
            .remove_track
            .execute(&alice, RemoveTrackCommand { playlist_id, track_id: t[0] })
            .await
            .unwrap();
        assert!(!removed);
        assert_eq!(h.order(&alice, playlist_id).await, vec![t[1], t[2]]);

        let err = h
            .reorder
            .execute(&alice, ReorderTrackCommand { playlist_id, track_id: t[0], position: 1 })
            .await
            .unwrap_err();
        assert_eq!(kind(err), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_concurrent_appends_get_distinct_positions() {
        let Some(pool) = test_pool().await else { return };
        let h = Harness::new(pool);
        let alice = h.user("alice").await;
        let t = h.tracks_for(&alice, 8).await;
        let playlist_id = h.playlist(&alice, vec![]).await;

        let results = join_all(
            t.iter()
                .map(|&track_id| h.add_track.execute(&alice, AddTrackCommand { playlist_id, track_id })),
        )
        .await;
        assert!(results.into_iter().all(|r| r.unwrap()));

        let mut order = h.order(&alice, playlist_id).await;
        assert_eq!(order.len(), 8);
        order.sort();
        assert_eq!(order, t);
    }

    #[tokio::test]
    async fn test_concurrent_reorders_are_serialised() {
        let Some(pool) = test_pool().await else { return };
        let h = Harness::new(pool);
        let alice = h.user("alice").await;
        let t = h.tracks_for(&alice, 6).await;
        let playlist_id = h.playlist(&alice, vec![]).await;
        for &track_id in &t {
            h.add_track.execute(&alice, AddTrackCommand { playlist_id, track_id }).await.unwrap();
        }

        let results = join_all(t.iter().map(|&track_id| {
            h.reorder
                .execute(&alice, ReorderTrackCommand { playlist_id, track_id, position: 1 })
        }))
        .await;
        for result in results {
            assert_eq!(result.unwrap(), 1);
        }

        let mut order = h.order(&alice, playlist_id).await;
        assert_eq!(order.len(), 6);
        order.sort();
        assert_eq!(order, t);

        let positions: Vec<i32> =
            sqlx::query_scalar("SELECT position FROM playlist_track WHERE playlist_id = $1 ORDER BY position")
                .bind(playlist_id)
                .fetch_all(&h.pool)
                .await
                .unwrap();
        assert_eq!(positions, (1..=6).collect::<Vec<i32>>());
    }

    #[tokio::test]
    async fn test_update_info() {
        let Some(pool) = test_pool().await else { return };
        let h = Harness::new(pool);
        let alice = h.user("alice").await;
        let bob = h.user("bob").await;
        let playlist_id = h.playlist(&alice, vec![]).await;

        let command = |id| UpdatePlaylistCommand {
            id,
            name: "Night drive".into(),
            description: None,
        };
        h.update.execute(&alice, command(playlist_id)).await.unwrap();
        let playlist = h.queries.get(&alice, playlist_id).await.unwrap().playlist;
        assert_eq!(playlist.name, "Night drive");
        assert_eq!(playlist.description, None);

        let err = h.update.execute(&bob, command(playlist_id)).await.unwrap_err();
        assert_eq!(kind(err), ErrorKind::Forbidden);
        let err = h.update.execute(&alice, command(999_999)).await.unwrap_err();
        assert_eq!(kind(err), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_cover_upload_is_content_addressed() {
        let Some(pool) = test_pool().await else { return };
        let h = Harness::new(pool);
        let alice = h.user("alice").await;
        let bob = h.user("bob").await;
        let playlist_id = h.playlist(&alice, vec![]).await;
        let before = h.blobs.len();

        let upload = |data: Bytes| UploadPlaylistCoverCommand { id: playlist_id, data };
        let first = h.cover.execute(&alice, upload(png("sunset"))).await.unwrap();
        let second = h.cover.execute(&alice, upload(png("sunset"))).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(h.blobs.len(), before + 1);
        assert_eq!(h.queries.get(&alice, playlist_id).await.unwrap().playlist.cover_src, first);

        let err = h.cover.execute(&bob, upload(png("other"))).await.unwrap_err();
        assert_eq!(kind(err), ErrorKind::Forbidden);

        let err = h
            .cover
            .execute(&alice, upload(Bytes::from_static(b"plain text, not an image")))
            .await
            .unwrap_err();
        assert_eq!(kind(err), ErrorKind::UnsupportedMediaType);
        assert_eq!(h.queries.get(&alice, playlist_id).await.unwrap().playlist.cover_src, first);
        assert_eq!(h.blobs.len(), before + 1);
    }

    #[tokio::test]
    async fn test_only_owners_may_edit() {
        let Some(pool) = test_pool().await else { return };
        let h = Harness::new(pool);
        let alice = h.user("alice").await;
        let bob = h.user("bob").await;
        let carol = h.user("carol").await;
        let t = h.tracks_for(&alice, 1).await;
        let bob_id = bob.caller_id().unwrap();

        let playlist_id = h.playlist(&alice, vec![bob_id]).await;
        let details = h.queries.get(&alice, playlist_id).await.unwrap();
        let mut owners: Vec<i64> = details.owners.iter().map(|u| u.id).collect();
        owners.sort();
        assert_eq!(owners, vec![alice.caller_id().unwrap(), bob_id]);

        assert!(h.add_track.execute(&bob, AddTrackCommand { playlist_id, track_id: t[0] }).await.unwrap());

        let err = h
            .add_track
            .execute(&carol, AddTrackCommand { playlist_id, track_id: t[0] })
            .await
            .unwrap_err();
        assert_eq!(kind(err), ErrorKind::Forbidden);

        let carol_id = carol.caller_id().unwrap();
        let owner_cmd = || AddPlaylistOwnerCommand { playlist_id, user_id: carol_id };
        assert!(h.add_owner.execute(&alice, owner_cmd()).await.unwrap());
        assert!(!h.add_owner.execute(&alice, owner_cmd()).await.unwrap());

        let err = h
            .add_owner
            .execute(&alice, AddPlaylistOwnerCommand { playlist_id, user_id: 999_999 })
            .await
            .unwrap_err();
        assert_eq!(kind(err), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_likes_and_delete() {
        let Some(pool) = test_pool().await else { return };
        let h = Harness::new(pool);
        let alice = h.user("alice").await;
        let playlist_id = h.playlist(&alice, vec![]).await;

        assert!(!h.queries.get(&alice, playlist_id).await.unwrap().is_liked);
        assert!(h.likes.like(&alice, LikeTarget::Playlist, playlist_id).await.unwrap());
        assert!(!h.likes.like(&alice, LikeTarget::Playlist, playlist_id).await.unwrap());
        assert!(h.queries.get(&alice, playlist_id).await.unwrap().is_liked);
        assert!(!h.queries.get(&ExecutionContext::create(), playlist_id).await.unwrap().is_liked);

        let liked = h.queries.liked_by_user(&alice, alice.caller_id().unwrap()).await.unwrap();
        assert_eq!(liked.len(), 1);

        h.delete.execute(&alice, DeletePlaylistCommand { id: playlist_id }).await.unwrap();
        let err = h.queries.get(&alice, playlist_id).await.unwrap_err();
        assert_eq!(kind(err), ErrorKind::NotFound);

        let err = h.likes.like(&alice, LikeTarget::Playlist, playlist_id).await.unwrap_err();
        assert_eq!(kind(err), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_like_reports_missing_side() {
        let Some(pool) = test_pool().await else { return };
        let h = Harness::new(pool.clone());
        let alice = h.user("alice").await;
        let playlist_id = h.playlist(&alice, vec![]).await;
        let likes = LikeRepository::new(pool);

        let err = likes.like(None, 999_999, LikeTarget::Playlist, playlist_id).await.unwrap_err();
        assert!(matches!(err, PlatformError::NotFound { ref entity, .. } if entity == "user"));

        let alice_id = alice.caller_id().unwrap();
        let err = likes.like(None, alice_id, LikeTarget::Track, 999_999).await.unwrap_err();
        assert!(matches!(err, PlatformError::NotFound { ref entity, .. } if entity == "track"));
    }

    #[tokio::test]
    async fn test_track_delete_renumbers_playlists() {
        let Some(pool) = test_pool().await else { return };
        let h = Harness::new(pool);
        let alice = h.user("alice").await;
        let t = h.tracks_for(&alice, 3).await;
        let playlist_id = h.playlist(&alice, vec![]).await;
        for &track_id in &t {
            h.add_track.execute(&alice, AddTrackCommand { playlist_id, track_id }).await.unwrap();
        }

        h.tracks.delete(&alice, t[0]).await.unwrap();
        assert_eq!(h.order(&alice, playlist_id).await, vec![t[1], t[2]]);

        // Positions are dense again, so appending lands at 3.
        let t4 = h.tracks_for(&alice, 1).await[0];
        h.add_track.execute(&alice, AddTrackCommand { playlist_id, track_id: t4 }).await.unwrap();
        let position = h
            .reorder
            .execute(&alice, ReorderTrackCommand { playlist_id, track_id: t4, position: 10 })
            .await
            .unwrap();
        assert_eq!(position, 3);
    }
}

mod account_flow_tests {
    use super::*;

    #[tokio::test]
    async fn test_duplicate_username_conflicts() {
        let Some(pool) = test_pool().await else { return };
        let h = Harness::new(pool);
        h.user("dave").await;

        let err = h.accounts.sign_up(new_user("dave", "other@example.com")).await.unwrap_err();
        assert_eq!(kind(err), ErrorKind::Conflict);
    }

    #[tokio::test]
    async fn test_email_uniqueness_ignores_case() {
        let Some(pool) = test_pool().await else { return };
        let h = Harness::new(pool);
        h.user("alice").await;

        let err = h.accounts.sign_up(new_user("alice2", "ALICE@example.com")).await.unwrap_err();
        assert!(matches!(err, PlatformError::Duplicate { ref field, .. } if field == "email"));
        assert_eq!(kind(err), ErrorKind::Conflict);
    }

    #[tokio::test]
    async fn test_login_and_logout() {
        let Some(pool) = test_pool().await else { return };
        let h = Harness::new(pool);
        let erin = h.user("erin").await;
        let id = erin.caller_id().unwrap();

        let user = h.accounts.login("erin", "Passw0rdOk").await.unwrap();
        assert_eq!(user.id, id);
        assert_eq!(user.version, 1);

        let err = h.accounts.login("erin", "Wr0ngPassword").await.unwrap_err();
        assert_eq!(kind(err), ErrorKind::Unauthorised);
        let err = h.accounts.login("nobody", "Passw0rdOk").await.unwrap_err();
        assert_eq!(kind(err), ErrorKind::NotFound);

        assert_eq!(h.accounts.logout(id).await.unwrap(), 2);
        assert_eq!(h.accounts.get_user(id).await.unwrap().version, 2);
    }
}
