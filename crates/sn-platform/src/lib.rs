//! Sonora Platform
//!
//! Backend of the Sonora music streaming service:
//! - Catalog aggregates (artists, albums, tracks) and user playlists
//! - Likes, feed and full-text search
//! - Session and anti-forgery tokens, admission middleware
//! - Content-addressed media storage
//! - Framed RPC between the API server and the Authorization, User and
//!   Search services
//!
//! ## Module Organization (Aggregate-based)
//!
//! Each aggregate contains:
//! - `entity` - Domain records and invariants
//! - `repository` - PostgreSQL access
//! - `service` or `operations` - Use cases
//! - `api` - REST endpoints

// Catalog aggregates
pub mod album;
pub mod artist;
pub mod playlist;
pub mod track;

// Personalisation
pub mod feed;
pub mod like;
pub mod search;

// Identity
pub mod auth;
pub mod user;

// Infrastructure
pub mod blob;
pub mod rpc;
pub mod shared;
pub mod usecase;

pub use shared::error::{PlatformError, Result};
pub use usecase::{ExecutionContext, PgUnitOfWork};

pub use album::entity::{Album, AlbumDetails, NewAlbum};
pub use artist::entity::{Artist, ArtistDetails, ArtistRef, NewArtist};
pub use playlist::entity::{Playlist, PlaylistDetails, PlaylistInfo};
pub use search::entity::{SearchKind, SearchResults};
pub use track::entity::{NewTrack, Track, TrackDetails};
pub use user::entity::{NewUser, Sex, User, UserUpdate};

pub use album::repository::AlbumRepository;
pub use artist::repository::ArtistRepository;
pub use like::repository::{LikeRepository, LikeTarget};
pub use playlist::repository::PlaylistRepository;
pub use search::repository::{PgSearchRepository, SearchIndex};
pub use track::repository::TrackRepository;
pub use user::repository::UserRepository;

pub use auth::agent::{AuthAgent, RpcAuthAgent};
pub use search::agent::{RpcSearchAgent, SearchAgent};
pub use user::agent::{RpcUserAgent, UserAgent};

pub use blob::{BlobStore, FsBlobStore, MemoryBlobStore};
