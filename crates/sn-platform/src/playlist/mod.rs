//! Playlist Aggregate
//!
//! User-curated, ordered track lists with one or more owners.

pub mod api;
pub mod entity;
pub mod operations;
pub mod repository;

pub use api::{playlists_router, PlaylistResponse, PlaylistsState};
pub use entity::{Playlist, PlaylistDetails, PlaylistInfo};
pub use repository::PlaylistRepository;
