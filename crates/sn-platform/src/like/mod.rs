//! Likes
//!
//! Per-user like sets over tracks, albums, artists and playlists.

pub mod api;
pub mod repository;
pub mod service;

pub use api::likes_router;
pub use repository::{LikeRepository, LikeTarget};
pub use service::LikeService;
