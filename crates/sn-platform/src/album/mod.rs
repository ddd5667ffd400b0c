//! Album Aggregate

pub mod api;
pub mod entity;
pub mod repository;
pub mod service;

pub use api::{albums_router, AlbumsState};
pub use entity::{Album, AlbumDetails, NewAlbum};
pub use repository::AlbumRepository;
pub use service::AlbumService;
