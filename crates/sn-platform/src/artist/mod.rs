//! Artist Aggregate
//!
//! Artists, optionally managed by a user account.

pub mod api;
pub mod entity;
pub mod repository;
pub mod service;

pub use api::{artists_router, ArtistsState};
pub use entity::{Artist, ArtistDetails, ArtistRef, NewArtist};
pub use repository::ArtistRepository;
pub use service::ArtistService;
