//! Track Aggregate
//!
//! Tracks, their artist credits and stored audio.

pub mod api;
pub mod entity;
pub mod repository;
pub mod service;

pub use api::{tracks_router, TracksState};
pub use entity::{NewTrack, Track, TrackDetails};
pub use repository::TrackRepository;
pub use service::TrackService;
