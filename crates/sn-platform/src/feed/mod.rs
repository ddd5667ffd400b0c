pub mod api;

pub use api::{feed_router, FeedState};
