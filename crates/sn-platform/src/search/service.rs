//! Search orchestration
//!
//! Fans one query out to the four `Find*` streams of the Search service.

use std::sync::Arc;

use tracing::{debug, warn};

use super::agent::SearchAgent;
use super::entity::{SearchResults, MAX_AMOUNT};
use crate::shared::error::Result;
use crate::usecase::ExecutionContext;

pub struct SearchService {
    agent: Arc<dyn SearchAgent>,
}

impl SearchService {
    pub fn new(agent: Arc<dyn SearchAgent>) -> Self {
        Self { agent }
    }

    /// Up to `amount` matches per kind (capped at [`MAX_AMOUNT`]).
    ///
    /// A blank query or `amount == 0` answers empty without calling the
    /// Search service. Kinds run concurrently; if any stream fails the whole
    /// search fails and the other kinds' results are discarded.
    pub async fn search(&self, ctx: &ExecutionContext, query: &str, amount: u32) -> Result<SearchResults> {
        let query = query.trim();
        let amount = amount.min(MAX_AMOUNT);
        if query.is_empty() || amount == 0 {
            return Ok(SearchResults::default());
        }

        let (albums, artists, tracks, playlists) = tokio::try_join!(
            self.agent.find_albums(ctx, query, amount),
            self.agent.find_artists(ctx, query, amount),
            self.agent.find_tracks(ctx, query, amount),
            self.agent.find_playlists(ctx, query, amount),
        )
        .inspect_err(|e| warn!(request_id = %ctx.request_id, error = %e, "Search fan-out failed"))?;

        debug!(
            request_id = %ctx.request_id,
            albums = albums.len(),
            artists = artists.len(),
            tracks = tracks.len(),
            playlists = playlists.len(),
            "Search completed"
        );

        Ok(SearchResults {
            albums,
            artists,
            tracks,
            playlists,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::album::entity::Album;
    use crate::artist::entity::Artist;
    use crate::playlist::entity::Playlist;
    use crate::shared::error::PlatformError;
    use crate::track::entity::Track;
    use async_trait::async_trait;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct FakeAgent {
        calls: Mutex<Vec<(String, u32)>>,
        fail_tracks: bool,
    }

    impl FakeAgent {
        fn record(&self, query: &str, amount: u32) {
            self.calls.lock().push((query.to_string(), amount));
        }
    }

    #[async_trait]
    impl SearchAgent for FakeAgent {
        async fn find_albums(&self, _ctx: &ExecutionContext, query: &str, amount: u32) -> Result<Vec<Album>> {
            self.record(query, amount);
            Ok(vec![Album {
                id: 1,
                name: "Gorillaz".into(),
                description: None,
                cover_src: String::new(),
            }])
        }

        async fn find_artists(&self, _ctx: &ExecutionContext, query: &str, amount: u32) -> Result<Vec<Artist>> {
            self.record(query, amount);
            Ok(Vec::new())
        }

        async fn find_tracks(&self, _ctx: &ExecutionContext, query: &str, amount: u32) -> Result<Vec<Track>> {
            self.record(query, amount);
            if self.fail_tracks {
                return Err(PlatformError::Upstream {
                    service: "Search".into(),
                    message: "stream reset".into(),
                });
            }
            Ok(Vec::new())
        }

        async fn find_playlists(&self, _ctx: &ExecutionContext, query: &str, amount: u32) -> Result<Vec<Playlist>> {
            self.record(query, amount);
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn test_zero_amount_skips_rpc() {
        let agent = Arc::new(FakeAgent::default());
        let service = SearchService::new(agent.clone());
        let results = service.search(&ExecutionContext::create(), "gor", 0).await.unwrap();
        assert!(results.albums.is_empty());
        assert!(agent.calls.lock().is_empty());

        service.search(&ExecutionContext::create(), "   ", 5).await.unwrap();
        assert!(agent.calls.lock().is_empty());
    }

    #[tokio::test]
    async fn test_fan_out_caps_amount() {
        let agent = Arc::new(FakeAgent::default());
        let service = SearchService::new(agent.clone());
        let results = service.search(&ExecutionContext::create(), " gor ", 500).await.unwrap();
        assert_eq!(results.albums.len(), 1);

        let calls = agent.calls.lock();
        assert_eq!(calls.len(), 4);
        assert!(calls.iter().all(|(q, a)| q == "gor" && *a == MAX_AMOUNT));
    }

    #[tokio::test]
    async fn test_failed_kind_fails_search() {
        let agent = Arc::new(FakeAgent {
            fail_tracks: true,
            ..Default::default()
        });
        let service = SearchService::new(agent);
        let err = service.search(&ExecutionContext::create(), "gor", 5).await.unwrap_err();
        assert!(matches!(err, PlatformError::Upstream { .. }));
    }
}
