//! Search service agent

use async_trait::async_trait;

use super::entity::SearchKind;
use crate::album::entity::Album;
use crate::artist::entity::Artist;
use crate::playlist::entity::Playlist;
use crate::rpc::messages::{AlbumMessage, ArtistMessage, PlaylistMessage, SearchQuery, TrackMessage};
use crate::rpc::{RpcChannel, SEARCH_SERVICE};
use crate::shared::error::Result;
use crate::track::entity::Track;
use crate::usecase::ExecutionContext;

/// Typed client of the Search service. Each call consumes at most `amount`
/// streamed results.
#[async_trait]
pub trait SearchAgent: Send + Sync {
    async fn find_albums(&self, ctx: &ExecutionContext, query: &str, amount: u32) -> Result<Vec<Album>>;
    async fn find_artists(&self, ctx: &ExecutionContext, query: &str, amount: u32) -> Result<Vec<Artist>>;
    async fn find_tracks(&self, ctx: &ExecutionContext, query: &str, amount: u32) -> Result<Vec<Track>>;
    async fn find_playlists(&self, ctx: &ExecutionContext, query: &str, amount: u32) -> Result<Vec<Playlist>>;
}

pub struct RpcSearchAgent {
    channel: RpcChannel,
}

impl RpcSearchAgent {
    pub fn new(channel: RpcChannel) -> Self {
        Self { channel }
    }

    pub fn connect(base_url: &str) -> Result<Self> {
        Ok(Self::new(RpcChannel::connect(base_url, SEARCH_SERVICE)?))
    }

    async fn find<M>(&self, ctx: &ExecutionContext, kind: SearchKind, query: &str, amount: u32) -> Result<Vec<M>>
    where
        M: serde::de::DeserializeOwned,
    {
        let request = SearchQuery {
            query: query.to_string(),
            amount,
        };
        let stream = self.channel.server_streaming(ctx, kind.method(), &request).await?;
        stream.collect(amount as usize).await
    }
}

#[async_trait]
impl SearchAgent for RpcSearchAgent {
    async fn find_albums(&self, ctx: &ExecutionContext, query: &str, amount: u32) -> Result<Vec<Album>> {
        let found: Vec<AlbumMessage> = self.find(ctx, SearchKind::Album, query, amount).await?;
        Ok(found.into_iter().map(Album::from).collect())
    }

    async fn find_artists(&self, ctx: &ExecutionContext, query: &str, amount: u32) -> Result<Vec<Artist>> {
        let found: Vec<ArtistMessage> = self.find(ctx, SearchKind::Artist, query, amount).await?;
        Ok(found.into_iter().map(Artist::from).collect())
    }

    async fn find_tracks(&self, ctx: &ExecutionContext, query: &str, amount: u32) -> Result<Vec<Track>> {
        let found: Vec<TrackMessage> = self.find(ctx, SearchKind::Track, query, amount).await?;
        Ok(found.into_iter().map(Track::from).collect())
    }

    async fn find_playlists(&self, ctx: &ExecutionContext, query: &str, amount: u32) -> Result<Vec<Playlist>> {
        let found: Vec<PlaylistMessage> = self.find(ctx, SearchKind::Playlist, query, amount).await?;
        Ok(found.into_iter().map(Playlist::from).collect())
    }
}
