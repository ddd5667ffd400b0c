//! Search RPC service
//!
//! Each `Find*` method streams one message per matching row, best match
//! first, and ends with the status frame.

use std::sync::Arc;

use axum::extract::State;
use axum::response::Response;
use axum::routing::post;
use axum::Router;
use futures::stream;
use serde::Serialize;
use tracing::debug;

use super::entity::{SearchKind, MAX_AMOUNT};
use super::repository::SearchIndex;
use crate::rpc::messages::{AlbumMessage, ArtistMessage, PlaylistMessage, SearchQuery, TrackMessage};
use crate::rpc::{streaming, RpcRequest, SEARCH_SERVICE};
use crate::shared::error::Result;

type Index = Arc<dyn SearchIndex>;

fn respond<T, M>(found: Result<Vec<T>>) -> Response
where
    M: From<T> + Serialize + Send + 'static,
{
    let items: Vec<Result<M>> = match found {
        Ok(rows) => rows.into_iter().map(|row| Ok(M::from(row))).collect(),
        Err(err) => vec![Err(err)],
    };
    streaming(stream::iter(items))
}

fn log_query(kind: SearchKind, query: &SearchQuery) -> u32 {
    debug!(method = kind.method(), query = %query.query, amount = query.amount, "Search request");
    query.amount.min(MAX_AMOUNT)
}

async fn find_albums(State(index): State<Index>, RpcRequest(_, query): RpcRequest<SearchQuery>) -> Response {
    let amount = log_query(SearchKind::Album, &query);
    respond::<_, AlbumMessage>(index.albums(&query.query, amount).await)
}

async fn find_artists(State(index): State<Index>, RpcRequest(_, query): RpcRequest<SearchQuery>) -> Response {
    let amount = log_query(SearchKind::Artist, &query);
    respond::<_, ArtistMessage>(index.artists(&query.query, amount).await)
}

async fn find_tracks(State(index): State<Index>, RpcRequest(_, query): RpcRequest<SearchQuery>) -> Response {
    let amount = log_query(SearchKind::Track, &query);
    respond::<_, TrackMessage>(index.tracks(&query.query, amount).await)
}

async fn find_playlists(State(index): State<Index>, RpcRequest(_, query): RpcRequest<SearchQuery>) -> Response {
    let amount = log_query(SearchKind::Playlist, &query);
    respond::<_, PlaylistMessage>(index.playlists(&query.query, amount).await)
}

pub fn search_rpc_router(index: Index) -> Router {
    let route = |kind: SearchKind| format!("/{}/{}", SEARCH_SERVICE, kind.method());
    Router::new()
        .route(&route(SearchKind::Album), post(find_albums))
        .route(&route(SearchKind::Artist), post(find_artists))
        .route(&route(SearchKind::Track), post(find_tracks))
        .route(&route(SearchKind::Playlist), post(find_playlists))
        .with_state(index)
}
