//! Search records

use crate::album::entity::Album;
use crate::artist::entity::Artist;
use crate::playlist::entity::Playlist;
use crate::track::entity::Track;

/// Upper bound on `amount` per kind.
pub const MAX_AMOUNT: u32 = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SearchKind {
    Album,
    Artist,
    Track,
    Playlist,
}

impl SearchKind {
    pub const ALL: [SearchKind; 4] = [SearchKind::Album, SearchKind::Artist, SearchKind::Track, SearchKind::Playlist];

    /// RPC method name on the search service.
    pub fn method(self) -> &'static str {
        match self {
            SearchKind::Album => "FindAlbums",
            SearchKind::Artist => "FindArtists",
            SearchKind::Track => "FindTracks",
            SearchKind::Playlist => "FindPlaylists",
        }
    }
}

/// Results of one fan-out, each list ordered by relevance.
#[derive(Debug, Clone, Default)]
pub struct SearchResults {
    pub albums: Vec<Album>,
    pub artists: Vec<Artist>,
    pub tracks: Vec<Track>,
    pub playlists: Vec<Playlist>,
}
