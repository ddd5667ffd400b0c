//! Artist entity

use crate::shared::error::Result;
use crate::shared::validation::validate_title;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artist {
    pub id: i64,
    pub name: String,
    /// The user account that manages this artist, if any.
    pub user_id: Option<i64>,
    pub avatar_src: String,
}

/// Short artist reference attached to albums and tracks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtistRef {
    pub id: i64,
    pub name: String,
}

impl From<&Artist> for ArtistRef {
    fn from(artist: &Artist) -> Self {
        Self {
            id: artist.id,
            name: artist.name.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewArtist {
    pub name: String,
    pub user_id: i64,
    pub avatar_src: String,
}

impl NewArtist {
    pub fn validate(&self) -> Result<()> {
        validate_title("name", &self.name)
    }
}

/// An artist as presented to a caller.
#[derive(Debug, Clone)]
pub struct ArtistDetails {
    pub artist: Artist,
    pub is_liked: bool,
}
