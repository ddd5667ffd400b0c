//! Album entity

use crate::artist::entity::ArtistRef;
use crate::shared::error::{PlatformError, Result};
use crate::shared::validation::{validate_description, validate_title};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Album {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub cover_src: String,
}

#[derive(Debug, Clone)]
pub struct NewAlbum {
    pub name: String,
    pub description: Option<String>,
    pub artist_ids: Vec<i64>,
}

impl NewAlbum {
    pub fn validate(&self) -> Result<()> {
        validate_title("name", &self.name)?;
        validate_description(self.description.as_deref())?;
        if self.artist_ids.is_empty() {
            return Err(PlatformError::validation("an album needs at least one artist"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct AlbumDetails {
    pub album: Album,
    pub artists: Vec<ArtistRef>,
    pub is_liked: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_album_requires_artist() {
        let album = NewAlbum {
            name: "Gorillaz".into(),
            description: None,
            artist_ids: vec![],
        };
        assert!(album.validate().is_err());

        let album = NewAlbum {
            artist_ids: vec![1],
            ..album
        };
        assert!(album.validate().is_ok());
    }
}
