//! Track entity

use crate::artist::entity::ArtistRef;
use crate::shared::error::{PlatformError, Result};
use crate::shared::validation::validate_title;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Track {
    pub id: i64,
    pub name: String,
    pub album_id: Option<i64>,
    pub album_position: Option<i32>,
    pub cover_src: String,
    pub record_src: String,
    /// Seconds.
    pub duration: i32,
    /// Lifetime listen counter. Read-only.
    pub listens: i64,
}

#[derive(Debug, Clone)]
pub struct NewTrack {
    pub name: String,
    pub album_id: Option<i64>,
    pub album_position: Option<i32>,
    pub artist_ids: Vec<i64>,
    pub duration: i32,
}

impl NewTrack {
    pub fn validate(&self) -> Result<()> {
        validate_title("name", &self.name)?;
        if self.artist_ids.is_empty() {
            return Err(PlatformError::validation("a track needs at least one artist"));
        }
        if self.duration < 0 {
            return Err(PlatformError::validation("duration must not be negative"));
        }
        match (self.album_id, self.album_position) {
            (None, Some(_)) => Err(PlatformError::validation("albumPosition requires albumId")),
            (_, Some(position)) if position < 1 => Err(PlatformError::validation("albumPosition must be positive")),
            _ => Ok(()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct TrackDetails {
    pub track: Track,
    pub artists: Vec<ArtistRef>,
    pub is_liked: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_track() -> NewTrack {
        NewTrack {
            name: "Feel Good Inc.".into(),
            album_id: Some(1),
            album_position: Some(6),
            artist_ids: vec![1],
            duration: 222,
        }
    }

    #[test]
    fn test_track_validation() {
        assert!(new_track().validate().is_ok());

        let mut track = new_track();
        track.album_id = None;
        assert!(track.validate().is_err());

        let mut track = new_track();
        track.album_position = Some(0);
        assert!(track.validate().is_err());

        let mut track = new_track();
        track.artist_ids.clear();
        assert!(track.validate().is_err());
    }
}
