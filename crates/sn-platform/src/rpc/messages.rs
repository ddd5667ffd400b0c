//! Wire messages exchanged with the sibling services, and their
//! translation to and from domain records.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::album::entity::Album;
use crate::artist::entity::Artist;
use crate::playlist::entity::Playlist;
use crate::shared::error::{PlatformError, Result};
use crate::track::entity::Track;
use crate::user::entity::{NewUser, User, UserUpdate};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserMessage {
    pub id: i64,
    pub version: i64,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub sex: String,
    pub birth_date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_src: Option<String>,
}

impl From<User> for UserMessage {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            version: user.version,
            username: user.username,
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
            sex: user.sex.to_string(),
            birth_date: user.birth_date,
            avatar_src: user.avatar_src,
        }
    }
}

impl TryFrom<UserMessage> for User {
    type Error = PlatformError;

    fn try_from(message: UserMessage) -> Result<Self> {
        Ok(User {
            id: message.id,
            version: message.version,
            sex: message.sex.parse()?,
            username: message.username,
            email: message.email,
            first_name: message.first_name,
            last_name: message.last_name,
            birth_date: message.birth_date,
            avatar_src: message.avatar_src,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignUpRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub sex: String,
    pub birth_date: NaiveDate,
}

impl From<NewUser> for SignUpRequest {
    fn from(user: NewUser) -> Self {
        Self {
            username: user.username,
            email: user.email,
            password: user.password,
            first_name: user.first_name,
            last_name: user.last_name,
            sex: user.sex.to_string(),
            birth_date: user.birth_date,
        }
    }
}

impl TryFrom<SignUpRequest> for NewUser {
    type Error = PlatformError;

    fn try_from(request: SignUpRequest) -> Result<Self> {
        Ok(NewUser {
            sex: request.sex.parse()?,
            username: request.username,
            email: request.email,
            password: request.password,
            first_name: request.first_name,
            last_name: request.last_name,
            birth_date: request.birth_date,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserIdRequest {
    pub user_id: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionReply {
    pub version: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateInfoRequest {
    pub user_id: i64,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub sex: String,
    pub birth_date: NaiveDate,
}

impl From<UserUpdate> for UpdateInfoRequest {
    fn from(update: UserUpdate) -> Self {
        Self {
            user_id: update.id,
            username: update.username,
            email: update.email,
            first_name: update.first_name,
            last_name: update.last_name,
            sex: update.sex.to_string(),
            birth_date: update.birth_date,
        }
    }
}

impl TryFrom<UpdateInfoRequest> for UserUpdate {
    type Error = PlatformError;

    fn try_from(request: UpdateInfoRequest) -> Result<Self> {
        Ok(UserUpdate {
            id: request.user_id,
            sex: request.sex.parse()?,
            username: request.username,
            email: request.email,
            first_name: request.first_name,
            last_name: request.last_name,
            birth_date: request.birth_date,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePasswordRequest {
    pub user_id: i64,
    pub old_password: String,
    pub new_password: String,
}

/// First message of an avatar upload; the file bytes follow as chunks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvatarExtra {
    pub user_id: i64,
    pub extension: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvatarPathReply {
    pub path: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistIdRequest {
    pub playlist_id: i64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsersReply {
    pub users: Vec<UserMessage>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchQuery {
    pub query: String,
    pub amount: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlbumMessage {
    pub id: i64,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub cover_src: String,
}

impl From<Album> for AlbumMessage {
    fn from(album: Album) -> Self {
        Self {
            id: album.id,
            name: album.name,
            description: album.description,
            cover_src: album.cover_src,
        }
    }
}

impl From<AlbumMessage> for Album {
    fn from(message: AlbumMessage) -> Self {
        Self {
            id: message.id,
            name: message.name,
            description: message.description,
            cover_src: message.cover_src,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtistMessage {
    pub id: i64,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<i64>,
    pub avatar_src: String,
}

impl From<Artist> for ArtistMessage {
    fn from(artist: Artist) -> Self {
        Self {
            id: artist.id,
            name: artist.name,
            user_id: artist.user_id,
            avatar_src: artist.avatar_src,
        }
    }
}

impl From<ArtistMessage> for Artist {
    fn from(message: ArtistMessage) -> Self {
        Self {
            id: message.id,
            name: message.name,
            user_id: message.user_id,
            avatar_src: message.avatar_src,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackMessage {
    pub id: i64,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub album_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub album_position: Option<i32>,
    pub cover_src: String,
    pub record_src: String,
    pub duration: i32,
    pub listens: i64,
}

impl From<Track> for TrackMessage {
    fn from(track: Track) -> Self {
        Self {
            id: track.id,
            name: track.name,
            album_id: track.album_id,
            album_position: track.album_position,
            cover_src: track.cover_src,
            record_src: track.record_src,
            duration: track.duration,
            listens: track.listens,
        }
    }
}

impl From<TrackMessage> for Track {
    fn from(message: TrackMessage) -> Self {
        Self {
            id: message.id,
            name: message.name,
            album_id: message.album_id,
            album_position: message.album_position,
            cover_src: message.cover_src,
            record_src: message.record_src,
            duration: message.duration,
            listens: message.listens,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistMessage {
    pub id: i64,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub cover_src: String,
}

impl From<Playlist> for PlaylistMessage {
    fn from(playlist: Playlist) -> Self {
        Self {
            id: playlist.id,
            name: playlist.name,
            description: playlist.description,
            cover_src: playlist.cover_src,
        }
    }
}

impl From<PlaylistMessage> for Playlist {
    fn from(message: PlaylistMessage) -> Self {
        Self {
            id: message.id,
            name: message.name,
            description: message.description,
            cover_src: message.cover_src,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Empty {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::user::entity::Sex;

    #[test]
    fn test_user_message_field_names() {
        let user = User {
            id: 1,
            version: 2,
            username: "u1".into(),
            email: "u1@example.com".into(),
            first_name: "U".into(),
            last_name: "One".into(),
            sex: Sex::M,
            birth_date: NaiveDate::from_ymd_opt(2001, 1, 1).unwrap(),
            avatar_src: None,
        };
        let json = serde_json::to_value(UserMessage::from(user.clone())).unwrap();
        assert_eq!(json["firstName"], "U");
        assert_eq!(json["birthDate"], "2001-01-01");
        assert!(json.get("avatarSrc").is_none());

        let back: User = serde_json::from_value::<UserMessage>(json).unwrap().try_into().unwrap();
        assert_eq!(back, user);
    }

    #[test]
    fn test_bad_sex_is_rejected() {
        let request = SignUpRequest {
            username: "u1".into(),
            email: "u1@example.com".into(),
            password: "Aa11aaaa".into(),
            first_name: "U".into(),
            last_name: "One".into(),
            sex: "X".into(),
            birth_date: NaiveDate::from_ymd_opt(2001, 1, 1).unwrap(),
        };
        assert!(NewUser::try_from(request).is_err());
    }
}
