//! Content-addressed uploads.
//!
//! Every upload goes through one policy: sniff the MIME type from the first
//! 512 bytes, check it against the entity's whitelist, hash the whole body
//! with SHA-256 and store it at `<folder>/<hex>.<ext>`. Identical bytes map to
//! the same key, so a repeated upload writes nothing.

use bytes::Bytes;
use sha2::{Digest, Sha256};
use tracing::debug;

use sn_config::MediaConfig;

use crate::blob::BlobStore;
use crate::shared::error::{PlatformError, Result};

/// Bytes inspected for MIME detection.
pub const SNIFF_LEN: usize = 512;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaType {
    Png,
    Jpeg,
    Gif,
    Webp,
    Mpeg,
    Wav,
    Flac,
    Ogg,
}

/// Playlist and album covers.
pub const COVER_TYPES: &[MediaType] = &[MediaType::Png, MediaType::Jpeg, MediaType::Gif];

pub const AVATAR_TYPES: &[MediaType] = &[MediaType::Png, MediaType::Jpeg, MediaType::Gif, MediaType::Webp];

pub const RECORD_TYPES: &[MediaType] = &[MediaType::Mpeg, MediaType::Wav, MediaType::Flac, MediaType::Ogg];

impl MediaType {
    pub fn mime(self) -> &'static str {
        match self {
            MediaType::Png => "image/png",
            MediaType::Jpeg => "image/jpeg",
            MediaType::Gif => "image/gif",
            MediaType::Webp => "image/webp",
            MediaType::Mpeg => "audio/mpeg",
            MediaType::Wav => "audio/wav",
            MediaType::Flac => "audio/flac",
            MediaType::Ogg => "audio/ogg",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            MediaType::Png => "png",
            MediaType::Jpeg => "jpeg",
            MediaType::Gif => "gif",
            MediaType::Webp => "webp",
            MediaType::Mpeg => "mp3",
            MediaType::Wav => "wav",
            MediaType::Flac => "flac",
            MediaType::Ogg => "ogg",
        }
    }

    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.trim_start_matches('.').to_ascii_lowercase().as_str() {
            "png" => Some(MediaType::Png),
            "jpg" | "jpeg" => Some(MediaType::Jpeg),
            "gif" => Some(MediaType::Gif),
            "webp" => Some(MediaType::Webp),
            "mp3" => Some(MediaType::Mpeg),
            "wav" => Some(MediaType::Wav),
            "flac" => Some(MediaType::Flac),
            "ogg" => Some(MediaType::Ogg),
            _ => None,
        }
    }

    /// Detect the type from magic numbers in the leading bytes.
    pub fn sniff(data: &[u8]) -> Option<Self> {
        let head = &data[..data.len().min(SNIFF_LEN)];
        let riff_kind = |kind: &[u8]| head.len() >= 12 && &head[..4] == b"RIFF" && &head[8..12] == kind;

        if head.starts_with(b"\x89PNG\r\n\x1a\n") {
            Some(MediaType::Png)
        } else if head.starts_with(&[0xFF, 0xD8, 0xFF]) {
            Some(MediaType::Jpeg)
        } else if head.starts_with(b"GIF87a") || head.starts_with(b"GIF89a") {
            Some(MediaType::Gif)
        } else if riff_kind(b"WEBP") {
            Some(MediaType::Webp)
        } else if riff_kind(b"WAVE") {
            Some(MediaType::Wav)
        } else if head.starts_with(b"fLaC") {
            Some(MediaType::Flac)
        } else if head.starts_with(b"OggS\x00") {
            Some(MediaType::Ogg)
        } else if head.starts_with(b"ID3") || (head.len() >= 2 && head[0] == 0xFF && head[1] & 0xE0 == 0xE0) {
            Some(MediaType::Mpeg)
        } else {
            None
        }
    }
}

/// `hex(sha256(data)) + "." + extension`
pub fn file_hash(data: &[u8], extension: &str) -> String {
    let digest = Sha256::digest(data);
    format!("{}.{}", hex::encode(digest), extension)
}

/// Upload rules for one target folder.
#[derive(Debug, Clone)]
pub struct UploadPolicy {
    pub folder: String,
    pub allowed: &'static [MediaType],
    pub max_size: usize,
}

impl UploadPolicy {
    pub fn new(folder: impl Into<String>, allowed: &'static [MediaType], max_size: usize) -> Self {
        Self {
            folder: folder.into(),
            allowed,
            max_size,
        }
    }

    /// A body of exactly `max_size` bytes is accepted.
    pub fn check_size(&self, len: usize) -> Result<()> {
        if len > self.max_size {
            return Err(PlatformError::PayloadTooLarge { limit: self.max_size });
        }
        Ok(())
    }

    pub fn classify(&self, data: &[u8]) -> Result<MediaType> {
        match MediaType::sniff(data) {
            Some(media) if self.allowed.contains(&media) => Ok(media),
            Some(media) => Err(PlatformError::UnsupportedMediaType {
                mime: media.mime().to_string(),
            }),
            None => Err(PlatformError::UnsupportedMediaType {
                mime: "application/octet-stream".to_string(),
            }),
        }
    }

    pub fn key_for(&self, data: &[u8], media: MediaType) -> String {
        format!("{}/{}", self.folder.trim_end_matches('/'), file_hash(data, media.extension()))
    }
}

impl UploadPolicy {
    pub fn avatars(media: &MediaConfig) -> Self {
        Self::new(&media.avatars_folder, AVATAR_TYPES, media.max_upload_size)
    }

    pub fn playlist_covers(media: &MediaConfig) -> Self {
        Self::new(&media.playlist_covers_folder, COVER_TYPES, media.max_upload_size)
    }

    pub fn album_covers(media: &MediaConfig) -> Self {
        Self::new(&media.album_covers_folder, COVER_TYPES, media.max_upload_size)
    }

    pub fn records(media: &MediaConfig) -> Self {
        Self::new(&media.records_folder, RECORD_TYPES, media.max_record_size)
    }
}

/// Result of a content-addressed upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredFile {
    pub path: String,
    pub media: MediaType,
    /// False when an identical object was already stored.
    pub created: bool,
}

/// Validate, hash and store `data` according to `policy`.
pub async fn store_upload(store: &dyn BlobStore, policy: &UploadPolicy, data: Bytes) -> Result<StoredFile> {
    policy.check_size(data.len())?;
    let media = policy.classify(&data)?;
    let path = policy.key_for(&data, media);

    let created = store.put_if_absent(&path, data, media.mime()).await?;
    debug!(path = %path, created, "Upload stored");

    Ok(StoredFile { path, media, created })
}


#[cfg(test)]
mod tests {
    use super::fixtures::png;
    use super::*;
    use crate::blob::MemoryBlobStore;

    #[test]
    fn test_sniff_signatures() {
        assert_eq!(MediaType::sniff(&png(64)), Some(MediaType::Png));
        assert_eq!(MediaType::sniff(&[0xFF, 0xD8, 0xFF, 0xE0]), Some(MediaType::Jpeg));
        assert_eq!(MediaType::sniff(b"GIF89a...."), Some(MediaType::Gif));
        assert_eq!(MediaType::sniff(b"RIFF\x00\x00\x00\x00WEBPVP8 "), Some(MediaType::Webp));
        assert_eq!(MediaType::sniff(b"RIFF\x00\x00\x00\x00WAVEfmt "), Some(MediaType::Wav));
        assert_eq!(MediaType::sniff(b"fLaC\x00\x00"), Some(MediaType::Flac));
        assert_eq!(MediaType::sniff(b"ID3\x04\x00"), Some(MediaType::Mpeg));
        assert_eq!(MediaType::sniff(b"plain text"), None);
        assert_eq!(MediaType::sniff(&[]), None);
    }

    #[test]
    fn test_file_hash_is_sha256_hex_plus_extension() {
        assert_eq!(
            file_hash(b"abc", "png"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad.png"
        );
    }

    #[test]
    fn test_size_cap_boundary() {
        let policy = UploadPolicy::new("playlist_covers", COVER_TYPES, 1024);
        assert!(policy.check_size(1024).is_ok());
        assert!(matches!(
            policy.check_size(1025),
            Err(PlatformError::PayloadTooLarge { limit: 1024 })
        ));
    }

    #[test]
    fn test_whitelist() {
        let policy = UploadPolicy::new("playlist_covers", COVER_TYPES, 1024);
        assert_eq!(policy.classify(&png(16)).unwrap(), MediaType::Png);
        assert!(matches!(
            policy.classify(b"RIFF\x00\x00\x00\x00WEBPVP8 "),
            Err(PlatformError::UnsupportedMediaType { .. })
        ));
    }

    #[test]
    fn test_policies_follow_media_config() {
        let media = MediaConfig::default();
        assert_eq!(UploadPolicy::playlist_covers(&media).folder, "playlist_covers");
        assert_eq!(UploadPolicy::records(&media).max_size, media.max_record_size);
        assert!(UploadPolicy::avatars(&media).allowed.contains(&MediaType::Webp));
        assert!(!UploadPolicy::album_covers(&media).allowed.contains(&MediaType::Webp));
    }

    #[tokio::test]
    async fn test_store_upload_is_content_addressed() {
        let store = MemoryBlobStore::new();
        let policy = UploadPolicy::new("playlist_covers", COVER_TYPES, 200 * 1024);
        let data = Bytes::from(png(100 * 1024));

        let first = store_upload(&store, &policy, data.clone()).await.unwrap();
        let second = store_upload(&store, &policy, data.clone()).await.unwrap();

        assert!(first.created);
        assert!(!second.created);
        assert_eq!(first.path, second.path);
        assert_eq!(first.path, format!("playlist_covers/{}", file_hash(&data, "png")));
        assert_eq!(store.len(), 1);
        assert_eq!(store.content_type(&first.path).as_deref(), Some("image/png"));
    }

    #[tokio::test]
    async fn test_rejected_upload_stores_nothing() {
        let store = MemoryBlobStore::new();
        let policy = UploadPolicy::new("avatars", AVATAR_TYPES, 16);

        assert!(store_upload(&store, &policy, Bytes::from(png(17))).await.is_err());
        assert!(store_upload(&store, &policy, Bytes::from_static(b"not an image")).await.is_err());
        assert!(store.is_empty());
    }
}
