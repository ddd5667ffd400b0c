//! Blob store port.
//!
//! Binary objects (covers, avatars, audio) live outside the SQL store and are
//! referenced from entity rows by key. Keys are content addressed, so writes
//! are put-if-absent.

use async_trait::async_trait;
use bytes::Bytes;

use crate::shared::error::Result;

pub mod fs;
pub mod memory;

pub use fs::FsBlobStore;
pub use memory::MemoryBlobStore;

#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn exists(&self, key: &str) -> Result<bool>;

    /// Store `data` under `key` unless an object already exists there.
    /// Returns `true` when the object was written.
    async fn put_if_absent(&self, key: &str, data: Bytes, content_type: &str) -> Result<bool>;
}
