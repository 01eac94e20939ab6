//! Storage trait definitions.

use crate::error::StorageResult;
use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
use std::pin::Pin;
use time::OffsetDateTime;

/// A boxed stream of bytes for streaming reads and writes.
pub type ByteStream = Pin<Box<dyn Stream<Item = StorageResult<Bytes>> + Send>>;

/// A byte window to read: `offset` inclusive, `end` exclusive.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReadRange {
    pub offset: u64,
    pub end: u64,
}

impl ReadRange {
    /// Number of bytes covered by the range.
    pub fn len(&self) -> u64 {
        self.end.saturating_sub(self.offset)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// An entry of a single directory listing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DirEntry {
    /// A nested directory. `key` is the full key of the directory.
    Dir { key: String },
    /// A stored object.
    Object { key: String, size: u64 },
}

impl DirEntry {
    /// Full key of the entry.
    pub fn key(&self) -> &str {
        match self {
            DirEntry::Dir { key } | DirEntry::Object { key, .. } => key,
        }
    }

    /// Last path segment of the key.
    pub fn name(&self) -> &str {
        let key = self.key();
        key.rsplit_once('/').map_or(key, |(_, name)| name)
    }

    pub fn is_dir(&self) -> bool {
        matches!(self, DirEntry::Dir { .. })
    }
}

/// Object store abstraction for a tree of directories and immutable objects.
///
/// Keys are `/`-separated relative paths. The empty key names the root.
#[async_trait]
pub trait ObjectStore: Send + Sync + 'static {
    /// Get an object's size and modification time without fetching content.
    ///
    /// Returns [`StorageError::NotFound`](crate::StorageError::NotFound) when the
    /// key does not name an object.
    async fn head(&self, key: &str) -> StorageResult<ObjectMeta>;

    /// Open an object as a byte stream, optionally restricted to `range`.
    ///
    /// The range must already be clamped to the object size.
    async fn get_stream(&self, key: &str, range: Option<ReadRange>) -> StorageResult<ByteStream>;

    /// Create a new object from a stream, stamped with `modified`.
    ///
    /// Creation is exclusive: if an object already exists at `key`, this fails
    /// with [`StorageError::AlreadyExists`](crate::StorageError::AlreadyExists)
    /// and the existing object is left untouched. Missing parent directories
    /// are created. A failed or interrupted upload leaves nothing behind.
    async fn create_from_stream(
        &self,
        key: &str,
        body: ByteStream,
        modified: OffsetDateTime,
    ) -> StorageResult<ObjectMeta>;

    /// Delete an object.
    async fn delete(&self, key: &str) -> StorageResult<()>;

    /// Create a directory (and its parents). Succeeds if it already exists.
    async fn mkdir(&self, key: &str) -> StorageResult<()>;

    /// List the direct children of a directory, sorted by key.
    ///
    /// Returns [`StorageError::NotFound`](crate::StorageError::NotFound) when the
    /// directory does not exist. Backends without real directories return an
    /// empty listing instead.
    async fn list_dir(&self, key: &str) -> StorageResult<Vec<DirEntry>>;

    /// Get the name of this storage backend.
    ///
    /// Returns a static string identifier for the backend type (e.g., "s3", "filesystem").
    /// Used for logging.
    fn backend_name(&self) -> &'static str;

    /// Verify storage backend connectivity.
    ///
    /// Called during server startup to ensure the storage is available before
    /// accepting requests. The default implementation returns Ok(()).
    async fn health_check(&self) -> StorageResult<()> {
        Ok(())
    }
}

/// Metadata about a stored object.
#[derive(Clone, Debug)]
pub struct ObjectMeta {
    /// Object size in bytes.
    pub size: u64,
    /// Last modification time (if available).
    pub last_modified: Option<OffsetDateTime>,
}

/// Collect a byte stream into a single buffer.
pub async fn collect_stream(mut stream: ByteStream) -> StorageResult<Bytes> {
    use futures::StreamExt;

    let mut buf = Vec::new();
    while let Some(chunk) = stream.next().await {
        buf.extend_from_slice(&chunk?);
    }
    Ok(Bytes::from(buf))
}

/// Wrap an in-memory buffer as a single-chunk byte stream.
pub fn stream_from_bytes(data: impl Into<Bytes>) -> ByteStream {
    let data = data.into();
    Box::pin(futures::stream::once(async move { Ok(data) }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dir_entry_name_is_last_segment() {
        let entry = DirEntry::Object {
            key: "repo/data/ab/abcdef".to_string(),
            size: 3,
        };
        assert_eq!(entry.name(), "abcdef");
        assert!(!entry.is_dir());

        let entry = DirEntry::Dir {
            key: "top".to_string(),
        };
        assert_eq!(entry.name(), "top");
        assert!(entry.is_dir());
    }

    #[test]
    fn read_range_len() {
        assert_eq!(ReadRange { offset: 10, end: 20 }.len(), 10);
        assert!(ReadRange { offset: 5, end: 5 }.is_empty());
    }

    #[tokio::test]
    async fn collect_roundtrips_single_chunk() {
        let data = collect_stream(stream_from_bytes("hello")).await.unwrap();
        assert_eq!(data, Bytes::from_static(b"hello"));
    }
}
