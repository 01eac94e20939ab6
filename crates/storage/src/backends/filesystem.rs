//! Local filesystem storage backend.

use crate::error::{StorageError, StorageResult};
use crate::traits::{ByteStream, DirEntry, ObjectMeta, ObjectStore, ReadRange};
use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use time::OffsetDateTime;
use tokio::fs;
use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt};
use tracing::instrument;
use uuid::Uuid;

/// Default chunk size for streaming reads (64 KiB).
const STREAM_CHUNK_SIZE: usize = 64 * 1024;

/// Prefix of in-flight upload files. Entries with it are hidden from listings.
const TEMP_PREFIX: &str = ".tmp.";

/// Local filesystem object store.
pub struct FilesystemBackend {
    root: PathBuf,
}

impl FilesystemBackend {
    /// Create a new filesystem backend, creating the root if needed.
    pub async fn new(root: impl AsRef<Path>) -> StorageResult<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root).await?;
        Ok(Self { root })
    }

    /// The storage root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Get the full path for a key, with path traversal protection.
    ///
    /// Runs the validation on the blocking pool since it stats and
    /// canonicalizes paths.
    async fn key_path(&self, key: &str) -> StorageResult<PathBuf> {
        let root = self.root.clone();
        let key = key.to_string();
        tokio::task::spawn_blocking(move || key_path_sync(&root, &key))
            .await
            .map_err(|e| {
                StorageError::Io(std::io::Error::other(format!("spawn_blocking failed: {e}")))
            })?
    }
}

/// Resolve `key` below `root`, rejecting anything that could escape it.
///
/// Symlinks are followed only to check that their target stays inside the
/// root. For keys that do not exist yet, the nearest existing ancestor is
/// checked instead so that directories are never created through a symlink.
fn key_path_sync(root: &Path, key: &str) -> StorageResult<PathBuf> {
    if key.contains("..") || key.starts_with('/') || key.starts_with('\\') {
        return Err(StorageError::InvalidKey(format!(
            "path traversal not allowed: {key}"
        )));
    }

    if Path::new(key)
        .components()
        .any(|c| !matches!(c, std::path::Component::Normal(_)))
    {
        return Err(StorageError::InvalidKey(format!(
            "contains unsafe path component: {key}"
        )));
    }

    let path = root.join(key);
    let root_canonical = root.canonicalize().map_err(|e| {
        StorageError::Io(std::io::Error::new(
            e.kind(),
            format!("failed to canonicalize root: {e}"),
        ))
    })?;

    let mut candidate = Some(path.as_path());
    while let Some(current) = candidate {
        match std::fs::symlink_metadata(current) {
            Ok(meta) => {
                let canonical = current.canonicalize().map_err(|e| {
                    if meta.file_type().is_symlink() {
                        StorageError::InvalidKey(format!("symlink target missing or invalid: {key}"))
                    } else {
                        StorageError::Io(std::io::Error::new(
                            e.kind(),
                            format!("failed to canonicalize path: {e}"),
                        ))
                    }
                })?;

                if !canonical.starts_with(&root_canonical) {
                    return Err(StorageError::InvalidKey(format!(
                        "resolved path escapes storage root: {key}"
                    )));
                }
                return Ok(path);
            }
            Err(err) if is_missing(&err) => {
                candidate = current.parent();
            }
            Err(err) => {
                return Err(StorageError::Io(std::io::Error::new(
                    err.kind(),
                    format!("failed to stat path: {err}"),
                )));
            }
        }
    }

    Ok(path)
}

/// A path is missing if it, or one of its ancestors, does not exist as a
/// directory. Listing an object key fails with `NotADirectory`.
fn is_missing(err: &std::io::Error) -> bool {
    matches!(err.kind(), ErrorKind::NotFound | ErrorKind::NotADirectory)
}

fn map_not_found(err: std::io::Error, key: &str) -> StorageError {
    if is_missing(&err) {
        StorageError::NotFound(key.to_string())
    } else {
        StorageError::Io(err)
    }
}

/// Join a directory key and an entry name.
fn child_key(dir: &str, name: &str) -> String {
    let dir = dir.trim_matches('/');
    if dir.is_empty() {
        name.to_string()
    } else {
        format!("{dir}/{name}")
    }
}

fn meta_from_fs(metadata: &std::fs::Metadata) -> ObjectMeta {
    ObjectMeta {
        size: metadata.len(),
        last_modified: metadata.modified().ok().map(OffsetDateTime::from),
    }
}

#[async_trait]
impl ObjectStore for FilesystemBackend {
    #[instrument(skip(self), fields(backend = "filesystem"))]
    async fn head(&self, key: &str) -> StorageResult<ObjectMeta> {
        let path = self.key_path(key).await?;
        let metadata = fs::metadata(&path)
            .await
            .map_err(|e| map_not_found(e, key))?;

        if !metadata.is_file() {
            return Err(StorageError::NotFound(key.to_string()));
        }

        Ok(meta_from_fs(&metadata))
    }

    #[instrument(skip(self), fields(backend = "filesystem"))]
    async fn get_stream(&self, key: &str, range: Option<ReadRange>) -> StorageResult<ByteStream> {
        let path = self.key_path(key).await?;
        let mut file = fs::File::open(&path)
            .await
            .map_err(|e| map_not_found(e, key))?;

        if !file.metadata().await?.is_file() {
            return Err(StorageError::NotFound(key.to_string()));
        }

        let limit = match range {
            Some(range) => {
                file.seek(std::io::SeekFrom::Start(range.offset)).await?;
                range.len()
            }
            None => u64::MAX,
        };

        // Stream the file in chunks instead of loading it into memory
        let stream = async_stream::try_stream! {
            let mut reader = file.take(limit);
            let mut buf = vec![0u8; STREAM_CHUNK_SIZE];
            loop {
                let n = reader.read(&mut buf).await?;
                if n == 0 {
                    break;
                }
                yield Bytes::copy_from_slice(&buf[..n]);
            }
        };

        Ok(Box::pin(stream))
    }

    #[instrument(skip(self, body), fields(backend = "filesystem"))]
    async fn create_from_stream(
        &self,
        key: &str,
        mut body: ByteStream,
        modified: OffsetDateTime,
    ) -> StorageResult<ObjectMeta> {
        let path = self.key_path(key).await?;
        let parent = path
            .parent()
            .ok_or_else(|| StorageError::InvalidKey(format!("key has no parent: {key}")))?;
        fs::create_dir_all(parent).await?;

        if fs::try_exists(&path).await? {
            return Err(StorageError::AlreadyExists(key.to_string()));
        }

        // Write to a uniquely named temp file next to the target, fsync, then
        // hard-link it into place. Linking fails if the target appeared in the
        // meantime, so concurrent creates of one key cannot clobber each other.
        let temp_path = parent.join(format!("{TEMP_PREFIX}{}", Uuid::new_v4()));
        let written = async {
            let mut file = fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&temp_path)
                .await?;
            let mut size = 0u64;
            while let Some(chunk) = body.next().await {
                let chunk = chunk?;
                file.write_all(&chunk).await?;
                size += chunk.len() as u64;
            }
            file.sync_all().await?;

            let file = file.into_std().await;
            let stamp = SystemTime::from(modified);
            tokio::task::spawn_blocking(move || file.set_modified(stamp))
                .await
                .map_err(|e| std::io::Error::other(format!("spawn_blocking failed: {e}")))??;

            Ok::<u64, StorageError>(size)
        }
        .await;

        let linked = match written {
            Ok(size) => fs::hard_link(&temp_path, &path).await.map(|()| size),
            Err(err) => {
                let _ = fs::remove_file(&temp_path).await;
                return Err(err);
            }
        };

        if let Err(err) = fs::remove_file(&temp_path).await {
            tracing::warn!(path = %temp_path.display(), error = %err, "Failed to remove temp file");
        }

        match linked {
            Ok(size) => Ok(ObjectMeta {
                size,
                last_modified: Some(modified),
            }),
            Err(err) if err.kind() == ErrorKind::AlreadyExists => {
                Err(StorageError::AlreadyExists(key.to_string()))
            }
            Err(err) => Err(StorageError::Io(err)),
        }
    }

    #[instrument(skip(self), fields(backend = "filesystem"))]
    async fn delete(&self, key: &str) -> StorageResult<()> {
        let path = self.key_path(key).await?;
        fs::remove_file(&path)
            .await
            .map_err(|e| map_not_found(e, key))
    }

    #[instrument(skip(self), fields(backend = "filesystem"))]
    async fn mkdir(&self, key: &str) -> StorageResult<()> {
        let path = self.key_path(key).await?;
        fs::create_dir_all(&path).await?;
        Ok(())
    }

    #[instrument(skip(self), fields(backend = "filesystem"))]
    async fn list_dir(&self, key: &str) -> StorageResult<Vec<DirEntry>> {
        let path = self.key_path(key).await?;
        let mut entries = fs::read_dir(&path)
            .await
            .map_err(|e| map_not_found(e, key))?;

        let mut results = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name().to_string_lossy().to_string();
            if name.starts_with(TEMP_PREFIX) {
                continue;
            }

            // file_type() does not follow symlinks; those are skipped entirely
            let file_type = entry.file_type().await?;
            if file_type.is_dir() {
                results.push(DirEntry::Dir {
                    key: child_key(key, &name),
                });
            } else if file_type.is_file() {
                let size = entry.metadata().await?.len();
                results.push(DirEntry::Object {
                    key: child_key(key, &name),
                    size,
                });
            }
        }

        results.sort_by(|a, b| a.key().cmp(b.key()));
        Ok(results)
    }

    fn backend_name(&self) -> &'static str {
        "filesystem"
    }

    #[instrument(skip(self), fields(backend = "filesystem"))]
    async fn health_check(&self) -> StorageResult<()> {
        let metadata = fs::metadata(&self.root).await.map_err(|e| {
            StorageError::Io(std::io::Error::new(
                e.kind(),
                format!("storage root not accessible: {e}"),
            ))
        })?;

        if !metadata.is_dir() {
            return Err(StorageError::Io(std::io::Error::new(
                ErrorKind::NotADirectory,
                format!("storage root is not a directory: {:?}", self.root),
            )));
        }

        Ok(())
    }
}
