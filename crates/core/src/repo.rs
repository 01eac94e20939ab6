//! Repository namespaces and storage key resolution.
//!
//! A repository is nothing more than a key prefix. Every object in it lives at
//! `<repo>/<type>/<name>`, except blobs of the sharded type, which are placed
//! one level deeper under the first two characters of their name
//! (`<repo>/data/<name[0:2]>/<name>`), and the config object at `<repo>/config`.

use crate::blob::BlobType;
use std::fmt;

/// Key segment used for the root namespace.
pub const ROOT_REPO: &str = ".";

/// A repository namespace, identified purely by its path segment.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Repo(Option<String>);

impl Repo {
    /// The root namespace (no repository segment in the request path).
    pub fn root() -> Self {
        Self(None)
    }

    /// A named repository. Empty and `.` segments map to the root namespace.
    pub fn named(segment: impl Into<String>) -> Self {
        let segment = segment.into();
        if segment.is_empty() || segment == ROOT_REPO {
            Self(None)
        } else {
            Self(Some(segment))
        }
    }

    /// Whether this is the root namespace.
    pub fn is_root(&self) -> bool {
        self.0.is_none()
    }

    /// The repository label used in logs and metrics (`.` for root).
    pub fn label(&self) -> &str {
        self.0.as_deref().unwrap_or(ROOT_REPO)
    }

    /// Storage key of the repository directory itself.
    pub fn dir_key(&self) -> String {
        join_key(&[self.label()])
    }

    /// Resolve the directory holding all blobs of `blob_type`.
    pub fn resolve_type(&self, blob_type: &str) -> crate::Result<String> {
        let blob_type = BlobType::parse(blob_type)?;
        Ok(self.type_key(blob_type))
    }

    /// Resolve the storage key of a single blob.
    ///
    /// Fails with [`crate::Error::InvalidType`] for unknown types and with
    /// [`crate::Error::NameTooShort`] when the type is sharded and the name has
    /// fewer than two characters.
    pub fn resolve_blob(&self, blob_type: &str, name: &str) -> crate::Result<String> {
        let blob_type = BlobType::parse(blob_type)?;

        if blob_type.is_sharded() {
            let shard = shard_of(name).ok_or_else(|| crate::Error::NameTooShort {
                blob_type: blob_type.to_string(),
                name: name.to_string(),
            })?;
            return Ok(join_key(&[self.label(), blob_type.as_str(), shard, name]));
        }

        Ok(join_key(&[self.label(), blob_type.as_str(), name]))
    }

    /// Storage key of the config object.
    pub fn config_key(&self) -> String {
        self.type_key(BlobType::Config)
    }

    /// Storage key of the directory for a known blob type.
    pub fn type_key(&self, blob_type: BlobType) -> String {
        join_key(&[self.label(), blob_type.as_str()])
    }

    /// Storage key of one shard directory of the sharded type.
    pub fn shard_key(&self, shard: &str) -> String {
        join_key(&[self.label(), BlobType::Data.as_str(), shard])
    }
}

impl fmt::Display for Repo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// The shard directory for a blob name: its first two characters.
fn shard_of(name: &str) -> Option<&str> {
    let (end, _) = name.char_indices().nth(BlobType::SHARD_PREFIX_LEN - 1)?;
    let end = end + name[end..].chars().next()?.len_utf8();
    Some(&name[..end])
}

/// Join key segments with `/`, dropping empty and `.` segments.
///
/// The root namespace therefore resolves to bare keys (`config`,
/// `data/ab/ab12...`) and the root directory itself to the empty key.
fn join_key(segments: &[&str]) -> String {
    segments
        .iter()
        .flat_map(|s| s.split('/'))
        .filter(|s| !s.is_empty() && *s != ROOT_REPO)
        .collect::<Vec<_>>()
        .join("/")
}
