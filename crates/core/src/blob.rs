//! Blob types stored in a repository.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The fixed set of blob types a repository holds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlobType {
    /// Pack files. The only sharded type.
    Data,
    Index,
    Keys,
    /// Lock files. Deletable even in append-only mode.
    Locks,
    Snapshots,
    /// The repository configuration object.
    Config,
}

impl BlobType {
    /// Every blob type, in directory creation order.
    pub const ALL: [BlobType; 6] = [
        Self::Data,
        Self::Index,
        Self::Keys,
        Self::Locks,
        Self::Snapshots,
        Self::Config,
    ];

    /// Number of leading name characters used as the shard directory.
    pub const SHARD_PREFIX_LEN: usize = 2;

    /// Parse from string.
    pub fn parse(s: &str) -> crate::Result<Self> {
        match s {
            "data" => Ok(Self::Data),
            "index" => Ok(Self::Index),
            "keys" => Ok(Self::Keys),
            "locks" => Ok(Self::Locks),
            "snapshots" => Ok(Self::Snapshots),
            "config" => Ok(Self::Config),
            _ => Err(crate::Error::InvalidType(s.to_string())),
        }
    }

    /// Get the string representation (also the directory name).
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Data => "data",
            Self::Index => "index",
            Self::Keys => "keys",
            Self::Locks => "locks",
            Self::Snapshots => "snapshots",
            Self::Config => "config",
        }
    }

    /// Whether blobs of this type live in two-character shard directories.
    pub fn is_sharded(&self) -> bool {
        matches!(self, Self::Data)
    }

    /// Whether blobs of this type may be deleted in append-only mode.
    pub fn deletable_when_append_only(&self) -> bool {
        matches!(self, Self::Locks)
    }

    /// Whether the type gets its own directory on repository creation.
    pub fn has_directory(&self) -> bool {
        !matches!(self, Self::Config)
    }
}

impl fmt::Display for BlobType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for BlobType {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// The 256 shard directory names (`00` through `ff`).
pub fn shard_names() -> impl Iterator<Item = String> {
    (0..=u8::MAX).map(|i| format!("{i:02x}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_accepts_every_known_type() {
        for blob_type in BlobType::ALL {
            assert_eq!(BlobType::parse(blob_type.as_str()).unwrap(), blob_type);
        }
    }

    #[test]
    fn parse_rejects_unknown_types() {
        for bad in ["", "Data", "DATA", "lock", "snapshot", "data/", " data", "../data"] {
            assert_eq!(
                BlobType::parse(bad),
                Err(crate::Error::InvalidType(bad.to_string())),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn only_data_is_sharded() {
        let sharded: Vec<_> = BlobType::ALL.iter().filter(|t| t.is_sharded()).collect();
        assert_eq!(sharded, vec![&BlobType::Data]);
    }

    #[test]
    fn only_locks_survive_append_only() {
        assert!(BlobType::Locks.deletable_when_append_only());
        assert!(!BlobType::Config.deletable_when_append_only());
        assert!(!BlobType::Data.deletable_when_append_only());
    }

    #[test]
    fn shard_names_cover_full_byte_range() {
        let names: Vec<_> = shard_names().collect();
        assert_eq!(names.len(), 256);
        assert_eq!(names.first().map(String::as_str), Some("00"));
        assert_eq!(names.last().map(String::as_str), Some("ff"));
        assert!(names.iter().all(|n| n.len() == 2));
    }
}
