//! Blob listing: `GET /{type}/` and `GET /{repo}/{type}/`.

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use axum::http::header::CONTENT_TYPE;
use axum::response::{IntoResponse, Response};
use restash_core::{BlobType, LIST_V2_MEDIA_TYPE, Repo};
use restash_storage::DirEntry;
use serde::{Deserialize, Serialize};

/// One element of a v2 listing.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlobEntry {
    pub name: String,
    pub size: u64,
}

/// Convert directory entries into listing elements, keeping backend order.
/// Directories are dropped.
pub fn blob_entries(entries: impl IntoIterator<Item = DirEntry>) -> Vec<BlobEntry> {
    entries
        .into_iter()
        .filter_map(|entry| match &entry {
            DirEntry::Object { size, .. } => Some(BlobEntry {
                name: entry.name().to_string(),
                size: *size,
            }),
            DirEntry::Dir { .. } => None,
        })
        .collect()
}

/// GET /{type}/
///
/// The sharded type is flattened: each shard directory is listed in turn and
/// the blobs concatenated.
pub async fn list_blobs(state: &AppState, repo: &Repo, blob_type: &str) -> ApiResult<Response> {
    if state.debug() {
        tracing::debug!(repo = %repo, blob_type, "Listing blobs");
    }
    let key = repo.resolve_type(blob_type)?;
    let sharded = BlobType::parse(blob_type)?.is_sharded();

    let entries = state.storage.list_dir(&key).await?;
    let blobs = if sharded {
        let mut blobs = Vec::new();
        for shard in entries.iter().filter(|e| e.is_dir()) {
            let shard_entries = state.storage.list_dir(shard.key()).await?;
            blobs.extend(blob_entries(shard_entries));
        }
        blobs
    } else {
        blob_entries(entries)
    };

    let body = serde_json::to_vec(&blobs)
        .map_err(|e| ApiError::Internal(format!("failed to encode listing: {e}")))?;
    Ok(([(CONTENT_TYPE, LIST_V2_MEDIA_TYPE)], body).into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entries_keep_order_and_drop_dirs() {
        let entries = vec![
            DirEntry::Object {
                key: "r/keys/b".to_string(),
                size: 2,
            },
            DirEntry::Dir {
                key: "r/keys/sub".to_string(),
            },
            DirEntry::Object {
                key: "r/keys/a".to_string(),
                size: 1,
            },
        ];
        let blobs = blob_entries(entries);
        assert_eq!(
            blobs,
            vec![
                BlobEntry {
                    name: "b".to_string(),
                    size: 2
                },
                BlobEntry {
                    name: "a".to_string(),
                    size: 1
                },
            ]
        );
    }

    #[test]
    fn listing_json_shape() {
        let blobs = vec![BlobEntry {
            name: "abc".to_string(),
            size: 7,
        }];
        assert_eq!(
            serde_json::to_string(&blobs).unwrap(),
            r#"[{"name":"abc","size":7}]"#
        );
        assert_eq!(serde_json::to_string(&Vec::<BlobEntry>::new()).unwrap(), "[]");
    }
}
