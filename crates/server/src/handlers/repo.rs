//! Repository creation: `POST /?create=true` and `POST /{repo}/?create=true`.

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use axum::extract::Query;
use axum::http::{StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use restash_core::{BlobType, Repo, shard_names};

/// First value of the `create` query parameter. Later repeats are ignored.
fn create_flag(uri: &Uri) -> Option<String> {
    let Query(pairs) = Query::<Vec<(String, String)>>::try_from_uri(uri).ok()?;
    pairs
        .into_iter()
        .find(|(key, _)| key == "create")
        .map(|(_, value)| value)
}

/// POST /?create=true
///
/// Creates the repository directory, one directory per blob type and the 256
/// shard directories of the sharded type. Directories are created one at a
/// time and a failure is not rolled back; repeating the call is safe.
pub async fn create_repo(state: &AppState, repo: &Repo, uri: &Uri) -> ApiResult<Response> {
    if state.debug() {
        tracing::debug!(repo = %repo, "Create repository request");
    }
    if create_flag(uri).as_deref() != Some("true") {
        return Err(ApiError::BadRequest(
            "repository creation requires create=true".to_string(),
        ));
    }

    tracing::info!(repo = %repo, "Creating repository directories");

    let mkdir = |key: String| async move {
        state.storage.mkdir(&key).await.map_err(|e| {
            tracing::error!(repo = %repo, key = %key, error = %e, "Failed to create directory");
            ApiError::Internal(format!("mkdir {key}: {e}"))
        })
    };

    mkdir(repo.dir_key()).await?;
    for blob_type in BlobType::ALL.into_iter().filter(|t| t.has_directory()) {
        mkdir(repo.type_key(blob_type)).await?;
    }
    for shard in shard_names() {
        mkdir(repo.shard_key(&shard)).await?;
    }

    Ok(StatusCode::OK.into_response())
}
