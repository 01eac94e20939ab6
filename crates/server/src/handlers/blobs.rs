//! Blob handlers: `/{type}/{name}` and `/{repo}/{type}/{name}`.

use super::transfer;
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use axum::body::Body;
use axum::http::HeaderValue;
use axum::response::Response;
use restash_core::{BlobType, Repo};

/// A blob addressed by a request.
#[derive(Clone, Debug)]
pub struct BlobRef<'a> {
    pub repo: &'a Repo,
    pub blob_type: &'a str,
    pub name: &'a str,
}

impl BlobRef<'_> {
    fn key(&self) -> ApiResult<String> {
        Ok(self.repo.resolve_blob(self.blob_type, self.name)?)
    }
}

/// HEAD /{type}/{name}
pub async fn check_blob(state: &AppState, blob: BlobRef<'_>) -> ApiResult<Response> {
    if state.debug() {
        tracing::debug!(repo = %blob.repo, blob_type = blob.blob_type, name = blob.name, "Checking blob");
    }
    let key = blob.key()?;
    transfer::check(state, &key).await
}

/// GET /{type}/{name}
pub async fn get_blob(
    state: &AppState,
    blob: BlobRef<'_>,
    user: &str,
    range: Option<HeaderValue>,
) -> ApiResult<Response> {
    if state.debug() {
        tracing::debug!(repo = %blob.repo, blob_type = blob.blob_type, name = blob.name, "Getting blob");
    }
    let key = blob.key()?;
    let labels = state.blob_labels(user, blob.repo, blob.blob_type);
    transfer::read(state, &key, range, labels).await
}

/// POST|PUT /{type}/{name}
pub async fn save_blob(
    state: &AppState,
    blob: BlobRef<'_>,
    user: &str,
    body: Body,
) -> ApiResult<Response> {
    if state.debug() {
        tracing::debug!(repo = %blob.repo, blob_type = blob.blob_type, name = blob.name, "Saving blob");
    }
    let key = blob.key()?;
    let labels = state.blob_labels(user, blob.repo, blob.blob_type);
    transfer::save(state, &key, body, labels).await
}

/// DELETE /{type}/{name}
///
/// In append-only mode only locks may be deleted. The policy is checked
/// before the path is resolved, so unknown types are refused too.
pub async fn delete_blob(state: &AppState, blob: BlobRef<'_>, user: &str) -> ApiResult<Response> {
    if state.debug() {
        tracing::debug!(repo = %blob.repo, blob_type = blob.blob_type, name = blob.name, "Deleting blob");
    }
    if state.append_only() {
        let deletable = BlobType::parse(blob.blob_type)
            .is_ok_and(|t| t.deletable_when_append_only());
        if !deletable {
            return Err(ApiError::Forbidden(format!(
                "{} cannot be deleted in append-only mode",
                blob.blob_type
            )));
        }
    }
    let key = blob.key()?;
    let labels = state.blob_labels(user, blob.repo, blob.blob_type);
    transfer::remove(state, &key, labels).await
}
