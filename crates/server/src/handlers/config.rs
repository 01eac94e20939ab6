//! Config object handlers: `/config` and `/{repo}/config`.

use super::transfer;
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use axum::body::Body;
use axum::http::HeaderValue;
use axum::response::Response;
use restash_core::Repo;

/// Type label used for config operations in metrics.
const CONFIG_LABEL: &str = "config";

/// HEAD /config
pub async fn check_config(state: &AppState, repo: &Repo) -> ApiResult<Response> {
    if state.debug() {
        tracing::debug!(repo = %repo, "Checking config");
    }
    transfer::check(state, &repo.config_key()).await
}

/// GET /config
pub async fn get_config(
    state: &AppState,
    repo: &Repo,
    user: &str,
    range: Option<HeaderValue>,
) -> ApiResult<Response> {
    if state.debug() {
        tracing::debug!(repo = %repo, "Getting config");
    }
    let labels = state.blob_labels(user, repo, CONFIG_LABEL);
    transfer::read(state, &repo.config_key(), range, labels).await
}

/// POST|PUT /config
pub async fn save_config(
    state: &AppState,
    repo: &Repo,
    user: &str,
    body: Body,
) -> ApiResult<Response> {
    if state.debug() {
        tracing::debug!(repo = %repo, "Saving config");
    }
    let labels = state.blob_labels(user, repo, CONFIG_LABEL);
    transfer::save(state, &repo.config_key(), body, labels).await
}

/// DELETE /config. Refused outright in append-only mode.
pub async fn delete_config(state: &AppState, repo: &Repo, user: &str) -> ApiResult<Response> {
    if state.debug() {
        tracing::debug!(repo = %repo, "Deleting config");
    }
    if state.append_only() {
        return Err(ApiError::Forbidden(
            "config cannot be deleted in append-only mode".to_string(),
        ));
    }
    let labels = state.blob_labels(user, repo, CONFIG_LABEL);
    transfer::remove(state, &repo.config_key(), labels).await
}
