//! HTTP request handlers.

pub mod blobs;
pub mod config;
pub mod list;
pub mod repo;
pub mod transfer;

pub use blobs::BlobRef;
pub use list::BlobEntry;

use crate::auth::AuthUser;
use crate::error::ApiResult;
use crate::routes::{Endpoint, RouteMatch};
use crate::state::AppState;
use axum::extract::Request;
use axum::http::header::RANGE;
use axum::response::Response;

/// Run the handler for a resolved route.
pub async fn handle(
    state: &AppState,
    route: RouteMatch,
    user: AuthUser,
    req: Request,
) -> ApiResult<Response> {
    let RouteMatch {
        endpoint,
        repo,
        blob_type,
        name,
    } = route;
    let blob_type = blob_type.unwrap_or_default();
    let name = name.unwrap_or_default();
    let blob = BlobRef {
        repo: &repo,
        blob_type: &blob_type,
        name: &name,
    };
    let user = user.as_str();
    let range = req.headers().get(RANGE).cloned();

    match endpoint {
        Endpoint::CheckConfig => config::check_config(state, &repo).await,
        Endpoint::GetConfig => config::get_config(state, &repo, user, range).await,
        Endpoint::SaveConfig => config::save_config(state, &repo, user, req.into_body()).await,
        Endpoint::DeleteConfig => config::delete_config(state, &repo, user).await,
        Endpoint::CheckBlob => blobs::check_blob(state, blob).await,
        Endpoint::GetBlob => blobs::get_blob(state, blob, user, range).await,
        Endpoint::SaveBlob => blobs::save_blob(state, blob, user, req.into_body()).await,
        Endpoint::DeleteBlob => blobs::delete_blob(state, blob, user).await,
        Endpoint::ListBlobs => list::list_blobs(state, &repo, &blob_type).await,
        Endpoint::CreateRepo => repo::create_repo(state, &repo, req.uri()).await,
    }
}
