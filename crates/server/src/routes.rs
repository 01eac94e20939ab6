//! Route configuration.
//!
//! The REST protocol reuses the same path shapes with and without a leading
//! repository segment (`/data/` and `/myrepo/`), which a prefix router cannot
//! tell apart. Requests are therefore matched against a static table by
//! [`resolve`] from a single fallback handler.

use crate::auth::{AuthUser, auth_middleware};
use crate::handlers;
use crate::metrics::metrics_handler;
use crate::state::AppState;
use axum::Router;
use axum::extract::{Request, State};
use axum::middleware;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use percent_encoding::percent_decode_str;
use restash_core::Repo;
use tower_http::trace::TraceLayer;

/// Operation selected by a request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Endpoint {
    CheckConfig,
    GetConfig,
    SaveConfig,
    DeleteConfig,
    CheckBlob,
    GetBlob,
    SaveBlob,
    DeleteBlob,
    ListBlobs,
    CreateRepo,
}

#[derive(Clone, Copy, Debug)]
enum Segment {
    /// Matches exactly this text. `""` matches a trailing slash.
    Literal(&'static str),
    Repo,
    Type,
    Name,
}

use Segment::{Literal, Name, Repo as RepoSeg, Type};

struct Route {
    method: &'static str,
    pattern: &'static [Segment],
    endpoint: Endpoint,
}

const fn route(method: &'static str, pattern: &'static [Segment], endpoint: Endpoint) -> Route {
    Route {
        method,
        pattern,
        endpoint,
    }
}

const CONFIG: &[Segment] = &[Literal("config")];
const BLOB: &[Segment] = &[Type, Name];
const TYPE_DIR: &[Segment] = &[Type, Literal("")];
const ROOT: &[Segment] = &[Literal("")];
const REPO_CONFIG: &[Segment] = &[RepoSeg, Literal("config")];
const REPO_BLOB: &[Segment] = &[RepoSeg, Type, Name];
const REPO_TYPE_DIR: &[Segment] = &[RepoSeg, Type, Literal("")];
const REPO_ROOT: &[Segment] = &[RepoSeg, Literal("")];

/// Root-namespace routes come first so they win ties.
static ROUTES: &[Route] = &[
    route("HEAD", CONFIG, Endpoint::CheckConfig),
    route("GET", CONFIG, Endpoint::GetConfig),
    route("POST", CONFIG, Endpoint::SaveConfig),
    route("PUT", CONFIG, Endpoint::SaveConfig),
    route("DELETE", CONFIG, Endpoint::DeleteConfig),
    route("HEAD", BLOB, Endpoint::CheckBlob),
    route("GET", BLOB, Endpoint::GetBlob),
    route("POST", BLOB, Endpoint::SaveBlob),
    route("PUT", BLOB, Endpoint::SaveBlob),
    route("DELETE", BLOB, Endpoint::DeleteBlob),
    route("GET", TYPE_DIR, Endpoint::ListBlobs),
    route("POST", ROOT, Endpoint::CreateRepo),
    route("HEAD", REPO_CONFIG, Endpoint::CheckConfig),
    route("GET", REPO_CONFIG, Endpoint::GetConfig),
    route("POST", REPO_CONFIG, Endpoint::SaveConfig),
    route("PUT", REPO_CONFIG, Endpoint::SaveConfig),
    route("DELETE", REPO_CONFIG, Endpoint::DeleteConfig),
    route("HEAD", REPO_BLOB, Endpoint::CheckBlob),
    route("GET", REPO_BLOB, Endpoint::GetBlob),
    route("POST", REPO_BLOB, Endpoint::SaveBlob),
    route("PUT", REPO_BLOB, Endpoint::SaveBlob),
    route("DELETE", REPO_BLOB, Endpoint::DeleteBlob),
    route("GET", REPO_TYPE_DIR, Endpoint::ListBlobs),
    route("POST", REPO_ROOT, Endpoint::CreateRepo),
];

/// Parameters extracted from a matched path.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RouteMatch {
    pub endpoint: Endpoint,
    pub repo: Repo,
    pub blob_type: Option<String>,
    pub name: Option<String>,
}

/// Outcome of matching a request against the table.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Resolution {
    Matched(RouteMatch),
    MethodNotAllowed,
    NotFound,
}

/// Match a method and raw (still percent-encoded) path against the table.
pub fn resolve(method: &str, path: &str) -> Resolution {
    let Some(path) = path.strip_prefix('/') else {
        return Resolution::NotFound;
    };
    let segments: Vec<String> = path
        .split('/')
        .map(|s| percent_decode_str(s).decode_utf8_lossy().into_owned())
        .collect();

    let mut path_matched = false;
    let mut best: Option<(usize, &Route)> = None;

    for route in ROUTES {
        if !pattern_matches(route.pattern, &segments) {
            continue;
        }
        path_matched = true;
        if route.method != method {
            continue;
        }
        let literals = literal_count(route.pattern);
        if best.is_none_or(|(n, _)| literals > n) {
            best = Some((literals, route));
        }
    }

    match best {
        Some((_, route)) => Resolution::Matched(extract(route, segments)),
        None if path_matched => Resolution::MethodNotAllowed,
        None => Resolution::NotFound,
    }
}

fn pattern_matches(pattern: &[Segment], segments: &[String]) -> bool {
    pattern.len() == segments.len()
        && pattern.iter().zip(segments).all(|(p, s)| match p {
            Literal(lit) => s == lit,
            RepoSeg | Type | Name => !s.is_empty(),
        })
}

fn literal_count(pattern: &[Segment]) -> usize {
    pattern
        .iter()
        .filter(|p| matches!(p, Literal(_)))
        .count()
}

fn extract(route: &Route, segments: Vec<String>) -> RouteMatch {
    let mut matched = RouteMatch {
        endpoint: route.endpoint,
        repo: Repo::root(),
        blob_type: None,
        name: None,
    };
    for (pattern, segment) in route.pattern.iter().zip(segments) {
        match pattern {
            Literal(_) => {}
            RepoSeg => matched.repo = Repo::named(segment),
            Type => matched.blob_type = Some(segment),
            Name => matched.name = Some(segment),
        }
    }
    matched
}

/// Fallback handler: resolve the request and dispatch it.
async fn dispatch(State(state): State<AppState>, req: Request) -> Response {
    let route = match resolve(req.method().as_str(), req.uri().path()) {
        Resolution::Matched(route) => route,
        Resolution::MethodNotAllowed => {
            return crate::error::ApiError::MethodNotAllowed(req.method().to_string())
                .into_response();
        }
        Resolution::NotFound => {
            return crate::error::ApiError::NotFound(req.uri().path().to_string())
                .into_response();
        }
    };

    let user = req
        .extensions()
        .get::<AuthUser>()
        .cloned()
        .unwrap_or_default();
    let endpoint = route.endpoint;

    match handlers::handle(&state, route, user, req).await {
        Ok(response) => response,
        Err(e) => {
            if state.debug() {
                tracing::debug!(endpoint = ?endpoint, error = %e, "Request failed");
            }
            e.into_response()
        }
    }
}

/// Create the application router.
pub fn create_router(state: AppState) -> Router {
    let mut router = Router::new();

    // Conditionally add metrics endpoint based on config.
    // SECURITY: without auth this endpoint is open to anyone who can reach
    // the listener. See crate::metrics module documentation for details.
    if state.config.server.metrics_enabled {
        router = router.route("/metrics", get(metrics_handler));
    }

    router
        .fallback(dispatch)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matched(method: &str, path: &str) -> RouteMatch {
        match resolve(method, path) {
            Resolution::Matched(m) => m,
            other => panic!("{method} {path}: expected match, got {other:?}"),
        }
    }

    #[test]
    fn root_config() {
        let m = matched("GET", "/config");
        assert_eq!(m.endpoint, Endpoint::GetConfig);
        assert!(m.repo.is_root());
        assert_eq!(matched("HEAD", "/config").endpoint, Endpoint::CheckConfig);
        assert_eq!(matched("PUT", "/config").endpoint, Endpoint::SaveConfig);
        assert_eq!(matched("POST", "/config").endpoint, Endpoint::SaveConfig);
        assert_eq!(
            matched("DELETE", "/config").endpoint,
            Endpoint::DeleteConfig
        );
    }

    #[test]
    fn repo_config_beats_root_blob() {
        let m = matched("GET", "/photos/config");
        assert_eq!(m.endpoint, Endpoint::GetConfig);
        assert_eq!(m.repo, Repo::named("photos"));
        assert_eq!(m.blob_type, None);
    }

    #[test]
    fn blobs_with_and_without_repo() {
        let m = matched("GET", "/data/abcdef");
        assert_eq!(m.endpoint, Endpoint::GetBlob);
        assert!(m.repo.is_root());
        assert_eq!(m.blob_type.as_deref(), Some("data"));
        assert_eq!(m.name.as_deref(), Some("abcdef"));

        let m = matched("DELETE", "/photos/locks/l1");
        assert_eq!(m.endpoint, Endpoint::DeleteBlob);
        assert_eq!(m.repo, Repo::named("photos"));
        assert_eq!(m.blob_type.as_deref(), Some("locks"));
        assert_eq!(m.name.as_deref(), Some("l1"));
    }

    #[test]
    fn trailing_slash_lists_or_creates_by_method() {
        let m = matched("GET", "/keys/");
        assert_eq!(m.endpoint, Endpoint::ListBlobs);
        assert!(m.repo.is_root());
        assert_eq!(m.blob_type.as_deref(), Some("keys"));

        let m = matched("POST", "/keys/");
        assert_eq!(m.endpoint, Endpoint::CreateRepo);
        assert_eq!(m.repo, Repo::named("keys"));

        let m = matched("GET", "/photos/data/");
        assert_eq!(m.endpoint, Endpoint::ListBlobs);
        assert_eq!(m.repo, Repo::named("photos"));

        assert_eq!(matched("POST", "/").endpoint, Endpoint::CreateRepo);
    }

    #[test]
    fn segments_are_percent_decoded() {
        let m = matched("GET", "/my%20repo/snapshots/s%2B1");
        assert_eq!(m.repo, Repo::named("my repo"));
        assert_eq!(m.name.as_deref(), Some("s+1"));
    }

    #[test]
    fn method_not_allowed_and_not_found() {
        assert_eq!(resolve("GET", "/"), Resolution::MethodNotAllowed);
        assert_eq!(resolve("PATCH", "/config"), Resolution::MethodNotAllowed);
        assert_eq!(resolve("DELETE", "/data/"), Resolution::MethodNotAllowed);
        assert_eq!(resolve("GET", "/a/b/c/d"), Resolution::NotFound);
        assert_eq!(resolve("GET", "/data//"), Resolution::NotFound);
        assert_eq!(resolve("GET", "//x"), Resolution::NotFound);
    }
}
