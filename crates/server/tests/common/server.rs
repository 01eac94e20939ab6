//! Server test utilities.

use axum::body::Body;
use axum::http::{HeaderMap, Request, StatusCode};
use bytes::Bytes;
use restash_core::config::AppConfig;
use restash_server::{AppState, CredentialStore, create_router};
use restash_storage::{FilesystemBackend, ObjectStore};
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

/// A test server wrapper with all dependencies.
/// Note: #[allow(dead_code)] because each test file compiles common/ separately.
#[allow(dead_code)]
pub struct TestServer {
    pub router: axum::Router,
    pub state: AppState,
    pub storage_path: PathBuf,
    _temp_dir: TempDir,
}

/// A fully buffered response.
#[allow(dead_code)]
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

#[allow(dead_code)]
impl TestResponse {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

#[allow(dead_code)]
impl TestServer {
    /// Create a new test server with temporary filesystem storage.
    pub async fn new() -> Self {
        Self::with_config(|_| {}).await
    }

    /// Create a test server after adjusting the default test configuration.
    pub async fn with_config(configure: impl FnOnce(&mut AppConfig)) -> Self {
        Self::build(configure, None).await
    }

    /// Create a test server that requires Basic authentication.
    pub async fn with_credentials(credentials: Arc<dyn CredentialStore>) -> Self {
        Self::build(|config| config.auth.enabled = true, Some(credentials)).await
    }

    async fn build(
        configure: impl FnOnce(&mut AppConfig),
        credentials: Option<Arc<dyn CredentialStore>>,
    ) -> Self {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp directory");

        let storage_path = temp_dir.path().join("storage");
        std::fs::create_dir_all(&storage_path).expect("Failed to create storage directory");
        let storage: Arc<dyn ObjectStore> = Arc::new(
            FilesystemBackend::new(&storage_path)
                .await
                .expect("Failed to create storage backend"),
        );

        let mut config = AppConfig::for_testing(&storage_path);
        configure(&mut config);
        if config.server.metrics_enabled {
            restash_server::metrics::register_metrics();
        }

        let state = AppState::new(config, storage, credentials);
        let router = create_router(state.clone());

        Self {
            router,
            state,
            storage_path,
            _temp_dir: temp_dir,
        }
    }

    /// Send a request and buffer the response.
    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        TestResponse {
            status,
            headers,
            body,
        }
    }

    /// Send a bodiless request.
    pub async fn call(&self, method: &str, uri: &str) -> TestResponse {
        self.send(super::fixtures::request(method, uri, Body::empty()))
            .await
    }

    /// Save `data` at `uri` with POST.
    pub async fn save(&self, uri: &str, data: impl Into<Body>) -> TestResponse {
        self.send(super::fixtures::request("POST", uri, data)).await
    }

    /// Create a repository (`repo` empty for the root namespace).
    pub async fn create_repo(&self, repo: &str) -> TestResponse {
        let uri = if repo.is_empty() {
            "/?create=true".to_string()
        } else {
            format!("/{repo}/?create=true")
        };
        self.call("POST", &uri).await
    }

    /// Path on disk for a storage key.
    pub fn disk_path(&self, key: &str) -> PathBuf {
        self.storage_path.join(key)
    }
}
