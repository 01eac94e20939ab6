//! Application state shared across handlers.

use crate::auth::CredentialStore;
use crate::metrics::BlobLabels;
use restash_core::Repo;
use restash_core::config::AppConfig;
use restash_storage::ObjectStore;
use std::sync::Arc;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration.
    pub config: Arc<AppConfig>,
    /// Object storage backend.
    pub storage: Arc<dyn ObjectStore>,
    /// Credential store, present only when authentication is enabled.
    pub credentials: Option<Arc<dyn CredentialStore>>,
}

impl AppState {
    /// Create a new application state.
    ///
    /// Logs a warning for settings that leave the server open.
    pub fn new(
        config: AppConfig,
        storage: Arc<dyn ObjectStore>,
        credentials: Option<Arc<dyn CredentialStore>>,
    ) -> Self {
        if config.auth.enabled && credentials.is_none() {
            tracing::warn!("auth.enabled is set but no credential store was provided");
        }
        if config.server.metrics_enabled && credentials.is_none() {
            tracing::warn!("/metrics is enabled without authentication");
        }

        Self {
            config: Arc::new(config),
            storage,
            credentials,
        }
    }

    /// Whether deletes other than lock removal are refused.
    pub fn append_only(&self) -> bool {
        self.config.server.append_only
    }

    /// Whether handler entry and failure causes are logged.
    pub fn debug(&self) -> bool {
        self.config.server.debug
    }

    /// Metric labels for one blob operation, or `None` when metrics are off.
    pub fn blob_labels(&self, user: &str, repo: &Repo, blob_type: &str) -> Option<BlobLabels> {
        self.config.server.metrics_enabled.then(|| BlobLabels {
            user: user.to_string(),
            repo: repo.label().to_string(),
            blob_type: blob_type.to_string(),
        })
    }
}
