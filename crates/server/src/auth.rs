//! HTTP Basic authentication.

use crate::error::ApiError;
use crate::state::AppState;
use axum::extract::{Request, State};
use axum::http::header::AUTHORIZATION;
use axum::middleware::Next;
use axum::response::Response;
use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use restash_core::config::AuthConfig;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::Instrument;

/// Realm advertised in `WWW-Authenticate` challenges.
pub const REALM: &str = "restash";

/// Username attached to every request.
///
/// Empty when the request carried no Basic credentials.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AuthUser(pub String);

impl AuthUser {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Something that can check a username/password pair.
pub trait CredentialStore: Send + Sync + 'static {
    fn validate(&self, username: &str, password: &str) -> bool;
}

/// Errors loading credentials.
#[derive(Debug, thiserror::Error)]
pub enum CredentialError {
    #[error("failed to read credentials file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{origin}: invalid entry: {reason}")]
    InvalidEntry { origin: String, reason: String },

    #[error("failed to hash password: {0}")]
    Hash(String),
}

/// In-memory credential table of Argon2 password hashes in PHC format.
#[derive(Clone, Debug, Default)]
pub struct CredentialFile {
    users: HashMap<String, String>,
}

impl CredentialFile {
    /// Build the table from the `auth` section: the credentials file (if
    /// any) first, then inline users, which override file entries.
    pub async fn from_config(config: &AuthConfig) -> Result<Self, CredentialError> {
        let mut creds = Self::default();

        if let Some(path) = &config.credentials_file {
            let contents = tokio::fs::read_to_string(path)
                .await
                .map_err(|source| CredentialError::Read {
                    path: path.clone(),
                    source,
                })?;
            creds.load_lines(path, &contents)?;
        }

        for (username, hash) in &config.users {
            let hash = parse_hash(hash).map_err(|reason| CredentialError::InvalidEntry {
                origin: format!("auth.users.{username}"),
                reason,
            })?;
            creds.users.insert(username.clone(), hash);
        }

        Ok(creds)
    }

    /// Parse `username:<phc hash>` lines. Blank lines and `#` comments are skipped.
    fn load_lines(&mut self, path: &Path, contents: &str) -> Result<(), CredentialError> {
        for (lineno, line) in contents.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let invalid = |reason: String| CredentialError::InvalidEntry {
                origin: format!("{}:{}", path.display(), lineno + 1),
                reason,
            };

            let (username, hash) = line
                .split_once(':')
                .ok_or_else(|| invalid("expected username:<argon2 hash>".to_string()))?;
            if username.is_empty() {
                return Err(invalid("empty username".to_string()));
            }
            let hash = parse_hash(hash).map_err(invalid)?;
            self.users.insert(username.to_string(), hash);
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

impl CredentialStore for CredentialFile {
    fn validate(&self, username: &str, password: &str) -> bool {
        let Some(stored) = self.users.get(username) else {
            return false;
        };
        // Entries were checked on load.
        let Ok(parsed) = PasswordHash::new(stored) else {
            return false;
        };
        Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok()
    }
}

/// Hash a password with Argon2id and a fresh salt.
///
/// Returns the PHC string accepted in credentials files and `auth.users`.
pub fn hash_password(password: &str) -> Result<String, CredentialError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| CredentialError::Hash(e.to_string()))
}

fn parse_hash(value: &str) -> Result<String, String> {
    let value = value.trim();
    let parsed = PasswordHash::new(value).map_err(|e| format!("invalid password hash: {e}"))?;
    if !parsed.algorithm.as_str().starts_with("argon2") {
        return Err(format!("unsupported hash algorithm {}", parsed.algorithm));
    }
    Ok(value.to_string())
}

/// Decode an `Authorization: Basic` header into username and password.
/// The scheme is matched case-insensitively.
fn basic_credentials(req: &Request) -> Option<(String, String)> {
    let value = req.headers().get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, encoded) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("basic") {
        return None;
    }
    let decoded = STANDARD.decode(encoded.trim()).ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (username, password) = decoded.split_once(':')?;
    Some((username.to_string(), password.to_string()))
}

/// Authentication middleware.
///
/// With auth enabled, rejects requests without valid Basic credentials. The
/// username (verified or not) is attached as an [`AuthUser`] extension.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let credentials = basic_credentials(&req);

    let user = match (&state.credentials, credentials) {
        (Some(store), Some((username, password))) => {
            if !store.validate(&username, &password) {
                tracing::warn!(user = %username, "Rejected invalid credentials");
                return Err(ApiError::Unauthorized("invalid credentials".to_string()));
            }
            AuthUser(username)
        }
        (Some(_), None) => {
            return Err(ApiError::Unauthorized(
                "missing basic credentials".to_string(),
            ));
        }
        (None, Some((username, _))) => AuthUser(username),
        (None, None) => AuthUser::default(),
    };

    let span = tracing::info_span!("request", user = %user.as_str());
    req.extensions_mut().insert(user);

    Ok(next.run(req).instrument(span).await)
}
