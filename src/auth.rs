// ABOUTME: Token source abstraction and file-backed credential store with transparent refresh
// ABOUTME: Injected into the request executor so the HTTP layer never touches stored credentials
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Auth collaborator.
//!
//! The retrieval layer consumes exactly one capability: [`TokenSource`],
//! which yields a currently valid bearer token on every call. The default
//! implementation, [`TokenStore`], persists OAuth credentials on disk and
//! refreshes them through the token endpoint shortly before expiry. It must
//! be safe to call from concurrent domain fetch tasks, so all mutable state
//! sits behind an async `RwLock`.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::constants::env_config;
use crate::errors::{Error, Result};

/// Refresh this long before the recorded expiry to absorb clock skew
const EXPIRY_SKEW_MINUTES: i64 = 5;

/// Capability consumed by the request executor: produce a valid bearer token.
///
/// Implementations refresh transparently as needed and fail with
/// [`Error::AuthRequired`] when no usable session exists.
#[async_trait]
pub trait TokenSource: Send + Sync {
    /// Return an unexpired access token
    async fn access_token(&self) -> Result<String>;
}

/// Fixed-token source for tests and `WHOOP_ACCESS_TOKEN` environments
pub struct StaticTokenSource {
    token: String,
}

impl StaticTokenSource {
    /// Wrap a literal token
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

#[async_trait]
impl TokenSource for StaticTokenSource {
    async fn access_token(&self) -> Result<String> {
        Ok(self.token.clone())
    }
}

/// OAuth credentials as persisted by the login flow
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredCredentials {
    /// OAuth client ID
    pub client_id: String,
    /// OAuth client secret
    pub client_secret: String,
    /// Current access token
    pub access_token: String,
    /// Refresh token, when the session was granted offline access
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    /// Access token expiry instant
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

impl StoredCredentials {
    /// Whether the access token needs refreshing within the skew window
    #[must_use]
    pub fn needs_refresh(&self, now: DateTime<Utc>) -> bool {
        self.expires_at
            .is_some_and(|expires_at| now + chrono::Duration::minutes(EXPIRY_SKEW_MINUTES) > expires_at)
    }
}

/// Shape of the OAuth token endpoint's refresh response
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: Option<String>,
    expires_in: i64,
}

/// File-backed token store with transparent refresh
pub struct TokenStore {
    path: PathBuf,
    token_url: String,
    client: reqwest::Client,
    credentials: RwLock<Option<StoredCredentials>>,
}

impl TokenStore {
    /// Default credentials location: `<config dir>/whoop-sync/credentials.json`
    #[must_use]
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("whoop-sync")
            .join("credentials.json")
    }

    /// Open a store backed by the given file, loading credentials if present.
    ///
    /// A missing file is not an error at open time; it surfaces as
    /// [`Error::AuthRequired`] on the first token request.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] when the file exists but cannot be
    /// parsed.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let credentials = match tokio::fs::read(&path).await {
            Ok(bytes) => {
                let creds: StoredCredentials = serde_json::from_slice(&bytes).map_err(|e| {
                    Error::InvalidArgument(format!(
                        "malformed credentials file {}: {e}",
                        path.display()
                    ))
                })?;
                debug!(path = %path.display(), "loaded stored WHOOP credentials");
                Some(creds)
            }
            Err(_) => None,
        };

        Ok(Self {
            path,
            token_url: env_config::token_url(),
            client: reqwest::Client::new(),
            credentials: RwLock::new(credentials),
        })
    }

    /// Override the token endpoint (tests point this at a mock server)
    #[must_use]
    pub fn with_token_url(mut self, token_url: impl Into<String>) -> Self {
        self.token_url = token_url.into();
        self
    }

    /// Replace and persist the stored credentials
    ///
    /// # Errors
    ///
    /// Returns [`Error::Internal`] when the file cannot be written.
    pub async fn save(&self, credentials: StoredCredentials) -> Result<()> {
        self.persist(&credentials).await?;
        *self.credentials.write().await = Some(credentials);
        Ok(())
    }

    /// Remove any stored credentials, both in memory and on disk
    pub async fn clear(&self) {
        *self.credentials.write().await = None;
        let _ = tokio::fs::remove_file(&self.path).await;
    }

    async fn persist(&self, credentials: &StoredCredentials) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| Error::Internal(format!("failed to create config dir: {e}")))?;
        }
        let body = serde_json::to_vec_pretty(credentials)
            .map_err(|e| Error::Internal(format!("failed to encode credentials: {e}")))?;
        tokio::fs::write(&self.path, body)
            .await
            .map_err(|e| Error::Internal(format!("failed to write credentials: {e}")))?;
        Ok(())
    }

    /// Exchange the refresh token for new credentials and persist them.
    ///
    /// Called with the credential write lock held; must not reacquire it.
    async fn refresh(&self, current: StoredCredentials) -> Result<StoredCredentials> {
        let refresh_token = current.refresh_token.clone().ok_or_else(|| Error::AuthRequired {
            reason: "access token expired and no refresh token is stored".to_owned(),
        })?;

        info!("refreshing WHOOP access token");

        let params = [
            ("client_id", current.client_id.as_str()),
            ("client_secret", current.client_secret.as_str()),
            ("grant_type", "refresh_token"),
            ("refresh_token", &refresh_token),
        ];

        let response = self.client.post(&self.token_url).form(&params).send().await?;

        if !response.status().is_success() {
            return Err(Error::AuthRequired {
                reason: format!(
                    "token refresh failed with status {}",
                    response.status().as_u16()
                ),
            });
        }

        let token_response: TokenResponse = response.json().await?;
        let refreshed = StoredCredentials {
            client_id: current.client_id,
            client_secret: current.client_secret,
            access_token: token_response.access_token.clone(),
            refresh_token: token_response.refresh_token.or(Some(refresh_token)),
            expires_at: Some(Utc::now() + chrono::Duration::seconds(token_response.expires_in)),
        };

        self.persist(&refreshed).await?;
        Ok(refreshed)
    }
}

#[async_trait]
impl TokenSource for TokenStore {
    async fn access_token(&self) -> Result<String> {
        // Fast path under the read lock
        {
            let guard = self.credentials.read().await;
            if let Some(creds) = guard.as_ref() {
                if !creds.needs_refresh(Utc::now()) {
                    return Ok(creds.access_token.clone());
                }
            }
        }

        // Single-flight refresh: one writer exchanges the (single-use)
        // refresh token; racing callers block here and take the fast
        // return on the re-check once the winner has stored the result
        let mut guard = self.credentials.write().await;
        let current = match guard.as_ref() {
            Some(creds) if !creds.needs_refresh(Utc::now()) => {
                return Ok(creds.access_token.clone())
            }
            Some(creds) => creds.clone(),
            None => {
                return Err(Error::AuthRequired {
                    reason: format!(
                        "no credentials found at {} - run the login flow first",
                        self.path.display()
                    ),
                })
            }
        };

        let refreshed = self.refresh(current).await?;
        let token = refreshed.access_token.clone();
        *guard = Some(refreshed);
        Ok(token)
    }
}
