//! # Authentication
//!
//! Token acquisition belongs to an external token manager; the load generator
//! only relies on the [`Authenticator`] contract. [`StaticTokenAuthenticator`]
//! is the stand-in shipped with the binary: it serves a pre-issued bearer token.

use crate::lifecycle::LoadConfig;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Failed to read key file {path}: {source}")]
    KeyFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("No bearer token available: {0}")]
    MissingToken(String),
}

/// Source of bearer tokens shared by every actor of a run.
///
/// `get_token` is called for every request so a token refreshed mid-run is
/// picked up immediately.
#[async_trait]
pub trait Authenticator: Send + Sync {
    async fn get_token(&self) -> Result<String, AuthError>;

    async fn start_session(&self) -> Result<(), AuthError> {
        Ok(())
    }

    async fn end_session(&self);
}

/// Serves one fixed token for the whole run.
#[derive(Clone)]
pub struct StaticTokenAuthenticator {
    token: String,
}

impl std::fmt::Debug for StaticTokenAuthenticator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaticTokenAuthenticator")
            .field("token", &"<redacted>")
            .finish()
    }
}

impl StaticTokenAuthenticator {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }

    /// Reads a pre-issued bearer token from `path`, ignoring surrounding
    /// whitespace.
    ///
    /// The file holds the token itself. A JSON document such as a
    /// service-account key is rejected; exchanging it for a token is the
    /// token manager's job.
    pub fn from_key_file(path: &Path) -> Result<Self, AuthError> {
        let raw = std::fs::read_to_string(path).map_err(|source| AuthError::KeyFile {
            path: path.to_path_buf(),
            source,
        })?;
        let token = raw.trim();
        if token.is_empty() {
            return Err(AuthError::MissingToken(format!(
                "key file {} is empty",
                path.display()
            )));
        }
        if serde_json::from_str::<serde_json::Map<String, serde_json::Value>>(token).is_ok() {
            return Err(AuthError::MissingToken(format!(
                "key file {} holds a JSON document, not a bearer token",
                path.display()
            )));
        }
        Ok(Self::new(token))
    }

    /// `AUTH_TOKEN` wins over the key file.
    pub fn from_config(config: &LoadConfig) -> Result<Self, AuthError> {
        match &config.auth_token {
            Some(token) => Ok(Self::new(token.clone())),
            None => Self::from_key_file(&config.key_file_path),
        }
    }
}

#[async_trait]
impl Authenticator for StaticTokenAuthenticator {
    async fn get_token(&self) -> Result<String, AuthError> {
        Ok(self.token.clone())
    }

    async fn start_session(&self) -> Result<(), AuthError> {
        info!("Starting auth session...");
        Ok(())
    }

    async fn end_session(&self) {
        info!("Stopping auth session...");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[tokio::test]
    async fn test_key_file_token_is_trimmed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("key.json");
        fs::write(&path, "  secret-token\n").unwrap();

        let auth = StaticTokenAuthenticator::from_key_file(&path).unwrap();
        assert_eq!(auth.get_token().await.unwrap(), "secret-token");
    }

    #[test]
    fn test_missing_or_empty_key_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("key.json");
        assert!(matches!(
            StaticTokenAuthenticator::from_key_file(&path),
            Err(AuthError::KeyFile { .. })
        ));

        fs::write(&path, "\n").unwrap();
        assert!(matches!(
            StaticTokenAuthenticator::from_key_file(&path),
            Err(AuthError::MissingToken(_))
        ));
    }

    #[test]
    fn test_json_key_is_not_sent_as_token() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("key.json");
        fs::write(&path, r#"{"type": "service_account", "private_key": "k"}"#).unwrap();

        assert!(matches!(
            StaticTokenAuthenticator::from_key_file(&path),
            Err(AuthError::MissingToken(message)) if message.contains("JSON document")
        ));
    }

    #[test]
    fn test_debug_hides_token() {
        let auth = StaticTokenAuthenticator::new("secret-token");
        assert!(!format!("{auth:?}").contains("secret-token"));
    }
}
