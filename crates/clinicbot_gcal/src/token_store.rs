// --- File: crates/clinicbot_gcal/src/token_store.rs ---
//! Persistence of the Google OAuth token and the selected calendar.
//!
//! The state lives in a small JSON file so that the connection survives a
//! restart. The file is written in full on every change and is not encrypted.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::logic::GcalError;

/// Tokens expiring within this margin are treated as expired.
const EXPIRY_MARGIN_SECS: i64 = 60;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StoredToken {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub scope: Option<String>,
    #[serde(default)]
    pub token_type: Option<String>,
}

impl StoredToken {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at
            .is_some_and(|at| at <= now + Duration::seconds(EXPIRY_MARGIN_SECS))
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct StoredState {
    #[serde(default)]
    pub token: Option<StoredToken>,
    #[serde(default)]
    pub calendar_id: Option<String>,
}

pub struct TokenStore {
    path: Option<PathBuf>,
    state: RwLock<StoredState>,
}

impl TokenStore {
    /// Open the store at `path`, reading existing state if the file exists.
    /// A corrupt file is logged and treated as empty.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, GcalError> {
        let path = path.as_ref().to_path_buf();
        let state = match tokio::fs::read(&path).await {
            Ok(bytes) => serde_json::from_slice(&bytes).unwrap_or_else(|e| {
                warn!("Ignoring unreadable token store {}: {}", path.display(), e);
                StoredState::default()
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => StoredState::default(),
            Err(e) => {
                return Err(GcalError::Storage(format!(
                    "Failed to read {}: {}",
                    path.display(),
                    e
                )))
            }
        };
        debug!(
            "Token store {} opened (connected: {})",
            path.display(),
            state.token.is_some()
        );
        Ok(Self {
            path: Some(path),
            state: RwLock::new(state),
        })
    }

    /// A store that never touches the disk.
    pub fn in_memory(state: StoredState) -> Self {
        Self {
            path: None,
            state: RwLock::new(state),
        }
    }

    pub async fn snapshot(&self) -> StoredState {
        self.state.read().await.clone()
    }

    pub async fn token(&self) -> Option<StoredToken> {
        self.state.read().await.token.clone()
    }

    pub async fn calendar_id(&self) -> Option<String> {
        self.state.read().await.calendar_id.clone()
    }

    pub async fn set_token(&self, token: StoredToken) -> Result<(), GcalError> {
        let mut state = self.state.write().await;
        state.token = Some(token);
        self.persist(&state).await
    }

    /// Forget the token. The selected calendar is kept for the next connection.
    pub async fn clear_token(&self) -> Result<(), GcalError> {
        let mut state = self.state.write().await;
        if state.token.take().is_some() {
            info!("Cleared stored Google Calendar token");
        }
        self.persist(&state).await
    }

    pub async fn set_calendar_id(&self, calendar_id: String) -> Result<(), GcalError> {
        let mut state = self.state.write().await;
        state.calendar_id = Some(calendar_id);
        self.persist(&state).await
    }

    async fn persist(&self, state: &StoredState) -> Result<(), GcalError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(dir)
                .await
                .map_err(|e| GcalError::Storage(format!("Failed to create {}: {}", dir.display(), e)))?;
        }
        let bytes = serde_json::to_vec_pretty(state)
            .map_err(|e| GcalError::Storage(e.to_string()))?;
        // write a sibling file, then rename over the original
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, bytes)
            .await
            .map_err(|e| GcalError::Storage(format!("Failed to write {}: {}", tmp.display(), e)))?;
        tokio::fs::rename(&tmp, path)
            .await
            .map_err(|e| GcalError::Storage(format!("Failed to replace {}: {}", path.display(), e)))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token(expires_in_secs: i64) -> StoredToken {
        StoredToken {
            access_token: "ya29.a".to_string(),
            refresh_token: Some("1//r".to_string()),
            expires_at: Some(Utc::now() + Duration::seconds(expires_in_secs)),
            scope: None,
            token_type: Some("Bearer".to_string()),
        }
    }

    #[test]
    fn test_expiry_has_margin() {
        assert!(token(30).is_expired(Utc::now()));
        assert!(!token(3600).is_expired(Utc::now()));
        let no_expiry = StoredToken {
            expires_at: None,
            ..token(0)
        };
        assert!(!no_expiry.is_expired(Utc::now()));
    }

    #[tokio::test]
    async fn test_state_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("gcal_token.json");

        let store = TokenStore::open(&path).await.unwrap();
        assert_eq!(store.snapshot().await, StoredState::default());
        store.set_token(token(3600)).await.unwrap();
        store.set_calendar_id("clinic@group.calendar.google.com".to_string()).await.unwrap();

        let reopened = TokenStore::open(&path).await.unwrap();
        assert_eq!(reopened.token().await.unwrap().access_token, "ya29.a");
        assert_eq!(
            reopened.calendar_id().await.as_deref(),
            Some("clinic@group.calendar.google.com")
        );
    }

    #[tokio::test]
    async fn test_clear_token_keeps_calendar() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gcal_token.json");
        let store = TokenStore::open(&path).await.unwrap();
        store.set_token(token(3600)).await.unwrap();
        store.set_calendar_id("primary".to_string()).await.unwrap();

        store.clear_token().await.unwrap();

        let reopened = TokenStore::open(&path).await.unwrap();
        assert!(reopened.token().await.is_none());
        assert_eq!(reopened.calendar_id().await.as_deref(), Some("primary"));
    }

    #[tokio::test]
    async fn test_corrupt_file_is_treated_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gcal_token.json");
        std::fs::write(&path, b"{not json").unwrap();

        let store = TokenStore::open(&path).await.unwrap();
        assert!(store.token().await.is_none());
    }
}
