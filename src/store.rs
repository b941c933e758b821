//! Persistent session storage.
//!
//! A single JSON document on disk holds the access token, refresh token,
//! and the cached user snapshot. Every operation fails closed: a storage
//! error reads as an empty session or a `false` write result, logged but
//! never propagated to callers.

use std::io::ErrorKind;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::{error, warn};

use crate::types::UserProfile;

#[derive(Debug, Default, Serialize, Deserialize)]
struct SessionDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    access_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    refresh_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    user: Option<UserProfile>,
}

#[derive(Clone)]
pub struct TokenStore {
    path: PathBuf,
}

impl TokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub async fn set_tokens(&self, access: &str, refresh: &str) -> bool {
        let mut doc = self.read().await;
        doc.access_token = Some(access.to_string());
        doc.refresh_token = Some(refresh.to_string());
        self.write(&doc).await
    }

    /// Overwrites the access token only; the refresh token is untouched.
    pub async fn set_access(&self, access: &str) -> bool {
        let mut doc = self.read().await;
        doc.access_token = Some(access.to_string());
        self.write(&doc).await
    }

    pub async fn access_token(&self) -> Option<String> {
        self.read().await.access_token
    }

    pub async fn refresh_token(&self) -> Option<String> {
        self.read().await.refresh_token
    }

    /// Replaces the cached profile snapshot wholesale.
    pub async fn set_user(&self, user: &UserProfile) -> bool {
        let mut doc = self.read().await;
        doc.user = Some(user.clone());
        self.write(&doc).await
    }

    pub async fn user(&self) -> Option<UserProfile> {
        self.read().await.user
    }

    pub async fn clear(&self) -> bool {
        self.write(&SessionDocument::default()).await
    }

    // Each operation is an independent read-modify-write with no locking;
    // concurrent writers interleave arbitrarily and the last write wins.
    async fn read(&self) -> SessionDocument {
        let contents = match tokio::fs::read(&self.path).await {
            Ok(contents) => contents,
            Err(err) if err.kind() == ErrorKind::NotFound => return SessionDocument::default(),
            Err(err) => {
                warn!(
                    "session store read failed: path='{}' error={}",
                    self.path.display(),
                    err
                );
                return SessionDocument::default();
            }
        };
        match serde_json::from_slice(&contents) {
            Ok(doc) => doc,
            Err(err) => {
                warn!(
                    "session store corrupt; treating as empty: path='{}' error={}",
                    self.path.display(),
                    err
                );
                SessionDocument::default()
            }
        }
    }

    async fn write(&self, doc: &SessionDocument) -> bool {
        let contents = match serde_json::to_vec(doc) {
            Ok(contents) => contents,
            Err(err) => {
                error!("session store serialize failed: error={}", err);
                return false;
            }
        };
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            if let Err(err) = tokio::fs::create_dir_all(parent).await {
                error!(
                    "session store mkdir failed: path='{}' error={}",
                    parent.display(),
                    err
                );
                return false;
            }
        }

        match tokio::fs::write(&self.path, contents).await {
            Ok(()) => true,
            Err(err) => {
                error!(
                    "session store write failed: path='{}' error={}",
                    self.path.display(),
                    err
                );
                false
            }
        }
    }
}
