//! Provider credential for the current dashboard session.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

/// Where the remote client gets its bearer token from.
#[async_trait]
pub trait CredentialSource: Send + Sync {
    /// A usable access token, or None when the session is not connected.
    async fn access_token(&self) -> Option<String>;
}

/// Tokens returned by the OAuth token endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

impl Credential {
    pub fn bearer(access_token: impl Into<String>) -> Self {
        Credential {
            access_token: access_token.into(),
            refresh_token: None,
            expires_at: None,
        }
    }

    pub fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|at| Utc::now() >= at)
    }
}

/// Holds at most one credential. Cloning shares the same slot.
#[derive(Debug, Clone, Default)]
pub struct Session {
    credential: Arc<RwLock<Option<Credential>>>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(access_token: impl Into<String>) -> Self {
        Session {
            credential: Arc::new(RwLock::new(Some(Credential::bearer(access_token)))),
        }
    }

    pub async fn store(&self, credential: Credential) {
        *self.credential.write().await = Some(credential);
    }

    pub async fn clear(&self) {
        self.credential.write().await.take();
    }

    pub async fn has_credential(&self) -> bool {
        self.access_token().await.is_some()
    }
}

#[async_trait]
impl CredentialSource for Session {
    async fn access_token(&self) -> Option<String> {
        let guard = self.credential.read().await;
        guard
            .as_ref()
            .filter(|c| !c.is_expired())
            .map(|c| c.access_token.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[tokio::test]
    async fn test_expired_credential_yields_no_token() {
        let session = Session::new();
        session
            .store(Credential {
                access_token: "old".to_string(),
                refresh_token: None,
                expires_at: Some(Utc::now() - Duration::minutes(1)),
            })
            .await;

        assert_eq!(session.access_token().await, None);
    }

    #[tokio::test]
    async fn test_clones_share_the_credential() {
        let session = Session::new();
        let clone = session.clone();

        session.store(Credential::bearer("tok")).await;
        assert_eq!(clone.access_token().await.as_deref(), Some("tok"));

        clone.clear().await;
        assert!(!session.has_credential().await);
    }
}
