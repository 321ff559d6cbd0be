//! Explicit authenticated session state.
//!
//! A [`SessionContext`] is created from a login response, read by every API
//! call, replaced when tokens are refreshed and cleared on logout or when a
//! refresh fails. Components that talk to the backend receive a
//! [`SessionHandle`] instead of reading ambient storage.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionUser {
    pub id: String,
    pub username: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub roles: Vec<String>,
}

/// Token pair returned by the backend's login and refresh endpoints.
#[derive(Clone, Deserialize)]
pub struct TokenGrant {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_in_secs: Option<i64>,
    #[serde(default)]
    pub user: Option<SessionUser>,
}

impl fmt::Debug for TokenGrant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenGrant")
            .field("access_token", &"<redacted>")
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "<redacted>"))
            .field("expires_in_secs", &self.expires_in_secs)
            .field("user", &self.user)
            .finish()
    }
}

#[derive(Clone, Debug)]
pub struct SessionContext {
    pub user: SessionUser,
    access_token: SecretString,
    refresh_token: Option<SecretString>,
    pub issued_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl SessionContext {
    pub fn from_grant(grant: TokenGrant, user: SessionUser, now: DateTime<Utc>) -> Self {
        Self {
            user: grant.user.unwrap_or(user),
            access_token: grant.access_token.into(),
            refresh_token: grant.refresh_token.map(SecretString::from),
            issued_at: now,
            expires_at: grant.expires_in_secs.map(|secs| now + Duration::seconds(secs)),
        }
    }

    /// Applies a refresh grant, keeping the previous refresh token when the
    /// backend does not rotate it.
    pub fn refreshed(&self, grant: TokenGrant, now: DateTime<Utc>) -> Self {
        let refresh_token = grant
            .refresh_token
            .map(SecretString::from)
            .or_else(|| self.refresh_token.clone());
        Self {
            user: grant.user.unwrap_or_else(|| self.user.clone()),
            access_token: grant.access_token.into(),
            refresh_token,
            issued_at: now,
            expires_at: grant.expires_in_secs.map(|secs| now + Duration::seconds(secs)),
        }
    }

    pub fn access_token(&self) -> &str {
        self.access_token.expose_secret()
    }

    pub fn refresh_token(&self) -> Option<&str> {
        self.refresh_token.as_ref().map(|token| token.expose_secret())
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|expires_at| expires_at <= now)
    }
}

/// Shared slot holding the current session, if any.
#[derive(Clone, Debug, Default)]
pub struct SessionHandle {
    inner: Arc<RwLock<Option<SessionContext>>>,
}

impl SessionHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn current(&self) -> Option<SessionContext> {
        self.inner.read().await.clone()
    }

    pub async fn access_token(&self) -> Option<String> {
        self.inner.read().await.as_ref().map(|session| session.access_token().to_string())
    }

    pub async fn refresh_token(&self) -> Option<String> {
        self.inner
            .read()
            .await
            .as_ref()
            .and_then(|session| session.refresh_token().map(str::to_string))
    }

    pub async fn replace(&self, session: SessionContext) {
        *self.inner.write().await = Some(session);
    }

    pub async fn clear(&self) -> Option<SessionContext> {
        self.inner.write().await.take()
    }

    pub async fn is_active(&self) -> bool {
        self.inner.read().await.is_some()
    }
}
