//! Session store
//!
//! Holds the current identity (bearer token + role) and mirrors it into a
//! persistent key-value store as two entries, `token` and `userRole`. The
//! pair is always written and cleared in one store operation.

use base64::Engine;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::{error, info, warn};

use crate::api::ApiClient;
use crate::error::{CatalogError, Result};
use crate::models::{LoginRequest, Role};
use crate::state::SharedKeyValueStore;

pub const TOKEN_KEY: &str = "token";
pub const ROLE_KEY: &str = "userRole";

/// The client's belief about who is logged in. Never validated locally.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub token: String,
    pub role: Role,
}

impl Session {
    pub fn new(token: impl Into<String>, role: Role) -> Self {
        Self {
            token: token.into(),
            role,
        }
    }

    /// Decode the JWT payload for display. The signature is not checked and
    /// the result must not be used to gate anything.
    pub fn claims(&self) -> Option<TokenClaims> {
        let payload = self.token.split('.').nth(1)?;
        let decoded = base64::engine::general_purpose::URL_SAFE_NO_PAD
            .decode(payload.trim_end_matches('='))
            .ok()?;
        serde_json::from_slice(&decoded).ok()
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct TokenClaims {
    #[serde(default)]
    pub sub: Option<String>,
    #[serde(default)]
    pub exp: Option<i64>,
}

impl TokenClaims {
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.exp.and_then(|exp| DateTime::from_timestamp(exp, 0))
    }
}

pub struct SessionStore {
    storage: SharedKeyValueStore,
    api: ApiClient,
    current: Option<Session>,
}

impl SessionStore {
    pub fn new(storage: SharedKeyValueStore, api: ApiClient) -> Self {
        Self {
            storage,
            api,
            current: None,
        }
    }

    pub fn current(&self) -> Option<&Session> {
        self.current.as_ref()
    }

    /// Rebuild the session from persisted entries left by a previous run.
    /// A lone token or lone role is treated as no session and removed, and so
    /// is a store whose contents cannot be parsed.
    pub async fn restore(&mut self) -> Result<Option<Session>> {
        self.current = None;

        let entries = match self.read_entries().await {
            Ok(entries) => entries,
            Err(e @ CatalogError::StateParse { .. }) => {
                warn!("{}; starting logged out", e);
                self.storage.remove_entries(&[TOKEN_KEY, ROLE_KEY]).await?;
                return Ok(None);
            }
            Err(e) => return Err(e),
        };

        match entries {
            (Some(token), Some(role)) => {
                let session = Session::new(token, Role::from(role));
                info!("Restored session with role {}", session.role);
                self.current = Some(session.clone());
                Ok(Some(session))
            }
            (None, None) => Ok(None),
            _ => {
                warn!("Found a partial persisted session; clearing it");
                self.storage.remove_entries(&[TOKEN_KEY, ROLE_KEY]).await?;
                Ok(None)
            }
        }
    }

    async fn read_entries(&self) -> Result<(Option<String>, Option<String>)> {
        let token = self.storage.get(TOKEN_KEY).await?;
        let role = self.storage.get(ROLE_KEY).await?;
        Ok((token, role))
    }

    /// Authenticate against the API. On any failure the previous session and
    /// the persisted entries stay as they were.
    pub async fn login(&mut self, username: &str, password: &str) -> Result<Session> {
        let request = LoginRequest {
            username: username.to_string(),
            password: password.to_string(),
        };

        let token = match self.api.login(&request).await {
            Ok(token) => token,
            Err(CatalogError::NotAuthenticated) => {
                error!("Login rejected for '{}'", username);
                return Err(CatalogError::InvalidCredentials);
            }
            Err(e) => {
                error!("Login error for '{}': {}", username, e);
                return Err(e);
            }
        };

        let role = token.role.to_string();
        if let Err(e) = self
            .storage
            .set_entries(&[(TOKEN_KEY, token.access_token.as_str()), (ROLE_KEY, role.as_str())])
            .await
        {
            error!("Could not persist session for '{}': {}", username, e);
            return Err(e);
        }

        let session = Session::new(token.access_token, token.role);
        info!("Logged in as '{}' with role {}", username, session.role);
        self.current = Some(session.clone());
        Ok(session)
    }

    /// Drop the in-memory session and both persisted entries. Safe to call
    /// when already logged out.
    pub async fn logout(&mut self) -> Result<()> {
        if self.current.take().is_some() {
            info!("Logged out");
        }
        self.storage
            .remove_entries(&[TOKEN_KEY, ROLE_KEY])
            .await
            .map_err(|e| {
                error!("Could not clear persisted session: {}", e);
                e
            })
    }
}
