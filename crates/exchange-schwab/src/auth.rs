//! OAuth token handling for the Schwab API.
//!
//! Schwab issues short-lived access tokens refreshed through the token
//! endpoint with HTTP Basic client credentials plus a refresh token. The
//! refresh token itself may rotate on every refresh.
//!
//! # Security
//!
//! - Credentials are loaded from environment variables
//! - Secrets are held in [`SecretString`] and are never logged

use chrono::{DateTime, Duration, Utc};
use gamma_core::SchwabConfig;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::error::{Result, SchwabError};
use crate::parse;

/// Tokens are refreshed this long before their stated expiry.
const EXPIRY_MARGIN_SECS: i64 = 60;
const DEFAULT_EXPIRES_IN_SECS: i64 = 1800;
const MIN_EXPIRES_IN_SECS: i64 = 300;

// =============================================================================
// Credentials
// =============================================================================

/// Client credentials plus optional seed tokens.
pub struct SchwabCredentials {
    pub client_id: String,
    pub client_secret: SecretString,
    pub refresh_token: Option<SecretString>,
    /// Used as-is until a request is rejected with 401.
    pub access_token: Option<SecretString>,
}

impl std::fmt::Debug for SchwabCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SchwabCredentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .field("has_refresh_token", &self.refresh_token.is_some())
            .field("has_access_token", &self.access_token.is_some())
            .finish()
    }
}

impl SchwabCredentials {
    #[must_use]
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: SecretString::from(client_secret.into()),
            refresh_token: None,
            access_token: None,
        }
    }

    #[must_use]
    pub fn with_refresh_token(mut self, token: impl Into<String>) -> Self {
        self.refresh_token = Some(SecretString::from(token.into()));
        self
    }

    #[must_use]
    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(SecretString::from(token.into()));
        self
    }

    /// Reads credentials from the env vars named in `config`. Missing values
    /// are not an error here; they surface when a token is first needed.
    #[must_use]
    pub fn from_env(config: &SchwabConfig) -> Self {
        let read = |name: &str| {
            std::env::var(name)
                .ok()
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        Self {
            client_id: read(&config.client_id_env).unwrap_or_default(),
            client_secret: SecretString::from(read(&config.client_secret_env).unwrap_or_default()),
            refresh_token: read(&config.refresh_token_env).map(SecretString::from),
            access_token: read(&config.access_token_env).map(SecretString::from),
        }
    }
}

// =============================================================================
// Token state
// =============================================================================

struct TokenState {
    access_token: Option<SecretString>,
    refresh_token: Option<SecretString>,
    /// `None` for a seeded token with unknown lifetime.
    expires_at: Option<DateTime<Utc>>,
}

impl TokenState {
    fn usable_token(&self, now: DateTime<Utc>) -> Option<String> {
        let token = self.access_token.as_ref()?.expose_secret();
        if token.is_empty() {
            return None;
        }
        match self.expires_at {
            None => Some(token.to_string()),
            Some(expires_at) if now < expires_at - Duration::seconds(EXPIRY_MARGIN_SECS) => {
                Some(token.to_string())
            }
            Some(_) => None,
        }
    }
}

// =============================================================================
// SchwabAuth
// =============================================================================

/// Access-token cache with refresh-token rotation.
///
/// The state lock is held across the refresh request so concurrent callers
/// wait for one refresh instead of racing the rotating refresh token.
pub struct SchwabAuth {
    http: Client,
    token_url: String,
    client_id: String,
    client_secret: SecretString,
    state: Mutex<TokenState>,
}

impl std::fmt::Debug for SchwabAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SchwabAuth")
            .field("token_url", &self.token_url)
            .field("client_id", &self.client_id)
            .finish_non_exhaustive()
    }
}

impl SchwabAuth {
    #[must_use]
    pub fn new(http: Client, token_url: impl Into<String>, credentials: SchwabCredentials) -> Self {
        Self {
            http,
            token_url: token_url.into(),
            client_id: credentials.client_id,
            client_secret: credentials.client_secret,
            state: Mutex::new(TokenState {
                access_token: credentials.access_token,
                refresh_token: credentials.refresh_token,
                expires_at: None,
            }),
        }
    }

    /// Returns a bearer token, refreshing when the cached one is missing,
    /// close to expiry, or `force_refresh` is set.
    ///
    /// # Errors
    /// Returns error if a refresh is needed and fails.
    pub async fn access_token(&self, force_refresh: bool) -> Result<String> {
        let mut state = self.state.lock().await;
        if !force_refresh {
            if let Some(token) = state.usable_token(Utc::now()) {
                return Ok(token);
            }
        }
        self.refresh(&mut state).await
    }

    async fn refresh(&self, state: &mut TokenState) -> Result<String> {
        let refresh_token = state
            .refresh_token
            .as_ref()
            .map(|t| t.expose_secret().to_string())
            .ok_or_else(|| {
                SchwabError::Configuration(
                    "refresh token is missing; set an access token for temporary use or configure refresh credentials"
                        .to_string(),
                )
            })?;
        let client_secret = self.client_secret.expose_secret();
        if self.client_id.is_empty() || client_secret.is_empty() {
            return Err(SchwabError::Configuration(
                "client id and client secret are required to refresh the access token".to_string(),
            ));
        }

        debug!(url = %self.token_url, "Refreshing Schwab access token");
        let response = self
            .http
            .post(&self.token_url)
            .basic_auth(&self.client_id, Some(client_secret))
            .form(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        if !status.is_success() {
            if status.is_server_error() || status.as_u16() == 429 {
                return Err(SchwabError::api(status.as_u16(), body));
            }
            let mut detail = body;
            let cut = detail.char_indices().nth(300).map_or(detail.len(), |(i, _)| i);
            detail.truncate(cut);
            return Err(SchwabError::Authentication(format!(
                "token refresh failed: HTTP {} - {detail}",
                status.as_u16()
            )));
        }

        let payload: Value = serde_json::from_str(&body)?;
        let access_token = ["access_token", "token"]
            .iter()
            .filter_map(|key| payload.get(*key).and_then(Value::as_str))
            .map(str::trim)
            .find(|t| !t.is_empty())
            .map(str::to_string)
            .ok_or_else(|| {
                SchwabError::Authentication("token refresh response missing access token".to_string())
            })?;
        let expires_in = ["expires_in", "expiresIn"]
            .iter()
            .find_map(|key| payload.get(*key).and_then(parse::number))
            .map_or(DEFAULT_EXPIRES_IN_SECS, |secs| secs as i64)
            .max(MIN_EXPIRES_IN_SECS);

        let rotated = payload
            .get("refresh_token")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|t| !t.is_empty());
        if let Some(rotated) = rotated {
            state.refresh_token = Some(SecretString::from(rotated.to_string()));
        }

        state.access_token = Some(SecretString::from(access_token.clone()));
        state.expires_at = Some(Utc::now() + Duration::seconds(expires_in));

        info!(expires_in, rotated = rotated.is_some(), "Schwab access token refreshed");
        Ok(access_token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seeded_token_without_expiry_is_usable() {
        let state = TokenState {
            access_token: Some(SecretString::from("seed".to_string())),
            refresh_token: None,
            expires_at: None,
        };
        assert_eq!(state.usable_token(Utc::now()).as_deref(), Some("seed"));
    }

    #[test]
    fn test_token_inside_expiry_margin_is_not_usable() {
        let now = Utc::now();
        let mut state = TokenState {
            access_token: Some(SecretString::from("abc".to_string())),
            refresh_token: None,
            expires_at: Some(now + Duration::seconds(30)),
        };
        assert!(state.usable_token(now).is_none());

        state.expires_at = Some(now + Duration::seconds(600));
        assert!(state.usable_token(now).is_some());
    }

    #[test]
    fn test_empty_token_is_not_usable() {
        let state = TokenState {
            access_token: Some(SecretString::from(String::new())),
            refresh_token: None,
            expires_at: None,
        };
        assert!(state.usable_token(Utc::now()).is_none());
    }

    #[test]
    fn test_credentials_debug_redacts_secret() {
        let creds = SchwabCredentials::new("app-id", "top-secret").with_refresh_token("rt");
        let debug = format!("{creds:?}");
        assert!(debug.contains("app-id"));
        assert!(!debug.contains("top-secret"));
        assert!(!debug.contains("\"rt\""));
    }

    #[tokio::test]
    async fn test_missing_refresh_token_is_configuration_error() {
        let auth = SchwabAuth::new(
            Client::new(),
            "http://127.0.0.1:9/v1/oauth/token",
            SchwabCredentials::new("id", "secret"),
        );
        let err = auth.access_token(false).await.unwrap_err();
        assert!(matches!(err, SchwabError::Configuration(_)));
    }
}
