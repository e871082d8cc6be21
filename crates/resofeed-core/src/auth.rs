//! Credential providers for the two supported authentication strategies.
//!
//! [`CredentialProvider`] is a tagged variant over bearer and client-credential
//! strategies, selected by [`CredentialProvider::new`] from an
//! [`AuthOptions`] descriptor. Both variants answer the same three-part
//! contract (`is_expired` / `refresh` / `get_token`) purely so assembly code
//! can treat them uniformly; the bearer variant never expires and never
//! touches the network.
//!
//! # Shared-provider limitation
//!
//! Refresh exclusivity is enforced only for requests admitted through one
//! feed's own admission queue (the pause/start bracket in the auth hook).
//! Concurrent `refresh()` or `get_token()` calls arriving from outside that
//! queue — for example a second feed sharing this provider — are unguarded.

use std::sync::{Arc, Mutex};

use serde::Deserialize;
use time::OffsetDateTime;

use crate::error::AuthError;
use crate::http_client::{HttpClient, HttpRequest};

const DEFAULT_TOKEN_TYPE: &str = "Bearer";
const DEFAULT_REFRESH_BUFFER_MS: i64 = 30_000;

/// Tagged descriptor selecting an authentication strategy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthOptions {
    /// Fixed, never-expiring token supplied by the caller.
    Bearer {
        token: String,
        token_type: Option<String>,
    },
    /// OAuth2 client-credentials grant against `token_url`.
    ClientCredentials {
        token_url: String,
        client_id: String,
        client_secret: String,
        scope: Option<String>,
        grant_type: Option<String>,
        /// Safety margin subtracted from the reported token lifetime,
        /// in milliseconds. Defaults to 30 seconds.
        refresh_buffer_ms: Option<i64>,
    },
}

/// A live token plus its scheme, ready for header injection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub token: String,
    pub token_type: String,
}

/// Polymorphic credential provider; one per feed, shared with the auth hook.
pub enum CredentialProvider {
    Bearer(BearerCredentials),
    ClientCredentials(ClientCredentials),
}

impl CredentialProvider {
    /// Factory keyed on the descriptor's discriminant.
    pub fn new(options: AuthOptions, http: Arc<dyn HttpClient>) -> Self {
        match options {
            AuthOptions::Bearer { token, token_type } => Self::Bearer(BearerCredentials {
                token,
                token_type: token_type.unwrap_or_else(|| String::from(DEFAULT_TOKEN_TYPE)),
            }),
            AuthOptions::ClientCredentials {
                token_url,
                client_id,
                client_secret,
                scope,
                grant_type,
                refresh_buffer_ms,
            } => Self::ClientCredentials(ClientCredentials {
                token_url,
                client_id,
                client_secret,
                scope,
                grant_type,
                refresh_buffer_ms: refresh_buffer_ms.unwrap_or(DEFAULT_REFRESH_BUFFER_MS),
                http,
                state: Mutex::new(TokenState::default()),
            }),
        }
    }

    /// Pure liveness check. Bearer credentials never expire; freshly built
    /// client credentials start expired, forcing a refresh before first use.
    pub fn is_expired(&self) -> bool {
        match self {
            Self::Bearer(_) => false,
            Self::ClientCredentials(credentials) => credentials.is_expired(),
        }
    }

    /// Rotates the token. A no-op for bearer credentials; a network
    /// round-trip for client credentials. Fail-fast, no internal retry.
    pub async fn refresh(&self) -> Result<(), AuthError> {
        match self {
            Self::Bearer(_) => Ok(()),
            Self::ClientCredentials(credentials) => credentials.refresh().await,
        }
    }

    /// Produces the current token, refreshing first when expired.
    pub async fn get_token(&self) -> Result<Token, AuthError> {
        match self {
            Self::Bearer(credentials) => Ok(Token {
                token: credentials.token.clone(),
                token_type: credentials.token_type.clone(),
            }),
            Self::ClientCredentials(credentials) => credentials.get_token().await,
        }
    }
}

/// Fixed-token strategy.
pub struct BearerCredentials {
    token: String,
    token_type: String,
}

#[derive(Debug)]
struct TokenState {
    token: Option<String>,
    token_type: String,
    expires_at_ms: i64,
}

impl Default for TokenState {
    fn default() -> Self {
        Self {
            token: None,
            token_type: String::from(DEFAULT_TOKEN_TYPE),
            // Forces a refresh before first use.
            expires_at_ms: 0,
        }
    }
}

/// Wire shape of the token endpoint response.
#[derive(Debug, Deserialize)]
struct TokenEndpointResponse {
    access_token: String,
    expires_in: i64,
    token_type: Option<String>,
}

/// OAuth2 client-credentials strategy with in-place token rotation.
pub struct ClientCredentials {
    token_url: String,
    client_id: String,
    client_secret: String,
    scope: Option<String>,
    grant_type: Option<String>,
    refresh_buffer_ms: i64,
    http: Arc<dyn HttpClient>,
    state: Mutex<TokenState>,
}

impl ClientCredentials {
    fn is_expired(&self) -> bool {
        let state = self
            .state
            .lock()
            .expect("token state should not be poisoned");
        now_unix_ms() >= state.expires_at_ms
    }

    async fn refresh(&self) -> Result<(), AuthError> {
        let mut request = HttpRequest::post(self.token_url.as_str())
            .with_header("content-type", "application/x-www-form-urlencoded")
            .with_query("client_id", self.client_id.as_str())
            .with_query("client_secret", self.client_secret.as_str());

        if let Some(grant_type) = &self.grant_type {
            request = request.with_query("grant_type", grant_type.as_str());
        }

        if let Some(scope) = &self.scope {
            request = request.with_query("scope", scope.as_str());
        }

        let response = self
            .http
            .execute(request)
            .await
            .map_err(|error| AuthError::Transport(error.message().to_owned()))?;

        if !response.is_success() {
            return Err(AuthError::TokenEndpointStatus {
                status: response.status,
                body: response.body,
            });
        }

        let payload = serde_json::from_str::<TokenEndpointResponse>(&response.body)
            .map_err(|error| AuthError::MalformedTokenResponse(error.to_string()))?;

        let expires_at_ms = now_unix_ms() + payload.expires_in * 1_000 - self.refresh_buffer_ms;

        let mut state = self
            .state
            .lock()
            .expect("token state should not be poisoned");
        state.token = Some(payload.access_token);
        state.token_type = payload
            .token_type
            .unwrap_or_else(|| String::from(DEFAULT_TOKEN_TYPE));
        state.expires_at_ms = expires_at_ms;

        tracing::debug!(expires_at_ms, "rotated client-credentials token");
        Ok(())
    }

    async fn get_token(&self) -> Result<Token, AuthError> {
        if self.is_expired() {
            self.refresh().await?;
        }

        let state = self
            .state
            .lock()
            .expect("token state should not be poisoned");
        let token = state.token.clone().ok_or(AuthError::MissingToken)?;

        Ok(Token {
            token,
            token_type: state.token_type.clone(),
        })
    }
}

fn now_unix_ms() -> i64 {
    (OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000) as i64
}
