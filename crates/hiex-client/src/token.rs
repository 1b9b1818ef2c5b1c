// crates/hiex-client/src/token.rs
// ============================================================================
// Module: Gateway Token Manager
// Description: Password-grant token acquisition with leeway-aware caching.
// Purpose: Keep one fresh bearer token per client, refreshed on demand.
// Dependencies: hiex-core, reqwest, serde, thiserror, tokio, tracing
// ============================================================================

//! ## Overview
//! The gateway authenticates requests with short-lived bearer tokens issued
//! by a password-grant token endpoint. The manager caches the current token
//! and treats it as expired a configurable leeway before its nominal expiry,
//! so a token never goes stale mid-dispatch. Concurrent refreshes coalesce
//! into a single token request, and a failed refresh never discards a token
//! that is still within its leeway window.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::time::Duration;
use std::time::Instant;

use serde::Deserialize;
use thiserror::Error;
use tokio::sync::RwLock;

use hiex_core::OutgoingError;

use crate::flight::FlightGroup;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Flight key for the single token refresh this manager coalesces on.
const TOKEN_FLIGHT_KEY: &str = "gateway-token";

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Failures while acquiring a gateway bearer token.
#[derive(Debug, Clone, Error)]
pub enum AuthError {
    /// The token endpoint could not be reached or answered with a server
    /// fault.
    #[error("token endpoint unreachable: {0}")]
    Unreachable(String),
    /// The token endpoint rejected the credentials.
    #[error("token endpoint rejected credentials with status {status}")]
    Rejected {
        /// HTTP status returned by the token endpoint.
        status: u16,
    },
    /// The token endpoint answered with a body this client cannot interpret.
    #[error("token response invalid: {0}")]
    Invalid(String),
}

impl AuthError {
    /// Whether retrying the token request may succeed without new
    /// credentials.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Unreachable(_))
    }
}

impl From<AuthError> for OutgoingError {
    fn from(error: AuthError) -> Self {
        Self::Auth {
            transient: error.is_transient(),
            message: error.to_string(),
        }
    }
}

// ============================================================================
// SECTION: Auth Token
// ============================================================================

/// A bearer token with its local expiry deadline.
#[derive(Clone)]
pub struct AuthToken {
    /// Raw bearer value sent in the Authorization header.
    bearer: String,
    /// Instant at which the issuer considers the token expired.
    expires_at: Instant,
}

impl AuthToken {
    /// Creates a token expiring after the given lifetime.
    #[must_use]
    pub fn new(bearer: String, lifetime: Duration) -> Self {
        Self {
            bearer,
            expires_at: Instant::now() + lifetime,
        }
    }

    /// Raw bearer value.
    #[must_use]
    pub fn bearer(&self) -> &str {
        &self.bearer
    }

    /// Whether the token remains valid for at least the leeway window.
    #[must_use]
    pub fn is_fresh(&self, leeway: Duration) -> bool {
        Instant::now() + leeway < self.expires_at
    }
}

impl fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthToken")
            .field("bearer", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

// ============================================================================
// SECTION: Token Manager
// ============================================================================

/// Body of a successful password-grant token response.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    /// Issued bearer token.
    access_token: String,
    /// Token lifetime in seconds.
    expires_in: u64,
}

/// Caching password-grant token client for the gateway.
pub struct TokenManager {
    /// Shared HTTP client.
    http: reqwest::Client,
    /// Absolute URL of the token endpoint.
    token_url: String,
    /// Participant code presented as the client identifier.
    participant_code: String,
    /// Grant username.
    username: String,
    /// Grant password.
    password: String,
    /// Expiry leeway applied before the nominal deadline.
    leeway: Duration,
    /// The most recently issued token.
    current: RwLock<Option<AuthToken>>,
    /// In-flight refresh coalescing.
    flight: FlightGroup<AuthToken, AuthError>,
}

impl TokenManager {
    /// Creates a token manager for the given endpoint and credentials.
    #[must_use]
    pub fn new(
        http: reqwest::Client,
        token_url: String,
        participant_code: String,
        username: String,
        password: String,
        leeway: Duration,
    ) -> Self {
        Self {
            http,
            token_url,
            participant_code,
            username,
            password,
            leeway,
            current: RwLock::new(None),
            flight: FlightGroup::new(),
        }
    }

    /// Returns a fresh bearer token, refreshing it when needed.
    ///
    /// # Errors
    ///
    /// Returns an [`AuthError`] when no fresh token is cached and the token
    /// endpoint cannot issue a new one.
    pub async fn bearer(&self) -> Result<AuthToken, AuthError> {
        if let Some(token) = self.cached().await {
            return Ok(token);
        }

        self.flight
            .run(TOKEN_FLIGHT_KEY, || async {
                if let Some(token) = self.cached().await {
                    return Ok(token);
                }

                let token = self.request_token().await?;
                tracing::debug!("refreshed gateway bearer token");
                // A refresh failure above leaves any prior token in place.
                *self.current.write().await = Some(token.clone());
                Ok(token)
            })
            .await
    }

    /// Returns the cached token when it is still within its leeway window.
    async fn cached(&self) -> Option<AuthToken> {
        let current = self.current.read().await;
        current
            .as_ref()
            .filter(|token| token.is_fresh(self.leeway))
            .cloned()
    }

    /// Performs one password-grant request against the token endpoint.
    async fn request_token(&self) -> Result<AuthToken, AuthError> {
        let form = [
            ("grant_type", "password"),
            ("client_id", self.participant_code.as_str()),
            ("username", self.username.as_str()),
            ("password", self.password.as_str()),
        ];

        let response = self
            .http
            .post(&self.token_url)
            .form(&form)
            .send()
            .await
            .map_err(|error| AuthError::Unreachable(error.to_string()))?;

        let status = response.status();
        if status.is_server_error() {
            return Err(AuthError::Unreachable(format!(
                "token endpoint answered with status {}",
                status.as_u16()
            )));
        }
        if !status.is_success() {
            return Err(AuthError::Rejected {
                status: status.as_u16(),
            });
        }

        let body: TokenResponse = response
            .json()
            .await
            .map_err(|error| AuthError::Invalid(error.to_string()))?;
        if body.access_token.trim().is_empty() {
            return Err(AuthError::Invalid(
                "token endpoint issued an empty access token".to_string(),
            ));
        }

        Ok(AuthToken::new(
            body.access_token,
            Duration::from_secs(body.expires_in),
        ))
    }
}
