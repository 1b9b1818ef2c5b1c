// crates/hiex-client/src/registry.rs
// ============================================================================
// Module: Participant Key Registry
// Description: Lookup of recipient encryption keys from the registry service.
// Purpose: Abstract registry access behind a trait with an HTTP default.
// Dependencies: async-trait, hiex-core, hiex-jwe, reqwest, serde, thiserror
// ============================================================================

//! ## Overview
//! The registry maps participant codes to published encryption keys. The
//! [`KeyRegistry`] trait is the seam the resolver caches behind; the shipped
//! [`HttpKeyRegistry`] implementation queries the registry's participant
//! search endpoint over HTTPS.

// ============================================================================
// SECTION: Imports
// ============================================================================

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;

use hiex_core::OutgoingError;
use hiex_core::ParticipantCode;
use hiex_jwe::RecipientKey;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Failures while resolving a recipient's encryption key.
#[derive(Debug, Clone, Error)]
pub enum RegistryError {
    /// The registry holds no participant with the requested code.
    #[error("no participant registered under code '{0}'")]
    UnknownRecipient(String),
    /// The participant exists but has not published an encryption key.
    #[error("participant '{0}' has no published encryption key")]
    MissingKey(String),
    /// The published key material could not be parsed.
    #[error("participant '{code}' published a malformed key: {message}")]
    MalformedKey {
        /// Participant whose key failed to parse.
        code: String,
        /// Parse failure detail.
        message: String,
    },
    /// The registry rejected the search request.
    #[error("registry rejected key lookup with status {status}")]
    Rejected {
        /// HTTP status returned by the registry.
        status: u16,
    },
    /// The registry could not be reached or answered with a server fault.
    #[error("registry unreachable: {0}")]
    Unreachable(String),
    /// The registry answered with a body this client cannot interpret.
    #[error("registry response invalid: {0}")]
    Invalid(String),
}

impl RegistryError {
    /// Whether retrying the lookup may succeed without operator action.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Unreachable(_))
    }
}

impl From<RegistryError> for OutgoingError {
    fn from(error: RegistryError) -> Self {
        Self::KeyResolution {
            transient: error.is_transient(),
            message: error.to_string(),
        }
    }
}

// ============================================================================
// SECTION: Registry Trait
// ============================================================================

/// Source of recipient encryption keys.
#[async_trait]
pub trait KeyRegistry: Send + Sync {
    /// Looks up the published encryption key for a participant.
    ///
    /// # Errors
    ///
    /// Returns a [`RegistryError`] when the participant is unknown, has no
    /// key, or the registry cannot be queried.
    async fn lookup_encryption_key(
        &self,
        recipient: &ParticipantCode,
    ) -> Result<RecipientKey, RegistryError>;
}

// ============================================================================
// SECTION: HTTP Registry
// ============================================================================

/// One participant record in a registry search response.
#[derive(Debug, Deserialize)]
struct ParticipantRecord {
    /// Registry-assigned participant code.
    participant_code: String,
    /// Published base64url encryption key, when present.
    encryption_key: Option<String>,
}

/// Body of a registry participant search response.
#[derive(Debug, Deserialize)]
struct SearchResponse {
    /// Matching participant records.
    #[serde(default)]
    participants: Vec<ParticipantRecord>,
}

/// [`KeyRegistry`] backed by the registry's HTTP search endpoint.
pub struct HttpKeyRegistry {
    /// Shared HTTP client.
    http: reqwest::Client,
    /// Registry base URL without a trailing slash.
    base_url: String,
}

impl HttpKeyRegistry {
    /// Creates a registry client for the given base URL.
    #[must_use]
    pub fn new(http: reqwest::Client, base_url: &str) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Full URL of the participant search endpoint.
    fn search_url(&self) -> String {
        format!("{}/participant/search", self.base_url)
    }
}

#[async_trait]
impl KeyRegistry for HttpKeyRegistry {
    async fn lookup_encryption_key(
        &self,
        recipient: &ParticipantCode,
    ) -> Result<RecipientKey, RegistryError> {
        let filter = serde_json::json!({
            "filters": {
                "participant_code": { "eq": recipient.as_str() }
            }
        });

        let response = self
            .http
            .post(self.search_url())
            .json(&filter)
            .send()
            .await
            .map_err(|error| RegistryError::Unreachable(error.to_string()))?;

        let status = response.status();
        if status.is_server_error() {
            return Err(RegistryError::Unreachable(format!(
                "registry answered with status {}",
                status.as_u16()
            )));
        }
        if !status.is_success() {
            return Err(RegistryError::Rejected {
                status: status.as_u16(),
            });
        }

        let body: SearchResponse = response
            .json()
            .await
            .map_err(|error| RegistryError::Invalid(error.to_string()))?;

        let record = body
            .participants
            .into_iter()
            .find(|record| record.participant_code == recipient.as_str())
            .ok_or_else(|| RegistryError::UnknownRecipient(recipient.as_str().to_string()))?;

        let encoded = record
            .encryption_key
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| RegistryError::MissingKey(recipient.as_str().to_string()))?;

        RecipientKey::from_base64url(&encoded).map_err(|error| RegistryError::MalformedKey {
            code: recipient.as_str().to_string(),
            message: error.to_string(),
        })
    }
}
