// crates/hiex-client/src/dispatch.rs
// ============================================================================
// Module: Gateway Dispatcher
// Description: Delivery of sealed envelopes to the gateway's operation paths.
// Purpose: Post envelopes and classify gateway responses for retry handling.
// Dependencies: hiex-core, hiex-jwe, reqwest, serde_json, thiserror
// ============================================================================

//! ## Overview
//! Each protocol operation maps to a fixed path beneath the gateway base
//! URL. The dispatcher posts the compact envelope there with bearer
//! authentication and classifies the outcome: success with an optional
//! acknowledgement body, a client-side rejection that retrying cannot fix,
//! or a transient fault worth retrying.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde_json::Value;
use thiserror::Error;

use hiex_core::Operation;
use hiex_core::OutgoingError;
use hiex_jwe::Envelope;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Failures while delivering an envelope to the gateway.
#[derive(Debug, Clone, Error)]
pub enum DispatchError {
    /// The gateway rejected the request; retrying will not help.
    #[error("gateway rejected dispatch with status {status}: {message}")]
    Rejected {
        /// HTTP status returned by the gateway.
        status: u16,
        /// Gateway-provided rejection detail, possibly empty.
        message: String,
    },
    /// The gateway could not be reached or answered with a server fault.
    #[error("gateway dispatch failed transiently: {0}")]
    Transient(String),
}

impl From<DispatchError> for OutgoingError {
    fn from(error: DispatchError) -> Self {
        match error {
            DispatchError::Rejected { status, message } => {
                Self::GatewayClient { status, message }
            }
            DispatchError::Transient(message) => Self::GatewayTransient { message },
        }
    }
}

// ============================================================================
// SECTION: Acknowledgement
// ============================================================================

/// The gateway's acceptance of a dispatched envelope.
#[derive(Debug, Clone)]
pub struct GatewayAck {
    /// HTTP status returned by the gateway.
    pub status: u16,
    /// Parsed acknowledgement body, when the gateway returned JSON.
    pub body: Option<Value>,
}

// ============================================================================
// SECTION: Dispatcher
// ============================================================================

/// HTTP delivery client for the gateway's operation endpoints.
pub struct GatewayDispatcher {
    /// Shared HTTP client.
    http: reqwest::Client,
    /// Gateway base URL without a trailing slash.
    base_url: String,
}

impl GatewayDispatcher {
    /// Creates a dispatcher for the given gateway base URL.
    #[must_use]
    pub fn new(http: reqwest::Client, base_url: &str) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Full URL of the endpoint serving the given operation.
    #[must_use]
    pub fn endpoint(&self, operation: Operation) -> String {
        format!("{}{}", self.base_url, operation.path())
    }

    /// Delivers the envelope to the operation's endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::Transient`] for connection faults and 5xx
    /// responses, and [`DispatchError::Rejected`] for any other non-success
    /// status.
    pub async fn dispatch(
        &self,
        operation: Operation,
        envelope: &Envelope,
        bearer: &str,
    ) -> Result<GatewayAck, DispatchError> {
        let body = serde_json::json!({ "payload": envelope.compact() });

        let response = self
            .http
            .post(self.endpoint(operation))
            .bearer_auth(bearer)
            .json(&body)
            .send()
            .await
            .map_err(|error| DispatchError::Transient(error.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(GatewayAck {
                status: status.as_u16(),
                body: response.json().await.ok(),
            });
        }
        if status.is_server_error() {
            return Err(DispatchError::Transient(format!(
                "gateway answered with status {}",
                status.as_u16()
            )));
        }

        let message = response.text().await.unwrap_or_default();
        Err(DispatchError::Rejected {
            status: status.as_u16(),
            message,
        })
    }
}
