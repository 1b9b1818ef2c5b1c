// crates/hiex-core/src/error.rs
// ============================================================================
// Module: HIEX Error Taxonomy
// Description: Failure classes for the outgoing request pipeline.
// Purpose: Give every pipeline stage a typed error with a stable code.
// Dependencies: crate::{headers, payload}, thiserror
// ============================================================================

//! ## Overview
//! Each pipeline stage surfaces exactly one class from this taxonomy. All
//! classes except [`OutgoingError::Internal`] are expected failures: the
//! orchestrator recovers them into a failure outcome record instead of
//! propagating. [`OutgoingError::is_transient`] drives the bounded retry
//! policy; only transient-classed failures are ever retried.

// ============================================================================
// SECTION: Imports
// ============================================================================

use thiserror::Error;

use crate::headers::HeaderError;
use crate::payload::ValidationReport;

// ============================================================================
// SECTION: Outgoing Errors
// ============================================================================

/// Failure classes recoverable at the orchestrator boundary.
#[derive(Debug, Clone, Error)]
pub enum OutgoingError {
    /// Payload failed the operation's validation rules.
    #[error("payload validation failed: {}", .0.summary())]
    Validation(ValidationReport),
    /// Required header field missing or conflicting.
    #[error("header construction failed: {0}")]
    Header(#[from] HeaderError),
    /// Recipient key could not be resolved.
    #[error("key resolution failed: {message}")]
    KeyResolution {
        /// Resolution failure description.
        message: String,
        /// True when the registry was unreachable rather than rejecting.
        transient: bool,
    },
    /// Envelope encryption failed.
    #[error("envelope encryption failed: {message}")]
    Encryption {
        /// Encryption failure description.
        message: String,
    },
    /// Gateway credential fetch failed.
    #[error("gateway authentication failed: {message}")]
    Auth {
        /// Authentication failure description.
        message: String,
        /// True when the auth endpoint was unreachable rather than rejecting.
        transient: bool,
    },
    /// Gateway rejected the request (4xx, never retried).
    #[error("gateway rejected request with status {status}: {message}")]
    GatewayClient {
        /// HTTP status returned by the gateway.
        status: u16,
        /// Gateway error body or status description.
        message: String,
    },
    /// Gateway was unreachable or failed transiently (5xx, timeout).
    #[error("gateway transient failure: {message}")]
    GatewayTransient {
        /// Transport or gateway failure description.
        message: String,
    },
    /// Unexpected internal fault, always fatal to the request.
    #[error("internal error: {message}")]
    Internal {
        /// Internal fault description.
        message: String,
    },
}

impl OutgoingError {
    /// Returns the stable error code surfaced in outcome records.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "ERR_INVALID_PAYLOAD",
            Self::Header(_) => "ERR_INVALID_HEADER",
            Self::KeyResolution { .. } => "ERR_KEY_RESOLUTION",
            Self::Encryption { .. } => "ERR_ENCRYPTION",
            Self::Auth { .. } => "ERR_AUTH",
            Self::GatewayClient { .. } => "ERR_GATEWAY_CLIENT",
            Self::GatewayTransient { .. } => "ERR_GATEWAY_TRANSIENT",
            Self::Internal { .. } => "ERR_INTERNAL",
        }
    }

    /// Returns true when the failure class is retryable with backoff.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        match self {
            Self::GatewayTransient { .. } => true,
            Self::KeyResolution { transient, .. } | Self::Auth { transient, .. } => *transient,
            Self::Validation(_)
            | Self::Header(_)
            | Self::Encryption { .. }
            | Self::GatewayClient { .. }
            | Self::Internal { .. } => false,
        }
    }
}
