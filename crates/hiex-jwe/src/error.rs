// crates/hiex-jwe/src/error.rs
// ============================================================================
// Module: Envelope Errors
// Description: Failure classes for envelope production and inspection.
// Purpose: Keep key, algorithm, and serialization failures distinct.
// Dependencies: thiserror
// ============================================================================

//! ## Overview
//! Envelope production fails closed: a malformed recipient key or an
//! unsupported algorithm pair is an error, never a silent downgrade.

// ============================================================================
// SECTION: Imports
// ============================================================================

use thiserror::Error;

// ============================================================================
// SECTION: Envelope Errors
// ============================================================================

/// Errors raised while producing or inspecting envelopes.
#[derive(Debug, Error)]
pub enum EnvelopeError {
    /// Recipient key is not a valid encryption key.
    #[error("malformed recipient key: {0}")]
    MalformedKey(String),
    /// Requested algorithm pair is not supported.
    #[error("unsupported algorithm pair: {alg}/{enc}")]
    UnsupportedAlgorithm {
        /// Requested key-management algorithm.
        alg: String,
        /// Requested content-encryption algorithm.
        enc: String,
    },
    /// Cipher operation failed.
    #[error("encryption failure: {0}")]
    Encryption(String),
    /// Compact envelope text does not have the expected shape.
    #[error("malformed envelope: {0}")]
    MalformedEnvelope(String),
}
