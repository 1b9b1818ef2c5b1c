// crates/hiex-jwe/src/key.rs
// ============================================================================
// Module: Recipient Keys
// Description: Recipient public encryption keys resolved from the registry.
// Purpose: Parse and hold X25519 public keys without leaking them into logs.
// Dependencies: x25519-dalek, base64
// ============================================================================

//! ## Overview
//! Recipient keys are 32-byte X25519 public keys transported as base64url
//! text in registry responses. The wrapper validates length on parse and
//! keeps key material out of `Debug` output; registry cache entries and
//! error messages never reproduce the raw key.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use x25519_dalek::PublicKey;

use crate::error::EnvelopeError;

// ============================================================================
// SECTION: Recipient Key
// ============================================================================

/// X25519 public encryption key of a registry participant.
#[derive(Clone, PartialEq, Eq)]
pub struct RecipientKey {
    /// Parsed public key point.
    public: PublicKey,
}

impl RecipientKey {
    /// Parses a recipient key from base64url text.
    ///
    /// # Errors
    ///
    /// Returns [`EnvelopeError::MalformedKey`] when the text is not valid
    /// base64url or does not decode to exactly 32 bytes.
    pub fn from_base64url(encoded: &str) -> Result<Self, EnvelopeError> {
        let decoded = URL_SAFE_NO_PAD
            .decode(encoded.trim())
            .map_err(|err| EnvelopeError::MalformedKey(format!("invalid base64url: {err}")))?;
        let bytes: [u8; 32] = decoded
            .try_into()
            .map_err(|_| EnvelopeError::MalformedKey("key must be 32 bytes".to_string()))?;
        Ok(Self {
            public: PublicKey::from(bytes),
        })
    }

    /// Wraps an already-parsed public key.
    #[must_use]
    pub const fn from_public(public: PublicKey) -> Self {
        Self {
            public,
        }
    }

    /// Returns the public key point.
    #[must_use]
    pub const fn public(&self) -> &PublicKey {
        &self.public
    }

    /// Returns the key as base64url text in registry form.
    #[must_use]
    pub fn to_base64url(&self) -> String {
        URL_SAFE_NO_PAD.encode(self.public.as_bytes())
    }
}

impl fmt::Debug for RecipientKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Key material stays out of logs and error chains.
        f.write_str("RecipientKey(redacted)")
    }
}
