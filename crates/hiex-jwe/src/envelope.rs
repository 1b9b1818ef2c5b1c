// crates/hiex-jwe/src/envelope.rs
// ============================================================================
// Module: Compact Envelopes
// Description: Five-segment compact envelope representation.
// Purpose: Hold produced envelopes and read protected headers without keys.
// Dependencies: base64, serde_json
// ============================================================================

//! ## Overview
//! A compact envelope is five base64url segments joined with `.`:
//! protected header, encrypted key, initialization vector, ciphertext, and
//! authentication tag. Envelopes are immutable once produced. The protected
//! header can be decoded without any key material, which is how response
//! operations inherit the correlation identifier from the request they
//! answer.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde_json::Map;
use serde_json::Value;

use crate::error::EnvelopeError;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Number of segments in a compact envelope.
pub const SEGMENT_COUNT: usize = 5;

// ============================================================================
// SECTION: Envelope
// ============================================================================

/// Immutable compact-serialized encrypted envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    /// The full compact form, segments joined with `.`.
    compact: String,
}

impl Envelope {
    /// Assembles an envelope from its five base64url segments.
    pub(crate) fn from_segments(segments: [String; SEGMENT_COUNT]) -> Self {
        Self {
            compact: segments.join("."),
        }
    }

    /// Parses compact envelope text, validating the segment structure.
    ///
    /// # Errors
    ///
    /// Returns [`EnvelopeError::MalformedEnvelope`] when the text does not
    /// split into five segments or a segment is not valid base64url. The
    /// encrypted-key segment must be non-empty; this profile always wraps a
    /// content key.
    pub fn from_compact(compact: impl Into<String>) -> Result<Self, EnvelopeError> {
        let compact = compact.into();
        let segments: Vec<&str> = compact.split('.').collect();
        if segments.len() != SEGMENT_COUNT {
            return Err(EnvelopeError::MalformedEnvelope(format!(
                "expected {SEGMENT_COUNT} segments, found {}",
                segments.len()
            )));
        }
        for (index, segment) in segments.iter().enumerate() {
            if segment.is_empty() {
                return Err(EnvelopeError::MalformedEnvelope(format!(
                    "segment {index} is empty"
                )));
            }
            URL_SAFE_NO_PAD.decode(segment).map_err(|err| {
                EnvelopeError::MalformedEnvelope(format!("segment {index} is not base64url: {err}"))
            })?;
        }
        Ok(Self {
            compact,
        })
    }

    /// Returns the compact serialized form.
    #[must_use]
    pub fn compact(&self) -> &str {
        &self.compact
    }

    /// Consumes the envelope, returning the compact form.
    #[must_use]
    pub fn into_compact(self) -> String {
        self.compact
    }

    /// Returns the base64url protected-header segment.
    #[must_use]
    pub fn protected_b64(&self) -> &str {
        self.compact.split('.').next().unwrap_or_default()
    }

    /// Decodes the protected header without decrypting the envelope.
    ///
    /// # Errors
    ///
    /// Returns [`EnvelopeError::MalformedEnvelope`] when the protected
    /// segment is not base64url-encoded JSON object text.
    pub fn decode_protected(&self) -> Result<Map<String, Value>, EnvelopeError> {
        let decoded = URL_SAFE_NO_PAD.decode(self.protected_b64()).map_err(|err| {
            EnvelopeError::MalformedEnvelope(format!("protected header is not base64url: {err}"))
        })?;
        let value: Value = serde_json::from_slice(&decoded).map_err(|err| {
            EnvelopeError::MalformedEnvelope(format!("protected header is not JSON: {err}"))
        })?;
        match value {
            Value::Object(map) => Ok(map),
            _ => Err(EnvelopeError::MalformedEnvelope(
                "protected header must be a JSON object".to_string(),
            )),
        }
    }
}

impl fmt::Display for Envelope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.compact)
    }
}
