// crates/hiex-jwe/src/lib.rs
// ============================================================================
// Module: HIEX JWE
// Description: Compact encrypted envelope production for outgoing requests.
// Purpose: Seal protocol headers and payloads into five-part envelopes.
// Dependencies: hiex-core, aes-gcm, hkdf, x25519-dalek, base64, serde_json
// ============================================================================

//! ## Overview
//! This crate produces the encrypted artifact carried to the gateway: a
//! five-segment compact envelope (protected header, encrypted key,
//! initialization vector, ciphertext, authentication tag) in the RFC 7516
//! shape. The protocol headers ride inside the integrity-protected header
//! segment; the domain payload is the plaintext. Key agreement uses X25519
//! with an HKDF-SHA256 derived wrapping key; both the content key wrap and
//! the content encryption use AES-256-GCM. Every call draws a fresh content
//! key and initialization vector, so identical inputs never produce
//! identical envelopes.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod encrypt;
pub mod envelope;
pub mod error;
pub mod key;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use encrypt::CONTENT_ENCRYPTION;
pub use encrypt::EnvelopeEncryptor;
pub use encrypt::KEY_ALGORITHM;
pub use envelope::Envelope;
pub use error::EnvelopeError;
pub use key::RecipientKey;
