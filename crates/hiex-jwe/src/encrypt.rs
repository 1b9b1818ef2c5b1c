// crates/hiex-jwe/src/encrypt.rs
// ============================================================================
// Module: Envelope Encryptor
// Description: Seals headers and payloads into compact encrypted envelopes.
// Purpose: Perform key agreement, content-key wrap, and content encryption.
// Dependencies: hiex-core, aes-gcm, hkdf, sha2, x25519-dalek, rand, zeroize
// ============================================================================

//! ## Overview
//! Production walks the RFC 7516 shape: build the protected header from the
//! protocol headers plus algorithm identifiers and the ephemeral public key,
//! draw a fresh 256-bit content key, wrap it under an HKDF-SHA256 key
//! derived from X25519 agreement with the recipient key, then encrypt the
//! payload with AES-256-GCM binding the base64url protected header as
//! additional authenticated data. The wrap iv and tag ride in the protected
//! header; the content iv and tag are envelope segments of their own.

// ============================================================================
// SECTION: Imports
// ============================================================================

use aes_gcm::Aes256Gcm;
use aes_gcm::Key;
use aes_gcm::Nonce;
use aes_gcm::aead::Aead;
use aes_gcm::aead::KeyInit;
use aes_gcm::aead::Payload as AeadPayload;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use hiex_core::DomainPayload;
use hiex_core::ProtocolHeaders;
use hkdf::Hkdf;
use rand::RngCore;
use rand::rngs::OsRng;
use serde_json::Map;
use serde_json::Value;
use serde_json::json;
use sha2::Sha256;
use x25519_dalek::EphemeralSecret;
use x25519_dalek::PublicKey;
use zeroize::Zeroizing;

use crate::envelope::Envelope;
use crate::error::EnvelopeError;
use crate::key::RecipientKey;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Key-management algorithm identifier recorded in protected headers.
pub const KEY_ALGORITHM: &str = "ECDH-ES+A256GCMKW";
/// Content-encryption algorithm identifier recorded in protected headers.
pub const CONTENT_ENCRYPTION: &str = "A256GCM";
/// Content-key length in bytes.
const CEK_LENGTH: usize = 32;
/// AES-GCM initialization-vector length in bytes.
const IV_LENGTH: usize = 12;
/// AES-GCM authentication-tag length in bytes.
const TAG_LENGTH: usize = 16;
/// HKDF info string binding derived keys to this profile.
const KDF_INFO: &[u8] = b"hiex/jwe/key-wrap";

// ============================================================================
// SECTION: Encryptor
// ============================================================================

/// Envelope producer for a fixed, validated algorithm pair.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvelopeEncryptor;

impl EnvelopeEncryptor {
    /// Creates an encryptor for the requested algorithm pair.
    ///
    /// # Errors
    ///
    /// Returns [`EnvelopeError::UnsupportedAlgorithm`] for any pair other
    /// than [`KEY_ALGORITHM`] / [`CONTENT_ENCRYPTION`]; unknown algorithms
    /// fail here rather than degrading at encryption time.
    pub fn new(alg: &str, enc: &str) -> Result<Self, EnvelopeError> {
        if alg != KEY_ALGORITHM || enc != CONTENT_ENCRYPTION {
            return Err(EnvelopeError::UnsupportedAlgorithm {
                alg: alg.to_string(),
                enc: enc.to_string(),
            });
        }
        Ok(Self)
    }

    /// Creates an encryptor for the default supported pair.
    #[must_use]
    pub const fn supported() -> Self {
        Self
    }

    /// Seals the headers and payload for the recipient.
    ///
    /// Non-deterministic by design: a fresh content key, wrap iv, and
    /// content iv are drawn per call, so identical inputs yield distinct
    /// envelopes.
    ///
    /// # Errors
    ///
    /// Returns [`EnvelopeError`] when a cipher operation fails or the
    /// protected header cannot be serialized.
    pub fn encrypt(
        &self,
        headers: &ProtocolHeaders,
        payload: &DomainPayload,
        recipient: &RecipientKey,
    ) -> Result<Envelope, EnvelopeError> {
        // Key agreement and wrapping-key derivation.
        let ephemeral = EphemeralSecret::random_from_rng(OsRng);
        let ephemeral_public = PublicKey::from(&ephemeral);
        let shared = ephemeral.diffie_hellman(recipient.public());
        let mut kek = Zeroizing::new([0_u8; CEK_LENGTH]);
        Hkdf::<Sha256>::new(None, shared.as_bytes())
            .expand(KDF_INFO, &mut *kek)
            .map_err(|_| EnvelopeError::Encryption("key derivation failed".to_string()))?;

        // Fresh content key, wrapped under the derived key.
        let mut cek = Zeroizing::new([0_u8; CEK_LENGTH]);
        OsRng.fill_bytes(&mut *cek);
        let mut wrap_iv = [0_u8; IV_LENGTH];
        OsRng.fill_bytes(&mut wrap_iv);
        let cek_slice: &[u8] = &*cek;
        let wrap_cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&*kek));
        let wrapped = wrap_cipher
            .encrypt(Nonce::from_slice(&wrap_iv), cek_slice)
            .map_err(|_| EnvelopeError::Encryption("content-key wrap failed".to_string()))?;
        let (wrapped_key, wrap_tag) = split_tag(&wrapped)?;

        // Protected header binds headers, algorithms, and wrap parameters.
        let protected = build_protected_header(headers, &ephemeral_public, &wrap_iv, wrap_tag)?;
        let protected_json = serde_json::to_vec(&Value::Object(protected))
            .map_err(|err| EnvelopeError::Encryption(format!("header serialization: {err}")))?;
        let protected_b64 = URL_SAFE_NO_PAD.encode(&protected_json);

        // Content encryption with the protected header as AAD.
        let mut content_iv = [0_u8; IV_LENGTH];
        OsRng.fill_bytes(&mut content_iv);
        let content_cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&*cek));
        let sealed = content_cipher
            .encrypt(
                Nonce::from_slice(&content_iv),
                AeadPayload {
                    msg: payload.as_bytes(),
                    aad: protected_b64.as_bytes(),
                },
            )
            .map_err(|_| EnvelopeError::Encryption("content encryption failed".to_string()))?;
        let (ciphertext, content_tag) = split_tag(&sealed)?;

        Ok(Envelope::from_segments([
            protected_b64,
            URL_SAFE_NO_PAD.encode(wrapped_key),
            URL_SAFE_NO_PAD.encode(content_iv),
            URL_SAFE_NO_PAD.encode(ciphertext),
            URL_SAFE_NO_PAD.encode(content_tag),
        ]))
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Builds the protected header map from headers and wrap parameters.
fn build_protected_header(
    headers: &ProtocolHeaders,
    ephemeral_public: &PublicKey,
    wrap_iv: &[u8],
    wrap_tag: &[u8],
) -> Result<Map<String, Value>, EnvelopeError> {
    let Value::Object(mut protected) = headers.to_value() else {
        return Err(EnvelopeError::Encryption("headers must serialize to an object".to_string()));
    };
    protected.insert("alg".to_string(), Value::String(KEY_ALGORITHM.to_string()));
    protected.insert("enc".to_string(), Value::String(CONTENT_ENCRYPTION.to_string()));
    protected.insert(
        "epk".to_string(),
        json!({
            "kty": "OKP",
            "crv": "X25519",
            "x": URL_SAFE_NO_PAD.encode(ephemeral_public.as_bytes()),
        }),
    );
    protected.insert("iv".to_string(), Value::String(URL_SAFE_NO_PAD.encode(wrap_iv)));
    protected.insert("tag".to_string(), Value::String(URL_SAFE_NO_PAD.encode(wrap_tag)));
    Ok(protected)
}

/// Splits an AEAD output into ciphertext and trailing tag.
fn split_tag(sealed: &[u8]) -> Result<(&[u8], &[u8]), EnvelopeError> {
    if sealed.len() < TAG_LENGTH {
        return Err(EnvelopeError::Encryption("cipher output shorter than tag".to_string()));
    }
    Ok(sealed.split_at(sealed.len() - TAG_LENGTH))
}
