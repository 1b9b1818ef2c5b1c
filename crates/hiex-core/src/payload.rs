// crates/hiex-core/src/payload.rs
// ============================================================================
// Module: HIEX Domain Payload
// Description: Opaque domain payloads and the pluggable validator seam.
// Purpose: Gate the pipeline on operation-specific structural validation.
// Dependencies: crate::operation, serde_json
// ============================================================================

//! ## Overview
//! The pipeline treats the domain document as an opaque blob; only the
//! validator inspects it, and only through the [`PayloadValidator`] seam so
//! hosts can plug in a full implementation-guide engine. The bundled
//! [`StructuralValidator`] applies the structural floor: the payload must be
//! a JSON object declaring the document kind the operation's policy table
//! expects. An empty or malformed payload never validates.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use serde_json::Value;

use crate::operation::Operation;

// ============================================================================
// SECTION: Domain Payload
// ============================================================================

/// Opaque domain document, immutable for the lifetime of a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomainPayload(String);

impl DomainPayload {
    /// Wraps a serialized domain document.
    #[must_use]
    pub fn new(payload: impl Into<String>) -> Self {
        Self(payload.into())
    }

    /// Returns the payload as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the payload bytes used as envelope plaintext.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }

    /// Returns true when the payload is empty or whitespace-only.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl From<&str> for DomainPayload {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for DomainPayload {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

// ============================================================================
// SECTION: Validation Report
// ============================================================================

/// Outcome of payload validation: pass, or an ordered code→message map.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    /// Field-level errors keyed by stable error code.
    errors: BTreeMap<String, String>,
}

impl ValidationReport {
    /// Creates an empty (passing) report.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            errors: BTreeMap::new(),
        }
    }

    /// Records a field-level validation error.
    pub fn push(&mut self, code: impl Into<String>, message: impl Into<String>) {
        self.errors.insert(code.into(), message.into());
    }

    /// Returns true when no errors were recorded.
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }

    /// Returns the ordered error map.
    #[must_use]
    pub const fn errors(&self) -> &BTreeMap<String, String> {
        &self.errors
    }

    /// Renders the errors as a single `code: message` summary line.
    #[must_use]
    pub fn summary(&self) -> String {
        self.errors
            .iter()
            .map(|(code, message)| format!("{code}: {message}"))
            .collect::<Vec<_>>()
            .join("; ")
    }
}

// ============================================================================
// SECTION: Validator Seam
// ============================================================================

/// Pluggable payload validator selected by the host.
///
/// Validation rules are chosen purely by [`Operation`]; implementations must
/// be side-effect free and safe to call concurrently.
pub trait PayloadValidator: Send + Sync {
    /// Validates the payload against the rules for the given operation.
    fn validate(&self, payload: &DomainPayload, operation: Operation) -> ValidationReport;
}

// ============================================================================
// SECTION: Structural Validator
// ============================================================================

/// Default validator enforcing the structural floor for every operation.
#[derive(Debug, Clone, Copy, Default)]
pub struct StructuralValidator;

impl StructuralValidator {
    /// Creates the structural validator.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl PayloadValidator for StructuralValidator {
    fn validate(&self, payload: &DomainPayload, operation: Operation) -> ValidationReport {
        let mut report = ValidationReport::new();
        if payload.is_blank() {
            report.push("payload_empty", "payload must not be empty");
            return report;
        }
        let document: Value = match serde_json::from_str(payload.as_str()) {
            Ok(document) => document,
            Err(err) => {
                report.push("payload_malformed", format!("payload is not valid JSON: {err}"));
                return report;
            }
        };
        let Value::Object(fields) = document else {
            report.push("payload_not_object", "payload must be a JSON object");
            return report;
        };

        let expected_kind = operation.document_kind();
        match fields.get("resourceType").and_then(Value::as_str) {
            Some(kind) if kind == expected_kind => {}
            Some(kind) => {
                report.push(
                    "document_kind_mismatch",
                    format!("expected document kind {expected_kind}, found {kind}"),
                );
            }
            None => {
                report.push("document_kind_missing", "payload must declare resourceType");
            }
        }

        match fields.get("id").and_then(Value::as_str) {
            Some(id) if !id.trim().is_empty() => {}
            _ => report.push("document_id_missing", "payload must carry a non-empty id"),
        }

        if operation.is_response() {
            let has_outcome = fields
                .get("outcome")
                .and_then(Value::as_str)
                .is_some_and(|outcome| !outcome.trim().is_empty());
            if !has_outcome {
                report.push(
                    "document_outcome_missing",
                    format!("{expected_kind} must carry a non-empty outcome"),
                );
            }
        }

        report
    }
}
