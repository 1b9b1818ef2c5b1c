// crates/hiex-core/tests/payload_validation.rs
// ============================================================================
// Module: Payload Validation Tests
// Description: Structural validator coverage across the operation table.
// Purpose: Validate fail-closed behavior for empty and malformed payloads.
// Dependencies: hiex-core, serde_json
// ============================================================================

//! ## Overview
//! Tests the structural validator for:
//! - Empty and malformed payloads never pass
//! - Document kind matched against the operation policy table
//! - Response documents require a non-empty outcome
//! - Passing documents for every operation variant

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only output and panic-based assertions are permitted."
)]

use hiex_core::DomainPayload;
use hiex_core::Operation;
use hiex_core::PayloadValidator;
use hiex_core::StructuralValidator;
use serde_json::json;

// ============================================================================
// SECTION: Test Helpers
// ============================================================================

/// Builds a minimal passing document for the given operation.
fn valid_document(operation: Operation) -> DomainPayload {
    let mut document = json!({
        "resourceType": operation.document_kind(),
        "id": "doc-001",
    });
    if operation.is_response() {
        document["outcome"] = json!("complete");
    }
    DomainPayload::new(document.to_string())
}

// ============================================================================
// SECTION: Fail-Closed Behavior
// ============================================================================

/// Tests that an empty payload yields at least one error.
#[test]
fn empty_payload_never_passes() {
    let report = StructuralValidator::new()
        .validate(&DomainPayload::from(""), Operation::ClaimSubmit);
    assert!(!report.is_ok());
    assert!(report.errors().contains_key("payload_empty"));
}

/// Tests that a whitespace-only payload yields at least one error.
#[test]
fn whitespace_payload_never_passes() {
    let report = StructuralValidator::new()
        .validate(&DomainPayload::from("   \n"), Operation::ClaimSubmit);
    assert!(!report.is_ok());
}

/// Tests that non-JSON payloads yield a malformed error.
#[test]
fn malformed_payload_never_passes() {
    let report = StructuralValidator::new()
        .validate(&DomainPayload::from("not json"), Operation::ClaimSubmit);
    assert!(report.errors().contains_key("payload_malformed"));
}

/// Tests that a JSON array payload is rejected.
#[test]
fn non_object_payload_never_passes() {
    let report =
        StructuralValidator::new().validate(&DomainPayload::from("[1, 2]"), Operation::ClaimSubmit);
    assert!(report.errors().contains_key("payload_not_object"));
}

// ============================================================================
// SECTION: Policy Table Selection
// ============================================================================

/// Tests that the expected document kind passes for every operation.
#[test]
fn valid_document_passes_for_every_operation() {
    let validator = StructuralValidator::new();
    for operation in Operation::ALL {
        let report = validator.validate(&valid_document(operation), operation);
        assert!(report.is_ok(), "operation {operation} failed: {}", report.summary());
    }
}

/// Tests that a mismatched document kind fails.
#[test]
fn document_kind_mismatch_fails() {
    let payload = DomainPayload::new(
        json!({"resourceType": "Claim", "id": "doc-001"}).to_string(),
    );
    let report = StructuralValidator::new()
        .validate(&payload, Operation::CoverageEligibilityCheck);
    assert!(report.errors().contains_key("document_kind_mismatch"));
}

/// Tests that a missing document id fails.
#[test]
fn missing_document_id_fails() {
    let payload = DomainPayload::new(json!({"resourceType": "Claim"}).to_string());
    let report = StructuralValidator::new().validate(&payload, Operation::ClaimSubmit);
    assert!(report.errors().contains_key("document_id_missing"));
}

/// Tests that response documents without an outcome fail.
#[test]
fn response_document_requires_outcome() {
    let payload = DomainPayload::new(
        json!({"resourceType": "ClaimResponse", "id": "doc-001"}).to_string(),
    );
    let report = StructuralValidator::new().validate(&payload, Operation::ClaimOnSubmit);
    assert!(report.errors().contains_key("document_outcome_missing"));
}

/// Tests that the report accumulates multiple errors in order.
#[test]
fn report_accumulates_multiple_errors() {
    let payload = DomainPayload::new(json!({}).to_string());
    let report = StructuralValidator::new().validate(&payload, Operation::ClaimOnSubmit);
    assert!(report.errors().len() >= 2);
    assert!(!report.summary().is_empty());
}
