// crates/hiex-core/tests/header_builder.rs
// ============================================================================
// Module: Header Builder Tests
// Description: Rule coverage for protocol header construction.
// Purpose: Validate identifier generation, status rules, and reserved keys.
// Dependencies: hiex-core, serde_json
// ============================================================================

//! ## Overview
//! Tests the header builder for:
//! - Identifier generation when the caller supplies blank ids
//! - Echoing explicit identifiers unchanged
//! - Status required on response operations, rejected on initiating ones
//! - Reserved-prefix collision detection in domain headers
//! - Correlation inheritance precedence

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

use std::collections::BTreeMap;

use hiex_core::CorrelationId;
use hiex_core::HeaderBuilder;
use hiex_core::HeaderError;
use hiex_core::Operation;
use hiex_core::ParticipantCode;
use hiex_core::headers::names;
use serde_json::Value;
use serde_json::json;

// ============================================================================
// SECTION: Test Helpers
// ============================================================================

/// Returns a builder for an initiating operation with valid codes.
fn action_builder() -> HeaderBuilder {
    HeaderBuilder::new(
        Operation::ClaimSubmit,
        ParticipantCode::from("sender-001"),
        ParticipantCode::from("recipient-001"),
    )
}

/// Returns a builder for a response operation with valid codes.
fn on_action_builder() -> HeaderBuilder {
    HeaderBuilder::new(
        Operation::ClaimOnSubmit,
        ParticipantCode::from("sender-001"),
        ParticipantCode::from("recipient-001"),
    )
}

// ============================================================================
// SECTION: Identifier Generation
// ============================================================================

/// Tests that blank identifiers are replaced with fresh generated ones.
#[test]
fn generates_identifiers_when_blank() {
    let headers = action_builder().api_call_id("").correlation_id("   ").build().unwrap();
    let api_call_id = headers.api_call_id().unwrap();
    let correlation_id = headers.correlation_id().unwrap();
    assert!(!api_call_id.as_str().is_empty());
    assert!(!correlation_id.as_str().is_empty());
    assert_ne!(api_call_id.as_str(), correlation_id.as_str());
}

/// Tests that explicit identifiers are echoed unchanged.
#[test]
fn echoes_explicit_identifiers() {
    let headers = action_builder()
        .api_call_id("api-123")
        .correlation_id("corr-456")
        .build()
        .unwrap();
    assert_eq!(headers.api_call_id().unwrap().as_str(), "api-123");
    assert_eq!(headers.correlation_id().unwrap().as_str(), "corr-456");
}

/// Tests that two builds without explicit ids produce distinct identifiers.
#[test]
fn generated_identifiers_are_unique_across_builds() {
    let first = action_builder().build().unwrap();
    let second = action_builder().build().unwrap();
    assert_ne!(
        first.api_call_id().unwrap().as_str(),
        second.api_call_id().unwrap().as_str()
    );
}

/// Tests that an explicit correlation id wins over an inherited one.
#[test]
fn explicit_correlation_wins_over_inherited() {
    let headers = on_action_builder()
        .status("response.complete")
        .correlation_id("explicit-corr")
        .inherited_correlation(CorrelationId::new("inherited-corr"))
        .build()
        .unwrap();
    assert_eq!(headers.correlation_id().unwrap().as_str(), "explicit-corr");
}

/// Tests that an inherited correlation id is used when no explicit id exists.
#[test]
fn inherited_correlation_used_when_no_explicit() {
    let headers = on_action_builder()
        .status("response.complete")
        .inherited_correlation(CorrelationId::new("inherited-corr"))
        .build()
        .unwrap();
    assert_eq!(headers.correlation_id().unwrap().as_str(), "inherited-corr");
}

// ============================================================================
// SECTION: Participant Code Rules
// ============================================================================

/// Tests that a blank sender code is rejected.
#[test]
fn rejects_blank_sender() {
    let result = HeaderBuilder::new(
        Operation::ClaimSubmit,
        ParticipantCode::from("  "),
        ParticipantCode::from("recipient-001"),
    )
    .build();
    assert_eq!(result.unwrap_err(), HeaderError::MissingSenderCode);
}

/// Tests that a blank recipient code is rejected.
#[test]
fn rejects_blank_recipient() {
    let result = HeaderBuilder::new(
        Operation::ClaimSubmit,
        ParticipantCode::from("sender-001"),
        ParticipantCode::from(""),
    )
    .build();
    assert_eq!(result.unwrap_err(), HeaderError::MissingRecipientCode);
}

// ============================================================================
// SECTION: Status Rules
// ============================================================================

/// Tests that response operations without a status are rejected.
#[test]
fn response_operation_requires_status() {
    let result = on_action_builder().build();
    assert!(matches!(result.unwrap_err(), HeaderError::MissingStatus(_)));
}

/// Tests that a blank status counts as missing on response operations.
#[test]
fn blank_status_counts_as_missing() {
    let result = on_action_builder().status("  ").build();
    assert!(matches!(result.unwrap_err(), HeaderError::MissingStatus(_)));
}

/// Tests that initiating operations reject a supplied status.
#[test]
fn action_operation_rejects_status() {
    let result = action_builder().status("response.complete").build();
    assert!(matches!(result.unwrap_err(), HeaderError::UnexpectedStatus(_)));
}

/// Tests that a response operation with a status builds and embeds it.
#[test]
fn response_operation_embeds_status() {
    let headers = on_action_builder().status("response.complete").build().unwrap();
    assert_eq!(headers.status(), Some("response.complete"));
}

// ============================================================================
// SECTION: Domain Header Merging
// ============================================================================

/// Tests that domain headers merge verbatim alongside protocol fields.
#[test]
fn merges_domain_headers() {
    let mut domain = BTreeMap::new();
    domain.insert("x-app-priority".to_string(), json!("stat"));
    let headers = action_builder().domain_headers(domain).build().unwrap();
    assert_eq!(headers.get("x-app-priority"), Some(&Value::String("stat".to_string())));
    assert_eq!(headers.sender_code(), Some("sender-001"));
}

/// Tests that a reserved-prefix domain header is an error, not an overwrite.
#[test]
fn rejects_reserved_key_collision() {
    let mut domain = BTreeMap::new();
    domain.insert(names::SENDER_CODE.to_string(), json!("spoofed"));
    let result = action_builder().domain_headers(domain).build();
    assert!(matches!(result.unwrap_err(), HeaderError::ReservedKeyCollision(_)));
}

/// Tests that the built header set always carries a timestamp.
#[test]
fn header_set_carries_timestamp() {
    let headers = action_builder().build().unwrap();
    assert!(headers.timestamp().unwrap().as_unix_millis() > 0);
}
