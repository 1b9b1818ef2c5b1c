// crates/hiex-core/src/lib.rs
// ============================================================================
// Module: HIEX Core
// Description: Protocol data model for the HIEX outgoing gateway SDK.
// Purpose: Provide operations, headers, payload validation, and outcome types.
// Dependencies: serde, serde_json, thiserror, uuid
// ============================================================================

//! ## Overview
//! This crate defines the computation-only half of the outgoing pipeline:
//! the closed operation set with its per-variant policy table, strongly typed
//! protocol identifiers, protocol header construction and validation, the
//! pluggable payload validator seam, and the terminal outcome record. No
//! module in this crate performs I/O; everything here is deterministic given
//! its inputs (identifier generation excepted).

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod error;
pub mod headers;
pub mod identifiers;
pub mod operation;
pub mod outcome;
pub mod payload;
pub mod time;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use error::OutgoingError;
pub use headers::HeaderBuilder;
pub use headers::HeaderError;
pub use headers::ProtocolHeaders;
pub use identifiers::ApiCallId;
pub use identifiers::CorrelationId;
pub use identifiers::ParticipantCode;
pub use identifiers::WorkflowId;
pub use operation::Operation;
pub use operation::OperationFamily;
pub use outcome::ErrorDetail;
pub use outcome::OutcomeRecord;
pub use payload::DomainPayload;
pub use payload::PayloadValidator;
pub use payload::StructuralValidator;
pub use payload::ValidationReport;
pub use time::Timestamp;
