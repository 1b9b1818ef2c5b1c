// crates/hiex-core/src/headers.rs
// ============================================================================
// Module: HIEX Protocol Headers
// Description: Protocol header set and its validating builder.
// Purpose: Assemble the reserved header fields embedded in every envelope.
// Dependencies: crate::{identifiers, operation, time}, serde, serde_json
// ============================================================================

//! ## Overview
//! Protocol headers travel inside the integrity-protected segment of the
//! envelope. The builder is the only way to obtain a populated header set:
//! it generates missing message identifiers, enforces the status rule for
//! response operations, and rejects domain headers that collide with the
//! reserved prefix. Construction is pure; no I/O happens here.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::identifiers::ApiCallId;
use crate::identifiers::CorrelationId;
use crate::identifiers::ParticipantCode;
use crate::identifiers::WorkflowId;
use crate::operation::Operation;
use crate::time::Timestamp;

// ============================================================================
// SECTION: Header Names
// ============================================================================

/// Reserved protocol header field names.
pub mod names {
    /// Prefix owned by the protocol; domain headers must not use it.
    pub const RESERVED_PREFIX: &str = "x-hie-";
    /// Sender participant code.
    pub const SENDER_CODE: &str = "x-hie-sender_code";
    /// Recipient participant code.
    pub const RECIPIENT_CODE: &str = "x-hie-recipient_code";
    /// Api-call identifier, unique per message.
    pub const API_CALL_ID: &str = "x-hie-api_call_id";
    /// Correlation identifier, shared across one cycle.
    pub const CORRELATION_ID: &str = "x-hie-correlation_id";
    /// Optional workflow identifier grouping cycles.
    pub const WORKFLOW_ID: &str = "x-hie-workflow_id";
    /// Header-set creation time in epoch milliseconds.
    pub const TIMESTAMP: &str = "x-hie-timestamp";
    /// Workflow status, required on response operations only.
    pub const STATUS: &str = "x-hie-status";
}

// ============================================================================
// SECTION: Header Errors
// ============================================================================

/// Field-level errors raised during header construction.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HeaderError {
    /// Sender participant code is empty.
    #[error("sender code must not be blank")]
    MissingSenderCode,
    /// Recipient participant code is empty.
    #[error("recipient code must not be blank")]
    MissingRecipientCode,
    /// Response operation submitted without a workflow status.
    #[error("operation {0} requires a status header")]
    MissingStatus(String),
    /// Initiating operation submitted with a workflow status.
    #[error("operation {0} must not carry a status header")]
    UnexpectedStatus(String),
    /// Domain header uses a protocol-reserved key.
    #[error("domain header collides with reserved key: {0}")]
    ReservedKeyCollision(String),
    /// Prior envelope supplied for correlation inheritance is unreadable.
    #[error("prior envelope is malformed: {0}")]
    MalformedPriorEnvelope(String),
}

// ============================================================================
// SECTION: Protocol Headers
// ============================================================================

/// Populated, validated protocol header set.
///
/// # Invariants
/// - Sender and recipient codes are non-blank.
/// - Api-call and correlation identifiers are present and non-blank.
/// - The status field is present if and only if the originating operation
///   was a response variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProtocolHeaders {
    /// Ordered header entries, protocol fields and domain fields merged.
    entries: BTreeMap<String, Value>,
}

impl ProtocolHeaders {
    /// Returns the sender participant code.
    #[must_use]
    pub fn sender_code(&self) -> Option<&str> {
        self.entries.get(names::SENDER_CODE).and_then(Value::as_str)
    }

    /// Returns the recipient participant code.
    #[must_use]
    pub fn recipient_code(&self) -> Option<&str> {
        self.entries.get(names::RECIPIENT_CODE).and_then(Value::as_str)
    }

    /// Returns the api-call identifier.
    #[must_use]
    pub fn api_call_id(&self) -> Option<ApiCallId> {
        self.entries
            .get(names::API_CALL_ID)
            .and_then(Value::as_str)
            .map(ApiCallId::new)
    }

    /// Returns the correlation identifier.
    #[must_use]
    pub fn correlation_id(&self) -> Option<CorrelationId> {
        self.entries
            .get(names::CORRELATION_ID)
            .and_then(Value::as_str)
            .map(CorrelationId::new)
    }

    /// Returns the workflow status, present on response operations.
    #[must_use]
    pub fn status(&self) -> Option<&str> {
        self.entries.get(names::STATUS).and_then(Value::as_str)
    }

    /// Returns the header-set creation timestamp.
    #[must_use]
    pub fn timestamp(&self) -> Option<Timestamp> {
        self.entries
            .get(names::TIMESTAMP)
            .and_then(Value::as_i64)
            .map(Timestamp::from_unix_millis)
    }

    /// Returns the named header entry, if present.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.entries.get(name)
    }

    /// Returns the header set as a JSON object value.
    #[must_use]
    pub fn to_value(&self) -> Value {
        Value::Object(
            self.entries
                .iter()
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect(),
        )
    }

    /// Iterates over the ordered header entries.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.entries.iter()
    }
}

// ============================================================================
// SECTION: Header Builder
// ============================================================================

/// Validating builder for [`ProtocolHeaders`].
#[derive(Debug, Clone)]
pub struct HeaderBuilder {
    /// Operation deciding the status-header rule.
    operation: Operation,
    /// Sender participant code.
    sender_code: ParticipantCode,
    /// Recipient participant code.
    recipient_code: ParticipantCode,
    /// Caller-supplied api-call identifier, generated when blank.
    api_call_id: Option<String>,
    /// Caller-supplied correlation identifier, generated when blank.
    correlation_id: Option<String>,
    /// Correlation identifier inherited from a prior envelope.
    inherited_correlation: Option<CorrelationId>,
    /// Optional workflow identifier.
    workflow_id: Option<WorkflowId>,
    /// Workflow status for response operations.
    status: Option<String>,
    /// Caller-supplied domain headers, merged verbatim.
    domain_headers: BTreeMap<String, Value>,
}

impl HeaderBuilder {
    /// Creates a builder for the given operation and participant pair.
    #[must_use]
    pub fn new(
        operation: Operation,
        sender_code: ParticipantCode,
        recipient_code: ParticipantCode,
    ) -> Self {
        Self {
            operation,
            sender_code,
            recipient_code,
            api_call_id: None,
            correlation_id: None,
            inherited_correlation: None,
            workflow_id: None,
            status: None,
            domain_headers: BTreeMap::new(),
        }
    }

    /// Supplies an explicit api-call identifier; blank values are ignored.
    #[must_use]
    pub fn api_call_id(mut self, id: impl Into<String>) -> Self {
        self.api_call_id = Some(id.into());
        self
    }

    /// Supplies an explicit correlation identifier; blank values are ignored.
    #[must_use]
    pub fn correlation_id(mut self, id: impl Into<String>) -> Self {
        self.correlation_id = Some(id.into());
        self
    }

    /// Supplies a correlation identifier inherited from a prior envelope.
    ///
    /// An explicit non-blank correlation identifier takes precedence.
    #[must_use]
    pub fn inherited_correlation(mut self, id: CorrelationId) -> Self {
        self.inherited_correlation = Some(id);
        self
    }

    /// Supplies a workflow identifier.
    #[must_use]
    pub fn workflow_id(mut self, id: WorkflowId) -> Self {
        self.workflow_id = Some(id);
        self
    }

    /// Supplies the workflow status for response operations.
    #[must_use]
    pub fn status(mut self, status: impl Into<String>) -> Self {
        self.status = Some(status.into());
        self
    }

    /// Merges caller domain headers into the set.
    #[must_use]
    pub fn domain_headers(mut self, headers: BTreeMap<String, Value>) -> Self {
        self.domain_headers = headers;
        self
    }

    /// Builds the validated header set.
    ///
    /// # Errors
    ///
    /// Returns [`HeaderError`] when a participant code is blank, the status
    /// rule for the operation is violated, or a domain header collides with
    /// the reserved prefix.
    pub fn build(self) -> Result<ProtocolHeaders, HeaderError> {
        if self.sender_code.is_blank() {
            return Err(HeaderError::MissingSenderCode);
        }
        if self.recipient_code.is_blank() {
            return Err(HeaderError::MissingRecipientCode);
        }

        let status = self.status.filter(|value| !value.trim().is_empty());
        if self.operation.is_response() {
            if status.is_none() {
                return Err(HeaderError::MissingStatus(self.operation.to_string()));
            }
        } else if status.is_some() {
            return Err(HeaderError::UnexpectedStatus(self.operation.to_string()));
        }

        let api_call_id = self
            .api_call_id
            .filter(|value| !value.trim().is_empty())
            .map_or_else(ApiCallId::generate, ApiCallId::new);
        let correlation_id = self
            .correlation_id
            .filter(|value| !value.trim().is_empty())
            .map(CorrelationId::new)
            .or(self.inherited_correlation)
            .unwrap_or_else(CorrelationId::generate);

        let mut entries = BTreeMap::new();
        for (key, value) in self.domain_headers {
            if key.starts_with(names::RESERVED_PREFIX) {
                return Err(HeaderError::ReservedKeyCollision(key));
            }
            entries.insert(key, value);
        }

        entries.insert(
            names::SENDER_CODE.to_string(),
            Value::String(self.sender_code.as_str().to_string()),
        );
        entries.insert(
            names::RECIPIENT_CODE.to_string(),
            Value::String(self.recipient_code.as_str().to_string()),
        );
        entries.insert(
            names::API_CALL_ID.to_string(),
            Value::String(api_call_id.as_str().to_string()),
        );
        entries.insert(
            names::CORRELATION_ID.to_string(),
            Value::String(correlation_id.as_str().to_string()),
        );
        entries.insert(
            names::TIMESTAMP.to_string(),
            Value::from(Timestamp::now().as_unix_millis()),
        );
        if let Some(workflow_id) = self.workflow_id {
            entries.insert(
                names::WORKFLOW_ID.to_string(),
                Value::String(workflow_id.as_str().to_string()),
            );
        }
        if let Some(status) = status {
            entries.insert(names::STATUS.to_string(), Value::String(status));
        }

        Ok(ProtocolHeaders {
            entries,
        })
    }
}
