// crates/hiex-core/src/outcome.rs
// ============================================================================
// Module: HIEX Outcome Records
// Description: Terminal artifact of the outgoing request pipeline.
// Purpose: Carry either the success acknowledgment or the structured error.
// Dependencies: crate::{error, identifiers, time}, serde, serde_json
// ============================================================================

//! ## Overview
//! One outcome record is produced per request and never mutated afterwards.
//! The success branch echoes the message identifiers and carries the compact
//! envelope plus any gateway-echoed acknowledgment; the failure branch
//! carries exactly one structured error. The two branches are exclusive by
//! construction.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::error::OutgoingError;
use crate::identifiers::ApiCallId;
use crate::identifiers::CorrelationId;
use crate::time::Timestamp;

// ============================================================================
// SECTION: Error Detail
// ============================================================================

/// Structured error surfaced in a failure outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorDetail {
    /// Stable error code from the taxonomy.
    pub code: String,
    /// Human-readable failure description.
    pub message: String,
    /// Pipeline trace naming the failing stage and attempt count.
    pub trace: String,
}

// ============================================================================
// SECTION: Outcome Record
// ============================================================================

/// Terminal artifact of one outgoing request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OutcomeRecord {
    /// Request was dispatched and acknowledged by the gateway.
    Success {
        /// Outcome creation time in epoch milliseconds.
        timestamp: Timestamp,
        /// Correlation identifier of the cycle.
        correlation_id: CorrelationId,
        /// Api-call identifier of this message.
        api_call_id: ApiCallId,
        /// Compact serialized envelope that was dispatched.
        payload: String,
        /// Gateway-echoed acknowledgment body, when one was returned.
        #[serde(skip_serializing_if = "Option::is_none")]
        gateway_response: Option<Value>,
    },
    /// Pipeline failed at some stage.
    Failure {
        /// Outcome creation time in epoch milliseconds.
        timestamp: Timestamp,
        /// The single structured error that aborted the pipeline.
        error: ErrorDetail,
    },
}

impl OutcomeRecord {
    /// Creates a success outcome.
    #[must_use]
    pub fn success(
        correlation_id: CorrelationId,
        api_call_id: ApiCallId,
        payload: String,
        gateway_response: Option<Value>,
    ) -> Self {
        Self::Success {
            timestamp: Timestamp::now(),
            correlation_id,
            api_call_id,
            payload,
            gateway_response,
        }
    }

    /// Creates a failure outcome from a taxonomy error and stage trace.
    #[must_use]
    pub fn failure(error: &OutgoingError, trace: impl Into<String>) -> Self {
        Self::Failure {
            timestamp: Timestamp::now(),
            error: ErrorDetail {
                code: error.code().to_string(),
                message: error.to_string(),
                trace: trace.into(),
            },
        }
    }

    /// Returns true for the success branch.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// Returns the outcome timestamp.
    #[must_use]
    pub const fn timestamp(&self) -> Timestamp {
        match self {
            Self::Success { timestamp, .. } | Self::Failure { timestamp, .. } => *timestamp,
        }
    }

    /// Returns the correlation identifier on the success branch.
    #[must_use]
    pub const fn correlation_id(&self) -> Option<&CorrelationId> {
        match self {
            Self::Success { correlation_id, .. } => Some(correlation_id),
            Self::Failure { .. } => None,
        }
    }

    /// Returns the api-call identifier on the success branch.
    #[must_use]
    pub const fn api_call_id(&self) -> Option<&ApiCallId> {
        match self {
            Self::Success { api_call_id, .. } => Some(api_call_id),
            Self::Failure { .. } => None,
        }
    }

    /// Returns the dispatched compact envelope on the success branch.
    #[must_use]
    pub fn envelope(&self) -> Option<&str> {
        match self {
            Self::Success { payload, .. } => Some(payload.as_str()),
            Self::Failure { .. } => None,
        }
    }

    /// Returns the structured error on the failure branch.
    #[must_use]
    pub const fn error(&self) -> Option<&ErrorDetail> {
        match self {
            Self::Success { .. } => None,
            Self::Failure { error, .. } => Some(error),
        }
    }
}
