// crates/hiex-core/src/operation.rs
// ============================================================================
// Module: HIEX Operations
// Description: Closed set of gateway operations with their policy table.
// Purpose: Drive validation rules, header requirements, and dispatch targets.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! The protocol fixes the operation set; callers cannot extend it. Each
//! variant carries a policy row: the gateway resource path, the operation
//! family (initiating action versus `on_*` response), and the document kind
//! the structural payload validator expects. Response-family operations
//! additionally require a workflow status header.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Operation Family
// ============================================================================

/// Family of a gateway operation, selecting the target resource group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationFamily {
    /// Initiating request sent on an `action` resource.
    Action,
    /// Response to an earlier request, sent on an `on_action` resource.
    OnAction,
}

// ============================================================================
// SECTION: Operations
// ============================================================================

/// Business action carried by an outgoing request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    /// Coverage eligibility check request.
    CoverageEligibilityCheck,
    /// Response to a coverage eligibility check.
    CoverageEligibilityOnCheck,
    /// Pre-authorization submission.
    PreauthSubmit,
    /// Response to a pre-authorization submission.
    PreauthOnSubmit,
    /// Claim submission.
    ClaimSubmit,
    /// Response to a claim submission.
    ClaimOnSubmit,
    /// Predetermination submission.
    PredeterminationSubmit,
    /// Response to a predetermination submission.
    PredeterminationOnSubmit,
}

impl Operation {
    /// Every operation in protocol order.
    pub const ALL: [Self; 8] = [
        Self::CoverageEligibilityCheck,
        Self::CoverageEligibilityOnCheck,
        Self::PreauthSubmit,
        Self::PreauthOnSubmit,
        Self::ClaimSubmit,
        Self::ClaimOnSubmit,
        Self::PredeterminationSubmit,
        Self::PredeterminationOnSubmit,
    ];

    /// Returns the gateway resource path for this operation.
    #[must_use]
    pub const fn path(&self) -> &'static str {
        match self {
            Self::CoverageEligibilityCheck => "/coverageeligibility/check",
            Self::CoverageEligibilityOnCheck => "/coverageeligibility/on_check",
            Self::PreauthSubmit => "/preauth/submit",
            Self::PreauthOnSubmit => "/preauth/on_submit",
            Self::ClaimSubmit => "/claim/submit",
            Self::ClaimOnSubmit => "/claim/on_submit",
            Self::PredeterminationSubmit => "/predetermination/submit",
            Self::PredeterminationOnSubmit => "/predetermination/on_submit",
        }
    }

    /// Returns the operation family.
    #[must_use]
    pub const fn family(&self) -> OperationFamily {
        match self {
            Self::CoverageEligibilityCheck
            | Self::PreauthSubmit
            | Self::ClaimSubmit
            | Self::PredeterminationSubmit => OperationFamily::Action,
            Self::CoverageEligibilityOnCheck
            | Self::PreauthOnSubmit
            | Self::ClaimOnSubmit
            | Self::PredeterminationOnSubmit => OperationFamily::OnAction,
        }
    }

    /// Returns true for `on_action` response operations.
    ///
    /// Response operations require a workflow status header; initiating
    /// operations must not carry one.
    #[must_use]
    pub const fn is_response(&self) -> bool {
        matches!(self.family(), OperationFamily::OnAction)
    }

    /// Returns the document kind the payload must declare for this operation.
    #[must_use]
    pub const fn document_kind(&self) -> &'static str {
        match self {
            Self::CoverageEligibilityCheck => "CoverageEligibilityRequest",
            Self::CoverageEligibilityOnCheck => "CoverageEligibilityResponse",
            Self::PreauthSubmit | Self::ClaimSubmit | Self::PredeterminationSubmit => "Claim",
            Self::PreauthOnSubmit | Self::ClaimOnSubmit | Self::PredeterminationOnSubmit => {
                "ClaimResponse"
            }
        }
    }

    /// Returns the stable snake_case name of the operation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::CoverageEligibilityCheck => "coverage_eligibility_check",
            Self::CoverageEligibilityOnCheck => "coverage_eligibility_on_check",
            Self::PreauthSubmit => "preauth_submit",
            Self::PreauthOnSubmit => "preauth_on_submit",
            Self::ClaimSubmit => "claim_submit",
            Self::ClaimOnSubmit => "claim_on_submit",
            Self::PredeterminationSubmit => "predetermination_submit",
            Self::PredeterminationOnSubmit => "predetermination_on_submit",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
