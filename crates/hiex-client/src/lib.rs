// crates/hiex-client/src/lib.rs
// ============================================================================
// Module: HIEX Client
// Description: I/O half of the outgoing request pipeline.
// Purpose: Resolve keys, manage tokens, dispatch envelopes, orchestrate.
// Dependencies: hiex-core, hiex-jwe, hiex-config, reqwest, tokio
// ============================================================================

//! ## Overview
//! This crate wires the computation-only core into the two I/O seams of the
//! pipeline: the participant registry (recipient key lookup) and the gateway
//! (token exchange and envelope dispatch). The recipient-key cache and the
//! token cache are the only state shared across concurrent requests; both
//! coalesce concurrent fetches for the same key into a single in-flight
//! call. The orchestrator sequences the fixed stage order and converts every
//! expected failure class into a failure outcome record.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod dispatch;
pub mod flight;
pub mod outgoing;
pub mod registry;
pub mod resolver;
pub mod token;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use dispatch::DispatchError;
pub use dispatch::GatewayAck;
pub use dispatch::GatewayDispatcher;
pub use flight::FlightGroup;
pub use outgoing::OutgoingClient;
pub use outgoing::OutgoingRequest;
pub use outgoing::SetupError;
pub use registry::HttpKeyRegistry;
pub use registry::KeyRegistry;
pub use registry::RegistryError;
pub use resolver::KeyResolver;
pub use token::AuthError;
pub use token::AuthToken;
pub use token::TokenManager;
