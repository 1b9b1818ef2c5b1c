// crates/hiex-config/src/lib.rs
// ============================================================================
// Module: HIEX Configuration
// Description: Configuration loading and validation for the outgoing SDK.
// Purpose: Provide strict, fail-closed config parsing with hard limits.
// Dependencies: serde, toml, url, thiserror
// ============================================================================

//! ## Overview
//! Configuration is loaded from a TOML file with strict size limits and
//! fail-closed validation: a missing credential, an out-of-range timeout, or
//! a cleartext URL without the explicit opt-in is an error at load time,
//! never a silent default at request time.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::ConfigError;
pub use config::GatewayConfig;
pub use config::HiexConfig;
pub use config::HttpConfig;
pub use config::ParticipantConfig;
pub use config::RegistryConfig;
pub use config::RetryConfig;
pub use config::TokenConfig;
