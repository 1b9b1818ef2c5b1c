// crates/hiex-config/src/config.rs
// ============================================================================
// Module: HIEX Configuration
// Description: Configuration types, loading, and fail-closed validation.
// Purpose: Bound every timeout, TTL, and retry knob with hard limits.
// Dependencies: serde, toml, url, thiserror
// ============================================================================

//! ## Overview
//! The SDK reads one TOML file naming the participant credentials, the
//! gateway and registry endpoints, and the cache/retry knobs. Every numeric
//! knob is clamped against named limits and every URL must be https unless
//! cleartext is explicitly opted into; violations fail at load time.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::env;
use std::fs;
use std::path::Path;
use std::path::PathBuf;

use serde::Deserialize;
use thiserror::Error;
use url::Url;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Environment variable used to locate the config file.
pub const CONFIG_ENV_VAR: &str = "HIEX_CONFIG";
/// Default configuration filename when no path is specified.
const DEFAULT_CONFIG_NAME: &str = "hiex.toml";
/// Maximum configuration file size in bytes.
pub(crate) const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
/// Minimum allowed HTTP timeout in milliseconds.
pub(crate) const MIN_TIMEOUT_MS: u64 = 100;
/// Maximum allowed HTTP timeout in milliseconds.
pub(crate) const MAX_TIMEOUT_MS: u64 = 60_000;
/// Default HTTP timeout in milliseconds.
const DEFAULT_TIMEOUT_MS: u64 = 5_000;
/// Minimum recipient-key cache TTL in milliseconds.
pub(crate) const MIN_KEY_TTL_MS: u64 = 1_000;
/// Maximum recipient-key cache TTL in milliseconds.
pub(crate) const MAX_KEY_TTL_MS: u64 = 86_400_000;
/// Default recipient-key cache TTL in milliseconds.
const DEFAULT_KEY_TTL_MS: u64 = 3_600_000;
/// Maximum token-expiry safety leeway in milliseconds.
pub(crate) const MAX_TOKEN_LEEWAY_MS: u64 = 300_000;
/// Default token-expiry safety leeway in milliseconds.
const DEFAULT_TOKEN_LEEWAY_MS: u64 = 30_000;
/// Maximum retry attempts after the initial try.
pub(crate) const MAX_RETRY_ATTEMPTS: u32 = 10;
/// Default retry attempts after the initial try.
const DEFAULT_RETRY_ATTEMPTS: u32 = 2;
/// Minimum retry backoff in milliseconds.
pub(crate) const MIN_BACKOFF_MS: u64 = 10;
/// Maximum retry backoff in milliseconds.
pub(crate) const MAX_BACKOFF_MS: u64 = 30_000;
/// Default initial retry backoff in milliseconds.
const DEFAULT_BACKOFF_MS: u64 = 250;
/// Default user agent for outbound requests.
const DEFAULT_USER_AGENT: &str = "hiex-sdk/0.1";

// ============================================================================
// SECTION: Configuration Types
// ============================================================================

/// Top-level SDK configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct HiexConfig {
    /// Participant identity and gateway credentials.
    pub participant: ParticipantConfig,
    /// Gateway endpoint configuration.
    pub gateway: GatewayConfig,
    /// Participant registry endpoint configuration.
    pub registry: RegistryConfig,
    /// Token cache configuration.
    #[serde(default)]
    pub token: TokenConfig,
    /// Retry policy for transient I/O failures.
    #[serde(default)]
    pub retry: RetryConfig,
    /// Shared HTTP client configuration.
    #[serde(default)]
    pub http: HttpConfig,
}

/// Participant identity registered with the gateway.
#[derive(Debug, Clone, Deserialize)]
pub struct ParticipantConfig {
    /// Participant code acting as the sender on outgoing requests.
    pub participant_code: String,
    /// Username for the gateway token endpoint.
    pub username: String,
    /// Password for the gateway token endpoint.
    pub password: String,
}

/// Gateway endpoint configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayConfig {
    /// Base URL for operation dispatch.
    pub base_url: String,
    /// Token endpoint URL for credential exchange.
    pub token_url: String,
    /// Dispatch and token request timeout in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

/// Participant registry endpoint configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct RegistryConfig {
    /// Base URL of the participant registry.
    pub base_url: String,
    /// Registry request timeout in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Recipient-key cache TTL in milliseconds.
    #[serde(default = "default_key_ttl_ms")]
    pub key_ttl_ms: u64,
}

/// Token cache configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenConfig {
    /// Safety margin subtracted from token expiry, in milliseconds.
    #[serde(default = "default_token_leeway_ms")]
    pub leeway_ms: u64,
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            leeway_ms: DEFAULT_TOKEN_LEEWAY_MS,
        }
    }
}

/// Retry policy for transient I/O failures.
#[derive(Debug, Clone, Deserialize)]
pub struct RetryConfig {
    /// Retries allowed after the initial attempt; zero disables retries.
    #[serde(default = "default_retry_attempts")]
    pub max_attempts: u32,
    /// Initial backoff before the first retry, in milliseconds.
    #[serde(default = "default_backoff_ms")]
    pub backoff_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_RETRY_ATTEMPTS,
            backoff_ms: DEFAULT_BACKOFF_MS,
        }
    }
}

/// Shared HTTP client configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    /// User agent string for outbound requests.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Allow cleartext HTTP endpoints (disabled by default).
    #[serde(default)]
    pub allow_insecure: bool,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            allow_insecure: false,
        }
    }
}

// ============================================================================
// SECTION: Loading
// ============================================================================

impl HiexConfig {
    /// Loads configuration from disk using the default resolution rules.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when loading or validation fails.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let resolved = resolve_path(path);
        let bytes = fs::read(&resolved).map_err(|err| ConfigError::Io(err.to_string()))?;
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let content = std::str::from_utf8(&bytes)
            .map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
        Self::from_toml_str(content)
    }

    /// Parses and validates configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when parsing or validation fails.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self =
            toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.participant.validate()?;
        self.gateway.validate(self.http.allow_insecure)?;
        self.registry.validate(self.http.allow_insecure)?;
        self.token.validate()?;
        self.retry.validate()?;
        self.http.validate()?;
        Ok(())
    }
}

impl ParticipantConfig {
    /// Validates the participant identity.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.participant_code.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "participant.participant_code must be set".to_string(),
            ));
        }
        if self.username.trim().is_empty() {
            return Err(ConfigError::Invalid("participant.username must be set".to_string()));
        }
        if self.password.is_empty() {
            return Err(ConfigError::Invalid("participant.password must be set".to_string()));
        }
        Ok(())
    }
}

impl GatewayConfig {
    /// Validates endpoint URLs and timeout bounds.
    fn validate(&self, allow_insecure: bool) -> Result<(), ConfigError> {
        validate_endpoint("gateway.base_url", &self.base_url, allow_insecure)?;
        validate_endpoint("gateway.token_url", &self.token_url, allow_insecure)?;
        validate_timeout("gateway.timeout_ms", self.timeout_ms)?;
        Ok(())
    }
}

impl RegistryConfig {
    /// Validates the registry endpoint, timeout, and key TTL.
    fn validate(&self, allow_insecure: bool) -> Result<(), ConfigError> {
        validate_endpoint("registry.base_url", &self.base_url, allow_insecure)?;
        validate_timeout("registry.timeout_ms", self.timeout_ms)?;
        if !(MIN_KEY_TTL_MS..=MAX_KEY_TTL_MS).contains(&self.key_ttl_ms) {
            return Err(ConfigError::Invalid(format!(
                "registry.key_ttl_ms must be within {MIN_KEY_TTL_MS}..={MAX_KEY_TTL_MS}"
            )));
        }
        Ok(())
    }
}

impl TokenConfig {
    /// Validates the token leeway bound.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.leeway_ms > MAX_TOKEN_LEEWAY_MS {
            return Err(ConfigError::Invalid(format!(
                "token.leeway_ms must not exceed {MAX_TOKEN_LEEWAY_MS}"
            )));
        }
        Ok(())
    }
}

impl RetryConfig {
    /// Validates the retry budget and backoff bounds.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.max_attempts > MAX_RETRY_ATTEMPTS {
            return Err(ConfigError::Invalid(format!(
                "retry.max_attempts must not exceed {MAX_RETRY_ATTEMPTS}"
            )));
        }
        if !(MIN_BACKOFF_MS..=MAX_BACKOFF_MS).contains(&self.backoff_ms) {
            return Err(ConfigError::Invalid(format!(
                "retry.backoff_ms must be within {MIN_BACKOFF_MS}..={MAX_BACKOFF_MS}"
            )));
        }
        Ok(())
    }
}

impl HttpConfig {
    /// Validates the user agent string.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.user_agent.trim().is_empty() {
            return Err(ConfigError::Invalid("http.user_agent must be set".to_string()));
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Configuration Errors
// ============================================================================

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O failure while reading configuration.
    #[error("config io error: {0}")]
    Io(String),
    /// TOML parsing error.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Invalid configuration data.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Resolves the config path from the argument or environment defaults.
fn resolve_path(path: Option<&Path>) -> PathBuf {
    if let Some(path) = path {
        return path.to_path_buf();
    }
    if let Ok(from_env) = env::var(CONFIG_ENV_VAR) {
        return PathBuf::from(from_env);
    }
    PathBuf::from(DEFAULT_CONFIG_NAME)
}

/// Validates an endpoint URL and its scheme policy.
fn validate_endpoint(field: &str, raw: &str, allow_insecure: bool) -> Result<(), ConfigError> {
    if raw.trim().is_empty() {
        return Err(ConfigError::Invalid(format!("{field} must be set")));
    }
    let url =
        Url::parse(raw).map_err(|err| ConfigError::Invalid(format!("{field} is invalid: {err}")))?;
    match url.scheme() {
        "https" => {}
        "http" if allow_insecure => {}
        scheme => {
            return Err(ConfigError::Invalid(format!(
                "{field} has unsupported scheme: {scheme}"
            )));
        }
    }
    if url.host_str().is_none() {
        return Err(ConfigError::Invalid(format!("{field} must name a host")));
    }
    Ok(())
}

/// Default HTTP timeout used by serde.
const fn default_timeout_ms() -> u64 {
    DEFAULT_TIMEOUT_MS
}

/// Default key TTL used by serde.
const fn default_key_ttl_ms() -> u64 {
    DEFAULT_KEY_TTL_MS
}

/// Default token leeway used by serde.
const fn default_token_leeway_ms() -> u64 {
    DEFAULT_TOKEN_LEEWAY_MS
}

/// Default retry attempts used by serde.
const fn default_retry_attempts() -> u32 {
    DEFAULT_RETRY_ATTEMPTS
}

/// Default backoff used by serde.
const fn default_backoff_ms() -> u64 {
    DEFAULT_BACKOFF_MS
}

/// Default user agent used by serde.
fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

/// Validates a timeout value against the global bounds.
fn validate_timeout(field: &str, value: u64) -> Result<(), ConfigError> {
    if !(MIN_TIMEOUT_MS..=MAX_TIMEOUT_MS).contains(&value) {
        return Err(ConfigError::Invalid(format!(
            "{field} must be within {MIN_TIMEOUT_MS}..={MAX_TIMEOUT_MS}"
        )));
    }
    Ok(())
}
