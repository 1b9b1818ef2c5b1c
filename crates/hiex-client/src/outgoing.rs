// crates/hiex-client/src/outgoing.rs
// ============================================================================
// Module: Outgoing Request Orchestrator
// Description: Fixed-order pipeline from domain payload to outcome record.
// Purpose: Sequence validate, header build, key resolution, encryption,
//          authentication, and dispatch with bounded transient retry.
// Dependencies: hiex-core, hiex-jwe, hiex-config, reqwest, tokio, tracing
// ============================================================================

//! ## Overview
//! The orchestrator owns the stage order and the recovery boundary. Every
//! stage either advances the request or aborts it with one taxonomy error;
//! aborts become failure outcome records rather than propagated errors, so
//! callers always receive exactly one record per request. Transient failures
//! in the three I/O stages are retried with capped exponential backoff under
//! a shared per-stage attempt budget; non-transient failures abort on first
//! occurrence.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use thiserror::Error;

use hiex_config::HiexConfig;
use hiex_config::RetryConfig;
use hiex_core::DomainPayload;
use hiex_core::HeaderBuilder;
use hiex_core::HeaderError;
use hiex_core::Operation;
use hiex_core::OutcomeRecord;
use hiex_core::OutgoingError;
use hiex_core::ParticipantCode;
use hiex_core::PayloadValidator;
use hiex_core::StructuralValidator;
use hiex_core::WorkflowId;
use hiex_core::headers::names;
use hiex_jwe::Envelope;
use hiex_jwe::EnvelopeEncryptor;

use crate::dispatch::GatewayDispatcher;
use crate::registry::HttpKeyRegistry;
use crate::registry::KeyRegistry;
use crate::resolver::KeyResolver;
use crate::token::TokenManager;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Upper bound on a single retry backoff interval.
const BACKOFF_CAP_MS: u64 = 30_000;

// ============================================================================
// SECTION: Setup Errors
// ============================================================================

/// Failures while constructing an [`OutgoingClient`].
#[derive(Debug, Error)]
pub enum SetupError {
    /// The shared HTTP client could not be built.
    #[error("http client setup failed: {0}")]
    HttpClient(String),
    /// The requested envelope algorithm pair is not supported.
    #[error("unsupported envelope algorithms: {0}")]
    Algorithm(String),
}

// ============================================================================
// SECTION: Pipeline Stages
// ============================================================================

/// The stage at which a request aborted, named in failure traces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    /// Payload validation.
    Validate,
    /// Header construction.
    BuildHeaders,
    /// Recipient key resolution.
    ResolveKey,
    /// Envelope encryption.
    Encrypt,
    /// Gateway token acquisition.
    Authenticate,
    /// Envelope dispatch.
    Dispatch,
}

impl Stage {
    /// Stable stage name used in failure traces.
    const fn as_str(self) -> &'static str {
        match self {
            Self::Validate => "validate",
            Self::BuildHeaders => "build_headers",
            Self::ResolveKey => "resolve_key",
            Self::Encrypt => "encrypt",
            Self::Authenticate => "authenticate",
            Self::Dispatch => "dispatch",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A stage abort carrying the error and the attempts spent in that stage.
struct StageFailure {
    /// Stage that aborted the pipeline.
    stage: Stage,
    /// Attempts made in the failing stage, counting the first.
    attempts: u32,
    /// The taxonomy error that aborted the stage.
    error: OutgoingError,
}

impl StageFailure {
    /// Wraps a first-attempt failure for a computation-only stage.
    fn first(stage: Stage, error: impl Into<OutgoingError>) -> Self {
        Self {
            stage,
            attempts: 1,
            error: error.into(),
        }
    }
}

// ============================================================================
// SECTION: Outgoing Request
// ============================================================================

/// One outgoing request: the domain payload plus routing parameters.
#[derive(Debug, Clone)]
pub struct OutgoingRequest {
    /// Opaque domain document to validate and seal.
    payload: DomainPayload,
    /// Protocol operation selecting the validation policy and path.
    operation: Operation,
    /// Recipient participant code.
    recipient_code: ParticipantCode,
    /// Explicit api-call identifier; generated when absent.
    api_call_id: Option<String>,
    /// Explicit correlation identifier; inherited or generated when absent.
    correlation_id: Option<String>,
    /// Workflow identifier; inherited when absent and a prior envelope is
    /// supplied.
    workflow_id: Option<WorkflowId>,
    /// Compact prior envelope for correlation inheritance on responses.
    prior_envelope: Option<String>,
    /// Workflow status, required for response operations.
    status: Option<String>,
    /// Caller domain headers merged into the protected header.
    domain_headers: BTreeMap<String, Value>,
}

impl OutgoingRequest {
    /// Creates a request for the given payload, operation, and recipient.
    #[must_use]
    pub fn new(
        payload: impl Into<DomainPayload>,
        operation: Operation,
        recipient_code: ParticipantCode,
    ) -> Self {
        Self {
            payload: payload.into(),
            operation,
            recipient_code,
            api_call_id: None,
            correlation_id: None,
            workflow_id: None,
            prior_envelope: None,
            status: None,
            domain_headers: BTreeMap::new(),
        }
    }

    /// Supplies an explicit api-call identifier.
    #[must_use]
    pub fn api_call_id(mut self, id: impl Into<String>) -> Self {
        self.api_call_id = Some(id.into());
        self
    }

    /// Supplies an explicit correlation identifier.
    #[must_use]
    pub fn correlation_id(mut self, id: impl Into<String>) -> Self {
        self.correlation_id = Some(id.into());
        self
    }

    /// Supplies a workflow identifier.
    #[must_use]
    pub fn workflow_id(mut self, id: WorkflowId) -> Self {
        self.workflow_id = Some(id);
        self
    }

    /// Supplies the compact prior envelope this request responds to.
    #[must_use]
    pub fn prior_envelope(mut self, compact: impl Into<String>) -> Self {
        self.prior_envelope = Some(compact.into());
        self
    }

    /// Supplies the workflow status for response operations.
    #[must_use]
    pub fn status(mut self, status: impl Into<String>) -> Self {
        self.status = Some(status.into());
        self
    }

    /// Merges caller domain headers into the protected header.
    #[must_use]
    pub fn domain_headers(mut self, headers: BTreeMap<String, Value>) -> Self {
        self.domain_headers = headers;
        self
    }
}

// ============================================================================
// SECTION: Outgoing Client
// ============================================================================

/// Entry point for the outgoing half of the protocol.
pub struct OutgoingClient {
    /// Participant code acting as the sender on every request.
    sender_code: ParticipantCode,
    /// Pluggable payload validator.
    validator: Arc<dyn PayloadValidator>,
    /// Envelope producer.
    encryptor: EnvelopeEncryptor,
    /// Cached recipient-key resolver.
    resolver: KeyResolver,
    /// Cached gateway token manager.
    tokens: TokenManager,
    /// Gateway delivery client.
    dispatcher: GatewayDispatcher,
    /// Retry policy shared by the three I/O stages.
    retry: RetryConfig,
}

impl OutgoingClient {
    /// Builds a client from configuration with the default validator and
    /// algorithm pair.
    ///
    /// # Errors
    ///
    /// Returns [`SetupError`] when an HTTP client cannot be built.
    pub fn new(config: &HiexConfig) -> Result<Self, SetupError> {
        let gateway_http = build_http(&config.http.user_agent, config.gateway.timeout_ms)?;
        let registry_http = build_http(&config.http.user_agent, config.registry.timeout_ms)?;

        let registry: Arc<dyn KeyRegistry> =
            Arc::new(HttpKeyRegistry::new(registry_http, &config.registry.base_url));

        Ok(Self {
            sender_code: ParticipantCode::new(config.participant.participant_code.clone()),
            validator: Arc::new(StructuralValidator::new()),
            encryptor: EnvelopeEncryptor::supported(),
            resolver: KeyResolver::new(
                registry,
                Duration::from_millis(config.registry.key_ttl_ms),
            ),
            tokens: TokenManager::new(
                gateway_http.clone(),
                config.gateway.token_url.clone(),
                config.participant.participant_code.clone(),
                config.participant.username.clone(),
                config.participant.password.clone(),
                Duration::from_millis(config.token.leeway_ms),
            ),
            dispatcher: GatewayDispatcher::new(gateway_http, &config.gateway.base_url),
            retry: config.retry.clone(),
        })
    }

    /// Builds a client from pre-wired components.
    ///
    /// Hosts use this to swap in a custom validator, a non-HTTP registry, or
    /// a specific algorithm pair.
    ///
    /// # Errors
    ///
    /// Returns [`SetupError::Algorithm`] when the algorithm pair is not
    /// supported.
    pub fn from_parts(
        sender_code: ParticipantCode,
        validator: Arc<dyn PayloadValidator>,
        algorithms: (&str, &str),
        resolver: KeyResolver,
        tokens: TokenManager,
        dispatcher: GatewayDispatcher,
        retry: RetryConfig,
    ) -> Result<Self, SetupError> {
        let encryptor = EnvelopeEncryptor::new(algorithms.0, algorithms.1)
            .map_err(|error| SetupError::Algorithm(error.to_string()))?;
        Ok(Self {
            sender_code,
            validator,
            encryptor,
            resolver,
            tokens,
            dispatcher,
            retry,
        })
    }

    /// Runs one request through the pipeline and returns its outcome.
    ///
    /// The boolean mirrors the record: true for the success branch, false
    /// for the failure branch. Expected failures never surface as errors.
    pub async fn process(&self, request: OutgoingRequest) -> (bool, OutcomeRecord) {
        match self.run(request).await {
            Ok(record) => (true, record),
            Err(failure) => {
                tracing::warn!(
                    stage = %failure.stage,
                    attempts = failure.attempts,
                    error = %failure.error,
                    "outgoing request failed"
                );
                let trace = format!("stage={} attempts={}", failure.stage, failure.attempts);
                (false, OutcomeRecord::failure(&failure.error, trace))
            }
        }
    }

    /// Sequences the pipeline stages for one request.
    async fn run(&self, request: OutgoingRequest) -> Result<OutcomeRecord, StageFailure> {
        // Stage: validate.
        let report = self.validator.validate(&request.payload, request.operation);
        if !report.is_ok() {
            return Err(StageFailure::first(
                Stage::Validate,
                OutgoingError::Validation(report),
            ));
        }

        // Stage: build headers.
        let mut builder = HeaderBuilder::new(
            request.operation,
            self.sender_code.clone(),
            request.recipient_code.clone(),
        )
        .domain_headers(request.domain_headers);
        if let Some(id) = request.api_call_id {
            builder = builder.api_call_id(id);
        }
        if let Some(id) = request.correlation_id {
            builder = builder.correlation_id(id);
        }
        if let Some(status) = request.status {
            builder = builder.status(status);
        }
        let mut workflow_id = request.workflow_id;
        if let Some(prior) = request.prior_envelope.as_deref() {
            let inherited = inherited_headers(prior)
                .map_err(|error| StageFailure::first(Stage::BuildHeaders, error))?;
            if let Some(correlation) = inherited.correlation_id {
                builder = builder.inherited_correlation(correlation);
            }
            if workflow_id.is_none() {
                workflow_id = inherited.workflow_id;
            }
        }
        if let Some(id) = workflow_id {
            builder = builder.workflow_id(id);
        }
        let headers = builder
            .build()
            .map_err(|error| StageFailure::first(Stage::BuildHeaders, error))?;
        let correlation_id = headers.correlation_id().ok_or_else(|| {
            StageFailure::first(Stage::BuildHeaders, internal("headers lack a correlation id"))
        })?;
        let api_call_id = headers.api_call_id().ok_or_else(|| {
            StageFailure::first(Stage::BuildHeaders, internal("headers lack an api-call id"))
        })?;

        // Stage: resolve recipient key.
        let (resolved, attempts) = self
            .with_retry(|| async {
                self.resolver
                    .resolve(&request.recipient_code)
                    .await
                    .map_err(OutgoingError::from)
            })
            .await;
        let recipient_key = resolved.map_err(|error| StageFailure {
            stage: Stage::ResolveKey,
            attempts,
            error,
        })?;

        // Stage: encrypt.
        let envelope = self
            .encryptor
            .encrypt(&headers, &request.payload, &recipient_key)
            .map_err(|error| {
                StageFailure::first(
                    Stage::Encrypt,
                    OutgoingError::Encryption {
                        message: error.to_string(),
                    },
                )
            })?;

        // Stage: authenticate.
        let (token, attempts) = self
            .with_retry(|| async { self.tokens.bearer().await.map_err(OutgoingError::from) })
            .await;
        let token = token.map_err(|error| StageFailure {
            stage: Stage::Authenticate,
            attempts,
            error,
        })?;

        // Stage: dispatch.
        let (ack, attempts) = self
            .with_retry(|| async {
                self.dispatcher
                    .dispatch(request.operation, &envelope, token.bearer())
                    .await
                    .map_err(OutgoingError::from)
            })
            .await;
        let ack = ack.map_err(|error| StageFailure {
            stage: Stage::Dispatch,
            attempts,
            error,
        })?;

        tracing::info!(
            operation = %request.operation,
            api_call_id = %api_call_id,
            correlation_id = %correlation_id,
            status = ack.status,
            "dispatched outgoing request"
        );

        Ok(OutcomeRecord::success(
            correlation_id,
            api_call_id,
            envelope.into_compact(),
            ack.body,
        ))
    }

    /// Runs an I/O stage under the transient-retry budget.
    ///
    /// Returns the final result together with the attempts made, counting
    /// the first. Only transient-classed errors consume retries.
    async fn with_retry<T, F, Fut>(&self, stage_call: F) -> (Result<T, OutgoingError>, u32)
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, OutgoingError>>,
    {
        let mut attempt: u32 = 1;
        let mut backoff = Duration::from_millis(self.retry.backoff_ms);
        loop {
            match stage_call().await {
                Ok(value) => return (Ok(value), attempt),
                Err(error) if error.is_transient() && attempt <= self.retry.max_attempts => {
                    tracing::warn!(
                        attempt,
                        error = %error,
                        backoff_ms = u64::try_from(backoff.as_millis()).unwrap_or(u64::MAX),
                        "transient failure, retrying"
                    );
                    tokio::time::sleep(backoff).await;
                    backoff = (backoff * 2).min(Duration::from_millis(BACKOFF_CAP_MS));
                    attempt += 1;
                }
                Err(error) => return (Err(error), attempt),
            }
        }
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Correlation context read out of a prior envelope's protected header.
struct InheritedHeaders {
    /// Correlation identifier of the prior cycle, when present.
    correlation_id: Option<hiex_core::CorrelationId>,
    /// Workflow identifier of the prior cycle, when present.
    workflow_id: Option<WorkflowId>,
}

/// Decodes the prior envelope and extracts inheritable identifiers.
fn inherited_headers(prior: &str) -> Result<InheritedHeaders, HeaderError> {
    let envelope = Envelope::from_compact(prior)
        .map_err(|error| HeaderError::MalformedPriorEnvelope(error.to_string()))?;
    let protected = envelope
        .decode_protected()
        .map_err(|error| HeaderError::MalformedPriorEnvelope(error.to_string()))?;

    let correlation_id = protected
        .get(names::CORRELATION_ID)
        .and_then(Value::as_str)
        .filter(|id| !id.trim().is_empty())
        .map(hiex_core::CorrelationId::new);
    let workflow_id = protected
        .get(names::WORKFLOW_ID)
        .and_then(Value::as_str)
        .filter(|id| !id.trim().is_empty())
        .map(WorkflowId::new);

    Ok(InheritedHeaders {
        correlation_id,
        workflow_id,
    })
}

/// Builds an internal taxonomy error.
fn internal(message: &str) -> OutgoingError {
    OutgoingError::Internal {
        message: message.to_string(),
    }
}

/// Builds a shared HTTP client with the configured agent and timeout.
fn build_http(user_agent: &str, timeout_ms: u64) -> Result<reqwest::Client, SetupError> {
    reqwest::Client::builder()
        .user_agent(user_agent)
        .timeout(Duration::from_millis(timeout_ms))
        .build()
        .map_err(|error| SetupError::HttpClient(error.to_string()))
}
