// crates/hiex-client/tests/outgoing_pipeline.rs
// ============================================================================
// Module: Outgoing Pipeline Tests
// Description: End-to-end pipeline behavior against scripted dependencies.
// Purpose: Validate stage ordering, short-circuits, retries, and outcomes.
// Dependencies: hiex-client, hiex-config, hiex-core, hiex-jwe, async-trait,
//               tiny_http, tokio, x25519-dalek
// ============================================================================

//! ## Overview
//! Drives full requests through the orchestrator with a scripted in-memory
//! registry and a local gateway serving both the token endpoint and the
//! operation paths. Covers:
//! - The success path producing a success record with a parseable envelope
//! - Validation and header failures short-circuiting before any I/O
//! - Transient registry and gateway faults retried within the budget
//! - A zero retry budget failing on the first transient fault
//! - Client-side gateway rejections never retried
//! - Correlation inheritance from a prior envelope

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
use std::sync::Arc;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::thread;
use std::time::Duration;

use async_trait::async_trait;
use tiny_http::Response;
use tiny_http::Server;
use x25519_dalek::PublicKey;
use x25519_dalek::StaticSecret;

use hiex_client::GatewayDispatcher;
use hiex_client::KeyRegistry;
use hiex_client::KeyResolver;
use hiex_client::OutgoingClient;
use hiex_client::OutgoingRequest;
use hiex_client::RegistryError;
use hiex_client::TokenManager;
use hiex_config::RetryConfig;
use hiex_core::DomainPayload;
use hiex_core::HeaderBuilder;
use hiex_core::Operation;
use hiex_core::ParticipantCode;
use hiex_core::StructuralValidator;
use hiex_jwe::CONTENT_ENCRYPTION;
use hiex_jwe::Envelope;
use hiex_jwe::EnvelopeEncryptor;
use hiex_jwe::KEY_ALGORITHM;
use hiex_jwe::RecipientKey;

// ============================================================================
// SECTION: Test Helpers
// ============================================================================

/// Fixed recipient key served by every scripted registry.
fn recipient_key() -> RecipientKey {
    RecipientKey::from_public(PublicKey::from(&StaticSecret::from([9_u8; 32])))
}

/// Registry that fails its first N calls, then serves the fixed key.
struct ScriptedRegistry {
    /// Total lookup calls made.
    calls: AtomicUsize,
    /// Number of leading calls answered with an outage error.
    fail_first: usize,
}

impl ScriptedRegistry {
    /// Creates a registry that fails its first `fail_first` calls.
    fn new(fail_first: usize) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            fail_first,
        }
    }

    /// Total lookup calls observed so far.
    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl KeyRegistry for ScriptedRegistry {
    async fn lookup_encryption_key(
        &self,
        _recipient: &ParticipantCode,
    ) -> Result<RecipientKey, RegistryError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if call < self.fail_first {
            return Err(RegistryError::Unreachable("scripted outage".to_string()));
        }
        Ok(recipient_key())
    }
}

/// Spawns a gateway serving the token endpoint plus scripted dispatch
/// statuses, consumed in order with 200 after the script runs out.
fn spawn_gateway(script: Vec<u16>, hits: Arc<AtomicUsize>) -> String {
    let server = Server::http("127.0.0.1:0").unwrap();
    let addr = server.server_addr().to_ip().unwrap();
    thread::spawn(move || {
        let mut script = script.into_iter();
        for request in server.incoming_requests() {
            if request.url().ends_with("/auth/token") {
                let body = "{\"access_token\":\"tok-1\",\"expires_in\":3600}";
                let _ = request.respond(Response::from_string(body).with_status_code(200));
                continue;
            }
            hits.fetch_add(1, Ordering::SeqCst);
            let status = script.next().unwrap_or(200);
            let body = if status < 300 {
                "{\"ack\":\"accepted\"}"
            } else {
                "scripted fault"
            };
            let _ = request.respond(Response::from_string(body).with_status_code(status));
        }
    });
    format!("http://{addr}")
}

/// Wires a client from a scripted registry, a gateway base URL, and a retry
/// budget.
fn pipeline_client(
    registry: Arc<dyn KeyRegistry>,
    gateway_base: &str,
    retry: RetryConfig,
) -> OutgoingClient {
    let http = reqwest::Client::new();
    OutgoingClient::from_parts(
        ParticipantCode::new("sender-001"),
        Arc::new(StructuralValidator::new()),
        (KEY_ALGORITHM, CONTENT_ENCRYPTION),
        KeyResolver::new(registry, Duration::from_secs(60)),
        TokenManager::new(
            http.clone(),
            format!("{gateway_base}/auth/token"),
            "sender-001".to_string(),
            "svc-user".to_string(),
            "svc-pass".to_string(),
            Duration::from_secs(30),
        ),
        GatewayDispatcher::new(http, gateway_base),
        retry,
    )
    .unwrap()
}

/// Fast retry budget for tests.
fn retry(max_attempts: u32) -> RetryConfig {
    RetryConfig {
        max_attempts,
        backoff_ms: 10,
    }
}

/// Valid initiating payload for the eligibility-check operation.
fn check_payload() -> &'static str {
    "{\"resourceType\":\"CoverageEligibilityRequest\",\"id\":\"req-1\"}"
}

/// Valid response payload for the eligibility on-check operation.
fn on_check_payload() -> &'static str {
    "{\"resourceType\":\"CoverageEligibilityResponse\",\"id\":\"resp-1\",\"outcome\":\"complete\"}"
}

// ============================================================================
// SECTION: Success Path
// ============================================================================

/// Tests that a clean request yields a success record with a parseable
/// envelope and the gateway acknowledgement body.
#[tokio::test(flavor = "multi_thread")]
async fn clean_request_produces_success_record() {
    let registry = Arc::new(ScriptedRegistry::new(0));
    let hits = Arc::new(AtomicUsize::new(0));
    let base = spawn_gateway(vec![202], Arc::clone(&hits));
    let client = pipeline_client(Arc::clone(&registry) as Arc<dyn KeyRegistry>, &base, retry(2));

    let request = OutgoingRequest::new(
        check_payload(),
        Operation::CoverageEligibilityCheck,
        ParticipantCode::new("payer-001"),
    )
    .api_call_id("call-42")
    .correlation_id("corr-42");

    let (ok, record) = client.process(request).await;
    assert!(ok);
    assert!(record.is_success());
    assert_eq!(record.api_call_id().unwrap().as_str(), "call-42");
    assert_eq!(record.correlation_id().unwrap().as_str(), "corr-42");

    let envelope = Envelope::from_compact(record.envelope().unwrap()).unwrap();
    let protected = envelope.decode_protected().unwrap();
    assert_eq!(
        protected.get("x-hie-sender_code").and_then(serde_json::Value::as_str),
        Some("sender-001")
    );
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

// ============================================================================
// SECTION: Short-Circuits
// ============================================================================

/// Tests that an invalid payload aborts before any registry or gateway I/O.
#[tokio::test(flavor = "multi_thread")]
async fn invalid_payload_short_circuits_before_io() {
    let registry = Arc::new(ScriptedRegistry::new(0));
    let hits = Arc::new(AtomicUsize::new(0));
    let base = spawn_gateway(Vec::new(), Arc::clone(&hits));
    let client = pipeline_client(Arc::clone(&registry) as Arc<dyn KeyRegistry>, &base, retry(2));

    let request = OutgoingRequest::new(
        "{\"resourceType\":\"Claim\"}",
        Operation::CoverageEligibilityCheck,
        ParticipantCode::new("payer-001"),
    );

    let (ok, record) = client.process(request).await;
    assert!(!ok);
    let error = record.error().unwrap();
    assert_eq!(error.code, "ERR_INVALID_PAYLOAD");
    assert!(error.trace.contains("stage=validate"));
    assert_eq!(registry.calls(), 0);
    assert_eq!(hits.load(Ordering::SeqCst), 0);
}

/// Tests that a response operation without a status fails header
/// construction before any I/O.
#[tokio::test(flavor = "multi_thread")]
async fn missing_status_fails_headers_before_io() {
    let registry = Arc::new(ScriptedRegistry::new(0));
    let hits = Arc::new(AtomicUsize::new(0));
    let base = spawn_gateway(Vec::new(), Arc::clone(&hits));
    let client = pipeline_client(Arc::clone(&registry) as Arc<dyn KeyRegistry>, &base, retry(2));

    let request = OutgoingRequest::new(
        on_check_payload(),
        Operation::CoverageEligibilityOnCheck,
        ParticipantCode::new("payer-001"),
    );

    let (ok, record) = client.process(request).await;
    assert!(!ok);
    let error = record.error().unwrap();
    assert_eq!(error.code, "ERR_INVALID_HEADER");
    assert!(error.trace.contains("stage=build_headers"));
    assert_eq!(registry.calls(), 0);
}

/// Tests that a garbage prior envelope fails header construction.
#[tokio::test(flavor = "multi_thread")]
async fn malformed_prior_envelope_fails_headers() {
    let registry = Arc::new(ScriptedRegistry::new(0));
    let hits = Arc::new(AtomicUsize::new(0));
    let base = spawn_gateway(Vec::new(), hits);
    let client = pipeline_client(Arc::clone(&registry) as Arc<dyn KeyRegistry>, &base, retry(2));

    let request = OutgoingRequest::new(
        on_check_payload(),
        Operation::CoverageEligibilityOnCheck,
        ParticipantCode::new("payer-001"),
    )
    .status("response.complete")
    .prior_envelope("not-a-compact-envelope");

    let (ok, record) = client.process(request).await;
    assert!(!ok);
    assert_eq!(record.error().unwrap().code, "ERR_INVALID_HEADER");
    assert_eq!(registry.calls(), 0);
}

// ============================================================================
// SECTION: Retry Budget
// ============================================================================

/// Tests that two transient registry outages are absorbed by a budget of
/// two retries.
#[tokio::test(flavor = "multi_thread")]
async fn transient_registry_outage_retried_within_budget() {
    let registry = Arc::new(ScriptedRegistry::new(2));
    let hits = Arc::new(AtomicUsize::new(0));
    let base = spawn_gateway(vec![200], hits);
    let client = pipeline_client(Arc::clone(&registry) as Arc<dyn KeyRegistry>, &base, retry(2));

    let request = OutgoingRequest::new(
        check_payload(),
        Operation::CoverageEligibilityCheck,
        ParticipantCode::new("payer-001"),
    );

    let (ok, record) = client.process(request).await;
    assert!(ok, "expected success, got {:?}", record.error());
    assert_eq!(registry.calls(), 3);
}

/// Tests that a zero budget fails on the first transient fault.
#[tokio::test(flavor = "multi_thread")]
async fn zero_budget_fails_on_first_transient_fault() {
    let registry = Arc::new(ScriptedRegistry::new(1));
    let hits = Arc::new(AtomicUsize::new(0));
    let base = spawn_gateway(Vec::new(), hits);
    let client = pipeline_client(Arc::clone(&registry) as Arc<dyn KeyRegistry>, &base, retry(0));

    let request = OutgoingRequest::new(
        check_payload(),
        Operation::CoverageEligibilityCheck,
        ParticipantCode::new("payer-001"),
    );

    let (ok, record) = client.process(request).await;
    assert!(!ok);
    let error = record.error().unwrap();
    assert_eq!(error.code, "ERR_KEY_RESOLUTION");
    assert!(error.trace.contains("stage=resolve_key"));
    assert!(error.trace.contains("attempts=1"));
    assert_eq!(registry.calls(), 1);
}

/// Tests that transient gateway faults are retried and the request then
/// succeeds within the budget.
#[tokio::test(flavor = "multi_thread")]
async fn transient_gateway_faults_retried_to_success() {
    let registry = Arc::new(ScriptedRegistry::new(0));
    let hits = Arc::new(AtomicUsize::new(0));
    let base = spawn_gateway(vec![503, 503, 200], Arc::clone(&hits));
    let client = pipeline_client(Arc::clone(&registry) as Arc<dyn KeyRegistry>, &base, retry(2));

    let request = OutgoingRequest::new(
        check_payload(),
        Operation::CoverageEligibilityCheck,
        ParticipantCode::new("payer-001"),
    );

    let (ok, record) = client.process(request).await;
    assert!(ok, "expected success, got {:?}", record.error());
    assert_eq!(hits.load(Ordering::SeqCst), 3);
}

/// Tests that a client-side gateway rejection is surfaced without retries.
#[tokio::test(flavor = "multi_thread")]
async fn gateway_rejection_is_not_retried() {
    let registry = Arc::new(ScriptedRegistry::new(0));
    let hits = Arc::new(AtomicUsize::new(0));
    let base = spawn_gateway(vec![400], Arc::clone(&hits));
    let client = pipeline_client(Arc::clone(&registry) as Arc<dyn KeyRegistry>, &base, retry(5));

    let request = OutgoingRequest::new(
        check_payload(),
        Operation::CoverageEligibilityCheck,
        ParticipantCode::new("payer-001"),
    );

    let (ok, record) = client.process(request).await;
    assert!(!ok);
    let error = record.error().unwrap();
    assert_eq!(error.code, "ERR_GATEWAY_CLIENT");
    assert!(error.trace.contains("attempts=1"));
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

// ============================================================================
// SECTION: Correlation Inheritance
// ============================================================================

/// Seals a prior initiating envelope carrying the given correlation id.
fn prior_envelope_with_correlation(correlation: &str) -> String {
    let headers = HeaderBuilder::new(
        Operation::CoverageEligibilityCheck,
        ParticipantCode::new("payer-001"),
        ParticipantCode::new("sender-001"),
    )
    .correlation_id(correlation)
    .build()
    .unwrap();
    EnvelopeEncryptor::supported()
        .encrypt(&headers, &DomainPayload::new(check_payload()), &recipient_key())
        .unwrap()
        .into_compact()
}

/// Tests that a response inherits the correlation id of the prior envelope.
#[tokio::test(flavor = "multi_thread")]
async fn response_inherits_prior_correlation() {
    let registry = Arc::new(ScriptedRegistry::new(0));
    let hits = Arc::new(AtomicUsize::new(0));
    let base = spawn_gateway(vec![200], hits);
    let client = pipeline_client(Arc::clone(&registry) as Arc<dyn KeyRegistry>, &base, retry(2));

    let request = OutgoingRequest::new(
        on_check_payload(),
        Operation::CoverageEligibilityOnCheck,
        ParticipantCode::new("payer-001"),
    )
    .status("response.complete")
    .prior_envelope(prior_envelope_with_correlation("corr-prior"));

    let (ok, record) = client.process(request).await;
    assert!(ok, "expected success, got {:?}", record.error());
    assert_eq!(record.correlation_id().unwrap().as_str(), "corr-prior");
}

/// Tests that an explicit correlation id beats the inherited one.
#[tokio::test(flavor = "multi_thread")]
async fn explicit_correlation_beats_inherited() {
    let registry = Arc::new(ScriptedRegistry::new(0));
    let hits = Arc::new(AtomicUsize::new(0));
    let base = spawn_gateway(vec![200], hits);
    let client = pipeline_client(Arc::clone(&registry) as Arc<dyn KeyRegistry>, &base, retry(2));

    let request = OutgoingRequest::new(
        on_check_payload(),
        Operation::CoverageEligibilityOnCheck,
        ParticipantCode::new("payer-001"),
    )
    .status("response.complete")
    .correlation_id("corr-explicit")
    .prior_envelope(prior_envelope_with_correlation("corr-prior"));

    let (ok, record) = client.process(request).await;
    assert!(ok, "expected success, got {:?}", record.error());
    assert_eq!(record.correlation_id().unwrap().as_str(), "corr-explicit");
}

// ============================================================================
// SECTION: Domain Headers
// ============================================================================

/// Tests that caller domain headers travel in the protected header and that
/// reserved-prefix keys are rejected.
#[tokio::test(flavor = "multi_thread")]
async fn domain_headers_travel_and_reserved_keys_reject() {
    let registry = Arc::new(ScriptedRegistry::new(0));
    let hits = Arc::new(AtomicUsize::new(0));
    let base = spawn_gateway(vec![200, 200], hits);
    let client = pipeline_client(Arc::clone(&registry) as Arc<dyn KeyRegistry>, &base, retry(2));

    let mut domain = BTreeMap::new();
    domain.insert(
        "priority".to_string(),
        serde_json::Value::String("stat".to_string()),
    );
    let request = OutgoingRequest::new(
        check_payload(),
        Operation::CoverageEligibilityCheck,
        ParticipantCode::new("payer-001"),
    )
    .domain_headers(domain);

    let (ok, record) = client.process(request).await;
    assert!(ok);
    let envelope = Envelope::from_compact(record.envelope().unwrap()).unwrap();
    let protected = envelope.decode_protected().unwrap();
    assert_eq!(
        protected.get("priority").and_then(serde_json::Value::as_str),
        Some("stat")
    );

    let mut colliding = BTreeMap::new();
    colliding.insert(
        "x-hie-sender_code".to_string(),
        serde_json::Value::String("spoof".to_string()),
    );
    let request = OutgoingRequest::new(
        check_payload(),
        Operation::CoverageEligibilityCheck,
        ParticipantCode::new("payer-001"),
    )
    .domain_headers(colliding);

    let (ok, record) = client.process(request).await;
    assert!(!ok);
    assert_eq!(record.error().unwrap().code, "ERR_INVALID_HEADER");
}
