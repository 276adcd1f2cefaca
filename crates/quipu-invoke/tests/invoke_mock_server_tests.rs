//! Integration tests for the invocation client using a mock HTTP server.
//!
//! The mock speaks the function-invocation API contract: POST to
//! `/2015-03-31/functions/{name}/invocations`, `x-amz-invocation-type`
//! header, `{"statusCode": .., "body": ..}` response payload, and the
//! `x-amzn-RequestId` / `x-amz-executed-version` response headers.
//!
//! Run with: cargo test -p quipu-invoke --test invoke_mock_server_tests

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::time::{Duration, Instant};

use quipu_invoke::{
    registry::shared_client, InvokeClient, InvokeConfig, RequestEnvelope, RetryMode,
};
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const FUNCTION: &str = "sigma-inference";
const INVOCATION_PATH: &str = "/2015-03-31/functions/sigma-inference/invocations";

/// Capture client log output in test reports; honors `RUST_LOG`.
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Client pointed at the mock server, with fast timeouts and backoff
/// kept short so retry tests stay quick.
fn create_mock_client(mock_server_uri: &str, config: InvokeConfig) -> InvokeClient {
    init_tracing();
    InvokeClient::new(FUNCTION)
        .unwrap()
        .with_config(config)
        .with_endpoint_url(mock_server_uri)
}

fn fast_config() -> InvokeConfig {
    InvokeConfig::new()
        .with_connect_timeout(Duration::from_millis(500))
        .with_read_timeout(Duration::from_millis(500))
}

/// Successful invocation payload in the wire contract's shape.
fn mock_invocation_response(inner_body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .set_body_json(json!({ "statusCode": 200, "body": inner_body }))
        .insert_header("x-amzn-RequestId", "req-abc-123")
        .insert_header("x-amz-executed-version", "$LATEST")
}

#[tokio::test]
async fn test_sync_invocation_parses_answer() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(INVOCATION_PATH))
        .and(header("x-amz-invocation-type", "RequestResponse"))
        .and(body_partial_json(
            json!({"body": {"query": "PBI de Ica en el 2022", "session_id": "s1"}}),
        ))
        .respond_with(mock_invocation_response(
            r#"{"answer": "Resultado de prueba"}"#,
        ))
        .mount(&mock_server)
        .await;

    let client = create_mock_client(&mock_server.uri(), fast_config());
    let request = RequestEnvelope::query("PBI de Ica en el 2022", "s1");

    let response = client.invoke_sync(&request).await;
    assert!(!response.is_error());
    assert_eq!(response.status_code, 200);

    let body = response.body_json().expect("body must be JSON");
    assert_eq!(body["answer"], "Resultado de prueba");

    assert_eq!(response.metadata.status_code, Some(200));
    assert_eq!(response.metadata.request_id.as_deref(), Some("req-abc-123"));
    assert!(!response.metadata.request_id.unwrap().is_empty());
    assert_eq!(response.metadata.execution_version.as_deref(), Some("$LATEST"));
}

#[tokio::test]
async fn test_sync_answer_matches_stubbed_text() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(INVOCATION_PATH))
        .respond_with(mock_invocation_response(
            r#"{"answer": "PBI de Ica 2022 fue X"}"#,
        ))
        .mount(&mock_server)
        .await;

    let client = create_mock_client(&mock_server.uri(), fast_config());
    let response = client
        .invoke_sync(&RequestEnvelope::query("PBI de Ica 2022", "s1"))
        .await;

    let body = response.body_json().expect("body must be JSON");
    assert_eq!(body["answer"], "PBI de Ica 2022 fue X");
}

#[tokio::test]
async fn test_non_ascii_payload_reaches_target_unescaped() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(INVOCATION_PATH))
        .and(body_partial_json(
            json!({"body": {"query": "¿Cómo estás? 🚀", "session_id": "sesión-1"}}),
        ))
        .respond_with(mock_invocation_response(r#"{"answer": "Bien 🚀"}"#))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = create_mock_client(&mock_server.uri(), fast_config());
    let response = client
        .invoke_sync(&RequestEnvelope::query("¿Cómo estás? 🚀", "sesión-1"))
        .await;

    assert!(!response.is_error());
    assert_eq!(response.body_json().unwrap()["answer"], "Bien 🚀");
}

#[tokio::test]
async fn test_envelope_shape_identical_on_success_and_failure() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(INVOCATION_PATH))
        .respond_with(mock_invocation_response(r#"{"answer": "ok"}"#))
        .mount(&mock_server)
        .await;

    let client = create_mock_client(&mock_server.uri(), fast_config());
    let success = client
        .invoke_sync(&RequestEnvelope::query("hola", "s1"))
        .await;

    // Unreachable endpoint with no retries: the synthetic envelope.
    let failing = create_mock_client(
        "http://127.0.0.1:1",
        fast_config().with_max_retry_attempts(0),
    );
    let failure = failing
        .invoke_sync(&RequestEnvelope::query("hola", "s1"))
        .await;

    for envelope in [&success, &failure] {
        let json = serde_json::to_value(envelope).unwrap();
        let mut keys: Vec<_> = json.as_object().unwrap().keys().cloned().collect();
        keys.sort_unstable();
        assert_eq!(keys, ["body", "metadata", "status_code"]);
    }
    assert!(!success.is_error());
    assert!(failure.is_error());
    assert_eq!(failure.status_code, 500);
    assert!(failure.body_json().unwrap()["error"].is_string());
}

#[tokio::test]
async fn test_timeout_retries_then_returns_failure_envelope() {
    let mock_server = MockServer::start().await;

    // Every attempt stalls past the read timeout. With 2 retries the
    // client must hit the server exactly 3 times and still resolve to
    // the synthetic failure envelope rather than a fault.
    Mock::given(method("POST"))
        .and(path(INVOCATION_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "statusCode": 200, "body": "{}" }))
                .set_delay(Duration::from_secs(5)),
        )
        .expect(3)
        .mount(&mock_server)
        .await;

    let config = InvokeConfig::new()
        .with_read_timeout(Duration::from_millis(100))
        .with_max_retry_attempts(2);
    let client = create_mock_client(&mock_server.uri(), config);

    let response = client
        .invoke_sync(&RequestEnvelope::query("lenta", "s1"))
        .await;

    assert!(response.is_error());
    assert!(response.metadata.error);
    assert_eq!(response.status_code, 500);
}

#[tokio::test]
async fn test_throttled_attempt_is_retried_to_success() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(INVOCATION_PATH))
        .respond_with(ResponseTemplate::new(429))
        .up_to_n_times(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path(INVOCATION_PATH))
        .respond_with(mock_invocation_response(r#"{"answer": "recuperado"}"#))
        .mount(&mock_server)
        .await;

    let client = create_mock_client(&mock_server.uri(), fast_config());
    let response = client
        .invoke_sync(&RequestEnvelope::query("reintenta", "s1"))
        .await;

    assert!(!response.is_error());
    assert_eq!(response.body_json().unwrap()["answer"], "recuperado");
}

#[tokio::test]
async fn test_target_reported_error_passes_through_unmodified() {
    let mock_server = MockServer::start().await;

    // Application-level failure: transport succeeds, the target itself
    // reports a 500 in its payload. Not synthetic, not retried.
    Mock::given(method("POST"))
        .and(path(INVOCATION_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({
                    "statusCode": 500,
                    "body": r#"{"error": "la consulta no pudo procesarse"}"#
                }))
                .insert_header("x-amzn-RequestId", "req-err-1"),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = create_mock_client(&mock_server.uri(), fast_config());
    let response = client
        .invoke_sync(&RequestEnvelope::query("falla", "s1"))
        .await;

    assert_eq!(response.status_code, 500);
    // The envelope is the target's own answer, not the synthetic one.
    assert!(!response.is_error());
    assert_eq!(response.metadata.request_id.as_deref(), Some("req-err-1"));
}

#[tokio::test]
async fn test_malformed_payload_becomes_failure_envelope() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(INVOCATION_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json at all"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = create_mock_client(&mock_server.uri(), fast_config());
    let response = client
        .invoke_sync(&RequestEnvelope::query("hola", "s1"))
        .await;

    assert!(response.is_error());
    assert_eq!(response.status_code, 500);
}

#[tokio::test]
async fn test_async_invocation_returns_correlation_id() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(INVOCATION_PATH))
        .and(header("x-amz-invocation-type", "Event"))
        .respond_with(
            ResponseTemplate::new(202).insert_header("x-amzn-RequestId", "req-async-9"),
        )
        .mount(&mock_server)
        .await;

    let client = create_mock_client(&mock_server.uri(), fast_config());
    let request_id = client
        .invoke_async(&RequestEnvelope::feedback("Muy útil, gracias", "s1"))
        .await;

    assert_eq!(request_id.as_deref(), Some("req-async-9"));
    assert!(!request_id.unwrap().is_empty());
}

#[tokio::test]
async fn test_blank_request_id_header_gets_local_fallback() {
    let mock_server = MockServer::start().await;

    // The transport answers but sends a blank correlation header; the
    // sync path must substitute a non-empty local id.
    Mock::given(method("POST"))
        .and(path(INVOCATION_PATH))
        .and(header("x-amz-invocation-type", "RequestResponse"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "statusCode": 200, "body": "{}" }))
                .insert_header("x-amzn-RequestId", ""),
        )
        .mount(&mock_server)
        .await;

    // The fire-and-forget path omits the header entirely.
    Mock::given(method("POST"))
        .and(path(INVOCATION_PATH))
        .and(header("x-amz-invocation-type", "Event"))
        .respond_with(ResponseTemplate::new(202))
        .mount(&mock_server)
        .await;

    let client = create_mock_client(&mock_server.uri(), fast_config());

    let response = client.invoke_sync(&RequestEnvelope::query("hola", "s1")).await;
    assert!(!response.is_error());
    let request_id = response.metadata.request_id.expect("id is always set");
    assert!(request_id.starts_with("local-"));

    let request_id = client
        .invoke_async(&RequestEnvelope::feedback("gracias", "s1"))
        .await
        .expect("acknowledged submission yields an id");
    assert!(request_id.starts_with("local-"));
}

#[tokio::test]
async fn test_async_invocation_failure_returns_none_quickly() {
    let config = fast_config();
    let bound = config.connect_timeout + config.read_timeout + Duration::from_secs(1);
    let client = create_mock_client("http://127.0.0.1:1", config);

    let started = Instant::now();
    let request_id = client
        .invoke_async(&RequestEnvelope::feedback("sin red", "s1"))
        .await;

    assert!(request_id.is_none());
    assert!(started.elapsed() < bound);
}

#[tokio::test]
async fn test_deadline_bounds_whole_invocation() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(INVOCATION_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "statusCode": 200, "body": "{}" }))
                .set_delay(Duration::from_secs(10)),
        )
        .mount(&mock_server)
        .await;

    let client = create_mock_client(&mock_server.uri(), InvokeConfig::new());
    let started = Instant::now();
    let response = client
        .invoke_sync_within(
            &RequestEnvelope::query("lenta", "s1"),
            Duration::from_millis(200),
        )
        .await;

    assert!(response.is_error());
    assert!(started.elapsed() < Duration::from_secs(2));
}

#[tokio::test]
async fn test_standard_retry_mode_also_recovers() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(INVOCATION_PATH))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path(INVOCATION_PATH))
        .respond_with(mock_invocation_response(r#"{"answer": "ok"}"#))
        .mount(&mock_server)
        .await;

    let client = create_mock_client(
        &mock_server.uri(),
        fast_config().with_retry_mode(RetryMode::Standard),
    );
    let response = client.invoke_sync(&RequestEnvelope::query("q", "s")).await;
    assert!(!response.is_error());
}

#[tokio::test]
async fn test_shared_registry_returns_identical_instance() {
    let a = shared_client("registry-integration-fn", "us-east-1").expect("valid target");
    let b = shared_client("registry-integration-fn", "us-east-1").expect("valid target");
    assert!(std::sync::Arc::ptr_eq(&a, &b));
}
