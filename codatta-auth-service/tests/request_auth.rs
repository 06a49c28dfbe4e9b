//! Feedback authorization HTTP API acceptance tests.
//!
//! Covers /api/request-auth field validation and the shape of the signed
//! payload it returns, plus the /api/signer accessor and /health.

use std::sync::Arc;

use alloy_primitives::Address;
use codatta_auth_service::{AuthServiceState, cors_layer, router};
use codatta_core::FeedbackAuthorizer;
use codatta_core::feedback::FeedbackAuth;
use serde_json::{Value, json};

const TEST_KEY: &str = "0x0000000000000000000000000000000000000000000000000000000000000001";
const TEST_SIGNER: &str = "0x7e5f4552091a69125d5dfcb7b8c2659029395bdf";
const REGISTRY: &str = "0x740aA385eF5D72ee6BCedF38FFFa5990F21fbBc5";
const CHAIN_ID: u64 = 2368;
const CLIENT: &str = "0x1111111111111111111111111111111111111111";

/// Start the service on an ephemeral port and return its base URL.
async fn start_service() -> String {
    let authorizer =
        FeedbackAuthorizer::new(TEST_KEY, CHAIN_ID, REGISTRY.parse().unwrap()).unwrap();
    let state = Arc::new(AuthServiceState { authorizer });
    let app = router(state, cors_layer("http://localhost:3000"));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
    format!("http://{addr}")
}

async fn request_auth(base: &str, body: Value) -> (u16, Value) {
    let resp = reqwest::Client::new()
        .post(format!("{base}/api/request-auth"))
        .json(&body)
        .send()
        .await
        .unwrap();
    let status = resp.status().as_u16();
    (status, resp.json().await.unwrap())
}

// ── Happy path ─────────────────────────────────────────────────────────

#[tokio::test]
async fn request_auth_returns_a_complete_payload() {
    let base = start_service().await;
    let before = chrono::Utc::now().timestamp();

    let (status, body) =
        request_auth(&base, json!({ "agentId": "22", "clientAddress": CLIENT })).await;

    assert_eq!(status, 200, "unexpected response: {body}");
    assert_eq!(body["success"], true);

    let hex_payload = body["feedbackAuth"].as_str().unwrap();
    assert!(hex_payload.starts_with("0x"));
    assert_eq!(hex_payload.len(), 580, "289 bytes plus the 0x prefix");

    let params = &body["params"];
    assert_eq!(params["agentId"], "22");
    assert_eq!(params["indexLimit"], "10", "default limit");
    assert_eq!(
        params["signerAddress"].as_str().unwrap().to_lowercase(),
        TEST_SIGNER
    );
    assert_eq!(params["clientAddress"].as_str().unwrap().to_lowercase(), CLIENT);

    let expiry = params["expiry"].as_i64().unwrap();
    assert!(expiry >= before + 29 * 86_400, "default expiry is ~30 days out");
    assert!(expiry <= before + 31 * 86_400);

    // The hex payload must decode back to the parameters the service echoed.
    let bytes = hex::decode(&hex_payload[2..]).unwrap();
    let parsed = FeedbackAuth::from_bytes(bytes).unwrap();
    assert_eq!(parsed.params().agent_id.raw(), 22);
    assert_eq!(parsed.params().client_address, CLIENT.parse::<Address>().unwrap());
    assert_eq!(parsed.params().index_limit, 10);
    assert_eq!(parsed.params().expiry as i64, expiry);
    assert_eq!(parsed.params().chain_id, CHAIN_ID);
    assert_eq!(
        parsed.params().identity_registry,
        REGISTRY.parse::<Address>().unwrap()
    );
    assert_eq!(
        parsed.recover_signer().unwrap(),
        TEST_SIGNER.parse::<Address>().unwrap(),
        "signature must recover to the service's own signer"
    );
}

#[tokio::test]
async fn request_auth_accepts_numeric_fields_and_explicit_limits() {
    let base = start_service().await;
    let before = chrono::Utc::now().timestamp();

    let (status, body) = request_auth(
        &base,
        json!({ "agentId": 7, "clientAddress": CLIENT, "indexLimit": 25, "expiryDays": 2 }),
    )
    .await;

    assert_eq!(status, 200, "unexpected response: {body}");
    assert_eq!(body["params"]["agentId"], "7");
    assert_eq!(body["params"]["indexLimit"], "25");

    let expiry = body["params"]["expiry"].as_i64().unwrap();
    assert!(expiry >= before + 2 * 86_400 - 60);
    assert!(expiry <= before + 2 * 86_400 + 120);
}

// ── Validation ─────────────────────────────────────────────────────────

#[tokio::test]
async fn request_auth_requires_agent_id() {
    let base = start_service().await;

    let (status, body) = request_auth(&base, json!({ "clientAddress": CLIENT })).await;
    assert_eq!(status, 400);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "Missing agentId");

    // agentId is checked before clientAddress.
    let (_, body) = request_auth(&base, json!({})).await;
    assert_eq!(body["error"], "Missing agentId");
}

#[tokio::test]
async fn request_auth_requires_client_address() {
    let base = start_service().await;
    let (status, body) = request_auth(&base, json!({ "agentId": "1" })).await;
    assert_eq!(status, 400);
    assert_eq!(body["error"], "Missing clientAddress");
}

#[tokio::test]
async fn request_auth_rejects_agent_id_zero() {
    let base = start_service().await;
    let (status, body) =
        request_auth(&base, json!({ "agentId": "0", "clientAddress": CLIENT })).await;
    assert_eq!(status, 400);
    assert_eq!(body["error"], "Invalid agentId");
}

#[tokio::test]
async fn request_auth_rejects_malformed_agent_id() {
    let base = start_service().await;
    let (status, body) =
        request_auth(&base, json!({ "agentId": "not-a-number", "clientAddress": CLIENT })).await;
    assert_eq!(status, 400);
    assert_eq!(body["error"], "Invalid agentId");
}

#[tokio::test]
async fn request_auth_rejects_malformed_client_address() {
    let base = start_service().await;

    // Too short, unprefixed, and non-hex forms are all rejected.
    for addr in ["0x123", &CLIENT[2..], "0xzz11111111111111111111111111111111111111"] {
        let (status, body) =
            request_auth(&base, json!({ "agentId": "1", "clientAddress": addr })).await;
        assert_eq!(status, 400, "address {addr:?} should be rejected");
        assert_eq!(body["error"], "Invalid clientAddress format");
    }
}

#[tokio::test]
async fn request_auth_accepts_the_full_uint64_index_limit() {
    let base = start_service().await;

    // u64::MAX exceeds what a JSON number carries, so it goes as a string.
    let (status, body) = request_auth(
        &base,
        json!({ "agentId": "1", "clientAddress": CLIENT, "indexLimit": u64::MAX.to_string() }),
    )
    .await;
    assert_eq!(status, 200, "unexpected response: {body}");
    assert_eq!(body["params"]["indexLimit"], u64::MAX.to_string());

    let bytes = hex::decode(&body["feedbackAuth"].as_str().unwrap()[2..]).unwrap();
    let parsed = FeedbackAuth::from_bytes(bytes).unwrap();
    assert_eq!(parsed.params().index_limit, u64::MAX);

    // One past the slot width.
    let (status, body) = request_auth(
        &base,
        json!({ "agentId": "1", "clientAddress": CLIENT, "indexLimit": "18446744073709551616" }),
    )
    .await;
    assert_eq!(status, 400);
    assert_eq!(body["error"], "indexLimit exceeds the uint64 range");
}

#[tokio::test]
async fn request_auth_rejects_non_positive_index_limit() {
    let base = start_service().await;

    for limit in [0, -3] {
        let (status, body) = request_auth(
            &base,
            json!({ "agentId": "1", "clientAddress": CLIENT, "indexLimit": limit }),
        )
        .await;
        assert_eq!(status, 400, "indexLimit {limit} should be rejected");
        assert_eq!(body["error"], "indexLimit must be positive");
    }
}

#[tokio::test]
async fn request_auth_bounds_expiry_days() {
    let base = start_service().await;

    for days in [0, 366] {
        let (status, body) = request_auth(
            &base,
            json!({ "agentId": "1", "clientAddress": CLIENT, "expiryDays": days }),
        )
        .await;
        assert_eq!(status, 400, "expiryDays {days} should be rejected");
        assert_eq!(body["error"], "expiryDays must be between 1 and 365");
    }

    let (status, _) = request_auth(
        &base,
        json!({ "agentId": "1", "clientAddress": CLIENT, "expiryDays": 365 }),
    )
    .await;
    assert_eq!(status, 200, "365 days is the inclusive maximum");
}

// ── Accessors ──────────────────────────────────────────────────────────

#[tokio::test]
async fn signer_endpoint_reports_the_configured_key() {
    let base = start_service().await;
    let body: Value = reqwest::get(format!("{base}/api/signer"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(
        body["signerAddress"].as_str().unwrap().to_lowercase(),
        TEST_SIGNER
    );
}

#[tokio::test]
async fn health_reports_service_identity() {
    let base = start_service().await;
    let body: Value = reqwest::get(format!("{base}/health"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["service"], "feedback-auth-service");
    assert!(body["timestamp"].as_str().is_some());
    assert_eq!(body["signer"].as_str().unwrap().to_lowercase(), TEST_SIGNER);
}
