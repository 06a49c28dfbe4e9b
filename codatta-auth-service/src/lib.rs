//! Feedback authorization microservice.
//!
//! Wraps a [`FeedbackAuthorizer`] in a small HTTP surface for the portal:
//!
//!   POST /api/request-auth   issue a signed feedbackAuth payload
//!   GET  /api/signer         the service's signing address
//!   GET  /health             liveness probe
//!
//! The signing key, chain id and identity-registry address arrive through
//! flags or environment at startup and never change while the process
//! runs. Request bodies accept `agentId` and `indexLimit` as either JSON
//! numbers or decimal strings, since ids routinely exceed what JSON
//! numbers carry precisely.

use std::sync::Arc;

use axum::extract::State;
use axum::http::{HeaderValue, Method, StatusCode, header};
use axum::routing::{get, post};
use axum::{Json, Router};
use clap::Parser;
use codatta_core::AgentId;
use codatta_core::authorizer::{AuthRequest, FeedbackAuthorizer};
use serde::Deserialize;
use serde_json::{Value, json};
use tower_http::cors::{AllowOrigin, CorsLayer};

pub const SERVICE_NAME: &str = "feedback-auth-service";

#[derive(Debug, Parser)]
#[command(name = "codatta-auth-service")]
pub struct Config {
    /// Listen address.
    #[arg(long, env = "AUTH_SERVICE_ADDR", default_value = "0.0.0.0:3003")]
    pub listen: String,

    /// Hex private key of the agent owner, the feedbackAuth signer.
    #[arg(long, env = "AGENT_OWNER_PRIVATE_KEY", hide_env_values = true)]
    pub private_key: String,

    /// Identity registry contract address.
    #[arg(long, env = "IDENTITY_REGISTRY_ADDRESS")]
    pub identity_registry: alloy_primitives::Address,

    /// Chain id the issued authorizations are bound to.
    #[arg(long, env = "CHAIN_ID", default_value_t = 2368)]
    pub chain_id: u64,

    /// Comma-separated allowed CORS origins.
    #[arg(long, env = "CORS_ORIGINS", default_value = "http://localhost:3000")]
    pub cors_origins: String,
}

pub struct AuthServiceState {
    pub authorizer: FeedbackAuthorizer,
}

pub fn router(state: Arc<AuthServiceState>, cors: CorsLayer) -> Router {
    Router::new()
        .route("/api/request-auth", post(request_auth))
        .route("/api/signer", get(signer))
        .route("/health", get(health))
        .layer(cors)
        .with_state(state)
}

/// CORS for the browser portal: explicit origin list, credentials allowed.
pub fn cors_layer(origins: &str) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .split(',')
        .filter_map(|origin| origin.trim().parse().ok())
        .collect();
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .allow_credentials(true)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RequestAuthBody {
    agent_id: Option<Value>,
    client_address: Option<String>,
    index_limit: Option<Value>,
    expiry_days: Option<Value>,
}

/// Number-or-decimal-string field. Fractional and out-of-range values
/// read as absent, which the caller turns into its own error.
fn parse_u128_field(value: &Value) -> Option<u128> {
    match value {
        Value::Number(n) => n.as_u64().map(u128::from),
        Value::String(s) => s.trim().parse::<u128>().ok(),
        _ => None,
    }
}

fn parse_i64_field(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
}

/// Like [`parse_i64_field`] but wide enough for the whole uint64 slot;
/// limits past `i64::MAX` have to arrive as strings since JSON numbers of
/// that size land in the float representation.
fn parse_i128_field(value: &Value) -> Option<i128> {
    match value {
        Value::Number(n) => n
            .as_u64()
            .map(i128::from)
            .or_else(|| n.as_i64().map(i128::from)),
        Value::String(s) => s.trim().parse::<i128>().ok(),
        _ => None,
    }
}

fn bad_request(message: &str) -> (StatusCode, Json<Value>) {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({ "success": false, "error": message })),
    )
}

async fn request_auth(
    State(state): State<Arc<AuthServiceState>>,
    Json(body): Json<RequestAuthBody>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let agent_id_raw = body
        .agent_id
        .as_ref()
        .ok_or_else(|| bad_request("Missing agentId"))?;
    let client_address_raw = body
        .client_address
        .as_deref()
        .ok_or_else(|| bad_request("Missing clientAddress"))?;

    // Bare 40-hex parses as an address, but callers must send the 0x form.
    let trimmed_address = client_address_raw.trim();
    if !trimmed_address.starts_with("0x") {
        return Err(bad_request("Invalid clientAddress format"));
    }
    let client_address: alloy_primitives::Address = trimmed_address
        .parse()
        .map_err(|_| bad_request("Invalid clientAddress format"))?;

    let agent_id = parse_u128_field(agent_id_raw)
        .map(AgentId::new)
        .ok_or_else(|| bad_request("Invalid agentId"))?;
    let index_limit = match &body.index_limit {
        None => None,
        Some(raw) => Some(parse_i128_field(raw).ok_or_else(|| bad_request("Invalid indexLimit"))?),
    };
    let expiry_days = match &body.expiry_days {
        None => None,
        Some(raw) => Some(parse_i64_field(raw).ok_or_else(|| bad_request("Invalid expiryDays"))?),
    };

    let request = AuthRequest {
        agent_id,
        client_address,
        index_limit,
        expiry_days,
    };

    tracing::info!(agent_id = %agent_id, client = %client_address, "generating feedbackAuth");

    let auth = state.authorizer.generate_auth(&request).map_err(|e| {
        if e.is_validation() {
            bad_request(&e.to_string())
        } else {
            tracing::error!(error = %e, "feedbackAuth generation failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "success": false, "error": e.to_string() })),
            )
        }
    })?;

    let params = auth.params();
    Ok(Json(json!({
        "success": true,
        "feedbackAuth": auth.to_hex(),
        "params": {
            "agentId": params.agent_id.to_string(),
            "clientAddress": params.client_address.to_string(),
            "indexLimit": params.index_limit.to_string(),
            "expiry": params.expiry,
            "signerAddress": params.signer_address.to_string(),
        },
    })))
}

async fn signer(State(state): State<Arc<AuthServiceState>>) -> Json<Value> {
    Json(json!({ "signerAddress": state.authorizer.signer_address().to_string() }))
}

async fn health(State(state): State<Arc<AuthServiceState>>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": SERVICE_NAME,
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "signer": state.authorizer.signer_address().to_string(),
    }))
}
