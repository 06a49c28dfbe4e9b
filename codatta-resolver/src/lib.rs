//! DID document resolver.
//!
//! Serves `GET /resolve/{did}` by fetching `<root>/<did>.json` from the
//! document store and handing the document back verbatim. A missing
//! object is a 404, a store or parse failure is a 500.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use clap::Parser;
use codatta_core::DocumentStore;
use serde_json::{Value, json};
use tower_http::cors::CorsLayer;

pub const SERVICE_NAME: &str = "did-resolver";

/// Resolver configuration, from flags or environment.
#[derive(Parser, Debug, Clone)]
#[command(name = "codatta-resolver", about = "Resolves DID documents from the document store")]
pub struct Config {
    /// Address to listen on.
    #[arg(long, env = "RESOLVER_ADDR", default_value = "0.0.0.0:3002")]
    pub listen: String,

    /// Base URL of the document store.
    #[arg(long, env = "DOCUMENT_STORE_ENDPOINT")]
    pub store_endpoint: String,

    /// Store root the DID documents are written under.
    #[arg(long, env = "DID_STORE_ROOT", default_value = "did")]
    pub store_root: String,

    /// Bearer token for the store, if it needs one.
    #[arg(long, env = "DOCUMENT_STORE_TOKEN")]
    pub store_token: Option<String>,
}

pub struct ResolverState {
    pub store: DocumentStore,
    pub root: String,
}

pub fn router(state: Arc<ResolverState>) -> Router {
    Router::new()
        .route("/resolve/{did}", get(resolve))
        .route("/health", get(health))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn resolve(
    State(state): State<Arc<ResolverState>>,
    Path(did): Path<String>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    // Percent-encoded separators decode into the captured segment.
    if did.is_empty() || did.contains('/') || did.contains("..") {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "Invalid DID format" })),
        ));
    }

    tracing::info!(%did, "resolving");

    match state.store.get_document(&state.root, &did).await {
        Ok(Some(document)) => Ok(Json(json!({ "success": true, "didDocument": document }))),
        Ok(None) => Err((
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "DID document not found", "did": did })),
        )),
        Err(e) => {
            tracing::error!(%did, error = %e, "resolution failed");
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "Internal server error", "message": e.to_string() })),
            ))
        }
    }
}

async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": SERVICE_NAME,
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}
