//! DID and agent document updater.
//!
//! `PUT /document/{did}` and `PUT /agent/{did}` validate the uploaded
//! JSON, keep a local copy under the data directory, and push the object
//! to the document store. The `update` subcommand re-pushes a local copy
//! by hand after an outage or a manual edit.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, put};
use axum::{Json, Router};
use clap::{Parser, Subcommand};
use codatta_core::document::{AgentDocument, DidDocument};
use codatta_core::{AgentId, DocumentStore, did};
use serde_json::{Value, json};
use tower_http::cors::CorsLayer;

pub const SERVICE_NAME: &str = "did-updater";

#[derive(Parser, Debug)]
#[command(
    name = "codatta-updater",
    about = "Receives DID and agent documents and pushes them to the document store"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    #[command(flatten)]
    pub config: Config,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the upload HTTP service.
    Serve,
    /// Push an already-saved DID document to the store.
    Update {
        /// The DID whose local document to push.
        did: String,
    },
}

/// Updater configuration, from flags or environment.
#[derive(clap::Args, Debug, Clone)]
pub struct Config {
    /// Address to listen on.
    #[arg(long, env = "UPDATER_ADDR", default_value = "0.0.0.0:3001")]
    pub listen: String,

    /// Base URL of the document store.
    #[arg(long, env = "DOCUMENT_STORE_ENDPOINT")]
    pub store_endpoint: String,

    /// Bearer token for the store, if it needs one.
    #[arg(long, env = "DOCUMENT_STORE_TOKEN")]
    pub store_token: Option<String>,

    /// Store root for DID documents.
    #[arg(long, env = "DID_STORE_ROOT", default_value = "did")]
    pub did_root: String,

    /// Store root for agent documents.
    #[arg(long, env = "AGENT_STORE_ROOT", default_value = "agent")]
    pub agent_root: String,

    /// Local directory DID documents are saved under.
    #[arg(long, env = "DID_LOCAL_DIR", default_value = "data/did")]
    pub did_dir: PathBuf,

    /// Local directory agent documents are saved under.
    #[arg(long, env = "AGENT_LOCAL_DIR", default_value = "data/agent")]
    pub agent_dir: PathBuf,
}

pub struct UpdaterState {
    pub store: DocumentStore,
    pub config: Config,
}

pub fn router(state: Arc<UpdaterState>) -> Router {
    Router::new()
        .route("/document/{id}", put(put_did_document))
        .route("/agent/{id}", put(put_agent_document))
        .route("/health", get(health))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

fn bad_request(message: &str) -> (StatusCode, Json<Value>) {
    (StatusCode::BAD_REQUEST, Json(json!({ "error": message })))
}

fn internal_error(e: impl std::fmt::Display) -> (StatusCode, Json<Value>) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": "Internal server error", "message": e.to_string() })),
    )
}

/// Writes the document under `dir` as `<id>.json` and returns the path.
async fn save_local(
    dir: &std::path::Path,
    id: &str,
    document: &Value,
) -> std::io::Result<PathBuf> {
    tokio::fs::create_dir_all(dir).await?;
    let path = dir.join(format!("{id}.json"));
    let pretty = serde_json::to_vec_pretty(document).map_err(std::io::Error::other)?;
    tokio::fs::write(&path, pretty).await?;
    Ok(path)
}

async fn put_did_document(
    State(state): State<Arc<UpdaterState>>,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    // The path id doubles as the storage key and local file name.
    did::parse_codatta_did(&id).map_err(|_| bad_request("Invalid DID format"))?;

    if !body.is_object() {
        return Err(bad_request("Invalid JSON"));
    }
    let doc: DidDocument =
        serde_json::from_value(body.clone()).map_err(|_| bad_request("Invalid JSON"))?;
    doc.validate().map_err(|e| bad_request(&e.to_string()))?;

    // A codatta DID is also a uint128 agent id on the identity registry.
    if let Ok(agent_id) = AgentId::from_did(&id) {
        tracing::info!(did = %id, %agent_id, "uploading DID document");
    }

    let file = save_local(&state.config.did_dir, &id, &body)
        .await
        .map_err(|e| {
            tracing::error!(did = %id, error = %e, "local save failed");
            internal_error(e)
        })?;
    let s3_url = state
        .store
        .put_document(&state.config.did_root, &id, &body)
        .await
        .map_err(|e| {
            tracing::error!(did = %id, error = %e, "store push failed");
            internal_error(e)
        })?;

    Ok(Json(json!({
        "success": true,
        "message": "DID Document uploaded",
        "file": file.display().to_string(),
        "s3Url": s3_url,
    })))
}

async fn put_agent_document(
    State(state): State<Arc<UpdaterState>>,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    did::parse_codatta_did(&id).map_err(|_| bad_request("Invalid DID format"))?;

    if !body.is_object() {
        return Err(bad_request("Invalid JSON"));
    }
    let doc: AgentDocument =
        serde_json::from_value(body.clone()).map_err(|_| bad_request("Invalid JSON"))?;
    doc.validate().map_err(|e| bad_request(&e.to_string()))?;

    tracing::info!(did = %id, "uploading agent document");

    let file = save_local(&state.config.agent_dir, &id, &body)
        .await
        .map_err(|e| {
            tracing::error!(did = %id, error = %e, "local save failed");
            internal_error(e)
        })?;
    let s3_url = state
        .store
        .put_document(&state.config.agent_root, &id, &body)
        .await
        .map_err(|e| {
            tracing::error!(did = %id, error = %e, "store push failed");
            internal_error(e)
        })?;

    Ok(Json(json!({
        "success": true,
        "message": "Agent Document uploaded",
        "file": file.display().to_string(),
        "s3Url": s3_url,
    })))
}

async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": SERVICE_NAME,
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}

/// Re-pushes a locally saved DID document, the `update` subcommand. A
/// missing local file is logged and skipped rather than treated as an
/// error, matching the upload flow where the file may not exist yet.
pub async fn push_did_document(
    config: &Config,
    store: &DocumentStore,
    did: &str,
) -> anyhow::Result<()> {
    let path = config.did_dir.join(format!("{did}.json"));
    if !tokio::fs::try_exists(&path).await? {
        tracing::warn!(path = %path.display(), "file not exist");
        return Ok(());
    }
    let data = tokio::fs::read_to_string(&path)
        .await
        .with_context(|| format!("reading {}", path.display()))?;
    let document: Value =
        serde_json::from_str(&data).with_context(|| format!("parsing {}", path.display()))?;
    let url = store.put_document(&config.did_root, did, &document).await?;
    tracing::info!(%did, %url, "document pushed");
    Ok(())
}
