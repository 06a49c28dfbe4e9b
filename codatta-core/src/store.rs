//! Object-store client for DID documents.
//!
//! Documents live in an S3-compatible bucket as `<root>/<did>.json`. The
//! client speaks plain HTTP to the bucket endpoint: PUT to write, GET to
//! read, with an optional bearer token for gated buckets. A 404 on read
//! means the document does not exist, not a failure.

use std::time::Duration;

use reqwest::StatusCode;
use serde_json::Value;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
pub struct DocumentStore {
    http: reqwest::Client,
    endpoint: String,
    token: Option<String>,
}

impl DocumentStore {
    pub fn new(endpoint: &str, token: Option<String>) -> Result<Self, StoreError> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            http,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            token,
        })
    }

    /// Public URL of the object holding `did`'s document under `root`.
    pub fn object_url(&self, root: &str, did: &str) -> String {
        format!("{}/{}/{}.json", self.endpoint, root.trim_matches('/'), did)
    }

    /// Object keys are single path segments. HTTP clients normalize dot
    /// segments in URLs, so a key like `../x` would escape the root.
    fn check_key(did: &str) -> Result<(), StoreError> {
        if did.is_empty() || did.contains('/') || did.contains("..") {
            return Err(StoreError::InvalidKey(did.to_string()));
        }
        Ok(())
    }

    /// Writes the document and returns its object URL.
    pub async fn put_document(
        &self,
        root: &str,
        did: &str,
        document: &Value,
    ) -> Result<String, StoreError> {
        Self::check_key(did)?;
        let url = self.object_url(root, did);
        let mut request = self.http.put(&url).json(document);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }
        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(StoreError::Rejected {
                status: response.status(),
                body: response.text().await.unwrap_or_default(),
            });
        }
        tracing::debug!(%url, "document stored");
        Ok(url)
    }

    /// Reads a document back, or `None` if the store has no object for it.
    pub async fn get_document(&self, root: &str, did: &str) -> Result<Option<Value>, StoreError> {
        Self::check_key(did)?;
        let url = self.object_url(root, did);
        let mut request = self.http.get(&url);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }
        let response = request.send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            tracing::debug!(%url, "document not found");
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(StoreError::Rejected {
                status: response.status(),
                body: response.text().await.unwrap_or_default(),
            });
        }
        let body = response.text().await?;
        let document = serde_json::from_str(&body).map_err(|_| StoreError::InvalidDocument)?;
        Ok(Some(document))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("store request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("store rejected request ({status}): {body}")]
    Rejected { status: StatusCode, body: String },
    #[error("invalid object key: {0}")]
    InvalidKey(String),
    #[error("Invalid DID document format")]
    InvalidDocument,
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::{Path, State};
    use axum::http::StatusCode;
    use axum::response::IntoResponse;
    use axum::routing::get;
    use axum::{Json, Router};
    use serde_json::json;
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    type Objects = Arc<Mutex<HashMap<String, String>>>;

    async fn stub_get(State(objects): State<Objects>, Path(key): Path<String>) -> impl IntoResponse {
        match objects.lock().unwrap().get(&key) {
            Some(body) => (StatusCode::OK, body.clone()).into_response(),
            None => StatusCode::NOT_FOUND.into_response(),
        }
    }

    async fn stub_put(
        State(objects): State<Objects>,
        Path(key): Path<String>,
        Json(body): Json<Value>,
    ) -> StatusCode {
        objects.lock().unwrap().insert(key, body.to_string());
        StatusCode::OK
    }

    async fn start_stub(objects: Objects) -> std::net::SocketAddr {
        let app = Router::new()
            .route("/did/{key}", get(stub_get).put(stub_put))
            .with_state(objects);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        addr
    }

    #[tokio::test]
    async fn put_then_get_round_trips() {
        let objects: Objects = Arc::new(Mutex::new(HashMap::new()));
        let addr = start_stub(objects.clone()).await;
        let store = DocumentStore::new(&format!("http://{addr}"), None).unwrap();

        let doc = json!({"id": "did:codatta:00000000-0000-4000-8000-000000000001"});
        let url = store
            .put_document("did", "did:codatta:00000000-0000-4000-8000-000000000001", &doc)
            .await
            .unwrap();
        assert!(url.ends_with("did:codatta:00000000-0000-4000-8000-000000000001.json"));

        let fetched = store
            .get_document("did", "did:codatta:00000000-0000-4000-8000-000000000001")
            .await
            .unwrap();
        assert_eq!(fetched, Some(doc));
    }

    #[tokio::test]
    async fn missing_object_reads_as_none() {
        let addr = start_stub(Arc::new(Mutex::new(HashMap::new()))).await;
        let store = DocumentStore::new(&format!("http://{addr}"), None).unwrap();
        let fetched = store.get_document("did", "did:codatta:missing").await.unwrap();
        assert_eq!(fetched, None);
    }

    #[tokio::test]
    async fn unparseable_object_is_an_error() {
        let objects: Objects = Arc::new(Mutex::new(HashMap::new()));
        objects
            .lock()
            .unwrap()
            .insert("broken.json".to_string(), "{not json".to_string());
        let addr = start_stub(objects).await;
        let store = DocumentStore::new(&format!("http://{addr}"), None).unwrap();
        let err = store.get_document("did", "broken").await.unwrap_err();
        assert!(matches!(err, StoreError::InvalidDocument));
    }

    #[tokio::test]
    async fn path_separators_in_keys_are_rejected() {
        let store = DocumentStore::new("http://store.local", None).unwrap();
        for key in ["../secret", "a/b", ""] {
            let err = store.get_document("did", key).await.unwrap_err();
            assert!(matches!(err, StoreError::InvalidKey(_)), "key {key:?}");
        }
    }

    #[test]
    fn object_urls_normalize_slashes() {
        let store = DocumentStore::new("http://store.local/", None).unwrap();
        assert_eq!(
            store.object_url("/did/", "did:codatta:x"),
            "http://store.local/did/did:codatta:x.json"
        );
    }
}
