//! DID and agent document payloads.
//!
//! Documents are caller-defined JSON; the updater only interprets the
//! identity fields before persisting, and unknown fields ride along
//! untouched. Identity fields are `Option` so a missing field surfaces as
//! a validation error with a useful message instead of a serde error.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::did::{self, DidError};

/// A W3C-style DID document. Only `id` is interpreted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DidDocument {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl DidDocument {
    /// Checks the document is storable and returns its DID.
    pub fn validate(&self) -> Result<&str, DocumentError> {
        let id = self.id.as_deref().ok_or(DocumentError::MissingId)?;
        did::parse_codatta_did(id).map_err(DocumentError::InvalidId)?;
        Ok(id)
    }
}

/// An agent profile document. `name` carries the agent's DID.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentDocument {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl AgentDocument {
    /// Checks the document is storable and returns the agent's DID. Agent
    /// names may use any DID method, so only the scheme is enforced.
    pub fn validate(&self) -> Result<&str, DocumentError> {
        let name = self.name.as_deref().ok_or(DocumentError::MissingName)?;
        if !name.starts_with("did:") {
            return Err(DocumentError::NameNotDid);
        }
        Ok(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DocumentError {
    #[error("DID Document must contain an `id` field")]
    MissingId,
    #[error("DID Document `id` field is not a codatta DID: {0}")]
    InvalidId(DidError),
    #[error("Agent Document must contain a `name` field")]
    MissingName,
    #[error("Agent Document `name` field must be in DID format")]
    NameNotDid,
}
