//! Strict validation of codatta DID strings.
//!
//! A codatta DID is `did:codatta:<uuid>` where `<uuid>` carries the v4
//! version nibble and an RFC 4122 variant nibble in `{8, 9, a, b}`, exactly
//! what [`crate::agent_id::AgentId::to_uuid`] produces. This check is
//! stricter than the codec's decode path, which accepts any 32 hex digits;
//! upload callers use it to refuse documents keyed by strings that merely
//! look DID-ish.

use std::sync::OnceLock;

use regex::Regex;

const UUID_V4_PATTERN: &str =
    r"^[0-9a-f]{8}-[0-9a-f]{4}-4[0-9a-f]{3}-[89ab][0-9a-f]{3}-[0-9a-f]{12}$";

fn uuid_v4_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(&format!("(?i){UUID_V4_PATTERN}")).expect("static pattern"))
}

/// A structurally valid codatta DID, split into its parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedDid {
    pub method: String,
    pub uuid: String,
}

/// Splits and validates a codatta DID, reporting which rule failed.
pub fn parse_codatta_did(did: &str) -> Result<ParsedDid, DidError> {
    let parts: Vec<&str> = did.split(':').collect();
    if parts.len() != 3 {
        return Err(DidError::Structure);
    }
    let (scheme, method, uuid) = (parts[0], parts[1], parts[2]);
    if scheme != "did" {
        return Err(DidError::Scheme(scheme.to_string()));
    }
    if method != "codatta" {
        return Err(DidError::Method(method.to_string()));
    }
    if !is_valid_uuid_v4(uuid) {
        return Err(DidError::InvalidUuid(uuid.to_string()));
    }
    Ok(ParsedDid {
        method: method.to_string(),
        uuid: uuid.to_string(),
    })
}

pub fn is_valid_codatta_did(did: &str) -> bool {
    parse_codatta_did(did).is_ok()
}

/// True if `s` is a v4-shaped UUID (version nibble 4, variant in {8,9,a,b}).
pub fn is_valid_uuid_v4(s: &str) -> bool {
    uuid_v4_re().is_match(s)
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DidError {
    #[error("Invalid DID format, expected did:codatta:<uuid>")]
    Structure,
    #[error("Invalid DID scheme \"{0}\", expected \"did\"")]
    Scheme(String),
    #[error("Invalid DID method \"{0}\", expected \"codatta\"")]
    Method(String),
    #[error("DID identifier is not a version 4 UUID: {0}")]
    InvalidUuid(String),
}
