//! Agent id ↔ UUID ↔ DID codec.
//!
//! The registry hands out agent ids as opaque 128-bit unsigned integers.
//! Off-chain the id doubles as a UUID: the 16 big-endian bytes of the id
//! with the RFC 4122 version and variant bits forced to a v4 pattern, so
//! document keys and DIDs look like ordinary UUIDs without a mapping table.
//!
//! Forcing the bits is lossy. Encoding overwrites byte 6's high nibble with
//! `0x4` and byte 8's top two bits with `0b10`, up to 6 bits of the raw id.
//! Decoding is a plain hex parse of the 32 digits, forced bits included, so
//! `decode(encode(x)) == x` holds only when those bits of `x` already match
//! the forced pattern. Ids minted sequentially by the registry sit far
//! below bit 62, the lowest forced bit, and round-trip exactly in
//! practice; callers feeding arbitrary 128-bit values through the string
//! form must mask the version and variant bits themselves.

use std::fmt;
use std::str::FromStr;

use uuid::Uuid;

/// DID prefix for codatta agent identities.
pub const DID_PREFIX: &str = "did:codatta:";

/// A registered agent's on-chain identifier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AgentId(u128);

impl AgentId {
    pub const fn new(raw: u128) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> u128 {
        self.0
    }

    /// Renders the id as a v4-shaped UUID, forcing the version and variant
    /// bits (see the module docs for the lossiness caveat).
    pub fn to_uuid(self) -> Uuid {
        uuid::Builder::from_random_bytes(self.0.to_be_bytes()).into_uuid()
    }

    /// `did:codatta:<uuid>` form of the id.
    pub fn to_did(self) -> String {
        format!("{DID_PREFIX}{}", self.to_uuid())
    }

    /// Parses a UUID-shaped string back into the raw id. Hyphens are
    /// ignored wherever they appear; the remaining 32 hex digits are read
    /// big-endian. No version/variant check is applied.
    pub fn from_uuid_str(uuid: &str) -> Result<Self, AgentIdError> {
        let compact: String = uuid.chars().filter(|c| *c != '-').collect();
        if compact.len() != 32 {
            return Err(AgentIdError::InvalidUuid(uuid.to_string()));
        }
        let bytes = hex::decode(&compact).map_err(|_| AgentIdError::InvalidUuid(uuid.to_string()))?;
        let mut raw = [0u8; 16];
        raw.copy_from_slice(&bytes);
        Ok(Self(u128::from_be_bytes(raw)))
    }

    /// Parses a `did:codatta:<uuid>` string back into the raw id.
    pub fn from_did(did: &str) -> Result<Self, AgentIdError> {
        let uuid = did
            .strip_prefix(DID_PREFIX)
            .ok_or_else(|| AgentIdError::InvalidDid(did.to_string()))?;
        Self::from_uuid_str(uuid)
    }
}

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for AgentId {
    type Err = AgentIdError;

    /// Parses the decimal form used at service boundaries. Anything that is
    /// not an unsigned decimal integer below 2^128 is out of range.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<u128>()
            .map(Self)
            .map_err(|_| AgentIdError::OutOfRange(s.to_string()))
    }
}

impl From<u128> for AgentId {
    fn from(raw: u128) -> Self {
        Self(raw)
    }
}

impl From<AgentId> for u128 {
    fn from(id: AgentId) -> Self {
        id.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AgentIdError {
    #[error("Invalid UUID format: {0}")]
    InvalidUuid(String),
    #[error("Invalid DID format: {0}")]
    InvalidDid(String),
    #[error("Agent id out of uint128 range: {0}")]
    OutOfRange(String),
}
