//! Key-holding authorization service.
//!
//! One secp256k1 private key, loaded at startup, signs every authorization
//! the service hands out. The key, chain id and identity-registry address
//! are fixed for the life of the authorizer; handlers share it behind an
//! `Arc` and call [`FeedbackAuthorizer::generate_auth`] per request.
//! Construct a fresh authorizer (with a throwaway key) in tests.

use alloy_primitives::{Address, B256, eip191_hash_message};
use k256::ecdsa::SigningKey;

use crate::agent_id::AgentId;
use crate::feedback::{self, FeedbackAuth, FeedbackAuthParams, FeedbackError};

pub const DEFAULT_INDEX_LIMIT: u64 = 10;
pub const DEFAULT_EXPIRY_DAYS: i64 = 30;
pub const MAX_EXPIRY_DAYS: i64 = 365;

/// An authorization request, after the transport has parsed the fields.
///
/// `index_limit` and `expiry_days` stay signed and wider than the values
/// they sign into, so out-of-range input reaches validation instead of
/// failing at the parse.
#[derive(Debug, Clone, Copy)]
pub struct AuthRequest {
    pub agent_id: AgentId,
    pub client_address: Address,
    pub index_limit: Option<i128>,
    pub expiry_days: Option<i64>,
}

pub struct FeedbackAuthorizer {
    signing_key: SigningKey,
    signer: Address,
    chain_id: u64,
    identity_registry: Address,
}

impl FeedbackAuthorizer {
    /// Builds an authorizer from a hex-encoded private key, with or without
    /// a `0x` prefix.
    pub fn new(
        private_key_hex: &str,
        chain_id: u64,
        identity_registry: Address,
    ) -> Result<Self, AuthError> {
        let trimmed = private_key_hex.trim();
        let hex_key = trimmed.strip_prefix("0x").unwrap_or(trimmed);
        let bytes = hex::decode(hex_key).map_err(|_| AuthError::InvalidKey)?;
        let signing_key = SigningKey::from_slice(&bytes).map_err(|_| AuthError::InvalidKey)?;
        let signer = Address::from_private_key(&signing_key);
        Ok(Self {
            signing_key,
            signer,
            chain_id,
            identity_registry,
        })
    }

    pub fn signer_address(&self) -> Address {
        self.signer
    }

    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    pub fn identity_registry(&self) -> Address {
        self.identity_registry
    }

    /// Validates the request, fills in defaults, signs, and returns the
    /// 289-byte authorization.
    ///
    /// The signature follows Ethereum's personal-message convention: the
    /// signed prehash is the EIP-191 hash of the parameter digest, and the
    /// recovery byte is carried as 27/28. The contract ecrecovers against
    /// the agent owner's registered address, so the convention is not
    /// negotiable here.
    pub fn generate_auth(&self, request: &AuthRequest) -> Result<FeedbackAuth, AuthError> {
        self.validate(request)?;

        let index_limit = match request.index_limit {
            Some(limit) => u64::try_from(limit).map_err(|_| AuthError::IndexLimitOutOfRange)?,
            None => DEFAULT_INDEX_LIMIT,
        };
        let expiry_days = request.expiry_days.unwrap_or(DEFAULT_EXPIRY_DAYS);
        let expiry = chrono::Utc::now().timestamp() + expiry_days * 86_400;

        let params = FeedbackAuthParams {
            agent_id: request.agent_id,
            client_address: request.client_address,
            index_limit,
            expiry: expiry as u64,
            chain_id: self.chain_id,
            identity_registry: self.identity_registry,
            signer_address: self.signer,
        };

        let digest = eip191_hash_message(params.message_hash());
        let sig_bytes = self.sign_digest(digest)?;
        Ok(feedback::build_feedback_auth(&params, sig_bytes)?)
    }

    /// Signs a 32-byte digest, returning `r ‖ s ‖ v` with v in {27, 28}.
    /// RFC 6979 nonces make the output deterministic per key and digest.
    fn sign_digest(&self, digest: B256) -> Result<[u8; 65], AuthError> {
        let (sig, recovery) = self
            .signing_key
            .sign_prehash_recoverable(digest.as_slice())
            .map_err(|e| AuthError::Signing(e.to_string()))?;
        let signature = alloy_primitives::Signature::from((sig, recovery));
        Ok(signature.into())
    }

    fn validate(&self, request: &AuthRequest) -> Result<(), AuthError> {
        if request.agent_id.raw() == 0 {
            return Err(AuthError::InvalidAgentId);
        }
        if let Some(limit) = request.index_limit {
            if limit <= 0 {
                return Err(AuthError::IndexLimitNotPositive);
            }
            if u64::try_from(limit).is_err() {
                return Err(AuthError::IndexLimitOutOfRange);
            }
        }
        if let Some(days) = request.expiry_days {
            if !(1..=MAX_EXPIRY_DAYS).contains(&days) {
                return Err(AuthError::ExpiryDaysOutOfRange);
            }
        }
        Ok(())
    }
}

impl std::fmt::Debug for FeedbackAuthorizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FeedbackAuthorizer")
            .field("signer", &self.signer)
            .field("chain_id", &self.chain_id)
            .field("identity_registry", &self.identity_registry)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("Invalid agentId")]
    InvalidAgentId,
    #[error("indexLimit must be positive")]
    IndexLimitNotPositive,
    #[error("indexLimit exceeds the uint64 range")]
    IndexLimitOutOfRange,
    #[error("expiryDays must be between 1 and 365")]
    ExpiryDaysOutOfRange,
    #[error("Invalid signing key")]
    InvalidKey,
    #[error("Signing failed: {0}")]
    Signing(String),
    #[error(transparent)]
    Feedback(#[from] FeedbackError),
}

impl AuthError {
    /// True for errors the caller can fix; the transport maps these to 400s
    /// and everything else to 500s.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            AuthError::InvalidAgentId
                | AuthError::IndexLimitNotPositive
                | AuthError::IndexLimitOutOfRange
                | AuthError::ExpiryDaysOutOfRange
        )
    }
}
