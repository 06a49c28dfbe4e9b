//! feedbackAuth payload layout and hashing.
//!
//! The reputation contract's `giveFeedback` call takes an authorization
//! blob minted off-chain by the agent owner's key. Layout:
//!
//! ```text
//! bytes 0..224    abi.encode(agentId uint256, clientAddress address,
//!                 indexLimit uint64, expiry uint256, chainId uint256,
//!                 identityRegistry address, signerAddress address)
//! bytes 224..289  65-byte recoverable secp256k1 signature r ‖ s ‖ v,
//!                 v in {27, 28}, over the EIP-191 personal-message hash
//!                 of keccak256(bytes 0..224)
//! ```
//!
//! The contract recomputes the digest from the first 224 bytes, ecrecovers
//! the signer and checks it against the agent's registered owner, so both
//! the slot layout and the signature convention are fixed by the chain.

use alloy_primitives::{Address, B256, U256, eip191_hash_message, keccak256};
use alloy_sol_types::{SolType, SolValue, sol_data};

use crate::agent_id::AgentId;

/// Length of the ABI-encoded parameter block.
pub const AUTH_STRUCT_LEN: usize = 224;
/// Length of the full payload, parameter block plus 65-byte signature.
pub const FEEDBACK_AUTH_LEN: usize = 289;
/// Content hash for feedback that carries no off-chain document.
pub const EMPTY_FEEDBACK_HASH: B256 = B256::ZERO;

/// The seven signed fields, one 32-byte ABI slot each.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedbackAuthParams {
    pub agent_id: AgentId,
    pub client_address: Address,
    pub index_limit: u64,
    /// Unix seconds after which the authorization is dead.
    pub expiry: u64,
    pub chain_id: u64,
    pub identity_registry: Address,
    pub signer_address: Address,
}

impl FeedbackAuthParams {
    /// ABI-encodes the seven fields into the 224-byte parameter block.
    pub fn encode(&self) -> Vec<u8> {
        (
            U256::from(self.agent_id.raw()),
            self.client_address,
            self.index_limit,
            U256::from(self.expiry),
            U256::from(self.chain_id),
            self.identity_registry,
            self.signer_address,
        )
            .abi_encode_params()
    }

    /// keccak-256 of the encoded block, the digest the owner signs.
    pub fn message_hash(&self) -> B256 {
        keccak256(self.encode())
    }
}

/// A complete signed authorization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedbackAuth {
    params: FeedbackAuthParams,
    payload: Vec<u8>,
}

/// Concatenates the encoded parameter block and a 65-byte signature.
///
/// The length check can only fail if the encoder itself is broken; the
/// payload goes straight into a contract call, so a wrong length must stop
/// here rather than on-chain.
pub fn build_feedback_auth(
    params: &FeedbackAuthParams,
    signature: [u8; 65],
) -> Result<FeedbackAuth, FeedbackError> {
    let mut payload = params.encode();
    payload.extend_from_slice(&signature);
    if payload.len() != FEEDBACK_AUTH_LEN {
        return Err(FeedbackError::PayloadLength(payload.len()));
    }
    Ok(FeedbackAuth {
        params: params.clone(),
        payload,
    })
}

impl FeedbackAuth {
    /// Parses a raw payload, the inverse of [`build_feedback_auth`]. The
    /// leading 224 bytes are ABI-decoded back into the parameter block;
    /// the trailing 65 signature bytes are kept as-is.
    pub fn from_bytes(payload: Vec<u8>) -> Result<Self, FeedbackError> {
        if payload.len() != FEEDBACK_AUTH_LEN {
            return Err(FeedbackError::PayloadLength(payload.len()));
        }
        let (agent_id, client_address, index_limit, expiry, chain_id, registry, signer) =
            <(U256, Address, u64, U256, U256, Address, Address)>::abi_decode_params(
                &payload[..AUTH_STRUCT_LEN],
            )
            .map_err(|e| FeedbackError::Decode(e.to_string()))?;
        let params = FeedbackAuthParams {
            agent_id: AgentId::new(
                u128::try_from(agent_id).map_err(|e| FeedbackError::Decode(e.to_string()))?,
            ),
            client_address,
            index_limit,
            expiry: u64::try_from(expiry).map_err(|e| FeedbackError::Decode(e.to_string()))?,
            chain_id: u64::try_from(chain_id).map_err(|e| FeedbackError::Decode(e.to_string()))?,
            identity_registry: registry,
            signer_address: signer,
        };
        Ok(FeedbackAuth { params, payload })
    }

    pub fn params(&self) -> &FeedbackAuthParams {
        &self.params
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.payload
    }

    /// `0x`-prefixed lowercase hex, 580 characters for a 289-byte payload.
    pub fn to_hex(&self) -> String {
        alloy_primitives::hex::encode_prefixed(&self.payload)
    }

    /// Recovers the signing address from the embedded signature, the same
    /// check the contract performs with ecrecover.
    pub fn recover_signer(&self) -> Result<Address, FeedbackError> {
        use k256::ecdsa::{RecoveryId, Signature, VerifyingKey};

        let (struct_bytes, sig_bytes) = self.payload.split_at(AUTH_STRUCT_LEN);
        let digest = eip191_hash_message(keccak256(struct_bytes));
        let signature = Signature::from_slice(&sig_bytes[..64])
            .map_err(|e| FeedbackError::Signature(e.to_string()))?;
        let v = sig_bytes[64];
        let recovery =
            RecoveryId::from_byte(v.wrapping_sub(27)).ok_or(FeedbackError::RecoveryByte(v))?;
        let key = VerifyingKey::recover_from_prehash(digest.as_slice(), &signature, recovery)
            .map_err(|e| FeedbackError::Signature(e.to_string()))?;
        Ok(Address::from_public_key(&key))
    }
}

/// keccak-256 of the ABI encoding of `(feedbackUri, score, tag1, tag2)`,
/// committed on-chain alongside a feedback entry. The string field follows
/// the standard dynamic-type rules, offset and length words included, so
/// this must go through a real ABI encoder rather than the fixed-slot path
/// above.
pub fn feedback_content_hash(feedback_uri: &str, score: u8, tag1: B256, tag2: B256) -> B256 {
    // `u8` carries no `SolValue` impl (it is reserved for the `bytes`
    // mappings), so the uint8 slot is spelled at the type level.
    type ContentParams = (
        sol_data::String,
        sol_data::Uint<8>,
        sol_data::FixedBytes<32>,
        sol_data::FixedBytes<32>,
    );
    keccak256(ContentParams::abi_encode_params(&(
        feedback_uri.to_string(),
        score,
        tag1,
        tag2,
    )))
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FeedbackError {
    #[error("feedbackAuth payload is {0} bytes, expected 289")]
    PayloadLength(usize),
    #[error("malformed signature: {0}")]
    Signature(String),
    #[error("malformed parameter block: {0}")]
    Decode(String),
    #[error("unsupported recovery byte {0}, expected 27 or 28")]
    RecoveryByte(u8),
}
