//! Core library for the codatta agent registry stack.
//!
//! On-chain, agents live in an ERC-8004-style identity/reputation registry
//! and are addressed by a 128-bit integer id. Off-chain, the same id is
//! rendered as a `did:codatta:<uuid>` string and used to key JSON documents
//! in an object store. This crate holds everything the services share:
//!
//! - [`agent_id`]: the id ↔ UUID ↔ DID codec
//! - [`did`]: strict validation of codatta DID strings
//! - [`feedback`]: the feedbackAuth payload layout, hashing and signatures
//! - [`authorizer`]: the key-holding service that issues authorizations
//! - [`document`]: DID and agent document payloads
//! - [`store`]: the object-store client used by the resolver and updater

pub mod agent_id;
pub mod authorizer;
pub mod did;
pub mod document;
pub mod feedback;
pub mod store;

pub use agent_id::AgentId;
pub use authorizer::{AuthRequest, FeedbackAuthorizer};
pub use feedback::{FeedbackAuth, FeedbackAuthParams};
pub use store::DocumentStore;
