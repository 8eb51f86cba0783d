#![deny(unsafe_code)]

//! # reishi-ik
//!
//! Sans-IO building blocks of the Noise IK "already met" handshake between
//! libp2p peers: the two-stage `Noise_IK_25519_ChaChaPoly_BLAKE2s` engine,
//! the identity payload exchanged inside it, and the binding of a peer's
//! long-term identity key to its Noise static key.
//!
//! The async driver that sequences these pieces over a transport lives in
//! `reishi-ik-session`.
//!
//! ## Security Properties
//!
//! - Stage operations are pinned to their role and position
//! - Identity payloads must sign the static key the verifier chose
//! - Local secrets zeroized on drop
//! - Constant-time check of the unknown-key sentinel

pub mod binding;
pub mod cache;
pub mod engine;
pub mod error;
pub mod keys;
pub mod payload;
pub mod stage;

mod transport;

// Re-export the primary public API
pub use binding::{
    derive_peer_id, sign_static_key, verify_binding, verify_signature, STATIC_KEY_DOMAIN,
};
pub use cache::{MemoryKeyCache, StaticKeyCache};
pub use engine::{KeyExchange, NoiseIk, HASH_LEN, MAX_MESSAGE_LEN, PROTOCOL_NAME};
pub use error::{BindingError, EngineError, PayloadError};
pub use keys::{KeyPair, PublicKey, StaticSecret};
pub use payload::IdentityPayload;
pub use stage::{Role, Stage, StageOps};
pub use transport::{TransportState, AEAD_TAG_LEN};

pub use libp2p_identity as identity;
pub use libp2p_identity::PeerId;
