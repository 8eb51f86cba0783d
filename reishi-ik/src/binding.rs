//! Binding between a long-term libp2p identity and a Noise static key.
//!
//! A peer proves it controls both keys by signing its own static key with
//! its identity key. The verifier decides which static key the signature
//! must cover; see [`verify_binding`].

use libp2p_identity::{Keypair, PeerId, PublicKey as IdentityPublicKey, SigningError};

use crate::error::BindingError;
use crate::keys::PublicKey;
use crate::payload::IdentityPayload;

/// Domain separation prefix for static key signatures.
pub const STATIC_KEY_DOMAIN: &[u8] = b"noise-libp2p-static-key:";

fn signed_message(static_key: &PublicKey) -> Vec<u8> {
    let mut msg = Vec::with_capacity(STATIC_KEY_DOMAIN.len() + PublicKey::LEN);
    msg.extend_from_slice(STATIC_KEY_DOMAIN);
    msg.extend_from_slice(static_key.as_bytes());
    msg
}

/// The stable identifier of a peer. Deterministic for the key bytes.
pub fn derive_peer_id(identity: &IdentityPublicKey) -> PeerId {
    PeerId::from_public_key(identity)
}

/// Sign `static_key` with the local identity.
pub fn sign_static_key(
    identity: &Keypair,
    static_key: &PublicKey,
) -> Result<Vec<u8>, SigningError> {
    identity.sign(&signed_message(static_key))
}

/// Build the payload a peer sends to authenticate itself.
pub fn identity_payload(
    identity: &IdentityPublicKey,
    identity_sig: Vec<u8>,
    data: Vec<u8>,
) -> IdentityPayload {
    IdentityPayload::new(identity.encode_protobuf(), identity_sig, data)
}

/// Decode the identity key carried in a payload.
pub fn decode_identity(payload: &IdentityPayload) -> Result<IdentityPublicKey, BindingError> {
    Ok(IdentityPublicKey::try_decode_protobuf(&payload.identity_key)?)
}

/// Check that `identity_sig` is `identity`'s signature over `observed_static`.
pub fn verify_signature(
    identity: &IdentityPublicKey,
    identity_sig: &[u8],
    observed_static: &PublicKey,
) -> Result<(), BindingError> {
    if identity.verify(&signed_message(observed_static), identity_sig) {
        Ok(())
    } else {
        Err(BindingError::SignatureInvalid)
    }
}

/// Check that the payload's signature covers `observed_static`, under the
/// identity key carried in the same payload.
///
/// Returns the identity key the signature was checked with. Any failure is
/// final.
pub fn verify_binding(
    payload: &IdentityPayload,
    observed_static: &PublicKey,
) -> Result<IdentityPublicKey, BindingError> {
    let identity = decode_identity(payload)?;
    verify_signature(&identity, &payload.identity_sig, observed_static)?;
    Ok(identity)
}
