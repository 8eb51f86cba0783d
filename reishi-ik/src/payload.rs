//! Identity payload carried as the plaintext of each authenticated IK stage.
//!
//! Field numbers match libp2p's `NoiseHandshakePayload`.

use prost::Message;

use crate::error::PayloadError;

/// Proof that the sender controls a long-term identity key, plus optional
/// application data.
#[derive(Clone, PartialEq, Eq, Message)]
pub struct IdentityPayload {
    /// Protobuf-encoded libp2p public key.
    #[prost(bytes = "vec", tag = "1")]
    pub identity_key: Vec<u8>,
    /// Signature over the sender's Noise static key.
    #[prost(bytes = "vec", tag = "2")]
    pub identity_sig: Vec<u8>,
    #[prost(bytes = "vec", tag = "3")]
    pub data: Vec<u8>,
}

impl IdentityPayload {
    pub fn new(identity_key: Vec<u8>, identity_sig: Vec<u8>, data: Vec<u8>) -> Self {
        Self {
            identity_key,
            identity_sig,
            data,
        }
    }

    pub fn marshal(&self) -> Vec<u8> {
        self.encode_to_vec()
    }

    pub fn unmarshal(bytes: &[u8]) -> Result<Self, PayloadError> {
        Ok(Self::decode(bytes)?)
    }
}

/// Encode an identity payload.
pub fn marshal(identity_key: &[u8], identity_sig: &[u8], data: &[u8]) -> Vec<u8> {
    IdentityPayload::new(identity_key.to_vec(), identity_sig.to_vec(), data.to_vec()).marshal()
}

/// Decode an identity payload into `(identity_key, identity_sig, data)`.
pub fn unmarshal(bytes: &[u8]) -> Result<(Vec<u8>, Vec<u8>, Vec<u8>), PayloadError> {
    let p = IdentityPayload::unmarshal(bytes)?;
    Ok((p.identity_key, p.identity_sig, p.data))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_decodes_to_empty_payload() {
        let p = IdentityPayload::unmarshal(&[]).unwrap();
        assert!(p.identity_key.is_empty());
        assert!(p.identity_sig.is_empty());
        assert!(p.data.is_empty());
    }

    #[test]
    fn truncated_field_is_rejected() {
        let bytes = marshal(&[1u8; 36], &[2u8; 64], b"app");
        let result = IdentityPayload::unmarshal(&bytes[..bytes.len() - 1]);
        assert!(matches!(result, Err(PayloadError::Decode(_))));
    }

    #[test]
    fn garbage_is_rejected() {
        // Field 1, wire type 2, length 200 with nothing behind it.
        let result = unmarshal(&[0x0a, 0xc8, 0x01]);
        assert!(result.is_err());
    }

    #[test]
    fn field_tags_match_libp2p_layout() {
        let bytes = marshal(&[0xaa], &[0xbb], &[0xcc]);
        assert_eq!(bytes, [0x0a, 0x01, 0xaa, 0x12, 0x01, 0xbb, 0x1a, 0x01, 0xcc]);
    }
}
