use thiserror::Error;

/// Errors raised by the key exchange engine.
#[derive(Debug, Error)]
pub enum EngineError {
    /// A stage operation was attempted out of order for this role.
    #[error("operation not valid in current handshake phase")]
    WrongState,
    /// An initiator engine was requested without the responder's static key.
    #[error("initiator requires the remote static key")]
    MissingRemoteKey,
    /// The Noise layer rejected the message or the key material.
    #[error("noise: {0}")]
    Noise(#[from] snow::Error),
}

/// The decrypted handshake plaintext is not a well-formed identity payload.
#[derive(Debug, Error)]
pub enum PayloadError {
    #[error("cannot decode identity payload: {0}")]
    Decode(#[from] prost::DecodeError),
}

/// Failures binding a peer identity to a Noise static key.
#[derive(Debug, Error)]
pub enum BindingError {
    /// The identity key bytes in the payload do not decode to a public key.
    #[error("malformed identity key: {0}")]
    MalformedKey(#[from] libp2p_identity::DecodingError),
    /// The signature does not cover the observed static key.
    #[error("identity signature does not cover the static key")]
    SignatureInvalid,
}
