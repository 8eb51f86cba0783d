use std::fmt;
use std::io;

use reishi_ik::{EngineError, PayloadError, PeerId, Role, Stage};
use thiserror::Error;

use crate::context::AbortReason;

/// Missing input that makes an initiator give up before any I/O.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Precondition {
    /// The session was created as initiator without a peer to dial.
    NoRemotePeer,
    /// The cache holds no static key for the dialed peer.
    UnknownStaticKey(PeerId),
}

impl fmt::Display for Precondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Precondition::NoRemotePeer => f.write_str("no remote peer to dial"),
            Precondition::UnknownStaticKey(peer) => {
                write!(f, "unknown static key for peer {peer}")
            }
        }
    }
}

/// Why a handshake failed.
#[derive(Debug, Error)]
pub enum Cause {
    /// Key material needed before any I/O is missing. Acquire it out of band.
    #[error("precondition unmet: {0}")]
    PreconditionUnmet(Precondition),
    /// The send or receive primitive failed.
    #[error("transport failure: {0}")]
    TransportFailure(#[source] io::Error),
    /// The engine could not encode or decode a stage message (wrong keys,
    /// tampering, or a mismatched prologue).
    #[error("handshake message rejected: {0}")]
    ProtocolFailure(#[source] EngineError),
    /// The decrypted plaintext is not an identity payload, or its identity
    /// key does not decode.
    #[error("identity payload malformed: {0}")]
    PayloadMalformed(#[source] Box<dyn std::error::Error + Send + Sync>),
    /// The identity in the payload is not the one expected.
    #[error("remote peer id mismatch: expected {expected}, got {actual}")]
    IdentityMismatch { expected: PeerId, actual: PeerId },
    /// The payload signature does not cover the static key.
    #[error("identity signature does not cover the static key")]
    SignatureInvalid,
    #[error("handshake aborted: {0}")]
    Aborted(AbortReason),
    /// The session already ran a handshake.
    #[error("session already used for a handshake")]
    Reused,
}

impl From<PayloadError> for Cause {
    fn from(e: PayloadError) -> Self {
        Cause::PayloadMalformed(Box::new(e))
    }
}

/// A failed handshake, tagged with where it failed.
///
/// `partial` holds the raw bytes read before the failure (possibly empty),
/// for diagnostics. It never contains decrypted data.
#[derive(Debug, Error)]
#[error("ik handshake failed: stage={stage} role={role}: {cause}")]
pub struct HandshakeError {
    pub stage: Stage,
    pub role: Role,
    #[source]
    pub cause: Cause,
    pub partial: Vec<u8>,
}

impl HandshakeError {
    pub fn is_aborted(&self) -> bool {
        matches!(self.cause, Cause::Aborted(_))
    }
}

/// Invalid [`IkConfig`](crate::IkConfig) parameters.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot sign static key: {0}")]
    Signing(#[from] reishi_ik::identity::SigningError),
    #[error("max message length must be in 1..={max}, got {got}")]
    MessageLen { got: usize, max: usize },
}
