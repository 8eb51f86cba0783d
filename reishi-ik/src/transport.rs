use zeroize::Zeroize;

use crate::engine::{HASH_LEN, MAX_MESSAGE_LEN};
use crate::error::EngineError;

/// AEAD tag overhead per transport message (ChaChaPoly).
pub const AEAD_TAG_LEN: usize = 16;

/// Post-handshake transport encryption state.
///
/// Holds the split send/receive ciphers of a finished IK handshake. The
/// initiator sends with the first cipher and the responder with the second;
/// `snow` performs that assignment from the role recorded at build time.
pub struct TransportState {
    inner: snow::TransportState,
    handshake_hash: [u8; HASH_LEN],
    is_initiator: bool,
}

impl Drop for TransportState {
    fn drop(&mut self) {
        self.handshake_hash.zeroize();
    }
}

impl TransportState {
    pub(crate) fn new(
        inner: snow::TransportState,
        handshake_hash: [u8; HASH_LEN],
        is_initiator: bool,
    ) -> Self {
        Self {
            inner,
            handshake_hash,
            is_initiator,
        }
    }

    /// Encrypt a payload for sending to the peer.
    pub fn write_message(&mut self, payload: &[u8]) -> Result<Vec<u8>, EngineError> {
        let mut out = vec![0u8; MAX_MESSAGE_LEN];
        let len = self.inner.write_message(payload, &mut out)?;
        out.truncate(len);
        Ok(out)
    }

    /// Decrypt a message received from the peer.
    pub fn read_message(&mut self, message: &[u8]) -> Result<Vec<u8>, EngineError> {
        let mut out = vec![0u8; message.len()];
        let len = self.inner.read_message(message, &mut out)?;
        out.truncate(len);
        Ok(out)
    }

    /// The final handshake hash, identical on both sides.
    pub fn handshake_hash(&self) -> &[u8; HASH_LEN] {
        &self.handshake_hash
    }

    pub fn is_initiator(&self) -> bool {
        self.is_initiator
    }

    /// The AEAD tag overhead per transport message.
    pub fn overhead(&self) -> usize {
        AEAD_TAG_LEN
    }
}

impl core::fmt::Debug for TransportState {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("TransportState")
            .field("is_initiator", &self.is_initiator)
            .finish_non_exhaustive()
    }
}
