//! Handshake roles, stages, and the per-stage operation table.
//!
//! ```text
//! IK:
//!   <- s
//!   ...
//!   -> e, es, s, ss     stage 0
//!   <- e, ee, se        stage 1
//! ```

use core::fmt;

use crate::engine::KeyExchange;
use crate::error::EngineError;

/// Which side of the handshake this peer plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    /// Dials the peer and already knows its static key.
    Initiator,
    /// Accepts the dial and learns the peer's identity from stage 0.
    Responder,
}

impl Role {
    pub fn is_initiator(self) -> bool {
        matches!(self, Role::Initiator)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Initiator => f.write_str("initiator"),
            Role::Responder => f.write_str("responder"),
        }
    }
}

/// One of the two IK handshake messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    /// `-> e, es, s, ss`, written by the initiator.
    Zero = 0,
    /// `<- e, ee, se`, written by the responder.
    One = 1,
}

impl Stage {
    /// The message number on the wire.
    pub fn index(self) -> usize {
        self as usize
    }

    /// Look up the engine operations for this stage.
    pub fn ops<E: KeyExchange>(self) -> StageOps<E> {
        let table: [StageOps<E>; 2] = [
            StageOps {
                encode: E::encode0,
                decode: E::decode0,
            },
            StageOps {
                encode: E::encode1,
                decode: E::decode1,
            },
        ];
        table[self.index()]
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.index())
    }
}

/// Encrypts `payload` into the stage's handshake message.
pub type EncodeFn<E> = fn(&mut E, &[u8]) -> Result<Vec<u8>, EngineError>;

/// Decrypts a stage's handshake message into its payload.
pub type DecodeFn<E> = fn(&mut E, &[u8]) -> Result<Vec<u8>, EngineError>;

/// The encode/decode pair selected for one stage.
pub struct StageOps<E> {
    pub encode: EncodeFn<E>,
    pub decode: DecodeFn<E>,
}

impl<E> Clone for StageOps<E> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<E> Copy for StageOps<E> {}

impl<E> fmt::Debug for StageOps<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StageOps").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_display_is_wire_index() {
        assert_eq!(Stage::Zero.to_string(), "0");
        assert_eq!(Stage::One.to_string(), "1");
    }

    #[test]
    fn role_display() {
        assert_eq!(Role::Initiator.to_string(), "initiator");
        assert_eq!(Role::Responder.to_string(), "responder");
        assert!(Role::Initiator.is_initiator());
        assert!(!Role::Responder.is_initiator());
    }
}
