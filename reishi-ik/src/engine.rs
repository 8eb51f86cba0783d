//! The key exchange engine: Noise IK message processing behind a stage API.
//!
//! The cipher suite itself (X25519, ChaChaPoly, BLAKE2s) is provided by
//! `snow`. This module owns only the phase bookkeeping that pins every
//! stage operation to the one role and position where it is legal.

use crate::error::EngineError;
use crate::keys::{KeyPair, PublicKey};
use crate::stage::Role;
use crate::transport::TransportState;

/// Noise protocol name. Fixed; there is no algorithm negotiation.
pub const PROTOCOL_NAME: &str = "Noise_IK_25519_ChaChaPoly_BLAKE2s";

/// Largest handshake message Noise allows.
pub const MAX_MESSAGE_LEN: usize = 65535;

/// Handshake hash length for BLAKE2s.
pub const HASH_LEN: usize = 32;

/// A two-stage IK key exchange engine.
///
/// `encode0`/`decode0` process the initiator's message, `encode1`/`decode1`
/// the responder's. Implementations must reject any call made out of order.
pub trait KeyExchange: Sized {
    /// Post-handshake state produced by [`KeyExchange::into_transport`].
    type Transport;

    /// Start a fresh engine. `remote_static` is required for the initiator.
    fn init(
        role: Role,
        prologue: &[u8],
        local: &KeyPair,
        remote_static: Option<&PublicKey>,
    ) -> Result<Self, EngineError>;

    fn encode0(&mut self, payload: &[u8]) -> Result<Vec<u8>, EngineError>;
    fn encode1(&mut self, payload: &[u8]) -> Result<Vec<u8>, EngineError>;
    fn decode0(&mut self, message: &[u8]) -> Result<Vec<u8>, EngineError>;
    fn decode1(&mut self, message: &[u8]) -> Result<Vec<u8>, EngineError>;

    /// The remote static key: pre-known for the initiator, learned from
    /// stage 0 by the responder.
    fn remote_static(&self) -> Option<PublicKey>;

    /// The current handshake hash (channel binding value once finished).
    fn handshake_hash(&self) -> [u8; HASH_LEN];

    fn is_finished(&self) -> bool;

    fn into_transport(self) -> Result<Self::Transport, EngineError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    InitiatorWriteMsg1,
    InitiatorReadMsg2,
    ResponderReadMsg1,
    ResponderWriteMsg2,
    Complete,
}

/// `Noise_IK_25519_ChaChaPoly_BLAKE2s` backed by `snow`.
pub struct NoiseIk {
    state: snow::HandshakeState,
    phase: Phase,
}

impl NoiseIk {
    /// Initiator engine; the responder's static key must already be known.
    pub fn initiator(
        local: &KeyPair,
        remote_public: &PublicKey,
        prologue: &[u8],
    ) -> Result<Self, EngineError> {
        let secret = local.secret.to_bytes();
        let state = snow::Builder::new(PROTOCOL_NAME.parse()?)
            .local_private_key(secret.as_slice())?
            .remote_public_key(remote_public.as_bytes())?
            .prologue(prologue)?
            .build_initiator()?;
        Ok(Self {
            state,
            phase: Phase::InitiatorWriteMsg1,
        })
    }

    /// Responder engine; the initiator's static key arrives in stage 0.
    pub fn responder(local: &KeyPair, prologue: &[u8]) -> Result<Self, EngineError> {
        let secret = local.secret.to_bytes();
        let state = snow::Builder::new(PROTOCOL_NAME.parse()?)
            .local_private_key(secret.as_slice())?
            .prologue(prologue)?
            .build_responder()?;
        Ok(Self {
            state,
            phase: Phase::ResponderReadMsg1,
        })
    }

    fn write(
        &mut self,
        expect: Phase,
        next: Phase,
        payload: &[u8],
    ) -> Result<Vec<u8>, EngineError> {
        if self.phase != expect {
            return Err(EngineError::WrongState);
        }
        let mut out = vec![0u8; MAX_MESSAGE_LEN];
        let len = self.state.write_message(payload, &mut out)?;
        out.truncate(len);
        self.phase = next;
        Ok(out)
    }

    fn read(
        &mut self,
        expect: Phase,
        next: Phase,
        message: &[u8],
    ) -> Result<Vec<u8>, EngineError> {
        if self.phase != expect {
            return Err(EngineError::WrongState);
        }
        let mut out = vec![0u8; message.len()];
        let len = self.state.read_message(message, &mut out)?;
        out.truncate(len);
        self.phase = next;
        Ok(out)
    }
}

impl KeyExchange for NoiseIk {
    type Transport = TransportState;

    fn init(
        role: Role,
        prologue: &[u8],
        local: &KeyPair,
        remote_static: Option<&PublicKey>,
    ) -> Result<Self, EngineError> {
        match role {
            Role::Initiator => {
                let remote = remote_static.ok_or(EngineError::MissingRemoteKey)?;
                Self::initiator(local, remote, prologue)
            }
            Role::Responder => Self::responder(local, prologue),
        }
    }

    fn encode0(&mut self, payload: &[u8]) -> Result<Vec<u8>, EngineError> {
        self.write(Phase::InitiatorWriteMsg1, Phase::InitiatorReadMsg2, payload)
    }

    fn encode1(&mut self, payload: &[u8]) -> Result<Vec<u8>, EngineError> {
        self.write(Phase::ResponderWriteMsg2, Phase::Complete, payload)
    }

    fn decode0(&mut self, message: &[u8]) -> Result<Vec<u8>, EngineError> {
        self.read(Phase::ResponderReadMsg1, Phase::ResponderWriteMsg2, message)
    }

    fn decode1(&mut self, message: &[u8]) -> Result<Vec<u8>, EngineError> {
        self.read(Phase::InitiatorReadMsg2, Phase::Complete, message)
    }

    fn remote_static(&self) -> Option<PublicKey> {
        self.state
            .get_remote_static()
            .and_then(PublicKey::try_from_slice)
    }

    fn handshake_hash(&self) -> [u8; HASH_LEN] {
        let mut h = [0u8; HASH_LEN];
        let raw = self.state.get_handshake_hash();
        let n = raw.len().min(HASH_LEN);
        h[..n].copy_from_slice(&raw[..n]);
        h
    }

    fn is_finished(&self) -> bool {
        self.phase == Phase::Complete
    }

    fn into_transport(self) -> Result<TransportState, EngineError> {
        if self.phase != Phase::Complete {
            return Err(EngineError::WrongState);
        }
        let handshake_hash = self.handshake_hash();
        let is_initiator = self.state.is_initiator();
        let inner = self.state.into_transport_mode()?;
        Ok(TransportState::new(inner, handshake_hash, is_initiator))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stage::Stage;
    use rand_core::OsRng;

    fn pair(prologue: &[u8]) -> (NoiseIk, NoiseIk, KeyPair, KeyPair) {
        let i_kp = KeyPair::generate(&mut OsRng);
        let r_kp = KeyPair::generate(&mut OsRng);
        let initiator = NoiseIk::initiator(&i_kp, &r_kp.public, prologue).unwrap();
        let responder = NoiseIk::responder(&r_kp, prologue).unwrap();
        (initiator, responder, i_kp, r_kp)
    }

    #[test]
    fn stage_table_drives_full_exchange() {
        let (mut initiator, mut responder, i_kp, r_kp) = pair(b"prologue");

        let msg0 = (Stage::Zero.ops::<NoiseIk>().encode)(&mut initiator, b"ping").unwrap();
        let got0 = (Stage::Zero.ops::<NoiseIk>().decode)(&mut responder, &msg0).unwrap();
        assert_eq!(got0, b"ping");
        assert_eq!(responder.remote_static(), Some(i_kp.public));

        let msg1 = (Stage::One.ops::<NoiseIk>().encode)(&mut responder, b"pong").unwrap();
        let got1 = (Stage::One.ops::<NoiseIk>().decode)(&mut initiator, &msg1).unwrap();
        assert_eq!(got1, b"pong");

        assert!(initiator.is_finished());
        assert!(responder.is_finished());
        assert_eq!(initiator.remote_static(), Some(r_kp.public));
        assert_eq!(initiator.handshake_hash(), responder.handshake_hash());
    }

    #[test]
    fn out_of_order_calls_are_rejected() {
        let (mut initiator, mut responder, _, _) = pair(b"");

        assert!(matches!(initiator.encode1(b""), Err(EngineError::WrongState)));
        assert!(matches!(
            initiator.decode0(&[0u8; 96]),
            Err(EngineError::WrongState)
        ));
        assert!(matches!(responder.encode0(b""), Err(EngineError::WrongState)));
        assert!(matches!(responder.encode1(b""), Err(EngineError::WrongState)));

        let msg0 = initiator.encode0(b"").unwrap();
        assert!(matches!(initiator.encode0(b""), Err(EngineError::WrongState)));
        responder.decode0(&msg0).unwrap();
        assert!(matches!(
            responder.decode0(&msg0),
            Err(EngineError::WrongState)
        ));
    }

    #[test]
    fn prologue_mismatch_fails_stage_zero() {
        let i_kp = KeyPair::generate(&mut OsRng);
        let r_kp = KeyPair::generate(&mut OsRng);
        let mut initiator = NoiseIk::initiator(&i_kp, &r_kp.public, b"a").unwrap();
        let mut responder = NoiseIk::responder(&r_kp, b"b").unwrap();

        let msg0 = initiator.encode0(b"hi").unwrap();
        assert!(matches!(
            responder.decode0(&msg0),
            Err(EngineError::Noise(_))
        ));
    }

    #[test]
    fn wrong_cached_key_fails_stage_zero() {
        let i_kp = KeyPair::generate(&mut OsRng);
        let r_kp = KeyPair::generate(&mut OsRng);
        let stale = KeyPair::generate(&mut OsRng);
        let mut initiator = NoiseIk::initiator(&i_kp, &stale.public, b"").unwrap();
        let mut responder = NoiseIk::responder(&r_kp, b"").unwrap();

        let msg0 = initiator.encode0(b"").unwrap();
        assert!(responder.decode0(&msg0).is_err());
    }

    #[test]
    fn init_requires_remote_key_for_initiator() {
        let kp = KeyPair::generate(&mut OsRng);
        assert!(matches!(
            NoiseIk::init(Role::Initiator, b"", &kp, None),
            Err(EngineError::MissingRemoteKey)
        ));
        assert!(NoiseIk::init(Role::Responder, b"", &kp, None).is_ok());
    }

    #[test]
    fn into_transport_before_completion_fails() {
        let (initiator, _, _, _) = pair(b"");
        assert!(matches!(
            initiator.into_transport(),
            Err(EngineError::WrongState)
        ));
    }
}
