//! The IK handshake driver.
//!
//! `Session` walks the two IK stages for one role, checking the identity
//! payload the peer sends inside its authenticated stage. The two roles are
//! separate walks: the initiator verifies the peer's signature against the
//! static key it already trusted from the cache, the responder against the
//! static key it observed live in stage 0.

use std::fmt;
use std::io;
use std::sync::Arc;

use reishi_ik::binding::{self, decode_identity, derive_peer_id};
use reishi_ik::identity::PublicKey as IdentityPublicKey;
use reishi_ik::{
    BindingError, EngineError, IdentityPayload, KeyExchange, NoiseIk, PeerId, PublicKey, Role,
    Stage, HASH_LEN,
};
use tracing::{debug, warn};

use crate::config::IkConfig;
use crate::context::Context;
use crate::error::{Cause, HandshakeError, Precondition};
use crate::transport::MessageTransport;

/// Progress of a session through the handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Start,
    Stage0Sent,
    Stage0Received,
    Stage1Sent,
    Stage1Received,
    /// Every check passed; transport keys are available.
    Authenticated,
    /// Terminal. Start over with a new session.
    Failed,
}

/// What a successful handshake hands back to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandshakeOutcome {
    /// Application data the peer embedded in its identity payload.
    pub payload: Vec<u8>,
    /// Raw bytes of the last handshake message read.
    pub received: Vec<u8>,
}

struct Failure {
    stage: Stage,
    cause: Cause,
    partial: Vec<u8>,
}

impl Failure {
    fn new(stage: Stage, cause: Cause) -> Self {
        Self {
            stage,
            cause,
            partial: Vec::new(),
        }
    }

    fn after(stage: Stage, cause: Cause, received: &[u8]) -> Self {
        Self {
            stage,
            cause,
            partial: received.to_vec(),
        }
    }
}

fn binding_cause(e: BindingError) -> Cause {
    match e {
        BindingError::SignatureInvalid => Cause::SignatureInvalid,
        malformed @ BindingError::MalformedKey(_) => Cause::PayloadMalformed(Box::new(malformed)),
    }
}

fn oversized(len: usize, max: usize) -> Cause {
    Cause::TransportFailure(io::Error::new(
        io::ErrorKind::InvalidData,
        format!("handshake message too large: {len} > {max}"),
    ))
}

/// Encode `plaintext` with the stage's engine operation and transmit it.
async fn send_stage<E, T>(
    engine: &mut E,
    stage: Stage,
    transport: &mut T,
    plaintext: &[u8],
    max_message_len: usize,
    ctx: &Context,
) -> Result<(), Cause>
where
    E: KeyExchange,
    T: MessageTransport + ?Sized,
{
    let message = (stage.ops::<E>().encode)(engine, plaintext).map_err(Cause::ProtocolFailure)?;
    if message.len() > max_message_len {
        return Err(oversized(message.len(), max_message_len));
    }
    tokio::select! {
        biased;
        reason = ctx.done() => Err(Cause::Aborted(reason)),
        sent = transport.send(&message) => sent.map_err(Cause::TransportFailure),
    }
}

/// Receive one message and decode it with the stage's engine operation.
///
/// Returns the raw message and its plaintext. On failure, the raw bytes
/// read so far ride along with the cause.
async fn recv_stage<E, T>(
    engine: &mut E,
    stage: Stage,
    transport: &mut T,
    max_message_len: usize,
    ctx: &Context,
) -> Result<(Vec<u8>, Vec<u8>), Failure>
where
    E: KeyExchange,
    T: MessageTransport + ?Sized,
{
    let received = tokio::select! {
        biased;
        reason = ctx.done() => return Err(Failure::new(stage, Cause::Aborted(reason))),
        recv = transport.recv() => recv.map_err(|e| Failure::new(stage, Cause::TransportFailure(e)))?,
    };
    if received.len() > max_message_len {
        let cause = oversized(received.len(), max_message_len);
        return Err(Failure::after(stage, cause, &received));
    }
    match (stage.ops::<E>().decode)(engine, &received) {
        Ok(plaintext) => Ok((received, plaintext)),
        Err(e) => Err(Failure::after(stage, Cause::ProtocolFailure(e), &received)),
    }
}

/// One IK handshake attempt between this peer and a remote one.
///
/// A session runs at most once. On success it holds the authenticated
/// remote identity and the engine ready to become transport state; on
/// failure it is dead and a new session must be created.
pub struct Session<E: KeyExchange = NoiseIk> {
    config: Arc<IkConfig>,
    role: Role,
    state: State,
    remote_peer: Option<PeerId>,
    remote_identity: Option<IdentityPublicKey>,
    remote_static: Option<PublicKey>,
    handshake_hash: Option<[u8; HASH_LEN]>,
    engine: Option<E>,
}

impl<E: KeyExchange> Session<E> {
    /// Create a session. An initiator needs the peer it is dialing.
    pub fn new(config: Arc<IkConfig>, role: Role, remote_peer: Option<PeerId>) -> Self {
        Self {
            config,
            role,
            state: State::Start,
            remote_peer,
            remote_identity: None,
            remote_static: None,
            handshake_hash: None,
            engine: None,
        }
    }

    pub fn initiator(config: Arc<IkConfig>, remote_peer: PeerId) -> Self {
        Self::new(config, Role::Initiator, Some(remote_peer))
    }

    pub fn responder(config: Arc<IkConfig>) -> Self {
        Self::new(config, Role::Responder, None)
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn is_authenticated(&self) -> bool {
        self.state == State::Authenticated
    }

    /// The peer's stable identifier: dialed by an initiator, adopted by a
    /// responder as soon as the stage 0 payload decodes. A failed responder
    /// clears it again.
    pub fn remote_peer(&self) -> Option<PeerId> {
        self.remote_peer
    }

    /// The peer's long-term identity key, once authenticated.
    pub fn remote_identity(&self) -> Option<&IdentityPublicKey> {
        self.remote_identity.as_ref()
    }

    /// The peer's Noise static key, once authenticated.
    pub fn remote_static(&self) -> Option<PublicKey> {
        self.remote_static
    }

    /// Channel binding value, equal on both sides once authenticated.
    pub fn handshake_hash(&self) -> Option<&[u8; HASH_LEN]> {
        self.handshake_hash.as_ref()
    }

    /// Consume an authenticated session into its transport state.
    pub fn into_transport(self) -> Result<E::Transport, EngineError> {
        match (self.state, self.engine) {
            (State::Authenticated, Some(engine)) => engine.into_transport(),
            _ => Err(EngineError::WrongState),
        }
    }

    /// Run the IK handshake to completion over `transport`.
    ///
    /// `payload` is embedded as application data in the identity payload we
    /// send. Returns the peer's application data, or the stage and cause of
    /// the first failed step. Cancelling `ctx` aborts any in-flight send or
    /// receive.
    pub async fn run_ik<T>(
        &mut self,
        transport: &mut T,
        payload: &[u8],
        ctx: &Context,
    ) -> Result<HandshakeOutcome, HandshakeError>
    where
        T: MessageTransport + ?Sized,
    {
        if self.state != State::Start {
            return Err(HandshakeError {
                stage: Stage::Zero,
                role: self.role,
                cause: Cause::Reused,
                partial: Vec::new(),
            });
        }

        let result = match self.role {
            Role::Initiator => self.run_initiator(transport, payload, ctx).await,
            Role::Responder => self.run_responder(transport, payload, ctx).await,
        };

        match result {
            Ok(outcome) => {
                self.state = State::Authenticated;
                debug!(
                    role = %self.role,
                    peer = ?self.remote_peer,
                    "ik handshake authenticated"
                );
                Ok(outcome)
            }
            Err(Failure {
                stage,
                cause,
                partial,
            }) => {
                self.state = State::Failed;
                self.engine = None;
                self.remote_identity = None;
                self.remote_static = None;
                self.handshake_hash = None;
                if self.role == Role::Responder {
                    self.remote_peer = None;
                }
                warn!(
                    role = %self.role,
                    stage = %stage,
                    partial = partial.len(),
                    error = %cause,
                    "ik handshake failed"
                );
                Err(HandshakeError {
                    stage,
                    role: self.role,
                    cause,
                    partial,
                })
            }
        }
    }

    fn local_payload(&self, data: &[u8]) -> Vec<u8> {
        binding::identity_payload(
            &self.config.identity.public(),
            self.config.static_key_sig.clone(),
            data.to_vec(),
        )
        .marshal()
    }

    // ===== Initiator: -> e, es, s, ss  then  <- e, ee, se =====

    async fn run_initiator<T>(
        &mut self,
        transport: &mut T,
        payload: &[u8],
        ctx: &Context,
    ) -> Result<HandshakeOutcome, Failure>
    where
        T: MessageTransport + ?Sized,
    {
        let max = self.config.max_message_len;

        let Some(expected) = self.remote_peer else {
            return Err(Failure::new(
                Stage::Zero,
                Cause::PreconditionUnmet(Precondition::NoRemotePeer),
            ));
        };
        let cached = self.config.key_cache.load(&expected);
        if cached.is_unknown() {
            return Err(Failure::new(
                Stage::Zero,
                Cause::PreconditionUnmet(Precondition::UnknownStaticKey(expected)),
            ));
        }

        let mut engine = E::init(
            Role::Initiator,
            &self.config.prologue,
            &self.config.static_keypair,
            Some(&cached),
        )
        .map_err(|e| Failure::new(Stage::Zero, Cause::ProtocolFailure(e)))?;

        // stage 0
        let hello = self.local_payload(payload);
        send_stage(&mut engine, Stage::Zero, transport, &hello, max, ctx)
            .await
            .map_err(|cause| Failure::new(Stage::Zero, cause))?;
        self.state = State::Stage0Sent;
        debug!(role = %self.role, stage = %Stage::Zero, "sent handshake message");

        // stage 1
        let (received, plaintext) =
            recv_stage(&mut engine, Stage::One, transport, max, ctx).await?;
        self.state = State::Stage1Received;
        debug!(
            role = %self.role,
            stage = %Stage::One,
            len = received.len(),
            "received handshake message"
        );
        let fail = |cause: Cause| Failure::after(Stage::One, cause, &received);

        let remote = IdentityPayload::unmarshal(&plaintext).map_err(|e| fail(e.into()))?;
        let identity = decode_identity(&remote).map_err(|e| fail(binding_cause(e)))?;
        let actual = derive_peer_id(&identity);
        self.remote_identity = Some(identity);

        // The dialed id must be the one the presented identity key derives to.
        if actual != expected {
            return Err(fail(Cause::IdentityMismatch { expected, actual }));
        }

        // Checked against the cached key, not the engine's view of it.
        binding::verify_binding(&remote, &cached).map_err(|e| fail(binding_cause(e)))?;

        self.remote_static = Some(cached);
        self.handshake_hash = Some(engine.handshake_hash());
        self.engine = Some(engine);
        Ok(HandshakeOutcome {
            payload: remote.data,
            received,
        })
    }

    // ===== Responder: <- e, es, s, ss  then  -> e, ee, se =====

    async fn run_responder<T>(
        &mut self,
        transport: &mut T,
        payload: &[u8],
        ctx: &Context,
    ) -> Result<HandshakeOutcome, Failure>
    where
        T: MessageTransport + ?Sized,
    {
        let max = self.config.max_message_len;

        let mut engine = E::init(
            Role::Responder,
            &self.config.prologue,
            &self.config.static_keypair,
            None,
        )
        .map_err(|e| Failure::new(Stage::Zero, Cause::ProtocolFailure(e)))?;

        // stage 0
        let (received, plaintext) =
            recv_stage(&mut engine, Stage::Zero, transport, max, ctx).await?;
        self.state = State::Stage0Received;
        debug!(
            role = %self.role,
            stage = %Stage::Zero,
            len = received.len(),
            "received handshake message"
        );
        let fail = |cause: Cause| Failure::after(Stage::Zero, cause, &received);

        let remote = IdentityPayload::unmarshal(&plaintext).map_err(|e| fail(e.into()))?;
        let identity = decode_identity(&remote).map_err(|e| fail(binding_cause(e)))?;

        // Learned here; the responder has no prior expectation. The same
        // decoded key both names the peer and checks the signature.
        let adopted = derive_peer_id(&identity);
        self.remote_peer = Some(adopted);

        // No cache entry to lean on: the live static key from this exchange.
        let live = engine
            .remote_static()
            .ok_or_else(|| fail(Cause::ProtocolFailure(EngineError::MissingRemoteKey)))?;
        binding::verify_signature(&identity, &remote.identity_sig, &live)
            .map_err(|e| fail(binding_cause(e)))?;
        self.remote_identity = Some(identity);

        // stage 1
        let reply = self.local_payload(payload);
        send_stage(&mut engine, Stage::One, transport, &reply, max, ctx)
            .await
            .map_err(|cause| Failure::after(Stage::One, cause, &received))?;
        self.state = State::Stage1Sent;
        debug!(role = %self.role, stage = %Stage::One, "sent handshake message");

        self.remote_static = Some(live);
        self.handshake_hash = Some(engine.handshake_hash());
        self.engine = Some(engine);
        Ok(HandshakeOutcome {
            payload: remote.data,
            received,
        })
    }
}

impl<E: KeyExchange> fmt::Debug for Session<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("role", &self.role)
            .field("state", &self.state)
            .field("remote_peer", &self.remote_peer)
            .finish_non_exhaustive()
    }
}
