#![deny(unsafe_code)]

//! # reishi-ik-session
//!
//! Async driver for the [`reishi_ik`] Noise IK handshake between libp2p
//! peers that have met before.
//!
//! This crate provides:
//!
//! - [`Session`], which runs both IK stages for one role and authenticates
//!   the peer's identity payload
//! - [`IkConfig`] / [`IkConfigBuilder`] holding the local keys, prologue and
//!   static key cache shared by many sessions
//! - [`MessageTransport`] with a length-prefixed [`FramedTransport`]
//! - [`Context`] for cancellation and deadlines
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use rand_core::OsRng;
//! use reishi_ik_session::{
//!     Context, FramedTransport, IkConfigBuilder, KeyPair, MemoryKeyCache, Session,
//! };
//! use reishi_ik_session::identity::Keypair;
//!
//! # async fn dial(stream: tokio::io::DuplexStream, server: reishi_ik_session::PeerId) {
//! // Static key of the server, learned on an earlier connection.
//! let cache = Arc::new(MemoryKeyCache::new());
//!
//! let config = IkConfigBuilder::new(KeyPair::generate(&mut OsRng), Keypair::generate_ed25519())
//!     .with_key_cache(cache)
//!     .build()
//!     .unwrap();
//!
//! let mut session: Session = Session::initiator(Arc::new(config), server);
//! let mut transport = FramedTransport::new(stream);
//! let outcome = session
//!     .run_ik(&mut transport, b"hello", &Context::background())
//!     .await
//!     .unwrap();
//! println!("peer said {:?}", outcome.payload);
//! let channel = session.into_transport().unwrap();
//! # drop(channel);
//! # }
//! ```

pub mod config;
pub mod context;
pub mod error;
pub mod session;
pub mod transport;

pub use config::{IkConfig, IkConfigBuilder};
pub use context::{AbortReason, Canceller, Context};
pub use error::{Cause, ConfigError, HandshakeError, Precondition};
pub use session::{HandshakeOutcome, Session, State};
pub use transport::{FramedTransport, MessageTransport};

// Re-export key types from reishi-ik for convenience.
pub use reishi_ik::{
    identity, KeyExchange, KeyPair, MemoryKeyCache, NoiseIk, PeerId, PublicKey, Role, Stage,
    StaticKeyCache, StaticSecret, TransportState, PROTOCOL_NAME,
};
