use std::sync::Arc;

use reishi_ik::identity::Keypair;
use reishi_ik::{sign_static_key, KeyPair, MemoryKeyCache, StaticKeyCache, MAX_MESSAGE_LEN};

use crate::error::ConfigError;

/// Shared configuration for initiator and responder sessions.
///
/// Wrap in an `Arc` and reuse across sessions; nothing in it changes per
/// handshake.
pub struct IkConfig {
    pub(crate) static_keypair: KeyPair,
    pub(crate) identity: Keypair,
    /// Signature over our static key, embedded in every payload we send.
    pub(crate) static_key_sig: Vec<u8>,
    pub(crate) prologue: Vec<u8>,
    pub(crate) key_cache: Arc<dyn StaticKeyCache>,
    pub(crate) max_message_len: usize,
}

impl IkConfig {
    pub fn static_keypair(&self) -> &KeyPair {
        &self.static_keypair
    }

    pub fn identity(&self) -> &Keypair {
        &self.identity
    }

    pub fn local_peer_id(&self) -> reishi_ik::PeerId {
        self.identity.public().to_peer_id()
    }

    pub fn prologue(&self) -> &[u8] {
        &self.prologue
    }

    pub fn key_cache(&self) -> &Arc<dyn StaticKeyCache> {
        &self.key_cache
    }

    pub fn max_message_len(&self) -> usize {
        self.max_message_len
    }
}

impl core::fmt::Debug for IkConfig {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("IkConfig")
            .field("static_public", &self.static_keypair.public)
            .field("peer_id", &self.local_peer_id())
            .field("prologue_len", &self.prologue.len())
            .field("max_message_len", &self.max_message_len)
            .finish_non_exhaustive()
    }
}

/// Builder for [`IkConfig`].
///
/// # Example
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use rand_core::OsRng;
/// use reishi_ik::identity::Keypair;
/// use reishi_ik::{KeyPair, MemoryKeyCache};
/// use reishi_ik_session::IkConfigBuilder;
///
/// let cache = Arc::new(MemoryKeyCache::new());
/// let config = IkConfigBuilder::new(KeyPair::generate(&mut OsRng), Keypair::generate_ed25519())
///     .with_prologue(b"/my-app/1.0.0".to_vec())
///     .with_key_cache(cache)
///     .build()
///     .unwrap();
/// ```
pub struct IkConfigBuilder {
    static_keypair: KeyPair,
    identity: Keypair,
    prologue: Vec<u8>,
    key_cache: Option<Arc<dyn StaticKeyCache>>,
    max_message_len: usize,
}

impl IkConfigBuilder {
    /// Start from the local Noise static keypair and libp2p identity.
    pub fn new(static_keypair: KeyPair, identity: Keypair) -> Self {
        Self {
            static_keypair,
            identity,
            prologue: Vec::new(),
            key_cache: None,
            max_message_len: MAX_MESSAGE_LEN,
        }
    }

    /// Set a custom prologue for the handshake.
    ///
    /// Both sides must use the same prologue for the handshake to succeed.
    /// Defaults to empty.
    pub fn with_prologue(mut self, prologue: Vec<u8>) -> Self {
        self.prologue = prologue;
        self
    }

    /// Where initiators look up the responder's static key.
    ///
    /// Defaults to an empty cache, which makes every initiator fail fast.
    pub fn with_key_cache(mut self, cache: Arc<dyn StaticKeyCache>) -> Self {
        self.key_cache = Some(cache);
        self
    }

    /// Largest handshake frame accepted or sent.
    pub fn with_max_message_len(mut self, max: usize) -> Self {
        self.max_message_len = max;
        self
    }

    pub fn build(self) -> Result<IkConfig, ConfigError> {
        if self.max_message_len == 0 || self.max_message_len > MAX_MESSAGE_LEN {
            return Err(ConfigError::MessageLen {
                got: self.max_message_len,
                max: MAX_MESSAGE_LEN,
            });
        }
        let static_key_sig = sign_static_key(&self.identity, &self.static_keypair.public)?;
        Ok(IkConfig {
            static_keypair: self.static_keypair,
            identity: self.identity,
            static_key_sig,
            prologue: self.prologue,
            key_cache: self
                .key_cache
                .unwrap_or_else(|| Arc::new(MemoryKeyCache::new())),
            max_message_len: self.max_message_len,
        })
    }
}
