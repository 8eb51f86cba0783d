//! Lookup of previously learned Noise static keys by peer identity.

use std::collections::HashMap;

use libp2p_identity::PeerId;
use parking_lot::RwLock;

use crate::keys::PublicKey;

/// Read-only access to cached remote static keys.
///
/// A miss returns [`PublicKey::UNKNOWN`]. Implementations must tolerate
/// concurrent reads from many sessions.
pub trait StaticKeyCache: Send + Sync {
    fn load(&self, peer: &PeerId) -> PublicKey;
}

impl<F> StaticKeyCache for F
where
    F: Fn(&PeerId) -> PublicKey + Send + Sync,
{
    fn load(&self, peer: &PeerId) -> PublicKey {
        self(peer)
    }
}

/// In-memory cache. Entries live until removed.
#[derive(Debug, Default)]
pub struct MemoryKeyCache {
    entries: RwLock<HashMap<PeerId, PublicKey>>,
}

impl MemoryKeyCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the static key learned for `peer`, returning the previous one.
    pub fn insert(&self, peer: PeerId, key: PublicKey) -> Option<PublicKey> {
        self.entries.write().insert(peer, key)
    }

    pub fn remove(&self, peer: &PeerId) -> Option<PublicKey> {
        self.entries.write().remove(peer)
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl StaticKeyCache for MemoryKeyCache {
    fn load(&self, peer: &PeerId) -> PublicKey {
        self.entries
            .read()
            .get(peer)
            .copied()
            .unwrap_or(PublicKey::UNKNOWN)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn miss_returns_unknown_sentinel() {
        let cache = MemoryKeyCache::new();
        assert!(cache.load(&PeerId::random()).is_unknown());
    }

    #[test]
    fn insert_then_load() {
        let cache = MemoryKeyCache::new();
        let peer = PeerId::random();
        let key = PublicKey::from_bytes([9u8; 32]);

        assert!(cache.insert(peer, key).is_none());
        assert_eq!(cache.load(&peer), key);
        assert_eq!(cache.len(), 1);

        assert_eq!(cache.remove(&peer), Some(key));
        assert!(cache.load(&peer).is_unknown());
        assert!(cache.is_empty());
    }

    #[test]
    fn closures_and_shared_caches_are_caches() {
        let peer = PeerId::random();
        let key = PublicKey::from_bytes([3u8; 32]);
        let fixture = move |p: &PeerId| {
            if *p == peer {
                key
            } else {
                PublicKey::UNKNOWN
            }
        };
        let shared: Arc<dyn StaticKeyCache> = Arc::new(fixture);

        assert_eq!(shared.load(&peer), key);
        assert!(shared.load(&PeerId::random()).is_unknown());
    }
}
