//! Local X25519 static keys used as Noise transport keys.

use rand_core::CryptoRngCore;
use subtle::ConstantTimeEq;
use x25519_dalek::{PublicKey as DalekPublicKey, StaticSecret as DalekStaticSecret};
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

/// An X25519 static secret key.
///
/// Zeroized from memory when dropped.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct StaticSecret(DalekStaticSecret);

impl StaticSecret {
    /// Create from raw 32-byte secret key material.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(DalekStaticSecret::from(bytes))
    }

    /// Export the raw secret key material.
    ///
    /// The copy is wiped when the returned wrapper is dropped.
    pub fn to_bytes(&self) -> Zeroizing<[u8; 32]> {
        Zeroizing::new(self.0.to_bytes())
    }
}

impl core::fmt::Debug for StaticSecret {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str("StaticSecret([REDACTED])")
    }
}

/// An X25519 public key (32 bytes).
///
/// The all-zero value is reserved as the "unknown key" sentinel returned by
/// a [`StaticKeyCache`](crate::StaticKeyCache) miss.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct PublicKey([u8; 32]);

impl PublicKey {
    /// The length of a public key in bytes.
    pub const LEN: usize = 32;

    /// Sentinel for a peer whose static key was never learned.
    pub const UNKNOWN: Self = Self([0u8; 32]);

    /// Create from raw 32-byte public key.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Create from a slice, returning `None` unless it is exactly 32 bytes.
    pub fn try_from_slice(bytes: &[u8]) -> Option<Self> {
        <[u8; 32]>::try_from(bytes).ok().map(Self)
    }

    /// Access the raw bytes of this public key.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Whether this is the all-zero sentinel. Constant time.
    pub fn is_unknown(&self) -> bool {
        bool::from(self.0.ct_eq(&[0u8; 32]))
    }
}

impl Default for PublicKey {
    fn default() -> Self {
        Self::UNKNOWN
    }
}

impl AsRef<[u8]> for PublicKey {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl core::fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "PublicKey({:02x?})", &self.0[..4])
    }
}

/// The local static keypair a peer presents in the handshake.
pub struct KeyPair {
    pub secret: StaticSecret,
    pub public: PublicKey,
}

impl KeyPair {
    /// Generate a new random keypair using the provided RNG.
    pub fn generate(rng: &mut impl CryptoRngCore) -> Self {
        Self::from_secret(StaticSecret(DalekStaticSecret::random_from_rng(rng)))
    }

    /// Create a keypair from an existing static secret.
    pub fn from_secret(secret: StaticSecret) -> Self {
        let public = PublicKey(DalekPublicKey::from(&secret.0).to_bytes());
        Self { secret, public }
    }

    /// Create a keypair from raw 32-byte secret key material.
    pub fn from_secret_bytes(bytes: [u8; 32]) -> Self {
        Self::from_secret(StaticSecret::from_bytes(bytes))
    }
}

impl core::fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("KeyPair")
            .field("public", &self.public)
            .finish_non_exhaustive()
    }
}
