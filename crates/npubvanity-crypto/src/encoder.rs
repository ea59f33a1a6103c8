//! Key generation and encoding seam used by the search engine

use std::fmt;

use k256::elliptic_curve::zeroize::Zeroize;
use thiserror::Error;

use crate::encoding::{self, EncodingError};
use crate::secp256k1::{Secp256k1Error, Secp256k1Keypair};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum KeyError {
    #[error("Key generation failed: {0}")]
    Generation(#[from] Secp256k1Error),
    #[error(transparent)]
    Encoding(#[from] EncodingError),
}

/// Raw key material of one candidate.
///
/// The private key is wiped when the pair is dropped.
#[derive(Clone, PartialEq, Eq)]
pub struct RawKeypair {
    pub private_key: [u8; 32],
    pub public_key: [u8; 32],
}

impl Zeroize for RawKeypair {
    fn zeroize(&mut self) {
        self.private_key.zeroize();
    }
}

impl Drop for RawKeypair {
    fn drop(&mut self) {
        self.zeroize();
    }
}

impl fmt::Debug for RawKeypair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RawKeypair")
            .field("public_key", &hex::encode(self.public_key))
            .finish_non_exhaustive()
    }
}

/// Generates keypairs and renders them as textual identifiers.
///
/// Implementations must be usable from many worker threads at once.
pub trait KeyEncoder: Send + Sync {
    /// Generate a uniformly random keypair
    fn generate_keypair(&self) -> Result<RawKeypair, KeyError>;

    /// Render a public key as its identifier (e.g. `npub1...`)
    fn encode_public(&self, public_key: &[u8; 32]) -> Result<String, KeyError>;

    /// Render a private key as its identifier (e.g. `nsec1...`)
    fn encode_private(&self, private_key: &[u8; 32]) -> Result<String, KeyError>;

    /// Derive the public key belonging to a private key
    fn derive_public(&self, private_key: &[u8; 32]) -> Result<[u8; 32], KeyError>;
}

/// Nostr (NIP-19) keys backed by the OS entropy source
#[derive(Debug, Clone, Copy, Default)]
pub struct NostrKeyEncoder;

impl KeyEncoder for NostrKeyEncoder {
    fn generate_keypair(&self) -> Result<RawKeypair, KeyError> {
        let keypair = Secp256k1Keypair::try_generate()?;
        Ok(RawKeypair {
            private_key: keypair.private_key_bytes(),
            public_key: keypair.x_only_public_key(),
        })
    }

    fn encode_public(&self, public_key: &[u8; 32]) -> Result<String, KeyError> {
        Ok(encoding::encode_npub(public_key)?)
    }

    fn encode_private(&self, private_key: &[u8; 32]) -> Result<String, KeyError> {
        Ok(encoding::encode_nsec(private_key)?)
    }

    fn derive_public(&self, private_key: &[u8; 32]) -> Result<[u8; 32], KeyError> {
        Ok(Secp256k1Keypair::from_bytes(private_key)?.x_only_public_key())
    }
}
