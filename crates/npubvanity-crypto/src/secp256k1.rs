//! secp256k1 keypairs with BIP-340 x-only public keys, as used by Nostr

use std::fmt;

use k256::{
    elliptic_curve::{sec1::ToEncodedPoint, zeroize::Zeroizing},
    PublicKey, SecretKey,
};
use rand_core::{OsRng, RngCore};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Secp256k1Error {
    #[error("Invalid private key")]
    InvalidPrivateKey,
    #[error("Entropy source failure: {0}")]
    Entropy(String),
}

/// A secp256k1 keypair
#[derive(Clone)]
pub struct Secp256k1Keypair {
    secret_key: SecretKey,
    public_key: PublicKey,
}

impl Secp256k1Keypair {
    /// Generate a new random keypair from the OS entropy source.
    ///
    /// Candidate secrets outside `[1, n)` are rejected and redrawn. A failing
    /// entropy source is reported, not retried.
    pub fn try_generate() -> Result<Self, Secp256k1Error> {
        Self::generate_from(|bytes| {
            OsRng
                .try_fill_bytes(bytes)
                .map_err(|e| Secp256k1Error::Entropy(e.to_string()))
        })
    }

    /// Draw candidate secrets from `fill` until one is a valid scalar.
    ///
    /// The draw buffer is wiped on every exit path.
    fn generate_from<F>(mut fill: F) -> Result<Self, Secp256k1Error>
    where
        F: FnMut(&mut [u8]) -> Result<(), Secp256k1Error>,
    {
        let mut bytes = Zeroizing::new([0u8; 32]);
        loop {
            fill(&mut bytes[..])?;
            if let Ok(keypair) = Self::from_bytes(&bytes) {
                return Ok(keypair);
            }
        }
    }

    /// Create from raw 32-byte private key
    pub fn from_bytes(bytes: &[u8; 32]) -> Result<Self, Secp256k1Error> {
        let secret_key = SecretKey::from_bytes(bytes.into())
            .map_err(|_| Secp256k1Error::InvalidPrivateKey)?;
        let public_key = secret_key.public_key();
        Ok(Self { secret_key, public_key })
    }

    /// Get the private key as bytes
    pub fn private_key_bytes(&self) -> [u8; 32] {
        self.secret_key.to_bytes().into()
    }

    /// Get the compressed public key (33 bytes: 0x02/0x03 || x)
    pub fn public_key_compressed(&self) -> [u8; 33] {
        let point = self.public_key.to_encoded_point(true);
        let mut result = [0u8; 33];
        result.copy_from_slice(point.as_bytes());
        result
    }

    /// Get the x-only public key (32 bytes), the Nostr public key
    pub fn x_only_public_key(&self) -> [u8; 32] {
        let compressed = self.public_key_compressed();
        let mut result = [0u8; 32];
        result.copy_from_slice(&compressed[1..33]);
        result
    }
}

impl fmt::Debug for Secp256k1Keypair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Secp256k1Keypair")
            .field("public_key", &hex::encode(self.x_only_public_key()))
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keypair_generation() {
        let kp = Secp256k1Keypair::try_generate().unwrap();
        assert_eq!(kp.private_key_bytes().len(), 32);
        assert_eq!(kp.x_only_public_key().len(), 32);
        let prefix = kp.public_key_compressed()[0];
        assert!(prefix == 0x02 || prefix == 0x03);
    }

    #[test]
    fn test_generated_keys_differ() {
        let a = Secp256k1Keypair::try_generate().unwrap();
        let b = Secp256k1Keypair::try_generate().unwrap();
        assert_ne!(a.private_key_bytes(), b.private_key_bytes());
    }

    #[test]
    fn test_known_vector() {
        let mut privkey = [0u8; 32];
        privkey[31] = 1;

        let kp = Secp256k1Keypair::from_bytes(&privkey).unwrap();

        // Generator point G
        assert_eq!(
            hex::encode(kp.x_only_public_key()),
            "79be667ef9dcbbac55a06295ce870b07029bfcdb2dce28d959f2815b16f81798"
        );
    }

    #[test]
    fn test_rejects_zero_key() {
        assert_eq!(
            Secp256k1Keypair::from_bytes(&[0u8; 32]).unwrap_err(),
            Secp256k1Error::InvalidPrivateKey
        );
    }

    #[test]
    fn test_out_of_range_draws_are_redrawn() {
        let mut draws = 0;
        let kp = Secp256k1Keypair::generate_from(|bytes| {
            draws += 1;
            // Zero, then the group order n, are both invalid scalars
            match draws {
                1 => bytes.fill(0),
                2 => hex::decode_to_slice(
                    "fffffffffffffffffffffffffffffffebaaedce6af48a03bbfd25e8cd0364141",
                    bytes,
                )
                .unwrap(),
                _ => {
                    bytes.fill(0);
                    bytes[31] = 1;
                }
            }
            Ok(())
        })
        .unwrap();

        assert_eq!(draws, 3);
        assert_eq!(
            hex::encode(kp.x_only_public_key()),
            "79be667ef9dcbbac55a06295ce870b07029bfcdb2dce28d959f2815b16f81798"
        );
    }

    #[test]
    fn test_entropy_failure_is_returned() {
        let err = Secp256k1Keypair::generate_from(|_| {
            Err(Secp256k1Error::Entropy("unavailable".into()))
        })
        .unwrap_err();
        assert_eq!(err, Secp256k1Error::Entropy("unavailable".into()));
    }

    #[test]
    fn test_debug_hides_secret() {
        let mut privkey = [0u8; 32];
        privkey[31] = 1;
        let kp = Secp256k1Keypair::from_bytes(&privkey).unwrap();
        let rendered = format!("{:?}", kp);
        assert!(!rendered.contains(&hex::encode(privkey)));
    }
}
