//! npubvanity Crypto Primitives
//!
//! secp256k1 keypairs and NIP-19 bech32 encoding for Nostr identities.

pub mod secp256k1;
pub mod encoding;
pub mod encoder;

pub use self::secp256k1::{Secp256k1Error, Secp256k1Keypair};
pub use self::encoding::{
    decode_npub, decode_nsec, encode_npub, encode_nsec, EncodingError, NPUB_HRP, NSEC_HRP,
};
pub use self::encoder::{KeyEncoder, KeyError, NostrKeyEncoder, RawKeypair};

// Re-export dependencies for use by other crates
pub use hex;
