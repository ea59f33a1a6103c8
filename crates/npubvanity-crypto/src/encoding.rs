//! NIP-19 bech32 encoding: `npub` public keys and `nsec` private keys

use bech32::{Bech32, Hrp};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EncodingError {
    #[error("Bech32 encoding failed: {0}")]
    Bech32Error(String),
    #[error("Expected '{expected}' prefix, found '{found}'")]
    WrongPrefix { expected: &'static str, found: String },
    #[error("Invalid payload length {0} (expected 32 bytes)")]
    InvalidLength(usize),
}

/// Human-readable part of a public key identifier
pub const NPUB_HRP: Hrp = Hrp::parse_unchecked("npub");
/// Human-readable part of a private key identifier
pub const NSEC_HRP: Hrp = Hrp::parse_unchecked("nsec");

/// Encode a 32-byte x-only public key as `npub1...`
pub fn encode_npub(public_key: &[u8; 32]) -> Result<String, EncodingError> {
    encode_key(NPUB_HRP, public_key)
}

/// Encode a 32-byte secret key as `nsec1...`
pub fn encode_nsec(private_key: &[u8; 32]) -> Result<String, EncodingError> {
    encode_key(NSEC_HRP, private_key)
}

/// Decode an `npub1...` identifier into the raw public key
pub fn decode_npub(input: &str) -> Result<[u8; 32], EncodingError> {
    decode_key(NPUB_HRP, "npub", input)
}

/// Decode an `nsec1...` identifier into the raw secret key
pub fn decode_nsec(input: &str) -> Result<[u8; 32], EncodingError> {
    decode_key(NSEC_HRP, "nsec", input)
}

fn encode_key(hrp: Hrp, key: &[u8; 32]) -> Result<String, EncodingError> {
    bech32::encode::<Bech32>(hrp, key).map_err(|e| EncodingError::Bech32Error(e.to_string()))
}

fn decode_key(hrp: Hrp, expected: &'static str, input: &str) -> Result<[u8; 32], EncodingError> {
    let (found, data) =
        bech32::decode(input).map_err(|e| EncodingError::Bech32Error(e.to_string()))?;

    if found != hrp {
        return Err(EncodingError::WrongPrefix {
            expected,
            found: found.to_string(),
        });
    }

    let len = data.len();
    data.try_into().map_err(|_| EncodingError::InvalidLength(len))
}

#[cfg(test)]
mod tests {
    use super::*;

    // Test vectors from NIP-19
    const NPUB: &str = "npub10elfcs4fr0l0r8af98jlmgdh9c8tcxjvz9qkw038js35mp4dma8qzvjptg";
    const NPUB_HEX: &str = "7e7e9c42a91bfef19fa929e5fda1b72e0ebc1a4c1141673e2794234d86addf4e";
    const NSEC: &str = "nsec1vl029mgpspedva04g90vltkh6fvh240zqtv9k0t9af8935ke9laqsnlfe5";
    const NSEC_HEX: &str = "67dea2ed018072d675f5415ecfaed7d2597555e202d85b3d65ea4e58d2d92ffa";

    fn bytes32(hex_str: &str) -> [u8; 32] {
        let mut out = [0u8; 32];
        hex::decode_to_slice(hex_str, &mut out).unwrap();
        out
    }

    #[test]
    fn test_npub_known_vector() {
        assert_eq!(encode_npub(&bytes32(NPUB_HEX)).unwrap(), NPUB);
        assert_eq!(decode_npub(NPUB).unwrap(), bytes32(NPUB_HEX));
    }

    #[test]
    fn test_nsec_known_vector() {
        assert_eq!(encode_nsec(&bytes32(NSEC_HEX)).unwrap(), NSEC);
        assert_eq!(decode_nsec(NSEC).unwrap(), bytes32(NSEC_HEX));
    }

    #[test]
    fn test_npub_shape() {
        let npub = encode_npub(&[0xab; 32]).unwrap();
        assert!(npub.starts_with("npub1"));
        assert_eq!(npub.len(), 63);
    }

    #[test]
    fn test_wrong_prefix_rejected() {
        let err = decode_npub(NSEC).unwrap_err();
        assert!(matches!(err, EncodingError::WrongPrefix { expected: "npub", .. }));
    }

    #[test]
    fn test_corrupted_checksum_rejected() {
        let mut corrupted = NPUB.to_string();
        corrupted.pop();
        corrupted.push('q');
        assert!(matches!(
            decode_npub(&corrupted),
            Err(EncodingError::Bech32Error(_))
        ));
    }

    #[test]
    fn test_short_payload_rejected() {
        let short = bech32::encode::<Bech32>(NPUB_HRP, &[1u8; 20]).unwrap();
        assert_eq!(decode_npub(&short), Err(EncodingError::InvalidLength(20)));
    }
}
