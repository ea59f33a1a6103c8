//! Deterministic key encoder for engine tests

use std::sync::atomic::{AtomicU64, Ordering};

use npubvanity_crypto::{KeyEncoder, KeyError, RawKeypair, Secp256k1Error};
use npubvanity_pattern::SEARCHABLE_LENGTH;

#[derive(Debug, Clone, Copy)]
enum Mode {
    /// Every `n`-th key encodes as `npub1<head>qqq...`
    MatchEvery(u64),
    Never,
    FailAfter(u64),
    Panic,
}

/// Keys are a global counter; the public key equals the private key.
#[derive(Debug)]
pub(crate) struct ScriptedEncoder {
    mode: Mode,
    head: &'static str,
    counter: AtomicU64,
}

impl ScriptedEncoder {
    pub(crate) fn matching_every(n: u64, head: &'static str) -> Self {
        Self::with_mode(Mode::MatchEvery(n.max(1)), head)
    }

    pub(crate) fn never_matching() -> Self {
        Self::with_mode(Mode::Never, "")
    }

    pub(crate) fn failing_after(n: u64) -> Self {
        Self::with_mode(Mode::FailAfter(n), "")
    }

    pub(crate) fn panicking() -> Self {
        Self::with_mode(Mode::Panic, "")
    }

    fn with_mode(mode: Mode, head: &'static str) -> Self {
        Self {
            mode,
            head,
            counter: AtomicU64::new(0),
        }
    }

    pub(crate) fn generated(&self) -> u64 {
        self.counter.load(Ordering::Relaxed)
    }
}

fn counter_key(n: u64) -> [u8; 32] {
    let mut key = [0u8; 32];
    key[24..].copy_from_slice(&n.to_be_bytes());
    key
}

fn key_counter(key: &[u8; 32]) -> u64 {
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&key[24..]);
    u64::from_be_bytes(bytes)
}

impl KeyEncoder for ScriptedEncoder {
    fn generate_keypair(&self) -> Result<RawKeypair, KeyError> {
        let n = self.counter.fetch_add(1, Ordering::Relaxed) + 1;
        match self.mode {
            Mode::FailAfter(limit) if n > limit => Err(KeyError::Generation(
                Secp256k1Error::Entropy("scripted entropy failure".into()),
            )),
            Mode::Panic => panic!("scripted encoder panic"),
            _ => {
                let key = counter_key(n);
                Ok(RawKeypair {
                    private_key: key,
                    public_key: key,
                })
            }
        }
    }

    fn encode_public(&self, public_key: &[u8; 32]) -> Result<String, KeyError> {
        let n = key_counter(public_key);
        let head = match self.mode {
            Mode::MatchEvery(every) if n % every == 0 => self.head,
            _ => "",
        };
        // Unique tail keeps matched identifiers distinct
        let tail = format!("{:0>12}", n);
        let filler = "q".repeat(SEARCHABLE_LENGTH - head.len() - tail.len());
        Ok(format!("npub1{}{}{}", head, filler, tail.replace('1', "x")))
    }

    fn encode_private(&self, private_key: &[u8; 32]) -> Result<String, KeyError> {
        Ok(format!("nsec1{}", hex::encode(private_key)))
    }

    fn derive_public(&self, private_key: &[u8; 32]) -> Result<[u8; 32], KeyError> {
        Ok(*private_key)
    }
}
