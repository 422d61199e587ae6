//! Mnemonic key derivation
//!
//! Follows the TON mnemonic scheme:
//! - `entropy = HMAC-SHA512(key = words.join(" "), msg = password)`
//! - `seed = PBKDF2-HMAC-SHA512(entropy, "TON default seed", 100_000 rounds)`
//! - the ed25519 secret key is the first 32 bytes of the seed

use ed25519_dalek::{Signer as _, SigningKey, VerifyingKey};
use hmac::{Hmac, Mac};
use sha2::Sha512;
use std::fmt;
use thiserror::Error;
use zeroize::Zeroizing;

const PBKDF_ITERATIONS: u32 = 100_000;
const DEFAULT_SEED_SALT: &[u8] = b"TON default seed";
const SEED_VERSION_SALT: &[u8] = b"TON seed version";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DerivationError {
    #[error("mnemonic is empty")]
    Empty,

    #[error("mnemonic must have 12 or 24 words, got {0}")]
    WordCount(usize),

    #[error("mnemonic word {0} is not a lowercase ASCII word")]
    MalformedWord(usize),

    #[error("invalid HMAC key")]
    Hmac,
}

/// An ed25519 key pair; the secret half never leaves this type
pub struct KeyPair {
    signing_key: SigningKey,
}

impl KeyPair {
    pub fn from_secret(secret: &[u8; 32]) -> Self {
        Self {
            signing_key: SigningKey::from_bytes(secret),
        }
    }

    pub fn public_key(&self) -> [u8; 32] {
        self.signing_key.verifying_key().to_bytes()
    }

    pub fn verifying_key(&self) -> VerifyingKey {
        self.signing_key.verifying_key()
    }

    pub fn sign(&self, message: &[u8]) -> [u8; 64] {
        self.signing_key.sign(message).to_bytes()
    }
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("public_key", &hex::encode(self.public_key()))
            .finish_non_exhaustive()
    }
}

/// Split a space-separated phrase into normalized words
pub fn split_mnemonic(phrase: &str) -> Vec<String> {
    phrase
        .split_whitespace()
        .map(str::to_lowercase)
        .collect()
}

fn validate_words<S: AsRef<str>>(words: &[S]) -> Result<(), DerivationError> {
    if words.is_empty() {
        return Err(DerivationError::Empty);
    }
    if words.len() != 12 && words.len() != 24 {
        return Err(DerivationError::WordCount(words.len()));
    }
    for (i, word) in words.iter().enumerate() {
        let word = word.as_ref();
        if word.is_empty() || !word.bytes().all(|b| b.is_ascii_lowercase()) {
            return Err(DerivationError::MalformedWord(i + 1));
        }
    }
    Ok(())
}

fn mnemonic_entropy<S: AsRef<str>>(words: &[S]) -> Result<Zeroizing<[u8; 64]>, DerivationError> {
    let phrase = Zeroizing::new(
        words
            .iter()
            .map(|w| w.as_ref())
            .collect::<Vec<&str>>()
            .join(" "),
    );
    let mut mac =
        Hmac::<Sha512>::new_from_slice(phrase.as_bytes()).map_err(|_| DerivationError::Hmac)?;
    mac.update(b"");

    let mut entropy = Zeroizing::new([0u8; 64]);
    entropy.copy_from_slice(&mac.finalize().into_bytes());
    Ok(entropy)
}

/// Derive the key pair for a 12 or 24 word mnemonic
pub fn derive_key_pair<S: AsRef<str>>(words: &[S]) -> Result<KeyPair, DerivationError> {
    validate_words(words)?;
    let entropy = mnemonic_entropy(words)?;

    let mut seed = Zeroizing::new([0u8; 64]);
    pbkdf2::pbkdf2_hmac::<Sha512>(
        &entropy[..],
        DEFAULT_SEED_SALT,
        PBKDF_ITERATIONS,
        &mut seed[..],
    );

    let mut secret = Zeroizing::new([0u8; 32]);
    secret.copy_from_slice(&seed[..32]);
    Ok(KeyPair::from_secret(&secret))
}

/// Whether the phrase carries the seed-version marker of wallet-generated mnemonics
pub fn is_basic_seed<S: AsRef<str>>(words: &[S]) -> Result<bool, DerivationError> {
    validate_words(words)?;
    let entropy = mnemonic_entropy(words)?;

    let mut check = Zeroizing::new([0u8; 64]);
    pbkdf2::pbkdf2_hmac::<Sha512>(
        &entropy[..],
        SEED_VERSION_SALT,
        (PBKDF_ITERATIONS / 256).max(1),
        &mut check[..],
    );
    Ok(check[0] == 0)
}
