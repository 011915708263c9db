use crate::Error;
use aes_gcm_siv::aead::Aead;
use aes_gcm_siv::{Aes256GcmSiv, KeyInit, Nonce};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use rand::TryRngCore;
use rand::rngs::OsRng;
use sha2::{Digest, Sha256};
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

const KEY_SIZE: usize = 32;
const NONCE_SIZE: usize = 12; // AES-GCM-SIV uses 12-byte (96-bit) nonces
const TAG_SIZE: usize = 16;

/// Fills a fresh 256-bit seed from the OS entropy pool.
pub fn generate_random_seed() -> Result<[u8; KEY_SIZE], Error> {
    let mut seed = [0u8; KEY_SIZE];
    OsRng
        .try_fill_bytes(&mut seed)
        .map_err(|_| Error::KeyGeneration)?;
    Ok(seed)
}

/// A user's 256-bit whisper key.
///
/// Keys never leave the process in the live flow. `to_portable` and
/// `from_portable` exist for callers that add their own key persistence.
#[derive(Clone, PartialEq, Eq)]
pub struct SymmetricKey([u8; KEY_SIZE]);

impl SymmetricKey {
    /// Generates a new random key.
    pub fn generate() -> Result<Self, Error> {
        Ok(Self(generate_random_seed()?))
    }

    pub(crate) fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.0
    }

    /// Short hex digest identifying the key in logs without revealing it.
    pub fn fingerprint(&self) -> String {
        let digest = Sha256::digest(self.0);
        digest[..8].iter().map(|byte| format!("{byte:02x}")).collect()
    }

    /// Encodes the raw key as Base64.
    pub fn to_portable(&self) -> String {
        STANDARD.encode(self.0)
    }

    /// Decodes a key produced by [`SymmetricKey::to_portable`].
    pub fn from_portable(encoded: &str) -> Result<Self, Error> {
        let mut bytes = STANDARD.decode(encoded)?;
        if bytes.len() != KEY_SIZE {
            let len = bytes.len();
            bytes.zeroize();
            return Err(Error::Decryption(format!(
                "invalid key length: expected {KEY_SIZE}, got {len}"
            )));
        }

        let mut key = [0u8; KEY_SIZE];
        key.copy_from_slice(&bytes);
        bytes.zeroize();
        Ok(Self(key))
    }
}

impl fmt::Debug for SymmetricKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("SymmetricKey")
            .field(&self.fingerprint())
            .finish()
    }
}

impl From<[u8; KEY_SIZE]> for SymmetricKey {
    fn from(bytes: [u8; KEY_SIZE]) -> Self {
        Self(bytes)
    }
}

impl Zeroize for SymmetricKey {
    fn zeroize(&mut self) {
        self.0.zeroize();
    }
}

impl Drop for SymmetricKey {
    fn drop(&mut self) {
        self.zeroize();
    }
}

impl ZeroizeOnDrop for SymmetricKey {}

/// Seals `plaintext` under `key` and returns `base64(nonce || ciphertext || tag)`.
///
/// Every call draws a fresh nonce, so equal plaintexts produce different output.
pub fn encrypt(plaintext: &str, key: &SymmetricKey) -> Result<String, Error> {
    let cipher = Aes256GcmSiv::new(aes_gcm_siv::Key::<Aes256GcmSiv>::from_slice(
        key.as_bytes(),
    ));

    let mut nonce_bytes = [0u8; NONCE_SIZE];
    rand::rng()
        .try_fill_bytes(&mut nonce_bytes)
        .map_err(|_| Error::Crypto("Nonce generation failed".to_string()))?;
    let nonce = Nonce::from_slice(&nonce_bytes);

    let ciphertext = cipher
        .encrypt(nonce, plaintext.as_bytes())
        .map_err(|_| Error::Crypto("Message encryption failed".to_string()))?;

    let mut sealed = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
    sealed.extend_from_slice(&nonce_bytes);
    sealed.extend_from_slice(&ciphertext);

    Ok(STANDARD.encode(sealed))
}

/// Opens a string produced by [`encrypt`].
///
/// Fails with [`Error::Decryption`] on malformed Base64, truncated input,
/// a key mismatch, or a plaintext that is not UTF-8.
pub fn decrypt(encoded: &str, key: &SymmetricKey) -> Result<String, Error> {
    let sealed = STANDARD.decode(encoded)?;
    if sealed.len() < NONCE_SIZE + TAG_SIZE {
        return Err(Error::Decryption("ciphertext too short".to_string()));
    }

    let (nonce, ciphertext) = sealed.split_at(NONCE_SIZE);
    let cipher = Aes256GcmSiv::new(aes_gcm_siv::Key::<Aes256GcmSiv>::from_slice(
        key.as_bytes(),
    ));
    let plaintext = cipher.decrypt(Nonce::from_slice(nonce), ciphertext)?;

    String::from_utf8(plaintext).map_err(|err| Error::Decryption(err.to_string()))
}
