use crate::{Error, SymmetricKey, UserId};
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

/// Holds one whisper key per user for the lifetime of the process.
///
/// Keys are generated lazily on first lookup and never replaced, so text
/// sealed earlier stays readable with the key fetched later.
#[derive(Default)]
pub struct KeyStore {
    keys: RwLock<HashMap<UserId, SymmetricKey>>,
}

impl KeyStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the user's key, generating and storing one if none exists.
    ///
    /// Fails with [`Error::KeyGeneration`] when the OS cannot supply entropy.
    /// Nothing is stored in that case.
    pub fn get_or_create_key(&self, user: UserId) -> Result<SymmetricKey, Error> {
        if let Some(key) = self
            .keys
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&user)
        {
            return Ok(key.clone());
        }

        let mut keys = self.keys.write().unwrap_or_else(PoisonError::into_inner);
        // Another thread may have won the race between the two locks.
        if let Some(key) = keys.get(&user) {
            return Ok(key.clone());
        }

        let key = SymmetricKey::generate().inspect_err(|_| {
            tracing::error!(user = %user, "failed to generate whisper key");
        })?;
        tracing::debug!(user = %user, fingerprint = %key.fingerprint(), "generated whisper key");
        keys.insert(user, key.clone());

        Ok(key)
    }

    /// Whether a key has been generated for the user.
    pub fn contains(&self, user: UserId) -> bool {
        self.keys
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(&user)
    }

    /// Number of users holding a key.
    pub fn len(&self) -> usize {
        self.keys.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Whether no keys have been generated yet.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
