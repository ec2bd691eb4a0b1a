//! crypto/keystore.rs
//! Caller-supplied sparse map from tree position to raw key material.
//!
//! Read-only once handed to a decryption session: derivation only ever reads it.
//! Derived keys go to a separate cache, never back into the store.

use std::collections::BTreeMap;
use std::fmt;

use bytes::Bytes;

use crate::constants::{KEY_LEN_16, KEY_LEN_32};
use crate::crypto::types::KeyDerivationError;

#[derive(Clone, Default, PartialEq, Eq)]
pub struct KeyStore {
    keys: BTreeMap<u64, Bytes>,
}

impl KeyStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert raw key material for `position`, replacing any previous entry.
    ///
    /// Errors:
    /// - `InvalidPosition` for position 0.
    /// - `InvalidKeyMaterial` unless the key is 16 or 32 bytes.
    pub fn insert(&mut self, position: u64, key: impl Into<Bytes>) -> Result<(), KeyDerivationError> {
        let key = key.into();
        if position == 0 {
            return Err(KeyDerivationError::InvalidPosition { position });
        }
        if key.len() != KEY_LEN_16 && key.len() != KEY_LEN_32 {
            return Err(KeyDerivationError::InvalidKeyMaterial { position, len: key.len() });
        }
        self.keys.insert(position, key);
        Ok(())
    }

    /// Builder form of [`insert`](Self::insert).
    pub fn with_key(mut self, position: u64, key: impl Into<Bytes>) -> Result<Self, KeyDerivationError> {
        self.insert(position, key)?;
        Ok(self)
    }

    /// Build a store from `(position, hex)` pairs as they arrive from key services.
    pub fn from_hex_pairs<I, S>(pairs: I) -> Result<Self, KeyDerivationError>
    where
        I: IntoIterator<Item = (u64, S)>,
        S: AsRef<str>,
    {
        let mut store = Self::new();
        for (position, encoded) in pairs {
            let raw = hex::decode(encoded.as_ref().trim()).map_err(|e| KeyDerivationError::InvalidHex {
                position,
                reason: e.to_string(),
            })?;
            store.insert(position, raw)?;
        }
        Ok(store)
    }

    pub fn get(&self, position: u64) -> Option<&Bytes> {
        self.keys.get(&position)
    }

    pub fn contains(&self, position: u64) -> bool {
        self.keys.contains_key(&position)
    }

    /// Positions present, ascending.
    pub fn positions(&self) -> impl Iterator<Item = u64> + '_ {
        self.keys.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

// Key bytes stay out of logs.
impl fmt::Debug for KeyStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyStore")
            .field("positions", &self.keys.keys().collect::<Vec<_>>())
            .finish()
    }
}
