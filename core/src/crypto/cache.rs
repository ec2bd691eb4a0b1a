//! crypto/cache.rs
//! Read-through cache of derived leaf keys, shared by segment workers.
//!
//! Summary: `RwLock<HashMap>` keyed by leaf index plus hit/miss counters.
//! Derivation is deterministic, so a racing double insert stores identical bytes.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock};

use bytes::Bytes;

use crate::crypto::types::KeyDerivationError;

#[derive(Debug, Default)]
pub struct DerivedKeyCache {
    entries: RwLock<HashMap<u64, Bytes>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl DerivedKeyCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, leaf_index: u64) -> Option<Bytes> {
        // A poisoned lock still holds complete entries: writers only insert whole keys.
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries.get(&leaf_index).cloned()
    }

    /// Return the cached key, or derive it with `derive` and remember it.
    /// Failed derivations are not cached.
    pub fn get_or_try_insert_with<F>(&self, leaf_index: u64, derive: F) -> Result<Bytes, KeyDerivationError>
    where
        F: FnOnce() -> Result<Bytes, KeyDerivationError>,
    {
        if let Some(key) = self.get(leaf_index) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(key);
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        let key = derive()?;
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.entry(leaf_index).or_insert_with(|| key.clone());
        Ok(key)
    }

    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.entries.write().unwrap_or_else(PoisonError::into_inner).clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_lookup_is_a_hit() {
        let cache = DerivedKeyCache::new();
        let k1 = cache.get_or_try_insert_with(7, || Ok(Bytes::from_static(&[1u8; 32]))).unwrap();
        let k2 = cache
            .get_or_try_insert_with(7, || Err(KeyDerivationError::NoApplicableKey { leaf_index: 7 }))
            .unwrap();
        assert_eq!(k1, k2);
        assert_eq!((cache.hits(), cache.misses()), (1, 1));
    }

    #[test]
    fn failures_are_not_cached() {
        let cache = DerivedKeyCache::new();
        let err = cache
            .get_or_try_insert_with(9, || Err(KeyDerivationError::NoApplicableKey { leaf_index: 9 }))
            .unwrap_err();
        assert_eq!(err, KeyDerivationError::NoApplicableKey { leaf_index: 9 });
        assert!(cache.is_empty());
    }
}
