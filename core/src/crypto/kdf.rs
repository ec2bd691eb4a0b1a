// ## src/crypto/kdf.rs

//! crypto/kdf.rs
//! One-way key tree: SHA-256 ratchet from the nearest known ancestor down to a leaf.
//!
//! Design:
//! - Position 1 is the root, position p has children 2p and 2p+1.
//! - For leaf n at depth r = ceil(log2 n), the ancestor at level i is n >> (r - i).
//! - Start from the shallowest ancestor present in the store, then for each
//!   remaining level hash: key = SHA-256(key || selector), selector = (n >> (r - i)) & 0xFF.
//!
//! Notes:
//! - A holder of an ancestor key derives every key below it, never the reverse.
//! - The root fallback (store position 1, else the container base key) is an
//!   explicit protocol path, not a silent default.
//! - Segment keys live in a reserved subtree starting at `segment_leaf_offset`.

use bytes::Bytes;
use sha2::{Digest, Sha256};
use tracing::trace;

use crate::crypto::cache::DerivedKeyCache;
use crate::crypto::keystore::KeyStore;
use crate::crypto::types::{KeyDerivationError, ROOT_POSITION};
use crate::utils::{ceil_log2, floor_log2};

/// Root-to-leaf path of one leaf in the key tree.
///
/// Levels run `0..=depth`; level `depth` is the leaf itself. Levels above the
/// root map to position 0, which is not a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyPath {
    leaf: u64,
    depth: u32,
}

impl KeyPath {
    pub fn new(leaf: u64) -> Self {
        Self { leaf, depth: ceil_log2(leaf) }
    }

    pub fn leaf(&self) -> u64 {
        self.leaf
    }

    pub fn depth(&self) -> u32 {
        self.depth
    }

    /// Tree position at `level`.
    #[inline]
    pub fn position_at(&self, level: u32) -> u64 {
        // depth can be 64 for the largest leaves; a full-width shift means "above the root".
        self.leaf.checked_shr(self.depth - level).unwrap_or(0)
    }

    /// Single-byte selector hashed in when descending to `level`.
    #[inline]
    pub fn selector_at(&self, level: u32) -> u8 {
        (self.position_at(level) & 0xFF) as u8
    }

    /// Level at which the root (position 1) sits on this path.
    pub fn root_level(&self) -> u32 {
        if self.leaf == 0 {
            0
        } else {
            self.depth - floor_log2(self.leaf)
        }
    }

    /// `(level, position)` pairs from the root down to the leaf.
    pub fn ancestors(&self) -> impl Iterator<Item = (u32, u64)> + '_ {
        (0..=self.depth)
            .map(move |level| (level, self.position_at(level)))
            .filter(|&(_, position)| position != 0)
    }
}

/// `h = 1 + (1 << (ceil(log2(segment_count)) + 1))`: first leaf of the segment subtree.
///
/// `None` once the subtree no longer fits a u64 position (`segment_count > 2^62`).
pub fn segment_leaf_offset(segment_count: usize) -> Option<u64> {
    let shift = ceil_log2(segment_count as u64) + 1;
    1u64.checked_shl(shift)?.checked_add(1)
}

/// Tree leaf holding the key of segment `segment_index`, `None` on u64 overflow.
pub fn segment_leaf_index(segment_count: usize, segment_index: usize) -> Option<u64> {
    segment_leaf_offset(segment_count)?.checked_add(segment_index as u64)
}

/// Derive the key for `leaf_index` from the store alone.
///
/// Errors:
/// - `NoApplicableKey` if no ancestor and no root key (position 1) is present.
pub fn derive_key(store: &KeyStore, leaf_index: u64) -> Result<Bytes, KeyDerivationError> {
    derive_key_with_base(store, None, leaf_index)
}

/// Derive the key for `leaf_index`, falling back to `base_key` as the root
/// when the store has neither an ancestor nor position 1.
pub fn derive_key_with_base(
    store: &KeyStore,
    base_key: Option<&[u8]>,
    leaf_index: u64,
) -> Result<Bytes, KeyDerivationError> {
    let path = KeyPath::new(leaf_index);

    let (start_key, start_level) = match nearest_ancestor(store, &path) {
        Some(hit) => hit,
        None => root_fallback(store, base_key, &path)
            .ok_or(KeyDerivationError::NoApplicableKey { leaf_index })?,
    };

    trace!(leaf_index, depth = path.depth(), start_level, "ratcheting key");
    Ok(ratchet(start_key, &path, start_level))
}

/// Shallowest ancestor present in the store, with its level.
fn nearest_ancestor<'a>(store: &'a KeyStore, path: &KeyPath) -> Option<(&'a [u8], u32)> {
    path.ancestors()
        .find_map(|(level, position)| store.get(position).map(|key| (key.as_ref(), level)))
}

/// Root fallback: store position 1, else the caller's base key, placed at the
/// level where the root sits on this leaf's path.
fn root_fallback<'a>(
    store: &'a KeyStore,
    base_key: Option<&'a [u8]>,
    path: &KeyPath,
) -> Option<(&'a [u8], u32)> {
    let root = store
        .get(ROOT_POSITION)
        .map(|key| key.as_ref())
        .or(base_key)?;
    Some((root, path.root_level()))
}

fn ratchet(start_key: &[u8], path: &KeyPath, start_level: u32) -> Bytes {
    let mut key = start_key.to_vec();
    for level in (start_level + 1)..=path.depth() {
        let mut hasher = Sha256::new();
        hasher.update(&key);
        hasher.update([path.selector_at(level)]);
        key = hasher.finalize().to_vec();
    }
    Bytes::from(key)
}

/// Store, optional root fallback and optional cache bound together for one container.
#[derive(Debug, Clone, Copy)]
pub struct KeyDeriver<'a> {
    store: &'a KeyStore,
    base_key: Option<&'a [u8]>,
    cache: Option<&'a DerivedKeyCache>,
}

impl<'a> KeyDeriver<'a> {
    pub fn new(store: &'a KeyStore) -> Self {
        Self { store, base_key: None, cache: None }
    }

    pub fn with_base_key(mut self, base_key: &'a [u8]) -> Self {
        self.base_key = Some(base_key);
        self
    }

    pub fn with_cache(mut self, cache: &'a DerivedKeyCache) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn derive(&self, leaf_index: u64) -> Result<Bytes, KeyDerivationError> {
        match self.cache {
            Some(cache) => cache.get_or_try_insert_with(leaf_index, || {
                derive_key_with_base(self.store, self.base_key, leaf_index)
            }),
            None => derive_key_with_base(self.store, self.base_key, leaf_index),
        }
    }
}
